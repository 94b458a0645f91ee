use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    choose_window_size, Accumulation, EngineConfig, EqError, PartitionSpec, Result,
    WindowRounding, MAX_WINDOW_SIZE,
};

/// Top-level configuration structure for the application. Every field has a
/// default, so a configuration file only needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Expected sample rate of the input. When unset the stream's own rate is
    /// used.
    pub sample_rate_hz: Option<u32>,
    pub window: WindowSpec,
    pub partition: PartitionSpec,
    pub normalize_factor: f64,
    pub output_db: bool,
    pub accumulation: Accumulation,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: None,
            window: WindowSpec::default(),
            partition: PartitionSpec::default(),
            normalize_factor: 1.0,
            output_db: false,
            accumulation: Accumulation::EnergySum,
        }
    }
}

impl AppConfig {
    /// Reads a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Resolves the window and checks the configuration against the sample
    /// rate of the stream that is about to be analysed.
    pub fn engine_config(&self, stream_sample_rate_hz: u32) -> Result<EngineConfig> {
        if let Some(expected) = self.sample_rate_hz {
            if expected != stream_sample_rate_hz {
                return Err(EqError::config(format!(
                    "configured for {expected} Hz but the input runs at {stream_sample_rate_hz} Hz"
                )));
            }
        }

        Ok(EngineConfig {
            sample_rate_hz: stream_sample_rate_hz,
            window_size: self.window.resolve(stream_sample_rate_hz)?,
            output: self.partition.clone(),
            normalize_factor: self.normalize_factor,
            output_db: self.output_db,
            accumulation: self.accumulation,
        })
    }
}

/// Window length, either fixed or derived from a target frame duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WindowSpec {
    Samples {
        size: usize,
    },
    FrameDuration {
        millis: f64,
        #[serde(default)]
        rounding: WindowRounding,
    },
}

impl Default for WindowSpec {
    fn default() -> Self {
        Self::Samples { size: 2048 }
    }
}

impl WindowSpec {
    /// Number of samples per window at the given sample rate.
    pub fn resolve(&self, sample_rate_hz: u32) -> Result<usize> {
        match self {
            Self::Samples { size } => Ok(*size),
            Self::FrameDuration { millis, rounding } => {
                if !millis.is_finite() || *millis <= 0.0 {
                    return Err(EqError::config(format!(
                        "frame duration must be a positive number of milliseconds, got {millis}"
                    )));
                }
                let frame = Duration::try_from_secs_f64(millis / 1000.0).map_err(|err| {
                    EqError::config(format!("frame duration of {millis} ms is unusable: {err}"))
                })?;
                let size = choose_window_size(sample_rate_hz, frame, *rounding);
                if size > MAX_WINDOW_SIZE {
                    return Err(EqError::config(format!(
                        "a {millis} ms frame needs {size} samples, above the maximum of \
                         {MAX_WINDOW_SIZE}"
                    )));
                }
                Ok(size)
            }
        }
    }
}
