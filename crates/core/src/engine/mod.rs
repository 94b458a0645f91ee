use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    Accumulation, BinPartition, EqError, MagnitudeSpectrum, PartitionSpec, Resampler, Result,
};

/// How [`choose_window_size`] rounds the sample count of a frame to a power of
/// two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowRounding {
    /// Smallest power of two at or above the target. Frames cover at least
    /// the requested duration, so updates may arrive slightly slower.
    AtLeast,
    /// Largest power of two at or below the target. Frames are never longer
    /// than requested, so updates may arrive slightly faster.
    #[default]
    AtMost,
}

/// Largest window an [`EqualizerEngine`] accepts, about 24 seconds of audio at
/// 44.1 kHz.
pub const MAX_WINDOW_SIZE: usize = 1 << 20;

/// Picks a power-of-two window length for frames of roughly `frame` at the
/// given sample rate. Targets beyond the largest representable power of two
/// saturate to it.
pub fn choose_window_size(sample_rate_hz: u32, frame: Duration, rounding: WindowRounding) -> usize {
    let target = (frame.as_secs_f64() * f64::from(sample_rate_hz)) as usize;
    if target <= 1 {
        return 1;
    }

    let Some(at_least) = target.checked_next_power_of_two() else {
        return 1 << (usize::BITS - 1);
    };
    match rounding {
        WindowRounding::AtLeast => at_least,
        WindowRounding::AtMost if at_least == target => target,
        WindowRounding::AtMost => at_least / 2,
    }
}

/// `20 * log10(magnitude)`. Zero maps to negative infinity.
pub fn decibels(magnitude: f64) -> f64 {
    20.0 * magnitude.log10()
}

/// Converts every value in place with [`decibels`].
pub fn to_decibels(values: &mut [f64]) {
    for value in values {
        *value = decibels(*value);
    }
}

/// Immutable per-session settings of an [`EqualizerEngine`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub sample_rate_hz: u32,
    /// Samples per frame. Powers of two transform fastest but any positive
    /// length works.
    pub window_size: usize,
    pub output: PartitionSpec,
    /// Final gain applied to every output bin. Zero is read as "unset" and
    /// behaves like 1.
    pub normalize_factor: f64,
    pub output_db: bool,
    pub accumulation: Accumulation,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 44_100,
            window_size: 2048,
            output: PartitionSpec::default(),
            normalize_factor: 1.0,
            output_db: false,
            accumulation: Accumulation::EnergySum,
        }
    }
}

impl EngineConfig {
    /// Default layout (exponential bins over 20 Hz to 20 kHz) with the given
    /// sample rate, window size and number of output bins.
    pub fn new(sample_rate_hz: u32, window_size: usize, bins: usize) -> Self {
        Self {
            sample_rate_hz,
            window_size,
            output: PartitionSpec::default().with_bins(bins),
            ..Self::default()
        }
    }

    /// Duration of audio covered by one window.
    pub fn frame_duration(&self) -> Duration {
        if self.sample_rate_hz == 0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(self.window_size as f64 / f64::from(self.sample_rate_hz))
            .unwrap_or(Duration::MAX)
    }
}

/// Turns windows of mono samples into equalizer bands.
///
/// The engine validates its configuration once, owns every scratch buffer it
/// needs and afterwards maps `(config, window)` to output bands without
/// carrying anything over between calls. It is not meant to be shared between
/// threads; use one engine per thread.
#[derive(Debug)]
pub struct EqualizerEngine {
    config: EngineConfig,
    normalize_factor: f64,
    spectrum: MagnitudeSpectrum,
    resampler: Resampler,
    magnitudes: Vec<f64>,
}

impl EqualizerEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        if config.sample_rate_hz == 0 {
            return Err(EqError::config("sample rate must be positive"));
        }
        if config.window_size > MAX_WINDOW_SIZE {
            return Err(EqError::config(format!(
                "window size {} exceeds the maximum of {MAX_WINDOW_SIZE} samples",
                config.window_size
            )));
        }
        if !config.normalize_factor.is_finite() {
            return Err(EqError::config(format!(
                "normalize factor must be finite, got {}",
                config.normalize_factor
            )));
        }

        let spectrum = MagnitudeSpectrum::new(config.window_size)?;
        let source = BinPartition::linear(
            0.0,
            f64::from(config.sample_rate_hz),
            config.window_size,
        )?;
        let dest = config.output.build()?;
        let resampler = Resampler::new(source, dest, config.accumulation)?;
        let magnitudes = vec![0.0; spectrum.bins()];
        let normalize_factor = if config.normalize_factor == 0.0 {
            1.0
        } else {
            config.normalize_factor
        };

        Ok(Self {
            config,
            normalize_factor,
            spectrum,
            resampler,
            magnitudes,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate_hz
    }

    pub fn window_size(&self) -> usize {
        self.config.window_size
    }

    /// Partition the output bands follow.
    pub fn output(&self) -> &BinPartition {
        self.resampler.dest()
    }

    /// Number of values [`EqualizerEngine::compute`] writes.
    pub fn bins(&self) -> usize {
        self.output().len()
    }

    /// Computes one frame.
    ///
    /// The first `window_size` values of `samples` are analysed and
    /// `out[..bins()]` receives the bands. In decibel mode silent bands come
    /// out as negative infinity and have to be clamped before display.
    pub fn compute(&mut self, samples: &[f64], out: &mut [f64]) -> Result<()> {
        let n = self.config.window_size;
        let bins = self.bins();
        if samples.len() < n {
            return Err(EqError::input_size("sample window", n, samples.len()));
        }
        if out.len() < bins {
            return Err(EqError::input_size("output buffer", bins, out.len()));
        }

        self.spectrum.transform(&samples[..n], &mut self.magnitudes)?;
        self.resampler.resample(&self.magnitudes, out)?;

        let out = &mut out[..bins];
        for value in out.iter_mut() {
            *value *= self.normalize_factor;
        }
        if self.config.output_db {
            to_decibels(out);
        }
        Ok(())
    }
}
