use serde::{Deserialize, Serialize};

use crate::{
    weight::{weight, FrequencyScale},
    BinPartition, EqError, PartitionKind, Result,
};

/// How weighted contributions are combined into a destination bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accumulation {
    /// Raw weighted sum. Total energy is preserved when the destination tiles
    /// the source range; the caller scales the result afterwards.
    #[default]
    EnergySum,
    /// Weighted sum divided by the summed weights of each destination bin.
    /// Bins that received no weight stay at zero.
    WeightedAverage,
}

/// Redistributes magnitudes from a linear source partition onto an arbitrary
/// destination partition.
///
/// The resampler owns the weight accumulator used by
/// [`Accumulation::WeightedAverage`], so repeated calls do not allocate.
#[derive(Debug, Clone)]
pub struct Resampler {
    source: BinPartition,
    dest: BinPartition,
    scale: FrequencyScale,
    accumulation: Accumulation,
    weight_sums: Vec<f64>,
}

impl Resampler {
    /// Validates that `source` is linear and that `dest` is not finer than
    /// `source`.
    pub fn new(source: BinPartition, dest: BinPartition, accumulation: Accumulation) -> Result<Self> {
        check_compatible(&source, &dest)?;
        let scale = FrequencyScale::for_destination(dest.kind());
        let weight_sums = vec![0.0; dest.len()];
        Ok(Self {
            source,
            dest,
            scale,
            accumulation,
            weight_sums,
        })
    }

    pub fn source(&self) -> &BinPartition {
        &self.source
    }

    pub fn dest(&self) -> &BinPartition {
        &self.dest
    }

    pub fn accumulation(&self) -> Accumulation {
        self.accumulation
    }

    /// Writes the resampled magnitudes into `out[..dest.len()]`.
    ///
    /// `magnitudes[i]` belongs to source bin `i`; there may be fewer
    /// magnitudes than source bins (a real FFT only yields `N/2 + 1` of them),
    /// but never more.
    pub fn resample(&mut self, magnitudes: &[f64], out: &mut [f64]) -> Result<()> {
        let bins = self.dest.len();
        if magnitudes.len() > self.source.len() {
            return Err(EqError::input_size(
                "source magnitudes",
                self.source.len(),
                magnitudes.len(),
            ));
        }
        if out.len() < bins {
            return Err(EqError::input_size("output buffer", bins, out.len()));
        }

        let out = &mut out[..bins];
        out.fill(0.0);
        self.weight_sums.fill(0.0);

        for (src, &magnitude) in self.source.iter().zip(magnitudes) {
            for ((slot, sum), dest) in out
                .iter_mut()
                .zip(self.weight_sums.iter_mut())
                .zip(self.dest.iter())
            {
                let w = weight(src, dest, self.scale);
                *slot += w * magnitude;
                *sum += w;
            }
        }

        if self.accumulation == Accumulation::WeightedAverage {
            for (slot, &sum) in out.iter_mut().zip(&self.weight_sums) {
                *slot = if sum > 0.0 { *slot / sum } else { 0.0 };
            }
        }

        Ok(())
    }
}

/// Checks the preconditions of resampling from `source` onto `dest`.
pub fn check_compatible(source: &BinPartition, dest: &BinPartition) -> Result<()> {
    if source.kind() != PartitionKind::Linear {
        return Err(EqError::config(format!(
            "resampling source must be linear, got {:?}",
            source.kind()
        )));
    }
    if dest.len() > source.len() {
        return Err(EqError::config(format!(
            "upsampling is not supported: {} source bins cannot fill {} destination bins",
            source.len(),
            dest.len()
        )));
    }
    Ok(())
}

/// One-off resampling that allocates its own output.
pub fn resample(
    magnitudes: &[f64],
    source: &BinPartition,
    dest: &BinPartition,
    accumulation: Accumulation,
) -> Result<Vec<f64>> {
    let mut resampler = Resampler::new(source.clone(), dest.clone(), accumulation)?;
    let mut out = vec![0.0; dest.len()];
    resampler.resample(magnitudes, &mut out)?;
    Ok(out)
}
