use serde::{Deserialize, Serialize};

use crate::{weight::log10_or_zero, EqError, Result};

/// Bounds reported for any index outside of a partition.
pub const INVALID_BOUNDS: (f64, f64) = (-1.0, -1.0);

/// Construction policy a [`BinPartition`] was built with. The kind also decides
/// whether overlap weights against the partition are measured in linear or
/// logarithmic frequency space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionKind {
    Linear,
    Exponential,
    Arbitrary,
}

/// Ordered partition of the frequency axis. Bin `i` spans the half-open range
/// `[boundaries[i], boundaries[i + 1])` in Hz.
///
/// Partitions are validated once when they are built and are immutable
/// afterwards, so they can be shared freely between threads.
#[derive(Debug, Clone, PartialEq)]
pub struct BinPartition {
    kind: PartitionKind,
    boundaries: Vec<f64>,
}

impl BinPartition {
    /// Evenly spaced bins between `start_hz` and `stop_hz`.
    pub fn linear(start_hz: f64, stop_hz: f64, bins: usize) -> Result<Self> {
        ensure_bins(bins)?;
        let step = (stop_hz - start_hz) / bins as f64;
        let boundaries = (0..=bins).map(|i| start_hz + i as f64 * step).collect();
        Self::from_boundaries(PartitionKind::Linear, boundaries)
    }

    /// Bins evenly spaced in `log10` frequency between `start_hz` and
    /// `stop_hz`. A zero-Hz endpoint is treated as `log10(0) = 0`, so the
    /// partition then starts (or stops) at 1 Hz.
    pub fn exponential(start_hz: f64, stop_hz: f64, bins: usize) -> Result<Self> {
        ensure_bins(bins)?;
        if start_hz < 0.0 || stop_hz < 0.0 {
            return Err(EqError::config(format!(
                "exponential bins require non-negative bounds, got {start_hz}..{stop_hz} Hz"
            )));
        }

        let x_start = log10_or_zero(start_hz);
        let x_step = (log10_or_zero(stop_hz) - x_start) / bins as f64;
        let boundaries = (0..=bins)
            .map(|i| 10f64.powf(x_start + i as f64 * x_step))
            .collect();
        Self::from_boundaries(PartitionKind::Exponential, boundaries)
    }

    /// Bins delimited by caller supplied boundaries. `n` boundaries yield
    /// `n - 1` bins.
    pub fn arbitrary(boundaries: Vec<f64>) -> Result<Self> {
        Self::from_boundaries(PartitionKind::Arbitrary, boundaries)
    }

    fn from_boundaries(kind: PartitionKind, boundaries: Vec<f64>) -> Result<Self> {
        if boundaries.len() < 2 {
            return Err(EqError::config(format!(
                "a partition needs at least two boundaries, got {}",
                boundaries.len()
            )));
        }

        if let Some(bad) = boundaries.iter().find(|value| !value.is_finite()) {
            return Err(EqError::config(format!(
                "partition boundary {bad} is not a finite frequency"
            )));
        }

        if let Some(index) = boundaries.windows(2).position(|pair| pair[1] < pair[0]) {
            return Err(EqError::config(format!(
                "partition boundaries must be non-decreasing, but {} follows {}",
                boundaries[index + 1],
                boundaries[index]
            )));
        }

        Ok(Self { kind, boundaries })
    }

    pub fn kind(&self) -> PartitionKind {
        self.kind
    }

    /// Number of bins in the partition. Always at least one.
    pub fn len(&self) -> usize {
        self.boundaries.len() - 1
    }

    /// Partitions are never empty; provided for API completeness.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns `(lo, hi)` for bin `index`, or [`INVALID_BOUNDS`] when the index
    /// lies outside `[0, len)`.
    pub fn bounds(&self, index: isize) -> (f64, f64) {
        usize::try_from(index)
            .ok()
            .and_then(|index| self.get(index))
            .unwrap_or(INVALID_BOUNDS)
    }

    /// Checked variant of [`BinPartition::bounds`].
    pub fn get(&self, index: usize) -> Option<(f64, f64)> {
        if index >= self.len() {
            return None;
        }
        Some((self.boundaries[index], self.boundaries[index + 1]))
    }

    pub fn boundaries(&self) -> &[f64] {
        &self.boundaries
    }

    pub fn start_hz(&self) -> f64 {
        self.boundaries[0]
    }

    pub fn stop_hz(&self) -> f64 {
        self.boundaries[self.boundaries.len() - 1]
    }

    /// Iterates over the `(lo, hi)` bounds of every bin in order.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.boundaries.windows(2).map(|pair| (pair[0], pair[1]))
    }

    /// Index of the bin whose half-open range contains `frequency_hz`.
    pub fn find(&self, frequency_hz: f64) -> Option<usize> {
        self.iter().position(|(lo, hi)| frequency_hz >= lo && frequency_hz < hi)
    }
}

fn ensure_bins(bins: usize) -> Result<()> {
    if bins == 0 {
        Err(EqError::config("a partition needs at least one bin"))
    } else {
        Ok(())
    }
}

/// Serializable description of an output partition, as found in configuration
/// files and on the command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PartitionSpec {
    Linear {
        start_hz: f64,
        stop_hz: f64,
        bins: usize,
    },
    Exponential {
        start_hz: f64,
        stop_hz: f64,
        bins: usize,
    },
    Arbitrary {
        boundaries_hz: Vec<f64>,
    },
}

impl Default for PartitionSpec {
    fn default() -> Self {
        Self::Exponential {
            start_hz: 20.0,
            stop_hz: 20_000.0,
            bins: 16,
        }
    }
}

impl PartitionSpec {
    /// Validates the description and builds the partition.
    pub fn build(&self) -> Result<BinPartition> {
        match self {
            Self::Linear {
                start_hz,
                stop_hz,
                bins,
            } => BinPartition::linear(*start_hz, *stop_hz, *bins),
            Self::Exponential {
                start_hz,
                stop_hz,
                bins,
            } => BinPartition::exponential(*start_hz, *stop_hz, *bins),
            Self::Arbitrary { boundaries_hz } => BinPartition::arbitrary(boundaries_hz.clone()),
        }
    }

    /// Replaces the bin count of a linear or exponential description. Arbitrary
    /// boundary lists carry their own count and are left untouched.
    pub fn with_bins(mut self, count: usize) -> Self {
        match &mut self {
            Self::Linear { bins, .. } | Self::Exponential { bins, .. } => *bins = count,
            Self::Arbitrary { .. } => {}
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        let tolerance = expected.abs().max(1.0) * 1e-4;
        assert!(
            (actual - expected).abs() <= tolerance,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn linear_bins_are_evenly_spaced() {
        let bins = BinPartition::linear(100.0, 1000.0, 9).unwrap();

        assert_eq!(bins.len(), 9);
        assert_eq!(bins.kind(), PartitionKind::Linear);
        assert_eq!(bins.bounds(0), (100.0, 200.0));
        assert_eq!(bins.bounds(8), (900.0, 1000.0));
        assert_eq!(bins.bounds(9), INVALID_BOUNDS);
        assert_eq!(bins.bounds(-1), INVALID_BOUNDS);
    }

    #[test]
    fn exponential_bins_follow_decades() {
        let bins = BinPartition::exponential(20.0, 20_000.0, 3).unwrap();

        assert_eq!(bins.len(), 3);
        let expected = [(20.0, 200.0), (200.0, 2000.0), (2000.0, 20_000.0)];
        for (index, (lo, hi)) in expected.into_iter().enumerate() {
            let (actual_lo, actual_hi) = bins.bounds(index as isize);
            assert_close(actual_lo, lo);
            assert_close(actual_hi, hi);
        }
        assert_eq!(bins.bounds(3), INVALID_BOUNDS);
        assert_eq!(bins.bounds(-1), INVALID_BOUNDS);
    }

    #[test]
    fn exponential_bins_treat_zero_as_log_zero() {
        let bins = BinPartition::exponential(0.0, 100.0, 2).unwrap();

        assert_close(bins.start_hz(), 1.0);
        assert_close(bins.bounds(0).1, 10.0);
        assert_close(bins.stop_hz(), 100.0);
    }

    #[test]
    fn arbitrary_bins_use_given_boundaries() {
        let bins =
            BinPartition::arbitrary(vec![20.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 20_000.0])
                .unwrap();

        assert_eq!(bins.len(), 6);
        assert_eq!(bins.kind(), PartitionKind::Arbitrary);
        assert_eq!(bins.bounds(0), (20.0, 100.0));
        assert_eq!(bins.bounds(1), (100.0, 250.0));
        assert_eq!(bins.bounds(5), (2500.0, 20_000.0));
        assert_eq!(bins.bounds(6), INVALID_BOUNDS);
        assert_eq!(bins.bounds(-1), INVALID_BOUNDS);
        assert_eq!(bins.get(6), None);
    }

    #[test]
    fn rejects_empty_partitions() {
        assert!(matches!(
            BinPartition::linear(0.0, 100.0, 0),
            Err(EqError::Configuration(_))
        ));
        assert!(BinPartition::exponential(20.0, 20_000.0, 0).is_err());
        assert!(BinPartition::arbitrary(vec![20.0]).is_err());
        assert!(BinPartition::arbitrary(Vec::new()).is_err());
    }

    #[test]
    fn rejects_non_monotonic_or_non_finite_boundaries() {
        let err = BinPartition::arbitrary(vec![20.0, 100.0, 50.0]).unwrap_err();
        assert!(format!("{err}").contains("non-decreasing"));

        assert!(BinPartition::arbitrary(vec![20.0, f64::NAN]).is_err());
        assert!(BinPartition::arbitrary(vec![f64::NEG_INFINITY, 20.0]).is_err());
        assert!(BinPartition::linear(1000.0, 100.0, 4).is_err());
        assert!(BinPartition::exponential(-20.0, 100.0, 4).is_err());
    }

    #[test]
    fn allows_repeated_boundaries() {
        let bins = BinPartition::arbitrary(vec![0.0, 10.0, 10.0, 20.0]).unwrap();
        assert_eq!(bins.len(), 3);
        assert_eq!(bins.bounds(1), (10.0, 10.0));
    }

    #[test]
    fn finds_bin_containing_frequency() {
        let bins = BinPartition::arbitrary(vec![0.0, 100.0, 250.0, 500.0]).unwrap();

        assert_eq!(bins.find(0.0), Some(0));
        assert_eq!(bins.find(100.0), Some(1));
        assert_eq!(bins.find(499.9), Some(2));
        assert_eq!(bins.find(500.0), None);
    }

    #[test]
    fn description_builds_matching_partition() {
        let spec: PartitionSpec = serde_json::from_str(
            r#"{ "kind": "arbitrary", "boundaries_hz": [20, 100, 250] }"#,
        )
        .unwrap();
        assert_eq!(spec.build().unwrap().len(), 2);

        let default = PartitionSpec::default().build().unwrap();
        assert_eq!(default.kind(), PartitionKind::Exponential);
        assert_eq!(default.len(), 16);

        let resized = PartitionSpec::default().with_bins(4).build().unwrap();
        assert_eq!(resized.len(), 4);
    }
}
