//! Overlap weights between a source bin and a destination bin.

use crate::PartitionKind;

/// Frequency axis on which two bins are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrequencyScale {
    Linear,
    Logarithmic,
}

impl FrequencyScale {
    /// Exponential destinations are compared in `log10` space, everything else
    /// in Hz.
    pub fn for_destination(kind: PartitionKind) -> Self {
        match kind {
            PartitionKind::Exponential => Self::Logarithmic,
            PartitionKind::Linear | PartitionKind::Arbitrary => Self::Linear,
        }
    }
}

/// `log10` with `log10(0) := 0`.
pub fn log10_or_zero(value: f64) -> f64 {
    if value == 0.0 {
        0.0
    } else {
        value.log10()
    }
}

/// Fraction of the source bin `[src_lo, src_hi)` that falls inside the
/// destination bin `[dest_lo, dest_hi)`. The source width is always the
/// denominator, so the ratio is not symmetric.
///
/// The source bin must have a non-zero width.
pub fn overlap_ratio(src: (f64, f64), dest: (f64, f64)) -> f64 {
    let (src_lo, src_hi) = src;
    let (dest_lo, dest_hi) = dest;
    let width = src_hi - src_lo;

    // D[ S[  ]S ]D
    if src_lo >= dest_lo && src_hi <= dest_hi {
        return 1.0;
    }
    // S[ D[  ]D ]S
    if dest_lo >= src_lo && dest_hi <= src_hi {
        return ((dest_hi - dest_lo) / width).clamp(0.0, 1.0);
    }
    // S[ D[  ]S ]D
    if dest_lo >= src_lo && dest_lo < src_hi {
        return ((src_hi - dest_lo) / width).clamp(0.0, 1.0);
    }
    // D[ S[  ]D ]S
    if dest_hi >= src_lo && dest_hi < src_hi {
        return ((dest_hi - src_lo) / width).clamp(0.0, 1.0);
    }
    0.0
}

/// Overlap ratio evaluated on the requested frequency axis.
pub fn weight(src: (f64, f64), dest: (f64, f64), scale: FrequencyScale) -> f64 {
    match scale {
        FrequencyScale::Linear => overlap_ratio(src, dest),
        FrequencyScale::Logarithmic => overlap_ratio(
            (log10_or_zero(src.0), log10_or_zero(src.1)),
            (log10_or_zero(dest.0), log10_or_zero(dest.1)),
        ),
    }
}
