use std::{fmt, sync::Arc};

use realfft::{num_complex::Complex64, RealFftPlanner, RealToComplex};

use crate::{EqError, Result};

/// Real-input FFT of a fixed size that reports `|X_k| / sqrt(N)` for each of
/// the `N / 2 + 1` non-negative frequency bins.
///
/// All buffers are allocated once up front; [`MagnitudeSpectrum::transform`]
/// only copies and computes.
pub struct MagnitudeSpectrum {
    size: usize,
    scale: f64,
    plan: Arc<dyn RealToComplex<f64>>,
    input: Vec<f64>,
    spectrum: Vec<Complex64>,
    scratch: Vec<Complex64>,
}

impl MagnitudeSpectrum {
    /// Plans a forward transform over windows of `size` samples.
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(EqError::config("window size must be at least one sample"));
        }

        let plan = RealFftPlanner::<f64>::new().plan_fft_forward(size);
        let input = plan.make_input_vec();
        let spectrum = plan.make_output_vec();
        let scratch = plan.make_scratch_vec();
        Ok(Self {
            size,
            scale: 1.0 / (size as f64).sqrt(),
            plan,
            input,
            spectrum,
            scratch,
        })
    }

    /// Number of samples per window.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of magnitudes produced per window.
    pub fn bins(&self) -> usize {
        self.spectrum.len()
    }

    /// Transforms exactly `size` samples and writes `bins` magnitudes to the
    /// front of `out`.
    pub fn transform(&mut self, samples: &[f64], out: &mut [f64]) -> Result<()> {
        if samples.len() != self.size {
            return Err(EqError::input_size("sample window", self.size, samples.len()));
        }
        if out.len() < self.bins() {
            return Err(EqError::input_size("magnitude buffer", self.bins(), out.len()));
        }

        // the planner overwrites its input, so work on a copy
        self.input.copy_from_slice(samples);
        self.plan
            .process_with_scratch(&mut self.input, &mut self.spectrum, &mut self.scratch)?;

        for (slot, bin) in out.iter_mut().zip(&self.spectrum) {
            *slot = bin.norm() * self.scale;
        }
        Ok(())
    }
}

impl fmt::Debug for MagnitudeSpectrum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MagnitudeSpectrum")
            .field("size", &self.size)
            .field("bins", &self.spectrum.len())
            .finish()
    }
}

/// Root mean square of `values`; zero for an empty slice.
pub fn rms(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sum: f64 = values.iter().map(|value| value * value).sum();
    (sum / values.len() as f64).sqrt()
}
