//! Frequency-domain normalization of a temperature sequence.

use rustfft::{FftPlanner, num_complex::Complex};

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum SignalError {
    #[display(
        "sequence has {len} element(s), at least 2 are required to drop the zero-frequency term"
    )]
    TooShort { len: usize },
    #[display("sequence contains non-finite value {value} at index {index}")]
    NonFinite { index: usize, value: f64 },
}

/// Discrete Fourier magnitude transform without the DC component.
///
/// For an ordered sequence `x` of length `n`, returns `|X_k|` for `k = 1..n`,
/// where `X` is the unnormalized DFT of `x`. The zero-frequency bin `X_0`
/// only carries the mean of the signal and is dropped, so the output has
/// `n - 1` elements in bin order. No window or scaling is applied.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalNormalizer;

impl SignalNormalizer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Computes the non-DC magnitude spectrum of `sequence`.
    ///
    /// # Errors
    ///
    /// Returns an error if `sequence` has fewer than two elements or contains
    /// `NaN` or infinite values.
    pub fn transform(&self, sequence: &[f64]) -> Result<Vec<f64>, SignalError> {
        if sequence.len() < 2 {
            return Err(SignalError::TooShort {
                len: sequence.len(),
            });
        }
        if let Some((index, &value)) = sequence.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(SignalError::NonFinite { index, value });
        }

        let mut buffer = sequence
            .iter()
            .map(|&re| Complex::new(re, 0.0))
            .collect::<Vec<_>>();
        let mut planner = FftPlanner::<f64>::new();
        planner.plan_fft_forward(buffer.len()).process(&mut buffer);

        Ok(buffer[1..].iter().map(|c| c.norm()).collect())
    }
}
