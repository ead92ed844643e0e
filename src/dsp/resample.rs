//! Window resampling for cross-database rate normalisation.
//!
//! Databases are recorded at different rates (mitdb at 360 Hz, vfdb and
//! cudb at 250 Hz).  Every window is brought to one target rate before
//! feature extraction so that all feature vectors describe the same number
//! of samples per second.
//!
//! Two methods are available:
//!
//! 1. [`ResampleMethod::Fourier`]: truncate or zero-pad the window's
//!    spectrum (the classic FFT method; exact output length, periodic
//!    boundary assumption).
//! 2. [`ResampleMethod::Sinc`]: band-limited sinc interpolation via
//!    `rubato` (`SincFixedIn` + `BlackmanHarris2` window), delay
//!    compensated and trimmed to the same output length.
//!
//! Both are deterministic and produce `round(len * target / source)`
//! samples, so the window keeps its duration in seconds.

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use rustfft::{num_complex::Complex, FftPlanner};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// ResampleError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ResampleError {
    /// Source or target rate is zero, negative or not finite.
    #[error("invalid sampling rates: {source_rate} Hz -> {target_rate} Hz")]
    InvalidRate { source_rate: f64, target_rate: f64 },

    #[error("failed to construct sinc resampler: {0}")]
    Construction(#[from] rubato::ResamplerConstructionError),

    #[error("sinc resampling failed: {0}")]
    Process(#[from] rubato::ResampleError),
}

// ---------------------------------------------------------------------------
// ResampleMethod
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResampleMethod {
    /// Spectrum truncation / zero-padding.
    #[default]
    Fourier,
    /// Windowed-sinc interpolation.
    Sinc,
}

impl ResampleMethod {
    pub fn name(&self) -> &'static str {
        match self {
            ResampleMethod::Fourier => "fourier",
            ResampleMethod::Sinc => "sinc",
        }
    }
}

/// Number of samples a window of `len` samples has after resampling.
///
/// ```
/// use vf_dataset::dsp::resampled_len;
///
/// // 8 s at 250 Hz → 8 s at 360 Hz
/// assert_eq!(resampled_len(2_000, 250.0, 360.0), 2_880);
/// ```
pub fn resampled_len(len: usize, source_rate: f64, target_rate: f64) -> usize {
    (len as f64 * target_rate / source_rate).round() as usize
}

// ---------------------------------------------------------------------------
// WindowResampler
// ---------------------------------------------------------------------------

/// Resamples whole windows, reusing FFT plans across calls.
pub struct WindowResampler {
    method: ResampleMethod,
    planner: FftPlanner<f64>,
}

impl std::fmt::Debug for WindowResampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowResampler")
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

impl WindowResampler {
    pub fn new(method: ResampleMethod) -> Self {
        Self {
            method,
            planner: FftPlanner::new(),
        }
    }

    pub fn method(&self) -> ResampleMethod {
        self.method
    }

    /// Resample `samples` from `source_rate` to `target_rate`.
    ///
    /// Returns the input unchanged when the rates are equal.
    pub fn resample(
        &mut self,
        samples: &[f32],
        source_rate: f64,
        target_rate: f64,
    ) -> Result<Vec<f32>, ResampleError> {
        let valid = |rate: f64| rate.is_finite() && rate > 0.0;
        if !valid(source_rate) || !valid(target_rate) {
            return Err(ResampleError::InvalidRate {
                source_rate,
                target_rate,
            });
        }
        if source_rate == target_rate {
            return Ok(samples.to_vec());
        }

        let num = resampled_len(samples.len(), source_rate, target_rate);
        if samples.is_empty() || num == 0 {
            return Ok(Vec::new());
        }

        match self.method {
            ResampleMethod::Fourier => Ok(self.fourier(samples, num)),
            ResampleMethod::Sinc => sinc(samples, source_rate, target_rate, num),
        }
    }

    fn fourier(&mut self, samples: &[f32], num: usize) -> Vec<f32> {
        let nx = samples.len();
        let mut spectrum: Vec<Complex<f64>> = samples
            .iter()
            .map(|&x| Complex::new(x as f64, 0.0))
            .collect();
        self.planner.plan_fft_forward(nx).process(&mut spectrum);

        let mut out = vec![Complex::new(0.0, 0.0); num];
        let n = nx.min(num);

        // Positive frequencies, including Nyquist when n is even.
        let nyq = n / 2 + 1;
        out[..nyq].copy_from_slice(&spectrum[..nyq]);
        // Negative frequencies.
        let neg = n - nyq;
        if neg > 0 {
            out[num - neg..].copy_from_slice(&spectrum[nx - neg..]);
        }
        // Split or join the Nyquist bin.
        if n % 2 == 0 {
            if num < nx {
                out[n / 2] += spectrum[nx - n / 2];
            } else if nx < num {
                out[n / 2] *= 0.5;
                out[num - n / 2] = out[n / 2];
            }
        }

        self.planner.plan_fft_inverse(num).process(&mut out);
        // rustfft does not normalise; 1/num from the inverse times num/nx.
        let scale = 1.0 / nx as f64;
        out.iter().map(|c| (c.re * scale) as f32).collect()
    }
}

fn sinc(
    samples: &[f32],
    source_rate: f64,
    target_rate: f64,
    num: usize,
) -> Result<Vec<f32>, ResampleError> {
    const MAX_FLUSHES: usize = 4;

    let params = SincInterpolationParameters {
        sinc_len: 128,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 128,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler =
        SincFixedIn::<f64>::new(target_rate / source_rate, 1.0, params, samples.len(), 1)?;
    let delay = resampler.output_delay();

    let waves_in = vec![samples.iter().map(|&x| x as f64).collect::<Vec<f64>>()];
    let mut output = resampler.process(&waves_in, None)?.swap_remove(0);

    // Push zeros through until the delayed tail of the window is out.
    let mut flushes = 0;
    while output.len() < delay + num && flushes < MAX_FLUSHES {
        let tail = resampler
            .process_partial(None::<&[Vec<f64>]>, None)?
            .swap_remove(0);
        if tail.is_empty() {
            break;
        }
        output.extend(tail);
        flushes += 1;
    }

    let mut resampled: Vec<f32> = output
        .into_iter()
        .skip(delay)
        .take(num)
        .map(|x| x as f32)
        .collect();
    let last = resampled.last().copied().unwrap_or(0.0);
    resampled.resize(num, last);
    Ok(resampled)
}

/// Resample a window with the Fourier method.
///
/// ```
/// use vf_dataset::dsp::resample;
///
/// let window = vec![0.25_f32; 2_000]; // 8 s @ 250 Hz
/// let out = resample(&window, 250.0, 360.0).unwrap();
/// assert_eq!(out.len(), 2_880);
/// assert!(out.iter().all(|&x| (x - 0.25).abs() < 1e-5));
/// ```
pub fn resample(
    samples: &[f32],
    source_rate: f64,
    target_rate: f64,
) -> Result<Vec<f32>, ResampleError> {
    WindowResampler::new(ResampleMethod::Fourier).resample(samples, source_rate, target_rate)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f32::consts::PI;

    fn sine(len: usize, rate: f64, freq: f64) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * freq as f32 * i as f32 / rate as f32).sin())
            .collect()
    }

    #[test]
    fn equal_rates_are_a_no_op() {
        let input = sine(500, 250.0, 3.0);
        let out = resample(&input, 250.0, 250.0).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn empty_input_stays_empty() {
        assert!(resample(&[], 250.0, 360.0).unwrap().is_empty());
    }

    #[test]
    fn invalid_rate_is_rejected() {
        assert!(matches!(
            resample(&[0.0; 10], 0.0, 360.0),
            Err(ResampleError::InvalidRate { .. })
        ));
        assert!(matches!(
            resample(&[0.0; 10], 250.0, f64::NAN),
            Err(ResampleError::InvalidRate { .. })
        ));
    }

    #[test]
    fn output_length_follows_rate_ratio() {
        assert_eq!(resample(&[0.0; 2_000], 250.0, 360.0).unwrap().len(), 2_880);
        assert_eq!(resample(&[0.0; 2_880], 360.0, 250.0).unwrap().len(), 2_000);
        assert_eq!(resample(&[0.0; 1_001], 250.0, 360.0).unwrap().len(), 1_441);
    }

    #[test]
    fn round_trip_preserves_duration() {
        for len in [2_000usize, 1_001, 777] {
            let input = sine(len, 250.0, 5.0);
            let up = resample(&input, 250.0, 360.0).unwrap();
            let back = resample(&up, 360.0, 250.0).unwrap();

            let original_secs = len as f64 / 250.0;
            let up_secs = up.len() as f64 / 360.0;
            let back_secs = back.len() as f64 / 250.0;
            assert!((up_secs - original_secs).abs() <= 1.0 / 360.0);
            assert!((back_secs - original_secs).abs() <= 1.0 / 250.0);
        }
    }

    #[test]
    fn periodic_sine_survives_round_trip() {
        // 5 Hz over exactly 8 s: whole number of periods, no leakage.
        let input = sine(2_000, 250.0, 5.0);
        let up = resample(&input, 250.0, 360.0).unwrap();
        let back = resample(&up, 360.0, 250.0).unwrap();
        for (a, b) in input.iter().zip(back.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-4);
        }
    }

    #[test]
    fn upsampled_sine_matches_analytic_values() {
        let input = sine(2_000, 250.0, 5.0);
        let up = resample(&input, 250.0, 360.0).unwrap();
        let expected = sine(2_880, 360.0, 5.0);
        for (a, b) in up.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-4);
        }
    }

    #[test]
    fn sinc_method_keeps_length_and_level() {
        let mut resampler = WindowResampler::new(ResampleMethod::Sinc);
        let input = vec![0.5_f32; 2_000];
        let out = resampler.resample(&input, 250.0, 360.0).unwrap();
        assert_eq!(out.len(), 2_880);
        // Away from the edges a DC input stays at its level.
        for &x in &out[200..2_600] {
            assert_abs_diff_eq!(x, 0.5, epsilon = 1e-2);
        }
    }

    #[test]
    fn method_names_round_trip_through_serde() {
        let json = serde_json::to_string(&ResampleMethod::Sinc).unwrap();
        assert_eq!(json, "\"sinc\"");
        let parsed: ResampleMethod = serde_json::from_str("\"fourier\"").unwrap();
        assert_eq!(parsed, ResampleMethod::Fourier);
    }
}
