//! Single-channel sampled signal.

use serde::{Deserialize, Serialize};

/// One continuous recording channel in physical units (mV) at a fixed
/// sampling rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub samples: Vec<f32>,
    /// Samples per second.
    pub sampling_rate: f64,
}

impl Signal {
    pub fn new(samples: Vec<f32>, sampling_rate: f64) -> Self {
        Self {
            samples,
            sampling_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Total duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sampling_rate > 0.0 {
            self.samples.len() as f64 / self.sampling_rate
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_of_one_minute_at_250_hz() {
        let signal = Signal::new(vec![0.0; 15_000], 250.0);
        assert!((signal.duration_secs() - 60.0).abs() < 1e-9);
    }

    #[test]
    fn zero_rate_has_zero_duration() {
        let signal = Signal::new(vec![0.0; 10], 0.0);
        assert_eq!(signal.duration_secs(), 0.0);
    }
}
