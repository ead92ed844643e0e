//! Threshold-crossing features.
//!
//! After min-max normalisation of the window to `[0, 1]`:
//!
//! | column | feature                                                   |
//! |--------|-----------------------------------------------------------|
//! | 0      | TCI, mean interval between threshold crossings (seconds)  |
//! | 1      | TCSC, mean crossings per complete `block_secs` block      |
//! | 2      | MAV, mean absolute value over complete 2 s blocks         |
//!
//! Every column is 0.0 when it has nothing to average over.

use super::extractor::{validate, FeatureError, FeatureExtractor, FeatureVector};

/// Sample indices at which `samples` crosses `threshold`.
///
/// The starting side is taken from the first sample; a sample equal to the
/// threshold counts as high.
///
/// ```
/// use vf_dataset::features::threshold_crossing;
///
/// let x = [0.0, 0.5, 0.9, 0.1, 0.2, 0.0];
/// assert_eq!(threshold_crossing(&x, 0.2), vec![1, 3, 4, 5]);
/// ```
pub fn threshold_crossing(samples: &[f32], threshold: f32) -> Vec<usize> {
    let Some(&first) = samples.first() else {
        return Vec::new();
    };
    let mut high = first >= threshold;
    let mut crossings = Vec::new();
    for (i, &x) in samples.iter().enumerate() {
        if high != (x >= threshold) {
            crossings.push(i);
            high = !high;
        }
    }
    crossings
}

/// Scale `samples` to `[0, 1]`; a flat window becomes all zeros.
fn normalise(samples: &[f32]) -> Vec<f32> {
    let (min, max) = samples
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &x| {
            (lo.min(x), hi.max(x))
        });
    let range = max - min;
    if range <= 0.0 || !range.is_finite() {
        return vec![0.0; samples.len()];
    }
    samples.iter().map(|&x| (x - min) / range).collect()
}

fn mean(values: impl ExactSizeIterator<Item = f64>) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    values.sum::<f64>() / n as f64
}

// ---------------------------------------------------------------------------
// ThresholdCrossingExtractor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdCrossingExtractor {
    /// Crossing threshold on the normalised signal.
    pub threshold: f32,
    /// Block length for TCSC, in seconds.
    pub block_secs: f64,
}

impl Default for ThresholdCrossingExtractor {
    fn default() -> Self {
        Self {
            threshold: 0.2,
            block_secs: 3.0,
        }
    }
}

impl ThresholdCrossingExtractor {
    const MAV_BLOCK_SECS: f64 = 2.0;

    pub fn new(threshold: f32, block_secs: f64) -> Self {
        Self {
            threshold,
            block_secs,
        }
    }
}

impl FeatureExtractor for ThresholdCrossingExtractor {
    fn name(&self) -> &str {
        "threshold-crossing"
    }

    fn cache_tag(&self) -> String {
        format!("{}:{}:{}", self.name(), self.threshold, self.block_secs)
    }

    fn dimension(&self) -> usize {
        3
    }

    fn extract(&self, samples: &[f32], sampling_rate: f64) -> Result<FeatureVector, FeatureError> {
        validate(samples, sampling_rate)?;

        let normalised = normalise(samples);
        let crossings = threshold_crossing(&normalised, self.threshold);

        let tci = mean(
            crossings
                .windows(2)
                .map(|pair| (pair[1] - pair[0]) as f64 / sampling_rate),
        );

        let tcsc_block = (self.block_secs * sampling_rate).round() as usize;
        let tcsc = if tcsc_block == 0 {
            0.0
        } else {
            let n_blocks = samples.len() / tcsc_block;
            let mut counts = vec![0usize; n_blocks];
            for &c in &crossings {
                if let Some(count) = counts.get_mut(c / tcsc_block) {
                    *count += 1;
                }
            }
            mean(counts.into_iter().map(|n| n as f64))
        };

        let mav_block = (Self::MAV_BLOCK_SECS * sampling_rate).round() as usize;
        let mav = if mav_block == 0 {
            0.0
        } else {
            mean(normalised.chunks_exact(mav_block).map(|block| {
                block.iter().map(|x| x.abs() as f64).sum::<f64>() / block.len() as f64
            }))
        };

        Ok(vec![tci as f32, tcsc as f32, mav as f32])
    }
}
