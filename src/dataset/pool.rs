//! Parallel feature extraction over independent windows.
//!
//! ```text
//! windows[0..n] ──▶ spawn_blocking(extract) × n   (≤ jobs threads)
//!                         │
//!                         ▼
//!            features[i] placed by window index
//! ```
//!
//! Tasks share nothing but the read-only extractor.  Output order is the
//! input order regardless of completion order, and the first failing task
//! fails the whole batch so features and labels never drift apart.

use std::sync::Arc;

use thiserror::Error;
use tokio::runtime::{Builder, Runtime};

use crate::features::{FeatureError, FeatureExtractor, FeatureVector};
use crate::segment::Window;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("cannot start worker runtime: {0}")]
    Runtime(#[from] std::io::Error),

    /// The task for window `index` panicked or was cancelled.
    #[error("worker for window {index} failed: {reason}")]
    Worker { index: usize, reason: String },

    #[error("feature extraction failed for window {index}: {source}")]
    Extraction {
        index: usize,
        #[source]
        source: FeatureError,
    },

    #[error("window {index} produced {actual} features, expected {expected}")]
    Dimension {
        index: usize,
        expected: usize,
        actual: usize,
    },
}

/// Fixed-size pool running one extraction task per window.
pub struct FeaturePool {
    jobs: usize,
    extractor: Arc<dyn FeatureExtractor>,
    runtime: Runtime,
}

impl std::fmt::Debug for FeaturePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeaturePool")
            .field("jobs", &self.jobs)
            .field("extractor", &self.extractor.name())
            .finish_non_exhaustive()
    }
}

impl FeaturePool {
    /// Start a pool of `jobs` blocking threads (at least one).
    pub fn new(jobs: usize, extractor: Arc<dyn FeatureExtractor>) -> Result<Self, PoolError> {
        let jobs = jobs.max(1);
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(jobs)
            .thread_name("vf-features")
            .build()?;
        Ok(Self {
            jobs,
            extractor,
            runtime,
        })
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    pub fn extractor(&self) -> &dyn FeatureExtractor {
        self.extractor.as_ref()
    }

    /// Extract features from every window.  `result[i]` belongs to
    /// `windows[i]`.
    pub fn run(&self, windows: &[Window]) -> Result<Vec<FeatureVector>, PoolError> {
        log::info!(
            "features: extracting {} from {} windows on {} threads",
            self.extractor.name(),
            windows.len(),
            self.jobs
        );
        let expected = self.extractor.dimension();

        self.runtime.block_on(async {
            let handles: Vec<_> = windows
                .iter()
                .enumerate()
                .map(|(index, window)| {
                    let extractor = Arc::clone(&self.extractor);
                    let samples = window.samples.clone();
                    let rate = window.sampling_rate;
                    let handle =
                        tokio::task::spawn_blocking(move || extractor.extract(&samples, rate));
                    (index, handle)
                })
                .collect();

            let mut slots: Vec<Option<FeatureVector>> = vec![None; windows.len()];
            for (index, handle) in handles {
                let features = handle
                    .await
                    .map_err(|e| PoolError::Worker {
                        index,
                        reason: e.to_string(),
                    })?
                    .map_err(|source| PoolError::Extraction { index, source })?;
                if features.len() != expected {
                    return Err(PoolError::Dimension {
                        index,
                        expected,
                        actual: features.len(),
                    });
                }
                slots[index] = Some(features);
            }

            Ok::<_, PoolError>(slots.into_iter().flatten().collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::ThresholdCrossingExtractor;
    use crate::segment::window::fixtures::window;

    /// Returns the first sample and the sampling rate; fails on NaN.
    struct Echo;

    impl FeatureExtractor for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn dimension(&self) -> usize {
            2
        }

        fn extract(&self, samples: &[f32], rate: f64) -> Result<FeatureVector, FeatureError> {
            let first = samples.first().copied().ok_or(FeatureError::EmptyWindow)?;
            if first.is_nan() {
                return Err(FeatureError::InvalidRate(rate));
            }
            // Uneven work so completion order differs from input order.
            std::thread::sleep(std::time::Duration::from_millis((first as u64 % 3) * 5));
            Ok(vec![first, rate as f32])
        }
    }

    fn windows(n: usize) -> Vec<Window> {
        (0..n)
            .map(|i| {
                let mut w = window("vfdb/418", i % 2 == 0, None, None, 0.0);
                w.samples[0] = i as f32;
                w
            })
            .collect()
    }

    #[test]
    fn results_follow_input_order() {
        let pool = FeaturePool::new(4, Arc::new(Echo)).unwrap();
        let features = pool.run(&windows(25)).unwrap();
        assert_eq!(features.len(), 25);
        for (i, row) in features.iter().enumerate() {
            assert_eq!(row, &vec![i as f32, 250.0]);
        }
    }

    #[test]
    fn one_failure_fails_the_batch() {
        let pool = FeaturePool::new(2, Arc::new(Echo)).unwrap();
        let mut input = windows(6);
        input[3].samples[0] = f32::NAN;
        let err = pool.run(&input).unwrap_err();
        assert!(matches!(err, PoolError::Extraction { index: 3, .. }), "got {err}");
    }

    #[test]
    fn empty_batch_is_empty() {
        let pool = FeaturePool::new(0, Arc::new(ThresholdCrossingExtractor::default())).unwrap();
        assert_eq!(pool.jobs(), 1);
        assert!(pool.run(&[]).unwrap().is_empty());
    }

    #[test]
    fn runs_default_extractor() {
        let pool = FeaturePool::new(3, Arc::new(ThresholdCrossingExtractor::default())).unwrap();
        let features = pool.run(&windows(4)).unwrap();
        assert!(features.iter().all(|row| row.len() == 3));
    }
}
