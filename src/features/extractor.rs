//! The feature-extraction capability.

use thiserror::Error;

/// Feature values of one window, in the extractor's column order.
pub type FeatureVector = Vec<f32>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    #[error("cannot extract features from an empty window")]
    EmptyWindow,

    #[error("invalid sampling rate: {0} Hz")]
    InvalidRate(f64),
}

/// Maps a window of samples to a fixed-length feature vector.
///
/// Implementations are pure: the same samples and rate always yield the
/// same vector, and no state is shared between calls.  They must be
/// `Send + Sync` so the pool can share one behind an `Arc`.
pub trait FeatureExtractor: Send + Sync {
    /// Short identifier, part of the feature cache key.
    fn name(&self) -> &str;

    /// Identifier including any parameters that change the output.  Feature
    /// caches built with a different tag are not reused.
    fn cache_tag(&self) -> String {
        self.name().to_string()
    }

    /// Length of every vector returned by [`extract`](Self::extract).
    fn dimension(&self) -> usize;

    fn extract(&self, samples: &[f32], sampling_rate: f64) -> Result<FeatureVector, FeatureError>;
}

const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn FeatureExtractor>) {}
};

/// Rejects empty windows and unusable rates before extraction.
pub(crate) fn validate(samples: &[f32], sampling_rate: f64) -> Result<(), FeatureError> {
    if samples.is_empty() {
        return Err(FeatureError::EmptyWindow);
    }
    if !(sampling_rate.is_finite() && sampling_rate > 0.0) {
        return Err(FeatureError::InvalidRate(sampling_rate));
    }
    Ok(())
}
