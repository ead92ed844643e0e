//! Per-window feature extraction.
//!
//! [`FeatureExtractor`] is the capability the dataset builder calls once
//! per window; [`ThresholdCrossingExtractor`] is the default
//! implementation.

mod crossing;
mod extractor;

pub use crossing::{threshold_crossing, ThresholdCrossingExtractor};
pub use extractor::{FeatureError, FeatureExtractor, FeatureVector};
