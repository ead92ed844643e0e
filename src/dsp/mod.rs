//! Signal-processing helpers shared by the segmenter and the dataset
//! builder.
//!
//! - [`resample`] / [`WindowResampler`]: bring a window to the target rate.
//! - [`mean_peak_to_peak`]: amplitude measure used to split coarse and
//!   fine fibrillation.

pub mod amplitude;
pub mod resample;

pub use amplitude::mean_peak_to_peak;
pub use resample::{resample, resampled_len, ResampleError, ResampleMethod, WindowResampler};
