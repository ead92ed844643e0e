//! Labelled ECG windows for ventricular-arrhythmia detection.
//!
//! Turns PhysioNet recordings with expert rhythm annotations into
//! fixed-length windows labelled "contains VF/VT", resampled to a common
//! rate, and into per-window feature vectors.
//!
//! ```text
//! record ─▶ segment ─▶ dsp (resample) ─▶ features ─▶ dataset (cache)
//!                                                       │
//!                                                 report (stats)
//! ```

pub mod config;
pub mod dataset;
pub mod dsp;
pub mod features;
pub mod record;
pub mod report;
pub mod segment;

pub use dataset::{Dataset, DatasetBuilder, DatasetError, FeatureSet};
pub use record::{Annotation, AnnotationStream, Record, RecordLoader};
pub use segment::{segment, Segmenter, Window};
