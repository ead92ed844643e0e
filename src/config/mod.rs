//! Configuration for dataset builds.
//!
//! Provides `DatasetConfig` (top-level settings) with one sub-config per
//! stage, `DataPaths` for platform directories, and TOML persistence via
//! `DatasetConfig::load` / `DatasetConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::DataPaths;
pub use settings::{DatasetConfig, DatasetSection, FeatureConfig, SegmentationConfig};
