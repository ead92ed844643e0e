//! Dataset settings, defaults and TOML persistence.
//!
//! Every section is `#[serde(default)]`, so a settings file only needs the
//! keys it changes:
//!
//! ```toml
//! [dataset]
//! databases = ["vfdb", "cudb"]
//!
//! [segmentation]
//! resample_method = "sinc"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::DataPaths;
use crate::dsp::ResampleMethod;

// ---------------------------------------------------------------------------
// DatasetSection
// ---------------------------------------------------------------------------

/// Which records to load and where intermediate artifacts go.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetSection {
    /// Databases to include, in load order.
    pub databases: Vec<String>,
    /// Directory containing `<db>/<record>.{hea,dat,atr}`.
    pub database_root: PathBuf,
    pub cache_dir: PathBuf,
    /// Read and write the segment and feature caches.
    pub use_cache: bool,
    /// Optional rhythm-label override file.
    pub correction_file: Option<PathBuf>,
    /// Log and skip records that fail to load instead of aborting.
    pub skip_failed_records: bool,
}

impl Default for DatasetSection {
    fn default() -> Self {
        let paths = DataPaths::new();
        Self {
            databases: vec!["mitdb".into(), "vfdb".into(), "cudb".into()],
            database_root: paths.database_root,
            cache_dir: paths.cache_dir,
            use_cache: true,
            correction_file: None,
            skip_failed_records: false,
        }
    }
}

// ---------------------------------------------------------------------------
// SegmentationConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Window duration in seconds.
    pub window_secs: f64,
    /// Rate every window is resampled to, in Hz.
    pub target_rate: f64,
    pub resample_method: ResampleMethod,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            window_secs: 8.0,
            target_rate: 360.0,
            resample_method: ResampleMethod::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// FeatureConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Worker threads for feature extraction.
    pub jobs: usize,
    /// Threshold on the min-max normalised window.
    pub crossing_threshold: f32,
    /// Block length for crossing counts, in seconds.
    pub crossing_block_secs: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            jobs: 4,
            crossing_threshold: 0.2,
            crossing_block_secs: 3.0,
        }
    }
}

// ---------------------------------------------------------------------------
// DatasetConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level configuration, serialised as `settings.toml`.
///
/// ```rust,no_run
/// use vf_dataset::config::DatasetConfig;
///
/// // Defaults when the file is missing
/// let mut config = DatasetConfig::load().unwrap();
/// config.segmentation.window_secs = 4.0;
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub dataset: DatasetSection,
    pub segmentation: SegmentationConfig,
    pub features: FeatureConfig,
}

impl DatasetConfig {
    /// Load from the platform `settings.toml`, or defaults if it does not
    /// exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&DataPaths::new().settings_file)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Save to the platform `settings.toml`, creating parent directories.
    pub fn save(&self) -> Result<()> {
        self.save_to(&DataPaths::new().settings_file)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = DatasetConfig::default();
        original.save_to(&path).expect("save");
        let loaded = DatasetConfig::load_from(&path).expect("load");

        assert_eq!(original, loaded);
    }

    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = DatasetConfig::load_from(&path).expect("should not error");
        assert_eq!(config, DatasetConfig::default());
    }

    #[test]
    fn default_values() {
        let cfg = DatasetConfig::default();

        assert_eq!(cfg.dataset.databases, vec!["mitdb", "vfdb", "cudb"]);
        assert!(cfg.dataset.use_cache);
        assert!(cfg.dataset.correction_file.is_none());
        assert!(!cfg.dataset.skip_failed_records);
        assert_eq!(cfg.segmentation.window_secs, 8.0);
        assert_eq!(cfg.segmentation.target_rate, 360.0);
        assert_eq!(cfg.segmentation.resample_method, ResampleMethod::Fourier);
        assert_eq!(cfg.features.jobs, 4);
        assert_eq!(cfg.features.crossing_threshold, 0.2);
        assert_eq!(cfg.features.crossing_block_secs, 3.0);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("partial.toml");
        std::fs::write(
            &path,
            "[dataset]\ndatabases = [\"vfdb\"]\n\n[segmentation]\nresample_method = \"sinc\"\n",
        )
        .unwrap();

        let cfg = DatasetConfig::load_from(&path).expect("load");
        assert_eq!(cfg.dataset.databases, vec!["vfdb"]);
        assert_eq!(cfg.segmentation.resample_method, ResampleMethod::Sinc);
        assert_eq!(cfg.segmentation.window_secs, 8.0);
        assert_eq!(cfg.features.jobs, 4);
    }

    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = DatasetConfig::default();
        cfg.dataset.correction_file = Some(PathBuf::from("/tmp/corrections.txt"));
        cfg.dataset.use_cache = false;
        cfg.segmentation.window_secs = 5.0;
        cfg.segmentation.resample_method = ResampleMethod::Sinc;
        cfg.features.jobs = 12;

        cfg.save_to(&path).expect("save");
        let loaded = DatasetConfig::load_from(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[segmentation]\nwindow_secs = \"eight\"\n").unwrap();
        assert!(DatasetConfig::load_from(&path).is_err());
    }
}
