//! Batch driver: from database names to labelled windows and features.
//!
//! # Architecture
//!
//! ```text
//! DatasetBuilder::load_features(dbs, secs)
//!        │
//!        ├─ CacheStore "features"  ── Hit ──────────────────────▶ FeatureSet
//!        │
//!        └─ load_segments(dbs, secs)
//!              │
//!              ├─ CacheStore "segments" ── Hit ──▶ Dataset
//!              │
//!              └─ load_recordings ─▶ build_dataset ─▶ Dataset ─▶ store
//!                   (RecordLoader)    (CorrectionTable, Segmenter,
//!                                      WindowResampler)
//!        │
//!        └─ FeaturePool::run(windows) ─▶ FeatureSet ─▶ store
//! ```
//!
//! Each stage is cached separately, so a run with only one artifact present
//! recomputes only the missing stage.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use vf_dataset::config::DatasetConfig;
//! use vf_dataset::dataset::DatasetBuilder;
//!
//! let config = DatasetConfig::load().unwrap();
//! let builder = DatasetBuilder::from_config(&config).unwrap();
//! let features = builder
//!     .load_features(&config.dataset.databases, config.segmentation.window_secs)
//!     .unwrap();
//! println!("{:?} features, {} positive", features.shape(), features.n_positive());
//! ```

pub mod builder;
pub mod cache;
pub mod pool;
pub mod summary;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dsp::ResampleError;
use crate::features::FeatureVector;
use crate::record::{CorrectionError, LoadError};
use crate::segment::{SegmentError, Window};

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use builder::DatasetBuilder;
pub use cache::{CacheError, CacheKey, CacheOutcome, CachePayload, CacheStore};
pub use pool::{FeaturePool, PoolError};
pub use summary::{render_summary_csv, write_summary_csv, RecordSummary};

// ---------------------------------------------------------------------------
// DatasetError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum DatasetError {
    /// A record or database listing could not be loaded.
    #[error("cannot load {record}: {source}")]
    Load {
        record: String,
        #[source]
        source: LoadError,
    },

    #[error("cannot segment {record}: {source}")]
    Segment {
        record: String,
        #[source]
        source: SegmentError,
    },

    #[error(transparent)]
    Resample(#[from] ResampleError),

    #[error(transparent)]
    Correction(#[from] CorrectionError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

// ---------------------------------------------------------------------------
// Dataset
// ---------------------------------------------------------------------------

/// All windows of a batch run, resampled to `target_rate`, plus what each
/// record contributed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub window_secs: f64,
    pub target_rate: f64,
    /// One entry per record, in load order.
    pub records: Vec<RecordSummary>,
    /// Windows of all records, in record order then time order.
    pub windows: Vec<Window>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn labels(&self) -> Vec<bool> {
        self.windows.iter().map(Window::label).collect()
    }

    pub fn n_positive(&self) -> usize {
        self.windows.iter().filter(|w| w.label()).count()
    }
}

impl CachePayload for Dataset {
    fn item_count(&self) -> usize {
        self.windows.len()
    }

    fn is_consistent(&self) -> bool {
        let windows: usize = self.records.iter().map(|r| r.n_windows).sum();
        let positive: usize = self.records.iter().map(|r| r.n_positive).sum();
        windows == self.windows.len()
            && positive == self.n_positive()
            && self.records.iter().all(|r| r.n_positive <= r.n_windows)
            && self.windows.iter().all(|w| w.sampling_rate == self.target_rate)
    }
}

// ---------------------------------------------------------------------------
// FeatureSet
// ---------------------------------------------------------------------------

/// Feature matrix and label vector; row `i` of one matches entry `i` of the
/// other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    /// Cache tag of the extractor that produced the rows.
    pub extractor: String,
    pub features: Vec<FeatureVector>,
    pub labels: Vec<bool>,
}

impl FeatureSet {
    /// `(rows, columns)`; columns is 0 for an empty set.
    pub fn shape(&self) -> (usize, usize) {
        (
            self.features.len(),
            self.features.first().map_or(0, Vec::len),
        )
    }

    pub fn n_positive(&self) -> usize {
        self.labels.iter().filter(|&&l| l).count()
    }
}

impl CachePayload for FeatureSet {
    fn item_count(&self) -> usize {
        self.features.len()
    }

    fn is_consistent(&self) -> bool {
        let (_, columns) = self.shape();
        self.features.len() == self.labels.len()
            && self.features.iter().all(|row| row.len() == columns)
    }
}
