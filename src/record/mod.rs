//! Records: one signal channel plus its expert annotations.
//!
//! # Loading
//!
//! ```text
//! RecordLoader (trait) ── WfdbLoader   <root>/<db>/<name>.{hea,dat,atr}
//!                      └─ MemoryLoader in-memory records
//!        │
//!        ▼
//!   Record { signal, annotations } ──▶ CorrectionTable::apply ──▶ Segmenter
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use vf_dataset::record::{RecordLoader, WfdbLoader};
//!
//! let loader = WfdbLoader::new("/data/physionet");
//! for name in loader.list_records("vfdb").unwrap() {
//!     let record = loader.load("vfdb", &name).unwrap();
//!     println!("{}: {:.0} s", record.id(), record.signal.duration_secs());
//! }
//! ```

pub mod annotation;
pub mod codes;
pub mod correction;
pub mod loader;
pub mod signal;
pub mod wfdb;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use annotation::{check_order, Annotation, AnnotationStream, OrderingViolation};
pub use correction::{CorrectionError, CorrectionTable};
pub use loader::{LoadError, MemoryLoader, RecordLoader};
pub use signal::Signal;
pub use wfdb::WfdbLoader;

/// A loaded recording.  Read-only input to the segmenter.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Database the record belongs to (e.g. `"vfdb"`).
    pub database: String,
    /// Record name within the database (e.g. `"418"`).
    pub name: String,
    pub signal: Signal,
    pub annotations: AnnotationStream,
}

impl Record {
    pub fn new(
        database: impl Into<String>,
        name: impl Into<String>,
        signal: Signal,
        annotations: AnnotationStream,
    ) -> Self {
        Self {
            database: database.into(),
            name: name.into(),
            signal,
            annotations,
        }
    }

    /// `"<database>/<name>"`, the key used by corrections and reports.
    pub fn id(&self) -> String {
        format!("{}/{}", self.database, self.name)
    }
}
