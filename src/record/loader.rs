//! The record-loading capability.
//!
//! [`RecordLoader`] is the only thing the dataset builder knows about
//! storage.  [`WfdbLoader`](super::WfdbLoader) reads PhysioNet files;
//! [`MemoryLoader`] serves records that were built in memory.

use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;

use super::{AnnotationStream, OrderingViolation, Record, Signal};

// ---------------------------------------------------------------------------
// LoadError
// ---------------------------------------------------------------------------

/// Reasons a record could not be loaded.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The database directory or one of the record's files does not exist.
    #[error("missing file: {}", .0.display())]
    MissingFile(PathBuf),

    /// The header file could not be parsed.
    #[error("bad header {}: {reason}", path.display())]
    Header { path: PathBuf, reason: String },

    /// The signal file is truncated or uses an unsupported format.
    #[error("bad signal file {}: {reason}", path.display())]
    Signal { path: PathBuf, reason: String },

    /// The annotation file is corrupt.
    #[error("bad annotation file {}: {reason}", path.display())]
    Annotation { path: PathBuf, reason: String },

    /// Annotations on disk are not in timestamp order.
    #[error("annotations of {record} are out of order: {source}")]
    Ordering {
        record: String,
        #[source]
        source: OrderingViolation,
    },

    /// The record is unknown to the loader.
    #[error("unknown record {0}")]
    UnknownRecord(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// RecordLoader
// ---------------------------------------------------------------------------

/// Source of records, one implementation per storage backend.
///
/// Implementations must be `Send + Sync` so the builder can hold them
/// behind an `Arc<dyn RecordLoader>`.
pub trait RecordLoader: Send + Sync {
    /// Names of all records in `database`, sorted.
    fn list_records(&self, database: &str) -> Result<Vec<String>, LoadError>;

    /// Load the first signal channel and the annotation stream of
    /// `database/record`.
    fn load(&self, database: &str, record: &str) -> Result<Record, LoadError>;
}

const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn RecordLoader>) {}
};

// ---------------------------------------------------------------------------
// MemoryLoader
// ---------------------------------------------------------------------------

/// Loader backed by records held in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryLoader {
    records: BTreeMap<(String, String), (Signal, AnnotationStream)>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a record, replacing any previous one with the same name.
    pub fn insert(
        &mut self,
        database: impl Into<String>,
        record: impl Into<String>,
        signal: Signal,
        annotations: AnnotationStream,
    ) {
        self.records
            .insert((database.into(), record.into()), (signal, annotations));
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_record(
        mut self,
        database: impl Into<String>,
        record: impl Into<String>,
        signal: Signal,
        annotations: AnnotationStream,
    ) -> Self {
        self.insert(database, record, signal, annotations);
        self
    }
}

impl RecordLoader for MemoryLoader {
    fn list_records(&self, database: &str) -> Result<Vec<String>, LoadError> {
        let names: Vec<String> = self
            .records
            .keys()
            .filter(|(db, _)| db == database)
            .map(|(_, name)| name.clone())
            .collect();
        if names.is_empty() {
            return Err(LoadError::MissingFile(PathBuf::from(database)));
        }
        Ok(names)
    }

    fn load(&self, database: &str, record: &str) -> Result<Record, LoadError> {
        let (signal, annotations) = self
            .records
            .get(&(database.to_string(), record.to_string()))
            .ok_or_else(|| LoadError::UnknownRecord(format!("{database}/{record}")))?;
        Ok(Record::new(database, record, signal.clone(), annotations.clone()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Annotation;

    fn loader() -> MemoryLoader {
        let anns = AnnotationStream::new(vec![Annotation::rhythm(0, "(N")]).unwrap();
        MemoryLoader::new()
            .with_record("vfdb", "422", Signal::new(vec![0.0; 10], 250.0), anns.clone())
            .with_record("vfdb", "418", Signal::new(vec![0.0; 10], 250.0), anns.clone())
            .with_record("mitdb", "100", Signal::new(vec![0.0; 10], 360.0), anns)
    }

    #[test]
    fn lists_records_sorted_per_database() {
        let names = loader().list_records("vfdb").unwrap();
        assert_eq!(names, vec!["418".to_string(), "422".to_string()]);
    }

    #[test]
    fn unknown_database_is_missing() {
        assert!(matches!(
            loader().list_records("cudb"),
            Err(LoadError::MissingFile(_))
        ));
    }

    #[test]
    fn load_returns_named_record() {
        let record = loader().load("mitdb", "100").unwrap();
        assert_eq!(record.id(), "mitdb/100");
        assert_eq!(record.signal.sampling_rate, 360.0);
        assert_eq!(record.annotations.len(), 1);
    }

    #[test]
    fn unknown_record_is_an_error() {
        assert!(matches!(
            loader().load("mitdb", "999"),
            Err(LoadError::UnknownRecord(name)) if name == "mitdb/999"
        ));
    }
}
