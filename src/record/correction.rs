//! Manual overrides for mislabelled rhythm annotations.
//!
//! A correction file is plain text, one entry per line:
//!
//! ```text
//! # record       sample   label
//! vfdb/418       102345   (VF
//! cudb/cu01      0        (N
//! ```
//!
//! Blank lines and `#` comments are ignored.  Applying the table to a
//! record replaces the rhythm label of every annotation at the given
//! sample; when no annotation exists there, a rhythm-change annotation is
//! inserted so the segmenter sees the corrected rhythm from that sample on.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::path::Path;

use thiserror::Error;

use super::{Annotation, AnnotationStream};

#[derive(Debug, Error)]
pub enum CorrectionError {
    #[error("cannot read correction file: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },
}

/// Rhythm-label overrides keyed by record id (`"<db>/<record>"`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrectionTable {
    entries: BTreeMap<String, BTreeMap<usize, String>>,
}

impl CorrectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and parse a correction file.
    pub fn load(path: &Path) -> Result<Self, CorrectionError> {
        let text = std::fs::read_to_string(path)?;
        let table = Self::parse(&text)?;
        log::info!(
            "corrections: {} overrides loaded from {}",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    /// Parse correction entries from `text`.  Later entries for the same
    /// record and sample replace earlier ones.
    pub fn parse(text: &str) -> Result<Self, CorrectionError> {
        let mut table = Self::new();
        for (i, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let parse_error = |reason: String| CorrectionError::Parse {
                line: i + 1,
                reason,
            };

            let fields: Vec<&str> = line.split_whitespace().collect();
            let [record_id, sample, label] = fields[..] else {
                return Err(parse_error(format!(
                    "expected `<db>/<record> <sample> <label>`, got {line:?}"
                )));
            };
            if !record_id.contains('/') {
                return Err(parse_error(format!(
                    "record {record_id:?} is not of the form <db>/<record>"
                )));
            }
            let sample: usize = sample
                .parse()
                .map_err(|_| parse_error(format!("invalid sample index {sample:?}")))?;

            table.insert(record_id, sample, label);
        }
        Ok(table)
    }

    pub fn insert(&mut self, record_id: &str, sample: usize, label: &str) {
        self.entries
            .entry(record_id.to_string())
            .or_default()
            .insert(sample, label.to_string());
    }

    /// Number of overrides across all records.
    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply the overrides for `record_id` to `stream`.
    pub fn apply(&self, record_id: &str, stream: AnnotationStream) -> AnnotationStream {
        let Some(overrides) = self.entries.get(record_id) else {
            return stream;
        };

        let mut annotations = stream.into_inner();
        for (&sample, label) in overrides {
            let start = annotations.partition_point(|a| a.timestamp < sample);
            let end = annotations.partition_point(|a| a.timestamp <= sample);
            if start == end {
                annotations.insert(start, Annotation::rhythm(sample, label.clone()));
            } else {
                for ann in &mut annotations[start..end] {
                    ann.rhythm_label = label.clone();
                }
            }
        }
        log::debug!(
            "corrections: applied {} overrides to {record_id}",
            overrides.len()
        );
        AnnotationStream::from_sorted(annotations)
    }

    /// Stable-per-build digest of the table, used in cache keys so that
    /// editing the file invalidates cached segments.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.entries.hash(&mut hasher);
        hasher.finish()
    }
}
