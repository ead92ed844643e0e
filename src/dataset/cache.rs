//! On-disk caches for segments and features.
//!
//! Each artifact is a JSON envelope:
//!
//! ```text
//! { "format_version": 1, "key": {…}, "item_count": N, "payload": {…} }
//! ```
//!
//! written to a temporary file in the cache directory and atomically
//! renamed into place, so a reader sees either a complete artifact or none.
//! Reads report one of three outcomes:
//!
//! | outcome   | meaning                                                    |
//! |-----------|------------------------------------------------------------|
//! | `Hit`     | envelope parsed, key and counts match                      |
//! | `Miss`    | no artifact for this key                                   |
//! | `Corrupt` | artifact present but unreadable or inconsistent; removed   |

use std::collections::hash_map::DefaultHasher;
use std::fs::File;
use std::hash::{Hash, Hasher};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::dsp::ResampleMethod;

const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Errors and outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot encode cache artifact: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Result of reading one artifact.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheOutcome<T> {
    Hit(T),
    Miss,
    /// The artifact existed but could not be trusted.
    Corrupt(String),
}

impl<T> CacheOutcome<T> {
    pub fn hit(self) -> Option<T> {
        match self {
            CacheOutcome::Hit(value) => Some(value),
            _ => None,
        }
    }
}

/// Self-check applied to a payload after it has been decoded.
pub trait CachePayload {
    /// Number of items, compared against the envelope's `item_count`.
    fn item_count(&self) -> usize;

    /// Internal invariants hold (parallel arrays agree, totals add up).
    fn is_consistent(&self) -> bool;
}

// ---------------------------------------------------------------------------
// CacheKey
// ---------------------------------------------------------------------------

/// Everything the cached content depends on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheKey {
    /// Sorted, without duplicates.
    pub databases: Vec<String>,
    pub window_secs: f64,
    pub target_rate: f64,
    pub resample_method: ResampleMethod,
    pub correction_fingerprint: u64,
    /// Feature extractor tag; `None` for the segment stage.
    pub extractor: Option<String>,
}

impl CacheKey {
    pub fn new(
        databases: &[String],
        window_secs: f64,
        target_rate: f64,
        resample_method: ResampleMethod,
        correction_fingerprint: u64,
    ) -> Self {
        let mut databases = databases.to_vec();
        databases.sort();
        databases.dedup();
        Self {
            databases,
            window_secs,
            target_rate,
            resample_method,
            correction_fingerprint,
            extractor: None,
        }
    }

    /// The key of the feature stage built on top of this one.
    pub fn with_extractor(&self, tag: impl Into<String>) -> Self {
        Self {
            extractor: Some(tag.into()),
            ..self.clone()
        }
    }

    /// File-name-safe digest of the key.
    pub fn digest(&self) -> String {
        let mut hasher = DefaultHasher::new();
        self.databases.hash(&mut hasher);
        self.window_secs.to_bits().hash(&mut hasher);
        self.target_rate.to_bits().hash(&mut hasher);
        self.resample_method.hash(&mut hasher);
        self.correction_fingerprint.hash(&mut hasher);
        self.extractor.hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    format_version: u32,
    key: &'a CacheKey,
    item_count: usize,
    payload: &'a T,
}

#[derive(Deserialize)]
struct Envelope<T> {
    format_version: u32,
    key: CacheKey,
    item_count: usize,
    payload: T,
}

// ---------------------------------------------------------------------------
// CacheStore
// ---------------------------------------------------------------------------

/// A directory of cache artifacts.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the `stage` artifact for `key`.
    pub fn path_for(&self, stage: &str, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{stage}-{}.json", key.digest()))
    }

    /// Read the `stage` artifact for `key`.  A corrupt artifact is deleted
    /// so the next write starts clean.
    pub fn load<T>(&self, stage: &str, key: &CacheKey) -> CacheOutcome<T>
    where
        T: DeserializeOwned + CachePayload,
    {
        let path = self.path_for(stage, key);
        let outcome: CacheOutcome<T> = Self::read(&path, key);
        match &outcome {
            CacheOutcome::Hit(payload) => {
                log::info!(
                    "cache: {stage} hit ({} items) {}",
                    payload.item_count(),
                    path.display()
                );
            }
            CacheOutcome::Miss => log::debug!("cache: {stage} miss {}", path.display()),
            CacheOutcome::Corrupt(reason) => {
                log::warn!("cache: discarding {}: {reason}", path.display());
                if let Err(e) = std::fs::remove_file(&path) {
                    log::warn!("cache: cannot remove {}: {e}", path.display());
                }
            }
        }
        outcome
    }

    fn read<T>(path: &Path, key: &CacheKey) -> CacheOutcome<T>
    where
        T: DeserializeOwned + CachePayload,
    {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return CacheOutcome::Miss,
            Err(e) => return CacheOutcome::Corrupt(format!("unreadable: {e}")),
        };

        let envelope: Envelope<T> = match serde_json::from_reader(BufReader::new(file)) {
            Ok(envelope) => envelope,
            Err(e) => return CacheOutcome::Corrupt(format!("undecodable: {e}")),
        };

        if envelope.format_version != FORMAT_VERSION {
            return CacheOutcome::Corrupt(format!(
                "format version {} (expected {FORMAT_VERSION})",
                envelope.format_version
            ));
        }
        if envelope.key != *key {
            return CacheOutcome::Corrupt("key mismatch".into());
        }
        let actual = envelope.payload.item_count();
        if envelope.item_count != actual {
            return CacheOutcome::Corrupt(format!(
                "{actual} items, envelope says {}",
                envelope.item_count
            ));
        }
        if !envelope.payload.is_consistent() {
            return CacheOutcome::Corrupt("inconsistent payload".into());
        }
        CacheOutcome::Hit(envelope.payload)
    }

    /// Atomically write the `stage` artifact for `key`.
    pub fn store<T>(&self, stage: &str, key: &CacheKey, payload: &T) -> Result<PathBuf, CacheError>
    where
        T: Serialize + CachePayload,
    {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(stage, key);

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer(
                &mut writer,
                &EnvelopeRef {
                    format_version: FORMAT_VERSION,
                    key,
                    item_count: payload.item_count(),
                    payload,
                },
            )?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| CacheError::Io(e.error))?;

        log::info!(
            "cache: wrote {stage} ({} items) {}",
            payload.item_count(),
            path.display()
        );
        Ok(path)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Pairs {
        left: Vec<u32>,
        right: Vec<u32>,
    }

    impl CachePayload for Pairs {
        fn item_count(&self) -> usize {
            self.left.len()
        }

        fn is_consistent(&self) -> bool {
            self.left.len() == self.right.len()
        }
    }

    fn key() -> CacheKey {
        CacheKey::new(
            &["vfdb".into(), "mitdb".into()],
            8.0,
            360.0,
            ResampleMethod::Fourier,
            0,
        )
    }

    fn pairs() -> Pairs {
        Pairs {
            left: vec![1, 2, 3],
            right: vec![4, 5, 6],
        }
    }

    #[test]
    fn missing_artifact_is_a_miss() {
        let dir = tempdir().expect("temp dir");
        let store = CacheStore::new(dir.path());
        assert_eq!(store.load::<Pairs>("segments", &key()), CacheOutcome::Miss);
    }

    #[test]
    fn stored_artifact_is_a_hit() {
        let dir = tempdir().expect("temp dir");
        let store = CacheStore::new(dir.path().join("nested"));
        store.store("segments", &key(), &pairs()).unwrap();
        assert_eq!(
            store.load::<Pairs>("segments", &key()),
            CacheOutcome::Hit(pairs())
        );
    }

    #[test]
    fn database_order_does_not_change_key() {
        let a = CacheKey::new(
            &["vfdb".into(), "mitdb".into()],
            8.0,
            360.0,
            ResampleMethod::Fourier,
            0,
        );
        let b = CacheKey::new(
            &["mitdb".into(), "vfdb".into(), "vfdb".into()],
            8.0,
            360.0,
            ResampleMethod::Fourier,
            0,
        );
        assert_eq!(a, b);
        assert_eq!(a.digest(), b.digest());
    }

    #[test]
    fn stages_and_parameters_use_distinct_files() {
        let store = CacheStore::new("/tmp/cache");
        let segments = key();
        let features = segments.with_extractor("threshold-crossing");
        let other_window = CacheKey::new(&["vfdb".into()], 5.0, 360.0, ResampleMethod::Fourier, 0);
        assert_ne!(store.path_for("x", &segments), store.path_for("x", &features));
        assert_ne!(segments.digest(), other_window.digest());
        assert_ne!(store.path_for("segments", &segments), store.path_for("features", &segments));
    }

    #[test]
    fn truncated_artifact_is_corrupt_and_removed() {
        let dir = tempdir().expect("temp dir");
        let store = CacheStore::new(dir.path());
        let path = store.store("segments", &key(), &pairs()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, &text[..text.len() / 2]).unwrap();

        assert!(matches!(
            store.load::<Pairs>("segments", &key()),
            CacheOutcome::Corrupt(_)
        ));
        assert!(!path.exists());
        assert_eq!(store.load::<Pairs>("segments", &key()), CacheOutcome::Miss);
    }

    #[test]
    fn item_count_mismatch_is_corrupt() {
        let dir = tempdir().expect("temp dir");
        let store = CacheStore::new(dir.path());
        let path = store.store("segments", &key(), &pairs()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, text.replace("\"item_count\":3", "\"item_count\":4")).unwrap();

        assert!(matches!(
            store.load::<Pairs>("segments", &key()),
            CacheOutcome::Corrupt(_)
        ));
    }

    #[test]
    fn inconsistent_payload_is_corrupt() {
        let dir = tempdir().expect("temp dir");
        let store = CacheStore::new(dir.path());
        let bad = Pairs {
            left: vec![1, 2],
            right: vec![1],
        };
        store.store("features", &key(), &bad).unwrap();
        assert!(matches!(
            store.load::<Pairs>("features", &key()),
            CacheOutcome::Corrupt(_)
        ));
    }

    #[test]
    fn no_temporary_files_left_behind() {
        let dir = tempdir().expect("temp dir");
        let store = CacheStore::new(dir.path());
        store.store("segments", &key(), &pairs()).unwrap();
        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }
}
