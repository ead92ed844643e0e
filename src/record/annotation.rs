//! Time-stamped rhythm events and the ordered stream that carries them.
//!
//! An [`Annotation`] is one event from an expert annotation file: the
//! sample index it refers to, its code mnemonic and an optional rhythm
//! label such as `"(VF"` or `"(N"`.
//!
//! [`AnnotationStream`] is the per-record sequence of annotations.  Its
//! constructor enforces the ordering invariant (timestamps are
//! non-decreasing) so code receiving a stream never has to re-check it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::codes;

// ---------------------------------------------------------------------------
// Annotation
// ---------------------------------------------------------------------------

/// One annotation event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// Sample index the event refers to.
    pub timestamp: usize,
    /// Code mnemonic (`"N"`, `"+"`, `"["`, `"]"`, …).
    pub code: String,
    /// Rhythm label from the aux field; empty when the code alone carries
    /// the meaning.
    pub rhythm_label: String,
}

impl Annotation {
    pub fn new(timestamp: usize, code: impl Into<String>, rhythm_label: impl Into<String>) -> Self {
        Self {
            timestamp,
            code: code.into(),
            rhythm_label: rhythm_label.into(),
        }
    }

    /// A rhythm-change annotation (`"+"`) carrying `label`.
    pub fn rhythm(timestamp: usize, label: impl Into<String>) -> Self {
        Self::new(timestamp, codes::mnemonic(codes::RHYTHM), label)
    }

    /// A beat annotation without aux text.
    pub fn beat(timestamp: usize, code: impl Into<String>) -> Self {
        Self::new(timestamp, code, "")
    }

    /// `true` when the annotation marks a QRS complex.
    pub fn is_beat(&self) -> bool {
        codes::is_beat(&self.code)
    }

    /// `true` when the annotation carries a rhythm label.
    pub fn has_rhythm(&self) -> bool {
        !self.rhythm_label.is_empty()
    }
}

// ---------------------------------------------------------------------------
// OrderingViolation
// ---------------------------------------------------------------------------

/// An annotation appeared before one with a larger timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("annotation {index} at sample {timestamp} precedes the previous one at sample {previous}")]
pub struct OrderingViolation {
    /// Position of the offending annotation in the stream.
    pub index: usize,
    /// Timestamp of the annotation before it.
    pub previous: usize,
    /// Timestamp of the offending annotation.
    pub timestamp: usize,
}

/// Verify that `annotations` are sorted by non-decreasing timestamp.
pub fn check_order(annotations: &[Annotation]) -> Result<(), OrderingViolation> {
    for (index, pair) in annotations.windows(2).enumerate() {
        if pair[1].timestamp < pair[0].timestamp {
            return Err(OrderingViolation {
                index: index + 1,
                previous: pair[0].timestamp,
                timestamp: pair[1].timestamp,
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// AnnotationStream
// ---------------------------------------------------------------------------

/// Annotations of one record in non-decreasing timestamp order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Annotation>", into = "Vec<Annotation>")]
pub struct AnnotationStream(Vec<Annotation>);

impl AnnotationStream {
    /// Wrap `annotations`, rejecting streams that are not sorted.
    ///
    /// ```
    /// use vf_dataset::record::{Annotation, AnnotationStream};
    ///
    /// let ok = AnnotationStream::new(vec![
    ///     Annotation::rhythm(10, "(N"),
    ///     Annotation::rhythm(20, "(VF"),
    /// ]);
    /// assert!(ok.is_ok());
    ///
    /// let bad = AnnotationStream::new(vec![
    ///     Annotation::rhythm(20, "(VF"),
    ///     Annotation::rhythm(10, "(N"),
    /// ]);
    /// assert!(bad.is_err());
    /// ```
    pub fn new(annotations: Vec<Annotation>) -> Result<Self, OrderingViolation> {
        check_order(&annotations)?;
        Ok(Self(annotations))
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Wrap annotations the caller has already kept in order.
    pub(super) fn from_sorted(annotations: Vec<Annotation>) -> Self {
        debug_assert!(check_order(&annotations).is_ok());
        Self(annotations)
    }

    pub fn as_slice(&self) -> &[Annotation] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Annotation> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<Annotation> {
        self.0
    }
}

impl TryFrom<Vec<Annotation>> for AnnotationStream {
    type Error = OrderingViolation;

    fn try_from(annotations: Vec<Annotation>) -> Result<Self, Self::Error> {
        Self::new(annotations)
    }
}

impl From<AnnotationStream> for Vec<Annotation> {
    fn from(stream: AnnotationStream) -> Self {
        stream.0
    }
}

impl<'a> IntoIterator for &'a AnnotationStream {
    type Item = &'a Annotation;
    type IntoIter = std::slice::Iter<'a, Annotation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_timestamps_are_allowed() {
        let stream = AnnotationStream::new(vec![
            Annotation::beat(5, "N"),
            Annotation::rhythm(5, "(VT"),
            Annotation::beat(9, "V"),
        ])
        .expect("sorted");
        assert_eq!(stream.len(), 3);
    }

    #[test]
    fn violation_reports_offending_index() {
        let err = check_order(&[
            Annotation::beat(1, "N"),
            Annotation::beat(7, "N"),
            Annotation::beat(3, "N"),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            OrderingViolation {
                index: 2,
                previous: 7,
                timestamp: 3
            }
        );
    }

    #[test]
    fn rhythm_constructor_uses_plus_code() {
        let ann = Annotation::rhythm(0, "(VF");
        assert_eq!(ann.code, "+");
        assert!(ann.has_rhythm());
        assert!(!ann.is_beat());
    }

    #[test]
    fn deserialising_unsorted_stream_fails() {
        let json = r#"[
            {"timestamp": 9, "code": "N", "rhythm_label": ""},
            {"timestamp": 2, "code": "N", "rhythm_label": ""}
        ]"#;
        assert!(serde_json::from_str::<AnnotationStream>(json).is_err());
    }
}
