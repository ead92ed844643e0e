//! The labelled window produced by the segmenter.

use serde::{Deserialize, Serialize};

/// A fixed-length, non-overlapping slice of a record with its label.
///
/// `begin_sample` and `duration_samples` are in the record's native
/// sample indices; `samples` is at `sampling_rate`, which differs from the
/// native rate once the window has been resampled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Window {
    /// `"<db>/<record>"` of the source record.
    pub record_id: String,
    pub begin_sample: usize,
    pub duration_samples: usize,
    pub samples: Vec<f32>,
    pub sampling_rate: f64,
    /// Whether a dangerous-rhythm episode overlaps the window.
    pub(crate) label: bool,
    /// Rhythm label covering most of the window, if any was annotated yet.
    pub rhythm_name: Option<String>,
    /// Mean peak-to-peak amplitude (mV) over 1 s blocks at native rate.
    pub amplitude: Option<f32>,
    /// Beats per minute from beat annotations inside the window; 0 when
    /// none were annotated.
    pub heart_rate: f64,
}

impl Window {
    /// The immutable window label.
    pub fn label(&self) -> bool {
        self.label
    }

    /// One past the last native sample index covered by the window.
    pub fn end_sample(&self) -> usize {
        self.begin_sample + self.duration_samples
    }

    /// Duration of `samples` in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sampling_rate
    }

    /// Database part of `record_id`.
    pub fn database(&self) -> &str {
        self.record_id
            .split_once('/')
            .map_or(self.record_id.as_str(), |(db, _)| db)
    }

    /// Replace the samples with a resampled copy at `sampling_rate`.
    pub fn with_samples(self, samples: Vec<f32>, sampling_rate: f64) -> Self {
        Self {
            samples,
            sampling_rate,
            ..self
        }
    }
}
