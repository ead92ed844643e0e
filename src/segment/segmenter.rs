//! Fixed-window segmentation with causal episode labelling.
//!
//! The signal is cut into `floor(len / window_size)` contiguous windows of
//! `window_size = floor(sampling_rate * window_secs)` samples; the trailing
//! remainder is dropped.  A single cursor walks the annotation stream once:
//! every annotation with `timestamp < end` of the current window is
//! consumed in order, and the cursor stays at the first annotation at or
//! after `end` for the next window.
//!
//! A window is labelled `true` when an episode was active at its first
//! sample or began anywhere inside it.  Annotations stamped exactly at the
//! first sample are applied before that check, so an episode closed at
//! `begin` leaves the window clean.  Ending an episode later in the window
//! does not clear the label.  Labels therefore depend only on annotations
//! up to the window's end.

use thiserror::Error;

use crate::dsp::mean_peak_to_peak;
use crate::record::{check_order, Annotation, OrderingViolation, Record};

use super::episode::{EpisodePolicy, EpisodeState, Transition};
use super::window::Window;

// ---------------------------------------------------------------------------
// SegmentError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SegmentError {
    /// Window duration or sampling rate cannot produce a non-empty window.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The annotation stream is not sorted by timestamp.
    #[error("annotation stream out of order: {0}")]
    OrderingViolation(#[from] OrderingViolation),
}

// ---------------------------------------------------------------------------
// RhythmCoverage
// ---------------------------------------------------------------------------

/// Samples covered by each rhythm label inside one window.
struct RhythmCoverage {
    position: usize,
    current: Option<String>,
    totals: Vec<(String, usize)>,
}

impl RhythmCoverage {
    fn new(begin: usize, current: Option<String>) -> Self {
        Self {
            position: begin,
            current,
            totals: Vec::new(),
        }
    }

    fn change(&mut self, at: usize, label: &str) {
        self.credit(at);
        self.current = Some(label.to_string());
    }

    fn credit(&mut self, until: usize) {
        let span = until.saturating_sub(self.position);
        if let (Some(label), true) = (&self.current, span > 0) {
            match self.totals.iter_mut().find(|(name, _)| name == label) {
                Some((_, total)) => *total += span,
                None => self.totals.push((label.clone(), span)),
            }
        }
        self.position = self.position.max(until);
    }

    /// Close the window at `end`; returns the dominant rhythm (earliest on
    /// ties) and the rhythm in effect for the next window.
    fn finish(mut self, end: usize) -> (Option<String>, Option<String>) {
        self.credit(end);
        let mut dominant: Option<&(String, usize)> = None;
        for entry in &self.totals {
            if dominant.map_or(true, |best| entry.1 > best.1) {
                dominant = Some(entry);
            }
        }
        (dominant.map(|(name, _)| name.clone()), self.current)
    }
}

// ---------------------------------------------------------------------------
// Segmenter
// ---------------------------------------------------------------------------

/// Cuts records into labelled windows.
///
/// ```
/// use vf_dataset::record::Annotation;
/// use vf_dataset::segment::Segmenter;
///
/// let segmenter = Segmenter::new(8.0, 250.0).unwrap();
/// let signal = vec![0.0_f32; 2_000 * 4];
/// let annotations = vec![
///     Annotation::rhythm(0, "(N"),
///     Annotation::rhythm(4_000, "(VF"),
/// ];
///
/// let windows = segmenter.segment("vfdb/418", &signal, &annotations).unwrap();
/// let labels: Vec<bool> = windows.iter().map(|w| w.label()).collect();
/// assert_eq!(labels, vec![false, false, true, true]);
/// ```
#[derive(Debug, Clone)]
pub struct Segmenter {
    window_secs: f64,
    sampling_rate: f64,
    window_size: usize,
    policy: EpisodePolicy,
}

impl Segmenter {
    /// Create a segmenter for `window_secs`-long windows of a signal
    /// sampled at `sampling_rate`.
    ///
    /// # Errors
    ///
    /// [`SegmentError::InvalidConfiguration`] when either value is not a
    /// positive finite number or the window rounds down to zero samples.
    pub fn new(window_secs: f64, sampling_rate: f64) -> Result<Self, SegmentError> {
        if !(window_secs.is_finite() && window_secs > 0.0) {
            return Err(SegmentError::InvalidConfiguration(format!(
                "window duration must be positive, got {window_secs} s"
            )));
        }
        if !(sampling_rate.is_finite() && sampling_rate > 0.0) {
            return Err(SegmentError::InvalidConfiguration(format!(
                "sampling rate must be positive, got {sampling_rate} Hz"
            )));
        }
        let window_size = (sampling_rate * window_secs).floor() as usize;
        if window_size == 0 {
            return Err(SegmentError::InvalidConfiguration(format!(
                "{window_secs} s at {sampling_rate} Hz is shorter than one sample"
            )));
        }

        Ok(Self {
            window_secs,
            sampling_rate,
            window_size,
            policy: EpisodePolicy::default(),
        })
    }

    /// Replace the default episode codes and prefix.
    pub fn with_policy(mut self, policy: EpisodePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Samples per window.
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn window_secs(&self) -> f64 {
        self.window_secs
    }

    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    /// Number of windows a signal of `len` samples yields.
    pub fn window_count(&self, len: usize) -> usize {
        len / self.window_size
    }

    /// Segment `samples` using `annotations`, which must be sorted by
    /// timestamp.
    pub fn segment(
        &self,
        record_id: &str,
        samples: &[f32],
        annotations: &[Annotation],
    ) -> Result<Vec<Window>, SegmentError> {
        check_order(annotations)?;

        let n_windows = self.window_count(samples.len());
        let actual_secs = self.window_size as f64 / self.sampling_rate;
        let amplitude_block = self.sampling_rate.round() as usize;

        let mut windows = Vec::with_capacity(n_windows);
        let mut episode = EpisodeState::default();
        let mut rhythm: Option<String> = None;
        let mut next = 0;

        for i in 0..n_windows {
            let begin = i * self.window_size;
            let end = begin + self.window_size;

            let mut label = false;
            let mut settled = false;
            let mut coverage = RhythmCoverage::new(begin, rhythm.take());
            let mut beats = 0usize;

            while let Some(ann) = annotations.get(next) {
                if ann.timestamp >= end {
                    break;
                }
                // An episode still open at the first sample taints the window.
                if !settled && ann.timestamp > begin {
                    label |= episode.is_active();
                    settled = true;
                }
                let (state, transition) =
                    episode.advance(&ann.code, &ann.rhythm_label, &self.policy);
                episode = state;
                if transition == Transition::Began {
                    label = true;
                }
                if ann.has_rhythm() {
                    coverage.change(ann.timestamp, &ann.rhythm_label);
                }
                if ann.is_beat() {
                    beats += 1;
                }
                next += 1;
            }
            if !settled {
                label |= episode.is_active();
            }

            let (rhythm_name, current) = coverage.finish(end);
            rhythm = current;

            let body = &samples[begin..end];
            windows.push(Window {
                record_id: record_id.to_string(),
                begin_sample: begin,
                duration_samples: self.window_size,
                samples: body.to_vec(),
                sampling_rate: self.sampling_rate,
                label,
                rhythm_name,
                amplitude: mean_peak_to_peak(body, amplitude_block),
                heart_rate: beats as f64 * 60.0 / actual_secs,
            });
        }

        Ok(windows)
    }

    /// Segment a loaded record.
    pub fn segment_record(&self, record: &Record) -> Result<Vec<Window>, SegmentError> {
        self.segment(
            &record.id(),
            &record.signal.samples,
            record.annotations.as_slice(),
        )
    }
}

/// Segment `samples` into `window_secs` windows at `sampling_rate`.
///
/// Shorthand for [`Segmenter::new`] followed by [`Segmenter::segment`].
pub fn segment(
    record_id: &str,
    samples: &[f32],
    annotations: &[Annotation],
    window_secs: f64,
    sampling_rate: f64,
) -> Result<Vec<Window>, SegmentError> {
    Segmenter::new(window_secs, sampling_rate)?.segment(record_id, samples, annotations)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
