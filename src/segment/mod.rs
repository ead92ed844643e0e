//! Segmentation of records into labelled fixed-length windows.
//!
//! ```text
//!  Record ──▶ Segmenter ──▶ Vec<Window> ──▶ classify_window
//!             │  cursor over AnnotationStream
//!             │  EpisodeState threaded through the fold
//!             ▼
//!        label, rhythm_name, amplitude, heart_rate
//! ```
//!
//! # Quick start
//!
//! ```
//! use vf_dataset::record::Annotation;
//! use vf_dataset::segment::segment;
//!
//! let signal = vec![0.0_f32; 250 * 8 * 3];
//! let annotations = vec![Annotation::new(2_000, "[", ""), Annotation::new(4_000, "]", "")];
//! let windows = segment("vfdb/418", &signal, &annotations, 8.0, 250.0).unwrap();
//! assert_eq!(windows.len(), 3);
//! assert!(windows[1].label());
//! assert!(!windows[2].label());
//! ```

mod episode;
mod rhythm;
mod segmenter;
pub(crate) mod window;

pub use episode::{EpisodePolicy, EpisodeState, Transition};
pub use rhythm::{classify_window, refine_rhythm, COARSE_VF_THRESHOLD, RAPID_VT_BPM};
pub use segmenter::{segment, SegmentError, Segmenter};
pub use window::Window;
