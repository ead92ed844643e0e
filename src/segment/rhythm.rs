//! Sub-classification of fibrillation and tachycardia windows.
//!
//! `(VF` windows split into coarse and fine by amplitude; `(VT` windows
//! split into rapid, slow and other by heart rate.  All other rhythm names
//! pass through unchanged.

use std::borrow::Cow;

use super::window::Window;

/// Peak-to-peak amplitude (mV) above which fibrillation counts as coarse.
pub const COARSE_VF_THRESHOLD: f32 = 0.2;

/// Heart rate (bpm) above which tachycardia counts as rapid.
pub const RAPID_VT_BPM: f64 = 180.0;

/// Refine `rhythm` using the window's amplitude and heart rate.
///
/// ```
/// use vf_dataset::segment::refine_rhythm;
///
/// assert_eq!(refine_rhythm("(VF", Some(0.35), 0.0), "(VF.c");
/// assert_eq!(refine_rhythm("(VF", Some(0.2), 0.0), "(VF.f");
/// assert_eq!(refine_rhythm("(VT", None, 200.0), "(VT.r");
/// assert_eq!(refine_rhythm("(N", None, 72.0), "(N");
/// ```
pub fn refine_rhythm(rhythm: &str, amplitude: Option<f32>, heart_rate: f64) -> Cow<'_, str> {
    match rhythm {
        "(VF" => {
            // An empty window has no amplitude and is never coarse.
            let coarse = amplitude.is_some_and(|a| a > COARSE_VF_THRESHOLD);
            Cow::Borrowed(if coarse { "(VF.c" } else { "(VF.f" })
        }
        "(VT" => Cow::Borrowed(if heart_rate == 0.0 {
            "(VT.o"
        } else if heart_rate > RAPID_VT_BPM {
            "(VT.r"
        } else {
            "(VT.s"
        }),
        other => Cow::Borrowed(other),
    }
}

/// Refined rhythm name of `window`, or `None` if no rhythm was annotated.
pub fn classify_window(window: &Window) -> Option<Cow<'_, str>> {
    window
        .rhythm_name
        .as_deref()
        .map(|rhythm| refine_rhythm(rhythm, window.amplitude, window.heart_rate))
}
