//! Dangerous-rhythm episode tracking.
//!
//! The segmenter threads an [`EpisodeState`] through its fold over the
//! annotation stream.  Each annotation may open or close an episode:
//!
//! ```text
//!            code == start_code  OR  label starts with prefix
//! Outside ───────────────────────────────────────────────────▶ Inside
//!         ◀───────────────────────────────────────────────────
//!            code == end_code  OR  label does NOT start with prefix
//! ```
//!
//! Note that while inside an episode any annotation without a dangerous
//! rhythm label closes it, including beat annotations whose label is empty.

/// Codes and prefix that define an episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodePolicy {
    /// Code that opens an episode regardless of its label.
    pub start_code: String,
    /// Code that closes an episode regardless of its label.
    pub end_code: String,
    /// Rhythm-label prefix of dangerous rhythms.
    pub dangerous_prefix: String,
}

impl Default for EpisodePolicy {
    fn default() -> Self {
        Self {
            start_code: "[".into(),
            end_code: "]".into(),
            dangerous_prefix: "(V".into(),
        }
    }
}

/// What consuming one annotation did to the episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Began,
    Ended,
    Unchanged,
}

/// Whether the recording is currently inside an episode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EpisodeState {
    active: bool,
}

impl EpisodeState {
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Consume one annotation and return the next state.
    pub fn advance(
        self,
        code: &str,
        rhythm_label: &str,
        policy: &EpisodePolicy,
    ) -> (Self, Transition) {
        let dangerous = rhythm_label.starts_with(policy.dangerous_prefix.as_str());
        if self.active {
            if code == policy.end_code || !dangerous {
                return (Self { active: false }, Transition::Ended);
            }
        } else if code == policy.start_code || dangerous {
            return (Self { active: true }, Transition::Began);
        }
        (self, Transition::Unchanged)
    }
}
