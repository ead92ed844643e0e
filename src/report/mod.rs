//! Rhythm statistics over a dataset's windows.

mod descriptions;
mod statistics;

pub use descriptions::describe;
pub use statistics::{RhythmRow, RhythmStatistics, UNKNOWN_RHYTHM};
