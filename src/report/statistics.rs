//! Per-rhythm window counts, rendered as a tab-separated table.
//!
//! ```text
//! name    samples cases   description
//! (N      1520    61      Normal sinus rhythm
//! (VF.c   211     27      ventricular fibrillation (coarse)
//!         1731 ECG segments
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::segment::{classify_window, Window};

use super::descriptions::describe;

/// Row name for windows that precede the first rhythm annotation.
pub const UNKNOWN_RHYTHM: &str = "(?";

/// One table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RhythmRow<'a> {
    pub name: &'a str,
    /// Windows with this rhythm.
    pub samples: usize,
    /// Distinct records contributing those windows.
    pub cases: usize,
    pub description: &'a str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RhythmStatistics {
    windows: BTreeMap<String, usize>,
    cases: BTreeMap<String, BTreeSet<String>>,
    total: usize,
}

impl RhythmStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count `window` under its refined rhythm name.
    pub fn add(&mut self, window: &Window) {
        let name = classify_window(window)
            .map_or_else(|| UNKNOWN_RHYTHM.to_string(), |n| n.into_owned());
        self.cases
            .entry(name.clone())
            .or_default()
            .insert(window.record_id.clone());
        *self.windows.entry(name).or_default() += 1;
        self.total += 1;
    }

    pub fn from_windows<'a>(windows: impl IntoIterator<Item = &'a Window>) -> Self {
        let mut stats = Self::new();
        for window in windows {
            stats.add(window);
        }
        stats
    }

    /// Total windows counted.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Rows sorted by rhythm name.
    pub fn rows(&self) -> impl Iterator<Item = RhythmRow<'_>> {
        self.windows.iter().map(|(name, &samples)| RhythmRow {
            name,
            samples,
            cases: self.cases.get(name).map_or(0, BTreeSet::len),
            description: describe(name).unwrap_or(name.as_str()),
        })
    }
}

impl fmt::Display for RhythmStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "name\tsamples\tcases\tdescription")?;
        for row in self.rows() {
            writeln!(
                f,
                "{}\t{}\t{}\t{}",
                row.name, row.samples, row.cases, row.description
            )?;
        }
        writeln!(f, "\t{} ECG segments", self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::window::fixtures::window;

    fn sample_windows() -> Vec<Window> {
        vec![
            window("vfdb/418", true, Some("(VF"), Some(0.5), 0.0),
            window("vfdb/418", true, Some("(VF"), Some(0.2), 0.0),
            window("vfdb/419", true, Some("(VF"), Some(0.9), 0.0),
            window("cudb/cu01", true, Some("(VT"), Some(1.0), 195.0),
            window("mitdb/100", false, Some("(N"), Some(1.0), 72.0),
            window("mitdb/100", false, Some("(N"), Some(1.0), 75.0),
            window("mitdb/100", false, None, Some(1.0), 75.0),
            window("mitdb/101", false, Some("(XYZ"), None, 0.0),
        ]
    }

    #[test]
    fn counts_windows_and_cases_per_refined_rhythm() {
        let stats = RhythmStatistics::from_windows(&sample_windows());
        assert_eq!(stats.total(), 8);

        let rows: Vec<(&str, usize, usize)> =
            stats.rows().map(|r| (r.name, r.samples, r.cases)).collect();
        assert_eq!(
            rows,
            vec![
                ("(?", 1, 1),
                ("(N", 2, 1),
                ("(VF.c", 2, 2),
                ("(VF.f", 1, 1),
                ("(VT.r", 1, 1),
                ("(XYZ", 1, 1),
            ]
        );
    }

    #[test]
    fn renders_tab_separated_table() {
        let stats = RhythmStatistics::from_windows(&sample_windows()[3..5]);
        assert_eq!(
            stats.to_string(),
            "name\tsamples\tcases\tdescription\n\
             (N\t1\t1\tNormal sinus rhythm\n\
             (VT.r\t1\t1\tVentricular tachycardia (rapid)\n\
             \t2 ECG segments\n"
        );
    }

    #[test]
    fn unknown_rhythm_describes_itself() {
        let stats = RhythmStatistics::from_windows(&sample_windows()[7..]);
        let row = stats.rows().next().unwrap();
        assert_eq!(row.description, "(XYZ");
    }

    #[test]
    fn empty_table_has_header_and_total() {
        assert_eq!(
            RhythmStatistics::new().to_string(),
            "name\tsamples\tcases\tdescription\n\t0 ECG segments\n"
        );
    }
}
