//! Per-record summaries and the `summary.csv` report.

use std::fmt::Write as _;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// What one record contributed to a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSummary {
    pub database: String,
    pub record: String,
    /// Native sampling rate in Hz.
    pub sampling_rate: f64,
    pub n_samples: usize,
    pub n_annotations: usize,
    pub n_windows: usize,
    /// Windows labelled as containing a dangerous rhythm.
    pub n_positive: usize,
}

impl RecordSummary {
    pub fn n_negative(&self) -> usize {
        self.n_windows.saturating_sub(self.n_positive)
    }
}

/// Render summaries as CSV with the columns `db, record, vf, non-vf`.
///
/// ```
/// use vf_dataset::dataset::{render_summary_csv, RecordSummary};
///
/// let rows = [RecordSummary {
///     database: "vfdb".into(),
///     record: "418".into(),
///     sampling_rate: 250.0,
///     n_samples: 525_000,
///     n_annotations: 120,
///     n_windows: 262,
///     n_positive: 40,
/// }];
/// assert_eq!(
///     render_summary_csv(&rows),
///     "\"db\", \"record\", \"vf\", \"non-vf\"\n\"vfdb\",\"418\",40,222\n"
/// );
/// ```
pub fn render_summary_csv(summaries: &[RecordSummary]) -> String {
    let mut out = String::from("\"db\", \"record\", \"vf\", \"non-vf\"\n");
    for s in summaries {
        let _ = writeln!(
            out,
            "\"{}\",\"{}\",{},{}",
            s.database,
            s.record,
            s.n_positive,
            s.n_negative()
        );
    }
    out
}

/// Write [`render_summary_csv`] to `path`, creating parent directories.
pub fn write_summary_csv(path: &Path, summaries: &[RecordSummary]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, render_summary_csv(summaries))?;
    log::info!(
        "dataset: wrote summary of {} records to {}",
        summaries.len(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn summary(db: &str, record: &str, windows: usize, positive: usize) -> RecordSummary {
        RecordSummary {
            database: db.into(),
            record: record.into(),
            sampling_rate: 360.0,
            n_samples: windows * 2_880,
            n_annotations: 0,
            n_windows: windows,
            n_positive: positive,
        }
    }

    #[test]
    fn negative_count_never_underflows() {
        assert_eq!(summary("vfdb", "418", 10, 4).n_negative(), 6);
        assert_eq!(summary("vfdb", "418", 1, 2).n_negative(), 0);
    }

    #[test]
    fn header_only_for_no_records() {
        assert_eq!(render_summary_csv(&[]), "\"db\", \"record\", \"vf\", \"non-vf\"\n");
    }

    #[test]
    fn writes_one_row_per_record() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("out").join("summary.csv");
        write_summary_csv(
            &path,
            &[summary("mitdb", "100", 225, 0), summary("cudb", "cu01", 63, 12)],
        )
        .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "\"mitdb\",\"100\",0,225");
        assert_eq!(lines[2], "\"cudb\",\"cu01\",12,51");
    }
}
