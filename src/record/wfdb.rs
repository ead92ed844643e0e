//! Native reader for PhysioNet WFDB records.
//!
//! A record `<db>/<name>` lives in `<root>/<db>/` as three files:
//!
//! | File          | Content                                              |
//! |---------------|------------------------------------------------------|
//! | `<name>.hea`  | text header: sampling rate, sample count, signal specs |
//! | `<name>.dat`  | binary samples (formats 212, 16 or 80), frames interleaved |
//! | `<name>.atr`  | MIT-format reference annotations                     |
//!
//! Only the first signal channel is kept.  Samples are converted to
//! physical units with `(adc - baseline) / gain`.

use std::fs;
use std::path::{Path, PathBuf};

use super::codes;
use super::{Annotation, AnnotationStream, LoadError, Record, RecordLoader, Signal};

/// Default gain when the header omits it or gives zero (ADC units per mV).
const DEFAULT_GAIN: f64 = 200.0;
/// Sampling frequency WFDB assumes when the header omits it.
const DEFAULT_FREQUENCY: f64 = 250.0;

// Pseudo-codes of the MIT annotation format.
const SKIP: u8 = 59;
const NUM: u8 = 60;
const SUB: u8 = 61;
const CHN: u8 = 62;
const AUX: u8 = 63;

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
struct SignalSpec {
    file_name: String,
    format: u16,
    byte_offset: usize,
    gain: f64,
    baseline: i32,
}

#[derive(Debug, Clone, PartialEq)]
struct Header {
    sampling_rate: f64,
    n_samples: Option<usize>,
    signals: Vec<SignalSpec>,
}

fn header_error(path: &Path, reason: impl Into<String>) -> LoadError {
    LoadError::Header {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Leading numeric part of a header field such as `360/1(0)` or `212+24`.
fn leading_number(field: &str) -> &str {
    let end = field
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || (i == 0 && c == '-')))
        .map_or(field.len(), |(i, _)| i);
    &field[..end]
}

fn parse_header(text: &str, path: &Path) -> Result<Header, LoadError> {
    let mut lines = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'));

    let record_line = lines
        .next()
        .ok_or_else(|| header_error(path, "empty header"))?;
    let fields: Vec<&str> = record_line.split_whitespace().collect();

    if fields[0].contains('/') {
        return Err(header_error(path, "multi-segment records are not supported"));
    }
    let n_signals: usize = fields
        .get(1)
        .ok_or_else(|| header_error(path, "missing signal count"))?
        .parse()
        .map_err(|_| header_error(path, "invalid signal count"))?;
    let sampling_rate = match fields.get(2) {
        Some(field) => leading_number(field)
            .parse::<f64>()
            .map_err(|_| header_error(path, format!("invalid sampling frequency {field:?}")))?,
        None => DEFAULT_FREQUENCY,
    };
    if sampling_rate <= 0.0 {
        return Err(header_error(path, "sampling frequency must be positive"));
    }
    let n_samples = match fields.get(3) {
        Some(field) => Some(
            field
                .parse::<usize>()
                .map_err(|_| header_error(path, format!("invalid sample count {field:?}")))?,
        ),
        None => None,
    };

    let mut signals = Vec::with_capacity(n_signals);
    for line in lines.take(n_signals) {
        signals.push(parse_signal_line(line, path)?);
    }
    if signals.len() != n_signals || signals.is_empty() {
        return Err(header_error(
            path,
            format!("expected {n_signals} signal lines, found {}", signals.len()),
        ));
    }

    Ok(Header {
        sampling_rate,
        n_samples,
        signals,
    })
}

fn parse_signal_line(line: &str, path: &Path) -> Result<SignalSpec, LoadError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 2 {
        return Err(header_error(path, format!("short signal line {line:?}")));
    }

    let format_field = fields[1];
    let format: u16 = leading_number(format_field)
        .parse()
        .map_err(|_| header_error(path, format!("invalid format {format_field:?}")))?;
    let byte_offset = match format_field.split_once('+') {
        Some((_, offset)) => offset
            .parse()
            .map_err(|_| header_error(path, format!("invalid byte offset {format_field:?}")))?,
        None => 0,
    };

    let (gain, explicit_baseline) = match fields.get(2) {
        Some(field) => {
            let gain = leading_number(field).parse::<f64>().unwrap_or(0.0);
            let baseline = field
                .split_once('(')
                .and_then(|(_, rest)| rest.split_once(')'))
                .map(|(inner, _)| inner.parse::<i32>())
                .transpose()
                .map_err(|_| header_error(path, format!("invalid baseline {field:?}")))?;
            (gain, baseline)
        }
        None => (0.0, None),
    };
    let adc_zero = match fields.get(4) {
        Some(field) => field
            .parse::<i32>()
            .map_err(|_| header_error(path, format!("invalid ADC zero {field:?}")))?,
        None => 0,
    };

    Ok(SignalSpec {
        file_name: fields[0].to_string(),
        format,
        byte_offset,
        gain: if gain > 0.0 { gain } else { DEFAULT_GAIN },
        baseline: explicit_baseline.unwrap_or(adc_zero),
    })
}

// ---------------------------------------------------------------------------
// Signal decoding
// ---------------------------------------------------------------------------

/// Decode raw ADC values of `format`, returning them with the format's
/// "invalid sample" marker.
fn decode_samples(bytes: &[u8], format: u16) -> Option<(Vec<i32>, i32)> {
    match format {
        212 => {
            let mut values = Vec::with_capacity(bytes.len() / 3 * 2);
            for chunk in bytes.chunks(3) {
                match *chunk {
                    [b0, b1, b2] => {
                        values.push(sign_extend_12(b0 as i32 | ((b1 as i32 & 0x0F) << 8)));
                        values.push(sign_extend_12(b2 as i32 | ((b1 as i32 & 0xF0) << 4)));
                    }
                    [b0, b1] => {
                        values.push(sign_extend_12(b0 as i32 | ((b1 as i32 & 0x0F) << 8)));
                    }
                    _ => {}
                }
            }
            Some((values, -2048))
        }
        16 => Some((
            bytes
                .chunks_exact(2)
                .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as i32)
                .collect(),
            i16::MIN as i32,
        )),
        80 => Some((bytes.iter().map(|&b| b as i32 - 128).collect(), -128)),
        _ => None,
    }
}

fn sign_extend_12(value: i32) -> i32 {
    if value > 2047 {
        value - 4096
    } else {
        value
    }
}

fn read_first_channel(dir: &Path, header: &Header) -> Result<Vec<f32>, LoadError> {
    let spec = &header.signals[0];
    let path = dir.join(&spec.file_name);
    if !path.exists() {
        return Err(LoadError::MissingFile(path));
    }
    let signal_error = |reason: String| LoadError::Signal {
        path: path.clone(),
        reason,
    };

    let bytes = fs::read(&path)?;
    if spec.byte_offset > bytes.len() {
        return Err(signal_error(format!(
            "byte offset {} beyond end of file",
            spec.byte_offset
        )));
    }
    let (values, invalid) = decode_samples(&bytes[spec.byte_offset..], spec.format)
        .ok_or_else(|| signal_error(format!("unsupported format {}", spec.format)))?;

    // Signals stored in the same file are interleaved frame by frame.
    let frame_width = header
        .signals
        .iter()
        .filter(|s| s.file_name == spec.file_name)
        .count();
    let available = values.len() / frame_width;
    let n_frames = match header.n_samples {
        Some(n) if n > available => {
            return Err(signal_error(format!(
                "header declares {n} samples but file holds {available}"
            )))
        }
        Some(n) => n,
        None => available,
    };

    Ok(values
        .iter()
        .step_by(frame_width)
        .take(n_frames)
        .map(|&adc| {
            if adc == invalid {
                0.0
            } else {
                ((adc - spec.baseline) as f64 / spec.gain) as f32
            }
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Annotation decoding
// ---------------------------------------------------------------------------

fn parse_annotations(bytes: &[u8], path: &Path) -> Result<Vec<Annotation>, LoadError> {
    let corrupt = |reason: &str| LoadError::Annotation {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let mut annotations: Vec<Annotation> = Vec::new();
    let mut time: i64 = 0;
    let mut pos = 0;

    while pos + 2 <= bytes.len() {
        let word = u16::from_le_bytes([bytes[pos], bytes[pos + 1]]);
        pos += 2;
        let code = (word >> 10) as u8;
        let value = (word & 0x03FF) as usize;

        match code {
            0 if value == 0 => break,
            SKIP => {
                let raw = bytes
                    .get(pos..pos + 4)
                    .ok_or_else(|| corrupt("truncated SKIP interval"))?;
                // PDP-11 long: high word first, each word little-endian.
                let high = u16::from_le_bytes([raw[0], raw[1]]) as u32;
                let low = u16::from_le_bytes([raw[2], raw[3]]) as u32;
                time += ((high << 16) | low) as i32 as i64;
                pos += 4;
            }
            NUM | SUB | CHN => {}
            AUX => {
                let raw = bytes
                    .get(pos..pos + value)
                    .ok_or_else(|| corrupt("truncated AUX string"))?;
                pos += value + (value & 1);
                if let Some(last) = annotations.last_mut() {
                    last.rhythm_label = String::from_utf8_lossy(raw)
                        .trim_end_matches(['\0', ' '])
                        .to_string();
                }
            }
            _ => {
                time += value as i64;
                let timestamp =
                    usize::try_from(time).map_err(|_| corrupt("negative annotation time"))?;
                annotations.push(Annotation::beat(timestamp, codes::mnemonic(code)));
            }
        }
    }

    Ok(annotations)
}

// ---------------------------------------------------------------------------
// WfdbLoader
// ---------------------------------------------------------------------------

/// [`RecordLoader`] for WFDB databases stored under a common root.
#[derive(Debug, Clone)]
pub struct WfdbLoader {
    root: PathBuf,
}

impl WfdbLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn database_dir(&self, database: &str) -> PathBuf {
        self.root.join(database)
    }
}

impl RecordLoader for WfdbLoader {
    fn list_records(&self, database: &str) -> Result<Vec<String>, LoadError> {
        let dir = self.database_dir(database);
        if !dir.is_dir() {
            return Err(LoadError::MissingFile(dir));
        }

        let mut records = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "dat") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    records.push(stem.to_string());
                }
            }
        }
        records.sort();
        records.dedup();
        Ok(records)
    }

    fn load(&self, database: &str, record: &str) -> Result<Record, LoadError> {
        let dir = self.database_dir(database);

        let header_path = dir.join(format!("{record}.hea"));
        if !header_path.exists() {
            return Err(LoadError::MissingFile(header_path));
        }
        let header = parse_header(&fs::read_to_string(&header_path)?, &header_path)?;
        let samples = read_first_channel(&dir, &header)?;

        let ann_path = dir.join(format!("{record}.atr"));
        let annotations = if ann_path.exists() {
            parse_annotations(&fs::read(&ann_path)?, &ann_path)?
        } else {
            log::warn!("wfdb: {database}/{record} has no annotation file");
            Vec::new()
        };
        let annotations =
            AnnotationStream::new(annotations).map_err(|source| LoadError::Ordering {
                record: format!("{database}/{record}"),
                source,
            })?;

        log::debug!(
            "wfdb: loaded {database}/{record}: {} samples @ {} Hz, {} annotations",
            samples.len(),
            header.sampling_rate,
            annotations.len()
        );

        Ok(Record::new(
            database,
            record,
            Signal::new(samples, header.sampling_rate),
            annotations,
        ))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Pack interleaved two-channel values as format 212.
    fn encode_212(frames: &[(i32, i32)]) -> Vec<u8> {
        let mut out = Vec::new();
        for &(a, b) in frames {
            let a = (a & 0x0FFF) as u16;
            let b = (b & 0x0FFF) as u16;
            out.push((a & 0xFF) as u8);
            out.push((((a >> 8) & 0x0F) | ((b >> 8) & 0x0F) << 4) as u8);
            out.push((b & 0xFF) as u8);
        }
        out
    }

    fn word(code: u8, value: u16) -> [u8; 2] {
        (((code as u16) << 10) | (value & 0x03FF)).to_le_bytes()
    }

    fn encode_annotations(events: &[(u32, u8, &str)]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut last = 0u32;
        for &(time, code, aux) in events {
            let delta = time - last;
            if delta > 1023 {
                out.extend_from_slice(&word(SKIP, 0));
                out.extend_from_slice(&((delta >> 16) as u16).to_le_bytes());
                out.extend_from_slice(&((delta & 0xFFFF) as u16).to_le_bytes());
                out.extend_from_slice(&word(code, 0));
            } else {
                out.extend_from_slice(&word(code, delta as u16));
            }
            if !aux.is_empty() {
                let mut bytes = aux.as_bytes().to_vec();
                bytes.push(0);
                out.extend_from_slice(&word(AUX, bytes.len() as u16));
                out.extend_from_slice(&bytes);
                if bytes.len() % 2 == 1 {
                    out.push(0);
                }
            }
            last = time;
        }
        out.extend_from_slice(&[0, 0]);
        out
    }

    fn write_record(root: &Path, frames: &[(i32, i32)], events: &[(u32, u8, &str)]) {
        let dir = root.join("testdb");
        fs::create_dir_all(&dir).unwrap();
        let header = format!(
            "# synthetic\n100 2 360 {n}\n100.dat 212 200 11 1024 995 -22131 0 MLII\n100.dat 212 200 11 1024 1011 20052 0 V5\n",
            n = frames.len()
        );
        fs::write(dir.join("100.hea"), header).unwrap();
        fs::write(dir.join("100.dat"), encode_212(frames)).unwrap();
        fs::write(dir.join("100.atr"), encode_annotations(events)).unwrap();
    }

    #[test]
    fn header_fields_are_parsed() {
        let text = "418 2 250 525000\n418.dat 212 200(0)/mV 12 0 -13 0 0 ECG\n418.dat 212 200 12 0 0 0 0 ECG\n";
        let header = parse_header(text, Path::new("418.hea")).unwrap();
        assert_eq!(header.sampling_rate, 250.0);
        assert_eq!(header.n_samples, Some(525_000));
        assert_eq!(header.signals.len(), 2);
        assert_eq!(header.signals[0].format, 212);
        assert_eq!(header.signals[0].gain, 200.0);
        assert_eq!(header.signals[0].baseline, 0);
    }

    #[test]
    fn header_baseline_defaults_to_adc_zero() {
        let text = "x 1 128\nx.dat 16+24 0 16 512\n";
        let header = parse_header(text, Path::new("x.hea")).unwrap();
        let spec = &header.signals[0];
        assert_eq!(spec.format, 16);
        assert_eq!(spec.byte_offset, 24);
        assert_eq!(spec.gain, DEFAULT_GAIN);
        assert_eq!(spec.baseline, 512);
        assert_eq!(header.n_samples, None);
    }

    #[test]
    fn header_with_too_few_signal_lines_fails() {
        let text = "x 2 360 10\nx.dat 212 200 11 0\n";
        assert!(matches!(
            parse_header(text, Path::new("x.hea")),
            Err(LoadError::Header { .. })
        ));
    }

    #[test]
    fn format_212_round_trips_negative_values() {
        let bytes = encode_212(&[(-5, 2047), (1024, -2047)]);
        let (values, invalid) = decode_samples(&bytes, 212).unwrap();
        assert_eq!(values, vec![-5, 2047, 1024, -2047]);
        assert_eq!(invalid, -2048);
    }

    #[test]
    fn unsupported_format_is_rejected() {
        assert!(decode_samples(&[0, 0], 311).is_none());
    }

    #[test]
    fn loads_first_channel_in_millivolts() {
        let dir = tempdir().expect("temp dir");
        let frames: Vec<(i32, i32)> = (0..720).map(|i| (1024 + (i % 200), 0)).collect();
        write_record(dir.path(), &frames, &[(0, codes::RHYTHM, "(N")]);

        let record = WfdbLoader::new(dir.path()).load("testdb", "100").unwrap();
        assert_eq!(record.signal.sampling_rate, 360.0);
        assert_eq!(record.signal.len(), 720);
        // baseline 1024, gain 200 → (1024 + 100 - 1024) / 200 = 0.5 mV
        assert!((record.signal.samples[100] - 0.5).abs() < 1e-6);
        assert_eq!(record.signal.samples[0], 0.0);
    }

    #[test]
    fn annotations_carry_rhythm_labels_and_skips() {
        let dir = tempdir().expect("temp dir");
        let frames = vec![(1024, 0); 10_000];
        write_record(
            dir.path(),
            &frames,
            &[
                (0, codes::RHYTHM, "(N"),
                (300, 1, ""),
                (5_000, codes::VFON, ""),
                (5_010, codes::RHYTHM, "(VF"),
                (9_000, codes::VFOFF, ""),
            ],
        );

        let record = WfdbLoader::new(dir.path()).load("testdb", "100").unwrap();
        let anns = record.annotations.as_slice();
        assert_eq!(anns.len(), 5);
        assert_eq!(anns[0], Annotation::new(0, "+", "(N"));
        assert_eq!(anns[1], Annotation::new(300, "N", ""));
        assert_eq!(anns[2], Annotation::new(5_000, "[", ""));
        assert_eq!(anns[3], Annotation::new(5_010, "+", "(VF"));
        assert_eq!(anns[4], Annotation::new(9_000, "]", ""));
    }

    #[test]
    fn missing_annotation_file_yields_empty_stream() {
        let dir = tempdir().expect("temp dir");
        write_record(dir.path(), &[(0, 0); 16], &[]);
        fs::remove_file(dir.path().join("testdb/100.atr")).unwrap();

        let record = WfdbLoader::new(dir.path()).load("testdb", "100").unwrap();
        assert!(record.annotations.is_empty());
    }

    #[test]
    fn truncated_signal_file_is_reported() {
        let dir = tempdir().expect("temp dir");
        write_record(dir.path(), &[(0, 0); 16], &[]);
        fs::write(dir.path().join("testdb/100.dat"), encode_212(&[(0, 0); 4])).unwrap();

        let err = WfdbLoader::new(dir.path()).load("testdb", "100").unwrap_err();
        assert!(matches!(err, LoadError::Signal { .. }), "got {err}");
    }

    #[test]
    fn missing_header_is_missing_file() {
        let dir = tempdir().expect("temp dir");
        fs::create_dir_all(dir.path().join("testdb")).unwrap();
        let err = WfdbLoader::new(dir.path()).load("testdb", "nope").unwrap_err();
        assert!(matches!(err, LoadError::MissingFile(_)));
    }

    #[test]
    fn list_records_returns_sorted_dat_stems() {
        let dir = tempdir().expect("temp dir");
        let db = dir.path().join("vfdb");
        fs::create_dir_all(&db).unwrap();
        for name in ["422.dat", "418.dat", "418.hea", "notes.txt"] {
            fs::write(db.join(name), b"").unwrap();
        }

        let records = WfdbLoader::new(dir.path()).list_records("vfdb").unwrap();
        assert_eq!(records, vec!["418".to_string(), "422".to_string()]);
    }

    #[test]
    fn list_records_of_missing_database_fails() {
        let dir = tempdir().expect("temp dir");
        assert!(matches!(
            WfdbLoader::new(dir.path()).list_records("cudb"),
            Err(LoadError::MissingFile(_))
        ));
    }
}
