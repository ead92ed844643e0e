//! Amplitude measures over a window of samples.

/// Mean peak-to-peak amplitude of consecutive `block_len`-sample blocks.
///
/// Trailing samples that do not fill a block are ignored, unless the input
/// is shorter than one block, in which case the whole input is measured.
/// Returns `None` for empty input.
///
/// ```
/// use vf_dataset::dsp::mean_peak_to_peak;
///
/// let square: Vec<f32> = (0..8).map(|i| if i % 2 == 0 { 0.3 } else { -0.3 }).collect();
/// let amp = mean_peak_to_peak(&square, 4).unwrap();
/// assert!((amp - 0.6).abs() < 1e-6);
/// ```
pub fn mean_peak_to_peak(samples: &[f32], block_len: usize) -> Option<f32> {
    if samples.is_empty() {
        return None;
    }
    if block_len == 0 || block_len > samples.len() {
        return Some(peak_to_peak(samples));
    }

    let blocks = samples.chunks_exact(block_len);
    let n_blocks = blocks.len();
    let total: f32 = blocks.map(peak_to_peak).sum();
    Some(total / n_blocks as f32)
}

fn peak_to_peak(block: &[f32]) -> f32 {
    let (min, max) = block
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &x| {
            (lo.min(x), hi.max(x))
        });
    max - min
}
