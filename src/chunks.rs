//! Deterministic partition of a recording's time axis into spectrogram
//! chunks.
//!
//! Chunk boundaries depend only on the recording duration and the chunk
//! duration, never on the zoom level or sample rate, so they stay stable
//! while panning and zooming.

use std::ops::Range;

use crate::interval::{Interval, MIN_TIME_SPAN};

/// Duration of each chunk in seconds.
pub const CHUNK_DURATION: f64 = 5.0;

/// Number of STFT windows each chunk's buffer extends past its edges.
pub const CHUNK_BUFFER: u32 = 10;

/// A time slice of the spectrogram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Chunk {
    pub index: usize,
    /// Nominal coverage. The last chunk ends at the recording end.
    pub interval: Interval,
    /// Coverage extended by the STFT framing margin on both sides.
    pub buffer: Interval,
}

impl Chunk {
    /// Time range to request from the server: the buffer, limited to the
    /// recording.
    pub fn request_interval(&self, duration: f64) -> Interval {
        self.buffer
            .intersection(&Interval::new(0.0, duration))
            .unwrap_or(self.interval)
    }
}

/// Margin (seconds) added on each side of a chunk so STFT framing artifacts
/// stay outside its nominal interval: `(buffer - 1) * hop + window`.
pub fn buffer_margin(window_size: f64, overlap: f64, chunk_buffer: u32) -> f64 {
    let hop = (1.0 - overlap) * window_size;
    (chunk_buffer.saturating_sub(1)) as f64 * hop + window_size
}

/// Split `duration` seconds into chunks of `chunk_duration`.
///
/// Returns an empty list for non-positive or non-finite durations. A
/// remainder shorter than [`MIN_TIME_SPAN`] is folded into the last chunk.
pub fn calculate_chunks(
    duration: f64,
    window_size: f64,
    overlap: f64,
    chunk_duration: f64,
    chunk_buffer: u32,
) -> Vec<Chunk> {
    if !(duration.is_finite() && duration > 0.0 && chunk_duration > 0.0) {
        return Vec::new();
    }
    let margin = buffer_margin(window_size, overlap, chunk_buffer);
    let mut count = (duration / chunk_duration).ceil() as usize;
    if count > 1 && duration - (count - 1) as f64 * chunk_duration < MIN_TIME_SPAN {
        count -= 1;
    }
    (0..count)
        .map(|index| {
            let min = index as f64 * chunk_duration;
            let nominal_end = (index + 1) as f64 * chunk_duration;
            let max = if index + 1 == count { duration } else { nominal_end };
            Chunk {
                index,
                interval: Interval { min, max },
                buffer: Interval {
                    min: min - margin,
                    max: nominal_end.max(max) + margin,
                },
            }
        })
        .collect()
}

impl AsRef<Chunk> for Chunk {
    fn as_ref(&self) -> &Chunk {
        self
    }
}

/// Indices of the chunks whose nominal interval overlaps `window`, widened
/// by `lookahead` chunks on each side. Chunks must be sorted by time.
pub fn visible_range<C: AsRef<Chunk>>(chunks: &[C], window: &Interval, lookahead: usize) -> Range<usize> {
    let start = chunks.partition_point(|c| c.as_ref().interval.max <= window.min);
    let end = chunks.partition_point(|c| c.as_ref().interval.min < window.max);
    if start >= end {
        return start..start;
    }
    start.saturating_sub(lookahead)..(end + lookahead).min(chunks.len())
}
