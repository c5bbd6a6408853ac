use crate::error::AudioFetchError;
use crate::interval::Interval;
use hound::{SampleFormat, WavReader};
use std::io::Cursor;
use std::sync::Arc;

/// A decoded, playable slice of a recording.
///
/// Samples are interleaved and normalized to `[-1.0, 1.0]`. They live in an
/// `Arc<[f32]>` so playback backends can restart from any offset without
/// copying the buffer.
#[derive(Debug, Clone)]
pub struct AudioSegment {
    /// Recording time covered by the segment, in seconds.
    pub interval: Interval,
    pub samplerate: u32,
    pub channels: u16,
    pub samples: Arc<[f32]>,
    /// Recording seconds per second of media (1.0 unless the server
    /// rendered the segment time-expanded).
    pub time_scale: f64,
}

impl AudioSegment {
    /// Media duration in seconds.
    pub fn media_duration(&self) -> f64 {
        if self.samplerate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / (self.samplerate as f64 * self.channels as f64)
    }

    /// Interleaved sample index for a media position in seconds.
    pub fn sample_offset(&self, media_secs: f64) -> usize {
        let frame = (media_secs.max(0.0) * self.samplerate as f64) as usize;
        (frame * self.channels as usize).min(self.samples.len())
    }
}

/// Decode a WAV payload covering `interval` of the recording.
///
/// Integer PCM of any bit depth and 32-bit float are accepted.
pub fn decode_wav(bytes: &[u8], interval: Interval) -> Result<AudioSegment, AudioFetchError> {
    let reader = WavReader::new(Cursor::new(bytes)).map_err(|e| AudioFetchError::Decode {
        reason: e.to_string(),
    })?;
    let spec = reader.spec();

    if spec.channels == 0 || spec.sample_rate == 0 {
        return Err(AudioFetchError::Decode {
            reason: format!(
                "invalid format: {} channels at {} Hz",
                spec.channels, spec.sample_rate
            ),
        });
    }

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| AudioFetchError::Decode {
                reason: e.to_string(),
            })?,
        SampleFormat::Int => {
            let max = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max))
                .collect::<Result<_, _>>()
                .map_err(|e| AudioFetchError::Decode {
                    reason: e.to_string(),
                })?
        }
    };

    if samples.is_empty() {
        return Err(AudioFetchError::Empty);
    }

    tracing::debug!(
        sample_rate = spec.sample_rate,
        channels = spec.channels,
        samples = samples.len(),
        start = interval.min,
        end = interval.max,
        "Decoded audio segment"
    );

    Ok(AudioSegment {
        interval,
        samplerate: spec.sample_rate,
        channels: spec.channels,
        samples: samples.into(),
        time_scale: 1.0,
    })
}
