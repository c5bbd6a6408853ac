//! Playback backends for the audio controller.
//!
//! The controller speaks media time (seconds into the loaded segment); the
//! mapping to recording time lives in [`crate::player`].

use crate::audio::AudioSegment;
use crate::error::AudioFetchError;

/// Output device abstraction driven by [`crate::player::AudioController`].
pub trait PlaybackBackend {
    /// Replace the loaded segment. Playback stays paused at media time 0.
    fn load(&mut self, segment: &AudioSegment) -> Result<(), AudioFetchError>;
    fn unload(&mut self);
    fn is_loaded(&self) -> bool;
    fn play(&mut self);
    fn pause(&mut self);
    /// Current media position in seconds.
    fn position(&self) -> f64;
    fn seek(&mut self, media_secs: f64);
    fn set_rate(&mut self, rate: f64);
    fn set_volume(&mut self, volume: f32);
    /// True once playback ran past the end of the segment.
    fn is_finished(&self) -> bool;
}

/// Backend that plays nothing. Used when no output device is available
/// or the `audio_playback` feature is off.
#[derive(Debug, Default)]
pub struct SilentBackend {
    loaded: bool,
}

impl PlaybackBackend for SilentBackend {
    fn load(&mut self, _segment: &AudioSegment) -> Result<(), AudioFetchError> {
        self.loaded = true;
        Ok(())
    }

    fn unload(&mut self) {
        self.loaded = false;
    }

    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn play(&mut self) {}

    fn pause(&mut self) {}

    fn position(&self) -> f64 {
        0.0
    }

    fn seek(&mut self, _media_secs: f64) {}

    fn set_rate(&mut self, _rate: f64) {}

    fn set_volume(&mut self, _volume: f32) {}

    fn is_finished(&self) -> bool {
        false
    }
}

#[cfg(feature = "audio_playback")]
pub use rodio_backend::{AudioBufferSource, RodioBackend};

#[cfg(feature = "audio_playback")]
mod rodio_backend {
    use std::sync::Arc;
    use std::time::Duration;

    use rodio::{OutputStream, OutputStreamBuilder, Sink, Source};

    use super::PlaybackBackend;
    use crate::audio::AudioSegment;
    use crate::error::AudioFetchError;

    /// Audio source that plays from a shared buffer of f32 samples with
    /// zero-copy seeking.
    pub struct AudioBufferSource {
        buffer: Arc<[f32]>,
        /// Sample index where playback begins.
        offset: usize,
        sample_rate: u32,
        channels: u16,
        /// Read position relative to offset.
        position: usize,
    }

    impl AudioBufferSource {
        pub fn new(
            buffer: Arc<[f32]>,
            offset: usize,
            sample_rate: u32,
            channels: u16,
        ) -> Result<Self, AudioFetchError> {
            if offset >= buffer.len() {
                return Err(AudioFetchError::Decode {
                    reason: format!("offset {} past end of {} samples", offset, buffer.len()),
                });
            }
            if channels == 0 || sample_rate == 0 {
                return Err(AudioFetchError::Decode {
                    reason: format!("invalid format: {} channels at {} Hz", channels, sample_rate),
                });
            }
            Ok(Self {
                buffer,
                offset,
                sample_rate,
                channels,
                position: 0,
            })
        }
    }

    impl Iterator for AudioBufferSource {
        type Item = f32;

        fn next(&mut self) -> Option<Self::Item> {
            let sample = self.buffer.get(self.offset + self.position).copied()?;
            self.position += 1;
            Some(sample)
        }
    }

    impl Source for AudioBufferSource {
        fn current_span_len(&self) -> Option<usize> {
            self.buffer
                .len()
                .checked_sub(self.offset)
                .map(|len| len.saturating_sub(self.position))
        }

        fn channels(&self) -> u16 {
            self.channels
        }

        fn sample_rate(&self) -> u32 {
            self.sample_rate
        }

        fn total_duration(&self) -> Option<Duration> {
            let remaining = self.buffer.len().checked_sub(self.offset)? as f64;
            Some(Duration::from_secs_f64(
                remaining / (self.sample_rate as f64 * self.channels as f64),
            ))
        }
    }

    /// rodio output. Seeking clears the sink and appends a fresh source
    /// starting at the target sample, so the sink position is relative to
    /// `base` seconds.
    pub struct RodioBackend {
        // Dropping the stream stops all output.
        _stream: OutputStream,
        sink: Sink,
        segment: Option<AudioSegment>,
        base: f64,
        rate: f64,
        playing: bool,
    }

    impl RodioBackend {
        pub fn open_default() -> Result<Self, AudioFetchError> {
            let stream = OutputStreamBuilder::open_default_stream().map_err(|e| {
                AudioFetchError::PlaybackInitFailed {
                    reason: e.to_string(),
                }
            })?;
            let sink = Sink::connect_new(stream.mixer());
            sink.pause();
            tracing::info!("Opened default audio output");
            Ok(Self {
                _stream: stream,
                sink,
                segment: None,
                base: 0.0,
                rate: 1.0,
                playing: false,
            })
        }

        fn queue_from(&mut self, media_secs: f64) {
            let Some(segment) = &self.segment else {
                return;
            };
            self.sink.clear();
            let offset = segment.sample_offset(media_secs);
            match AudioBufferSource::new(
                Arc::clone(&segment.samples),
                offset,
                segment.samplerate,
                segment.channels,
            ) {
                Ok(source) => {
                    self.sink.append(source);
                    self.base = media_secs;
                }
                Err(e) => {
                    // Seeking to the very end leaves nothing to queue.
                    tracing::debug!(error = %e, "Nothing to queue at seek target");
                    self.base = segment.media_duration();
                }
            }
            // clear() pauses the sink
            if self.playing {
                self.sink.play();
            }
        }
    }

    impl PlaybackBackend for RodioBackend {
        fn load(&mut self, segment: &AudioSegment) -> Result<(), AudioFetchError> {
            self.playing = false;
            self.segment = Some(segment.clone());
            self.queue_from(0.0);
            self.sink.pause();
            Ok(())
        }

        fn unload(&mut self) {
            self.sink.clear();
            self.segment = None;
            self.base = 0.0;
            self.playing = false;
        }

        fn is_loaded(&self) -> bool {
            self.segment.is_some()
        }

        fn play(&mut self) {
            self.playing = true;
            self.sink.play();
        }

        fn pause(&mut self) {
            self.playing = false;
            self.sink.pause();
        }

        fn position(&self) -> f64 {
            self.base + self.sink.get_pos().as_secs_f64()
        }

        fn seek(&mut self, media_secs: f64) {
            self.queue_from(media_secs.max(0.0));
        }

        fn set_rate(&mut self, rate: f64) {
            self.rate = rate;
            self.sink.set_speed(rate as f32);
        }

        fn set_volume(&mut self, volume: f32) {
            self.sink.set_volume(volume);
        }

        fn is_finished(&self) -> bool {
            self.segment.is_some() && self.sink.empty()
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_buffer_source_reads_from_offset() {
            let buffer: Arc<[f32]> = vec![0.0, 0.1, 0.2, 0.3].into();
            let source = AudioBufferSource::new(buffer, 2, 8000, 1).unwrap();
            assert_eq!(source.current_span_len(), Some(2));
            let samples: Vec<f32> = source.collect();
            assert_eq!(samples, vec![0.2, 0.3]);
        }

        #[test]
        fn test_buffer_source_validation() {
            let buffer: Arc<[f32]> = vec![0.0; 4].into();
            assert!(AudioBufferSource::new(Arc::clone(&buffer), 4, 8000, 1).is_err());
            assert!(AudioBufferSource::new(Arc::clone(&buffer), 0, 8000, 0).is_err());
            assert!(AudioBufferSource::new(buffer, 0, 0, 1).is_err());
        }
    }
}
