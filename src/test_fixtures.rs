//! Deterministic fakes for development and testing.
//!
//! Provides in-memory collaborators (spectrogram, audio, species and
//! annotation sources), a playback backend driven by a manual clock, and a
//! canvas that records every draw call, so the viewer can be exercised
//! without a server or an audio device.

use std::cell::RefCell;
use std::f32::consts::PI;
use std::io::Cursor;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::audio::AudioSegment;
use crate::canvas::{Canvas, ChunkImage, Style, UvRect};
use crate::chunk_manager::SpectrogramRequest;
use crate::error::{AudioFetchError, ChunkFetchError, MutationError, SearchError};
use crate::geometry::Geometry;
use crate::interval::{Dimensions, Pixel, PixelRect};
use crate::models::{Recording, Tag};
use crate::player::AudioRequest;
use crate::services::audio::PlaybackBackend;
use crate::services::fetch::{AudioSource, Sources, SpectrogramSource, SpeciesSource};
use crate::services::mutations::AnnotationSink;
use crate::species::SpeciesCandidate;

/// Native rate of the fake recordings. Kept low so segments stay small.
pub const FIXTURE_SAMPLERATE: u32 = 8_000;

/// Generate a pure sine wave at the given frequency
///
/// # Example
/// ```
/// use whombat_viewer::test_fixtures::generate_sine_wave;
/// let tone = generate_sine_wave(440.0, 1.0, 8000, 0.5);
/// assert_eq!(tone.len(), 8000);
/// ```
pub fn generate_sine_wave(
    frequency: f32,
    duration_secs: f32,
    sample_rate: u32,
    amplitude: f32,
) -> Vec<f32> {
    let num_samples = (duration_secs * sample_rate as f32) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            amplitude * (2.0 * PI * frequency * t).sin()
        })
        .collect()
}

/// Encode mono float samples as a 32-bit float WAV file.
pub fn wav_bytes(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("wav header");
        for &s in samples {
            writer.write_sample(s).expect("wav sample");
        }
        writer.finalize().expect("wav finalize");
    }
    cursor.into_inner()
}

pub fn fixture_recording(duration: f64) -> Recording {
    Recording {
        uuid: "fixture-recording".to_string(),
        duration,
        samplerate: FIXTURE_SAMPLERATE,
        channels: 1,
    }
}

/// A `width` x `height` image filled with one RGBA colour.
pub fn solid_image(width: u32, height: u32, rgba: [u8; 4]) -> ChunkImage {
    let pixels = rgba
        .iter()
        .copied()
        .cycle()
        .take((width * height * 4) as usize)
        .collect();
    ChunkImage::new(width, height, pixels)
}

/// One recorded canvas operation.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    Image {
        image_id: u64,
        source: UvRect,
        dest: PixelRect,
    },
    Line {
        from: Pixel,
        to: Pixel,
        style: Style,
    },
    Rect {
        rect: PixelRect,
        style: Style,
    },
    Polyline {
        points: Vec<Pixel>,
        style: Style,
    },
    Circle {
        center: Pixel,
        radius: f64,
        style: Style,
    },
}

/// Canvas that logs draw calls instead of painting.
#[derive(Debug, Clone)]
pub struct RecordingCanvas {
    size: Dimensions,
    calls: Vec<DrawCall>,
}

impl RecordingCanvas {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            size: Dimensions::new(width, height),
            calls: Vec::new(),
        }
    }

    pub fn calls(&self) -> &[DrawCall] {
        &self.calls
    }

    /// Source and destination of every image drawn, in order.
    pub fn images(&self) -> Vec<(UvRect, PixelRect)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                DrawCall::Image { source, dest, .. } => Some((*source, *dest)),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl Canvas for RecordingCanvas {
    fn size(&self) -> Dimensions {
        self.size
    }

    fn draw_image(&mut self, image: &ChunkImage, source: UvRect, dest: PixelRect) {
        self.calls.push(DrawCall::Image {
            image_id: image.id(),
            source,
            dest,
        });
    }

    fn draw_line(&mut self, from: Pixel, to: Pixel, style: &Style) {
        self.calls.push(DrawCall::Line {
            from,
            to,
            style: *style,
        });
    }

    fn draw_rect(&mut self, rect: PixelRect, style: &Style) {
        self.calls.push(DrawCall::Rect { rect, style: *style });
    }

    fn draw_polyline(&mut self, points: &[Pixel], style: &Style) {
        self.calls.push(DrawCall::Polyline {
            points: points.to_vec(),
            style: *style,
        });
    }

    fn draw_circle(&mut self, center: Pixel, radius: f64, style: &Style) {
        self.calls.push(DrawCall::Circle {
            center,
            radius,
            style: *style,
        });
    }
}

/// Spectrogram source that renders every chunk as a solid tile.
#[derive(Debug, Default)]
pub struct FixtureSpectrograms {
    requests: AtomicUsize,
    failing: AtomicBool,
}

impl FixtureSpectrograms {
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }

    /// Make every following fetch fail with a server error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }
}

impl SpectrogramSource for FixtureSpectrograms {
    fn fetch_chunk(&self, _request: &SpectrogramRequest) -> Result<ChunkImage, ChunkFetchError> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if self.failing.load(Ordering::Relaxed) {
            return Err(ChunkFetchError::Status { status: 500 });
        }
        Ok(solid_image(8, 8, [40, 80, 120, 255]))
    }
}

/// Audio source synthesising a 440 Hz tone for the requested interval.
#[derive(Debug, Default)]
pub struct FixtureAudio {
    requests: Mutex<Vec<AudioRequest>>,
}

impl FixtureAudio {
    pub fn requests(&self) -> Vec<AudioRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl AudioSource for FixtureAudio {
    fn fetch_segment(&self, request: &AudioRequest) -> Result<AudioSegment, AudioFetchError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        let samplerate = if request.audio.resample {
            request.audio.samplerate
        } else {
            FIXTURE_SAMPLERATE
        };
        let samples = generate_sine_wave(
            440.0,
            request.interval.span() as f32,
            samplerate,
            0.5,
        );
        if samples.is_empty() {
            return Err(AudioFetchError::Empty);
        }
        Ok(AudioSegment {
            interval: request.interval,
            samplerate,
            channels: 1,
            samples: samples.into(),
            time_scale: 1.0,
        })
    }
}

/// Species catalogue searched by case-insensitive substring.
#[derive(Debug, Clone)]
pub struct FixtureSpecies {
    catalogue: Vec<SpeciesCandidate>,
}

impl Default for FixtureSpecies {
    fn default() -> Self {
        let names = [
            (2_432_482, "Myotis daubentonii"),
            (2_432_439, "Myotis myotis"),
            (2_432_516, "Pipistrellus pipistrellus"),
            (2_432_517, "Pipistrellus pygmaeus"),
            (5_218_786, "Nyctalus noctula"),
        ];
        let catalogue = names
            .iter()
            .map(|&(key, name)| SpeciesCandidate {
                usage_key: key.to_string(),
                canonical_name: name.to_string(),
                scientific_name: Some(name.to_string()),
                rank: Some("SPECIES".to_string()),
                synonym: Some(false),
                dataset_key: None,
            })
            .collect();
        Self { catalogue }
    }
}

impl SpeciesSource for FixtureSpecies {
    fn search_species(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SpeciesCandidate>, SearchError> {
        let needle = query.to_lowercase();
        Ok(self
            .catalogue
            .iter()
            .filter(|c| c.canonical_name.to_lowercase().contains(&needle))
            .take(limit)
            .cloned()
            .collect())
    }
}

/// Annotation sink that records each call as a line of text.
#[derive(Debug, Default)]
pub struct FixtureAnnotations {
    log: Mutex<Vec<String>>,
    failing: AtomicBool,
}

impl FixtureAnnotations {
    pub fn log(&self) -> Vec<String> {
        self.log.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    fn record(&self, entry: String) -> Result<(), MutationError> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(MutationError::Status { status: 503 });
        }
        if let Ok(mut log) = self.log.lock() {
            log.push(entry);
        }
        Ok(())
    }
}

impl AnnotationSink for FixtureAnnotations {
    fn persist_geometry(&self, sound_event: &str, geometry: &Geometry) -> Result<(), MutationError> {
        self.record(format!("geometry {} {}", sound_event, geometry.geometry_type()))
    }

    fn persist_tag(&self, entity: &str, tag: &Tag) -> Result<(), MutationError> {
        self.record(format!("tag+ {} {}", entity, tag))
    }

    fn remove_tag(&self, entity: &str, tag: &Tag) -> Result<(), MutationError> {
        self.record(format!("tag- {} {}", entity, tag))
    }

    fn create_note(&self, entity: &str, message: &str) -> Result<(), MutationError> {
        self.record(format!("note {} {}", entity, message))
    }
}

/// Handles to the fakes behind [`fixture_sources`], for inspection.
#[derive(Clone, Default)]
pub struct Fixtures {
    pub spectrograms: Arc<FixtureSpectrograms>,
    pub audio: Arc<FixtureAudio>,
    pub species: Arc<FixtureSpecies>,
    pub annotations: Arc<FixtureAnnotations>,
}

impl Fixtures {
    pub fn sources(&self) -> Sources {
        Sources {
            spectrograms: self.spectrograms.clone(),
            audio: self.audio.clone(),
            species: self.species.clone(),
            annotations: self.annotations.clone(),
        }
    }
}

pub fn fixture_sources() -> Sources {
    Fixtures::default().sources()
}

/// State shared between a [`ManualPlayback`] and its [`ManualClock`].
#[derive(Debug, Default)]
pub struct ManualState {
    pub loaded: Option<AudioSegment>,
    pub playing: bool,
    pub position: f64,
    pub rate: f64,
    pub volume: f32,
    pub seeks: Vec<f64>,
    pub loads: usize,
}

/// Playback backend whose clock only moves when the test advances it.
#[derive(Debug)]
pub struct ManualPlayback {
    state: Rc<RefCell<ManualState>>,
}

/// Test-side handle to a [`ManualPlayback`].
#[derive(Debug, Clone)]
pub struct ManualClock {
    state: Rc<RefCell<ManualState>>,
}

impl ManualPlayback {
    pub fn new() -> (Self, ManualClock) {
        let state = Rc::new(RefCell::new(ManualState {
            rate: 1.0,
            volume: 1.0,
            ..Default::default()
        }));
        (
            Self {
                state: Rc::clone(&state),
            },
            ManualClock { state },
        )
    }

    fn duration(state: &ManualState) -> f64 {
        state.loaded.as_ref().map_or(0.0, |s| s.media_duration())
    }
}

impl ManualClock {
    /// Advance wall-clock time. Media time moves by `secs * rate` while
    /// playing and stops at the end of the segment.
    pub fn advance(&self, secs: f64) {
        let mut state = self.state.borrow_mut();
        if state.playing && state.loaded.is_some() {
            let end = ManualPlayback::duration(&state);
            state.position = (state.position + secs * state.rate).min(end);
        }
    }

    pub fn state(&self) -> std::cell::Ref<'_, ManualState> {
        self.state.borrow()
    }
}

impl PlaybackBackend for ManualPlayback {
    fn load(&mut self, segment: &AudioSegment) -> Result<(), AudioFetchError> {
        let mut state = self.state.borrow_mut();
        state.loaded = Some(segment.clone());
        state.position = 0.0;
        state.playing = false;
        state.loads += 1;
        Ok(())
    }

    fn unload(&mut self) {
        let mut state = self.state.borrow_mut();
        state.loaded = None;
        state.playing = false;
        state.position = 0.0;
    }

    fn is_loaded(&self) -> bool {
        self.state.borrow().loaded.is_some()
    }

    fn play(&mut self) {
        self.state.borrow_mut().playing = true;
    }

    fn pause(&mut self) {
        self.state.borrow_mut().playing = false;
    }

    fn position(&self) -> f64 {
        self.state.borrow().position
    }

    fn seek(&mut self, media_secs: f64) {
        let mut state = self.state.borrow_mut();
        let end = Self::duration(&state);
        state.position = media_secs.clamp(0.0, end);
        state.seeks.push(media_secs);
    }

    fn set_rate(&mut self, rate: f64) {
        self.state.borrow_mut().rate = rate;
    }

    fn set_volume(&mut self, volume: f32) {
        self.state.borrow_mut().volume = volume;
    }

    fn is_finished(&self) -> bool {
        let state = self.state.borrow();
        state.loaded.is_some() && state.position >= Self::duration(&state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::decode_wav;
    use crate::interval::Interval;

    #[test]
    fn test_sine_wave_length() {
        assert_eq!(generate_sine_wave(440.0, 0.5, 8000, 1.0).len(), 4000);
    }

    #[test]
    fn test_wav_bytes_decode() {
        let samples = generate_sine_wave(440.0, 0.25, 8000, 0.5);
        let segment = decode_wav(&wav_bytes(&samples, 8000), Interval::new(1.0, 1.25)).unwrap();
        assert_eq!(segment.samples.len(), samples.len());
        assert!((segment.media_duration() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_manual_clock_stops_at_end() {
        let (mut backend, clock) = ManualPlayback::new();
        let segment = FixtureAudio::default()
            .fetch_segment(&AudioRequest {
                recording_uuid: "r".to_string(),
                interval: Interval::new(0.0, 1.0),
                audio: Default::default(),
            })
            .unwrap();
        backend.load(&segment).unwrap();
        clock.advance(0.5);
        assert_eq!(backend.position(), 0.0, "paused clock does not move");

        backend.play();
        backend.set_rate(2.0);
        clock.advance(0.25);
        assert!((backend.position() - 0.5).abs() < 1e-9);
        clock.advance(10.0);
        assert!(backend.is_finished());
    }

    #[test]
    fn test_species_fixture_filters() {
        let species = FixtureSpecies::default();
        let found = species.search_species("myotis", 10).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(species.search_species("pip", 1).unwrap().len(), 1);
    }
}
