//! Playback of time-bounded audio segments in recording-time coordinates.
//!
//! The controller never blocks on a fetch. Operations that need audio that
//! is not loaded return an [`AudioLoad`] for the caller to run; the result is
//! fed back through [`AudioController::handle_loaded`], which is the only
//! place deferred seeks and deferred playback are applied.

use std::time::{Duration, Instant};

use crate::audio::AudioSegment;
use crate::audio_state::{PlaybackMetrics, PlaybackState};
use crate::config::PlaybackConfig;
use crate::error::{AudioFetchError, SettingsError};
use crate::interval::{Interval, MIN_TIME_SPAN};
use crate::models::Recording;
use crate::services::audio::PlaybackBackend;
use crate::settings::{AudioSettings, AudioSettingsAction};

/// Everything an audio source needs to render one segment.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioRequest {
    pub recording_uuid: String,
    pub interval: Interval,
    pub audio: AudioSettings,
}

/// A segment fetch to run, tagged with the controller's load token.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioLoad {
    pub token: u64,
    pub request: AudioRequest,
}

#[derive(Debug, Clone)]
pub struct AudioResponse {
    pub token: u64,
    pub result: Result<AudioSegment, AudioFetchError>,
    pub elapsed: Duration,
}

/// Notifications for collaborators, drained with
/// [`AudioController::drain_events`]. Times are recording seconds.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioEvent {
    TimeUpdate(f64),
    /// An explicit seek. Emitted when requested, not when it settles.
    Seeked(f64),
    Play,
    Pause,
    Ended,
    Loaded(Interval),
    Error(AudioFetchError),
}

pub struct AudioController {
    backend: Box<dyn PlaybackBackend>,
    recording: Recording,
    /// Addressable recording time; seeks are clamped to it.
    limits: Interval,
    settings: AudioSettings,
    config: PlaybackConfig,
    /// Range of the loaded (or loading) segment.
    range: Interval,
    loaded: Option<LoadedSegment>,
    /// Request settings of the loaded (or loading) segment.
    loaded_audio: Option<AudioSettings>,
    token: u64,
    in_flight: bool,
    pending_seek: Option<f64>,
    play_when_ready: bool,
    state: PlaybackState,
    looping: bool,
    volume: f32,
    current_time: f64,
    events: Vec<AudioEvent>,
    metrics: PlaybackMetrics,
    last_tick: Option<Instant>,
}

#[derive(Debug, Clone, Copy)]
struct LoadedSegment {
    interval: Interval,
    time_scale: f64,
}

impl LoadedSegment {
    fn to_media(&self, time: f64) -> f64 {
        (time - self.interval.min) / self.time_scale
    }

    fn to_recording(&self, media: f64) -> f64 {
        self.interval.min + media * self.time_scale
    }
}

impl AudioController {
    pub fn new(
        recording: Recording,
        limits: Interval,
        settings: AudioSettings,
        config: PlaybackConfig,
        mut backend: Box<dyn PlaybackBackend>,
    ) -> Self {
        let volume = config.default_volume.clamp(0.0, 1.0);
        backend.set_volume(volume);
        let range = Self::segment_from(limits.min, &limits, config.segment_duration);
        Self {
            backend,
            recording,
            limits,
            settings,
            config,
            range,
            loaded: None,
            loaded_audio: None,
            token: 0,
            in_flight: false,
            pending_seek: None,
            play_when_ready: false,
            state: PlaybackState::Idle,
            looping: false,
            volume,
            current_time: limits.min,
            events: Vec::new(),
            metrics: PlaybackMetrics::default(),
            last_tick: None,
        }
    }

    /// Current playback position in recording seconds.
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Start of the addressable segment.
    pub fn start_time(&self) -> f64 {
        self.range.min
    }

    /// End of the addressable segment.
    pub fn end_time(&self) -> f64 {
        self.range.max
    }

    pub fn limits(&self) -> Interval {
        self.limits
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn speed(&self) -> f64 {
        self.settings.speed
    }

    pub fn token(&self) -> u64 {
        self.token
    }

    pub fn settings(&self) -> &AudioSettings {
        &self.settings
    }

    /// Settings after the recording and playback-ceiling adjustments.
    pub fn playback_settings(&self) -> AudioSettings {
        self.settings
            .adjust_for_playback(&self.recording, self.config.max_samplerate)
    }

    /// Sample rate audio is rendered at for playback.
    pub fn effective_samplerate(&self) -> u32 {
        self.playback_settings()
            .effective_samplerate(self.recording.samplerate)
    }

    pub fn metrics(&self) -> &PlaybackMetrics {
        &self.metrics
    }

    pub fn drain_events(&mut self) -> Vec<AudioEvent> {
        std::mem::take(&mut self.events)
    }

    /// Start or resume playback. Returns a load when no segment is loaded.
    pub fn play(&mut self) -> Option<AudioLoad> {
        match self.state {
            PlaybackState::Error(_) | PlaybackState::Playing => None,
            PlaybackState::Loading => {
                self.play_when_ready = true;
                None
            }
            _ if self.loaded.is_some() => {
                self.start_backend();
                None
            }
            _ => {
                self.play_when_ready = true;
                let at = self.current_time;
                Some(self.load_around(at, false))
            }
        }
    }

    pub fn pause(&mut self) {
        self.play_when_ready = false;
        if self.state.is_playing() {
            self.backend.pause();
            self.state = PlaybackState::Paused;
            self.metrics.record_pause();
            self.events.push(AudioEvent::Pause);
            tracing::debug!(time = self.current_time, "Playback paused");
        }
    }

    pub fn toggle_play(&mut self) -> Option<AudioLoad> {
        if self.state.is_playing() {
            self.pause();
            None
        } else {
            self.play()
        }
    }

    /// Seek to `time` (recording seconds, clamped to the limits).
    ///
    /// Inside the current segment the backend seeks directly. Outside it, a
    /// new segment centered on `time` is requested and the seek completes in
    /// [`AudioController::handle_loaded`].
    pub fn seek(&mut self, time: f64) -> Option<AudioLoad> {
        if !time.is_finite() {
            return None;
        }
        let time = time.clamp(self.limits.min, self.limits.max);
        self.metrics.record_seek();
        self.current_time = time;
        self.events.push(AudioEvent::Seeked(time));

        if self.state.is_error() {
            return None;
        }

        if let Some(segment) = self.loaded.filter(|s| s.interval.contains(time)) {
            if !self.in_flight {
                self.backend.seek(segment.to_media(time));
                return None;
            }
        }

        if self.in_flight && self.range.contains(time) {
            self.pending_seek = Some(time);
            return None;
        }

        if self.loaded.is_none() && !self.in_flight {
            // Nothing requested yet: the next play loads around `time`.
            self.range = Self::segment_from(time, &self.limits, self.config.segment_duration);
            return None;
        }

        self.play_when_ready = self.play_when_ready || self.state.is_playing();
        Some(self.load_around(time, true))
    }

    pub fn toggle_loop(&mut self) -> bool {
        self.looping = !self.looping;
        self.looping
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        self.backend.set_volume(self.volume);
    }

    /// Change the playback speed. Applied through the playback rate unless
    /// the new speed changes the segment's rendering settings, in which case
    /// the segment is fetched again at the current position.
    pub fn set_speed(&mut self, speed: f64) -> Result<Option<AudioLoad>, SettingsError> {
        self.settings.apply(AudioSettingsAction::SetSpeed(speed))?;
        Ok(self.settings_changed())
    }

    /// Replace the user audio settings.
    pub fn set_settings(&mut self, settings: AudioSettings) -> Option<AudioLoad> {
        self.settings = settings;
        self.settings_changed()
    }

    /// Leave the error state and try again.
    pub fn retry(&mut self) -> Option<AudioLoad> {
        if !self.state.is_error() {
            return None;
        }
        tracing::info!(recording = %self.recording.uuid, "Retrying audio playback");
        self.state = PlaybackState::Idle;
        self.loaded = None;
        self.loaded_audio = None;
        self.play()
    }

    /// Switch to a different recording or addressable range.
    pub fn reset_to(&mut self, recording: Recording, limits: Interval) {
        self.backend.unload();
        self.recording = recording;
        self.limits = limits;
        self.range = Self::segment_from(limits.min, &limits, self.config.segment_duration);
        self.loaded = None;
        self.loaded_audio = None;
        // Invalidate anything in flight.
        self.token += 1;
        self.in_flight = false;
        self.pending_seek = None;
        self.play_when_ready = false;
        self.state = PlaybackState::Idle;
        self.current_time = limits.min;
        self.last_tick = None;
    }

    /// Apply a finished segment fetch. Responses for superseded loads are
    /// ignored; returns whether the response was applied.
    pub fn handle_loaded(&mut self, response: AudioResponse) -> bool {
        if response.token != self.token || !self.in_flight {
            tracing::debug!(
                token = response.token,
                current = self.token,
                "Discarding stale audio segment"
            );
            return false;
        }
        self.in_flight = false;

        let segment = match response.result {
            Ok(segment) => segment,
            Err(e) => {
                self.fail(e);
                return true;
            }
        };

        if let Err(e) = self.backend.load(&segment) {
            self.fail(e);
            return true;
        }
        self.backend.set_rate(self.settings.speed);
        self.backend.set_volume(self.volume);

        let loaded = LoadedSegment {
            interval: segment.interval,
            time_scale: segment.time_scale,
        };
        self.loaded = Some(loaded);
        self.range = segment.interval;
        self.events.push(AudioEvent::Loaded(segment.interval));
        tracing::debug!(
            start = segment.interval.min,
            end = segment.interval.max,
            elapsed_ms = response.elapsed.as_millis() as u64,
            "Audio segment loaded"
        );

        let target = self
            .pending_seek
            .take()
            .unwrap_or(self.current_time)
            .clamp(loaded.interval.min, loaded.interval.max);
        self.backend.seek(loaded.to_media(target));
        self.current_time = target;
        self.events.push(AudioEvent::TimeUpdate(target));

        self.state = PlaybackState::Ready;
        if std::mem::take(&mut self.play_when_ready) {
            self.start_backend();
        }
        true
    }

    /// Poll the backend. Call once per frame.
    ///
    /// Emits a time update while playing and handles the end of a segment:
    /// the next segment is loaded when the limits extend past it, otherwise
    /// playback loops or ends.
    pub fn tick(&mut self) -> Option<AudioLoad> {
        let now = Instant::now();
        let last = self.last_tick.replace(now);
        if !self.state.is_playing() {
            return None;
        }
        if let Some(last) = last {
            self.metrics.add_playback_time(now.duration_since(last));
        }
        let segment = self.loaded?;

        let time = segment.to_recording(self.backend.position());
        let finished = self.backend.is_finished() || time >= segment.interval.max;
        if !finished {
            if time != self.current_time {
                self.current_time = time;
                self.events.push(AudioEvent::TimeUpdate(time));
            }
            return None;
        }

        let end = segment.interval.max;
        if end < self.limits.max - MIN_TIME_SPAN {
            self.current_time = end;
            self.play_when_ready = true;
            let range = Self::segment_from(end, &self.limits, self.config.segment_duration);
            return Some(self.issue(range, end, false));
        }

        if self.looping {
            let start = self.limits.min;
            if segment.interval.contains(start) {
                self.backend.seek(segment.to_media(start));
                self.current_time = start;
                self.events.push(AudioEvent::TimeUpdate(start));
                return None;
            }
            self.current_time = start;
            self.play_when_ready = true;
            let range = Self::segment_from(start, &self.limits, self.config.segment_duration);
            return Some(self.issue(range, start, false));
        }

        self.backend.pause();
        self.current_time = end;
        self.state = PlaybackState::Paused;
        self.events.push(AudioEvent::TimeUpdate(end));
        self.events.push(AudioEvent::Ended);
        None
    }

    fn start_backend(&mut self) {
        self.backend.play();
        self.state = PlaybackState::Playing;
        self.last_tick = Some(Instant::now());
        self.metrics.record_play();
        self.events.push(AudioEvent::Play);
        tracing::debug!(time = self.current_time, "Playback started");
    }

    fn fail(&mut self, error: AudioFetchError) {
        tracing::warn!(recording = %self.recording.uuid, error = %error, "Audio playback disabled");
        self.backend.pause();
        self.loaded = None;
        self.pending_seek = None;
        self.play_when_ready = false;
        self.metrics.record_error();
        self.events.push(AudioEvent::Error(error.clone()));
        self.state = PlaybackState::Error(error);
    }

    fn settings_changed(&mut self) -> Option<AudioLoad> {
        let next = self.render_settings();
        match &self.loaded_audio {
            Some(current) if *current != next && !self.state.is_error() => {
                tracing::debug!(
                    speed = self.settings.speed,
                    samplerate = next.samplerate,
                    "Audio rendering settings changed, refetching segment"
                );
                self.play_when_ready = self.play_when_ready || self.state.is_playing();
                let at = self.current_time;
                let range = self.range;
                Some(self.issue(range, at, false))
            }
            _ => {
                self.backend.set_rate(self.settings.speed);
                None
            }
        }
    }

    /// Settings sent with segment (and chunk) requests. Speed is applied
    /// locally through the playback rate, so segments are always rendered at
    /// speed 1.
    pub fn render_settings(&self) -> AudioSettings {
        AudioSettings {
            speed: 1.0,
            ..self.playback_settings()
        }
    }

    fn load_around(&mut self, time: f64, from_seek: bool) -> AudioLoad {
        let range = if from_seek {
            Interval::centered_on(time, self.config.segment_duration)
                .fit_within(&self.limits, MIN_TIME_SPAN)
        } else {
            Self::segment_from(time, &self.limits, self.config.segment_duration)
        };
        self.issue(range, time, from_seek)
    }

    fn issue(&mut self, range: Interval, seek_to: f64, from_seek: bool) -> AudioLoad {
        if self.state.is_playing() {
            self.backend.pause();
        }
        self.token += 1;
        self.in_flight = true;
        self.range = range;
        self.pending_seek = Some(seek_to);
        self.state = PlaybackState::Loading;
        let audio = self.render_settings();
        self.loaded_audio = Some(audio.clone());
        self.metrics.record_segment_load(from_seek);
        tracing::debug!(
            recording = %self.recording.uuid,
            token = self.token,
            start = range.min,
            end = range.max,
            "Requesting audio segment"
        );
        AudioLoad {
            token: self.token,
            request: AudioRequest {
                recording_uuid: self.recording.uuid.clone(),
                interval: range,
                audio,
            },
        }
    }

    /// Segment of `duration` starting at `start`, shifted to fit the limits.
    fn segment_from(start: f64, limits: &Interval, duration: f64) -> Interval {
        Interval::new(start, start + duration).fit_within(limits, MIN_TIME_SPAN)
    }
}
