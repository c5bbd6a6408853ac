//! Per-recording spectrogram chunk state: which chunks are requested,
//! loaded or failed, and how the ready ones are composited.
//!
//! Requests are tagged with the refresh token active when they were issued.
//! [`ChunkManager::refresh`] bumps the token, so a late response from before
//! the bump can never overwrite newer state.

use std::ops::Range;
use std::time::Duration;

use crate::canvas::{Canvas, ChunkImage, UvRect};
use crate::chunks::{calculate_chunks, visible_range, Chunk};
use crate::config::ChunksConfig;
use crate::error::ChunkFetchError;
use crate::interval::{
    scale_freq_to_viewport, scale_time_to_viewport, Interval, Pixel, PixelRect, SpectrogramWindow,
};
use crate::models::Recording;
use crate::settings::{AudioSettings, SpectrogramSettings};

/// Load state of one chunk.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkStatus {
    Pending,
    Ready(ChunkImage),
    Error(ChunkFetchError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChunkState {
    pub chunk: Chunk,
    pub status: ChunkStatus,
    requested: bool,
}

impl ChunkState {
    fn new(chunk: Chunk) -> Self {
        Self {
            chunk,
            status: ChunkStatus::Pending,
            requested: false,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.status, ChunkStatus::Ready(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self.status, ChunkStatus::Error(_))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.status, ChunkStatus::Pending)
    }
}

impl AsRef<Chunk> for ChunkState {
    fn as_ref(&self) -> &Chunk {
        &self.chunk
    }
}

/// Everything a spectrogram source needs to render one chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrogramRequest {
    pub recording_uuid: String,
    pub interval: Interval,
    pub audio: AudioSettings,
    pub spectrogram: SpectrogramSettings,
}

/// A chunk fetch to run, tagged with its refresh token.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRequest {
    pub index: usize,
    pub token: u64,
    pub request: SpectrogramRequest,
}

/// Result of a chunk fetch, echoing the request's index and token.
#[derive(Debug, Clone)]
pub struct ChunkResponse {
    pub index: usize,
    pub token: u64,
    pub result: Result<ChunkImage, ChunkFetchError>,
    pub elapsed: Duration,
}

/// What [`ChunkManager::handle_response`] did with a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseOutcome {
    Applied,
    /// Issued under an older refresh token.
    Stale,
    /// The chunk already left the pending state in this generation.
    Duplicate,
    OutOfRange,
}

/// Summary of the visible chunks. The two non-ready states are mutually
/// exclusive: any visible error wins over generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStatus {
    Generating,
    Ready,
    Failed,
}

impl GenerationStatus {
    /// Derive the status from the chunks intersecting the viewport.
    /// With nothing visible the view is still considered generating.
    pub fn from_visible(visible: &[ChunkState]) -> Self {
        if visible.is_empty() {
            return GenerationStatus::Generating;
        }
        if visible.iter().any(ChunkState::is_error) {
            return GenerationStatus::Failed;
        }
        if visible.iter().all(|c| c.is_ready()) {
            GenerationStatus::Ready
        } else {
            GenerationStatus::Generating
        }
    }
}

/// Called with the chunks intersecting the current viewport whenever that
/// set or any of their states changes.
pub type VisibilityListener = Box<dyn FnMut(&[ChunkState])>;

pub struct ChunkManager {
    recording_uuid: String,
    duration: f64,
    audio: AudioSettings,
    spectrogram: SpectrogramSettings,
    /// Frequency range covered by each chunk image, bottom to top.
    image_freq: Interval,
    config: ChunksConfig,
    chunks: Vec<ChunkState>,
    token: u64,
    visible: Range<usize>,
    last_time: Option<Interval>,
    listeners: Vec<VisibilityListener>,
}

impl std::fmt::Debug for ChunkManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkManager")
            .field("recording", &self.recording_uuid)
            .field("chunks", &self.chunks.len())
            .field("token", &self.token)
            .field("visible", &self.visible)
            .finish()
    }
}

impl ChunkManager {
    /// `audio` should already be adjusted for playback; its effective sample
    /// rate decides the frequency range of the rendered images.
    pub fn new(
        recording: &Recording,
        audio: AudioSettings,
        spectrogram: SpectrogramSettings,
        config: ChunksConfig,
    ) -> Self {
        let mut manager = Self {
            recording_uuid: recording.uuid.clone(),
            duration: recording.duration,
            image_freq: Interval::default(),
            audio,
            spectrogram,
            config,
            chunks: Vec::new(),
            token: 0,
            visible: 0..0,
            last_time: None,
            listeners: Vec::new(),
        };
        manager.image_freq = Interval::new(
            0.0,
            manager.audio.effective_samplerate(recording.samplerate) as f64 / 2.0,
        );
        manager.rebuild();
        manager
    }

    fn rebuild(&mut self) {
        self.chunks = calculate_chunks(
            self.duration,
            self.spectrogram.window_size,
            self.spectrogram.overlap,
            self.config.chunk_duration,
            self.config.chunk_buffer,
        )
        .into_iter()
        .map(ChunkState::new)
        .collect();
        tracing::debug!(
            recording = %self.recording_uuid,
            count = self.chunks.len(),
            "Partitioned recording into chunks"
        );
    }

    pub fn chunks(&self) -> &[ChunkState] {
        &self.chunks
    }

    /// Current refresh token.
    pub fn token(&self) -> u64 {
        self.token
    }

    pub fn subscribe(&mut self, listener: VisibilityListener) {
        self.listeners.push(listener);
    }

    /// Chunks intersecting the last viewport passed to
    /// [`ChunkManager::update_viewport`].
    pub fn visible_chunks(&self) -> &[ChunkState] {
        &self.chunks[self.visible.clone()]
    }

    pub fn generation_status(&self) -> GenerationStatus {
        GenerationStatus::from_visible(self.visible_chunks())
    }

    /// Track the viewport and return fetches for chunks that are visible
    /// (or within the look-ahead margin) and not requested yet.
    pub fn update_viewport(&mut self, viewport: &SpectrogramWindow) -> Vec<ChunkRequest> {
        self.last_time = Some(viewport.time);
        let visible = visible_range(&self.chunks, &viewport.time, 0);
        let wanted = visible_range(&self.chunks, &viewport.time, self.config.lookahead_chunks);

        let mut requests = Vec::new();
        for index in wanted {
            if !self.chunks[index].requested {
                self.chunks[index].requested = true;
                requests.push(self.request_for(index));
            }
        }

        if visible != self.visible {
            self.visible = visible;
            self.notify();
        }
        requests
    }

    /// Reset every requested chunk to pending under a new token and return
    /// the fetches to re-issue.
    pub fn refresh(&mut self) -> Vec<ChunkRequest> {
        self.token += 1;
        tracing::info!(
            recording = %self.recording_uuid,
            token = self.token,
            "Regenerating spectrogram"
        );
        let requests = self.reissue();
        self.notify();
        requests
    }

    /// Apply new settings. The partition is recomputed (the buffer margin
    /// depends on the STFT window) and previously requested chunks are
    /// fetched again under a new token.
    pub fn update_settings(
        &mut self,
        recording: &Recording,
        audio: AudioSettings,
        spectrogram: SpectrogramSettings,
    ) -> Vec<ChunkRequest> {
        if audio == self.audio && spectrogram.same_rendering(&self.spectrogram) {
            self.spectrogram = spectrogram;
            return Vec::new();
        }
        let requested: Vec<bool> = self.chunks.iter().map(|c| c.requested).collect();
        self.audio = audio;
        self.spectrogram = spectrogram;
        self.image_freq = Interval::new(
            0.0,
            self.audio.effective_samplerate(recording.samplerate) as f64 / 2.0,
        );
        self.token += 1;
        self.rebuild();
        for (state, was_requested) in self.chunks.iter_mut().zip(requested) {
            state.requested = was_requested;
        }
        let requests = self.reissue();
        if let Some(time) = self.last_time {
            self.visible = visible_range(&self.chunks, &time, 0);
        }
        self.notify();
        requests
    }

    fn reissue(&mut self) -> Vec<ChunkRequest> {
        let mut requests = Vec::new();
        for index in 0..self.chunks.len() {
            self.chunks[index].status = ChunkStatus::Pending;
            if self.chunks[index].requested {
                requests.push(self.request_for(index));
            }
        }
        requests
    }

    fn request_for(&self, index: usize) -> ChunkRequest {
        let chunk = &self.chunks[index].chunk;
        tracing::debug!(chunk = index, token = self.token, "Issuing chunk request");
        ChunkRequest {
            index,
            token: self.token,
            request: SpectrogramRequest {
                recording_uuid: self.recording_uuid.clone(),
                interval: chunk.request_interval(self.duration),
                audio: self.audio.clone(),
                spectrogram: self.spectrogram.clone(),
            },
        }
    }

    /// Record a finished fetch. Responses from an older token, for unknown
    /// chunks, or for chunks no longer pending are dropped.
    pub fn handle_response(&mut self, response: ChunkResponse) -> ResponseOutcome {
        if response.token != self.token {
            tracing::debug!(
                chunk = response.index,
                token = response.token,
                current = self.token,
                "Discarding stale chunk response"
            );
            return ResponseOutcome::Stale;
        }
        let Some(state) = self.chunks.get_mut(response.index) else {
            return ResponseOutcome::OutOfRange;
        };
        if !state.is_pending() {
            return ResponseOutcome::Duplicate;
        }
        state.status = match response.result {
            Ok(image) => {
                tracing::debug!(chunk = response.index, token = response.token, "Chunk ready");
                ChunkStatus::Ready(image)
            }
            Err(err) => {
                tracing::warn!(chunk = response.index, error = %err, "Chunk fetch failed");
                ChunkStatus::Error(err)
            }
        };
        if self.visible.contains(&response.index) {
            self.notify();
        }
        ResponseOutcome::Applied
    }

    fn notify(&mut self) {
        let visible = &self.chunks[self.visible.clone()];
        for listener in self.listeners.iter_mut() {
            listener(visible);
        }
    }

    /// Composite every ready chunk intersecting `viewport`. Pending and
    /// failed chunks leave transparent gaps.
    pub fn draw(&self, canvas: &mut dyn Canvas, viewport: &SpectrogramWindow) {
        let size = canvas.size();
        if size.is_empty() {
            return;
        }
        let Some(freq) = viewport.freq.intersection(&self.image_freq) else {
            return;
        };
        let range = visible_range(&self.chunks, &viewport.time, 0);
        for state in &self.chunks[range] {
            let ChunkStatus::Ready(image) = &state.status else {
                continue;
            };
            let Some(time) = state.chunk.interval.intersection(&viewport.time) else {
                continue;
            };
            let coverage = state.chunk.request_interval(self.duration);
            let source = UvRect {
                u0: coverage.fraction_of(time.min),
                u1: coverage.fraction_of(time.max),
                v0: 1.0 - self.image_freq.fraction_of(freq.max),
                v1: 1.0 - self.image_freq.fraction_of(freq.min),
            };
            let dest = PixelRect {
                min: Pixel::new(
                    scale_time_to_viewport(time.min, viewport, size.width),
                    scale_freq_to_viewport(freq.max, viewport, size.height),
                ),
                max: Pixel::new(
                    scale_time_to_viewport(time.max, viewport, size.width),
                    scale_freq_to_viewport(freq.min, viewport, size.height),
                ),
            };
            canvas.draw_image(image, source, dest);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{solid_image, RecordingCanvas};

    fn recording() -> Recording {
        Recording {
            uuid: "rec-1".to_string(),
            duration: 30.0,
            samplerate: 44_100,
            channels: 1,
        }
    }

    fn manager() -> ChunkManager {
        ChunkManager::new(
            &recording(),
            AudioSettings::default(),
            SpectrogramSettings::default(),
            ChunksConfig::default(),
        )
    }

    fn window(t0: f64, t1: f64) -> SpectrogramWindow {
        SpectrogramWindow::new(Interval::new(t0, t1), Interval::new(0.0, 22_050.0))
    }

    fn ok(index: usize, token: u64) -> ChunkResponse {
        ChunkResponse {
            index,
            token,
            result: Ok(solid_image(4, 4, [10, 20, 30, 255])),
            elapsed: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_requests_visible_plus_lookahead_once() {
        let mut m = manager();
        let requests = m.update_viewport(&window(5.0, 10.0));
        let indices: Vec<_> = requests.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(m.update_viewport(&window(5.0, 10.0)).is_empty());
        assert_eq!(m.visible_chunks().len(), 1);
    }

    #[test]
    fn test_stale_response_discarded() {
        let mut m = manager();
        m.update_viewport(&window(0.0, 5.0));
        let old_token = m.token();
        let reissued = m.refresh();
        assert!(!reissued.is_empty());
        assert!(reissued.iter().all(|r| r.token == old_token + 1));

        assert_eq!(m.handle_response(ok(0, old_token)), ResponseOutcome::Stale);
        assert!(m.chunks()[0].is_pending());

        assert_eq!(m.handle_response(ok(0, m.token())), ResponseOutcome::Applied);
        assert!(m.chunks()[0].is_ready());
        assert_eq!(m.handle_response(ok(0, m.token())), ResponseOutcome::Duplicate);
        assert_eq!(m.handle_response(ok(99, m.token())), ResponseOutcome::OutOfRange);
    }

    #[test]
    fn test_generation_status() {
        let mut m = manager();
        assert_eq!(m.generation_status(), GenerationStatus::Generating);

        m.update_viewport(&window(0.0, 8.0));
        assert_eq!(m.generation_status(), GenerationStatus::Generating);

        m.handle_response(ok(0, 0));
        assert_eq!(m.generation_status(), GenerationStatus::Generating);

        m.handle_response(ChunkResponse {
            index: 1,
            token: 0,
            result: Err(ChunkFetchError::Status { status: 500 }),
            elapsed: Duration::ZERO,
        });
        assert_eq!(m.generation_status(), GenerationStatus::Failed);

        m.refresh();
        m.handle_response(ok(0, 1));
        m.handle_response(ok(1, 1));
        assert_eq!(m.generation_status(), GenerationStatus::Ready);
    }

    #[test]
    fn test_draw_leaves_gaps_for_unready_chunks() {
        let mut m = manager();
        m.update_viewport(&window(0.0, 10.0));
        m.handle_response(ok(1, 0));

        let mut canvas = RecordingCanvas::new(1000.0, 100.0);
        m.draw(&mut canvas, &window(0.0, 10.0));
        let images = canvas.images();
        assert_eq!(images.len(), 1);
        let (source, dest) = images[0];
        assert!((dest.min.x - 500.0).abs() < 1e-9);
        assert!((dest.max.x - 1000.0).abs() < 1e-9);
        assert!(source.u0 > 0.0 && source.u1 < 1.0);
    }

    #[test]
    fn test_visibility_listener_reports_current_chunks() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let mut m = manager();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        m.subscribe(Box::new(move |visible| {
            sink.borrow_mut()
                .push(visible.iter().map(|c| c.chunk.index).collect::<Vec<_>>());
        }));

        m.update_viewport(&window(12.0, 18.0));
        m.handle_response(ok(2, 0));
        m.handle_response(ok(0, 0));

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2, "out-of-view chunk 0 does not notify");
        assert_eq!(seen[0], vec![2, 3]);
    }

    #[test]
    fn test_settings_change_reissues() {
        let mut m = manager();
        m.update_viewport(&window(0.0, 5.0));
        let settings = SpectrogramSettings {
            window_size: 0.1,
            ..Default::default()
        };
        let requests = m.update_settings(&recording(), AudioSettings::default(), settings.clone());
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|r| r.request.spectrogram == settings));
        assert!(m
            .update_settings(&recording(), AudioSettings::default(), settings)
            .is_empty());
    }

    #[test]
    fn test_refresh_redraws_identically() {
        let mut m = manager();
        let view = window(3.0, 12.0);
        for request in m.update_viewport(&view) {
            m.handle_response(ok(request.index, request.token));
        }
        let mut before = RecordingCanvas::new(900.0, 100.0);
        m.draw(&mut before, &view);

        let reissued = m.refresh();
        assert!(!reissued.is_empty());
        for request in reissued {
            m.handle_response(ok(request.index, request.token));
        }
        let mut after = RecordingCanvas::new(900.0, 100.0);
        m.draw(&mut after, &view);

        assert!(!before.images().is_empty());
        assert_eq!(before.images(), after.images());
    }

    #[test]
    fn test_partition_ignores_samplerate() {
        let slow = Recording {
            samplerate: 8_000,
            ..recording()
        };
        let other = ChunkManager::new(
            &slow,
            AudioSettings::default(),
            SpectrogramSettings::default(),
            ChunksConfig::default(),
        );
        let intervals = |m: &ChunkManager| m.chunks().iter().map(|c| c.chunk.interval).collect::<Vec<_>>();
        assert_eq!(intervals(&manager()), intervals(&other));
        assert_eq!(intervals(&manager()), intervals(&manager()));
    }
}
