//! The spectrogram viewer: one view over a recording, clip or sound event.
//!
//! Owns the viewport, chunk manager, audio controller and interaction state
//! machines, and connects them. Fetches go out through a [`Dispatcher`];
//! [`SpectrogramViewer::update`] routes finished fetches back to their
//! owners once per frame.

use std::time::Instant;

use crate::chunk_manager::{ChunkManager, ChunkRequest, GenerationStatus};
use crate::compositor::{compose, Frame};
use crate::config::AppConfig;
use crate::canvas::Canvas;
use crate::draw::{AnnotationDraw, DrawMode, DrawOutput};
use crate::error::SettingsError;
use crate::geometry::{pick_annotation, AnnotationId, AnnotationRecord, GeometryType};
use crate::interactions::{InteractionOutput, SpectrogramInteractions, SpectrogramMode};
use crate::interval::{scale_pixel_to_window, Dimensions, Pixel, Position, SpectrogramWindow};
use crate::metrics::ViewerMetrics;
use crate::player::{AudioController, AudioLoad};
use crate::scale_control::{Axis, AxisScaleControl, TimeScaleControl};
use crate::services::audio::PlaybackBackend;
use crate::services::fetch::{Dispatcher, FetchJob, FetchOutcome};
use crate::services::mutations::{Mutation, NotificationQueue};
use crate::settings::{AudioSettings, SpectrogramSettings, SpectrogramSettingsAction};
use crate::species::{SpeciesCandidate, SpeciesSearch};
use crate::sync::PlaybackFollower;
use crate::viewport::ViewportController;
use crate::windows::{frequency_reset_interval, ViewSubject};

pub struct SpectrogramViewer {
    subject: ViewSubject,
    config: AppConfig,
    spectrogram: SpectrogramSettings,
    viewport: ViewportController,
    chunks: ChunkManager,
    audio: AudioController,
    follower: PlaybackFollower,
    time_scale: TimeScaleControl,
    freq_scale: AxisScaleControl,
    interactions: SpectrogramInteractions,
    draw: AnnotationDraw,
    annotations: Vec<AnnotationRecord>,
    selected: Option<AnnotationId>,
    hovered: Option<AnnotationId>,
    species: SpeciesSearch,
    notifications: NotificationQueue,
    metrics: Option<ViewerMetrics>,
    dispatcher: Box<dyn Dispatcher>,
    effective_samplerate: u32,
    /// Viewport revision the chunk manager last saw.
    synced_revision: Option<u64>,
}

impl SpectrogramViewer {
    pub fn new(
        subject: ViewSubject,
        audio_settings: AudioSettings,
        spectrogram: SpectrogramSettings,
        config: AppConfig,
        backend: Box<dyn PlaybackBackend>,
        dispatcher: Box<dyn Dispatcher>,
    ) -> Self {
        let recording = subject.recording().clone();
        let effective_samplerate = audio_settings
            .adjust_for_playback(&recording, config.playback.max_samplerate)
            .effective_samplerate(recording.samplerate);
        let windows = subject.windows(effective_samplerate, &spectrogram);

        let audio = AudioController::new(
            recording.clone(),
            windows.bounds.time,
            audio_settings,
            config.playback.clone(),
            backend,
        );
        let chunks = ChunkManager::new(
            &recording,
            audio.render_settings(),
            spectrogram.clone(),
            config.chunks.clone(),
        );
        let metrics = if config.metrics.enabled {
            ViewerMetrics::new(&config.metrics)
                .map_err(|e| tracing::warn!(error = %e, "Metrics disabled"))
                .ok()
        } else {
            None
        };

        tracing::info!(
            subject = %subject.uuid(),
            samplerate = effective_samplerate,
            "Opening spectrogram view"
        );

        let mut viewer = Self {
            follower: PlaybackFollower::new(&config.playback),
            time_scale: TimeScaleControl::new(spectrogram.time_scale),
            freq_scale: AxisScaleControl::new(Axis::Freq, spectrogram.freq_scale),
            viewport: windows.into_controller(),
            subject,
            config,
            spectrogram,
            chunks,
            audio,
            interactions: SpectrogramInteractions::new(),
            draw: AnnotationDraw::default(),
            annotations: Vec::new(),
            selected: None,
            hovered: None,
            species: SpeciesSearch::new(),
            notifications: NotificationQueue::default(),
            metrics,
            dispatcher,
            effective_samplerate,
            synced_revision: None,
        };
        viewer
            .time_scale
            .sync(viewer.spectrogram.time_scale, viewer.audio.speed(), &mut viewer.viewport);
        viewer.sync_chunks();
        viewer
    }

    pub fn subject(&self) -> &ViewSubject {
        &self.subject
    }

    pub fn viewport(&self) -> &ViewportController {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut ViewportController {
        &mut self.viewport
    }

    pub fn chunks(&self) -> &ChunkManager {
        &self.chunks
    }

    pub fn generation_status(&self) -> GenerationStatus {
        self.chunks.generation_status()
    }

    pub fn audio(&self) -> &AudioController {
        &self.audio
    }

    pub fn spectrogram_settings(&self) -> &SpectrogramSettings {
        &self.spectrogram
    }

    pub fn audio_settings(&self) -> &AudioSettings {
        self.audio.settings()
    }

    pub fn effective_samplerate(&self) -> u32 {
        self.effective_samplerate
    }

    pub fn interactions(&self) -> &SpectrogramInteractions {
        &self.interactions
    }

    pub fn draw_state(&self) -> &AnnotationDraw {
        &self.draw
    }

    pub fn species(&self) -> &SpeciesSearch {
        &self.species
    }

    pub fn species_mut(&mut self) -> &mut SpeciesSearch {
        &mut self.species
    }

    pub fn notifications_mut(&mut self) -> &mut NotificationQueue {
        &mut self.notifications
    }

    pub fn metrics(&self) -> Option<&ViewerMetrics> {
        self.metrics.as_ref()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Poll finished fetches, advance playback and fetch newly visible
    /// chunks. Call once per frame.
    pub fn update(&mut self) {
        for outcome in self.dispatcher.poll() {
            self.route(outcome);
        }

        let load = self.audio.tick();
        self.dispatch_audio(load);

        for event in self.audio.drain_events() {
            self.follower.on_event(&event, &mut self.viewport);
        }

        self.sync_chunks();

        if let Some(metrics) = &mut self.metrics {
            metrics.update_playback(self.audio.metrics());
        }
    }

    fn route(&mut self, outcome: FetchOutcome) {
        match outcome {
            FetchOutcome::Chunk(response) => {
                let elapsed = response.elapsed;
                let success = response.result.is_ok();
                let applied = self.chunks.handle_response(response);
                if let Some(metrics) = &mut self.metrics {
                    metrics.record_chunk_response(elapsed, success, applied);
                }
            }
            FetchOutcome::Audio(response) => {
                self.audio.handle_loaded(response);
            }
            FetchOutcome::Species { request_id, result } => {
                self.species.handle_response(request_id, result);
            }
            FetchOutcome::Mutation { mutation, result } => {
                self.notifications.report(&mutation, &result);
            }
        }
    }

    fn sync_chunks(&mut self) {
        let revision = self.viewport.revision();
        if self.synced_revision == Some(revision) {
            return;
        }
        self.synced_revision = Some(revision);
        let requests = self.chunks.update_viewport(&self.viewport.viewport());
        self.dispatch_chunks(requests);
    }

    fn dispatch_chunks(&mut self, requests: Vec<ChunkRequest>) {
        if requests.is_empty() {
            return;
        }
        if let Some(metrics) = &self.metrics {
            metrics.record_chunk_requests(requests.len());
        }
        for request in requests {
            self.dispatcher.dispatch(FetchJob::Chunk(request));
        }
    }

    fn dispatch_audio(&mut self, load: Option<AudioLoad>) {
        if let Some(load) = load {
            self.dispatcher.dispatch(FetchJob::Audio(load));
        }
    }

    /// Show a different entity. Windows, audio and chunks are rebuilt only
    /// when its identity changes.
    pub fn set_subject(&mut self, subject: ViewSubject) {
        if subject.uuid() == self.subject.uuid() {
            self.subject = subject;
            return;
        }
        tracing::info!(from = %self.subject.uuid(), to = %subject.uuid(), "Switching view subject");

        let recording = subject.recording().clone();
        self.effective_samplerate = self
            .audio
            .settings()
            .adjust_for_playback(&recording, self.config.playback.max_samplerate)
            .effective_samplerate(recording.samplerate);
        let windows = subject.windows(self.effective_samplerate, &self.spectrogram);
        self.audio.reset_to(recording.clone(), windows.bounds.time);
        self.viewport.reset_to(windows.initial, windows.bounds);
        self.chunks = ChunkManager::new(
            &recording,
            self.audio.render_settings(),
            self.spectrogram.clone(),
            self.config.chunks.clone(),
        );
        self.subject = subject;

        self.draw.cancel();
        self.interactions.cancel();
        self.annotations.clear();
        self.selected = None;
        self.hovered = None;
        self.time_scale = TimeScaleControl::new(self.spectrogram.time_scale);
        self.time_scale
            .sync(self.spectrogram.time_scale, self.audio.speed(), &mut self.viewport);
        self.synced_revision = None;
        self.sync_chunks();
    }

    pub fn play(&mut self) {
        let load = self.audio.play();
        self.dispatch_audio(load);
    }

    pub fn pause(&mut self) {
        self.audio.pause();
    }

    pub fn toggle_play(&mut self) {
        let load = self.audio.toggle_play();
        self.dispatch_audio(load);
    }

    pub fn seek(&mut self, time: f64) {
        let load = self.audio.seek(time);
        self.dispatch_audio(load);
        for event in self.audio.drain_events() {
            self.follower.on_event(&event, &mut self.viewport);
        }
        self.sync_chunks();
    }

    pub fn toggle_loop(&mut self) -> bool {
        self.audio.toggle_loop()
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.audio.set_volume(volume);
    }

    pub fn retry_audio(&mut self) {
        let load = self.audio.retry();
        self.dispatch_audio(load);
    }

    pub fn set_speed(&mut self, speed: f64) -> Result<(), SettingsError> {
        let load = self.audio.set_speed(speed)?;
        self.audio_settings_changed(load);
        Ok(())
    }

    pub fn set_audio_settings(&mut self, settings: AudioSettings) {
        let load = self.audio.set_settings(settings);
        self.audio_settings_changed(load);
    }

    fn audio_settings_changed(&mut self, load: Option<AudioLoad>) {
        self.dispatch_audio(load);

        let rate = self.audio.effective_samplerate();
        if rate != self.effective_samplerate {
            tracing::debug!(from = self.effective_samplerate, to = rate, "Effective sample rate changed");
            self.effective_samplerate = rate;
            let windows = self.subject.windows(rate, &self.spectrogram);
            self.viewport.set_bounds(windows.bounds);
            self.viewport
                .set_frequency_interval(frequency_reset_interval(rate, self.spectrogram.freq_scale));
        }

        let requests = self.chunks.update_settings(
            self.subject.recording(),
            self.audio.render_settings(),
            self.spectrogram.clone(),
        );
        self.dispatch_chunks(requests);
        self.time_scale
            .sync(self.spectrogram.time_scale, self.audio.speed(), &mut self.viewport);
        self.sync_chunks();
    }

    pub fn set_spectrogram_settings(&mut self, settings: SpectrogramSettings) {
        self.spectrogram = settings;
        let requests = self.chunks.update_settings(
            self.subject.recording(),
            self.audio.render_settings(),
            self.spectrogram.clone(),
        );
        self.dispatch_chunks(requests);
        self.freq_scale.sync(self.spectrogram.freq_scale, &mut self.viewport);
        self.time_scale
            .sync(self.spectrogram.time_scale, self.audio.speed(), &mut self.viewport);
        self.sync_chunks();
    }

    pub fn apply_spectrogram_action(&mut self, action: SpectrogramSettingsAction) -> Result<(), SettingsError> {
        let mut next = self.spectrogram.clone();
        next.apply(action)?;
        self.set_spectrogram_settings(next);
        Ok(())
    }

    /// Force every requested chunk to be fetched again.
    pub fn regenerate(&mut self) {
        let requests = self.chunks.refresh();
        if let Some(metrics) = &self.metrics {
            metrics.record_refresh();
        }
        self.dispatch_chunks(requests);
    }

    pub fn time_scale(&self) -> f64 {
        self.time_scale.value()
    }

    pub fn freq_scale(&self) -> f64 {
        self.freq_scale.value()
    }

    pub fn preview_time_scale(&mut self, scale: f64) {
        self.time_scale
            .preview(scale, self.audio.speed(), &mut self.viewport);
        self.sync_chunks();
    }

    pub fn commit_time_scale(&mut self, scale: f64) -> Result<(), SettingsError> {
        let mut next = self.spectrogram.clone();
        self.time_scale.commit(scale, &mut next)?;
        self.set_spectrogram_settings(next);
        Ok(())
    }

    pub fn preview_freq_scale(&mut self, scale: f64) {
        self.freq_scale.preview(scale, &mut self.viewport);
    }

    pub fn commit_freq_scale(&mut self, scale: f64) -> Result<(), SettingsError> {
        let mut next = self.spectrogram.clone();
        self.freq_scale.commit(scale, &mut next)?;
        self.set_spectrogram_settings(next);
        Ok(())
    }

    /// Viewport history and reset, followed by any newly needed chunks.
    pub fn back(&mut self) -> bool {
        let moved = self.viewport.back();
        self.sync_chunks();
        moved
    }

    pub fn reset_viewport(&mut self) -> bool {
        let moved = self.viewport.reset();
        self.sync_chunks();
        moved
    }

    pub fn annotations(&self) -> &[AnnotationRecord] {
        &self.annotations
    }

    pub fn set_annotations(&mut self, annotations: Vec<AnnotationRecord>) {
        if self.selected.is_some_and(|id| !annotations.iter().any(|a| a.id == id)) {
            self.selected = None;
        }
        self.annotations = annotations;
    }

    pub fn selected(&self) -> Option<AnnotationId> {
        self.selected
    }

    /// Switching between viewport and annotation modes leaves the other
    /// machine idle.
    pub fn set_spectrogram_mode(&mut self, mode: SpectrogramMode) {
        self.draw.set_idle();
        self.interactions.set_mode(mode);
    }

    /// `P` hotkey. Pressing it again returns to idle.
    pub fn toggle_panning(&mut self) {
        self.draw.set_idle();
        self.interactions.toggle_panning();
    }

    /// `Z` hotkey.
    pub fn toggle_zooming(&mut self) {
        self.draw.set_idle();
        self.interactions.toggle_zooming();
    }

    pub fn enable_drawing(&mut self, geometry_type: GeometryType) {
        self.interactions.set_mode(SpectrogramMode::Idle);
        self.draw.set_geometry_type(geometry_type);
        self.draw.enable_drawing();
    }

    /// Redraw the geometry of an existing annotation.
    pub fn enable_editing(&mut self, id: AnnotationId) -> bool {
        let Some(record) = self.annotations.iter().find(|a| a.id == id) else {
            return false;
        };
        let geometry_type = record.geometry.geometry_type();
        self.interactions.set_mode(SpectrogramMode::Idle);
        self.draw.enable_editing(id, geometry_type);
        true
    }

    pub fn enable_selecting(&mut self) {
        self.interactions.set_mode(SpectrogramMode::Idle);
        self.draw.enable_selecting();
    }

    pub fn enable_deleting(&mut self) {
        self.interactions.set_mode(SpectrogramMode::Idle);
        self.draw.enable_deleting();
    }

    pub fn set_drawing_enabled(&mut self, enabled: bool) {
        self.draw.set_enabled(enabled);
    }

    /// Escape: drop gestures in progress and return to idle.
    pub fn cancel(&mut self) {
        self.draw.cancel();
        self.draw.set_idle();
        self.interactions.cancel();
    }

    fn position(&self, pixel: Pixel, dimensions: Dimensions) -> Position {
        scale_pixel_to_window(pixel, &self.viewport.viewport(), dimensions)
    }

    pub fn pointer_down(&mut self, at: Pixel, dimensions: Dimensions) {
        match self.draw.mode() {
            DrawMode::Drawing => {
                let position = self.position(at, dimensions);
                self.draw.pointer_down(position);
            }
            DrawMode::Selecting | DrawMode::Deleting => {}
            DrawMode::Idle => self.interactions.pointer_down(at, &self.viewport, dimensions),
        }
    }

    pub fn pointer_move(&mut self, at: Pixel, dimensions: Dimensions) {
        match self.draw.mode() {
            DrawMode::Drawing => {
                let position = self.position(at, dimensions);
                self.draw.pointer_move(position);
            }
            DrawMode::Selecting | DrawMode::Deleting => {
                self.hovered = pick_annotation(
                    &self.annotations,
                    at,
                    &self.viewport.viewport(),
                    dimensions,
                    self.config.ui.hit_tolerance_px,
                );
            }
            DrawMode::Idle => {
                if self.interactions.pointer_move(at, &mut self.viewport, dimensions) {
                    self.sync_chunks();
                }
            }
        }
    }

    /// Finish a gesture. Annotation results are applied to the local
    /// records and returned so the caller can persist them.
    pub fn pointer_up(&mut self, at: Pixel, dimensions: Dimensions) -> Option<DrawOutput> {
        let output = match self.draw.mode() {
            DrawMode::Drawing => {
                let position = self.position(at, dimensions);
                self.draw.pointer_up(position)
            }
            DrawMode::Selecting | DrawMode::Deleting => self.draw.pick(
                &self.annotations,
                at,
                &self.viewport.viewport(),
                dimensions,
                self.config.ui.hit_tolerance_px,
            ),
            DrawMode::Idle => {
                match self.interactions.pointer_up(at, &mut self.viewport, dimensions) {
                    Some(InteractionOutput::Seek(time)) => self.seek(time),
                    Some(InteractionOutput::Zoomed(_)) => self.sync_chunks(),
                    None => {}
                }
                None
            }
        };
        output.map(|out| self.apply_draw_output(out))
    }

    pub fn double_click(&mut self, at: Pixel, dimensions: Dimensions) -> Option<DrawOutput> {
        let position = self.position(at, dimensions);
        self.draw
            .double_click(position)
            .map(|out| self.apply_draw_output(out))
    }

    /// Commit an in-progress line string.
    pub fn finish_drawing(&mut self) -> Option<DrawOutput> {
        self.draw.finish().map(|out| self.apply_draw_output(out))
    }

    pub fn scroll(&mut self, amount: f64, at: Pixel, dimensions: Dimensions) {
        if self.interactions.scroll(amount, at, &mut self.viewport, dimensions) {
            self.sync_chunks();
        }
    }

    fn apply_draw_output(&mut self, output: DrawOutput) -> DrawOutput {
        match &output {
            DrawOutput::Selected(id) => self.selected = Some(*id),
            DrawOutput::Deleted(id) => {
                self.annotations.retain(|a| a.id != *id);
                if self.selected == Some(*id) {
                    self.selected = None;
                }
                self.hovered = None;
            }
            DrawOutput::Edited { id, geometry } => {
                if let Some(record) = self.annotations.iter_mut().find(|a| a.id == *id) {
                    record.geometry = geometry.clone();
                }
            }
            DrawOutput::Created(_) => {}
        }
        output
    }

    /// Send an annotation change to the server; the result arrives as a
    /// notification.
    pub fn persist(&mut self, mutation: Mutation) {
        self.dispatcher.dispatch(FetchJob::Mutation(mutation));
    }

    pub fn search_species(&mut self) {
        if let Some(query) = self.species.trigger() {
            self.dispatcher.dispatch(FetchJob::Species(query));
        }
    }

    /// Tag `entity` with a species from the search results.
    pub fn apply_species(&mut self, entity: &str, candidate: &SpeciesCandidate) {
        self.persist(Mutation::AddTag {
            entity: entity.to_string(),
            tag: candidate.to_tag(),
        });
    }

    /// Everything drawn this frame.
    pub fn frame(&self, cursor: Option<Pixel>) -> Frame<'_> {
        Frame {
            chunks: Some(&self.chunks),
            playback_time: Some(self.audio.current_time()),
            interactions: Some(&self.interactions),
            draw: Some(&self.draw),
            annotations: &self.annotations,
            selected: self.selected,
            hovered: self.hovered,
            cursor,
            ..Frame::new(self.viewport.viewport())
        }
    }

    pub fn paint(&mut self, canvas: &mut dyn Canvas, cursor: Option<Pixel>) {
        let start = Instant::now();
        compose(canvas, &self.frame(cursor));
        if let Some(metrics) = &mut self.metrics {
            metrics.record_frame_time(start.elapsed());
        }
    }

    pub fn current_window(&self) -> SpectrogramWindow {
        self.viewport.viewport()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Geometry;
    use crate::services::fetch::InlineDispatcher;
    use crate::test_fixtures::{fixture_recording, Fixtures, ManualPlayback, RecordingCanvas};

    const DIMS: Dimensions = Dimensions {
        width: 200.0,
        height: 100.0,
    };

    fn viewer_with(fixtures: &Fixtures) -> SpectrogramViewer {
        let (backend, _clock) = ManualPlayback::new();
        SpectrogramViewer::new(
            ViewSubject::Recording {
                recording: fixture_recording(120.0),
                start_time: 0.0,
                end_time: None,
            },
            AudioSettings::default(),
            SpectrogramSettings::default(),
            AppConfig::default(),
            Box::new(backend),
            Box::new(InlineDispatcher::new(fixtures.sources())),
        )
    }

    #[test]
    fn test_initial_chunks_fetched_on_update() {
        let fixtures = Fixtures::default();
        let mut viewer = viewer_with(&fixtures);
        assert!(fixtures.spectrograms.requests() > 0);
        assert_eq!(viewer.generation_status(), GenerationStatus::Generating);

        viewer.update();
        assert_eq!(viewer.generation_status(), GenerationStatus::Ready);

        let mut canvas = RecordingCanvas::new(DIMS.width, DIMS.height);
        viewer.paint(&mut canvas, None);
        assert!(!canvas.images().is_empty());
    }

    #[test]
    fn test_click_seeks() {
        let fixtures = Fixtures::default();
        let mut viewer = viewer_with(&fixtures);
        let at = Pixel::new(50.0, 50.0);
        let expected = scale_pixel_to_window(at, &viewer.current_window(), DIMS).time;

        viewer.pointer_down(at, DIMS);
        assert!(viewer.pointer_up(at, DIMS).is_none());
        assert!((viewer.audio().current_time() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_drawing_returns_geometry_and_idles_viewport_modes() {
        let fixtures = Fixtures::default();
        let mut viewer = viewer_with(&fixtures);
        viewer.set_spectrogram_mode(SpectrogramMode::Panning);
        viewer.enable_drawing(GeometryType::BoundingBox);
        assert_eq!(viewer.interactions().mode(), SpectrogramMode::Idle);

        let before = viewer.current_window();
        viewer.pointer_down(Pixel::new(20.0, 20.0), DIMS);
        viewer.pointer_move(Pixel::new(60.0, 60.0), DIMS);
        let output = viewer.pointer_up(Pixel::new(60.0, 60.0), DIMS);

        assert!(matches!(output, Some(DrawOutput::Created(Geometry::BoundingBox(_)))));
        assert_eq!(viewer.current_window(), before, "drawing must not pan");
        assert_eq!(viewer.draw_state().mode(), DrawMode::Idle);
    }

    #[test]
    fn test_viewport_mode_cancels_drawing() {
        let fixtures = Fixtures::default();
        let mut viewer = viewer_with(&fixtures);
        viewer.enable_drawing(GeometryType::TimeStamp);
        viewer.set_spectrogram_mode(SpectrogramMode::Zooming);
        assert_eq!(viewer.draw_state().mode(), DrawMode::Idle);
        assert_eq!(viewer.interactions().mode(), SpectrogramMode::Zooming);
    }

    #[test]
    fn test_delete_removes_local_record() {
        let fixtures = Fixtures::default();
        let mut viewer = viewer_with(&fixtures);
        viewer.set_annotations(vec![
            AnnotationRecord {
                id: 1,
                geometry: Geometry::TimeInterval([1.0, 3.0]),
            },
            AnnotationRecord {
                id: 2,
                geometry: Geometry::TimeStamp(15.0),
            },
        ]);
        let x = crate::interval::scale_time_to_viewport(2.0, &viewer.current_window(), DIMS.width);

        viewer.enable_deleting();
        viewer.pointer_move(Pixel::new(x, 50.0), DIMS);
        let output = viewer.pointer_up(Pixel::new(x, 50.0), DIMS);

        assert_eq!(output, Some(DrawOutput::Deleted(1)));
        assert_eq!(viewer.annotations().len(), 1);
        assert_eq!(viewer.annotations()[0].id, 2);
    }

    #[test]
    fn test_same_subject_keeps_viewport() {
        let fixtures = Fixtures::default();
        let mut viewer = viewer_with(&fixtures);
        viewer.viewport_mut().shift_by(10.0, 0.0);
        let moved = viewer.current_window();

        viewer.set_subject(ViewSubject::Recording {
            recording: fixture_recording(120.0),
            start_time: 0.0,
            end_time: None,
        });
        assert_eq!(viewer.current_window(), moved);

        let mut other = fixture_recording(30.0);
        other.uuid = "other-recording".to_string();
        viewer.set_subject(ViewSubject::Recording {
            recording: other,
            start_time: 0.0,
            end_time: None,
        });
        assert_eq!(viewer.current_window().time.min, 0.0);
        assert_eq!(viewer.viewport().bounds().time.max, 30.0);
    }

    #[test]
    fn test_species_search_round_trip() {
        let fixtures = Fixtures::default();
        let mut viewer = viewer_with(&fixtures);
        viewer.species_mut().set_query("Myotis");
        viewer.search_species();
        assert!(viewer.species().is_loading());

        viewer.update();
        assert!(!viewer.species().is_loading());
        assert_eq!(viewer.species().results().len(), 2);
    }

    #[test]
    fn test_persist_reports_notification() {
        let fixtures = Fixtures::default();
        let mut viewer = viewer_with(&fixtures);
        viewer.persist(Mutation::CreateNote {
            entity: "clip-1".to_string(),
            message: "check this".to_string(),
        });
        viewer.update();

        assert_eq!(viewer.notifications_mut().drain().len(), 1);
        assert_eq!(fixtures.annotations.log().len(), 1);
    }

    #[test]
    fn test_view_only_settings_do_not_refetch() {
        let fixtures = Fixtures::default();
        let mut viewer = viewer_with(&fixtures);
        viewer.update();
        let requests = fixtures.spectrograms.requests();

        let mut settings = viewer.spectrogram_settings().clone();
        settings.height = 512.0;
        viewer.set_spectrogram_settings(settings);
        assert_eq!(fixtures.spectrograms.requests(), requests);

        viewer.regenerate();
        assert!(fixtures.spectrograms.requests() > requests);
    }
}
