use std::path::PathBuf;
use std::time::Duration;

use eframe::egui;

use crate::chunk_manager::GenerationStatus;
use crate::draw::DrawOutput;
use crate::geometry::{AnnotationId, AnnotationRecord};
use crate::services::mutations::{Mutation, Notification};
use crate::session::SettingsStore;
use crate::species::SpeciesCandidate;
use crate::ui::{ControlAction, ControlsPanel, SpectrogramView};
use crate::view::SpectrogramViewer;
use crate::windows::ViewSubject;

/// Notifications kept on screen.
const VISIBLE_NOTIFICATIONS: usize = 5;

pub struct WhombatApp {
    viewer: SpectrogramViewer,
    view: SpectrogramView,
    store: SettingsStore,
    store_path: Option<PathBuf>,
    notifications: Vec<Notification>,
    next_annotation_id: AnnotationId,
    show_metrics: bool,
    repaint_interval: Duration,
}

impl WhombatApp {
    /// `store_path` is where settings changes are written; `None` keeps them
    /// in memory only.
    pub fn new(mut viewer: SpectrogramViewer, store: SettingsStore, store_path: Option<PathBuf>) -> Self {
        if let ViewSubject::SoundEvent { geometry, .. } = viewer.subject() {
            let record = AnnotationRecord {
                id: 0,
                geometry: geometry.clone(),
            };
            viewer.set_annotations(vec![record]);
        }
        let config = viewer.config();
        let show_metrics = config.metrics.enabled && config.metrics.show_metrics_panel;
        let repaint_interval = Duration::from_secs_f64(1.0 / f64::from(config.ui.target_fps.max(1)));

        Self {
            viewer,
            view: SpectrogramView::default(),
            store,
            store_path,
            notifications: Vec::new(),
            next_annotation_id: 1,
            show_metrics,
            repaint_interval,
        }
    }

    fn save_settings(&mut self) {
        self.store.audio = self.viewer.audio_settings().clone();
        self.store.spectrogram = self.viewer.spectrogram_settings().clone();
        let Some(path) = &self.store_path else {
            return;
        };
        if let Err(e) = self.store.save_to_file(path) {
            tracing::warn!(error = %format!("{:#}", e), "Failed to save settings");
        }
    }

    fn handle_control(&mut self, action: ControlAction) {
        match action {
            ControlAction::TogglePlayback => self.viewer.toggle_play(),
            ControlAction::ToggleLoop => {
                self.viewer.toggle_loop();
            }
            ControlAction::RetryAudio => self.viewer.retry_audio(),
            ControlAction::SetSpeed(speed) => {
                match self.viewer.set_speed(speed) {
                    Ok(()) => self.save_settings(),
                    Err(e) => tracing::warn!(error = %e, "Rejected playback speed"),
                }
            }
            ControlAction::SetVolume(volume) => self.viewer.set_volume(volume),
            ControlAction::SetMode(mode) => self.viewer.set_spectrogram_mode(mode),
            ControlAction::Draw(geometry_type) => self.viewer.enable_drawing(geometry_type),
            ControlAction::Select => self.viewer.enable_selecting(),
            ControlAction::Delete => self.viewer.enable_deleting(),
            ControlAction::Back => {
                self.viewer.back();
            }
            ControlAction::ResetViewport => {
                self.viewer.reset_viewport();
            }
            ControlAction::Regenerate => self.viewer.regenerate(),
            ControlAction::PreviewTimeScale(scale) => self.viewer.preview_time_scale(scale),
            ControlAction::PreviewFreqScale(scale) => self.viewer.preview_freq_scale(scale),
            ControlAction::CommitTimeScale(scale) => match self.viewer.commit_time_scale(scale) {
                Ok(()) => self.save_settings(),
                Err(e) => tracing::warn!(error = %e, "Rejected time scale"),
            },
            ControlAction::CommitFreqScale(scale) => match self.viewer.commit_freq_scale(scale) {
                Ok(()) => self.save_settings(),
                Err(e) => tracing::warn!(error = %e, "Rejected frequency scale"),
            },
        }
    }

    /// Keep finished annotations locally and send sound-event geometry
    /// changes to the server.
    fn handle_draw_output(&mut self, output: DrawOutput) {
        match output {
            DrawOutput::Created(geometry) => {
                let mut annotations = self.viewer.annotations().to_vec();
                annotations.push(AnnotationRecord {
                    id: self.next_annotation_id,
                    geometry: geometry.clone(),
                });
                self.next_annotation_id += 1;
                self.viewer.set_annotations(annotations);
                if let Some(mutation) = Mutation::persist_geometry(self.viewer.subject(), geometry) {
                    self.viewer.persist(mutation);
                }
            }
            DrawOutput::Edited { id, geometry } => {
                tracing::debug!(annotation = id, "Annotation edited");
                if let Some(mutation) = Mutation::persist_geometry(self.viewer.subject(), geometry) {
                    self.viewer.persist(mutation);
                }
            }
            DrawOutput::Selected(id) => tracing::debug!(annotation = id, "Annotation selected"),
            DrawOutput::Deleted(id) => tracing::info!(annotation = id, "Annotation removed"),
        }
    }

    fn apply_species(&mut self, candidate: SpeciesCandidate) {
        let entity = self.viewer.subject().uuid().to_string();
        tracing::info!(entity = %entity, species = %candidate.canonical_name, "Tagging species");
        self.viewer.apply_species(&entity, &candidate);
    }
}

impl eframe::App for WhombatApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.viewer.update();

        self.notifications
            .extend(self.viewer.notifications_mut().drain());
        let overflow = self.notifications.len().saturating_sub(VISIBLE_NOTIFICATIONS);
        self.notifications.drain(..overflow);

        let mut control = None;
        let mut settings_action = None;
        let mut species = None;

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("🦇 Whombat Viewer");
                ui.label(self.viewer.subject().uuid());
                ui.checkbox(&mut self.show_metrics, "Metrics");
            });
            ui.separator();
            control = ControlsPanel::tools(ui, &self.viewer);
            settings_action = ControlsPanel::settings(ui, &self.viewer);
        });

        egui::TopBottomPanel::bottom("player_panel").show(ctx, |ui| {
            if let Some(action) = ControlsPanel::player(ui, &self.viewer) {
                control = Some(action);
            }
            ui.separator();
            species = ControlsPanel::species(ui, &mut self.viewer);
            ControlsPanel::notifications(ui, &self.notifications);
        });

        if self.show_metrics {
            if let Some(metrics) = self.viewer.metrics() {
                egui::SidePanel::right("metrics_panel").show(ctx, |ui| {
                    metrics.summary().ui_panel(ui);
                });
            }
        }

        let mut drawn = None;
        egui::CentralPanel::default().show(ctx, |ui| {
            let height = self.viewer.spectrogram_settings().height as f32;
            drawn = self.view.show(ui, &mut self.viewer, height);
            let status = match self.viewer.generation_status() {
                GenerationStatus::Generating => "⏳ Generating spectrogram",
                GenerationStatus::Ready => "✔ Spectrogram ready",
                GenerationStatus::Failed => "⚠ Some chunks failed, try Regenerate",
            };
            ui.label(status);
        });

        if let Some(action) = control {
            self.handle_control(action);
        }
        if let Some(action) = settings_action {
            match self.viewer.apply_spectrogram_action(action) {
                Ok(()) => self.save_settings(),
                Err(e) => tracing::warn!(error = %e, "Rejected spectrogram setting"),
            }
        }
        if let Some(candidate) = species {
            self.apply_species(candidate);
        }
        if let Some(output) = drawn {
            self.handle_draw_output(output);
        }

        // Fetch results and playback arrive off the UI thread.
        ctx.request_repaint_after(self.repaint_interval);
    }
}
