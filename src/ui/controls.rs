use eframe::egui;

use crate::geometry::GeometryType;
use crate::interactions::SpectrogramMode;
use crate::presets::{matches_preset, SPEED_OPTIONS};
use crate::services::mutations::{Notification, NotificationLevel};
use crate::settings::{Colormap, Scale, SpectrogramSettingsAction};
use crate::species::SpeciesCandidate;
use crate::utils::{format_duration, format_frequency};
use crate::view::SpectrogramViewer;

#[derive(Debug, Clone, PartialEq)]
pub enum ControlAction {
    TogglePlayback,
    ToggleLoop,
    RetryAudio,
    SetSpeed(f64),
    SetVolume(f32),
    SetMode(SpectrogramMode),
    Draw(GeometryType),
    Select,
    Delete,
    Back,
    ResetViewport,
    Regenerate,
    PreviewTimeScale(f64),
    CommitTimeScale(f64),
    PreviewFreqScale(f64),
    CommitFreqScale(f64),
}

pub struct ControlsPanel;

impl ControlsPanel {
    /// Playback row: play/pause, loop, speed, volume and position.
    pub fn player(ui: &mut egui::Ui, viewer: &SpectrogramViewer) -> Option<ControlAction> {
        let mut action = None;
        let audio = viewer.audio();

        ui.horizontal(|ui| {
            let play_button_text = if audio.is_playing() { "⏸ Pause" } else { "▶ Play" };
            let can_toggle = audio.is_playing() || audio.state().can_play();
            if ui.add_enabled(can_toggle, egui::Button::new(play_button_text)).clicked() {
                action = Some(ControlAction::TogglePlayback);
            }

            let loop_text = if audio.is_looping() { "🔁 Loop on" } else { "🔁 Loop off" };
            if ui.button(loop_text).clicked() {
                action = Some(ControlAction::ToggleLoop);
            }

            let speed = audio.speed();
            egui::ComboBox::from_id_salt("speed")
                .selected_text(matches_preset(speed).map_or_else(|| format!("{:.2}x", speed), String::from))
                .show_ui(ui, |ui| {
                    for preset in SPEED_OPTIONS {
                        if ui
                            .selectable_label(matches_preset(speed) == Some(preset.label), preset.label)
                            .clicked()
                        {
                            action = Some(ControlAction::SetSpeed(preset.speed));
                        }
                    }
                });

            let mut volume = audio.volume();
            if ui
                .add(egui::Slider::new(&mut volume, 0.0..=1.0).text("🔈"))
                .changed()
            {
                action = Some(ControlAction::SetVolume(volume));
            }

            ui.label(format!(
                "{} / {}",
                format_duration(audio.current_time()),
                format_duration(audio.limits().max)
            ));

            let freq = viewer.current_window().freq;
            ui.label(format!("{} - {}", format_frequency(freq.min), format_frequency(freq.max)));

            let state = audio.state();
            ui.label(format!("{} {}", state.status_icon(), state.status_message()));
            if let Some(error) = state.error() {
                let retry = ui
                    .button("Retry")
                    .on_hover_text(error.recovery_hint().unwrap_or("Fetch the segment again"));
                if retry.clicked() {
                    action = Some(ControlAction::RetryAudio);
                }
            }
        });

        action
    }

    /// Viewport and annotation tools.
    pub fn tools(ui: &mut egui::Ui, viewer: &SpectrogramViewer) -> Option<ControlAction> {
        let mut action = None;
        let mode = viewer.interactions().mode();

        ui.horizontal(|ui| {
            if ui.selectable_label(mode == SpectrogramMode::Panning, "✋ Pan").clicked() {
                action = Some(ControlAction::SetMode(if mode == SpectrogramMode::Panning {
                    SpectrogramMode::Idle
                } else {
                    SpectrogramMode::Panning
                }));
            }
            if ui.selectable_label(mode == SpectrogramMode::Zooming, "🔍 Zoom").clicked() {
                action = Some(ControlAction::SetMode(if mode == SpectrogramMode::Zooming {
                    SpectrogramMode::Idle
                } else {
                    SpectrogramMode::Zooming
                }));
            }
            if ui.button("⬅ Back").clicked() {
                action = Some(ControlAction::Back);
            }
            if ui.button("⟲ Reset").clicked() {
                action = Some(ControlAction::ResetViewport);
            }

            ui.separator();

            for geometry_type in GeometryType::ALL {
                if ui.button(format!("✏ {}", geometry_type)).clicked() {
                    action = Some(ControlAction::Draw(geometry_type));
                }
            }
            if ui.button("☝ Select").clicked() {
                action = Some(ControlAction::Select);
            }
            if ui.button("🗑 Delete").clicked() {
                action = Some(ControlAction::Delete);
            }
        });

        ui.horizontal(|ui| {
            let mut time_scale = viewer.time_scale();
            let response = ui.add(egui::Slider::new(&mut time_scale, 1.0..=10.0).text("Time zoom"));
            if response.changed() {
                action = Some(ControlAction::PreviewTimeScale(time_scale));
            }
            if response.drag_stopped() || (response.changed() && !response.dragged()) {
                action = Some(ControlAction::CommitTimeScale(time_scale));
            }

            let mut freq_scale = viewer.freq_scale();
            let response = ui.add(egui::Slider::new(&mut freq_scale, 0.1..=10.0).text("Freq zoom"));
            if response.changed() {
                action = Some(ControlAction::PreviewFreqScale(freq_scale));
            }
            if response.drag_stopped() || (response.changed() && !response.dragged()) {
                action = Some(ControlAction::CommitFreqScale(freq_scale));
            }

            if ui.button("🔄 Regenerate").clicked() {
                action = Some(ControlAction::Regenerate);
            }
        });

        action
    }

    /// Spectrogram parameters.
    pub fn settings(ui: &mut egui::Ui, viewer: &SpectrogramViewer) -> Option<SpectrogramSettingsAction> {
        let mut action = None;
        let settings = viewer.spectrogram_settings();

        ui.horizontal(|ui| {
            egui::ComboBox::from_label("Colormap")
                .selected_text(settings.cmap.as_str())
                .show_ui(ui, |ui| {
                    for cmap in Colormap::ALL {
                        if ui.selectable_label(settings.cmap == cmap, cmap.as_str()).clicked() {
                            action = Some(SpectrogramSettingsAction::SetColormap(cmap));
                        }
                    }
                });

            egui::ComboBox::from_label("Scale")
                .selected_text(settings.scale.as_str())
                .show_ui(ui, |ui| {
                    for scale in Scale::ALL {
                        if ui.selectable_label(settings.scale == scale, scale.as_str()).clicked() {
                            action = Some(SpectrogramSettingsAction::SetScale(scale));
                        }
                    }
                });
        });

        ui.horizontal(|ui| {
            let mut window_ms = settings.window_size * 1000.0;
            if ui
                .add(egui::DragValue::new(&mut window_ms).range(1.0..=1000.0).suffix(" ms"))
                .changed()
            {
                action = Some(SpectrogramSettingsAction::SetWindowSize(window_ms / 1000.0));
            }

            let mut overlap = settings.overlap;
            if ui
                .add(egui::Slider::new(&mut overlap, 0.05..=0.95).text("Overlap"))
                .changed()
            {
                action = Some(SpectrogramSettingsAction::SetOverlap(overlap));
            }

            let (mut min_db, mut max_db) = (settings.min_db, settings.max_db);
            ui.label("dB range:");
            if ui.add(egui::DragValue::new(&mut min_db).speed(1.0)).changed() {
                action = Some(SpectrogramSettingsAction::SetDbRange {
                    min: Some(min_db),
                    max: None,
                });
            }
            if ui.add(egui::DragValue::new(&mut max_db).speed(1.0)).changed() {
                action = Some(SpectrogramSettingsAction::SetDbRange {
                    min: None,
                    max: Some(max_db),
                });
            }

            let (mut pcen, mut normalize) = (settings.pcen, settings.normalize);
            if ui.checkbox(&mut pcen, "PCEN").changed() {
                action = Some(SpectrogramSettingsAction::TogglePcen);
            }
            if ui.checkbox(&mut normalize, "Normalize").changed() {
                action = Some(SpectrogramSettingsAction::ToggleNormalize);
            }
            if ui.button("Defaults").clicked() {
                action = Some(SpectrogramSettingsAction::Reset);
            }
        });

        action
    }

    /// Species search box. Returns a candidate the user picked.
    pub fn species(ui: &mut egui::Ui, viewer: &mut SpectrogramViewer) -> Option<SpeciesCandidate> {
        let mut picked = None;
        let mut search = false;

        ui.horizontal(|ui| {
            ui.label("🦇 Species:");
            let mut query = viewer.species().query().to_string();
            let response = ui.text_edit_singleline(&mut query);
            if response.changed() {
                viewer.species_mut().set_query(query);
            }
            let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            if ui
                .add_enabled(viewer.species().can_search(), egui::Button::new("Search"))
                .clicked()
                || submitted
            {
                search = true;
            }
            if viewer.species().is_loading() {
                ui.spinner();
            }
        });

        if search {
            viewer.search_species();
        }

        if let Some(error) = viewer.species().error() {
            ui.colored_label(egui::Color32::RED, error.to_string());
            if error.is_recoverable() {
                ui.label("Press Search to try again");
            }
        }
        for candidate in viewer.species().results() {
            if ui.link(&candidate.canonical_name).clicked() {
                picked = Some(candidate.clone());
            }
        }

        picked
    }

    pub fn notifications(ui: &mut egui::Ui, notifications: &[Notification]) {
        for notification in notifications {
            let color = match notification.level {
                NotificationLevel::Success => egui::Color32::from_rgb(16, 185, 129),
                NotificationLevel::Error => egui::Color32::from_rgb(239, 68, 68),
            };
            ui.colored_label(color, &notification.message);
        }
    }
}
