use eframe::egui;

use crate::draw::DrawOutput;
use crate::interval::{Dimensions, Pixel};
use crate::ui::canvas::{EguiCanvas, TextureCache};
use crate::view::SpectrogramViewer;

/// The spectrogram canvas widget. Translates egui pointer input into
/// viewer gestures and paints the composed frame.
#[derive(Default)]
pub struct SpectrogramView {
    textures: TextureCache,
    /// Primary button went down inside the canvas and is still held.
    pressed: bool,
    last_pointer: Option<Pixel>,
}

impl SpectrogramView {
    /// Lay out and paint the canvas. Returns the annotation result of a
    /// finished gesture, if any.
    pub fn show(&mut self, ui: &mut egui::Ui, viewer: &mut SpectrogramViewer, height: f32) -> Option<DrawOutput> {
        let size = egui::vec2(ui.available_width(), height);
        let (rect, response) = ui.allocate_exact_size(size, egui::Sense::click_and_drag());
        let dimensions = Dimensions::new(rect.width() as f64, rect.height() as f64);
        let to_pixel = |pos: egui::Pos2| Pixel::new((pos.x - rect.min.x) as f64, (pos.y - rect.min.y) as f64);

        let (pressed, released, pointer, scroll, escape) = ui.input(|i| {
            (
                i.pointer.primary_pressed(),
                i.pointer.primary_released(),
                i.pointer.interact_pos(),
                i.smooth_scroll_delta.y,
                i.key_pressed(egui::Key::Escape),
            )
        });
        // Letter hotkeys stay quiet while a text field has focus.
        let (pan_key, zoom_key) = if ui.ctx().wants_keyboard_input() {
            (false, false)
        } else {
            ui.input(|i| (i.key_pressed(egui::Key::P), i.key_pressed(egui::Key::Z)))
        };

        let mut output = None;

        if escape {
            viewer.cancel();
            self.pressed = false;
        }
        if pan_key {
            viewer.toggle_panning();
            self.pressed = false;
        }
        if zoom_key {
            viewer.toggle_zooming();
            self.pressed = false;
        }

        let hovered = response.hovered();
        let cursor = response.hover_pos().map(to_pixel);

        if pressed && hovered {
            if let Some(pos) = pointer {
                self.pressed = true;
                viewer.pointer_down(to_pixel(pos), dimensions);
            }
        }

        let current = if self.pressed { pointer.map(to_pixel) } else { cursor };
        if let Some(at) = current {
            if self.last_pointer != Some(at) {
                viewer.pointer_move(at, dimensions);
            }
        }
        self.last_pointer = current;

        if released && self.pressed {
            self.pressed = false;
            if let Some(at) = pointer.map(to_pixel) {
                output = viewer.pointer_up(at, dimensions);
            }
        }

        if response.double_clicked() {
            if let Some(at) = cursor {
                output = output.or(viewer.double_click(at, dimensions));
            }
        }

        if hovered && scroll != 0.0 {
            if let Some(at) = cursor {
                viewer.scroll(scroll as f64, at, dimensions);
            }
        }

        if ui.is_rect_visible(rect) {
            let painter = ui.painter_at(rect);
            painter.rect_filled(rect, 0.0, egui::Color32::from_gray(20));
            let mut canvas = EguiCanvas::new(&painter, rect, &mut self.textures);
            viewer.paint(&mut canvas, cursor);
            self.textures.end_frame();
        }

        output
    }
}
