use std::collections::{HashMap, HashSet};

use eframe::egui;

use crate::canvas::{Canvas, ChunkImage, Color, Style, UvRect};
use crate::interval::{Dimensions, Pixel, PixelRect};

/// GPU textures for chunk images, keyed by image id. Images not drawn
/// during a frame are released at the end of it.
#[derive(Default)]
pub struct TextureCache {
    textures: HashMap<u64, egui::TextureHandle>,
    used: HashSet<u64>,
}

impl TextureCache {
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    fn texture(&mut self, ctx: &egui::Context, image: &ChunkImage) -> egui::TextureId {
        self.used.insert(image.id());
        self.textures
            .entry(image.id())
            .or_insert_with(|| {
                let pixels = egui::ColorImage::from_rgba_unmultiplied(
                    [image.width() as usize, image.height() as usize],
                    image.pixels(),
                );
                ctx.load_texture(
                    format!("chunk-{}", image.id()),
                    pixels,
                    egui::TextureOptions::LINEAR,
                )
            })
            .id()
    }

    pub fn end_frame(&mut self) {
        let used = std::mem::take(&mut self.used);
        self.textures.retain(|id, _| used.contains(id));
    }
}

/// [`Canvas`] over an egui painter clipped to `rect`.
pub struct EguiCanvas<'a> {
    painter: &'a egui::Painter,
    rect: egui::Rect,
    textures: &'a mut TextureCache,
}

impl<'a> EguiCanvas<'a> {
    pub fn new(painter: &'a egui::Painter, rect: egui::Rect, textures: &'a mut TextureCache) -> Self {
        Self {
            painter,
            rect,
            textures,
        }
    }

    fn pos(&self, p: Pixel) -> egui::Pos2 {
        egui::pos2(self.rect.min.x + p.x as f32, self.rect.min.y + p.y as f32)
    }

    fn screen_rect(&self, rect: PixelRect) -> egui::Rect {
        egui::Rect::from_min_max(self.pos(rect.min), self.pos(rect.max))
    }

    fn stroke(style: &Style) -> egui::Stroke {
        egui::Stroke::new(style.border_width as f32, color32(style.border_color))
    }

    fn stroke_path(&self, points: Vec<egui::Pos2>, style: &Style) {
        let stroke = Self::stroke(style);
        match style.border_dash {
            Some([dash, gap]) => {
                self.painter
                    .extend(egui::Shape::dashed_line(&points, stroke, dash as f32, gap as f32));
            }
            None => {
                self.painter.add(egui::Shape::line(points, stroke));
            }
        }
    }
}

fn color32(color: Color) -> egui::Color32 {
    egui::Color32::from_rgba_unmultiplied(color.r, color.g, color.b, color.a)
}

impl Canvas for EguiCanvas<'_> {
    fn size(&self) -> Dimensions {
        Dimensions::new(self.rect.width() as f64, self.rect.height() as f64)
    }

    fn draw_image(&mut self, image: &ChunkImage, source: UvRect, dest: PixelRect) {
        let texture = self.textures.texture(self.painter.ctx(), image);
        let uv = egui::Rect::from_min_max(
            egui::pos2(source.u0 as f32, source.v0 as f32),
            egui::pos2(source.u1 as f32, source.v1 as f32),
        );
        self.painter
            .image(texture, self.screen_rect(dest), uv, egui::Color32::WHITE);
    }

    fn draw_line(&mut self, from: Pixel, to: Pixel, style: &Style) {
        self.stroke_path(vec![self.pos(from), self.pos(to)], style);
    }

    fn draw_rect(&mut self, rect: PixelRect, style: &Style) {
        let screen = self.screen_rect(rect);
        if style.fill_alpha > 0.0 {
            self.painter.rect_filled(screen, 0.0, color32(style.fill()));
        }
        let corners = vec![
            screen.left_top(),
            screen.right_top(),
            screen.right_bottom(),
            screen.left_bottom(),
            screen.left_top(),
        ];
        self.stroke_path(corners, style);
    }

    fn draw_polyline(&mut self, points: &[Pixel], style: &Style) {
        let points = points.iter().map(|p| self.pos(*p)).collect();
        self.stroke_path(points, style);
    }

    fn draw_circle(&mut self, center: Pixel, radius: f64, style: &Style) {
        self.painter.circle(
            self.pos(center),
            radius as f32,
            color32(style.fill()),
            Self::stroke(style),
        );
    }
}
