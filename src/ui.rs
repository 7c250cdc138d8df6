// src/ui.rs - Video widget, sprite canvas and the tap surface
use crate::assets::SpriteCache;
use crate::gesture::{Phase, PointerEvent, Surface};
use crate::render::{Canvas, SpriteKey};
use eframe::egui::{self, emath::Rot2, Color32, Pos2, Rect, Vec2};
use image::DynamicImage;
use nalgebra::Point2;

#[derive(Debug, Clone)]
pub struct Theme {
    pub primary: Color32,
    pub background: Color32,
    pub surface: Color32,
    pub error: Color32,
    pub success: Color32,
    pub text_primary: Color32,
    pub text_secondary: Color32,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary: Color32::from_rgb(70, 130, 240),
            background: Color32::from_rgb(20, 20, 25),
            surface: Color32::from_rgb(30, 30, 35),
            error: Color32::from_rgb(244, 67, 54),
            success: Color32::from_rgb(76, 175, 80),
            text_primary: Color32::WHITE,
            text_secondary: Color32::from_rgb(200, 200, 200),
        }
    }
}

const FULL_UV: Rect = Rect {
    min: Pos2::ZERO,
    max: Pos2 { x: 1.0, y: 1.0 },
};

/// Camera preview. Keeps the texture handle alive between frames.
pub struct VideoWidget {
    texture: Option<egui::TextureHandle>,
    aspect_ratio: f32,
}

impl VideoWidget {
    pub fn new() -> Self {
        Self {
            texture: None,
            aspect_ratio: 4.0 / 3.0,
        }
    }

    pub fn update_frame(&mut self, ctx: &egui::Context, frame: &DynamicImage) {
        let size = [frame.width() as _, frame.height() as _];
        let rgba = frame.to_rgba8();
        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_flat_samples().as_slice());

        if frame.height() > 0 {
            self.aspect_ratio = frame.width() as f32 / frame.height() as f32;
        }
        match &mut self.texture {
            Some(texture) => texture.set(color_image, egui::TextureOptions::LINEAR),
            None => self.texture = Some(ctx.load_texture("video_frame", color_image, egui::TextureOptions::LINEAR)),
        }
    }

    /// Paints the preview letterboxed into the available space and returns
    /// the rect the frame occupies, sensing clicks and drags over it.
    pub fn show(&self, ui: &mut egui::Ui) -> (Rect, egui::Response) {
        let available = ui.available_size();
        let mut size = Vec2::new(available.x, available.x / self.aspect_ratio);
        if size.y > available.y {
            size = Vec2::new(available.y * self.aspect_ratio, available.y);
        }

        let (rect, response) = ui.allocate_exact_size(size, egui::Sense::click_and_drag());
        if let Some(texture) = &self.texture {
            ui.painter().image(texture.id(), rect, FULL_UV, Color32::WHITE);
        } else {
            ui.painter()
                .rect_filled(rect, egui::Rounding::same(4.0), Color32::from_rgb(50, 50, 55));
            ui.painter().text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                "No Video Signal",
                egui::FontId::proportional(16.0),
                Color32::from_rgb(150, 150, 155),
            );
        }
        (rect, response)
    }
}

impl Default for VideoWidget {
    fn default() -> Self {
        Self::new()
    }
}

/// Paints sprite draws from frame pixel space onto the on-screen video rect.
pub struct EguiCanvas<'a> {
    painter: egui::Painter,
    rect: Rect,
    scale: Vec2,
    sprites: &'a SpriteCache,
}

impl<'a> EguiCanvas<'a> {
    pub fn new(ui: &egui::Ui, rect: Rect, frame_size: (f64, f64), sprites: &'a SpriteCache) -> Self {
        let scale = if frame_size.0 > 0.0 && frame_size.1 > 0.0 {
            Vec2::new(rect.width() / frame_size.0 as f32, rect.height() / frame_size.1 as f32)
        } else {
            Vec2::ZERO
        };
        Self {
            painter: ui.painter_at(rect),
            rect,
            scale,
            sprites,
        }
    }

    fn to_screen(&self, p: Point2<f64>) -> Pos2 {
        self.rect.min + Vec2::new(p.x as f32 * self.scale.x, p.y as f32 * self.scale.y)
    }
}

impl Canvas for EguiCanvas<'_> {
    fn clear(&mut self) {
        // egui starts every frame from an empty shape list
    }

    fn sprite_size(&self, sprite: &SpriteKey) -> Option<(f64, f64)> {
        self.sprites.texture(sprite).map(|(_, size)| size)
    }

    fn blit(&mut self, sprite: &SpriteKey, center: Point2<f64>, rotation: f64, width: f64, height: f64, alpha: f64) {
        let Some((texture, _)) = self.sprites.texture(sprite) else {
            return;
        };
        let origin = self.to_screen(center);
        let size = Vec2::new(width as f32 * self.scale.x, height as f32 * self.scale.y);
        let tint = Color32::from_white_alpha((alpha.clamp(0.0, 1.0) * 255.0).round() as u8);

        let rot = Rot2::from_angle(rotation as f32);
        let half = size * 0.5;

        let mut mesh = egui::Mesh::with_texture(texture.id());
        for (sx, sy) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            mesh.vertices.push(egui::epaint::Vertex {
                pos: origin + rot * Vec2::new(sx * half.x, sy * half.y),
                uv: Pos2::new((sx + 1.0) * 0.5, (sy + 1.0) * 0.5),
                color: tint,
            });
        }
        mesh.add_triangle(0, 1, 2);
        mesh.add_triangle(0, 2, 3);
        self.painter.add(egui::Shape::mesh(mesh));
    }
}

/// Turns raw pointer input over the video rect into press/release events in
/// surface coordinates. A release only counts if the press started inside,
/// and presses under a floating window are ignored.
#[derive(Debug, Default)]
pub struct TapSurface {
    pressed_inside: bool,
}

impl TapSurface {
    pub fn events(&mut self, ui: &egui::Ui, response: &egui::Response) -> (Surface, Vec<PointerEvent>) {
        let rect = response.rect;
        let surface = Surface::new(rect.width(), rect.height());
        let (pressed, released, pos) = ui.input(|i| {
            (
                i.pointer.any_pressed(),
                i.pointer.any_released(),
                i.pointer.interact_pos().or(i.pointer.latest_pos()),
            )
        });

        let mut events = Vec::new();
        let Some(pos) = pos else {
            return (surface, events);
        };
        let local = pos - rect.min;

        if pressed && response.hovered() && rect.contains(pos) {
            self.pressed_inside = true;
            events.push(PointerEvent::press(local.x, local.y));
        }
        if released && self.pressed_inside {
            self.pressed_inside = false;
            events.push(PointerEvent::release(local.x, local.y));
        }
        (surface, events)
    }
}

/// Faint quadrant or half guides for the performer, matching the phase.
pub fn draw_surface_guides(painter: &egui::Painter, rect: Rect, phase: Phase, theme: &Theme) {
    let stroke = egui::Stroke::new(1.0, theme.text_secondary.gamma_multiply(0.15));
    let center = rect.center();
    match phase {
        Phase::AwaitingSuit => {
            painter.line_segment([Pos2::new(center.x, rect.top()), Pos2::new(center.x, rect.bottom())], stroke);
            painter.line_segment([Pos2::new(rect.left(), center.y), Pos2::new(rect.right(), center.y)], stroke);
        }
        Phase::AwaitingComparison => {
            painter.line_segment([Pos2::new(center.x, rect.top()), Pos2::new(center.x, rect.bottom())], stroke);
        }
        Phase::AwaitingMagnitude => {}
    }
}

pub fn draw_error_banner(ui: &mut egui::Ui, theme: &Theme, message: &str) {
    egui::Frame::none()
        .fill(theme.error)
        .inner_margin(egui::Margin::symmetric(12.0, 8.0))
        .rounding(egui::Rounding::same(4.0))
        .show(ui, |ui| {
            ui.colored_label(theme.text_primary, format!("⚠ {}", message));
        });
}
