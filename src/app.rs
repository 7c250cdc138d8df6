// src/app.rs
use crate::assets::SpriteCache;
use crate::card::Card;
use crate::config::AppConfig;
use crate::error::OverlayError;
use crate::frame_loop::{CaptureLoop, FrameDriver};
use crate::geometry::{Finger, Viewport};
use crate::gesture::{GestureEffect, GestureSession, Phase};
use crate::haptics::{haptics_for, Haptics};
use crate::mediapipe_bridge::MediaPipeBridge;
use crate::render::{paint_scene, Compositor, SpriteKey};
use crate::tracking::{HandDetector, SimulatedDetector};
use crate::ui::{draw_error_banner, draw_surface_guides, EguiCanvas, TapSurface, Theme, VideoWidget};
use crate::video::{BlankSource, CameraSource, FrameSource};

use eframe::egui;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Upper bound between repaints while waiting on camera frames.
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Debug, Clone)]
pub struct ViewSettings {
    pub show_guides: bool,
    pub show_status: bool,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            show_guides: false,
            show_status: true,
        }
    }
}

pub struct MagicOverlayApp {
    config: AppConfig,

    // Frame pipeline
    capture: CaptureLoop,
    driver: FrameDriver,
    sprites: SpriteCache,

    // Trick state
    session: GestureSession,
    haptics: Box<dyn Haptics>,
    revealed: Option<Card>,

    // UI state
    video: VideoWidget,
    taps: TapSurface,
    theme: Theme,
    settings: ViewSettings,
    show_settings: bool,
    show_about: bool,
}

impl MagicOverlayApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: AppConfig) -> Self {
        let (capture, rx) = start_capture(&config);
        let viewport = Viewport::new(config.camera.width as f64, config.camera.height as f64);
        let driver = FrameDriver::new(rx, Compositor::new(config.overlay.clone()), viewport);

        let mut sprites = SpriteCache::new(config.assets.clone());
        sprites.request(&SpriteKey::Palm);
        sprites.request(&SpriteKey::Finger(Finger::Index));

        Self {
            session: GestureSession::new(config.gesture.clone()),
            haptics: haptics_for(&config.gesture),
            revealed: None,
            capture,
            driver,
            sprites,
            video: VideoWidget::new(),
            taps: TapSurface::default(),
            theme: Theme::default(),
            settings: ViewSettings::default(),
            show_settings: false,
            show_about: false,
            config,
        }
    }

    fn apply_effects(&mut self, effects: Vec<GestureEffect>) {
        for effect in effects {
            match effect {
                GestureEffect::OverlayActivated => info!("Overlay activated"),
                GestureEffect::Pulse(duration) => self.haptics.pulse(duration),
                GestureEffect::Reveal(card) => {
                    self.sprites.request(&SpriteKey::Card(card));
                    self.revealed = Some(card);
                }
            }
        }
        self.driver
            .refresh(self.revealed.as_ref(), self.session.overlay_active());
    }

    fn render_header(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.heading("Magic Overlay");
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("⚙ Settings").clicked() {
                        self.show_settings = !self.show_settings;
                    }
                    if ui.button("ℹ About").clicked() {
                        self.show_about = !self.show_about;
                    }
                });
            });
        });
    }

    fn render_status_bar(&mut self, ctx: &egui::Context) {
        if !self.settings.show_status {
            return;
        }
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let (color, label) = if self.driver.camera_error().is_some() {
                    (self.theme.error, "Camera offline")
                } else if self.session.overlay_active() {
                    (self.theme.success, "Overlay live")
                } else {
                    (self.theme.text_secondary, "Waiting for first tap")
                };
                ui.colored_label(color, label);
                ui.separator();
                ui.label(format!("Frames: {}", self.driver.frames()));
                ui.separator();
                ui.label(match self.session.phase() {
                    Phase::AwaitingSuit => "·",
                    Phase::AwaitingComparison => "··",
                    Phase::AwaitingMagnitude => "···",
                });
                if let Some(card) = &self.revealed {
                    let key = SpriteKey::Card(*card);
                    if self.sprites.has_failed(&key) {
                        ui.separator();
                        ui.colored_label(self.theme.error, format!("Missing sprite for {}", card));
                    } else if self.sprites.is_loading(&key) {
                        ui.separator();
                        ui.spinner();
                    }
                }
            });
        });
    }

    fn render_main_content(&mut self, ctx: &egui::Context, now: Instant) {
        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(self.theme.background))
            .show(ctx, |ui| {
                if let Some(error) = self.driver.camera_error() {
                    draw_error_banner(ui, &self.theme, &error.to_string());
                    ui.add_space(8.0);
                }

                ui.centered_and_justified(|ui| {
                    let (rect, response) = self.video.show(ui);

                    let viewport = self.driver.viewport();
                    let mut canvas = EguiCanvas::new(ui, rect, (viewport.width, viewport.height), &self.sprites);
                    paint_scene(&mut canvas, self.driver.scene());

                    if self.settings.show_guides {
                        draw_surface_guides(ui.painter(), rect, self.session.phase(), &self.theme);
                    }

                    let (surface, events) = self.taps.events(ui, &response);
                    for event in events {
                        let effects = self.session.handle_pointer(event, surface, now);
                        self.apply_effects(effects);
                    }
                });
            });
    }

    fn render_settings_window(&mut self, ctx: &egui::Context) {
        let overlay = &self.config.overlay;
        let gesture = &self.config.gesture;
        let haptics_audible = self.haptics.is_audible();
        egui::Window::new("Settings")
            .open(&mut self.show_settings)
            .resizable(true)
            .default_size([360.0, 320.0])
            .show(ctx, |ui| {
                ui.heading("View");
                ui.checkbox(&mut self.settings.show_guides, "Show tap guides");
                ui.checkbox(&mut self.settings.show_status, "Show status bar");

                ui.separator();
                ui.heading("Overlay");
                ui.label(format!("Smoothing: {:.2}", overlay.smoothing_alpha));
                ui.label(format!("Openness: {:?}, blend {:?}", overlay.openness_method, overlay.blend_mode));

                ui.separator();
                ui.heading("Gesture");
                ui.label(format!("Fallback after {} ms", gesture.fallback_delay_ms));
                ui.label(format!("Haptics: {}", if haptics_audible { "logged" } else { "off" }));
                ui.label(format!(
                    "Pulse every {} ms, up to {}",
                    gesture.pulse_period_ms, gesture.max_pulses
                ));

                if let Some(path) = AppConfig::user_config_path() {
                    ui.separator();
                    ui.label("Config file:");
                    ui.label(path.display().to_string());
                }
            });
    }

    fn render_about_window(&mut self, ctx: &egui::Context) {
        egui::Window::new("About")
            .open(&mut self.show_about)
            .resizable(false)
            .default_size([360.0, 200.0])
            .show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    ui.heading("Magic Overlay");
                    ui.label(format!("Version {}", env!("CARGO_PKG_VERSION")));
                    ui.add_space(12.0);
                    ui.label("An augmented-reality hand overlay");
                    ui.label("with a tap-driven card reveal.");
                });
            });
    }
}

impl eframe::App for MagicOverlayApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();

        self.sprites.poll(ctx);

        let effects = self.session.tick(now);
        if !effects.is_empty() {
            self.apply_effects(effects);
        }

        if self
            .driver
            .pump(self.revealed.as_ref(), self.session.overlay_active())
        {
            if let Some(frame) = self.driver.take_frame() {
                self.video.update_frame(ctx, &frame);
            }
        }

        self.render_header(ctx);
        self.render_status_bar(ctx);
        if self.show_settings {
            self.render_settings_window(ctx);
        }
        if self.show_about {
            self.render_about_window(ctx);
        }
        self.render_main_content(ctx, now);

        // wake for the next camera frame or gesture timer, whichever is sooner
        let wait = self
            .session
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
            .map_or(FRAME_INTERVAL, |d| d.min(FRAME_INTERVAL));
        ctx.request_repaint_after(wait);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        info!("Shutting down capture loop");
        self.capture.stop();
    }
}

fn start_capture(config: &AppConfig) -> (CaptureLoop, std::sync::mpsc::Receiver<crate::frame_loop::FrameMessage>) {
    let camera = config.camera.clone();
    let detector = config.detector.clone();
    let simulate = detector.simulate;

    let open_source = move || -> Result<Box<dyn FrameSource>, OverlayError> {
        match CameraSource::open(&camera) {
            Ok(source) => Ok(Box::new(source)),
            Err(e) if simulate => {
                warn!("{}; simulating on a blank frame", e);
                Ok(Box::new(BlankSource::new(camera.width, camera.height)))
            }
            Err(e) => Err(e),
        }
    };

    let open_detector = move || -> Box<dyn HandDetector> {
        if simulate {
            info!("Detector simulation enabled");
            return Box::new(SimulatedDetector::new());
        }
        match MediaPipeBridge::spawn(&detector) {
            Ok(bridge) => Box::new(bridge),
            Err(e) => {
                warn!("MediaPipe unavailable ({:#}), falling back to simulation", e);
                Box::new(SimulatedDetector::new())
            }
        }
    };

    CaptureLoop::spawn(open_source, open_detector)
}
