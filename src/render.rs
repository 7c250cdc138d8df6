// src/render.rs - Turns smoothed hand poses and the revealed card into sprite draws
use crate::card::Card;
use crate::config::{BlendMode, OverlayConfig};
use crate::geometry::{Curl, Finger, HandPose, LandmarkSet, PoseExtractor, Viewport};
use crate::smoothing::{lerp, lerp_angle, lerp_point, PoseSmoother};
use nalgebra::Point2;
use std::f64::consts::FRAC_PI_2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpriteKey {
    Palm,
    Finger(Finger),
    Card(Card),
}

/// One textured quad. Sprites are authored pointing up, so `rotation` already
/// includes the quarter turn from the pose direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteDraw {
    pub sprite: SpriteKey,
    pub center: Point2<f64>,
    pub rotation: f64,
    pub width: f64,
    /// `None` derives the height from the sprite's native aspect ratio.
    pub height: Option<f64>,
    pub alpha: f64,
}

impl SpriteDraw {
    /// Final height given the sprite's native pixel size.
    pub fn resolved_height(&self, native: (f64, f64)) -> f64 {
        match self.height {
            Some(h) => h,
            None if native.0 > 0.0 => self.width * native.1 / native.0,
            None => self.width,
        }
    }
}

/// Drawing surface in viewport pixels.
pub trait Canvas {
    fn clear(&mut self);

    /// Native pixel size, `None` while the asset is still loading.
    fn sprite_size(&self, sprite: &SpriteKey) -> Option<(f64, f64)>;

    /// Draws a rotated quad centered on `center`.
    fn blit(&mut self, sprite: &SpriteKey, center: Point2<f64>, rotation: f64, width: f64, height: f64, alpha: f64);
}

/// Translate, rotate, draw centered. Silently skipped until the asset is loaded.
pub fn draw_sprite(canvas: &mut dyn Canvas, draw: &SpriteDraw) {
    let Some(native) = canvas.sprite_size(&draw.sprite) else {
        return;
    };
    if draw.alpha <= 0.0 || draw.width <= 0.0 {
        return;
    }
    let height = draw.resolved_height(native);
    canvas.blit(
        &draw.sprite,
        draw.center,
        draw.rotation,
        draw.width,
        height,
        draw.alpha.min(1.0),
    );
}

/// Clears the canvas and draws a whole scene.
pub fn paint_scene(canvas: &mut dyn Canvas, scene: &[SpriteDraw]) {
    canvas.clear();
    for draw in scene {
        draw_sprite(canvas, draw);
    }
}

pub struct Compositor {
    config: OverlayConfig,
    extractor: PoseExtractor,
    smoother: PoseSmoother,
    last_pose: Option<HandPose>,
}

impl Compositor {
    pub fn new(config: OverlayConfig) -> Self {
        Self {
            extractor: PoseExtractor::from_config(&config),
            smoother: PoseSmoother::new(config.smoothing_alpha),
            last_pose: None,
            config,
        }
    }

    /// Runs extraction and smoothing for one detector result and lays out the
    /// scene. An empty scene still clears whatever was drawn before.
    pub fn compose(
        &mut self,
        landmarks: Option<&LandmarkSet>,
        viewport: Viewport,
        card: Option<&Card>,
        ar_active: bool,
    ) -> Vec<SpriteDraw> {
        if !ar_active {
            return Vec::new();
        }
        let Some(observed) = self.extractor.extract(landmarks, viewport) else {
            self.last_pose = None;
            return Vec::new();
        };
        let smoothed = self.smoother.update(&observed);
        let scene = self.layout(&smoothed, card);
        self.last_pose = Some(smoothed);
        scene
    }

    /// Lays out the most recent smoothed pose again without feeding the smoother.
    pub fn relayout(&self, card: Option<&Card>, ar_active: bool) -> Vec<SpriteDraw> {
        match (&self.last_pose, ar_active) {
            (Some(pose), true) => self.layout(pose, card),
            _ => Vec::new(),
        }
    }

    fn blend_factor(&self, openness: f64) -> f64 {
        match self.config.blend_mode {
            BlendMode::Continuous => openness,
            BlendMode::Bucketed => Curl::from_openness(
                openness,
                self.config.partial_threshold,
                self.config.open_threshold,
            )
            .blend_factor(),
        }
    }

    pub fn is_fist(&self, hand: &HandPose) -> bool {
        hand.openness
            .iter()
            .all(|&o| self.blend_factor(o) <= self.config.fist_threshold)
    }

    /// Palm, then fingers, then the card on top.
    pub fn layout(&self, hand: &HandPose, card: Option<&Card>) -> Vec<SpriteDraw> {
        let cfg = &self.config;
        let palm = &hand.palm;
        let fist = self.is_fist(hand);
        let mut scene = Vec::with_capacity(7);

        if !fist {
            scene.push(SpriteDraw {
                sprite: SpriteKey::Palm,
                center: palm.center,
                rotation: palm.angle + FRAC_PI_2,
                width: palm.width * cfg.palm_scale,
                height: Some(palm.height * cfg.palm_scale),
                alpha: cfg.palm_alpha,
            });
        }

        for finger in Finger::ALL {
            let pose = &hand.fingers[finger.index()];
            let openness = hand.openness[finger.index()];
            let t = self.blend_factor(openness);
            let alpha = cfg.max_finger_alpha * t;
            if alpha <= 0.0 {
                continue;
            }

            scene.push(SpriteDraw {
                sprite: SpriteKey::Finger(finger),
                center: lerp_point(palm.center, pose.center, t),
                rotation: lerp_angle(palm.angle, pose.angle, t) + FRAC_PI_2,
                width: palm.width * cfg.finger_width_ratio,
                height: Some(lerp(0.0, pose.length, t)),
                alpha,
            });
        }

        if let Some(card) = card {
            if !fist || cfg.card_visible_when_fist {
                scene.push(SpriteDraw {
                    sprite: SpriteKey::Card(*card),
                    center: palm.center,
                    rotation: palm.angle + FRAC_PI_2,
                    width: (palm.width * cfg.card_palm_fraction).max(cfg.card_min_width),
                    height: None,
                    alpha: 1.0,
                });
            }
        }

        scene
    }
}
