// src/tracking.rs - Hand detector collaborators
use crate::config::DetectorConfig;
use crate::geometry::{LandmarkSet, LANDMARK_COUNT};
use anyhow::Result;
use image::DynamicImage;
use nalgebra::Point2;
use tracing::warn;

/// Options handed to the external detector. Exactly one hand is tracked.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorOptions {
    pub max_num_hands: u8,
    pub model_complexity: u8,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
}

impl From<&DetectorConfig> for DetectorOptions {
    fn from(config: &DetectorConfig) -> Self {
        Self {
            max_num_hands: 1,
            model_complexity: config.model_complexity,
            min_detection_confidence: config.min_detection_confidence,
            min_tracking_confidence: config.min_tracking_confidence,
        }
    }
}

pub trait HandDetector: Send {
    /// Zero or more hands for one frame, each 21 normalized points.
    fn detect(&mut self, frame: &DynamicImage) -> Result<Vec<LandmarkSet>>;

    fn name(&self) -> &'static str;
}

/// Keeps the first hand of a detector result. Extra hands are dropped.
pub fn single_hand(mut hands: Vec<LandmarkSet>) -> Option<LandmarkSet> {
    if hands.len() > 1 {
        warn!(count = hands.len(), "Detector returned more than one hand, keeping the first");
    }
    if hands.is_empty() {
        None
    } else {
        Some(hands.swap_remove(0))
    }
}

/// A synthetic hand that slowly opens and closes, used when MediaPipe is not
/// available.
pub struct SimulatedDetector {
    sim_time: f64,
    step: f64,
}

impl SimulatedDetector {
    pub fn new() -> Self {
        Self {
            sim_time: 0.0,
            step: 0.033,
        }
    }

    /// Landmarks at time `t`: the hand sways and curls its fingers on a cycle.
    pub fn hand_at(t: f64) -> LandmarkSet {
        let sway = 0.04 * (t * 0.7).sin();
        let tilt = 0.25 * (t * 0.5).sin();
        let curl = 0.5 + 0.5 * (t * 0.9).sin(); // 0 = open, 1 = fist

        let wrist = Point2::new(0.5 + sway, 0.78);
        let (sin, cos) = tilt.sin_cos();
        // rotate a hand-local offset (x right, y up) around the wrist
        let place = |dx: f64, dy: f64| Point2::new(wrist.x + dx * cos + dy * sin, wrist.y + dx * sin - dy * cos);

        let mut pts = [Point2::origin(); LANDMARK_COUNT];
        pts[0] = wrist;
        pts[1] = place(-0.07, 0.05);

        let columns = [(-0.11, 0.1), (-0.06, 0.2), (0.0, 0.21), (0.06, 0.2), (0.11, 0.18)];
        for (finger, &(x, base_y)) in columns.iter().enumerate() {
            let first = 2 + finger * 4 - usize::from(finger > 0);
            let joints = if finger == 0 { 3 } else { 4 };
            for j in 0..joints {
                // straight segments when open, folding back toward the palm when curled
                let reach = 0.06 * j as f64;
                let fold = if j >= 2 { curl * 0.09 * (j - 1) as f64 } else { 0.0 };
                pts[first + j] = place(x, base_y + reach - fold);
            }
        }

        LandmarkSet::new(pts)
    }
}

impl Default for SimulatedDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl HandDetector for SimulatedDetector {
    fn detect(&mut self, _frame: &DynamicImage) -> Result<Vec<LandmarkSet>> {
        let hand = Self::hand_at(self.sim_time);
        self.sim_time += self.step;
        Ok(vec![hand])
    }

    fn name(&self) -> &'static str {
        "simulation"
    }
}
