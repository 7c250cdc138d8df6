// src/config.rs
use crate::error::OverlayError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub camera: CameraConfig,
    pub detector: DetectorConfig,
    pub overlay: OverlayConfig,
    pub gesture: GestureConfig,
    pub assets: AssetConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub index: u32,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Flip frames horizontally so the preview behaves like a mirror.
    pub mirror: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: 640,
            height: 480,
            fps: 30,
            mirror: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub python: PathBuf,
    pub script: PathBuf,
    pub model_complexity: u8,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
    /// Drive the overlay from a synthetic hand instead of MediaPipe.
    pub simulate: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            python: PathBuf::from("python3"),
            script: PathBuf::from("scripts/mediapipe_hands.py"),
            model_complexity: 1,
            min_detection_confidence: 0.8,
            min_tracking_confidence: 0.8,
            simulate: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpennessMethod {
    /// Interior angle at the finger's middle joint.
    JointAngle,
    /// Base-to-tip length relative to the palm height.
    LengthRatio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    Continuous,
    /// Closed / partial / open buckets.
    Bucketed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Weight kept from the previous smoothed value each frame.
    pub smoothing_alpha: f64,
    pub openness_method: OpennessMethod,
    pub closed_angle_deg: f64,
    pub open_angle_deg: f64,
    pub length_full_ratio: f64,
    pub blend_mode: BlendMode,
    pub partial_threshold: f64,
    pub open_threshold: f64,
    pub max_finger_alpha: f64,
    pub palm_alpha: f64,
    /// Openness at or below which a finger counts as closed for fist detection.
    pub fist_threshold: f64,
    pub palm_scale: f64,
    pub finger_width_ratio: f64,
    pub card_min_width: f64,
    pub card_palm_fraction: f64,
    pub card_visible_when_fist: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            smoothing_alpha: 0.75,
            openness_method: OpennessMethod::JointAngle,
            closed_angle_deg: 60.0,
            open_angle_deg: 160.0,
            length_full_ratio: 1.0,
            blend_mode: BlendMode::Continuous,
            partial_threshold: 0.33,
            open_threshold: 0.66,
            max_finger_alpha: 0.9,
            palm_alpha: 1.0,
            fist_threshold: 0.05,
            palm_scale: 1.6,
            finger_width_ratio: 0.28,
            card_min_width: 60.0,
            card_palm_fraction: 0.9,
            card_visible_when_fist: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    pub fallback_delay_ms: u64,
    pub pulse_period_ms: u64,
    pub max_pulses: u32,
    pub pulse_duration_ms: u64,
    /// Log each pulse at debug level; off drops pulses silently.
    pub log_haptics: bool,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            fallback_delay_ms: 1200,
            pulse_period_ms: 300,
            max_pulses: 6,
            pulse_duration_ms: 100,
            log_haptics: true,
        }
    }
}

impl GestureConfig {
    pub fn fallback_delay(&self) -> Duration {
        Duration::from_millis(self.fallback_delay_ms)
    }

    pub fn pulse_period(&self) -> Duration {
        Duration::from_millis(self.pulse_period_ms)
    }

    pub fn pulse_duration(&self) -> Duration {
        Duration::from_millis(self.pulse_duration_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    pub dir: PathBuf,
    pub palm_sprite: String,
    pub finger_sprite: String,
    pub card_extension: String,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./assets"),
            palm_sprite: "palm.png".to_string(),
            finger_sprite: "huesos.png".to_string(),
            card_extension: "svg".to_string(),
        }
    }
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, OverlayError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| OverlayError::Config(format!("{}: {}", path.display(), e)))?;
        let config: AppConfig = serde_json::from_str(&text)
            .map_err(|e| OverlayError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// First CLI argument, then the per-user config file, then built-in defaults.
    pub fn load_or_default() -> Self {
        let candidates = std::env::args()
            .nth(1)
            .map(PathBuf::from)
            .into_iter()
            .chain(Self::user_config_path());

        for path in candidates {
            if !path.exists() {
                continue;
            }
            match Self::load(&path) {
                Ok(config) => {
                    info!(path = %path.display(), "Loaded configuration");
                    return config;
                }
                Err(e) => warn!("Ignoring configuration: {}", e),
            }
        }

        info!("Using default configuration");
        Self::default()
    }

    pub fn user_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "magicoverlay", "MagicOverlay")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    pub fn validate(&self) -> Result<(), OverlayError> {
        let overlay = &self.overlay;
        if !(0.0..1.0).contains(&overlay.smoothing_alpha) {
            return Err(OverlayError::Config(format!(
                "smoothing_alpha must be in [0, 1), got {}",
                overlay.smoothing_alpha
            )));
        }
        if overlay.open_angle_deg <= overlay.closed_angle_deg {
            return Err(OverlayError::Config(
                "open_angle_deg must be greater than closed_angle_deg".to_string(),
            ));
        }
        if overlay.length_full_ratio <= 0.0 {
            return Err(OverlayError::Config("length_full_ratio must be positive".to_string()));
        }
        if overlay.open_threshold <= overlay.partial_threshold {
            return Err(OverlayError::Config(
                "open_threshold must be greater than partial_threshold".to_string(),
            ));
        }

        let gesture = &self.gesture;
        if gesture.pulse_period_ms == 0 {
            return Err(OverlayError::Config("pulse_period_ms must be positive".to_string()));
        }
        // Six pulses plus the major offset of seven is the king; more would leave the deck.
        if gesture.max_pulses == 0 || gesture.max_pulses > 6 {
            return Err(OverlayError::Config(format!(
                "max_pulses must be between 1 and 6, got {}",
                gesture.max_pulses
            )));
        }
        Ok(())
    }
}
