// src/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("Failed to open camera: {0}")]
    CameraUnavailable(String),

    #[error("Camera stream error: {0}")]
    CameraStream(String),

    #[error("Hand detector error: {0}")]
    Detector(String),

    #[error("Failed to load asset {path}: {reason}")]
    Asset { path: String, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl OverlayError {
    pub fn asset(path: &std::path::Path, reason: impl std::fmt::Display) -> Self {
        OverlayError::Asset {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Errors that end the overlay for the rest of the run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, OverlayError::CameraUnavailable(_))
    }
}
