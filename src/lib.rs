// src/lib.rs
pub mod app;
pub mod assets;
pub mod card;
pub mod config;
pub mod error;
pub mod frame_loop;
pub mod geometry;
pub mod gesture;
pub mod haptics;
pub mod mediapipe_bridge;
pub mod render;
pub mod smoothing;
pub mod tracking;
pub mod ui;
pub mod video;
