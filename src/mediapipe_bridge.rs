// src/mediapipe_bridge.rs - MediaPipe Hands running in a Python subprocess
//
// Wire format, one exchange per frame:
//   -> width: u32 LE, height: u32 LE, width * height * 3 bytes of RGB
//   <- one JSON line: {"hands": [{"score": f, "landmarks": [{"x": f, "y": f}, ...]}], "error": null}
use crate::config::DetectorConfig;
use crate::geometry::{LandmarkSet, LANDMARK_COUNT};
use crate::tracking::{DetectorOptions, HandDetector};
use anyhow::{bail, Context, Result};
use image::DynamicImage;
use serde::Deserialize;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdout, Command, Stdio};
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct LandmarkJson {
    x: f64,
    y: f64,
}

#[derive(Debug, Deserialize)]
struct HandJson {
    #[serde(default)]
    score: f32,
    landmarks: Vec<LandmarkJson>,
}

#[derive(Debug, Deserialize)]
struct DetectionJson {
    hands: Vec<HandJson>,
    #[serde(default)]
    error: Option<String>,
}

pub struct MediaPipeBridge {
    process: Child,
    stdout: BufReader<ChildStdout>,
}

impl MediaPipeBridge {
    pub fn spawn(config: &DetectorConfig) -> Result<Self> {
        if !config.script.exists() {
            bail!("MediaPipe helper script not found at {}", config.script.display());
        }
        let options = DetectorOptions::from(config);

        info!(python = %config.python.display(), "Starting MediaPipe hand detector...");
        let mut process = Command::new(&config.python)
            .arg(&config.script)
            .args([
                "--max-num-hands",
                &options.max_num_hands.to_string(),
                "--model-complexity",
                &options.model_complexity.to_string(),
                "--min-detection-confidence",
                &options.min_detection_confidence.to_string(),
                "--min-tracking-confidence",
                &options.min_tracking_confidence.to_string(),
            ])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .context("Failed to start MediaPipe subprocess")?;

        let stdout = process.stdout.take().context("MediaPipe subprocess has no stdout")?;
        let mut stdout = BufReader::new(stdout);

        let mut ready = String::new();
        if let Err(e) = stdout.read_line(&mut ready) {
            let _ = process.kill();
            let _ = process.wait();
            return Err(e).context("MediaPipe subprocess failed before signalling ready");
        }
        if ready.trim() != "READY" {
            let _ = process.kill();
            let _ = process.wait();
            bail!("MediaPipe subprocess did not signal ready, got: {:?}", ready.trim());
        }

        info!(?options, "✓ MediaPipe hand detector ready");
        Ok(Self { process, stdout })
    }
}

/// Converts one response line into landmark sets. Hands without exactly 21
/// landmarks are discarded.
fn parse_response(line: &str) -> Result<Vec<LandmarkSet>> {
    let response: DetectionJson =
        serde_json::from_str(line).with_context(|| format!("Failed to parse detector output: {}", line.trim()))?;

    if let Some(error) = response.error {
        bail!("MediaPipe reported: {}", error);
    }

    let mut hands = Vec::with_capacity(response.hands.len());
    for hand in response.hands {
        if hand.landmarks.len() != LANDMARK_COUNT {
            warn!("Expected {} landmarks, got {}", LANDMARK_COUNT, hand.landmarks.len());
            continue;
        }
        let points: Vec<(f64, f64)> = hand.landmarks.iter().map(|lm| (lm.x, lm.y)).collect();
        if let Some(set) = LandmarkSet::from_slice(&points) {
            debug!(score = hand.score, "Hand detected");
            hands.push(set);
        }
    }
    Ok(hands)
}

impl HandDetector for MediaPipeBridge {
    fn detect(&mut self, frame: &DynamicImage) -> Result<Vec<LandmarkSet>> {
        let rgb = frame.to_rgb8();
        let stdin = self.process.stdin.as_mut().context("MediaPipe subprocess has no stdin")?;

        stdin.write_all(&rgb.width().to_le_bytes())?;
        stdin.write_all(&rgb.height().to_le_bytes())?;
        stdin.write_all(rgb.as_raw())?;
        stdin.flush()?;

        let mut line = String::new();
        if self.stdout.read_line(&mut line)? == 0 {
            bail!("MediaPipe subprocess closed its output");
        }
        parse_response(&line)
    }

    fn name(&self) -> &'static str {
        "mediapipe"
    }
}

impl Drop for MediaPipeBridge {
    fn drop(&mut self) {
        let _ = self.process.kill();
        let _ = self.process.wait();
    }
}
