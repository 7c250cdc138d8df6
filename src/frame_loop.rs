// src/frame_loop.rs - Camera -> detector worker and the UI-side driver
//
// The worker thread only produces messages. All pose and gesture state lives
// on the UI thread, which drains the channel once per repaint, so detector
// results are handled one at a time and never overlap.
use crate::card::Card;
use crate::error::OverlayError;
use crate::geometry::{LandmarkSet, Viewport};
use crate::render::{Compositor, SpriteDraw};
use crate::tracking::{single_hand, HandDetector};
use crate::video::FrameSource;
use image::DynamicImage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub enum FrameMessage {
    Frame {
        image: DynamicImage,
        hand: Option<LandmarkSet>,
    },
    /// The camera could not be acquired; the worker has stopped.
    CameraFailed(OverlayError),
}

pub struct CaptureLoop {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl CaptureLoop {
    /// Opens the source and detector on a worker thread and streams results.
    /// Both factories run on the worker, so the camera handle never crosses threads.
    pub fn spawn<S, D, FS, FD>(open_source: FS, open_detector: FD) -> (Self, Receiver<FrameMessage>)
    where
        S: FrameSource + 'static,
        D: HandDetector + ?Sized + 'static,
        FS: FnOnce() -> Result<S, OverlayError> + Send + 'static,
        FD: FnOnce() -> Box<D> + Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel(2);
        let stop = Arc::new(AtomicBool::new(false));
        let worker_stop = stop.clone();

        let handle = thread::spawn(move || {
            let source = match open_source() {
                Ok(source) => source,
                Err(e) => {
                    error!("{}", e);
                    let _ = tx.send(FrameMessage::CameraFailed(e));
                    return;
                }
            };
            let detector = open_detector();
            info!(detector = detector.name(), "Capture loop running");
            run_capture(source, detector, tx, worker_stop);
        });

        (
            Self {
                stop,
                handle: Some(handle),
            },
            rx,
        )
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CaptureLoop {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

fn run_capture<S, D>(mut source: S, mut detector: Box<D>, tx: SyncSender<FrameMessage>, stop: Arc<AtomicBool>)
where
    S: FrameSource,
    D: HandDetector + ?Sized,
{
    let mut consecutive_errors = 0u32;

    while !stop.load(Ordering::Relaxed) {
        let image = match source.read_frame() {
            Ok(image) => {
                consecutive_errors = 0;
                image
            }
            Err(e) => {
                consecutive_errors += 1;
                if consecutive_errors == 1 || consecutive_errors % 30 == 0 {
                    warn!(consecutive_errors, "Skipping frame: {}", e);
                }
                thread::sleep(Duration::from_millis(10));
                continue;
            }
        };

        let hand = match detector.detect(&image) {
            Ok(hands) => single_hand(hands),
            Err(e) => {
                warn!("Detector failed, frame skipped: {:#}", e);
                continue;
            }
        };

        // never block here: a stalled UI must not keep the worker from seeing `stop`
        match tx.try_send(FrameMessage::Frame { image, hand }) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => debug!("UI is behind, frame dropped"),
            Err(TrySendError::Disconnected(_)) => {
                debug!("Frame receiver dropped, stopping capture loop");
                break;
            }
        }
    }
}

/// UI-side consumer: runs pose extraction, smoothing and layout for each
/// detector result and keeps the latest scene for painting.
pub struct FrameDriver {
    rx: Receiver<FrameMessage>,
    compositor: Compositor,
    scene: Vec<SpriteDraw>,
    latest_frame: Option<DynamicImage>,
    viewport: Viewport,
    camera_error: Option<OverlayError>,
    frames: u64,
}

impl FrameDriver {
    pub fn new(rx: Receiver<FrameMessage>, compositor: Compositor, viewport: Viewport) -> Self {
        Self {
            rx,
            compositor,
            scene: Vec::new(),
            latest_frame: None,
            viewport,
            camera_error: None,
            frames: 0,
        }
    }

    /// Handles every pending message. Returns true if a new frame arrived.
    pub fn pump(&mut self, card: Option<&Card>, ar_active: bool) -> bool {
        let mut fresh = false;
        loop {
            match self.rx.try_recv() {
                Ok(FrameMessage::Frame { image, hand }) => {
                    self.viewport = Viewport::new(image.width() as f64, image.height() as f64);
                    self.on_detection(hand, card, ar_active);
                    self.latest_frame = Some(image);
                    fresh = true;
                }
                Ok(FrameMessage::CameraFailed(e)) => {
                    self.camera_error = Some(e);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        fresh
    }

    /// One detector callback: no hand still replaces the scene so nothing stale
    /// stays on screen.
    pub fn on_detection(&mut self, hand: Option<LandmarkSet>, card: Option<&Card>, ar_active: bool) {
        self.frames += 1;
        self.scene = self
            .compositor
            .compose(hand.as_ref(), self.viewport, card, ar_active);
    }

    /// Re-lays out the last hand without advancing smoothing, e.g. right after a reveal.
    pub fn refresh(&mut self, card: Option<&Card>, ar_active: bool) {
        self.scene = self.compositor.relayout(card, ar_active);
    }

    pub fn scene(&self) -> &[SpriteDraw] {
        &self.scene
    }

    pub fn take_frame(&mut self) -> Option<DynamicImage> {
        self.latest_frame.take()
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn camera_error(&self) -> Option<&OverlayError> {
        self.camera_error.as_ref()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}
