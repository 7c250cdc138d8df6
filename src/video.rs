// src/video.rs - Live camera frames via nokhwa
use crate::config::CameraConfig;
use crate::error::OverlayError;
use image::{DynamicImage, ImageBuffer};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution};
use nokhwa::Camera;
use tracing::{debug, info, warn};

pub trait FrameSource {
    fn read_frame(&mut self) -> Result<DynamicImage, OverlayError>;

    fn resolution(&self) -> (u32, u32);
}

pub struct CameraSource {
    camera: Camera,
    mirror: bool,
}

impl CameraSource {
    pub fn open(config: &CameraConfig) -> Result<Self, OverlayError> {
        info!(index = config.index, "Opening camera");

        let format = CameraFormat::new(
            Resolution::new(config.width, config.height),
            FrameFormat::MJPEG,
            config.fps,
        );
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(format));

        let mut camera = Camera::new(CameraIndex::Index(config.index), requested)
            .map_err(|e| OverlayError::CameraUnavailable(e.to_string()))?;
        camera
            .open_stream()
            .map_err(|e| OverlayError::CameraUnavailable(format!("stream did not start: {}", e)))?;

        let resolution = camera.resolution();
        info!(
            width = resolution.width(),
            height = resolution.height(),
            fps = camera.frame_rate(),
            "Camera stream open"
        );

        Ok(Self {
            camera,
            mirror: config.mirror,
        })
    }

    /// Names of the cameras the native backend can see.
    pub fn list() -> Vec<String> {
        match nokhwa::query(nokhwa::utils::ApiBackend::Auto) {
            Ok(cameras) => cameras.iter().map(|c| c.human_name()).collect(),
            Err(e) => {
                warn!("Failed to query cameras: {}", e);
                Vec::new()
            }
        }
    }
}

impl FrameSource for CameraSource {
    fn read_frame(&mut self) -> Result<DynamicImage, OverlayError> {
        let frame = self
            .camera
            .frame()
            .map_err(|e| OverlayError::CameraStream(format!("Failed to capture frame: {}", e)))?;

        let decoded = frame
            .decode_image::<RgbFormat>()
            .map_err(|e| OverlayError::CameraStream(format!("Failed to decode frame: {}", e)))?;

        let (width, height) = (decoded.width(), decoded.height());
        let img: image::RgbImage = ImageBuffer::from_raw(width, height, decoded.into_raw())
            .ok_or_else(|| OverlayError::CameraStream("Failed to create image buffer".to_string()))?;

        debug!(width, height, "Frame captured");
        if self.mirror {
            Ok(DynamicImage::ImageRgb8(image::imageops::flip_horizontal(&img)))
        } else {
            Ok(DynamicImage::ImageRgb8(img))
        }
    }

    fn resolution(&self) -> (u32, u32) {
        let resolution = self.camera.resolution();
        (resolution.width(), resolution.height())
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        let _ = self.camera.stop_stream();
    }
}

/// Stand-in when running the detector simulation without a camera.
pub struct BlankSource {
    width: u32,
    height: u32,
}

impl BlankSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl FrameSource for BlankSource {
    fn read_frame(&mut self) -> Result<DynamicImage, OverlayError> {
        std::thread::sleep(std::time::Duration::from_millis(33));
        Ok(DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            self.width,
            self.height,
            image::Rgb([24, 24, 30]),
        )))
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn read_frame(&mut self) -> Result<DynamicImage, OverlayError> {
        (**self).read_frame()
    }

    fn resolution(&self) -> (u32, u32) {
        (**self).resolution()
    }
}
