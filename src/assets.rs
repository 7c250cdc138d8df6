// src/assets.rs - Sprite textures, decoded off the UI thread
use crate::card::Card;
use crate::config::AssetConfig;
use crate::error::OverlayError;
use crate::render::SpriteKey;
use eframe::egui;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use tracing::{debug, info, warn};
use usvg::TreeParsing;

/// Raster width for vector sprites. Cards are drawn well below this size.
pub const SVG_RASTER_WIDTH: u32 = 360;

pub enum SpriteSlot {
    Loading,
    Ready {
        texture: egui::TextureHandle,
        size: (f64, f64),
    },
    Failed,
}

struct Decoded {
    path: PathBuf,
    result: Result<egui::ColorImage, OverlayError>,
}

/// Textures keyed by file path, so the five fingers share one upload.
pub struct SpriteCache {
    config: AssetConfig,
    slots: HashMap<PathBuf, SpriteSlot>,
    tx: Sender<Decoded>,
    rx: Receiver<Decoded>,
}

impl SpriteCache {
    pub fn new(config: AssetConfig) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            config,
            slots: HashMap::new(),
            tx,
            rx,
        }
    }

    pub fn path_for(&self, key: &SpriteKey) -> PathBuf {
        match key {
            SpriteKey::Palm => self.config.dir.join(&self.config.palm_sprite),
            SpriteKey::Finger(_) => self.config.dir.join(&self.config.finger_sprite),
            SpriteKey::Card(card) => self.card_path(card),
        }
    }

    pub fn card_path(&self, card: &Card) -> PathBuf {
        card.asset_path(&self.config.dir, &self.config.card_extension)
    }

    /// Starts decoding the sprite unless it is already loaded or in flight.
    pub fn request(&mut self, key: &SpriteKey) {
        let path = self.path_for(key);
        if self.slots.contains_key(&path) {
            return;
        }
        debug!(path = %path.display(), "Loading sprite");
        self.slots.insert(path.clone(), SpriteSlot::Loading);

        let tx = self.tx.clone();
        thread::spawn(move || {
            let result = decode_sprite(&path, SVG_RASTER_WIDTH);
            let _ = tx.send(Decoded { path, result });
        });
    }

    /// Uploads finished decodes. Returns true when any slot changed.
    pub fn poll(&mut self, ctx: &egui::Context) -> bool {
        let mut changed = false;
        while let Ok(decoded) = self.rx.try_recv() {
            let slot = match decoded.result {
                Ok(image) => {
                    let size = (image.size[0] as f64, image.size[1] as f64);
                    let name = decoded.path.to_string_lossy().into_owned();
                    let texture = ctx.load_texture(name, image, egui::TextureOptions::LINEAR);
                    info!(path = %decoded.path.display(), "✓ Sprite ready");
                    SpriteSlot::Ready { texture, size }
                }
                Err(e) => {
                    warn!("{}", e);
                    SpriteSlot::Failed
                }
            };
            self.slots.insert(decoded.path, slot);
            changed = true;
        }
        changed
    }

    pub fn texture(&self, key: &SpriteKey) -> Option<(&egui::TextureHandle, (f64, f64))> {
        match self.slots.get(&self.path_for(key)) {
            Some(SpriteSlot::Ready { texture, size }) => Some((texture, *size)),
            _ => None,
        }
    }

    pub fn is_loading(&self, key: &SpriteKey) -> bool {
        matches!(self.slots.get(&self.path_for(key)), Some(SpriteSlot::Loading))
    }

    pub fn has_failed(&self, key: &SpriteKey) -> bool {
        matches!(self.slots.get(&self.path_for(key)), Some(SpriteSlot::Failed))
    }
}

pub fn decode_sprite(path: &Path, svg_width: u32) -> Result<egui::ColorImage, OverlayError> {
    let is_svg = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("svg"))
        .unwrap_or(false);

    if is_svg {
        let data = std::fs::read_to_string(path).map_err(|e| OverlayError::asset(path, e))?;
        return rasterize_svg(&data, svg_width).map_err(|reason| OverlayError::asset(path, reason));
    }

    let rgba = image::open(path).map_err(|e| OverlayError::asset(path, e))?.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    Ok(egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_flat_samples().as_slice()))
}

/// Renders SVG markup at `width` pixels, keeping the document's aspect ratio.
pub fn rasterize_svg(data: &str, width: u32) -> Result<egui::ColorImage, String> {
    let opt = usvg::Options::default();
    let tree = usvg::Tree::from_str(data, &opt).map_err(|e| e.to_string())?;

    let doc_size = tree.size.to_int_size();
    if doc_size.width() == 0 || width == 0 {
        return Err("empty document".to_string());
    }
    let scale = width as f32 / doc_size.width() as f32;
    let height = ((doc_size.height() as f32 * scale).ceil() as u32).max(1);

    let mut pixmap =
        resvg::tiny_skia::Pixmap::new(width, height).ok_or_else(|| format!("cannot allocate {}x{}", width, height))?;
    let transform = resvg::tiny_skia::Transform::from_scale(scale, scale);
    resvg::Tree::from_usvg(&tree).render(transform, &mut pixmap.as_mut());

    // tiny-skia pixmaps are premultiplied, like egui textures
    Ok(egui::ColorImage::from_rgba_premultiplied(
        [width as usize, height as usize],
        pixmap.data(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{Rank, Suit};
    use crate::geometry::Finger;

    const CARD_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="140">
        <rect width="100" height="140" fill="#ffffff"/>
    </svg>"##;

    #[test]
    fn paths_follow_config() {
        let cache = SpriteCache::new(AssetConfig::default());
        assert_eq!(cache.path_for(&SpriteKey::Palm), PathBuf::from("./assets/palm.png"));
        assert_eq!(
            cache.path_for(&SpriteKey::Finger(Finger::Ring)),
            cache.path_for(&SpriteKey::Finger(Finger::Thumb))
        );
        let card = Card::new(Rank::Queen, Suit::Hearts);
        assert_eq!(cache.path_for(&SpriteKey::Card(card)), PathBuf::from("./assets/Qh.svg"));
    }

    #[test]
    fn svg_keeps_aspect_ratio() {
        let image = rasterize_svg(CARD_SVG, 200).unwrap();
        assert_eq!(image.size, [200, 280]);
        assert_eq!(image.pixels[0], egui::Color32::WHITE);
    }

    #[test]
    fn broken_svg_is_an_error() {
        assert!(rasterize_svg("<svg", 100).is_err());
    }

    #[test]
    fn missing_file_reports_asset_error() {
        let err = decode_sprite(Path::new("./no/such/sprite.png"), 64).unwrap_err();
        assert!(matches!(err, OverlayError::Asset { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn decodes_svg_from_disk() {
        let path = std::env::temp_dir().join("magic_overlay_test_7s.svg");
        std::fs::write(&path, CARD_SVG).unwrap();
        let image = decode_sprite(&path, 50).unwrap();
        assert_eq!(image.size, [50, 70]);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn request_marks_slot_loading_once() {
        let mut cache = SpriteCache::new(AssetConfig::default());
        let key = SpriteKey::Finger(Finger::Index);
        cache.request(&key);
        cache.request(&SpriteKey::Finger(Finger::Pinky));
        assert_eq!(cache.slots.len(), 1);
        // slots only leave Loading when polled
        assert!(cache.is_loading(&key));
        assert!(cache.texture(&key).is_none());
    }
}
