// src/main.rs
use eframe::egui;
use magic_overlay::app::MagicOverlayApp;
use magic_overlay::config::AppConfig;
use magic_overlay::video::CameraSource;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Ok(p) = std::env::current_exe() {
        info!("Running from: {}", p.display());
    }

    let config = AppConfig::load_or_default();

    let cameras = CameraSource::list();
    info!("Found {} camera(s)", cameras.len());
    for (i, name) in cameras.iter().enumerate() {
        info!("  [{}] {}", i, name);
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1000.0, 820.0])
            .with_min_inner_size([640.0, 520.0]),
        centered: true,
        ..Default::default()
    };

    let result = eframe::run_native(
        "Magic Overlay",
        options,
        Box::new(move |cc| {
            cc.egui_ctx.set_visuals(create_visuals());
            Box::new(MagicOverlayApp::new(cc, config))
        }),
    );

    if let Err(e) = result {
        error!("Error running application: {:?}", e);
    }
}

fn create_visuals() -> egui::Visuals {
    let mut visuals = egui::Visuals::dark();

    visuals.widgets.noninteractive.bg_fill = egui::Color32::from_rgb(30, 30, 35);
    visuals.widgets.inactive.bg_fill = egui::Color32::from_rgb(45, 45, 52);
    visuals.widgets.hovered.bg_fill = egui::Color32::from_rgb(55, 55, 65);
    visuals.widgets.active.bg_fill = egui::Color32::from_rgb(70, 130, 240);

    visuals.widgets.noninteractive.rounding = egui::Rounding::same(8.0);
    visuals.widgets.inactive.rounding = egui::Rounding::same(8.0);
    visuals.widgets.hovered.rounding = egui::Rounding::same(8.0);
    visuals.widgets.active.rounding = egui::Rounding::same(8.0);

    visuals.window_rounding = egui::Rounding::same(12.0);
    visuals.menu_rounding = egui::Rounding::same(8.0);

    visuals
}
