mod api;
mod app;
mod audio;
mod catalog;
mod controller;
mod error;
mod settings;

use std::path::Path;

use app::VoicegenApp;

// Catalog language names can be in any script; egui's bundled fonts only cover Latin.
const FALLBACK_FONT_DIRS: &[&str] = &[
    "assets/fonts",
    "/usr/share/fonts/truetype/noto",
    "/usr/share/fonts/opentype/noto",
];

const FALLBACK_FONT_FILES: &[&str] = &[
    "NotoSans-Regular.ttf",
    "NotoSansCJK-Regular.ttc",
    "NotoSansArabic-Regular.ttf",
    "NotoSansDevanagari-Regular.ttf",
    "NotoSansHebrew-Regular.ttf",
    "NotoSansThai-Regular.ttf",
];

fn configure_fonts(ctx: &egui::Context) {
    let mut fonts = egui::FontDefinitions::default();

    for file in FALLBACK_FONT_FILES {
        let Some(path) = FALLBACK_FONT_DIRS
            .iter()
            .map(|dir| Path::new(dir).join(file))
            .find(|path| path.exists())
        else {
            continue;
        };
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) => {
                log::warn!("Skipping font {}: {err}", path.display());
                continue;
            }
        };
        let name = file.to_string();
        fonts
            .font_data
            .insert(name.clone(), egui::FontData::from_owned(bytes));
        for family in [egui::FontFamily::Proportional, egui::FontFamily::Monospace] {
            fonts.families.entry(family).or_default().push(name.clone());
        }
        log::info!("Loaded fallback font {}", path.display());
    }

    ctx.set_fonts(fonts);
}

fn main() -> eframe::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = settings::load_settings();

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([440.0, 420.0])
            .with_min_inner_size([360.0, 320.0])
            .with_resizable(true),
        ..Default::default()
    };

    eframe::run_native(
        "voicegen",
        native_options,
        Box::new(move |cc| {
            configure_fonts(&cc.egui_ctx);
            Box::new(VoicegenApp::new(settings))
        }),
    )
}
