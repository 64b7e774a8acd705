use std::sync::Arc;

mod app;
mod bootstrap;
mod cancel;
mod config;
mod download;
mod error;
mod localizations;
mod log_sink;
mod models;
mod progress;
mod theme;
mod tools;
mod ui;

use app::TubeGrabApp;
use config::Settings;
use download::YtDlpRunner;
use localizations::Localizations;
use ui::dialogs::RfdDialogs;

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Arc::new(Settings::from_env());
    log::info!(
        "music dir {}, video dir {}, {:?} build",
        settings.music_dir.display(),
        settings.video_dir.display(),
        settings.distribution()
    );

    let localizer = Localizations::new();
    log::info!("UI language {}", localizer.current());
    let title = localizer.text("app-title", "YouTube / YouTube Music Downloader");

    let app = TubeGrabApp::new(
        &settings,
        Arc::new(YtDlpRunner::new(Arc::clone(&settings))),
        Box::new(RfdDialogs),
        localizer,
    );

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([620.0, 520.0])
            .with_min_inner_size([480.0, 400.0])
            .with_title(title.clone()),
        ..Default::default()
    };

    eframe::run_native(
        &title,
        options,
        Box::new(|cc| {
            cc.egui_ctx.set_visuals(egui::Visuals::light());
            Box::new(app)
        }),
    )
}
