mod cli;
mod gui;

use clap::Parser;
use cli::Args;
use gui::VisualizerApp;
use voiceforms::visual::Canvas;
use voiceforms::{audio, Visualizer};

fn main() -> eframe::Result<()> {
    //
    // Initialize logging with default filter set to "info".
    //
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if args.list_devices {
        for (i, name) in audio::list_input_devices().iter().enumerate() {
            println!("[{}] {}", i, name);
        }
        return Ok(());
    }

    //
    // Build and validate the engine before any window exists.
    //
    let config = match args.to_config() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };
    log::info!(
        "Starting voiceforms: {:?} mode, band {}..{} Hz, up to {} entities",
        config.mode,
        config.low_freq_hz,
        config.high_freq_hz,
        config.max_entities
    );
    let visualizer: Visualizer<Canvas> = match Visualizer::new(config) {
        Ok(v) => v,
        Err(e) => {
            log::error!("Cannot create visualizer: {}", e);
            std::process::exit(2);
        }
    };

    //
    // Initialize GUI configuration.
    //
    log::info!("Initializing GUI...");
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([800.0, 600.0])
            .with_min_inner_size([480.0, 360.0])
            .with_title("voiceforms"),
        ..Default::default()
    };

    let device = args.device;
    eframe::run_native(
        "voiceforms",
        options,
        Box::new(move |cc| {
            gui::theme::setup_global_style(&cc.egui_ctx);
            Ok(Box::new(VisualizerApp::new(cc, visualizer, device)))
        }),
    )
}
