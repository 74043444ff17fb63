use anyhow::Result;
use tracing_subscriber::EnvFilter;

mod app;
mod config;
mod table;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = config::Config::from_env();
    tracing::info!(
        camera = %config.camera_device,
        images = %config.images_dir.display(),
        ledger = %config.attendance_path.display(),
        threshold = config.match_threshold,
        "rollcall starting"
    );

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 760.0])
            .with_title("Rollcall"),
        ..Default::default()
    };

    eframe::run_native(
        "Rollcall",
        options,
        Box::new(move |cc| Ok(Box::new(app::RollcallApp::new(cc, config)?))),
    )
    .map_err(|e| anyhow::anyhow!("window creation failed: {e}"))?;

    tracing::info!("rollcall shutting down");
    Ok(())
}
