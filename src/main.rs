use anyhow::Result;

use sales_dashboard::app::DashboardApp;
use sales_dashboard::config;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cfg = config::load();
    tracing::info!(host = %cfg.host, database = %cfg.database, "starting dashboard");

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let app = DashboardApp::new(rt, cfg);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([960.0, 900.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Predicción de Ventas",
        options,
        Box::new(|_cc| Box::new(app)),
    )
    .map_err(|e| anyhow::anyhow!("ui shell failed: {e}"))?;
    Ok(())
}
