//! tradefeed - headless dashboard feed client.

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tradefeed_app::config::DEFAULT_CONFIG_PATH;

/// Headless tradefeed client
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via TRADEFEED_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Initial page route, e.g. "/" or "/token/<mint>"
    #[arg(long)]
    route: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // CLI arg > TRADEFEED_CONFIG > default
    let config_path = args
        .config
        .or_else(|| std::env::var("TRADEFEED_CONFIG").ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let mut config = tradefeed_app::AppConfig::load(&config_path)?;
    if let Some(route) = args.route {
        config.page.initial_route = route;
    }

    tradefeed_telemetry::init_logging(&config.telemetry.log_filter)?;
    info!("Starting tradefeed v{}", env!("CARGO_PKG_VERSION"));
    info!(
        config_path = %config_path,
        main_url = %config.main.url,
        monitors = config.enabled_monitors().count(),
        "Configuration loaded"
    );

    let app = tradefeed_app::Application::new(config)?;
    app.run().await?;

    Ok(())
}
