use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pixelprobe::config::AppConfig;
use pixelprobe::server;

#[derive(Parser)]
#[command(
    name = "pixelprobe",
    version,
    about = "Screenshot capture and UX analysis service"
)]
struct Cli {
    /// Port to listen on (overrides PIXELPROBE_PORT/PORT; default 3000)
    #[arg(long)]
    port: Option<u16>,

    /// Bind address
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Scratch directory for captured screenshots
    #[arg(long, default_value = "./tmp")]
    artifact_dir: PathBuf,

    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.log_level.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = AppConfig::from_env();
    if let Some(port) = cli.port {
        config.port = port;
    }
    config.bind_addr = cli.bind;
    config.artifact_dir = cli.artifact_dir;

    server::serve(config).await
}
