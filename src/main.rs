use clap::Parser;
use diffdrive_bridge::config::BridgeConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Bridge between the motion-control bus and a serial differential-drive base
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Serial port override
    #[arg(long)]
    port: Option<String>,

    /// Baud rate override
    #[arg(long)]
    baud: Option<u32>,
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match BridgeConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => BridgeConfig::default(),
    };
    if let Some(port) = args.port {
        config.serial.port = port;
    }
    if let Some(baud) = args.baud {
        config.serial.baud_rate = baud;
    }

    if let Err(e) = diffdrive_bridge::runtime::run(config).await {
        eprintln!("Bridge error: {}", e);
        std::process::exit(1);
    }
}
