use clap::Parser;
use client::{ClientApp, ClientConfig};
use log::info;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Lobby id (host address) to join
    #[arg(short, long, default_value = "127.0.0.1:9000")]
    lobby: String,

    /// Name shown in the lobby
    #[arg(short, long, default_value = "player")]
    name: String,

    /// Frames per second
    #[arg(short, long, default_value = "60")]
    frame_rate: u32,

    /// Milliseconds between repeated inputs while steering is unchanged
    #[arg(short = 'k', long, default_value = "250")]
    keep_alive: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting client...");
    info!("Joining lobby: {}", args.lobby);

    let config = ClientConfig {
        lobby: args.lobby,
        user_name: args.name,
        frame_rate: args.frame_rate,
        input_keep_alive: Duration::from_millis(args.keep_alive),
    };

    let mut app = ClientApp::connect(config).await?;
    app.run().await?;

    Ok(())
}
