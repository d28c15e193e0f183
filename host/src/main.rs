use clap::Parser;
use host::{Server, ServerConfig};
use log::info;
use shared::GameSettings;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// IP address to bind the lobby to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "9000")]
    port: u16,

    /// Simulation frames per second
    #[arg(short, long, default_value = "60")]
    frame_rate: u32,

    /// Name shown in the lobby
    #[arg(short, long, default_value = "host")]
    name: String,

    /// Number of peers to wait for before the game starts
    #[arg(short, long, default_value = "1")]
    wait_for: usize,

    /// Maximum number of peers in the lobby
    #[arg(short, long, default_value = "7")]
    max_peers: usize,

    /// Seconds between the end of a round and the next
    #[arg(long, default_value = "3")]
    restart_delay: u64,

    /// JSON file overriding game settings
    #[arg(short, long)]
    settings: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let settings = match &args.settings {
        Some(path) => {
            info!("Loading settings from {}", path.display());
            GameSettings::from_json_file(path)?
        }
        None => GameSettings::default(),
    };

    let config = ServerConfig {
        bind: format!("{}:{}", args.host, args.port),
        frame_rate: args.frame_rate,
        user_name: args.name,
        wait_for: args.wait_for,
        max_peers: args.max_peers.min(settings.max_players.saturating_sub(1)),
        round_restart_delay: Duration::from_secs(args.restart_delay),
        settings,
    };

    info!("Starting host...");
    let mut server = Server::bind(config).await?;
    server.run().await?;

    Ok(())
}
