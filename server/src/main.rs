use clap::Parser;
use log::info;
use server::network::{Server, ServerConfig, ServerMessage};
use server::world::WorldData;
use std::path::PathBuf;

/// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "3000")]
    port: u16,
    /// Maximum number of concurrent clients
    #[clap(short, long, default_value = "32")]
    max_clients: usize,
    /// Directory holding spells.json and breakables.json
    #[clap(long, default_value = "data")]
    data_dir: PathBuf,
    /// Directory searched when a catalog is missing from --data-dir
    #[clap(long, default_value = "../data")]
    fallback_data_dir: PathBuf,
    /// Seed for spawn positions and loot rolls
    #[clap(long)]
    seed: Option<u64>,
}

/// Main-method of the application.
/// Loads the world catalogs, binds the websocket listener and runs the server until Ctrl+C.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let world = WorldData::load(&args.data_dir, &args.fallback_data_dir);
    let config = ServerConfig {
        max_clients: args.max_clients,
        seed: args.seed,
    };

    let address = format!("{}:{}", args.host, args.port);
    let mut server = Server::bind(&address, world, config).await?;

    // Handle shutdown gracefully
    let shutdown = server.message_sender();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down gracefully...");
            let _ = shutdown.send(ServerMessage::Shutdown);
        }
    });

    server.run().await
}
