use clap::Parser;
use log::{error, info};
use server::network::Server;
use std::time::Duration;

/// Authoritative server for the stomp game
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "8080")]
    port: u16,
    /// Tick rate (updates per second)
    #[clap(short, long, default_value = "60")]
    tick_rate: u32,
    /// Maximum number of connected clients
    #[clap(short, long, default_value = "16")]
    max_clients: usize,
    /// Number of server-controlled bots
    #[clap(short, long, default_value = "2")]
    bots: usize,
    /// Length of one match in minutes
    #[clap(long, default_value = "3.0")]
    match_minutes: f32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    let address = format!("{}:{}", args.host, args.port);
    let tick_duration = Duration::from_secs_f32(1.0 / args.tick_rate.max(1) as f32);

    info!(
        "Starting server on {} at {}Hz with {} bots",
        address, args.tick_rate, args.bots
    );

    let mut server = Server::new(&address, tick_duration, args.max_clients)
        .await?
        .with_match_duration(args.match_minutes * 60.0)
        .with_bots(args.bots);

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server stopped with error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
