use clap::Parser;
use log::info;
use server::config::ServerConfig;
use server::network::{Server, ServerMessage};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Maximum number of simultaneous connections
    #[arg(short = 'c', long, default_value = "256")]
    max_connections: usize,

    /// Rounds per game
    #[arg(short = 'r', long, default_value = "10", value_parser = clap::value_parser!(u32).range(1..))]
    max_rounds: u32,

    /// Seconds of inactivity before a session can no longer reconnect
    #[arg(long, default_value = "300", value_parser = clap::value_parser!(u64).range(1..))]
    session_ttl_secs: u64,

    /// Seconds between session expiry sweeps
    #[arg(long, default_value = "60", value_parser = clap::value_parser!(u64).range(1..))]
    sweep_interval_secs: u64,

    /// Seconds of silence before a connection is dropped
    #[arg(long, default_value = "10", value_parser = clap::value_parser!(u64).range(1..))]
    connection_timeout_secs: u64,

    /// Seconds of inactivity before a room is discarded
    #[arg(long, default_value = "1800", value_parser = clap::value_parser!(u64).range(1..))]
    room_idle_secs: u64,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        ServerConfig {
            host: args.host,
            port: args.port,
            max_connections: args.max_connections,
            max_rounds: args.max_rounds,
            session_ttl: Duration::from_secs(args.session_ttl_secs),
            session_sweep_interval: Duration::from_secs(args.sweep_interval_secs),
            connection_timeout: Duration::from_secs(args.connection_timeout_secs),
            room_idle_timeout: Duration::from_secs(args.room_idle_secs),
            ..ServerConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> server::ServerResult<()> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let config = ServerConfig::from(Args::parse());
    info!(
        "Starting server on {} ({} rounds per game, max {} connections)",
        config.bind_addr(),
        config.max_rounds,
        config.max_connections
    );

    let mut server = Server::new(config).await?;
    let control = server.control();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down gracefully...");
            let _ = control.send(ServerMessage::Shutdown);
        }
    });

    server.run().await
}
