//! kvconsole Backend Binary
//!
//! Serves an in-memory cluster over the kvconsole wire protocol, for local
//! development and end-to-end testing of the console.

use clap::Parser;
use kvconsole::memstore::MemCluster;
use kvconsole::network::{Backend, Server};
use tracing_subscriber::{fmt, EnvFilter};

/// In-memory development backend for kvconsole
#[derive(Parser, Debug)]
#[command(name = "kvconsole-backend")]
#[command(about = "In-memory KV backend speaking the kvconsole protocol")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:2379")]
    listen: String,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,kvconsole=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();
    tracing::info!("kvconsole backend v{}", kvconsole::VERSION);

    let cluster = MemCluster::new();
    let server = match Server::bind(&args.listen, Backend::from_cluster(&cluster)) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", args.listen, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
