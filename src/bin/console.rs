//! kvconsole CLI
//!
//! Runs one console operation against a cluster and prints the response
//! envelope as JSON. Exits non-zero when the operation fails.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use kvconsole::console::{read_request, read_request_file};
use kvconsole::network::TcpConnector;
use kvconsole::{ApiResponse, AtomicOperation, Config, Console, Mode, Operation};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

/// Admin console for a shared KV cluster
#[derive(Parser, Debug)]
#[command(name = "kvconsole")]
#[command(about = "Inspect and edit namespaced keys in a KV cluster")]
#[command(version)]
struct Args {
    /// Comma separated cluster endpoints (host:port); overrides KVCONSOLE_ENDPOINTS
    #[arg(short, long)]
    endpoints: Option<String>,

    /// Client mode: rawkv or txn
    #[arg(short, long, default_value = "rawkv")]
    mode: Mode,

    /// Connect timeout in milliseconds
    #[arg(long, default_value = "5000")]
    connect_timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List keys under a prefix, one page at a time
    Scan {
        /// Logical key prefix (empty for every key)
        #[arg(short, long)]
        prefix: Option<String>,

        #[arg(long, default_value = "1")]
        page: usize,

        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Get a value by key
    Get { key: String },

    /// Create a key that must not exist yet
    Create { key: String, value: String },

    /// Update a key that must already exist
    Update { key: String, value: String },

    /// Delete a key
    Delete { key: String },

    /// Delete several keys, each independently
    DeleteKeys {
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Run a JSON list of independent operations ("-" reads stdin)
    Batch { file: String },

    /// Run a JSON list of operations as one transaction ("-" reads stdin)
    Txn { file: String },

    /// Delete every managed key in the selected mode
    DeleteAll,

    /// Show connection state and endpoints
    Cluster,

    /// Reconnect to a new comma separated endpoint list
    Reconfigure { endpoints: String },

    /// Show per-mode key counts
    Stats,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let args = Args::parse();

    let mut config = Config::builder()
        .connect_timeout_ms(args.connect_timeout_ms)
        .build()
        .with_env_overrides();
    if let Some(csv) = &args.endpoints {
        config.endpoints = csv
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
    }

    let console = match Console::open(Arc::new(TcpConnector::new(&config)), &config) {
        Ok(console) => console,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(2);
        }
    };

    let mode = args.mode;
    let ok = match args.command {
        Commands::Scan { prefix, page, limit } => {
            emit(&console.scan(mode, prefix.as_deref(), page, limit))
        }
        Commands::Get { key } => emit(&console.get(mode, &key)),
        Commands::Create { key, value } => emit(&console.create(mode, &key, &value)),
        Commands::Update { key, value } => emit(&console.update(mode, &key, &value)),
        Commands::Delete { key } => emit(&console.delete(mode, &key)),
        Commands::DeleteKeys { keys } => emit(&console.delete_keys(mode, &keys)),
        Commands::Batch { file } => match load::<Vec<Operation>>(&file) {
            Ok(ops) => emit(&console.batch(&ops)),
            Err(e) => fail(&e),
        },
        Commands::Txn { file } => match load::<Vec<AtomicOperation>>(&file) {
            Ok(ops) => emit(&console.transaction(&ops)),
            Err(e) => fail(&e),
        },
        Commands::DeleteAll => emit(&console.delete_all(mode)),
        Commands::Cluster => emit(&console.cluster_status()),
        Commands::Reconfigure { endpoints } => emit(&console.reconfigure_csv(&endpoints)),
        Commands::Stats => emit(&console.stats()),
    };

    console.shutdown();
    if !ok {
        std::process::exit(1);
    }
}

/// Request body from a file, or stdin for "-"
fn load<T: DeserializeOwned>(path: &str) -> kvconsole::Result<T> {
    if path == "-" {
        read_request(std::io::stdin().lock())
    } else {
        read_request_file(path)
    }
}

fn emit<T: Serialize>(response: &ApiResponse<T>) -> bool {
    match serde_json::to_string_pretty(response) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("error: failed to render response: {}", e),
    }
    response.success
}

fn fail(err: &kvconsole::ConsoleError) -> bool {
    emit(&ApiResponse::<()>::failure("Invalid request body", err))
}
