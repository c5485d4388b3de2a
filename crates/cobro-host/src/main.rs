//! Cobro host - the privileged process of a small invoicing app.
//!
//! Owns the SQLite store file and serves it to the sandboxed UI process
//! over a Unix socket, one JSON-RPC message per line. The UI never opens
//! the file itself.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cobro_core::{paths, Store, VERSION};
use cobro_host::{config, handlers, HostState, Server, ServerOutcome};

/// Cobro host - serves the invoicing store to the UI over a Unix socket
#[derive(Parser)]
#[command(name = "cobrod")]
#[command(author, version = VERSION, about, long_about = None)]
struct Cli {
    /// Directory holding the store file
    #[arg(long, env = "COBRO_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Socket path to listen on
    #[arg(long, env = "COBRO_SOCKET")]
    socket: Option<PathBuf>,

    /// Path to the config file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let file_config = load_config(cli.config)?;

    let data_dir = cli
        .data_dir
        .or(file_config.store.data_dir)
        .map_or_else(paths::data_dir, Ok)?;
    let socket = cli
        .socket
        .or(file_config.bridge.socket)
        .unwrap_or_else(cobro_protocol::socket_path);

    handlers::acknowledge_restore(&data_dir);

    let store_path = paths::store_path(&data_dir);
    let store = Store::open(&store_path)
        .with_context(|| format!("Failed to open store at {}", store_path.display()))?;
    info!(store = %store_path.display(), "store ready");

    let state = HostState::new(store, data_dir);
    let server = Server::bind(&socket, state)
        .with_context(|| format!("Failed to bind socket at {}", socket.display()))?;

    match server.run().await? {
        ServerOutcome::Shutdown => Ok(()),
        ServerOutcome::Relaunch => relaunch(),
    }
}

fn load_config(path: Option<PathBuf>) -> Result<config::HostConfig> {
    match path {
        Some(path) => config::read_config(&path),
        None => {
            let default = config::default_config_path()?;
            if default.exists() {
                config::read_config(&default)
            } else {
                Ok(config::HostConfig::default())
            }
        }
    }
}

/// Start a fresh copy of this process and exit. Called after a restore so
/// the replaced store file is opened from a clean slate.
fn relaunch() -> Result<()> {
    let exe = std::env::current_exe().context("Failed to resolve own executable")?;
    let args: Vec<String> = std::env::args().skip(1).collect();
    info!(exe = %exe.display(), "relaunching after restore");
    std::process::Command::new(exe)
        .args(args)
        .spawn()
        .context("Failed to relaunch host")?;
    std::process::exit(0);
}
