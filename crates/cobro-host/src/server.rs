//! Unix socket server for the JSON-RPC bridge.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use cobro_protocol::{remove_socket, Request, Response, PARSE_ERROR};

use crate::handlers::{dispatch, ControlAction, HostState};

/// Why the serve loop ended. The caller decides what the process does next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerOutcome {
    Shutdown,
    Relaunch,
}

pub struct Server {
    listener: UnixListener,
    socket_path: PathBuf,
    state: Arc<HostState>,
    control_tx: mpsc::Sender<ControlAction>,
    control_rx: mpsc::Receiver<ControlAction>,
}

impl Server {
    /// Bind the bridge socket. Replaces a stale socket file if one is left
    /// over from a previous run.
    pub fn bind(path: &Path, state: HostState) -> Result<Self> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let listener = UnixListener::bind(path)?;
        let (control_tx, control_rx) = mpsc::channel(1);
        info!(socket = %path.display(), "bridge listening");
        Ok(Self {
            listener,
            socket_path: path.to_path_buf(),
            state: Arc::new(state),
            control_tx,
            control_rx,
        })
    }

    /// Accept connections until a shutdown or restore ends the loop.
    pub async fn run(mut self) -> Result<ServerOutcome> {
        let outcome = loop {
            tokio::select! {
                accept_result = self.listener.accept() => {
                    match accept_result {
                        Ok((stream, _)) => {
                            let state = self.state.clone();
                            let control_tx = self.control_tx.clone();
                            tokio::spawn(async move {
                                if let Err(e) = handle_client(stream, state, control_tx).await {
                                    error!("Client error: {}", e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                action = self.control_rx.recv() => {
                    match action {
                        Some(ControlAction::Shutdown) | None => break ServerOutcome::Shutdown,
                        Some(ControlAction::Relaunch) => break ServerOutcome::Relaunch,
                    }
                }
            }
        };

        remove_socket(&self.socket_path);
        info!(?outcome, "bridge stopped");
        Ok(outcome)
    }
}

async fn handle_client(
    stream: UnixStream,
    state: Arc<HostState>,
    control_tx: mpsc::Sender<ControlAction>,
) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            break;
        }

        let (response, action) = match serde_json::from_str::<Request>(&line) {
            Ok(req) => dispatch(&state, req),
            Err(e) => {
                warn!("Parse error: {}", e);
                (Response::error(None, PARSE_ERROR, e.to_string()), None)
            }
        };

        // The reply must reach the client before the host acts on a
        // shutdown or relaunch.
        let output = response.to_json_line()?;
        writer.write_all(output.as_bytes()).await?;
        writer.flush().await?;

        if let Some(action) = action {
            debug!(?action, "forwarding control action");
            let _ = control_tx.send(action).await;
            break;
        }
    }

    Ok(())
}
