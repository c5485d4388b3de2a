//! Bridge client implementation

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::sync::Mutex;

use cobro_core::{BackupReport, MutationOutcome, Row, Scalar};
use cobro_protocol::{methods, Request, Response};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The host sent something that is not a well-formed response.
    #[error("protocol error: {0}")]
    Protocol(String),
    /// The host answered with a JSON-RPC error. The message carries the
    /// engine's text verbatim for query failures.
    #[error("{message}")]
    Remote { code: i32, message: String },
}

type Result<T> = std::result::Result<T, ClientError>;

pub struct BridgeClient {
    reader: Mutex<BufReader<tokio::net::unix::OwnedReadHalf>>,
    writer: Mutex<tokio::net::unix::OwnedWriteHalf>,
    next_id: AtomicU64,
}

impl BridgeClient {
    /// Connect to the host at the default socket path.
    pub async fn connect() -> Result<Self> {
        Self::connect_to(&cobro_protocol::socket_path()).await
    }

    /// Connect to the host at a specific socket path.
    pub async fn connect_to(path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(path).await?;
        let (read, write) = stream.into_split();
        Ok(Self {
            reader: Mutex::new(BufReader::new(read)),
            writer: Mutex::new(write),
            next_id: AtomicU64::new(1),
        })
    }

    /// Send a JSON-RPC request and wait for its response.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = Request::new(id, method, params);
        let line = request
            .to_json_line()
            .map_err(|e| ClientError::Protocol(e.to_string()))?;

        {
            let mut writer = self.writer.lock().await;
            writer.write_all(line.as_bytes()).await?;
        }

        let mut line = String::new();
        {
            let mut reader = self.reader.lock().await;
            let bytes_read = reader.read_line(&mut line).await?;
            if bytes_read == 0 {
                return Err(ClientError::Protocol("connection closed by host".into()));
            }
        }

        let response: Response = serde_json::from_str(&line)
            .map_err(|e| ClientError::Protocol(format!("malformed response: {}", e)))?;
        if let Some(error) = response.error {
            return Err(ClientError::Remote {
                code: error.code,
                message: error.message,
            });
        }
        Ok(response.result.unwrap_or(Value::Null))
    }

    /// Run a read query and get every matching row.
    pub async fn fetch_all(&self, sql: &str, params: &[Scalar]) -> Result<Vec<Row>> {
        let result = self
            .call(methods::FETCH_ALL, json!({ "sql": sql, "params": params }))
            .await?;
        serde_json::from_value(result).map_err(|e| ClientError::Protocol(e.to_string()))
    }

    /// Run a read query and get the first matching row, if any.
    pub async fn fetch_one(&self, sql: &str, params: &[Scalar]) -> Result<Option<Row>> {
        let result = self
            .call(methods::FETCH_ONE, json!({ "sql": sql, "params": params }))
            .await?;
        serde_json::from_value(result).map_err(|e| ClientError::Protocol(e.to_string()))
    }

    /// Run a mutation and get the affected-row count and insert identity.
    pub async fn execute(&self, sql: &str, params: &[Scalar]) -> Result<MutationOutcome> {
        let result = self
            .call(methods::EXECUTE, json!({ "sql": sql, "params": params }))
            .await?;
        serde_json::from_value(result).map_err(|e| ClientError::Protocol(e.to_string()))
    }

    /// Ask the host to copy the store to `destination`. `None` reports the
    /// user declining to pick one.
    pub async fn backup(&self, destination: Option<&Path>) -> Result<BackupReport> {
        let result = self
            .call(methods::BACKUP, json!({ "destination": destination }))
            .await?;
        serde_json::from_value(result).map_err(|e| ClientError::Protocol(e.to_string()))
    }

    /// Ask the host to replace the store with `source`. On success the host
    /// relaunches itself after replying; this connection then closes.
    pub async fn restore(&self, source: Option<&Path>) -> Result<BackupReport> {
        let result = self
            .call(methods::RESTORE, json!({ "source": source }))
            .await?;
        serde_json::from_value(result).map_err(|e| ClientError::Protocol(e.to_string()))
    }

    /// Ping the host.
    pub async fn ping(&self) -> Result<String> {
        let result = self.call(methods::PING, json!({})).await?;
        Ok(result.as_str().unwrap_or("").to_string())
    }

    /// Request host shutdown.
    pub async fn shutdown(&self) -> Result<()> {
        self.call(methods::SHUTDOWN, json!({})).await?;
        Ok(())
    }
}
