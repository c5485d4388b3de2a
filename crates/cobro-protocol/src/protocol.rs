//! JSON-RPC 2.0 message shapes, newline-delimited on the wire.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use cobro_core::Scalar;

/// Bridge method names. The `store.*` family is the generic query surface
/// the UI renderer calls through.
pub mod methods {
    pub const FETCH_ALL: &str = "store.fetch_all";
    pub const FETCH_ONE: &str = "store.fetch_one";
    pub const EXECUTE: &str = "store.execute";
    pub const BACKUP: &str = "store.backup";
    pub const RESTORE: &str = "store.restore";
    pub const PING: &str = "ping";
    pub const SHUTDOWN: &str = "shutdown";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(u64),
    String(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    pub id: Option<RequestId>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl Request {
    pub fn new(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Some(RequestId::Number(id)),
            method: method.into(),
            params,
        }
    }

    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        let mut json = serde_json::to_string(self)?;
        json.push('\n');
        Ok(json)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Response {
    pub fn success(id: Option<RequestId>, result: impl Into<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result.into()),
            error: None,
        }
    }

    pub fn error(id: Option<RequestId>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        let mut json = serde_json::to_string(self)?;
        json.push('\n');
        Ok(json)
    }
}

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

/// Parameters of the `store.fetch_all` / `store.fetch_one` / `store.execute`
/// methods: query text plus positional scalar bindings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryParams {
    pub sql: String,
    #[serde(default)]
    pub params: Vec<Scalar>,
}

/// Parameters of `store.backup`. No destination means the user declined to
/// pick one; the host reports a cancellation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackupParams {
    #[serde(default)]
    pub destination: Option<PathBuf>,
}

/// Parameters of `store.restore`, mirroring [`BackupParams`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RestoreParams {
    #[serde(default)]
    pub source: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_success_serialization() {
        let resp = Response::success(Some(RequestId::Number(1)), "pong");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"result\":\"pong\""));
        assert!(json.contains("\"id\":1"));
        assert!(!json.contains("error"));
    }

    #[test]
    fn test_response_error_serialization() {
        let resp = Response::error(
            Some(RequestId::Number(1)),
            METHOD_NOT_FOUND,
            "Unknown method",
        );
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"error\""));
        assert!(json.contains("-32601"));
        assert!(!json.contains("result"));
    }

    #[test]
    fn test_request_round_trip() {
        let req = Request::new(
            7,
            methods::FETCH_ALL,
            json!({"sql": "SELECT * FROM clients", "params": []}),
        );
        let line = req.to_json_line().unwrap();
        assert!(line.ends_with('\n'));

        let parsed: Request = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(parsed.method, "store.fetch_all");
        assert_eq!(parsed.id, Some(RequestId::Number(7)));
    }

    #[test]
    fn test_query_params_default_bindings() {
        let params: QueryParams =
            serde_json::from_value(json!({"sql": "SELECT 1"})).unwrap();
        assert!(params.params.is_empty());

        let params: QueryParams = serde_json::from_value(json!({
            "sql": "SELECT ?",
            "params": [3],
        }))
        .unwrap();
        assert_eq!(params.params, vec![Scalar::Int(3)]);
    }

    #[test]
    fn test_backup_params_tolerate_missing_destination() {
        let params: BackupParams = serde_json::from_value(json!({})).unwrap();
        assert!(params.destination.is_none());

        let params: BackupParams =
            serde_json::from_value(json!({"destination": "/tmp/copy.sqlite"})).unwrap();
        assert_eq!(params.destination, Some(PathBuf::from("/tmp/copy.sqlite")));
    }
}
