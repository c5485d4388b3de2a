//! Request dispatch for the bridge methods.

use std::path::PathBuf;
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use cobro_core::backup::{self, BackupReport};
use cobro_core::{paths, Store};
use cobro_protocol::{
    BackupParams, QueryParams, Request, Response, RestoreParams, INTERNAL_ERROR, INVALID_PARAMS,
    METHOD_NOT_FOUND,
};

/// What the server must do after a response has been written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Shutdown,
    Relaunch,
}

/// Shared host state. The store sits behind an `Option` so that a restore
/// can close it, swap the file, and (on failure) reopen it in place.
pub struct HostState {
    store: Mutex<Option<Store>>,
    store_path: PathBuf,
    data_dir: PathBuf,
}

impl HostState {
    pub fn new(store: Store, data_dir: PathBuf) -> Self {
        let store_path = store.path().to_path_buf();
        Self {
            store: Mutex::new(Some(store)),
            store_path,
            data_dir,
        }
    }

    fn with_store<T>(
        &self,
        f: impl FnOnce(&Store) -> cobro_core::Result<T>,
    ) -> Result<T, String> {
        let guard = self
            .store
            .lock()
            .map_err(|_| "host state poisoned".to_string())?;
        match guard.as_ref() {
            Some(store) => f(store).map_err(|e| e.to_string()),
            None => Err("store is not open".to_string()),
        }
    }
}

/// Handle one parsed request. Returns the response to write back and,
/// for shutdown/restore, the action to take once it has been written.
pub fn dispatch(state: &HostState, req: Request) -> (Response, Option<ControlAction>) {
    use cobro_protocol::methods;

    let id = req.id.clone();
    debug!(method = %req.method, "dispatching request");
    match req.method.as_str() {
        methods::PING => (Response::success(id, "pong"), None),
        methods::SHUTDOWN => {
            info!("shutdown requested");
            (Response::success(id, json!({ "ok": true })), Some(ControlAction::Shutdown))
        }
        methods::FETCH_ALL => (fetch_all(state, id, req.params), None),
        methods::FETCH_ONE => (fetch_one(state, id, req.params), None),
        methods::EXECUTE => (execute(state, id, req.params), None),
        methods::BACKUP => (backup(state, id, req.params), None),
        methods::RESTORE => restore(state, id, req.params),
        other => (
            Response::error(id, METHOD_NOT_FOUND, format!("Unknown method: {}", other)),
            None,
        ),
    }
}

fn parse_params<T: DeserializeOwned>(
    id: &Option<cobro_protocol::RequestId>,
    params: Value,
) -> Result<T, Response> {
    serde_json::from_value(params).map_err(|e| {
        Response::error(
            id.clone(),
            INVALID_PARAMS,
            format!("Invalid params: {}", e),
        )
    })
}

fn fetch_all(state: &HostState, id: Option<cobro_protocol::RequestId>, params: Value) -> Response {
    let query: QueryParams = match parse_params(&id, params) {
        Ok(q) => q,
        Err(resp) => return resp,
    };
    match state.with_store(|store| store.fetch_all(&query.sql, &query.params)) {
        Ok(rows) => Response::success(id, Value::Array(rows.into_iter().map(Value::Object).collect())),
        Err(message) => Response::error(id, INTERNAL_ERROR, message),
    }
}

fn fetch_one(state: &HostState, id: Option<cobro_protocol::RequestId>, params: Value) -> Response {
    let query: QueryParams = match parse_params(&id, params) {
        Ok(q) => q,
        Err(resp) => return resp,
    };
    match state.with_store(|store| store.fetch_one(&query.sql, &query.params)) {
        Ok(Some(row)) => Response::success(id, Value::Object(row)),
        Ok(None) => Response::success(id, Value::Null),
        Err(message) => Response::error(id, INTERNAL_ERROR, message),
    }
}

fn execute(state: &HostState, id: Option<cobro_protocol::RequestId>, params: Value) -> Response {
    let query: QueryParams = match parse_params(&id, params) {
        Ok(q) => q,
        Err(resp) => return resp,
    };
    match state.with_store(|store| store.execute(&query.sql, &query.params)) {
        Ok(outcome) => Response::success(id, json!(outcome)),
        Err(message) => Response::error(id, INTERNAL_ERROR, message),
    }
}

fn backup(state: &HostState, id: Option<cobro_protocol::RequestId>, params: Value) -> Response {
    let params: BackupParams = match parse_params(&id, params) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let report = backup::backup_to(&state.store_path, params.destination.as_deref());
    Response::success(id, json!(report))
}

/// Replace the live store file with a chosen snapshot. On success the host
/// relaunches after replying, so the fresh file is opened from a clean
/// process; on failure the store is reopened and the host keeps running.
fn restore(
    state: &HostState,
    id: Option<cobro_protocol::RequestId>,
    params: Value,
) -> (Response, Option<ControlAction>) {
    let params: RestoreParams = match parse_params(&id, params) {
        Ok(p) => p,
        Err(resp) => return (resp, None),
    };
    let Some(source) = params.source else {
        return (Response::success(id, json!(BackupReport::cancelled())), None);
    };

    let mut guard = match state.store.lock() {
        Ok(guard) => guard,
        Err(_) => {
            return (
                Response::error(id, INTERNAL_ERROR, "host state poisoned"),
                None,
            );
        }
    };
    let Some(store) = guard.take() else {
        return (
            Response::error(id, INTERNAL_ERROR, "store is not open"),
            None,
        );
    };

    if let Err(e) = store.close() {
        error!(error = %e, "could not close store for restore");
        reopen_store(state, &mut guard);
        return (
            Response::success(id, json!(BackupReport::failed(e.to_string()))),
            None,
        );
    }

    match backup::overwrite_store_file(&state.store_path, &source) {
        Ok(_) => {
            if let Err(e) = backup::write_restore_marker(&state.data_dir) {
                warn!(error = %e, "restore succeeded but marker could not be written");
            }
            info!(source = %source.display(), "store restored, relaunching");
            (
                Response::success(id, json!(BackupReport::completed())),
                Some(ControlAction::Relaunch),
            )
        }
        Err(e) => {
            warn!(error = %e, "restore failed, reopening current store");
            reopen_store(state, &mut guard);
            (
                Response::success(id, json!(BackupReport::failed(e.to_string()))),
                None,
            )
        }
    }
}

fn reopen_store(state: &HostState, guard: &mut Option<Store>) {
    match Store::open(&state.store_path) {
        Ok(store) => *guard = Some(store),
        Err(e) => error!(error = %e, "could not reopen store; queries will fail"),
    }
}

/// Consume the restore marker left by a previous run, if any.
pub fn acknowledge_restore(data_dir: &std::path::Path) {
    if backup::take_restore_marker(data_dir) {
        info!(
            store = %paths::store_path(data_dir).display(),
            "restored store file adopted"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cobro_protocol::{methods, RequestId};
    use tempfile::tempdir;

    fn state() -> HostState {
        let dir = tempdir().unwrap();
        let store = Store::open(&paths::store_path(dir.path())).unwrap();
        // Leak the tempdir so the store file outlives this helper.
        let path = dir.keep();
        HostState::new(store, path)
    }

    fn request(method: &str, params: Value) -> Request {
        Request::new(1, method, params)
    }

    #[test]
    fn test_ping() {
        let state = state();
        let (resp, action) = dispatch(&state, request(methods::PING, json!({})));
        assert_eq!(resp.result, Some(json!("pong")));
        assert!(action.is_none());
    }

    #[test]
    fn test_unknown_method() {
        let state = state();
        let (resp, _) = dispatch(&state, request("no.such.method", json!({})));
        let err = resp.error.expect("should be an error");
        assert_eq!(err.code, METHOD_NOT_FOUND);
        assert!(err.message.contains("no.such.method"));
    }

    #[test]
    fn test_shutdown_carries_action() {
        let state = state();
        let (resp, action) = dispatch(&state, request(methods::SHUTDOWN, json!({})));
        assert!(resp.error.is_none());
        assert_eq!(action, Some(ControlAction::Shutdown));
    }

    #[test]
    fn test_execute_then_fetch() {
        let state = state();
        let (resp, _) = dispatch(
            &state,
            request(
                methods::EXECUTE,
                json!({
                    "sql": "INSERT INTO clients (name) VALUES (?)",
                    "params": ["Acme Ltd"],
                }),
            ),
        );
        let outcome = resp.result.expect("insert should succeed");
        assert_eq!(outcome["rows_affected"], json!(1));
        let inserted_id = outcome["last_insert_id"].clone();

        let (resp, _) = dispatch(
            &state,
            request(
                methods::FETCH_ONE,
                json!({
                    "sql": "SELECT name FROM clients WHERE id = ?",
                    "params": [inserted_id],
                }),
            ),
        );
        assert_eq!(resp.result, Some(json!({ "name": "Acme Ltd" })));
    }

    #[test]
    fn test_fetch_one_absence_is_null() {
        let state = state();
        let (resp, _) = dispatch(
            &state,
            request(
                methods::FETCH_ONE,
                json!({ "sql": "SELECT * FROM clients WHERE id = 42" }),
            ),
        );
        assert_eq!(resp.result, Some(Value::Null));
    }

    #[test]
    fn test_query_error_text_is_passed_through() {
        let state = state();
        let (resp, _) = dispatch(
            &state,
            request(methods::FETCH_ALL, json!({ "sql": "SELEC 1" })),
        );
        let err = resp.error.expect("bad syntax should fail");
        assert_eq!(err.code, INTERNAL_ERROR);
        assert!(err.message.contains("syntax error"));
    }

    #[test]
    fn test_malformed_params_are_rejected() {
        let state = state();
        let (resp, _) = dispatch(
            &state,
            request(methods::FETCH_ALL, json!({ "query": "SELECT 1" })),
        );
        assert_eq!(resp.error.expect("missing sql field").code, INVALID_PARAMS);
    }

    #[test]
    fn test_restore_without_source_is_cancelled() {
        let state = state();
        let (resp, action) = dispatch(&state, request(methods::RESTORE, json!({})));
        let report = resp.result.expect("cancellation is not an error");
        assert_eq!(report["status"], json!("cancelled"));
        assert!(action.is_none());
    }

    #[test]
    fn test_restore_from_missing_source_keeps_store_usable() {
        let state = state();
        let (resp, action) = dispatch(
            &state,
            request(methods::RESTORE, json!({ "source": "/no/such/file.sqlite" })),
        );
        let report = resp.result.expect("failure is reported, not errored");
        assert_eq!(report["status"], json!("failed"));
        assert!(action.is_none());

        // The store was reopened; queries still work.
        let (resp, _) = dispatch(
            &state,
            request(methods::FETCH_ALL, json!({ "sql": "SELECT * FROM clients" })),
        );
        assert_eq!(resp.result, Some(json!([])));
    }

    #[test]
    fn test_restore_success_requests_relaunch() {
        let state = state();
        dispatch(
            &state,
            request(
                methods::EXECUTE,
                json!({ "sql": "INSERT INTO clients (name) VALUES ('Old')" }),
            ),
        );

        // Snapshot with no clients, then restore it.
        let snapshot_dir = tempdir().unwrap();
        let snapshot = snapshot_dir.path().join("snapshot.sqlite");
        let empty = Store::open(&snapshot).unwrap();
        empty.close().unwrap();

        let (resp, action) = dispatch(
            &state,
            request(methods::RESTORE, json!({ "source": snapshot })),
        );
        assert_eq!(resp.result.unwrap()["status"], json!("completed"));
        assert_eq!(action, Some(ControlAction::Relaunch));
        assert!(paths::restore_marker_path(&state.data_dir).exists());
    }
}
