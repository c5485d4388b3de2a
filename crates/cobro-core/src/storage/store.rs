//! The embedded store handle and the generic query bridge.
//!
//! One `Store` is constructed at host startup and passed to whatever needs
//! it; there is no module-level instance. The bridge operations accept
//! free-form SQL plus positional scalar parameters and hand back rows as
//! JSON field maps, which is exactly what crosses the process boundary.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::types::{ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::{Connection, ToSql};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CobroError, Result};
use crate::schema;

/// One row as a column-name → value map.
pub type Row = serde_json::Map<String, Value>;

/// A positional query parameter: the JSON scalar set. Parameters are always
/// bound, never concatenated into query text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Real(f64),
    Text(String),
}

impl ToSql for Scalar {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Scalar::Null => ToSqlOutput::Owned(SqlValue::Null),
            Scalar::Bool(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
            Scalar::Int(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Scalar::Real(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
            Scalar::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

/// Result of an insert/update/delete through the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationOutcome {
    /// Rows changed by the statement.
    pub rows_affected: u64,
    /// Rowid assigned by the most recent insert on this connection.
    pub last_insert_id: i64,
}

/// Handle to the live store file. Owns the single connection for the
/// process's lifetime; dropped (via [`Store::close`]) only for restore.
pub struct Store {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl Store {
    /// Open (or create) the store file and run schema setup. Called once at
    /// host startup, before any query-serving capability is advertised.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)
            .map_err(|e| CobroError::Storage(format!("failed to open store: {}", e)))?;
        Self::from_connection(conn, path.to_path_buf())
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| CobroError::Storage(format!("failed to open store: {}", e)))?;
        Self::from_connection(conn, PathBuf::from(":memory:"))
    }

    fn from_connection(conn: Connection, path: PathBuf) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| CobroError::Storage(format!("failed to enable foreign keys: {}", e)))?;
        schema::initialize(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Path of the live store file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Execute a read query and return every matching row. Zero matches is
    /// an empty vec, never an error.
    pub fn fetch_all(&self, sql: &str, params: &[Scalar]) -> Result<Vec<Row>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let mut rows = stmt.query(rusqlite::params_from_iter(params.iter()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(row_to_map(&columns, row)?);
        }
        Ok(out)
    }

    /// Execute a read query and return the first matching row, or `None` as
    /// the explicit absence marker.
    pub fn fetch_one(&self, sql: &str, params: &[Scalar]) -> Result<Option<Row>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let mut rows = stmt.query(rusqlite::params_from_iter(params.iter()))?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_map(&columns, row)?)),
            None => Ok(None),
        }
    }

    /// Execute an insert/update/delete. Returns the affected-row count and
    /// the identity assigned by the most recent insert.
    pub fn execute(&self, sql: &str, params: &[Scalar]) -> Result<MutationOutcome> {
        let conn = self.lock()?;
        let rows_affected = conn.execute(sql, rusqlite::params_from_iter(params.iter()))? as u64;
        Ok(MutationOutcome {
            rows_affected,
            last_insert_id: conn.last_insert_rowid(),
        })
    }

    /// Release the connection, flushing SQLite's state to disk. Required
    /// before the live file may be overwritten by a restore.
    pub fn close(self) -> Result<()> {
        let conn = self
            .conn
            .into_inner()
            .map_err(|_| CobroError::Storage("store connection poisoned".into()))?;
        conn.close()
            .map_err(|(_, e)| CobroError::Storage(format!("failed to close store: {}", e)))
    }

    pub(crate) fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| CobroError::Storage("store connection poisoned".into()))
    }
}

fn row_to_map(columns: &[String], row: &rusqlite::Row<'_>) -> Result<Row> {
    let mut map = Row::new();
    for (idx, name) in columns.iter().enumerate() {
        let value = match row.get_ref(idx)? {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::from(i),
            ValueRef::Real(f) => Value::from(f),
            ValueRef::Text(t) => Value::from(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::from(b.to_vec()),
        };
        map.insert(name.clone(), value);
    }
    Ok(map)
}
