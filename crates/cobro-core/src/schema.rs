//! Schema definition and startup migrations.
//!
//! Runs once per process, synchronously, before the host advertises any
//! capability. Table and column names are normative: existing store files
//! from prior installations must open unmodified.
//!
//! Additive changes are tracked in a `schema_migrations` ledger so that a
//! genuine migration failure is never mistaken for the benign
//! already-applied case. The one tolerated failure is "duplicate column
//! name", which means the column predates the ledger itself; it is recorded
//! as applied and setup continues.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{CobroError, Result};

/// Name the singleton profile row is seeded with on first startup.
pub const DEFAULT_PROFILE_NAME: &str = "Mi Nombre";

const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS profile (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    name TEXT,
    document_id TEXT,
    address TEXT,
    phone TEXT,
    email TEXT,
    bank_info TEXT,
    signature_path TEXT
);

CREATE TABLE IF NOT EXISTS clients (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    document_id TEXT,
    address TEXT,
    city TEXT,
    phone TEXT,
    email TEXT,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS invoices (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    number INTEGER NOT NULL,
    date DATE NOT NULL,
    client_id INTEGER NOT NULL,
    total DECIMAL(10, 2) DEFAULT 0,
    notes TEXT,
    status TEXT DEFAULT 'draft',
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (client_id) REFERENCES clients(id)
);

CREATE TABLE IF NOT EXISTS invoice_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    invoice_id INTEGER NOT NULL,
    description TEXT NOT NULL,
    quantity DECIMAL(10, 2) NOT NULL,
    price DECIMAL(10, 2) NOT NULL,
    FOREIGN KEY (invoice_id) REFERENCES invoices(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS invoice_payments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    invoice_id INTEGER NOT NULL,
    date DATE NOT NULL,
    amount DECIMAL(10, 2) NOT NULL,
    notes TEXT,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (invoice_id) REFERENCES invoices(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS bank_accounts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    bank TEXT NOT NULL,
    account_type TEXT NOT NULL,
    account_number TEXT NOT NULL,
    is_default INTEGER DEFAULT 0,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS schema_migrations (
    id TEXT PRIMARY KEY,
    applied_at TEXT NOT NULL
);
"#;

struct Migration {
    id: &'static str,
    sql: &'static str,
}

/// Forward-only additive migrations, applied in order. New entries go at the
/// end; ids are never reused.
const MIGRATIONS: &[Migration] = &[
    Migration {
        id: "0001-clients-city",
        sql: "ALTER TABLE clients ADD COLUMN city TEXT",
    },
    Migration {
        id: "0002-invoices-bank-account",
        sql: "ALTER TABLE invoices ADD COLUMN bank_account_id INTEGER REFERENCES bank_accounts(id)",
    },
];

/// Ensure all tables exist, apply pending migrations, and seed the singleton
/// profile row. Idempotent: re-running against an initialized store changes
/// nothing.
pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch(CREATE_TABLES)
        .map_err(|e| CobroError::Schema(format!("failed to create tables: {}", e)))?;

    for migration in MIGRATIONS {
        apply_migration(conn, migration.id, migration.sql)?;
    }

    seed_profile(conn)?;
    debug!("schema setup complete");
    Ok(())
}

fn apply_migration(conn: &Connection, id: &str, sql: &str) -> Result<()> {
    let applied: Option<String> = conn
        .query_row(
            "SELECT id FROM schema_migrations WHERE id = ?",
            [id],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| CobroError::Schema(format!("failed to read migration ledger: {}", e)))?;
    if applied.is_some() {
        return Ok(());
    }

    match conn.execute(sql, []) {
        Ok(_) => info!(migration = id, "applied migration"),
        // The column exists but the ledger has no record of it: the store
        // file predates the ledger. Record it and move on.
        Err(e) if is_duplicate_column(&e) => {
            debug!(migration = id, "column already present, recording as applied");
        }
        Err(e) => {
            return Err(CobroError::Schema(format!(
                "migration {} failed: {}",
                id, e
            )));
        }
    }

    conn.execute(
        "INSERT INTO schema_migrations (id, applied_at) VALUES (?, ?)",
        [id, &Utc::now().to_rfc3339()],
    )
    .map_err(|e| CobroError::Schema(format!("failed to record migration {}: {}", id, e)))?;
    Ok(())
}

fn is_duplicate_column(err: &rusqlite::Error) -> bool {
    err.to_string().contains("duplicate column name")
}

fn seed_profile(conn: &Connection) -> Result<()> {
    let existing: Option<i64> = conn
        .query_row("SELECT id FROM profile WHERE id = 1", [], |row| row.get(0))
        .optional()
        .map_err(|e| CobroError::Schema(format!("failed to read profile: {}", e)))?;
    if existing.is_none() {
        conn.execute(
            "INSERT INTO profile (id, name) VALUES (1, ?)",
            [DEFAULT_PROFILE_NAME],
        )
        .map_err(|e| CobroError::Schema(format!("failed to seed profile: {}", e)))?;
        info!("seeded singleton profile row");
    }
    Ok(())
}
