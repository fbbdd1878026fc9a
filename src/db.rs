//! Local SQLite database layer for Scoop POS.
//!
//! Uses rusqlite with WAL mode. Provides schema migrations, settings
//! helpers, and the connection holder used by the SQLite store adapter.

use chrono::Utc;
use rusqlite::{params, Connection, ErrorCode};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{error, info, warn};

use crate::error::{PosError, PosResult};

/// Connection holder shared by the SQLite store.
pub struct DbState {
    pub conn: Mutex<Connection>,
    pub db_path: PathBuf,
}

/// Current schema version. Bump when adding new migrations.
const CURRENT_SCHEMA_VERSION: i32 = 3;

/// Initialize the database at `{data_dir}/pos.db`.
///
/// Creates the directory if needed, opens the connection, sets pragmas,
/// and runs any pending migrations. A file SQLite reports as corrupt or not
/// a database is renamed to `pos.db.corrupt-<timestamp>` and a fresh one is
/// created; any other open failure is returned untouched.
pub fn init(data_dir: &Path) -> PosResult<DbState> {
    fs::create_dir_all(data_dir)?;

    let db_path = data_dir.join("pos.db");
    info!("Opening database at {}", db_path.display());

    let conn = match open_and_configure(&db_path) {
        Ok(c) => c,
        Err(first_err) if is_corruption(&first_err) => {
            let moved = quarantine(&db_path)?;
            warn!(
                moved_to = %moved.display(),
                "Database unreadable ({first_err}), starting a new one"
            );
            open_and_configure(&db_path).map_err(|e| {
                PosError::Storage(format!("Database open failed after quarantine: {e}"))
            })?
        }
        Err(e) => {
            error!("Database open failed: {e}");
            return Err(PosError::Storage(format!("Database open failed: {e}")));
        }
    };

    run_migrations(&conn)?;

    info!("Database initialized (schema v{CURRENT_SCHEMA_VERSION})");

    Ok(DbState {
        conn: Mutex::new(conn),
        db_path,
    })
}

/// Open an in-memory database with the full schema.
pub fn init_in_memory() -> PosResult<DbState> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;",
    )?;
    run_migrations(&conn)?;
    Ok(DbState {
        conn: Mutex::new(conn),
        db_path: PathBuf::from(":memory:"),
    })
}

fn is_corruption(e: &rusqlite::Error) -> bool {
    matches!(
        e.sqlite_error_code(),
        Some(ErrorCode::DatabaseCorrupt | ErrorCode::NotADatabase)
    )
}

/// Rename the database (and its WAL/SHM side files) out of the way.
fn quarantine(db_path: &Path) -> PosResult<PathBuf> {
    let suffix = format!("corrupt-{}", Utc::now().format("%Y%m%d%H%M%S"));
    let target = db_path.with_extension(format!("db.{suffix}"));
    fs::rename(db_path, &target)?;
    for side in ["db-wal", "db-shm"] {
        let path = db_path.with_extension(side);
        if path.exists() {
            fs::rename(&path, db_path.with_extension(format!("{side}.{suffix}")))?;
        }
    }
    Ok(target)
}

/// Open the database file and apply pragmas.
fn open_and_configure(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;

    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )?;

    Ok(conn)
}

/// Run all pending migrations up to `CURRENT_SCHEMA_VERSION`.
fn run_migrations(conn: &Connection) -> PosResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT DEFAULT (datetime('now'))
        );",
    )?;

    let current: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current >= CURRENT_SCHEMA_VERSION {
        info!("Database schema up to date (v{current})");
        return Ok(());
    }

    info!("Migrating database from v{current} to v{CURRENT_SCHEMA_VERSION}");

    if current < 1 {
        migrate(conn, 1, MIGRATION_V1)?;
    }
    if current < 2 {
        migrate(conn, 2, MIGRATION_V2)?;
    }
    if current < 3 {
        migrate(conn, 3, MIGRATION_V3)?;
    }

    Ok(())
}

fn migrate(conn: &Connection, version: i32, sql: &str) -> PosResult<()> {
    conn.execute_batch(sql).map_err(|e| {
        error!("Migration v{version} failed: {e}");
        PosError::Storage(format!("migration v{version}: {e}"))
    })?;
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        params![version],
    )?;
    info!("Applied migration v{version}");
    Ok(())
}

/// v1: settings, catalog, orders.
const MIGRATION_V1: &str = "
    CREATE TABLE IF NOT EXISTS local_settings (
        id TEXT PRIMARY KEY DEFAULT (lower(hex(randomblob(16)))),
        setting_category TEXT NOT NULL,
        setting_key TEXT NOT NULL,
        setting_value TEXT NOT NULL,
        created_at TEXT DEFAULT (datetime('now')),
        updated_at TEXT DEFAULT (datetime('now')),
        UNIQUE(setting_category, setting_key)
    );

    CREATE TABLE IF NOT EXISTS menu_items (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        category TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        price REAL NOT NULL CHECK (price >= 0),
        in_stock INTEGER NOT NULL DEFAULT 1,
        created_at TEXT DEFAULT (datetime('now')),
        updated_at TEXT DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS orders (
        id TEXT PRIMARY KEY,
        order_number TEXT NOT NULL,
        customer_name TEXT,
        customer_phone TEXT,
        table_number TEXT,
        order_type TEXT NOT NULL DEFAULT 'dine-in',
        status TEXT NOT NULL DEFAULT 'pending',
        subtotal REAL NOT NULL DEFAULT 0,
        discount_amount REAL NOT NULL DEFAULT 0,
        tax_amount REAL NOT NULL DEFAULT 0,
        total_amount REAL NOT NULL DEFAULT 0,
        payment_method TEXT,
        payment_status TEXT NOT NULL DEFAULT 'pending',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    -- menu_item_id is deliberately not a foreign key: deleting a menu item
    -- leaves historical lines untouched.
    CREATE TABLE IF NOT EXISTS order_items (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        order_id TEXT NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
        menu_item_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        category TEXT NOT NULL DEFAULT '',
        quantity INTEGER NOT NULL CHECK (quantity >= 1),
        unit_price REAL NOT NULL,
        total_price REAL NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_orders_status ON orders(status);
    CREATE INDEX IF NOT EXISTS idx_orders_created_at ON orders(created_at);
    CREATE INDEX IF NOT EXISTS idx_order_items_order ON order_items(order_id);
";

/// v2: advance orders.
const MIGRATION_V2: &str = "
    CREATE TABLE IF NOT EXISTS advance_orders (
        id TEXT PRIMARY KEY,
        customer_name TEXT NOT NULL,
        customer_phone TEXT NOT NULL,
        customer_email TEXT,
        delivery_date TEXT NOT NULL,
        delivery_time TEXT,
        total_amount REAL NOT NULL DEFAULT 0,
        advance_amount REAL NOT NULL DEFAULT 0,
        remaining_amount REAL NOT NULL DEFAULT 0,
        status TEXT NOT NULL DEFAULT 'pending',
        special_instructions TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS advance_order_items (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        advance_order_id TEXT NOT NULL REFERENCES advance_orders(id) ON DELETE CASCADE,
        menu_item_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        category TEXT NOT NULL DEFAULT '',
        quantity INTEGER NOT NULL CHECK (quantity >= 1),
        unit_price REAL NOT NULL,
        total_price REAL NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_advance_orders_created_at ON advance_orders(created_at);
    CREATE INDEX IF NOT EXISTS idx_advance_items_order ON advance_order_items(advance_order_id);
";

/// v3: held orders, read notifications, local user accounts.
const MIGRATION_V3: &str = "
    CREATE TABLE IF NOT EXISTS held_orders (
        id TEXT PRIMARY KEY,
        order_id TEXT REFERENCES orders(id),
        items TEXT NOT NULL DEFAULT '[]',
        customer_name TEXT,
        customer_phone TEXT,
        table_number TEXT,
        discount_amount REAL NOT NULL DEFAULT 0,
        total REAL NOT NULL DEFAULT 0,
        reason TEXT,
        held_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS read_notifications (
        notification_key TEXT PRIMARY KEY,
        read_at TEXT DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS users (
        username TEXT PRIMARY KEY,
        full_name TEXT NOT NULL,
        role TEXT NOT NULL,
        email TEXT,
        phone TEXT,
        password_hash TEXT NOT NULL,
        registered_at TEXT NOT NULL
    );
";

// ---------------------------------------------------------------------------
// Settings helpers
// ---------------------------------------------------------------------------

/// Read a setting value.
pub fn get_setting(conn: &Connection, category: &str, key: &str) -> Option<String> {
    conn.query_row(
        "SELECT setting_value FROM local_settings WHERE setting_category = ?1 AND setting_key = ?2",
        params![category, key],
        |row| row.get(0),
    )
    .ok()
}

/// Insert or update a setting.
pub fn set_setting(conn: &Connection, category: &str, key: &str, value: &str) -> PosResult<()> {
    conn.execute(
        "INSERT INTO local_settings (setting_category, setting_key, setting_value, updated_at)
         VALUES (?1, ?2, ?3, datetime('now'))
         ON CONFLICT(setting_category, setting_key) DO UPDATE SET
            setting_value = excluded.setting_value,
            updated_at = excluded.updated_at",
        params![category, key, value],
    )?;
    Ok(())
}

/// Delete a setting. Missing keys are not an error.
pub fn delete_setting(conn: &Connection, category: &str, key: &str) -> PosResult<()> {
    conn.execute(
        "DELETE FROM local_settings WHERE setting_category = ?1 AND setting_key = ?2",
        params![category, key],
    )?;
    Ok(())
}

// ===========================================================================
// Tests
// ===========================================================================
