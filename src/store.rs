//! Persistence seam.
//!
//! Every service operation goes through [`PosStore`]. Two adapters exist:
//! [`SqliteStore`](crate::sqlite_store::SqliteStore) for the relational
//! database and [`JsonStore`](crate::json_store::JsonStore) for the local
//! key/value blobs (file-backed or purely in-memory). The adapter is picked
//! from [`AppConfig`] at startup.

use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;

use crate::auth::UserAccount;
use crate::config::{AppConfig, StoreBackend};
use crate::error::PosResult;
use crate::json_store::JsonStore;
use crate::models::{AdvanceOrder, HeldOrder, MenuItem, MenuItemInput, Order};
use crate::sqlite_store::SqliteStore;

pub trait PosStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    // -- catalog ---------------------------------------------------------

    /// Menu items ordered by category, then name.
    fn list_menu_items(&self) -> PosResult<Vec<MenuItem>>;
    fn get_menu_item(&self, id: i64) -> PosResult<Option<MenuItem>>;
    /// Insert a new item and return it with its assigned id.
    fn insert_menu_item(&self, input: &MenuItemInput) -> PosResult<MenuItem>;
    /// Replace an existing item. Missing ids are a `NotFound` error.
    fn update_menu_item(&self, item: &MenuItem) -> PosResult<()>;
    /// Returns `false` when nothing was deleted.
    fn delete_menu_item(&self, id: i64) -> PosResult<bool>;

    // -- orders ----------------------------------------------------------

    /// Allocate the next human-readable order number for `date`.
    fn next_order_number(&self, date: NaiveDate) -> PosResult<String>;
    /// Orders, newest first.
    fn list_orders(&self) -> PosResult<Vec<Order>>;
    fn get_order(&self, id: &str) -> PosResult<Option<Order>>;
    /// Insert or replace an order together with its lines.
    fn save_order(&self, order: &Order) -> PosResult<()>;

    // -- advance orders --------------------------------------------------

    /// Advance orders ordered by delivery date.
    fn list_advance_orders(&self) -> PosResult<Vec<AdvanceOrder>>;
    fn get_advance_order(&self, id: &str) -> PosResult<Option<AdvanceOrder>>;
    fn save_advance_order(&self, order: &AdvanceOrder) -> PosResult<()>;

    // -- held orders -----------------------------------------------------

    /// Held orders, most recently held first.
    fn list_held_orders(&self) -> PosResult<Vec<HeldOrder>>;
    fn insert_held_order(&self, held: &HeldOrder) -> PosResult<()>;
    /// Remove and return a held order in one step. A second call with the
    /// same id returns `None`.
    fn take_held_order(&self, id: &str) -> PosResult<Option<HeldOrder>>;

    // -- notifications ---------------------------------------------------

    fn read_notification_keys(&self) -> PosResult<BTreeSet<String>>;
    /// Returns `true` if the key was not read before.
    fn mark_notification_read(&self, key: &str) -> PosResult<bool>;

    // -- settings --------------------------------------------------------

    fn get_setting(&self, category: &str, key: &str) -> PosResult<Option<String>>;
    fn set_setting(&self, category: &str, key: &str, value: &str) -> PosResult<()>;
    fn delete_setting(&self, category: &str, key: &str) -> PosResult<()>;

    // -- users -----------------------------------------------------------

    fn get_user(&self, username: &str) -> PosResult<Option<UserAccount>>;
    /// Fails with a validation error when the username is taken.
    fn insert_user(&self, user: &UserAccount) -> PosResult<()>;
}

/// Format an order number from a day and a per-store sequence value.
pub(crate) fn format_order_number(date: NaiveDate, seq: u64) -> String {
    format!("ORD-{}-{seq:04}", date.format("%Y%m%d"))
}

/// Open the store selected by `config`.
pub fn open_store(config: &AppConfig) -> PosResult<Arc<dyn PosStore>> {
    let store: Arc<dyn PosStore> = match config.store_backend {
        StoreBackend::Sqlite => Arc::new(SqliteStore::open(&config.data_dir)?),
        StoreBackend::Json => Arc::new(JsonStore::open(config.data_dir.join("store.json"))?),
        StoreBackend::Memory => Arc::new(JsonStore::in_memory()),
    };
    info!(
        backend = store.backend_name(),
        data_dir = %config.data_dir.display(),
        "Store opened"
    );
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_number_format() {
        let day = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        assert_eq!(format_order_number(day, 7), "ORD-20261018-0007");
        assert_eq!(format_order_number(day, 12345), "ORD-20261018-12345");
    }

    #[test]
    fn open_store_respects_backend() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::for_data_dir(dir.path());

        config.store_backend = StoreBackend::Memory;
        assert_eq!(open_store(&config).unwrap().backend_name(), "memory");

        config.store_backend = StoreBackend::Json;
        assert_eq!(open_store(&config).unwrap().backend_name(), "json");

        config.store_backend = StoreBackend::Sqlite;
        assert_eq!(open_store(&config).unwrap().backend_name(), "sqlite");
        assert!(dir.path().join("pos.db").exists());
    }
}
