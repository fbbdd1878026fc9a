//! Local key/value store.
//!
//! State is a handful of JSON blobs under well-known keys (`menuItems`,
//! `completedOrders`, `advanceOrders`, `heldOrders`, `readNotifications`,
//! `settings`, `users`). The whole document is rewritten on every mutation.
//! A blob that fails to parse is logged and replaced with its default so a
//! single corrupt key does not take the rest of the state with it.
//!
//! Without a path the store lives only in memory, which is what the tests
//! and the `memory` backend use.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::auth::UserAccount;
use crate::error::{PosError, PosResult};
use crate::models::{AdvanceOrder, HeldOrder, MenuItem, MenuItemInput, Order};
use crate::store::{format_order_number, PosStore};

const KEY_MENU_ITEMS: &str = "menuItems";
const KEY_ORDERS: &str = "completedOrders";
const KEY_ADVANCE_ORDERS: &str = "advanceOrders";
const KEY_HELD_ORDERS: &str = "heldOrders";
const KEY_READ_NOTIFICATIONS: &str = "readNotifications";
const KEY_SETTINGS: &str = "settings";
const KEY_USERS: &str = "users";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonState {
    menu_items: Vec<MenuItem>,
    completed_orders: Vec<Order>,
    advance_orders: Vec<AdvanceOrder>,
    held_orders: Vec<HeldOrder>,
    read_notifications: BTreeSet<String>,
    /// `"{category}.{key}" -> value`
    settings: BTreeMap<String, String>,
    users: Vec<UserAccount>,
}

pub struct JsonStore {
    path: Option<PathBuf>,
    state: Mutex<JsonState>,
}

fn setting_key(category: &str, key: &str) -> String {
    format!("{category}.{key}")
}

fn read_blob<T: DeserializeOwned + Default>(
    doc: &serde_json::Map<String, serde_json::Value>,
    key: &str,
) -> T {
    match doc.get(key) {
        None | Some(serde_json::Value::Null) => T::default(),
        Some(value) => match serde_json::from_value::<T>(value.clone()) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!("local blob [{key}] parse error, using empty default: {e}");
                T::default()
            }
        },
    }
}

impl JsonStore {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: Mutex::new(JsonState::default()),
        }
    }

    /// Load the store document at `path`, creating parent directories.
    /// A missing file starts empty; an unreadable document is logged and
    /// treated as empty.
    pub fn open(path: impl Into<PathBuf>) -> PosResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let state = Self::load(&path);
        info!(
            path = %path.display(),
            menu_items = state.menu_items.len(),
            orders = state.completed_orders.len(),
            "Local store loaded"
        );
        Ok(Self {
            path: Some(path),
            state: Mutex::new(state),
        })
    }

    fn load(path: &Path) -> JsonState {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return JsonState::default(),
            Err(e) => {
                warn!(path = %path.display(), "local store unreadable: {e}");
                return JsonState::default();
            }
        };
        let doc = match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(serde_json::Value::Object(doc)) => doc,
            Ok(_) => {
                warn!(path = %path.display(), "local store is not an object, starting empty");
                return JsonState::default();
            }
            Err(e) => {
                error!(path = %path.display(), "local store JSON parse error: {e}");
                return JsonState::default();
            }
        };
        JsonState {
            menu_items: read_blob(&doc, KEY_MENU_ITEMS),
            completed_orders: read_blob(&doc, KEY_ORDERS),
            advance_orders: read_blob(&doc, KEY_ADVANCE_ORDERS),
            held_orders: read_blob(&doc, KEY_HELD_ORDERS),
            read_notifications: read_blob(&doc, KEY_READ_NOTIFICATIONS),
            settings: read_blob(&doc, KEY_SETTINGS),
            users: read_blob(&doc, KEY_USERS),
        }
    }

    fn persist(&self, state: &JsonState) -> PosResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let body = serde_json::to_string_pretty(state)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, body)?;
        fs::rename(&tmp, path)?;
        debug!(path = %path.display(), "local store written");
        Ok(())
    }

    fn read<R>(&self, f: impl FnOnce(&JsonState) -> R) -> PosResult<R> {
        let state = self.state.lock()?;
        Ok(f(&state))
    }

    /// Apply `f` to a copy of the state, persist it, then swap it in. On
    /// any error the in-memory state is left untouched.
    fn mutate<R>(&self, f: impl FnOnce(&mut JsonState) -> PosResult<R>) -> PosResult<R> {
        let mut state = self.state.lock()?;
        let mut next = state.clone();
        let result = f(&mut next)?;
        self.persist(&next)?;
        *state = next;
        Ok(result)
    }
}

impl PosStore for JsonStore {
    fn backend_name(&self) -> &'static str {
        if self.path.is_some() {
            "json"
        } else {
            "memory"
        }
    }

    fn list_menu_items(&self) -> PosResult<Vec<MenuItem>> {
        self.read(|s| {
            let mut items = s.menu_items.clone();
            items.sort_by(|a, b| a.category.cmp(&b.category).then(a.name.cmp(&b.name)));
            items
        })
    }

    fn get_menu_item(&self, id: i64) -> PosResult<Option<MenuItem>> {
        self.read(|s| s.menu_items.iter().find(|m| m.id == id).cloned())
    }

    fn insert_menu_item(&self, input: &MenuItemInput) -> PosResult<MenuItem> {
        self.mutate(|s| {
            let id = s.menu_items.iter().map(|m| m.id).max().unwrap_or(0) + 1;
            let item = MenuItem {
                id,
                name: input.name.clone(),
                category: input.category.clone(),
                description: input.description.clone(),
                price: input.price,
                in_stock: input.in_stock.unwrap_or(true),
            };
            s.menu_items.push(item.clone());
            Ok(item)
        })
    }

    fn update_menu_item(&self, item: &MenuItem) -> PosResult<()> {
        self.mutate(|s| {
            let slot = s
                .menu_items
                .iter_mut()
                .find(|m| m.id == item.id)
                .ok_or_else(|| PosError::not_found("menu item", item.id))?;
            *slot = item.clone();
            Ok(())
        })
    }

    fn delete_menu_item(&self, id: i64) -> PosResult<bool> {
        self.mutate(|s| {
            let before = s.menu_items.len();
            s.menu_items.retain(|m| m.id != id);
            Ok(s.menu_items.len() != before)
        })
    }

    fn next_order_number(&self, date: NaiveDate) -> PosResult<String> {
        self.mutate(|s| {
            let key = setting_key("order_seq", &date.format("%Y%m%d").to_string());
            let seq = s
                .settings
                .get(&key)
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(0)
                + 1;
            s.settings.insert(key, seq.to_string());
            Ok(format_order_number(date, seq))
        })
    }

    fn list_orders(&self) -> PosResult<Vec<Order>> {
        self.read(|s| {
            let mut orders = s.completed_orders.clone();
            orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            orders
        })
    }

    fn get_order(&self, id: &str) -> PosResult<Option<Order>> {
        self.read(|s| s.completed_orders.iter().find(|o| o.id == id).cloned())
    }

    fn save_order(&self, order: &Order) -> PosResult<()> {
        self.mutate(|s| {
            match s.completed_orders.iter_mut().find(|o| o.id == order.id) {
                Some(slot) => *slot = order.clone(),
                None => s.completed_orders.push(order.clone()),
            }
            Ok(())
        })
    }

    fn list_advance_orders(&self) -> PosResult<Vec<AdvanceOrder>> {
        self.read(|s| {
            let mut orders = s.advance_orders.clone();
            orders.sort_by(|a, b| a.delivery_date.cmp(&b.delivery_date));
            orders
        })
    }

    fn get_advance_order(&self, id: &str) -> PosResult<Option<AdvanceOrder>> {
        self.read(|s| s.advance_orders.iter().find(|o| o.id == id).cloned())
    }

    fn save_advance_order(&self, order: &AdvanceOrder) -> PosResult<()> {
        self.mutate(|s| {
            match s.advance_orders.iter_mut().find(|o| o.id == order.id) {
                Some(slot) => *slot = order.clone(),
                None => s.advance_orders.push(order.clone()),
            }
            Ok(())
        })
    }

    fn list_held_orders(&self) -> PosResult<Vec<HeldOrder>> {
        self.read(|s| {
            let mut held = s.held_orders.clone();
            held.sort_by(|a, b| b.held_at.cmp(&a.held_at));
            held
        })
    }

    fn insert_held_order(&self, held: &HeldOrder) -> PosResult<()> {
        self.mutate(|s| {
            if s.held_orders.iter().any(|h| h.id == held.id) {
                return Err(PosError::validation(format!(
                    "Held order {} already exists",
                    held.id
                )));
            }
            s.held_orders.push(held.clone());
            Ok(())
        })
    }

    fn take_held_order(&self, id: &str) -> PosResult<Option<HeldOrder>> {
        self.mutate(|s| {
            let taken = s
                .held_orders
                .iter()
                .position(|h| h.id == id)
                .map(|idx| s.held_orders.remove(idx));
            Ok(taken)
        })
    }

    fn read_notification_keys(&self) -> PosResult<BTreeSet<String>> {
        self.read(|s| s.read_notifications.clone())
    }

    fn mark_notification_read(&self, key: &str) -> PosResult<bool> {
        if self.read(|s| s.read_notifications.contains(key))? {
            return Ok(false);
        }
        self.mutate(|s| Ok(s.read_notifications.insert(key.to_string())))
    }

    fn get_setting(&self, category: &str, key: &str) -> PosResult<Option<String>> {
        let key = setting_key(category, key);
        self.read(|s| s.settings.get(&key).cloned())
    }

    fn set_setting(&self, category: &str, key: &str, value: &str) -> PosResult<()> {
        let key = setting_key(category, key);
        self.mutate(|s| {
            s.settings.insert(key, value.to_string());
            Ok(())
        })
    }

    fn delete_setting(&self, category: &str, key: &str) -> PosResult<()> {
        let key = setting_key(category, key);
        self.mutate(|s| {
            s.settings.remove(&key);
            Ok(())
        })
    }

    fn get_user(&self, username: &str) -> PosResult<Option<UserAccount>> {
        self.read(|s| s.users.iter().find(|u| u.username == username).cloned())
    }

    fn insert_user(&self, user: &UserAccount) -> PosResult<()> {
        self.mutate(|s| {
            if s.users.iter().any(|u| u.username == user.username) {
                return Err(PosError::validation(format!(
                    "Username {} is already taken",
                    user.username
                )));
            }
            s.users.push(user.clone());
            Ok(())
        })
    }
}
