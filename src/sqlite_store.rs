//! SQLite adapter for [`PosStore`].
//!
//! Rows are read as raw strings and parsed into the domain types after the
//! statement finishes, so a malformed row surfaces as a `Storage` error
//! instead of a panic inside a rusqlite closure. Multi-row writes (an order
//! header plus its lines, a held-order recall) run inside one
//! `BEGIN IMMEDIATE` transaction.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeSet;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

use crate::auth::{Role, UserAccount};
use crate::db::{self, DbState};
use crate::error::{PosError, PosResult};
use crate::models::{
    AdvanceOrder, AdvanceStatus, HeldOrder, MenuItem, MenuItemInput, Order, OrderItem,
    OrderStatus, OrderType, PaymentMethod, PaymentStatus,
};
use crate::store::{format_order_number, PosStore};

pub struct SqliteStore {
    db: DbState,
}

impl SqliteStore {
    /// Open (or create) `{data_dir}/pos.db`.
    pub fn open(data_dir: &Path) -> PosResult<Self> {
        Ok(Self {
            db: db::init(data_dir)?,
        })
    }

    pub fn open_in_memory() -> PosResult<Self> {
        Ok(Self {
            db: db::init_in_memory()?,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Run `f` inside `BEGIN IMMEDIATE`, committing on success and rolling back
/// on any error.
fn in_transaction<R>(
    conn: &Connection,
    f: impl FnOnce(&Connection) -> PosResult<R>,
) -> PosResult<R> {
    conn.execute_batch("BEGIN IMMEDIATE")?;
    match f(conn) {
        Ok(value) => {
            conn.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(e) => {
            let _ = conn.execute_batch("ROLLBACK");
            Err(e)
        }
    }
}

fn parse_ts(raw: &str) -> PosResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| PosError::Storage(format!("bad timestamp {raw:?}: {e}")))
}

fn parse_date(raw: &str) -> PosResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| PosError::Storage(format!("bad date {raw:?}: {e}")))
}

fn parse_column<T: FromStr<Err = PosError>>(raw: &str) -> PosResult<T> {
    raw.parse::<T>()
        .map_err(|e| PosError::Storage(format!("bad column value: {e}")))
}

const MENU_COLUMNS: &str = "id, name, category, description, price, in_stock";

fn menu_item_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MenuItem> {
    Ok(MenuItem {
        id: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        description: row.get(3)?,
        price: row.get(4)?,
        in_stock: row.get::<_, i64>(5)? != 0,
    })
}

/// Lines for one order. `table` / `fk` name the line table and its parent
/// column.
fn load_lines(conn: &Connection, table: &str, fk: &str, id: &str) -> PosResult<Vec<OrderItem>> {
    let sql = format!(
        "SELECT menu_item_id, name, category, unit_price, quantity
         FROM {table} WHERE {fk} = ?1 ORDER BY id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let lines = stmt
        .query_map(params![id], |row| {
            Ok(OrderItem::new(
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, u32>(4)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(lines)
}

fn replace_lines(
    conn: &Connection,
    table: &str,
    fk: &str,
    id: &str,
    items: &[OrderItem],
) -> PosResult<()> {
    conn.execute(&format!("DELETE FROM {table} WHERE {fk} = ?1"), params![id])?;
    let sql = format!(
        "INSERT INTO {table} ({fk}, menu_item_id, name, category, quantity, unit_price, total_price)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
    );
    let mut stmt = conn.prepare(&sql)?;
    for line in items {
        stmt.execute(params![
            id,
            line.menu_item_id,
            line.name,
            line.category,
            line.quantity(),
            line.unit_price(),
            line.total_price(),
        ])?;
    }
    Ok(())
}

// -- orders ----------------------------------------------------------------

const ORDER_COLUMNS: &str = "id, order_number, customer_name, customer_phone, table_number,
    order_type, status, subtotal, discount_amount, tax_amount, total_amount,
    payment_method, payment_status, created_at, updated_at";

struct OrderRow {
    id: String,
    order_number: String,
    customer_name: Option<String>,
    customer_phone: Option<String>,
    table_number: Option<String>,
    order_type: String,
    status: String,
    subtotal: f64,
    discount_amount: f64,
    tax_amount: f64,
    total_amount: f64,
    payment_method: Option<String>,
    payment_status: String,
    created_at: String,
    updated_at: String,
}

impl OrderRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            order_number: row.get(1)?,
            customer_name: row.get(2)?,
            customer_phone: row.get(3)?,
            table_number: row.get(4)?,
            order_type: row.get(5)?,
            status: row.get(6)?,
            subtotal: row.get(7)?,
            discount_amount: row.get(8)?,
            tax_amount: row.get(9)?,
            total_amount: row.get(10)?,
            payment_method: row.get(11)?,
            payment_status: row.get(12)?,
            created_at: row.get(13)?,
            updated_at: row.get(14)?,
        })
    }

    fn into_order(self, conn: &Connection) -> PosResult<Order> {
        let items = load_lines(conn, "order_items", "order_id", &self.id)?;
        Ok(Order {
            order_type: parse_column::<OrderType>(&self.order_type)?,
            status: parse_column::<OrderStatus>(&self.status)?,
            payment_method: self
                .payment_method
                .as_deref()
                .map(parse_column::<PaymentMethod>)
                .transpose()?,
            payment_status: parse_column::<PaymentStatus>(&self.payment_status)?,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
            id: self.id,
            order_number: self.order_number,
            customer_name: self.customer_name,
            customer_phone: self.customer_phone,
            table_number: self.table_number,
            items,
            subtotal: self.subtotal,
            discount_amount: self.discount_amount,
            tax_amount: self.tax_amount,
            total_amount: self.total_amount,
        })
    }
}

// -- advance orders --------------------------------------------------------

const ADVANCE_COLUMNS: &str = "id, customer_name, customer_phone, customer_email,
    delivery_date, delivery_time, total_amount, advance_amount, remaining_amount,
    status, special_instructions, created_at, updated_at";

struct AdvanceRow {
    id: String,
    customer_name: String,
    customer_phone: String,
    customer_email: Option<String>,
    delivery_date: String,
    delivery_time: Option<String>,
    total_amount: f64,
    advance_amount: f64,
    remaining_amount: f64,
    status: String,
    special_instructions: Option<String>,
    created_at: String,
    updated_at: String,
}

impl AdvanceRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            customer_name: row.get(1)?,
            customer_phone: row.get(2)?,
            customer_email: row.get(3)?,
            delivery_date: row.get(4)?,
            delivery_time: row.get(5)?,
            total_amount: row.get(6)?,
            advance_amount: row.get(7)?,
            remaining_amount: row.get(8)?,
            status: row.get(9)?,
            special_instructions: row.get(10)?,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
        })
    }

    fn into_advance(self, conn: &Connection) -> PosResult<AdvanceOrder> {
        let items = load_lines(conn, "advance_order_items", "advance_order_id", &self.id)?;
        Ok(AdvanceOrder {
            delivery_date: parse_date(&self.delivery_date)?,
            status: parse_column::<AdvanceStatus>(&self.status)?,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
            id: self.id,
            customer_name: self.customer_name,
            customer_phone: self.customer_phone,
            customer_email: self.customer_email,
            delivery_time: self.delivery_time,
            items,
            total_amount: self.total_amount,
            advance_amount: self.advance_amount,
            remaining_amount: self.remaining_amount,
            special_instructions: self.special_instructions,
        })
    }
}

// -- held orders -----------------------------------------------------------

const HELD_COLUMNS: &str = "id, order_id, items, customer_name, customer_phone,
    table_number, discount_amount, total, reason, held_at";

struct HeldRow {
    id: String,
    order_id: Option<String>,
    items: String,
    customer_name: Option<String>,
    customer_phone: Option<String>,
    table_number: Option<String>,
    discount_amount: f64,
    total: f64,
    reason: Option<String>,
    held_at: String,
}

impl HeldRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            order_id: row.get(1)?,
            items: row.get(2)?,
            customer_name: row.get(3)?,
            customer_phone: row.get(4)?,
            table_number: row.get(5)?,
            discount_amount: row.get(6)?,
            total: row.get(7)?,
            reason: row.get(8)?,
            held_at: row.get(9)?,
        })
    }

    fn into_held(self) -> PosResult<HeldOrder> {
        Ok(HeldOrder {
            items: serde_json::from_str(&self.items)?,
            held_at: parse_ts(&self.held_at)?,
            id: self.id,
            customer_name: self.customer_name,
            customer_phone: self.customer_phone,
            table_number: self.table_number,
            discount_amount: self.discount_amount,
            total: self.total,
            reason: self.reason,
            order_id: self.order_id,
        })
    }
}

// ---------------------------------------------------------------------------
// PosStore
// ---------------------------------------------------------------------------

impl PosStore for SqliteStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn list_menu_items(&self) -> PosResult<Vec<MenuItem>> {
        let conn = self.db.conn.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {MENU_COLUMNS} FROM menu_items ORDER BY category, name"
        ))?;
        let items = stmt
            .query_map([], menu_item_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    fn get_menu_item(&self, id: i64) -> PosResult<Option<MenuItem>> {
        let conn = self.db.conn.lock()?;
        let item = conn
            .query_row(
                &format!("SELECT {MENU_COLUMNS} FROM menu_items WHERE id = ?1"),
                params![id],
                menu_item_from_row,
            )
            .optional()?;
        Ok(item)
    }

    fn insert_menu_item(&self, input: &MenuItemInput) -> PosResult<MenuItem> {
        let conn = self.db.conn.lock()?;
        let in_stock = input.in_stock.unwrap_or(true);
        conn.execute(
            "INSERT INTO menu_items (name, category, description, price, in_stock)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                input.name,
                input.category,
                input.description,
                input.price,
                in_stock as i64
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!(id, name = %input.name, "Menu item inserted");
        Ok(MenuItem {
            id,
            name: input.name.clone(),
            category: input.category.clone(),
            description: input.description.clone(),
            price: input.price,
            in_stock,
        })
    }

    fn update_menu_item(&self, item: &MenuItem) -> PosResult<()> {
        let conn = self.db.conn.lock()?;
        let changed = conn.execute(
            "UPDATE menu_items SET name = ?1, category = ?2, description = ?3, price = ?4,
                in_stock = ?5, updated_at = datetime('now')
             WHERE id = ?6",
            params![
                item.name,
                item.category,
                item.description,
                item.price,
                item.in_stock as i64,
                item.id
            ],
        )?;
        if changed == 0 {
            return Err(PosError::not_found("menu item", item.id));
        }
        Ok(())
    }

    fn delete_menu_item(&self, id: i64) -> PosResult<bool> {
        let conn = self.db.conn.lock()?;
        let changed = conn.execute("DELETE FROM menu_items WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    fn next_order_number(&self, date: NaiveDate) -> PosResult<String> {
        let conn = self.db.conn.lock()?;
        let key = date.format("%Y%m%d").to_string();
        in_transaction(&conn, |conn| {
            let seq = db::get_setting(conn, "order_seq", &key)
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(0)
                + 1;
            db::set_setting(conn, "order_seq", &key, &seq.to_string())?;
            Ok(format_order_number(date, seq))
        })
    }

    fn list_orders(&self) -> PosResult<Vec<Order>> {
        let conn = self.db.conn.lock()?;
        let rows = {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC"
            ))?;
            let rows = stmt
                .query_map([], OrderRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };
        rows.into_iter().map(|r| r.into_order(&conn)).collect()
    }

    fn get_order(&self, id: &str) -> PosResult<Option<Order>> {
        let conn = self.db.conn.lock()?;
        let row = conn
            .query_row(
                &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"),
                params![id],
                OrderRow::from_row,
            )
            .optional()?;
        row.map(|r| r.into_order(&conn)).transpose()
    }

    fn save_order(&self, order: &Order) -> PosResult<()> {
        let conn = self.db.conn.lock()?;
        in_transaction(&conn, |conn| {
            conn.execute(
                "INSERT INTO orders (
                    id, order_number, customer_name, customer_phone, table_number,
                    order_type, status, subtotal, discount_amount, tax_amount, total_amount,
                    payment_method, payment_status, created_at, updated_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
                 ON CONFLICT(id) DO UPDATE SET
                    order_number = excluded.order_number,
                    customer_name = excluded.customer_name,
                    customer_phone = excluded.customer_phone,
                    table_number = excluded.table_number,
                    order_type = excluded.order_type,
                    status = excluded.status,
                    subtotal = excluded.subtotal,
                    discount_amount = excluded.discount_amount,
                    tax_amount = excluded.tax_amount,
                    total_amount = excluded.total_amount,
                    payment_method = excluded.payment_method,
                    payment_status = excluded.payment_status,
                    updated_at = excluded.updated_at",
                params![
                    order.id,
                    order.order_number,
                    order.customer_name,
                    order.customer_phone,
                    order.table_number,
                    order.order_type.as_str(),
                    order.status.as_str(),
                    order.subtotal,
                    order.discount_amount,
                    order.tax_amount,
                    order.total_amount,
                    order.payment_method.map(|m| m.as_str()),
                    order.payment_status.as_str(),
                    order.created_at.to_rfc3339(),
                    order.updated_at.to_rfc3339(),
                ],
            )?;
            replace_lines(conn, "order_items", "order_id", &order.id, &order.items)
        })?;
        debug!(order_id = %order.id, status = %order.status, "Order saved");
        Ok(())
    }

    fn list_advance_orders(&self) -> PosResult<Vec<AdvanceOrder>> {
        let conn = self.db.conn.lock()?;
        let rows = {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ADVANCE_COLUMNS} FROM advance_orders ORDER BY delivery_date, created_at"
            ))?;
            let rows = stmt
                .query_map([], AdvanceRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };
        rows.into_iter().map(|r| r.into_advance(&conn)).collect()
    }

    fn get_advance_order(&self, id: &str) -> PosResult<Option<AdvanceOrder>> {
        let conn = self.db.conn.lock()?;
        let row = conn
            .query_row(
                &format!("SELECT {ADVANCE_COLUMNS} FROM advance_orders WHERE id = ?1"),
                params![id],
                AdvanceRow::from_row,
            )
            .optional()?;
        row.map(|r| r.into_advance(&conn)).transpose()
    }

    fn save_advance_order(&self, order: &AdvanceOrder) -> PosResult<()> {
        let conn = self.db.conn.lock()?;
        in_transaction(&conn, |conn| {
            conn.execute(
                "INSERT INTO advance_orders (
                    id, customer_name, customer_phone, customer_email, delivery_date,
                    delivery_time, total_amount, advance_amount, remaining_amount, status,
                    special_instructions, created_at, updated_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                 ON CONFLICT(id) DO UPDATE SET
                    customer_name = excluded.customer_name,
                    customer_phone = excluded.customer_phone,
                    customer_email = excluded.customer_email,
                    delivery_date = excluded.delivery_date,
                    delivery_time = excluded.delivery_time,
                    total_amount = excluded.total_amount,
                    advance_amount = excluded.advance_amount,
                    remaining_amount = excluded.remaining_amount,
                    status = excluded.status,
                    special_instructions = excluded.special_instructions,
                    updated_at = excluded.updated_at",
                params![
                    order.id,
                    order.customer_name,
                    order.customer_phone,
                    order.customer_email,
                    order.delivery_date.format("%Y-%m-%d").to_string(),
                    order.delivery_time,
                    order.total_amount,
                    order.advance_amount,
                    order.remaining_amount,
                    order.status.as_str(),
                    order.special_instructions,
                    order.created_at.to_rfc3339(),
                    order.updated_at.to_rfc3339(),
                ],
            )?;
            replace_lines(
                conn,
                "advance_order_items",
                "advance_order_id",
                &order.id,
                &order.items,
            )
        })?;
        debug!(advance_id = %order.id, status = %order.status, "Advance order saved");
        Ok(())
    }

    fn list_held_orders(&self) -> PosResult<Vec<HeldOrder>> {
        let conn = self.db.conn.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {HELD_COLUMNS} FROM held_orders ORDER BY held_at DESC"
        ))?;
        let rows = stmt
            .query_map([], HeldRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(HeldRow::into_held).collect()
    }

    fn insert_held_order(&self, held: &HeldOrder) -> PosResult<()> {
        let conn = self.db.conn.lock()?;
        let items = serde_json::to_string(&held.items)?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO held_orders (
                id, order_id, items, customer_name, customer_phone, table_number,
                discount_amount, total, reason, held_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                held.id,
                held.order_id,
                items,
                held.customer_name,
                held.customer_phone,
                held.table_number,
                held.discount_amount,
                held.total,
                held.reason,
                held.held_at.to_rfc3339(),
            ],
        )?;
        if inserted == 0 {
            return Err(PosError::validation(format!(
                "Held order {} already exists",
                held.id
            )));
        }
        Ok(())
    }

    fn take_held_order(&self, id: &str) -> PosResult<Option<HeldOrder>> {
        let conn = self.db.conn.lock()?;
        in_transaction(&conn, |conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {HELD_COLUMNS} FROM held_orders WHERE id = ?1"),
                    params![id],
                    HeldRow::from_row,
                )
                .optional()?;
            let Some(row) = row else {
                return Ok(None);
            };
            conn.execute("DELETE FROM held_orders WHERE id = ?1", params![id])?;
            row.into_held().map(Some)
        })
    }

    fn read_notification_keys(&self) -> PosResult<BTreeSet<String>> {
        let conn = self.db.conn.lock()?;
        let mut stmt = conn.prepare("SELECT notification_key FROM read_notifications")?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(keys)
    }

    fn mark_notification_read(&self, key: &str) -> PosResult<bool> {
        let conn = self.db.conn.lock()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO read_notifications (notification_key) VALUES (?1)",
            params![key],
        )?;
        Ok(inserted > 0)
    }

    fn get_setting(&self, category: &str, key: &str) -> PosResult<Option<String>> {
        let conn = self.db.conn.lock()?;
        Ok(db::get_setting(&conn, category, key))
    }

    fn set_setting(&self, category: &str, key: &str, value: &str) -> PosResult<()> {
        let conn = self.db.conn.lock()?;
        db::set_setting(&conn, category, key, value)
    }

    fn delete_setting(&self, category: &str, key: &str) -> PosResult<()> {
        let conn = self.db.conn.lock()?;
        db::delete_setting(&conn, category, key)
    }

    fn get_user(&self, username: &str) -> PosResult<Option<UserAccount>> {
        let conn = self.db.conn.lock()?;
        let row = conn
            .query_row(
                "SELECT username, full_name, role, email, phone, password_hash, registered_at
                 FROM users WHERE username = ?1",
                params![username],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                },
            )
            .optional()?;
        let Some((username, full_name, role, email, phone, password_hash, registered_at)) = row
        else {
            return Ok(None);
        };
        Ok(Some(UserAccount {
            username,
            full_name,
            role: parse_column::<Role>(&role)?,
            email,
            phone,
            password_hash,
            registered_at: parse_ts(&registered_at)?,
        }))
    }

    fn insert_user(&self, user: &UserAccount) -> PosResult<()> {
        let conn = self.db.conn.lock()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO users (
                username, full_name, role, email, phone, password_hash, registered_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                user.username,
                user.full_name,
                user.role.as_str(),
                user.email,
                user.phone,
                user.password_hash,
                user.registered_at.to_rfc3339(),
            ],
        )?;
        if inserted == 0 {
            return Err(PosError::validation(format!(
                "Username {} is already taken",
                user.username
            )));
        }
        info!(username = %user.username, role = %user.role, "User registered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn store() -> SqliteStore {
        SqliteStore::open_in_memory().expect("in-memory store")
    }

    fn sample_order(id: &str, created_at: DateTime<Utc>) -> Order {
        let items = vec![
            OrderItem::new(1, "Classic Vanilla Bean", "Ice Cream Scoops", 3.5, 2),
            OrderItem::new(5, "Hot Fudge Sundae", "Sundaes", 7.5, 1),
        ];
        Order {
            id: id.into(),
            order_number: format!("ORD-{id}"),
            customer_name: Some("Ravi".into()),
            customer_phone: None,
            table_number: Some("4".into()),
            order_type: OrderType::DineIn,
            status: OrderStatus::Completed,
            items,
            subtotal: 14.5,
            discount_amount: 0.0,
            tax_amount: 0.0,
            total_amount: 14.5,
            payment_method: Some(PaymentMethod::Upi),
            payment_status: PaymentStatus::Paid,
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn menu_crud() {
        let store = store();
        let mut item = store
            .insert_menu_item(&MenuItemInput {
                name: "Mango Sorbet".into(),
                category: "Ice Cream Scoops".into(),
                description: "Dairy free".into(),
                price: 4.25,
                in_stock: Some(false),
            })
            .unwrap();
        assert!(!item.in_stock);
        item.in_stock = true;
        store.update_menu_item(&item).unwrap();
        assert_eq!(store.get_menu_item(item.id).unwrap(), Some(item.clone()));
        assert!(store.delete_menu_item(item.id).unwrap());
        assert!(matches!(
            store.update_menu_item(&item),
            Err(PosError::NotFound { .. })
        ));
    }

    #[test]
    fn order_roundtrip_and_upsert_replaces_lines() {
        let store = store();
        let now = Utc::now();
        let mut order = sample_order("o1", now);
        store.save_order(&order).unwrap();
        assert_eq!(store.get_order("o1").unwrap(), Some(order.clone()));

        order.items.truncate(1);
        order.status = OrderStatus::Completed;
        store.save_order(&order).unwrap();
        let loaded = store.get_order("o1").unwrap().unwrap();
        assert_eq!(loaded.items.len(), 1);
        assert_eq!(loaded.items[0].total_price(), 7.0);
    }

    #[test]
    fn orders_listed_newest_first() {
        let store = store();
        let now = Utc::now();
        store.save_order(&sample_order("old", now - Duration::hours(3))).unwrap();
        store.save_order(&sample_order("new", now)).unwrap();
        let ids: Vec<String> = store.list_orders().unwrap().into_iter().map(|o| o.id).collect();
        assert_eq!(ids, vec!["new", "old"]);
    }

    #[test]
    fn advance_order_roundtrip() {
        let store = store();
        let now = Utc::now();
        let order = AdvanceOrder {
            id: "adv-1".into(),
            customer_name: "Meera".into(),
            customer_phone: "555-0110".into(),
            customer_email: Some("meera@example.com".into()),
            delivery_date: NaiveDate::from_ymd_opt(2026, 10, 25).unwrap(),
            delivery_time: Some("16:30".into()),
            items: vec![OrderItem::new(9, "Party Tub", "Family Packs", 40.0, 2)],
            total_amount: 80.0,
            advance_amount: 30.0,
            remaining_amount: 50.0,
            status: AdvanceStatus::Confirmed,
            special_instructions: Some("No nuts".into()),
            created_at: now,
            updated_at: now,
        };
        store.save_advance_order(&order).unwrap();
        assert_eq!(store.get_advance_order("adv-1").unwrap(), Some(order));
        assert_eq!(store.list_advance_orders().unwrap().len(), 1);
    }

    #[test]
    fn held_order_take_is_atomic() {
        let store = store();
        let held = HeldOrder {
            id: "ORD-1700000000000-ABCDE".into(),
            items: vec![OrderItem::new(2, "Chocolate Fudge", "Ice Cream Scoops", 3.75, 3)],
            customer_name: None,
            customer_phone: None,
            table_number: Some("7".into()),
            discount_amount: 1.0,
            total: 10.25,
            held_at: Utc::now(),
            reason: Some("Customer stepped out".into()),
            order_id: None,
        };
        store.insert_held_order(&held).unwrap();
        assert!(store.insert_held_order(&held).is_err());
        assert_eq!(store.take_held_order(&held.id).unwrap(), Some(held.clone()));
        assert_eq!(store.take_held_order(&held.id).unwrap(), None);
    }

    #[test]
    fn notification_keys_and_order_numbers() {
        let store = store();
        assert!(store.mark_notification_read("held-order-x").unwrap());
        assert!(!store.mark_notification_read("held-order-x").unwrap());
        assert!(store.read_notification_keys().unwrap().contains("held-order-x"));

        let day = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        assert_eq!(store.next_order_number(day).unwrap(), "ORD-20261018-0001");
        assert_eq!(store.next_order_number(day).unwrap(), "ORD-20261018-0002");
    }

    #[test]
    fn users_are_unique() {
        let store = store();
        let user = UserAccount {
            username: "meera".into(),
            full_name: "Meera K".into(),
            role: Role::Staff,
            email: None,
            phone: Some("555-0199".into()),
            password_hash: "$2b$04$hash".into(),
            registered_at: Utc::now(),
        };
        store.insert_user(&user).unwrap();
        assert!(matches!(
            store.insert_user(&user),
            Err(PosError::Validation(_))
        ));
        assert_eq!(store.get_user("meera").unwrap(), Some(user));
        assert_eq!(store.get_user("nobody").unwrap(), None);
    }
}
