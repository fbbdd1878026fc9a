//! Notification view over advance bookings and held orders.
//!
//! Notifications are derived on every read; only the set of read keys
//! (`{type}-{id}`) is persisted. Marking read is idempotent.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

use crate::error::PosResult;
use crate::models::{AdvanceOrder, HeldOrder};
use crate::store::PosStore;

const WALK_IN_CUSTOMER: &str = "Walk-in Customer";
const NO_PHONE: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    AdvanceOrder,
    HeldOrder,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::AdvanceOrder => "advance-order",
            NotificationKind::HeldOrder => "held-order",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub total: f64,
    pub status: String,
    pub time: String,
    pub is_read: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_date: Option<chrono::NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
}

/// Read-set key of a notification.
pub fn notification_key(kind: NotificationKind, id: &str) -> String {
    format!("{}-{id}", kind.as_str())
}

impl Notification {
    pub fn key(&self) -> String {
        notification_key(self.kind, &self.id)
    }
}

/// "Today", "N days ahead" or "N days ago" relative to the local date.
pub fn delivery_label<Tz: TimeZone>(delivery: chrono::NaiveDate, now: &DateTime<Tz>) -> String {
    let days = (delivery - now.date_naive()).num_days();
    match days {
        0 => "Today".to_string(),
        d if d > 0 => format!("{d} days ahead"),
        d => format!("{} days ago", -d),
    }
}

/// "Held N min ago", floored, never negative.
pub fn held_label(held_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - held_at).num_minutes().max(0);
    format!("Held {minutes} min ago")
}

fn from_advance<Tz: TimeZone>(
    order: &AdvanceOrder,
    read: &BTreeSet<String>,
    now: &DateTime<Tz>,
) -> Notification {
    Notification {
        id: order.id.clone(),
        kind: NotificationKind::AdvanceOrder,
        title: "Advance Order Booking".to_string(),
        customer_name: order.customer_name.clone(),
        customer_phone: order.customer_phone.clone(),
        total: order.total_amount,
        status: order.status.to_string(),
        time: delivery_label(order.delivery_date, now),
        is_read: read.contains(&notification_key(NotificationKind::AdvanceOrder, &order.id)),
        delivery_date: Some(order.delivery_date),
        delivery_time: order.delivery_time.clone(),
        special_instructions: order.special_instructions.clone(),
        reason: None,
        order_id: None,
    }
}

fn from_held(held: &HeldOrder, read: &BTreeSet<String>, now: DateTime<Utc>) -> Notification {
    Notification {
        id: held.id.clone(),
        kind: NotificationKind::HeldOrder,
        title: "Order On Hold".to_string(),
        customer_name: held
            .customer_name
            .clone()
            .unwrap_or_else(|| WALK_IN_CUSTOMER.to_string()),
        customer_phone: held
            .customer_phone
            .clone()
            .unwrap_or_else(|| NO_PHONE.to_string()),
        total: held.total,
        status: "held".to_string(),
        time: held_label(held.held_at, now),
        is_read: read.contains(&notification_key(NotificationKind::HeldOrder, &held.id)),
        delivery_date: None,
        delivery_time: None,
        special_instructions: None,
        reason: held.reason.clone(),
        order_id: held.order_id.clone(),
    }
}

/// Advance notifications first, then held ones.
pub fn build_notifications<Tz: TimeZone>(
    advances: &[AdvanceOrder],
    held: &[HeldOrder],
    read: &BTreeSet<String>,
    now: &DateTime<Tz>,
) -> Vec<Notification> {
    let now_utc = now.with_timezone(&Utc);
    advances
        .iter()
        .map(|a| from_advance(a, read, now))
        .chain(held.iter().map(|h| from_held(h, read, now_utc)))
        .collect()
}

pub fn unread_count(notifications: &[Notification], read: &BTreeSet<String>) -> usize {
    notifications
        .iter()
        .filter(|n| !read.contains(&n.key()))
        .count()
}

/// Current notifications derived from the store.
pub fn list_notifications<Tz: TimeZone>(
    store: &dyn PosStore,
    now: &DateTime<Tz>,
) -> PosResult<Vec<Notification>> {
    let advances = store.list_advance_orders()?;
    let held = store.list_held_orders()?;
    let read = store.read_notification_keys()?;
    Ok(build_notifications(&advances, &held, &read, now))
}

pub fn count_unread<Tz: TimeZone>(store: &dyn PosStore, now: &DateTime<Tz>) -> PosResult<usize> {
    let read = store.read_notification_keys()?;
    let all = list_notifications(store, now)?;
    Ok(unread_count(&all, &read))
}

pub fn mark_read(store: &dyn PosStore, kind: NotificationKind, id: &str) -> PosResult<()> {
    let key = notification_key(kind, id);
    if store.mark_notification_read(&key)? {
        debug!(key = %key, "Notification marked read");
    }
    Ok(())
}
