//! Dashboard snapshot and its periodic refresh.
//!
//! The refresh loop recomputes [`DashboardStats`] on a fixed interval and
//! hands each snapshot to a sink (the desktop shell emits it to the
//! frontend). Clearing the running flag stops the loop after its current
//! sleep; starting again bumps a generation counter so a loop that is still
//! sleeping from before the stop exits instead of running alongside.

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::PosResult;
use crate::models::{AdvanceStatus, Order};
use crate::notifications;
use crate::orders::DEFAULT_RECENT_LIMIT;
use crate::revenue::{self, Window};
use crate::store::PosStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub todays_sales: f64,
    pub weekly_sales: f64,
    pub monthly_sales: f64,
    pub orders_today: usize,
    pub orders_week: usize,
    pub orders_month: usize,
    pub total_orders: usize,
    pub held_count: usize,
    pub pending_advances: usize,
    pub unread_notifications: usize,
    pub recent_orders: Vec<Order>,
    pub computed_at: DateTime<Utc>,
}

pub fn compute_stats<Tz: TimeZone>(
    store: &dyn PosStore,
    now: &DateTime<Tz>,
) -> PosResult<DashboardStats> {
    let orders = store.list_orders()?;
    let advances = store.list_advance_orders()?;
    let held = store.list_held_orders()?;
    let read = store.read_notification_keys()?;

    let today = Window::today(now);
    let week = Window::week(now);
    let month = Window::month(now);

    let notes = notifications::build_notifications(&advances, &held, &read, now);
    let recent_orders = orders
        .iter()
        .filter(|o| o.counts_as_sale())
        .take(DEFAULT_RECENT_LIMIT)
        .cloned()
        .collect();

    Ok(DashboardStats {
        todays_sales: revenue::revenue(&orders, &advances, &today),
        weekly_sales: revenue::revenue(&orders, &advances, &week),
        monthly_sales: revenue::revenue(&orders, &advances, &month),
        orders_today: revenue::order_count(&orders, &advances, &today),
        orders_week: revenue::order_count(&orders, &advances, &week),
        orders_month: revenue::order_count(&orders, &advances, &month),
        total_orders: orders.len(),
        held_count: held.len(),
        pending_advances: advances
            .iter()
            .filter(|a| a.status == AdvanceStatus::Pending)
            .count(),
        unread_notifications: notifications::unread_count(&notes, &read),
        recent_orders,
        computed_at: now.with_timezone(&Utc),
    })
}

/// Running flag shared between the loop and whoever stops or restarts it.
#[derive(Debug, Clone, Default)]
pub struct RefreshState {
    pub is_running: Arc<AtomicBool>,
    generation: Arc<AtomicU64>,
}

impl RefreshState {
    /// Mark a new loop as the live one and return its generation.
    pub(crate) fn begin(&self) -> u64 {
        self.is_running.store(true, Ordering::SeqCst);
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, generation: u64) -> bool {
        self.is_running() && self.generation.load(Ordering::SeqCst) == generation
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.is_running.store(false, Ordering::SeqCst);
    }
}

/// Compute, publish, sleep; until the running flag is cleared or a newer
/// loop takes over. `generation` comes from [`RefreshState::begin`].
pub(crate) async fn refresh_loop<F>(
    store: Arc<dyn PosStore>,
    state: RefreshState,
    generation: u64,
    interval: Duration,
    sink: F,
) where
    F: Fn(DashboardStats) + Send + 'static,
{
    info!(
        generation,
        "Dashboard refresh loop started (interval: {}s)",
        interval.as_secs()
    );

    loop {
        if !state.is_current(generation) {
            break;
        }
        match compute_stats(store.as_ref(), &Local::now()) {
            Ok(stats) => {
                debug!(
                    todays_sales = stats.todays_sales,
                    orders_today = stats.orders_today,
                    "Dashboard stats refreshed"
                );
                sink(stats);
            }
            Err(e) => warn!("dashboard refresh failed: {e}"),
        }

        tokio::time::sleep(interval).await;
    }
    info!(generation, "Dashboard refresh loop stopped");
}

/// Start a loop on the current tokio runtime.
pub fn start_refresh_loop<F>(
    store: Arc<dyn PosStore>,
    state: &RefreshState,
    interval: Duration,
    sink: F,
) -> tokio::task::JoinHandle<()>
where
    F: Fn(DashboardStats) + Send + 'static,
{
    let generation = state.begin();
    tokio::spawn(refresh_loop(store, state.clone(), generation, interval, sink))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json_store::JsonStore;
    use crate::models::{HeldOrder, OrderItem, OrderStatus, OrderType, PaymentMethod, PaymentStatus};
    use chrono::Duration as ChronoDuration;

    fn order(id: &str, total: f64, created_at: DateTime<Utc>) -> Order {
        Order {
            id: id.into(),
            order_number: format!("ORD-{id}"),
            customer_name: None,
            customer_phone: None,
            table_number: None,
            order_type: OrderType::Takeaway,
            status: OrderStatus::Completed,
            items: vec![OrderItem::new(1, "Cherry", "Toppings", total, 1)],
            subtotal: total,
            discount_amount: 0.0,
            tax_amount: 0.0,
            total_amount: total,
            payment_method: Some(PaymentMethod::Cash),
            payment_status: PaymentStatus::Paid,
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn stats_cover_each_window() {
        let store = JsonStore::in_memory();
        let now = Utc::now();
        store.save_order(&order("a", 10.0, now - ChronoDuration::seconds(1))).unwrap();
        store.save_order(&order("b", 20.0, now - ChronoDuration::days(3))).unwrap();
        store.save_order(&order("c", 40.0, now - ChronoDuration::days(20))).unwrap();
        store
            .insert_held_order(&HeldOrder {
                id: "h1".into(),
                items: vec![],
                customer_name: None,
                customer_phone: None,
                table_number: None,
                discount_amount: 0.0,
                total: 5.0,
                held_at: now,
                reason: None,
                order_id: None,
            })
            .unwrap();

        let stats = compute_stats(&store, &now).unwrap();
        assert_eq!(stats.todays_sales, 10.0);
        assert_eq!(stats.weekly_sales, 30.0);
        assert_eq!(stats.monthly_sales, 70.0);
        assert_eq!(stats.orders_month, 3);
        assert_eq!(stats.total_orders, 3);
        assert_eq!(stats.held_count, 1);
        assert_eq!(stats.unread_notifications, 1);
        assert_eq!(stats.recent_orders[0].id, "a");
    }

    #[tokio::test]
    async fn refresh_loop_publishes_and_stops() {
        let store: Arc<dyn PosStore> = Arc::new(JsonStore::in_memory());
        let state = RefreshState::default();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let handle = start_refresh_loop(store, &state, Duration::from_millis(20), move |stats| {
            let _ = tx.send(stats);
        });

        let first = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("stats within timeout")
            .expect("channel open");
        assert_eq!(first.total_orders, 0);
        assert!(state.is_running());

        state.stop();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("loop exits after stop")
            .expect("task not panicked");
    }

    #[tokio::test]
    async fn restart_replaces_sleeping_loop() {
        let store: Arc<dyn PosStore> = Arc::new(JsonStore::in_memory());
        let state = RefreshState::default();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let old = start_refresh_loop(store.clone(), &state, Duration::from_millis(200), {
            let tx = tx.clone();
            move |_| {
                let _ = tx.send("old");
            }
        });
        assert_eq!(rx.recv().await, Some("old"));

        // Stop and restart while the first loop is still asleep.
        state.stop();
        assert!(!state.is_running());
        let new = start_refresh_loop(store, &state, Duration::from_millis(20), move |_| {
            let _ = tx.send("new");
        });
        assert!(state.is_running());

        tokio::time::timeout(Duration::from_secs(2), old)
            .await
            .expect("old loop exits after restart")
            .expect("task not panicked");
        let mut seen = Vec::new();
        while let Ok(Some(tag)) =
            tokio::time::timeout(Duration::from_millis(100), rx.recv()).await
        {
            seen.push(tag);
            if seen.len() >= 3 {
                break;
            }
        }
        assert!(!seen.is_empty());
        assert!(seen.iter().all(|tag| *tag == "new"));

        state.stop();
        tokio::time::timeout(Duration::from_secs(2), new)
            .await
            .expect("new loop exits after stop")
            .expect("task not panicked");
    }
}
