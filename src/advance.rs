//! Advance (pre-)orders: booking and lifecycle.
//!
//! A booking snapshots menu prices at creation time. Status only moves
//! forward (`pending -> confirmed -> ready -> delivered`, skips allowed);
//! setting the current status again is a no-op. Revenue recognition lives
//! on [`AdvanceOrder::recognized_revenue`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{PosError, PosResult};
use crate::models::{
    check_line_quantity, items_subtotal, round_money, AdvanceOrder, AdvanceStatus, OrderItem,
};
use crate::store::PosStore;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingLine {
    pub menu_item_id: i64,
    #[serde(default = "one")]
    pub quantity: u32,
}

fn one() -> u32 {
    1
}

/// Form fields of a new advance order.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceBooking {
    pub customer_name: String,
    pub customer_phone: String,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub delivery_date: Option<NaiveDate>,
    #[serde(default)]
    pub delivery_time: Option<String>,
    #[serde(default)]
    pub items: Vec<BookingLine>,
    #[serde(default)]
    pub advance_amount: f64,
    #[serde(default)]
    pub special_instructions: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Resolve booking lines against the catalog, merging repeated items.
fn resolve_lines(store: &dyn PosStore, lines: &[BookingLine]) -> PosResult<Vec<OrderItem>> {
    let mut items: Vec<OrderItem> = Vec::new();
    for line in lines.iter().filter(|l| l.quantity > 0) {
        check_line_quantity(line.quantity)?;
        if let Some(existing) = items.iter_mut().find(|i| i.menu_item_id == line.menu_item_id) {
            let merged = check_line_quantity(existing.quantity().saturating_add(line.quantity))?;
            existing.set_quantity(merged);
            continue;
        }
        let menu_item = store
            .get_menu_item(line.menu_item_id)?
            .ok_or_else(|| PosError::not_found("menu item", line.menu_item_id))?;
        items.push(OrderItem::from_menu_item(&menu_item, line.quantity));
    }
    Ok(items)
}

/// Validate and store a new booking with status `pending`.
pub fn create_advance_order(
    store: &dyn PosStore,
    booking: AdvanceBooking,
    now: DateTime<Utc>,
) -> PosResult<AdvanceOrder> {
    let customer_name = booking.customer_name.trim().to_string();
    let customer_phone = booking.customer_phone.trim().to_string();
    let delivery_date = match booking.delivery_date {
        Some(date) if !customer_name.is_empty() && !customer_phone.is_empty() => date,
        _ => return Err(PosError::validation("Please fill in all required fields")),
    };

    let items = resolve_lines(store, &booking.items)?;
    if items.is_empty() {
        return Err(PosError::validation("Please add items to the advance order"));
    }

    let total_amount = items_subtotal(&items);
    let advance_amount = round_money(booking.advance_amount);
    if !advance_amount.is_finite() || advance_amount < 0.0 || advance_amount > total_amount {
        return Err(PosError::validation(format!(
            "Advance amount must be between 0 and {total_amount:.2}"
        )));
    }

    let order = AdvanceOrder {
        id: Uuid::new_v4().to_string(),
        customer_name,
        customer_phone,
        customer_email: non_blank(booking.customer_email),
        delivery_date,
        delivery_time: non_blank(booking.delivery_time),
        items,
        total_amount,
        advance_amount,
        remaining_amount: round_money(total_amount - advance_amount),
        status: AdvanceStatus::Pending,
        special_instructions: non_blank(booking.special_instructions),
        created_at: now,
        updated_at: now,
    };
    store.save_advance_order(&order)?;
    info!(
        advance_id = %order.id,
        delivery = %order.delivery_date,
        total = order.total_amount,
        advance = order.advance_amount,
        "Advance order created"
    );
    Ok(order)
}

/// Advance orders ordered by delivery date.
pub fn list_advance_orders(store: &dyn PosStore) -> PosResult<Vec<AdvanceOrder>> {
    store.list_advance_orders()
}

pub fn get_advance_order(store: &dyn PosStore, id: &str) -> PosResult<AdvanceOrder> {
    store
        .get_advance_order(id)?
        .ok_or_else(|| PosError::not_found("advance order", id))
}

/// Move an advance order to `status`. The current status is accepted and
/// returns the order unchanged.
pub fn set_advance_status(
    store: &dyn PosStore,
    id: &str,
    status: AdvanceStatus,
    now: DateTime<Utc>,
) -> PosResult<AdvanceOrder> {
    let mut order = get_advance_order(store, id)?;
    if order.status == status {
        debug!(advance_id = %id, status = %status, "Advance status unchanged");
        return Ok(order);
    }
    let from = order.status;
    order.status = order.status.transition_to(status)?;
    order.updated_at = now;
    store.save_advance_order(&order)?;
    info!(advance_id = %id, from = %from, to = %status, "Advance order status updated");
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json_store::JsonStore;
    use crate::models::MenuItemInput;

    fn store_with_menu() -> JsonStore {
        let store = JsonStore::in_memory();
        for (name, price) in [("Party Tub", 40.0), ("Waffle Cone", 2.5)] {
            store
                .insert_menu_item(&MenuItemInput {
                    name: name.into(),
                    category: "Family Packs".into(),
                    description: String::new(),
                    price,
                    in_stock: None,
                })
                .unwrap();
        }
        store
    }

    fn booking(advance_amount: f64) -> AdvanceBooking {
        AdvanceBooking {
            customer_name: "Meera".into(),
            customer_phone: "555-0110".into(),
            delivery_date: NaiveDate::from_ymd_opt(2026, 10, 25),
            items: vec![
                BookingLine { menu_item_id: 1, quantity: 1 },
                BookingLine { menu_item_id: 2, quantity: 4 },
            ],
            advance_amount,
            ..Default::default()
        }
    }

    #[test]
    fn booking_computes_remaining() {
        let store = store_with_menu();
        let order = create_advance_order(&store, booking(20.0), Utc::now()).unwrap();
        assert_eq!(order.total_amount, 50.0);
        assert_eq!(order.remaining_amount, 30.0);
        assert_eq!(order.status, AdvanceStatus::Pending);
    }

    #[test]
    fn booking_validation() {
        let store = store_with_menu();
        let mut missing_phone = booking(0.0);
        missing_phone.customer_phone = " ".into();
        assert!(matches!(
            create_advance_order(&store, missing_phone, Utc::now()),
            Err(PosError::Validation(_))
        ));

        let mut no_items = booking(0.0);
        no_items.items.clear();
        assert!(create_advance_order(&store, no_items, Utc::now()).is_err());

        assert!(create_advance_order(&store, booking(51.0), Utc::now()).is_err());
        assert!(create_advance_order(&store, booking(-1.0), Utc::now()).is_err());
        assert!(store.list_advance_orders().unwrap().is_empty());
    }

    #[test]
    fn booking_line_quantity_is_capped() {
        let store = store_with_menu();
        let mut huge = booking(0.0);
        huge.items = vec![BookingLine { menu_item_id: 2, quantity: u32::MAX }];
        assert!(matches!(
            create_advance_order(&store, huge, Utc::now()),
            Err(PosError::Validation(_))
        ));

        let mut merged = booking(0.0);
        merged.items = vec![
            BookingLine { menu_item_id: 2, quantity: 9000 },
            BookingLine { menu_item_id: 2, quantity: 1000 },
        ];
        assert!(matches!(
            create_advance_order(&store, merged, Utc::now()),
            Err(PosError::Validation(_))
        ));
        assert!(store.list_advance_orders().unwrap().is_empty());
    }

    #[test]
    fn status_moves_forward_only() {
        let store = store_with_menu();
        let order = create_advance_order(&store, booking(10.0), Utc::now()).unwrap();

        let confirmed = set_advance_status(&store, &order.id, AdvanceStatus::Confirmed, Utc::now())
            .unwrap();
        assert_eq!(confirmed.recognized_revenue(), 10.0);

        let same = set_advance_status(&store, &order.id, AdvanceStatus::Confirmed, Utc::now())
            .unwrap();
        assert_eq!(same.updated_at, confirmed.updated_at);

        let delivered = set_advance_status(&store, &order.id, AdvanceStatus::Delivered, Utc::now())
            .unwrap();
        assert_eq!(delivered.recognized_revenue(), 50.0);

        assert!(matches!(
            set_advance_status(&store, &order.id, AdvanceStatus::Confirmed, Utc::now()),
            Err(PosError::InvalidTransition { .. })
        ));
    }
}
