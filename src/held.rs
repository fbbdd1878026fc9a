//! Hold / recall of parked carts.
//!
//! A held order is a full snapshot of the cart (lines, customer, table,
//! discount). Parking an existing order also moves that order to `held`;
//! recalling it moves it back to `pending`, deleting it cancels it. Recall
//! takes the record out of the store in one step, so it succeeds at most
//! once per id.

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::cart::Cart;
use crate::error::{PosError, PosResult};
use crate::models::{HeldOrder, OrderStatus};
use crate::orders;
use crate::store::PosStore;

/// `ORD-<epoch millis>-<5 uppercase chars>`
pub fn generate_held_id(now: DateTime<Utc>) -> String {
    let suffix: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(5)
        .collect::<String>()
        .to_ascii_uppercase();
    format!("ORD-{}-{suffix}", now.timestamp_millis())
}

/// Move a referenced order to `status`, logging instead of failing when the
/// order is gone or the transition does not apply.
fn move_referenced_order(
    store: &dyn PosStore,
    order_id: &str,
    status: OrderStatus,
    now: DateTime<Utc>,
) -> PosResult<()> {
    match store.get_order(order_id)? {
        Some(order) if order.status.can_transition_to(status) => {
            orders::update_order_status(store, order_id, status, now)?;
        }
        Some(order) => {
            warn!(order_id, from = %order.status, to = %status, "referenced order not moved");
        }
        None => warn!(order_id, "referenced order not found"),
    }
    Ok(())
}

/// Park the active cart and clear it.
pub fn hold_cart(
    store: &dyn PosStore,
    cart: &mut Cart,
    reason: Option<String>,
    now: DateTime<Utc>,
) -> PosResult<HeldOrder> {
    if cart.is_empty() {
        return Err(PosError::EmptyCart);
    }
    let held = cart.to_held(generate_held_id(now), reason, now);
    store.insert_held_order(&held)?;
    if let Some(order_id) = &held.order_id {
        move_referenced_order(store, order_id, OrderStatus::Held, now)?;
    }
    cart.clear();
    info!(held_id = %held.id, items = held.items.len(), total = held.total, "Cart held");
    Ok(held)
}

/// Park an existing, not yet finished order.
pub fn hold_order(
    store: &dyn PosStore,
    order_id: &str,
    reason: Option<String>,
    tax_rate: f64,
    now: DateTime<Utc>,
) -> PosResult<HeldOrder> {
    let order = orders::get_order(store, order_id)?;
    order.status.transition_to(OrderStatus::Held)?;

    let mut cart = Cart::new(tax_rate).with_order(order.id.clone());
    for line in &order.items {
        cart.push_line(line.clone());
    }
    cart.set_customer(
        order.customer_name.clone(),
        order.customer_phone.clone(),
        order.table_number.clone(),
    );
    if order.discount_amount > 0.0 {
        cart.set_discount(order.discount_amount)?;
    }

    let held = cart.to_held(generate_held_id(now), reason, now);
    store.insert_held_order(&held)?;
    orders::update_order_status(store, order_id, OrderStatus::Held, now)?;
    info!(held_id = %held.id, order_id, "Order held");
    Ok(held)
}

/// Take a held order out of the store and rebuild its cart.
pub fn recall(
    store: &dyn PosStore,
    held_id: &str,
    tax_rate: f64,
    now: DateTime<Utc>,
) -> PosResult<Cart> {
    let mut held = store
        .take_held_order(held_id)?
        .ok_or_else(|| PosError::not_found("held order", held_id))?;

    if let Some(order_id) = held.order_id.clone() {
        match store.get_order(&order_id)? {
            Some(order) if order.status == OrderStatus::Held => {
                orders::update_order_status(store, &order_id, OrderStatus::Pending, now)?;
            }
            Some(order) => {
                warn!(order_id = %order_id, status = %order.status, "recalled order is not held, detaching");
                held.order_id = None;
            }
            None => {
                warn!(order_id = %order_id, "recalled order no longer exists, detaching");
                held.order_id = None;
            }
        }
    }

    info!(held_id, items = held.items.len(), "Held order recalled");
    Ok(Cart::from_held(held, tax_rate))
}

/// Discard a held order. A referenced order is cancelled.
pub fn delete_held(store: &dyn PosStore, held_id: &str, now: DateTime<Utc>) -> PosResult<()> {
    let held = store
        .take_held_order(held_id)?
        .ok_or_else(|| PosError::not_found("held order", held_id))?;
    if let Some(order_id) = &held.order_id {
        move_referenced_order(store, order_id, OrderStatus::Cancelled, now)?;
    }
    info!(held_id, "Held order deleted");
    Ok(())
}

/// Held orders, newest first.
pub fn list_held(store: &dyn PosStore) -> PosResult<Vec<HeldOrder>> {
    store.list_held_orders()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json_store::JsonStore;
    use crate::models::{MenuItem, Order, OrderItem, OrderType, PaymentStatus};
    use chrono::Duration;

    fn item(id: i64, price: f64) -> MenuItem {
        MenuItem {
            id,
            name: format!("Sundae {id}"),
            category: "Sundaes".into(),
            description: String::new(),
            price,
            in_stock: true,
        }
    }

    fn pending_order(store: &JsonStore) -> Order {
        let now = Utc::now();
        let order = Order {
            id: "order-1".into(),
            order_number: "ORD-20261018-0001".into(),
            customer_name: Some("Kiran".into()),
            customer_phone: Some("555-0123".into()),
            table_number: Some("5".into()),
            order_type: OrderType::DineIn,
            status: OrderStatus::Pending,
            items: vec![OrderItem::new(3, "Banana Split", "Sundaes", 9.5, 2)],
            subtotal: 19.0,
            discount_amount: 2.0,
            tax_amount: 0.0,
            total_amount: 17.0,
            payment_method: None,
            payment_status: PaymentStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        store.save_order(&order).unwrap();
        order
    }

    #[test]
    fn held_id_format() {
        let id = generate_held_id(Utc::now());
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ORD");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 5);
        assert_eq!(parts[2], parts[2].to_ascii_uppercase());
    }

    #[test]
    fn hold_requires_items() {
        let store = JsonStore::in_memory();
        let mut cart = Cart::new(0.0);
        assert!(matches!(
            hold_cart(&store, &mut cart, None, Utc::now()),
            Err(PosError::EmptyCart)
        ));
    }

    #[test]
    fn hold_then_recall_restores_cart() {
        let store = JsonStore::in_memory();
        let mut cart = Cart::new(5.0);
        cart.add_item(&item(1, 8.5)).unwrap();
        cart.add_item(&item(1, 8.5)).unwrap();
        cart.set_customer(Some("Asha".into()), Some("555".into()), Some("9".into()));
        cart.set_discount(2.0).unwrap();
        let before = cart.summary();

        let held = hold_cart(&store, &mut cart, Some("waiting".into()), Utc::now()).unwrap();
        assert!(cart.is_empty());
        assert_eq!(list_held(&store).unwrap().len(), 1);

        let recalled = recall(&store, &held.id, 5.0, Utc::now()).unwrap();
        assert_eq!(recalled.summary(), before);
        assert!(list_held(&store).unwrap().is_empty());
        assert!(matches!(
            recall(&store, &held.id, 5.0, Utc::now()),
            Err(PosError::NotFound { .. })
        ));
    }

    #[test]
    fn held_list_is_newest_first() {
        let store = JsonStore::in_memory();
        let now = Utc::now();
        for offset in [10, 0, 5] {
            let mut cart = Cart::new(0.0);
            cart.add_item(&item(offset, 1.0)).unwrap();
            hold_cart(&store, &mut cart, None, now - Duration::minutes(offset)).unwrap();
        }
        let held = list_held(&store).unwrap();
        assert!(held.windows(2).all(|w| w[0].held_at >= w[1].held_at));
    }

    #[test]
    fn existing_order_hold_recall_and_pay() {
        let store = JsonStore::in_memory();
        let order = pending_order(&store);

        let held = hold_order(&store, &order.id, None, 0.0, Utc::now()).unwrap();
        assert_eq!(held.order_id.as_deref(), Some("order-1"));
        assert_eq!(held.total, 17.0);
        assert_eq!(store.get_order("order-1").unwrap().unwrap().status, OrderStatus::Held);

        let mut cart = recall(&store, &held.id, 0.0, Utc::now()).unwrap();
        assert_eq!(cart.order_id(), Some("order-1"));
        assert_eq!(store.get_order("order-1").unwrap().unwrap().status, OrderStatus::Pending);

        let paid = orders::complete_payment(
            &store,
            &mut cart,
            Some(crate::models::PaymentMethod::Cash),
            Some(OrderType::DineIn),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(paid.id, "order-1");
        assert_eq!(paid.status, OrderStatus::Completed);
        assert_eq!(store.list_orders().unwrap().len(), 1);
    }

    #[test]
    fn deleting_held_order_cancels_reference() {
        let store = JsonStore::in_memory();
        let order = pending_order(&store);
        let held = hold_order(&store, &order.id, None, 0.0, Utc::now()).unwrap();
        delete_held(&store, &held.id, Utc::now()).unwrap();
        assert_eq!(
            store.get_order("order-1").unwrap().unwrap().status,
            OrderStatus::Cancelled
        );
        assert!(delete_held(&store, &held.id, Utc::now()).is_err());
    }

    #[test]
    fn completed_order_cannot_be_held() {
        let store = JsonStore::in_memory();
        let mut order = pending_order(&store);
        order.status = OrderStatus::Completed;
        store.save_order(&order).unwrap();
        assert!(matches!(
            hold_order(&store, &order.id, None, 0.0, Utc::now()),
            Err(PosError::InvalidTransition { .. })
        ));
        assert!(list_held(&store).unwrap().is_empty());
    }
}
