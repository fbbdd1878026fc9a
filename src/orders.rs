//! Order records and payment completion.
//!
//! Completing a payment turns the active cart into a persisted `Order`
//! (status `completed`, payment `paid`). A cart recalled from a held order
//! that referenced an existing order completes that order in place. Split
//! payments are a display-only remainder; nothing partial is stored.

use chrono::{DateTime, Local, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::cart::Cart;
use crate::error::{PosError, PosResult};
use crate::models::{
    round_money, Order, OrderStatus, OrderType, PaymentMethod, PaymentStatus,
};
use crate::store::PosStore;

pub const DEFAULT_RECENT_LIMIT: usize = 10;

/// Filter for the order list view. Empty fields match everything.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFilter {
    #[serde(default)]
    pub order_type: Option<OrderType>,
    #[serde(default)]
    pub status: Option<OrderStatus>,
}

impl OrderFilter {
    fn matches(&self, order: &Order) -> bool {
        self.order_type.map_or(true, |t| order.order_type == t)
            && self.status.map_or(true, |s| order.status == s)
    }
}

/// Persist the cart as a paid order and clear it.
///
/// Validation happens before anything is written: the cart must have lines
/// and both a payment method and an order type must be chosen.
pub fn complete_payment(
    store: &dyn PosStore,
    cart: &mut Cart,
    payment_method: Option<PaymentMethod>,
    order_type: Option<OrderType>,
    now: DateTime<Utc>,
) -> PosResult<Order> {
    if cart.is_empty() {
        return Err(PosError::EmptyCart);
    }
    let payment_method =
        payment_method.ok_or_else(|| PosError::validation("Please select a payment method"))?;
    let order_type =
        order_type.ok_or_else(|| PosError::validation("Please select an order type"))?;

    let order = match cart.order_id() {
        Some(order_id) => {
            let mut order = store
                .get_order(order_id)?
                .ok_or_else(|| PosError::not_found("order", order_id))?;
            order.status = order.status.transition_to(OrderStatus::Completed)?;
            order.payment_status = order.payment_status.transition_to(PaymentStatus::Paid)?;
            fill_from_cart(&mut order, cart);
            order.order_type = order_type;
            order.payment_method = Some(payment_method);
            order.updated_at = now;
            order
        }
        None => {
            let order_number = store.next_order_number(now.with_timezone(&Local).date_naive())?;
            let mut order = Order {
                id: Uuid::new_v4().to_string(),
                order_number,
                customer_name: None,
                customer_phone: None,
                table_number: None,
                order_type,
                status: OrderStatus::Completed,
                items: Vec::new(),
                subtotal: 0.0,
                discount_amount: 0.0,
                tax_amount: 0.0,
                total_amount: 0.0,
                payment_method: Some(payment_method),
                payment_status: PaymentStatus::Paid,
                created_at: now,
                updated_at: now,
            };
            fill_from_cart(&mut order, cart);
            order
        }
    };

    store.save_order(&order)?;
    cart.clear();
    info!(
        order_id = %order.id,
        order_number = %order.order_number,
        total = order.total_amount,
        method = %payment_method,
        "Payment completed"
    );
    Ok(order)
}

fn fill_from_cart(order: &mut Order, cart: &Cart) {
    order.items = cart.items().to_vec();
    order.customer_name = cart.customer_name.clone();
    order.customer_phone = cart.customer_phone.clone();
    order.table_number = cart.table_number.clone();
    order.subtotal = cart.subtotal();
    order.discount_amount = cart.discount_amount();
    order.tax_amount = cart.tax_amount();
    order.total_amount = cart.total();
}

/// Amount still due after a split payment of `split_amount`.
pub fn split_remaining(total: f64, split_amount: f64) -> f64 {
    round_money((total - split_amount).max(0.0))
}

/// Orders matching `filter`, newest first.
pub fn list_orders(store: &dyn PosStore, filter: &OrderFilter) -> PosResult<Vec<Order>> {
    Ok(store
        .list_orders()?
        .into_iter()
        .filter(|o| filter.matches(o))
        .collect())
}

/// The latest `limit` orders that count as sales.
pub fn recent_orders(store: &dyn PosStore, limit: usize) -> PosResult<Vec<Order>> {
    Ok(store
        .list_orders()?
        .into_iter()
        .filter(Order::counts_as_sale)
        .take(limit)
        .collect())
}

pub fn get_order(store: &dyn PosStore, id: &str) -> PosResult<Order> {
    store
        .get_order(id)?
        .ok_or_else(|| PosError::not_found("order", id))
}

/// Move an order to `status` through the order state machine.
pub fn update_order_status(
    store: &dyn PosStore,
    id: &str,
    status: OrderStatus,
    now: DateTime<Utc>,
) -> PosResult<Order> {
    let mut order = get_order(store, id)?;
    let from = order.status;
    order.status = order.status.transition_to(status)?;
    order.updated_at = now;
    store.save_order(&order)?;
    info!(order_id = %id, from = %from, to = %status, "Order status updated");
    Ok(order)
}

/// Mark a paid order as refunded.
pub fn refund_order(store: &dyn PosStore, id: &str, now: DateTime<Utc>) -> PosResult<Order> {
    let mut order = get_order(store, id)?;
    order.payment_status = order.payment_status.transition_to(PaymentStatus::Refunded)?;
    order.updated_at = now;
    store.save_order(&order)?;
    info!(order_id = %id, amount = order.total_amount, "Order refunded");
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json_store::JsonStore;
    use crate::models::MenuItem;

    fn scoop(id: i64, price: f64) -> MenuItem {
        MenuItem {
            id,
            name: format!("Scoop {id}"),
            category: "Ice Cream Scoops".into(),
            description: String::new(),
            price,
            in_stock: true,
        }
    }

    fn filled_cart() -> Cart {
        let mut cart = Cart::new(0.0);
        cart.add_item(&scoop(1, 3.5)).unwrap();
        cart.add_item(&scoop(1, 3.5)).unwrap();
        cart.add_item(&scoop(2, 8.5)).unwrap();
        cart.set_customer(Some("Ravi".into()), None, Some("3".into()));
        cart
    }

    #[test]
    fn completes_payment_and_clears_cart() {
        let store = JsonStore::in_memory();
        let mut cart = filled_cart();
        let order = complete_payment(
            &store,
            &mut cart,
            Some(PaymentMethod::Cash),
            Some(OrderType::DineIn),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(order.status, OrderStatus::Completed);
        assert_eq!(order.payment_status, PaymentStatus::Paid);
        assert_eq!(order.total_amount, 15.5);
        assert_eq!(order.table_number.as_deref(), Some("3"));
        assert!(order.order_number.starts_with("ORD-"));
        assert!(cart.is_empty());
        assert!(cart.customer_name.is_none());
        assert_eq!(store.list_orders().unwrap().len(), 1);
    }

    #[test]
    fn payment_requires_cart_method_and_type() {
        let store = JsonStore::in_memory();
        let mut empty = Cart::new(0.0);
        assert!(matches!(
            complete_payment(&store, &mut empty, Some(PaymentMethod::Card), Some(OrderType::Takeaway), Utc::now()),
            Err(PosError::EmptyCart)
        ));

        let mut cart = filled_cart();
        assert!(complete_payment(&store, &mut cart, None, Some(OrderType::Takeaway), Utc::now()).is_err());
        assert!(complete_payment(&store, &mut cart, Some(PaymentMethod::Upi), None, Utc::now()).is_err());
        assert!(!cart.is_empty());
        assert!(store.list_orders().unwrap().is_empty());
    }

    #[test]
    fn split_remaining_never_negative() {
        assert_eq!(split_remaining(15.5, 10.0), 5.5);
        assert_eq!(split_remaining(15.5, 20.0), 0.0);
    }

    #[test]
    fn status_updates_follow_state_machine() {
        let store = JsonStore::in_memory();
        let mut cart = filled_cart();
        let order = complete_payment(
            &store,
            &mut cart,
            Some(PaymentMethod::Cash),
            Some(OrderType::Takeaway),
            Utc::now(),
        )
        .unwrap();
        let err = update_order_status(&store, &order.id, OrderStatus::Pending, Utc::now())
            .expect_err("completed is terminal");
        assert!(matches!(err, PosError::InvalidTransition { .. }));
        assert!(matches!(
            update_order_status(&store, "missing", OrderStatus::Ready, Utc::now()),
            Err(PosError::NotFound { .. })
        ));
    }

    #[test]
    fn refund_only_once() {
        let store = JsonStore::in_memory();
        let mut cart = filled_cart();
        let order = complete_payment(
            &store,
            &mut cart,
            Some(PaymentMethod::Card),
            Some(OrderType::Delivery),
            Utc::now(),
        )
        .unwrap();
        let refunded = refund_order(&store, &order.id, Utc::now()).unwrap();
        assert_eq!(refunded.payment_status, PaymentStatus::Refunded);
        assert!(refund_order(&store, &order.id, Utc::now()).is_err());
    }

    #[test]
    fn filter_and_recent() {
        let store = JsonStore::in_memory();
        for order_type in [OrderType::DineIn, OrderType::Takeaway, OrderType::DineIn] {
            let mut cart = filled_cart();
            complete_payment(
                &store,
                &mut cart,
                Some(PaymentMethod::Cash),
                Some(order_type),
                Utc::now(),
            )
            .unwrap();
        }
        let dine_in = list_orders(
            &store,
            &OrderFilter {
                order_type: Some(OrderType::DineIn),
                status: None,
            },
        )
        .unwrap();
        assert_eq!(dine_in.len(), 2);
        assert_eq!(list_orders(&store, &OrderFilter::default()).unwrap().len(), 3);
        assert_eq!(recent_orders(&store, 2).unwrap().len(), 2);
    }
}
