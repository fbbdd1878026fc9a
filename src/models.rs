//! Domain model for the parlor POS.
//!
//! Field names serialize in camelCase and enum values in the lowercase /
//! kebab-case spelling the frontend already uses (`dine-in`, `held-order`).
//! Order, payment and advance-order statuses carry their own transition
//! tables; callers go through `transition_to` instead of assigning fields.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{PosError, PosResult};

/// Round a currency amount to cents.
pub fn round_money(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

macro_rules! string_enum {
    ($name:ident, $entity:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = PosError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($text => Ok($name::$variant),)+
                    other => Err(PosError::validation(format!(
                        "Unknown {}: {other}",
                        $entity
                    ))),
                }
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderType {
    DineIn,
    Takeaway,
    Delivery,
    AdvanceOrder,
}

string_enum!(OrderType, "order type", {
    DineIn => "dine-in",
    Takeaway => "takeaway",
    Delivery => "delivery",
    AdvanceOrder => "advance-order",
});

impl OrderType {
    /// Human label used in reports ("Dine in", "Advance order").
    pub fn label(&self) -> &'static str {
        match self {
            OrderType::DineIn => "Dine in",
            OrderType::Takeaway => "Takeaway",
            OrderType::Delivery => "Delivery",
            OrderType::AdvanceOrder => "Advance order",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Preparing,
    Ready,
    Completed,
    Cancelled,
    Held,
}

string_enum!(OrderStatus, "order status", {
    Pending => "pending",
    Preparing => "preparing",
    Ready => "ready",
    Completed => "completed",
    Cancelled => "cancelled",
    Held => "held",
});

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match self {
            Pending => matches!(next, Preparing | Ready | Completed | Cancelled | Held),
            Preparing => matches!(next, Ready | Completed | Cancelled | Held),
            Ready => matches!(next, Completed | Cancelled | Held),
            Held => matches!(next, Pending | Cancelled),
            Completed | Cancelled => false,
        }
    }

    pub fn transition_to(&self, next: OrderStatus) -> PosResult<OrderStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(PosError::InvalidTransition {
                entity: "order",
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Upi,
}

string_enum!(PaymentMethod, "payment method", {
    Cash => "cash",
    Card => "card",
    Upi => "upi",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
}

string_enum!(PaymentStatus, "payment status", {
    Pending => "pending",
    Paid => "paid",
    Refunded => "refunded",
});

impl PaymentStatus {
    pub fn transition_to(&self, next: PaymentStatus) -> PosResult<PaymentStatus> {
        match (*self, next) {
            (PaymentStatus::Pending, PaymentStatus::Paid)
            | (PaymentStatus::Paid, PaymentStatus::Refunded) => Ok(next),
            _ => Err(PosError::InvalidTransition {
                entity: "payment",
                from: self.to_string(),
                to: next.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdvanceStatus {
    Pending,
    Confirmed,
    Ready,
    Delivered,
}

string_enum!(AdvanceStatus, "advance order status", {
    Pending => "pending",
    Confirmed => "confirmed",
    Ready => "ready",
    Delivered => "delivered",
});

impl AdvanceStatus {
    fn rank(&self) -> u8 {
        match self {
            AdvanceStatus::Pending => 0,
            AdvanceStatus::Confirmed => 1,
            AdvanceStatus::Ready => 2,
            AdvanceStatus::Delivered => 3,
        }
    }

    /// Any later stage may be set directly; going back is rejected.
    pub fn can_transition_to(&self, next: AdvanceStatus) -> bool {
        next.rank() > self.rank()
    }

    pub fn transition_to(&self, next: AdvanceStatus) -> PosResult<AdvanceStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(PosError::InvalidTransition {
                entity: "advance order",
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: i64,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default = "default_true")]
    pub in_stock: bool,
}

fn default_true() -> bool {
    true
}

/// Fields accepted when creating or editing a menu item.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemInput {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub in_stock: Option<bool>,
}

// ---------------------------------------------------------------------------
// Order lines
// ---------------------------------------------------------------------------

/// A cart / order line. `total_price` is always `unit_price * quantity`
/// and is recomputed on deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "OrderItemRecord")]
pub struct OrderItem {
    pub menu_item_id: i64,
    pub name: String,
    pub category: String,
    quantity: u32,
    unit_price: f64,
    total_price: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderItemRecord {
    menu_item_id: i64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    category: String,
    quantity: u32,
    unit_price: f64,
}

impl From<OrderItemRecord> for OrderItem {
    fn from(r: OrderItemRecord) -> Self {
        OrderItem::new(r.menu_item_id, r.name, r.category, r.unit_price, r.quantity)
    }
}

/// Largest quantity a single order line may carry.
pub const MAX_LINE_QUANTITY: u32 = 9999;

/// Reject line quantities above [`MAX_LINE_QUANTITY`].
pub fn check_line_quantity(quantity: u32) -> PosResult<u32> {
    if quantity > MAX_LINE_QUANTITY {
        return Err(PosError::validation(format!(
            "Quantity {quantity} exceeds the maximum of {MAX_LINE_QUANTITY} per item"
        )));
    }
    Ok(quantity)
}

impl OrderItem {
    pub fn new(
        menu_item_id: i64,
        name: impl Into<String>,
        category: impl Into<String>,
        unit_price: f64,
        quantity: u32,
    ) -> Self {
        Self {
            menu_item_id,
            name: name.into(),
            category: category.into(),
            quantity,
            unit_price,
            total_price: round_money(unit_price * quantity as f64),
        }
    }

    pub fn from_menu_item(item: &MenuItem, quantity: u32) -> Self {
        Self::new(item.id, &item.name, &item.category, item.price, quantity)
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn unit_price(&self) -> f64 {
        self.unit_price
    }

    pub fn total_price(&self) -> f64 {
        self.total_price
    }

    pub(crate) fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
        self.total_price = round_money(self.unit_price * quantity as f64);
    }
}

/// Sum of line totals, rounded to cents.
pub fn items_subtotal(items: &[OrderItem]) -> f64 {
    round_money(items.iter().map(OrderItem::total_price).sum())
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub order_number: String,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub table_number: Option<String>,
    pub order_type: OrderType,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub subtotal: f64,
    pub discount_amount: f64,
    pub tax_amount: f64,
    pub total_amount: f64,
    pub payment_method: Option<PaymentMethod>,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Inclusion predicate shared by every revenue / count aggregate.
    pub fn counts_as_sale(&self) -> bool {
        self.status == OrderStatus::Completed || self.payment_status == PaymentStatus::Paid
    }
}

// ---------------------------------------------------------------------------
// Advance orders
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceOrder {
    pub id: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub delivery_date: NaiveDate,
    pub delivery_time: Option<String>,
    pub items: Vec<OrderItem>,
    pub total_amount: f64,
    pub advance_amount: f64,
    pub remaining_amount: f64,
    pub status: AdvanceStatus,
    pub special_instructions: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AdvanceOrder {
    /// Revenue recognized at the current status: the upfront amount once
    /// confirmed, the full total once delivered, nothing otherwise.
    pub fn recognized_revenue(&self) -> f64 {
        match self.status {
            AdvanceStatus::Confirmed => self.advance_amount,
            AdvanceStatus::Delivered => self.total_amount,
            AdvanceStatus::Pending | AdvanceStatus::Ready => 0.0,
        }
    }

    pub fn counts_as_sale(&self) -> bool {
        matches!(
            self.status,
            AdvanceStatus::Confirmed | AdvanceStatus::Delivered
        )
    }
}

// ---------------------------------------------------------------------------
// Held orders
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeldOrder {
    pub id: String,
    pub items: Vec<OrderItem>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub table_number: Option<String>,
    #[serde(default)]
    pub discount_amount: f64,
    pub total: f64,
    pub held_at: DateTime<Utc>,
    pub reason: Option<String>,
    /// Set when an existing order was parked rather than a fresh cart.
    #[serde(default)]
    pub order_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_item_total_is_derived() {
        let mut line = OrderItem::new(1, "Classic Vanilla Bean", "Ice Cream Scoops", 3.5, 2);
        assert_eq!(line.total_price(), 7.0);
        line.set_quantity(3);
        assert_eq!(line.total_price(), 10.5);
    }

    #[test]
    fn order_item_deserialize_ignores_stored_total() {
        let line: OrderItem = serde_json::from_value(serde_json::json!({
            "menuItemId": 3,
            "name": "Strawberry Swirl Sundae",
            "quantity": 2,
            "unitPrice": 8.5,
            "totalPrice": 999.0
        }))
        .expect("line should parse");
        assert_eq!(line.total_price(), 17.0);
    }

    #[test]
    fn order_type_uses_kebab_case() {
        assert_eq!(
            serde_json::to_value(OrderType::DineIn).unwrap(),
            serde_json::json!("dine-in")
        );
        assert_eq!(
            "advance-order".parse::<OrderType>().unwrap(),
            OrderType::AdvanceOrder
        );
        assert!("drive-thru".parse::<OrderType>().is_err());
    }

    #[test]
    fn order_status_table() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Held));
        assert!(OrderStatus::Held.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Held.can_transition_to(OrderStatus::Completed));
        let err = OrderStatus::Completed
            .transition_to(OrderStatus::Pending)
            .expect_err("completed is terminal");
        assert!(matches!(err, PosError::InvalidTransition { .. }));
    }

    #[test]
    fn advance_status_allows_skips_not_rewinds() {
        assert!(AdvanceStatus::Pending.can_transition_to(AdvanceStatus::Delivered));
        assert!(AdvanceStatus::Confirmed.can_transition_to(AdvanceStatus::Ready));
        assert!(!AdvanceStatus::Delivered.can_transition_to(AdvanceStatus::Confirmed));
        assert!(!AdvanceStatus::Ready.can_transition_to(AdvanceStatus::Ready));
    }

    #[test]
    fn payment_status_transitions() {
        assert_eq!(
            PaymentStatus::Pending.transition_to(PaymentStatus::Paid).unwrap(),
            PaymentStatus::Paid
        );
        assert!(PaymentStatus::Refunded
            .transition_to(PaymentStatus::Paid)
            .is_err());
        assert!(PaymentStatus::Pending
            .transition_to(PaymentStatus::Refunded)
            .is_err());
    }

    #[test]
    fn recognition_follows_status() {
        let mut order = AdvanceOrder {
            id: "adv-1".into(),
            customer_name: "Asha".into(),
            customer_phone: "555-0101".into(),
            customer_email: None,
            delivery_date: NaiveDate::from_ymd_opt(2026, 10, 20).unwrap(),
            delivery_time: None,
            items: vec![],
            total_amount: 500.0,
            advance_amount: 150.0,
            remaining_amount: 350.0,
            status: AdvanceStatus::Pending,
            special_instructions: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(order.recognized_revenue(), 0.0);
        order.status = AdvanceStatus::Confirmed;
        assert_eq!(order.recognized_revenue(), 150.0);
        order.status = AdvanceStatus::Ready;
        assert_eq!(order.recognized_revenue(), 0.0);
        order.status = AdvanceStatus::Delivered;
        assert_eq!(order.recognized_revenue(), 500.0);
    }
}
