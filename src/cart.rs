//! Order builder: the in-memory cart of one checkout session.
//!
//! Lines are keyed by menu item id. Discount is validated against the
//! subtotal when it is set; the total is clamped at zero in case lines are
//! removed after a discount was applied.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PosError, PosResult};
use crate::models::{
    check_line_quantity, items_subtotal, round_money, HeldOrder, MenuItem, OrderItem,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    items: Vec<OrderItem>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub table_number: Option<String>,
    discount_amount: f64,
    /// Percentage, e.g. `5.0` for 5%.
    tax_rate: f64,
    /// Existing order this cart was recalled from, if any.
    order_id: Option<String>,
}

/// Totals snapshot handed to the frontend after every cart mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    pub items: Vec<OrderItem>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub table_number: Option<String>,
    pub item_count: u32,
    pub subtotal: f64,
    pub discount_amount: f64,
    pub tax_amount: f64,
    pub total: f64,
    pub order_id: Option<String>,
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl Cart {
    pub fn new(tax_rate: f64) -> Self {
        Self {
            tax_rate: tax_rate.max(0.0),
            ..Self::default()
        }
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn order_id(&self) -> Option<&str> {
        self.order_id.as_deref()
    }

    /// Add one unit of `item`; bumps the quantity if the line already exists.
    pub fn add_item(&mut self, item: &MenuItem) -> PosResult<&OrderItem> {
        if !item.in_stock {
            return Err(PosError::validation(format!(
                "{} is out of stock",
                item.name
            )));
        }
        let idx = match self.items.iter().position(|l| l.menu_item_id == item.id) {
            Some(idx) => {
                let qty = check_line_quantity(self.items[idx].quantity().saturating_add(1))?;
                self.items[idx].set_quantity(qty);
                idx
            }
            None => {
                self.items.push(OrderItem::from_menu_item(item, 1));
                self.items.len() - 1
            }
        };
        Ok(&self.items[idx])
    }

    /// Set a line's quantity. Zero removes the line.
    pub fn set_quantity(&mut self, menu_item_id: i64, quantity: u32) -> PosResult<()> {
        let idx = self
            .items
            .iter()
            .position(|l| l.menu_item_id == menu_item_id)
            .ok_or_else(|| PosError::not_found("cart line", menu_item_id))?;
        check_line_quantity(quantity)?;
        if quantity == 0 {
            self.items.remove(idx);
        } else {
            self.items[idx].set_quantity(quantity);
        }
        Ok(())
    }

    pub fn remove_item(&mut self, menu_item_id: i64) -> PosResult<()> {
        self.set_quantity(menu_item_id, 0)
    }

    pub fn set_customer(
        &mut self,
        name: Option<String>,
        phone: Option<String>,
        table_number: Option<String>,
    ) {
        self.customer_name = clean(name);
        self.customer_phone = clean(phone);
        self.table_number = clean(table_number);
    }

    pub fn subtotal(&self) -> f64 {
        items_subtotal(&self.items)
    }

    pub fn discount_amount(&self) -> f64 {
        self.discount_amount
    }

    /// Negative discounts and discounts above the subtotal are rejected.
    pub fn set_discount(&mut self, amount: f64) -> PosResult<()> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(PosError::validation("Discount cannot be negative"));
        }
        let subtotal = self.subtotal();
        if amount > subtotal {
            return Err(PosError::validation(format!(
                "Discount {amount:.2} exceeds subtotal {subtotal:.2}"
            )));
        }
        self.discount_amount = round_money(amount);
        Ok(())
    }

    fn taxable(&self) -> f64 {
        (self.subtotal() - self.discount_amount).max(0.0)
    }

    pub fn tax_amount(&self) -> f64 {
        round_money(self.taxable() * self.tax_rate / 100.0)
    }

    pub fn total(&self) -> f64 {
        round_money(self.taxable() + self.tax_amount())
    }

    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |acc, l| acc.saturating_add(l.quantity()))
    }

    pub fn summary(&self) -> CartSummary {
        CartSummary {
            items: self.items.clone(),
            customer_name: self.customer_name.clone(),
            customer_phone: self.customer_phone.clone(),
            table_number: self.table_number.clone(),
            item_count: self.item_count(),
            subtotal: self.subtotal(),
            discount_amount: self.discount_amount,
            tax_amount: self.tax_amount(),
            total: self.total(),
            order_id: self.order_id.clone(),
        }
    }

    /// Empty the cart and its transient fields; the tax rate is kept.
    pub fn clear(&mut self) {
        *self = Cart::new(self.tax_rate);
    }

    /// Snapshot the cart as a held order.
    pub fn to_held(&self, id: String, reason: Option<String>, now: DateTime<Utc>) -> HeldOrder {
        HeldOrder {
            id,
            items: self.items.clone(),
            customer_name: self.customer_name.clone(),
            customer_phone: self.customer_phone.clone(),
            table_number: self.table_number.clone(),
            discount_amount: self.discount_amount,
            total: self.total(),
            held_at: now,
            reason: clean(reason),
            order_id: self.order_id.clone(),
        }
    }

    /// Rebuild a cart from a held snapshot.
    pub fn from_held(held: HeldOrder, tax_rate: f64) -> Self {
        let mut cart = Cart::new(tax_rate);
        cart.items = held.items;
        cart.customer_name = held.customer_name;
        cart.customer_phone = held.customer_phone;
        cart.table_number = held.table_number;
        cart.order_id = held.order_id;
        let discount = held.discount_amount.min(cart.subtotal()).max(0.0);
        cart.discount_amount = round_money(discount);
        cart
    }

    pub(crate) fn with_order(mut self, order_id: String) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub(crate) fn push_line(&mut self, line: OrderItem) {
        self.items.push(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MAX_LINE_QUANTITY;

    fn item(id: i64, name: &str, price: f64) -> MenuItem {
        MenuItem {
            id,
            name: name.into(),
            category: "Ice Cream Scoops".into(),
            description: String::new(),
            price,
            in_stock: true,
        }
    }

    #[test]
    fn add_item_increments_existing_line() {
        let mut cart = Cart::new(0.0);
        let vanilla = item(1, "Classic Vanilla Bean", 3.5);
        cart.add_item(&vanilla).unwrap();
        cart.add_item(&vanilla).unwrap();
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity(), 2);
        assert_eq!(cart.subtotal(), 7.0);
    }

    #[test]
    fn subtotal_and_total_example() {
        let mut cart = Cart::new(0.0);
        let vanilla = item(1, "Classic Vanilla Bean", 3.5);
        let sundae = item(3, "Strawberry Swirl Sundae", 8.5);
        cart.add_item(&vanilla).unwrap();
        cart.add_item(&vanilla).unwrap();
        cart.add_item(&sundae).unwrap();
        assert_eq!(cart.subtotal(), 15.5);
        assert_eq!(cart.total(), 15.5);
    }

    #[test]
    fn zero_quantity_removes_line() {
        let mut cart = Cart::new(0.0);
        cart.add_item(&item(1, "Cherry", 0.25)).unwrap();
        cart.add_item(&item(2, "Nuts", 1.0)).unwrap();
        cart.set_quantity(1, 0).unwrap();
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].menu_item_id, 2);
        assert!(cart.set_quantity(1, 3).is_err());
    }

    #[test]
    fn line_quantity_is_capped() {
        let mut cart = Cart::new(0.0);
        let cone = item(4, "Waffle Cone", 2.5);
        cart.add_item(&cone).unwrap();
        assert!(matches!(
            cart.set_quantity(4, u32::MAX),
            Err(PosError::Validation(_))
        ));
        cart.set_quantity(4, MAX_LINE_QUANTITY).unwrap();
        assert!(matches!(cart.add_item(&cone), Err(PosError::Validation(_))));
        assert_eq!(cart.items()[0].quantity(), MAX_LINE_QUANTITY);
        assert_eq!(cart.item_count(), MAX_LINE_QUANTITY);
    }

    #[test]
    fn out_of_stock_item_rejected() {
        let mut cart = Cart::new(0.0);
        let mut shake = item(7, "Vanilla Milkshake", 5.25);
        shake.in_stock = false;
        assert!(matches!(
            cart.add_item(&shake),
            Err(PosError::Validation(_))
        ));
        assert!(cart.is_empty());
    }

    #[test]
    fn over_discount_rejected_and_total_never_negative() {
        let mut cart = Cart::new(0.0);
        cart.add_item(&item(1, "Banana Split", 9.5)).unwrap();
        assert!(cart.set_discount(10.0).is_err());
        assert!(cart.set_discount(-1.0).is_err());
        cart.set_discount(9.5).unwrap();
        assert_eq!(cart.total(), 0.0);

        cart.add_item(&item(2, "Cherry", 0.25)).unwrap();
        cart.set_quantity(1, 0).unwrap();
        assert_eq!(cart.total(), 0.0);
    }

    #[test]
    fn tax_applies_after_discount() {
        let mut cart = Cart::new(5.0);
        cart.add_item(&item(1, "Hot Fudge Sundae", 10.0)).unwrap();
        cart.set_discount(2.0).unwrap();
        assert_eq!(cart.tax_amount(), 0.4);
        assert_eq!(cart.total(), 8.4);
    }

    #[test]
    fn held_snapshot_roundtrip_keeps_metadata() {
        let mut cart = Cart::new(0.0);
        cart.add_item(&item(1, "Mint Chip Delight", 3.75)).unwrap();
        cart.set_customer(Some("Ravi ".into()), Some("".into()), Some("T4".into()));
        let held = cart.to_held("ORD-1".into(), None, Utc::now());
        assert_eq!(held.customer_name.as_deref(), Some("Ravi"));
        assert_eq!(held.customer_phone, None);

        let restored = Cart::from_held(held, 0.0);
        assert_eq!(restored.items(), cart.items());
        assert_eq!(restored.table_number.as_deref(), Some("T4"));
    }

    #[test]
    fn clear_keeps_tax_rate() {
        let mut cart = Cart::new(5.0);
        cart.add_item(&item(1, "Cold Coffee", 4.0)).unwrap();
        cart.set_customer(Some("Meera".into()), None, None);
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.customer_name, None);
        cart.add_item(&item(1, "Cold Coffee", 4.0)).unwrap();
        assert_eq!(cart.tax_amount(), 0.2);
    }
}
