use serde::Deserialize;

use super::{parse_payload, payload_i64, Service};
use crate::cart::CartSummary;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CartQuantityPayload {
    #[serde(alias = "menu_item_id", alias = "id")]
    menu_item_id: i64,
    quantity: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CartCustomerPayload {
    #[serde(default, alias = "customer_name", alias = "name")]
    customer_name: Option<String>,
    #[serde(default, alias = "customer_phone", alias = "phone")]
    customer_phone: Option<String>,
    #[serde(default, alias = "table_number", alias = "table")]
    table_number: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CartDiscountPayload {
    #[serde(alias = "discount_amount", alias = "discount")]
    amount: f64,
}

const MENU_ITEM_KEYS: &[&str] = &["menuItemId", "menu_item_id", "id"];

#[tauri::command]
pub async fn cart_get(svc: Service<'_>) -> Result<CartSummary, String> {
    Ok(svc.cart_summary()?)
}

#[tauri::command]
pub async fn cart_add_item(
    arg0: Option<serde_json::Value>,
    svc: Service<'_>,
) -> Result<CartSummary, String> {
    let id = payload_i64(arg0, MENU_ITEM_KEYS).ok_or("Missing menu item id")?;
    Ok(svc.cart_add_item(id)?)
}

#[tauri::command]
pub async fn cart_set_quantity(
    arg0: Option<serde_json::Value>,
    svc: Service<'_>,
) -> Result<CartSummary, String> {
    let payload: CartQuantityPayload = parse_payload(arg0, "cart quantity")?;
    Ok(svc.cart_set_quantity(payload.menu_item_id, payload.quantity)?)
}

#[tauri::command]
pub async fn cart_remove_item(
    arg0: Option<serde_json::Value>,
    svc: Service<'_>,
) -> Result<CartSummary, String> {
    let id = payload_i64(arg0, MENU_ITEM_KEYS).ok_or("Missing menu item id")?;
    Ok(svc.cart_remove_item(id)?)
}

#[tauri::command]
pub async fn cart_set_customer(
    arg0: Option<serde_json::Value>,
    svc: Service<'_>,
) -> Result<CartSummary, String> {
    let payload: CartCustomerPayload = parse_payload(arg0, "cart customer")?;
    Ok(svc.cart_set_customer(
        payload.customer_name,
        payload.customer_phone,
        payload.table_number,
    )?)
}

#[tauri::command]
pub async fn cart_set_discount(
    arg0: Option<serde_json::Value>,
    svc: Service<'_>,
) -> Result<CartSummary, String> {
    let amount = match arg0 {
        Some(serde_json::Value::Number(n)) => n.as_f64().ok_or("Invalid discount")?,
        other => parse_payload::<CartDiscountPayload>(other, "cart discount")?.amount,
    };
    Ok(svc.cart_set_discount(amount)?)
}

#[tauri::command]
pub async fn cart_clear(svc: Service<'_>) -> Result<CartSummary, String> {
    Ok(svc.cart_clear()?)
}
