use serde::Deserialize;
use tauri::Emitter;
use tracing::warn;

use super::{parse_payload, payload_string, Service};
use crate::models::{Order, OrderStatus, OrderType, PaymentMethod};
use crate::orders::{self, OrderFilter};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentPayload {
    #[serde(default, alias = "payment_method", alias = "method")]
    payment_method: Option<PaymentMethod>,
    #[serde(default, alias = "order_type", alias = "type")]
    order_type: Option<OrderType>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderUpdateStatusPayload {
    #[serde(alias = "order_id", alias = "id")]
    order_id: String,
    status: OrderStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SplitPayload {
    total: f64,
    #[serde(alias = "split_amount", alias = "amount")]
    split_amount: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecentPayload {
    #[serde(default)]
    limit: Option<usize>,
}

const ORDER_ID_KEYS: &[&str] = &["orderId", "order_id", "id"];

#[tauri::command]
pub async fn order_complete_payment(
    arg0: Option<serde_json::Value>,
    svc: Service<'_>,
    app: tauri::AppHandle,
) -> Result<Order, String> {
    let payload: PaymentPayload = parse_payload(arg0, "payment")?;
    let order = svc.complete_payment(payload.payment_method, payload.order_type)?;
    if let Err(e) = app.emit("order_completed", &order) {
        warn!("emit order_completed failed: {e}");
    }
    Ok(order)
}

#[tauri::command]
pub async fn order_split_remaining(arg0: Option<serde_json::Value>) -> Result<f64, String> {
    let payload: SplitPayload = parse_payload(arg0, "split")?;
    Ok(orders::split_remaining(payload.total, payload.split_amount))
}

#[tauri::command]
pub async fn order_get_all(
    arg0: Option<serde_json::Value>,
    svc: Service<'_>,
) -> Result<Vec<Order>, String> {
    let filter: OrderFilter = parse_payload(arg0, "order filter")?;
    Ok(svc.list_orders(&filter)?)
}

#[tauri::command]
pub async fn order_get_recent(
    arg0: Option<serde_json::Value>,
    svc: Service<'_>,
) -> Result<Vec<Order>, String> {
    let payload: RecentPayload = parse_payload(arg0, "recent orders")?;
    Ok(svc.recent_orders(payload.limit)?)
}

#[tauri::command]
pub async fn order_get_by_id(
    arg0: Option<serde_json::Value>,
    svc: Service<'_>,
) -> Result<Order, String> {
    let id = payload_string(arg0, ORDER_ID_KEYS).ok_or("Missing order ID")?;
    Ok(orders::get_order(svc.store(), &id)?)
}

#[tauri::command]
pub async fn order_update_status(
    arg0: Option<serde_json::Value>,
    svc: Service<'_>,
) -> Result<Order, String> {
    let payload: OrderUpdateStatusPayload = parse_payload(arg0, "order status")?;
    Ok(svc.update_order_status(payload.order_id.trim(), payload.status)?)
}

#[tauri::command]
pub async fn order_refund(
    arg0: Option<serde_json::Value>,
    svc: Service<'_>,
) -> Result<Order, String> {
    let id = payload_string(arg0, ORDER_ID_KEYS).ok_or("Missing order ID")?;
    Ok(svc.refund_order(&id)?)
}
