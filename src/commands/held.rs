use serde::Deserialize;

use super::{parse_payload, payload_string, Service};
use crate::cart::CartSummary;
use crate::models::HeldOrder;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HoldCartPayload {
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HoldOrderPayload {
    #[serde(alias = "order_id", alias = "id")]
    order_id: String,
    #[serde(default)]
    reason: Option<String>,
}

const HELD_ID_KEYS: &[&str] = &["heldId", "held_id", "id"];

#[tauri::command]
pub async fn held_hold_cart(
    arg0: Option<serde_json::Value>,
    svc: Service<'_>,
) -> Result<HeldOrder, String> {
    let payload: HoldCartPayload = parse_payload(arg0, "hold")?;
    Ok(svc.hold_cart(payload.reason)?)
}

#[tauri::command]
pub async fn held_hold_order(
    arg0: Option<serde_json::Value>,
    svc: Service<'_>,
) -> Result<HeldOrder, String> {
    let payload: HoldOrderPayload = parse_payload(arg0, "hold order")?;
    Ok(svc.hold_order(payload.order_id.trim(), payload.reason)?)
}

#[tauri::command]
pub async fn held_get_all(svc: Service<'_>) -> Result<Vec<HeldOrder>, String> {
    Ok(svc.list_held()?)
}

#[tauri::command]
pub async fn held_recall(
    arg0: Option<serde_json::Value>,
    svc: Service<'_>,
) -> Result<CartSummary, String> {
    let id = payload_string(arg0, HELD_ID_KEYS).ok_or("Missing held order ID")?;
    Ok(svc.recall_held(&id)?)
}

#[tauri::command]
pub async fn held_delete(
    arg0: Option<serde_json::Value>,
    svc: Service<'_>,
) -> Result<(), String> {
    let id = payload_string(arg0, HELD_ID_KEYS).ok_or("Missing held order ID")?;
    Ok(svc.delete_held(&id)?)
}
