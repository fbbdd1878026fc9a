use serde::Deserialize;

use super::{parse_payload, Service};
use crate::advance::AdvanceBooking;
use crate::models::{AdvanceOrder, AdvanceStatus};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdvanceStatusPayload {
    #[serde(alias = "advance_order_id", alias = "orderId", alias = "order_id")]
    id: String,
    status: AdvanceStatus,
}

#[tauri::command]
pub async fn advance_create(
    arg0: Option<serde_json::Value>,
    svc: Service<'_>,
) -> Result<AdvanceOrder, String> {
    let booking: AdvanceBooking = parse_payload(arg0, "advance order")?;
    Ok(svc.create_advance_order(booking)?)
}

#[tauri::command]
pub async fn advance_get_all(svc: Service<'_>) -> Result<Vec<AdvanceOrder>, String> {
    Ok(svc.list_advance_orders()?)
}

#[tauri::command]
pub async fn advance_update_status(
    arg0: Option<serde_json::Value>,
    svc: Service<'_>,
) -> Result<AdvanceOrder, String> {
    let payload: AdvanceStatusPayload = parse_payload(arg0, "advance status")?;
    Ok(svc.set_advance_status(payload.id.trim(), payload.status)?)
}
