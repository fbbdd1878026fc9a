use serde::Deserialize;

use super::{parse_payload, Service};
use crate::notifications::{Notification, NotificationKind};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MarkReadPayload {
    #[serde(rename = "type", alias = "kind")]
    kind: NotificationKind,
    id: String,
}

#[tauri::command]
pub async fn notification_get_all(svc: Service<'_>) -> Result<Vec<Notification>, String> {
    Ok(svc.notifications()?)
}

#[tauri::command]
pub async fn notification_unread_count(svc: Service<'_>) -> Result<usize, String> {
    Ok(svc.unread_notifications()?)
}

#[tauri::command]
pub async fn notification_mark_read(
    arg0: Option<serde_json::Value>,
    svc: Service<'_>,
) -> Result<usize, String> {
    let payload: MarkReadPayload = parse_payload(arg0, "notification")?;
    svc.mark_notification_read(payload.kind, payload.id.trim())?;
    Ok(svc.unread_notifications()?)
}
