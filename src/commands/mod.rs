//! Tauri IPC command handlers.
//!
//! The frontend calls `invoke("<command>", { arg0, arg1 })`. Payloads are
//! parsed into typed structs that accept both camelCase and snake_case keys;
//! every command returns `Result<_, String>` so the error text reaches the
//! toast unchanged.

use serde::de::DeserializeOwned;

use crate::service::PosService;

pub mod advances;
pub mod auth;
pub mod cart;
pub mod dashboard;
pub mod diagnostics;
pub mod held;
pub mod menu;
pub mod notifications;
pub mod orders;
pub mod reports;

pub(crate) type Service<'a> = tauri::State<'a, PosService>;

/// Deserialize `arg0` into `T`; a missing payload reads as `{}`.
pub(crate) fn parse_payload<T: DeserializeOwned>(
    arg0: Option<serde_json::Value>,
    what: &str,
) -> Result<T, String> {
    let value = arg0.unwrap_or_else(|| serde_json::json!({}));
    serde_json::from_value(value).map_err(|e| format!("Invalid {what} payload: {e}"))
}

/// Accept either a bare string or an object carrying one of `keys`.
pub(crate) fn payload_string(arg0: Option<serde_json::Value>, keys: &[&str]) -> Option<String> {
    match arg0 {
        Some(serde_json::Value::String(s)) => {
            let t = s.trim();
            (!t.is_empty()).then(|| t.to_string())
        }
        Some(serde_json::Value::Object(obj)) => keys.iter().find_map(|key| {
            obj.get(*key)
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        }),
        _ => None,
    }
}

/// Like [`payload_string`] for integer ids.
pub(crate) fn payload_i64(arg0: Option<serde_json::Value>, keys: &[&str]) -> Option<i64> {
    match arg0 {
        Some(serde_json::Value::Number(n)) => n.as_i64(),
        Some(serde_json::Value::Object(obj)) => {
            keys.iter().find_map(|key| obj.get(*key).and_then(|v| v.as_i64()))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Probe {
        #[serde(alias = "order_id")]
        order_id: String,
    }

    #[test]
    fn payload_accepts_snake_case_alias() {
        let probe: Probe = parse_payload(Some(json!({ "order_id": "o1" })), "probe").unwrap();
        assert_eq!(probe.order_id, "o1");
        assert!(parse_payload::<Probe>(None, "probe").is_err());
    }

    #[test]
    fn payload_string_shapes() {
        assert_eq!(payload_string(Some(json!(" h1 ")), &["id"]).as_deref(), Some("h1"));
        assert_eq!(
            payload_string(Some(json!({ "heldId": "h2" })), &["id", "heldId"]).as_deref(),
            Some("h2")
        );
        assert_eq!(payload_string(Some(json!("")), &["id"]), None);
        assert_eq!(payload_i64(Some(json!({ "menuItemId": 4 })), &["menuItemId"]), Some(4));
        assert_eq!(payload_i64(Some(json!(7)), &["id"]), Some(7));
    }
}
