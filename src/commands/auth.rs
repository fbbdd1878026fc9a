use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tauri::Emitter;
use tracing::warn;

use super::{parse_payload, Service};
use crate::auth::{Registration, Role, Session, UserAccount};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginPayload {
    #[serde(alias = "user", alias = "name")]
    username: String,
    #[serde(alias = "pin")]
    password: String,
    #[serde(default, alias = "userRole")]
    role: String,
}

/// What the frontend sees of a new account; the hash stays in the store.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    username: String,
    full_name: String,
    role: Role,
    email: Option<String>,
    phone: Option<String>,
    registered_at: DateTime<Utc>,
}

impl From<UserAccount> for UserProfile {
    fn from(user: UserAccount) -> Self {
        Self {
            username: user.username,
            full_name: user.full_name,
            role: user.role,
            email: user.email,
            phone: user.phone,
            registered_at: user.registered_at,
        }
    }
}

#[tauri::command]
pub async fn auth_register(
    arg0: Option<serde_json::Value>,
    svc: Service<'_>,
) -> Result<UserProfile, String> {
    let form: Registration = parse_payload(arg0, "registration")?;
    Ok(svc.register(form)?.into())
}

#[tauri::command]
pub async fn auth_login(
    arg0: Option<serde_json::Value>,
    svc: Service<'_>,
    app: tauri::AppHandle,
) -> Result<Session, String> {
    let payload: LoginPayload = parse_payload(arg0, "login")?;
    let session = svc.login(&payload.username, &payload.password, &payload.role)?;
    if let Err(e) = app.emit("session_changed", Some(&session)) {
        warn!("emit session_changed failed: {e}");
    }
    Ok(session)
}

#[tauri::command]
pub async fn auth_logout(svc: Service<'_>, app: tauri::AppHandle) -> Result<(), String> {
    svc.logout()?;
    if let Err(e) = app.emit("session_changed", None::<Session>) {
        warn!("emit session_changed failed: {e}");
    }
    Ok(())
}

#[tauri::command]
pub async fn auth_get_session(svc: Service<'_>) -> Result<Option<Session>, String> {
    Ok(svc.current_session()?)
}
