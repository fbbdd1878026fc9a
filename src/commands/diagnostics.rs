use super::Service;
use crate::diagnostics::{self, AboutInfo, StoreHealth};

#[tauri::command]
pub async fn diagnostics_get_about() -> Result<AboutInfo, String> {
    Ok(diagnostics::get_about_info())
}

#[tauri::command]
pub async fn diagnostics_store_health(svc: Service<'_>) -> Result<StoreHealth, String> {
    Ok(svc.store_health()?)
}

#[tauri::command]
pub async fn diagnostics_get_log_dir(svc: Service<'_>) -> Result<String, String> {
    Ok(diagnostics::get_log_dir(svc.config())
        .to_string_lossy()
        .into_owned())
}
