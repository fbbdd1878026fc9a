use std::time::Duration;
use tauri::Emitter;
use tracing::warn;

use super::Service;
use crate::dashboard::{self, DashboardStats, RefreshState};
use crate::service::PosService;

/// Start a refresh loop that emits `dashboard_stats`. A loop left over from
/// an earlier start exits on its next tick.
pub(crate) fn spawn_refresh(app: &tauri::AppHandle, svc: &PosService, state: &RefreshState) {
    let interval = Duration::from_secs(svc.config().refresh_interval_secs);
    let generation = state.begin();
    let handle = app.clone();
    tauri::async_runtime::spawn(dashboard::refresh_loop(
        svc.store_handle(),
        state.clone(),
        generation,
        interval,
        move |stats| {
            if let Err(e) = handle.emit("dashboard_stats", &stats) {
                warn!("emit dashboard_stats failed: {e}");
            }
        },
    ));
}

#[tauri::command]
pub async fn dashboard_get_stats(svc: Service<'_>) -> Result<DashboardStats, String> {
    Ok(svc.dashboard_stats()?)
}

#[tauri::command]
pub async fn dashboard_refresh_status(state: tauri::State<'_, RefreshState>) -> Result<bool, String> {
    Ok(state.is_running())
}

#[tauri::command]
pub async fn dashboard_stop_refresh(state: tauri::State<'_, RefreshState>) -> Result<(), String> {
    state.stop();
    Ok(())
}

/// Restart the refresh loop; a no-op while one is running.
#[tauri::command]
pub async fn dashboard_start_refresh(
    svc: Service<'_>,
    state: tauri::State<'_, RefreshState>,
    app: tauri::AppHandle,
) -> Result<bool, String> {
    if state.is_running() {
        return Ok(false);
    }
    spawn_refresh(&app, &svc, &state);
    Ok(true)
}
