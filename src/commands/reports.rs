use serde::Deserialize;
use tracing::info;

use super::{parse_payload, Service};
use crate::reports::{ExportFormat, ReportData, ReportPeriod};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExportPayload {
    #[serde(flatten)]
    period: ReportPeriod,
    #[serde(default = "default_format")]
    format: ExportFormat,
}

fn default_format() -> ExportFormat {
    ExportFormat::Csv
}

#[tauri::command]
pub async fn report_get(
    arg0: Option<serde_json::Value>,
    svc: Service<'_>,
) -> Result<ReportData, String> {
    let period: ReportPeriod = parse_payload(arg0, "report period")?;
    Ok(svc.report(period)?)
}

/// Render the report body; used by the print preview.
#[tauri::command]
pub async fn report_render(
    arg0: Option<serde_json::Value>,
    svc: Service<'_>,
) -> Result<String, String> {
    let payload: ExportPayload = parse_payload(arg0, "report export")?;
    Ok(svc.render_report(payload.period, payload.format)?)
}

#[tauri::command]
pub async fn report_export(
    arg0: Option<serde_json::Value>,
    svc: Service<'_>,
) -> Result<String, String> {
    let payload: ExportPayload = parse_payload(arg0, "report export")?;
    let path = svc.export_report(payload.period, payload.format)?;
    info!(path = %path.display(), "Report exported");
    Ok(path.to_string_lossy().into_owned())
}

#[tauri::command]
pub async fn report_open_export_dir(svc: Service<'_>) -> Result<(), String> {
    let dir = svc.config().export_dir();
    std::fs::create_dir_all(&dir).map_err(|e| format!("Failed to create export folder: {e}"))?;
    open_directory(&dir)
}

fn open_directory(dir: &std::path::Path) -> Result<(), String> {
    #[cfg(target_os = "windows")]
    let opener = "explorer";
    #[cfg(target_os = "macos")]
    let opener = "open";
    #[cfg(all(unix, not(target_os = "macos")))]
    let opener = "xdg-open";

    #[cfg(any(target_os = "windows", unix))]
    {
        std::process::Command::new(opener)
            .arg(dir)
            .spawn()
            .map_err(|e| format!("Failed to open folder: {e}"))?;
        Ok(())
    }

    #[cfg(not(any(target_os = "windows", unix)))]
    {
        let _ = dir;
        Err("Opening the export folder is not supported on this platform".into())
    }
}
