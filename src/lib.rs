//! Scoop POS backend.
//!
//! The domain layer (cart, orders, held orders, advance bookings, reports,
//! notifications, dashboard) runs against a [`store::PosStore`] and is usable
//! without a window. With the `desktop` feature the same operations are
//! exposed to the frontend as Tauri IPC commands (`invoke("order_refund")`).

pub mod advance;
pub mod auth;
pub mod cart;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod diagnostics;
pub mod error;
pub mod held;
pub mod json_store;
pub mod menu;
pub mod models;
pub mod notifications;
pub mod orders;
pub mod reports;
pub mod revenue;
pub mod service;
pub mod sqlite_store;
pub mod store;

#[cfg(feature = "desktop")]
mod commands;

pub use config::AppConfig;
pub use error::{PosError, PosResult};
pub use service::PosService;

// ============================================================================
// App entry point
// ============================================================================

#[cfg(feature = "desktop")]
pub fn run() {
    use tauri::Manager;
    use tracing::{error, info};

    let result = tauri::Builder::default()
        .setup(|app| {
            let app_data_dir = app.path().app_data_dir()?;
            let config = AppConfig::from_env(&app_data_dir);

            // The log directory hangs off the resolved data dir.
            let guard = diagnostics::init_logging(&config.log_dir())?;
            // Dropping the guard stops the file writer; the app runs until exit.
            std::mem::forget(guard);

            info!(
                data_dir = %config.data_dir.display(),
                backend = ?config.store_backend,
                "Starting Scoop POS v{}",
                env!("CARGO_PKG_VERSION")
            );

            let service = PosService::open(config)?;
            let refresh_state = dashboard::RefreshState::default();
            commands::dashboard::spawn_refresh(app.handle(), &service, &refresh_state);

            app.manage(service);
            app.manage(refresh_state);
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            // Menu
            commands::menu::menu_get_items,
            commands::menu::menu_get_categories,
            commands::menu::menu_add_item,
            commands::menu::menu_update_item,
            commands::menu::menu_delete_item,
            commands::menu::menu_set_stock,
            // Cart
            commands::cart::cart_get,
            commands::cart::cart_add_item,
            commands::cart::cart_set_quantity,
            commands::cart::cart_remove_item,
            commands::cart::cart_set_customer,
            commands::cart::cart_set_discount,
            commands::cart::cart_clear,
            // Orders
            commands::orders::order_complete_payment,
            commands::orders::order_split_remaining,
            commands::orders::order_get_all,
            commands::orders::order_get_recent,
            commands::orders::order_get_by_id,
            commands::orders::order_update_status,
            commands::orders::order_refund,
            // Held orders
            commands::held::held_hold_cart,
            commands::held::held_hold_order,
            commands::held::held_get_all,
            commands::held::held_recall,
            commands::held::held_delete,
            // Advance orders
            commands::advances::advance_create,
            commands::advances::advance_get_all,
            commands::advances::advance_update_status,
            // Notifications
            commands::notifications::notification_get_all,
            commands::notifications::notification_unread_count,
            commands::notifications::notification_mark_read,
            // Reports
            commands::reports::report_get,
            commands::reports::report_render,
            commands::reports::report_export,
            commands::reports::report_open_export_dir,
            // Dashboard
            commands::dashboard::dashboard_get_stats,
            commands::dashboard::dashboard_refresh_status,
            commands::dashboard::dashboard_stop_refresh,
            commands::dashboard::dashboard_start_refresh,
            // Auth
            commands::auth::auth_register,
            commands::auth::auth_login,
            commands::auth::auth_logout,
            commands::auth::auth_get_session,
            // Diagnostics
            commands::diagnostics::diagnostics_get_about,
            commands::diagnostics::diagnostics_store_health,
            commands::diagnostics::diagnostics_get_log_dir,
        ])
        .run(tauri::generate_context!());

    if let Err(e) = result {
        error!("error while running Scoop POS: {e}");
        eprintln!("error while running Scoop POS: {e}");
        std::process::exit(1);
    }
}
