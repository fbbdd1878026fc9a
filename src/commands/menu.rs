use serde::Deserialize;

use super::{parse_payload, payload_i64, payload_string, Service};
use crate::models::{MenuItem, MenuItemInput};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MenuUpdatePayload {
    #[serde(alias = "menu_item_id", alias = "menuItemId")]
    id: i64,
    #[serde(flatten)]
    item: MenuItemInput,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MenuStockPayload {
    #[serde(alias = "menu_item_id", alias = "menuItemId")]
    id: i64,
    #[serde(alias = "in_stock", alias = "isAvailable")]
    in_stock: bool,
}

#[tauri::command]
pub async fn menu_get_items(
    arg0: Option<serde_json::Value>,
    svc: Service<'_>,
) -> Result<Vec<MenuItem>, String> {
    let category = payload_string(arg0, &["category"]);
    Ok(svc.list_menu(category.as_deref())?)
}

#[tauri::command]
pub async fn menu_get_categories(svc: Service<'_>) -> Result<Vec<String>, String> {
    Ok(svc.menu_categories()?)
}

#[tauri::command]
pub async fn menu_add_item(
    arg0: Option<serde_json::Value>,
    svc: Service<'_>,
) -> Result<MenuItem, String> {
    let input: MenuItemInput = parse_payload(arg0, "menu item")?;
    Ok(svc.add_menu_item(&input)?)
}

#[tauri::command]
pub async fn menu_update_item(
    arg0: Option<serde_json::Value>,
    svc: Service<'_>,
) -> Result<MenuItem, String> {
    let payload: MenuUpdatePayload = parse_payload(arg0, "menu item update")?;
    Ok(svc.update_menu_item(payload.id, &payload.item)?)
}

#[tauri::command]
pub async fn menu_delete_item(
    arg0: Option<serde_json::Value>,
    svc: Service<'_>,
) -> Result<(), String> {
    let id = payload_i64(arg0, &["id", "menuItemId", "menu_item_id"])
        .ok_or("Missing menu item id")?;
    Ok(svc.delete_menu_item(id)?)
}

#[tauri::command]
pub async fn menu_set_stock(
    arg0: Option<serde_json::Value>,
    svc: Service<'_>,
) -> Result<MenuItem, String> {
    let payload: MenuStockPayload = parse_payload(arg0, "menu stock")?;
    Ok(svc.set_menu_item_stock(payload.id, payload.in_stock)?)
}
