//! Menu catalog for Scoop POS.
//!
//! Validated create / update / delete over the store's `menu_items`, a stock
//! toggle, the category list used by the menu filter, and the default parlor
//! catalog inserted on first start.

use std::collections::BTreeSet;
use tracing::{info, warn};

use crate::error::{PosError, PosResult};
use crate::models::{MenuItem, MenuItemInput};
use crate::store::PosStore;

/// (name, category, price, description)
const DEFAULT_MENU: &[(&str, &str, f64, &str)] = &[
    ("Classic Vanilla Bean", "Ice Cream Scoops", 3.50, "Creamy vanilla ice cream, a timeless favorite"),
    ("Chocolate Fudge Blast", "Ice Cream Scoops", 6.25, "Rich chocolate ice cream with fudge chunks"),
    ("Strawberry Swirl Sundae", "Sundaes", 8.50, "Fresh strawberry ice cream with syrup swirls"),
    ("Mint Chip Delight", "Ice Cream Scoops", 3.75, "Refreshing mint ice cream with chocolate chips"),
    ("Caramel Crunch Cone", "Ice Cream Scoops", 4.50, "Caramel ice cream in a waffle cone with nuts"),
    ("Rocky Road Supreme", "Ice Cream Scoops", 7.25, "Chocolate ice cream with marshmallows and nuts"),
    ("Vanilla Milkshake", "Shakes", 5.25, "Creamy vanilla milkshake"),
    ("Chocolate Milkshake", "Shakes", 5.50, "Rich chocolate milkshake"),
    ("Hot Fudge Sundae", "Sundaes", 8.25, "Hot fudge over vanilla ice cream"),
    ("Banana Split", "Sundaes", 9.50, "Classic banana split with three scoops"),
    ("Chocolate Chips", "Toppings", 0.75, "Premium chocolate chips"),
    ("Whipped Cream", "Toppings", 0.50, "Fresh whipped cream"),
    ("Cherry", "Toppings", 0.25, "Maraschino cherry"),
    ("Nuts", "Toppings", 1.00, "Mixed nuts"),
    ("Hot Chocolate", "Beverages", 3.50, "Rich hot chocolate"),
    ("Cold Coffee", "Beverages", 4.00, "Iced coffee"),
    ("Fresh Juice", "Beverages", 3.25, "Fresh fruit juice"),
];

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(input: &MenuItemInput) -> PosResult<MenuItemInput> {
    let name = input.name.trim();
    let category = input.category.trim();
    if name.is_empty() || category.is_empty() {
        return Err(PosError::validation("Please fill in all required fields"));
    }
    if !input.price.is_finite() || input.price <= 0.0 {
        return Err(PosError::validation("Please enter a valid price"));
    }
    Ok(MenuItemInput {
        name: name.to_string(),
        category: category.to_string(),
        description: input.description.trim().to_string(),
        price: input.price,
        in_stock: input.in_stock,
    })
}

// ---------------------------------------------------------------------------
// Catalog operations
// ---------------------------------------------------------------------------

/// Items in `category`; `None` or `"all"` returns the full catalog.
pub fn items_in_category(store: &dyn PosStore, category: Option<&str>) -> PosResult<Vec<MenuItem>> {
    let items = store.list_menu_items()?;
    Ok(match category {
        None => items,
        Some(c) if c.eq_ignore_ascii_case("all") => items,
        Some(c) => items.into_iter().filter(|m| m.category == c).collect(),
    })
}

/// Distinct categories, sorted.
pub fn categories(store: &dyn PosStore) -> PosResult<Vec<String>> {
    let set: BTreeSet<String> = store
        .list_menu_items()?
        .into_iter()
        .map(|m| m.category)
        .collect();
    Ok(set.into_iter().collect())
}

pub fn add_item(store: &dyn PosStore, input: &MenuItemInput) -> PosResult<MenuItem> {
    let input = validate(input)?;
    let item = store.insert_menu_item(&input)?;
    info!(id = item.id, name = %item.name, price = item.price, "Menu item added");
    Ok(item)
}

pub fn update_item(store: &dyn PosStore, id: i64, input: &MenuItemInput) -> PosResult<MenuItem> {
    let input = validate(input)?;
    let existing = store
        .get_menu_item(id)?
        .ok_or_else(|| PosError::not_found("menu item", id))?;
    let item = MenuItem {
        id,
        name: input.name,
        category: input.category,
        description: input.description,
        price: input.price,
        in_stock: input.in_stock.unwrap_or(existing.in_stock),
    };
    store.update_menu_item(&item)?;
    info!(id, name = %item.name, "Menu item updated");
    Ok(item)
}

/// Delete an item. Orders that already reference it keep their line
/// snapshot.
pub fn delete_item(store: &dyn PosStore, id: i64) -> PosResult<()> {
    if !store.delete_menu_item(id)? {
        return Err(PosError::not_found("menu item", id));
    }
    info!(id, "Menu item deleted");
    Ok(())
}

pub fn set_in_stock(store: &dyn PosStore, id: i64, in_stock: bool) -> PosResult<MenuItem> {
    let mut item = store
        .get_menu_item(id)?
        .ok_or_else(|| PosError::not_found("menu item", id))?;
    item.in_stock = in_stock;
    store.update_menu_item(&item)?;
    info!(id, in_stock, "Menu item stock changed");
    Ok(item)
}

/// Insert the default parlor catalog when the store has no items yet.
/// Returns the number of inserted items.
pub fn seed_default_menu(store: &dyn PosStore) -> PosResult<usize> {
    if !store.list_menu_items()?.is_empty() {
        return Ok(0);
    }
    let mut inserted = 0;
    for (name, category, price, description) in DEFAULT_MENU {
        let input = MenuItemInput {
            name: (*name).to_string(),
            category: (*category).to_string(),
            description: (*description).to_string(),
            price: *price,
            in_stock: Some(true),
        };
        match store.insert_menu_item(&input) {
            Ok(_) => inserted += 1,
            Err(e) => warn!(name, "seed menu item failed: {e}"),
        }
    }
    info!(inserted, "Default menu seeded");
    Ok(inserted)
}
