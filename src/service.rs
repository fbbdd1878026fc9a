//! Application state.
//!
//! `PosService` owns the store handle, the active cart and the runtime
//! configuration. It is built once at startup and shared (the desktop shell
//! hands it to Tauri as managed state). Every method is a thin wrapper that
//! supplies the clock, the tax rate and the cart lock to the domain modules.

use chrono::{Local, Utc};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

use crate::advance::{self, AdvanceBooking};
use crate::auth::{self, Registration, Session, UserAccount};
use crate::cart::{Cart, CartSummary};
use crate::config::AppConfig;
use crate::dashboard::{self, DashboardStats};
use crate::diagnostics::{self, StoreHealth};
use crate::error::{PosError, PosResult};
use crate::held;
use crate::menu;
use crate::models::{
    AdvanceOrder, AdvanceStatus, HeldOrder, MenuItem, MenuItemInput, Order, OrderStatus,
    OrderType, PaymentMethod,
};
use crate::notifications::{self, Notification, NotificationKind};
use crate::orders::{self, OrderFilter};
use crate::reports::{self, ExportFormat, ReportData, ReportPeriod};
use crate::store::{self, PosStore};

pub struct PosService {
    store: Arc<dyn PosStore>,
    cart: Mutex<Cart>,
    config: AppConfig,
}

impl PosService {
    /// Wrap an opened store, seeding the default menu when configured.
    pub fn new(store: Arc<dyn PosStore>, config: AppConfig) -> PosResult<Self> {
        if config.seed_menu {
            menu::seed_default_menu(store.as_ref())?;
        }
        info!(
            backend = store.backend_name(),
            tax_rate = config.tax_rate,
            "POS service ready"
        );
        Ok(Self {
            store,
            cart: Mutex::new(Cart::new(config.tax_rate)),
            config,
        })
    }

    /// Open the configured store and build the service on top of it.
    pub fn open(config: AppConfig) -> PosResult<Self> {
        let store = store::open_store(&config)?;
        Self::new(store, config)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn PosStore {
        self.store.as_ref()
    }

    /// Shared handle for background tasks.
    pub fn store_handle(&self) -> Arc<dyn PosStore> {
        self.store.clone()
    }

    fn cart(&self) -> PosResult<MutexGuard<'_, Cart>> {
        Ok(self.cart.lock()?)
    }

    // -- menu --------------------------------------------------------------

    pub fn list_menu(&self, category: Option<&str>) -> PosResult<Vec<MenuItem>> {
        menu::items_in_category(self.store(), category)
    }

    pub fn menu_categories(&self) -> PosResult<Vec<String>> {
        menu::categories(self.store())
    }

    pub fn add_menu_item(&self, input: &MenuItemInput) -> PosResult<MenuItem> {
        menu::add_item(self.store(), input)
    }

    pub fn update_menu_item(&self, id: i64, input: &MenuItemInput) -> PosResult<MenuItem> {
        menu::update_item(self.store(), id, input)
    }

    pub fn delete_menu_item(&self, id: i64) -> PosResult<()> {
        menu::delete_item(self.store(), id)
    }

    pub fn set_menu_item_stock(&self, id: i64, in_stock: bool) -> PosResult<MenuItem> {
        menu::set_in_stock(self.store(), id, in_stock)
    }

    // -- cart --------------------------------------------------------------

    pub fn cart_summary(&self) -> PosResult<CartSummary> {
        Ok(self.cart()?.summary())
    }

    pub fn cart_add_item(&self, menu_item_id: i64) -> PosResult<CartSummary> {
        let item = self
            .store
            .get_menu_item(menu_item_id)?
            .ok_or_else(|| PosError::not_found("menu item", menu_item_id))?;
        let mut cart = self.cart()?;
        cart.add_item(&item)?;
        Ok(cart.summary())
    }

    pub fn cart_set_quantity(&self, menu_item_id: i64, quantity: u32) -> PosResult<CartSummary> {
        let mut cart = self.cart()?;
        cart.set_quantity(menu_item_id, quantity)?;
        Ok(cart.summary())
    }

    pub fn cart_remove_item(&self, menu_item_id: i64) -> PosResult<CartSummary> {
        let mut cart = self.cart()?;
        cart.remove_item(menu_item_id)?;
        Ok(cart.summary())
    }

    pub fn cart_set_customer(
        &self,
        name: Option<String>,
        phone: Option<String>,
        table_number: Option<String>,
    ) -> PosResult<CartSummary> {
        let mut cart = self.cart()?;
        cart.set_customer(name, phone, table_number);
        Ok(cart.summary())
    }

    pub fn cart_set_discount(&self, amount: f64) -> PosResult<CartSummary> {
        let mut cart = self.cart()?;
        cart.set_discount(amount)?;
        Ok(cart.summary())
    }

    pub fn cart_clear(&self) -> PosResult<CartSummary> {
        let mut cart = self.cart()?;
        cart.clear();
        Ok(cart.summary())
    }

    // -- payment and orders ------------------------------------------------

    pub fn complete_payment(
        &self,
        payment_method: Option<PaymentMethod>,
        order_type: Option<OrderType>,
    ) -> PosResult<Order> {
        let mut cart = self.cart()?;
        orders::complete_payment(self.store(), &mut cart, payment_method, order_type, Utc::now())
    }

    pub fn list_orders(&self, filter: &OrderFilter) -> PosResult<Vec<Order>> {
        orders::list_orders(self.store(), filter)
    }

    pub fn recent_orders(&self, limit: Option<usize>) -> PosResult<Vec<Order>> {
        orders::recent_orders(self.store(), limit.unwrap_or(orders::DEFAULT_RECENT_LIMIT))
    }

    pub fn update_order_status(&self, id: &str, status: OrderStatus) -> PosResult<Order> {
        orders::update_order_status(self.store(), id, status, Utc::now())
    }

    pub fn refund_order(&self, id: &str) -> PosResult<Order> {
        orders::refund_order(self.store(), id, Utc::now())
    }

    // -- held orders -------------------------------------------------------

    pub fn hold_cart(&self, reason: Option<String>) -> PosResult<HeldOrder> {
        let mut cart = self.cart()?;
        held::hold_cart(self.store(), &mut cart, reason, Utc::now())
    }

    pub fn hold_order(&self, order_id: &str, reason: Option<String>) -> PosResult<HeldOrder> {
        held::hold_order(
            self.store(),
            order_id,
            reason,
            self.config.tax_rate,
            Utc::now(),
        )
    }

    /// Recall a held order into the active cart. The active cart must be
    /// empty so nothing in progress is overwritten.
    pub fn recall_held(&self, held_id: &str) -> PosResult<CartSummary> {
        let mut cart = self.cart()?;
        if !cart.is_empty() {
            return Err(PosError::validation(
                "Hold or clear the current cart before recalling another order",
            ));
        }
        *cart = held::recall(self.store(), held_id, self.config.tax_rate, Utc::now())?;
        Ok(cart.summary())
    }

    pub fn delete_held(&self, held_id: &str) -> PosResult<()> {
        held::delete_held(self.store(), held_id, Utc::now())
    }

    pub fn list_held(&self) -> PosResult<Vec<HeldOrder>> {
        held::list_held(self.store())
    }

    // -- advance orders ----------------------------------------------------

    pub fn create_advance_order(&self, booking: AdvanceBooking) -> PosResult<AdvanceOrder> {
        advance::create_advance_order(self.store(), booking, Utc::now())
    }

    pub fn list_advance_orders(&self) -> PosResult<Vec<AdvanceOrder>> {
        advance::list_advance_orders(self.store())
    }

    pub fn set_advance_status(&self, id: &str, status: AdvanceStatus) -> PosResult<AdvanceOrder> {
        advance::set_advance_status(self.store(), id, status, Utc::now())
    }

    // -- notifications -----------------------------------------------------

    pub fn notifications(&self) -> PosResult<Vec<Notification>> {
        notifications::list_notifications(self.store(), &Local::now())
    }

    pub fn unread_notifications(&self) -> PosResult<usize> {
        notifications::count_unread(self.store(), &Local::now())
    }

    pub fn mark_notification_read(&self, kind: NotificationKind, id: &str) -> PosResult<()> {
        notifications::mark_read(self.store(), kind, id)
    }

    // -- reports -----------------------------------------------------------

    pub fn report(&self, period: ReportPeriod) -> PosResult<ReportData> {
        let orders = self.store.list_orders()?;
        let advances = self.store.list_advance_orders()?;
        reports::build_report(&orders, &advances, period, &Local::now())
    }

    /// Render the report for `period` without writing it.
    pub fn render_report(&self, period: ReportPeriod, format: ExportFormat) -> PosResult<String> {
        let report = self.report(period)?;
        Ok(match format {
            ExportFormat::Csv => reports::to_csv(&report, &self.config.currency_symbol),
            ExportFormat::Html => reports::to_html(
                &report,
                &self.config.currency_symbol,
                Local::now().date_naive(),
            ),
        })
    }

    /// Write the report under the export directory and return its path.
    pub fn export_report(&self, period: ReportPeriod, format: ExportFormat) -> PosResult<PathBuf> {
        let contents = self.render_report(period, format)?;
        let file_name = reports::export_file_name(&period, format);
        reports::write_export(&self.config.export_dir(), &file_name, &contents)
    }

    // -- dashboard / diagnostics -------------------------------------------

    pub fn dashboard_stats(&self) -> PosResult<DashboardStats> {
        dashboard::compute_stats(self.store(), &Local::now())
    }

    pub fn store_health(&self) -> PosResult<StoreHealth> {
        diagnostics::get_store_health(self.store(), &self.config)
    }

    // -- auth --------------------------------------------------------------

    pub fn register(&self, form: Registration) -> PosResult<UserAccount> {
        auth::register(self.store(), form)
    }

    pub fn login(&self, username: &str, password: &str, role: &str) -> PosResult<Session> {
        auth::login(self.store(), username, password, role)
    }

    pub fn logout(&self) -> PosResult<()> {
        auth::logout(self.store())
    }

    pub fn current_session(&self) -> PosResult<Option<Session>> {
        auth::current_session(self.store())
    }
}
