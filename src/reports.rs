//! Sales reports and their CSV / HTML exports.
//!
//! A report covers either the last N days or an inclusive calendar range.
//! Totals use the same inclusion rules as the dashboard (see
//! [`crate::revenue`]); the daily series has one bucket per local calendar
//! day in the window, including empty days.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{PosError, PosResult};
use crate::models::{round_money, AdvanceOrder, Order, OrderItem, OrderType};
use crate::revenue::{self, Window};

const TOP_PRODUCTS: usize = 5;

/// Longest report period, in days (about ten years).
pub const MAX_REPORT_DAYS: i64 = 3660;

fn too_long(days: i64) -> PosError {
    PosError::validation(format!(
        "Report period of {days} days exceeds the maximum of {MAX_REPORT_DAYS} days"
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum ReportPeriod {
    LastDays { days: u32 },
    Range { from: NaiveDate, to: NaiveDate },
}

impl ReportPeriod {
    pub fn window<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> PosResult<Window> {
        match *self {
            ReportPeriod::LastDays { days: 0 } => {
                Err(PosError::validation("Report period must be at least one day"))
            }
            ReportPeriod::LastDays { days } => {
                let days = i64::from(days);
                if days > MAX_REPORT_DAYS {
                    return Err(too_long(days));
                }
                Ok(Window::last_days(now, days))
            }
            ReportPeriod::Range { from, to } => {
                let days = (to - from).num_days() + 1;
                if days > MAX_REPORT_DAYS {
                    return Err(too_long(days));
                }
                Window::date_range(&now.timezone(), from, to)
            }
        }
    }

    /// File-name fragment: `7-days`, `01-Oct-2026-to-03-Oct-2026`.
    pub fn slug(&self) -> String {
        match self {
            ReportPeriod::LastDays { days } => format!("{days}-days"),
            ReportPeriod::Range { from, to } => format!(
                "{}-to-{}",
                from.format("%d-%b-%Y"),
                to.format("%d-%b-%Y")
            ),
        }
    }

    /// Heading text: `Last 7 days`, `01 Oct 2026 to 03 Oct 2026`.
    pub fn label(&self) -> String {
        match self {
            ReportPeriod::LastDays { days } => format!("Last {days} days"),
            ReportPeriod::Range { from, to } => format!(
                "{} to {}",
                from.format("%d %b %Y"),
                to.format("%d %b %Y")
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySales {
    pub date: NaiveDate,
    pub sales: f64,
    pub orders: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSales {
    pub name: String,
    pub sales: f64,
    pub quantity: u32,
}

impl ProductSales {
    pub fn average_price(&self) -> f64 {
        if self.quantity == 0 {
            return 0.0;
        }
        round_money(self.sales / f64::from(self.quantity))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTypeCount {
    pub order_type: OrderType,
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportData {
    pub period: ReportPeriod,
    pub window: Window,
    pub total_revenue: f64,
    pub total_orders: usize,
    pub total_customers: usize,
    pub avg_order_value: f64,
    pub daily_sales: Vec<DailySales>,
    pub top_products: Vec<ProductSales>,
    pub orders_by_type: Vec<OrderTypeCount>,
    pub revenue_growth: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Html,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Html => "html",
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

fn counted_orders<'a>(orders: &'a [Order], window: &Window) -> Vec<&'a Order> {
    orders
        .iter()
        .filter(|o| o.counts_as_sale() && window.contains(o.created_at))
        .collect()
}

fn counted_advances<'a>(advances: &'a [AdvanceOrder], window: &Window) -> Vec<&'a AdvanceOrder> {
    advances
        .iter()
        .filter(|a| a.counts_as_sale() && window.contains(a.created_at))
        .collect()
}

/// One bucket per local day touched by `window`.
pub fn daily_sales<Tz: TimeZone>(
    tz: &Tz,
    orders: &[Order],
    advances: &[AdvanceOrder],
    window: &Window,
) -> Vec<DailySales> {
    let local_day = |at: DateTime<Utc>| at.with_timezone(tz).date_naive();
    let first = local_day(window.start);
    let last_instant = window
        .end
        .checked_sub_signed(Duration::nanoseconds(1))
        .unwrap_or(window.end);
    let last = local_day(last_instant).max(first);

    let mut buckets: BTreeMap<NaiveDate, DailySales> = BTreeMap::new();
    let mut day = first;
    while day <= last {
        buckets.insert(
            day,
            DailySales {
                date: day,
                sales: 0.0,
                orders: 0,
            },
        );
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }

    let entries = counted_orders(orders, window)
        .into_iter()
        .map(|o| (o.created_at, o.total_amount))
        .chain(
            counted_advances(advances, window)
                .into_iter()
                .map(|a| (a.created_at, a.recognized_revenue())),
        );
    for (created_at, amount) in entries {
        if let Some(bucket) = buckets.get_mut(&local_day(created_at)) {
            bucket.sales = round_money(bucket.sales + amount);
            bucket.orders += 1;
        }
    }
    buckets.into_values().collect()
}

/// Best sellers by line revenue, at most five.
pub fn top_products(orders: &[Order], advances: &[AdvanceOrder], window: &Window) -> Vec<ProductSales> {
    let lines = counted_orders(orders, window)
        .into_iter()
        .flat_map(|o| o.items.iter())
        .chain(
            counted_advances(advances, window)
                .into_iter()
                .flat_map(|a| a.items.iter()),
        );

    let mut by_name: HashMap<String, ProductSales> = HashMap::new();
    for line in lines {
        let name = if line.name.trim().is_empty() {
            "Unknown Product".to_string()
        } else {
            line.name.clone()
        };
        let entry = by_name.entry(name.clone()).or_insert(ProductSales {
            name,
            sales: 0.0,
            quantity: 0,
        });
        entry.sales = round_money(entry.sales + OrderItem::total_price(line));
        entry.quantity = entry.quantity.saturating_add(line.quantity());
    }

    let mut products: Vec<ProductSales> = by_name.into_values().collect();
    products.sort_by(|a, b| b.sales.total_cmp(&a.sales).then_with(|| a.name.cmp(&b.name)));
    products.truncate(TOP_PRODUCTS);
    products
}

pub fn orders_by_type(
    orders: &[Order],
    advances: &[AdvanceOrder],
    window: &Window,
) -> Vec<OrderTypeCount> {
    let mut counts: BTreeMap<OrderType, usize> = BTreeMap::new();
    for order in counted_orders(orders, window) {
        *counts.entry(order.order_type).or_default() += 1;
    }
    let advance_count = counted_advances(advances, window).len();
    if advance_count > 0 {
        *counts.entry(OrderType::AdvanceOrder).or_default() += advance_count;
    }
    counts
        .into_iter()
        .map(|(order_type, count)| OrderTypeCount {
            order_type,
            label: order_type.label().to_string(),
            count,
        })
        .collect()
}

/// Compute the full report for `period` as seen at `now`.
pub fn build_report<Tz: TimeZone>(
    orders: &[Order],
    advances: &[AdvanceOrder],
    period: ReportPeriod,
    now: &DateTime<Tz>,
) -> PosResult<ReportData> {
    let window = period.window(now)?;
    let tz = now.timezone();
    let total_revenue = revenue::revenue(orders, advances, &window);
    let total_orders = revenue::order_count(orders, advances, &window);
    let avg_order_value = if total_orders > 0 {
        round_money(total_revenue / total_orders as f64)
    } else {
        0.0
    };
    Ok(ReportData {
        period,
        window,
        total_revenue,
        total_orders,
        total_customers: revenue::customer_count(orders, advances, &window),
        avg_order_value,
        daily_sales: daily_sales(&tz, orders, advances, &window),
        top_products: top_products(orders, advances, &window),
        orders_by_type: orders_by_type(orders, advances, &window),
        revenue_growth: revenue::revenue_growth(orders, advances, &window),
    })
}

// ---------------------------------------------------------------------------
// Exports
// ---------------------------------------------------------------------------

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_row(out: &mut String, fields: &[String]) {
    let row: Vec<String> = fields.iter().map(|f| csv_field(f)).collect();
    out.push_str(&row.join(","));
    out.push('\n');
}

fn money(currency: &str, amount: f64) -> String {
    format!("{currency}{amount:.2}")
}

pub fn to_csv(report: &ReportData, currency: &str) -> String {
    let mut out = String::new();
    csv_row(&mut out, &["Metric".into(), "Value".into()]);
    csv_row(&mut out, &["Total Revenue".into(), money(currency, report.total_revenue)]);
    csv_row(&mut out, &["Total Orders".into(), report.total_orders.to_string()]);
    csv_row(&mut out, &["Total Customers".into(), report.total_customers.to_string()]);
    csv_row(
        &mut out,
        &["Average Order Value".into(), money(currency, report.avg_order_value)],
    );
    csv_row(
        &mut out,
        &["Revenue Growth".into(), format!("{:.1}%", report.revenue_growth)],
    );
    out.push('\n');
    csv_row(&mut out, &["Top Products".into(), String::new()]);
    csv_row(&mut out, &["Product Name".into(), "Sales".into(), "Quantity".into()]);
    for product in &report.top_products {
        csv_row(
            &mut out,
            &[
                product.name.clone(),
                money(currency, product.sales),
                product.quantity.to_string(),
            ],
        );
    }
    out.push('\n');
    csv_row(&mut out, &["Orders by Type".into(), String::new()]);
    csv_row(&mut out, &["Type".into(), "Count".into()]);
    for entry in &report.orders_by_type {
        csv_row(&mut out, &[entry.label.clone(), entry.count.to_string()]);
    }
    out
}

pub fn html_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const HTML_STYLE: &str = "body { font-family: Arial, sans-serif; margin: 20px; }
.header { text-align: center; margin-bottom: 30px; }
.metrics { display: grid; grid-template-columns: repeat(2, 1fr); gap: 20px; margin-bottom: 30px; }
.metric { border: 1px solid #ddd; padding: 15px; border-radius: 8px; }
.table { width: 100%; border-collapse: collapse; margin-bottom: 30px; }
.table th, .table td { border: 1px solid #ddd; padding: 8px; text-align: left; }
.table th { background-color: #f5f5f5; }";

/// Printable report page.
pub fn to_html(report: &ReportData, currency: &str, generated_on: NaiveDate) -> String {
    let cur = html_escape(currency);
    let mut html = String::new();
    let _ = write!(
        html,
        "<html>\n<head>\n<title>Business Report</title>\n<style>\n{HTML_STYLE}\n</style>\n</head>\n<body>\n"
    );
    let _ = write!(
        html,
        "<div class=\"header\">\n<h1>Business Report</h1>\n<p>Period: {}</p>\n<p>Generated on: {}</p>\n</div>\n",
        html_escape(&report.period.label()),
        generated_on.format("%d %b %Y"),
    );

    html.push_str("<div class=\"metrics\">\n");
    for (title, value) in [
        ("Total Revenue", format!("{cur}{:.2}", report.total_revenue)),
        ("Total Orders", report.total_orders.to_string()),
        ("Total Customers", report.total_customers.to_string()),
        ("Average Order Value", format!("{cur}{:.2}", report.avg_order_value)),
        ("Revenue Growth", format!("{:.1}%", report.revenue_growth)),
    ] {
        let _ = write!(
            html,
            "<div class=\"metric\"><h3>{title}</h3><p>{value}</p></div>\n"
        );
    }
    html.push_str("</div>\n");

    html.push_str(
        "<h2>Top Products</h2>\n<table class=\"table\">\n<thead><tr><th>Product Name</th><th>Sales</th><th>Quantity</th><th>Avg Price</th></tr></thead>\n<tbody>\n",
    );
    for product in &report.top_products {
        let _ = write!(
            html,
            "<tr><td>{}</td><td>{cur}{:.2}</td><td>{}</td><td>{cur}{:.2}</td></tr>\n",
            html_escape(&product.name),
            product.sales,
            product.quantity,
            product.average_price(),
        );
    }
    html.push_str("</tbody>\n</table>\n");

    html.push_str(
        "<h2>Orders by Type</h2>\n<table class=\"table\">\n<thead><tr><th>Type</th><th>Count</th></tr></thead>\n<tbody>\n",
    );
    for entry in &report.orders_by_type {
        let _ = write!(
            html,
            "<tr><td>{}</td><td>{}</td></tr>\n",
            html_escape(&entry.label),
            entry.count
        );
    }
    html.push_str("</tbody>\n</table>\n</body>\n</html>\n");
    html
}

/// `reports-<range>.<ext>`
pub fn export_file_name(period: &ReportPeriod, format: ExportFormat) -> String {
    format!("reports-{}.{}", period.slug(), format.extension())
}

/// Write an export under `dir`, creating it if needed.
pub fn write_export(dir: &Path, file_name: &str, contents: &str) -> PosResult<PathBuf> {
    if file_name.is_empty() || file_name.contains(['/', '\\']) || file_name.starts_with('.') {
        return Err(PosError::validation(format!(
            "Invalid export file name: {file_name}"
        )));
    }
    fs::create_dir_all(dir)?;
    let path = dir.join(file_name);
    fs::write(&path, contents)?;
    info!(path = %path.display(), bytes = contents.len(), "Report exported");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AdvanceStatus, OrderStatus, PaymentMethod, PaymentStatus};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, day, hour, 0, 0).unwrap()
    }

    fn order(order_type: OrderType, items: Vec<OrderItem>, created_at: DateTime<Utc>) -> Order {
        let total: f64 = items.iter().map(OrderItem::total_price).sum();
        Order {
            id: format!("o-{created_at}"),
            order_number: "ORD-1".into(),
            customer_name: None,
            customer_phone: None,
            table_number: None,
            order_type,
            status: OrderStatus::Completed,
            items,
            subtotal: total,
            discount_amount: 0.0,
            tax_amount: 0.0,
            total_amount: total,
            payment_method: Some(PaymentMethod::Card),
            payment_status: PaymentStatus::Paid,
            created_at,
            updated_at: created_at,
        }
    }

    fn sample() -> (Vec<Order>, Vec<AdvanceOrder>) {
        let orders = vec![
            order(
                OrderType::DineIn,
                vec![OrderItem::new(1, "Banana Split", "Sundaes", 9.5, 2)],
                at(16, 10),
            ),
            order(
                OrderType::Takeaway,
                vec![
                    OrderItem::new(2, "Cold Coffee", "Beverages", 4.0, 1),
                    OrderItem::new(1, "Banana Split", "Sundaes", 9.5, 1),
                ],
                at(17, 12),
            ),
        ];
        let advances = vec![AdvanceOrder {
            id: "adv-1".into(),
            customer_name: "Asha".into(),
            customer_phone: "555".into(),
            customer_email: None,
            delivery_date: NaiveDate::from_ymd_opt(2026, 10, 30).unwrap(),
            delivery_time: None,
            items: vec![OrderItem::new(9, "Party Tub", "Family Packs", 40.0, 1)],
            total_amount: 40.0,
            advance_amount: 15.0,
            remaining_amount: 25.0,
            status: AdvanceStatus::Confirmed,
            special_instructions: None,
            created_at: at(17, 15),
            updated_at: at(17, 15),
        }];
        (orders, advances)
    }

    #[test]
    fn report_totals_and_series() {
        let (orders, advances) = sample();
        let now = at(18, 12);
        let report =
            build_report(&orders, &advances, ReportPeriod::LastDays { days: 3 }, &now).unwrap();
        assert_eq!(report.total_revenue, 19.0 + 13.5 + 15.0);
        assert_eq!(report.total_orders, 3);
        assert_eq!(report.total_customers, 3);
        assert_eq!(report.daily_sales.len(), 4);
        let oct17 = report
            .daily_sales
            .iter()
            .find(|d| d.date == NaiveDate::from_ymd_opt(2026, 10, 17).unwrap())
            .unwrap();
        assert_eq!(oct17.orders, 2);
        assert_eq!(oct17.sales, 28.5);

        assert_eq!(report.top_products[0].name, "Party Tub");
        assert_eq!(report.top_products[1].name, "Banana Split");
        assert_eq!(report.top_products[1].quantity, 3);
        assert_eq!(report.top_products[1].average_price(), 9.5);

        let labels: Vec<(&str, usize)> = report
            .orders_by_type
            .iter()
            .map(|t| (t.label.as_str(), t.count))
            .collect();
        assert_eq!(labels, vec![("Dine in", 1), ("Takeaway", 1), ("Advance order", 1)]);
    }

    #[test]
    fn custom_range_buckets_each_day() {
        let (orders, advances) = sample();
        let period = ReportPeriod::Range {
            from: NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
            to: NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
        };
        let report = build_report(&orders, &advances, period, &at(18, 12)).unwrap();
        assert_eq!(report.daily_sales.len(), 1);
        assert_eq!(report.total_revenue, 19.0);
        assert_eq!(export_file_name(&period, ExportFormat::Csv), "reports-16-Oct-2026-to-16-Oct-2026.csv");
    }

    #[test]
    fn zero_day_period_rejected() {
        assert!(build_report(&[], &[], ReportPeriod::LastDays { days: 0 }, &at(18, 12)).is_err());
    }

    #[test]
    fn overlong_periods_rejected() {
        let now = at(18, 12);
        assert!(matches!(
            ReportPeriod::LastDays { days: 100_000_000 }.window(&now),
            Err(PosError::Validation(_))
        ));
        assert!(matches!(
            ReportPeriod::LastDays { days: u32::MAX }.window(&now),
            Err(PosError::Validation(_))
        ));
        let twenty_years = ReportPeriod::Range {
            from: NaiveDate::from_ymd_opt(2006, 1, 1).unwrap(),
            to: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        };
        assert!(matches!(twenty_years.window(&now), Err(PosError::Validation(_))));

        let longest = ReportPeriod::LastDays { days: MAX_REPORT_DAYS as u32 };
        let report = build_report(&[], &[], longest, &now).unwrap();
        assert_eq!(report.total_revenue, 0.0);
    }

    #[test]
    fn csv_contains_metrics_and_products() {
        let (orders, advances) = sample();
        let report =
            build_report(&orders, &advances, ReportPeriod::LastDays { days: 7 }, &at(18, 12)).unwrap();
        let csv = to_csv(&report, "₹");
        assert!(csv.starts_with("Metric,Value\n"));
        assert!(csv.contains("Total Revenue,₹47.50"));
        assert!(csv.contains("Banana Split,₹28.50,3"));
        assert!(csv.contains("Takeaway,1"));
    }

    #[test]
    fn csv_quotes_commas() {
        assert_eq!(csv_field("Nuts, mixed"), "\"Nuts, mixed\"");
        assert_eq!(csv_field("5\" cone"), "\"5\"\" cone\"");
    }

    #[test]
    fn html_escapes_product_names() {
        let (mut orders, advances) = sample();
        orders[0].items = vec![OrderItem::new(7, "<b>Fudge</b> & Co", "Sundaes", 9.5, 2)];
        let report =
            build_report(&orders, &advances, ReportPeriod::LastDays { days: 7 }, &at(18, 12)).unwrap();
        let html = to_html(&report, "$", NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
        assert!(html.contains("&lt;b&gt;Fudge&lt;/b&gt; &amp; Co"));
        assert!(!html.contains("<b>Fudge"));
        assert!(html.contains("Period: Last 7 days"));
    }

    #[test]
    fn write_export_rejects_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_export(dir.path(), "reports-7-days.csv", "Metric,Value\n").unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "Metric,Value\n");
        assert!(write_export(dir.path(), "../escape.csv", "x").is_err());
    }
}
