//! Revenue aggregation over half-open time windows.
//!
//! Everything here is a pure function of the order slices and a [`Window`].
//! Orders count when `status = completed` or `payment_status = paid`;
//! advance orders contribute per their recognition rule and are keyed on
//! `created_at`, never on the delivery date.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;

use crate::error::{PosError, PosResult};
use crate::models::{round_money, AdvanceOrder, Order};

/// `[start, end)` in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// UTC instant of local midnight starting `date` in `tz`. A midnight that
/// falls in a DST gap is read as UTC.
pub(crate) fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

/// `at - by`, clamped to the earliest representable instant.
fn saturating_sub(at: DateTime<Utc>, by: Duration) -> DateTime<Utc> {
    at.checked_sub_signed(by).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

impl Window {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Local midnight of `now`'s day up to `now`.
    pub fn today<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        let start = local_midnight(&now.timezone(), now.date_naive());
        Self::new(start, now.with_timezone(&Utc))
    }

    /// The trailing `days` days ending at `now`.
    pub fn last_days<Tz: TimeZone>(now: &DateTime<Tz>, days: i64) -> Self {
        let end = now.with_timezone(&Utc);
        let start = Duration::try_days(days)
            .map_or(DateTime::<Utc>::MIN_UTC, |span| saturating_sub(end, span));
        Self::new(start, end)
    }

    pub fn week<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        Self::last_days(now, 7)
    }

    pub fn month<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        Self::last_days(now, 30)
    }

    /// Inclusive calendar range: `from` midnight to the midnight after `to`.
    pub fn date_range<Tz: TimeZone>(tz: &Tz, from: NaiveDate, to: NaiveDate) -> PosResult<Self> {
        if to < from {
            return Err(PosError::validation(format!(
                "Invalid date range: {from} is after {to}"
            )));
        }
        let after = to
            .succ_opt()
            .ok_or_else(|| PosError::validation(format!("Date out of range: {to}")))?;
        Ok(Self::new(local_midnight(tz, from), local_midnight(tz, after)))
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// The window of equal length immediately before this one.
    pub fn previous(&self) -> Self {
        Self::new(saturating_sub(self.start, self.duration()), self.start)
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }
}

fn orders_in<'a>(orders: &'a [Order], window: &'a Window) -> impl Iterator<Item = &'a Order> {
    orders
        .iter()
        .filter(move |o| o.counts_as_sale() && window.contains(o.created_at))
}

fn advances_in<'a>(
    advances: &'a [AdvanceOrder],
    window: &'a Window,
) -> impl Iterator<Item = &'a AdvanceOrder> {
    advances
        .iter()
        .filter(move |a| a.counts_as_sale() && window.contains(a.created_at))
}

/// Recognized revenue in `window`.
pub fn revenue(orders: &[Order], advances: &[AdvanceOrder], window: &Window) -> f64 {
    let from_orders: f64 = orders_in(orders, window).map(|o| o.total_amount).sum();
    let from_advances: f64 = advances_in(advances, window)
        .map(AdvanceOrder::recognized_revenue)
        .sum();
    round_money(from_orders + from_advances)
}

pub fn order_count(orders: &[Order], advances: &[AdvanceOrder], window: &Window) -> usize {
    orders_in(orders, window).count() + advances_in(advances, window).count()
}

/// One customer per counted order; walk-ins are not deduplicated.
pub fn customer_count(orders: &[Order], advances: &[AdvanceOrder], window: &Window) -> usize {
    order_count(orders, advances, window)
}

/// Percent change from `previous` to `current`; 0 when there is no
/// previous revenue.
pub fn growth_rate(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    round_money((current - previous) / previous * 100.0)
}

/// Growth of `window` against the window just before it.
pub fn revenue_growth(orders: &[Order], advances: &[AdvanceOrder], window: &Window) -> f64 {
    let current = revenue(orders, advances, window);
    let previous = revenue(orders, advances, &window.previous());
    growth_rate(current, previous)
}
