//! Derived marketing ratios.
//!
//! Every function here returns a finite value. A zero, negative or missing
//! denominator yields 0 rather than NaN or infinity.

use crate::models::MonthlyAggregate;

/// Round half away from zero to two decimal places.
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let rounded = (value * 100.0).round() / 100.0;
    // Avoid emitting -0.0
    if rounded == 0.0 { 0.0 } else { rounded }
}

/// `numerator / denominator` rounded to two decimals, or 0 when the
/// denominator is not positive.
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if !(denominator > 0.0) || !numerator.is_finite() || !denominator.is_finite() {
        return 0.0;
    }
    round2(numerator / denominator)
}

pub fn roas(revenue: f64, spend: f64) -> f64 {
    ratio(revenue, spend)
}

pub fn cpa(spend: f64, conversions: f64) -> f64 {
    ratio(spend, conversions)
}

pub fn cpc(spend: f64, clicks: f64) -> f64 {
    ratio(spend, clicks)
}

/// Percentage change from `previous` to `current`.
///
/// Returns 0 when there is no previous period or it was 0.
pub fn mom_growth(current: f64, previous: Option<f64>) -> f64 {
    match previous {
        Some(previous) if previous != 0.0 && previous.is_finite() => {
            round2((current - previous) / previous * 100.0)
        }
        _ => 0.0,
    }
}

/// Sort `rows` by month ascending and fill in month-over-month spend and
/// revenue growth. The first month always gets 0.
pub fn apply_mom_growth(rows: &mut [MonthlyAggregate]) {
    rows.sort_by(|a, b| a.month.cmp(&b.month));

    let mut previous: Option<(f64, f64)> = None;
    for row in rows.iter_mut() {
        row.mom_spend_growth = mom_growth(row.total_spend, previous.map(|p| p.0));
        row.mom_revenue_growth = mom_growth(row.total_revenue, previous.map(|p| p.1));
        previous = Some((row.total_spend, row.total_revenue));
    }
}
