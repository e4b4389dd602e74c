//! Seller revenue statistics.

use std::fmt::Write;

use common::models::RevenueStats;
use common::utils::format_vnd;

use crate::app::AppState;
use crate::error::Result;

pub async fn revenue(app: &AppState, period: Option<&str>) -> Result<RevenueStats> {
    app.require_session()?;
    app.intercept(app.api.revenue_stats(period).await)
}

/// Plain-text rendering of the three series.
pub fn render(stats: &RevenueStats) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Revenue");
    if stats.revenue_total.is_empty() {
        let _ = writeln!(out, "  (no data)");
    }
    for point in &stats.revenue_total {
        let _ = writeln!(out, "  {:<12} {:>16}", point.month, format_vnd(point.total));
    }

    let _ = writeln!(out, "Sold by category");
    if stats.quantity_by_category.is_empty() {
        let _ = writeln!(out, "  (no data)");
    }
    for row in &stats.quantity_by_category {
        let _ = writeln!(out, "  {:<24} {:>6}", row.category, row.quantity);
    }

    let _ = writeln!(out, "Sold by tag");
    if stats.quantity_by_tag.is_empty() {
        let _ = writeln!(out, "  (no data)");
    }
    for row in &stats.quantity_by_tag {
        let _ = writeln!(out, "  {:<24} {:>6}", row.tag, row.quantity);
    }

    out
}
