//! Text formatting for dashboard data.
//!
//! These functions turn the structured views into plain text for logs and
//! terminals. They never touch the database.

use crate::core::{dashboard::DashboardView, expiration::ClassifiedService};
use chrono::NaiveDate;
use std::fmt::Write as _;

/// Formats an amount as dollars with two decimals, e.g. `$1,250.00`.
#[must_use]
pub fn format_currency(amount: f64) -> String {
    let sign = if amount < 0.0 { "-" } else { "" };
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    format!("{sign}${grouped}.{cents}")
}

/// Turns a `YYYY-MM` bucket key into a label like `Jan 2024`.
///
/// Keys that are not valid months are returned unchanged.
#[must_use]
pub fn format_month_label(month: &str) -> String {
    NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d")
        .map_or_else(|_| month.to_string(), |d| d.format("%b %Y").to_string())
}

/// Generates a bar showing a value relative to the largest value in a series.
///
/// Creates a text-based bar like: `[████████░░]`
#[must_use]
pub fn format_share_bar(value: f64, max: f64, bar_length: Option<usize>) -> String {
    let length = bar_length.unwrap_or(10);
    let share = if max > 0.0 {
        (value / max).clamp(0.0, 1.0)
    } else {
        0.0
    };

    // share ∈ [0, 1] and length is small, so the product fits in usize
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let filled = (share * length as f64).round() as usize;
    let empty = length.saturating_sub(filled);

    format!("[{}{}]", "█".repeat(filled), "░".repeat(empty))
}

/// One line per upcoming service: client, vehicle, service type and status.
#[must_use]
pub fn format_service_line(row: &ClassifiedService) -> String {
    format!(
        "{} | {} | {} | {}",
        row.item.client_name,
        row.item.vehicle_label(),
        row.item.service.service_type,
        row.classification.label
    )
}

/// Multi-line summary of a dashboard view.
#[must_use]
pub fn format_dashboard_summary(view: &DashboardView) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Clients: {} | Services: {} | Revenue: {}",
        view.totals.total_clients,
        view.totals.total_services,
        format_currency(view.totals.total_revenue)
    );
    let _ = writeln!(out, "Expiring soon: {}", view.expiring_soon_count);

    if !view.monthly_revenue.is_empty() {
        let peak = view
            .monthly_revenue
            .iter()
            .map(|m| m.revenue)
            .fold(0.0_f64, f64::max);
        out.push_str("Revenue by month:\n");
        for bucket in &view.monthly_revenue {
            let _ = writeln!(
                out,
                "  {} {} {}",
                format_month_label(&bucket.month),
                format_share_bar(bucket.revenue, peak, None),
                format_currency(bucket.revenue)
            );
        }
    }

    if !view.upcoming.is_empty() {
        out.push_str("Upcoming:\n");
        for row in &view.upcoming {
            let _ = writeln!(out, "  {}", format_service_line(row));
        }
    }

    out
}
