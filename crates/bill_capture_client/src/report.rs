//! Plain-text rendering of bill listings and spending analytics.

use std::fmt::Write;

use bill_capture_core::analytics::{
    format_currency, format_percentage, top_categories, Dashboard, ExpensePeriod,
    SpendingSummary,
};
use bill_capture_core::contract::{Bill, NOT_AVAILABLE, UNKNOWN_DATE};

const TOP_CATEGORY_LIMIT: usize = 5;

/// One line per bill: id, date, store, total, status.
pub fn render_bill_list(bills: &[Bill]) -> String {
    if bills.is_empty() {
        return "No bills found.\n".to_string();
    }
    let mut out = String::new();
    for bill in bills {
        let _ = writeln!(
            out,
            "{:<36}  {:<24}  {:<24}  {:>10}  {}",
            bill.bill_id,
            bill.effective_date().unwrap_or(UNKNOWN_DATE),
            bill.store_name.as_deref().unwrap_or(NOT_AVAILABLE),
            bill.total_amount.as_deref().unwrap_or("-"),
            bill.status
                .as_ref()
                .map(|status| status.as_str())
                .unwrap_or("unknown"),
        );
    }
    out
}

pub fn render_bill_detail(bill: &Bill) -> String {
    let mut out = String::new();
    let field = |value: &Option<String>| value.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string());
    let _ = writeln!(out, "Bill      {}", bill.bill_id);
    let _ = writeln!(out, "Store     {}", field(&bill.store_name));
    let _ = writeln!(out, "Phone     {}", field(&bill.store_phone));
    let _ = writeln!(out, "Date      {}", field(&bill.purchase_date));
    let _ = writeln!(out, "Subtotal  {}", field(&bill.subtotal));
    let _ = writeln!(out, "Discount  {}", field(&bill.discount));
    let _ = writeln!(out, "Total     {}", field(&bill.total_amount));
    if let Some(payment) = &bill.payment_details {
        let _ = writeln!(out, "Card      {} {}", payment.card_type, payment.card_number);
    }
    if !bill.updated_items.is_empty() {
        let _ = writeln!(out, "Items");
        for item in &bill.updated_items {
            let _ = writeln!(
                out,
                "  {:<32} {:>10}  {}",
                item.item_name, item.item_price, item.category
            );
        }
    } else if !bill.items.is_empty() {
        let _ = writeln!(out, "Items (uncategorized)");
        for item in &bill.items {
            let _ = writeln!(out, "  {:<32} {:>10}", item.item_name, item.item_price);
        }
    }
    out
}

pub fn render_dashboard(dashboard: &Dashboard) -> String {
    let mut out = String::new();
    render_summary(&mut out, "Last 7 days", &dashboard.weekly);
    out.push('\n');
    render_summary(&mut out, "Last 30 days", &dashboard.monthly);
    out
}

fn render_summary(out: &mut String, title: &str, summary: &SpendingSummary) {
    let _ = writeln!(
        out,
        "{title}: {} across {} bill(s)",
        format_currency(summary.total_amount),
        summary.bill_count
    );
    for category in top_categories(summary, TOP_CATEGORY_LIMIT) {
        let _ = writeln!(
            out,
            "  {:<20} {:>10} {:>7}  ({} item(s))",
            category.name,
            format_currency(category.amount),
            format_percentage(category.percentage),
            category.count
        );
    }
}

pub fn render_periods(periods: &[ExpensePeriod]) -> String {
    let mut out = String::new();
    for period in periods {
        let _ = writeln!(
            out,
            "{:<20} {:>10}  {} bill(s)",
            period.label,
            format_currency(period.total_amount),
            period.bill_ids.len()
        );
        for (category, amount) in &period.categories {
            let _ = writeln!(out, "  {:<18} {:>10}", category, format_currency(*amount));
        }
    }
    out
}
