//! Spending summaries over a user's bills.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::contract::{Bill, UNCATEGORIZED};
use crate::dates::{month_label, month_range, parse_bill_date, since_days, week_range, DateRange};

const PERIOD_COUNT: u32 = 4;
const WEEKLY_WINDOW_DAYS: u32 = 7;
const MONTHLY_WINDOW_DAYS: u32 = 30;

/// Reads a printed amount such as `$ 12.30`, ignoring currency symbols.
pub fn parse_amount(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '$' | '£' | '€') && !c.is_whitespace())
        .collect();
    cleaned.parse::<f64>().ok().filter(|value| value.is_finite())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub amount: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendingSummary {
    pub total_amount: f64,
    pub bill_count: usize,
    pub categories: BTreeMap<String, CategoryTotal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopCategory {
    pub name: String,
    pub amount: f64,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dashboard {
    pub weekly: SpendingSummary,
    pub monthly: SpendingSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodView {
    Week,
    Month,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpensePeriod {
    pub key: String,
    pub label: String,
    pub range: DateRange,
    pub bill_ids: Vec<String>,
    pub total_amount: f64,
    pub categories: BTreeMap<String, f64>,
}

/// Categorized items when categorization ran, else the raw OCR items.
fn priced_items(bill: &Bill) -> Vec<(&str, &str)> {
    if bill.updated_items.is_empty() {
        bill.items
            .iter()
            .map(|item| (UNCATEGORIZED, item.item_price.as_str()))
            .collect()
    } else {
        bill.updated_items
            .iter()
            .map(|item| {
                let category = item.category.trim();
                let category = if category.is_empty() {
                    UNCATEGORIZED
                } else {
                    category
                };
                (category, item.item_price.as_str())
            })
            .collect()
    }
}

pub fn summarize<'a>(bills: impl IntoIterator<Item = &'a Bill>) -> SpendingSummary {
    let mut summary = SpendingSummary::default();
    for bill in bills {
        summary.bill_count += 1;
        if let Some(amount) = bill.total_amount.as_deref().and_then(parse_amount) {
            summary.total_amount += amount;
        }
        for (category, price) in priced_items(bill) {
            let Some(price) = parse_amount(price) else {
                continue;
            };
            let entry = summary.categories.entry(category.to_string()).or_default();
            entry.amount += price;
            entry.count += 1;
        }
    }
    summary
}

/// Largest categories first, each with its share of the summary total.
pub fn top_categories(summary: &SpendingSummary, limit: usize) -> Vec<TopCategory> {
    let mut ranked: Vec<TopCategory> = summary
        .categories
        .iter()
        .map(|(name, total)| TopCategory {
            name: name.clone(),
            amount: total.amount,
            count: total.count,
            percentage: if summary.total_amount > 0.0 {
                total.amount / summary.total_amount * 100.0
            } else {
                0.0
            },
        })
        .collect();
    ranked.sort_by(|left, right| right.amount.total_cmp(&left.amount));
    ranked.truncate(limit);
    ranked
}

fn bill_date(bill: &Bill, today: NaiveDate) -> NaiveDate {
    parse_bill_date(bill.effective_date().unwrap_or_default(), today, true)
}

/// Weekly (last 7 days) and monthly (last 30 days) summaries over completed
/// bills.
pub fn dashboard(bills: &[Bill], today: NaiveDate) -> Dashboard {
    let weekly = since_days(today, WEEKLY_WINDOW_DAYS);
    let monthly = since_days(today, MONTHLY_WINDOW_DAYS);
    let completed: Vec<(&Bill, NaiveDate)> = bills
        .iter()
        .filter(|bill| bill.is_completed())
        .map(|bill| (bill, bill_date(bill, today)))
        .collect();

    Dashboard {
        weekly: summarize(
            completed
                .iter()
                .filter(|(_, date)| weekly.contains(*date))
                .map(|(bill, _)| *bill),
        ),
        monthly: summarize(
            completed
                .iter()
                .filter(|(_, date)| monthly.contains(*date))
                .map(|(bill, _)| *bill),
        ),
    }
}

/// The four most recent weeks (Sunday..Saturday) or calendar months, newest
/// first. Category amounts only count bills whose total could be read.
pub fn grouped_expenses(bills: &[Bill], view: PeriodView, today: NaiveDate) -> Vec<ExpensePeriod> {
    let dated: Vec<(&Bill, NaiveDate)> = bills
        .iter()
        .filter(|bill| bill.is_completed())
        .map(|bill| (bill, bill_date(bill, today)))
        .collect();
    if dated.is_empty() {
        return Vec::new();
    }

    (0..PERIOD_COUNT)
        .map(|offset| {
            let (key, range, label) = match view {
                PeriodView::Week => {
                    let range = week_range(today, offset);
                    (format!("week-{offset}"), range, range.label())
                }
                PeriodView::Month => {
                    let range = month_range(today, offset);
                    (format!("month-{offset}"), range, month_label(range.start))
                }
            };

            let mut period = ExpensePeriod {
                key,
                label,
                range,
                bill_ids: Vec::new(),
                total_amount: 0.0,
                categories: BTreeMap::new(),
            };
            for (bill, _) in dated.iter().filter(|(_, date)| range.contains(*date)) {
                period.bill_ids.push(bill.bill_id.clone());
                let Some(amount) = bill.total_amount.as_deref().and_then(parse_amount) else {
                    continue;
                };
                period.total_amount += amount;
                for (category, price) in priced_items(bill) {
                    if let Some(price) = parse_amount(price) {
                        *period.categories.entry(category.to_string()).or_default() += price;
                    }
                }
            }
            period
        })
        .collect()
}

pub fn format_currency(amount: f64) -> String {
    if amount.is_finite() {
        format!("${amount:.2}")
    } else {
        "$0.00".to_string()
    }
}

pub fn format_percentage(value: f64) -> String {
    if value.is_finite() {
        format!("{value:.1}%")
    } else {
        "0.0%".to_string()
    }
}
