//! Heuristics for the date formats printed on receipts, plus the calendar
//! windows the analytics views bucket bills into.

use std::sync::OnceLock;

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;

/// Inclusive calendar range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// `Apr 5 - Apr 11`
    pub fn label(&self) -> String {
        format!("{} - {}", self.start.format("%b %-d"), self.end.format("%b %-d"))
    }
}

pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

fn short_date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d{2})/(\d{2})/(\d{2})$").expect("static regex is valid")
    })
}

fn short_date_time_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d{2})/(\d{2})/(\d{2})\s\d{2}:\d{2}:\d{2}$").expect("static regex is valid")
    })
}

fn long_date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d{2})/(\d{2})/(\d{4})$").expect("static regex is valid")
    })
}

const FALLBACK_DATE_FORMATS: [&str; 3] = ["%b %d, %Y", "%d %b %Y", "%B %d, %Y"];
const FALLBACK_DATE_TIME_FORMATS: [&str; 3] =
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"];

/// Reads a receipt date. Anything that cannot be read as a real calendar date
/// resolves to `today`.
///
/// Slash dates are day-first unless the day-first reading is impossible and
/// the month-first one is not. Two-digit years are `20YY`; with
/// `assume_current_year` a two-digit-year date more than a year before
/// `today` is moved into the current year.
pub fn parse_bill_date(text: &str, today: NaiveDate, assume_current_year: bool) -> NaiveDate {
    try_parse_bill_date(text.trim(), today, assume_current_year).unwrap_or(today)
}

fn try_parse_bill_date(
    text: &str,
    today: NaiveDate,
    assume_current_year: bool,
) -> Option<NaiveDate> {
    if text.is_empty() {
        return None;
    }

    if let Some(captures) = short_date_pattern().captures(text) {
        let (day, month) = day_month_order(number(&captures[1])?, number(&captures[2])?);
        let year = 2000 + number(&captures[3])? as i32;
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        if assume_current_year && is_over_a_year_old(date, today) {
            // 29 Feb has no current-year twin outside leap years
            return NaiveDate::from_ymd_opt(today.year(), month, day).or(Some(date));
        }
        return Some(date);
    }

    if let Some(captures) = short_date_time_pattern().captures(text) {
        let day = number(&captures[1])?;
        let month = number(&captures[2])?;
        let year = 2000 + number(&captures[3])? as i32;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }

    if let Some(captures) = long_date_pattern().captures(text) {
        let (day, month) = day_month_order(number(&captures[1])?, number(&captures[2])?);
        let year = captures[3].parse::<i32>().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if let Ok(stamp) = DateTime::parse_from_rfc3339(text) {
        return Some(stamp.date_naive());
    }
    FALLBACK_DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|stamp| stamp.date())
        .or_else(|| {
            FALLBACK_DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        })
}

/// `(day, month)` for the two leading slash-separated numbers.
fn day_month_order(first: u32, second: u32) -> (u32, u32) {
    if second > 12 && first <= 12 {
        (second, first)
    } else {
        (first, second)
    }
}

fn number(digits: &str) -> Option<u32> {
    digits.parse().ok()
}

fn is_over_a_year_old(date: NaiveDate, today: NaiveDate) -> bool {
    today
        .checked_sub_months(Months::new(12))
        .is_some_and(|year_ago| date < year_ago)
}

/// Sunday..Saturday of the week `weeks_ago` weeks before the one holding
/// `today`.
pub fn week_range(today: NaiveDate, weeks_ago: u32) -> DateRange {
    let back = u64::from(today.weekday().num_days_from_sunday()) + 7 * u64::from(weeks_ago);
    let start = today.checked_sub_days(Days::new(back)).unwrap_or(NaiveDate::MIN);
    let end = start.checked_add_days(Days::new(6)).unwrap_or(NaiveDate::MAX);
    DateRange { start, end }
}

/// First..last day of the calendar month `months_ago` months before `today`.
pub fn month_range(today: NaiveDate, months_ago: u32) -> DateRange {
    let this_month = today.with_day(1).unwrap_or(today);
    let start = this_month
        .checked_sub_months(Months::new(months_ago))
        .unwrap_or(NaiveDate::MIN);
    let end = start
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(NaiveDate::MAX);
    DateRange { start, end }
}

/// The last `days` days up to and including `today`.
pub fn since_days(today: NaiveDate, days: u32) -> DateRange {
    DateRange {
        start: today
            .checked_sub_days(Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MIN),
        end: today,
    }
}

/// `April 2026`
pub fn month_label(date: NaiveDate) -> String {
    date.format("%B %Y").to_string()
}
