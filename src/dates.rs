use chrono::{DateTime, Datelike, Duration, Local, NaiveDate};

const MIN_YEAR: i32 = 1;
const MAX_YEAR: i32 = 9999;

/// Parses `YYYY-MM-DD`, or the date part of an RFC 3339 timestamp. Years outside
/// 1..=9999 count as malformed.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let date = match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => date,
        Err(_) => DateTime::parse_from_rfc3339(raw)
            .ok()?
            .with_timezone(&Local)
            .date_naive(),
    };
    (MIN_YEAR..=MAX_YEAR).contains(&date.year()).then_some(date)
}

pub fn parse_opt(raw: Option<&str>) -> Option<NaiveDate> {
    raw.and_then(parse_date)
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Signed whole days from `from` to `to`.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Saturates at the ends of the representable calendar.
pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    Duration::try_days(days)
        .and_then(|delta| date.checked_add_signed(delta))
        .unwrap_or(if days < 0 { NaiveDate::MIN } else { NaiveDate::MAX })
}

/// Monday and Sunday of the ISO week containing `date`.
pub fn week_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let offset = date.weekday().num_days_from_monday() as i64;
    let monday = add_days(date, -offset);
    (monday, add_days(monday, 6))
}

pub fn iso_week(date: NaiveDate) -> u32 {
    date.iso_week().week()
}

pub fn is_weekend(date: NaiveDate) -> bool {
    date.weekday().number_from_monday() >= 6
}
