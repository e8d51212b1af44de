use anyhow::{anyhow, Result};
use chrono::prelude::*;

/// Helpers for the command line front end

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y.%m.%d", "%Y/%m/%d"];
const TIME_FORMATS: [&str; 2] = ["%H:%M", "%H:%M:%S"];

// ===== STRING UTILITIES =====

/// Truncates a string to a maximum number of characters, adding "..." if truncated
pub fn truncate_string(s: &str, max_length: usize) -> String {
    if s.chars().count() <= max_length {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_length.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

// ===== DATE/TIME UTILITIES =====

/// Parses a date in YYYY-MM-DD, YYYY.MM.DD or YYYY/MM/DD format
pub fn parse_date(date_str: &str) -> Result<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date_str, format).ok())
        .ok_or_else(|| {
            anyhow!(
                "Invalid date format: {}. Please use YYYY-MM-DD, YYYY.MM.DD, or YYYY/MM/DD format.",
                date_str
            )
        })
}

/// Parses `<date> <time>` or `<date>T<time>`, with the time as HH:MM or HH:MM:SS
pub fn parse_datetime(value: &str) -> Result<NaiveDateTime> {
    let (date_part, time_part) = value
        .split_once(|c| c == ' ' || c == 'T')
        .ok_or_else(|| anyhow!("Invalid date and time: {}. Please use YYYY-MM-DD HH:MM.", value))?;
    let date = parse_date(date_part)?;
    let time = TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(time_part, format).ok())
        .ok_or_else(|| anyhow!("Invalid time: {}. Please use HH:MM.", time_part))?;
    Ok(date.and_time(time))
}

/// Today's date unless one is given
pub fn date_or_today(date: Option<&str>) -> Result<NaiveDate> {
    match date {
        Some(date) => parse_date(date),
        None => Ok(Local::now().date_naive()),
    }
}

/// Gets a friendly weekday name from a date
pub fn get_weekday_name(date: &NaiveDate) -> String {
    match date.weekday() {
        Weekday::Mon => "Monday".to_string(),
        Weekday::Tue => "Tuesday".to_string(),
        Weekday::Wed => "Wednesday".to_string(),
        Weekday::Thu => "Thursday".to_string(),
        Weekday::Fri => "Friday".to_string(),
        Weekday::Sat => "Saturday".to_string(),
        Weekday::Sun => "Sunday".to_string(),
    }
}

// ===== FORMATTING UTILITIES =====

/// Formats minutes as hours for display
pub fn format_minutes(minutes: i64) -> String {
    let hours = minutes / 60;
    let rest = minutes % 60;
    if rest == 0 {
        format!("{}h", hours)
    } else {
        format!("{}h {:02}m", hours, rest)
    }
}
