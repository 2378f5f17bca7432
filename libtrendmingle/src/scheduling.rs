//! Scheduling and time parsing utilities
//!
//! All times are timezone-naive and interpreted in the viewer's local clock.
//! Natural-language phrases are resolved against the caller's `now` rather
//! than the system clock so that keying and display share one reference.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

use crate::error::{MingleError, Result};

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const TIME_FORMATS: &[&str] = &["%H:%M", "%H:%M:%S", "%I:%M %p", "%I:%M%p"];

/// Parse an absolute local timestamp such as `2024-03-10T14:30`.
pub fn parse_timestamp(input: &str) -> Result<NaiveDateTime> {
    let input = input.trim();
    if input.is_empty() {
        return Err(MingleError::Validation(
            "Scheduled time cannot be empty".to_string(),
        ));
    }

    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
        .ok_or_else(|| {
            MingleError::Validation(format!("Could not parse scheduled time: {}", input))
        })
}

/// Parse a schedule string relative to `now`.
///
/// Supports:
/// - Absolute times: "2024-03-10T14:30", "2024-03-10 14:30"
/// - Relative durations: "30m", "2h", "1 day"
/// - Natural language: "tomorrow", "tomorrow 10am", "next monday 9:00"
///
/// # Errors
///
/// Returns `MingleError::Validation` if no format matches.
pub fn parse_scheduled_at(input: &str, now: NaiveDateTime) -> Result<NaiveDateTime> {
    let input = input.trim();
    if input.is_empty() {
        return Err(MingleError::Validation(
            "Scheduled time cannot be empty".to_string(),
        ));
    }

    if let Ok(at) = parse_timestamp(input) {
        return Ok(at);
    }

    if let Some(at) = parse_relative(input, now) {
        return Ok(at);
    }

    if let Some(at) = parse_natural_language(input, now) {
        return Ok(at);
    }

    Err(MingleError::Validation(format!(
        "Could not parse scheduled time: {}",
        input
    )))
}

/// Combine the compose screen's separate date picker and time field.
pub fn combine_date_time(date: NaiveDate, time: &str) -> Result<NaiveDateTime> {
    let time = time.trim();
    let parsed = TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(&time.to_uppercase(), format).ok())
        .ok_or_else(|| MingleError::Validation(format!("Could not parse time of day: {}", time)))?;
    Ok(date.and_time(parsed))
}

fn parse_relative(input: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let std_duration = humantime::parse_duration(input).ok()?;
    let duration = Duration::from_std(std_duration).ok()?;
    now.checked_add_signed(duration)
}

fn parse_natural_language(input: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    // Utc is only a carrier here: no offset is applied in either direction.
    let base = Utc.from_utc_datetime(&now);
    chrono_english::parse_date_string(input, base, chrono_english::Dialect::Us)
        .ok()
        .map(|dt| dt.naive_utc())
}
