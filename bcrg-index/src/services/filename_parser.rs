//! Metadata extraction from recording filenames
//!
//! Used when a recording has no usable JSON sidecar. Produces the same
//! partial [`RecordingMetadata`] a sidecar would, so the descriptor merge
//! policy does not care where the data came from.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use thiserror::Error;
use tracing::{debug, warn};

use super::pattern_compiler::{CompiledPattern, PatternField, PatternMatch};
use crate::models::{strip_extension, CallDetails, RecordingMetadata};

/// Date assembly failures (recovered: the timestamp becomes 0)
#[derive(Debug, Error)]
pub enum TimestampError {
    #[error("invalid hours value '{0}'")]
    InvalidHours(String),

    #[error("invalid date '{0}': {1}")]
    Parse(String, chrono::ParseError),

    #[error("local time '{0}' does not exist")]
    NonexistentLocalTime(String),
}

/// Extract partial metadata from a recording's display name
///
/// A name that does not match yields an empty result. A matching name always
/// yields exactly one call entry.
pub fn extract_from_filename(display_name: &str, pattern: &CompiledPattern) -> RecordingMetadata {
    let base_name = strip_extension(display_name);

    let Some(matched) = pattern.captures(base_name) else {
        debug!(file = %display_name, pattern = %pattern.template(), "Filename does not match pattern");
        return RecordingMetadata::default();
    };

    let timestamp_ms = match assemble_timestamp(&matched) {
        Ok(ts) => ts.unwrap_or(0),
        Err(e) => {
            warn!(file = %display_name, error = %e, "Could not parse date from filename");
            0
        }
    };

    let phone_number = matched.get(PatternField::PhoneNumber).map(str::to_string);
    let caller_name = matched
        .get(PatternField::CallerName)
        .filter(|name| !name.is_empty())
        .map(str::to_string);

    RecordingMetadata {
        timestamp_unix_ms: Some(timestamp_ms),
        direction: matched
            .get(PatternField::Direction)
            .map(|d| d.to_ascii_lowercase()),
        sim_slot: matched
            .get(PatternField::SimSlot)
            .and_then(|slot| slot.parse().ok()),
        calls: Some(vec![CallDetails {
            phone_number: phone_number.clone(),
            phone_number_formatted: phone_number,
            contact_name: caller_name.clone(),
            caller_name,
        }]),
        ..Default::default()
    }
}

/// Assemble epoch milliseconds from captured date fields
///
/// Returns `Ok(None)` when year, month, day, hours or minutes were not
/// captured. Seconds default to `00`; without a timezone the date is read
/// as local time.
pub fn assemble_timestamp(matched: &PatternMatch) -> Result<Option<i64>, TimestampError> {
    let year = match (matched.get(PatternField::Year), matched.get(PatternField::Year2)) {
        (Some(year), _) => year.to_string(),
        // two-digit years are assumed to be 20xx
        (None, Some(year2)) => format!("20{}", year2),
        (None, None) => return Ok(None),
    };

    let (Some(month), Some(day), Some(hours), Some(minutes)) = (
        matched.get(PatternField::Month),
        matched.get(PatternField::Day),
        matched.get(PatternField::Hours),
        matched.get(PatternField::Minutes),
    ) else {
        return Ok(None);
    };
    let seconds = matched.get(PatternField::Seconds).unwrap_or("00");

    let hours = match matched.get(PatternField::AmPm) {
        Some(ampm) => {
            let h: u32 = hours
                .parse()
                .map_err(|_| TimestampError::InvalidHours(hours.to_string()))?;
            let pm = ampm.eq_ignore_ascii_case("PM");
            format!("{:02}", h % 12 + if pm { 12 } else { 0 })
        }
        None => hours.to_string(),
    };

    let timezone = match (
        matched.get(PatternField::TzHours),
        matched.get(PatternField::TzMinutes),
    ) {
        (Some(tz_hours), Some(tz_minutes)) if tz_hours.starts_with('+') || tz_hours.starts_with('-') => {
            Some(format!("{}:{}", tz_hours, tz_minutes))
        }
        (Some(tz_hours), Some(tz_minutes)) => Some(format!("+{}:{}", tz_hours, tz_minutes)),
        _ => None,
    };

    let local = format!("{}-{}-{}T{}:{}:{}", year, month, day, hours, minutes, seconds);

    match timezone {
        Some(tz) => {
            let iso = format!("{}{}", local, tz);
            DateTime::parse_from_str(&iso, "%Y-%m-%dT%H:%M:%S%.f%:z")
                .map(|dt| Some(dt.timestamp_millis()))
                .map_err(|e| TimestampError::Parse(iso, e))
        }
        None => {
            let naive = NaiveDateTime::parse_from_str(&local, "%Y-%m-%dT%H:%M:%S%.f")
                .map_err(|e| TimestampError::Parse(local.clone(), e))?;
            Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| Some(dt.timestamp_millis()))
                .ok_or(TimestampError::NonexistentLocalTime(local))
        }
    }
}
