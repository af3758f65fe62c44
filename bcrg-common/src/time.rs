//! Timestamp utilities
//!
//! Recording timestamps are carried as epoch milliseconds (`i64`), matching
//! both the BCR sidecar (`timestamp_unix_ms`) and the persisted database.

use chrono::{DateTime, TimeZone, Utc};
use std::time::SystemTime;

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current time as epoch milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Convert a filesystem timestamp to epoch milliseconds
///
/// Times before the epoch clamp to 0, which the index treats as "unknown".
pub fn system_time_to_millis(time: SystemTime) -> i64 {
    DateTime::<Utc>::from(time).timestamp_millis().max(0)
}

/// Convert epoch milliseconds back to a UTC timestamp
///
/// Returns `None` for the 0 sentinel and for out-of-range values.
pub fn millis_to_datetime(millis: i64) -> Option<DateTime<Utc>> {
    if millis == 0 {
        return None;
    }
    Utc.timestamp_millis_opt(millis).single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_now_millis_is_recent() {
        let millis = now_millis();
        // after 2020-01-01, before 2100-01-01
        assert!(millis > 1_577_836_800_000);
        assert!(millis < 4_102_444_800_000);
    }

    #[test]
    fn test_system_time_to_millis() {
        let time = SystemTime::UNIX_EPOCH + Duration::from_millis(1_684_766_818_015);
        assert_eq!(system_time_to_millis(time), 1_684_766_818_015);
    }

    #[test]
    fn test_system_time_before_epoch_clamps() {
        let time = SystemTime::UNIX_EPOCH - Duration::from_secs(10);
        assert_eq!(system_time_to_millis(time), 0);
    }

    #[test]
    fn test_millis_to_datetime_sentinel() {
        assert!(millis_to_datetime(0).is_none());
    }

    #[test]
    fn test_millis_to_datetime_roundtrip() {
        let dt = millis_to_datetime(1_684_766_818_015).unwrap();
        assert_eq!(dt.timestamp_millis(), 1_684_766_818_015);
        assert_eq!(dt.to_rfc3339(), "2023-05-22T14:46:58.015+00:00");
    }
}
