//! Call metadata as written by BCR in its JSON sidecar
//!
//! Every field is optional: BCR writes `null` for whatever Android could not
//! tell it, and the same structure doubles as the partial result of
//! filename parsing. Unknown fields are ignored, and a field holding a value
//! of the wrong type reads as absent instead of failing the whole document.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Partial BCR recording metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    /// Raw timestamp as milliseconds since the Unix epoch
    #[serde(
        default,
        deserialize_with = "lenient_millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp_unix_ms: Option<i64>,

    /// Timestamp in RFC3339 format
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<String>,

    /// Call direction: in, out or conference
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub direction: Option<String>,

    /// SIM slot, numbered from 1
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub sim_slot: Option<u32>,

    /// Display name shown in the dialer's call log
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub call_log_name: Option<String>,

    /// One entry per call leg (several for conference calls)
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub calls: Option<Vec<CallDetails>>,

    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub output: Option<OutputDetails>,
}

/// One call leg
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallDetails {
    /// Raw number as reported by Android
    #[serde(default, deserialize_with = "lenient")]
    pub phone_number: Option<String>,
    /// Number in the country-specific format
    #[serde(default, deserialize_with = "lenient")]
    pub phone_number_formatted: Option<String>,
    /// Contact name from the address book
    #[serde(default, deserialize_with = "lenient")]
    pub contact_name: Option<String>,
    /// Caller ID name
    #[serde(default, deserialize_with = "lenient")]
    pub caller_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputDetails {
    #[serde(default, deserialize_with = "lenient")]
    pub format: Option<OutputFormat>,
    #[serde(default, deserialize_with = "lenient")]
    pub recording: Option<RecordingStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputFormat {
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    pub format_type: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub mime_type_container: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub mime_type_audio: Option<String>,
}

/// Recording statistics; only durations are consumed by the index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordingStats {
    #[serde(default, deserialize_with = "lenient")]
    pub sample_rate: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub channel_count: Option<u32>,
    /// Seconds read from the audio device, including pauses
    #[serde(default, deserialize_with = "lenient")]
    pub duration_secs_total: Option<f64>,
    /// Seconds actually saved to the output file
    #[serde(default, deserialize_with = "lenient")]
    pub duration_secs_encoded: Option<f64>,
}

/// Reads a field, mapping a value of the wrong type to `None`
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Like [`lenient`], but accepts fractional milliseconds (truncated)
fn lenient_millis<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let millis = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        _ => None,
    };
    Ok(millis)
}

impl RecordingMetadata {
    /// Parse sidecar JSON content
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// First call leg, the "other party" of a two-party call
    pub fn first_call(&self) -> Option<&CallDetails> {
        self.calls.as_ref().and_then(|calls| calls.first())
    }

    /// Total recorded duration in seconds, if reported
    pub fn duration_secs_total(&self) -> Option<f64> {
        self.output
            .as_ref()
            .and_then(|o| o.recording.as_ref())
            .and_then(|r| r.duration_secs_total)
    }

    /// True if nothing at all was extracted
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BCR_SIDECAR: &str = r#"{
        "timestamp_unix_ms": 1684766818015,
        "timestamp": "2023-05-22T16:46:58.015+02:00",
        "direction": "in",
        "sim_slot": 1,
        "call_log_name": "Mario Rossi",
        "calls": [
            {
                "phone_number": "+39012345678",
                "phone_number_formatted": "+39 012 345 678",
                "contact_name": "Mario Rossi",
                "caller_name": null
            }
        ],
        "output": {
            "format": {
                "type": "OGG/Opus",
                "mime_type_container": "audio/ogg",
                "mime_type_audio": "audio/opus",
                "parameter_type": "bitrate",
                "parameter": 48000
            },
            "recording": {
                "frames_total": 1440000,
                "frames_encoded": 1440000,
                "sample_rate": 48000,
                "channel_count": 1,
                "duration_secs_total": 30.2,
                "duration_secs_encoded": 30.0,
                "buffer_frames": 640,
                "buffer_overruns": 0,
                "was_ever_paused": false,
                "was_ever_holding": false
            }
        }
    }"#;

    #[test]
    fn test_parse_full_sidecar() {
        let metadata = RecordingMetadata::from_json(BCR_SIDECAR).unwrap();
        assert_eq!(metadata.timestamp_unix_ms, Some(1_684_766_818_015));
        assert_eq!(metadata.direction.as_deref(), Some("in"));
        assert_eq!(metadata.sim_slot, Some(1));
        assert_eq!(metadata.duration_secs_total(), Some(30.2));

        let call = metadata.first_call().unwrap();
        assert_eq!(call.phone_number_formatted.as_deref(), Some("+39 012 345 678"));
        assert_eq!(call.caller_name, None);
    }

    #[test]
    fn test_parse_sidecar_with_nulls() {
        let metadata = RecordingMetadata::from_json(
            r#"{"timestamp_unix_ms": null, "direction": null, "sim_slot": null, "calls": null}"#,
        )
        .unwrap();
        assert!(metadata.is_empty());
        assert!(metadata.first_call().is_none());
    }

    #[test]
    fn test_mistyped_fields_read_as_absent() {
        let metadata = RecordingMetadata::from_json(
            r#"{
                "timestamp_unix_ms": 1684766818015.7,
                "direction": "in",
                "sim_slot": -1,
                "call_log_name": 42,
                "calls": [{"phone_number": 39012345678, "contact_name": "Mario Rossi"}],
                "output": {"format": "ogg", "recording": {"sample_rate": "fast", "duration_secs_total": 30.2}}
            }"#,
        )
        .unwrap();

        assert_eq!(metadata.timestamp_unix_ms, Some(1_684_766_818_015));
        assert_eq!(metadata.direction.as_deref(), Some("in"));
        assert_eq!(metadata.sim_slot, None);
        assert_eq!(metadata.call_log_name, None);
        assert_eq!(metadata.duration_secs_total(), Some(30.2));

        let call = metadata.first_call().unwrap();
        assert_eq!(call.phone_number, None);
        assert_eq!(call.contact_name.as_deref(), Some("Mario Rossi"));

        let output = metadata.output.unwrap();
        assert_eq!(output.format, None);
        assert_eq!(output.recording.unwrap().sample_rate, None);
    }

    #[test]
    fn test_mistyped_calls_list_reads_as_absent() {
        let metadata =
            RecordingMetadata::from_json(r#"{"direction": "out", "calls": "+39012345678"}"#)
                .unwrap();
        assert_eq!(metadata.direction.as_deref(), Some("out"));
        assert!(metadata.first_call().is_none());
    }

    #[test]
    fn test_parse_invalid_json_fails() {
        assert!(RecordingMetadata::from_json("{ not json").is_err());
        assert!(RecordingMetadata::from_json("null").is_err());
    }
}
