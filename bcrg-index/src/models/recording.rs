//! Recording descriptor: the normalized, in-memory view of one call recording
//!
//! Field names on the wire follow the database document written by the
//! mobile front-end (`audioUri`, `opName`, `date`, ...), so an existing
//! database can be read and written back unchanged.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use super::file_entry::FileEntry;
use super::recording_metadata::RecordingMetadata;

/// Number shown when a call entry carries no number at all
pub const UNKNOWN_NUMBER: &str = "<unknown>";

/// Call direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CallDirection {
    In,
    Out,
    Conference,
    /// Direction not reported (serialized as `""`)
    #[default]
    Unknown,
}

impl CallDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallDirection::In => "in",
            CallDirection::Out => "out",
            CallDirection::Conference => "conference",
            CallDirection::Unknown => "",
        }
    }

    /// Parse a direction, mapping anything unrecognized to `Unknown`
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "in" => CallDirection::In,
            "out" => CallDirection::Out,
            "conference" => CallDirection::Conference,
            _ => CallDirection::Unknown,
        }
    }
}

impl fmt::Display for CallDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl Serialize for CallDirection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CallDirection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // null and unrecognized strings both mean "unknown"
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(value
            .as_deref()
            .map(CallDirection::parse_lenient)
            .unwrap_or_default())
    }
}

/// One call recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingDescriptor {
    /// Locator of the audio file
    #[serde(rename = "audioUri", default)]
    pub audio_locator: String,

    /// Audio file display name; the reconciliation key across refreshes
    #[serde(rename = "audioDisplayName")]
    pub audio_display_name: String,

    /// Locator of the JSON sidecar, when there is one
    #[serde(rename = "metadataUri", default, skip_serializing_if = "Option::is_none")]
    pub metadata_locator: Option<String>,

    /// Other party name; defaults to the number when no name is known
    #[serde(rename = "opName", default)]
    pub other_party_name: String,

    #[serde(rename = "opNumber", default)]
    pub other_party_number: String,

    #[serde(default)]
    pub direction: CallDirection,

    /// Call start in epoch milliseconds; 0 when unparseable
    #[serde(rename = "date", default)]
    pub timestamp_ms: i64,

    #[serde(rename = "duration", default)]
    pub duration_seconds: u64,

    /// SIM slot; 0 when unknown
    #[serde(rename = "simSlot", default)]
    pub sim_slot: u32,

    #[serde(rename = "filesize", default)]
    pub file_size_bytes: u64,

    #[serde(rename = "mimeType", default)]
    pub mime_type: String,
}

impl RecordingDescriptor {
    /// Seed a descriptor from the audio file's own attributes
    ///
    /// The display name stands in for the other party until metadata says
    /// otherwise, and the file's mtime stands in for the call start.
    pub fn from_file(audio: &FileEntry, metadata_file: Option<&FileEntry>) -> Self {
        Self {
            audio_locator: audio.locator.clone(),
            audio_display_name: audio.display_name.clone(),
            metadata_locator: metadata_file.map(|f| f.locator.clone()),
            other_party_name: audio.display_name.clone(),
            other_party_number: audio.display_name.clone(),
            direction: CallDirection::Unknown,
            timestamp_ms: audio.last_modified_ms,
            duration_seconds: 0,
            sim_slot: 0,
            file_size_bytes: audio.size_bytes,
            mime_type: audio.mime_type.clone(),
        }
    }

    /// True when fields were derived from a JSON sidecar
    pub fn has_metadata(&self) -> bool {
        self.metadata_locator.is_some()
    }

    /// Merge sidecar or filename-derived metadata into this descriptor
    ///
    /// Direction, SIM slot and duration are always overwritten (with their
    /// "unknown" values when absent). The timestamp is only replaced by a
    /// non-zero value. Other-party fields are only touched when the metadata
    /// carries a call entry.
    pub fn apply_metadata(&mut self, metadata: &RecordingMetadata) {
        self.direction = metadata
            .direction
            .as_deref()
            .map(CallDirection::parse_lenient)
            .unwrap_or_default();
        self.sim_slot = metadata.sim_slot.unwrap_or(0);
        self.duration_seconds = metadata
            .duration_secs_total()
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .map(|secs| secs.ceil() as u64)
            .unwrap_or(0);

        if let Some(ts) = metadata.timestamp_unix_ms.filter(|ts| *ts != 0) {
            self.timestamp_ms = ts;
        }

        if let Some(call) = metadata.first_call() {
            self.other_party_number = call
                .phone_number_formatted
                .clone()
                .or_else(|| call.phone_number.clone())
                .unwrap_or_else(|| UNKNOWN_NUMBER.to_string());
            self.other_party_name = call
                .contact_name
                .clone()
                .unwrap_or_else(|| self.other_party_number.clone());
        }
    }

    /// Refresh the file pointers from the current listing
    ///
    /// Returns true if either pointer changed.
    pub fn refresh_locators(&mut self, audio: &FileEntry, metadata_file: Option<&FileEntry>) -> bool {
        let metadata_locator = metadata_file.map(|f| f.locator.clone());
        let changed = self.audio_locator != audio.locator || self.metadata_locator != metadata_locator;
        self.audio_locator = audio.locator.clone();
        self.metadata_locator = metadata_locator;
        changed
    }

    /// Copy user-edited fields from `edited`, returning whether anything changed
    ///
    /// File pointers and file attributes are never taken from an edited copy.
    pub fn apply_edits(&mut self, edited: &RecordingDescriptor) -> bool {
        let mut changed = false;

        if self.other_party_name != edited.other_party_name {
            self.other_party_name = edited.other_party_name.clone();
            changed = true;
        }
        if self.other_party_number != edited.other_party_number {
            self.other_party_number = edited.other_party_number.clone();
            changed = true;
        }
        if self.direction != edited.direction {
            self.direction = edited.direction;
            changed = true;
        }
        if self.timestamp_ms != edited.timestamp_ms {
            self.timestamp_ms = edited.timestamp_ms;
            changed = true;
        }
        if self.duration_seconds != edited.duration_seconds {
            self.duration_seconds = edited.duration_seconds;
            changed = true;
        }
        if self.sim_slot != edited.sim_slot {
            self.sim_slot = edited.sim_slot;
            changed = true;
        }

        changed
    }
}
