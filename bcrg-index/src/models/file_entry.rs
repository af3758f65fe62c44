//! Directory listing entries

use serde::{Deserialize, Serialize};

/// One entry of a recordings directory listing
///
/// `locator` is an opaque handle (a path for local directories, a content URI
/// on Android); `display_name` is the stable identity across re-grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub display_name: String,
    pub locator: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub last_modified_ms: i64,
    pub is_directory: bool,
}

impl FileEntry {
    /// Display name of the JSON sidecar paired with this (audio) file
    pub fn metadata_filename(&self) -> String {
        replace_extension(&self.display_name, ".json")
    }

    /// True for JSON sidecar candidates
    pub fn is_metadata_file(&self) -> bool {
        !self.is_directory && self.display_name.to_ascii_lowercase().ends_with(".json")
    }
}

/// Remove the last extension of a filename
///
/// A name without any `.` is returned unchanged.
pub fn strip_extension(filename: &str) -> &str {
    match filename.rfind('.') {
        Some(idx) => &filename[..idx],
        None => filename,
    }
}

/// Replace the last extension of a filename (`new_extension` includes the dot)
pub fn replace_extension(filename: &str, new_extension: &str) -> String {
    format!("{}{}", strip_extension(filename), new_extension)
}

/// Guess a MIME type from a filename extension
///
/// Mirrors what Android's document provider reports for the formats BCR
/// can produce, so the supported-types filter behaves the same locally.
pub fn mime_type_for(filename: &str) -> &'static str {
    let ext = match filename.rfind('.') {
        Some(idx) => filename[idx + 1..].to_ascii_lowercase(),
        None => return "application/octet-stream",
    };

    match ext.as_str() {
        "flac" => "audio/flac",
        "mp3" => "audio/mpeg",
        "ogg" | "oga" | "opus" => "audio/ogg",
        "wav" => "audio/x-wav",
        "m4a" | "aac" | "mp4" => "audio/mp4",
        "amr" => "audio/amr",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}
