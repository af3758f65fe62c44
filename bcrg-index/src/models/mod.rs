//! Data models for the recordings index

pub mod file_entry;
pub mod recording;
pub mod recording_metadata;

pub use file_entry::{mime_type_for, replace_extension, strip_extension, FileEntry};
pub use recording::{CallDirection, RecordingDescriptor, UNKNOWN_NUMBER};
pub use recording_metadata::{CallDetails, RecordingMetadata};
