//! bcrg-index: recordings index engine for BCR call recordings
//!
//! Turns a directory of call recordings (audio files plus optional JSON
//! sidecars) into a list of recording descriptors, kept in a JSON database
//! document and reconciled incrementally against the directory.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{IndexError, IndexResult};
pub use crate::models::{CallDirection, FileEntry, RecordingDescriptor, RecordingMetadata};
pub use crate::services::{
    CompiledPattern, FileSource, LocalDirectory, RecordingsIndex, RefreshOutcome,
};
