//! Recording descriptor builder
//!
//! Builds one [`RecordingDescriptor`] from an audio file, its optional JSON
//! sidecar and the compiled filename pattern. Sidecar data is authoritative;
//! the filename is only parsed when there is no usable sidecar.

use std::sync::Arc;
use tracing::{debug, warn};

use super::file_source::FileSource;
use super::filename_parser::extract_from_filename;
use super::pattern_compiler::CompiledPattern;
use crate::models::{FileEntry, RecordingDescriptor, RecordingMetadata};

/// Where a descriptor's fields came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataOrigin {
    Sidecar,
    Filename,
}

pub struct DescriptorBuilder {
    source: Arc<dyn FileSource>,
}

impl DescriptorBuilder {
    pub fn new(source: Arc<dyn FileSource>) -> Self {
        Self { source }
    }

    /// Build a descriptor; never fails
    ///
    /// An unreadable or malformed sidecar is logged and treated as absent.
    pub async fn build(
        &self,
        audio: &FileEntry,
        metadata_file: Option<&FileEntry>,
        pattern: &CompiledPattern,
    ) -> RecordingDescriptor {
        let (descriptor, _) = self.build_with_origin(audio, metadata_file, pattern).await;
        descriptor
    }

    /// Like [`build`](Self::build), also reporting the metadata origin
    pub async fn build_with_origin(
        &self,
        audio: &FileEntry,
        metadata_file: Option<&FileEntry>,
        pattern: &CompiledPattern,
    ) -> (RecordingDescriptor, MetadataOrigin) {
        let mut descriptor = RecordingDescriptor::from_file(audio, metadata_file);

        let sidecar = match metadata_file {
            Some(file) => self.load_sidecar(file).await,
            None => None,
        };

        let (metadata, origin) = match sidecar {
            Some(metadata) => (metadata, MetadataOrigin::Sidecar),
            None => (
                extract_from_filename(&audio.display_name, pattern),
                MetadataOrigin::Filename,
            ),
        };

        descriptor.apply_metadata(&metadata);

        debug!(
            file = %audio.display_name,
            origin = ?origin,
            direction = %descriptor.direction,
            "Built recording descriptor"
        );
        (descriptor, origin)
    }

    async fn load_sidecar(&self, file: &FileEntry) -> Option<RecordingMetadata> {
        let content = match self.source.read_to_string(&file.locator).await {
            Ok(content) => content,
            Err(e) => {
                warn!(file = %file.display_name, error = %e, "Could not read metadata sidecar");
                return None;
            }
        };

        match RecordingMetadata::from_json(&content) {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                warn!(file = %file.display_name, error = %e, "Malformed metadata sidecar, using filename");
                None
            }
        }
    }
}

/// Re-derive filename fields of an existing descriptor
///
/// Used after the pattern changed; file attributes stay as they are.
pub fn reparse_from_filename(descriptor: &mut RecordingDescriptor, pattern: &CompiledPattern) {
    let metadata = extract_from_filename(&descriptor.audio_display_name, pattern);
    descriptor.apply_metadata(&metadata);
}
