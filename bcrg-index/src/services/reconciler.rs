//! Directory snapshot reconciliation
//!
//! Compares the previously known recordings (keyed by audio display name)
//! with a fresh directory listing. Known recordings only get their file
//! pointers refreshed; new files are built from scratch; vanished files are
//! dropped. Nothing is persisted here.

use bcrg_common::config::IndexSettings;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use super::descriptor_builder::{reparse_from_filename, DescriptorBuilder};
use super::pattern_compiler::CompiledPattern;
use crate::models::{FileEntry, RecordingDescriptor};

/// A directory listing split into audio files and JSON sidecars
#[derive(Debug, Clone, Default)]
pub struct DirectoryListing {
    /// Audio files of a supported type, by display name
    pub audio_files: BTreeMap<String, FileEntry>,
    /// JSON files, by display name
    pub metadata_files: HashMap<String, FileEntry>,
}

impl DirectoryListing {
    /// Split raw entries; directories and unsupported types are skipped
    pub fn partition(entries: Vec<FileEntry>, settings: &IndexSettings) -> Self {
        let mut listing = Self::default();

        for entry in entries {
            if entry.is_directory {
                continue;
            }
            if entry.is_metadata_file() {
                listing.metadata_files.insert(entry.display_name.clone(), entry);
            } else if settings.is_supported_type(&entry.mime_type) {
                listing.audio_files.insert(entry.display_name.clone(), entry);
            }
        }

        listing
    }

    /// Sidecar paired with an audio file
    pub fn metadata_for(&self, audio: &FileEntry) -> Option<&FileEntry> {
        self.metadata_files.get(&audio.metadata_filename())
    }

    pub fn audio_count(&self) -> usize {
        self.audio_files.len()
    }
}

/// Outcome of one reconciliation
#[derive(Debug, Clone, Default)]
pub struct ReconciliationResult {
    /// The updated set, ordered by display name
    pub recordings: Vec<RecordingDescriptor>,
    /// Already known recordings (pointers refreshed)
    pub unchanged: Vec<String>,
    /// Newly built recordings
    pub added: Vec<String>,
    /// Recordings whose audio file is gone
    pub removed: Vec<String>,
    /// Known recordings re-derived from their filename
    pub reparsed: usize,
    /// Known recordings whose audio or sidecar pointer changed
    pub relocated: usize,
}

pub struct Reconciler {
    builder: DescriptorBuilder,
}

impl Reconciler {
    pub fn new(builder: DescriptorBuilder) -> Self {
        Self { builder }
    }

    /// Reconcile `previous` against `listing`
    ///
    /// Files are processed one at a time in display-name order;
    /// `on_progress(processed, total)` is called after each one. With
    /// `force_filename_reparse`, known recordings without a sidecar are
    /// re-derived from their filename.
    pub async fn reconcile<F>(
        &self,
        previous: Vec<RecordingDescriptor>,
        listing: &DirectoryListing,
        pattern: &CompiledPattern,
        force_filename_reparse: bool,
        mut on_progress: F,
    ) -> ReconciliationResult
    where
        F: FnMut(usize, usize),
    {
        let mut working: BTreeMap<String, RecordingDescriptor> = previous
            .into_iter()
            .map(|d| (d.audio_display_name.clone(), d))
            .collect();

        let mut result = ReconciliationResult::default();

        working.retain(|name, _| {
            let keep = listing.audio_files.contains_key(name);
            if !keep {
                debug!(file = %name, "Recording removed from directory");
                result.removed.push(name.clone());
            }
            keep
        });

        let total = listing.audio_count();
        for (processed, (name, audio)) in listing.audio_files.iter().enumerate() {
            let metadata_file = listing.metadata_for(audio);

            match working.get_mut(name) {
                Some(existing) => {
                    if existing.refresh_locators(audio, metadata_file) {
                        result.relocated += 1;
                        debug!(file = %name, "Recording file pointers changed");
                    }
                    if force_filename_reparse && !existing.has_metadata() {
                        reparse_from_filename(existing, pattern);
                        result.reparsed += 1;
                        debug!(file = %name, "Re-derived recording from filename");
                    }
                    result.unchanged.push(name.clone());
                }
                None => {
                    let descriptor = self.builder.build(audio, metadata_file, pattern).await;
                    debug!(file = %name, "Recording added");
                    working.insert(name.clone(), descriptor);
                    result.added.push(name.clone());
                }
            }

            on_progress(processed + 1, total);
        }

        result.recordings = working.into_values().collect();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CallDirection;
    use crate::services::file_source::{FileSource, MemoryDirectory};
    use crate::services::pattern_compiler::compile;
    use std::sync::Arc;

    const A: &str = "20230101_100000_in_111.m4a";
    const B: &str = "20230102_100000_out_222.m4a";
    const C: &str = "20230103_100000_in_333.m4a";

    async fn listing(source: &MemoryDirectory) -> DirectoryListing {
        DirectoryListing::partition(source.list_files().await.unwrap(), &IndexSettings::default())
    }

    fn reconciler(source: Arc<MemoryDirectory>) -> Reconciler {
        Reconciler::new(DescriptorBuilder::new(source))
    }

    #[tokio::test]
    async fn test_partition() {
        let source = MemoryDirectory::new();
        source.insert(A, "audio");
        source.insert("20230101_100000_in_111.json", "{}");
        source.insert("notes.txt", "text");

        let listing = listing(&source).await;
        assert_eq!(listing.audio_count(), 1);
        assert_eq!(listing.metadata_files.len(), 1);
        let audio = &listing.audio_files[A];
        assert_eq!(
            listing.metadata_for(audio).unwrap().display_name,
            "20230101_100000_in_111.json"
        );
    }

    #[tokio::test]
    async fn test_add_and_remove() {
        let pattern = compile("^{date}_{direction}_{phone_number}").unwrap();
        let source = Arc::new(MemoryDirectory::new());
        source.insert(A, "a");
        source.insert(B, "b");
        let reconciler = reconciler(source.clone());

        let first = reconciler
            .reconcile(Vec::new(), &listing(&source).await, &pattern, false, |_, _| {})
            .await;
        assert_eq!(first.added.len(), 2);

        let mut b = first
            .recordings
            .iter()
            .find(|d| d.audio_display_name == B)
            .unwrap()
            .clone();
        b.other_party_name = "Edited".to_string();
        let previous = vec![first.recordings[0].clone(), b];

        source.remove(A);
        source.insert(C, "c");
        let second = reconciler
            .reconcile(previous, &listing(&source).await, &pattern, false, |_, _| {})
            .await;

        let names: Vec<_> = second
            .recordings
            .iter()
            .map(|d| d.audio_display_name.as_str())
            .collect();
        assert_eq!(names, vec![B, C]);
        assert_eq!(second.removed, vec![A.to_string()]);
        assert_eq!(second.added, vec![C.to_string()]);
        assert_eq!(second.unchanged, vec![B.to_string()]);
        // known entries are not re-derived
        assert_eq!(second.recordings[0].other_party_name, "Edited");
        assert_eq!(second.recordings[1].other_party_number, "333");
    }

    #[tokio::test]
    async fn test_idempotent_on_unchanged_listing() {
        let pattern = compile("^{date}_{direction}_{phone_number}").unwrap();
        let source = Arc::new(MemoryDirectory::new());
        source.insert(A, "a");
        source.insert(B, "b");
        source.insert(
            "20230102_100000_out_222.json",
            r#"{"direction": "conference", "calls": [{"phone_number": "999"}]}"#,
        );
        let reconciler = reconciler(source.clone());
        let listing = listing(&source).await;

        let first = reconciler
            .reconcile(Vec::new(), &listing, &pattern, false, |_, _| {})
            .await;
        let second = reconciler
            .reconcile(first.recordings.clone(), &listing, &pattern, false, |_, _| {})
            .await;

        assert_eq!(first.recordings, second.recordings);
        assert!(second.added.is_empty());
        assert!(second.removed.is_empty());
        assert_eq!(second.recordings[1].direction, CallDirection::Conference);
    }

    #[tokio::test]
    async fn test_refreshes_locators() {
        let pattern = compile("^{date}_{direction}_{phone_number}").unwrap();
        let source = Arc::new(MemoryDirectory::new());
        source.insert(A, "a");
        let reconciler = reconciler(source.clone());
        let listing = listing(&source).await;

        let mut first = reconciler
            .reconcile(Vec::new(), &listing, &pattern, false, |_, _| {})
            .await;
        first.recordings[0].audio_locator = "content://old-grant/A".to_string();

        let second = reconciler
            .reconcile(first.recordings, &listing, &pattern, false, |_, _| {})
            .await;
        assert_eq!(second.recordings[0].audio_locator, MemoryDirectory::locator_for(A));
        assert_eq!(second.relocated, 1);
        assert_eq!(second.unchanged, vec![A.to_string()]);

        let third = reconciler
            .reconcile(second.recordings, &listing, &pattern, false, |_, _| {})
            .await;
        assert_eq!(third.relocated, 0);
    }

    #[tokio::test]
    async fn test_force_reparse_only_without_sidecar() {
        let old = compile("^CallRecord_{phone_number}").unwrap();
        let new = compile("^{date}_{direction}_{phone_number}").unwrap();
        let source = Arc::new(MemoryDirectory::new());
        source.insert(A, "a");
        source.insert(B, "b");
        source.insert(
            "20230102_100000_out_222.json",
            r#"{"calls": [{"phone_number": "999"}]}"#,
        );
        let reconciler = reconciler(source.clone());
        let listing = listing(&source).await;

        let first = reconciler
            .reconcile(Vec::new(), &listing, &old, false, |_, _| {})
            .await;
        assert_eq!(first.recordings[0].other_party_number, A);

        let unforced = reconciler
            .reconcile(first.recordings.clone(), &listing, &new, false, |_, _| {})
            .await;
        assert_eq!(unforced.reparsed, 0);
        assert_eq!(unforced.recordings[0].other_party_number, A);

        let forced = reconciler
            .reconcile(first.recordings, &listing, &new, true, |_, _| {})
            .await;
        assert_eq!(forced.reparsed, 1);
        assert_eq!(forced.recordings[0].other_party_number, "111");
        assert_eq!(forced.recordings[0].direction, CallDirection::In);
        assert_eq!(forced.recordings[1].other_party_number, "999");
    }

    #[tokio::test]
    async fn test_progress_reported_per_file() {
        let pattern = compile("^{phone_number}").unwrap();
        let source = Arc::new(MemoryDirectory::new());
        source.insert(A, "a");
        source.insert(B, "b");
        source.insert(C, "c");
        let reconciler = reconciler(source.clone());

        let mut seen = Vec::new();
        reconciler
            .reconcile(Vec::new(), &listing(&source).await, &pattern, false, |p, t| {
                seen.push((p, t))
            })
            .await;
        assert_eq!(seen, vec![(1, 3), (2, 3), (3, 3)]);
    }
}
