//! Recordings index
//!
//! Owns the in-memory recording set for one directory and keeps it in sync
//! with the database document. Every mutation is saved first and only then
//! applied in memory, so a failed write leaves both sides as they were.
//! Mutations and refresh passes are serialized on one lock held from the
//! snapshot to the swap, so none of them can overwrite another's result.

use bcrg_common::config::IndexSettings;
use bcrg_common::events::{EventBus, IndexEvent};
use bcrg_common::time::{now, now_millis};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use super::descriptor_builder::DescriptorBuilder;
use super::file_source::FileSource;
use super::pattern_compiler::accept_template;
use super::reconciler::{DirectoryListing, Reconciler};
use crate::db::{Database, DbContent};
use crate::error::{IndexError, IndexResult};
use crate::models::RecordingDescriptor;

/// Result of a [`RecordingsIndex::refresh`] call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Completed(RefreshSummary),
    /// Another pass was in flight; nothing was done
    AlreadyRunning,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub added: usize,
    pub removed: usize,
    pub unchanged: usize,
    pub reparsed: usize,
    /// Known recordings whose file pointers were refreshed
    pub relocated: usize,
    pub total: usize,
}

/// Result of [`RecordingsIndex::delete`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteReport {
    pub deleted: Vec<String>,
    /// Display name and reason, for recordings left in the index
    pub failed: Vec<(String, String)>,
}

#[derive(Debug, Default)]
struct IndexState {
    recordings: Vec<RecordingDescriptor>,
    last_update: i64,
}

/// Clears the refresh latch when the pass ends, however it ends
struct RefreshGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RefreshGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct RecordingsIndex {
    source: Arc<dyn FileSource>,
    database: Database,
    reconciler: Reconciler,
    settings: IndexSettings,
    events: EventBus,
    state: RwLock<IndexState>,
    /// Held by every read-modify-commit sequence
    mutation: Mutex<()>,
    refreshing: AtomicBool,
}

impl RecordingsIndex {
    pub fn new(source: Arc<dyn FileSource>, settings: IndexSettings, events: EventBus) -> Self {
        let database = Database::new(source.clone(), settings.database_filename.clone());
        let reconciler = Reconciler::new(DescriptorBuilder::new(source.clone()));

        Self {
            source,
            database,
            reconciler,
            settings,
            events,
            state: RwLock::new(IndexState::default()),
            mutation: Mutex::new(()),
            refreshing: AtomicBool::new(false),
        }
    }

    pub fn settings(&self) -> &IndexSettings {
        &self.settings
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::Acquire)
    }

    /// Snapshot of the current recording set
    pub async fn recordings(&self) -> Vec<RecordingDescriptor> {
        self.state.read().await.recordings.clone()
    }

    pub async fn find(&self, display_name: &str) -> Option<RecordingDescriptor> {
        self.state
            .read()
            .await
            .recordings
            .iter()
            .find(|r| r.audio_display_name == display_name)
            .cloned()
    }

    /// Time of the last completed refresh, epoch milliseconds (0 if never)
    pub async fn last_update(&self) -> i64 {
        self.state.read().await.last_update
    }

    /// Load the database document into memory
    ///
    /// Returns false when there is no document yet.
    pub async fn load(&self) -> IndexResult<bool> {
        let _mutation = self.mutation.lock().await;
        let Some(content) = self.database.load().await? else {
            return Ok(false);
        };

        info!(
            directory = %self.source.describe(),
            recordings = content.data.len(),
            "Loaded recordings database"
        );

        let mut state = self.state.write().await;
        state.recordings = content.data;
        state.last_update = content.last_update;
        Ok(true)
    }

    /// True when the directory changed after the last refresh
    pub async fn should_refresh(&self) -> IndexResult<bool> {
        let modified = self.source.last_modified_ms().await?;
        let last_update = self.last_update().await;
        debug!(modified, last_update, "Checked directory modification time");
        Ok(last_update < modified)
    }

    /// Reconcile the index with the directory and persist the result
    ///
    /// Returns [`RefreshOutcome::AlreadyRunning`] without doing anything if
    /// a pass is in flight. On error nothing is committed.
    pub async fn refresh(&self, force_filename_reparse: bool) -> IndexResult<RefreshOutcome> {
        let Some(_guard) = RefreshGuard::acquire(&self.refreshing) else {
            info!("Refresh already running, skipping");
            return Ok(RefreshOutcome::AlreadyRunning);
        };

        match self.run_refresh(force_filename_reparse).await {
            Ok(summary) => Ok(RefreshOutcome::Completed(summary)),
            Err(e) => {
                error!(directory = %self.source.describe(), error = %e, "Refresh failed");
                self.events.emit_lossy(IndexEvent::RefreshFailed {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn run_refresh(&self, force_filename_reparse: bool) -> IndexResult<RefreshSummary> {
        let pattern = accept_template(&self.settings.filename_pattern)?;
        let _mutation = self.mutation.lock().await;

        let entries = self.source.list_files().await?;
        let listing = DirectoryListing::partition(entries, &self.settings);
        let total = listing.audio_count();

        info!(
            directory = %self.source.describe(),
            files = total,
            force_filename_reparse,
            "Refreshing recordings"
        );
        self.events.emit_lossy(IndexEvent::RefreshStarted {
            total,
            timestamp: now(),
        });

        let previous = self.recordings().await;
        let events = self.events.clone();
        let result = self
            .reconciler
            .reconcile(previous, &listing, &pattern, force_filename_reparse, |processed, total| {
                events.emit_lossy(IndexEvent::progress(processed, total))
            })
            .await;

        let summary = RefreshSummary {
            added: result.added.len(),
            removed: result.removed.len(),
            unchanged: result.unchanged.len(),
            reparsed: result.reparsed,
            relocated: result.relocated,
            total: result.recordings.len(),
        };

        self.commit(result.recordings, now_millis()).await?;

        info!(
            added = summary.added,
            removed = summary.removed,
            reparsed = summary.reparsed,
            relocated = summary.relocated,
            total = summary.total,
            "Refresh completed"
        );
        self.events.emit_lossy(IndexEvent::RefreshCompleted {
            added: summary.added,
            removed: summary.removed,
            total: summary.total,
            timestamp: now(),
        });

        Ok(summary)
    }

    /// Save a new recording set, then swap it in
    async fn commit(&self, recordings: Vec<RecordingDescriptor>, last_update: i64) -> IndexResult<()> {
        let content = DbContent::new(recordings, last_update);
        self.database.save(&content).await?;

        let mut state = self.state.write().await;
        state.recordings = content.data;
        state.last_update = content.last_update;
        Ok(())
    }

    /// Delete recordings (audio file and sidecar) by display name
    ///
    /// A recording leaves the index only if all of its files were deleted.
    pub async fn delete(&self, display_names: &[String]) -> IndexResult<DeleteReport> {
        let _mutation = self.mutation.lock().await;
        let (mut recordings, last_update) = {
            let state = self.state.read().await;
            (state.recordings.clone(), state.last_update)
        };

        let mut report = DeleteReport::default();
        for name in display_names {
            let Some(position) = recordings.iter().position(|r| &r.audio_display_name == name) else {
                warn!(file = %name, "Recording to delete is not in the index");
                report.failed.push((name.clone(), "not in index".to_string()));
                continue;
            };

            match self.delete_files(&recordings[position]).await {
                Ok(()) => {
                    recordings.remove(position);
                    report.deleted.push(name.clone());
                }
                Err(e) => {
                    warn!(file = %name, error = %e, "Could not delete recording");
                    report.failed.push((name.clone(), e.to_string()));
                }
            }
        }

        self.commit(recordings, last_update).await?;
        info!(
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "Deleted recordings"
        );
        Ok(report)
    }

    async fn delete_files(&self, recording: &RecordingDescriptor) -> IndexResult<()> {
        self.source.delete(&recording.audio_locator).await?;
        if let Some(metadata_locator) = &recording.metadata_locator {
            self.source.delete(metadata_locator).await?;
        }
        Ok(())
    }

    /// Set the other-party name on every recording with the given number
    ///
    /// Returns how many recordings were updated.
    pub async fn set_name_by_number(&self, number: &str, name: &str) -> IndexResult<usize> {
        let _mutation = self.mutation.lock().await;
        let (mut recordings, last_update) = {
            let state = self.state.read().await;
            (state.recordings.clone(), state.last_update)
        };

        let mut updated = 0;
        for recording in recordings
            .iter_mut()
            .filter(|r| r.other_party_number == number)
        {
            recording.other_party_name = name.to_string();
            updated += 1;
        }

        if updated > 0 {
            self.commit(recordings, last_update).await?;
        }
        info!(number = %number, updated, "Renamed recordings by number");
        Ok(updated)
    }

    /// Apply user edits to the recording with the same display name
    ///
    /// Saves only when something changed; returns whether it did.
    pub async fn update_recording(&self, edited: &RecordingDescriptor) -> IndexResult<bool> {
        let _mutation = self.mutation.lock().await;
        let (mut recordings, last_update) = {
            let state = self.state.read().await;
            (state.recordings.clone(), state.last_update)
        };

        let recording = recordings
            .iter_mut()
            .find(|r| r.audio_display_name == edited.audio_display_name)
            .ok_or_else(|| {
                IndexError::Common(bcrg_common::Error::NotFound(
                    edited.audio_display_name.clone(),
                ))
            })?;

        if !recording.apply_edits(edited) {
            return Ok(false);
        }

        self.commit(recordings, last_update).await?;
        debug!(file = %edited.audio_display_name, "Recording updated");
        Ok(true)
    }
}
