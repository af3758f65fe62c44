//! Recordings directory access
//!
//! The engine never touches the filesystem directly: listing, sidecar reads,
//! database writes and deletions go through [`FileSource`]. On Android the
//! locators are content URIs; [`LocalDirectory`] uses plain paths and
//! [`MemoryDirectory`] keeps everything in memory for tests.

use async_trait::async_trait;
use bcrg_common::time::{now_millis, system_time_to_millis};
use std::collections::{BTreeMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use walkdir::WalkDir;

use crate::models::{mime_type_for, FileEntry};

/// Directory access errors
#[derive(Debug, Error)]
pub enum FileSourceError {
    /// Locator does not point to an existing file
    #[error("Not found: {0}")]
    NotFound(String),

    /// Recordings location exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// General I/O error
    #[error("I/O error: {0}")]
    Io(String),
}

fn io_error(locator: &str, e: std::io::Error) -> FileSourceError {
    match e.kind() {
        ErrorKind::NotFound => FileSourceError::NotFound(locator.to_string()),
        _ => FileSourceError::Io(format!("{}: {}", locator, e)),
    }
}

/// Access to one recordings directory
#[async_trait]
pub trait FileSource: Send + Sync {
    /// Flat listing of the directory (no recursion)
    async fn list_files(&self) -> Result<Vec<FileEntry>, FileSourceError>;

    /// Read a file's content by locator
    async fn read_to_string(&self, locator: &str) -> Result<String, FileSourceError>;

    /// Read a file by display name; `None` if it does not exist
    async fn read_named(&self, name: &str) -> Result<Option<String>, FileSourceError>;

    /// Create or replace a file by display name
    ///
    /// Implementations must not leave a partially written file behind.
    async fn write_named(&self, name: &str, content: &str) -> Result<(), FileSourceError>;

    /// Delete a file by locator
    async fn delete(&self, locator: &str) -> Result<(), FileSourceError>;

    /// Last-modified time of the directory itself, in epoch milliseconds
    async fn last_modified_ms(&self) -> Result<i64, FileSourceError>;

    /// Human-readable location, for logs
    fn describe(&self) -> String;
}

/// A directory on the local filesystem
#[derive(Debug, Clone)]
pub struct LocalDirectory {
    root: PathBuf,
}

impl LocalDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn check_root(&self) -> Result<(), FileSourceError> {
        if !self.root.exists() {
            return Err(FileSourceError::NotFound(self.root.display().to_string()));
        }
        if !self.root.is_dir() {
            return Err(FileSourceError::NotADirectory(self.root.clone()));
        }
        Ok(())
    }
}

fn list_blocking(root: &Path) -> Result<Vec<FileEntry>, FileSourceError> {
    let mut entries = Vec::new();

    for entry in WalkDir::new(root).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| FileSourceError::Io(e.to_string()))?;
        let metadata = entry
            .metadata()
            .map_err(|e| FileSourceError::Io(e.to_string()))?;

        let display_name = entry.file_name().to_string_lossy().to_string();
        let is_directory = metadata.is_dir();
        let last_modified_ms = metadata
            .modified()
            .map(system_time_to_millis)
            .unwrap_or(0);

        entries.push(FileEntry {
            mime_type: if is_directory {
                "inode/directory".to_string()
            } else {
                mime_type_for(&display_name).to_string()
            },
            display_name,
            locator: entry.path().to_string_lossy().to_string(),
            size_bytes: if is_directory { 0 } else { metadata.len() },
            last_modified_ms,
            is_directory,
        });
    }

    Ok(entries)
}

#[async_trait]
impl FileSource for LocalDirectory {
    async fn list_files(&self) -> Result<Vec<FileEntry>, FileSourceError> {
        self.check_root()?;

        let root = self.root.clone();
        let entries = tokio::task::spawn_blocking(move || list_blocking(&root))
            .await
            .map_err(|e| FileSourceError::Io(format!("listing task failed: {}", e)))??;

        tracing::debug!(
            directory = %self.root.display(),
            count = entries.len(),
            "Listed recordings directory"
        );
        Ok(entries)
    }

    async fn read_to_string(&self, locator: &str) -> Result<String, FileSourceError> {
        tokio::fs::read_to_string(locator)
            .await
            .map_err(|e| io_error(locator, e))
    }

    async fn read_named(&self, name: &str) -> Result<Option<String>, FileSourceError> {
        let path = self.root.join(name);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&path.to_string_lossy(), e)),
        }
    }

    async fn write_named(&self, name: &str, content: &str) -> Result<(), FileSourceError> {
        self.check_root()?;

        let path = self.root.join(name);
        let temp_path = self.root.join(format!("{}.tmp", name));

        tokio::fs::write(&temp_path, content)
            .await
            .map_err(|e| io_error(&temp_path.to_string_lossy(), e))?;

        if let Err(e) = tokio::fs::rename(&temp_path, &path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(io_error(&path.to_string_lossy(), e));
        }

        Ok(())
    }

    async fn delete(&self, locator: &str) -> Result<(), FileSourceError> {
        tokio::fs::remove_file(locator)
            .await
            .map_err(|e| io_error(locator, e))
    }

    async fn last_modified_ms(&self) -> Result<i64, FileSourceError> {
        let root = self.root.to_string_lossy();
        let metadata = tokio::fs::metadata(&self.root)
            .await
            .map_err(|e| io_error(&root, e))?;
        let modified = metadata.modified().map_err(|e| io_error(&root, e))?;
        Ok(system_time_to_millis(modified))
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

#[derive(Debug, Clone)]
struct MemoryFile {
    content: String,
    last_modified_ms: i64,
}

/// In-memory recordings directory
///
/// Locators have the form `mem://<name>`. Listing and write failures can be
/// switched on to exercise error paths.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    files: Mutex<BTreeMap<String, MemoryFile>>,
    unreadable: Mutex<HashSet<String>>,
    fail_listing: AtomicBool,
    fail_writes: AtomicBool,
    fail_deletes: AtomicBool,
    last_modified_ms: AtomicI64,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn locator_for(name: &str) -> String {
        format!("mem://{}", name)
    }

    fn files(&self) -> MutexGuard<'_, BTreeMap<String, MemoryFile>> {
        self.files.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn name_for(locator: &str) -> Option<&str> {
        locator.strip_prefix("mem://")
    }

    /// Add or replace a file with a fixed mtime
    pub fn insert_with_mtime(&self, name: &str, content: &str, last_modified_ms: i64) {
        self.files().insert(
            name.to_string(),
            MemoryFile {
                content: content.to_string(),
                last_modified_ms,
            },
        );
    }

    /// Add or replace a file
    pub fn insert(&self, name: &str, content: &str) {
        self.insert_with_mtime(name, content, now_millis());
    }

    pub fn remove(&self, name: &str) -> bool {
        self.files().remove(name).is_some()
    }

    pub fn contents(&self, name: &str) -> Option<String> {
        self.files().get(name).map(|f| f.content.clone())
    }

    pub fn names(&self) -> Vec<String> {
        self.files().keys().cloned().collect()
    }

    /// Make reads of one file fail with an I/O error
    pub fn set_unreadable(&self, name: &str) {
        self.unreadable
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.to_string());
    }

    pub fn set_fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn set_last_modified_ms(&self, ms: i64) {
        self.last_modified_ms.store(ms, Ordering::SeqCst);
    }

    fn read_by_name(&self, name: &str) -> Result<Option<String>, FileSourceError> {
        let unreadable = self
            .unreadable
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(name);
        if unreadable {
            return Err(FileSourceError::Io(format!("{}: read failed", name)));
        }
        Ok(self.contents(name))
    }
}

#[async_trait]
impl FileSource for MemoryDirectory {
    async fn list_files(&self) -> Result<Vec<FileEntry>, FileSourceError> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(FileSourceError::Io("directory listing failed".to_string()));
        }

        Ok(self
            .files()
            .iter()
            .map(|(name, file)| FileEntry {
                display_name: name.clone(),
                locator: Self::locator_for(name),
                mime_type: mime_type_for(name).to_string(),
                size_bytes: file.content.len() as u64,
                last_modified_ms: file.last_modified_ms,
                is_directory: false,
            })
            .collect())
    }

    async fn read_to_string(&self, locator: &str) -> Result<String, FileSourceError> {
        let name = Self::name_for(locator)
            .ok_or_else(|| FileSourceError::NotFound(locator.to_string()))?;
        self.read_by_name(name)?
            .ok_or_else(|| FileSourceError::NotFound(locator.to_string()))
    }

    async fn read_named(&self, name: &str) -> Result<Option<String>, FileSourceError> {
        self.read_by_name(name)
    }

    async fn write_named(&self, name: &str, content: &str) -> Result<(), FileSourceError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(FileSourceError::Io(format!("{}: write failed", name)));
        }
        self.insert(name, content);
        Ok(())
    }

    async fn delete(&self, locator: &str) -> Result<(), FileSourceError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(FileSourceError::Io(format!("{}: delete failed", locator)));
        }
        let name = Self::name_for(locator)
            .ok_or_else(|| FileSourceError::NotFound(locator.to_string()))?;
        if self.remove(name) {
            Ok(())
        } else {
            Err(FileSourceError::NotFound(locator.to_string()))
        }
    }

    async fn last_modified_ms(&self) -> Result<i64, FileSourceError> {
        Ok(self.last_modified_ms.load(Ordering::SeqCst))
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
