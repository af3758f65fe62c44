//! Recordings database
//!
//! A single JSON document stored next to the recordings. Older documents are
//! upgraded on load and written back; writes go through
//! [`FileSource::write_named`], which never leaves a partial file.

pub mod migrations;
pub mod models;

pub use migrations::DB_SCHEMA_VERSION;
pub use models::DbContent;

use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::services::file_source::{FileSource, FileSourceError};

/// Database errors
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database schema version {found} is newer than supported version {supported}")]
    UnsupportedSchema { found: u32, supported: u32 },

    #[error("Malformed database: {0}")]
    Malformed(String),

    #[error("Database storage error: {0}")]
    Storage(#[from] FileSourceError),
}

/// Parse a document, upgrading it if needed
///
/// Returns the content and whether an upgrade took place.
pub fn parse_document(content: &str) -> Result<(DbContent, bool), DbError> {
    let mut value: Value = serde_json::from_str(content)?;

    let document = value
        .as_object_mut()
        .ok_or_else(|| DbError::Malformed("document is not a JSON object".to_string()))?;
    let found = migrations::upgrade(document)?;

    let content: DbContent = serde_json::from_value(value)?;
    Ok((content, found < DB_SCHEMA_VERSION))
}

/// The database file inside a recordings directory
pub struct Database {
    source: Arc<dyn FileSource>,
    filename: String,
}

impl Database {
    pub fn new(source: Arc<dyn FileSource>, filename: impl Into<String>) -> Self {
        Self {
            source,
            filename: filename.into(),
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Load the document; `None` when there is no database yet
    ///
    /// An upgraded document is saved back before returning.
    pub async fn load(&self) -> Result<Option<DbContent>, DbError> {
        let Some(raw) = self.source.read_named(&self.filename).await? else {
            debug!(file = %self.filename, "No database document yet");
            return Ok(None);
        };

        let (content, upgraded) = parse_document(&raw)?;
        if upgraded {
            info!(file = %self.filename, "Saving upgraded database document");
            self.save(&content).await?;
        }

        debug!(
            file = %self.filename,
            recordings = content.data.len(),
            "Loaded database document"
        );
        Ok(Some(content))
    }

    pub async fn save(&self, content: &DbContent) -> Result<(), DbError> {
        let json = serde_json::to_string(content)?;
        self.source.write_named(&self.filename, &json).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::file_source::MemoryDirectory;

    const DB: &str = ".bcr-gui-database.json";

    #[tokio::test]
    async fn test_missing_document() {
        let db = Database::new(Arc::new(MemoryDirectory::new()), DB);
        assert!(db.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_v1_document_upgraded_and_rewritten() {
        let source = Arc::new(MemoryDirectory::new());
        source.insert(
            DB,
            r#"{"schemaVersion": 1, "lastUpdate": 42,
                "data": [{"audioUri": "mem://a.m4a", "audioFile": "a.m4a", "opName": "Mario",
                          "opNumber": "555", "direction": "in", "date": 1, "duration": 3,
                          "simSlot": 1, "filesize": 9, "mimeType": "audio/mp4"}]}"#,
        );
        let db = Database::new(source.clone(), DB);

        let content = db.load().await.unwrap().unwrap();
        assert_eq!(content.schema_version, DB_SCHEMA_VERSION);
        assert_eq!(content.last_update, 42);
        assert_eq!(content.data[0].audio_display_name, "a.m4a");
        assert_eq!(content.data[0].other_party_name, "Mario");

        let rewritten: Value = serde_json::from_str(&source.contents(DB).unwrap()).unwrap();
        assert_eq!(rewritten["schemaVersion"], 2);
        assert_eq!(rewritten["data"][0]["audioDisplayName"], "a.m4a");
    }

    #[tokio::test]
    async fn test_newer_document_rejected() {
        let source = Arc::new(MemoryDirectory::new());
        source.insert(DB, r#"{"schemaVersion": 9, "data": [], "lastUpdate": 0}"#);
        let db = Database::new(source, DB);
        assert!(matches!(
            db.load().await,
            Err(DbError::UnsupportedSchema { found: 9, .. })
        ));
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let source = Arc::new(MemoryDirectory::new());
        let db = Database::new(source.clone(), DB);
        db.save(&DbContent::new(Vec::new(), 77)).await.unwrap();

        let raw: Value = serde_json::from_str(&source.contents(DB).unwrap()).unwrap();
        assert_eq!(raw["schemaVersion"], 2);
        assert_eq!(raw["lastUpdate"], 77);
        assert_eq!(db.load().await.unwrap().unwrap(), DbContent::new(Vec::new(), 77));
    }

    #[test]
    fn test_garbage_document() {
        assert!(matches!(parse_document("[1, 2]"), Err(DbError::Malformed(_))));
        assert!(matches!(parse_document("{"), Err(DbError::Json(_))));
    }
}
