//! Persisted database document

use serde::{Deserialize, Serialize};

use super::migrations::DB_SCHEMA_VERSION;
use crate::models::RecordingDescriptor;

/// `{ "schemaVersion": 2, "data": [...], "lastUpdate": <epoch ms> }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbContent {
    pub schema_version: u32,
    #[serde(default)]
    pub data: Vec<RecordingDescriptor>,
    /// Time of the last completed refresh, epoch milliseconds
    #[serde(default)]
    pub last_update: i64,
}

impl DbContent {
    pub fn new(data: Vec<RecordingDescriptor>, last_update: i64) -> Self {
        Self {
            schema_version: DB_SCHEMA_VERSION,
            data,
            last_update,
        }
    }
}

impl Default for DbContent {
    fn default() -> Self {
        Self::new(Vec::new(), 0)
    }
}
