//! Database document migrations
//!
//! Upgrades run on the raw JSON value before it is deserialized, one
//! version step at a time, so each step only needs to know its own
//! predecessor's shape.
//!
//! Never modify an existing step; add a new one and bump
//! [`DB_SCHEMA_VERSION`].

use serde_json::{Map, Value};
use tracing::info;

use super::DbError;

/// Current document schema version
pub const DB_SCHEMA_VERSION: u32 = 2;

/// Read the document's schema version; a missing version means 1
pub fn schema_version(document: &Map<String, Value>) -> Result<u32, DbError> {
    match document.get("schemaVersion") {
        None | Some(Value::Null) => Ok(1),
        Some(value) => value
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| DbError::Malformed(format!("invalid schemaVersion: {}", value))),
    }
}

/// Bring a document up to [`DB_SCHEMA_VERSION`]
///
/// Returns the version the document had before upgrading.
pub fn upgrade(document: &mut Map<String, Value>) -> Result<u32, DbError> {
    let found = schema_version(document)?;

    if found > DB_SCHEMA_VERSION {
        return Err(DbError::UnsupportedSchema {
            found,
            supported: DB_SCHEMA_VERSION,
        });
    }

    let mut version = found;
    while version < DB_SCHEMA_VERSION {
        match version {
            1 => migrate_v2(document)?,
            other => {
                return Err(DbError::Malformed(format!(
                    "no upgrade path from schema version {}",
                    other
                )))
            }
        }
        version += 1;
        document.insert("schemaVersion".to_string(), Value::from(version));
        info!(version, "Upgraded database document");
    }

    Ok(found)
}

/// v1 -> v2: `audioFile` became `audioDisplayName`
fn migrate_v2(document: &mut Map<String, Value>) -> Result<(), DbError> {
    let Some(data) = document.get_mut("data") else {
        return Ok(());
    };
    let records = data
        .as_array_mut()
        .ok_or_else(|| DbError::Malformed("data is not an array".to_string()))?;

    for record in records.iter_mut().filter_map(Value::as_object_mut) {
        if let Some(name) = record.remove("audioFile") {
            record.entry("audioDisplayName").or_insert(name);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_missing_version_is_v1() {
        assert_eq!(schema_version(&object(json!({"data": []}))).unwrap(), 1);
        assert_eq!(schema_version(&object(json!({"schemaVersion": 2}))).unwrap(), 2);
        assert!(schema_version(&object(json!({"schemaVersion": "two"}))).is_err());
    }

    #[test]
    fn test_upgrade_v1_renames_audio_file() {
        let mut doc = object(json!({
            "schemaVersion": 1,
            "data": [{"audioFile": "a.m4a", "opName": "x"}],
            "lastUpdate": 5
        }));

        assert_eq!(upgrade(&mut doc).unwrap(), 1);
        assert_eq!(doc["schemaVersion"], 2);
        assert_eq!(doc["data"][0]["audioDisplayName"], "a.m4a");
        assert!(doc["data"][0].get("audioFile").is_none());
    }

    #[test]
    fn test_current_version_untouched() {
        let original = json!({"schemaVersion": 2, "data": [{"audioDisplayName": "a"}]});
        let mut doc = object(original.clone());
        assert_eq!(upgrade(&mut doc).unwrap(), 2);
        assert_eq!(Value::Object(doc), original);
    }

    #[test]
    fn test_newer_schema_rejected() {
        let mut doc = object(json!({"schemaVersion": 3, "data": []}));
        assert!(matches!(
            upgrade(&mut doc),
            Err(DbError::UnsupportedSchema { found: 3, supported: 2 })
        ));
    }
}
