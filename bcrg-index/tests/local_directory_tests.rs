//! End-to-end tests against a real directory

use bcrg_common::config::IndexSettings;
use bcrg_common::events::EventBus;
use bcrg_index::models::CallDirection;
use bcrg_index::services::{LocalDirectory, RecordingsIndex, RefreshOutcome};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;

fn index_for(dir: &TempDir) -> RecordingsIndex {
    RecordingsIndex::new(
        Arc::new(LocalDirectory::new(dir.path())),
        IndexSettings::default(),
        EventBus::default(),
    )
}

#[tokio::test]
async fn test_refresh_writes_database_next_to_recordings() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("20230522_164658.015+0200_in_sim1_+39012345678.oga"),
        b"audio",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("20230522_164658.015+0200_in_sim1_+39012345678.json"),
        r#"{"direction": "in", "calls": [{"phone_number": "+39012345678", "contact_name": "Mario"}]}"#,
    )
    .unwrap();
    std::fs::write(dir.path().join("20230523_090000.000+0200_out_555.flac"), b"audio").unwrap();
    std::fs::create_dir(dir.path().join("archive.oga")).unwrap();

    let index = index_for(&dir);
    let RefreshOutcome::Completed(summary) = index.refresh(false).await.unwrap() else {
        panic!("refresh did not complete");
    };
    assert_eq!(summary.total, 2);

    let db_path = dir.path().join(".bcr-gui-database.json");
    let document: Value = serde_json::from_str(&std::fs::read_to_string(&db_path).unwrap()).unwrap();
    assert_eq!(document["schemaVersion"], 2);
    assert!(!dir.path().join(".bcr-gui-database.json.tmp").exists());

    let reopened = index_for(&dir);
    assert!(reopened.load().await.unwrap());
    let recordings = reopened.recordings().await;
    assert_eq!(recordings.len(), 2);

    let with_sidecar = recordings
        .iter()
        .find(|r| r.other_party_name == "Mario")
        .unwrap();
    assert_eq!(with_sidecar.direction, CallDirection::In);
    assert!(with_sidecar.metadata_locator.is_some());

    let flac = recordings
        .iter()
        .find(|r| r.mime_type == "audio/flac")
        .unwrap();
    assert_eq!(flac.other_party_number, "555");
    assert_eq!(flac.direction, CallDirection::Out);
    assert_eq!(flac.file_size_bytes, 5);
}

#[tokio::test]
async fn test_delete_removes_files_from_disk() {
    let dir = TempDir::new().unwrap();
    let audio = dir.path().join("20230522_164658_in_123.m4a");
    let sidecar = dir.path().join("20230522_164658_in_123.json");
    std::fs::write(&audio, b"audio").unwrap();
    std::fs::write(&sidecar, "{}").unwrap();

    let index = index_for(&dir);
    index.refresh(false).await.unwrap();

    let report = index
        .delete(&["20230522_164658_in_123.m4a".to_string()])
        .await
        .unwrap();
    assert_eq!(report.deleted.len(), 1);
    assert!(!audio.exists());
    assert!(!sidecar.exists());
    assert!(index.recordings().await.is_empty());
}

#[tokio::test]
async fn test_upgrades_v1_database_on_load() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join(".bcr-gui-database.json");
    std::fs::write(
        &db_path,
        r#"{"schemaVersion": 1, "lastUpdate": 10, "data": [
            {"audioUri": "/old/a.m4a", "audioFile": "a.m4a", "opName": "A", "opNumber": "1",
             "direction": "out", "date": 5, "duration": 2, "simSlot": 0, "filesize": 3,
             "mimeType": "audio/mp4"}]}"#,
    )
    .unwrap();

    let index = index_for(&dir);
    assert!(index.load().await.unwrap());
    assert_eq!(index.recordings().await[0].audio_display_name, "a.m4a");

    let document: Value = serde_json::from_str(&std::fs::read_to_string(&db_path).unwrap()).unwrap();
    assert_eq!(document["schemaVersion"], 2);
    assert_eq!(document["data"][0]["audioDisplayName"], "a.m4a");
}

#[tokio::test]
async fn test_missing_directory_is_an_error() {
    let dir = TempDir::new().unwrap();
    let index = RecordingsIndex::new(
        Arc::new(LocalDirectory::new(dir.path().join("gone"))),
        IndexSettings::default(),
        EventBus::default(),
    );
    assert!(index.refresh(false).await.is_err());
    assert!(!index.is_refreshing());
}
