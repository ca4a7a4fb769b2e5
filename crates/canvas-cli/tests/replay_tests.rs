//! Replay Tests
//!
//! Scripts loaded from disk, replayed, and read back with the inspector.

use canvas_cli::{inspect, replay, Script};
use canvas_core::EngineConfig;
use canvas_protocol::decode_str;
use std::io::Write;

const SCRIPT: &str = r#"{"steps": [
    {"step": "open", "id": "notes", "title": "Notes"},
    {"step": "edit", "content": "hello world"},
    {"step": "action", "message": "warmer", "fragments": ["there"],
     "selection": {"start": 6, "end": 11, "text": "world"}},
    {"step": "goto", "version": 1},
    {"step": "action", "message": "again", "fragments": ["friend"], "complete": false},
    {"step": "stop"},
    {"step": "rename", "title": "Renamed"},
    {"step": "surface", "event": {"type": "delete_surface", "surfaceId": "side"}}
]}"#;

#[tokio::test]
async fn test_script_file_replays_to_frames() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(SCRIPT.as_bytes()).unwrap();
    let script = Script::load(file.path()).await.unwrap();

    let mut out = Vec::new();
    let summary = replay(&script, EngineConfig::default(), &mut out).await.unwrap();
    assert_eq!(summary.runs_completed, 1);
    assert_eq!(summary.runs_superseded, 1);

    let text = String::from_utf8(out).unwrap();
    let types: Vec<String> = text
        .lines()
        .map(|line| decode_str(line).unwrap().event_type().to_string())
        .collect();
    assert_eq!(
        types,
        vec![
            "run_started",
            "artifact_partial_update_start",
            "artifact_partial_update_chunk",
            "artifact_partial_update_complete",
            "run_finished",
            "run_started",
            "text_delta",
            "run_cancelled",
            "delete_surface",
        ]
    );

    let mut listing = Vec::new();
    let seen = inspect(text.as_bytes(), &mut listing).await.unwrap();
    assert_eq!(seen.frames, types.len());
    assert_eq!(seen.invalid, 0);
    assert!(String::from_utf8(listing)
        .unwrap()
        .ends_with("surface delete_surface\n"));
}

#[tokio::test]
async fn test_rejected_step_aborts_replay() {
    let script = Script::from_json(
        r#"{"steps": [
            {"step": "open", "id": "doc"},
            {"step": "action", "message": "x", "action": "partial_update", "fragments": ["y"]}
        ]}"#,
    )
    .unwrap();
    let err = replay(&script, EngineConfig::default(), Vec::new())
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("no content"));
}
