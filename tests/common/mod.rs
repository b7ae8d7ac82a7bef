// Shared fixtures for the host-side tests.

#![allow(dead_code)]

use scene_core::mock::MockBackend;
use scene_core::{AudioTasks, PlaylistManifest, SceneConfig, SceneStore, TaskOutcome};
use std::rc::Rc;

pub const DAY_NIGHT_JSON: &str = r#"{
    "defaultTrack": "day",
    "tracks": [
        {
            "id": "day",
            "label": "Day",
            "poster": "/posters/day.jpg",
            "video": [{ "url": "/video/day-720.mp4", "type": "video/mp4", "width": 1280, "height": 720 }],
            "audio": [
                { "url": "/audio/day.ogg", "type": "audio/ogg", "codec": "opus", "bitrate": 96000 },
                { "url": "/audio/day.mp3", "type": "audio/mpeg", "bitrate": 128000 }
            ]
        },
        {
            "id": "night",
            "label": "Night",
            "poster": "/posters/night.jpg",
            "audio": [{ "url": "/audio/night.mp3", "type": "audio/mpeg" }]
        }
    ]
}"#;

pub const SILENT_NIGHT_JSON: &str = r#"{
    "defaultTrack": "day",
    "tracks": [
        { "id": "day", "label": "Day", "poster": "day.jpg",
          "audio": [{ "url": "day.mp3", "type": "audio/mpeg" }] },
        { "id": "night", "label": "Night", "poster": "night.jpg" }
    ]
}"#;

pub const THREE_TRACKS_JSON: &str = r#"{
    "defaultTrack": "dawn",
    "tracks": [
        { "id": "dawn", "label": "Dawn", "poster": "dawn.jpg",
          "audio": [{ "url": "dawn.mp3", "type": "audio/mpeg" }] },
        { "id": "day", "label": "Day", "poster": "day.jpg",
          "audio": [{ "url": "day.mp3", "type": "audio/mpeg" }] },
        { "id": "night", "label": "Night", "poster": "night.jpg",
          "audio": [{ "url": "night.mp3", "type": "audio/mpeg" }] }
    ]
}"#;

pub fn playlist(json: &str) -> Rc<PlaylistManifest> {
    Rc::new(PlaylistManifest::from_json(json).expect("fixture playlist parses"))
}

pub fn store_with(backend: MockBackend, json: &str) -> SceneStore<MockBackend> {
    let mut store = SceneStore::new(backend, SceneConfig::default());
    settle(&mut store, |s| s.set_playlist(playlist(json)));
    store
}

pub fn store(json: &str) -> SceneStore<MockBackend> {
    store_with(MockBackend::new(), json)
}

/// Run a command, wait for its platform outcomes and feed them back, the
/// way the web frontend does.
pub fn settle<F>(store: &mut SceneStore<MockBackend>, command: F) -> Vec<TaskOutcome>
where
    F: FnOnce(&mut SceneStore<MockBackend>) -> AudioTasks,
{
    let tasks = command(store);
    let outcomes = pollster::block_on(tasks.finish());
    for o in &outcomes {
        store.settle_task(o);
    }
    outcomes
}

/// Move the mock clock and let the graph catch up.
pub fn advance(store: &mut SceneStore<MockBackend>, seconds: f64) {
    store.graph_mut().backend_mut().advance(seconds);
    let _ = store.poll_audio();
}

pub fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
}
