// Host-side tests for the keyboard shortcut resolver and its effect on the
// scene store.

mod common;

use common::*;
use scene_core::shortcuts::{resolve, shortcut_for};
use scene_core::{KeyInput, KeyOutcome, Shortcut};

fn key(k: &str, code: &str) -> KeyInput {
    KeyInput::new(k, code)
}

#[test]
fn letters_map_to_shortcuts() {
    assert_eq!(shortcut_for(&key("f", "KeyF")), Some(Shortcut::ToggleFocus));
    assert_eq!(shortcut_for(&key("t", "KeyT")), Some(Shortcut::ToggleTrack));
    assert_eq!(shortcut_for(&key("i", "KeyI")), Some(Shortcut::ToggleInfo));
    assert_eq!(shortcut_for(&key("F", "KeyF")), Some(Shortcut::ToggleFocus));
    assert_eq!(shortcut_for(&key("x", "KeyX")), None);
    assert_eq!(shortcut_for(&key(" ", "Space")), None);
}

#[test]
fn physical_code_matches_on_other_layouts() {
    // Cyrillic layout: the key under F produces "а"
    assert_eq!(shortcut_for(&key("а", "KeyF")), Some(Shortcut::ToggleFocus));
    assert_eq!(shortcut_for(&key("е", "KeyT")), Some(Shortcut::ToggleTrack));
}

#[test]
fn modifiers_and_handled_events_are_ignored() {
    let mut ev = key("f", "KeyF");
    ev.ctrl = true;
    assert_eq!(resolve(&ev, true), KeyOutcome::Ignored);

    let mut ev = key("t", "KeyT");
    ev.meta = true;
    assert_eq!(resolve(&ev, true), KeyOutcome::Ignored);

    let mut ev = key("i", "KeyI");
    ev.alt = true;
    assert_eq!(resolve(&ev, true), KeyOutcome::Ignored);

    let mut ev = key("i", "KeyI");
    ev.default_prevented = true;
    assert_eq!(resolve(&ev, false), KeyOutcome::Ignored);
}

#[test]
fn scene_shortcuts_wait_for_audio() {
    assert_eq!(resolve(&key("f", "KeyF"), false), KeyOutcome::Swallowed);
    assert_eq!(resolve(&key("t", "KeyT"), false), KeyOutcome::Swallowed);
    assert_eq!(
        resolve(&key("f", "KeyF"), true),
        KeyOutcome::Run(Shortcut::ToggleFocus)
    );
}

#[test]
fn info_toggles_regardless_of_audio() {
    assert_eq!(
        resolve(&key("i", "KeyI"), false),
        KeyOutcome::Run(Shortcut::ToggleInfo)
    );
    assert_eq!(
        resolve(&key("I", "KeyI"), true),
        KeyOutcome::Run(Shortcut::ToggleInfo)
    );
}

#[test]
fn only_recognized_keys_prevent_default() {
    assert!(!KeyOutcome::Ignored.prevents_default());
    assert!(KeyOutcome::Swallowed.prevents_default());
    assert!(KeyOutcome::Run(Shortcut::ToggleTrack).prevents_default());
}

#[test]
fn store_applies_shortcuts_once_audio_is_ready() {
    let mut s = store(DAY_NIGHT_JSON);

    let (outcome, tasks) = s.handle_key(&key("t", "KeyT"));
    assert!(tasks.is_empty());
    assert_eq!(outcome, KeyOutcome::Swallowed);
    assert_eq!(s.track(), "day");

    let (outcome, _) = s.handle_key(&key("i", "KeyI"));
    assert_eq!(outcome, KeyOutcome::Run(Shortcut::ToggleInfo));
    assert!(s.info_dialog_open());

    settle(&mut s, |s| s.play());
    settle(&mut s, |s| s.handle_key(&key("t", "KeyT")).1);
    assert_eq!(s.track(), "night");
    assert_eq!(
        s.graph()
            .channel(s.graph().active_channel())
            .and_then(|c| c.track),
        Some("night".to_string())
    );

    let (outcome, _) = s.handle_key(&key("f", "KeyF"));
    assert_eq!(outcome, KeyOutcome::Run(Shortcut::ToggleFocus));
    assert!(s.focus_mode());
}
