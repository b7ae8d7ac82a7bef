//! Keyboard shortcuts for the experience page.
//!
//! `f` toggles focus mode, `t` cycles the scene, `i` toggles the info
//! dialog. Matching accepts either the produced character or the physical
//! key code (`KeyF`), so non-Latin keyboard layouts still work.

/// Platform-free view of a keydown event.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyInput {
    pub key: String,
    pub code: String,
    pub meta: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub default_prevented: bool,
}

impl KeyInput {
    pub fn new(key: &str, code: &str) -> Self {
        Self {
            key: key.to_string(),
            code: code.to_string(),
            ..Self::default()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shortcut {
    ToggleFocus,
    ToggleTrack,
    ToggleInfo,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Not ours; leave the event alone.
    Ignored,
    /// Recognized, default prevented, but nothing to do yet.
    Swallowed,
    Run(Shortcut),
}

impl KeyOutcome {
    pub fn prevents_default(self) -> bool {
        !matches!(self, KeyOutcome::Ignored)
    }
}

fn matches_letter(ev: &KeyInput, letter: char) -> bool {
    let key = ev.key.to_lowercase();
    let code = ev.code.to_lowercase();
    let mut buf = [0u8; 4];
    let target: &str = letter.encode_utf8(&mut buf);
    key == target || code.strip_prefix("key") == Some(target)
}

pub fn shortcut_for(ev: &KeyInput) -> Option<Shortcut> {
    if matches_letter(ev, 'i') {
        Some(Shortcut::ToggleInfo)
    } else if matches_letter(ev, 'f') {
        Some(Shortcut::ToggleFocus)
    } else if matches_letter(ev, 't') {
        Some(Shortcut::ToggleTrack)
    } else {
        None
    }
}

/// Decide what a keydown should do. Scene shortcuts wait for audio to be
/// ready (the intro overlay is still up); the info dialog always toggles.
pub fn resolve(ev: &KeyInput, audio_ready: bool) -> KeyOutcome {
    if ev.default_prevented || ev.meta || ev.ctrl || ev.alt {
        return KeyOutcome::Ignored;
    }
    match shortcut_for(ev) {
        None => KeyOutcome::Ignored,
        Some(Shortcut::ToggleInfo) => KeyOutcome::Run(Shortcut::ToggleInfo),
        Some(_) if !audio_ready => KeyOutcome::Swallowed,
        Some(s) => KeyOutcome::Run(s),
    }
}
