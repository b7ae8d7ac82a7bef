#![cfg(target_arch = "wasm32")]
use scene_core::{AudioTasks, PlaylistManifest, Preferences, SceneConfig, SceneStore, Subtitles};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;

mod audio;
mod dom;
mod events;
mod frame;
mod overlay;

use audio::WebAudioBackend;
use frame::AudioTicker;

pub(crate) type SharedStore = Rc<RefCell<SceneStore<WebAudioBackend>>>;

const INTRO_BEGIN_ID: &str = "intro-begin";

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    let level = if cfg!(debug_assertions) {
        log::Level::Debug
    } else {
        log::Level::Info
    };
    console_log::init_with_level(level).ok();
    log::info!("ghazal-web starting");
    Ok(())
}

fn to_js(e: anyhow::Error) -> JsValue {
    js_sys::Error::new(&format!("{:#}", e)).into()
}

fn parse_config(json: Option<String>) -> anyhow::Result<SceneConfig> {
    match json {
        Some(s) if !s.trim().is_empty() => {
            SceneConfig::from_json(&s).map_err(|e| anyhow::anyhow!("config: {}", e))
        }
        _ => Ok(SceneConfig::default()),
    }
}

/// Handle the page holds on to. Every command updates the scene store
/// synchronously and leaves platform promises running in the background.
#[wasm_bindgen]
pub struct Experience {
    store: SharedStore,
    ticker: AudioTicker,
}

impl Experience {
    fn dispatch(&self, tasks: AudioTasks) {
        let focus = self.store.borrow().focus_mode();
        dom::set_body_class(dom::FOCUS_CLASS, focus);
        frame::after_command(&self.store, &self.ticker, tasks);
    }
}

#[wasm_bindgen]
impl Experience {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<Experience, JsValue> {
        let config = parse_config(config_json).map_err(to_js)?;
        let backend = WebAudioBackend::new(config.audio.clone());
        let store: SharedStore = Rc::new(RefCell::new(SceneStore::new(backend, config)));
        let ticker = AudioTicker::new(store.clone());
        Ok(Experience { store, ticker })
    }

    #[wasm_bindgen(js_name = setPlaylistJson)]
    pub fn set_playlist_json(&self, json: &str) -> Result<(), JsValue> {
        let playlist = PlaylistManifest::from_json(json)
            .map_err(|e| to_js(anyhow::anyhow!("playlist: {}", e)))?;
        log::info!(
            "[scene] playlist with {} tracks, default {}",
            playlist.tracks.len(),
            playlist.default_track
        );
        let tasks = self.store.borrow_mut().set_playlist(Rc::new(playlist));
        self.dispatch(tasks);
        Ok(())
    }

    // --- transport ---

    pub fn play(&self) {
        let tasks = self.store.borrow_mut().play();
        self.dispatch(tasks);
    }

    pub fn pause(&self) {
        self.store.borrow_mut().pause();
        self.dispatch(AudioTasks::none());
    }

    #[wasm_bindgen(js_name = toggleMute)]
    pub fn toggle_mute(&self) {
        self.store.borrow_mut().toggle_mute();
        self.dispatch(AudioTasks::none());
    }

    #[wasm_bindgen(js_name = setVolume)]
    pub fn set_volume(&self, value: f32) {
        self.store.borrow_mut().set_volume(value);
        self.dispatch(AudioTasks::none());
    }

    #[wasm_bindgen(js_name = sampleEnergy)]
    pub fn sample_energy(&self) -> f32 {
        self.store.borrow_mut().sample_energy()
    }

    // --- scene ---

    #[wasm_bindgen(js_name = setTrack)]
    pub fn set_track(&self, id: &str) {
        let tasks = self.store.borrow_mut().set_track(id);
        self.dispatch(tasks);
    }

    #[wasm_bindgen(js_name = toggleTrack)]
    pub fn toggle_track(&self) {
        let tasks = self.store.borrow_mut().toggle_track();
        self.dispatch(tasks);
    }

    #[wasm_bindgen(js_name = toggleFocus)]
    pub fn toggle_focus(&self) {
        self.store.borrow_mut().toggle_focus();
        self.dispatch(AudioTasks::none());
    }

    #[wasm_bindgen(js_name = toggleInfoDialog)]
    pub fn toggle_info_dialog(&self) {
        self.store.borrow_mut().toggle_info_dialog();
    }

    #[wasm_bindgen(js_name = setInfoDialogOpen)]
    pub fn set_info_dialog_open(&self, open: bool) {
        self.store.borrow_mut().set_info_dialog_open(open);
    }

    #[wasm_bindgen(js_name = setSubtitles)]
    pub fn set_subtitles(&self, transliteration: bool, translation: bool) {
        self.store.borrow_mut().set_subtitles(Subtitles {
            transliteration,
            translation,
        });
    }

    #[wasm_bindgen(js_name = nextVerse)]
    pub fn next_verse(&self) {
        self.store.borrow_mut().next_verse();
    }

    #[wasm_bindgen(js_name = setParticleDensity)]
    pub fn set_particle_density(&self, value: f32) {
        self.store.borrow_mut().set_particle_density(value);
    }

    // --- read side ---

    #[wasm_bindgen(getter)]
    pub fn energy(&self) -> f32 {
        self.store.borrow().audio().energy
    }

    #[wasm_bindgen(getter)]
    pub fn playing(&self) -> bool {
        self.store.borrow().audio().playing
    }

    #[wasm_bindgen(getter)]
    pub fn ready(&self) -> bool {
        self.store.borrow().audio().ready
    }

    #[wasm_bindgen(getter)]
    pub fn muted(&self) -> bool {
        self.store.borrow().audio().muted
    }

    #[wasm_bindgen(getter)]
    pub fn volume(&self) -> f32 {
        self.store.borrow().audio().volume
    }

    #[wasm_bindgen(getter)]
    pub fn track(&self) -> String {
        self.store.borrow().track().to_string()
    }

    #[wasm_bindgen(getter, js_name = focusMode)]
    pub fn focus_mode(&self) -> bool {
        self.store.borrow().focus_mode()
    }

    #[wasm_bindgen(getter, js_name = infoDialogOpen)]
    pub fn info_dialog_open(&self) -> bool {
        self.store.borrow().info_dialog_open()
    }

    #[wasm_bindgen(getter)]
    pub fn transliteration(&self) -> bool {
        self.store.borrow().subtitles().transliteration
    }

    #[wasm_bindgen(getter)]
    pub fn translation(&self) -> bool {
        self.store.borrow().subtitles().translation
    }

    #[wasm_bindgen(getter, js_name = particleDensity)]
    pub fn particle_density(&self) -> f32 {
        self.store.borrow().particle_density()
    }

    #[wasm_bindgen(getter, js_name = verseIndex)]
    pub fn verse_index(&self) -> u32 {
        self.store.borrow().verse_index() as u32
    }

    #[wasm_bindgen(getter, js_name = verseIntervalMs)]
    pub fn verse_interval_ms(&self) -> u32 {
        self.store.borrow().verse_interval_ms()
    }

    // --- persistence ---

    #[wasm_bindgen(js_name = preferencesJson)]
    pub fn preferences_json(&self) -> Result<String, JsValue> {
        self.store
            .borrow()
            .preferences()
            .to_json()
            .map_err(|e| to_js(anyhow::anyhow!("preferences: {}", e)))
    }

    #[wasm_bindgen(js_name = restorePreferencesJson)]
    pub fn restore_preferences_json(&self, json: &str) -> Result<(), JsValue> {
        let prefs = Preferences::from_json(json)
            .map_err(|e| to_js(anyhow::anyhow!("preferences: {}", e)))?;
        let tasks = self.store.borrow_mut().restore_preferences(&prefs);
        self.dispatch(tasks);
        Ok(())
    }

    // --- page wiring ---

    #[wasm_bindgen(js_name = wireKeyboard)]
    pub fn wire_keyboard(&self) {
        events::wire_global_keydown(self.store.clone(), self.ticker.clone());
    }

    /// Show the intro overlay and start audio from its begin button, which is
    /// the user gesture the platform needs.
    #[wasm_bindgen(js_name = wireIntroOverlay)]
    pub fn wire_intro_overlay(&self) -> bool {
        let Some(document) = dom::window_document() else {
            return false;
        };
        if self.store.borrow().audio().ready {
            overlay::hide(&document);
        } else {
            overlay::show(&document);
        }
        let store = self.store.clone();
        let ticker = self.ticker.clone();
        let doc = document.clone();
        dom::add_click_listener(&document, INTRO_BEGIN_ID, move || {
            let tasks = store.borrow_mut().play();
            frame::after_command(&store, &ticker, tasks);
            if !overlay::is_hidden(&doc) {
                overlay::hide(&doc);
            }
        })
    }

    pub fn teardown(&self) {
        self.store.borrow_mut().teardown();
        self.ticker.kick();
        if let Some(document) = dom::window_document() {
            overlay::show(&document);
        }
        log::info!("[scene] audio released");
    }
}
