//! Scene state machine.
//!
//! `SceneStore` is the single owner of the scene flags and of the audio
//! graph. Every user command is safe in any state: before the graph exists,
//! `play` builds it, while `pause`, `toggle_mute` and `set_volume` only record
//! intent that is applied once audio is initialized.

use crate::backend::{AudioBackend, AudioTasks, TaskKind, TaskOutcome};
use crate::config::SceneConfig;
use crate::constants::{DAY_TRACK, NIGHT_TRACK, PARTICLE_DENSITY_MAX};
use crate::energy::{EnergyLoop, FrameTicket};
use crate::graph::AudioGraph;
use crate::manifest::PlaylistManifest;
use crate::prefs::{Preferences, Subtitles};
use crate::shortcuts::{self, KeyInput, KeyOutcome, Shortcut};
use std::rc::Rc;

/// Audio flags visible to the UI and the visual layers.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioSlice {
    pub ready: bool,
    pub playing: bool,
    pub muted: bool,
    pub volume: f32,
    pub energy: f32,
}

pub struct SceneStore<B: AudioBackend> {
    playlist: Option<Rc<PlaylistManifest>>,
    track: String,
    focus_mode: bool,
    info_dialog_open: bool,
    subtitles: Subtitles,
    verse_index: usize,
    verse_interval_ms: u32,
    particle_density: f32,
    audio: AudioSlice,
    graph: AudioGraph<B>,
    energy_loop: EnergyLoop,
}

#[inline]
fn clamp_unit(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

impl<B: AudioBackend> SceneStore<B> {
    pub fn new(backend: B, config: SceneConfig) -> Self {
        let graph = AudioGraph::new(backend, config.audio);
        let volume = graph.volume();
        Self {
            playlist: None,
            track: DAY_TRACK.to_string(),
            focus_mode: false,
            info_dialog_open: false,
            subtitles: Subtitles::default(),
            verse_index: 0,
            verse_interval_ms: config.verse_interval_ms,
            particle_density: config.particle_density.clamp(0.0, PARTICLE_DENSITY_MAX),
            audio: AudioSlice {
                ready: false,
                playing: false,
                muted: false,
                volume,
                energy: 0.0,
            },
            graph,
            energy_loop: EnergyLoop::new(),
        }
    }

    // --- read side ---

    pub fn track(&self) -> &str {
        &self.track
    }

    pub fn playlist(&self) -> Option<&PlaylistManifest> {
        self.playlist.as_deref()
    }

    pub fn audio(&self) -> &AudioSlice {
        &self.audio
    }

    pub fn focus_mode(&self) -> bool {
        self.focus_mode
    }

    pub fn info_dialog_open(&self) -> bool {
        self.info_dialog_open
    }

    pub fn subtitles(&self) -> Subtitles {
        self.subtitles
    }

    pub fn verse_index(&self) -> usize {
        self.verse_index
    }

    pub fn verse_interval_ms(&self) -> u32 {
        self.verse_interval_ms
    }

    pub fn particle_density(&self) -> f32 {
        self.particle_density
    }

    pub fn graph(&self) -> &AudioGraph<B> {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut AudioGraph<B> {
        &mut self.graph
    }

    // --- scene ---

    /// Install the catalog. The current scene survives if the playlist knows
    /// it, otherwise the playlist's default takes over.
    pub fn set_playlist(&mut self, playlist: Rc<PlaylistManifest>) -> AudioTasks {
        if !playlist.contains(&self.track) {
            self.track = playlist.default_track.clone();
        }
        self.playlist = Some(playlist);
        self.sync_if_playing()
    }

    /// Switch scene. The visual scene changes even when audio is off.
    pub fn set_track(&mut self, id: &str) -> AudioTasks {
        self.track = id.to_string();
        self.sync_if_playing()
    }

    pub fn toggle_track(&mut self) -> AudioTasks {
        let next = match self.playlist.as_deref().and_then(|p| p.next_after(&self.track)) {
            Some(id) => id.to_string(),
            None if self.track == DAY_TRACK => NIGHT_TRACK.to_string(),
            None => DAY_TRACK.to_string(),
        };
        if next == self.track {
            return AudioTasks::none();
        }
        self.set_track(&next)
    }

    pub fn toggle_focus(&mut self) {
        self.focus_mode = !self.focus_mode;
    }

    pub fn toggle_info_dialog(&mut self) {
        self.info_dialog_open = !self.info_dialog_open;
    }

    pub fn set_info_dialog_open(&mut self, open: bool) {
        self.info_dialog_open = open;
    }

    pub fn set_subtitles(&mut self, subtitles: Subtitles) {
        self.subtitles = subtitles;
    }

    pub fn next_verse(&mut self) {
        self.verse_index = self.verse_index.wrapping_add(1);
    }

    pub fn set_particle_density(&mut self, value: f32) {
        self.particle_density = if value.is_nan() {
            0.0
        } else {
            value.clamp(0.0, PARTICLE_DENSITY_MAX)
        };
    }

    // --- transport ---

    /// Build the audio graph (first user gesture), apply the stored envelope
    /// and start the current scene's soundtrack.
    pub fn init_audio(&mut self) -> AudioTasks {
        let mut tasks = match self.graph.initialize() {
            Ok(tasks) => tasks,
            Err(e) => {
                log::warn!("[scene] audio unavailable: {}", e);
                return AudioTasks::none();
            }
        };
        self.apply_envelope();
        self.audio.ready = true;
        self.audio.playing = true;
        tasks.extend(self.sync_track());
        tasks
    }

    pub fn play(&mut self) -> AudioTasks {
        if !self.audio.ready {
            return self.init_audio();
        }
        // resumes a context the platform suspended in the meantime
        let mut tasks = self.graph.initialize().unwrap_or_else(|e| {
            log::warn!("[scene] audio unavailable: {}", e);
            AudioTasks::none()
        });
        self.apply_envelope();
        self.audio.playing = true;
        tasks.extend(self.sync_track());
        tasks
    }

    pub fn pause(&mut self) {
        self.graph.stop(None);
        self.audio.playing = false;
        self.audio.energy = 0.0;
        self.energy_loop.stop();
    }

    pub fn toggle_mute(&mut self) {
        self.audio.muted = !self.audio.muted;
        if self.audio.ready {
            self.apply_envelope();
        }
    }

    /// Dragging the volume to zero is the same as muting; any audible volume
    /// un-mutes.
    pub fn set_volume(&mut self, value: f32) {
        let volume = clamp_unit(value);
        self.audio.volume = volume;
        self.audio.muted = volume == 0.0;
        if self.audio.ready {
            self.apply_envelope();
        }
    }

    /// Reconcile an async platform outcome. A blocked start drops back to
    /// paused so the next gesture can retry; outcomes of superseded start
    /// requests are ignored.
    pub fn settle_task(&mut self, outcome: &TaskOutcome) {
        if let (TaskKind::Play { channel, attempt }, Err(e)) = (&outcome.kind, &outcome.result) {
            if !e.is_autoplay_blocked() {
                return;
            }
            if !self.graph.playback_rejected(*channel, *attempt) {
                log::debug!("[scene] ignoring stale play outcome on channel {}", channel);
                return;
            }
            if self.graph.active_channel() == *channel {
                self.audio.playing = false;
                self.audio.energy = 0.0;
                self.energy_loop.stop();
            }
        }
    }

    /// Drive fade settlement. Returns the delay until the next call is due.
    pub fn poll_audio(&mut self) -> Option<f64> {
        self.graph.poll()
    }

    /// Release the audio platform. Scene flags and user intent are kept.
    pub fn teardown(&mut self) {
        self.pause();
        self.graph.teardown();
        self.audio.ready = false;
    }

    // --- energy ---

    pub fn sample_energy(&mut self) -> f32 {
        self.audio.energy = if self.audio.playing {
            self.graph.sample_energy()
        } else {
            0.0
        };
        self.audio.energy
    }

    /// Ticket for a new sampling loop, if one should be scheduled.
    pub fn start_energy_loop(&mut self) -> Option<FrameTicket> {
        if !self.audio.playing {
            return None;
        }
        self.energy_loop.start()
    }

    /// One loop step. Returns whether the host should schedule another frame.
    pub fn energy_frame(&mut self, ticket: FrameTicket) -> bool {
        if !self.energy_loop.is_current(ticket) {
            return false;
        }
        if !self.audio.playing {
            self.energy_loop.stop();
            self.audio.energy = 0.0;
            return false;
        }
        self.sample_energy();
        true
    }

    pub fn energy_loop_running(&self) -> bool {
        self.energy_loop.is_running()
    }

    // --- keyboard ---

    pub fn handle_key(&mut self, ev: &KeyInput) -> (KeyOutcome, AudioTasks) {
        let outcome = shortcuts::resolve(ev, self.audio.ready);
        let tasks = match outcome {
            KeyOutcome::Run(shortcut) => self.apply_shortcut(shortcut),
            _ => AudioTasks::none(),
        };
        (outcome, tasks)
    }

    pub fn apply_shortcut(&mut self, shortcut: Shortcut) -> AudioTasks {
        match shortcut {
            Shortcut::ToggleFocus => {
                self.toggle_focus();
                AudioTasks::none()
            }
            Shortcut::ToggleTrack => self.toggle_track(),
            Shortcut::ToggleInfo => {
                self.toggle_info_dialog();
                AudioTasks::none()
            }
        }
    }

    // --- preferences ---

    pub fn preferences(&self) -> Preferences {
        Preferences {
            track: self.track.clone(),
            focus_mode: self.focus_mode,
            subtitles: self.subtitles,
            particle_density: self.particle_density,
            muted: self.audio.muted,
            volume: self.audio.volume,
        }
    }

    /// Apply saved preferences. A saved scene the current playlist does not
    /// know is ignored.
    pub fn restore_preferences(&mut self, prefs: &Preferences) -> AudioTasks {
        self.focus_mode = prefs.focus_mode;
        self.subtitles = prefs.subtitles;
        self.set_particle_density(prefs.particle_density);
        self.audio.volume = clamp_unit(prefs.volume);
        self.audio.muted = prefs.muted;
        if self.audio.ready {
            self.apply_envelope();
        }
        let known = self
            .playlist
            .as_deref()
            .map_or(true, |p| p.contains(&prefs.track));
        if known && prefs.track != self.track {
            self.set_track(&prefs.track)
        } else {
            AudioTasks::none()
        }
    }

    // --- internals ---

    fn apply_envelope(&mut self) {
        self.graph.set_volume(self.audio.volume);
        self.graph.set_muted(self.audio.muted);
    }

    fn sync_if_playing(&mut self) -> AudioTasks {
        if self.audio.ready && self.audio.playing {
            self.sync_track()
        } else {
            AudioTasks::none()
        }
    }

    fn sync_track(&mut self) -> AudioTasks {
        let playlist = self.playlist.clone();
        match playlist.as_deref().and_then(|p| p.resolve(&self.track)) {
            Some(manifest) => self.graph.crossfade_to(manifest),
            None => AudioTasks::none(),
        }
    }
}
