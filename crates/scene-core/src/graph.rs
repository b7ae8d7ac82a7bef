//! Two-channel crossfading audio graph.
//!
//! Routing (connected mode):
//!
//! ```text
//! element[0] -> gain[0] --\
//!                          +--> master -> analyser -> destination
//! element[1] -> gain[1] --/
//! ```
//!
//! Channel gains carry the fade (0..1), the master gain carries the user
//! envelope (`muted ? 0 : volume`). In element-only mode both factors are
//! multiplied into each element's volume on a timer instead.

use crate::backend::{AudioBackend, AudioTasks, GraphMode, TaskKind};
use crate::config::AudioConfig;
use crate::error::AudioError;
use crate::fade::Ramp;
use crate::manifest::{select_audio_source, TrackManifest};

pub const CHANNEL_COUNT: usize = 2;

#[derive(Clone, Debug, Default)]
struct Channel {
    url: Option<String>,
    track: Option<String>,
    playing: bool,
    fade: Ramp,
    pause_at: Option<f64>,
    play_attempt: u64,
}

/// Read-only view of a channel for diagnostics and tests.
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelSnapshot {
    pub url: Option<String>,
    pub track: Option<String>,
    pub playing: bool,
    pub fade_target: f32,
    pub pause_at: Option<f64>,
}

pub struct AudioGraph<B: AudioBackend> {
    backend: B,
    config: AudioConfig,
    mode: Option<GraphMode>,
    channels: [Channel; CHANNEL_COUNT],
    active: usize,
    volume: f32,
    muted: bool,
    scratch: Vec<f32>,
    // never reset, so outcomes from before a teardown stay stale
    play_seq: u64,
}

impl<B: AudioBackend> AudioGraph<B> {
    pub fn new(backend: B, config: AudioConfig) -> Self {
        let config = config.sanitized();
        Self {
            backend,
            volume: config.default_volume,
            config,
            mode: None,
            channels: Default::default(),
            active: 0,
            muted: false,
            scratch: Vec::new(),
            play_seq: 0,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    pub fn mode(&self) -> Option<GraphMode> {
        self.mode
    }

    pub fn is_initialized(&self) -> bool {
        self.mode.is_some()
    }

    pub fn active_channel(&self) -> usize {
        self.active
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// User envelope applied on top of every fade.
    #[inline]
    pub fn effective_gain(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.volume
        }
    }

    pub fn channel(&self, index: usize) -> Option<ChannelSnapshot> {
        self.channels.get(index).map(|c| ChannelSnapshot {
            url: c.url.clone(),
            track: c.track.clone(),
            playing: c.playing,
            fade_target: c.fade.to,
            pause_at: c.pause_at,
        })
    }

    /// Build the graph on first use; later calls only resume a suspended
    /// context. Must run from a user-gesture path or the platform keeps the
    /// context suspended.
    pub fn initialize(&mut self) -> Result<AudioTasks, AudioError> {
        if self.mode.is_none() {
            let mode = self.backend.open()?;
            self.mode = Some(mode);
            let bins = match mode {
                GraphMode::Connected => self.backend.frequency_bin_count(),
                GraphMode::ElementOnly => 0,
            };
            self.scratch = vec![0.0; bins];
            let now = self.backend.now();
            for ch in 0..CHANNEL_COUNT {
                self.pin(ch, now, 0.0);
            }
            self.apply_envelope();
            log::info!("[audio] graph built mode={:?} bins={}", mode, bins);
        }
        let mut tasks = AudioTasks::none();
        if self.backend.is_suspended() {
            tasks.push(TaskKind::Resume, self.backend.resume());
        }
        Ok(tasks)
    }

    /// Release the platform resources and return to the unbuilt state. The
    /// user envelope (volume, mute) survives.
    pub fn teardown(&mut self) {
        if self.mode.is_none() {
            return;
        }
        let now = self.backend.now();
        for ch in 0..CHANNEL_COUNT {
            self.silence(ch, now);
            self.backend.unload(ch);
        }
        self.backend.close();
        self.mode = None;
        self.channels = Default::default();
        self.active = 0;
        self.scratch = Vec::new();
        log::info!("[audio] graph torn down");
    }

    /// Make `track` the audible scene.
    ///
    /// Source selection, playback start and both ramps are issued in this one
    /// call, so a volume or mute change arriving afterwards always sees the
    /// settled targets of the new fade.
    pub fn crossfade_to(&mut self, track: &TrackManifest) -> AudioTasks {
        let mut tasks = AudioTasks::none();
        if self.mode.is_none() {
            return tasks;
        }
        let now = self.backend.now();
        let backend = &self.backend;
        let url = match select_audio_source(track, |s| backend.can_play(s)) {
            Some(source) => source.url.clone(),
            None => {
                self.fade_to_silence(now);
                return tasks;
            }
        };

        // a channel already holding the url wins; an idle active channel is reused
        let holds = |c: &Channel| c.url.as_deref() == Some(url.as_str());
        let active = &self.channels[self.active];
        let other = &self.channels[1 - self.active];
        let incoming = if holds(active) || (!holds(other) && !active.playing) {
            self.active
        } else {
            1 - self.active
        };
        let outgoing = 1 - incoming;
        let mut in_from = self.hold(incoming, now);
        let out_from = self.hold(outgoing, now);

        if self.channels[incoming].url.as_deref() != Some(url.as_str()) {
            // reloading rewinds the element, so it comes back in from silence
            self.backend.load(incoming, &url, track.looping);
            let c = &mut self.channels[incoming];
            c.url = Some(url);
            c.playing = false;
            in_from = 0.0;
            self.pin(incoming, now, 0.0);
        }
        self.channels[incoming].track = Some(track.id.clone());
        self.channels[incoming].pause_at = None;

        if !self.channels[incoming].playing {
            self.play_seq += 1;
            let attempt = self.play_seq;
            let c = &mut self.channels[incoming];
            c.playing = true;
            c.play_attempt = attempt;
            tasks.push(
                TaskKind::Play {
                    channel: incoming,
                    attempt,
                },
                self.backend.play(incoming),
            );
        }

        let duration = self.config.crossfade_sec;
        self.start_ramp(incoming, Ramp::new(in_from, 1.0, now, duration));
        if self.channels[outgoing].playing {
            self.start_ramp(outgoing, Ramp::new(out_from, 0.0, now, duration));
            self.channels[outgoing].pause_at = Some(now + duration);
        } else {
            self.channels[outgoing].pause_at = None;
        }
        self.active = incoming;
        log::debug!(
            "[audio] crossfade -> {} on channel {} ({:.2}s)",
            track.id,
            incoming,
            duration
        );
        tasks
    }

    /// Silence and pause every channel, or only the one bound to `track`.
    pub fn stop(&mut self, track: Option<&str>) {
        if self.mode.is_none() {
            return;
        }
        let now = self.backend.now();
        for ch in 0..CHANNEL_COUNT {
            if let Some(id) = track {
                if self.channels[ch].track.as_deref() != Some(id) {
                    continue;
                }
            }
            self.silence(ch, now);
        }
    }

    /// The platform refused start request `attempt` on `channel`; forget that
    /// the channel is playing. Returns false, changing nothing, when the
    /// channel has been stopped or restarted since that request.
    pub fn playback_rejected(&mut self, channel: usize, attempt: u64) -> bool {
        if self.mode.is_none() {
            return false;
        }
        match self.channels.get(channel) {
            Some(c) if c.playing && c.play_attempt == attempt => {}
            _ => return false,
        }
        let now = self.backend.now();
        self.pin(channel, now, 0.0);
        let c = &mut self.channels[channel];
        c.playing = false;
        c.pause_at = None;
        true
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = if volume.is_nan() {
            0.0
        } else {
            volume.clamp(0.0, 1.0)
        };
        self.apply_envelope();
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        self.apply_envelope();
    }

    /// Advance time-driven work: pause channels whose fade has finished and,
    /// in element-only mode, step the volume ramps. Returns the delay in
    /// seconds until the next poll is needed, `None` when nothing is pending.
    /// Safe to call at any time; stale timers land here as no-ops.
    pub fn poll(&mut self) -> Option<f64> {
        let mode = self.mode?;
        let now = self.backend.now();
        // a suspended context clock stands still; nothing is audible, so
        // pending pauses are applied right away
        let frozen = mode == GraphMode::Connected && self.backend.is_suspended();
        for ch in 0..CHANNEL_COUNT {
            let due = matches!(self.channels[ch].pause_at, Some(at) if frozen || now >= at);
            if due {
                self.silence(ch, now);
                log::debug!("[audio] channel {} faded out and paused", ch);
            }
        }
        if mode == GraphMode::ElementOnly {
            let envelope = self.effective_gain();
            for ch in 0..CHANNEL_COUNT {
                let value = self.channels[ch].fade.value_at(now) * envelope;
                self.backend.set_channel_gain(ch, value);
            }
        }

        let mut next: Option<f64> = None;
        for c in &self.channels {
            if let Some(at) = c.pause_at {
                next = Some(next.map_or(at - now, |n: f64| n.min(at - now)));
            }
        }
        if mode == GraphMode::ElementOnly && self.channels.iter().any(|c| !c.fade.is_done(now)) {
            let step = self.config.fallback_step_ms as f64 / 1000.0;
            next = Some(next.map_or(step, |n| n.min(step)));
        }
        next.map(|d| d.max(0.0))
    }

    /// True while a fade is still running or a pause is pending.
    pub fn is_settling(&self) -> bool {
        let now = self.backend.now();
        self.channels
            .iter()
            .any(|c| c.pause_at.is_some() || !c.fade.is_done(now))
    }

    /// Current loudness in [0, 1]. Zero until the analyser exists.
    pub fn sample_energy(&mut self) -> f32 {
        if self.mode != Some(GraphMode::Connected) || self.scratch.is_empty() {
            return 0.0;
        }
        if !self.backend.read_frequency_data(&mut self.scratch) {
            return 0.0;
        }
        energy_from_db(
            &self.scratch,
            self.config.energy_floor_db,
            self.config.energy_range_db,
        )
    }

    // --- internals ---

    fn fade_to_silence(&mut self, now: f64) {
        let duration = self.config.silence_fade_sec();
        for ch in 0..CHANNEL_COUNT {
            if !self.channels[ch].playing {
                continue;
            }
            let from = self.hold(ch, now);
            self.start_ramp(ch, Ramp::new(from, 0.0, now, duration));
            self.channels[ch].pause_at = Some(now + duration);
        }
        log::debug!("[audio] scene has no soundtrack; fading out");
    }

    fn apply_envelope(&mut self) {
        let Some(mode) = self.mode else {
            return;
        };
        let envelope = self.effective_gain();
        match mode {
            GraphMode::Connected => self.backend.set_master_gain(envelope),
            GraphMode::ElementOnly => {
                let now = self.backend.now();
                for ch in 0..CHANNEL_COUNT {
                    let value = self.channels[ch].fade.value_at(now) * envelope;
                    self.backend.set_channel_gain(ch, value);
                }
            }
        }
    }

    /// Cancel any running fade on `ch`, keeping its current value.
    fn hold(&mut self, ch: usize, now: f64) -> f32 {
        let value = self.channels[ch].fade.value_at(now);
        self.pin(ch, now, value);
        value
    }

    fn pin(&mut self, ch: usize, now: f64, value: f32) {
        self.channels[ch].fade = Ramp::hold(value);
        match self.mode {
            Some(GraphMode::Connected) => self.backend.hold_channel_gain(ch, now, value),
            Some(GraphMode::ElementOnly) => {
                let envelope = self.effective_gain();
                self.backend.set_channel_gain(ch, value * envelope)
            }
            None => {}
        }
    }

    fn start_ramp(&mut self, ch: usize, ramp: Ramp) {
        self.channels[ch].fade = ramp;
        match self.mode {
            Some(GraphMode::Connected) => self.backend.ramp_channel_gain(ch, &ramp),
            Some(GraphMode::ElementOnly) => {
                let envelope = self.effective_gain();
                self.backend
                    .set_channel_gain(ch, ramp.value_at(ramp.start) * envelope)
            }
            None => {}
        }
    }

    fn silence(&mut self, ch: usize, now: f64) {
        self.pin(ch, now, 0.0);
        if self.channels[ch].playing {
            self.backend.pause(ch);
        }
        let c = &mut self.channels[ch];
        c.playing = false;
        c.pause_at = None;
    }
}

/// Mean of dB magnitudes mapped linearly from `floor_db..floor_db + range_db`
/// onto 0..1. Empty input and non-finite readings count as silence.
pub fn energy_from_db(bins: &[f32], floor_db: f32, range_db: f32) -> f32 {
    if bins.is_empty() || range_db <= 0.0 {
        return 0.0;
    }
    let sum: f32 = bins
        .iter()
        .map(|&db| {
            let v = (db - floor_db) / range_db;
            if v.is_nan() {
                0.0
            } else {
                v.clamp(0.0, 1.0)
            }
        })
        .sum();
    sum / bins.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::MediaSource;
    use crate::mock::MockBackend;

    fn track(id: &str, urls: &[&str]) -> TrackManifest {
        TrackManifest {
            id: id.into(),
            label: id.into(),
            poster_ref: format!("/images/poster_{id}.jpg"),
            looping: true,
            video_sources: Vec::new(),
            audio_sources: urls
                .iter()
                .map(|u| MediaSource {
                    url: (*u).into(),
                    mime_type: "audio/mpeg".into(),
                    codec: None,
                    width: None,
                    height: None,
                    bitrate_bps: None,
                })
                .collect(),
        }
    }

    fn ready_graph(backend: MockBackend) -> AudioGraph<MockBackend> {
        let mut g = AudioGraph::new(backend, AudioConfig::default());
        let tasks = g.initialize().unwrap();
        pollster::block_on(tasks.finish());
        g
    }

    #[test]
    fn initialize_is_idempotent() {
        let mut g = ready_graph(MockBackend::new());
        let again = g.initialize().unwrap();
        assert!(again.is_empty(), "context already running");
        assert_eq!(g.backend().opened, 1);
    }

    #[test]
    fn initialize_reports_resume_rejection() {
        let backend = MockBackend {
            reject_resume: true,
            ..MockBackend::new()
        };
        let mut g = AudioGraph::new(backend, AudioConfig::default());
        let outcomes = pollster::block_on(g.initialize().unwrap().finish());
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].kind, TaskKind::Resume);
        assert!(matches!(outcomes[0].result, Err(AudioError::ResumeRejected(_))));
        assert!(g.is_initialized());
    }

    #[test]
    fn energy_is_zero_before_initialize() {
        let mut g = AudioGraph::new(MockBackend::new(), AudioConfig::default());
        assert_eq!(g.sample_energy(), 0.0);
        assert_eq!(g.backend().reads, 0);
    }

    #[test]
    fn energy_normalizes_db() {
        assert_eq!(energy_from_db(&[], -100.0, 100.0), 0.0);
        assert_eq!(energy_from_db(&[-100.0, 0.0], -100.0, 100.0), 0.5);
        assert_eq!(energy_from_db(&[f32::NEG_INFINITY, 20.0], -100.0, 100.0), 0.5);
        assert_eq!(energy_from_db(&[f32::NAN], -100.0, 100.0), 0.0);
    }

    #[test]
    fn scratch_buffer_is_reused() {
        let mut g = ready_graph(MockBackend::new());
        g.backend_mut().bins = vec![-50.0; 256];
        let ptr = g.scratch.as_ptr();
        for _ in 0..10 {
            assert!((g.sample_energy() - 0.5).abs() < 1e-6);
        }
        assert_eq!(g.scratch.as_ptr(), ptr);
    }

    #[test]
    fn crossfade_ramps_both_channels_from_one_anchor() {
        let mut g = ready_graph(MockBackend::new());
        let _ = g.crossfade_to(&track("day", &["/day.mp3"]));
        g.backend_mut().advance(2.0);
        g.poll();
        let t0 = g.backend().clock;
        let _ = g.crossfade_to(&track("night", &["/night.mp3"]));
        let b = g.backend();
        let up = b.channels[1].ramp.unwrap();
        let down = b.channels[0].ramp.unwrap();
        assert_eq!(up.start, t0);
        assert_eq!(down.start, t0);
        assert_eq!(up.duration, 1.4);
        assert_eq!((up.from, up.to), (0.0, 1.0));
        assert_eq!((down.from, down.to), (1.0, 0.0));
        assert_eq!(g.active_channel(), 1);
    }

    #[test]
    fn same_url_is_not_reloaded() {
        let mut g = ready_graph(MockBackend::new());
        let day = track("day", &["/day.mp3"]);
        let _ = g.crossfade_to(&day);
        let _ = g.crossfade_to(&day);
        assert_eq!(g.backend().channels[0].loads, 1);
        assert_eq!(g.backend().channels[1].loads, 0);
        assert_eq!(g.active_channel(), 0);
    }

    #[test]
    fn element_only_steps_volume() {
        let mut g = ready_graph(MockBackend::element_only());
        g.set_volume(0.5);
        let _ = g.crossfade_to(&track("day", &["/day.mp3"]));
        g.backend_mut().advance(0.7);
        assert_eq!(g.poll(), Some(0.03));
        assert!((g.backend().channels[0].gain - 0.25).abs() < 1e-5);
        g.backend_mut().advance(1.0);
        assert_eq!(g.poll(), None);
        assert!((g.backend().channels[0].gain - 0.5).abs() < 1e-6);
        assert_eq!(g.sample_energy(), 0.0);
    }

    #[test]
    fn rejection_of_superseded_play_is_ignored() {
        let mut g = ready_graph(MockBackend::new());
        let day = track("day", &["/day.mp3"]);
        let first = g.crossfade_to(&day);
        g.stop(None);
        let second = g.crossfade_to(&day);
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);

        let stale = pollster::block_on(first.finish());
        let TaskKind::Play { channel, attempt } = stale[0].kind else {
            panic!("expected a play task, got {:?}", stale[0].kind);
        };
        assert!(!g.playback_rejected(channel, attempt));
        assert!(g.channel(channel).unwrap().playing);

        let current = pollster::block_on(second.finish());
        let TaskKind::Play { channel, attempt } = current[0].kind else {
            panic!("expected a play task, got {:?}", current[0].kind);
        };
        assert!(g.playback_rejected(channel, attempt));
        assert!(!g.channel(channel).unwrap().playing);
    }

    #[test]
    fn suspended_context_applies_pending_pauses() {
        let mut g = ready_graph(MockBackend::new());
        let _ = g.crossfade_to(&track("day", &["/day.mp3"]));
        g.backend_mut().advance(2.0);
        g.poll();
        let _ = g.crossfade_to(&track("night", &["/night.mp3"]));
        assert!(g.poll().is_some());

        // the context clock stops while suspended
        g.backend_mut().suspended = true;
        assert_eq!(g.poll(), None);
        assert!(!g.backend().channels[0].playing);
        assert_eq!(g.channel(0).unwrap().pause_at, None);
        assert!(g.channel(1).unwrap().playing);
    }

    #[test]
    fn channel_snapshot_is_bounds_checked() {
        let mut g = ready_graph(MockBackend::new());
        let _ = g.crossfade_to(&track("day", &["/day.mp3"]));
        assert_eq!(
            g.channel(0).and_then(|c| c.url),
            Some("/day.mp3".to_string())
        );
        assert!(g.channel(CHANNEL_COUNT).is_none());
    }
}
