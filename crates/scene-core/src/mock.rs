//! In-memory [`AudioBackend`] for host-side tests and headless runs.
//!
//! Every platform effect is recorded in plain public fields so tests can
//! assert on them after driving the graph or the store. The clock only moves
//! when [`MockBackend::advance`] is called.

use crate::backend::{AudioBackend, GraphMode, PendingResult};
use crate::error::AudioError;
use crate::fade::Ramp;
use crate::manifest::MediaSource;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MockChannel {
    pub url: Option<String>,
    pub looping: bool,
    pub playing: bool,
    pub gain: f32,
    pub ramp: Option<Ramp>,
    pub loads: usize,
    pub play_calls: usize,
}

impl MockChannel {
    /// Gain the platform would apply at `now`, honoring a scheduled ramp.
    pub fn gain_at(&self, now: f64) -> f32 {
        match &self.ramp {
            Some(r) => r.value_at(now),
            None => self.gain,
        }
    }
}

#[derive(Clone, Debug)]
pub struct MockBackend {
    pub clock: f64,
    pub mode: GraphMode,
    pub unavailable: bool,
    pub suspended: bool,
    pub block_play: bool,
    pub reject_resume: bool,
    /// Probe types reported playable; everything else is "maybe not".
    pub supported: Vec<String>,
    pub channels: [MockChannel; 2],
    pub master_gain: f32,
    /// dB magnitudes served to the analyser.
    pub bins: Vec<f32>,
    pub opened: usize,
    pub closed: usize,
    pub reads: usize,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            clock: 0.0,
            mode: GraphMode::Connected,
            unavailable: false,
            suspended: true,
            block_play: false,
            reject_resume: false,
            supported: Vec::new(),
            channels: Default::default(),
            master_gain: 1.0,
            bins: vec![-100.0; 256],
            opened: 0,
            closed: 0,
            reads: 0,
        }
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn element_only() -> Self {
        Self {
            mode: GraphMode::ElementOnly,
            ..Self::default()
        }
    }

    pub fn advance(&mut self, seconds: f64) {
        self.clock += seconds;
    }

    /// What a listener hears from `channel` right now.
    pub fn output_gain(&self, channel: usize) -> f32 {
        let g = self.channels[channel].gain_at(self.clock);
        match self.mode {
            GraphMode::Connected => g * self.master_gain,
            GraphMode::ElementOnly => g,
        }
    }

    /// Channels currently producing sound.
    pub fn audible(&self) -> Vec<usize> {
        (0..self.channels.len())
            .filter(|&ch| self.channels[ch].playing && self.output_gain(ch) > 0.0)
            .collect()
    }
}

impl AudioBackend for MockBackend {
    fn open(&mut self) -> Result<GraphMode, AudioError> {
        if self.unavailable {
            return Err(AudioError::Unavailable("no audio output".into()));
        }
        self.opened += 1;
        Ok(self.mode)
    }

    fn close(&mut self) {
        self.closed += 1;
        self.suspended = true;
    }

    fn is_suspended(&self) -> bool {
        self.suspended
    }

    fn resume(&mut self) -> PendingResult {
        let result = if self.reject_resume {
            Err(AudioError::ResumeRejected("InvalidStateError".into()))
        } else {
            self.suspended = false;
            Ok(())
        };
        Box::pin(std::future::ready(result))
    }

    fn now(&self) -> f64 {
        self.clock
    }

    fn can_play(&self, source: &MediaSource) -> bool {
        self.supported.iter().any(|t| *t == source.probe_type())
    }

    fn load(&mut self, channel: usize, url: &str, looping: bool) {
        let ch = &mut self.channels[channel];
        ch.url = Some(url.to_string());
        ch.looping = looping;
        ch.playing = false;
        ch.loads += 1;
    }

    fn unload(&mut self, channel: usize) {
        let ch = &mut self.channels[channel];
        ch.url = None;
        ch.playing = false;
    }

    fn play(&mut self, channel: usize) -> PendingResult {
        let ch = &mut self.channels[channel];
        ch.play_calls += 1;
        let result = if self.block_play {
            Err(AudioError::AutoplayBlocked("NotAllowedError".into()))
        } else {
            ch.playing = true;
            Ok(())
        };
        Box::pin(std::future::ready(result))
    }

    fn pause(&mut self, channel: usize) {
        self.channels[channel].playing = false;
    }

    fn set_channel_gain(&mut self, channel: usize, value: f32) {
        let ch = &mut self.channels[channel];
        ch.ramp = None;
        ch.gain = value;
    }

    fn ramp_channel_gain(&mut self, channel: usize, ramp: &Ramp) {
        self.channels[channel].ramp = Some(*ramp);
    }

    fn hold_channel_gain(&mut self, channel: usize, _at: f64, value: f32) {
        self.set_channel_gain(channel, value);
    }

    fn set_master_gain(&mut self, value: f32) {
        self.master_gain = value;
    }

    fn frequency_bin_count(&self) -> usize {
        match self.mode {
            GraphMode::Connected => self.bins.len(),
            GraphMode::ElementOnly => 0,
        }
    }

    fn read_frequency_data(&mut self, out: &mut [f32]) -> bool {
        if self.mode != GraphMode::Connected {
            return false;
        }
        self.reads += 1;
        for (dst, src) in out.iter_mut().zip(self.bins.iter()) {
            *dst = *src;
        }
        true
    }
}
