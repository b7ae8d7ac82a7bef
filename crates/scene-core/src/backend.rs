//! Platform seam for the audio graph.
//!
//! The graph decides *what* happens to the two channels; an [`AudioBackend`]
//! performs it on real hardware (WebAudio in the browser) or in memory for
//! tests. Operations that the platform completes asynchronously return a
//! [`PendingResult`] which the graph collects into [`AudioTasks`].

use crate::error::AudioError;
use crate::fade::Ramp;
use crate::manifest::MediaSource;
use smallvec::SmallVec;
use std::future::Future;
use std::pin::Pin;

pub type Pending<T> = Pin<Box<dyn Future<Output = T>>>;
pub type PendingResult = Pending<Result<(), AudioError>>;

/// How gain is applied once the graph is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GraphMode {
    /// Elements feed per-channel gain nodes, a master gain and an analyser;
    /// fades are sample-accurate scheduled ramps.
    Connected,
    /// No processing graph: fades step the elements' raw volume on a timer
    /// and no energy can be read.
    ElementOnly,
}

pub trait AudioBackend {
    /// Construct the context, both playback elements and, when possible, the
    /// processing graph. Called once per graph lifetime.
    fn open(&mut self) -> Result<GraphMode, AudioError>;
    /// Release everything `open` created.
    fn close(&mut self);

    fn is_suspended(&self) -> bool;
    fn resume(&mut self) -> PendingResult;

    /// Audio clock in seconds.
    fn now(&self) -> f64;
    /// Advisory codec probe.
    fn can_play(&self, source: &MediaSource) -> bool;

    fn load(&mut self, channel: usize, url: &str, looping: bool);
    fn unload(&mut self, channel: usize);
    fn play(&mut self, channel: usize) -> PendingResult;
    fn pause(&mut self, channel: usize);

    /// Immediate gain: the channel's gain node, or the element volume when
    /// running element-only.
    fn set_channel_gain(&mut self, channel: usize, value: f32);
    /// Schedule a sample-accurate ramp (connected mode only).
    fn ramp_channel_gain(&mut self, channel: usize, ramp: &Ramp);
    /// Cancel scheduled automation after `at` and pin the gain to `value`.
    fn hold_channel_gain(&mut self, channel: usize, at: f64, value: f32);
    fn set_master_gain(&mut self, value: f32);

    fn frequency_bin_count(&self) -> usize;
    /// Fill `out` with the analyser's dB magnitudes. False when no analyser.
    fn read_frequency_data(&mut self, out: &mut [f32]) -> bool;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskKind {
    Resume,
    /// `attempt` identifies the start request, so a late outcome from an
    /// earlier request can be told apart from the current one.
    Play { channel: usize, attempt: u64 },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskOutcome {
    pub kind: TaskKind,
    pub result: Result<(), AudioError>,
}

/// Platform operations started by a graph call that finish later.
///
/// Dropping the tasks does not cancel the underlying promises; awaiting
/// [`AudioTasks::finish`] yields their outcomes so the caller can reconcile
/// state (e.g. an autoplay block).
#[must_use = "await `finish` or detach the tasks to observe playback outcomes"]
#[derive(Default)]
pub struct AudioTasks {
    pending: SmallVec<[(TaskKind, PendingResult); 2]>,
}

impl AudioTasks {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: TaskKind, pending: PendingResult) {
        self.pending.push((kind, pending));
    }

    pub fn extend(&mut self, other: AudioTasks) {
        self.pending.extend(other.pending);
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn kinds(&self) -> impl Iterator<Item = TaskKind> + '_ {
        self.pending.iter().map(|(k, _)| *k)
    }

    pub async fn finish(self) -> Vec<TaskOutcome> {
        let mut outcomes = Vec::with_capacity(self.pending.len());
        for (kind, pending) in self.pending {
            let result = pending.await;
            if let Err(e) = &result {
                if cfg!(debug_assertions) {
                    log::warn!("[audio] {:?} failed: {}", kind, e);
                }
            }
            outcomes.push(TaskOutcome { kind, result });
        }
        outcomes
    }
}

impl std::fmt::Debug for AudioTasks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.kinds()).finish()
    }
}
