//! Platform-free core of the ambient scene: track manifests, the two-channel
//! crossfading audio graph, the scene state machine and the energy loop
//! guard. The web frontend supplies an [`AudioBackend`] built on WebAudio;
//! tests use [`mock::MockBackend`].

pub mod backend;
pub mod config;
pub mod constants;
pub mod energy;
pub mod error;
pub mod fade;
pub mod graph;
pub mod manifest;
pub mod mock;
pub mod prefs;
pub mod shortcuts;
pub mod state;

pub use backend::*;
pub use config::*;
pub use energy::*;
pub use error::*;
pub use fade::*;
pub use graph::*;
pub use manifest::*;
pub use prefs::*;
pub use shortcuts::{KeyInput, KeyOutcome, Shortcut};
pub use state::*;
