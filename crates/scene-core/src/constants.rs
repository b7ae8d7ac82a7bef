// Shared audio/scene tuning constants used by the core and the web frontend.

// Crossfade
pub const CROSSFADE_SEC: f64 = 1.4; // full channel-to-channel fade window
pub const FALLBACK_STEP_MS: u32 = 30; // timer cadence when only element volume is available

// Analyser
pub const ANALYSER_FFT_SIZE: u32 = 512;
pub const ANALYSER_SMOOTHING: f64 = 0.85;

// Energy normalization: dB readings are mapped linearly from FLOOR..FLOOR+RANGE onto 0..1
pub const ENERGY_FLOOR_DB: f32 = -100.0;
pub const ENERGY_RANGE_DB: f32 = 100.0;

// User-facing defaults
pub const DEFAULT_VOLUME: f32 = 0.6;
pub const DEFAULT_VERSE_INTERVAL_MS: u32 = 18_000;
pub const DEFAULT_PARTICLE_DENSITY: f32 = 0.8;
pub const PARTICLE_DENSITY_MAX: f32 = 1.5;

// Scene ids used when no playlist has arrived yet
pub const DAY_TRACK: &str = "day";
pub const NIGHT_TRACK: &str = "night";
