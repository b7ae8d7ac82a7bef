use crate::constants::*;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Top-level configuration for the scene. Every field has a default so the
/// page may pass a partial JSON object (or nothing at all).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SceneConfig {
    pub audio: AudioConfig,
    pub verse_interval_ms: u32,
    pub particle_density: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            verse_interval_ms: DEFAULT_VERSE_INTERVAL_MS,
            particle_density: DEFAULT_PARTICLE_DENSITY,
        }
    }
}

impl SceneConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let mut config: SceneConfig = serde_json::from_str(json)?;
        config.audio = config.audio.sanitized();
        config.particle_density = config.particle_density.clamp(0.0, PARTICLE_DENSITY_MAX);
        Ok(config)
    }
}

/// Presentation tuning for the audio graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AudioConfig {
    pub crossfade_sec: f64,
    pub fallback_step_ms: u32,
    pub fft_size: u32,
    pub smoothing: f64,
    pub energy_floor_db: f32,
    pub energy_range_db: f32,
    pub default_volume: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            crossfade_sec: CROSSFADE_SEC,
            fallback_step_ms: FALLBACK_STEP_MS,
            fft_size: ANALYSER_FFT_SIZE,
            smoothing: ANALYSER_SMOOTHING,
            energy_floor_db: ENERGY_FLOOR_DB,
            energy_range_db: ENERGY_RANGE_DB,
            default_volume: DEFAULT_VOLUME,
        }
    }
}

impl AudioConfig {
    /// Replace out-of-range values with defaults so the graph never divides by
    /// zero or schedules a negative ramp.
    pub fn sanitized(mut self) -> Self {
        let defaults = AudioConfig::default();
        if !(self.crossfade_sec.is_finite() && self.crossfade_sec >= 0.0) {
            self.crossfade_sec = defaults.crossfade_sec;
        }
        if self.fallback_step_ms == 0 {
            self.fallback_step_ms = defaults.fallback_step_ms;
        }
        // AnalyserNode requires a power of two in 32..=32768
        if !self.fft_size.is_power_of_two() || !(32..=32_768).contains(&self.fft_size) {
            self.fft_size = defaults.fft_size;
        }
        if !(0.0..=1.0).contains(&self.smoothing) {
            self.smoothing = defaults.smoothing;
        }
        if !(self.energy_range_db.is_finite() && self.energy_range_db > 0.0) {
            self.energy_range_db = defaults.energy_range_db;
        }
        if !self.energy_floor_db.is_finite() {
            self.energy_floor_db = defaults.energy_floor_db;
        }
        self.default_volume = if self.default_volume.is_nan() {
            defaults.default_volume
        } else {
            self.default_volume.clamp(0.0, 1.0)
        };
        self
    }

    /// Fade used when the next scene has no soundtrack.
    #[inline]
    pub fn silence_fade_sec(&self) -> f64 {
        self.crossfade_sec / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = SceneConfig::from_json(r#"{ "audio": { "crossfadeSec": 2.0 } }"#).unwrap();
        assert_eq!(config.audio.crossfade_sec, 2.0);
        assert_eq!(config.audio.fft_size, ANALYSER_FFT_SIZE);
        assert_eq!(config.verse_interval_ms, DEFAULT_VERSE_INTERVAL_MS);
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = SceneConfig::from_json(
            r#"{ "audio": { "crossfadeSec": -1, "fftSize": 300, "energyRangeDb": 0, "defaultVolume": 4 },
                 "particleDensity": 9 }"#,
        )
        .unwrap();
        assert_eq!(config.audio.crossfade_sec, CROSSFADE_SEC);
        assert_eq!(config.audio.fft_size, ANALYSER_FFT_SIZE);
        assert_eq!(config.audio.energy_range_db, ENERGY_RANGE_DB);
        assert_eq!(config.audio.default_volume, 1.0);
        assert_eq!(config.particle_density, PARTICLE_DENSITY_MAX);
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(SceneConfig::from_json("{ nope").is_err());
    }
}
