use crate::error::Result;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Subtitles {
    pub transliteration: bool,
    pub translation: bool,
}

impl Default for Subtitles {
    fn default() -> Self {
        Self {
            transliteration: false,
            translation: true,
        }
    }
}

/// The part of the scene a returning visitor expects to find again. The host
/// decides where it is stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub track: String,
    #[serde(default)]
    pub focus_mode: bool,
    #[serde(default)]
    pub subtitles: Subtitles,
    pub particle_density: f32,
    #[serde(default)]
    pub muted: bool,
    pub volume: f32,
}

impl Preferences {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
