//! Track manifests supplied by the external catalog.
//!
//! The JSON shape matches what the page receives from the playlist endpoint:
//! camelCase keys, `type` for the MIME type and `bitrate` in bits per second.

use crate::error::{Result, SceneError};
use serde::{Deserialize, Serialize};

/// One candidate encoding of a scene's audio or video.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MediaSource {
    pub url: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codec: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, rename = "bitrate", skip_serializing_if = "Option::is_none")]
    pub bitrate_bps: Option<u64>,
}

impl MediaSource {
    /// String handed to the platform's `canPlayType` probe, e.g.
    /// `audio/ogg; codecs="opus"`. Empty when the source carries no type.
    pub fn probe_type(&self) -> String {
        match self.codec.as_deref() {
            Some(codec) if !self.mime_type.is_empty() => {
                format!("{}; codecs=\"{}\"", self.mime_type, codec)
            }
            _ => self.mime_type.clone(),
        }
    }
}

fn default_loop() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackManifest {
    pub id: String,
    pub label: String,
    #[serde(rename = "poster")]
    pub poster_ref: String,
    #[serde(rename = "loop", default = "default_loop")]
    pub looping: bool,
    #[serde(rename = "video", default)]
    pub video_sources: Vec<MediaSource>,
    #[serde(rename = "audio", default)]
    pub audio_sources: Vec<MediaSource>,
}

impl TrackManifest {
    pub fn has_audio(&self) -> bool {
        !self.audio_sources.is_empty()
    }
}

/// Ordered list of scenes plus the one to show first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistManifest {
    pub tracks: Vec<TrackManifest>,
    pub default_track: String,
}

impl PlaylistManifest {
    pub fn from_json(json: &str) -> Result<Self> {
        let playlist: PlaylistManifest = serde_json::from_str(json)?;
        playlist.validate()?;
        Ok(playlist)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tracks.is_empty() {
            return Err(SceneError::EmptyPlaylist);
        }
        if self.resolve(&self.default_track).is_none() {
            return Err(SceneError::UnknownTrack(self.default_track.clone()));
        }
        Ok(())
    }

    pub fn resolve(&self, id: &str) -> Option<&TrackManifest> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.resolve(id).is_some()
    }

    pub fn track_ids(&self) -> impl Iterator<Item = &str> {
        self.tracks.iter().map(|t| t.id.as_str())
    }

    /// Id following `current` in playlist order, wrapping around. An unknown
    /// `current` restarts from the first track.
    pub fn next_after(&self, current: &str) -> Option<&str> {
        let len = self.tracks.len();
        if len == 0 {
            return None;
        }
        let next = match self.tracks.iter().position(|t| t.id == current) {
            Some(i) => (i + 1) % len,
            None => 0,
        };
        Some(self.tracks[next].id.as_str())
    }
}

/// Pick the audio source to load for `track`.
///
/// The first candidate the probe reports playable wins. Probes under-report
/// on some platforms, so when nothing is reported playable the first listed
/// candidate is used anyway. `None` only when the track has no audio.
pub fn select_audio_source<F>(track: &TrackManifest, mut can_play: F) -> Option<&MediaSource>
where
    F: FnMut(&MediaSource) -> bool,
{
    track
        .audio_sources
        .iter()
        .find(|s| can_play(s))
        .or_else(|| track.audio_sources.first())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(url: &str, mime: &str, codec: Option<&str>) -> MediaSource {
        MediaSource {
            url: url.into(),
            mime_type: mime.into(),
            codec: codec.map(Into::into),
            width: None,
            height: None,
            bitrate_bps: None,
        }
    }

    fn track(audio: Vec<MediaSource>) -> TrackManifest {
        TrackManifest {
            id: "day".into(),
            label: "Day".into(),
            poster_ref: "/images/poster_day.jpg".into(),
            looping: true,
            video_sources: Vec::new(),
            audio_sources: audio,
        }
    }

    #[test]
    fn probe_type_includes_codec() {
        let s = source("/a.ogg", "audio/ogg", Some("opus"));
        assert_eq!(s.probe_type(), "audio/ogg; codecs=\"opus\"");
        let plain = source("/a.mp3", "audio/mpeg", None);
        assert_eq!(plain.probe_type(), "audio/mpeg");
    }

    #[test]
    fn selection_prefers_first_supported() {
        let t = track(vec![
            source("/day.ogg", "audio/ogg", Some("opus")),
            source("/day.mp3", "audio/mpeg", None),
        ]);
        let picked = select_audio_source(&t, |s| s.mime_type == "audio/mpeg").unwrap();
        assert_eq!(picked.url, "/day.mp3");
    }

    #[test]
    fn selection_falls_back_to_first_listed() {
        let t = track(vec![
            source("/day.ogg", "audio/ogg", Some("opus")),
            source("/day.mp3", "audio/mpeg", None),
        ]);
        let picked = select_audio_source(&t, |_| false).unwrap();
        assert_eq!(picked.url, "/day.ogg");
    }

    #[test]
    fn selection_is_none_without_audio() {
        assert!(select_audio_source(&track(Vec::new()), |_| true).is_none());
    }
}
