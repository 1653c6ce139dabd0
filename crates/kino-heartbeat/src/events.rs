//! Player events
//!
//! Events are immutable values emitted by the player whenever a playback
//! condition changes. Each kind carries its own typed payload; loosely shaped
//! `info` maps are normalized (with defaults) when the event is built.

use crate::Error;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Free-form event payload as produced by the player
pub type EventInfo = Map<String, Value>;

/// Player event types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerEventKind {
    #[serde(rename = "MediaLoadStart")]
    LoadStart,
    #[serde(rename = "MediaLoaded")]
    Loaded,
    #[serde(rename = "MediaComplete")]
    Complete,
    #[serde(rename = "MediaAbort")]
    Abort,
    #[serde(rename = "MediaError")]
    Error,
    #[serde(rename = "MediaPlay")]
    Play,
    #[serde(rename = "MediaPause")]
    Pause,
    #[serde(rename = "MediaBufferStart")]
    BufferStart,
    #[serde(rename = "MediaBufferEnd")]
    BufferEnd,
    #[serde(rename = "MediaSeekStart")]
    SeekStart,
    #[serde(rename = "MediaSeekEnd")]
    SeekEnd,
    #[serde(rename = "MediaBitrateChange")]
    BitrateChange,
    #[serde(rename = "MediaTimeUpdate")]
    TimeUpdate,
}

impl PlayerEventKind {
    /// Every event kind a player can emit
    pub const ALL: [PlayerEventKind; 13] = [
        PlayerEventKind::LoadStart,
        PlayerEventKind::Loaded,
        PlayerEventKind::Complete,
        PlayerEventKind::Abort,
        PlayerEventKind::Error,
        PlayerEventKind::Play,
        PlayerEventKind::Pause,
        PlayerEventKind::BufferStart,
        PlayerEventKind::BufferEnd,
        PlayerEventKind::SeekStart,
        PlayerEventKind::SeekEnd,
        PlayerEventKind::BitrateChange,
        PlayerEventKind::TimeUpdate,
    ];

    /// Wire name of the event type
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerEventKind::LoadStart => "MediaLoadStart",
            PlayerEventKind::Loaded => "MediaLoaded",
            PlayerEventKind::Complete => "MediaComplete",
            PlayerEventKind::Abort => "MediaAbort",
            PlayerEventKind::Error => "MediaError",
            PlayerEventKind::Play => "MediaPlay",
            PlayerEventKind::Pause => "MediaPause",
            PlayerEventKind::BufferStart => "MediaBufferStart",
            PlayerEventKind::BufferEnd => "MediaBufferEnd",
            PlayerEventKind::SeekStart => "MediaSeekStart",
            PlayerEventKind::SeekEnd => "MediaSeekEnd",
            PlayerEventKind::BitrateChange => "MediaBitrateChange",
            PlayerEventKind::TimeUpdate => "MediaTimeUpdate",
        }
    }

    /// Human readable label
    pub fn label(&self) -> &'static str {
        match self {
            PlayerEventKind::LoadStart => "Media Load Start",
            PlayerEventKind::Loaded => "Media Loaded",
            PlayerEventKind::Complete => "Media Complete",
            PlayerEventKind::Abort => "Media Abort",
            PlayerEventKind::Error => "Media Error",
            PlayerEventKind::Play => "Media Play",
            PlayerEventKind::Pause => "Media Pause",
            PlayerEventKind::BufferStart => "Media Buffer Start",
            PlayerEventKind::BufferEnd => "Media Buffer End",
            PlayerEventKind::SeekStart => "Media Seek Start",
            PlayerEventKind::SeekEnd => "Media Seek End",
            PlayerEventKind::BitrateChange => "Media Bitrate Change",
            PlayerEventKind::TimeUpdate => "Media Time Update",
        }
    }

    /// Look up a kind by its wire name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl std::fmt::Display for PlayerEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlayerEventKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| Error::UnknownEventKind(s.to_string()))
    }
}

/// Payload of a `MediaLoaded` event
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    /// Content identifier
    pub id: String,
    /// Display name, falls back to the identifier
    pub name: String,
    /// Content length in seconds, `-1` when unknown
    pub length: f64,
    /// Custom metadata (without `name`)
    pub metadata: BTreeMap<String, String>,
}

impl MediaInfo {
    /// Identifier used when the player does not provide one
    pub const DEFAULT_ID: &'static str = "defaultId";
    /// Length used when the player does not provide one
    pub const UNKNOWN_LENGTH: f64 = -1.0;

    /// Build from a loosely shaped info map, applying defaults
    pub fn from_info(info: &EventInfo) -> Self {
        let id = info
            .get("id")
            .and_then(render_value)
            .unwrap_or_else(|| Self::DEFAULT_ID.to_string());

        let length = info
            .get("length")
            .or_else(|| info.get("duration"))
            .and_then(Value::as_f64)
            .unwrap_or(Self::UNKNOWN_LENGTH);

        let raw_metadata = info.get("metadata").and_then(Value::as_object);

        let name = raw_metadata
            .and_then(|m| m.get("name"))
            .and_then(render_value)
            .unwrap_or_else(|| id.clone());

        let metadata = raw_metadata
            .map(|m| {
                m.iter()
                    .filter(|(key, _)| key.as_str() != "name")
                    .filter_map(|(key, value)| render_value(value).map(|v| (key.clone(), v)))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            id,
            name,
            length,
            metadata,
        }
    }

    fn to_info(&self) -> EventInfo {
        let mut metadata: Map<String, Value> = self
            .metadata
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        metadata.insert("name".into(), Value::String(self.name.clone()));

        let mut info = EventInfo::new();
        info.insert("id".into(), Value::String(self.id.clone()));
        info.insert("length".into(), Value::from(self.length));
        info.insert("metadata".into(), Value::Object(metadata));
        info
    }
}

impl Default for MediaInfo {
    fn default() -> Self {
        Self::from_info(&EventInfo::new())
    }
}

/// Payload of a `MediaError` event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackError {
    /// Error description reported by the player
    pub error: String,
}

impl PlaybackError {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }

    fn from_info(info: &EventInfo) -> Self {
        let error = info
            .get("error")
            .and_then(render_value)
            .unwrap_or_else(|| "unknown".to_string());
        Self { error }
    }
}

/// A playback event emitted by the player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawPlayerEvent", into = "RawPlayerEvent")]
pub enum PlayerEvent {
    LoadStart,
    Loaded(MediaInfo),
    Complete,
    Abort,
    Error(PlaybackError),
    Play,
    Pause,
    BufferStart,
    BufferEnd,
    SeekStart,
    SeekEnd,
    BitrateChange,
    TimeUpdate,
}

impl PlayerEvent {
    /// Build an event from its kind and free-form info map
    pub fn new(kind: PlayerEventKind, info: EventInfo) -> Self {
        match kind {
            PlayerEventKind::LoadStart => PlayerEvent::LoadStart,
            PlayerEventKind::Loaded => PlayerEvent::Loaded(MediaInfo::from_info(&info)),
            PlayerEventKind::Complete => PlayerEvent::Complete,
            PlayerEventKind::Abort => PlayerEvent::Abort,
            PlayerEventKind::Error => PlayerEvent::Error(PlaybackError::from_info(&info)),
            PlayerEventKind::Play => PlayerEvent::Play,
            PlayerEventKind::Pause => PlayerEvent::Pause,
            PlayerEventKind::BufferStart => PlayerEvent::BufferStart,
            PlayerEventKind::BufferEnd => PlayerEvent::BufferEnd,
            PlayerEventKind::SeekStart => PlayerEvent::SeekStart,
            PlayerEventKind::SeekEnd => PlayerEvent::SeekEnd,
            PlayerEventKind::BitrateChange => PlayerEvent::BitrateChange,
            PlayerEventKind::TimeUpdate => PlayerEvent::TimeUpdate,
        }
    }

    /// `MediaLoaded` event for the given content id
    pub fn loaded(id: impl Into<String>) -> Self {
        let mut info = EventInfo::new();
        info.insert("id".into(), Value::String(id.into()));
        Self::new(PlayerEventKind::Loaded, info)
    }

    /// `MediaError` event with the given description
    pub fn error(description: impl Into<String>) -> Self {
        PlayerEvent::Error(PlaybackError::new(description))
    }

    /// Event type tag
    pub fn kind(&self) -> PlayerEventKind {
        match self {
            PlayerEvent::LoadStart => PlayerEventKind::LoadStart,
            PlayerEvent::Loaded(_) => PlayerEventKind::Loaded,
            PlayerEvent::Complete => PlayerEventKind::Complete,
            PlayerEvent::Abort => PlayerEventKind::Abort,
            PlayerEvent::Error(_) => PlayerEventKind::Error,
            PlayerEvent::Play => PlayerEventKind::Play,
            PlayerEvent::Pause => PlayerEventKind::Pause,
            PlayerEvent::BufferStart => PlayerEventKind::BufferStart,
            PlayerEvent::BufferEnd => PlayerEventKind::BufferEnd,
            PlayerEvent::SeekStart => PlayerEventKind::SeekStart,
            PlayerEvent::SeekEnd => PlayerEventKind::SeekEnd,
            PlayerEvent::BitrateChange => PlayerEventKind::BitrateChange,
            PlayerEvent::TimeUpdate => PlayerEventKind::TimeUpdate,
        }
    }

    /// Info map equivalent of the typed payload
    pub fn info(&self) -> EventInfo {
        match self {
            PlayerEvent::Loaded(media) => media.to_info(),
            PlayerEvent::Error(err) => {
                let mut info = EventInfo::new();
                info.insert("error".into(), Value::String(err.error.clone()));
                info
            }
            _ => EventInfo::new(),
        }
    }
}

impl From<PlayerEventKind> for PlayerEvent {
    fn from(kind: PlayerEventKind) -> Self {
        Self::new(kind, EventInfo::new())
    }
}

/// Serialized form: `{ "type": "MediaLoaded", "info": { ... } }`
#[derive(Serialize, Deserialize)]
struct RawPlayerEvent {
    #[serde(rename = "type")]
    kind: PlayerEventKind,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    info: EventInfo,
}

impl From<RawPlayerEvent> for PlayerEvent {
    fn from(raw: RawPlayerEvent) -> Self {
        PlayerEvent::new(raw.kind, raw.info)
    }
}

impl From<PlayerEvent> for RawPlayerEvent {
    fn from(event: PlayerEvent) -> Self {
        RawPlayerEvent {
            kind: event.kind(),
            info: event.info(),
        }
    }
}

/// Strings verbatim, other JSON values as JSON text, null as absent
fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn info(value: Value) -> EventInfo {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_loaded_defaults() {
        let event = PlayerEvent::new(PlayerEventKind::Loaded, EventInfo::new());
        let PlayerEvent::Loaded(media) = event else {
            panic!("expected loaded event");
        };
        assert_eq!(media.id, "defaultId");
        assert_eq!(media.name, "defaultId");
        assert_eq!(media.length, -1.0);
        assert!(media.metadata.is_empty());
    }

    #[test]
    fn test_loaded_name_from_metadata() {
        let media = MediaInfo::from_info(&info(json!({
            "id": "v1",
            "length": 120.5,
            "metadata": { "name": "Big Buck Bunny", "show": "Shorts", "episode": 3 }
        })));
        assert_eq!(media.id, "v1");
        assert_eq!(media.name, "Big Buck Bunny");
        assert_eq!(media.length, 120.5);
        assert_eq!(media.metadata.len(), 2);
        assert_eq!(media.metadata["show"], "Shorts");
        assert_eq!(media.metadata["episode"], "3");
        assert!(!media.metadata.contains_key("name"));
    }

    #[test]
    fn test_loaded_duration_fallback() {
        let media = MediaInfo::from_info(&info(json!({ "id": "v2", "duration": 42 })));
        assert_eq!(media.length, 42.0);
        assert_eq!(media.name, "v2");
    }

    #[test]
    fn test_error_payload() {
        let event = PlayerEvent::new(PlayerEventKind::Error, info(json!({ "error": "decode" })));
        assert_eq!(event, PlayerEvent::error("decode"));

        let missing = PlayerEvent::new(PlayerEventKind::Error, EventInfo::new());
        assert_eq!(missing, PlayerEvent::error("unknown"));
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(PlayerEventKind::Loaded.as_str(), "MediaLoaded");
        assert_eq!(
            "MediaBitrateChange".parse::<PlayerEventKind>().unwrap(),
            PlayerEventKind::BitrateChange
        );
        assert!("MediaRewind".parse::<PlayerEventKind>().is_err());
        for kind in PlayerEventKind::ALL {
            assert_eq!(PlayerEvent::from(kind).kind(), kind);
        }
    }

    #[test]
    fn test_deserialize_script_event() {
        let event: PlayerEvent = serde_json::from_value(json!({
            "type": "MediaLoaded",
            "info": { "id": "v9", "metadata": { "genre": "drama" } }
        }))
        .unwrap();
        let PlayerEvent::Loaded(media) = &event else {
            panic!("expected loaded event");
        };
        assert_eq!(media.name, "v9");
        assert_eq!(media.metadata["genre"], "drama");

        let play: PlayerEvent = serde_json::from_value(json!({ "type": "MediaPlay" })).unwrap();
        assert_eq!(play, PlayerEvent::Play);
    }
}
