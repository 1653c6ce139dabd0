//! Player event triggers
//!
//! A trigger fires when a player emits a given event type, optionally only
//! for one specific player. Stored settings are lenient: an event name that
//! is unknown or not selectable falls back to `MediaLoadStart`, a missing
//! player id means any player.

use crate::events::{PlayerEvent, PlayerEventKind};
use serde::{Deserialize, Serialize};

/// Event kinds a trigger can be configured for. `MediaLoaded` is not
/// selectable.
pub const TRIGGER_KINDS: [PlayerEventKind; 12] = [
    PlayerEventKind::LoadStart,
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

/// Stored trigger settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EventTriggerSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_event: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_id: Option<String>,
}

/// Which players a trigger applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerSpecificity {
    Any,
    Specific(String),
}

/// Normalized trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventTrigger {
    kind: PlayerEventKind,
    player: PlayerSpecificity,
}

impl EventTrigger {
    /// Event type used when the stored one is missing or unknown
    pub const DEFAULT_KIND: PlayerEventKind = PlayerEventKind::LoadStart;

    pub fn new(kind: PlayerEventKind, player: PlayerSpecificity) -> Self {
        Self { kind, player }
    }

    pub fn kind(&self) -> PlayerEventKind {
        self.kind
    }

    pub fn specificity(&self) -> &PlayerSpecificity {
        &self.player
    }

    /// Whether `event`, emitted by the player `player_id`, fires this trigger
    pub fn matches(&self, player_id: Option<&str>, event: &PlayerEvent) -> bool {
        if event.kind() != self.kind {
            return false;
        }
        match &self.player {
            PlayerSpecificity::Any => true,
            PlayerSpecificity::Specific(id) => player_id == Some(id.as_str()),
        }
    }

    pub fn to_settings(&self) -> EventTriggerSettings {
        EventTriggerSettings {
            player_event: Some(self.kind.as_str().to_string()),
            player_id: match &self.player {
                PlayerSpecificity::Any => None,
                PlayerSpecificity::Specific(id) => Some(id.clone()),
            },
        }
    }
}

impl From<EventTriggerSettings> for EventTrigger {
    fn from(settings: EventTriggerSettings) -> Self {
        let kind = settings
            .player_event
            .as_deref()
            .and_then(PlayerEventKind::from_name)
            .filter(|kind| TRIGGER_KINDS.contains(kind))
            .unwrap_or(Self::DEFAULT_KIND);

        let player = match settings.player_id {
            Some(id) if !id.trim().is_empty() => PlayerSpecificity::Specific(id),
            _ => PlayerSpecificity::Any,
        };

        Self { kind, player }
    }
}
