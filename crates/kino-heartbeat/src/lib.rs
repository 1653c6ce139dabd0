//! Kino Heartbeat - video analytics adapter for Kino
//!
//! Bridges the player's playback lifecycle events to a session-based
//! analytics tracker (heartbeat SDK):
//! - Asynchronous tracker construction through a host-provided factory
//! - Buffering of session-critical events until the tracker is ready
//! - Mapping of player events onto tracker sessions, states and event tags
//! - Fail-safe shutdown when the tracker cannot be created
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  PlayerEvent   ┌────────────────────┐  track_*()  ┌──────────────┐
//! │    Player    │ ─────────────▶ │  AnalyticsAdapter  │ ──────────▶ │   Tracker    │
//! │ (dispatcher) │ ◀── position ─ │  pending → ready   │             │ (heartbeat)  │
//! └──────────────┘      / QoS     │          ↘ failed  │             └──────▲───────┘
//!                                 └─────────┬──────────┘                    │
//!                                           │ get_instance(delegate)        │
//!                                           ▼                               │
//!                                 ┌────────────────────┐  completion        │
//!                                 │   TrackerFactory   │ ───────────────────┘
//!                                 └────────────────────┘
//! ```

pub mod adapter;
pub mod config;
pub mod error;
pub mod events;
pub mod player;
pub mod tracker;
pub mod trigger;

pub use adapter::{AdapterStatus, AnalyticsAdapter, TrackerCompletion, SUBSCRIBED_EVENTS};
pub use config::{AdapterSettings, TrackerConfig};
pub use error::{Error, Result};
pub use events::{EventInfo, MediaInfo, PlaybackError, PlayerEvent, PlayerEventKind};
pub use player::{EventDispatcher, EventHandler, Player, QosInfo, SubscriptionId};
pub use tracker::{
    AsyncTrackerFactory, CallLog, CustomMetadata, MediaObject, PlayerDelegate, QosObject,
    RecordingTracker, SpawnedFactory, StreamType, TrackResult, Tracker, TrackerCall,
    TrackerError, TrackerEvent, TrackerFactory, TrackerHandle,
};
pub use trigger::{EventTrigger, EventTriggerSettings, PlayerSpecificity, TRIGGER_KINDS};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
