//! Analytics SDK collaborator interface
//!
//! Mirrors the heartbeat tracker contract: explicit session start/end,
//! play/pause state calls and discrete event tags. Trackers are created
//! asynchronously by a [`TrackerFactory`], which settles the construction
//! through a single-shot [`TrackerCompletion`].

use crate::adapter::{PlayerSlot, TrackerCompletion};
use crate::config::TrackerConfig;
use crate::player::QosInfo;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::debug;

/// Custom metadata attached to a tracking session
pub type CustomMetadata = BTreeMap<String, String>;

/// Tracker failure types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackerError {
    #[error("Tracker unavailable: {0}")]
    Unavailable(String),

    #[error("Tracker call failed: {0}")]
    Call(String),

    #[error("Tracker construction abandoned before settling")]
    Abandoned,
}

/// Result of a single tracker call
pub type TrackResult = std::result::Result<(), TrackerError>;

/// Stream type of the tracked media
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamType {
    /// Video on demand
    Vod,
    /// Live stream
    Live,
}

impl std::fmt::Display for StreamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamType::Vod => write!(f, "vod"),
            StreamType::Live => write!(f, "live"),
        }
    }
}

/// Media descriptor passed when a session starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaObject {
    pub name: String,
    pub id: String,
    pub length: f64,
    pub stream_type: StreamType,
}

impl MediaObject {
    pub fn new(
        name: impl Into<String>,
        id: impl Into<String>,
        length: f64,
        stream_type: StreamType,
    ) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            length,
            stream_type,
        }
    }
}

/// Quality of service value object polled by the tracker
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QosObject {
    pub bitrate: f64,
    pub startup_time: f64,
    pub fps: f64,
    pub dropped_frames: u64,
}

impl From<QosInfo> for QosObject {
    fn from(qos: QosInfo) -> Self {
        Self {
            bitrate: qos.bitrate,
            startup_time: qos.start_time,
            fps: qos.fps,
            dropped_frames: qos.dropped_frames,
        }
    }
}

/// Discrete tracker event tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackerEvent {
    SeekStart,
    SeekComplete,
    BufferStart,
    BufferComplete,
    BitrateChange,
}

impl std::fmt::Display for TrackerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackerEvent::SeekStart => write!(f, "seek_start"),
            TrackerEvent::SeekComplete => write!(f, "seek_complete"),
            TrackerEvent::BufferStart => write!(f, "buffer_start"),
            TrackerEvent::BufferComplete => write!(f, "buffer_complete"),
            TrackerEvent::BitrateChange => write!(f, "bitrate_change"),
        }
    }
}

/// Heartbeat tracker handle
///
/// Calls are made while the adapter holds its state lock. A `track_*` call
/// must not make the player emit an event synchronously on the calling
/// thread; emit from another task instead.
pub trait Tracker: Send {
    fn track_session_start(&mut self, media: MediaObject, metadata: CustomMetadata) -> TrackResult;
    fn track_session_end(&mut self) -> TrackResult;
    fn track_play(&mut self) -> TrackResult;
    fn track_pause(&mut self) -> TrackResult;
    fn track_event(&mut self, event: TrackerEvent) -> TrackResult;
    fn track_error(&mut self, message: &str) -> TrackResult;
    fn track_complete(&mut self) -> TrackResult;
}

/// Owned tracker as handed over by a factory
pub type TrackerHandle = Box<dyn Tracker>;

/// Playback accessors the tracker polls on demand
///
/// Reads go through the adapter's player slot, so they degrade to defaults
/// once the adapter has released the player.
#[derive(Clone)]
pub struct PlayerDelegate {
    player: PlayerSlot,
}

impl PlayerDelegate {
    pub(crate) fn new(player: PlayerSlot) -> Self {
        Self { player }
    }

    /// Current playback position, 0 when unavailable
    pub fn current_playback_time(&self) -> f64 {
        let player = self.player.read().unwrap_or_else(PoisonError::into_inner);
        match player.as_ref() {
            Some(player) => {
                let time = player.current_time();
                if time.is_nan() {
                    0.0
                } else {
                    time
                }
            }
            None => 0.0,
        }
    }

    /// Quality of service snapshot, `None` once the player is released
    pub fn qos_object(&self) -> Option<QosObject> {
        let player = self.player.read().unwrap_or_else(PoisonError::into_inner);
        player.as_ref().map(|p| QosObject::from(p.qos_info()))
    }
}

impl std::fmt::Debug for PlayerDelegate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerDelegate")
            .field("position", &self.current_playback_time())
            .finish()
    }
}

/// Host-provided tracker factory
///
/// Implementations must eventually settle `completion` exactly once, either
/// synchronously or from any later point; dropping it unsettled counts as a
/// failed construction.
pub trait TrackerFactory: Send + Sync {
    fn get_instance(
        &self,
        delegate: PlayerDelegate,
        config: TrackerConfig,
        completion: TrackerCompletion,
    );
}

/// Tracker factory expressed as an async operation
#[async_trait]
pub trait AsyncTrackerFactory: Send + Sync {
    async fn get_instance(
        &self,
        delegate: PlayerDelegate,
        config: TrackerConfig,
    ) -> Result<TrackerHandle, TrackerError>;
}

/// Runs an [`AsyncTrackerFactory`] as a tokio task and settles the completion
/// with its outcome
///
/// Outside a tokio runtime the construction fails with
/// [`TrackerError::Unavailable`].
pub struct SpawnedFactory<F> {
    inner: Arc<F>,
}

impl<F> SpawnedFactory<F>
where
    F: AsyncTrackerFactory + 'static,
{
    pub fn new(factory: F) -> Self {
        Self {
            inner: Arc::new(factory),
        }
    }
}

impl<F> TrackerFactory for SpawnedFactory<F>
where
    F: AsyncTrackerFactory + 'static,
{
    fn get_instance(
        &self,
        delegate: PlayerDelegate,
        config: TrackerConfig,
        completion: TrackerCompletion,
    ) {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(error) => {
                completion.fail(TrackerError::Unavailable(format!("no tokio runtime: {error}")));
                return;
            }
        };

        let factory = Arc::clone(&self.inner);
        runtime.spawn(async move {
            let result = factory.get_instance(delegate, config).await;
            completion.resolve(result);
        });
    }
}

/// A call received by a [`RecordingTracker`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum TrackerCall {
    SessionStart {
        media: MediaObject,
        metadata: CustomMetadata,
    },
    SessionEnd,
    Play,
    Pause,
    Event {
        event: TrackerEvent,
    },
    Error {
        message: String,
    },
    Complete,
}

/// Shared view of the calls recorded by a [`RecordingTracker`]
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<TrackerCall>>>,
}

impl CallLog {
    /// Copy of the calls recorded so far, in order
    pub fn snapshot(&self) -> Vec<TrackerCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, call: TrackerCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

/// Tracker that records every call it receives
///
/// Used by the CLI to report what a scripted session would send, and by
/// hosts to inspect adapter behavior without a real SDK.
#[derive(Debug, Clone, Default)]
pub struct RecordingTracker {
    log: CallLog,
    failing: bool,
}

impl RecordingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracker that records calls but reports every one of them as failed
    pub fn failing() -> Self {
        Self {
            log: CallLog::default(),
            failing: true,
        }
    }

    /// Handle to the recorded calls
    pub fn log(&self) -> CallLog {
        self.log.clone()
    }

    fn record(&mut self, call: TrackerCall) -> TrackResult {
        debug!(call = ?call, "Tracker call");
        self.log.push(call);
        if self.failing {
            Err(TrackerError::Call("recording tracker configured to fail".into()))
        } else {
            Ok(())
        }
    }
}

impl Tracker for RecordingTracker {
    fn track_session_start(&mut self, media: MediaObject, metadata: CustomMetadata) -> TrackResult {
        self.record(TrackerCall::SessionStart { media, metadata })
    }

    fn track_session_end(&mut self) -> TrackResult {
        self.record(TrackerCall::SessionEnd)
    }

    fn track_play(&mut self) -> TrackResult {
        self.record(TrackerCall::Play)
    }

    fn track_pause(&mut self) -> TrackResult {
        self.record(TrackerCall::Pause)
    }

    fn track_event(&mut self, event: TrackerEvent) -> TrackResult {
        self.record(TrackerCall::Event { event })
    }

    fn track_error(&mut self, message: &str) -> TrackResult {
        self.record(TrackerCall::Error {
            message: message.to_string(),
        })
    }

    fn track_complete(&mut self) -> TrackResult {
        self.record(TrackerCall::Complete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::PlayerEventKind;
    use crate::player::{EventHandler, Player, SubscriptionId};
    use std::sync::RwLock;

    struct FixedPlayer {
        time: f64,
    }

    impl Player for FixedPlayer {
        fn on(&self, _kind: PlayerEventKind, _handler: EventHandler) -> SubscriptionId {
            SubscriptionId::new()
        }

        fn off(&self, _id: SubscriptionId) -> bool {
            false
        }

        fn current_time(&self) -> f64 {
            self.time
        }

        fn qos_info(&self) -> QosInfo {
            QosInfo {
                bitrate: 2_500_000.0,
                dropped_frames: 7,
                fps: 29.97,
                start_time: 850.0,
            }
        }
    }

    fn delegate_for(player: Option<FixedPlayer>) -> PlayerDelegate {
        let player = player.map(|p| Arc::new(p) as Arc<dyn Player>);
        PlayerDelegate::new(Arc::new(RwLock::new(player)))
    }

    #[test]
    fn test_delegate_position() {
        assert_eq!(delegate_for(Some(FixedPlayer { time: 12.5 })).current_playback_time(), 12.5);
        assert_eq!(delegate_for(Some(FixedPlayer { time: f64::NAN })).current_playback_time(), 0.0);
        assert_eq!(delegate_for(None).current_playback_time(), 0.0);
    }

    #[test]
    fn test_delegate_qos_mapping() {
        let qos = delegate_for(Some(FixedPlayer { time: 0.0 })).qos_object().unwrap();
        assert_eq!(qos.bitrate, 2_500_000.0);
        assert_eq!(qos.dropped_frames, 7);
        assert_eq!(qos.fps, 29.97);
        assert_eq!(qos.startup_time, 850.0);

        assert!(delegate_for(None).qos_object().is_none());
    }

    #[test]
    fn test_recording_tracker() {
        let mut tracker = RecordingTracker::new();
        let log = tracker.log();
        tracker.track_play().unwrap();
        tracker.track_event(TrackerEvent::BufferStart).unwrap();

        assert_eq!(
            log.snapshot(),
            vec![
                TrackerCall::Play,
                TrackerCall::Event {
                    event: TrackerEvent::BufferStart
                }
            ]
        );
    }

    #[test]
    fn test_failing_tracker_still_records() {
        let mut tracker = RecordingTracker::failing();
        assert!(tracker.track_complete().is_err());
        assert_eq!(tracker.log().len(), 1);
    }
}
