//! Analytics adapter - player events to heartbeat tracker calls
//!
//! Lifecycle of the tracker:
//! - `Pending`: the factory has not settled yet. `MediaLoaded`, `MediaPlay`
//!   and `MediaPause` are queued, everything else is dropped.
//! - `Ready`: the queue is replayed once, then events are dispatched live.
//! - `Failed`: construction failed. The adapter has unsubscribed and ignores
//!   any event that still reaches it.
//! - `Released`: the adapter was destroyed after settlement.
//!
//! Settlement and replay run under the same lock as live dispatch, so queued
//! events always reach the tracker before anything emitted afterwards.

use crate::config::AdapterSettings;
use crate::events::{MediaInfo, PlayerEvent, PlayerEventKind};
use crate::player::{EventHandler, Player, SubscriptionId};
use crate::tracker::{
    MediaObject, PlayerDelegate, StreamType, TrackResult, Tracker, TrackerError, TrackerEvent,
    TrackerFactory, TrackerHandle,
};
use crate::{Error, Result};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use tracing::{debug, info, instrument, trace, warn};

/// Player reference shared with the tracker delegate
pub(crate) type PlayerSlot = Arc<RwLock<Option<Arc<dyn Player>>>>;

/// Event kinds the adapter listens to
pub const SUBSCRIBED_EVENTS: [PlayerEventKind; 11] = [
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
];

enum Lifecycle {
    Pending,
    Ready(TrackerHandle),
    Failed,
    Released,
}

struct AdapterState {
    lifecycle: Lifecycle,
    session_open: bool,
    pending: VecDeque<PlayerEvent>,
    subscriptions: Vec<SubscriptionId>,
}

impl AdapterState {
    fn new() -> Self {
        Self {
            lifecycle: Lifecycle::Pending,
            session_open: false,
            pending: VecDeque::new(),
            subscriptions: Vec::new(),
        }
    }

    fn handle_event(&mut self, event: &PlayerEvent) {
        match &mut self.lifecycle {
            Lifecycle::Failed | Lifecycle::Released => {
                trace!(kind = %event.kind(), "Ignoring event, tracker unavailable");
            }
            Lifecycle::Pending => {
                if is_session_critical(event.kind()) {
                    self.pending.push_back(event.clone());
                    debug!(
                        kind = %event.kind(),
                        queued = self.pending.len(),
                        "Queued event until tracker is ready"
                    );
                } else {
                    debug!(kind = %event.kind(), "Dropped event received before tracker is ready");
                }
            }
            Lifecycle::Ready(tracker) => {
                dispatch(&mut **tracker, &mut self.session_open, event);
            }
        }
    }
}

/// Events whose loss would corrupt the session: its start and the initial
/// play/pause state
fn is_session_critical(kind: PlayerEventKind) -> bool {
    matches!(
        kind,
        PlayerEventKind::Loaded | PlayerEventKind::Play | PlayerEventKind::Pause
    )
}

fn dispatch(tracker: &mut dyn Tracker, session_open: &mut bool, event: &PlayerEvent) {
    let outcome = match event {
        PlayerEvent::Loaded(media) => start_session(tracker, session_open, media),
        PlayerEvent::Play => tracker.track_play(),
        PlayerEvent::Pause => tracker.track_pause(),
        PlayerEvent::SeekStart => tracker.track_event(TrackerEvent::SeekStart),
        PlayerEvent::SeekEnd => tracker.track_event(TrackerEvent::SeekComplete),
        PlayerEvent::BufferStart => tracker.track_event(TrackerEvent::BufferStart),
        PlayerEvent::BufferEnd => tracker.track_event(TrackerEvent::BufferComplete),
        PlayerEvent::BitrateChange => tracker.track_event(TrackerEvent::BitrateChange),
        PlayerEvent::Error(err) => tracker.track_error(&format!("Player Error : {}", err.error)),
        PlayerEvent::Complete => {
            if let Err(error) = tracker.track_complete() {
                warn!(%error, "Tracker rejected completion");
            }
            close_session(tracker, session_open)
        }
        PlayerEvent::Abort => close_session(tracker, session_open),
        PlayerEvent::LoadStart | PlayerEvent::TimeUpdate => Ok(()),
    };

    if let Err(error) = outcome {
        warn!(kind = %event.kind(), %error, "Tracker call failed");
    }
}

fn start_session(
    tracker: &mut dyn Tracker,
    session_open: &mut bool,
    media: &MediaInfo,
) -> TrackResult {
    if *session_open {
        if let Err(error) = close_session(tracker, session_open) {
            warn!(%error, "Tracker rejected end of previous session");
        }
    }

    let media_object = MediaObject::new(
        media.name.clone(),
        media.id.clone(),
        media.length,
        StreamType::Vod,
    );
    tracker.track_session_start(media_object, media.metadata.clone())?;
    *session_open = true;
    info!(id = %media.id, name = %media.name, length = media.length, "Tracking session started");
    Ok(())
}

fn close_session(tracker: &mut dyn Tracker, session_open: &mut bool) -> TrackResult {
    *session_open = false;
    debug!("Tracking session closed");
    tracker.track_session_end()
}

struct Shared {
    state: Mutex<AdapterState>,
    player: PlayerSlot,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, AdapterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn player(&self) -> Option<Arc<dyn Player>> {
        self.player
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn take_player(&self) -> Option<Arc<dyn Player>> {
        self.player
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn settle(&self, result: std::result::Result<TrackerHandle, TrackerError>) {
        let detach = {
            let mut state = self.lock();
            match result {
                Ok(tracker) => {
                    state.lifecycle = Lifecycle::Ready(tracker);
                    let queued: Vec<PlayerEvent> = state.pending.drain(..).collect();
                    info!(replayed = queued.len(), "Video analytics tracker ready");
                    for event in &queued {
                        state.handle_event(event);
                    }
                    None
                }
                Err(error) => {
                    warn!(%error, "Creating video analytics tracker failed");
                    state.lifecycle = Lifecycle::Failed;
                    state.pending.clear();
                    let subscriptions = std::mem::take(&mut state.subscriptions);
                    self.player().map(|player| (player, subscriptions))
                }
            }
        };

        if let Some((player, subscriptions)) = detach {
            unsubscribe_all(player.as_ref(), subscriptions);
        }
    }
}

fn unsubscribe_all(player: &dyn Player, subscriptions: Vec<SubscriptionId>) {
    let count = subscriptions.len();
    for id in subscriptions {
        if !player.off(id) {
            debug!(subscription = %id, "Listener already removed");
        }
    }
    debug!(count, "Player listeners removed");
}

/// Single-shot settlement of an in-flight tracker construction
///
/// Consumed by [`resolve`](Self::resolve). Dropping it unsettled fails the
/// construction with [`TrackerError::Abandoned`].
pub struct TrackerCompletion {
    shared: Option<Arc<Shared>>,
}

impl TrackerCompletion {
    /// Settle the construction with the factory's outcome
    pub fn resolve(mut self, result: std::result::Result<TrackerHandle, TrackerError>) {
        if let Some(shared) = self.shared.take() {
            shared.settle(result);
        }
    }

    pub fn succeed(self, tracker: impl Tracker + 'static) {
        self.resolve(Ok(Box::new(tracker)));
    }

    pub fn fail(self, error: TrackerError) {
        self.resolve(Err(error));
    }
}

impl Drop for TrackerCompletion {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            shared.settle(Err(TrackerError::Abandoned));
        }
    }
}

impl std::fmt::Debug for TrackerCompletion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackerCompletion")
            .field("settled", &self.shared.is_none())
            .finish()
    }
}

/// Snapshot of the adapter's internal state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AdapterStatus {
    pub construction_in_flight: bool,
    pub hard_failure: bool,
    pub tracker_ready: bool,
    pub session_open: bool,
    pub pending_events: usize,
    pub subscriptions: usize,
}

/// Bridges a player's event stream to a heartbeat tracker
pub struct AnalyticsAdapter {
    shared: Arc<Shared>,
}

impl AnalyticsAdapter {
    /// Create the adapter, subscribe to `player` and start tracker construction
    ///
    /// Fails only when the SDK factory is unavailable. Settings are handed to
    /// the factory as they are. The factory may settle before this returns.
    #[instrument(skip_all)]
    pub fn create(
        settings: &AdapterSettings,
        player: Arc<dyn Player>,
        sdk: Option<Arc<dyn TrackerFactory>>,
    ) -> Result<Self> {
        let factory = sdk.ok_or(Error::AnalyticsUnavailable)?;

        let shared = Arc::new(Shared {
            state: Mutex::new(AdapterState::new()),
            player: Arc::new(RwLock::new(Some(Arc::clone(&player)))),
        });

        let handler = event_handler(Arc::downgrade(&shared));
        let subscriptions: Vec<SubscriptionId> = SUBSCRIBED_EVENTS
            .iter()
            .map(|&kind| player.on(kind, Arc::clone(&handler)))
            .collect();
        debug!(count = subscriptions.len(), "Player listeners registered");
        shared.lock().subscriptions = subscriptions;

        let delegate = PlayerDelegate::new(Arc::clone(&shared.player));
        let completion = TrackerCompletion {
            shared: Some(Arc::clone(&shared)),
        };
        info!("Creating video analytics tracker");
        factory.get_instance(delegate, settings.tracker.clone(), completion);

        Ok(Self { shared })
    }

    /// Detach from the player and release it
    ///
    /// Idempotent. An open tracking session is left as is, and an in-flight
    /// construction is not cancelled.
    pub fn destroy(&self) {
        let detach = {
            let mut state = self.shared.lock();
            let Some(player) = self.shared.take_player() else {
                return;
            };
            state.session_open = false;
            if matches!(state.lifecycle, Lifecycle::Ready(_) | Lifecycle::Failed) {
                state.lifecycle = Lifecycle::Released;
            }
            (player, std::mem::take(&mut state.subscriptions))
        };

        let (player, subscriptions) = detach;
        unsubscribe_all(player.as_ref(), subscriptions);
        info!("Video analytics adapter destroyed");
    }

    /// Current state of the tracker lifecycle and session
    pub fn status(&self) -> AdapterStatus {
        let state = self.shared.lock();
        AdapterStatus {
            construction_in_flight: matches!(state.lifecycle, Lifecycle::Pending),
            hard_failure: matches!(state.lifecycle, Lifecycle::Failed),
            tracker_ready: matches!(state.lifecycle, Lifecycle::Ready(_)),
            session_open: state.session_open,
            pending_events: state.pending.len(),
            subscriptions: state.subscriptions.len(),
        }
    }
}

impl Drop for AnalyticsAdapter {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for AnalyticsAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyticsAdapter")
            .field("status", &self.status())
            .finish()
    }
}

fn event_handler(shared: Weak<Shared>) -> EventHandler {
    Arc::new(move |event: &PlayerEvent| {
        if let Some(shared) = shared.upgrade() {
            shared.lock().handle_event(event);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::{EventDispatcher, QosInfo};
    use crate::tracker::{RecordingTracker, TrackerCall};

    #[derive(Default)]
    struct SpyPlayer {
        dispatcher: EventDispatcher,
    }

    impl Player for SpyPlayer {
        fn on(&self, kind: PlayerEventKind, handler: EventHandler) -> SubscriptionId {
            self.dispatcher.on(kind, handler)
        }

        fn off(&self, id: SubscriptionId) -> bool {
            self.dispatcher.off(id)
        }

        fn current_time(&self) -> f64 {
            0.0
        }

        fn qos_info(&self) -> QosInfo {
            QosInfo::default()
        }
    }

    /// Factory that hands the completion back to the test
    #[derive(Default)]
    struct DeferredFactory {
        completion: Mutex<Option<TrackerCompletion>>,
    }

    impl DeferredFactory {
        fn take(&self) -> TrackerCompletion {
            self.completion.lock().unwrap().take().expect("construction started")
        }
    }

    impl TrackerFactory for DeferredFactory {
        fn get_instance(
            &self,
            _delegate: PlayerDelegate,
            _config: crate::TrackerConfig,
            completion: TrackerCompletion,
        ) {
            *self.completion.lock().unwrap() = Some(completion);
        }
    }

    fn setup() -> (Arc<SpyPlayer>, Arc<DeferredFactory>, AnalyticsAdapter) {
        let player = Arc::new(SpyPlayer::default());
        let factory = Arc::new(DeferredFactory::default());
        let adapter = AnalyticsAdapter::create(
            &AdapterSettings::default(),
            player.clone(),
            Some(factory.clone()),
        )
        .unwrap();
        (player, factory, adapter)
    }

    #[test]
    fn test_create_without_sdk_fails() {
        let player = Arc::new(SpyPlayer::default());
        let result = AnalyticsAdapter::create(&AdapterSettings::default(), player.clone(), None);
        assert!(matches!(result, Err(Error::AnalyticsUnavailable)));
        assert_eq!(player.dispatcher.total_listeners(), 0);
    }

    #[test]
    fn test_initial_state() {
        let (player, _factory, adapter) = setup();
        let status = adapter.status();

        assert!(status.construction_in_flight);
        assert!(!status.hard_failure);
        assert!(!status.session_open);
        assert_eq!(status.pending_events, 0);
        assert_eq!(status.subscriptions, SUBSCRIBED_EVENTS.len());
        assert_eq!(player.dispatcher.listener_count(PlayerEventKind::LoadStart), 0);
        assert_eq!(player.dispatcher.listener_count(PlayerEventKind::TimeUpdate), 0);
        assert_eq!(player.dispatcher.listener_count(PlayerEventKind::Loaded), 1);
    }

    #[test]
    fn test_only_session_critical_events_are_queued() {
        let (player, _factory, adapter) = setup();

        for event in [
            PlayerEvent::loaded("v1"),
            PlayerEvent::BufferStart,
            PlayerEvent::Play,
            PlayerEvent::SeekStart,
            PlayerEvent::BitrateChange,
            PlayerEvent::Pause,
            PlayerEvent::error("early"),
        ] {
            player.dispatcher.trigger(&event);
        }

        assert_eq!(adapter.status().pending_events, 3);
    }

    #[test]
    fn test_replay_preserves_order() {
        let (player, factory, adapter) = setup();
        player.dispatcher.trigger(&PlayerEvent::loaded("v1"));
        player.dispatcher.trigger(&PlayerEvent::Pause);
        player.dispatcher.trigger(&PlayerEvent::Play);

        let tracker = RecordingTracker::new();
        let log = tracker.log();
        factory.take().succeed(tracker);

        let calls = log.snapshot();
        assert_eq!(calls.len(), 3);
        assert!(matches!(calls[0], TrackerCall::SessionStart { .. }));
        assert_eq!(calls[1], TrackerCall::Pause);
        assert_eq!(calls[2], TrackerCall::Play);

        let status = adapter.status();
        assert!(status.tracker_ready);
        assert!(status.session_open);
        assert_eq!(status.pending_events, 0);
    }

    #[test]
    fn test_dropped_completion_fails_construction() {
        let (player, factory, adapter) = setup();
        drop(factory.take());

        assert!(adapter.status().hard_failure);
        assert_eq!(player.dispatcher.total_listeners(), 0);
    }

    #[test]
    fn test_tracker_call_errors_are_absorbed() {
        let (player, factory, adapter) = setup();
        let tracker = RecordingTracker::failing();
        let log = tracker.log();
        factory.take().succeed(tracker);

        player.dispatcher.trigger(&PlayerEvent::loaded("v1"));
        player.dispatcher.trigger(&PlayerEvent::Play);
        player.dispatcher.trigger(&PlayerEvent::Complete);

        // start failed, so the session never opened
        assert!(!adapter.status().session_open);
        assert_eq!(
            log.snapshot()[1..],
            [TrackerCall::Play, TrackerCall::Complete, TrackerCall::SessionEnd]
        );
    }

    #[test]
    fn test_destroy_releases_tracker() {
        let (player, factory, adapter) = setup();
        factory.take().succeed(RecordingTracker::new());
        player.dispatcher.trigger(&PlayerEvent::loaded("v1"));
        assert!(adapter.status().session_open);

        adapter.destroy();
        let status = adapter.status();
        assert!(!status.session_open);
        assert!(!status.tracker_ready);
        assert!(!status.hard_failure);
        assert_eq!(status.subscriptions, 0);
        assert_eq!(player.dispatcher.total_listeners(), 0);
    }

    #[test]
    fn test_drop_detaches_from_player() {
        let (player, _factory, adapter) = setup();
        drop(adapter);
        assert_eq!(player.dispatcher.total_listeners(), 0);
    }
}
