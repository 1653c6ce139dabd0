//! Player-side collaborator interface
//!
//! The adapter only needs a way to (un)subscribe to playback events and two
//! read-only accessors. [`EventDispatcher`] is a ready-made listener registry
//! that player implementations can embed to satisfy the subscription half.

use crate::events::{PlayerEvent, PlayerEventKind};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::trace;
use uuid::Uuid;

/// Handle returned for every listener registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub Uuid);

impl SubscriptionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Listener callback
pub type EventHandler = Arc<dyn Fn(&PlayerEvent) + Send + Sync>;

/// Quality of service snapshot exposed by the player
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QosInfo {
    /// Current bitrate in bits per second
    pub bitrate: f64,
    /// Frames dropped since playback start
    pub dropped_frames: u64,
    /// Current frame rate
    pub fps: f64,
    /// Startup time in milliseconds
    pub start_time: f64,
}

/// Video player as seen by the analytics adapter
pub trait Player: Send + Sync {
    /// Register `handler` for events of `kind`
    fn on(&self, kind: PlayerEventKind, handler: EventHandler) -> SubscriptionId;

    /// Remove a registration, returns false if it was not registered
    fn off(&self, id: SubscriptionId) -> bool;

    /// Current playback position in seconds (may be NaN before metadata is known)
    fn current_time(&self) -> f64;

    /// Quality of service snapshot
    fn qos_info(&self) -> QosInfo;
}

struct Listener {
    id: SubscriptionId,
    kind: PlayerEventKind,
    handler: EventHandler,
}

/// Listener registry delivering events in registration order
#[derive(Default)]
pub struct EventDispatcher {
    listeners: Mutex<Vec<Listener>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn listeners(&self) -> MutexGuard<'_, Vec<Listener>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a listener
    pub fn on(&self, kind: PlayerEventKind, handler: EventHandler) -> SubscriptionId {
        let id = SubscriptionId::new();
        self.listeners().push(Listener { id, kind, handler });
        trace!(subscription = %id, kind = %kind, "Listener registered");
        id
    }

    /// Remove a listener
    pub fn off(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners();
        let before = listeners.len();
        listeners.retain(|l| l.id != id);
        before != listeners.len()
    }

    /// Deliver an event to its listeners, returns how many were invoked
    ///
    /// Handlers run outside the registry lock, so a handler may (un)subscribe.
    pub fn trigger(&self, event: &PlayerEvent) -> usize {
        let kind = event.kind();
        let handlers: Vec<EventHandler> = self
            .listeners()
            .iter()
            .filter(|l| l.kind == kind)
            .map(|l| Arc::clone(&l.handler))
            .collect();

        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }

    /// Number of listeners registered for `kind`
    pub fn listener_count(&self, kind: PlayerEventKind) -> usize {
        self.listeners().iter().filter(|l| l.kind == kind).count()
    }

    /// Number of listeners across all kinds
    pub fn total_listeners(&self) -> usize {
        self.listeners().len()
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("listeners", &self.total_listeners())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, EventHandler) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let handler: EventHandler = Arc::new(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        (count, handler)
    }

    #[test]
    fn test_trigger_matches_kind() {
        let dispatcher = EventDispatcher::new();
        let (plays, on_play) = counter();
        let (pauses, on_pause) = counter();
        dispatcher.on(PlayerEventKind::Play, on_play);
        dispatcher.on(PlayerEventKind::Pause, on_pause);

        assert_eq!(dispatcher.trigger(&PlayerEvent::Play), 1);
        assert_eq!(dispatcher.trigger(&PlayerEvent::Play), 1);
        assert_eq!(dispatcher.trigger(&PlayerEvent::SeekStart), 0);

        assert_eq!(plays.load(Ordering::SeqCst), 2);
        assert_eq!(pauses.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_off_removes_single_registration() {
        let dispatcher = EventDispatcher::new();
        let (count, handler) = counter();
        let first = dispatcher.on(PlayerEventKind::Play, Arc::clone(&handler));
        dispatcher.on(PlayerEventKind::Play, handler);

        assert!(dispatcher.off(first));
        assert!(!dispatcher.off(first));
        assert_eq!(dispatcher.listener_count(PlayerEventKind::Play), 1);

        dispatcher.trigger(&PlayerEvent::Play);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handler_can_unsubscribe_during_trigger() {
        let dispatcher = Arc::new(EventDispatcher::new());
        let slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));

        let d = Arc::clone(&dispatcher);
        let s = Arc::clone(&slot);
        let id = dispatcher.on(
            PlayerEventKind::Abort,
            Arc::new(move |_| {
                if let Some(id) = s.lock().unwrap().take() {
                    d.off(id);
                }
            }),
        );
        *slot.lock().unwrap() = Some(id);

        assert_eq!(dispatcher.trigger(&PlayerEvent::Abort), 1);
        assert_eq!(dispatcher.total_listeners(), 0);
    }
}
