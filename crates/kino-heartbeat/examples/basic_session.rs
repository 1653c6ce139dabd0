//! Basic analytics session example
//!
//! Demonstrates event queueing while the tracker is being created, and the
//! calls a typical VOD session produces.
//!
//! Run with: cargo run -p kino-heartbeat --example basic_session

use kino_heartbeat::{
    AdapterSettings, AnalyticsAdapter, EventDispatcher, EventHandler, Player, PlayerDelegate,
    PlayerEvent, PlayerEventKind, QosInfo, RecordingTracker, SubscriptionId, TrackerCompletion,
    TrackerConfig, TrackerFactory,
};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct DemoPlayer {
    dispatcher: EventDispatcher,
}

impl Player for DemoPlayer {
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

/// Holds on to the completion so the demo decides when the tracker is ready
#[derive(Default)]
struct DemoSdk {
    completion: Mutex<Option<TrackerCompletion>>,
}

impl TrackerFactory for DemoSdk {
    fn get_instance(&self, _: PlayerDelegate, _: TrackerConfig, completion: TrackerCompletion) {
        *self.completion.lock().unwrap() = Some(completion);
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    println!("Kino Heartbeat - Basic Session Example");
    println!("======================================\n");

    let player = Arc::new(DemoPlayer::default());
    let sdk = Arc::new(DemoSdk::default());
    let adapter = AnalyticsAdapter::create(
        &AdapterSettings::default(),
        player.clone(),
        Some(sdk.clone()),
    )
    .expect("sdk available");

    // Emitted before the tracker exists
    player.dispatcher.trigger(&PlayerEvent::loaded("trailer-01"));
    player.dispatcher.trigger(&PlayerEvent::BufferStart);
    player.dispatcher.trigger(&PlayerEvent::Play);
    println!("Pending events: {}", adapter.status().pending_events);

    // Tracker becomes available, queued events are replayed
    let tracker = RecordingTracker::new();
    let log = tracker.log();
    if let Some(completion) = sdk.completion.lock().unwrap().take() {
        completion.succeed(tracker);
    }

    player.dispatcher.trigger(&PlayerEvent::SeekStart);
    player.dispatcher.trigger(&PlayerEvent::SeekEnd);
    player.dispatcher.trigger(&PlayerEvent::Complete);

    println!("\nTracker calls:");
    for (i, call) in log.snapshot().iter().enumerate() {
        println!("  {}. {:?}", i + 1, call);
    }

    adapter.destroy();
    println!("\nListeners after destroy: {}", player.dispatcher.total_listeners());
}

