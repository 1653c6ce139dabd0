//! Simulated player and analytics SDK for scripted replays

use async_trait::async_trait;
use kino_heartbeat::{
    AsyncTrackerFactory, EventDispatcher, EventHandler, EventInfo, Player, PlayerDelegate,
    PlayerEvent, PlayerEventKind, QosInfo, RecordingTracker, SubscriptionId, TrackerConfig,
    TrackerError, TrackerHandle,
};
use serde::Deserialize;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info};

/// One entry of an event script
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptStep {
    #[serde(rename = "type")]
    pub kind: PlayerEventKind,
    #[serde(default)]
    pub info: EventInfo,
    /// Wait before emitting the event
    #[serde(default)]
    pub delay_ms: u64,
    /// Playback position reported from this step on
    #[serde(default)]
    pub position: Option<f64>,
    /// QoS snapshot reported from this step on
    #[serde(default)]
    pub qos: Option<QosInfo>,
}

impl ScriptStep {
    pub fn event(&self) -> PlayerEvent {
        PlayerEvent::new(self.kind, self.info.clone())
    }
}

/// Parse a JSON event script
pub fn parse_script(json: &str) -> anyhow::Result<Vec<ScriptStep>> {
    Ok(serde_json::from_str(json)?)
}

/// Player driven by a script
#[derive(Debug)]
pub struct SimulatedPlayer {
    dispatcher: EventDispatcher,
    position: Mutex<f64>,
    qos: Mutex<QosInfo>,
}

impl SimulatedPlayer {
    pub fn new() -> Self {
        Self {
            dispatcher: EventDispatcher::new(),
            position: Mutex::new(f64::NAN),
            qos: Mutex::new(QosInfo::default()),
        }
    }

    /// Apply the step's player state, then emit its event
    pub fn play_step(&self, step: &ScriptStep) -> usize {
        if let Some(position) = step.position {
            *self.position.lock().unwrap_or_else(|e| e.into_inner()) = position;
        }
        if let Some(qos) = step.qos {
            *self.qos.lock().unwrap_or_else(|e| e.into_inner()) = qos;
        }
        let delivered = self.dispatcher.trigger(&step.event());
        debug!(kind = %step.kind, delivered, "Player event emitted");
        delivered
    }

    pub fn listeners(&self) -> usize {
        self.dispatcher.total_listeners()
    }
}

impl Default for SimulatedPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl Player for SimulatedPlayer {
    fn on(&self, kind: PlayerEventKind, handler: EventHandler) -> SubscriptionId {
        self.dispatcher.on(kind, handler)
    }

    fn off(&self, id: SubscriptionId) -> bool {
        self.dispatcher.off(id)
    }

    fn current_time(&self) -> f64 {
        *self.position.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn qos_info(&self) -> QosInfo {
        *self.qos.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Analytics SDK whose tracker becomes available after a delay
pub struct SimulatedSdk {
    pub delay: Duration,
    pub fail: bool,
    pub tracker: RecordingTracker,
}

#[async_trait]
impl AsyncTrackerFactory for SimulatedSdk {
    async fn get_instance(
        &self,
        delegate: PlayerDelegate,
        config: TrackerConfig,
    ) -> Result<TrackerHandle, TrackerError> {
        tokio::time::sleep(self.delay).await;

        if self.fail {
            return Err(TrackerError::Unavailable(
                "simulated heartbeat initialization failure".into(),
            ));
        }

        info!(
            tracking_server = config.tracking_server.as_deref().unwrap_or("<none>"),
            position = delegate.current_playback_time(),
            "Simulated tracker created"
        );
        Ok(Box::new(self.tracker.clone()))
    }
}
