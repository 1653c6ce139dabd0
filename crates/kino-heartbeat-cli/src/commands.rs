//! CLI command implementations

use crate::output::{to_json, OutputFormat};
use crate::simulation::{parse_script, SimulatedPlayer, SimulatedSdk};
use chrono::{DateTime, Utc};
use kino_heartbeat::{
    AdapterSettings, AdapterStatus, AnalyticsAdapter, PlayerEventKind, RecordingTracker,
    SpawnedFactory, TrackerCall, SUBSCRIBED_EVENTS,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Options of the `replay` command
pub struct ReplayOptions {
    pub settings: Option<PathBuf>,
    pub init_delay_ms: u64,
    pub fail_init: bool,
    pub keep_alive: bool,
}

/// Result of a scripted replay
#[derive(Debug, Serialize)]
pub struct ReplayReport {
    pub generated_at: DateTime<Utc>,
    pub script: String,
    pub events: usize,
    pub delivered: usize,
    pub status: AdapterStatus,
    pub destroyed: bool,
    /// Player listeners still registered when the report was taken
    pub listeners: usize,
    pub calls: Vec<TrackerCall>,
}

/// Replay an event script through the adapter and print the report
pub async fn replay(
    script_path: &Path,
    options: ReplayOptions,
    format: &str,
) -> anyhow::Result<ReplayReport> {
    let settings = match &options.settings {
        Some(path) => AdapterSettings::from_file(path)?,
        None => AdapterSettings::default(),
    };
    let steps = parse_script(&std::fs::read_to_string(script_path)?)?;
    info!(script = %script_path.display(), events = steps.len(), "Replaying event script");

    let tracker = RecordingTracker::new();
    let log = tracker.log();
    let init_delay = Duration::from_millis(options.init_delay_ms);
    let sdk = SimulatedSdk {
        delay: init_delay,
        fail: options.fail_init,
        tracker,
    };

    let player = Arc::new(SimulatedPlayer::new());
    let adapter = AnalyticsAdapter::create(
        &settings,
        player.clone(),
        Some(Arc::new(SpawnedFactory::new(sdk))),
    )?;

    let mut delivered = 0;
    for step in &steps {
        if step.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(step.delay_ms)).await;
        }
        delivered += player.play_step(step);
    }

    let settled = tokio::time::timeout(init_delay + Duration::from_secs(1), async {
        while adapter.status().construction_in_flight {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    if settled.is_err() {
        warn!("Tracker construction did not settle");
    }

    let status = adapter.status();
    if !options.keep_alive {
        adapter.destroy();
    }

    let report = ReplayReport {
        generated_at: Utc::now(),
        script: script_path.display().to_string(),
        events: steps.len(),
        delivered,
        status,
        destroyed: !options.keep_alive,
        listeners: player.listeners(),
        calls: log.snapshot(),
    };

    match OutputFormat::from(format) {
        OutputFormat::Json => println!("{}", to_json(&report)),
        OutputFormat::Text => print_report(&report),
    }

    Ok(report)
}

fn print_report(report: &ReplayReport) {
    println!("Replay: {}", report.script);
    println!("  Events: {} ({} delivered to listeners)", report.events, report.delivered);
    println!("  Tracker ready: {}", report.status.tracker_ready);
    println!("  Hard failure: {}", report.status.hard_failure);
    println!("  Session open: {}", report.status.session_open);
    println!("  Adapter destroyed: {}", report.destroyed);
    println!("  Player listeners: {}", report.listeners);

    println!("\nTracker calls:");
    if report.calls.is_empty() {
        println!("  (none)");
    }
    for (i, call) in report.calls.iter().enumerate() {
        println!("  {}. {}", i + 1, describe_call(call));
    }
}

fn describe_call(call: &TrackerCall) -> String {
    match call {
        TrackerCall::SessionStart { media, metadata } => {
            let mut line = format!(
                "session start: {} (id={}, length={}, {})",
                media.name, media.id, media.length, media.stream_type
            );
            if !metadata.is_empty() {
                let pairs: Vec<String> = metadata.iter().map(|(k, v)| format!("{k}={v}")).collect();
                line.push_str(&format!(" [{}]", pairs.join(", ")));
            }
            line
        }
        TrackerCall::SessionEnd => "session end".to_string(),
        TrackerCall::Play => "play".to_string(),
        TrackerCall::Pause => "pause".to_string(),
        TrackerCall::Event { event } => format!("event: {event}"),
        TrackerCall::Error { message } => format!("error: {message}"),
        TrackerCall::Complete => "complete".to_string(),
    }
}

#[derive(Serialize)]
struct KindRow {
    name: &'static str,
    label: &'static str,
    subscribed: bool,
}

/// List player event kinds
pub fn kinds(format: &str) {
    let rows: Vec<KindRow> = PlayerEventKind::ALL
        .into_iter()
        .map(|kind| KindRow {
            name: kind.as_str(),
            label: kind.label(),
            subscribed: SUBSCRIBED_EVENTS.contains(&kind),
        })
        .collect();

    match OutputFormat::from(format) {
        OutputFormat::Json => println!("{}", to_json(&rows)),
        OutputFormat::Text => {
            println!("Player events:");
            for row in &rows {
                let marker = if row.subscribed { "*" } else { " " };
                println!("  {} {:<20} {}", marker, row.name, row.label);
            }
            println!("\n  * forwarded to the analytics tracker");
        }
    }
}
