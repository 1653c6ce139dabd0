//! Adapter settings
//!
//! Settings are stored by the host as JSON. Unknown tracker keys are kept and
//! forwarded to the factory untouched.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// Configuration handed to the tracker factory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrackerConfig {
    /// Heartbeat tracking server host
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_server: Option<String>,
    /// Publisher channel
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// Name of the player reported with every session
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_name: Option<String>,
    /// Online video platform
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ovp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    /// Send beacons over HTTPS
    pub ssl: bool,
    /// Enable SDK-side debug logging
    pub debug_logging: bool,
    /// Any other SDK keys
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TrackerConfig {
    /// Check the values the SDK cannot recover from
    pub fn validate(&self) -> Result<()> {
        if let Some(server) = &self.tracking_server {
            if server.trim().is_empty() {
                return Err(Error::config("tracking server must not be empty"));
            }
        }
        if let Some(name) = &self.player_name {
            if name.trim().is_empty() {
                return Err(Error::config("player name must not be empty"));
            }
        }
        Ok(())
    }
}

/// Settings the adapter is created with
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AdapterSettings {
    pub tracker: TrackerConfig,
}

impl AdapterSettings {
    /// Parse settings from a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        self.tracker.validate()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings = AdapterSettings::from_json("{}").unwrap();
        assert_eq!(settings, AdapterSettings::default());
        assert!(!settings.tracker.ssl);
        assert!(settings.tracker.extra.is_empty());
    }

    #[test]
    fn test_settings_parse() {
        let settings = AdapterSettings::from_json(
            r#"{
                "tracker": {
                    "trackingServer": "heartbeat.example.com",
                    "playerName": "kino",
                    "ssl": true,
                    "marketingCloudOrgId": "ORG@Cloud"
                }
            }"#,
        )
        .unwrap();

        let tracker = &settings.tracker;
        assert_eq!(tracker.tracking_server.as_deref(), Some("heartbeat.example.com"));
        assert_eq!(tracker.player_name.as_deref(), Some("kino"));
        assert!(tracker.ssl);
        assert_eq!(tracker.extra["marketingCloudOrgId"], "ORG@Cloud");
    }

    #[test]
    fn test_settings_reject_empty_server() {
        let err = AdapterSettings::from_json(r#"{ "tracker": { "trackingServer": "  " } }"#)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_settings_malformed_json() {
        let err = AdapterSettings::from_json("{ tracker").unwrap_err();
        assert_eq!(err.error_code(), "JSON");
    }
}
