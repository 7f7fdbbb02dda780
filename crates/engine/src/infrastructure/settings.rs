//! Scheduler settings.
//!
//! Loaded once at startup: defaults, then an optional JSON file named by
//! `TACTICA_SETTINGS_FILE`, then individual `TACTICA_*` overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tactica_domain::DeclinePolicy;

/// Errors loading settings from disk.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to read settings file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Tunables for the reaction scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    /// Decline policy for abilities that do not set their own.
    pub default_decline_policy: DeclinePolicy,

    /// Fire a queued zone crossing as soon as the mover comes to rest at its
    /// destination, without waiting for the action-completed callback.
    pub fire_on_stabilize: bool,

    /// Attach the end-of-turn fallback expiry to every timed effect.
    pub attach_fallback_expiry: bool,

    /// Upper bound on offers processed for a single event.
    pub max_offers_per_event: usize,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            default_decline_policy: DeclinePolicy::ConsumeOnAcceptOnly,
            fire_on_stabilize: true,
            attach_fallback_expiry: true,
            max_offers_per_event: 16,
        }
    }
}

impl SchedulerSettings {
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Apply `TACTICA_*` overrides on top of `self`. Unparseable values keep
    /// the current setting.
    pub fn with_env_overrides(self) -> Self {
        Self {
            default_decline_policy: std::env::var("TACTICA_DECLINE_POLICY")
                .ok()
                .and_then(|v| parse_decline_policy(&v))
                .unwrap_or(self.default_decline_policy),
            fire_on_stabilize: env_or("TACTICA_FIRE_ON_STABILIZE", self.fire_on_stabilize),
            attach_fallback_expiry: env_or(
                "TACTICA_ATTACH_FALLBACK_EXPIRY",
                self.attach_fallback_expiry,
            ),
            max_offers_per_event: env_or("TACTICA_MAX_OFFERS_PER_EVENT", self.max_offers_per_event),
        }
    }

    /// Load from environment variables, using defaults for missing values.
    pub fn from_env() -> Result<Self, SettingsError> {
        let base = match std::env::var("TACTICA_SETTINGS_FILE") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        Ok(base.with_env_overrides())
    }
}

fn parse_decline_policy(value: &str) -> Option<DeclinePolicy> {
    match value.trim().to_ascii_lowercase().as_str() {
        "consume_on_decline" => Some(DeclinePolicy::ConsumeOnDecline),
        "consume_on_accept_only" => Some(DeclinePolicy::ConsumeOnAcceptOnly),
        _ => None,
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}
