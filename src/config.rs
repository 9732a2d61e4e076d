//! Config model and persistence helpers.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};

use crate::{
    notify::NotificationPermission,
    routing::TripEstimate,
    tracking::{DispatchTimer, JobFeed, ProgressTicker},
};

/// Top-level configuration stored in `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Quote validity.
    pub pricing: PricingCfg,
    /// Trip returned by the mocked routing service.
    pub trip: TripEstimate,
    /// Timings of the dispatch/delivery/offer simulation.
    pub simulation: SimulationCfg,
    /// Category suggestion backend.
    pub suggestion: SuggestionConfig,
    /// Initial notification permission.
    pub notifications: NotificationsCfg,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingCfg {
    /// Seconds a quote stays confirmable.
    pub quote_ttl_secs: i64,
}

impl Default for PricingCfg {
    fn default() -> Self {
        Self {
            quote_ttl_secs: crate::quote::DEFAULT_QUOTE_TTL_SECS,
        }
    }
}

impl PricingCfg {
    pub fn quote_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.quote_ttl_secs.max(0))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationCfg {
    /// Delay between confirmation and driver assignment.
    pub dispatch_delay_ms: u64,
    /// Time from pickup to delivery.
    pub delivery_duration_ms: u64,
    /// Progress update period.
    pub tick_ms: u64,
    /// Spacing of driver job offers.
    pub offer_interval_ms: u64,
}

impl Default for SimulationCfg {
    fn default() -> Self {
        Self {
            dispatch_delay_ms: 3000,
            delivery_duration_ms: 15_000,
            tick_ms: 100,
            offer_interval_ms: 6000,
        }
    }
}

impl SimulationCfg {
    pub fn dispatch(&self) -> DispatchTimer {
        DispatchTimer {
            delay: Duration::from_millis(self.dispatch_delay_ms),
        }
    }

    pub fn ticker(&self) -> ProgressTicker {
        ProgressTicker {
            duration: Duration::from_millis(self.delivery_duration_ms),
            tick: Duration::from_millis(self.tick_ms),
        }
    }

    pub fn job_feed(&self) -> JobFeed {
        JobFeed {
            interval: Duration::from_millis(self.offer_interval_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionProvider {
    #[default]
    Gemini,
    Keywords,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionConfig {
    pub provider: SuggestionProvider,
    /// Gemini model name.
    pub model: String,
    /// API base URL, without the `/models/...` suffix.
    pub endpoint: String,
    /// Empty means "read GEMINI_API_KEY".
    pub api_key: String,
    /// Per-request timeout.
    pub timeout_secs: u64,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            provider: SuggestionProvider::Gemini,
            model: "gemini-2.5-flash".into(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".into(),
            api_key: String::new(),
            timeout_secs: 10,
        }
    }
}

impl SuggestionConfig {
    /// `GEMINI_API_KEY` wins over the file value.
    pub fn resolved_api_key(&self) -> Option<String> {
        std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| Some(self.api_key.clone()).filter(|k| !k.trim().is_empty()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsCfg {
    pub permission: NotificationPermission,
}

impl Config {
    /// Load from disk or create defaults when missing.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let s = fs::read_to_string(path)?;
            Ok(toml::from_str(&s)?)
        } else {
            let cfg = Self::default();
            cfg.save(path)?;
            Ok(cfg)
        }
    }

    /// Persist the config as pretty TOML.
    pub fn save(&self, path: &Path) -> Result<()> {
        let s = toml::to_string_pretty(self)?;
        fs::write(path, s)?;
        Ok(())
    }
}
