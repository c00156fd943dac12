//! Quota configuration and source locations
//!
//! Limits and the plan name belong to an external owner. The engine reads
//! them through [`ConfigSource`] once per pass and never caches them, since
//! they can change at runtime.

use crate::error::CoreError;
use anyhow::{Context, Result};
use chrono::Weekday;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Subscription plans with approximate message limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubscriptionPlan {
    /// Claude Pro
    Pro,
    /// Claude Max 5x
    Max5x,
    /// Claude Max 20x
    Max20x,
    /// API usage (pay-as-you-go, no fixed limit)
    Api,
    /// Unknown/unset plan
    #[default]
    Unknown,
}

impl SubscriptionPlan {
    /// Parse plan from a config string
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pro" => Self::Pro,
            "max5x" | "max-5x" | "max_5x" => Self::Max5x,
            "max20x" | "max-20x" | "max_20x" => Self::Max20x,
            "api" => Self::Api,
            _ => Self::Unknown,
        }
    }

    /// Approximate messages per rolling 5-hour window
    ///
    /// Estimates only; Anthropic adjusts the real limits.
    pub fn five_hour_limit(self) -> u64 {
        match self {
            Self::Pro => 45,
            Self::Max5x => 225,
            Self::Max20x => 900,
            Self::Api | Self::Unknown => 0,
        }
    }

    /// Approximate messages per calendar week
    pub fn weekly_limit(self) -> u64 {
        match self {
            Self::Pro => 1_500,
            Self::Max5x => 7_500,
            Self::Max20x => 30_000,
            Self::Api | Self::Unknown => 0,
        }
    }

    /// Get display name
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Pro => "Claude Pro",
            Self::Max5x => "Claude Max 5x",
            Self::Max20x => "Claude Max 20x",
            Self::Api => "API (Pay-as-you-go)",
            Self::Unknown => "Unknown Plan",
        }
    }
}

/// Quota configuration as read from the owner's store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Plan name (pro, max5x, max20x, api)
    #[serde(default = "default_plan")]
    pub plan: String,

    /// Rolling-window limit; plan preset when unset
    #[serde(default)]
    pub five_hour_limit: Option<u64>,

    /// Weekly limit; plan preset when unset
    #[serde(default)]
    pub weekly_limit: Option<u64>,

    /// Day the calendar week starts on
    #[serde(default = "default_first_weekday")]
    pub first_weekday: Weekday,
}

fn default_plan() -> String {
    "pro".to_string()
}

fn default_first_weekday() -> Weekday {
    Weekday::Mon
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            plan: default_plan(),
            five_hour_limit: None,
            weekly_limit: None,
            first_weekday: default_first_weekday(),
        }
    }
}

impl QuotaConfig {
    pub fn subscription_plan(&self) -> SubscriptionPlan {
        SubscriptionPlan::parse(&self.plan)
    }

    /// Effective rolling-window limit (0 means unlimited)
    pub fn five_hour_limit(&self) -> u64 {
        self.five_hour_limit
            .unwrap_or_else(|| self.subscription_plan().five_hour_limit())
    }

    /// Effective weekly limit (0 means unlimited)
    pub fn weekly_limit(&self) -> u64 {
        self.weekly_limit
            .unwrap_or_else(|| self.subscription_plan().weekly_limit())
    }

    /// Parse a TOML document
    pub fn from_toml(content: &str) -> Result<Self, CoreError> {
        toml::from_str(content).map_err(|e| CoreError::InvalidConfig {
            message: e.to_string(),
        })
    }
}

/// Read accessor for the quota configuration
pub trait ConfigSource: Send + Sync {
    /// Current configuration; called once per pass
    fn load(&self) -> QuotaConfig;

    /// File whose changes should count as configuration changes
    fn watch_path(&self) -> Option<&Path> {
        None
    }
}

/// In-memory configuration an owner can replace at runtime
///
/// After calling [`SharedConfig::set`] the owner should notify the engine
/// through `UsageEngine::config_changed`.
#[derive(Debug, Default)]
pub struct SharedConfig {
    inner: RwLock<QuotaConfig>,
}

impl SharedConfig {
    pub fn new(config: QuotaConfig) -> Self {
        Self {
            inner: RwLock::new(config),
        }
    }

    pub fn set(&self, config: QuotaConfig) {
        *self.inner.write() = config;
    }
}

impl ConfigSource for SharedConfig {
    fn load(&self) -> QuotaConfig {
        self.inner.read().clone()
    }
}

/// TOML file re-read on every pass
///
/// A missing file yields defaults; a malformed one yields defaults and a
/// warning. Overrides set on the value win over whatever the file says.
#[derive(Debug, Clone)]
pub struct TomlConfigFile {
    path: PathBuf,
    overrides: ConfigOverrides,
}

/// Values that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub plan: Option<String>,
    pub five_hour_limit: Option<u64>,
    pub weekly_limit: Option<u64>,
}

impl TomlConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            overrides: ConfigOverrides::default(),
        }
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file, distinguishing "absent" from "broken"
    pub fn try_load(&self) -> Result<Option<QuotaConfig>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read config from {}", self.path.display())
                })
            }
        };
        let config = QuotaConfig::from_toml(&content)
            .with_context(|| format!("Failed to parse config {}", self.path.display()))?;
        Ok(Some(config))
    }

    fn apply_overrides(&self, mut config: QuotaConfig) -> QuotaConfig {
        if let Some(ref plan) = self.overrides.plan {
            config.plan = plan.clone();
        }
        if self.overrides.five_hour_limit.is_some() {
            config.five_hour_limit = self.overrides.five_hour_limit;
        }
        if self.overrides.weekly_limit.is_some() {
            config.weekly_limit = self.overrides.weekly_limit;
        }
        config
    }
}

impl ConfigSource for TomlConfigFile {
    fn load(&self) -> QuotaConfig {
        let config = match self.try_load() {
            Ok(Some(config)) => config,
            Ok(None) => {
                debug!(path = %self.path.display(), "No config file, using defaults");
                QuotaConfig::default()
            }
            Err(e) => {
                warn!(error = %format!("{:#}", e), "Invalid config, using defaults");
                QuotaConfig::default()
            }
        };
        self.apply_overrides(config)
    }

    fn watch_path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// Where the three usage sources live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePaths {
    /// Root of the per-session log tree
    pub projects_dir: PathBuf,
    /// Global prompt history log
    pub history_file: PathBuf,
    /// Periodically rewritten aggregate cache
    pub stats_cache: PathBuf,
}

impl SourcePaths {
    pub fn from_claude_home(claude_home: &Path) -> Self {
        Self {
            projects_dir: claude_home.join("projects"),
            history_file: claude_home.join("history.jsonl"),
            stats_cache: claude_home.join("stats-cache.json"),
        }
    }
}

/// Default Claude home (~/.claude)
pub fn default_claude_home() -> Result<PathBuf, CoreError> {
    dirs::home_dir()
        .map(|home| home.join(".claude"))
        .ok_or(CoreError::ClaudeHomeNotFound)
}

/// Default config file (~/.config/ccquota/config.toml on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("ccquota").join("config.toml"))
}
