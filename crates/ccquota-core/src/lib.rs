//! ccquota-core - Core library for ccquota
//!
//! Reads Claude Code's session logs, prompt history and stats cache, and
//! reconciles them into a usage snapshot for the rolling 5-hour window and
//! the calendar week.

pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod models;
pub mod parsers;
pub mod reconciler;
pub mod scheduler;
pub mod store;
pub mod watcher;
pub mod window;

pub use config::{
    default_claude_home, default_config_path, ConfigOverrides, ConfigSource, QuotaConfig,
    SharedConfig, SourcePaths, SubscriptionPlan, TomlConfigFile,
};
pub use engine::UsageEngine;
pub use error::{CoreError, ErrorSeverity, PassReport, SourceError};
pub use event::{EngineEvent, EventBus, RefreshTrigger};
pub use models::UsageSnapshot;
pub use reconciler::{PassOutcome, Reconciler};
pub use scheduler::{Scheduler, SchedulerConfig};
pub use store::SnapshotStore;
pub use watcher::{FileWatcher, WatchState};
pub use window::UsageWindows;
