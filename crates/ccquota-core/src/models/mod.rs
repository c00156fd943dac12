//! Data models for ccquota

pub mod entry;
pub mod snapshot;
pub mod stats;

pub use entry::{LogEntry, SourceCounts};
pub use snapshot::UsageSnapshot;
pub use stats::{DailyActivityEntry, StatsCache};
