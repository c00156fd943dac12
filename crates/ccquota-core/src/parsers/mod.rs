//! Readers for the three usage sources

pub mod history;
pub mod lines;
pub mod sessions;
pub mod stats;

pub use history::HistoryReader;
pub use lines::{LineSource, WholeFile};
pub use sessions::SessionScanner;
pub use stats::StatsCacheReader;
