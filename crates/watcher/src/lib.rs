//! Discussion thread watcher.
//!
//! This crate provides:
//! - Post count extraction from thread pages via ordered pattern rules
//! - Comment payload extraction from inline page scripts
//! - Observation state in memory, a JSON file, or a key-value service
//! - A change-detection cycle that announces new posts to a chat webhook
//! - A raw comment broadcast mode
//! - A fixed-period scheduler and a static readiness endpoint

pub mod broadcast;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod scheduler;
pub mod server;
pub mod store;
pub mod watcher;

// Re-export main types
pub use broadcast::{BroadcastSummary, Broadcaster};
pub use config::{parse_thread_urls, StoreBackend, StoreSettings, WatcherConfig};
pub use error::{WatchError, WatchResult};
pub use extract::{CountExtractor, CountRule};
pub use fetch::PageFetcher;
pub use scheduler::Scheduler;
pub use store::{ObservationRecord, StateStore};
pub use watcher::{CycleSummary, UnitOutcome, Watcher};
