// src/models/mod.rs

//! Domain models for the bounty watcher.

mod bounty;
mod config;
mod difference;

// Re-export all public types
pub use bounty::{BountyRecord, TrackedBounty, TrackedState};
pub use config::{
    Config, HttpConfig, MonitorConfig, NewProjectPolicy, SiteConfig, StoreBackend, StoreConfig,
    TelegramConfig,
};
pub use difference::DifferenceRecord;
