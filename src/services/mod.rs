//! Service layer for the bounty watcher.
//!
//! This module contains the I/O facing components:
//! - Build token discovery (`extract_build_token`)
//! - Listing and detail page fetching (`SnapshotFetcher`)
//! - Notification delivery (`TelegramNotifier`, `LogNotifier`)

pub mod fetcher;
pub mod locator;
pub mod notifier;

pub use fetcher::{BountySource, SnapshotFetcher};
pub use locator::extract_build_token;
pub use notifier::{
    LogNotifier, Notifier, RecordingNotifier, TelegramNotifier, notifier_from_config,
};
