// src/pipeline/cycle.rs

//! One fetch → diff → persist → notify pass.

use crate::error::Result;
use crate::models::{BountyRecord, Config};
use crate::pipeline::diff::DiffCalculator;
use crate::services::notifier::{NO_DIFFERENCES_MESSAGE, format_difference};
use crate::services::{BountySource, Notifier};
use crate::storage::{BountyStore, initialize_if_empty};

/// Summary of a completed cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub bounty_count: usize,
    /// The store was empty and got seeded this cycle
    pub initialized: bool,
    pub difference_count: usize,
    pub new_project_count: usize,
    pub notifications_sent: usize,
    pub notifications_failed: usize,
}

/// Components a cycle runs against.
pub struct Cycle<'a> {
    pub config: &'a Config,
    pub source: &'a dyn BountySource,
    pub store: &'a dyn BountyStore,
    pub notifier: &'a dyn Notifier,
}

impl<'a> Cycle<'a> {
    pub fn new(
        config: &'a Config,
        source: &'a dyn BountySource,
        store: &'a dyn BountyStore,
        notifier: &'a dyn Notifier,
    ) -> Self {
        Self {
            config,
            source,
            store,
            notifier,
        }
    }

    /// Run a single cycle.
    ///
    /// Listing, data endpoint and store failures abort the cycle; detail
    /// page and notification failures do not.
    pub async fn run(&self) -> Result<CycleReport> {
        let listing = self.source.fetch_listing().await?;
        let observed = self.attach_asset_links(listing).await;

        let mut report = CycleReport {
            bounty_count: observed.len(),
            initialized: initialize_if_empty(self.store, &observed).await?,
            ..CycleReport::default()
        };

        let tracked = self.store.load_tracked().await?;
        let policy = self.config.monitor.new_projects;
        let result = DiffCalculator::with_policy(policy).calculate(&tracked, &observed);
        report.difference_count = result.differences.len();
        report.new_project_count = result.new_projects.len();

        if !result.new_projects.is_empty() {
            log::info!(
                "{} project(s) not tracked yet ({:?} policy): {}",
                result.new_projects.len(),
                self.config.monitor.new_projects,
                result.new_projects.join(", ")
            );
        }

        for bounty in &result.to_persist {
            log::info!(
                "Updating bounties table for {}: New UpdatedDate - {} | AssetLinks - {:?}",
                bounty.project,
                bounty.updated_date,
                bounty.asset_links
            );
            self.store.upsert_bounty(bounty).await?;
        }
        for difference in &result.differences {
            self.store.upsert_difference(difference).await?;
        }

        if result.has_changes() {
            log::warn!(
                "Found {} differences and saved them to the store",
                result.differences.len()
            );
            for difference in &result.differences {
                let text = format_difference(difference, &self.config.site);
                self.deliver(&text, &mut report).await;
            }
        } else {
            log::info!("No differences found");
            if self.config.monitor.notify_when_unchanged {
                self.deliver(NO_DIFFERENCES_MESSAGE, &mut report).await;
            }
        }

        Ok(report)
    }

    /// Fetch asset links once per record, sequentially.
    async fn attach_asset_links(&self, listing: Vec<BountyRecord>) -> Vec<BountyRecord> {
        let mut observed = Vec::with_capacity(listing.len());
        for mut bounty in listing {
            bounty.asset_links = self.source.fetch_asset_links(&bounty.id).await;
            observed.push(bounty);
        }
        observed
    }

    async fn deliver(&self, text: &str, report: &mut CycleReport) {
        match self.notifier.send(text).await {
            Ok(()) => report.notifications_sent += 1,
            Err(error) => {
                report.notifications_failed += 1;
                log::warn!("Notification not delivered: {}", error);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tempfile::TempDir;

    use super::*;
    use crate::error::AppError;
    use crate::models::{NewProjectPolicy, StoreBackend};
    use crate::services::RecordingNotifier;
    use crate::storage::LocalStore;

    /// Serves a fixed listing and per-id links; counts detail fetches.
    #[derive(Default)]
    struct StubSource {
        listing: Vec<BountyRecord>,
        links: HashMap<String, Vec<String>>,
        fail_listing: bool,
        link_fetches: Mutex<usize>,
    }

    impl StubSource {
        fn new(listing: Vec<BountyRecord>) -> Self {
            Self {
                listing,
                ..Self::default()
            }
        }

        fn with_links(mut self, id: &str, links: &[&str]) -> Self {
            self.links
                .insert(id.to_string(), links.iter().map(|l| l.to_string()).collect());
            self
        }

        fn link_fetches(&self) -> usize {
            *self.link_fetches.lock().unwrap()
        }
    }

    #[async_trait]
    impl BountySource for StubSource {
        async fn fetch_listing(&self) -> Result<Vec<BountyRecord>> {
            if self.fail_listing {
                return Err(AppError::HttpStatus {
                    url: "https://immunefi.com/explore/".into(),
                    status: 503,
                });
            }
            Ok(self.listing.clone())
        }

        async fn fetch_asset_links(&self, bounty_id: &str) -> Vec<String> {
            *self.link_fetches.lock().unwrap() += 1;
            self.links.get(bounty_id).cloned().unwrap_or_default()
        }
    }

    struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn send(&self, _text: &str) -> Result<()> {
            Err(AppError::notify("chat not found"))
        }
    }

    fn config() -> Config {
        let mut config = Config::default();
        config.store.backend = StoreBackend::Local;
        config
    }

    async fn seeded_store(tmp: &TempDir) -> LocalStore {
        let store = LocalStore::new(tmp.path());
        store
            .insert_bounties(&[BountyRecord::new("1", "Foo", "2024-01-01T00:00:00Z")
                .with_links(["https://github.com/foo/bar"])])
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_identical_snapshot_sends_single_no_difference_message() {
        let tmp = TempDir::new().unwrap();
        let store = seeded_store(&tmp).await;
        let source = StubSource::new(vec![BountyRecord::new("1", "Foo", "2024-01-01T00:00:00Z")])
            .with_links("1", &["https://github.com/foo/bar"]);
        let notifier = RecordingNotifier::new();
        let config = config();

        let report = Cycle::new(&config, &source, &store, &notifier).run().await.unwrap();

        assert_eq!(report.difference_count, 0);
        assert!(!report.initialized);
        assert_eq!(notifier.messages(), vec![NO_DIFFERENCES_MESSAGE]);
        assert!(store.load_differences().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_is_persisted_and_notified() {
        let tmp = TempDir::new().unwrap();
        let store = seeded_store(&tmp).await;
        let source = StubSource::new(vec![BountyRecord::new("1", "Foo", "2024-02-01T00:00:00Z")])
            .with_links("1", &["https://github.com/foo/bar", "https://etherscan.io/address/0x1"]);
        let notifier = RecordingNotifier::new();
        let config = config();

        let report = Cycle::new(&config, &source, &store, &notifier).run().await.unwrap();

        assert_eq!(report.difference_count, 1);
        assert_eq!(source.link_fetches(), 1);

        let differences = store.load_differences().await.unwrap();
        assert_eq!(differences.len(), 1);
        assert_eq!(differences[0].existing_updated_date.as_deref(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(differences[0].link_diff, vec!["https://etherscan.io/address/0x1"]);

        let tracked = store.load_tracked().await.unwrap();
        let foo = tracked.get("Foo").unwrap();
        assert_eq!(foo.updated_date, "2024-02-01T00:00:00Z");
        assert_eq!(foo.asset_links.len(), 2);

        let messages = notifier.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("Foo has been updated!"));
        assert!(messages[0].contains("https://immunefi.com/bounty/1/"));
        assert!(messages[0].contains("https://etherscan.io/address/0x1"));
    }

    #[tokio::test]
    async fn test_empty_store_is_initialized_once() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        let source = StubSource::new(vec![
            BountyRecord::new("1", "Foo", "2024-01-01T00:00:00Z"),
            BountyRecord::new("2", "Bar", "2024-01-01T00:00:00Z"),
        ])
        .with_links("2", &["https://github.com/bar/core"]);
        let notifier = RecordingNotifier::new();
        let config = config();
        let cycle = Cycle::new(&config, &source, &store, &notifier);

        let first = cycle.run().await.unwrap();
        assert!(first.initialized);
        assert_eq!(first.difference_count, 0);

        let second = cycle.run().await.unwrap();
        assert!(!second.initialized);
        assert_eq!(store.count_bounties().await.unwrap(), 2);

        let tracked = store.load_tracked().await.unwrap();
        assert_eq!(tracked.get("Bar").unwrap().asset_links, vec!["https://github.com/bar/core"]);
        assert_eq!(notifier.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_new_project_policy_notify() {
        let tmp = TempDir::new().unwrap();
        let store = seeded_store(&tmp).await;
        let source = StubSource::new(vec![
            BountyRecord::new("1", "Foo", "2024-01-01T00:00:00Z"),
            BountyRecord::new("9", "Newcomer", "2024-03-01T00:00:00Z"),
        ])
        .with_links("1", &["https://github.com/foo/bar"]);
        let notifier = RecordingNotifier::new();
        let mut config = config();
        config.monitor.new_projects = NewProjectPolicy::Notify;

        let report = Cycle::new(&config, &source, &store, &notifier).run().await.unwrap();

        assert_eq!(report.new_project_count, 1);
        assert_eq!(report.difference_count, 1);
        assert_eq!(store.count_bounties().await.unwrap(), 2);
        assert!(notifier.messages()[0].starts_with("Newcomer has been added!"));
    }

    #[tokio::test]
    async fn test_new_project_ignored_by_default() {
        let tmp = TempDir::new().unwrap();
        let store = seeded_store(&tmp).await;
        let source = StubSource::new(vec![
            BountyRecord::new("1", "Foo", "2024-01-01T00:00:00Z"),
            BountyRecord::new("9", "Newcomer", "2024-03-01T00:00:00Z"),
        ])
        .with_links("1", &["https://github.com/foo/bar"]);
        let notifier = RecordingNotifier::new();
        let config = config();

        let report = Cycle::new(&config, &source, &store, &notifier).run().await.unwrap();

        assert_eq!(report.difference_count, 0);
        assert_eq!(store.count_bounties().await.unwrap(), 1);
        assert_eq!(notifier.messages(), vec![NO_DIFFERENCES_MESSAGE]);
    }

    #[tokio::test]
    async fn test_listing_failure_aborts_before_store_writes() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        let source = StubSource {
            fail_listing: true,
            ..StubSource::default()
        };
        let notifier = RecordingNotifier::new();
        let config = config();

        let result = Cycle::new(&config, &source, &store, &notifier).run().await;

        assert!(matches!(result, Err(AppError::HttpStatus { status: 503, .. })));
        assert_eq!(store.count_bounties().await.unwrap(), 0);
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_fail_cycle() {
        let tmp = TempDir::new().unwrap();
        let store = seeded_store(&tmp).await;
        let source = StubSource::new(vec![BountyRecord::new("1", "Foo", "2024-02-01T00:00:00Z")])
            .with_links("1", &["https://github.com/foo/bar"]);
        let config = config();

        let report = Cycle::new(&config, &source, &store, &FailingNotifier)
            .run()
            .await
            .unwrap();

        assert_eq!(report.notifications_failed, 1);
        assert_eq!(report.notifications_sent, 0);
        assert_eq!(store.load_differences().await.unwrap().len(), 1);
    }
}
