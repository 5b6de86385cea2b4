//! Local filesystem storage implementation.
//!
//! Keeps both collections as JSON arrays for development and testing.
//! Production deployments should use `MongoStore`.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── bounties.json        # Vec<BountyRecord>
//! └── differences.json     # Vec<DifferenceRecord>
//! ```

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{BountyRecord, DifferenceRecord, TrackedState};
use crate::storage::BountyStore;

const BOUNTIES_KEY: &str = "bounties.json";
const DIFFERENCES_KEY: &str = "differences.json";

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root_dir: PathBuf,
}

impl LocalStore {
    /// Create a new LocalStore rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.path(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read a JSON array, empty if the file is missing.
    async fn read_list<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(Vec::new()),
        }
    }

    async fn load_bounties(&self) -> Result<Vec<BountyRecord>> {
        self.read_list(BOUNTIES_KEY).await
    }
}

#[async_trait]
impl BountyStore for LocalStore {
    async fn count_bounties(&self) -> Result<u64> {
        Ok(self.load_bounties().await?.len() as u64)
    }

    async fn insert_bounties(&self, bounties: &[BountyRecord]) -> Result<()> {
        if bounties.is_empty() {
            return Ok(());
        }
        let mut stored = self.load_bounties().await?;
        stored.extend_from_slice(bounties);
        self.write_json(BOUNTIES_KEY, &stored).await
    }

    async fn load_tracked(&self) -> Result<TrackedState> {
        let stored = self.load_bounties().await?;
        Ok(TrackedState::from_records(&stored))
    }

    async fn upsert_bounty(&self, bounty: &BountyRecord) -> Result<()> {
        let mut stored = self.load_bounties().await?;
        match stored.iter_mut().find(|b| b.project == bounty.project) {
            Some(existing) => {
                existing.id = bounty.id.clone();
                existing.updated_date = bounty.updated_date.clone();
                existing.asset_links = bounty.asset_links.clone();
            }
            None => stored.push(bounty.clone()),
        }
        self.write_json(BOUNTIES_KEY, &stored).await
    }

    async fn upsert_difference(&self, difference: &DifferenceRecord) -> Result<()> {
        let mut stored: Vec<DifferenceRecord> = self.read_list(DIFFERENCES_KEY).await?;
        match stored.iter_mut().find(|d| d.project == difference.project) {
            Some(existing) => *existing = difference.clone(),
            None => stored.push(difference.clone()),
        }
        self.write_json(DIFFERENCES_KEY, &stored).await
    }

    async fn load_differences(&self) -> Result<Vec<DifferenceRecord>> {
        self.read_list(DIFFERENCES_KEY).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn difference(project: &str, new_date: &str, links: &[&str]) -> DifferenceRecord {
        DifferenceRecord {
            id: project.to_lowercase(),
            project: project.to_string(),
            existing_updated_date: Some("2024-01-01T00:00:00Z".into()),
            new_updated_date: new_date.to_string(),
            link_diff: links.iter().map(|l| l.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());

        store.write_bytes("test.txt", b"hello").await.unwrap();
        let data = store.read_bytes("test.txt").await.unwrap();
        assert_eq!(data, Some(b"hello".to_vec()));
        assert!(!store.path("test.tmp").exists());
    }

    #[tokio::test]
    async fn test_empty_store() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path().join("nested"));

        assert_eq!(store.count_bounties().await.unwrap(), 0);
        assert!(store.load_tracked().await.unwrap().is_empty());
        assert!(store.load_differences().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_bounty_overwrites_by_project() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        store
            .insert_bounties(&[BountyRecord::new("foo", "Foo", "2024-01-01T00:00:00Z")
                .with_links(["https://github.com/foo/bar"])])
            .await
            .unwrap();

        let updated = BountyRecord::new("foo", "Foo", "2024-02-01T00:00:00Z")
            .with_links(["https://etherscan.io/address/0x1"]);
        store.upsert_bounty(&updated).await.unwrap();

        assert_eq!(store.count_bounties().await.unwrap(), 1);
        let tracked = store.load_tracked().await.unwrap();
        let foo = tracked.get("Foo").unwrap();
        assert_eq!(foo.updated_date, "2024-02-01T00:00:00Z");
        assert_eq!(foo.asset_links, vec!["https://etherscan.io/address/0x1"]);
    }

    #[tokio::test]
    async fn test_upsert_bounty_inserts_unknown_project() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());

        store
            .upsert_bounty(&BountyRecord::new("bar", "Bar", "2024-01-01T00:00:00Z"))
            .await
            .unwrap();
        assert_eq!(store.count_bounties().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_upsert_difference_keeps_only_latest() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());

        store
            .upsert_difference(&difference(
                "Foo",
                "2024-02-01T00:00:00Z",
                &["https://github.com/a"],
            ))
            .await
            .unwrap();
        store
            .upsert_difference(&difference("Bar", "2024-02-02T00:00:00Z", &[]))
            .await
            .unwrap();
        let latest = difference("Foo", "2024-03-01T00:00:00Z", &[]);
        store.upsert_difference(&latest).await.unwrap();

        let stored = store.load_differences().await.unwrap();
        assert_eq!(stored.len(), 2);
        let foo = stored.iter().find(|d| d.project == "Foo").unwrap();
        assert_eq!(foo, &latest);
    }

    #[tokio::test]
    async fn test_missing_asset_links_default_to_empty() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        store
            .write_bytes(
                BOUNTIES_KEY,
                br#"[{"id":"foo","project":"Foo","updatedDate":"2024-01-01T00:00:00Z"}]"#,
            )
            .await
            .unwrap();

        let tracked = store.load_tracked().await.unwrap();
        assert!(tracked.get("Foo").unwrap().asset_links.is_empty());
    }
}
