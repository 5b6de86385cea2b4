//! Storage abstractions for bounty state.
//!
//! Two logical collections, both keyed by `project`:
//!
//! ```text
//! bounties      # last observed state per project (upserted)
//! differences   # most recent detected change per project (overwritten)
//! ```
//!
//! Writes are per-record upserts; nothing spans records, so an interrupted
//! cycle may leave a batch partly applied.

pub mod local;
#[cfg(feature = "mongo")]
pub mod mongo;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::{BountyRecord, DifferenceRecord, StoreBackend, StoreConfig, TrackedState};

// Re-export for convenience
pub use local::LocalStore;
#[cfg(feature = "mongo")]
pub use mongo::MongoStore;

/// Trait for bounty state backends.
#[async_trait]
pub trait BountyStore: Send + Sync {
    /// Number of stored bounty documents.
    async fn count_bounties(&self) -> Result<u64>;

    /// Bulk insert. An empty slice is a no-op.
    async fn insert_bounties(&self, bounties: &[BountyRecord]) -> Result<()>;

    /// Load every stored bounty reduced to the compared fields.
    async fn load_tracked(&self) -> Result<TrackedState>;

    /// Overwrite `id`, `updatedDate` and `assetLinks` for the record's project.
    async fn upsert_bounty(&self, bounty: &BountyRecord) -> Result<()>;

    /// Replace the stored difference for the record's project.
    async fn upsert_difference(&self, difference: &DifferenceRecord) -> Result<()>;

    /// Load every stored difference.
    async fn load_differences(&self) -> Result<Vec<DifferenceRecord>>;
}

/// Seed the bounties collection when it is empty.
///
/// Returns `true` if records were inserted.
pub async fn initialize_if_empty(
    store: &dyn BountyStore,
    bounties: &[BountyRecord],
) -> Result<bool> {
    if bounties.is_empty() || store.count_bounties().await? > 0 {
        return Ok(false);
    }

    for bounty in bounties {
        log::debug!("Initializing bounty: {} ({})", bounty.project, bounty.id);
    }
    store.insert_bounties(bounties).await?;
    log::info!("Initialized bounties collection with {} records", bounties.len());
    Ok(true)
}

/// Open the backend selected in `config`.
pub async fn connect(config: &StoreConfig) -> Result<Box<dyn BountyStore>> {
    match config.backend {
        StoreBackend::Local => {
            log::info!("Using local store at {}", config.local_dir);
            Ok(Box::new(LocalStore::new(&config.local_dir)))
        }
        #[cfg(feature = "mongo")]
        StoreBackend::Mongo => {
            let uri = config
                .mongo_uri
                .as_deref()
                .ok_or_else(|| AppError::config("MONGO_URI is not set"))?;
            let store =
                MongoStore::connect(uri, &config.database, config.allow_invalid_certs).await?;
            log::info!("Using MongoDB database {}", config.database);
            Ok(Box::new(store))
        }
        #[cfg(not(feature = "mongo"))]
        StoreBackend::Mongo => Err(AppError::config(
            "MongoDB backend requested but the `mongo` feature is disabled",
        )),
    }
}
