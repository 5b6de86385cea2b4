//! MongoDB storage implementation.
//!
//! `bounties` and `differences` collections in one database, both matched
//! on the `project` field.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{Document, doc, to_document};
use mongodb::options::{ClientOptions, Tls, TlsOptions};
use mongodb::{Client, Collection};

use crate::error::Result;
use crate::models::{BountyRecord, DifferenceRecord, TrackedState};
use crate::storage::BountyStore;

const BOUNTIES: &str = "bounties";
const DIFFERENCES: &str = "differences";

/// MongoDB-backed bounty store.
#[derive(Clone)]
pub struct MongoStore {
    bounties: Collection<BountyRecord>,
    differences: Collection<DifferenceRecord>,
}

impl MongoStore {
    /// Connect and bind the two collections.
    pub async fn connect(uri: &str, database: &str, allow_invalid_certs: bool) -> Result<Self> {
        let mut options = ClientOptions::parse(uri).await?;
        if allow_invalid_certs {
            accept_invalid_certificates(&mut options.tls);
        }
        let client = Client::with_options(options)?;
        Ok(Self::from_client(&client, database))
    }

    pub fn from_client(client: &Client, database: &str) -> Self {
        let db = client.database(database);
        Self {
            bounties: db.collection(BOUNTIES),
            differences: db.collection(DIFFERENCES),
        }
    }

    fn by_project(project: &str) -> Document {
        doc! { "project": project }
    }
}

/// Turn off certificate validation, keeping TLS settings parsed from the URI.
///
/// An explicit `tls=false` in the URI wins.
fn accept_invalid_certificates(tls: &mut Option<Tls>) {
    match tls {
        Some(Tls::Enabled(options)) => options.allow_invalid_certificates = Some(true),
        Some(Tls::Disabled) => {}
        None => {
            *tls = Some(Tls::Enabled(
                TlsOptions::builder()
                    .allow_invalid_certificates(true)
                    .build(),
            ))
        }
    }
}

#[async_trait]
impl BountyStore for MongoStore {
    async fn count_bounties(&self) -> Result<u64> {
        Ok(self.bounties.count_documents(doc! {}).await?)
    }

    async fn insert_bounties(&self, bounties: &[BountyRecord]) -> Result<()> {
        if bounties.is_empty() {
            return Ok(());
        }
        let result = self.bounties.insert_many(bounties).await?;
        log::debug!("Inserted {} bounty documents", result.inserted_ids.len());
        Ok(())
    }

    async fn load_tracked(&self) -> Result<TrackedState> {
        let cursor = self.bounties.find(doc! {}).await?;
        let stored: Vec<BountyRecord> = cursor.try_collect().await?;
        Ok(TrackedState::from_records(&stored))
    }

    async fn upsert_bounty(&self, bounty: &BountyRecord) -> Result<()> {
        let update = doc! {
            "$set": {
                "id": bounty.id.as_str(),
                "updatedDate": bounty.updated_date.as_str(),
                "assetLinks": bounty.asset_links.clone(),
            }
        };
        self.bounties
            .update_one(Self::by_project(&bounty.project), update)
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn upsert_difference(&self, difference: &DifferenceRecord) -> Result<()> {
        let fields = to_document(difference)?;
        let update = doc! { "$set": fields };
        self.differences
            .update_one(Self::by_project(&difference.project), update)
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn load_differences(&self) -> Result<Vec<DifferenceRecord>> {
        let cursor = self.differences.find(doc! {}).await?;
        Ok(cursor.try_collect().await?)
    }
}
