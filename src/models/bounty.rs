//! Bounty data structures.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

/// A bounty program as listed on the source site.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BountyRecord {
    /// Opaque identifier, stable across fetches
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,

    /// Display name, used as the matching key
    pub project: String,

    /// ISO-8601 timestamp of the last modification
    pub updated_date: String,

    /// Repository and explorer links from the detail page
    #[serde(default)]
    pub asset_links: Vec<String>,
}

impl BountyRecord {
    /// Convenience constructor, mostly for tests and fixtures.
    pub fn new(
        id: impl Into<String>,
        project: impl Into<String>,
        updated_date: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            project: project.into(),
            updated_date: updated_date.into(),
            asset_links: Vec::new(),
        }
    }

    /// Attach asset links.
    pub fn with_links<I, S>(mut self, links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.asset_links = links.into_iter().map(Into::into).collect();
        self
    }
}

/// The persisted fields compared on every cycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrackedBounty {
    pub updated_date: String,
    pub asset_links: Vec<String>,
}

/// Persisted state reduced to `project -> tracked fields`.
#[derive(Debug, Clone, Default)]
pub struct TrackedState {
    entries: HashMap<String, TrackedBounty>,
}

impl TrackedState {
    /// Build from stored records. Later duplicates of a project win.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a BountyRecord>) -> Self {
        let entries = records
            .into_iter()
            .map(|r| {
                (
                    r.project.clone(),
                    TrackedBounty {
                        updated_date: r.updated_date.clone(),
                        asset_links: r.asset_links.clone(),
                    },
                )
            })
            .collect();
        Self { entries }
    }

    pub fn get(&self, project: &str) -> Option<&TrackedBounty> {
        self.entries.get(project)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Accept both `"abc"` and `123` for identifiers.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        UInt(u64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::UInt(n) => n.to_string(),
    })
}
