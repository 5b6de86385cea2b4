//! Difference calculation between stored and freshly fetched bounties.
//!
//! A tracked project differs when its `updatedDate` string changed or its
//! asset link sequence changed (order matters). The reported `link_diff`
//! is the set of new links missing from the stored list.

use std::collections::HashSet;

use crate::models::{BountyRecord, DifferenceRecord, NewProjectPolicy, TrackedState};

/// Outcome of one comparison.
#[derive(Debug, Clone, Default)]
pub struct DiffResult {
    /// Changes to report, in listing order
    pub differences: Vec<DifferenceRecord>,
    /// Observed records that need writing back to the bounties collection
    pub to_persist: Vec<BountyRecord>,
    /// Projects absent from the stored state
    pub new_projects: Vec<String>,
}

impl DiffResult {
    /// Check if there are any changes to report.
    pub fn has_changes(&self) -> bool {
        !self.differences.is_empty()
    }
}

/// Calculator for comparing a snapshot against stored state.
#[derive(Debug, Clone, Default)]
pub struct DiffCalculator {
    new_projects: NewProjectPolicy,
}

impl DiffCalculator {
    /// Create a calculator that ignores unknown projects.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a calculator with an explicit policy for unknown projects.
    pub fn with_policy(new_projects: NewProjectPolicy) -> Self {
        Self { new_projects }
    }

    /// Compare `observed` records (asset links attached) with `tracked`.
    pub fn calculate(&self, tracked: &TrackedState, observed: &[BountyRecord]) -> DiffResult {
        let mut result = DiffResult::default();

        for record in observed {
            let Some(existing) = tracked.get(&record.project) else {
                result.new_projects.push(record.project.clone());
                match self.new_projects {
                    NewProjectPolicy::Ignore => {}
                    NewProjectPolicy::Track => result.to_persist.push(record.clone()),
                    NewProjectPolicy::Notify => {
                        result.to_persist.push(record.clone());
                        result.differences.push(DifferenceRecord {
                            id: record.id.clone(),
                            project: record.project.clone(),
                            existing_updated_date: None,
                            new_updated_date: record.updated_date.clone(),
                            link_diff: link_difference(&record.asset_links, &[]),
                        });
                    }
                }
                continue;
            };

            let date_changed = existing.updated_date != record.updated_date;
            let links_changed = existing.asset_links != record.asset_links;

            if date_changed {
                log::info!(
                    "UpdatedDate different for {}: Old - {} | New - {}",
                    record.project,
                    existing.updated_date,
                    record.updated_date
                );
            }
            if links_changed {
                log::info!("AssetLinks different for {}", record.project);
            }

            if date_changed || links_changed {
                result.differences.push(DifferenceRecord {
                    id: record.id.clone(),
                    project: record.project.clone(),
                    existing_updated_date: Some(existing.updated_date.clone()),
                    new_updated_date: record.updated_date.clone(),
                    link_diff: link_difference(&record.asset_links, &existing.asset_links),
                });
                result.to_persist.push(record.clone());
            }
        }

        result
    }
}

/// Links in `new` but not in `old`, deduplicated, in first-seen order.
pub fn link_difference(new: &[String], old: &[String]) -> Vec<String> {
    let old: HashSet<&str> = old.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    new.iter()
        .filter(|link| !old.contains(link.as_str()) && seen.insert(link.as_str()))
        .cloned()
        .collect()
}

/// Convenience function using the default policy.
pub fn calculate_diff(tracked: &TrackedState, observed: &[BountyRecord]) -> DiffResult {
    DiffCalculator::new().calculate(tracked, observed)
}
