// src/services/fetcher.rs

//! Snapshot fetcher service.
//!
//! Retrieves the bounty listing through the site's data endpoint and
//! collects asset links from each bounty's detail page.

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{BountyRecord, Config, SiteConfig};
use crate::services::locator::extract_build_token;
use crate::utils::http::{create_async_client, get_with_retry};
use crate::utils::retry::RetryPolicy;

/// Where current bounty state comes from.
#[async_trait]
pub trait BountySource: Send + Sync {
    /// Fetch the current listing. Records come back without asset links.
    async fn fetch_listing(&self) -> Result<Vec<BountyRecord>>;

    /// Fetch asset links for one bounty. Failures degrade to an empty list.
    async fn fetch_asset_links(&self, bounty_id: &str) -> Vec<String>;
}

/// HTTP implementation of [`BountySource`].
pub struct SnapshotFetcher {
    site: SiteConfig,
    client: Client,
    retry: RetryPolicy,
}

impl SnapshotFetcher {
    /// Create a fetcher with a client configured from `config.http`.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            site: config.site.clone(),
            client: create_async_client(&config.http)?,
            retry: RetryPolicy::from_config(&config.http),
        })
    }

    /// GET a URL and return its body, failing on non-success status.
    async fn fetch_text(&self, url: &str) -> Result<String> {
        let response = get_with_retry(&self.client, &self.retry, url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::status(url, status));
        }
        Ok(response.text().await?)
    }

    async fn try_fetch_asset_links(&self, bounty_id: &str) -> Result<Vec<String>> {
        let url = self.site.bounty_url(bounty_id);
        let html = self.fetch_text(&url).await?;
        Ok(filter_asset_links(&html, &self.site.link_hosts))
    }
}

#[async_trait]
impl BountySource for SnapshotFetcher {
    async fn fetch_listing(&self) -> Result<Vec<BountyRecord>> {
        let explore_url = self.site.explore_url();
        let source = self.fetch_text(&explore_url).await?;

        let token = extract_build_token(&source)
            .ok_or_else(|| AppError::TokenNotFound { url: explore_url.clone() })?;
        log::debug!("Build token: {}", token);

        let payload = self.fetch_text(&self.site.data_url(&token)).await?;
        let value: Value = serde_json::from_str(&payload)?;
        let bounties = extract_bounties(&value)?;

        log::info!("Fetched listing with {} bounties", bounties.len());
        Ok(bounties)
    }

    async fn fetch_asset_links(&self, bounty_id: &str) -> Vec<String> {
        match self.try_fetch_asset_links(bounty_id).await {
            Ok(links) => links,
            Err(error) => {
                log::warn!("Failed to retrieve asset links for {}: {}", bounty_id, error);
                Vec::new()
            }
        }
    }
}

/// Pull the bounty array out of the data endpoint payload.
pub fn extract_bounties(payload: &Value) -> Result<Vec<BountyRecord>> {
    let bounties = payload
        .pointer("/pageProps/bounties")
        .ok_or_else(|| AppError::payload("missing pageProps.bounties"))?;
    if !bounties.is_array() {
        return Err(AppError::payload("pageProps.bounties is not an array"));
    }
    Ok(serde_json::from_value(bounties.clone())?)
}

/// Collect `<a href>` targets matching the host fragments.
///
/// Output is grouped by fragment in `hosts` order; within a group the
/// document order is kept. A link matching two fragments appears twice.
pub fn filter_asset_links(html: &str, hosts: &[String]) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(anchor) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let hrefs: Vec<&str> = document
        .select(&anchor)
        .filter_map(|a| a.value().attr("href"))
        .collect();

    hosts
        .iter()
        .flat_map(|host| {
            hrefs
                .iter()
                .filter(move |href| href.contains(host.as_str()))
                .map(|href| href.to_string())
        })
        .collect()
}
