// src/services/notifier.rs

//! Change notifications.
//!
//! Messages are rendered from [`DifferenceRecord`]s and delivered through a
//! [`Notifier`]; Telegram is the production channel.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{Config, DifferenceRecord, HttpConfig, SiteConfig, TelegramConfig};
use crate::utils::http::{create_async_client, send_with_retry};
use crate::utils::retry::RetryPolicy;

/// Sent when a cycle finds no differences.
pub const NO_DIFFERENCES_MESSAGE: &str = "No differences found in the latest check!";

/// Outbound message channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one message.
    async fn send(&self, text: &str) -> Result<()>;
}

/// Render a timestamp as `YYYY-MM-DD  HH:MM:SS`, or verbatim if unparseable.
pub fn format_timestamp(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => ts.format("%Y-%m-%d  %H:%M:%S").to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Render the message for one difference.
pub fn format_difference(diff: &DifferenceRecord, site: &SiteConfig) -> String {
    let mut text = match &diff.existing_updated_date {
        Some(previous) => format!(
            "{} has been updated!\nPrevious timestamp: {}\nCurrent timestamp: {}\n",
            diff.project,
            format_timestamp(previous),
            format_timestamp(&diff.new_updated_date),
        ),
        None => format!(
            "{} has been added!\nCurrent timestamp: {}\n",
            diff.project,
            format_timestamp(&diff.new_updated_date),
        ),
    };
    text.push_str(&format!("Link: {}\n", site.bounty_url(&diff.id)));

    if !diff.link_diff.is_empty() {
        text.push_str("Changed links:\n");
        for link in &diff.link_diff {
            text.push_str(link);
            text.push('\n');
        }
    }
    text
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Delivers messages through the Telegram Bot API `sendMessage` call.
pub struct TelegramNotifier {
    client: Client,
    retry: RetryPolicy,
    endpoint: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(http: &HttpConfig, api_base: &str, bot_token: &str, chat_id: &str) -> Result<Self> {
        Ok(Self {
            client: create_async_client(http)?,
            retry: RetryPolicy::from_config(http),
            endpoint: format!(
                "{}/bot{}/sendMessage",
                api_base.trim_end_matches('/'),
                bot_token
            ),
            chat_id: chat_id.to_string(),
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        let form = [
            ("chat_id", self.chat_id.as_str()),
            ("text", text),
            ("parse_mode", "Markdown"),
        ];
        let response = send_with_retry(&self.retry, "Telegram sendMessage", || {
            self.client.post(&self.endpoint).form(&form)
        })
        .await?;

        let status = response.status();
        let body = response.text().await?;
        match serde_json::from_str::<TelegramResponse>(&body) {
            Ok(reply) if reply.ok => Ok(()),
            Ok(reply) => Err(AppError::notify(format!(
                "Telegram rejected message (HTTP {}): {}",
                status,
                reply.description.unwrap_or_default()
            ))),
            Err(_) => Err(AppError::notify(format!(
                "Unexpected Telegram response (HTTP {status})"
            ))),
        }
    }
}

/// Writes messages to the log. Used when Telegram is not configured.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        log::info!("Notification:\n{}", text.trim_end());
        Ok(())
    }
}

/// Keeps every message in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages delivered so far.
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        self.messages
            .lock()
            .map_err(|_| AppError::notify("recorder lock poisoned"))?
            .push(text.to_string());
        Ok(())
    }
}

/// Pick the notifier implied by the configuration.
pub fn notifier_from_config(config: &Config) -> Result<Box<dyn Notifier>> {
    let TelegramConfig {
        api_base,
        bot_token,
        chat_id,
    } = &config.telegram;

    match (bot_token, chat_id) {
        (Some(token), Some(chat)) => Ok(Box::new(TelegramNotifier::new(
            &config.http,
            api_base,
            token,
            chat,
        )?)),
        _ => {
            log::warn!("Telegram is not configured; notifications go to the log");
            Ok(Box::new(LogNotifier))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> SiteConfig {
        SiteConfig::default()
    }

    fn diff(existing: Option<&str>, links: &[&str]) -> DifferenceRecord {
        DifferenceRecord {
            id: "foo".into(),
            project: "Foo".into(),
            existing_updated_date: existing.map(str::to_string),
            new_updated_date: "2024-02-01T13:45:10.000Z".into(),
            link_diff: links.iter().map(|l| l.to_string()).collect(),
        }
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp("2024-01-01T08:30:00Z"), "2024-01-01  08:30:00");
        assert_eq!(format_timestamp("2024-01-01T08:30:00+02:00"), "2024-01-01  08:30:00");
        assert_eq!(format_timestamp("yesterday"), "yesterday");
    }

    #[test]
    fn test_format_update_with_links() {
        let text = format_difference(
            &diff(Some("2024-01-01T00:00:00Z"), &["https://etherscan.io/address/0x1"]),
            &site(),
        );
        assert_eq!(
            text,
            "Foo has been updated!\n\
             Previous timestamp: 2024-01-01  00:00:00\n\
             Current timestamp: 2024-02-01  13:45:10\n\
             Link: https://immunefi.com/bounty/foo/\n\
             Changed links:\n\
             https://etherscan.io/address/0x1\n"
        );
    }

    #[test]
    fn test_format_update_without_links() {
        let text = format_difference(&diff(Some("2024-01-01T00:00:00Z"), &[]), &site());
        assert!(!text.contains("Changed links"));
        assert!(text.ends_with("Link: https://immunefi.com/bounty/foo/\n"));
    }

    #[test]
    fn test_format_new_project() {
        let text = format_difference(&diff(None, &["https://github.com/foo/bar"]), &site());
        assert!(text.starts_with("Foo has been added!\n"));
        assert!(!text.contains("Previous timestamp"));
    }

    #[tokio::test]
    async fn test_recording_notifier() {
        let notifier = RecordingNotifier::new();
        notifier.send("one").await.unwrap();
        notifier.send("two").await.unwrap();
        assert_eq!(notifier.messages(), vec!["one", "two"]);
    }

    #[test]
    fn test_log_notifier_without_telegram() {
        assert!(notifier_from_config(&Config::default()).is_ok());
    }
}
