//! HTTP query executor
//!
//! Queries providers that expose the common video-list JSON API:
//!
//! ```text
//! GET {api}?ac=videolist&wd={query}&pg={page}
//! { "pagecount": 3, "list": [ { "vod_id": 1, "vod_name": "...", "type_name": "...", ... } ] }
//! ```
//!
//! Page 1 decides success or failure of the provider. Further pages (up to
//! the configured page limit) are fetched concurrently and are best-effort.

use async_trait::async_trait;
use futures::future::join_all;
use mcat_common::{ProviderDescriptor, ResultRecord};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::{QueryError, QueryExecutor};

const USER_AGENT: &str = concat!("mcat-search/", env!("CARGO_PKG_VERSION"));

/// One page of a provider search response
#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    list: Vec<ProviderItem>,
    /// Number or numeric string depending on the provider
    #[serde(default)]
    pagecount: Value,
}

/// One item in a provider search response
#[derive(Debug, Deserialize)]
struct ProviderItem {
    #[serde(default)]
    vod_id: Value,
    #[serde(default)]
    vod_name: Option<String>,
    #[serde(default)]
    type_name: Option<String>,
    #[serde(default)]
    vod_pic: Option<String>,
    #[serde(default)]
    vod_year: Value,
    #[serde(default)]
    vod_content: Option<String>,
    #[serde(default)]
    vod_remarks: Option<String>,
    #[serde(default)]
    vod_play_url: Option<String>,
}

/// reqwest-backed [`QueryExecutor`]
pub struct HttpQueryExecutor {
    http_client: reqwest::Client,
    max_pages: u32,
}

impl HttpQueryExecutor {
    /// Create an executor
    ///
    /// # Arguments
    /// * `request_timeout` - Timeout for each HTTP request
    /// * `max_pages` - Upper bound on pages fetched per provider (at least 1)
    pub fn new(request_timeout: Duration, max_pages: u32) -> Result<Self, QueryError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(request_timeout)
            .build()
            .map_err(|e| QueryError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            max_pages: max_pages.max(1),
        })
    }

    async fn fetch_page(
        &self,
        provider: &ProviderDescriptor,
        query: &str,
        page: u32,
    ) -> Result<SearchPage, QueryError> {
        let url = reqwest::Url::parse(&provider.api)
            .map_err(|e| QueryError::InvalidProvider(format!("{}: {}", provider.api, e)))?;

        let mut request = self
            .http_client
            .get(url)
            .query(&[("ac", "videolist"), ("wd", query)]);
        if page > 1 {
            request = request.query(&[("pg", page)]);
        }

        debug!(provider = %provider.key, page, "Querying provider");

        let response = request
            .send()
            .await
            .map_err(|e| QueryError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(QueryError::Status(status.as_u16()));
        }

        response
            .json::<SearchPage>()
            .await
            .map_err(|e| QueryError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl QueryExecutor for HttpQueryExecutor {
    async fn query(
        &self,
        provider: &ProviderDescriptor,
        query: &str,
    ) -> Result<Vec<ResultRecord>, QueryError> {
        let first = self.fetch_page(provider, query, 1).await?;
        let page_count = value_to_u32(&first.pagecount).unwrap_or(1).min(self.max_pages);

        let mut records = normalize_items(provider, first.list);

        if page_count > 1 {
            let pages = join_all(
                (2..=page_count).map(|page| self.fetch_page(provider, query, page)),
            )
            .await;

            for (offset, page) in pages.into_iter().enumerate() {
                match page {
                    Ok(page) => records.extend(normalize_items(provider, page.list)),
                    Err(e) => warn!(
                        provider = %provider.key,
                        page = offset + 2,
                        error = %e,
                        "Skipping failed result page"
                    ),
                }
            }
        }

        debug!(provider = %provider.key, pages = page_count, records = records.len(), "Provider query complete");
        Ok(records)
    }
}

fn normalize_items(provider: &ProviderDescriptor, items: Vec<ProviderItem>) -> Vec<ResultRecord> {
    items
        .into_iter()
        .filter_map(|item| normalize_item(provider, item))
        .collect()
}

/// Convert one provider item; items without a title are dropped
fn normalize_item(provider: &ProviderDescriptor, item: ProviderItem) -> Option<ResultRecord> {
    let title = item.vod_name.as_deref().map(str::trim).unwrap_or_default();
    if title.is_empty() {
        return None;
    }

    Some(ResultRecord {
        id: value_to_string(&item.vod_id),
        title: title.to_string(),
        category: item.type_name.unwrap_or_default().trim().to_string(),
        year: extract_year(&value_to_string(&item.vod_year)),
        poster: item.vod_pic.unwrap_or_default(),
        description: item.vod_content.unwrap_or_default().trim().to_string(),
        remarks: item.vod_remarks.unwrap_or_default(),
        episodes: parse_episodes(item.vod_play_url.as_deref().unwrap_or_default()),
        source: provider.key.clone(),
        source_name: provider.name.clone(),
    })
}

/// Parse episode URLs from a play-url field
///
/// Format: groups separated by `$$$`, episodes by `#`, each episode
/// `name$url`. The group with the most playable URLs wins.
fn parse_episodes(play_url: &str) -> Vec<String> {
    play_url
        .split("$$$")
        .map(|group| {
            group
                .split('#')
                .filter_map(|episode| episode.rsplit('$').next())
                .map(str::trim)
                .filter(|url| url.starts_with("http://") || url.starts_with("https://"))
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .fold(Vec::new(), |best, group| {
            if group.len() > best.len() {
                group
            } else {
                best
            }
        })
}

/// First four-digit run in `raw`, or "unknown"
fn extract_year(raw: &str) -> String {
    raw.as_bytes()
        .windows(4)
        .position(|w| w.iter().all(u8::is_ascii_digit))
        .map(|start| raw[start..start + 4].to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

fn value_to_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
