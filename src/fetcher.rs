use crate::config::FetchConfig;
use crate::types::{FeedSource, RawFeedItem};
use backoff::backoff::Backoff;
use backoff::exponential::ExponentialBackoff;
use chrono::{DateTime, Utc};
use feed_rs::parser;
use reqwest::Client;
use std::error::Error as StdError;
use tracing::{debug, info, warn};

/// Fetches and parses one RSS/Atom feed with retry/backoff.
///
/// A feed source that cannot be reached or parsed contributes zero articles;
/// failures never propagate to the aggregation as a whole.
pub struct FeedFetcher {
    client: Client,
    config: FetchConfig,
}

/// Why a fetch attempt failed, reduced to the single decision the retry
/// loop cares about.
enum FetchFailure {
    Retryable(String),
    Fatal(String),
}

impl FeedFetcher {
    pub fn new(config: FetchConfig) -> Self {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.feed_timeout)
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    /// Fetch and parse `source`, returning its entries. Retryable failures
    /// (HTTP 502/503/504, connection reset, timeouts) are retried up to
    /// `max_retries` attempts with the delay growing by 1.5x between
    /// attempts; everything else, and exhausted retries, yield an empty
    /// list.
    pub async fn fetch_feed(&self, source: &FeedSource) -> Vec<RawFeedItem> {
        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: self.config.initial_retry_delay,
            initial_interval: self.config.initial_retry_delay,
            randomization_factor: 0.0,
            multiplier: 1.5,
            max_interval: self.config.initial_retry_delay * 64,
            max_elapsed_time: None,
            ..Default::default()
        };

        for attempt in 1..=self.config.max_retries {
            debug!("Fetching feed {} (attempt {})", source.url, attempt);

            match self.fetch_once(&source.url).await {
                Ok(items) => {
                    info!(
                        "Fetched {} entries from {} ({})",
                        items.len(),
                        source.name,
                        source.url
                    );
                    return items;
                }
                Err(FetchFailure::Fatal(reason)) => {
                    warn!("Giving up on feed {}: {}", source.url, reason);
                    return Vec::new();
                }
                Err(FetchFailure::Retryable(reason)) => {
                    if attempt < self.config.max_retries {
                        if let Some(delay) = backoff.next_backoff() {
                            warn!(
                                "Attempt {} failed for {} ({}), retrying in {:?}",
                                attempt, source.url, reason, delay
                            );
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                    }
                    warn!(
                        "Feed {} still failing after {} attempts: {}",
                        source.url, attempt, reason
                    );
                }
            }
        }

        Vec::new()
    }

    async fn fetch_once(&self, url: &str) -> std::result::Result<Vec<RawFeedItem>, FetchFailure> {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                return Err(classify_transport_error(&e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let reason = format!("HTTP {}", status);
            return if matches!(status.as_u16(), 502 | 503 | 504) {
                Err(FetchFailure::Retryable(reason))
            } else {
                Err(FetchFailure::Fatal(reason))
            };
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => return Err(classify_transport_error(&e)),
        };

        let feed = parser::parse(body.as_ref())
            .map_err(|e| FetchFailure::Fatal(format!("feed parse error: {}", e)))?;

        let feed_image = feed
            .logo
            .as_ref()
            .or(feed.icon.as_ref())
            .map(|image| image.uri.clone());

        Ok(feed
            .entries
            .into_iter()
            .map(|entry| map_entry(entry, feed_image.as_deref()))
            .collect())
    }
}

/// Timeouts and connection-level failures are worth retrying; anything else
/// (TLS, bad URL, decode) is not.
fn classify_transport_error(e: &reqwest::Error) -> FetchFailure {
    if e.is_timeout() || e.is_connect() || is_connection_reset(e) {
        FetchFailure::Retryable(e.to_string())
    } else {
        FetchFailure::Fatal(e.to_string())
    }
}

fn is_connection_reset(e: &reqwest::Error) -> bool {
    let mut source: Option<&(dyn StdError + 'static)> = e.source();
    while let Some(err) = source {
        if let Some(io_err) = err.downcast_ref::<std::io::Error>() {
            if matches!(
                io_err.kind(),
                std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::ConnectionAborted
            ) {
                return true;
            }
        }
        source = err.source();
    }
    false
}

/// Map a feed-rs entry onto our raw item shape. Media RSS content and
/// thumbnails are flattened; RSS enclosures surface either as media content
/// or as links with `rel="enclosure"` depending on the feed dialect, so
/// both are checked. itunes:image has no per-entry slot in feed-rs and
/// falls back to the channel logo.
fn map_entry(entry: feed_rs::model::Entry, feed_image: Option<&str>) -> RawFeedItem {
    let title = entry.title.map(|t| t.content);
    let link = entry.links.iter().find(|l| l.rel.is_none()).map(|l| l.href.clone());
    let link = link.or_else(|| entry.links.first().map(|l| l.href.clone()));

    let enclosure_url = entry
        .links
        .iter()
        .find(|l| l.rel.as_deref() == Some("enclosure"))
        .map(|l| l.href.clone());

    let mut media_content_urls = Vec::new();
    let mut media_thumbnail_urls = Vec::new();
    for media in &entry.media {
        for content in &media.content {
            if let Some(url) = &content.url {
                media_content_urls.push(url.to_string());
            }
        }
        for thumbnail in &media.thumbnails {
            media_thumbnail_urls.push(thumbnail.image.uri.clone());
        }
    }

    let description = entry.summary.map(|s| s.content);
    let content = entry.content.and_then(|c| c.body).or_else(|| description.clone());

    let published: Option<DateTime<Utc>> = entry
        .published
        .or(entry.updated)
        .map(|dt| dt.with_timezone(&Utc));

    RawFeedItem {
        title,
        link,
        description,
        content,
        published,
        author: entry.authors.first().map(|a| a.name.clone()),
        categories: entry.categories.into_iter().map(|c| c.term).collect(),
        enclosure_url,
        media_content_urls,
        media_thumbnail_urls,
        itunes_image: feed_image.map(|s| s.to_string()),
    }
}
