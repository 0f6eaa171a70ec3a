use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One configured feed: the RSS/Atom URL plus the display name shown as
/// the article's source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSource {
    pub url: String,
    pub name: String,
}

impl FeedSource {
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
        }
    }
}

/// A single entry parsed out of a feed, before filtering and enrichment.
#[derive(Debug, Clone, Default)]
pub struct RawFeedItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub author: Option<String>,
    pub categories: Vec<String>,
    pub enclosure_url: Option<String>,
    pub media_content_urls: Vec<String>,
    pub media_thumbnail_urls: Vec<String>,
    pub itunes_image: Option<String>,
}

/// The aggregator's output unit. Built fresh on every request; nothing is
/// persisted except image files the downloader wrote to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    pub description: String,
    pub content: String,
    /// Internal detail-page URL, `/news/<id>`.
    pub url: String,
    pub original_url: Option<String>,
    pub image_url: Option<String>,
    /// Deduplicated, at most ten entries.
    pub images: Vec<String>,
    pub source: String,
    pub date: DateTime<Utc>,
    pub author: Option<String>,
    pub categories: Vec<String>,
}

/// What the full-content extractor recovered from an external article page.
/// Always produced; on total failure `content` carries a fixed fallback
/// string instead of being empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedContent {
    pub content: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub source: Option<String>,
    pub date: Option<String>,
    pub description: Option<String>,
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: usize,
    pub total_pages: usize,
    pub total_articles: usize,
    pub articles_per_page: usize,
    pub has_more: bool,
}

/// One page of aggregated news, as returned by `GET /api/news`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsPage {
    pub articles: Vec<Article>,
    pub pagination: Pagination,
}

#[derive(Debug, thiserror::Error)]
pub enum NewsError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid page number")]
    InvalidPage,

    #[error("Invalid limit. Must be between 1 and 20")]
    InvalidLimit,

    #[error("Article not found. The article list may have been refreshed. Please return to the news page.")]
    NotFound,

    #[error("{0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, NewsError>;

/// Truncate to `max_len` characters, appending `...` when anything was cut.
/// Operates on characters, not bytes, so multi-byte text never panics.
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_len).collect();
    format!("{}...", truncated)
}
