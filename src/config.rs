use crate::types::FeedSource;
use std::path::PathBuf;
use std::time::Duration;

/// HTTP fetch tuning shared by the feed fetcher and the extractor.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    /// Per-request timeout for feed fetches.
    pub feed_timeout: Duration,
    /// Per-request timeout for image downloads.
    pub image_timeout: Duration,
    /// Per-request timeout for article-page fetches during extraction.
    pub page_timeout: Duration,
    pub max_retries: u32,
    pub initial_retry_delay: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            feed_timeout: Duration::from_secs(30),
            image_timeout: Duration::from_secs(5),
            page_timeout: Duration::from_secs(15),
            max_retries: 3,
            initial_retry_delay: Duration::from_millis(1000),
        }
    }
}

/// Immutable application configuration. Passed into the aggregator at
/// construction so tests can supply fixture feed lists instead of the
/// production sources.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub sources: Vec<FeedSource>,
    /// Case-insensitive substrings; an item matching any one is kept.
    pub keywords: Vec<String>,
    pub fetch: FetchConfig,
    /// Directory downloaded images are written into, served under `/images`.
    pub image_dir: PathBuf,
    /// Hard cap on the merged, sorted article list before pagination.
    pub max_articles: usize,
    pub max_images_per_article: usize,
    /// When set, aggregated snapshots are reused for this long instead of
    /// re-fetching every feed on every request.
    pub cache_ttl: Option<Duration>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sources: vec![
                FeedSource::new("https://www.latimes.com/california/rss2.0.xml", "LA Times"),
                FeedSource::new("https://www.cbsnews.com/latest/rss/main", "CBS News"),
                FeedSource::new("https://feeds.npr.org/1001/rss.xml", "NPR"),
                FeedSource::new(
                    "https://feeds.nbcnews.com/nbcnews/public/news",
                    "NBC News",
                ),
            ],
            keywords: default_keywords(),
            fetch: FetchConfig::default(),
            image_dir: PathBuf::from("public/images/news"),
            max_articles: 50,
            max_images_per_article: 10,
            cache_ttl: None,
        }
    }
}

/// Substring matching is intentional: no stemming, no word boundaries.
/// Keywords are kept long enough to avoid accidental matches inside
/// unrelated words.
fn default_keywords() -> Vec<String> {
    [
        "community",
        "safety",
        "police",
        "crime",
        "emergency",
        "neighborhood",
        "immigration",
        "enforcement",
        "detention",
        "deportation",
        "evacuation",
        "wildfire",
        "public health",
        "incident",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl AppConfig {
    pub fn with_sources(mut self, sources: Vec<FeedSource>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }

    pub fn with_image_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.image_dir = dir.into();
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.cache_ttl = ttl;
        self
    }
}
