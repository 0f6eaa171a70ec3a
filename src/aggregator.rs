use crate::cache::{NoopCache, SnapshotCache, TtlCache};
use crate::config::AppConfig;
use crate::fetcher::FeedFetcher;
use crate::images::{ImageResolver, ImageStore};
use crate::relevance::RelevanceFilter;
use crate::types::{
    truncate_text, Article, FeedSource, NewsError, NewsPage, Pagination, RawFeedItem, Result,
};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{debug, info};

const DESCRIPTION_LEN: usize = 150;
const PER_SOURCE_CONCURRENCY: usize = 4;

/// Top-level news aggregation: fan out over every configured source, filter
/// by relevance, enrich with images, merge, sort, cap, paginate.
///
/// One bad feed, one bad image, or one bad item never prevents the rest of
/// the snapshot from being returned.
pub struct Aggregator {
    config: AppConfig,
    fetcher: FeedFetcher,
    filter: RelevanceFilter,
    resolver: ImageResolver,
    store: ImageStore,
    cache: Box<dyn SnapshotCache>,
}

impl Aggregator {
    pub fn new(config: AppConfig) -> Self {
        let cache: Box<dyn SnapshotCache> = match config.cache_ttl {
            Some(ttl) => Box::new(TtlCache::new(ttl)),
            None => Box::new(NoopCache),
        };
        Self::with_cache(config, cache)
    }

    pub fn with_cache(config: AppConfig, cache: Box<dyn SnapshotCache>) -> Self {
        let fetcher = FeedFetcher::new(config.fetch.clone());
        let filter = RelevanceFilter::new(config.keywords.clone());
        let resolver = ImageResolver::new(&config.fetch, config.max_images_per_article);
        let store = ImageStore::new(&config.fetch, config.image_dir.clone());

        Self {
            config,
            fetcher,
            filter,
            resolver,
            store,
            cache,
        }
    }

    /// One page of the aggregated listing. `page` starts at 1; `limit` must
    /// be between 1 and 20. Pagination is a pure slice over the merged,
    /// sorted snapshot, which is capped at `max_articles` first.
    pub async fn get_articles(&self, page: usize, limit: usize) -> Result<NewsPage> {
        if page < 1 {
            return Err(NewsError::InvalidPage);
        }
        if limit < 1 || limit > 20 {
            return Err(NewsError::InvalidLimit);
        }

        let snapshot = match self.cache.get() {
            Some(snapshot) => {
                debug!("Serving {} articles from snapshot cache", snapshot.len());
                snapshot
            }
            None => {
                let snapshot = self.build_snapshot().await;
                self.cache.put(snapshot.clone());
                snapshot
            }
        };

        let total = snapshot.len();
        let total_pages = total.div_ceil(limit);
        let start = (page - 1) * limit;
        let articles: Vec<Article> = snapshot
            .into_iter()
            .skip(start)
            .take(limit)
            .collect();

        Ok(NewsPage {
            articles,
            pagination: Pagination {
                current_page: page,
                total_pages,
                total_articles: total,
                articles_per_page: limit,
                has_more: page < total_pages,
            },
        })
    }

    /// Fetch every source concurrently, then merge, sort newest-first, and
    /// cap. All sources complete (or degrade to empty) before the merge
    /// runs; the sort re-establishes a deterministic output order however
    /// the concurrent enrichment interleaved.
    async fn build_snapshot(&self) -> Vec<Article> {
        let per_source =
            futures::future::join_all(self.config.sources.iter().map(|s| self.collect_source(s)))
                .await;

        let mut articles: Vec<Article> = per_source.into_iter().flatten().collect();
        articles.sort_by(|a, b| b.date.cmp(&a.date));
        articles.truncate(self.config.max_articles);

        info!("Aggregated snapshot holds {} articles", articles.len());
        articles
    }

    async fn collect_source(&self, source: &FeedSource) -> Vec<Article> {
        let items = self.fetcher.fetch_feed(source).await;
        let kept: Vec<RawFeedItem> = items
            .into_iter()
            .filter(|item| self.filter.is_relevant(item))
            .collect();

        debug!("Source {}: {} relevant items", source.name, kept.len());

        // Items are independent of each other; image resolution and
        // download overlap within the source.
        stream::iter(kept)
            .map(|item| self.build_article(item, source))
            .buffer_unordered(PER_SOURCE_CONCURRENCY)
            .collect()
            .await
    }

    async fn build_article(&self, item: RawFeedItem, source: &FeedSource) -> Article {
        let resolved = self
            .resolver
            .resolve(&item, item.link.as_deref(), &self.store)
            .await;

        let id = crate::identity::generate_id(item.title.as_deref(), item.link.as_deref());
        let title = item.title.unwrap_or_else(|| "Untitled".to_string());

        let description_source = item
            .description
            .clone()
            .or_else(|| item.content.clone())
            .unwrap_or_default();
        let description = truncate_text(&description_source, DESCRIPTION_LEN);

        let content = item
            .content
            .or(item.description)
            .unwrap_or_default();

        let image_url = resolved.local.clone().or_else(|| resolved.primary.clone());

        Article {
            url: format!("/news/{}", id),
            id,
            title,
            description,
            content,
            original_url: item.link,
            image_url,
            images: resolved.all,
            source: source.name.clone(),
            date: item.published.unwrap_or_else(Utc::now),
            author: item.author,
            categories: item.categories,
        }
    }
}
