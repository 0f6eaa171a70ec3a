use crate::aggregator::Aggregator;
use crate::extract::{ContentExtractor, FALLBACK_CONTENT};
use crate::images::dedup_in_place;
use crate::types::{truncate_text, Article, ExtractedContent, NewsError, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

/// Pages of aggregator output scanned when only enriching a known URL with
/// listing metadata.
const METADATA_SEARCH_PAGES: usize = 5;
/// Pages scanned when the id is all we have.
const ID_SEARCH_PAGES: usize = 20;
const SEARCH_PAGE_SIZE: usize = 20;
const MAX_IMAGES: usize = 10;

/// Resolves an article by id for the detail endpoint, delegating to the
/// full-content extractor whenever an external URL is available.
pub struct ArticleLookup {
    aggregator: Arc<Aggregator>,
    extractor: ContentExtractor,
}

impl ArticleLookup {
    pub fn new(aggregator: Arc<Aggregator>, extractor: ContentExtractor) -> Self {
        Self {
            aggregator,
            extractor,
        }
    }

    pub async fn lookup_article(&self, id: &str, known_url: Option<&str>) -> Result<Article> {
        // Fast path: the caller already knows the external URL, so no
        // search is required before extraction. The bounded metadata scan
        // only enriches the response; coming up empty is not an error.
        if let Some(url) = known_url {
            let extracted = self.extractor.extract(url).await;
            let metadata = self
                .find_in_listing(id, Some(url), METADATA_SEARCH_PAGES)
                .await;
            return Ok(merge_article(metadata, extracted, id, url));
        }

        // Slow path: page through the aggregator's output for an id match.
        let Some(found) = self.find_in_listing(id, None, ID_SEARCH_PAGES).await else {
            debug!("Article {} not found in listing", id);
            return Err(NewsError::NotFound);
        };

        // Extraction needs an external URL; without one the listing entry
        // is the best available answer.
        let Some(original_url) = found.original_url.clone() else {
            return Ok(found);
        };

        let extracted = self.extractor.extract(&original_url).await;
        Ok(merge_article(Some(found), extracted, id, &original_url))
    }

    async fn find_in_listing(
        &self,
        id: &str,
        url: Option<&str>,
        max_pages: usize,
    ) -> Option<Article> {
        for page in 1..=max_pages {
            let listing = match self.aggregator.get_articles(page, SEARCH_PAGE_SIZE).await {
                Ok(listing) => listing,
                Err(e) => {
                    warn!("Listing search failed on page {}: {}", page, e);
                    return None;
                }
            };

            let hit = listing.articles.iter().find(|a| {
                a.id == id || url.is_some_and(|u| a.original_url.as_deref() == Some(u))
            });
            if let Some(hit) = hit {
                return Some(hit.clone());
            }

            if !listing.pagination.has_more {
                break;
            }
        }
        None
    }
}

/// Fold extracted page content over whatever the listing knew about the
/// article. Extracted fields win where present; the fallback content string
/// only replaces listing content when the listing had none.
fn merge_article(
    metadata: Option<Article>,
    extracted: ExtractedContent,
    id: &str,
    url: &str,
) -> Article {
    let mut article = metadata.unwrap_or_else(|| Article {
        id: id.to_string(),
        title: String::new(),
        description: String::new(),
        content: String::new(),
        url: format!("/news/{}", id),
        original_url: Some(url.to_string()),
        image_url: None,
        images: Vec::new(),
        source: String::new(),
        date: Utc::now(),
        author: None,
        categories: Vec::new(),
    });

    if extracted.content != FALLBACK_CONTENT || article.content.trim().is_empty() {
        article.content = extracted.content;
    }

    if let Some(title) = extracted.title {
        article.title = title;
    } else if article.title.is_empty() {
        article.title = "Untitled".to_string();
    }

    if let Some(description) = extracted.description {
        article.description = truncate_text(&description, 150);
    }
    if extracted.author.is_some() {
        article.author = extracted.author;
    }
    if let Some(source) = extracted.source {
        if article.source.is_empty() || article.source == "Unknown" {
            article.source = source;
        }
    }
    if let Some(date) = extracted.date.as_deref().and_then(parse_page_date) {
        article.date = date;
    }

    let mut images = extracted.images;
    images.extend(article.images.clone());
    dedup_in_place(&mut images);
    images.truncate(MAX_IMAGES);
    if article.image_url.is_none() {
        article.image_url = images.first().cloned();
    }
    article.images = images;

    article.original_url = Some(url.to_string());
    article
}

/// Article pages publish dates in several formats; try the common ones.
fn parse_page_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
