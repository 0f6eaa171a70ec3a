use crate::config::FetchConfig;
use crate::types::RawFeedItem;
use reqwest::Client;
use scraper::{Html, Selector};
use std::path::PathBuf;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
const ALLOWED_SUBTYPES: &[&str] = &["jpeg", "jpg", "png", "gif", "webp"];

/// Images resolved for one article: the primary candidate (remote URL), the
/// locally downloaded copy of it if the download succeeded, and the full
/// deduplicated list.
#[derive(Debug, Clone, Default)]
pub struct ResolvedImages {
    pub primary: Option<String>,
    pub local: Option<String>,
    pub all: Vec<String>,
}

/// Downloads remote images into a local directory.
///
/// Every failure path returns `None`; image persistence is pure enrichment
/// and must never fail an article.
pub struct ImageStore {
    client: Client,
    dir: PathBuf,
}

impl ImageStore {
    pub fn new(config: &FetchConfig, dir: PathBuf) -> Self {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.image_timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { client, dir }
    }

    /// Fetch `url` and persist it under a fresh random filename, returning
    /// the site-relative path (`/images/<uuid>.<ext>`). Enforces: status
    /// exactly 200, `image/*` content type with an allow-listed subtype,
    /// body at most 5 MB.
    pub async fn download_image(&self, url: &str) -> Option<String> {
        let parsed = Url::parse(url).ok()?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return None;
        }

        let response = match self.client.get(parsed).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!("Image fetch failed for {}: {}", url, e);
                return None;
            }
        };

        if response.status().as_u16() != 200 {
            debug!("Image fetch for {} returned HTTP {}", url, response.status());
            return None;
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())?;

        let subtype = content_type
            .strip_prefix("image/")?
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_lowercase();

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("Image body read failed for {}: {}", url, e);
                return None;
            }
        };

        if bytes.len() > MAX_IMAGE_BYTES {
            debug!("Image {} too large ({} bytes)", url, bytes.len());
            return None;
        }

        if !ALLOWED_SUBTYPES.contains(&subtype.as_str()) {
            debug!("Image {} has disallowed subtype {}", url, subtype);
            return None;
        }

        let ext = if subtype == "jpeg" { "jpg" } else { subtype.as_str() };
        let filename = format!("{}.{}", Uuid::new_v4(), ext);
        let path = self.dir.join(&filename);

        if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
            warn!("Failed to create image directory {:?}: {}", self.dir, e);
            return None;
        }
        if let Err(e) = tokio::fs::write(&path, &bytes).await {
            warn!("Failed to write image {:?}: {}", path, e);
            return None;
        }

        debug!("Stored image {} as {}", url, filename);
        Some(format!("/images/{}", filename))
    }
}

/// Locates candidate images for a feed item and arranges them into the
/// article's primary image and image list. All network in this path is
/// best-effort.
pub struct ImageResolver {
    client: Client,
    max_images: usize,
}

impl ImageResolver {
    pub fn new(config: &FetchConfig, max_images: usize) -> Self {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.page_timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { client, max_images }
    }

    pub async fn resolve(
        &self,
        item: &RawFeedItem,
        article_url: Option<&str>,
        store: &ImageStore,
    ) -> ResolvedImages {
        let mut primary = primary_candidate(item);
        let mut all = Vec::new();

        if let (Some(body), Some(base)) = (item.content.as_deref(), article_url) {
            all = extract_img_tags(body, base);
        }

        // Last resort: one-shot fetch of the article page for og:image.
        if primary.is_none() && all.is_empty() {
            if let Some(url) = article_url {
                primary = self.fetch_og_image(url).await;
            }
        }

        let mut local = None;
        if let Some(primary_url) = &primary {
            local = store.download_image(primary_url).await;

            let mut front = Vec::new();
            if let Some(local_path) = &local {
                front.push(local_path.clone());
            }
            front.push(primary_url.clone());
            front.extend(all);
            all = front;
        }

        dedup_in_place(&mut all);
        all.truncate(self.max_images);

        ResolvedImages { primary, local, all }
    }

    async fn fetch_og_image(&self, article_url: &str) -> Option<String> {
        let response = self.client.get(article_url).send().await.ok()?;
        if !response.status().is_success() {
            return None;
        }
        let html = response.text().await.ok()?;
        og_image_from_html(&html, article_url)
    }
}

/// First non-null wins: enclosure, media:content, media:thumbnail,
/// itunes:image.
fn primary_candidate(item: &RawFeedItem) -> Option<String> {
    item.enclosure_url
        .clone()
        .or_else(|| item.media_content_urls.first().cloned())
        .or_else(|| item.media_thumbnail_urls.first().cloned())
        .or_else(|| item.itunes_image.clone())
}

/// Pull image URLs out of an HTML fragment, trying `src`, then `data-src`,
/// then `data-lazy-src` on each `<img>`. Relative URLs are resolved against
/// the article's own URL; `data:` URIs and unparsable URLs are dropped.
pub fn extract_img_tags(html: &str, base_url: &str) -> Vec<String> {
    let fragment = Html::parse_fragment(html);
    let selector = Selector::parse("img").expect("static selector");

    let base = Url::parse(base_url).ok();
    let mut out = Vec::new();

    for element in fragment.select(&selector) {
        let raw = element
            .value()
            .attr("src")
            .or_else(|| element.value().attr("data-src"))
            .or_else(|| element.value().attr("data-lazy-src"));

        let Some(raw) = raw else { continue };
        if raw.starts_with("data:") {
            continue;
        }

        if let Some(resolved) = resolve_against(raw, base.as_ref()) {
            out.push(resolved);
        }
    }

    out
}

fn resolve_against(raw: &str, base: Option<&Url>) -> Option<String> {
    match Url::parse(raw) {
        Ok(url) => Some(url.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            base.and_then(|b| b.join(raw).ok()).map(|u| u.to_string())
        }
        Err(_) => None,
    }
}

pub fn og_image_from_html(html: &str, base_url: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector =
        Selector::parse(r#"meta[property="og:image"], meta[name="og:image"]"#).expect("static selector");

    let base = Url::parse(base_url).ok();
    document
        .select(&selector)
        .find_map(|el| el.value().attr("content"))
        .filter(|content| !content.starts_with("data:"))
        .and_then(|content| resolve_against(content, base.as_ref()))
}

pub fn dedup_in_place(urls: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    urls.retain(|url| seen.insert(url.clone()));
}
