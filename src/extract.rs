use crate::config::FetchConfig;
use crate::images::{dedup_in_place, og_image_from_html};
use crate::types::ExtractedContent;
use regex::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;
use tracing::{debug, warn};
use url::Url;

/// Shown when an article page yields nothing usable. Never an empty string:
/// the detail page always has something to render.
pub const FALLBACK_CONTENT: &str =
    "Full article content could not be extracted. Please visit the original source to read this story.";

const MIN_PARAGRAPH_LEN: usize = 50;
const MAX_FALLBACK_PARAGRAPHS: usize = 20;
const MAX_IMAGES: usize = 10;

/// Ordered strategy lists: each cascade is tried top to bottom until one
/// selector yields a non-empty result. New sources register additional
/// selectors here without touching the control flow.
const TITLE_SELECTORS: &[&str] = &[
    "h1",
    ".headline",
    ".article-headline",
    ".story-title",
    ".entry-title",
];

const AUTHOR_META_SELECTORS: &[(&str, &str)] = &[
    (r#"meta[name="author"]"#, "content"),
    (r#"meta[property="article:author"]"#, "content"),
];

const AUTHOR_SELECTORS: &[&str] = &[
    ".byline__name",
    ".author-name",
    ".byline",
    r#"[rel="author"]"#,
    ".article-author",
];

const DATE_META_SELECTORS: &[(&str, &str)] = &[
    (r#"meta[property="article:published_time"]"#, "content"),
    (r#"meta[name="date"]"#, "content"),
    (r#"meta[itemprop="datePublished"]"#, "content"),
    ("time[datetime]", "datetime"),
];

const DATE_SELECTORS: &[&str] = &[".published-date", ".timestamp", ".article-date", "time"];

const DESCRIPTION_META_SELECTORS: &[(&str, &str)] = &[
    (r#"meta[property="og:description"]"#, "content"),
    (r#"meta[name="description"]"#, "content"),
];

const DESCRIPTION_SELECTORS: &[&str] = &[".article-summary", ".dek", ".standfirst"];

const BODY_CONTAINER_SELECTORS: &[&str] = &[
    "article",
    ".article-body",
    ".story-body",
    ".entry-content",
    ".post-content",
    ".article-content",
    "#article-body",
    ".rich-text",
    "main",
];

/// Elements whose descendants never count as article text.
const EXCLUDED_ANCESTORS: &[&str] = &["nav", "header", "footer", "aside", "script", "style"];
const EXCLUDED_CLASS_HINTS: &[&str] = &["advert", "promo", "newsletter", "related", "sidebar"];

/// Fetches an external article page and recovers structured fields from
/// unstructured HTML via prioritized selector cascades. Never errors: the
/// worst case is the fixed fallback content with source "Unknown".
pub struct ContentExtractor {
    client: Client,
}

impl ContentExtractor {
    pub fn new(config: &FetchConfig) -> Self {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.page_timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }

    pub async fn extract(&self, url: &str) -> ExtractedContent {
        let html = match self.fetch_page(url).await {
            Some(html) => html,
            None => {
                warn!("Extraction fetch failed for {}", url);
                return fallback_content();
            }
        };

        extract_from_html(&html, url)
    }

    async fn fetch_page(&self, url: &str) -> Option<String> {
        let response = self.client.get(url).send().await.ok()?;
        if !response.status().is_success() {
            debug!("Extraction fetch for {} returned HTTP {}", url, response.status());
            return None;
        }
        response.text().await.ok()
    }
}

/// The synchronous heart of the extractor, separated from the fetch so
/// fixtures can exercise it without a server (and so the non-Send DOM never
/// lives across an await point).
pub fn extract_from_html(html: &str, url: &str) -> ExtractedContent {
    let stripped = strip_noise_elements(html);
    let document = Html::parse_document(&stripped);

    let title = extract_title(&document);
    let author = first_meta(&document, AUTHOR_META_SELECTORS)
        .or_else(|| first_text(&document, AUTHOR_SELECTORS))
        .map(|a| clean_author(&a));
    let date = first_meta(&document, DATE_META_SELECTORS)
        .or_else(|| first_text(&document, DATE_SELECTORS));
    let description = first_meta(&document, DESCRIPTION_META_SELECTORS)
        .or_else(|| first_text(&document, DESCRIPTION_SELECTORS));

    let body = extract_body(&document);
    let content = match body {
        Some(body) if !body.trim().is_empty() => scrub_boilerplate(&body),
        _ => FALLBACK_CONTENT.to_string(),
    };

    let images = extract_images(&document, html, url);

    ExtractedContent {
        content,
        title,
        author,
        source: Some(source_from_url(url)),
        date,
        description,
        images,
    }
}

fn fallback_content() -> ExtractedContent {
    ExtractedContent {
        content: FALLBACK_CONTENT.to_string(),
        title: None,
        author: None,
        source: Some("Unknown".to_string()),
        date: None,
        description: None,
        images: Vec::new(),
    }
}

/// Script and style bodies would otherwise leak into text collection, and
/// scraper offers no node removal, so they are stripped from the raw HTML
/// up front.
fn strip_noise_elements(html: &str) -> String {
    static NOISE: OnceLock<Regex> = OnceLock::new();
    let noise = NOISE.get_or_init(|| {
        Regex::new(r"(?is)<(script|style|noscript)\b[^>]*>.*?</(script|style|noscript)>")
            .expect("static regex")
    });
    noise.replace_all(html, "").into_owned()
}

fn sel(s: &str) -> Selector {
    Selector::parse(s).expect("static selector")
}

fn first_text(document: &Html, selectors: &[&str]) -> Option<String> {
    for raw in selectors {
        let selector = sel(raw);
        if let Some(text) = document
            .select(&selector)
            .map(|el| collapse_whitespace(&el.text().collect::<String>()))
            .find(|t| !t.is_empty())
        {
            return Some(text);
        }
    }
    None
}

fn first_meta(document: &Html, selectors: &[(&str, &str)]) -> Option<String> {
    for (raw, attr) in selectors {
        let selector = sel(raw);
        if let Some(value) = document
            .select(&selector)
            .filter_map(|el| el.value().attr(attr))
            .map(|v| v.trim().to_string())
            .find(|v| !v.is_empty())
        {
            return Some(value);
        }
    }
    None
}

fn extract_title(document: &Html) -> Option<String> {
    first_text(document, TITLE_SELECTORS)
        .or_else(|| first_meta(document, &[(r#"meta[property="og:title"]"#, "content")]))
        .or_else(|| first_text(document, &["title"]))
        .map(|t| strip_site_suffix(&t))
        .filter(|t| !t.is_empty())
}

fn strip_site_suffix(title: &str) -> String {
    static SUFFIX: OnceLock<Regex> = OnceLock::new();
    let suffix = SUFFIX.get_or_init(|| {
        Regex::new(
            r"\s*[|\-\u{2013}\u{2014}]\s*(Los Angeles Times|LA Times|CBS News|CBS Los Angeles|NPR|NBC News|NBC Los Angeles)\s*$",
        )
        .expect("static regex")
    });
    suffix.replace(title.trim(), "").trim().to_string()
}

fn clean_author(author: &str) -> String {
    static BY: OnceLock<Regex> = OnceLock::new();
    let by = BY.get_or_init(|| Regex::new(r"(?i)^by\s+").expect("static regex"));
    by.replace(author.trim(), "").trim().to_string()
}

/// Fixed hostname mapping for the sources the site aggregates; unknown
/// hosts fall back to the capitalized first DNS label.
pub fn source_from_url(url: &str) -> String {
    let host = match Url::parse(url).ok().and_then(|u| u.host_str().map(|h| h.to_string())) {
        Some(host) => host,
        None => return "Unknown".to_string(),
    };
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();

    match host.as_str() {
        h if h.ends_with("latimes.com") => "LA Times".to_string(),
        h if h.ends_with("cbsnews.com") => "CBS News".to_string(),
        h if h.ends_with("npr.org") => "NPR".to_string(),
        h if h.ends_with("nbcnews.com") => "NBC News".to_string(),
        _ => {
            let label = host.split('.').next().unwrap_or("");
            if label.is_empty() {
                "Unknown".to_string()
            } else {
                let mut chars = label.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => "Unknown".to_string(),
                }
            }
        }
    }
}

fn extract_body(document: &Html) -> Option<String> {
    for raw in BODY_CONTAINER_SELECTORS {
        let selector = sel(raw);
        if let Some(container) = document.select(&selector).next() {
            let paragraphs = collect_paragraphs(container, usize::MAX);
            if !paragraphs.is_empty() {
                return Some(paragraphs.join("\n\n"));
            }
        }
    }

    // No container matched: scan the whole document for the first long
    // paragraphs instead.
    if let Some(body) = document.select(&sel("body")).next() {
        let paragraphs = collect_paragraphs(body, MAX_FALLBACK_PARAGRAPHS);
        if !paragraphs.is_empty() {
            return Some(paragraphs.join("\n\n"));
        }
    }

    None
}

fn collect_paragraphs(container: ElementRef<'_>, max: usize) -> Vec<String> {
    let selector = sel("p");
    container
        .select(&selector)
        .filter(|p| !has_excluded_ancestor(*p))
        .map(|p| collapse_whitespace(&p.text().collect::<String>()))
        .filter(|text| text.chars().count() > MIN_PARAGRAPH_LEN)
        .take(max)
        .collect()
}

fn has_excluded_ancestor(element: ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| {
            let name = ancestor.value().name();
            if EXCLUDED_ANCESTORS.contains(&name) {
                return true;
            }
            if let Some(class) = ancestor.value().attr("class") {
                let class = class.to_lowercase();
                if EXCLUDED_CLASS_HINTS.iter().any(|hint| class.contains(hint)) {
                    return true;
                }
            }
            false
        })
}

/// Known boilerplate the aggregated outlets append to article bodies,
/// mostly automated-narration disclaimers.
fn scrub_boilerplate(body: &str) -> String {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        [
            r"(?i)this audio is auto-generated\.?\s*please let us know if you have feedback\.?",
            r"(?i)listen to this article\s*[\u{b7}:]?\s*\d+\s*(min(ute)?s?|:\d+)?",
            r"(?i)this article was (produced|generated) (with|using) automated (voice|narration) technology\.?",
            r"(?i)sign up for our (daily |weekly )?newsletter to get the latest[^.]*\.",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("static regex"))
        .collect()
    });

    let mut cleaned = body.to_string();
    for pattern in patterns.iter() {
        cleaned = pattern.replace_all(&cleaned, "").into_owned();
    }

    // Removing sentences can leave empty paragraphs behind.
    cleaned
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn extract_images(document: &Html, raw_html: &str, url: &str) -> Vec<String> {
    let base = Url::parse(url).ok();

    // Prefer images inside the article element; fall back to a
    // document-wide scan.
    let scoped: Vec<ElementRef<'_>> = match document.select(&sel("article")).next() {
        Some(article) => article.select(&sel("img")).collect(),
        None => document.select(&sel("img")).collect(),
    };

    let mut images = Vec::new();
    for img in scoped {
        let raw = img
            .value()
            .attr("src")
            .or_else(|| img.value().attr("data-src"))
            .or_else(|| img.value().attr("data-lazy-src"));
        let Some(raw) = raw else { continue };
        if raw.starts_with("data:") {
            continue;
        }

        let alt = img.value().attr("alt").unwrap_or("");
        if is_furniture(raw, alt) {
            continue;
        }
        if !passes_dimension_filter(img) {
            continue;
        }

        let resolved = match Url::parse(raw) {
            Ok(u) => Some(u.to_string()),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                base.as_ref().and_then(|b| b.join(raw).ok()).map(|u| u.to_string())
            }
            Err(_) => None,
        };
        if let Some(resolved) = resolved {
            images.push(resolved);
        }
    }

    // Open-Graph and meta image tags go at the front when not already seen.
    let mut front = Vec::new();
    if let Some(og) = og_image_from_html(raw_html, url) {
        front.push(og);
    }
    if let Some(meta) = first_meta(document, &[(r#"meta[name="image"]"#, "content")]) {
        front.push(meta);
    }
    front.extend(images);

    dedup_in_place(&mut front);
    front.truncate(MAX_IMAGES);
    front
}

/// Page furniture: icons, logos, avatars, ad slots. An "ad" hint only
/// counts as a standalone path segment or word so words like "upload" or
/// "read" never match.
fn is_furniture(url: &str, alt: &str) -> bool {
    static AD: OnceLock<Regex> = OnceLock::new();
    let ad = AD.get_or_init(|| Regex::new(r"(?i)(^|[/_\-.\s])ads?([/_\-.\s]|$)").expect("static regex"));

    let url_lower = url.to_lowercase();
    let alt_lower = alt.to_lowercase();
    let keyword_hit = ["icon", "logo", "avatar", "advertisement"]
        .iter()
        .any(|k| url_lower.contains(k) || alt_lower.contains(k));

    keyword_hit || ad.is_match(&url_lower) || ad.is_match(&alt_lower)
}

/// Keep images with no declared dimensions; when dimensions are declared,
/// require width > 300 or height > 200 to exclude decoration.
fn passes_dimension_filter(img: ElementRef<'_>) -> bool {
    let width = img.value().attr("width").and_then(|w| w.trim().parse::<u32>().ok());
    let height = img.value().attr("height").and_then(|h| h.trim().parse::<u32>().ok());

    match (width, height) {
        (None, None) => true,
        (w, h) => w.map_or(false, |w| w > 300) || h.map_or(false, |h| h > 200),
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
