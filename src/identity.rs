use sha2::{Digest, Sha256};
use uuid::Uuid;

const MAX_SLUG_LEN: usize = 60;
const HASH_LEN: usize = 8;

/// Derive a stable, URL-safe article id from title and external URL.
///
/// The id is `<slug>-<hash>` where the slug comes from the title and the
/// hash is the first 8 hex characters of SHA-256 over the URL. The same
/// (title, url) pair always produces the same id; the lookup service relies
/// on this to re-derive ids instead of storing them.
pub fn generate_id(title: Option<&str>, url: Option<&str>) -> String {
    match (title.filter(|t| !t.trim().is_empty()), url.filter(|u| !u.trim().is_empty())) {
        (Some(title), Some(url)) => {
            let slug = slugify(title);
            let hash = short_hash(url);
            if slug.is_empty() {
                format!("article-{}", hash)
            } else {
                format!("{}-{}", truncate_slug(&slug), hash)
            }
        }
        (None, Some(url)) => format!("article-{}", short_hash(url)),
        // No stable inputs at all: fall back to a random id so the caller
        // still gets a non-empty, link-safe string.
        _ => {
            let random = Uuid::new_v4().simple().to_string();
            format!("article-{}", &random[..HASH_LEN])
        }
    }
}

fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();
    let kept: String = lowered
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, ' ' | '\t' | '\n' | '_' | '-'))
        .collect();

    // Collapse runs of whitespace/underscore/hyphen into single hyphens.
    let mut slug = String::with_capacity(kept.len());
    let mut pending_separator = false;
    for c in kept.chars() {
        if c.is_whitespace() || c == '_' || c == '-' {
            if !slug.is_empty() {
                pending_separator = true;
            }
        } else {
            if pending_separator {
                slug.push('-');
                pending_separator = false;
            }
            slug.push(c);
        }
    }
    slug
}

fn truncate_slug(slug: &str) -> String {
    let truncated: String = slug.chars().take(MAX_SLUG_LEN).collect();
    truncated.trim_end_matches('-').to_string()
}

fn short_hash(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let hex = format!("{:x}", digest);
    hex[..HASH_LEN].to_string()
}
