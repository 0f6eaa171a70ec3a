use crate::types::RawFeedItem;

/// Keyword-substring classifier deciding whether a feed item is shown.
///
/// Matching is pure substring containment over the lowercased concatenation
/// of title, description, and content. No stemming, no word boundaries:
/// the keyword list is curated to avoid short ambiguous terms, but the
/// algorithm itself does not enforce boundaries. This is a known heuristic
/// limitation kept for compatibility with the listing behavior users see.
pub struct RelevanceFilter {
    keywords: Vec<String>,
}

impl RelevanceFilter {
    pub fn new(keywords: Vec<String>) -> Self {
        let keywords = keywords.into_iter().map(|k| k.to_lowercase()).collect();
        Self { keywords }
    }

    pub fn is_relevant(&self, item: &RawFeedItem) -> bool {
        let haystack = format!(
            "{} {} {}",
            item.title.as_deref().unwrap_or(""),
            item.description.as_deref().unwrap_or(""),
            item.content.as_deref().unwrap_or("")
        )
        .to_lowercase();

        self.keywords.iter().any(|k| haystack.contains(k.as_str()))
    }
}
