use crate::types::Article;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Cache for one aggregated article snapshot (the merged, sorted, capped
/// list all pagination slices from). The aggregator takes this as a
/// collaborator so the re-fetch-on-every-request behavior is a
/// configuration choice, not baked into its logic.
pub trait SnapshotCache: Send + Sync {
    fn get(&self) -> Option<Vec<Article>>;
    fn put(&self, articles: Vec<Article>);
}

/// Never caches; every request re-fetches every feed. The historical
/// default for this service.
pub struct NoopCache;

impl SnapshotCache for NoopCache {
    fn get(&self) -> Option<Vec<Article>> {
        None
    }

    fn put(&self, _articles: Vec<Article>) {}
}

/// Time-boxed in-memory snapshot cache.
pub struct TtlCache {
    ttl: Duration,
    inner: Mutex<Option<(Instant, Vec<Article>)>>,
}

impl TtlCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: Mutex::new(None),
        }
    }
}

impl SnapshotCache for TtlCache {
    fn get(&self) -> Option<Vec<Article>> {
        let guard = self.inner.lock().ok()?;
        match guard.as_ref() {
            Some((stored_at, articles)) if stored_at.elapsed() < self.ttl => {
                Some(articles.clone())
            }
            _ => None,
        }
    }

    fn put(&self, articles: Vec<Article>) {
        if let Ok(mut guard) = self.inner.lock() {
            *guard = Some((Instant::now(), articles));
        }
    }
}
