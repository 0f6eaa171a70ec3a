pub mod aggregator;
pub mod cache;
pub mod config;
pub mod extract;
pub mod fetcher;
pub mod identity;
pub mod images;
pub mod lookup;
pub mod relevance;
pub mod server;
pub mod types;

pub use aggregator::Aggregator;
pub use cache::{NoopCache, SnapshotCache, TtlCache};
pub use config::{AppConfig, FetchConfig};
pub use extract::ContentExtractor;
pub use fetcher::FeedFetcher;
pub use identity::generate_id;
pub use images::{ImageResolver, ImageStore};
pub use lookup::ArticleLookup;
pub use relevance::RelevanceFilter;
pub use server::{build_router, AppState};
pub use types::*;
