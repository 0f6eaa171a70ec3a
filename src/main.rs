use clap::Parser;
use newswatch::{
    build_router, Aggregator, AppConfig, AppState, ArticleLookup, ContentExtractor,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "newswatch", about = "Community-safety news aggregation service")]
struct Args {
    /// Address to bind the HTTP server on.
    #[arg(long, env = "NEWSWATCH_BIND", default_value = "127.0.0.1:3000")]
    bind: SocketAddr,

    /// Directory downloaded article images are stored in.
    #[arg(long, env = "NEWSWATCH_IMAGE_DIR", default_value = "public/images/news")]
    image_dir: PathBuf,

    /// Reuse aggregated snapshots for this many seconds instead of
    /// re-fetching every feed on every request. Omit to disable caching.
    #[arg(long, env = "NEWSWATCH_CACHE_TTL_SECS")]
    cache_ttl_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let config = AppConfig::default()
        .with_image_dir(args.image_dir.clone())
        .with_cache_ttl(args.cache_ttl_secs.map(Duration::from_secs));

    info!(
        "Starting newswatch with {} feed sources, image dir {:?}",
        config.sources.len(),
        config.image_dir
    );

    tokio::fs::create_dir_all(&config.image_dir).await?;

    let extractor = ContentExtractor::new(&config.fetch);
    let aggregator = Arc::new(Aggregator::new(config.clone()));
    let lookup = Arc::new(ArticleLookup::new(aggregator.clone(), extractor));

    let state = AppState { aggregator, lookup };
    let router = build_router(state, &config.image_dir);

    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    info!("Listening on {}", args.bind);
    axum::serve(listener, router).await?;

    Ok(())
}
