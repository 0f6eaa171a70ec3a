use httpmock::prelude::*;
use newswatch::{Aggregator, AppConfig, ContentExtractor, FeedSource, FetchConfig};
use std::time::Duration;

fn fast_fetch_config() -> FetchConfig {
    FetchConfig {
        max_retries: 3,
        initial_retry_delay: Duration::from_millis(20),
        ..FetchConfig::default()
    }
}

fn test_config(sources: Vec<FeedSource>, image_dir: &std::path::Path) -> AppConfig {
    let mut config = AppConfig::default()
        .with_sources(sources)
        .with_keywords(vec!["community".into(), "safety".into()])
        .with_image_dir(image_dir);
    config.fetch = fast_fetch_config();
    config
}

/// RSS body with one `<item>` per (title, slug, pub_date) triple. Links
/// point back at the mock server so no enrichment step leaves localhost.
fn rss_feed(base_url: &str, items: &[(&str, &str, &str)]) -> String {
    let mut body = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?><rss version="2.0"><channel><title>Fixture</title>"#,
    );
    for (title, slug, date) in items {
        body.push_str(&format!(
            "<item><title>{}</title><link>{}/articles/{}</link>\
             <description>{} description</description><pubDate>{}</pubDate></item>",
            title, base_url, slug, title, date
        ));
    }
    body.push_str("</channel></rss>");
    body
}

#[tokio::test]
async fn end_to_end_pagination_over_seven_relevant_articles() {
    let server = MockServer::start_async().await;
    let base = server.base_url();

    let feed_a = rss_feed(
        &base,
        &[
            ("Community garden opens", "a1", "Mon, 05 May 2025 10:00:00 GMT"),
            ("Safety drill downtown", "a2", "Mon, 05 May 2025 09:00:00 GMT"),
            ("Community budget hearing", "a3", "Mon, 05 May 2025 08:00:00 GMT"),
            ("Weather forecast sunny", "a4", "Mon, 05 May 2025 07:00:00 GMT"),
        ],
    );
    let feed_b = rss_feed(
        &base,
        &[
            ("Safety patrol expands", "b1", "Sun, 04 May 2025 10:00:00 GMT"),
            ("Community fair this week", "b2", "Sun, 04 May 2025 09:00:00 GMT"),
            ("Stock market update", "b3", "Sun, 04 May 2025 08:00:00 GMT"),
            ("New community center", "b4", "Sun, 04 May 2025 07:00:00 GMT"),
            ("Road safety campaign", "b5", "Sun, 04 May 2025 06:00:00 GMT"),
        ],
    );

    server
        .mock_async(|when, then| {
            when.method(GET).path("/feed-a.xml");
            then.status(200).body(&feed_a);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/feed-b.xml");
            then.status(200).body(&feed_b);
        })
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let config = test_config(
        vec![
            FeedSource::new(server.url("/feed-a.xml"), "Feed A"),
            FeedSource::new(server.url("/feed-b.xml"), "Feed B"),
        ],
        tmp.path(),
    );
    let aggregator = Aggregator::new(config);

    // 7 of the 9 fixture items carry a keyword.
    let page1 = aggregator.get_articles(1, 5).await.unwrap();
    assert_eq!(page1.articles.len(), 5);
    assert_eq!(page1.pagination.total_articles, 7);
    assert_eq!(page1.pagination.total_pages, 2);
    assert!(page1.pagination.has_more);

    let page2 = aggregator.get_articles(2, 5).await.unwrap();
    assert_eq!(page2.articles.len(), 2);
    assert!(!page2.pagination.has_more);

    // Newest first across sources.
    assert_eq!(page1.articles[0].title, "Community garden opens");
    let dates: Vec<_> = page1
        .articles
        .iter()
        .chain(page2.articles.iter())
        .map(|a| a.date)
        .collect();
    assert!(dates.windows(2).all(|w| w[0] >= w[1]));

    // No overlap between pages.
    assert!(page1.articles.iter().all(|a| page2.articles.iter().all(|b| b.id != a.id)));
}

#[tokio::test]
async fn one_failing_source_degrades_to_remaining_sources() {
    let server = MockServer::start_async().await;
    let base = server.base_url();

    let good = rss_feed(
        &base,
        &[("Community watch update", "g1", "Mon, 05 May 2025 10:00:00 GMT")],
    );
    server
        .mock_async(|when, then| {
            when.method(GET).path("/good.xml");
            then.status(200).body(&good);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/down.xml");
            then.status(503);
        })
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let config = test_config(
        vec![
            FeedSource::new(server.url("/down.xml"), "Broken"),
            FeedSource::new(server.url("/good.xml"), "Good"),
        ],
        tmp.path(),
    );
    let aggregator = Aggregator::new(config);

    let page = aggregator.get_articles(1, 10).await.unwrap();
    assert_eq!(page.articles.len(), 1);
    assert_eq!(page.articles[0].source, "Good");
}

#[tokio::test]
async fn pagination_parameters_are_validated() {
    let tmp = tempfile::tempdir().unwrap();
    let config = test_config(Vec::new(), tmp.path());
    let aggregator = Aggregator::new(config);

    assert!(matches!(
        aggregator.get_articles(0, 10).await,
        Err(newswatch::NewsError::InvalidPage)
    ));
    assert!(matches!(
        aggregator.get_articles(1, 0).await,
        Err(newswatch::NewsError::InvalidLimit)
    ));
    assert!(matches!(
        aggregator.get_articles(1, 21).await,
        Err(newswatch::NewsError::InvalidLimit)
    ));
    assert!(aggregator.get_articles(1, 20).await.is_ok());
}

#[tokio::test]
async fn article_images_are_deduplicated_and_capped_at_ten() {
    let server = MockServer::start_async().await;
    let base = server.base_url();

    let mut imgs = String::new();
    for i in 0..12 {
        imgs.push_str(&format!(r#"&lt;img src="{}/pics/{}.jpg"&gt;"#, base, i));
    }
    // One duplicate on top of the twelve.
    imgs.push_str(&format!(r#"&lt;img src="{}/pics/0.jpg"&gt;"#, base));

    let feed = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><rss version="2.0"><channel><title>F</title>
<item>
  <title>Community photo essay</title>
  <link>{base}/articles/photos</link>
  <description>{imgs}</description>
  <enclosure url="{base}/pics/primary.jpg" type="image/jpeg" length="1000"/>
</item>
</channel></rss>"#
    );

    server
        .mock_async(|when, then| {
            when.method(GET).path("/feed.xml");
            then.status(200).body(&feed);
        })
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let config = test_config(vec![FeedSource::new(server.url("/feed.xml"), "F")], tmp.path());
    let aggregator = Aggregator::new(config);

    let page = aggregator.get_articles(1, 10).await.unwrap();
    assert_eq!(page.articles.len(), 1);
    let article = &page.articles[0];

    assert!(article.images.len() <= 10, "got {} images", article.images.len());
    let unique: std::collections::HashSet<_> = article.images.iter().collect();
    assert_eq!(unique.len(), article.images.len());
    assert_eq!(article.images[0], format!("{}/pics/primary.jpg", base));
}

#[tokio::test]
async fn extraction_of_error_page_returns_fixed_fallback() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/gone");
            then.status(404).body("<html><body>not found</body></html>");
        })
        .await;

    let extractor = ContentExtractor::new(&FetchConfig::default());
    let out = extractor.extract(&server.url("/gone")).await;

    assert_eq!(out.content, newswatch::extract::FALLBACK_CONTENT);
    assert_eq!(out.source.as_deref(), Some("Unknown"));
    assert!(out.title.is_none());
    assert!(out.images.is_empty());
}

#[tokio::test]
async fn snapshot_cache_avoids_refetching_within_ttl() {
    let server = MockServer::start_async().await;
    let base = server.base_url();
    let feed = rss_feed(
        &base,
        &[("Community news item", "c1", "Mon, 05 May 2025 10:00:00 GMT")],
    );
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/feed.xml");
            then.status(200).body(&feed);
        })
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let mut config = test_config(vec![FeedSource::new(server.url("/feed.xml"), "F")], tmp.path());
    config.cache_ttl = Some(Duration::from_secs(300));
    let aggregator = Aggregator::new(config);

    aggregator.get_articles(1, 10).await.unwrap();
    aggregator.get_articles(1, 10).await.unwrap();
    aggregator.get_articles(2, 10).await.unwrap();

    mock.assert_hits_async(1).await;
}
