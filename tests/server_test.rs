use httpmock::prelude::*;
use newswatch::{
    build_router, Aggregator, AppConfig, AppState, ArticleLookup, ContentExtractor, FeedSource,
    FetchConfig,
};
use std::sync::Arc;
use std::time::Duration;

async fn spawn_app(config: AppConfig) -> String {
    let image_dir = config.image_dir.clone();
    let extractor = ContentExtractor::new(&config.fetch);
    let aggregator = Arc::new(Aggregator::new(config));
    let lookup = Arc::new(ArticleLookup::new(aggregator.clone(), extractor));
    let router = build_router(AppState { aggregator, lookup }, &image_dir);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://{}", addr)
}

fn fixture_config(sources: Vec<FeedSource>, image_dir: &std::path::Path) -> AppConfig {
    let mut config = AppConfig::default()
        .with_sources(sources)
        .with_keywords(vec!["community".into(), "safety".into()])
        .with_image_dir(image_dir);
    config.fetch = FetchConfig {
        max_retries: 2,
        initial_retry_delay: Duration::from_millis(20),
        ..FetchConfig::default()
    };
    config
}

const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?><rss version="2.0"><channel>
<title>Fixture</title>
<item>
  <title>Community safety forum tonight</title>
  <link>__BASE__/articles/forum</link>
  <description>Residents will discuss neighborhood safety.</description>
  <pubDate>Mon, 05 May 2025 10:00:00 GMT</pubDate>
</item>
</channel></rss>"#;

const ARTICLE_PAGE: &str = r#"<html>
<head>
  <title>Community safety forum tonight - CBS News</title>
  <meta property="og:description" content="Residents will gather at city hall.">
</head>
<body>
  <article>
    <h1>Community safety forum tonight</h1>
    <p>Hundreds of residents are expected to attend the public forum on neighborhood safety at city hall.</p>
    <p>Organizers said the meeting will focus on emergency preparedness and community patrol programs.</p>
  </article>
</body></html>"#;

#[tokio::test]
async fn list_endpoint_returns_articles_and_camel_case_pagination() {
    let upstream = MockServer::start_async().await;
    let feed = FEED.replace("__BASE__", &upstream.base_url());
    upstream
        .mock_async(|when, then| {
            when.method(GET).path("/feed.xml");
            then.status(200).body(&feed);
        })
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let config = fixture_config(
        vec![FeedSource::new(upstream.url("/feed.xml"), "Fixture")],
        tmp.path(),
    );
    let app = spawn_app(config).await;

    let body: serde_json::Value = reqwest::get(format!("{}/api/news?page=1&limit=5", app))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let articles = body["articles"].as_array().unwrap();
    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0]["title"], "Community safety forum tonight");
    assert_eq!(articles[0]["source"], "Fixture");
    assert!(articles[0]["id"].as_str().unwrap().contains("community-safety-forum"));
    assert!(articles[0]["url"].as_str().unwrap().starts_with("/news/"));
    assert!(articles[0]["originalUrl"].as_str().unwrap().contains("/articles/forum"));

    let pagination = &body["pagination"];
    assert_eq!(pagination["currentPage"], 1);
    assert_eq!(pagination["totalPages"], 1);
    assert_eq!(pagination["totalArticles"], 1);
    assert_eq!(pagination["articlesPerPage"], 5);
    assert_eq!(pagination["hasMore"], false);
}

#[tokio::test]
async fn list_endpoint_rejects_bad_parameters() {
    let tmp = tempfile::tempdir().unwrap();
    let app = spawn_app(fixture_config(Vec::new(), tmp.path())).await;

    let response = reqwest::get(format!("{}/api/news?page=0", app)).await.unwrap();
    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Invalid page number");

    let response = reqwest::get(format!("{}/api/news?limit=50", app)).await.unwrap();
    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Invalid limit. Must be between 1 and 20");
}

#[tokio::test]
async fn detail_endpoint_extracts_known_url_directly() {
    let upstream = MockServer::start_async().await;
    let feed = FEED.replace("__BASE__", &upstream.base_url());
    upstream
        .mock_async(|when, then| {
            when.method(GET).path("/feed.xml");
            then.status(200).body(&feed);
        })
        .await;
    upstream
        .mock_async(|when, then| {
            when.method(GET).path("/articles/forum");
            then.status(200)
                .header("content-type", "text/html")
                .body(ARTICLE_PAGE);
        })
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let config = fixture_config(
        vec![FeedSource::new(upstream.url("/feed.xml"), "Fixture")],
        tmp.path(),
    );
    let app = spawn_app(config).await;

    let article_url = upstream.url("/articles/forum");
    let body: serde_json::Value = reqwest::get(format!(
        "{}/api/news/some-id?url={}",
        app,
        urlencode(&article_url)
    ))
    .await
    .unwrap()
    .json()
    .await
    .unwrap();

    assert_eq!(body["title"], "Community safety forum tonight");
    assert!(body["content"].as_str().unwrap().contains("city hall"));
    assert!(body["content"].as_str().unwrap().contains("emergency preparedness"));
    assert_eq!(body["originalUrl"], article_url);
}

#[tokio::test]
async fn detail_endpoint_finds_article_by_id_via_listing() {
    let upstream = MockServer::start_async().await;
    let feed = FEED.replace("__BASE__", &upstream.base_url());
    upstream
        .mock_async(|when, then| {
            when.method(GET).path("/feed.xml");
            then.status(200).body(&feed);
        })
        .await;
    upstream
        .mock_async(|when, then| {
            when.method(GET).path("/articles/forum");
            then.status(200)
                .header("content-type", "text/html")
                .body(ARTICLE_PAGE);
        })
        .await;

    let tmp = tempfile::tempdir().unwrap();
    let config = fixture_config(
        vec![FeedSource::new(upstream.url("/feed.xml"), "Fixture")],
        tmp.path(),
    );
    let app = spawn_app(config).await;

    // Derive the id the same way the aggregator does.
    let id = newswatch::generate_id(
        Some("Community safety forum tonight"),
        Some(&upstream.url("/articles/forum")),
    );

    let response = reqwest::get(format!("{}/api/news/{}", app, id)).await.unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["id"], id);
    assert!(body["content"].as_str().unwrap().contains("public forum"));
}

#[tokio::test]
async fn detail_endpoint_404s_for_unknown_id() {
    let tmp = tempfile::tempdir().unwrap();
    let app = spawn_app(fixture_config(Vec::new(), tmp.path())).await;

    let response = reqwest::get(format!("{}/api/news/never-heard-of-it", app))
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("Article not found"));
}

#[tokio::test]
async fn health_endpoint_responds() {
    let tmp = tempfile::tempdir().unwrap();
    let app = spawn_app(fixture_config(Vec::new(), tmp.path())).await;

    let response = reqwest::get(format!("{}/health", app)).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "ok");
}

fn urlencode(s: &str) -> String {
    let mut out = String::new();
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
