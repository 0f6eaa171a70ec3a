use crate::aggregator::Aggregator;
use crate::lookup::ArticleLookup;
use crate::types::NewsError;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::error;

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    pub lookup: Arc<ArticleLookup>,
}

/// The two JSON endpoints consumed by the listing and detail pages, plus a
/// health probe and the static route for downloaded images.
pub fn build_router(state: AppState, image_dir: &std::path::Path) -> Router {
    Router::new()
        .route("/api/news", get(list_news))
        .route("/api/news/:id", get(article_detail))
        .route("/health", get(health))
        .nest_service("/images", ServeDir::new(image_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct ListParams {
    page: Option<usize>,
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct DetailParams {
    url: Option<String>,
}

async fn list_news(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Response, NewsError> {
    let page = params.page.unwrap_or(1);
    let limit = params.limit.unwrap_or(10);

    let news = state.aggregator.get_articles(page, limit).await?;
    Ok(Json(news).into_response())
}

async fn article_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<DetailParams>,
) -> Result<Response, NewsError> {
    let article = state
        .lookup
        .lookup_article(&id, params.url.as_deref())
        .await?;
    Ok(Json(article).into_response())
}

async fn health() -> &'static str {
    "ok"
}

impl IntoResponse for NewsError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            NewsError::InvalidPage | NewsError::InvalidLimit => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            NewsError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            other => {
                error!("Request failed: {}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to fetch news".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
