//! HTTP API over the current index snapshot.
//!
//! | Route | Response |
//! |-------|----------|
//! | `GET /` | welcome message |
//! | `GET /index.json` | the whole snapshot |
//! | `GET /stats` | the snapshot's `info` map |
//! | `GET /search?q=&page=&per_page=&exclude=` | one page of search results |
//! | `GET /{collection}/{option\|package}/{key}` | one record |
//!
//! Errors are `{"error": "..."}` bodies with a 4xx status.

use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::future::Future;
use std::ops::Range;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use crate::model::{Collection, Index};
use crate::search::{self, PackageOrOption, Query as SearchQuery};
use crate::store::IndexHandle;

#[derive(Clone)]
pub struct AppState {
    pub index: Arc<IndexHandle>,
    pub per_page: usize,
}

impl AppState {
    pub fn new(index: Arc<IndexHandle>, per_page: usize) -> Self {
        Self {
            index,
            per_page: per_page.max(1),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub page: Option<String>,
    pub per_page: Option<String>,
    /// Comma-separated collection names to leave out, e.g. `nixos,homemanager`.
    pub exclude: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchPage {
    pub results: Vec<PackageOrOption>,
    pub total: usize,
    #[serde(rename = "totalPages")]
    pub total_pages: usize,
    pub page: usize,
    pub per_page: usize,
}

/// A 4xx response with an `{"error": message}` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: "Not found".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_root))
        .route("/index.json", get(handle_index))
        .route("/stats", get(handle_stats))
        .route("/search", get(handle_search))
        .route("/:collection/:kind/:key", get(handle_record))
        .layer(Extension(state))
        .layer(cors)
}

/// Serves the API on `listener` until `shutdown` resolves.
pub async fn serve<S>(listener: TcpListener, state: AppState, shutdown: S) -> std::io::Result<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "listening");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

pub async fn handle_root() -> Json<serde_json::Value> {
    Json(json!({ "message": "Welcome to the Search NixOS API" }))
}

pub async fn handle_index(Extension(state): Extension<AppState>) -> Json<Arc<Index>> {
    Json(state.index.load())
}

pub async fn handle_stats(Extension(state): Extension<AppState>) -> Json<serde_json::Value> {
    Json(json!(state.index.load().info))
}

pub async fn handle_search(
    Extension(state): Extension<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchPage>, ApiError> {
    let page = positive(params.page.as_deref(), 1)
        .ok_or_else(|| ApiError::bad_request("page must be a positive integer"))?;
    let per_page = positive(params.per_page.as_deref(), state.per_page)
        .ok_or_else(|| ApiError::bad_request("per_page must be a positive integer"))?;
    let query = params
        .q
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Query parameter 'q' is required"))?;

    let results = match SearchQuery::parse(&query) {
        Some(mut parsed) => {
            for collection in excluded(params.exclude.as_deref()) {
                if !parsed.excluded.contains(&collection) {
                    parsed.excluded.push(collection);
                }
            }
            search::execute(&state.index.load(), &parsed)
        }
        None => Vec::new(),
    };
    let total = results.len();
    let (range, total_pages) = page_bounds(total, page, per_page);
    tracing::debug!(query = %query, total, page, "search");

    Ok(Json(SearchPage {
        results: results.into_iter().skip(range.start).take(range.len()).collect(),
        total,
        total_pages,
        page,
        per_page,
    }))
}

pub async fn handle_record(
    Extension(state): Extension<AppState>,
    Path((collection, kind, key)): Path<(String, String, String)>,
) -> Response {
    let Ok(collection) = collection.parse::<Collection>() else {
        return ApiError::not_found().into_response();
    };
    if kind != collection.kind().as_str() {
        return ApiError::not_found().into_response();
    }

    let index = state.index.load();
    match index.get(collection, &key) {
        Some(entry) => Json(entry).into_response(),
        None => ApiError::not_found().into_response(),
    }
}

/// Collections named in an `exclude` list. Unknown names are ignored.
fn excluded(list: Option<&str>) -> Vec<Collection> {
    list.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .filter_map(|name| match name.parse::<Collection>() {
            Ok(collection) => Some(collection),
            Err(_) => {
                tracing::debug!(name, "ignoring unknown excluded collection");
                None
            }
        })
        .collect()
}

/// Parses an optional positive integer parameter, falling back to `default`
/// when absent or empty.
fn positive(value: Option<&str>, default: usize) -> Option<usize> {
    match value.map(str::trim) {
        None | Some("") => Some(default),
        Some(text) => text.parse().ok().filter(|n| *n > 0),
    }
}

/// Slice of the result list shown on `page`, and the page count.
///
/// There is always at least one page. A page past the end is empty.
pub fn page_bounds(total: usize, page: usize, per_page: usize) -> (Range<usize>, usize) {
    let per_page = per_page.max(1);
    let total_pages = total.div_ceil(per_page).max(1);
    let start = page.saturating_sub(1).saturating_mul(per_page).min(total);
    let end = start.saturating_add(per_page).min(total);
    (start..end, total_pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CanonicalOption, CanonicalPackage, OptionSource, PackageSource};

    fn state() -> AppState {
        let mut index = Index::default();
        for n in 0..45 {
            let key = format!("pkg{n:02}");
            index.nixpkgs.insert(
                key.clone(),
                CanonicalPackage::new(PackageSource::Nixpkgs, &key, "1"),
            );
        }
        index.home_manager.insert(
            "programs.git.enable".to_string(),
            CanonicalOption::new(OptionSource::HomeManager).with_description("Whether to enable Git."),
        );
        AppState::new(Arc::new(IndexHandle::new(index.stamp("test"))), 20)
    }

    fn params(q: Option<&str>, page: Option<&str>, per_page: Option<&str>) -> Query<SearchParams> {
        Query(SearchParams {
            q: q.map(String::from),
            page: page.map(String::from),
            per_page: per_page.map(String::from),
            exclude: None,
        })
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_page_bounds() {
        assert_eq!(page_bounds(0, 1, 20), (0..0, 1));
        assert_eq!(page_bounds(45, 1, 20), (0..20, 3));
        assert_eq!(page_bounds(45, 3, 20), (40..45, 3));
        assert_eq!(page_bounds(45, 9, 20), (45..45, 3));
        assert_eq!(page_bounds(20, 1, 20), (0..20, 1));
    }

    #[test]
    fn test_positive() {
        assert_eq!(positive(None, 20), Some(20));
        assert_eq!(positive(Some(""), 20), Some(20));
        assert_eq!(positive(Some("3"), 20), Some(3));
        assert_eq!(positive(Some("0"), 20), None);
        assert_eq!(positive(Some("-1"), 20), None);
        assert_eq!(positive(Some("two"), 20), None);
    }

    #[tokio::test]
    async fn test_search_paginates() {
        let Json(page) = handle_search(Extension(state()), params(Some("pkg"), Some("3"), None))
            .await
            .unwrap();
        assert_eq!(page.total, 45);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.page, 3);
        assert_eq!(page.per_page, 20);
        assert_eq!(page.results.len(), 5);
        assert_eq!(page.results[0].key, "pkg40");
    }

    #[test]
    fn test_excluded_names() {
        assert_eq!(
            excluded(Some("nixos, homemanager,,nur")),
            vec![Collection::Nixos, Collection::HomeManager, Collection::Nur]
        );
        assert_eq!(excluded(Some("home-manager,flakes")), vec![Collection::HomeManager]);
        assert!(excluded(None).is_empty());
    }

    #[tokio::test]
    async fn test_search_honours_exclude_param() {
        let Json(page) = handle_search(Extension(state()), params(Some("git"), None, None))
            .await
            .unwrap();
        assert!(page
            .results
            .iter()
            .any(|r| r.source == Collection::HomeManager));

        let Query(mut excluding) = params(Some("git"), None, None);
        excluding.exclude = Some("homemanager,nur".to_string());
        let Json(page) = handle_search(Extension(state()), Query(excluding))
            .await
            .unwrap();
        assert_eq!(page.total, 0);
        assert!(page.results.is_empty());

        let Query(mut excluding) = params(Some("pkg"), None, None);
        excluding.exclude = Some("nixpkgs".to_string());
        let Json(page) = handle_search(Extension(state()), Query(excluding))
            .await
            .unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn test_search_without_results_has_one_page() {
        let Json(page) = handle_search(Extension(state()), params(Some("nothing-here"), None, Some("5")))
            .await
            .unwrap();
        assert_eq!(page.total, 0);
        assert_eq!(page.total_pages, 1);
        assert!(page.results.is_empty());
    }

    #[tokio::test]
    async fn test_search_rejects_bad_params() {
        for (q, page, per_page) in [
            (None, None, None),
            (Some("  "), None, None),
            (Some("git"), Some("0"), None),
            (Some("git"), None, Some("x")),
        ] {
            let err = handle_search(Extension(state()), params(q, page, per_page))
                .await
                .unwrap_err();
            let response = err.into_response();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert!(body_json(response).await["error"].is_string());
        }
    }

    #[tokio::test]
    async fn test_record_lookup() {
        let path = Path((
            "home-manager".to_string(),
            "option".to_string(),
            "programs.git.enable".to_string(),
        ));
        let response = handle_record(Extension(state()), path).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["source"], "home-manager");
        assert_eq!(body["description"], "Whether to enable Git.");
    }

    #[tokio::test]
    async fn test_record_lookup_not_found() {
        for (collection, kind, key) in [
            ("nixpkgs", "package", "absent"),
            ("nixpkgs", "option", "pkg01"),
            ("unknown", "package", "pkg01"),
        ] {
            let path = Path((collection.to_string(), kind.to_string(), key.to_string()));
            let response = handle_record(Extension(state()), path).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
            assert_eq!(body_json(response).await, json!({ "error": "Not found" }));
        }
    }

    #[tokio::test]
    async fn test_stats_returns_info() {
        let Json(stats) = handle_stats(Extension(state())).await;
        assert_eq!(stats["nixpkgs-length"], "45");
        assert_eq!(stats["homemanager-length"], "1");
        assert_eq!(stats["version"], "test");
    }
}
