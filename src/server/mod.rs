//! Server with on-demand generation and revalidation
//!
//! Generated pages are served from the public directory. A page older than
//! its revalidation period is served as-is while a fresh copy is generated
//! in the background; a post that was never generated is fetched and
//! rendered on the first request.

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path as FsPath, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::cms::CmsError;
use crate::config::RevalidateConfig;
use crate::content::PostSummary;
use crate::generator::{is_valid_uid, Generator, LOAD_MORE_ENDPOINT};
use crate::listing::IncrementalListState;

/// Seconds before the "loading" page reloads itself
const FALLBACK_RETRY_SECS: u64 = 1;

/// Server state
pub struct ServerState {
    generator: Generator,
    revalidate: RevalidateConfig,
    /// Pages currently being generated
    in_flight: Mutex<HashSet<String>>,
}

impl ServerState {
    pub fn new(generator: Generator) -> Self {
        let revalidate = generator.site().config.revalidate.clone();
        Self {
            generator,
            revalidate,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    fn public_dir(&self) -> &FsPath {
        &self.generator.site().public_dir
    }

    /// Mark `key` as being generated; `None` if another task already is
    fn begin(self: &Arc<Self>, key: &str) -> Option<InFlight> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if in_flight.insert(key.to_string()) {
            Some(InFlight {
                state: Arc::clone(self),
                key: key.to_string(),
            })
        } else {
            None
        }
    }

    fn is_in_flight(&self, key: &str) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(key)
    }
}

/// Removes its key from the in-flight set when dropped
struct InFlight {
    state: Arc<ServerState>,
    key: String,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.state
            .in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.key);
    }
}

/// A page the server knows how to (re)generate
#[derive(Debug, Clone, PartialEq, Eq)]
enum Page {
    Index,
    Post(String),
}

impl Page {
    fn key(&self) -> String {
        match self {
            Page::Index => "index".to_string(),
            Page::Post(uid) => format!("post/{}", uid),
        }
    }

    fn output_path(&self, generator: &Generator) -> PathBuf {
        match self {
            Page::Index => generator.index_output_path(),
            Page::Post(uid) => generator.post_output_path(uid),
        }
    }

    fn max_age(&self, revalidate: &RevalidateConfig) -> Duration {
        match self {
            Page::Index => Duration::from_secs(revalidate.index),
            Page::Post(_) => Duration::from_secs(revalidate.post),
        }
    }

    async fn generate(&self, generator: &Generator) -> Result<()> {
        match self {
            Page::Index => generator.generate_index().await.map(|_| ()),
            Page::Post(uid) => generator.generate_post(uid).await.map(|_| ()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Freshness {
    Missing,
    Fresh,
    Stale,
}

fn freshness(path: &FsPath, max_age: Duration, now: SystemTime) -> Freshness {
    let Ok(modified) = std::fs::metadata(path).and_then(|m| m.modified()) else {
        return Freshness::Missing;
    };
    match now.duration_since(modified) {
        Ok(age) if age > max_age => Freshness::Stale,
        _ => Freshness::Fresh,
    }
}

/// Build the application router
pub fn router(state: Arc<ServerState>) -> Router {
    let public_dir = state.public_dir().to_path_buf();
    let static_files = ServeDir::new(&public_dir)
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new(public_dir.join("404.html")));

    Router::new()
        .route("/", get(index_handler))
        .route("/post/:slug", get(post_handler))
        .route("/post/:slug/", get(post_handler))
        .route(LOAD_MORE_ENDPOINT, get(load_more_handler))
        .fallback_service(static_files)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the server
pub async fn start(generator: Generator, ip: &str, port: u16, open: bool) -> Result<()> {
    let state = Arc::new(ServerState::new(generator));
    let app = router(state);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let url = format!("http://{}:{}", ip, port);
    println!("Server running at {}", url);
    println!("Press Ctrl+C to stop.");

    if open {
        if let Err(e) = open_browser(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn index_handler(State(state): State<Arc<ServerState>>) -> Response {
    serve_page(state, Page::Index).await
}

async fn post_handler(
    State(state): State<Arc<ServerState>>,
    Path(slug): Path<String>,
) -> Response {
    if !is_valid_uid(&slug) {
        return not_found(&state);
    }
    serve_page(state, Page::Post(slug)).await
}

/// Serve a generated page, generating or revalidating it as needed
async fn serve_page(state: Arc<ServerState>, page: Page) -> Response {
    let path = page.output_path(&state.generator);
    let key = page.key();

    match freshness(&path, page.max_age(&state.revalidate), SystemTime::now()) {
        Freshness::Fresh => serve_file(&state, &path).await,
        Freshness::Stale => {
            let response = serve_file(&state, &path).await;
            if let Some(guard) = state.begin(&key) {
                let background = Arc::clone(&state);
                tokio::spawn(async move {
                    let _guard = guard;
                    tracing::info!("Revalidating {}", key);
                    if let Err(e) = page.generate(&background.generator).await {
                        tracing::error!("Revalidation of {} failed: {}", key, e);
                    }
                });
            }
            response
        }
        Freshness::Missing => {
            let Some(_guard) = state.begin(&key) else {
                return fallback(&state);
            };
            tracing::info!("Generating {} on demand", key);
            match page.generate(&state.generator).await {
                Ok(()) => serve_file(&state, &path).await,
                Err(e) if is_not_found(&e) => {
                    tracing::debug!("{} does not exist: {}", key, e);
                    not_found(&state)
                }
                Err(e) => {
                    tracing::error!("Generation of {} failed: {}", key, e);
                    (StatusCode::BAD_GATEWAY, "Failed to generate page").into_response()
                }
            }
        }
    }
}

fn is_not_found(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<CmsError>()
        .is_some_and(CmsError::is_not_found)
}

async fn serve_file(state: &ServerState, path: &FsPath) -> Response {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Html(content).into_response(),
        Err(e) => {
            tracing::error!("Failed to read {:?}: {}", path, e);
            not_found(state)
        }
    }
}

fn fallback(state: &ServerState) -> Response {
    match state.generator.render_fallback(FALLBACK_RETRY_SECS) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("Failed to render fallback page: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "Loading").into_response()
        }
    }
}

fn not_found(state: &ServerState) -> Response {
    match state.generator.render_not_found() {
        Ok(html) => (StatusCode::NOT_FOUND, Html(html)).into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct CursorQuery {
    cursor: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LoadMoreResponse {
    results: Vec<PostSummary>,
    next_page: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// One more page of formatted posts for the home page
async fn load_more_handler(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<CursorQuery>,
) -> Response {
    let Some(cursor) = query.cursor.filter(|c| !c.is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "missing cursor".to_string());
    };

    let result = IncrementalListState::from_cursor(cursor)
        .load_more(state.generator.fetcher(), state.generator.dates())
        .await;

    match result {
        Ok(next) => {
            let (results, next_page) = next.into_parts();
            Json(LoadMoreResponse { results, next_page }).into_response()
        }
        Err(e @ (CmsError::ForeignCursor(_) | CmsError::InvalidUrl { .. })) => {
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e) => {
            tracing::error!("Load more failed: {}", e);
            error_response(StatusCode::BAD_GATEWAY, e.to_string())
        }
    }
}

fn error_response(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorResponse { error })).into_response()
}

/// Open a URL in the default browser
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()?;
    }

    Ok(())
}
