//! HTTP server for the employee directory.
//!
//! Every data endpoint first makes sure the cache is loaded, forwarding the
//! caller's `Cookie` header to remote sources.
//!
//! # API Endpoints
//!
//! | Method | Path                           | Description                     |
//! |--------|--------------------------------|---------------------------------|
//! | GET    | `/health`                      | Health check                    |
//! | GET    | `/api/employees`               | Filtered employee search        |
//! | GET    | `/api/employee/{id}/projects`  | Projects of one employee        |
//! | GET    | `/api/projects`                | Filtered project listing        |
//! | GET    | `/api/practice-areas`          | Distinct practice areas         |
//! | GET    | `/api/sub-practice-areas`      | Distinct sub-practice areas     |
//! | GET    | `/api/export/employees`        | Filtered employees as CSV       |
//! | POST   | `/api/cache/clear`             | Drop cached tables              |
//! | GET    | `/api/logs`                    | SSE stream of directory logs    |

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, Method},
    response::{sse::Event, IntoResponse, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::LOG_BROADCASTER;
use super::types::{
    EmployeeProjectsResponse, EmployeeView, EmployeesResponse, ProjectParams, ProjectView,
    ProjectsResponse, SearchParams,
};
use crate::cache::{DirectoryCache, DirectorySnapshot};
use crate::config::DirectoryConfig;
use crate::error::{ServerError, ServerResult};
use crate::export::{export_filename, project_for_export, write_csv};
use crate::query::{sort_by_name, EmployeeFilter, ProjectFilter};
use crate::source::{AuthContext, ConfiguredSource};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub cache: DirectoryCache,
}

impl AppState {
    /// Load (or join the running load) with the caller's cookie, then snapshot.
    async fn loaded(&self, headers: &HeaderMap) -> ServerResult<Arc<DirectorySnapshot>> {
        let auth = auth_from_headers(headers);
        self.cache.ensure_loaded(auth.as_ref()).await?;
        Ok(self.cache.snapshot())
    }
}

fn auth_from_headers(headers: &HeaderMap) -> Option<AuthContext> {
    AuthContext::from_cookie_header(headers.get(header::COOKIE).and_then(|v| v.to_str().ok()))
}

/// Build the API router around `cache`.
pub fn router(cache: DirectoryCache) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/employees", get(employees))
        .route("/api/employee/{id}/projects", get(employee_projects))
        .route("/api/projects", get(projects))
        .route("/api/practice-areas", get(practice_areas))
        .route("/api/sub-practice-areas", get(sub_practice_areas))
        .route("/api/export/employees", get(export_employees))
        .route("/api/cache/clear", post(clear_cache))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(AppState { cache })
}

/// Start the HTTP server
pub async fn start_server(config: DirectoryConfig) -> Result<(), Box<dyn std::error::Error>> {
    let source = ConfiguredSource::from_config(&config)?;
    let cache = DirectoryCache::new(Arc::new(source), config.openasset_base_url.clone());
    let app = router(cache);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    println!("🚀 Directory server running on http://localhost:{}", config.port);
    println!("   GET  /api/employees           - Search employees");
    println!("   GET  /api/projects            - List projects");
    println!("   GET  /api/export/employees    - Export CSV");
    println!("   POST /api/cache/clear         - Reload data on next request");
    println!("   GET  /api/logs                - SSE log stream");
    if config.uses_remote() {
        println!();
        println!("☁️  Remote CSV sources configured; browser cookies are forwarded");
    } else {
        println!();
        println!("📁 Reading CSV files from {}", config.data_dir.display());
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "employee-directory",
        "version": env!("CARGO_PKG_VERSION"),
        "loaded": state.cache.is_loaded(),
    }))
}

async fn employees(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> ServerResult<Json<EmployeesResponse>> {
    let snapshot = state.loaded(&headers).await?;
    let filter = EmployeeFilter::from(params);

    let employees = snapshot.search(&filter).iter().map(EmployeeView::from).collect();
    Ok(Json(EmployeesResponse { employees }))
}

async fn employee_projects(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ServerResult<Json<EmployeeProjectsResponse>> {
    let employee_id: i64 = id
        .trim()
        .parse()
        .map_err(|_| ServerError::BadRequest(format!("Invalid employee id: '{}'", id)))?;

    let snapshot = state.loaded(&headers).await?;
    let mut projects = snapshot.employee_projects(employee_id);
    sort_by_name(&mut projects);

    let projects: Vec<ProjectView> = projects.iter().map(ProjectView::from).collect();
    Ok(Json(EmployeeProjectsResponse {
        employee_id,
        total_projects: projects.len(),
        projects,
    }))
}

async fn projects(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ProjectParams>,
) -> ServerResult<Json<ProjectsResponse>> {
    let snapshot = state.loaded(&headers).await?;
    let filter = ProjectFilter::from(params);

    let projects: Vec<ProjectView> = snapshot
        .search_projects(&filter)
        .iter()
        .map(ProjectView::from)
        .collect();
    Ok(Json(ProjectsResponse {
        total_found: projects.len(),
        total_in_system: snapshot.projects.len(),
        projects,
    }))
}

async fn practice_areas(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ServerResult<Json<Value>> {
    let snapshot = state.loaded(&headers).await?;
    Ok(Json(json!({ "practice_areas": snapshot.distinct_practice_areas() })))
}

async fn sub_practice_areas(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ServerResult<Json<Value>> {
    let snapshot = state.loaded(&headers).await?;
    Ok(Json(json!({ "sub_practice_areas": snapshot.distinct_sub_practice_areas() })))
}

async fn export_employees(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> ServerResult<impl IntoResponse> {
    let snapshot = state.loaded(&headers).await?;
    if snapshot.employees.is_empty() {
        return Err(ServerError::NotFound("No employees found in CSV data".into()));
    }

    let rows = project_for_export(&snapshot.search(&EmployeeFilter::from(params)));
    let body = write_csv(&rows).map_err(|e| ServerError::Internal(e.to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", export_filename()),
            ),
        ],
        body,
    ))
}

async fn clear_cache(State(state): State<AppState>) -> Json<Value> {
    state.cache.invalidate();
    Json(json!({ "status": "cleared" }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(LOG_BROADCASTER.subscribe()).filter_map(|result| {
        let entry = result.ok()?;
        let json = serde_json::to_string(&entry).ok()?;
        Some(Ok(Event::default().data(json)))
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
