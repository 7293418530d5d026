use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{post, put},
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{ServerConfig, SolveOptions};
use crate::data::{SectionSnapshot, SolveResult};
use crate::error::{RepositoryError, SolveError};
use crate::repository::{InMemorySectionRepository, SectionRepository};
use crate::solver;

/// Header carrying the signed-in user, resolved by the auth layer in front.
pub const USER_HEADER: &str = "x-user-id";

#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn SectionRepository>,
    pub defaults: SolveOptions,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveRequest {
    pub section: SectionSnapshot,
    #[serde(default)]
    pub options: Option<SolveOptions>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SolveQuery {
    #[serde(default)]
    pub apply: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub details: Vec<String>,
}

#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    NotFound(String),
    BadRequest(String),
    Solve(SolveError),
    Repository(RepositoryError),
}

impl From<SolveError> for ApiError {
    fn from(e: SolveError) -> Self {
        ApiError::Solve(e)
    }
}

impl From<RepositoryError> for ApiError {
    fn from(e: RepositoryError) -> Self {
        ApiError::Repository(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, details) = match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                format!("missing {USER_HEADER} header"),
                vec![],
            ),
            ApiError::NotFound(section_id) => (
                StatusCode::NOT_FOUND,
                format!("section {section_id} not found"),
                vec![],
            ),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message, vec![]),
            ApiError::Solve(SolveError::Validation(errors)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "invalid section input".to_string(),
                errors.iter().map(ToString::to_string).collect(),
            ),
            ApiError::Solve(e @ SolveError::InternalConsistency(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string(), vec![])
            }
            ApiError::Repository(e @ RepositoryError::NotFound { .. }) => {
                (StatusCode::NOT_FOUND, e.to_string(), vec![])
            }
            ApiError::Repository(e @ RepositoryError::UnknownClass { .. }) => {
                (StatusCode::CONFLICT, e.to_string(), vec![])
            }
            ApiError::Repository(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string(), vec![]),
        };
        if status.is_server_error() {
            warn!("request failed with {status}: {error}");
        }
        (status, Json(ErrorBody { error, details })).into_response()
    }
}

fn current_user(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(ApiError::Unauthorized)
}

async fn solve_handler(
    State(state): State<AppState>,
    Json(request): Json<SolveRequest>,
) -> Result<Json<SolveResult>, ApiError> {
    let options = request.options.unwrap_or_else(|| state.defaults.clone());
    let result = solver::solve_section(&request.section, &options)?;
    Ok(Json(result))
}

async fn store_section_handler(
    State(state): State<AppState>,
    Path(section_id): Path<String>,
    headers: HeaderMap,
    Json(section): Json<SectionSnapshot>,
) -> Result<StatusCode, ApiError> {
    let user = current_user(&headers)?;
    if section.id != section_id {
        return Err(ApiError::BadRequest(format!(
            "section id {} does not match path {}",
            section.id, section_id
        )));
    }
    if section.owner_id != user {
        return Err(ApiError::BadRequest(format!(
            "section owner {} does not match caller {}",
            section.owner_id, user
        )));
    }
    state.repository.store_section(section)?;
    info!("stored section {section_id} for {user}");
    Ok(StatusCode::NO_CONTENT)
}

async fn solve_stored_handler(
    State(state): State<AppState>,
    Path(section_id): Path<String>,
    Query(query): Query<SolveQuery>,
    headers: HeaderMap,
) -> Result<Json<SolveResult>, ApiError> {
    let user = current_user(&headers)?;
    let section = state
        .repository
        .load_section(&user, &section_id)?
        .ok_or_else(|| ApiError::NotFound(section_id.clone()))?;

    let result = solver::solve_section(&section, &state.defaults)?;
    if query.apply {
        state.repository.apply_assignments(&user, &result)?;
        info!("applied assignments of section {section_id}");
    }
    Ok(Json(result))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/schedule/solve", post(solve_handler))
        .route("/v1/sections/:section_id", put(store_section_handler))
        .route("/v1/sections/:section_id/solve", post(solve_stored_handler))
        .with_state(state)
}

pub async fn run_server(config: ServerConfig) -> std::io::Result<()> {
    let state = AppState {
        repository: Arc::new(InMemorySectionRepository::new()),
        defaults: config.solve,
    };
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("Server running at http://{}", listener.local_addr()?);

    axum::serve(listener, app).await
}
