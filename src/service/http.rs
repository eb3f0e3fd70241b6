//! HTTP surface of the standings service
//!
//! Points-table reads, admin edits, a server-sent-events live table, health
//! probes and Prometheus metrics, served with Axum.

use crate::error::RankingError;
use crate::service::app::AppState;
use crate::service::health::{HealthCheck, HealthStatus};
use crate::store::RecordStore;
use crate::types::{CounterUpdate, RankMode, RankOptions, StandingId, TeamSize, TournamentId};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{delete, get, post, put},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, error, info, warn};

/// HTTP server bound to a listener
pub struct HttpServer {
    listener: TcpListener,
    state: Arc<AppState>,
}

impl HttpServer {
    /// Bind the listener
    pub async fn bind(addr: &str, state: Arc<AppState>) -> Result<Self> {
        let addr: SocketAddr = addr.parse().context("Invalid HTTP server address")?;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        Ok(Self { listener, state })
    }

    /// Address actually bound, useful with port 0
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until a shutdown signal arrives
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        let addr = self.local_addr()?;
        let app = create_router(self.state);

        info!("HTTP server listening on http://{}", addr);

        axum::serve(self.listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("HTTP server shutdown signal received");
            })
            .await?;

        info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the router with every endpoint
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/stats", get(stats_handler))
        .route("/metrics", get(metrics_handler))
        .route(
            "/tournaments/{tournament_id}",
            delete(remove_tournament_handler),
        )
        .route(
            "/tournaments/{tournament_id}/standings",
            get(standings_handler),
        )
        .route(
            "/tournaments/{tournament_id}/standings/live",
            get(live_standings_handler),
        )
        .route(
            "/tournaments/{tournament_id}/standings/{standing_id}",
            get(get_team_handler)
                .patch(update_counters_handler)
                .delete(remove_team_handler),
        )
        .route(
            "/tournaments/{tournament_id}/standings/{standing_id}/group",
            put(reassign_group_handler),
        )
        .route("/tournaments/{tournament_id}/teams", post(register_team_handler))
        .route("/tournaments/{tournament_id}/groups", post(assign_groups_handler))
        .route(
            "/tournaments/{tournament_id}/recalculate",
            post(recalculate_handler),
        )
        .route("/tournaments/{tournament_id}/winners", get(winners_handler))
        .with_state(state)
}

/// Error returned by handlers, rendered as `{"error": "..."}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn unprocessable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        let status = match err.downcast_ref::<RankingError>() {
            Some(
                RankingError::InvalidInput { .. }
                | RankingError::AmbiguousGroupCount { .. }
                | RankingError::InvalidTeamSize { .. }
                | RankingError::TournamentMismatch { .. }
                | RankingError::ConfigurationError { .. },
            ) => StatusCode::UNPROCESSABLE_ENTITY,
            Some(RankingError::StandingNotFound { .. }) => StatusCode::NOT_FOUND,
            Some(RankingError::StoreError { .. }) | None => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!("Request failed: {:#}", err);
        } else {
            debug!("Request rejected: {}", err);
        }

        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<RankingError> for ApiError {
    fn from(err: RankingError) -> Self {
        anyhow::Error::from(err).into()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::unprocessable(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::unprocessable(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::unprocessable(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

/// `?mode=&group_count=` overrides of the configured ranking options
#[derive(Debug, Default, Deserialize)]
pub struct TableQuery {
    pub mode: Option<String>,
    pub group_count: Option<u32>,
}

impl TableQuery {
    fn resolve(&self, defaults: RankOptions) -> ApiResult<RankOptions> {
        let mut options = defaults;
        if let Some(mode) = &self.mode {
            options.mode = mode.parse::<RankMode>()?;
        }
        if let Some(group_count) = self.group_count {
            options.group_count = group_count;
        }
        Ok(options)
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterTeamRequest {
    pub team_name: String,
    /// Name or player count; defaults to squad
    #[serde(default)]
    pub team_size: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct ReassignGroupRequest {
    #[serde(default)]
    pub group_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AssignGroupsRequest {
    #[serde(default)]
    pub group_count: Option<u32>,
}

async fn root_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "service": state.config().service.name,
        "version": crate::VERSION,
        "endpoints": [
            "/health",
            "/ready",
            "/stats",
            "/metrics",
            "/tournaments/{id}/standings",
            "/tournaments/{id}/standings/live",
            "/tournaments/{id}/winners"
        ]
    }))
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    debug!("Health check requested");

    let status = match HealthCheck::liveness_check(state.clone()).await {
        Ok(status) => status,
        Err(e) => {
            warn!("Liveness check failed: {}", e);
            HealthStatus::Unhealthy
        }
    };
    let code = if status == HealthStatus::Unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    let standings = state.store().standing_count().ok();

    (
        code,
        Json(json!({
            "status": status,
            "service": state.config().service.name,
            "version": crate::VERSION,
            "standings": standings,
        })),
    )
}

async fn ready_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match HealthCheck::readiness_check(state).await {
        Ok(HealthStatus::Healthy) => (StatusCode::OK, "Ready"),
        Ok(HealthStatus::Degraded) => (StatusCode::OK, "Degraded but ready"),
        Ok(HealthStatus::Unhealthy) => (StatusCode::SERVICE_UNAVAILABLE, "Not ready"),
        Err(e) => {
            error!("Readiness check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "Not ready")
        }
    }
}

async fn stats_handler(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let health = HealthCheck::check(state).await?;
    let code = if health.status == HealthStatus::Unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    Ok((code, Json(health)))
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    let metric_families = state.metrics().registry().gather();
    let encoder = TextEncoder::new();

    match encoder.encode_to_string(&metric_families) {
        Ok(body) => {
            debug!("Serving {} metric families", metric_families.len());
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, encoder.format_type().to_string())],
                body,
            )
                .into_response()
        }
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to encode metrics".to_string(),
            )
                .into_response()
        }
    }
}

async fn standings_handler(
    State(state): State<Arc<AppState>>,
    path: std::result::Result<Path<TournamentId>, PathRejection>,
    query: std::result::Result<Query<TableQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(tournament_id) = path?;
    let Query(query) = query?;
    let service = state.standings();
    let options = query.resolve(service.default_options())?;
    let table = service.current_table(tournament_id, &options)?;
    Ok(Json(table))
}

async fn live_standings_handler(
    State(state): State<Arc<AppState>>,
    path: std::result::Result<Path<TournamentId>, PathRejection>,
    query: std::result::Result<Query<TableQuery>, QueryRejection>,
) -> ApiResult<Sse<impl Stream<Item = std::result::Result<Event, axum::Error>>>> {
    let Path(tournament_id) = path?;
    let Query(query) = query?;
    let service = state.standings();
    let options = query.resolve(service.default_options())?;
    let receiver = service.watch(tournament_id, options)?;

    info!("Live table stream opened for tournament {}", tournament_id);
    let stream = WatchStream::new(receiver)
        .map(|table| Event::default().event("standings").json_data(&table));

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

async fn get_team_handler(
    State(state): State<Arc<AppState>>,
    path: std::result::Result<Path<(TournamentId, StandingId)>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path((tournament_id, standing_id)) = path?;
    let standing = state.standings().find_team(tournament_id, standing_id)?;
    Ok(Json(standing))
}

async fn register_team_handler(
    State(state): State<Arc<AppState>>,
    path: std::result::Result<Path<TournamentId>, PathRejection>,
    payload: std::result::Result<Json<RegisterTeamRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(tournament_id) = path?;
    let Json(request) = payload?;
    let team_size = request
        .team_size
        .map(TeamSize::try_from)
        .transpose()?
        .unwrap_or_default();

    let standing = state
        .standings()
        .register_team(tournament_id, &request.team_name, team_size)?;
    Ok((StatusCode::CREATED, Json(standing)))
}

async fn update_counters_handler(
    State(state): State<Arc<AppState>>,
    path: std::result::Result<Path<(TournamentId, StandingId)>, PathRejection>,
    payload: std::result::Result<Json<CounterUpdate>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path((tournament_id, standing_id)) = path?;
    let Json(update) = payload?;
    let standing = state
        .standings()
        .update_counters(tournament_id, standing_id, update)?;
    Ok(Json(standing))
}

async fn remove_team_handler(
    State(state): State<Arc<AppState>>,
    path: std::result::Result<Path<(TournamentId, StandingId)>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path((tournament_id, standing_id)) = path?;
    state.standings().remove_team(tournament_id, standing_id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn remove_tournament_handler(
    State(state): State<Arc<AppState>>,
    path: std::result::Result<Path<TournamentId>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(tournament_id) = path?;
    let removed = state.standings().remove_tournament(tournament_id)?;
    Ok(Json(json!({ "removed": removed })))
}

async fn reassign_group_handler(
    State(state): State<Arc<AppState>>,
    path: std::result::Result<Path<(TournamentId, StandingId)>, PathRejection>,
    payload: std::result::Result<Json<ReassignGroupRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path((tournament_id, standing_id)) = path?;
    let Json(request) = payload?;
    let standing = state
        .standings()
        .reassign_team(tournament_id, standing_id, request.group_name)?;
    Ok(Json(standing))
}

async fn assign_groups_handler(
    State(state): State<Arc<AppState>>,
    path: std::result::Result<Path<TournamentId>, PathRejection>,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let Path(tournament_id) = path?;
    let service = state.standings();
    // An empty body falls back to the configured group count
    let request: AssignGroupsRequest = if body.is_empty() {
        AssignGroupsRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::unprocessable(e.to_string()))?
    };
    let group_count = request
        .group_count
        .unwrap_or(service.settings().group_count);

    let assignments = service.assign_groups(tournament_id, group_count)?;
    Ok(Json(assignments))
}

async fn recalculate_handler(
    State(state): State<Arc<AppState>>,
    path: std::result::Result<Path<TournamentId>, PathRejection>,
    query: std::result::Result<Query<TableQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(tournament_id) = path?;
    let Query(query) = query?;
    let service = state.standings();
    let options = query.resolve(service.default_options())?;
    let table = service.recalculate(tournament_id, &options)?;
    Ok(Json(table))
}

async fn winners_handler(
    State(state): State<Arc<AppState>>,
    path: std::result::Result<Path<TournamentId>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(tournament_id) = path?;
    let winners = state.standings().announce_winners(tournament_id)?;
    Ok(Json(winners))
}
