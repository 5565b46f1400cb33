//! HTTP request handlers
//!
//! Thin adapters from HTTP to the engine's query and command surface.

use crate::api::server::AppContext;
use crate::error::Error;
use crate::playback::{ChannelOverview, CurrentProgram, PlayoutCommand, SessionSnapshot};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, NaiveDateTime};
use onair_common::{ChannelStatus, PlaybackLogEntry, ScheduleItem};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

const DEFAULT_LOG_LIMIT: usize = 50;
const MAX_LOG_LIMIT: usize = 1000;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct BuildInfoResponse {
    version: String,
    git_hash: String,
    build_timestamp: String,
    build_profile: String,
}

#[derive(Debug, Deserialize)]
pub struct AtQuery {
    at: Option<NaiveDateTime>,
}

#[derive(Debug, Deserialize)]
pub struct UpcomingQuery {
    at: Option<NaiveDateTime>,
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct InvalidateQuery {
    date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusBody {
    pub status: ChannelStatus,
}

#[derive(Debug, Serialize)]
pub struct StatusChangeResponse {
    status: ChannelStatus,
    changed: bool,
}

#[derive(Debug, Serialize)]
pub struct InvalidateResponse {
    channel_id: Uuid,
    date: Option<NaiveDate>,
    was_cached: bool,
}

#[derive(Debug, Serialize)]
pub struct ViewersResponse {
    channel_id: Uuid,
    viewers: u32,
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn api_error(e: Error) -> ApiError {
    let status = match &e {
        Error::ChannelNotFound(_) | Error::ItemNotFound(_) => StatusCode::NOT_FOUND,
        Error::BadRequest(_) => StatusCode::BAD_REQUEST,
        Error::Common(onair_common::Error::InvalidInput(_)) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!("Request failed: {}", e);
    } else {
        warn!("Request rejected: {}", e);
    }

    (
        status,
        Json(ErrorResponse {
            status: "error".to_string(),
            message: e.to_string(),
        }),
    )
}

// ============================================================================
// Health Endpoints
// ============================================================================

/// GET /health - Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "onair-playout".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /build_info - Build identification captured by build.rs
pub async fn build_info() -> Json<BuildInfoResponse> {
    Json(BuildInfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: env!("GIT_HASH").to_string(),
        build_timestamp: env!("BUILD_TIMESTAMP").to_string(),
        build_profile: env!("BUILD_PROFILE").to_string(),
    })
}

// ============================================================================
// Schedule Queries
// ============================================================================

/// GET /channels - Known channels with live status
pub async fn list_channels(State(ctx): State<AppContext>) -> ApiResult<Vec<ChannelOverview>> {
    ctx.engine.list_channels().await.map(Json).map_err(api_error)
}

/// GET /channels/:channel_id/current?at=
pub async fn get_current_program(
    State(ctx): State<AppContext>,
    Path(channel_id): Path<Uuid>,
    Query(query): Query<AtQuery>,
) -> ApiResult<CurrentProgram> {
    ctx.engine
        .get_current_program(channel_id, query.at)
        .await
        .map(Json)
        .map_err(api_error)
}

/// GET /channels/:channel_id/upcoming?at=&limit=
pub async fn get_upcoming(
    State(ctx): State<AppContext>,
    Path(channel_id): Path<Uuid>,
    Query(query): Query<UpcomingQuery>,
) -> ApiResult<Vec<ScheduleItem>> {
    ctx.engine
        .get_upcoming(channel_id, query.at, query.limit)
        .await
        .map(Json)
        .map_err(api_error)
}

// ============================================================================
// Session
// ============================================================================

/// GET /channels/:channel_id/session - Session snapshot
pub async fn get_session(
    State(ctx): State<AppContext>,
    Path(channel_id): Path<Uuid>,
) -> ApiResult<SessionSnapshot> {
    ctx.engine
        .get_session_state(channel_id)
        .await
        .map(Json)
        .map_err(api_error)
}

/// POST /channels/:channel_id/command - Apply a session command
///
/// The body is decoded here rather than by the `Json` extractor so that an
/// unknown command is a 400 like any other bad request.
pub async fn post_command(
    State(ctx): State<AppContext>,
    Path(channel_id): Path<Uuid>,
    Json(body): Json<serde_json::Value>,
) -> ApiResult<SessionSnapshot> {
    let command: PlayoutCommand = serde_json::from_value(body)
        .map_err(|e| api_error(Error::BadRequest(format!("Invalid command: {}", e))))?;

    let snapshot = ctx
        .engine
        .command(channel_id, command)
        .await
        .map_err(api_error)?;
    info!("[{}] {:?} -> {}", channel_id, command, snapshot.status);
    Ok(Json(snapshot))
}

// ============================================================================
// Channel Status
// ============================================================================

/// GET /channels/:channel_id/status
pub async fn get_status(
    State(ctx): State<AppContext>,
    Path(channel_id): Path<Uuid>,
) -> ApiResult<StatusBody> {
    ctx.engine
        .get_channel_status(channel_id)
        .await
        .map(|status| Json(StatusBody { status }))
        .map_err(api_error)
}

/// PUT /channels/:channel_id/status - Manual status override
pub async fn put_status(
    State(ctx): State<AppContext>,
    Path(channel_id): Path<Uuid>,
    Json(body): Json<StatusBody>,
) -> ApiResult<StatusChangeResponse> {
    let changed = ctx
        .engine
        .set_channel_status(channel_id, body.status)
        .await
        .map_err(api_error)?;
    Ok(Json(StatusChangeResponse {
        status: body.status,
        changed,
    }))
}

// ============================================================================
// Maintenance
// ============================================================================

/// POST /channels/:channel_id/playlist/invalidate?date=
pub async fn invalidate_playlist(
    State(ctx): State<AppContext>,
    Path(channel_id): Path<Uuid>,
    Query(query): Query<InvalidateQuery>,
) -> ApiResult<InvalidateResponse> {
    let was_cached = ctx
        .engine
        .invalidate_playlist(channel_id, query.date)
        .await
        .map_err(api_error)?;
    Ok(Json(InvalidateResponse {
        channel_id,
        date: query.date,
        was_cached,
    }))
}

/// POST /channels/:channel_id/reload - Re-read descriptor and day plan
pub async fn reload_channel(
    State(ctx): State<AppContext>,
    Path(channel_id): Path<Uuid>,
) -> ApiResult<SessionSnapshot> {
    ctx.engine
        .reload_channel(channel_id)
        .await
        .map(Json)
        .map_err(api_error)
}

/// GET /channels/:channel_id/log?limit= - Recent playback history
pub async fn get_playback_log(
    State(ctx): State<AppContext>,
    Path(channel_id): Path<Uuid>,
    Query(query): Query<LogQuery>,
) -> ApiResult<Vec<PlaybackLogEntry>> {
    let limit = query.limit.unwrap_or(DEFAULT_LOG_LIMIT).min(MAX_LOG_LIMIT);
    ctx.engine
        .get_playback_history(channel_id, limit)
        .await
        .map(Json)
        .map_err(api_error)
}

/// GET /channels/:channel_id/viewers - Decorative audience figure
pub async fn get_viewers(
    State(ctx): State<AppContext>,
    Path(channel_id): Path<Uuid>,
) -> ApiResult<ViewersResponse> {
    let status = ctx
        .engine
        .get_channel_status(channel_id)
        .await
        .map_err(api_error)?;
    let viewers = ctx
        .viewers
        .sample(channel_id, status == ChannelStatus::OnAir);
    Ok(Json(ViewersResponse { channel_id, viewers }))
}
