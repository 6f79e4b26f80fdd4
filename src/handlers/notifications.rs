use super::common::{map_service_error, success_response};
use crate::{auth::AuthenticatedUser, errors::ApiError, handlers::AppState};
use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize)]
pub struct ListNotificationsQuery {
    #[serde(default)]
    pub unread_only: bool,
    #[serde(default)]
    pub skip: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_limit() -> u64 {
    50
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UnreadCountResponse {
    pub unread: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MarkAllReadResponse {
    pub marked: u64,
}

#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    params(
        ("unread_only" = Option<bool>, Query, description = "Only unread notifications"),
        ("skip" = Option<u64>, Query, description = "Offset"),
        ("limit" = Option<u64>, Query, description = "Max rows returned")
    ),
    responses((status = 200, description = "Caller's notifications, newest first")),
    tag = "notifications"
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<Response, ApiError> {
    let rows = state
        .services
        .notifications
        .list_for_user(user.user_id, query.unread_only, query.skip, query.limit)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(rows))
}

#[utoipa::path(
    get,
    path = "/api/v1/notifications/unread-count",
    responses((status = 200, description = "Unread count", body = UnreadCountResponse)),
    tag = "notifications"
)]
pub async fn unread_count(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Response, ApiError> {
    let unread = state
        .services
        .notifications
        .unread_count(user.user_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(UnreadCountResponse { unread }))
}

#[utoipa::path(
    post,
    path = "/api/v1/notifications/{id}/read",
    params(("id" = i64, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Notification marked read"),
        (status = 403, description = "Notification belongs to another user", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "notifications"
)]
pub async fn mark_read(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let row = state
        .services
        .notifications
        .mark_read(user.user_id, id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(row))
}

#[utoipa::path(
    post,
    path = "/api/v1/notifications/read-all",
    responses((status = 200, description = "All notifications marked read", body = MarkAllReadResponse)),
    tag = "notifications"
)]
pub async fn mark_all_read(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Response, ApiError> {
    let marked = state
        .services
        .notifications
        .mark_all_read(user.user_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(MarkAllReadResponse { marked }))
}

pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/unread-count", get(unread_count))
        .route("/:id/read", post(mark_read))
        .route("/read-all", post(mark_all_read))
}
