use super::common::{
    created_response, map_service_error, success_response, validate_input, PaginatedResponse,
    PaginationParams,
};
use crate::{
    auth::{AuthenticatedUser, Role},
    entities::supply_request::SupplyRequestStatus,
    errors::ApiError,
    handlers::AppState,
    services::supply_requests::NewSupplyRequest,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::Response,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateSupplyRequestRequest {
    pub product_id: i64,
    pub store_id: i64,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct ResolveSupplyRequestRequest {
    pub admin_notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<SupplyRequestStatus>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[utoipa::path(
    post,
    path = "/api/v1/supply-requests",
    request_body = CreateSupplyRequestRequest,
    responses(
        (status = 201, description = "Supply request created; store admins notified"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "supply-requests"
)]
pub async fn create_supply_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateSupplyRequestRequest>,
) -> Result<Response, ApiError> {
    validate_input(&payload)?;
    user.ensure_store_scope(&*state.db, payload.store_id)
        .await
        .map_err(map_service_error)?;

    let row = state
        .services
        .supply_requests
        .create(
            user.user_id,
            NewSupplyRequest {
                product_id: payload.product_id,
                store_id: payload.store_id,
                quantity: payload.quantity,
            },
        )
        .await
        .map_err(map_service_error)?;
    Ok(created_response(row))
}

#[utoipa::path(
    get,
    path = "/api/v1/supply-requests/{id}",
    params(("id" = i64, Path, description = "Supply request ID")),
    responses(
        (status = 200, description = "Supply request fetched"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "supply-requests"
)]
pub async fn get_supply_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let row = state
        .services
        .supply_requests
        .get(id)
        .await
        .map_err(map_service_error)?;
    user.ensure_store_scope(&*state.db, row.store_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(row))
}

#[utoipa::path(
    get,
    path = "/api/v1/supply-requests/stores/{store_id}",
    params(
        ("store_id" = i64, Path, description = "Store ID"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        PaginationParams
    ),
    responses((status = 200, description = "Supply requests listed")),
    tag = "supply-requests"
)]
pub async fn list_supply_requests(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(store_id): Path<i64>,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    user.ensure_store_scope(&*state.db, store_id)
        .await
        .map_err(map_service_error)?;
    let page = query.pagination.page();
    let per_page = query.pagination.per_page();
    let (rows, total) = state
        .services
        .supply_requests
        .list_for_store(store_id, query.status, page, per_page)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(PaginatedResponse::new(
        rows, page, per_page, total,
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/supply-requests/{id}/approve",
    params(("id" = i64, Path, description = "Supply request ID")),
    request_body = ResolveSupplyRequestRequest,
    responses(
        (status = 200, description = "Request approved; requester notified"),
        (status = 409, description = "Request already resolved", body = crate::errors::ErrorResponse)
    ),
    tag = "supply-requests"
)]
pub async fn approve_supply_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    payload: Option<Json<ResolveSupplyRequestRequest>>,
) -> Result<Response, ApiError> {
    user.require_role(Role::Admin).map_err(map_service_error)?;
    let row = state
        .services
        .supply_requests
        .get(id)
        .await
        .map_err(map_service_error)?;
    user.ensure_store_scope(&*state.db, row.store_id)
        .await
        .map_err(map_service_error)?;

    let admin_notes = payload.and_then(|Json(p)| p.admin_notes);
    let row = state
        .services
        .supply_requests
        .resolve(user.user_id, id, SupplyRequestStatus::Approved, admin_notes)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(row))
}

#[utoipa::path(
    post,
    path = "/api/v1/supply-requests/{id}/decline",
    params(("id" = i64, Path, description = "Supply request ID")),
    request_body = ResolveSupplyRequestRequest,
    responses(
        (status = 200, description = "Request declined; requester notified"),
        (status = 409, description = "Request already resolved", body = crate::errors::ErrorResponse)
    ),
    tag = "supply-requests"
)]
pub async fn decline_supply_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    payload: Option<Json<ResolveSupplyRequestRequest>>,
) -> Result<Response, ApiError> {
    user.require_role(Role::Admin).map_err(map_service_error)?;
    let row = state
        .services
        .supply_requests
        .get(id)
        .await
        .map_err(map_service_error)?;
    user.ensure_store_scope(&*state.db, row.store_id)
        .await
        .map_err(map_service_error)?;

    let admin_notes = payload.and_then(|Json(p)| p.admin_notes);
    let row = state
        .services
        .supply_requests
        .resolve(user.user_id, id, SupplyRequestStatus::Declined, admin_notes)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(row))
}

pub fn supply_request_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_supply_request))
        .route("/:id", get(get_supply_request))
        .route("/:id/approve", post(approve_supply_request))
        .route("/:id/decline", post(decline_supply_request))
        .route("/stores/:store_id", get(list_supply_requests))
}
