use super::common::{
    created_response, map_service_error, success_response, validate_input, PaginatedResponse,
    PaginationParams,
};
use crate::{
    auth::{AuthenticatedUser, Role},
    entities::return_request::{ReturnStatus, ReturnType},
    errors::ApiError,
    handlers::AppState,
    services::returns::NewReturn,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::Response,
    routing::{get, post},
    Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateReturnRequest {
    pub store_id: i64,
    pub product_id: i64,
    pub return_type: ReturnType,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub unit_price: Decimal,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateReturnStatusRequest {
    pub status: ReturnStatus,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<ReturnStatus>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[utoipa::path(
    post,
    path = "/api/v1/returns",
    request_body = CreateReturnRequest,
    responses(
        (status = 201, description = "Return request created as pending"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "returns"
)]
pub async fn create_return(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateReturnRequest>,
) -> Result<Response, ApiError> {
    validate_input(&payload)?;
    user.require_role(Role::Admin).map_err(map_service_error)?;
    user.ensure_store_scope(&*state.db, payload.store_id)
        .await
        .map_err(map_service_error)?;

    let row = state
        .services
        .returns
        .create(
            user.user_id,
            NewReturn {
                store_id: payload.store_id,
                product_id: payload.product_id,
                return_type: payload.return_type,
                quantity: payload.quantity,
                unit_price: payload.unit_price,
                reason: payload.reason,
            },
        )
        .await
        .map_err(map_service_error)?;
    Ok(created_response(row))
}

#[utoipa::path(
    get,
    path = "/api/v1/returns/{id}",
    params(("id" = i64, Path, description = "Return ID")),
    responses(
        (status = 200, description = "Return fetched"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "returns"
)]
pub async fn get_return(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let row = state
        .services
        .returns
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
    path = "/api/v1/returns/stores/{store_id}",
    params(
        ("store_id" = i64, Path, description = "Store ID"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        PaginationParams
    ),
    responses((status = 200, description = "Returns listed")),
    tag = "returns"
)]
pub async fn list_returns(
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
        .returns
        .list_for_store(store_id, query.status, page, per_page)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(PaginatedResponse::new(
        rows, page, per_page, total,
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/returns/{id}/status",
    params(("id" = i64, Path, description = "Return ID")),
    request_body = UpdateReturnStatusRequest,
    responses(
        (status = 200, description = "Status changed; completion moves the stock"),
        (status = 409, description = "Transition not allowed", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock for a supplier return", body = crate::errors::ErrorResponse)
    ),
    tag = "returns"
)]
pub async fn update_return_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateReturnStatusRequest>,
) -> Result<Response, ApiError> {
    user.require_role(Role::Admin).map_err(map_service_error)?;
    let row = state
        .services
        .returns
        .get(id)
        .await
        .map_err(map_service_error)?;
    user.ensure_store_scope(&*state.db, row.store_id)
        .await
        .map_err(map_service_error)?;

    let row = state
        .services
        .returns
        .update_status(user.user_id, id, payload.status)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(row))
}

pub fn return_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_return))
        .route("/:id", get(get_return))
        .route("/:id/status", post(update_return_status))
        .route("/stores/:store_id", get(list_returns))
}
