use super::common::{
    created_response, map_service_error, success_response, validate_input, PaginatedResponse,
    PaginationParams,
};
use crate::{
    auth::{AuthenticatedUser, Role},
    entities::stock_transfer::TransferStatus,
    errors::ApiError,
    handlers::AppState,
    services::stock_transfers::NewTransfer,
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
pub struct CreateTransferRequest {
    pub product_id: i64,
    pub from_store_id: i64,
    pub to_store_id: i64,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub buying_price: Decimal,
    pub selling_price: Decimal,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateTransferStatusRequest {
    pub status: TransferStatus,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<TransferStatus>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[utoipa::path(
    post,
    path = "/api/v1/stock-transfers",
    request_body = CreateTransferRequest,
    responses(
        (status = 201, description = "Transfer created as pending"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "stock-transfers"
)]
pub async fn create_transfer(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateTransferRequest>,
) -> Result<Response, ApiError> {
    validate_input(&payload)?;
    user.require_role(Role::Admin).map_err(map_service_error)?;
    // The sending store initiates the transfer.
    user.ensure_store_scope(&*state.db, payload.from_store_id)
        .await
        .map_err(map_service_error)?;

    let row = state
        .services
        .stock_transfers
        .create(
            user.user_id,
            NewTransfer {
                product_id: payload.product_id,
                from_store_id: payload.from_store_id,
                to_store_id: payload.to_store_id,
                quantity: payload.quantity,
                buying_price: payload.buying_price,
                selling_price: payload.selling_price,
            },
        )
        .await
        .map_err(map_service_error)?;
    Ok(created_response(row))
}

#[utoipa::path(
    get,
    path = "/api/v1/stock-transfers/{id}",
    params(("id" = i64, Path, description = "Transfer ID")),
    responses(
        (status = 200, description = "Transfer fetched"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "stock-transfers"
)]
pub async fn get_transfer(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let row = state
        .services
        .stock_transfers
        .get(id)
        .await
        .map_err(map_service_error)?;
    // Either end of the transfer may look at it.
    let from_scope = user.ensure_store_scope(&*state.db, row.from_store_id).await;
    if from_scope.is_err() {
        user.ensure_store_scope(&*state.db, row.to_store_id)
            .await
            .map_err(map_service_error)?;
    }
    Ok(success_response(row))
}

#[utoipa::path(
    get,
    path = "/api/v1/stock-transfers/stores/{store_id}",
    params(
        ("store_id" = i64, Path, description = "Store ID"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        PaginationParams
    ),
    responses((status = 200, description = "Transfers touching the store, either direction")),
    tag = "stock-transfers"
)]
pub async fn list_transfers(
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
        .stock_transfers
        .list_for_store(store_id, query.status, page, per_page)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(PaginatedResponse::new(
        rows, page, per_page, total,
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/stock-transfers/{id}/status",
    params(("id" = i64, Path, description = "Transfer ID")),
    request_body = UpdateTransferStatusRequest,
    responses(
        (status = 200, description = "Status changed; completion moves stock between stores"),
        (status = 409, description = "Transition not allowed", body = crate::errors::ErrorResponse),
        (status = 422, description = "Source store has insufficient stock", body = crate::errors::ErrorResponse)
    ),
    tag = "stock-transfers"
)]
pub async fn update_transfer_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateTransferStatusRequest>,
) -> Result<Response, ApiError> {
    user.require_role(Role::Admin).map_err(map_service_error)?;
    let row = state
        .services
        .stock_transfers
        .get(id)
        .await
        .map_err(map_service_error)?;
    user.ensure_store_scope(&*state.db, row.from_store_id)
        .await
        .map_err(map_service_error)?;

    let row = state
        .services
        .stock_transfers
        .update_status(user.user_id, id, payload.status)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(row))
}

pub fn stock_transfer_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_transfer))
        .route("/:id", get(get_transfer))
        .route("/:id/status", post(update_transfer_status))
        .route("/stores/:store_id", get(list_transfers))
}
