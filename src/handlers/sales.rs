use super::common::{
    created_response, map_service_error, success_response, validate_input, PaginatedResponse,
    PaginationParams,
};
use crate::{
    auth::{AuthenticatedUser, Role},
    errors::ApiError,
    handlers::AppState,
    services::sales::NewSale,
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
pub struct RecordSaleRequest {
    pub product_id: i64,
    pub store_id: i64,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[utoipa::path(
    post,
    path = "/api/v1/sales",
    request_body = RecordSaleRequest,
    responses(
        (status = 201, description = "Sale recorded and stock drained"),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse)
    ),
    tag = "sales"
)]
pub async fn record_sale(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<RecordSaleRequest>,
) -> Result<Response, ApiError> {
    validate_input(&payload)?;
    user.require_role(Role::Admin).map_err(map_service_error)?;
    user.ensure_store_scope(&*state.db, payload.store_id)
        .await
        .map_err(map_service_error)?;

    let sale = state
        .services
        .sales
        .record(
            user.user_id,
            NewSale {
                product_id: payload.product_id,
                store_id: payload.store_id,
                quantity: payload.quantity,
                unit_price: payload.unit_price,
            },
        )
        .await
        .map_err(map_service_error)?;
    Ok(created_response(sale))
}

#[utoipa::path(
    get,
    path = "/api/v1/sales/{id}",
    params(("id" = i64, Path, description = "Sale ID")),
    responses(
        (status = 200, description = "Sale fetched"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "sales"
)]
pub async fn get_sale(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let sale = state
        .services
        .sales
        .get(id)
        .await
        .map_err(map_service_error)?;
    user.ensure_store_scope(&*state.db, sale.store_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(sale))
}

#[utoipa::path(
    get,
    path = "/api/v1/sales/stores/{store_id}",
    params(
        ("store_id" = i64, Path, description = "Store ID"),
        PaginationParams
    ),
    responses((status = 200, description = "Sales listed, newest first")),
    tag = "sales"
)]
pub async fn list_sales(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(store_id): Path<i64>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Response, ApiError> {
    user.ensure_store_scope(&*state.db, store_id)
        .await
        .map_err(map_service_error)?;
    let page = pagination.page();
    let per_page = pagination.per_page();
    let (rows, total) = state
        .services
        .sales
        .list_for_store(store_id, page, per_page)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(PaginatedResponse::new(
        rows, page, per_page, total,
    )))
}

pub fn sale_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(record_sale))
        .route("/:id", get(get_sale))
        .route("/stores/:store_id", get(list_sales))
}
