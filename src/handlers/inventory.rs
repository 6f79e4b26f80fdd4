use super::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
    PaginatedResponse, PaginationParams,
};
use crate::{
    auth::{AuthenticatedUser, Role},
    entities::inventory_lot::PaymentStatus,
    errors::{ApiError, ServiceError},
    handlers::AppState,
    services::inventory::{RecordInventory, UpdateInventory},
};
use axum::{
    extract::{Json, Path, Query, State},
    response::Response,
    routing::{delete, get, post, put},
    Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct RecordInventoryRequest {
    pub product_id: i64,
    pub store_id: i64,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub buying_price: Decimal,
    pub selling_price: Decimal,
    pub payment_status: PaymentStatus,
    pub remarks: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateInventoryRequest {
    #[validate(range(min = 0))]
    pub quantity_spoilt: Option<i32>,
    pub buying_price: Option<Decimal>,
    pub selling_price: Option<Decimal>,
    pub payment_status: Option<PaymentStatus>,
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListInventoryQuery {
    pub payment_status: Option<PaymentStatus>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Deserialize)]
pub struct TimelineQuery {
    pub product_id: Option<i64>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OnHandResponse {
    pub product_id: i64,
    pub store_id: i64,
    pub quantity: i32,
}

#[utoipa::path(
    post,
    path = "/api/v1/inventory",
    request_body = RecordInventoryRequest,
    responses(
        (status = 201, description = "Inventory lot recorded"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 403, description = "Store outside caller's scope", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn record_inventory(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<RecordInventoryRequest>,
) -> Result<Response, ApiError> {
    validate_input(&payload)?;
    user.ensure_store_scope(&*state.db, payload.store_id)
        .await
        .map_err(map_service_error)?;

    let lot = state
        .services
        .inventory
        .record(
            user.user_id,
            RecordInventory {
                product_id: payload.product_id,
                store_id: payload.store_id,
                quantity: payload.quantity,
                buying_price: payload.buying_price,
                selling_price: payload.selling_price,
                payment_status: payload.payment_status,
                remarks: payload.remarks,
            },
        )
        .await
        .map_err(map_service_error)?;
    Ok(created_response(lot))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/{id}",
    params(("id" = i64, Path, description = "Inventory lot ID")),
    responses(
        (status = 200, description = "Inventory lot fetched"),
        (status = 404, description = "Lot not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn get_inventory_lot(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let lot = state
        .services
        .inventory
        .get(id)
        .await
        .map_err(map_service_error)?;
    user.ensure_store_scope(&*state.db, lot.store_id)
        .await
        .map_err(map_service_error)?;
    if user.role == Role::Clerk && lot.created_by != user.user_id {
        return Err(map_service_error(ServiceError::Forbidden(
            "Clerks may only view their own inventory records".to_string(),
        )));
    }
    Ok(success_response(lot))
}

#[utoipa::path(
    put,
    path = "/api/v1/inventory/{id}",
    params(("id" = i64, Path, description = "Inventory lot ID")),
    request_body = UpdateInventoryRequest,
    responses(
        (status = 200, description = "Inventory lot updated"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Lot not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn update_inventory_lot(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateInventoryRequest>,
) -> Result<Response, ApiError> {
    validate_input(&payload)?;
    user.require_role(Role::Admin).map_err(map_service_error)?;
    let lot = state
        .services
        .inventory
        .get(id)
        .await
        .map_err(map_service_error)?;
    user.ensure_store_scope(&*state.db, lot.store_id)
        .await
        .map_err(map_service_error)?;

    let updated = state
        .services
        .inventory
        .update(
            user.user_id,
            id,
            UpdateInventory {
                quantity_spoilt: payload.quantity_spoilt,
                buying_price: payload.buying_price,
                selling_price: payload.selling_price,
                payment_status: payload.payment_status,
                remarks: payload.remarks,
            },
        )
        .await
        .map_err(map_service_error)?;
    Ok(success_response(updated))
}

#[utoipa::path(
    delete,
    path = "/api/v1/inventory/{id}",
    params(("id" = i64, Path, description = "Inventory lot ID")),
    responses(
        (status = 204, description = "Inventory lot deleted"),
        (status = 404, description = "Lot not found", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn delete_inventory_lot(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    user.require_role(Role::Admin).map_err(map_service_error)?;
    let lot = state
        .services
        .inventory
        .get(id)
        .await
        .map_err(map_service_error)?;
    user.ensure_store_scope(&*state.db, lot.store_id)
        .await
        .map_err(map_service_error)?;

    state
        .services
        .inventory
        .delete(user.user_id, id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/stores/{store_id}",
    params(
        ("store_id" = i64, Path, description = "Store ID"),
        ("payment_status" = Option<String>, Query, description = "Filter by payment status"),
        PaginationParams
    ),
    responses(
        (status = 200, description = "Store inventory listed"),
        (status = 403, description = "Store outside caller's scope", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn list_store_inventory(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(store_id): Path<i64>,
    Query(query): Query<ListInventoryQuery>,
) -> Result<Response, ApiError> {
    user.ensure_store_scope(&*state.db, store_id)
        .await
        .map_err(map_service_error)?;
    let page = query.pagination.page();
    let per_page = query.pagination.per_page();
    // Clerks see only the lots they recorded.
    let created_by = (user.role == Role::Clerk).then_some(user.user_id);
    let (lots, total) = state
        .services
        .inventory
        .list_for_store(store_id, query.payment_status, created_by, page, per_page)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(PaginatedResponse::new(
        lots, page, per_page, total,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/stores/{store_id}/timeline",
    params(
        ("store_id" = i64, Path, description = "Store ID"),
        ("product_id" = Option<i64>, Query, description = "Narrow to one product"),
        PaginationParams
    ),
    responses(
        (status = 200, description = "Stock timeline listed, newest first"),
        (status = 403, description = "Store outside caller's scope", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn store_timeline(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(store_id): Path<i64>,
    Query(query): Query<TimelineQuery>,
) -> Result<Response, ApiError> {
    user.ensure_store_scope(&*state.db, store_id)
        .await
        .map_err(map_service_error)?;
    let page = query.pagination.page();
    let per_page = query.pagination.per_page();
    let recorded_by = (user.role == Role::Clerk).then_some(user.user_id);
    let (events, total) = state
        .services
        .timeline
        .history_for_store(store_id, query.product_id, recorded_by, page, per_page)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(PaginatedResponse::new(
        events, page, per_page, total,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/stores/{store_id}/on-hand/{product_id}",
    params(
        ("store_id" = i64, Path, description = "Store ID"),
        ("product_id" = i64, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "On-hand total", body = OnHandResponse),
        (status = 403, description = "Store outside caller's scope", body = crate::errors::ErrorResponse)
    ),
    tag = "inventory"
)]
pub async fn on_hand(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((store_id, product_id)): Path<(i64, i64)>,
) -> Result<Response, ApiError> {
    user.ensure_store_scope(&*state.db, store_id)
        .await
        .map_err(map_service_error)?;
    let quantity = state
        .services
        .inventory
        .on_hand(product_id, store_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(OnHandResponse {
        product_id,
        store_id,
        quantity,
    }))
}

pub fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(record_inventory))
        .route("/:id", get(get_inventory_lot))
        .route("/:id", put(update_inventory_lot))
        .route("/:id", delete(delete_inventory_lot))
        .route("/stores/:store_id", get(list_store_inventory))
        .route("/stores/:store_id/timeline", get(store_timeline))
        .route("/stores/:store_id/on-hand/:product_id", get(on_hand))
}
