use super::common::{
    created_response, map_service_error, success_response, validate_input, PaginatedResponse,
    PaginationParams,
};
use crate::{
    auth::{AuthenticatedUser, Role},
    entities::purchase_order::PurchaseOrderStatus,
    errors::ApiError,
    handlers::AppState,
    services::purchase_orders::{NewPurchaseOrder, NewPurchaseOrderItem},
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
pub struct CreatePurchaseOrderRequest {
    pub store_id: i64,
    pub supplier_id: i64,
    pub notes: Option<String>,
    #[validate(length(min = 1))]
    pub items: Vec<PurchaseOrderItemRequest>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct PurchaseOrderItemRequest {
    pub product_id: i64,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub buying_price: Decimal,
    pub selling_price: Decimal,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: PurchaseOrderStatus,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<PurchaseOrderStatus>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders",
    request_body = CreatePurchaseOrderRequest,
    responses(
        (status = 201, description = "Purchase order created as draft"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn create_purchase_order(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreatePurchaseOrderRequest>,
) -> Result<Response, ApiError> {
    validate_input(&payload)?;
    user.require_role(Role::Admin).map_err(map_service_error)?;
    user.ensure_store_scope(&*state.db, payload.store_id)
        .await
        .map_err(map_service_error)?;

    let (order, items) = state
        .services
        .purchase_orders
        .create(
            user.user_id,
            NewPurchaseOrder {
                store_id: payload.store_id,
                supplier_id: payload.supplier_id,
                notes: payload.notes,
                items: payload
                    .items
                    .into_iter()
                    .map(|i| NewPurchaseOrderItem {
                        product_id: i.product_id,
                        quantity: i.quantity,
                        buying_price: i.buying_price,
                        selling_price: i.selling_price,
                    })
                    .collect(),
            },
        )
        .await
        .map_err(map_service_error)?;
    Ok(created_response(
        serde_json::json!({ "order": order, "items": items }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders/{id}",
    params(("id" = i64, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Purchase order fetched"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn get_purchase_order(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let (order, items) = state
        .services
        .purchase_orders
        .get(id)
        .await
        .map_err(map_service_error)?;
    user.ensure_store_scope(&*state.db, order.store_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(
        serde_json::json!({ "order": order, "items": items }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders/stores/{store_id}",
    params(
        ("store_id" = i64, Path, description = "Store ID"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        PaginationParams
    ),
    responses((status = 200, description = "Purchase orders listed")),
    tag = "purchase-orders"
)]
pub async fn list_purchase_orders(
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
    let (orders, total) = state
        .services
        .purchase_orders
        .list_for_store(store_id, query.status, page, per_page)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(PaginatedResponse::new(
        orders, page, per_page, total,
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/{id}/status",
    params(("id" = i64, Path, description = "Purchase order ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status changed; receiving opens one unpaid lot per item"),
        (status = 409, description = "Transition not allowed", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn update_purchase_order_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Response, ApiError> {
    user.require_role(Role::Admin).map_err(map_service_error)?;
    let (order, _) = state
        .services
        .purchase_orders
        .get(id)
        .await
        .map_err(map_service_error)?;
    user.ensure_store_scope(&*state.db, order.store_id)
        .await
        .map_err(map_service_error)?;

    let order = state
        .services
        .purchase_orders
        .update_status(user.user_id, id, payload.status)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

pub fn purchase_order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_purchase_order))
        .route("/:id", get(get_purchase_order))
        .route("/:id/status", post(update_purchase_order_status))
        .route("/stores/:store_id", get(list_purchase_orders))
}
