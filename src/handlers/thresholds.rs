use super::common::{map_service_error, no_content_response, success_response, validate_input};
use crate::{
    auth::{AuthenticatedUser, Role},
    errors::ApiError,
    handlers::AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::Response,
    routing::{delete, get, put},
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpsertThresholdRequest {
    #[validate(range(min = 0))]
    pub minimum_quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ResolvedThresholdResponse {
    pub product_id: i64,
    pub store_id: i64,
    pub minimum_quantity: i32,
}

#[utoipa::path(
    put,
    path = "/api/v1/thresholds/stores/{store_id}/products/{product_id}",
    params(
        ("store_id" = i64, Path, description = "Store ID"),
        ("product_id" = i64, Path, description = "Product ID")
    ),
    request_body = UpsertThresholdRequest,
    responses(
        (status = 200, description = "Store override created or replaced"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "thresholds"
)]
pub async fn upsert_threshold(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((store_id, product_id)): Path<(i64, i64)>,
    Json(payload): Json<UpsertThresholdRequest>,
) -> Result<Response, ApiError> {
    validate_input(&payload)?;
    user.require_role(Role::Admin).map_err(map_service_error)?;
    user.ensure_store_scope(&*state.db, store_id)
        .await
        .map_err(map_service_error)?;

    let row = state
        .services
        .thresholds
        .upsert(product_id, Some(store_id), payload.minimum_quantity)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(row))
}

#[utoipa::path(
    put,
    path = "/api/v1/thresholds/products/{product_id}",
    params(("product_id" = i64, Path, description = "Product ID")),
    request_body = UpsertThresholdRequest,
    responses(
        (status = 200, description = "Product-wide default created or replaced"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "thresholds"
)]
pub async fn upsert_product_threshold(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(product_id): Path<i64>,
    Json(payload): Json<UpsertThresholdRequest>,
) -> Result<Response, ApiError> {
    validate_input(&payload)?;
    // Defaults apply across stores, so only the merchant owner sets them.
    user.require_role(Role::Superuser)
        .map_err(map_service_error)?;

    let row = state
        .services
        .thresholds
        .upsert(product_id, None, payload.minimum_quantity)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(row))
}

#[utoipa::path(
    delete,
    path = "/api/v1/thresholds/products/{product_id}",
    params(("product_id" = i64, Path, description = "Product ID")),
    responses(
        (status = 204, description = "Product-wide default removed"),
        (status = 404, description = "No default for this product", body = crate::errors::ErrorResponse)
    ),
    tag = "thresholds"
)]
pub async fn delete_product_threshold(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(product_id): Path<i64>,
) -> Result<Response, ApiError> {
    user.require_role(Role::Superuser)
        .map_err(map_service_error)?;
    state
        .services
        .thresholds
        .delete(product_id, None)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

#[utoipa::path(
    get,
    path = "/api/v1/thresholds/stores/{store_id}",
    params(("store_id" = i64, Path, description = "Store ID")),
    responses((status = 200, description = "Store's threshold overrides")),
    tag = "thresholds"
)]
pub async fn list_thresholds(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(store_id): Path<i64>,
) -> Result<Response, ApiError> {
    user.ensure_store_scope(&*state.db, store_id)
        .await
        .map_err(map_service_error)?;
    let rows = state
        .services
        .thresholds
        .list_for_store(store_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(rows))
}

#[utoipa::path(
    get,
    path = "/api/v1/thresholds/stores/{store_id}/products/{product_id}",
    params(
        ("store_id" = i64, Path, description = "Store ID"),
        ("product_id" = i64, Path, description = "Product ID")
    ),
    responses((status = 200, description = "Effective threshold after fallback", body = ResolvedThresholdResponse)),
    tag = "thresholds"
)]
pub async fn resolve_threshold(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((store_id, product_id)): Path<(i64, i64)>,
) -> Result<Response, ApiError> {
    user.ensure_store_scope(&*state.db, store_id)
        .await
        .map_err(map_service_error)?;
    let minimum_quantity = state
        .services
        .thresholds
        .resolve(product_id, store_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(ResolvedThresholdResponse {
        product_id,
        store_id,
        minimum_quantity,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/v1/thresholds/stores/{store_id}/products/{product_id}",
    params(
        ("store_id" = i64, Path, description = "Store ID"),
        ("product_id" = i64, Path, description = "Product ID")
    ),
    responses(
        (status = 204, description = "Override removed; fallback applies again"),
        (status = 404, description = "No override for this pair", body = crate::errors::ErrorResponse)
    ),
    tag = "thresholds"
)]
pub async fn delete_threshold(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((store_id, product_id)): Path<(i64, i64)>,
) -> Result<Response, ApiError> {
    user.require_role(Role::Admin).map_err(map_service_error)?;
    user.ensure_store_scope(&*state.db, store_id)
        .await
        .map_err(map_service_error)?;
    state
        .services
        .thresholds
        .delete(product_id, Some(store_id))
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

pub fn threshold_routes() -> Router<AppState> {
    Router::new()
        .route("/stores/:store_id", get(list_thresholds))
        .route(
            "/products/:product_id",
            put(upsert_product_threshold).delete(delete_product_threshold),
        )
        .route(
            "/stores/:store_id/products/:product_id",
            put(upsert_threshold),
        )
        .route(
            "/stores/:store_id/products/:product_id",
            get(resolve_threshold),
        )
        .route(
            "/stores/:store_id/products/:product_id",
            delete(delete_threshold),
        )
}
