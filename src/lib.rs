//! Duka API Library
//!
//! Multi-tenant retail inventory and point-of-sale backend. Stock is held
//! in receiving lots; every mutation flows through the stock ledger and
//! leaves a timeline row behind.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod openapi;
pub mod services;

use axum::{routing::get, Router};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

/// Versioned API surface, nested under `/api/v1`.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .nest("/inventory", handlers::inventory::inventory_routes())
        .nest(
            "/purchase-orders",
            handlers::purchase_orders::purchase_order_routes(),
        )
        .nest("/returns", handlers::returns::return_routes())
        .nest(
            "/stock-transfers",
            handlers::stock_transfers::stock_transfer_routes(),
        )
        .nest("/sales", handlers::sales::sale_routes())
        .nest(
            "/supply-requests",
            handlers::supply_requests::supply_request_routes(),
        )
        .nest(
            "/notifications",
            handlers::notifications::notification_routes(),
        )
        .nest("/thresholds", handlers::thresholds::threshold_routes())
}

/// Full application router: health, the v1 API and Swagger UI.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .nest("/api/v1", api_v1_routes())
        .merge(openapi::swagger_ui())
        .with_state(state)
}
