use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Duka API",
        version = "1.0.0",
        description = r#"
Multi-tenant retail inventory and point-of-sale backend.

Stock lives in receiving lots per `(product, store)` pair; every change to
it flows through the stock ledger, which appends to an immutable timeline,
resolves low-stock thresholds and alerts the store's admins when a product
runs low or arrives unpaid.

All endpoints require a bearer token:

```
Authorization: Bearer <your-jwt-token>
```
"#
    ),
    paths(
        handlers::health::health_check,
        handlers::inventory::record_inventory,
        handlers::inventory::get_inventory_lot,
        handlers::inventory::update_inventory_lot,
        handlers::inventory::delete_inventory_lot,
        handlers::inventory::list_store_inventory,
        handlers::inventory::store_timeline,
        handlers::inventory::on_hand,
        handlers::purchase_orders::create_purchase_order,
        handlers::purchase_orders::get_purchase_order,
        handlers::purchase_orders::list_purchase_orders,
        handlers::purchase_orders::update_purchase_order_status,
        handlers::returns::create_return,
        handlers::returns::get_return,
        handlers::returns::list_returns,
        handlers::returns::update_return_status,
        handlers::stock_transfers::create_transfer,
        handlers::stock_transfers::get_transfer,
        handlers::stock_transfers::list_transfers,
        handlers::stock_transfers::update_transfer_status,
        handlers::sales::record_sale,
        handlers::sales::get_sale,
        handlers::sales::list_sales,
        handlers::supply_requests::create_supply_request,
        handlers::supply_requests::get_supply_request,
        handlers::supply_requests::list_supply_requests,
        handlers::supply_requests::approve_supply_request,
        handlers::supply_requests::decline_supply_request,
        handlers::notifications::list_notifications,
        handlers::notifications::unread_count,
        handlers::notifications::mark_read,
        handlers::notifications::mark_all_read,
        handlers::thresholds::upsert_threshold,
        handlers::thresholds::upsert_product_threshold,
        handlers::thresholds::list_thresholds,
        handlers::thresholds::resolve_threshold,
        handlers::thresholds::delete_threshold,
        handlers::thresholds::delete_product_threshold,
    ),
    tags(
        (name = "health", description = "Service health"),
        (name = "inventory", description = "Receiving lots, timeline and on-hand totals"),
        (name = "purchase-orders", description = "Ordering from suppliers and receiving stock"),
        (name = "returns", description = "Customer and supplier returns"),
        (name = "stock-transfers", description = "Moving stock between stores"),
        (name = "sales", description = "Point-of-sale recording"),
        (name = "supply-requests", description = "Clerk restock requests"),
        (name = "notifications", description = "Per-user notification inbox"),
        (name = "thresholds", description = "Low-stock threshold overrides"),
    )
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}
