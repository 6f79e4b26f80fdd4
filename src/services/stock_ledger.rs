//! Stock ledger: the only two ways stock changes.
//!
//! `increase_stock` opens a new receiving lot; `decrease_stock` drains
//! existing lots oldest-first. Both run on a caller-supplied transaction
//! so orchestrators (receiving, transfers, returns, sales) compose them
//! with their own writes atomically. Both append timeline rows and run
//! the low-stock check before returning.

use crate::entities::inventory_event::EventType;
use crate::entities::inventory_lot::{self, Entity as InventoryLot, PaymentStatus};
use crate::entities::notification::NotificationCategory;
use crate::entities::product;
use crate::errors::ServiceError;
use crate::services::{notifications, thresholds, timeline};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbBackend, EntityTrait, FromQueryResult,
    Order, QueryFilter, QueryOrder, QuerySelect, Set,
};

/// Parameters for opening a new lot.
#[derive(Debug, Clone)]
pub struct IncreaseStock {
    pub product_id: i64,
    pub store_id: i64,
    pub quantity: i32,
    pub buying_price: Decimal,
    pub selling_price: Decimal,
    pub payment_status: PaymentStatus,
    pub remarks: Option<String>,
    pub event_type: EventType,
    pub details: Option<String>,
    pub actor_id: i64,
}

/// Parameters for draining stock.
#[derive(Debug, Clone)]
pub struct DecreaseStock {
    pub product_id: i64,
    pub store_id: i64,
    pub quantity: i32,
    pub event_type: EventType,
    pub details: Option<String>,
    pub actor_id: i64,
}

#[derive(Debug, FromQueryResult)]
struct OnHandTotal {
    total: Option<i64>,
}

/// Sum of `quantity_in_stock` over all lots of a `(product, store)` pair.
pub async fn on_hand<C: ConnectionTrait>(
    conn: &C,
    product_id: i64,
    store_id: i64,
) -> Result<i32, ServiceError> {
    let row = InventoryLot::find()
        .select_only()
        .column_as(inventory_lot::Column::QuantityInStock.sum(), "total")
        .filter(inventory_lot::Column::ProductId.eq(product_id))
        .filter(inventory_lot::Column::StoreId.eq(store_id))
        .into_model::<OnHandTotal>()
        .one(conn)
        .await?;
    Ok(row.and_then(|r| r.total).unwrap_or(0) as i32)
}

#[derive(Clone, Copy)]
pub struct StockLedger {
    deployment_default_threshold: i32,
}

impl StockLedger {
    pub fn new(deployment_default_threshold: i32) -> Self {
        Self {
            deployment_default_threshold,
        }
    }

    /// Opens a new lot and appends its timeline row.
    ///
    /// An unpaid lot alerts the store's admins immediately; the low-stock
    /// check still runs because a small delivery can leave the product
    /// under its threshold.
    pub async fn increase_stock<C: ConnectionTrait>(
        &self,
        txn: &C,
        params: IncreaseStock,
    ) -> Result<inventory_lot::Model, ServiceError> {
        if params.quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "Quantity must be positive".to_string(),
            ));
        }
        let product = product::Entity::find_by_id(params.product_id)
            .one(txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", params.product_id))
            })?;

        let now = chrono::Utc::now();
        let lot = inventory_lot::ActiveModel {
            product_id: Set(params.product_id),
            store_id: Set(params.store_id),
            created_by: Set(params.actor_id),
            quantity_received: Set(params.quantity),
            quantity_in_stock: Set(params.quantity),
            quantity_spoilt: Set(0),
            payment_status: Set(params.payment_status.to_string()),
            buying_price: Set(params.buying_price),
            selling_price: Set(params.selling_price),
            remarks: Set(params.remarks),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(txn)
        .await?;

        let total = on_hand(txn, params.product_id, params.store_id).await?;
        timeline::record_event(
            txn,
            timeline::RecordEvent {
                product_id: params.product_id,
                store_id: params.store_id,
                lot_id: Some(lot.id),
                event_type: params.event_type,
                quantity_change: params.quantity,
                quantity_after: total,
                previous_payment_status: None,
                new_payment_status: None,
                details: params.details,
                recorded_by: Some(params.actor_id),
            },
        )
        .await?;

        if params.payment_status == PaymentStatus::Unpaid {
            notifications::notify_store(
                txn,
                params.store_id,
                &notifications::Alert {
                    category: NotificationCategory::UnpaidInventory,
                    title: "Unpaid stock".to_string(),
                    message: format!(
                        "Unpaid stock recorded for {}: {} units",
                        product.name, params.quantity
                    ),
                    related_id: Some(lot.id),
                    product_id: Some(params.product_id),
                },
            )
            .await?;
        }

        self.check_low_stock(txn, params.product_id, params.store_id, &product.name, total)
            .await?;

        Ok(lot)
    }

    /// Drains `quantity` units from the oldest lots first.
    ///
    /// Fails with `InsufficientStock` before touching anything when the
    /// aggregate on-hand cannot cover the request; a failed drain inside a
    /// larger workflow therefore rolls the whole workflow back.
    pub async fn decrease_stock<C: ConnectionTrait>(
        &self,
        txn: &C,
        params: DecreaseStock,
    ) -> Result<Vec<inventory_lot::Model>, ServiceError> {
        if params.quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "Quantity must be positive".to_string(),
            ));
        }
        let product = product::Entity::find_by_id(params.product_id)
            .one(txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", params.product_id))
            })?;

        let mut query = InventoryLot::find()
            .filter(inventory_lot::Column::ProductId.eq(params.product_id))
            .filter(inventory_lot::Column::StoreId.eq(params.store_id))
            .filter(inventory_lot::Column::QuantityInStock.gt(0))
            .order_by(inventory_lot::Column::CreatedAt, Order::Asc)
            .order_by(inventory_lot::Column::Id, Order::Asc);
        // SQLite serializes writers on its own and rejects FOR UPDATE.
        if txn.get_database_backend() == DbBackend::Postgres {
            query = query.lock_exclusive();
        }
        let lots = query.all(txn).await?;

        let available: i32 = lots.iter().map(|l| l.quantity_in_stock).sum();
        if available < params.quantity {
            return Err(ServiceError::InsufficientStock {
                product_id: params.product_id,
                requested: params.quantity,
                available,
            });
        }

        let mut remaining = params.quantity;
        let mut running_total = available;
        let mut touched = Vec::new();
        let now = chrono::Utc::now();

        for lot in lots {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(lot.quantity_in_stock);
            let lot_id = lot.id;
            let new_quantity = lot.quantity_in_stock - take;
            let mut active: inventory_lot::ActiveModel = lot.into();
            active.quantity_in_stock = Set(new_quantity);
            active.updated_at = Set(now);
            let updated = active.update(txn).await?;

            remaining -= take;
            running_total -= take;
            timeline::record_event(
                txn,
                timeline::RecordEvent {
                    product_id: params.product_id,
                    store_id: params.store_id,
                    lot_id: Some(lot_id),
                    event_type: params.event_type,
                    quantity_change: -take,
                    quantity_after: running_total,
                    previous_payment_status: None,
                    new_payment_status: None,
                    details: params.details.clone(),
                    recorded_by: Some(params.actor_id),
                },
            )
            .await?;
            touched.push(updated);
        }

        self.check_low_stock(
            txn,
            params.product_id,
            params.store_id,
            &product.name,
            running_total,
        )
        .await?;

        Ok(touched)
    }

    /// Re-runs the low-stock check, alerting when on-hand is at or below
    /// the resolved threshold.
    pub async fn check_low_stock<C: ConnectionTrait>(
        &self,
        txn: &C,
        product_id: i64,
        store_id: i64,
        product_name: &str,
        total: i32,
    ) -> Result<(), ServiceError> {
        let threshold = thresholds::resolve_threshold(
            txn,
            product_id,
            store_id,
            self.deployment_default_threshold,
        )
        .await?;
        if total <= threshold {
            notifications::notify_store(
                txn,
                store_id,
                &notifications::Alert {
                    category: NotificationCategory::LowStock,
                    title: "Low stock".to_string(),
                    message: format!(
                        "{} is low on stock: {} left (threshold {})",
                        product_name, total, threshold
                    ),
                    related_id: None,
                    product_id: Some(product_id),
                },
            )
            .await?;
        }
        Ok(())
    }
}
