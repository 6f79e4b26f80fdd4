//! Inventory lot orchestration: recording deliveries, amending lots,
//! removing mistaken entries.

use crate::db::DbPool;
use crate::entities::inventory_event::EventType;
use crate::entities::inventory_lot::{self, Entity as InventoryLot, PaymentStatus};
use crate::entities::notification::NotificationCategory;
use crate::entities::product;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::stock_ledger::{self, IncreaseStock, StockLedger};
use crate::services::{notifications, timeline};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, Order, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::instrument;

#[derive(Debug, Clone)]
pub struct RecordInventory {
    pub product_id: i64,
    pub store_id: i64,
    pub quantity: i32,
    pub buying_price: Decimal,
    pub selling_price: Decimal,
    pub payment_status: PaymentStatus,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateInventory {
    pub quantity_spoilt: Option<i32>,
    pub buying_price: Option<Decimal>,
    pub selling_price: Option<Decimal>,
    pub payment_status: Option<PaymentStatus>,
    pub remarks: Option<String>,
}

#[derive(Clone)]
pub struct InventoryService {
    db: Arc<DbPool>,
    event_sender: EventSender,
    ledger: StockLedger,
}

impl InventoryService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender, ledger: StockLedger) -> Self {
        Self {
            db,
            event_sender,
            ledger,
        }
    }

    /// Records a delivery as a new lot.
    #[instrument(skip(self))]
    pub async fn record(
        &self,
        actor_id: i64,
        params: RecordInventory,
    ) -> Result<inventory_lot::Model, ServiceError> {
        let ledger = self.ledger;
        let lot = self
            .db
            .transaction::<_, inventory_lot::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    ledger
                        .increase_stock(
                            txn,
                            IncreaseStock {
                                product_id: params.product_id,
                                store_id: params.store_id,
                                quantity: params.quantity,
                                buying_price: params.buying_price,
                                selling_price: params.selling_price,
                                payment_status: params.payment_status,
                                remarks: params.remarks,
                                event_type: EventType::Created,
                                details: None,
                                actor_id,
                            },
                        )
                        .await
                })
            })
            .await?;

        self.event_sender.send_or_log(Event::InventoryRecorded {
            lot_id: lot.id,
            product_id: lot.product_id,
            store_id: lot.store_id,
        });
        Ok(lot)
    }

    /// Amends a lot. Spoilage can only grow, and spoilt units come out of
    /// the lot's remaining stock. A payment flip to unpaid re-alerts the
    /// store's admins.
    #[instrument(skip(self))]
    pub async fn update(
        &self,
        actor_id: i64,
        lot_id: i64,
        changes: UpdateInventory,
    ) -> Result<inventory_lot::Model, ServiceError> {
        let ledger = self.ledger;
        let (updated, status_changed) = self
            .db
            .transaction::<_, (inventory_lot::Model, Option<PaymentStatus>), ServiceError>(move |txn| {
                Box::pin(async move {
                    let lot = InventoryLot::find_by_id(lot_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Inventory lot {} not found", lot_id))
                        })?;
                    let product = product::Entity::find_by_id(lot.product_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Product {} not found", lot.product_id))
                        })?;

                    let mut spoilt_delta = 0;
                    if let Some(spoilt) = changes.quantity_spoilt {
                        if spoilt < lot.quantity_spoilt {
                            return Err(ServiceError::ValidationError(
                                "Spoilt quantity cannot decrease".to_string(),
                            ));
                        }
                        spoilt_delta = spoilt - lot.quantity_spoilt;
                        if spoilt_delta > lot.quantity_in_stock {
                            return Err(ServiceError::ValidationError(format!(
                                "Cannot spoil {} units, only {} in stock",
                                spoilt_delta, lot.quantity_in_stock
                            )));
                        }
                    }

                    let previous_status = lot.payment_status();
                    let product_id = lot.product_id;
                    let store_id = lot.store_id;
                    let in_stock = lot.quantity_in_stock;

                    let mut active: inventory_lot::ActiveModel = lot.into();
                    if spoilt_delta > 0 {
                        active.quantity_spoilt =
                            Set(changes.quantity_spoilt.unwrap_or_default());
                        active.quantity_in_stock = Set(in_stock - spoilt_delta);
                    }
                    if let Some(price) = changes.buying_price {
                        active.buying_price = Set(price);
                    }
                    if let Some(price) = changes.selling_price {
                        active.selling_price = Set(price);
                    }
                    if let Some(status) = changes.payment_status {
                        active.payment_status = Set(status.to_string());
                    }
                    if let Some(remarks) = changes.remarks {
                        active.remarks = Set(Some(remarks));
                    }
                    active.updated_at = Set(chrono::Utc::now());
                    let updated = active.update(txn).await?;
                    let status_changed = changes
                        .payment_status
                        .filter(|s| previous_status != Some(*s));

                    let total = stock_ledger::on_hand(txn, product_id, store_id).await?;
                    timeline::record_event(
                        txn,
                        timeline::RecordEvent {
                            product_id,
                            store_id,
                            lot_id: Some(lot_id),
                            event_type: EventType::Updated,
                            quantity_change: -spoilt_delta,
                            quantity_after: total,
                            previous_payment_status: None,
                            new_payment_status: None,
                            details: (spoilt_delta > 0)
                                .then(|| format!("{} units marked spoilt", spoilt_delta)),
                            recorded_by: Some(actor_id),
                        },
                    )
                    .await?;

                    if let Some(new_status) = status_changed {
                        timeline::record_event(
                            txn,
                            timeline::RecordEvent {
                                product_id,
                                store_id,
                                lot_id: Some(lot_id),
                                event_type: EventType::PaymentStatusUpdated,
                                quantity_change: 0,
                                quantity_after: total,
                                previous_payment_status: previous_status
                                    .map(|s| s.to_string()),
                                new_payment_status: Some(new_status.to_string()),
                                details: Some(format!("Payment marked {}", new_status)),
                                recorded_by: Some(actor_id),
                            },
                        )
                        .await?;
                        if new_status == PaymentStatus::Unpaid {
                            notifications::notify_store(
                                txn,
                                store_id,
                                &notifications::Alert {
                                    category: NotificationCategory::UnpaidInventory,
                                    title: "Unpaid stock".to_string(),
                                    message: format!(
                                        "Stock of {} marked unpaid",
                                        product.name
                                    ),
                                    related_id: Some(lot_id),
                                    product_id: Some(product_id),
                                },
                            )
                            .await?;
                        }
                    }

                    if spoilt_delta > 0 {
                        ledger
                            .check_low_stock(txn, product_id, store_id, &product.name, total)
                            .await?;
                    }

                    Ok((updated, status_changed))
                })
            })
            .await?;

        if let Some(status) = status_changed {
            self.event_sender.send_or_log(Event::PaymentStatusChanged {
                lot_id: updated.id,
                new_status: status.to_string(),
            });
        }
        self.event_sender
            .send_or_log(Event::InventoryUpdated { lot_id: updated.id });
        Ok(updated)
    }

    /// Removes a mistaken lot entry. The remaining units leave the ledger
    /// through a `deleted` timeline event.
    #[instrument(skip(self))]
    pub async fn delete(&self, actor_id: i64, lot_id: i64) -> Result<(), ServiceError> {
        self.db
            .transaction::<_, (), ServiceError>(move |txn| {
                Box::pin(async move {
                    let lot = InventoryLot::find_by_id(lot_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Inventory lot {} not found", lot_id))
                        })?;
                    let product_id = lot.product_id;
                    let store_id = lot.store_id;
                    let in_stock = lot.quantity_in_stock;

                    lot.delete(txn).await?;

                    let total = stock_ledger::on_hand(txn, product_id, store_id).await?;
                    timeline::record_event(
                        txn,
                        timeline::RecordEvent {
                            product_id,
                            store_id,
                            lot_id: Some(lot_id),
                            event_type: EventType::Deleted,
                            quantity_change: -in_stock,
                            quantity_after: total,
                            previous_payment_status: None,
                            new_payment_status: None,
                            details: None,
                            recorded_by: Some(actor_id),
                        },
                    )
                    .await?;
                    Ok(())
                })
            })
            .await?;

        self.event_sender
            .send_or_log(Event::InventoryDeleted { lot_id });
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get(&self, lot_id: i64) -> Result<inventory_lot::Model, ServiceError> {
        InventoryLot::find_by_id(lot_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Inventory lot {} not found", lot_id)))
    }

    /// Lists a store's lots, newest first, optionally filtered by payment
    /// status. Clerks pass their own id as `created_by` and see only the
    /// lots they recorded. `page` is 1-based.
    #[instrument(skip(self))]
    pub async fn list_for_store(
        &self,
        store_id: i64,
        payment_status: Option<PaymentStatus>,
        created_by: Option<i64>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<inventory_lot::Model>, u64), ServiceError> {
        let mut query = InventoryLot::find()
            .filter(inventory_lot::Column::StoreId.eq(store_id))
            .order_by(inventory_lot::Column::CreatedAt, Order::Desc)
            .order_by(inventory_lot::Column::Id, Order::Desc);
        if let Some(status) = payment_status {
            query = query.filter(inventory_lot::Column::PaymentStatus.eq(status.to_string()));
        }
        if let Some(user_id) = created_by {
            query = query.filter(inventory_lot::Column::CreatedBy.eq(user_id));
        }

        let paginator = query.paginate(&*self.db, per_page.max(1));
        let total = paginator.num_items().await?;
        let lots = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((lots, total))
    }

    /// On-hand total for a `(product, store)` pair.
    #[instrument(skip(self))]
    pub async fn on_hand(&self, product_id: i64, store_id: i64) -> Result<i32, ServiceError> {
        stock_ledger::on_hand(&*self.db, product_id, store_id).await
    }

}
