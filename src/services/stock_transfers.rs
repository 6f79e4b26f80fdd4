//! Inter-store stock transfers.
//!
//! Completing an approved transfer drains the source store and opens a
//! paid lot at the destination in one transaction, so the two stores'
//! totals move together or not at all.

use crate::db::DbPool;
use crate::entities::inventory_event::EventType;
use crate::entities::inventory_lot::PaymentStatus;
use crate::entities::stock_transfer::{self, Entity as StockTransfer, TransferStatus};
use crate::entities::{product, store};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::stock_ledger::{DecreaseStock, IncreaseStock, StockLedger};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, Order, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use std::str::FromStr;
use std::sync::Arc;
use tracing::instrument;

#[derive(Debug, Clone)]
pub struct NewTransfer {
    pub product_id: i64,
    pub from_store_id: i64,
    pub to_store_id: i64,
    pub quantity: i32,
    pub buying_price: Decimal,
    pub selling_price: Decimal,
}

#[derive(Clone)]
pub struct StockTransferService {
    db: Arc<DbPool>,
    event_sender: EventSender,
    ledger: StockLedger,
}

impl StockTransferService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender, ledger: StockLedger) -> Self {
        Self {
            db,
            event_sender,
            ledger,
        }
    }

    #[instrument(skip(self))]
    pub async fn create(
        &self,
        actor_id: i64,
        params: NewTransfer,
    ) -> Result<stock_transfer::Model, ServiceError> {
        if params.quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "Quantity must be positive".to_string(),
            ));
        }
        if params.from_store_id == params.to_store_id {
            return Err(ServiceError::InvalidOperation(
                "Cannot transfer a product to the same store".to_string(),
            ));
        }
        if product::Entity::find_by_id(params.product_id)
            .one(&*self.db)
            .await?
            .is_none()
        {
            return Err(ServiceError::NotFound(format!(
                "Product {} not found",
                params.product_id
            )));
        }
        for store_id in [params.from_store_id, params.to_store_id] {
            if store::Entity::find_by_id(store_id)
                .one(&*self.db)
                .await?
                .is_none()
            {
                return Err(ServiceError::NotFound(format!(
                    "Store {} not found",
                    store_id
                )));
            }
        }

        let now = chrono::Utc::now();
        let row = stock_transfer::ActiveModel {
            product_id: Set(params.product_id),
            from_store_id: Set(params.from_store_id),
            to_store_id: Set(params.to_store_id),
            created_by: Set(actor_id),
            quantity: Set(params.quantity),
            buying_price: Set(params.buying_price),
            selling_price: Set(params.selling_price),
            status: Set(TransferStatus::Pending.to_string()),
            completed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        Ok(row.insert(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, transfer_id: i64) -> Result<stock_transfer::Model, ServiceError> {
        StockTransfer::find_by_id(transfer_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Transfer {} not found", transfer_id)))
    }

    /// Lists transfers touching a store in either direction.
    #[instrument(skip(self))]
    pub async fn list_for_store(
        &self,
        store_id: i64,
        status: Option<TransferStatus>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<stock_transfer::Model>, u64), ServiceError> {
        let mut query = StockTransfer::find()
            .filter(
                Condition::any()
                    .add(stock_transfer::Column::FromStoreId.eq(store_id))
                    .add(stock_transfer::Column::ToStoreId.eq(store_id)),
            )
            .order_by(stock_transfer::Column::CreatedAt, Order::Desc)
            .order_by(stock_transfer::Column::Id, Order::Desc);
        if let Some(status) = status {
            query = query.filter(stock_transfer::Column::Status.eq(status.to_string()));
        }
        let paginator = query.paginate(&*self.db, per_page.max(1));
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((rows, total))
    }

    /// Moves a transfer through its lifecycle. Completion moves the stock
    /// between the two stores.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        actor_id: i64,
        transfer_id: i64,
        next: TransferStatus,
    ) -> Result<stock_transfer::Model, ServiceError> {
        let ledger = self.ledger;
        let updated = self
            .db
            .transaction::<_, stock_transfer::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let row = StockTransfer::find_by_id(transfer_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Transfer {} not found", transfer_id))
                        })?;
                    let current = TransferStatus::from_str(&row.status).map_err(|_| {
                        ServiceError::InternalError(format!(
                            "Transfer {} has unknown status {}",
                            transfer_id, row.status
                        ))
                    })?;
                    if current == next {
                        return Err(ServiceError::Conflict(format!(
                            "Transfer is already {}",
                            current
                        )));
                    }
                    if !current.can_transition(next) {
                        return Err(ServiceError::InvalidTransition {
                            from: current.to_string(),
                            to: next.to_string(),
                        });
                    }

                    if next == TransferStatus::Completed {
                        // Drain the source first so an insufficient-stock
                        // failure aborts before the destination changes.
                        ledger
                            .decrease_stock(
                                txn,
                                DecreaseStock {
                                    product_id: row.product_id,
                                    store_id: row.from_store_id,
                                    quantity: row.quantity,
                                    event_type: EventType::StockTransferOut,
                                    details: Some(format!(
                                        "Transfer #{} to store {}",
                                        transfer_id, row.to_store_id
                                    )),
                                    actor_id,
                                },
                            )
                            .await?;
                        ledger
                            .increase_stock(
                                txn,
                                IncreaseStock {
                                    product_id: row.product_id,
                                    store_id: row.to_store_id,
                                    quantity: row.quantity,
                                    buying_price: row.buying_price,
                                    selling_price: row.selling_price,
                                    payment_status: PaymentStatus::Paid,
                                    remarks: None,
                                    event_type: EventType::StockTransferIn,
                                    details: Some(format!(
                                        "Transfer #{} from store {}",
                                        transfer_id, row.from_store_id
                                    )),
                                    actor_id,
                                },
                            )
                            .await?;
                    }

                    let now = chrono::Utc::now();
                    let mut active: stock_transfer::ActiveModel = row.into();
                    active.status = Set(next.to_string());
                    active.updated_at = Set(now);
                    if next == TransferStatus::Completed {
                        active.completed_at = Set(Some(now));
                    }
                    Ok(active.update(txn).await?)
                })
            })
            .await?;

        if next == TransferStatus::Completed {
            self.event_sender.send_or_log(Event::StockTransferCompleted {
                transfer_id: updated.id,
                from_store_id: updated.from_store_id,
                to_store_id: updated.to_store_id,
            });
        }
        Ok(updated)
    }
}
