//! Return workflow for both directions: goods coming back from a
//! customer and goods going back to a supplier.
//!
//! Stock only moves when an approved return is completed. A customer
//! return opens a paid lot at the returned unit price; a supplier return
//! drains stock oldest-first.

use crate::db::DbPool;
use crate::entities::inventory_event::EventType;
use crate::entities::inventory_lot::PaymentStatus;
use crate::entities::product;
use crate::entities::return_request::{self, Entity as ReturnRequest, ReturnStatus, ReturnType};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::stock_ledger::{DecreaseStock, IncreaseStock, StockLedger};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, Order, PaginatorTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait,
};
use std::str::FromStr;
use std::sync::Arc;
use tracing::instrument;

#[derive(Debug, Clone)]
pub struct NewReturn {
    pub store_id: i64,
    pub product_id: i64,
    pub return_type: ReturnType,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub reason: Option<String>,
}

#[derive(Clone)]
pub struct ReturnService {
    db: Arc<DbPool>,
    event_sender: EventSender,
    ledger: StockLedger,
}

impl ReturnService {
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
        params: NewReturn,
    ) -> Result<return_request::Model, ServiceError> {
        if params.quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "Quantity must be positive".to_string(),
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

        let now = chrono::Utc::now();
        let row = return_request::ActiveModel {
            store_id: Set(params.store_id),
            product_id: Set(params.product_id),
            created_by: Set(actor_id),
            return_type: Set(params.return_type.to_string()),
            quantity: Set(params.quantity),
            unit_price: Set(params.unit_price),
            reason: Set(params.reason),
            status: Set(ReturnStatus::Pending.to_string()),
            resolved_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        Ok(row.insert(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, return_id: i64) -> Result<return_request::Model, ServiceError> {
        ReturnRequest::find_by_id(return_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Return {} not found", return_id)))
    }

    #[instrument(skip(self))]
    pub async fn list_for_store(
        &self,
        store_id: i64,
        status: Option<ReturnStatus>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<return_request::Model>, u64), ServiceError> {
        let mut query = ReturnRequest::find()
            .filter(return_request::Column::StoreId.eq(store_id))
            .order_by(return_request::Column::CreatedAt, Order::Desc)
            .order_by(return_request::Column::Id, Order::Desc);
        if let Some(status) = status {
            query = query.filter(return_request::Column::Status.eq(status.to_string()));
        }
        let paginator = query.paginate(&*self.db, per_page.max(1));
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((rows, total))
    }

    /// Moves a return through its lifecycle. Completion moves the stock.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        actor_id: i64,
        return_id: i64,
        next: ReturnStatus,
    ) -> Result<return_request::Model, ServiceError> {
        let ledger = self.ledger;
        let updated = self
            .db
            .transaction::<_, return_request::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let row = ReturnRequest::find_by_id(return_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Return {} not found", return_id))
                        })?;
                    let current = ReturnStatus::from_str(&row.status).map_err(|_| {
                        ServiceError::InternalError(format!(
                            "Return {} has unknown status {}",
                            return_id, row.status
                        ))
                    })?;
                    if current == next {
                        return Err(ServiceError::Conflict(format!(
                            "Return is already {}",
                            current
                        )));
                    }
                    if !current.can_transition(next) {
                        return Err(ServiceError::InvalidTransition {
                            from: current.to_string(),
                            to: next.to_string(),
                        });
                    }

                    if next == ReturnStatus::Completed {
                        let return_type = ReturnType::from_str(&row.return_type).map_err(|_| {
                            ServiceError::InternalError(format!(
                                "Return {} has unknown type {}",
                                return_id, row.return_type
                            ))
                        })?;
                        match return_type {
                            ReturnType::Customer => {
                                ledger
                                    .increase_stock(
                                        txn,
                                        IncreaseStock {
                                            product_id: row.product_id,
                                            store_id: row.store_id,
                                            quantity: row.quantity,
                                            buying_price: row.unit_price,
                                            selling_price: row.unit_price,
                                            payment_status: PaymentStatus::Paid,
                                            remarks: None,
                                            event_type: EventType::ReturnCustomer,
                                            details: Some(format!(
                                                "Customer return #{}",
                                                return_id
                                            )),
                                            actor_id,
                                        },
                                    )
                                    .await?;
                            }
                            ReturnType::Supplier => {
                                ledger
                                    .decrease_stock(
                                        txn,
                                        DecreaseStock {
                                            product_id: row.product_id,
                                            store_id: row.store_id,
                                            quantity: row.quantity,
                                            event_type: EventType::ReturnSupplier,
                                            details: Some(format!(
                                                "Supplier return #{}",
                                                return_id
                                            )),
                                            actor_id,
                                        },
                                    )
                                    .await?;
                            }
                        }
                    }

                    let now = chrono::Utc::now();
                    let mut active: return_request::ActiveModel = row.into();
                    active.status = Set(next.to_string());
                    active.updated_at = Set(now);
                    if next.is_terminal() {
                        active.resolved_at = Set(Some(now));
                    }
                    Ok(active.update(txn).await?)
                })
            })
            .await?;

        if next == ReturnStatus::Completed {
            self.event_sender.send_or_log(Event::ReturnCompleted {
                return_id: updated.id,
                return_type: updated.return_type.clone(),
            });
        }
        Ok(updated)
    }
}
