//! Point-of-sale recording.
//!
//! The stock drain runs first; the sale row is only persisted if the
//! drain succeeded, in the same transaction.

use crate::db::DbPool;
use crate::entities::inventory_event::EventType;
use crate::entities::sale::{self, Entity as Sale};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::stock_ledger::{DecreaseStock, StockLedger};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, Order, PaginatorTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::instrument;

#[derive(Debug, Clone)]
pub struct NewSale {
    pub product_id: i64,
    pub store_id: i64,
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Clone)]
pub struct SaleService {
    db: Arc<DbPool>,
    event_sender: EventSender,
    ledger: StockLedger,
}

impl SaleService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender, ledger: StockLedger) -> Self {
        Self {
            db,
            event_sender,
            ledger,
        }
    }

    #[instrument(skip(self))]
    pub async fn record(
        &self,
        actor_id: i64,
        params: NewSale,
    ) -> Result<sale::Model, ServiceError> {
        if params.quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "Quantity must be positive".to_string(),
            ));
        }
        let ledger = self.ledger;
        let sale = self
            .db
            .transaction::<_, sale::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    ledger
                        .decrease_stock(
                            txn,
                            DecreaseStock {
                                product_id: params.product_id,
                                store_id: params.store_id,
                                quantity: params.quantity,
                                event_type: EventType::SaleRecorded,
                                details: None,
                                actor_id,
                            },
                        )
                        .await?;

                    let total = params.unit_price * Decimal::from(params.quantity);
                    let row = sale::ActiveModel {
                        product_id: Set(params.product_id),
                        store_id: Set(params.store_id),
                        recorded_by: Set(actor_id),
                        quantity: Set(params.quantity),
                        unit_price: Set(params.unit_price),
                        total: Set(total),
                        created_at: Set(chrono::Utc::now()),
                        ..Default::default()
                    };
                    Ok(row.insert(txn).await?)
                })
            })
            .await?;

        self.event_sender.send_or_log(Event::SaleRecorded {
            sale_id: sale.id,
            product_id: sale.product_id,
            store_id: sale.store_id,
        });
        Ok(sale)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, sale_id: i64) -> Result<sale::Model, ServiceError> {
        Sale::find_by_id(sale_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Sale {} not found", sale_id)))
    }

    #[instrument(skip(self))]
    pub async fn list_for_store(
        &self,
        store_id: i64,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<sale::Model>, u64), ServiceError> {
        let query = Sale::find()
            .filter(sale::Column::StoreId.eq(store_id))
            .order_by(sale::Column::CreatedAt, Order::Desc)
            .order_by(sale::Column::Id, Order::Desc);
        let paginator = query.paginate(&*self.db, per_page.max(1));
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((rows, total))
    }
}
