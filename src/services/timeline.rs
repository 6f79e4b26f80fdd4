//! Append-only stock timeline.
//!
//! Every stock movement writes a row here inside the transaction that
//! performed the movement. Rows carry a signed delta and the on-hand
//! total for the `(product, store)` pair after the movement, so the
//! history reads as a running ledger without recomputation.

use crate::db::DbPool;
use crate::entities::inventory_event::{self, Entity as InventoryEvent, EventType};
use crate::errors::ServiceError;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use tracing::instrument;

/// Parameters for one timeline row.
#[derive(Debug, Clone)]
pub struct RecordEvent {
    pub product_id: i64,
    pub store_id: i64,
    pub lot_id: Option<i64>,
    pub event_type: EventType,
    pub quantity_change: i32,
    pub quantity_after: i32,
    /// Old/new status, set only on payment-status events.
    pub previous_payment_status: Option<String>,
    pub new_payment_status: Option<String>,
    pub details: Option<String>,
    pub recorded_by: Option<i64>,
}

/// Appends one event row. Callers pass the transaction of the mutation
/// being recorded so the row commits or rolls back with it.
pub async fn record_event<C: ConnectionTrait>(
    conn: &C,
    ev: RecordEvent,
) -> Result<inventory_event::Model, ServiceError> {
    let row = inventory_event::ActiveModel {
        product_id: Set(ev.product_id),
        store_id: Set(ev.store_id),
        lot_id: Set(ev.lot_id),
        event_type: Set(ev.event_type.to_string()),
        quantity_change: Set(ev.quantity_change),
        quantity_after: Set(ev.quantity_after),
        previous_payment_status: Set(ev.previous_payment_status),
        new_payment_status: Set(ev.new_payment_status),
        details: Set(ev.details),
        recorded_by: Set(ev.recorded_by),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    Ok(row.insert(conn).await?)
}

/// Read side of the timeline.
#[derive(Clone)]
pub struct TimelineService {
    db: Arc<DbPool>,
}

impl TimelineService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Returns a store's history, newest first, optionally narrowed to one
    /// product. Clerks pass their own id as `recorded_by` and see only the
    /// movements they recorded. `page` is 1-based.
    #[instrument(skip(self))]
    pub async fn history_for_store(
        &self,
        store_id: i64,
        product_id: Option<i64>,
        recorded_by: Option<i64>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<inventory_event::Model>, u64), ServiceError> {
        let mut query = InventoryEvent::find()
            .filter(inventory_event::Column::StoreId.eq(store_id))
            .order_by(inventory_event::Column::CreatedAt, Order::Desc)
            .order_by(inventory_event::Column::Id, Order::Desc);
        if let Some(product_id) = product_id {
            query = query.filter(inventory_event::Column::ProductId.eq(product_id));
        }
        if let Some(user_id) = recorded_by {
            query = query.filter(inventory_event::Column::RecordedBy.eq(user_id));
        }

        let paginator = query.paginate(&*self.db, per_page.max(1));
        let total = paginator.num_items().await?;
        let events = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((events, total))
    }
}
