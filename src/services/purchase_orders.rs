//! Purchase order workflow.
//!
//! Receiving a purchase order opens one unpaid lot per line item, all in
//! the transaction that flips the order's status, so a failed line leaves
//! the order and the stock untouched.

use crate::db::DbPool;
use crate::entities::inventory_event::EventType;
use crate::entities::inventory_lot::PaymentStatus;
use crate::entities::purchase_order::{self, Entity as PurchaseOrder, PurchaseOrderStatus};
use crate::entities::purchase_order_item::{self, Entity as PurchaseOrderItem};
use crate::entities::{product, supplier};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::stock_ledger::{IncreaseStock, StockLedger};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, Order, PaginatorTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait,
};
use std::str::FromStr;
use std::sync::Arc;
use tracing::instrument;

#[derive(Debug, Clone)]
pub struct NewPurchaseOrderItem {
    pub product_id: i64,
    pub quantity: i32,
    pub buying_price: Decimal,
    pub selling_price: Decimal,
}

#[derive(Debug, Clone)]
pub struct NewPurchaseOrder {
    pub store_id: i64,
    pub supplier_id: i64,
    pub notes: Option<String>,
    pub items: Vec<NewPurchaseOrderItem>,
}

#[derive(Clone)]
pub struct PurchaseOrderService {
    db: Arc<DbPool>,
    event_sender: EventSender,
    ledger: StockLedger,
}

impl PurchaseOrderService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender, ledger: StockLedger) -> Self {
        Self {
            db,
            event_sender,
            ledger,
        }
    }

    /// Creates a draft order with its line items.
    #[instrument(skip(self, params))]
    pub async fn create(
        &self,
        actor_id: i64,
        params: NewPurchaseOrder,
    ) -> Result<(purchase_order::Model, Vec<purchase_order_item::Model>), ServiceError> {
        if params.items.is_empty() {
            return Err(ServiceError::ValidationError(
                "A purchase order needs at least one item".to_string(),
            ));
        }
        for item in &params.items {
            if item.quantity <= 0 {
                return Err(ServiceError::ValidationError(
                    "Item quantity must be positive".to_string(),
                ));
            }
        }

        self.db
            .transaction::<_, (purchase_order::Model, Vec<purchase_order_item::Model>), ServiceError>(
                move |txn| {
                    Box::pin(async move {
                        if supplier::Entity::find_by_id(params.supplier_id)
                            .one(txn)
                            .await?
                            .is_none()
                        {
                            return Err(ServiceError::NotFound(format!(
                                "Supplier {} not found",
                                params.supplier_id
                            )));
                        }

                        let now = chrono::Utc::now();
                        let order = purchase_order::ActiveModel {
                            store_id: Set(params.store_id),
                            supplier_id: Set(params.supplier_id),
                            created_by: Set(actor_id),
                            status: Set(PurchaseOrderStatus::Draft.to_string()),
                            notes: Set(params.notes),
                            received_at: Set(None),
                            created_at: Set(now),
                            updated_at: Set(now),
                            ..Default::default()
                        }
                        .insert(txn)
                        .await?;

                        let mut items = Vec::with_capacity(params.items.len());
                        for item in params.items {
                            if product::Entity::find_by_id(item.product_id)
                                .one(txn)
                                .await?
                                .is_none()
                            {
                                return Err(ServiceError::NotFound(format!(
                                    "Product {} not found",
                                    item.product_id
                                )));
                            }
                            let row = purchase_order_item::ActiveModel {
                                purchase_order_id: Set(order.id),
                                product_id: Set(item.product_id),
                                quantity: Set(item.quantity),
                                buying_price: Set(item.buying_price),
                                selling_price: Set(item.selling_price),
                                created_at: Set(now),
                                ..Default::default()
                            }
                            .insert(txn)
                            .await?;
                            items.push(row);
                        }

                        Ok((order, items))
                    })
                },
            )
            .await
            .map_err(ServiceError::from)
    }

    #[instrument(skip(self))]
    pub async fn get(
        &self,
        order_id: i64,
    ) -> Result<(purchase_order::Model, Vec<purchase_order_item::Model>), ServiceError> {
        let order = PurchaseOrder::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Purchase order {} not found", order_id))
            })?;
        let items = PurchaseOrderItem::find()
            .filter(purchase_order_item::Column::PurchaseOrderId.eq(order_id))
            .order_by_asc(purchase_order_item::Column::Id)
            .all(&*self.db)
            .await?;
        Ok((order, items))
    }

    #[instrument(skip(self))]
    pub async fn list_for_store(
        &self,
        store_id: i64,
        status: Option<PurchaseOrderStatus>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<purchase_order::Model>, u64), ServiceError> {
        let mut query = PurchaseOrder::find()
            .filter(purchase_order::Column::StoreId.eq(store_id))
            .order_by(purchase_order::Column::CreatedAt, Order::Desc)
            .order_by(purchase_order::Column::Id, Order::Desc);
        if let Some(status) = status {
            query = query.filter(purchase_order::Column::Status.eq(status.to_string()));
        }
        let paginator = query.paginate(&*self.db, per_page.max(1));
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((orders, total))
    }

    /// Moves an order through its lifecycle. Receiving opens one unpaid
    /// lot per line item and stamps `received_at`.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        actor_id: i64,
        order_id: i64,
        next: PurchaseOrderStatus,
    ) -> Result<purchase_order::Model, ServiceError> {
        let ledger = self.ledger;
        let order = self
            .db
            .transaction::<_, purchase_order::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let order = PurchaseOrder::find_by_id(order_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!(
                                "Purchase order {} not found",
                                order_id
                            ))
                        })?;
                    let current = PurchaseOrderStatus::from_str(&order.status).map_err(|_| {
                        ServiceError::InternalError(format!(
                            "Purchase order {} has unknown status {}",
                            order_id, order.status
                        ))
                    })?;

                    if current == next {
                        return Err(ServiceError::Conflict(format!(
                            "Purchase order is already {}",
                            current
                        )));
                    }
                    if !current.can_transition(next) {
                        return Err(ServiceError::InvalidTransition {
                            from: current.to_string(),
                            to: next.to_string(),
                        });
                    }

                    let now = chrono::Utc::now();
                    if next == PurchaseOrderStatus::Received {
                        let items = PurchaseOrderItem::find()
                            .filter(purchase_order_item::Column::PurchaseOrderId.eq(order_id))
                            .order_by_asc(purchase_order_item::Column::Id)
                            .all(txn)
                            .await?;
                        for item in items {
                            ledger
                                .increase_stock(
                                    txn,
                                    IncreaseStock {
                                        product_id: item.product_id,
                                        store_id: order.store_id,
                                        quantity: item.quantity,
                                        buying_price: item.buying_price,
                                        selling_price: item.selling_price,
                                        payment_status: PaymentStatus::Unpaid,
                                        remarks: None,
                                        event_type: EventType::PurchaseOrderReceived,
                                        details: Some(format!("PO #{} received", order_id)),
                                        actor_id,
                                    },
                                )
                                .await?;
                        }
                    }

                    let mut active: purchase_order::ActiveModel = order.into();
                    active.status = Set(next.to_string());
                    active.updated_at = Set(now);
                    if next == PurchaseOrderStatus::Received {
                        active.received_at = Set(Some(now));
                    }
                    Ok(active.update(txn).await?)
                })
            })
            .await?;

        if next == PurchaseOrderStatus::Received {
            self.event_sender.send_or_log(Event::PurchaseOrderReceived {
                purchase_order_id: order.id,
                store_id: order.store_id,
            });
        }
        Ok(order)
    }
}
