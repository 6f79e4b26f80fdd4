//! Clerk-initiated supply requests, resolved by store admins.
//!
//! Creation alerts the store's admins; resolution notifies the clerk who
//! asked. Requests never move stock themselves.

use crate::db::DbPool;
use crate::entities::notification::NotificationCategory;
use crate::entities::supply_request::{self, Entity as SupplyRequest, SupplyRequestStatus};
use crate::entities::{product, store};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::notifications;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, Order, PaginatorTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait,
};
use std::str::FromStr;
use std::sync::Arc;
use tracing::instrument;

#[derive(Debug, Clone)]
pub struct NewSupplyRequest {
    pub product_id: i64,
    pub store_id: i64,
    pub quantity: i32,
}

#[derive(Clone)]
pub struct SupplyRequestService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl SupplyRequestService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn create(
        &self,
        actor_id: i64,
        params: NewSupplyRequest,
    ) -> Result<supply_request::Model, ServiceError> {
        if params.quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "Quantity must be positive".to_string(),
            ));
        }

        let row = self
            .db
            .transaction::<_, supply_request::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let product = product::Entity::find_by_id(params.product_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!(
                                "Product {} not found",
                                params.product_id
                            ))
                        })?;
                    if store::Entity::find_by_id(params.store_id)
                        .one(txn)
                        .await?
                        .is_none()
                    {
                        return Err(ServiceError::NotFound(format!(
                            "Store {} not found",
                            params.store_id
                        )));
                    }

                    let now = chrono::Utc::now();
                    let row = supply_request::ActiveModel {
                        product_id: Set(params.product_id),
                        store_id: Set(params.store_id),
                        requested_by: Set(actor_id),
                        quantity: Set(params.quantity),
                        status: Set(SupplyRequestStatus::Pending.to_string()),
                        admin_notes: Set(None),
                        resolved_by: Set(None),
                        resolved_at: Set(None),
                        created_at: Set(now),
                        updated_at: Set(now),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await?;

                    notifications::notify_store(
                        txn,
                        params.store_id,
                        &notifications::Alert {
                            category: NotificationCategory::PendingSupplyRequest,
                            title: "Supply request".to_string(),
                            message: format!(
                                "Supply request: {} units of {}",
                                params.quantity, product.name
                            ),
                            related_id: Some(row.id),
                            product_id: Some(params.product_id),
                        },
                    )
                    .await?;

                    Ok(row)
                })
            })
            .await?;

        self.event_sender.send_or_log(Event::SupplyRequestCreated {
            request_id: row.id,
            store_id: row.store_id,
        });
        Ok(row)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, request_id: i64) -> Result<supply_request::Model, ServiceError> {
        SupplyRequest::find_by_id(request_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Supply request {} not found", request_id))
            })
    }

    #[instrument(skip(self))]
    pub async fn list_for_store(
        &self,
        store_id: i64,
        status: Option<SupplyRequestStatus>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<supply_request::Model>, u64), ServiceError> {
        let mut query = SupplyRequest::find()
            .filter(supply_request::Column::StoreId.eq(store_id))
            .order_by(supply_request::Column::CreatedAt, Order::Desc)
            .order_by(supply_request::Column::Id, Order::Desc);
        if let Some(status) = status {
            query = query.filter(supply_request::Column::Status.eq(status.to_string()));
        }
        let paginator = query.paginate(&*self.db, per_page.max(1));
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((rows, total))
    }

    /// Approves or declines a pending request and tells the requester.
    /// Notes from the resolving admin are stored either way and carried
    /// into the requester's notification.
    #[instrument(skip(self))]
    pub async fn resolve(
        &self,
        actor_id: i64,
        request_id: i64,
        next: SupplyRequestStatus,
        admin_notes: Option<String>,
    ) -> Result<supply_request::Model, ServiceError> {
        if next == SupplyRequestStatus::Pending {
            return Err(ServiceError::InvalidOperation(
                "A request cannot be resolved back to pending".to_string(),
            ));
        }

        let updated = self
            .db
            .transaction::<_, supply_request::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let row = SupplyRequest::find_by_id(request_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!(
                                "Supply request {} not found",
                                request_id
                            ))
                        })?;
                    let current = SupplyRequestStatus::from_str(&row.status).map_err(|_| {
                        ServiceError::InternalError(format!(
                            "Supply request {} has unknown status {}",
                            request_id, row.status
                        ))
                    })?;
                    if current == next {
                        return Err(ServiceError::Conflict(format!(
                            "Supply request is already {}",
                            current
                        )));
                    }
                    if !current.can_transition(next) {
                        return Err(ServiceError::InvalidTransition {
                            from: current.to_string(),
                            to: next.to_string(),
                        });
                    }

                    let requester = row.requested_by;
                    let store_id = row.store_id;
                    let product_id = row.product_id;
                    let now = chrono::Utc::now();
                    let mut active: supply_request::ActiveModel = row.into();
                    active.status = Set(next.to_string());
                    active.admin_notes = Set(admin_notes.clone());
                    active.resolved_by = Set(Some(actor_id));
                    active.resolved_at = Set(Some(now));
                    active.updated_at = Set(now);
                    let updated = active.update(txn).await?;

                    let message = match &admin_notes {
                        Some(notes) => format!(
                            "Your supply request #{} was {}: {}",
                            request_id, next, notes
                        ),
                        None => format!("Your supply request #{} was {}", request_id, next),
                    };
                    notifications::notify_user(
                        txn,
                        requester,
                        &notifications::Alert {
                            category: NotificationCategory::SupplyRequestStatus,
                            title: "Supply request resolved".to_string(),
                            message,
                            related_id: Some(request_id),
                            product_id: Some(product_id),
                        },
                        Some(store_id),
                    )
                    .await?;

                    Ok(updated)
                })
            })
            .await?;

        self.event_sender.send_or_log(Event::SupplyRequestResolved {
            request_id: updated.id,
            status: updated.status.clone(),
        });
        Ok(updated)
    }
}
