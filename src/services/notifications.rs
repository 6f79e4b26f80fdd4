//! Notification dispatch and read surface.
//!
//! Dispatch writes one row per recipient inside the caller's transaction,
//! so notifications never describe a mutation that later rolled back.
//! Recipients of a store alert are the store's active admins plus the
//! active superuser owning the store's merchant account.

use crate::db::DbPool;
use crate::entities::{
    notification::{self, Entity as Notification, NotificationCategory},
    store,
    user::{self, Entity as User},
};
use crate::errors::ServiceError;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use std::sync::Arc;
use tracing::instrument;

/// Resolves the user ids that should hear about a store-level alert.
pub async fn store_recipients<C: ConnectionTrait>(
    conn: &C,
    store_id: i64,
) -> Result<Vec<i64>, ServiceError> {
    let store = store::Entity::find_by_id(store_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Store {} not found", store_id)))?;

    let recipients = User::find()
        .filter(user::Column::IsActive.eq(true))
        .filter(
            Condition::any()
                .add(
                    Condition::all()
                        .add(user::Column::Role.eq("admin"))
                        .add(user::Column::StoreId.eq(store_id)),
                )
                .add(
                    Condition::all()
                        .add(user::Column::Role.eq("superuser"))
                        .add(user::Column::Id.eq(store.merchant_id)),
                ),
        )
        .all(conn)
        .await?;

    Ok(recipients.into_iter().map(|u| u.id).collect())
}

/// Content of one alert, fanned out verbatim to every recipient.
#[derive(Debug, Clone)]
pub struct Alert {
    pub category: NotificationCategory,
    pub title: String,
    pub message: String,
    /// Entity the alert points at (lot, supply request, ...).
    pub related_id: Option<i64>,
    pub product_id: Option<i64>,
}

/// Writes one notification row per recipient.
pub async fn dispatch<C: ConnectionTrait>(
    conn: &C,
    recipients: &[i64],
    alert: &Alert,
    store_id: Option<i64>,
) -> Result<(), ServiceError> {
    let now = chrono::Utc::now();
    for user_id in recipients {
        let row = notification::ActiveModel {
            user_id: Set(*user_id),
            category: Set(alert.category.to_string()),
            title: Set(alert.title.clone()),
            message: Set(alert.message.clone()),
            related_id: Set(alert.related_id),
            product_id: Set(alert.product_id),
            store_id: Set(store_id),
            is_read: Set(false),
            read_at: Set(None),
            created_at: Set(now),
            ..Default::default()
        };
        row.insert(conn).await?;
    }
    Ok(())
}

/// Dispatches a store alert to the store's admin/owner recipient set.
pub async fn notify_store<C: ConnectionTrait>(
    conn: &C,
    store_id: i64,
    alert: &Alert,
) -> Result<(), ServiceError> {
    let recipients = store_recipients(conn, store_id).await?;
    dispatch(conn, &recipients, alert, Some(store_id)).await
}

/// Notifies a single user, typically the requester of a resolved workflow.
pub async fn notify_user<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
    alert: &Alert,
    store_id: Option<i64>,
) -> Result<(), ServiceError> {
    dispatch(conn, &[user_id], alert, store_id).await
}

/// Per-user inbox operations.
#[derive(Clone)]
pub struct NotificationService {
    db: Arc<DbPool>,
}

impl NotificationService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list_for_user(
        &self,
        user_id: i64,
        unread_only: bool,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<notification::Model>, ServiceError> {
        let mut query = Notification::find()
            .filter(notification::Column::UserId.eq(user_id))
            .order_by(notification::Column::CreatedAt, Order::Desc)
            .order_by(notification::Column::Id, Order::Desc);
        if unread_only {
            query = query.filter(notification::Column::IsRead.eq(false));
        }
        Ok(query.offset(skip).limit(limit.max(1)).all(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn unread_count(&self, user_id: i64) -> Result<u64, ServiceError> {
        Ok(Notification::find()
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::IsRead.eq(false))
            .count(&*self.db)
            .await?)
    }

    /// Marks one notification as read. Only the owner may do so.
    #[instrument(skip(self))]
    pub async fn mark_read(
        &self,
        user_id: i64,
        notification_id: i64,
    ) -> Result<notification::Model, ServiceError> {
        let row = Notification::find_by_id(notification_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Notification not found".to_string()))?;
        if row.user_id != user_id {
            return Err(ServiceError::Forbidden(
                "Notification belongs to another user".to_string(),
            ));
        }
        if row.is_read {
            return Ok(row);
        }
        let mut active: notification::ActiveModel = row.into();
        active.is_read = Set(true);
        active.read_at = Set(Some(chrono::Utc::now()));
        Ok(active.update(&*self.db).await?)
    }

    /// Marks everything unread as read, returning how many rows changed.
    #[instrument(skip(self))]
    pub async fn mark_all_read(&self, user_id: i64) -> Result<u64, ServiceError> {
        let result = Notification::update_many()
            .col_expr(notification::Column::IsRead, Expr::value(true))
            .col_expr(notification::Column::ReadAt, Expr::value(chrono::Utc::now()))
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::IsRead.eq(false))
            .exec(&*self.db)
            .await?;
        Ok(result.rows_affected)
    }
}
