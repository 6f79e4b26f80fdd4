//! Low-stock threshold resolution.
//!
//! Thresholds resolve in three tiers: a store-specific override, then the
//! product-wide row (a threshold with no store), then the deployment-wide
//! default.

use crate::db::DbPool;
use crate::entities::{
    product,
    stock_threshold::{self, Entity as StockThreshold},
};
use crate::errors::ServiceError;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use tracing::instrument;

fn store_filter(store_id: Option<i64>) -> sea_orm::sea_query::SimpleExpr {
    match store_id {
        Some(id) => stock_threshold::Column::StoreId.eq(id),
        None => stock_threshold::Column::StoreId.is_null(),
    }
}

/// Resolves the effective threshold for a `(product, store)` pair.
pub async fn resolve_threshold<C: ConnectionTrait>(
    conn: &C,
    product_id: i64,
    store_id: i64,
    deployment_default: i32,
) -> Result<i32, ServiceError> {
    let override_row = StockThreshold::find()
        .filter(stock_threshold::Column::ProductId.eq(product_id))
        .filter(stock_threshold::Column::StoreId.eq(store_id))
        .one(conn)
        .await?;
    if let Some(row) = override_row {
        return Ok(row.minimum_quantity);
    }

    let product_row = StockThreshold::find()
        .filter(stock_threshold::Column::ProductId.eq(product_id))
        .filter(stock_threshold::Column::StoreId.is_null())
        .one(conn)
        .await?;
    if let Some(row) = product_row {
        return Ok(row.minimum_quantity);
    }

    Ok(deployment_default)
}

#[derive(Clone)]
pub struct ThresholdService {
    db: Arc<DbPool>,
    deployment_default: i32,
}

impl ThresholdService {
    pub fn new(db: Arc<DbPool>, deployment_default: i32) -> Self {
        Self {
            db,
            deployment_default,
        }
    }

    #[instrument(skip(self))]
    pub async fn resolve(&self, product_id: i64, store_id: i64) -> Result<i32, ServiceError> {
        resolve_threshold(&*self.db, product_id, store_id, self.deployment_default).await
    }

    /// Creates or replaces a threshold row. `store_id = None` sets the
    /// product-wide default applied to stores without an override.
    #[instrument(skip(self))]
    pub async fn upsert(
        &self,
        product_id: i64,
        store_id: Option<i64>,
        minimum_quantity: i32,
    ) -> Result<stock_threshold::Model, ServiceError> {
        if minimum_quantity < 0 {
            return Err(ServiceError::ValidationError(
                "Minimum quantity cannot be negative".to_string(),
            ));
        }
        if product::Entity::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .is_none()
        {
            return Err(ServiceError::NotFound(format!(
                "Product {} not found",
                product_id
            )));
        }

        let now = chrono::Utc::now();
        let existing = StockThreshold::find()
            .filter(stock_threshold::Column::ProductId.eq(product_id))
            .filter(store_filter(store_id))
            .one(&*self.db)
            .await?;

        match existing {
            Some(row) => {
                let mut active: stock_threshold::ActiveModel = row.into();
                active.minimum_quantity = Set(minimum_quantity);
                active.updated_at = Set(now);
                Ok(active.update(&*self.db).await?)
            }
            None => {
                let row = stock_threshold::ActiveModel {
                    product_id: Set(product_id),
                    store_id: Set(store_id),
                    minimum_quantity: Set(minimum_quantity),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                };
                Ok(row.insert(&*self.db).await?)
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn list_for_store(
        &self,
        store_id: i64,
    ) -> Result<Vec<stock_threshold::Model>, ServiceError> {
        Ok(StockThreshold::find()
            .filter(stock_threshold::Column::StoreId.eq(store_id))
            .order_by_asc(stock_threshold::Column::ProductId)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, product_id: i64, store_id: Option<i64>) -> Result<(), ServiceError> {
        let existing = StockThreshold::find()
            .filter(stock_threshold::Column::ProductId.eq(product_id))
            .filter(store_filter(store_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Threshold override not found".to_string()))?;
        StockThreshold::delete_by_id(existing.id)
            .exec(&*self.db)
            .await?;
        Ok(())
    }
}
