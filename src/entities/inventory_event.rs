use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Append-only stock timeline. Rows are never updated or deleted.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub product_id: i64,
    pub store_id: i64,
    /// Lot touched by the movement, if any.
    pub lot_id: Option<i64>,
    /// One of the `EventType` wire names.
    pub event_type: String,
    /// Signed quantity delta; negative for stock leaving the store.
    pub quantity_change: i32,
    /// On-hand total for the `(product, store)` pair after this event.
    pub quantity_after: i32,
    /// Old/new payment status, set only on payment-status events.
    pub previous_payment_status: Option<String>,
    pub new_payment_status: Option<String>,
    pub details: Option<String>,
    pub recorded_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
    #[sea_orm(
        belongs_to = "super::store::Entity",
        from = "Column::StoreId",
        to = "super::store::Column::Id"
    )]
    Store,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::store::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Store.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventType {
    Created,
    Updated,
    Deleted,
    PaymentStatusUpdated,
    PurchaseOrderReceived,
    StockTransferIn,
    StockTransferOut,
    ReturnCustomer,
    ReturnSupplier,
    SaleRecorded,
}
