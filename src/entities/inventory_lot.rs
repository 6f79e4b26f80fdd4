use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{Display, EnumString};

/// A receiving lot. On-hand stock for a `(product, store)` pair is the sum
/// of `quantity_in_stock` over its lots; decreases drain lots oldest-first.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub product_id: i64,
    pub store_id: i64,
    /// User that recorded the lot.
    pub created_by: i64,
    pub quantity_received: i32,
    pub quantity_in_stock: i32,
    pub quantity_spoilt: i32,
    /// "paid" or "unpaid"
    pub payment_status: String,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub buying_price: rust_decimal::Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub selling_price: rust_decimal::Decimal,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
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

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, utoipa::ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PaymentStatus {
    Paid,
    Unpaid,
}

impl Model {
    pub fn payment_status(&self) -> Option<PaymentStatus> {
        PaymentStatus::from_str(&self.payment_status).ok()
    }
}
