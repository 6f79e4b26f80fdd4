use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    #[sea_orm(unique)]
    pub sku: String,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::inventory_lot::Entity")]
    InventoryLots,
    #[sea_orm(has_many = "super::stock_threshold::Entity")]
    StockThresholds,
}

impl Related<super::inventory_lot::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryLots.def()
    }
}

impl Related<super::stock_threshold::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockThresholds.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
