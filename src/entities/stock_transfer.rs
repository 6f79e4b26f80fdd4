use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_transfers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub product_id: i64,
    pub from_store_id: i64,
    pub to_store_id: i64,
    pub created_by: i64,
    pub quantity: i32,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub buying_price: rust_decimal::Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub selling_price: rust_decimal::Decimal,
    /// One of the `TransferStatus` wire names.
    pub status: String,
    pub completed_at: Option<DateTime<Utc>>,
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
        from = "Column::FromStoreId",
        to = "super::store::Column::Id"
    )]
    FromStore,
    #[sea_orm(
        belongs_to = "super::store::Entity",
        from = "Column::ToStoreId",
        to = "super::store::Column::Id"
    )]
    ToStore,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, utoipa::ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TransferStatus {
    Pending,
    Approved,
    Completed,
    Cancelled,
}

impl TransferStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    pub fn can_transition(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved)
                | (Self::Pending, Self::Cancelled)
                | (Self::Approved, Self::Completed)
                | (Self::Approved, Self::Cancelled)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::TransferStatus::*;

    #[test]
    fn transfer_must_be_approved_before_completion() {
        assert!(!Pending.can_transition(Completed));
        assert!(Pending.can_transition(Approved));
        assert!(Approved.can_transition(Completed));
    }

    #[test]
    fn cancelled_and_completed_are_final() {
        for next in [Pending, Approved, Completed, Cancelled] {
            assert!(!Completed.can_transition(next));
            assert!(!Cancelled.can_transition(next));
        }
    }
}
