use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchase_orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub store_id: i64,
    pub supplier_id: i64,
    pub created_by: i64,
    /// One of the `PurchaseOrderStatus` wire names.
    pub status: String,
    pub notes: Option<String>,
    pub received_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::store::Entity",
        from = "Column::StoreId",
        to = "super::store::Column::Id"
    )]
    Store,
    #[sea_orm(
        belongs_to = "super::supplier::Entity",
        from = "Column::SupplierId",
        to = "super::supplier::Column::Id"
    )]
    Supplier,
    #[sea_orm(has_many = "super::purchase_order_item::Entity")]
    Items,
}

impl Related<super::store::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Store.def()
    }
}

impl Related<super::supplier::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Supplier.def()
    }
}

impl Related<super::purchase_order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, utoipa::ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PurchaseOrderStatus {
    Draft,
    Sent,
    Received,
    Cancelled,
}

impl PurchaseOrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Received | Self::Cancelled)
    }

    pub fn can_transition(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Draft, Self::Sent)
                | (Self::Draft, Self::Received)
                | (Self::Draft, Self::Cancelled)
                | (Self::Sent, Self::Received)
                | (Self::Sent, Self::Cancelled)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::PurchaseOrderStatus::*;

    #[test]
    fn received_and_cancelled_are_terminal() {
        assert!(!Draft.is_terminal());
        assert!(!Sent.is_terminal());
        assert!(Received.is_terminal());
        assert!(Cancelled.is_terminal());
    }

    #[test]
    fn no_transitions_out_of_terminal_states() {
        for next in [Draft, Sent, Received, Cancelled] {
            assert!(!Received.can_transition(next));
            assert!(!Cancelled.can_transition(next));
        }
    }

    #[test]
    fn draft_can_be_sent_received_or_cancelled() {
        assert!(Draft.can_transition(Sent));
        assert!(Draft.can_transition(Received));
        assert!(Draft.can_transition(Cancelled));
        assert!(!Sent.can_transition(Draft));
    }
}
