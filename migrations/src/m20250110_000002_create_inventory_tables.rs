use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20250110_000002_create_inventory_tables"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Inventory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Inventory::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Inventory::ProductId).big_integer().not_null())
                    .col(ColumnDef::new(Inventory::StoreId).big_integer().not_null())
                    .col(ColumnDef::new(Inventory::CreatedBy).big_integer().not_null())
                    .col(
                        ColumnDef::new(Inventory::QuantityReceived)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Inventory::QuantityInStock)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Inventory::QuantitySpoilt)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Inventory::PaymentStatus)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Inventory::BuyingPrice)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Inventory::SellingPrice)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Inventory::Remarks).text().null())
                    .col(
                        ColumnDef::new(Inventory::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Inventory::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_product")
                            .from(Inventory::Table, Inventory::ProductId)
                            .to(Products::Table, Products::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_store")
                            .from(Inventory::Table, Inventory::StoreId)
                            .to(Stores::Table, Stores::Id),
                    )
                    .to_owned(),
            )
            .await?;
        // FIFO drains and on-hand sums both hit this index.
        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_product_store")
                    .table(Inventory::Table)
                    .col(Inventory::ProductId)
                    .col(Inventory::StoreId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(InventoryEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryEvents::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(InventoryEvents::ProductId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryEvents::StoreId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(InventoryEvents::LotId).big_integer().null())
                    .col(
                        ColumnDef::new(InventoryEvents::EventType)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryEvents::QuantityChange)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryEvents::QuantityAfter)
                            .integer()
                            .not_null(),
                    )
                    // Set only on payment-status events.
                    .col(
                        ColumnDef::new(InventoryEvents::PreviousPaymentStatus)
                            .string_len(32)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InventoryEvents::NewPaymentStatus)
                            .string_len(32)
                            .null(),
                    )
                    .col(ColumnDef::new(InventoryEvents::Details).text().null())
                    .col(
                        ColumnDef::new(InventoryEvents::RecordedBy)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InventoryEvents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_events_product")
                            .from(InventoryEvents::Table, InventoryEvents::ProductId)
                            .to(Products::Table, Products::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_events_store")
                            .from(InventoryEvents::Table, InventoryEvents::StoreId)
                            .to(Stores::Table, Stores::Id),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_events_store_created")
                    .table(InventoryEvents::Table)
                    .col(InventoryEvents::StoreId)
                    .col(InventoryEvents::CreatedAt)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_events_product_store")
                    .table(InventoryEvents::Table)
                    .col(InventoryEvents::ProductId)
                    .col(InventoryEvents::StoreId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Notifications::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Notifications::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Notifications::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Notifications::Category)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Notifications::Title)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Notifications::Message).text().not_null())
                    .col(
                        ColumnDef::new(Notifications::RelatedId)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Notifications::ProductId)
                            .big_integer()
                            .null(),
                    )
                    .col(ColumnDef::new(Notifications::StoreId).big_integer().null())
                    .col(
                        ColumnDef::new(Notifications::IsRead)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Notifications::ReadAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Notifications::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_notifications_user")
                            .from(Notifications::Table, Notifications::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_notifications_user_read")
                    .table(Notifications::Table)
                    .col(Notifications::UserId)
                    .col(Notifications::IsRead)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(StockThresholds::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StockThresholds::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(StockThresholds::ProductId)
                            .big_integer()
                            .not_null(),
                    )
                    // Null store marks the product-wide default row.
                    .col(ColumnDef::new(StockThresholds::StoreId).big_integer().null())
                    .col(
                        ColumnDef::new(StockThresholds::MinimumQuantity)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockThresholds::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockThresholds::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_stock_thresholds_product")
                            .from(StockThresholds::Table, StockThresholds::ProductId)
                            .to(Products::Table, Products::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_stock_thresholds_store")
                            .from(StockThresholds::Table, StockThresholds::StoreId)
                            .to(Stores::Table, Stores::Id),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_stock_thresholds_product_store")
                    .table(StockThresholds::Table)
                    .col(StockThresholds::ProductId)
                    .col(StockThresholds::StoreId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(StockThresholds::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Notifications::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(InventoryEvents::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Inventory::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(Iden)]
enum Inventory {
    Table,
    Id,
    ProductId,
    StoreId,
    CreatedBy,
    QuantityReceived,
    QuantityInStock,
    QuantitySpoilt,
    PaymentStatus,
    BuyingPrice,
    SellingPrice,
    Remarks,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum InventoryEvents {
    Table,
    Id,
    ProductId,
    StoreId,
    LotId,
    EventType,
    QuantityChange,
    QuantityAfter,
    PreviousPaymentStatus,
    NewPaymentStatus,
    Details,
    RecordedBy,
    CreatedAt,
}

#[derive(Iden)]
enum Notifications {
    Table,
    Id,
    UserId,
    Category,
    Title,
    Message,
    RelatedId,
    ProductId,
    StoreId,
    IsRead,
    ReadAt,
    CreatedAt,
}

#[derive(Iden)]
enum StockThresholds {
    Table,
    Id,
    ProductId,
    StoreId,
    MinimumQuantity,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Products {
    Table,
    Id,
}

#[derive(Iden)]
enum Stores {
    Table,
    Id,
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
}
