use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20250110_000003_create_workflow_tables"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PurchaseOrders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PurchaseOrders::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::StoreId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::SupplierId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::CreatedBy)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::Status)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(PurchaseOrders::Notes).text().null())
                    .col(
                        ColumnDef::new(PurchaseOrders::ReceivedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_purchase_orders_store")
                            .from(PurchaseOrders::Table, PurchaseOrders::StoreId)
                            .to(Stores::Table, Stores::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_purchase_orders_supplier")
                            .from(PurchaseOrders::Table, PurchaseOrders::SupplierId)
                            .to(Suppliers::Table, Suppliers::Id),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_purchase_orders_store_status")
                    .table(PurchaseOrders::Table)
                    .col(PurchaseOrders::StoreId)
                    .col(PurchaseOrders::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PurchaseOrderItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PurchaseOrderItems::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderItems::PurchaseOrderId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderItems::ProductId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderItems::Quantity)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderItems::BuyingPrice)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderItems::SellingPrice)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderItems::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_purchase_order_items_order")
                            .from(
                                PurchaseOrderItems::Table,
                                PurchaseOrderItems::PurchaseOrderId,
                            )
                            .to(PurchaseOrders::Table, PurchaseOrders::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_purchase_order_items_product")
                            .from(PurchaseOrderItems::Table, PurchaseOrderItems::ProductId)
                            .to(Products::Table, Products::Id),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_purchase_order_items_order")
                    .table(PurchaseOrderItems::Table)
                    .col(PurchaseOrderItems::PurchaseOrderId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ReturnRequests::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ReturnRequests::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ReturnRequests::StoreId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReturnRequests::ProductId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReturnRequests::CreatedBy)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReturnRequests::ReturnType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReturnRequests::Quantity)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReturnRequests::UnitPrice)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ReturnRequests::Reason).text().null())
                    .col(
                        ColumnDef::new(ReturnRequests::Status)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReturnRequests::ResolvedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ReturnRequests::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReturnRequests::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_return_requests_store")
                            .from(ReturnRequests::Table, ReturnRequests::StoreId)
                            .to(Stores::Table, Stores::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_return_requests_product")
                            .from(ReturnRequests::Table, ReturnRequests::ProductId)
                            .to(Products::Table, Products::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(StockTransfers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StockTransfers::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(StockTransfers::ProductId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockTransfers::FromStoreId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockTransfers::ToStoreId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockTransfers::CreatedBy)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockTransfers::Quantity)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockTransfers::BuyingPrice)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockTransfers::SellingPrice)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockTransfers::Status)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockTransfers::CompletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(StockTransfers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockTransfers::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_stock_transfers_product")
                            .from(StockTransfers::Table, StockTransfers::ProductId)
                            .to(Products::Table, Products::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_stock_transfers_from_store")
                            .from(StockTransfers::Table, StockTransfers::FromStoreId)
                            .to(Stores::Table, Stores::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_stock_transfers_to_store")
                            .from(StockTransfers::Table, StockTransfers::ToStoreId)
                            .to(Stores::Table, Stores::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Sales::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Sales::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Sales::ProductId).big_integer().not_null())
                    .col(ColumnDef::new(Sales::StoreId).big_integer().not_null())
                    .col(ColumnDef::new(Sales::RecordedBy).big_integer().not_null())
                    .col(ColumnDef::new(Sales::Quantity).integer().not_null())
                    .col(
                        ColumnDef::new(Sales::UnitPrice)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Sales::Total).decimal_len(16, 4).not_null())
                    .col(
                        ColumnDef::new(Sales::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sales_product")
                            .from(Sales::Table, Sales::ProductId)
                            .to(Products::Table, Products::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sales_store")
                            .from(Sales::Table, Sales::StoreId)
                            .to(Stores::Table, Stores::Id),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_sales_store_created")
                    .table(Sales::Table)
                    .col(Sales::StoreId)
                    .col(Sales::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SupplyRequests::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SupplyRequests::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SupplyRequests::ProductId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SupplyRequests::StoreId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SupplyRequests::RequestedBy)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SupplyRequests::Quantity)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SupplyRequests::Status)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(SupplyRequests::AdminNotes).text().null())
                    .col(
                        ColumnDef::new(SupplyRequests::ResolvedBy)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(SupplyRequests::ResolvedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(SupplyRequests::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SupplyRequests::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_supply_requests_product")
                            .from(SupplyRequests::Table, SupplyRequests::ProductId)
                            .to(Products::Table, Products::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_supply_requests_store")
                            .from(SupplyRequests::Table, SupplyRequests::StoreId)
                            .to(Stores::Table, Stores::Id),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_supply_requests_store_status")
                    .table(SupplyRequests::Table)
                    .col(SupplyRequests::StoreId)
                    .col(SupplyRequests::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SupplyRequests::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Sales::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(StockTransfers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ReturnRequests::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PurchaseOrderItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PurchaseOrders::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(Iden)]
enum PurchaseOrders {
    Table,
    Id,
    StoreId,
    SupplierId,
    CreatedBy,
    Status,
    Notes,
    ReceivedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum PurchaseOrderItems {
    Table,
    Id,
    PurchaseOrderId,
    ProductId,
    Quantity,
    BuyingPrice,
    SellingPrice,
    CreatedAt,
}

#[derive(Iden)]
enum ReturnRequests {
    Table,
    Id,
    StoreId,
    ProductId,
    CreatedBy,
    ReturnType,
    Quantity,
    UnitPrice,
    Reason,
    Status,
    ResolvedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum StockTransfers {
    Table,
    Id,
    ProductId,
    FromStoreId,
    ToStoreId,
    CreatedBy,
    Quantity,
    BuyingPrice,
    SellingPrice,
    Status,
    CompletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Sales {
    Table,
    Id,
    ProductId,
    StoreId,
    RecordedBy,
    Quantity,
    UnitPrice,
    Total,
    CreatedAt,
}

#[derive(Iden)]
enum SupplyRequests {
    Table,
    Id,
    ProductId,
    StoreId,
    RequestedBy,
    Quantity,
    Status,
    AdminNotes,
    ResolvedBy,
    ResolvedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Stores {
    Table,
    Id,
}

#[derive(Iden)]
enum Suppliers {
    Table,
    Id,
}

#[derive(Iden)]
enum Products {
    Table,
    Id,
}
