pub use sea_orm_migration::prelude::*;

mod m20250110_000001_create_identity_tables;
mod m20250110_000002_create_inventory_tables;
mod m20250110_000003_create_workflow_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250110_000001_create_identity_tables::Migration),
            Box::new(m20250110_000002_create_inventory_tables::Migration),
            Box::new(m20250110_000003_create_workflow_tables::Migration),
        ]
    }
}
