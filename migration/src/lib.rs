pub use sea_orm_migration::prelude::*;

pub mod entities;
mod m20260301_000001_catalog_tables;
mod m20260301_000002_view_events;
mod m20260302_000001_view_statistics_snapshots;
mod m20260303_000001_ranking_snapshots;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_catalog_tables::Migration),
            Box::new(m20260301_000002_view_events::Migration),
            Box::new(m20260302_000001_view_statistics_snapshots::Migration),
            Box::new(m20260303_000001_ranking_snapshots::Migration),
        ]
    }
}
