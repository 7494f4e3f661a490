//! 每日浏览统计快照表
//!
//! (entity_type, entity_id, date) 唯一，重复运行同一天时覆盖更新。

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ViewStatisticsSnapshots::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ViewStatisticsSnapshots::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ViewStatisticsSnapshots::EntityType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ViewStatisticsSnapshots::EntityId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ViewStatisticsSnapshots::Date)
                            .date()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ViewStatisticsSnapshots::DailyViews)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ViewStatisticsSnapshots::WeeklyViews)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ViewStatisticsSnapshots::MonthlyViews)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ViewStatisticsSnapshots::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ViewStatisticsSnapshots::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 唯一索引：upsert 的冲突目标
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_snapshots_entity_date")
                    .table(ViewStatisticsSnapshots::Table)
                    .col(ViewStatisticsSnapshots::EntityType)
                    .col(ViewStatisticsSnapshots::EntityId)
                    .col(ViewStatisticsSnapshots::Date)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 索引：date（用于保留期清理）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_snapshots_date")
                    .table(ViewStatisticsSnapshots::Table)
                    .col(ViewStatisticsSnapshots::Date)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(ViewStatisticsSnapshots::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum ViewStatisticsSnapshots {
    Table,
    Id,
    EntityType,
    EntityId,
    Date,
    DailyViews,
    WeeklyViews,
    MonthlyViews,
    CreatedAt,
    UpdatedAt,
}
