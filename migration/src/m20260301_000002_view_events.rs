//! 浏览事件表
//!
//! 每次浏览一行，只追加不修改。聚合任务按时间窗口 COUNT。

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ViewEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ViewEvents::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ViewEvents::EntityType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ViewEvents::EntityId).big_integer().not_null())
                    .col(
                        ColumnDef::new(ViewEvents::ViewedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 复合索引：窗口计数走 (entity_type, entity_id, viewed_at)
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_view_events_entity_time")
                    .table(ViewEvents::Table)
                    .col(ViewEvents::EntityType)
                    .col(ViewEvents::EntityId)
                    .col(ViewEvents::ViewedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_view_events_viewed_at")
                    .table(ViewEvents::Table)
                    .col(ViewEvents::ViewedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ViewEvents::Table).if_exists().to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ViewEvents {
    Table,
    Id,
    EntityType,
    EntityId,
    ViewedAt,
}
