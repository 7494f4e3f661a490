//! 排行名次快照表
//!
//! 每次全量聚合前记录各 (category, period) 的名次，
//! 排行查询据此计算 previous_rank 和 trend_direction。

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RankingSnapshots::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RankingSnapshots::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RankingSnapshots::Category)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RankingSnapshots::Period)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RankingSnapshots::ComicId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RankingSnapshots::Rank).integer().not_null())
                    .col(
                        ColumnDef::new(RankingSnapshots::CapturedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_ranking_snapshots_key")
                    .table(RankingSnapshots::Table)
                    .col(RankingSnapshots::Category)
                    .col(RankingSnapshots::Period)
                    .col(RankingSnapshots::ComicId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(RankingSnapshots::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum RankingSnapshots {
    Table,
    Id,
    Category,
    Period,
    ComicId,
    Rank,
    CapturedAt,
}
