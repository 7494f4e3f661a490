//! 漫画目录相关表
//!
//! - comics: 漫画，带有浏览量汇总字段
//! - chapters: 章节，带有浏览量汇总字段
//! - ratings: 用户评分（1-5）

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 1. comics
        manager
            .create_table(
                Table::create()
                    .table(Comics::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Comics::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Comics::Title).string_len(255).not_null())
                    .col(ColumnDef::new(Comics::Slug).string_len(255).not_null())
                    .col(ColumnDef::new(Comics::CoverImageUrl).text().null())
                    .col(
                        ColumnDef::new(Comics::DailyViews)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Comics::WeeklyViews)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Comics::MonthlyViews)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Comics::TotalViews)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Comics::TotalFavorites)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Comics::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Comics::UpdatedAt)
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
                    .name("idx_comics_slug")
                    .table(Comics::Table)
                    .col(Comics::Slug)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 排行榜排序字段索引
        for (name, col) in [
            ("idx_comics_daily_views", Comics::DailyViews),
            ("idx_comics_weekly_views", Comics::WeeklyViews),
            ("idx_comics_monthly_views", Comics::MonthlyViews),
            ("idx_comics_total_views", Comics::TotalViews),
            ("idx_comics_total_favorites", Comics::TotalFavorites),
            ("idx_comics_updated_at", Comics::UpdatedAt),
        ] {
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name(name)
                        .table(Comics::Table)
                        .col(col)
                        .to_owned(),
                )
                .await?;
        }

        // 2. chapters
        manager
            .create_table(
                Table::create()
                    .table(Chapters::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Chapters::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Chapters::ComicId).big_integer().not_null())
                    .col(ColumnDef::new(Chapters::Title).string_len(255).not_null())
                    .col(ColumnDef::new(Chapters::ChapterNumber).double().not_null())
                    .col(
                        ColumnDef::new(Chapters::DailyViews)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Chapters::WeeklyViews)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Chapters::MonthlyViews)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Chapters::ViewCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Chapters::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Chapters::UpdatedAt)
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
                    .name("idx_chapters_comic_id")
                    .table(Chapters::Table)
                    .col(Chapters::ComicId)
                    .to_owned(),
            )
            .await?;

        // 3. ratings
        manager
            .create_table(
                Table::create()
                    .table(Ratings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Ratings::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Ratings::ComicId).big_integer().not_null())
                    .col(ColumnDef::new(Ratings::UserId).big_integer().not_null())
                    .col(ColumnDef::new(Ratings::Rating).integer().not_null())
                    .col(
                        ColumnDef::new(Ratings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 每个用户对每部漫画只能评分一次
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_ratings_comic_user")
                    .table(Ratings::Table)
                    .col(Ratings::ComicId)
                    .col(Ratings::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Ratings::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Chapters::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Comics::Table).if_exists().to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Comics {
    Table,
    Id,
    Title,
    Slug,
    CoverImageUrl,
    DailyViews,
    WeeklyViews,
    MonthlyViews,
    TotalViews,
    TotalFavorites,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Chapters {
    Table,
    Id,
    ComicId,
    Title,
    ChapterNumber,
    DailyViews,
    WeeklyViews,
    MonthlyViews,
    ViewCount,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Ratings {
    Table,
    Id,
    ComicId,
    UserId,
    Rating,
    CreatedAt,
}
