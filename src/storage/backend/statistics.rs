//! 浏览统计相关的数据库读写
//!
//! ViewStatsStore 的 SeaORM 实现：窗口计数、汇总字段写回、
//! 每日快照 upsert 与清理。

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, EntityTrait, ExprTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
    sea_query::{Expr, OnConflict},
};
use tracing::debug;

use super::{SeaOrmStorage, retry};
use crate::errors::Result;
use crate::storage::models::{EntityType, SnapshotPoint, StoredStatistics, ViewStatistics};
use crate::storage::traits::ViewStatsStore;

use migration::entities::{chapter, comic, view_event, view_statistics_snapshot};

fn to_count(value: i64) -> u64 {
    Ord::max(value, 0) as u64
}

#[async_trait]
impl ViewStatsStore for SeaOrmStorage {
    async fn count_events(
        &self,
        entity_type: EntityType,
        entity_id: i64,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<u64> {
        let count = view_event::Entity::find()
            .filter(view_event::Column::EntityType.eq(entity_type.as_ref()))
            .filter(view_event::Column::EntityId.eq(entity_id))
            .filter(view_event::Column::ViewedAt.gte(since))
            .filter(view_event::Column::ViewedAt.lte(until))
            .count(&self.db)
            .await?;
        Ok(count)
    }

    async fn entity_ids(&self, entity_type: EntityType) -> Result<Vec<i64>> {
        let ids = match entity_type {
            EntityType::Comic => {
                comic::Entity::find()
                    .select_only()
                    .column(comic::Column::Id)
                    .order_by_asc(comic::Column::Id)
                    .into_tuple::<i64>()
                    .all(&self.db)
                    .await?
            }
            EntityType::Chapter => {
                chapter::Entity::find()
                    .select_only()
                    .column(chapter::Column::Id)
                    .order_by_asc(chapter::Column::Id)
                    .into_tuple::<i64>()
                    .all(&self.db)
                    .await?
            }
        };
        Ok(ids)
    }

    async fn entity_exists(&self, entity_type: EntityType, entity_id: i64) -> Result<bool> {
        let count = match entity_type {
            EntityType::Comic => {
                comic::Entity::find_by_id(entity_id)
                    .count(&self.db)
                    .await?
            }
            EntityType::Chapter => {
                chapter::Entity::find_by_id(entity_id)
                    .count(&self.db)
                    .await?
            }
        };
        Ok(count > 0)
    }

    async fn stored_statistics(
        &self,
        entity_type: EntityType,
        entity_id: i64,
    ) -> Result<Option<StoredStatistics>> {
        let stats = match entity_type {
            EntityType::Comic => comic::Entity::find_by_id(entity_id)
                .one(&self.db)
                .await?
                .map(|m| StoredStatistics {
                    daily_views: to_count(m.daily_views),
                    weekly_views: to_count(m.weekly_views),
                    monthly_views: to_count(m.monthly_views),
                    total_views: to_count(m.total_views),
                }),
            EntityType::Chapter => chapter::Entity::find_by_id(entity_id)
                .one(&self.db)
                .await?
                .map(|m| StoredStatistics {
                    daily_views: to_count(m.daily_views),
                    weekly_views: to_count(m.weekly_views),
                    monthly_views: to_count(m.monthly_views),
                    total_views: to_count(m.view_count),
                }),
        };
        Ok(stats)
    }

    async fn write_aggregate_fields(
        &self,
        entity_type: EntityType,
        entity_id: i64,
        stats: &ViewStatistics,
    ) -> Result<()> {
        let db = &self.db;
        let daily = stats.daily_views as i64;
        let weekly = stats.weekly_views as i64;
        let monthly = stats.monthly_views as i64;

        // 只改三个窗口字段，不动 updated_at（trending 依赖它判断内容是否有更新）
        retry::with_retry("write_aggregate_fields", self.retry_config, || async {
            match entity_type {
                EntityType::Comic => comic::Entity::update_many()
                    .col_expr(comic::Column::DailyViews, Expr::value(daily))
                    .col_expr(comic::Column::WeeklyViews, Expr::value(weekly))
                    .col_expr(comic::Column::MonthlyViews, Expr::value(monthly))
                    .filter(comic::Column::Id.eq(entity_id))
                    .exec(db)
                    .await
                    .map(|_| ()),
                EntityType::Chapter => chapter::Entity::update_many()
                    .col_expr(chapter::Column::DailyViews, Expr::value(daily))
                    .col_expr(chapter::Column::WeeklyViews, Expr::value(weekly))
                    .col_expr(chapter::Column::MonthlyViews, Expr::value(monthly))
                    .filter(chapter::Column::Id.eq(entity_id))
                    .exec(db)
                    .await
                    .map(|_| ()),
            }
        })
        .await?;

        debug!(
            "Aggregate fields written for {} {}: {}/{}/{}",
            entity_type, entity_id, daily, weekly, monthly
        );
        Ok(())
    }

    async fn upsert_snapshot(
        &self,
        entity_type: EntityType,
        entity_id: i64,
        date: NaiveDate,
        stats: &ViewStatistics,
    ) -> Result<()> {
        let db = &self.db;
        let now = Utc::now();
        let model = view_statistics_snapshot::ActiveModel {
            entity_type: Set(entity_type.as_ref().to_string()),
            entity_id: Set(entity_id),
            date: Set(date),
            daily_views: Set(stats.daily_views as i64),
            weekly_views: Set(stats.weekly_views as i64),
            monthly_views: Set(stats.monthly_views as i64),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        // 同一天重复运行时覆盖数值，保留 created_at
        let on_conflict = OnConflict::columns([
            view_statistics_snapshot::Column::EntityType,
            view_statistics_snapshot::Column::EntityId,
            view_statistics_snapshot::Column::Date,
        ])
        .update_columns([
            view_statistics_snapshot::Column::DailyViews,
            view_statistics_snapshot::Column::WeeklyViews,
            view_statistics_snapshot::Column::MonthlyViews,
            view_statistics_snapshot::Column::UpdatedAt,
        ])
        .to_owned();

        retry::with_retry("upsert_snapshot", self.retry_config, || async {
            view_statistics_snapshot::Entity::insert(model.clone())
                .on_conflict(on_conflict.clone())
                .exec_without_returning(db)
                .await
        })
        .await?;

        Ok(())
    }

    async fn delete_snapshots_before(&self, cutoff: NaiveDate) -> Result<u64> {
        let deleted = view_statistics_snapshot::Entity::delete_many()
            .filter(view_statistics_snapshot::Column::Date.lt(cutoff))
            .exec(&self.db)
            .await?
            .rows_affected;
        Ok(deleted)
    }

    async fn snapshot_history(
        &self,
        entity_type: EntityType,
        entity_id: i64,
        since: NaiveDate,
    ) -> Result<Vec<SnapshotPoint>> {
        let rows = view_statistics_snapshot::Entity::find()
            .filter(view_statistics_snapshot::Column::EntityType.eq(entity_type.as_ref()))
            .filter(view_statistics_snapshot::Column::EntityId.eq(entity_id))
            .filter(view_statistics_snapshot::Column::Date.gte(since))
            .order_by_asc(view_statistics_snapshot::Column::Date)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|r| SnapshotPoint {
                date: r.date,
                daily_views: to_count(r.daily_views),
                weekly_views: to_count(r.weekly_views),
                monthly_views: to_count(r.monthly_views),
            })
            .collect())
    }

    async fn record_view(
        &self,
        entity_type: EntityType,
        entity_id: i64,
        viewed_at: DateTime<Utc>,
    ) -> Result<()> {
        let txn = self.db.begin().await?;

        let event = view_event::ActiveModel {
            entity_type: Set(entity_type.as_ref().to_string()),
            entity_id: Set(entity_id),
            viewed_at: Set(viewed_at),
            ..Default::default()
        };
        view_event::Entity::insert(event)
            .exec_without_returning(&txn)
            .await?;

        match entity_type {
            EntityType::Comic => {
                comic::Entity::update_many()
                    .col_expr(
                        comic::Column::TotalViews,
                        Expr::col(comic::Column::TotalViews).add(1),
                    )
                    .filter(comic::Column::Id.eq(entity_id))
                    .exec(&txn)
                    .await?;
            }
            EntityType::Chapter => {
                chapter::Entity::update_many()
                    .col_expr(
                        chapter::Column::ViewCount,
                        Expr::col(chapter::Column::ViewCount).add(1),
                    )
                    .filter(chapter::Column::Id.eq(entity_id))
                    .exec(&txn)
                    .await?;
            }
        }

        txn.commit().await?;
        Ok(())
    }
}
