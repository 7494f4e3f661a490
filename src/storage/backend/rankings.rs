//! 排行查询
//!
//! 过滤条件与排序字段由 RankingPolicy 决定，评分数通过相关子查询计算。

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, Condition, EntityTrait, ExprTrait, FromQueryResult,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, TransactionTrait,
    sea_query::Expr,
};
use tracing::debug;

use super::SeaOrmStorage;
use crate::errors::Result;
use crate::storage::models::{
    RankedComic, RankingCategory, RankingPeriod, RankingPolicy, RatingSummary, SortKey,
};
use crate::storage::traits::RankingStore;

use migration::entities::{comic, ranking_snapshot, rating};

const RATING_COUNT_SQL: &str =
    "(SELECT COUNT(*) FROM ratings WHERE ratings.comic_id = comics.id)";
const HAS_RATING_SQL: &str = "EXISTS (SELECT 1 FROM ratings WHERE ratings.comic_id = comics.id)";

/// 单次 INSERT 的最大行数
const INSERT_CHUNK: usize = 100;

#[derive(Debug, FromQueryResult)]
struct RatingBucketRow {
    comic_id: i64,
    rating: i32,
    count: i64,
}

fn sort_expr(key: SortKey) -> Expr {
    match key {
        SortKey::DailyViews => Expr::col(comic::Column::DailyViews),
        SortKey::WeeklyViews => Expr::col(comic::Column::WeeklyViews),
        SortKey::MonthlyViews => Expr::col(comic::Column::MonthlyViews),
        SortKey::TotalViews => Expr::col(comic::Column::TotalViews),
        SortKey::TotalFavorites => Expr::col(comic::Column::TotalFavorites),
        SortKey::RatingCount => Expr::cust(RATING_COUNT_SQL),
    }
}

fn policy_condition(policy: &RankingPolicy) -> Condition {
    let mut cond = Condition::all();
    if let Some(key) = policy.positive {
        cond = cond.add(match key {
            SortKey::RatingCount => Expr::cust(HAS_RATING_SQL),
            other => sort_expr(other).gt(0),
        });
    }
    if policy.require_rating {
        cond = cond.add(Expr::cust(HAS_RATING_SQL));
    }
    if let Some(since) = policy.updated_since {
        cond = cond.add(comic::Column::UpdatedAt.gte(since));
    }
    cond
}

fn filtered(policy: &RankingPolicy) -> Select<comic::Entity> {
    comic::Entity::find().filter(policy_condition(policy))
}

fn to_count(value: i64) -> u64 {
    Ord::max(value, 0) as u64
}

impl From<comic::Model> for RankedComic {
    fn from(m: comic::Model) -> Self {
        Self {
            id: m.id,
            title: m.title,
            slug: m.slug,
            cover_image_url: m.cover_image_url,
            daily_views: to_count(m.daily_views),
            weekly_views: to_count(m.weekly_views),
            monthly_views: to_count(m.monthly_views),
            total_views: to_count(m.total_views),
            total_favorites: to_count(m.total_favorites),
        }
    }
}

#[async_trait]
impl RankingStore for SeaOrmStorage {
    async fn query_ranked(
        &self,
        policy: &RankingPolicy,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<RankedComic>> {
        // 同分时按总浏览量、再按 id 打破平局，保证分页稳定
        let rows = filtered(policy)
            .order_by_desc(sort_expr(policy.sort))
            .order_by_desc(comic::Column::TotalViews)
            .order_by_asc(comic::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(&self.db)
            .await?;

        debug!(
            "Ranking query returned {} rows (offset {}, limit {})",
            rows.len(),
            offset,
            limit
        );
        Ok(rows.into_iter().map(RankedComic::from).collect())
    }

    async fn count_ranked(&self, policy: &RankingPolicy) -> Result<u64> {
        Ok(filtered(policy).count(&self.db).await?)
    }

    async fn rating_summaries(&self, comic_ids: &[i64]) -> Result<HashMap<i64, RatingSummary>> {
        if comic_ids.is_empty() {
            return Ok(HashMap::new());
        }

        // 按 (comic_id, rating) 分组计数后在内存里求和，避免各数据库 SUM 返回类型不一致
        let buckets = rating::Entity::find()
            .select_only()
            .column(rating::Column::ComicId)
            .column(rating::Column::Rating)
            .column_as(rating::Column::Id.count(), "count")
            .filter(rating::Column::ComicId.is_in(comic_ids.iter().copied()))
            .group_by(rating::Column::ComicId)
            .group_by(rating::Column::Rating)
            .into_model::<RatingBucketRow>()
            .all(&self.db)
            .await?;

        let mut summaries: HashMap<i64, RatingSummary> = HashMap::new();
        for row in buckets {
            let count = to_count(row.count);
            let entry = summaries.entry(row.comic_id).or_default();
            entry.count += count;
            entry.sum += count * Ord::max(row.rating, 0) as u64;
        }
        Ok(summaries)
    }

    async fn previous_ranks(
        &self,
        category: RankingCategory,
        period: RankingPeriod,
        comic_ids: &[i64],
    ) -> Result<(HashMap<i64, u32>, bool)> {
        let scope = Condition::all()
            .add(ranking_snapshot::Column::Category.eq(category.as_ref()))
            .add(ranking_snapshot::Column::Period.eq(period.as_ref()));

        let has_capture = ranking_snapshot::Entity::find()
            .filter(scope.clone())
            .count(&self.db)
            .await?
            > 0;

        if !has_capture || comic_ids.is_empty() {
            return Ok((HashMap::new(), has_capture));
        }

        let rows = ranking_snapshot::Entity::find()
            .filter(scope)
            .filter(ranking_snapshot::Column::ComicId.is_in(comic_ids.iter().copied()))
            .all(&self.db)
            .await?;

        let ranks = rows
            .into_iter()
            .map(|r| (r.comic_id, Ord::max(r.rank, 0) as u32))
            .collect();
        Ok((ranks, true))
    }

    async fn replace_rank_snapshot(
        &self,
        category: RankingCategory,
        period: RankingPeriod,
        ranks: &[(i64, u32)],
        captured_at: DateTime<Utc>,
    ) -> Result<()> {
        let txn = self.db.begin().await?;

        ranking_snapshot::Entity::delete_many()
            .filter(ranking_snapshot::Column::Category.eq(category.as_ref()))
            .filter(ranking_snapshot::Column::Period.eq(period.as_ref()))
            .exec(&txn)
            .await?;

        for chunk in ranks.chunks(INSERT_CHUNK) {
            let models = chunk.iter().map(|(comic_id, rank)| ranking_snapshot::ActiveModel {
                category: Set(category.as_ref().to_string()),
                period: Set(period.as_ref().to_string()),
                comic_id: Set(*comic_id),
                rank: Set(*rank as i32),
                captured_at: Set(captured_at),
                ..Default::default()
            });
            ranking_snapshot::Entity::insert_many(models)
                .exec_without_returning(&txn)
                .await?;
        }

        txn.commit().await?;
        debug!(
            "Captured {} ranking positions for {}/{}",
            ranks.len(),
            category,
            period
        );
        Ok(())
    }
}
