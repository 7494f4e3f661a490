//! 存储层接口
//!
//! 聚合核心只依赖这两个 trait，SeaOrmStorage 是默认实现，
//! 测试中可以包一层注入故障。

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::errors::Result;

use super::models::{
    EntityType, RankedComic, RankingCategory, RankingPeriod, RankingPolicy, RatingSummary,
    SnapshotPoint, StoredStatistics, ViewStatistics,
};

/// 浏览事件与汇总字段的读写
#[async_trait]
pub trait ViewStatsStore: Send + Sync {
    /// 统计 [since, until] 内的浏览事件数
    async fn count_events(
        &self,
        entity_type: EntityType,
        entity_id: i64,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<u64>;

    /// 列出某类型的全部实体 ID（升序）
    async fn entity_ids(&self, entity_type: EntityType) -> Result<Vec<i64>>;

    async fn entity_exists(&self, entity_type: EntityType, entity_id: i64) -> Result<bool>;

    /// 读取实体上已持久化的汇总字段，实体不存在时返回 None
    async fn stored_statistics(
        &self,
        entity_type: EntityType,
        entity_id: i64,
    ) -> Result<Option<StoredStatistics>>;

    /// 覆盖写入三个窗口字段（不是累加）
    async fn write_aggregate_fields(
        &self,
        entity_type: EntityType,
        entity_id: i64,
        stats: &ViewStatistics,
    ) -> Result<()>;

    /// 按 (entity_type, entity_id, date) upsert 快照
    async fn upsert_snapshot(
        &self,
        entity_type: EntityType,
        entity_id: i64,
        date: NaiveDate,
        stats: &ViewStatistics,
    ) -> Result<()>;

    /// 删除 date < cutoff 的快照，返回删除行数
    async fn delete_snapshots_before(&self, cutoff: NaiveDate) -> Result<u64>;

    /// 读取 date >= since 的快照（按日期升序）
    async fn snapshot_history(
        &self,
        entity_type: EntityType,
        entity_id: i64,
        since: NaiveDate,
    ) -> Result<Vec<SnapshotPoint>>;

    /// 追加一条浏览事件并累加总浏览量
    async fn record_view(
        &self,
        entity_type: EntityType,
        entity_id: i64,
        viewed_at: DateTime<Utc>,
    ) -> Result<()>;
}

/// 排行查询
#[async_trait]
pub trait RankingStore: Send + Sync {
    /// 按规则过滤、排序、分页
    async fn query_ranked(
        &self,
        policy: &RankingPolicy,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<RankedComic>>;

    /// 满足过滤条件的总数
    async fn count_ranked(&self, policy: &RankingPolicy) -> Result<u64>;

    /// 指定漫画的评分汇总（没有评分的漫画不在结果中）
    async fn rating_summaries(&self, comic_ids: &[i64]) -> Result<HashMap<i64, RatingSummary>>;

    /// 上一次记录的名次，第二项表示该 (category, period) 是否有过记录
    async fn previous_ranks(
        &self,
        category: RankingCategory,
        period: RankingPeriod,
        comic_ids: &[i64],
    ) -> Result<(HashMap<i64, u32>, bool)>;

    /// 用新的名次整体替换某 (category, period) 的记录
    async fn replace_rank_snapshot(
        &self,
        category: RankingCategory,
        period: RankingPeriod,
        ranks: &[(i64, u32)],
        captured_at: DateTime<Utc>,
    ) -> Result<()>;
}
