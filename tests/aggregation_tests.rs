//! 聚合任务集成测试
//!
//! 覆盖窗口独立计数、重复聚合幂等、快照 upsert、快照清理、
//! 批内故障隔离，以及从浏览事件到排行结果的完整流程。

mod common;

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

use mangarank::analytics::{
    AggregationJob, AggregationScheduler, AggregationSettings, StatisticsCalculator,
};
use mangarank::config::AggregationConfig;
use mangarank::errors::{AppError, Result};
use mangarank::runtime::lifetime::startup::StartupContext;
use mangarank::services::RankingQuery;
use mangarank::storage::{
    EntityType, SeaOrmStorage, SnapshotPoint, StoredStatistics, ViewStatistics, ViewStatsStore,
};
use migration::entities::view_statistics_snapshot;

use common::{ComicSeed, create_temp_storage, insert_chapter, insert_comic, insert_views, load_comic};

fn fast_settings() -> AggregationSettings {
    AggregationSettings {
        batch_size: 10,
        batch_delay: StdDuration::from_millis(1),
        snapshot_retention_days: 90,
    }
}

/// 对指定实体的读取、指定类型的枚举注入故障，其余调用转发给真实存储
struct FaultyStore {
    inner: Arc<SeaOrmStorage>,
    failing_id: i64,
    failing_listing: Option<EntityType>,
}

#[async_trait]
impl ViewStatsStore for FaultyStore {
    async fn count_events(
        &self,
        entity_type: EntityType,
        entity_id: i64,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<u64> {
        if entity_id == self.failing_id {
            return Err(AppError::database_operation("simulated read failure"));
        }
        self.inner
            .count_events(entity_type, entity_id, since, until)
            .await
    }

    async fn entity_ids(&self, entity_type: EntityType) -> Result<Vec<i64>> {
        if self.failing_listing == Some(entity_type) {
            return Err(AppError::database_operation("simulated listing failure"));
        }
        self.inner.entity_ids(entity_type).await
    }

    async fn entity_exists(&self, entity_type: EntityType, entity_id: i64) -> Result<bool> {
        self.inner.entity_exists(entity_type, entity_id).await
    }

    async fn stored_statistics(
        &self,
        entity_type: EntityType,
        entity_id: i64,
    ) -> Result<Option<StoredStatistics>> {
        self.inner.stored_statistics(entity_type, entity_id).await
    }

    async fn write_aggregate_fields(
        &self,
        entity_type: EntityType,
        entity_id: i64,
        stats: &ViewStatistics,
    ) -> Result<()> {
        self.inner
            .write_aggregate_fields(entity_type, entity_id, stats)
            .await
    }

    async fn upsert_snapshot(
        &self,
        entity_type: EntityType,
        entity_id: i64,
        date: NaiveDate,
        stats: &ViewStatistics,
    ) -> Result<()> {
        self.inner
            .upsert_snapshot(entity_type, entity_id, date, stats)
            .await
    }

    async fn delete_snapshots_before(&self, cutoff: NaiveDate) -> Result<u64> {
        self.inner.delete_snapshots_before(cutoff).await
    }

    async fn snapshot_history(
        &self,
        entity_type: EntityType,
        entity_id: i64,
        since: NaiveDate,
    ) -> Result<Vec<SnapshotPoint>> {
        self.inner
            .snapshot_history(entity_type, entity_id, since)
            .await
    }

    async fn record_view(
        &self,
        entity_type: EntityType,
        entity_id: i64,
        viewed_at: DateTime<Utc>,
    ) -> Result<()> {
        self.inner
            .record_view(entity_type, entity_id, viewed_at)
            .await
    }
}

#[tokio::test]
async fn test_window_independence_against_sqlite() {
    let (storage, _td) = create_temp_storage("window_independence").await;
    let db = storage.get_db();
    let now = Utc::now();

    insert_comic(db, ComicSeed::new(1)).await;
    // 20 小时前的浏览同时计入三个窗口
    insert_views(db, "comic", 1, now - Duration::hours(20), 1).await;
    insert_views(db, "comic", 1, now - Duration::days(3), 2).await;
    insert_views(db, "comic", 1, now - Duration::days(12), 4).await;
    insert_views(db, "comic", 1, now - Duration::days(40), 8).await;
    // 同 ID 的章节事件不能串到漫画上
    insert_views(db, "chapter", 1, now - Duration::hours(1), 16).await;

    let calc = StatisticsCalculator::new(storage.clone());
    let stats = calc
        .try_calculate_at(EntityType::Comic, 1, now)
        .await
        .unwrap();

    assert_eq!(
        stats,
        ViewStatistics {
            daily_views: 1,
            weekly_views: 3,
            monthly_views: 7,
        }
    );
}

#[tokio::test]
async fn test_update_entity_is_idempotent_overwrite() {
    let (storage, _td) = create_temp_storage("idempotent").await;
    let db = storage.get_db();
    let now = Utc::now();

    // 预置一个错误的旧值，聚合必须覆盖而不是累加
    insert_comic(
        db,
        ComicSeed {
            daily: 999,
            weekly: 999,
            monthly: 999,
            total: 10,
            updated_days_ago: 3,
            ..ComicSeed::new(7)
        },
    )
    .await;
    insert_views(db, "comic", 7, now - Duration::hours(2), 3).await;

    let job = AggregationJob::new(storage.clone(), fast_settings());
    let first = job.update_entity(EntityType::Comic, 7).await.unwrap();
    let second = job.update_entity(EntityType::Comic, 7).await.unwrap();
    assert_eq!(first, second);

    let comic = load_comic(db, 7).await;
    assert_eq!(comic.daily_views, 3);
    assert_eq!(comic.weekly_views, 3);
    assert_eq!(comic.monthly_views, 3);
    // 写回不动 total_views 和 updated_at
    assert_eq!(comic.total_views, 10);
    assert!(comic.updated_at < now - Duration::days(2));
}

#[tokio::test]
async fn test_batch_fault_isolation() {
    let (storage, _td) = create_temp_storage("fault_isolation").await;
    let db = storage.get_db();
    let now = Utc::now();

    for id in 1..=10 {
        insert_comic(
            db,
            ComicSeed {
                daily: 77,
                weekly: 77,
                monthly: 77,
                ..ComicSeed::new(id)
            },
        )
        .await;
        insert_views(db, "comic", id, now - Duration::hours(1), id as usize).await;
    }

    let store = Arc::new(FaultyStore {
        inner: storage.clone(),
        failing_id: 5,
        failing_listing: None,
    });
    let job = AggregationJob::new(store, fast_settings());
    let report = job.update_all_for_type(EntityType::Comic).await;

    assert!(report.success);
    assert_eq!(report.processed.comics, 9);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].starts_with("comic 5"));

    for id in 1..=10 {
        let comic = load_comic(db, id).await;
        if id == 5 {
            // 计算失败时保留上一次的值
            assert_eq!(comic.daily_views, 77);
        } else {
            assert_eq!(comic.daily_views, id);
            assert_eq!(comic.monthly_views, id);
        }
    }
}

#[tokio::test]
async fn test_snapshot_upsert_keeps_single_row() {
    let (storage, _td) = create_temp_storage("snapshot_upsert").await;
    let db = storage.get_db();
    let now = Utc::now();
    let today = now.date_naive();

    insert_comic(db, ComicSeed::new(3)).await;
    insert_views(db, "comic", 3, now - Duration::hours(1), 2).await;

    let job = AggregationJob::new(storage.clone(), fast_settings());
    job.store_daily_snapshot(EntityType::Comic, 3, today)
        .await
        .unwrap();

    insert_views(db, "comic", 3, now - Duration::hours(1), 3).await;
    job.store_daily_snapshot(EntityType::Comic, 3, today)
        .await
        .unwrap();

    let rows = view_statistics_snapshot::Entity::find()
        .filter(view_statistics_snapshot::Column::EntityId.eq(3))
        .all(db)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].date, today);
    assert_eq!(rows[0].daily_views, 5);
    assert_eq!(rows[0].weekly_views, 5);
}

#[tokio::test]
async fn test_store_all_snapshots_covers_comics_and_chapters() {
    let (storage, _td) = create_temp_storage("all_snapshots").await;
    let db = storage.get_db();
    let today = Utc::now().date_naive();

    insert_comic(db, ComicSeed::new(1)).await;
    insert_comic(db, ComicSeed::new(2)).await;
    insert_chapter(db, 10, 1).await;

    let job = AggregationJob::new(storage.clone(), fast_settings());
    let report = job.store_all_snapshots(today).await;

    assert!(report.success);
    assert_eq!(report.processed.comics, 2);
    assert_eq!(report.processed.chapters, 1);
    let count = view_statistics_snapshot::Entity::find()
        .count(db)
        .await
        .unwrap();
    assert_eq!(count, 3);
}

#[tokio::test]
async fn test_cleanup_old_snapshots() {
    let (storage, _td) = create_temp_storage("snapshot_cleanup").await;
    let db = storage.get_db();
    let today = Utc::now().date_naive();
    let stats = ViewStatistics {
        daily_views: 1,
        weekly_views: 1,
        monthly_views: 1,
    };

    for days_ago in [120, 91, 90, 10, 0] {
        storage
            .upsert_snapshot(
                EntityType::Comic,
                1,
                today - Duration::days(days_ago),
                &stats,
            )
            .await
            .unwrap();
    }

    let job = AggregationJob::new(storage.clone(), fast_settings());
    let report = job.cleanup_old_snapshots(90).await;
    assert!(report.success);
    assert!(report.message.contains("Deleted 2"));

    let remaining: Vec<NaiveDate> = view_statistics_snapshot::Entity::find()
        .all(db)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.date)
        .collect();
    assert_eq!(remaining.len(), 3);
    let cutoff = today - Duration::days(90);
    assert!(remaining.iter().all(|d| *d >= cutoff));
}

#[tokio::test]
async fn test_full_aggregation_fails_when_a_pipeline_cannot_list() {
    let (storage, _td) = create_temp_storage("listing_failure").await;
    let db = storage.get_db();
    let now = Utc::now();

    for id in 1..=3 {
        insert_comic(db, ComicSeed::new(id)).await;
        insert_views(db, "comic", id, now - Duration::hours(1), 2).await;
    }
    insert_chapter(db, 10, 1).await;

    let store = Arc::new(FaultyStore {
        inner: storage.clone(),
        failing_id: -1,
        failing_listing: Some(EntityType::Chapter),
    });
    let job = AggregationJob::new(store, fast_settings());
    let report = job.run_full_aggregation().await;

    assert!(!report.success);
    assert_eq!(report.processed.comics, 3);
    assert_eq!(report.processed.chapters, 0);
    assert!(!report.errors.is_empty());
    assert!(
        report
            .errors
            .iter()
            .any(|e| e.contains("simulated listing failure"))
    );

    // 漫画管道不受影响
    for id in 1..=3 {
        assert_eq!(load_comic(db, id).await.daily_views, 2);
    }
}

#[tokio::test]
async fn test_scheduler_run_once_aggregates_and_prunes() {
    let (storage, _td) = create_temp_storage("scheduler_once").await;
    let db = storage.get_db();
    let now = Utc::now();
    let today = now.date_naive();

    insert_comic(db, ComicSeed::new(1)).await;
    insert_views(db, "comic", 1, now - Duration::days(3), 4).await;
    storage
        .upsert_snapshot(
            EntityType::Comic,
            1,
            today - Duration::days(200),
            &ViewStatistics::default(),
        )
        .await
        .unwrap();

    let job = Arc::new(AggregationJob::new(storage.clone(), fast_settings()));
    let scheduler = AggregationScheduler::new(job, &AggregationConfig::default());
    scheduler.run_once().await;

    let comic = load_comic(db, 1).await;
    assert_eq!(comic.daily_views, 0);
    assert_eq!(comic.weekly_views, 4);

    let dates: Vec<NaiveDate> = view_statistics_snapshot::Entity::find()
        .all(db)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.date)
        .collect();
    assert_eq!(dates, vec![today]);
}

#[tokio::test]
async fn test_full_aggregation_end_to_end() {
    let (storage, _td) = create_temp_storage("end_to_end").await;
    let db = storage.get_db();
    let now = Utc::now();

    insert_comic(db, ComicSeed::new(42)).await;
    insert_comic(db, ComicSeed::new(43)).await;
    insert_chapter(db, 100, 42).await;

    // 5 条在 24 小时内，另 15 条在 7 天内，另 30 条在 30 天内
    insert_views(db, "comic", 42, now - Duration::hours(2), 5).await;
    insert_views(db, "comic", 42, now - Duration::days(3), 15).await;
    insert_views(db, "comic", 42, now - Duration::days(15), 30).await;
    insert_views(db, "comic", 43, now - Duration::days(2), 4).await;
    insert_views(db, "chapter", 100, now - Duration::hours(5), 6).await;

    let ctx = StartupContext::from_storage(storage.clone());
    let report = ctx.aggregation.run_full_aggregation().await;

    assert!(report.success, "report: {:?}", report);
    assert!(report.errors.is_empty());
    assert_eq!(report.processed.comics, 2);
    assert_eq!(report.processed.chapters, 1);

    let comic = load_comic(db, 42).await;
    assert_eq!(
        (comic.daily_views, comic.weekly_views, comic.monthly_views),
        (5, 20, 50)
    );

    let stored = storage
        .stored_statistics(EntityType::Chapter, 100)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.daily_views, 6);

    let query = RankingQuery::parse(
        Some("most_viewed"),
        Some("weekly"),
        None,
        None,
        ctx.rankings.settings(),
    )
    .unwrap();
    let page = ctx.rankings.rankings(&query).await.unwrap();
    assert_eq!(page.rankings[0].id, 42);
    assert_eq!(page.rankings[0].rank, 1);
    assert_eq!(page.rankings[0].weekly_views, 20);
    assert_eq!(page.rankings[1].id, 43);
    assert_eq!(page.total, 2);

    // 今天的快照已写入
    let snapshots = view_statistics_snapshot::Entity::find()
        .count(db)
        .await
        .unwrap();
    assert_eq!(snapshots, 3);
}

#[tokio::test]
async fn test_update_all_for_empty_type() {
    let (storage, _td) = create_temp_storage("empty_type").await;

    let job = AggregationJob::new(storage.clone(), fast_settings());
    let report = job.update_all_for_type(EntityType::Chapter).await;

    assert!(report.success);
    assert_eq!(report.processed.chapters, 0);
    assert!(report.errors.is_empty());
}
