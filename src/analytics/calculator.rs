//! 滚动窗口浏览量计算
//!
//! 三个窗口共用同一个 now，各自独立计数：
//! 20 小时前的一次浏览同时计入 daily、weekly、monthly。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error};

use super::{DAILY_WINDOW, MONTHLY_WINDOW, WEEKLY_WINDOW};
use crate::errors::{AppError, Result};
use crate::storage::{EntityType, ViewStatistics, ViewStatsStore};

#[derive(Clone)]
pub struct StatisticsCalculator {
    store: Arc<dyn ViewStatsStore>,
}

impl StatisticsCalculator {
    pub fn new(store: Arc<dyn ViewStatsStore>) -> Self {
        Self { store }
    }

    /// 计算当前窗口统计，读取失败时记录日志并返回全 0
    ///
    /// 只用于展示类读路径；聚合写回请使用 [`Self::try_calculate`]，
    /// 否则一次瞬时故障会把已有数据覆盖成 0。
    pub async fn calculate(&self, entity_type: EntityType, entity_id: i64) -> ViewStatistics {
        match self.try_calculate(entity_type, entity_id).await {
            Ok(stats) => stats,
            Err(e) => {
                error!(
                    "Failed to calculate view statistics for {} {}: {}",
                    entity_type, entity_id, e
                );
                ViewStatistics::default()
            }
        }
    }

    pub async fn try_calculate(
        &self,
        entity_type: EntityType,
        entity_id: i64,
    ) -> Result<ViewStatistics> {
        self.try_calculate_at(entity_type, entity_id, Utc::now())
            .await
    }

    /// 以指定时间为 now 计算三个窗口
    pub async fn try_calculate_at(
        &self,
        entity_type: EntityType,
        entity_id: i64,
        now: DateTime<Utc>,
    ) -> Result<ViewStatistics> {
        let store = &self.store;
        let (daily, weekly, monthly) = tokio::try_join!(
            store.count_events(entity_type, entity_id, now - DAILY_WINDOW, now),
            store.count_events(entity_type, entity_id, now - WEEKLY_WINDOW, now),
            store.count_events(entity_type, entity_id, now - MONTHLY_WINDOW, now),
        )
        .map_err(|e| {
            AppError::calculation_failed(format!("view counts unavailable: {}", e.message()))
        })?;

        debug!(
            "Calculated {} {}: daily={}, weekly={}, monthly={}",
            entity_type, entity_id, daily, weekly, monthly
        );

        Ok(ViewStatistics {
            daily_views: daily,
            weekly_views: weekly,
            monthly_views: monthly,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::storage::{SnapshotPoint, StoredStatistics};
    use async_trait::async_trait;
    use chrono::{Duration, NaiveDate};
    use std::sync::Mutex;

    /// 只保存浏览时间的内存 store，fail_ids 中的实体读取时报错
    #[derive(Default)]
    pub(crate) struct MemoryStore {
        pub events: Mutex<Vec<(EntityType, i64, DateTime<Utc>)>>,
        pub fail_ids: Vec<i64>,
    }

    #[async_trait]
    impl ViewStatsStore for MemoryStore {
        async fn count_events(
            &self,
            entity_type: EntityType,
            entity_id: i64,
            since: DateTime<Utc>,
            until: DateTime<Utc>,
        ) -> Result<u64> {
            if self.fail_ids.contains(&entity_id) {
                return Err(AppError::database_operation("connection reset"));
            }
            let events = self.events.lock().unwrap();
            Ok(events
                .iter()
                .filter(|(t, id, at)| *t == entity_type && *id == entity_id && *at >= since && *at <= until)
                .count() as u64)
        }

        async fn entity_ids(&self, _entity_type: EntityType) -> Result<Vec<i64>> {
            Ok(vec![])
        }

        async fn entity_exists(&self, _entity_type: EntityType, _entity_id: i64) -> Result<bool> {
            Ok(true)
        }

        async fn stored_statistics(
            &self,
            _entity_type: EntityType,
            _entity_id: i64,
        ) -> Result<Option<StoredStatistics>> {
            Ok(None)
        }

        async fn write_aggregate_fields(
            &self,
            _entity_type: EntityType,
            _entity_id: i64,
            _stats: &ViewStatistics,
        ) -> Result<()> {
            Ok(())
        }

        async fn upsert_snapshot(
            &self,
            _entity_type: EntityType,
            _entity_id: i64,
            _date: NaiveDate,
            _stats: &ViewStatistics,
        ) -> Result<()> {
            Ok(())
        }

        async fn delete_snapshots_before(&self, _cutoff: NaiveDate) -> Result<u64> {
            Ok(0)
        }

        async fn snapshot_history(
            &self,
            _entity_type: EntityType,
            _entity_id: i64,
            _since: NaiveDate,
        ) -> Result<Vec<SnapshotPoint>> {
            Ok(vec![])
        }

        async fn record_view(
            &self,
            entity_type: EntityType,
            entity_id: i64,
            viewed_at: DateTime<Utc>,
        ) -> Result<()> {
            self.events
                .lock()
                .unwrap()
                .push((entity_type, entity_id, viewed_at));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_windows_are_independent() {
        let now = Utc::now();
        let store = Arc::new(MemoryStore::default());
        for hours in [1, 20, 24 * 3, 24 * 20, 24 * 45] {
            store
                .record_view(EntityType::Comic, 1, now - Duration::hours(hours))
                .await
                .unwrap();
        }
        // 其他实体的事件不计入
        store
            .record_view(EntityType::Chapter, 1, now - Duration::hours(1))
            .await
            .unwrap();

        let calc = StatisticsCalculator::new(store);
        let stats = calc
            .try_calculate_at(EntityType::Comic, 1, now)
            .await
            .unwrap();
        assert_eq!(
            stats,
            ViewStatistics {
                daily_views: 2,
                weekly_views: 3,
                monthly_views: 4,
            }
        );
    }

    #[tokio::test]
    async fn test_window_boundaries_are_inclusive() {
        let now = Utc::now();
        let store = Arc::new(MemoryStore::default());
        store
            .record_view(EntityType::Comic, 7, now - DAILY_WINDOW)
            .await
            .unwrap();
        store
            .record_view(EntityType::Comic, 7, now - MONTHLY_WINDOW - Duration::seconds(1))
            .await
            .unwrap();

        let calc = StatisticsCalculator::new(store);
        let stats = calc
            .try_calculate_at(EntityType::Comic, 7, now)
            .await
            .unwrap();
        assert_eq!(stats.daily_views, 1);
        assert_eq!(stats.monthly_views, 1);
    }

    #[tokio::test]
    async fn test_calculate_fails_open_but_try_calculate_reports() {
        let store = Arc::new(MemoryStore {
            fail_ids: vec![5],
            ..Default::default()
        });
        let calc = StatisticsCalculator::new(store);

        assert_eq!(
            calc.calculate(EntityType::Comic, 5).await,
            ViewStatistics::default()
        );
        let err = calc.try_calculate(EntityType::Comic, 5).await.unwrap_err();
        assert!(matches!(err, AppError::CalculationFailed(_)));
        assert!(err.message().contains("connection reset"));
    }
}
