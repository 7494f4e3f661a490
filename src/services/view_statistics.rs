//! 单个实体的浏览统计查询、重算与浏览记录

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;
use tracing::info;

use crate::analytics::{AggregationJob, StatisticsCalculator, truncate_to_day};
use crate::errors::{AppError, Result};
use crate::storage::{EntityType, StoredStatistics, ViewStatistics, ViewStatsStore};

pub const DEFAULT_HISTORY_DAYS: u32 = 30;
pub const MAX_HISTORY_DAYS: u32 = 365;

/// 查询类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatisticsPeriod {
    Current,
    Historical,
}

impl std::str::FromStr for StatisticsPeriod {
    type Err = AppError;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "current" => Ok(Self::Current),
            "historical" => Ok(Self::Historical),
            _ => Err(AppError::validation(format!(
                "Invalid period: '{}'. Valid: current, historical",
                s
            ))),
        }
    }
}

/// 历史天数：缺省 30，钳制到 1..=365
pub fn clamp_history_days(raw: Option<&str>) -> u32 {
    raw.and_then(|d| d.trim().parse::<i64>().ok())
        .map(|d| d.clamp(1, MAX_HISTORY_DAYS as i64) as u32)
        .unwrap_or(DEFAULT_HISTORY_DAYS)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentStatistics {
    /// 按当前时间从浏览事件实时计算
    pub real_time: ViewStatistics,
    /// 上一次聚合写回的字段
    pub stored: StoredStatistics,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoricalPoint {
    pub date: NaiveDate,
    pub views: u64,
}

pub struct ViewStatisticsService {
    store: Arc<dyn ViewStatsStore>,
    calculator: StatisticsCalculator,
    job: Arc<AggregationJob>,
}

impl ViewStatisticsService {
    pub fn new(store: Arc<dyn ViewStatsStore>, job: Arc<AggregationJob>) -> Self {
        Self {
            calculator: StatisticsCalculator::new(store.clone()),
            store,
            job,
        }
    }

    async fn ensure_exists(&self, entity_type: EntityType, entity_id: i64) -> Result<()> {
        if self.store.entity_exists(entity_type, entity_id).await? {
            Ok(())
        } else {
            Err(AppError::not_found(format!(
                "{} {} not found",
                entity_type, entity_id
            )))
        }
    }

    pub async fn current(
        &self,
        entity_type: EntityType,
        entity_id: i64,
    ) -> Result<CurrentStatistics> {
        let stored = self
            .store
            .stored_statistics(entity_type, entity_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("{} {} not found", entity_type, entity_id))
            })?;
        let real_time = self.calculator.calculate(entity_type, entity_id).await;

        Ok(CurrentStatistics { real_time, stored })
    }

    /// 最近 days 天的每日快照，views 取当天快照的 daily_views
    pub async fn historical(
        &self,
        entity_type: EntityType,
        entity_id: i64,
        days: u32,
    ) -> Result<Vec<HistoricalPoint>> {
        self.ensure_exists(entity_type, entity_id).await?;

        let since = history_start(truncate_to_day(Utc::now()), days);
        let points = self
            .store
            .snapshot_history(entity_type, entity_id, since)
            .await?;

        Ok(points
            .into_iter()
            .map(|p| HistoricalPoint {
                date: p.date,
                views: p.daily_views,
            })
            .collect())
    }

    /// 立即重算并写回
    pub async fn recompute(
        &self,
        entity_type: EntityType,
        entity_id: i64,
    ) -> Result<ViewStatistics> {
        self.ensure_exists(entity_type, entity_id).await?;
        let stats = self.job.update_entity(entity_type, entity_id).await?;
        info!(
            "Recomputed view statistics for {} {}",
            entity_type, entity_id
        );
        Ok(stats)
    }

    pub async fn record_view(&self, entity_type: EntityType, entity_id: i64) -> Result<()> {
        self.ensure_exists(entity_type, entity_id).await?;
        self.store
            .record_view(entity_type, entity_id, Utc::now())
            .await
    }
}

/// 包含今天在内的 days 天
fn history_start(today: NaiveDate, days: u32) -> NaiveDate {
    today - Duration::days(days.saturating_sub(1) as i64)
}
