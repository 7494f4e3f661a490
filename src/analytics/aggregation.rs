//! 批量聚合任务
//!
//! 按类型枚举实体，分批并发重算窗口统计并覆盖写回；
//! 另外负责每日快照和过期快照清理。
//! 单个实体失败只记录错误，不会中断整批。

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use futures_util::future::join_all;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::{StatisticsCalculator, truncate_to_day};
use crate::config::AggregationConfig;
use crate::errors::Result;
use crate::services::RankingService;
use crate::storage::{EntityType, ViewStatistics, ViewStatsStore};

/// 聚合任务参数
#[derive(Debug, Clone)]
pub struct AggregationSettings {
    pub batch_size: usize,
    pub batch_delay: Duration,
    pub snapshot_retention_days: u32,
}

impl AggregationSettings {
    pub fn from_config(config: &AggregationConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            batch_delay: Duration::from_millis(config.batch_delay_ms),
            snapshot_retention_days: config.snapshot_retention_days,
        }
    }
}

impl Default for AggregationSettings {
    fn default() -> Self {
        Self::from_config(&AggregationConfig::default())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProcessedCounts {
    pub comics: u64,
    pub chapters: u64,
}

impl ProcessedCounts {
    fn for_type(entity_type: EntityType, count: u64) -> Self {
        match entity_type {
            EntityType::Comic => Self {
                comics: count,
                chapters: 0,
            },
            EntityType::Chapter => Self {
                comics: 0,
                chapters: count,
            },
        }
    }
}

/// 聚合结果报告
///
/// `success = false` 只表示顶层失败（例如无法枚举实体）；
/// 单个实体的失败记录在 `errors` 中，整体仍算成功。
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregationReport {
    pub success: bool,
    pub message: String,
    pub processed: ProcessedCounts,
    pub errors: Vec<String>,
}

impl AggregationReport {
    fn failed(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            processed: ProcessedCounts::default(),
            errors: vec![error.into()],
        }
    }
}

pub struct AggregationJob {
    store: Arc<dyn ViewStatsStore>,
    calculator: StatisticsCalculator,
    settings: AggregationSettings,
    rankings: Option<Arc<RankingService>>,
}

impl AggregationJob {
    pub fn new(store: Arc<dyn ViewStatsStore>, settings: AggregationSettings) -> Self {
        Self {
            calculator: StatisticsCalculator::new(store.clone()),
            store,
            settings,
            rankings: None,
        }
    }

    /// 全量聚合前记录排行名次，结束后清空排行缓存
    pub fn with_rankings(mut self, rankings: Arc<RankingService>) -> Self {
        self.rankings = Some(rankings);
        self
    }

    pub fn settings(&self) -> &AggregationSettings {
        &self.settings
    }

    /// 重算单个实体并写回
    ///
    /// 计算失败时直接返回错误，不写回，保留上一次的数据。
    pub async fn update_entity(
        &self,
        entity_type: EntityType,
        entity_id: i64,
    ) -> Result<ViewStatistics> {
        let stats = self
            .calculator
            .try_calculate(entity_type, entity_id)
            .await?;
        self.store
            .write_aggregate_fields(entity_type, entity_id, &stats)
            .await?;
        Ok(stats)
    }

    /// 重算某类型的全部实体
    pub async fn update_all_for_type(&self, entity_type: EntityType) -> AggregationReport {
        let started = Instant::now();
        let ids = match self.store.entity_ids(entity_type).await {
            Ok(ids) => ids,
            Err(e) => {
                error!("Failed to list {} ids for aggregation: {}", entity_type, e);
                return AggregationReport::failed(
                    format!("Failed to update {} view statistics", entity_type),
                    e.to_string(),
                );
            }
        };

        let (processed, errors) = self
            .run_batched(entity_type, &ids, |id| async move {
                self.update_entity(entity_type, id).await.map(|_| ())
            })
            .await;

        info!(
            "Updated {} view statistics: {}/{} succeeded in {:?}",
            entity_type,
            processed,
            ids.len(),
            started.elapsed()
        );

        AggregationReport {
            success: true,
            message: format!(
                "Updated view statistics for {} {}s ({} failed)",
                processed,
                entity_type,
                errors.len()
            ),
            processed: ProcessedCounts::for_type(entity_type, processed),
            errors,
        }
    }

    /// 写入单个实体某天的快照，同一天重复执行会覆盖
    pub async fn store_daily_snapshot(
        &self,
        entity_type: EntityType,
        entity_id: i64,
        date: NaiveDate,
    ) -> Result<()> {
        let stats = self
            .calculator
            .try_calculate(entity_type, entity_id)
            .await?;
        self.store
            .upsert_snapshot(entity_type, entity_id, date, &stats)
            .await
    }

    /// 为所有漫画和章节写入快照
    pub async fn store_all_snapshots(&self, date: NaiveDate) -> AggregationReport {
        let mut report = AggregationReport {
            success: true,
            ..Default::default()
        };

        for entity_type in [EntityType::Comic, EntityType::Chapter] {
            let ids = match self.store.entity_ids(entity_type).await {
                Ok(ids) => ids,
                Err(e) => {
                    error!("Failed to list {} ids for snapshots: {}", entity_type, e);
                    report.success = false;
                    report.errors.push(format!("{}: {}", entity_type, e));
                    continue;
                }
            };

            let (processed, errors) = self
                .run_batched(entity_type, &ids, |id| async move {
                    self.store_daily_snapshot(entity_type, id, date).await
                })
                .await;

            match entity_type {
                EntityType::Comic => report.processed.comics = processed,
                EntityType::Chapter => report.processed.chapters = processed,
            }
            report.errors.extend(errors);
        }

        report.message = if report.success {
            format!(
                "Stored {} snapshots for {} ({} comics, {} chapters)",
                report.processed.comics + report.processed.chapters,
                date,
                report.processed.comics,
                report.processed.chapters
            )
        } else {
            format!("Failed to store snapshots for {}", date)
        };
        info!("{}", report.message);
        report
    }

    /// 删除早于 today - days_to_keep 的快照
    pub async fn cleanup_old_snapshots(&self, days_to_keep: u32) -> AggregationReport {
        let cutoff = truncate_to_day(Utc::now()) - ChronoDuration::days(days_to_keep as i64);

        match self.store.delete_snapshots_before(cutoff).await {
            Ok(deleted) => {
                info!(
                    "Snapshot cleanup: deleted {} rows older than {}",
                    deleted, cutoff
                );
                AggregationReport {
                    success: true,
                    message: format!("Deleted {} snapshots older than {}", deleted, cutoff),
                    ..Default::default()
                }
            }
            Err(e) => {
                error!("Snapshot cleanup failed: {}", e);
                AggregationReport::failed("Failed to clean up old snapshots", e.to_string())
            }
        }
    }

    /// 完整聚合：记录名次，然后并发执行漫画、章节重算和快照写入
    pub async fn run_full_aggregation(&self) -> AggregationReport {
        let started = Instant::now();
        let mut capture_errors = Vec::new();

        // 名次必须在覆盖汇总字段之前记录，才是“上一轮”的排名
        if let Some(rankings) = &self.rankings {
            match rankings.capture_positions().await {
                Ok(captured) => debug!("Captured {} ranking positions", captured),
                Err(e) => {
                    warn!("Failed to capture ranking positions: {}", e);
                    capture_errors.push(format!("ranking capture: {}", e));
                }
            }
        }

        let today = truncate_to_day(Utc::now());
        let (comics, chapters, snapshots) = tokio::join!(
            self.update_all_for_type(EntityType::Comic),
            self.update_all_for_type(EntityType::Chapter),
            self.store_all_snapshots(today),
        );

        if let Some(rankings) = &self.rankings {
            rankings.invalidate_cache();
        }

        let success = comics.success && chapters.success && snapshots.success;
        let processed = ProcessedCounts {
            comics: comics.processed.comics,
            chapters: chapters.processed.chapters,
        };
        let errors: Vec<String> = capture_errors
            .into_iter()
            .chain(comics.errors)
            .chain(chapters.errors)
            .chain(snapshots.errors)
            .collect();

        let message = if success {
            format!(
                "Full aggregation completed: {} comics, {} chapters, {} snapshots in {:?}",
                processed.comics,
                processed.chapters,
                snapshots.processed.comics + snapshots.processed.chapters,
                started.elapsed()
            )
        } else {
            "Full aggregation completed with failures".to_string()
        };

        if success {
            info!("{} ({} entity errors)", message, errors.len());
        } else {
            error!("{}: {:?}", message, errors);
        }

        AggregationReport {
            success,
            message,
            processed,
            errors,
        }
    }

    /// 分批并发执行，批间休眠；返回成功数和错误列表
    async fn run_batched<F, Fut>(
        &self,
        entity_type: EntityType,
        ids: &[i64],
        op: F,
    ) -> (u64, Vec<String>)
    where
        F: Fn(i64) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let op = &op;
        let mut processed = 0u64;
        let mut errors = Vec::new();

        for (index, batch) in ids.chunks(self.settings.batch_size).enumerate() {
            if index > 0 && !self.settings.batch_delay.is_zero() {
                tokio::time::sleep(self.settings.batch_delay).await;
            }

            let results = join_all(batch.iter().map(|&id| async move { (id, op(id).await) })).await;

            for (id, result) in results {
                match result {
                    Ok(()) => processed += 1,
                    Err(e) => {
                        warn!("{} {} failed: {}", entity_type, id, e);
                        errors.push(format!("{} {}: {}", entity_type, id, e.message()));
                    }
                }
            }

            debug!(
                "{} batch {} done ({} processed so far)",
                entity_type,
                index + 1,
                processed
            );
        }

        (processed, errors)
    }
}
