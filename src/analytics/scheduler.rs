//! 后台定时聚合

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use super::AggregationJob;
use crate::config::AggregationConfig;

pub struct AggregationScheduler {
    job: Arc<AggregationJob>,
    interval: Duration,
    initial_delay: Duration,
}

impl AggregationScheduler {
    pub fn new(job: Arc<AggregationJob>, config: &AggregationConfig) -> Self {
        Self {
            job,
            interval: Duration::from_secs(config.interval_minutes.max(1) * 60),
            initial_delay: Duration::from_secs(config.initial_delay_secs),
        }
    }

    /// 执行一轮：全量聚合 + 过期快照清理
    pub async fn run_once(&self) {
        let report = self.job.run_full_aggregation().await;
        if !report.success {
            error!("Scheduled aggregation failed: {}", report.message);
        } else if !report.errors.is_empty() {
            warn!(
                "Scheduled aggregation finished with {} entity errors",
                report.errors.len()
            );
        }

        let retention_days = self.job.settings().snapshot_retention_days;
        let cleanup = self.job.cleanup_old_snapshots(retention_days).await;
        if !cleanup.success {
            error!("Scheduled snapshot cleanup failed: {}", cleanup.message);
        }
    }

    /// 启动后台任务
    ///
    /// 首次运行前等待 initial_delay，之后每隔 interval 运行一次
    pub fn spawn_background_task(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        info!(
            "Aggregation background task started (interval: {:?}, first run in {:?})",
            self.interval, self.initial_delay
        );

        tokio::spawn(async move {
            tokio::time::sleep(self.initial_delay).await;

            let mut ticker = tokio::time::interval(self.interval);
            // 上一轮跑太久时不补跑
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                self.run_once().await;
            }
        })
    }
}
