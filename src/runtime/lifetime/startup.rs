use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

use crate::analytics::{AggregationJob, AggregationSettings};
use crate::services::{RankingService, RankingSettings, ViewStatisticsService};
use crate::storage::{RankingStore, SeaOrmStorage, StorageFactory, ViewStatsStore};

/// 服务组件
///
/// server 和 CLI 共用同一套组装逻辑
pub struct StartupContext {
    pub storage: Arc<SeaOrmStorage>,
    pub rankings: Arc<RankingService>,
    pub view_statistics: Arc<ViewStatisticsService>,
    pub aggregation: Arc<AggregationJob>,
}

impl StartupContext {
    /// 在已有存储上组装服务（集成测试也走这里）
    pub fn from_storage(storage: Arc<SeaOrmStorage>) -> Self {
        let config = crate::config::get_config();

        let view_store: Arc<dyn ViewStatsStore> = storage.clone();
        let ranking_store: Arc<dyn RankingStore> = storage.clone();

        let rankings = Arc::new(RankingService::new(
            ranking_store,
            RankingSettings::from_config(&config.rankings),
        ));
        let aggregation = Arc::new(
            AggregationJob::new(
                view_store.clone(),
                AggregationSettings::from_config(&config.aggregation),
            )
            .with_rankings(rankings.clone()),
        );
        let view_statistics = Arc::new(ViewStatisticsService::new(
            view_store,
            aggregation.clone(),
        ));

        Self {
            storage,
            rankings,
            view_statistics,
            aggregation,
        }
    }
}

/// 连接数据库、执行迁移并组装服务
pub async fn prepare_startup() -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    let storage = StorageFactory::create()
        .await
        .context("Failed to create storage backend")?;
    info!("Using storage backend: {}", storage.get_backend_name());

    let context = StartupContext::from_storage(storage);

    debug!("Pre-startup processing completed in {:?}", start_time.elapsed());
    Ok(context)
}
