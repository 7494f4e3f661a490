//! 排行查询服务
//!
//! 根据 (category, period) 选出过滤和排序规则，分页查询漫画，
//! 补充评分汇总与名次变化，并在进程内按周期分级缓存结果页。

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use moka::future::Cache;
use moka::policy::Expiry;
use serde::Serialize;
use strum::IntoEnumIterator;
use tracing::{debug, info};

use super::CacheTier;
use crate::config::RankingsConfig;
use crate::errors::Result;
use crate::storage::{
    RankedComic, RankingCategory, RankingPeriod, RankingPolicy, RankingStore, RatingSummary,
    SortKey,
};

/// 排行参数
#[derive(Debug, Clone)]
pub struct RankingSettings {
    pub default_limit: u64,
    pub max_limit: u64,
    pub trending_window_days: u32,
    /// 每个 (category, period) 记录名次的条数
    pub capture_depth: u64,
    pub cache_capacity: u64,
    /// POST /rankings 需要的共享密钥，None 表示不校验
    pub refresh_secret: Option<String>,
}

impl RankingSettings {
    pub fn from_config(config: &RankingsConfig) -> Self {
        let max_limit = (config.max_limit as u64).max(1);
        Self {
            default_limit: (config.default_limit as u64).clamp(1, max_limit),
            max_limit,
            trending_window_days: config.trending_window_days,
            capture_depth: config.capture_depth as u64,
            cache_capacity: config.cache_capacity,
            refresh_secret: config
                .refresh_secret
                .clone()
                .filter(|secret| !secret.is_empty()),
        }
    }
}

impl Default for RankingSettings {
    fn default() -> Self {
        Self::from_config(&RankingsConfig::default())
    }
}

/// 校验后的排行查询参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RankingQuery {
    pub category: RankingCategory,
    pub period: RankingPeriod,
    pub page: u64,
    pub limit: u64,
}

/// OFFSET 绑定为 i64，超出会在驱动层失败
const MAX_OFFSET: u64 = i64::MAX as u64;

fn parse_page(raw: Option<&str>, limit: u64) -> u64 {
    // 页码上限保证 (page - 1) * limit 不超过 MAX_OFFSET
    let max_page = MAX_OFFSET / limit.max(1) + 1;
    raw.and_then(|p| p.trim().parse::<i64>().ok())
        .unwrap_or(1)
        .max(1)
        .unsigned_abs()
        .min(max_page)
}

fn parse_limit(raw: Option<&str>, settings: &RankingSettings) -> u64 {
    raw.and_then(|l| l.trim().parse::<i64>().ok())
        .unwrap_or(settings.default_limit as i64)
        .clamp(1, settings.max_limit as i64) as u64
}

impl RankingQuery {
    /// 解析原始查询参数
    ///
    /// category/period 缺省为 most_viewed/weekly，非法值返回校验错误；
    /// page、limit 解析失败时回落到默认值，然后钳制到合法范围。
    pub fn parse(
        category: Option<&str>,
        period: Option<&str>,
        page: Option<&str>,
        limit: Option<&str>,
        settings: &RankingSettings,
    ) -> Result<Self> {
        let category = match category {
            Some(raw) => raw.parse::<RankingCategory>()?,
            None => RankingCategory::MostViewed,
        };
        let period = match period {
            Some(raw) => raw.parse::<RankingPeriod>()?,
            None => RankingPeriod::Weekly,
        };
        let limit = parse_limit(limit, settings);

        Ok(Self {
            category,
            period,
            page: parse_page(page, limit),
            limit,
        })
    }

    /// 与 `parse` 相同，但非法的 category/period 换成默认值
    ///
    /// 只用于给 400 响应构造空结果页。
    pub fn lenient(
        category: Option<&str>,
        period: Option<&str>,
        page: Option<&str>,
        limit: Option<&str>,
        settings: &RankingSettings,
    ) -> Self {
        let limit = parse_limit(limit, settings);
        Self {
            category: category
                .and_then(|raw| raw.parse::<RankingCategory>().ok())
                .unwrap_or(RankingCategory::MostViewed),
            period: period
                .and_then(|raw| raw.parse::<RankingPeriod>().ok())
                .unwrap_or(RankingPeriod::Weekly),
            page: parse_page(page, limit),
            limit,
        }
    }

    pub fn offset(&self) -> u64 {
        self.page
            .saturating_sub(1)
            .checked_mul(self.limit)
            .map_or(MAX_OFFSET, |offset| offset.min(MAX_OFFSET))
    }
}

/// 类别与周期对应的过滤、排序规则
pub fn ranking_policy(
    category: RankingCategory,
    period: RankingPeriod,
    now: DateTime<Utc>,
    trending_window_days: u32,
) -> RankingPolicy {
    match category {
        RankingCategory::MostViewed => RankingPolicy {
            sort: period.views_key(),
            positive: Some(period.views_key()),
            require_rating: false,
            updated_since: None,
        },
        RankingCategory::HighestRated => RankingPolicy {
            sort: SortKey::RatingCount,
            positive: None,
            require_rating: true,
            updated_since: None,
        },
        RankingCategory::MostBookmarked => RankingPolicy {
            sort: SortKey::TotalFavorites,
            positive: Some(SortKey::TotalFavorites),
            require_rating: false,
            updated_since: None,
        },
        RankingCategory::Trending => RankingPolicy {
            sort: period.views_key(),
            positive: Some(period.views_key()),
            require_rating: false,
            updated_since: Some(now - ChronoDuration::days(trending_window_days as i64)),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
    New,
}

impl TrendDirection {
    /// 名次数字变小为上升
    ///
    /// 上一轮只记录了前 `capture_depth` 名，所以没有记录的漫画只有
    /// 在当前名次也落在该范围内时才算 new，更靠后的视为 stable。
    pub fn from_ranks(
        rank: u64,
        previous: Option<u32>,
        has_capture: bool,
        capture_depth: u64,
    ) -> Self {
        match previous {
            Some(prev) if (prev as u64) > rank => Self::Up,
            Some(prev) if (prev as u64) < rank => Self::Down,
            Some(_) => Self::Stable,
            None if has_capture && rank <= capture_depth => Self::New,
            None => Self::Stable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingItem {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub cover_image_url: Option<String>,
    pub daily_views: u64,
    pub weekly_views: u64,
    pub monthly_views: u64,
    pub total_views: u64,
    pub total_favorites: u64,
    pub average_rating: Option<f64>,
    pub rating_count: u64,
    pub rank: u64,
    pub trend_direction: TrendDirection,
    pub previous_rank: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl Pagination {
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        let total_pages = total.div_ceil(limit.max(1));
        Self {
            page,
            limit,
            total_pages,
            has_next: page < total_pages,
            has_previous: page > 1,
        }
    }
}

/// 排行结果页，外层信封字段用 camelCase，条目字段保持 snake_case
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingPage {
    pub category: RankingCategory,
    pub period: RankingPeriod,
    pub rankings: Vec<RankingItem>,
    pub total: u64,
    pub last_updated: DateTime<Utc>,
    pub pagination: Pagination,
}

impl RankingPage {
    /// 出错时返回的空结果，保持响应结构不变
    pub fn empty(query: &RankingQuery) -> Self {
        Self {
            category: query.category,
            period: query.period,
            rankings: Vec::new(),
            total: 0,
            last_updated: Utc::now(),
            pagination: Pagination::new(query.page, query.limit, 0),
        }
    }
}

fn build_item(
    comic: RankedComic,
    rank: u64,
    rating: Option<&RatingSummary>,
    previous: Option<u32>,
    has_capture: bool,
    capture_depth: u64,
) -> RankingItem {
    let rating = rating.copied().unwrap_or_default();
    RankingItem {
        id: comic.id,
        title: comic.title,
        slug: comic.slug,
        cover_image_url: comic.cover_image_url,
        daily_views: comic.daily_views,
        weekly_views: comic.weekly_views,
        monthly_views: comic.monthly_views,
        total_views: comic.total_views,
        total_favorites: comic.total_favorites,
        average_rating: rating.average(),
        rating_count: rating.count,
        rank,
        trend_direction: TrendDirection::from_ranks(rank, previous, has_capture, capture_depth),
        previous_rank: previous,
    }
}

/// 按周期给缓存条目设置 TTL
struct PeriodExpiry;

impl Expiry<RankingQuery, Arc<RankingPage>> for PeriodExpiry {
    fn expire_after_create(
        &self,
        key: &RankingQuery,
        _value: &Arc<RankingPage>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(CacheTier::for_period(key.period).ttl())
    }
}

pub struct RankingService {
    store: Arc<dyn RankingStore>,
    settings: RankingSettings,
    cache: Cache<RankingQuery, Arc<RankingPage>>,
}

impl RankingService {
    pub fn new(store: Arc<dyn RankingStore>, settings: RankingSettings) -> Self {
        let cache = Cache::builder()
            .max_capacity(settings.cache_capacity)
            .expire_after(PeriodExpiry)
            .build();

        debug!(
            "RankingService initialized with cache capacity {}",
            settings.cache_capacity
        );
        Self {
            store,
            settings,
            cache,
        }
    }

    pub fn settings(&self) -> &RankingSettings {
        &self.settings
    }

    /// 查询排行页，优先读进程内缓存
    pub async fn rankings(&self, query: &RankingQuery) -> Result<Arc<RankingPage>> {
        if let Some(page) = self.cache.get(query).await {
            debug!("Ranking cache hit: {:?}", query);
            return Ok(page);
        }

        let page = Arc::new(self.load_page(query, Utc::now()).await?);
        self.cache.insert(*query, page.clone()).await;
        Ok(page)
    }

    /// 直接查库，不经过缓存
    pub async fn load_page(&self, query: &RankingQuery, now: DateTime<Utc>) -> Result<RankingPage> {
        let policy = ranking_policy(
            query.category,
            query.period,
            now,
            self.settings.trending_window_days,
        );
        let offset = query.offset();

        let (rows, total) = tokio::try_join!(
            self.store.query_ranked(&policy, offset, query.limit),
            self.store.count_ranked(&policy),
        )?;

        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let (ratings, (previous, has_capture)) = tokio::try_join!(
            self.store.rating_summaries(&ids),
            self.store
                .previous_ranks(query.category, query.period, &ids),
        )?;

        let rankings = rows
            .into_iter()
            .enumerate()
            .map(|(index, comic)| {
                let rank = offset + index as u64 + 1;
                let prev = previous.get(&comic.id).copied();
                let rating = ratings.get(&comic.id);
                build_item(
                    comic,
                    rank,
                    rating,
                    prev,
                    has_capture,
                    self.settings.capture_depth,
                )
            })
            .collect();

        Ok(RankingPage {
            category: query.category,
            period: query.period,
            rankings,
            total,
            last_updated: now,
            pagination: Pagination::new(query.page, query.limit, total),
        })
    }

    /// 记录所有 (category, period) 当前的前 capture_depth 名
    ///
    /// 聚合任务在覆盖汇总字段前调用，下一轮查询据此计算名次变化。
    pub async fn capture_positions(&self) -> Result<usize> {
        let now = Utc::now();
        let mut captured = 0;

        for category in RankingCategory::iter() {
            for period in RankingPeriod::iter() {
                let policy =
                    ranking_policy(category, period, now, self.settings.trending_window_days);
                let rows = self
                    .store
                    .query_ranked(&policy, 0, self.settings.capture_depth)
                    .await?;
                let ranks: Vec<(i64, u32)> = rows
                    .iter()
                    .enumerate()
                    .map(|(index, comic)| (comic.id, index as u32 + 1))
                    .collect();
                self.store
                    .replace_rank_snapshot(category, period, &ranks, now)
                    .await?;
                captured += ranks.len();
            }
        }

        info!("Captured {} ranking positions", captured);
        Ok(captured)
    }

    /// 清空进程内排行缓存
    pub fn invalidate_cache(&self) {
        self.cache.invalidate_all();
        info!("Ranking cache invalidated");
    }

    pub fn cached_entries(&self) -> u64 {
        self.cache.entry_count()
    }
}
