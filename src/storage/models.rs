use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter};

use crate::errors::AppError;

/// 统计对象类型
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EntityType {
    Comic,
    Chapter,
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl std::str::FromStr for EntityType {
    type Err = AppError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "comic" => Ok(Self::Comic),
            "chapter" => Ok(Self::Chapter),
            _ => Err(AppError::validation(format!(
                "Invalid entity type: '{}'. Valid: comic, chapter",
                s
            ))),
        }
    }
}

/// 排行类别
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RankingCategory {
    MostViewed,
    HighestRated,
    MostBookmarked,
    Trending,
}

impl std::fmt::Display for RankingCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl std::str::FromStr for RankingCategory {
    type Err = AppError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "most_viewed" => Ok(Self::MostViewed),
            "highest_rated" => Ok(Self::HighestRated),
            "most_bookmarked" => Ok(Self::MostBookmarked),
            "trending" => Ok(Self::Trending),
            _ => Err(AppError::validation(format!(
                "Invalid category: '{}'. Valid: most_viewed, highest_rated, most_bookmarked, trending",
                s
            ))),
        }
    }
}

/// 排行周期
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RankingPeriod {
    Daily,
    Weekly,
    Monthly,
    AllTime,
}

impl RankingPeriod {
    /// 该周期对应的浏览量字段
    pub fn views_key(self) -> SortKey {
        match self {
            Self::Daily => SortKey::DailyViews,
            Self::Weekly => SortKey::WeeklyViews,
            Self::Monthly => SortKey::MonthlyViews,
            Self::AllTime => SortKey::TotalViews,
        }
    }
}

impl std::fmt::Display for RankingPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl std::str::FromStr for RankingPeriod {
    type Err = AppError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "all_time" => Ok(Self::AllTime),
            _ => Err(AppError::validation(format!(
                "Invalid period: '{}'. Valid: daily, weekly, monthly, all_time",
                s
            ))),
        }
    }
}

/// 三个滚动窗口的浏览量
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewStatistics {
    pub daily_views: u64,
    pub weekly_views: u64,
    pub monthly_views: u64,
}

/// 实体上已持久化的汇总字段
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredStatistics {
    pub daily_views: u64,
    pub weekly_views: u64,
    pub monthly_views: u64,
    /// 漫画为 total_views，章节为 view_count
    pub total_views: u64,
}

/// 快照历史中的一天
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotPoint {
    pub date: NaiveDate,
    pub daily_views: u64,
    pub weekly_views: u64,
    pub monthly_views: u64,
}

/// 排行可用的排序字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortKey {
    DailyViews,
    WeeklyViews,
    MonthlyViews,
    TotalViews,
    TotalFavorites,
    RatingCount,
}

/// 排行查询的过滤与排序规则
///
/// 所有规则都追加 total_views DESC、id ASC 作为次级排序。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankingPolicy {
    /// 主排序字段（降序）
    pub sort: SortKey,
    /// 要求该字段 > 0
    pub positive: Option<SortKey>,
    /// 要求至少有一条评分
    pub require_rating: bool,
    /// 要求 updated_at >= 该时间
    pub updated_since: Option<DateTime<Utc>>,
}

/// 排行查询返回的漫画行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedComic {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub cover_image_url: Option<String>,
    pub daily_views: u64,
    pub weekly_views: u64,
    pub monthly_views: u64,
    pub total_views: u64,
    pub total_favorites: u64,
}

/// 单部漫画的评分汇总
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RatingSummary {
    pub count: u64,
    pub sum: u64,
}

impl RatingSummary {
    /// 平均分，保留一位小数；没有评分时为 None（区分“未评分”与“0 分”）
    pub fn average(&self) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        let mean = self.sum as f64 / self.count as f64;
        Some((mean * 10.0).round() / 10.0)
    }
}
