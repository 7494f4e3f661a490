//! 浏览统计计算与聚合
//!
//! - `calculator`：单个实体的滚动窗口计数
//! - `aggregation`：批量重算、每日快照、快照清理
//! - `scheduler`：后台定时聚合任务

pub mod aggregation;
pub mod calculator;
pub mod scheduler;

pub use aggregation::{AggregationJob, AggregationReport, AggregationSettings, ProcessedCounts};
pub use calculator::StatisticsCalculator;
pub use scheduler::AggregationScheduler;

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// 日窗口：过去 24 小时
pub const DAILY_WINDOW: Duration = Duration::hours(24);
/// 周窗口：过去 7 天
pub const WEEKLY_WINDOW: Duration = Duration::days(7);
/// 月窗口：过去 30 天（固定天数，不是自然月）
pub const MONTHLY_WINDOW: Duration = Duration::days(30);

/// 截断到日期（UTC）
#[inline]
pub fn truncate_to_day(ts: DateTime<Utc>) -> NaiveDate {
    ts.date_naive()
}
