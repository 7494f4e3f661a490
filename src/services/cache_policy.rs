//! 排行响应的缓存分级
//!
//! 周期越长数据变化越慢，缓存时间越长。

use std::time::Duration;

use crate::storage::RankingPeriod;

/// 出错时的 Cache-Control
pub const NO_STORE: &str = "no-store";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTier {
    /// 浏览器与 CDN 共用的 max-age（秒）
    pub max_age: u64,
    /// 过期后允许返回旧数据并后台刷新的时间（秒）
    pub stale_while_revalidate: u64,
}

impl CacheTier {
    pub const fn for_period(period: RankingPeriod) -> Self {
        match period {
            RankingPeriod::Daily => Self {
                max_age: 1800,
                stale_while_revalidate: 900,
            },
            RankingPeriod::Weekly => Self {
                max_age: 3600,
                stale_while_revalidate: 1800,
            },
            // all_time 和 monthly 同档
            RankingPeriod::Monthly | RankingPeriod::AllTime => Self {
                max_age: 7200,
                stale_while_revalidate: 3600,
            },
        }
    }

    pub fn header_value(&self) -> String {
        format!(
            "public, max-age={}, s-maxage={}, stale-while-revalidate={}",
            self.max_age, self.max_age, self.stale_while_revalidate
        )
    }

    /// 进程内缓存的 TTL
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.max_age)
    }
}
