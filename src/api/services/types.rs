//! API 类型定义

use serde::{Deserialize, Serialize};

/// 统一响应结构
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct RankingsQueryParams {
    pub category: Option<String>,
    pub period: Option<String>,
    // 按字符串接收，非数字时回落到默认值而不是 400
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct ViewStatisticsQueryParams {
    pub period: Option<String>,
    pub days: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct HealthStorageCheck {
    pub status: String,
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub uptime: u64,
    pub storage: HealthStorageCheck,
    pub ranking_cache_entries: u64,
    pub response_time_ms: u32,
}
