use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{AppError, Result};

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// 静态配置（从 TOML + 环境变量加载，启动时使用）
///
/// - server: 服务器地址、端口、CPU 数量
/// - database: 数据库连接与重试
/// - logging: 日志
/// - aggregation: 浏览量聚合任务
/// - rankings: 排行查询与缓存
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub aggregation: AggregationConfig,
    #[serde(default)]
    pub rankings: RankingsConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > config.toml > 默认值
    /// ENV 前缀：MR，分隔符：__
    /// 示例：MR__SERVER__PORT=9999
    pub fn load(path: &str) -> Self {
        use config::{Config, Environment, File};

        let builder = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("MR")
                    .separator("__")
                    .try_parsing(true),
            );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<StaticConfig>() {
                Ok(config) => {
                    if std::path::Path::new(path).exists() {
                        eprintln!("[INFO] Configuration loaded from: {}", path);
                    }
                    config
                }
                Err(e) => {
                    eprintln!("[ERROR] Failed to deserialize config: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("[ERROR] Failed to build config: {}", e);
                Self::default()
            }
        }
    }

    /// 生成示例 TOML 配置（全部为默认值）
    pub fn generate_sample_config() -> Result<String> {
        toml::to_string_pretty(&Self::default())
            .map_err(|e| AppError::serialization(e.to_string()))
    }

    /// 把示例配置写到指定路径，父目录不存在时自动创建
    pub fn write_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let content = Self::generate_sample_config()?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::file_operation(format!("无法创建目录 {}: {}", parent.display(), e))
            })?;
        }

        std::fs::write(path, content).map_err(|e| {
            AppError::file_operation(format!("无法写入 {}: {}", path.display(), e))
        })
    }
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_cpu_count")]
    pub cpu_count: usize,
}

/// 数据库连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_database_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_database_timeout")]
    pub timeout: u64,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "text" 或 "json"
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

/// 浏览量聚合任务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// 是否在 serve 模式下启动后台聚合任务
    #[serde(default = "default_aggregation_enabled")]
    pub enabled: bool,
    /// 两次全量聚合之间的间隔（分钟）
    #[serde(default = "default_aggregation_interval_minutes")]
    pub interval_minutes: u64,
    /// 启动后首次运行前的延迟（秒）
    #[serde(default = "default_aggregation_initial_delay_secs")]
    pub initial_delay_secs: u64,
    /// 每批并发处理的实体数
    #[serde(default = "default_aggregation_batch_size")]
    pub batch_size: usize,
    /// 批次之间的暂停（毫秒）
    #[serde(default = "default_aggregation_batch_delay_ms")]
    pub batch_delay_ms: u64,
    /// 快照保留天数
    #[serde(default = "default_snapshot_retention_days")]
    pub snapshot_retention_days: u32,
}

/// 排行查询配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingsConfig {
    #[serde(default = "default_rankings_default_limit")]
    pub default_limit: u32,
    #[serde(default = "default_rankings_max_limit")]
    pub max_limit: u32,
    /// trending 只统计最近 N 天内更新过的漫画
    #[serde(default = "default_trending_window_days")]
    pub trending_window_days: u32,
    /// 名次快照记录的深度（每个 category/period 记录前 N 名）
    #[serde(default = "default_capture_depth")]
    pub capture_depth: u32,
    /// POST /rankings 的共享密钥，未设置时不校验
    #[serde(default)]
    pub refresh_secret: Option<String>,
    /// 进程内排行结果缓存容量
    #[serde(default = "default_rankings_cache_capacity")]
    pub cache_capacity: u64,
}

// ============================================================
// Default value functions for static config
// ============================================================

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_cpu_count() -> usize {
    num_cpus::get()
}

fn default_database_url() -> String {
    "mangarank.db".to_string()
}

fn default_database_pool_size() -> u32 {
    10
}

fn default_database_timeout() -> u64 {
    30
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    100
}

fn default_retry_max_delay_ms() -> u64 {
    2000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

fn default_aggregation_enabled() -> bool {
    true
}

fn default_aggregation_interval_minutes() -> u64 {
    60
}

fn default_aggregation_initial_delay_secs() -> u64 {
    30
}

fn default_aggregation_batch_size() -> usize {
    10
}

fn default_aggregation_batch_delay_ms() -> u64 {
    100
}

fn default_snapshot_retention_days() -> u32 {
    90
}

fn default_rankings_default_limit() -> u32 {
    20
}

fn default_rankings_max_limit() -> u32 {
    50
}

fn default_trending_window_days() -> u32 {
    30
}

fn default_capture_depth() -> u32 {
    100
}

fn default_rankings_cache_capacity() -> u64 {
    1000
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            cpu_count: default_cpu_count(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            pool_size: default_database_pool_size(),
            timeout: default_database_timeout(),
            retry_count: default_retry_count(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            enabled: default_aggregation_enabled(),
            interval_minutes: default_aggregation_interval_minutes(),
            initial_delay_secs: default_aggregation_initial_delay_secs(),
            batch_size: default_aggregation_batch_size(),
            batch_delay_ms: default_aggregation_batch_delay_ms(),
            snapshot_retention_days: default_snapshot_retention_days(),
        }
    }
}

impl Default for RankingsConfig {
    fn default() -> Self {
        Self {
            default_limit: default_rankings_default_limit(),
            max_limit: default_rankings_max_limit(),
            trending_window_days: default_trending_window_days(),
            capture_depth: default_capture_depth(),
            refresh_secret: None,
            cache_capacity: default_rankings_cache_capacity(),
        }
    }
}
