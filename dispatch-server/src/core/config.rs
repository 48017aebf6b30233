use std::path::PathBuf;
use std::time::Duration;

/// 服务器配置 - 调度服务的所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./work_dir | 工作目录 (redb 文件) |
/// | HTTP_PORT | 8090 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_JSON | false | JSON 日志格式 |
/// | LOG_DIR | (无) | 滚动日志目录 |
/// | PROVIDER_DIRECTORY_URL | (无) | 远程服务商目录地址，未设置时使用内存目录 |
/// | PROVIDER_SEED_FILE | (无) | 内存目录的服务商 JSON 种子文件；未设置时内存目录为空，派单总是找不到服务商 |
/// | DIRECTORY_TIMEOUT_MS | 5000 | 目录请求超时(毫秒) |
/// | TRACK_POLL_INTERVAL_MS | 5000 | 位置追踪轮询间隔(毫秒) |
/// | LEDGER_QUEUE_CAPACITY | 1024 | 账本写后队列容量 |
/// | LEDGER_AUDIT_INTERVAL_SECS | 3600 | 账本链审计间隔(秒)，0 表示禁用 |
/// | SHUTDOWN_TIMEOUT_MS | 10000 | 关闭超时(毫秒) |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/dispatch HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储 redb 数据库文件
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 运行环境: development | staging | production
    pub environment: String,
    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<String>,
    /// 远程服务商目录 URL
    pub provider_directory_url: Option<String>,
    /// 内存目录种子文件 (仅在未配置远程目录时使用)
    pub provider_seed_file: Option<String>,
    pub directory_timeout_ms: u64,
    pub track_poll_interval_ms: u64,
    pub ledger_queue_capacity: usize,
    /// 账本链审计间隔，0 = 禁用
    pub ledger_audit_interval_secs: u64,
    /// 关闭超时时间 (毫秒)
    pub shutdown_timeout_ms: u64,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./work_dir".into()),
            http_port: env_parse("HTTP_PORT", 8090),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: env_parse("LOG_JSON", false),
            log_dir: env_opt("LOG_DIR"),
            provider_directory_url: env_opt("PROVIDER_DIRECTORY_URL"),
            provider_seed_file: env_opt("PROVIDER_SEED_FILE"),
            directory_timeout_ms: env_parse("DIRECTORY_TIMEOUT_MS", 5000),
            track_poll_interval_ms: env_parse("TRACK_POLL_INTERVAL_MS", 5000),
            ledger_queue_capacity: env_parse("LEDGER_QUEUE_CAPACITY", 1024),
            ledger_audit_interval_secs: env_parse("LEDGER_AUDIT_INTERVAL_SECS", 3600),
            shutdown_timeout_ms: env_parse("SHUTDOWN_TIMEOUT_MS", 10000),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    pub fn orders_db_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("orders.redb")
    }

    pub fn ledger_db_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("ledger.redb")
    }

    pub fn directory_timeout(&self) -> Duration {
        Duration::from_millis(self.directory_timeout_ms)
    }

    pub fn track_poll_interval(&self) -> Duration {
        Duration::from_millis(self.track_poll_interval_ms.max(1))
    }

    /// 审计禁用时返回 `None`
    pub fn ledger_audit_interval(&self) -> Option<Duration> {
        (self.ledger_audit_interval_secs > 0)
            .then(|| Duration::from_secs(self.ledger_audit_interval_secs))
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
