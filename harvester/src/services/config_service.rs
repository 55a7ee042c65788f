use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::models::download_job::DEFAULT_BATCH_SIZE;
use crate::models::{ConfigError, NamingToken, ValidationError};
use crate::services::tiktok_api::DEFAULT_API_BASE;

/// 默认远程凭证文档
pub const DEFAULT_CREDENTIALS_URL: &str = "https://gist.githubusercontent.com/minhchi1509/96e7a0a0ecb2ff5035ee1a34a1c3cdf7/raw/tiktok-credentials.json";

const DEFAULT_NAMING: &str = "order,id";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// 应用配置
///
/// 读取顺序: 进程环境变量优先,其次 .env 文件,最后内置默认值
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HARVESTER_API_BASE
    pub api_base_url: String,
    /// HARVESTER_CREDENTIALS_URL
    pub credentials_url: String,
    /// HARVESTER_COOKIE: 设置后不再请求远程凭证
    pub cookie: Option<String>,
    /// HARVESTER_SIGNER_SCRIPT: 未设置时请求不签名
    pub signer_script: Option<PathBuf>,
    /// HARVESTER_SIGNER_PROGRAM (默认: node)
    pub signer_program: String,
    /// HARVESTER_DOWNLOAD_DIR (默认: 系统下载目录)
    pub download_dir: PathBuf,
    /// HARVESTER_PAGE_DELAY_MS
    pub page_delay: Duration,
    /// HARVESTER_BATCH_SIZE
    pub batch_size: usize,
    /// HARVESTER_BATCH_DELAY_MS
    pub batch_delay: Duration,
    /// HARVESTER_NAMING: 逗号分隔,如 "order,id"
    pub naming_tokens: Vec<NamingToken>,
    /// HARVESTER_LOG_DIR
    pub log_dir: PathBuf,
    /// HARVESTER_REQUEST_TIMEOUT_SECS
    pub request_timeout: Duration,
}

impl AppConfig {
    /// 从环境加载配置
    ///
    /// .env 文件不存在时不报错
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!(error = %e, "Failed to read .env file, ignored"),
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 通过任意键值来源构建配置
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let download_dir = match get("HARVESTER_DOWNLOAD_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => dirs::download_dir().ok_or(ConfigError::MissingDownloadDir)?,
        };

        let log_dir = get("HARVESTER_LOG_DIR").map(PathBuf::from).unwrap_or_else(|| {
            dirs::data_local_dir()
                .map(|dir| dir.join("aweme-harvester").join("logs"))
                .unwrap_or_else(|| PathBuf::from("logs"))
        });

        let batch_size = parse_or("HARVESTER_BATCH_SIZE", get("HARVESTER_BATCH_SIZE"), DEFAULT_BATCH_SIZE)?;
        if batch_size == 0 {
            return Err(ValidationError::InvalidBatchSize.into());
        }

        let naming = get("HARVESTER_NAMING").unwrap_or_else(|| DEFAULT_NAMING.to_string());

        let config = Self {
            api_base_url: get("HARVESTER_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            credentials_url: get("HARVESTER_CREDENTIALS_URL")
                .unwrap_or_else(|| DEFAULT_CREDENTIALS_URL.to_string()),
            cookie: get("HARVESTER_COOKIE"),
            signer_script: get("HARVESTER_SIGNER_SCRIPT").map(PathBuf::from),
            signer_program: get("HARVESTER_SIGNER_PROGRAM").unwrap_or_else(|| "node".to_string()),
            download_dir,
            page_delay: Duration::from_millis(parse_or(
                "HARVESTER_PAGE_DELAY_MS",
                get("HARVESTER_PAGE_DELAY_MS"),
                0,
            )?),
            batch_size,
            batch_delay: Duration::from_millis(parse_or(
                "HARVESTER_BATCH_DELAY_MS",
                get("HARVESTER_BATCH_DELAY_MS"),
                0,
            )?),
            naming_tokens: NamingToken::parse_list(&naming)?,
            log_dir,
            request_timeout: Duration::from_secs(parse_or(
                "HARVESTER_REQUEST_TIMEOUT_SECS",
                get("HARVESTER_REQUEST_TIMEOUT_SECS"),
                DEFAULT_TIMEOUT_SECS,
            )?),
        };

        Ok(config)
    }
}

fn parse_or<T: std::str::FromStr>(
    key: &str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw,
        }),
    }
}
