use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 远程API调用相关错误
///
/// 覆盖用户查找、分页列表、作品详情与凭证获取的全部失败场景。
/// 查找失败(`UserNotFound`)发生在分页开始之前,其余错误终止当前分页遍历。
#[derive(Debug, Error, Serialize, Deserialize)]
#[serde(tag = "error", content = "details")]
pub enum ApiError {
    /// 网络请求失败
    ///
    /// 可能原因:
    /// - 网络连接中断
    /// - 服务器不可达
    /// - DNS解析失败
    #[error("网络请求失败: {0}")]
    NetworkFailed(String),

    /// 目标账号不存在
    ///
    /// 搜索结果中没有 unique_id 与输入完全一致的用户
    #[error("用户 {username} 不存在")]
    UserNotFound { username: String },

    /// 作品不存在
    #[error("作品 {aweme_id} 不存在")]
    AwemeNotFound { aweme_id: String },

    /// 响应格式无效
    ///
    /// API返回的数据格式不符合预期
    #[error("响应格式无效: {0}")]
    InvalidResponse(String),

    /// 请求签名失败
    #[error("请求签名失败: {0}")]
    SigningFailed(String),

    /// 凭证不可用
    ///
    /// 远程凭证文档缺失或cookie为空
    #[error("凭证不可用: {0}")]
    CredentialsUnavailable(String),

    /// JSON解析失败
    #[error("响应数据解析失败: {0}")]
    JsonParseFailed(String),

    /// HTTP状态码错误
    ///
    /// 服务器返回了非2xx状态码 (签名被拒绝通常表现为此错误)
    #[error("HTTP错误 {status}: {message}")]
    HttpStatusError { status: u16, message: String },
}

/// 单个文件传输错误
///
/// 只影响一个文件,由下载调度器捕获并隔离
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("下载请求失败: {0}")]
    Network(String),

    #[error("下载返回HTTP {status}: {url}")]
    HttpStatus { status: u16, url: String },

    #[error("写入文件失败 {path}: {message}")]
    Io { path: String, message: String },
}

/// 参数验证错误
#[derive(Debug, Error, Serialize, Deserialize)]
#[serde(tag = "error", content = "details")]
pub enum ValidationError {
    /// 批大小必须为正整数
    #[error("批大小必须大于0")]
    InvalidBatchSize,

    /// 目标目录为空
    #[error("下载目录不能为空")]
    EmptyDestination,

    /// 未知的命名标记
    #[error("未知的文件命名标记: {0}")]
    UnknownNamingToken(String),

    /// 无效的排序字段
    #[error("未知的排序字段: {0}")]
    UnknownSortKey(String),

    /// 无效的作品类型过滤
    #[error("未知的作品类型: {0}")]
    UnknownAwemeType(String),
}

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 变量值无法解析
    #[error("配置项 {key} 的值无效: {value}")]
    InvalidValue { key: String, value: String },

    /// 没有可用的下载目录
    #[error("无法确定下载目录,请设置 HARVESTER_DOWNLOAD_DIR")]
    MissingDownloadDir,

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// 应用级错误
///
/// 命令行入口统一处理的错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("后台任务异常退出: {0}")]
    TaskJoin(String),
}

/// 实现从reqwest::Error到ApiError的转换
impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::NetworkFailed("请求超时".to_string())
        } else if err.is_connect() {
            ApiError::NetworkFailed("无法连接到服务器".to_string())
        } else if let Some(status) = err.status() {
            ApiError::HttpStatusError {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else if err.is_decode() {
            ApiError::JsonParseFailed(err.to_string())
        } else {
            ApiError::NetworkFailed(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::JsonParseFailed(err.to_string())
    }
}

impl From<reqwest::Error> for TransferError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => TransferError::HttpStatus {
                status: status.as_u16(),
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            },
            None => TransferError::Network(err.to_string()),
        }
    }
}
