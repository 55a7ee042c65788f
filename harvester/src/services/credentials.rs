//! 会话凭证
//!
//! cookie 作为不透明字符串使用,本模块只负责取得它,不记录其内容

use async_trait::async_trait;
use serde::Deserialize;

use crate::models::ApiError;

/// 凭证来源
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// 获取会话cookie
    async fn fetch_cookie(&self) -> Result<String, ApiError>;
}

/// 固定cookie (来自配置)
pub struct StaticCredentialProvider {
    cookie: String,
}

impl StaticCredentialProvider {
    pub fn new(cookie: impl Into<String>) -> Self {
        Self {
            cookie: cookie.into(),
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn fetch_cookie(&self) -> Result<String, ApiError> {
        if self.cookie.trim().is_empty() {
            return Err(ApiError::CredentialsUnavailable(
                "configured cookie is empty".to_string(),
            ));
        }
        Ok(self.cookie.clone())
    }
}

/// 远程凭证文档
///
/// 格式: `{"cookie": "..."}`
#[derive(Debug, Deserialize)]
struct CredentialsDocument {
    #[serde(default)]
    cookie: String,
}

/// 从远程静态JSON文档获取cookie
pub struct RemoteCredentialProvider {
    http: reqwest::Client,
    url: String,
}

impl RemoteCredentialProvider {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

#[async_trait]
impl CredentialProvider for RemoteCredentialProvider {
    async fn fetch_cookie(&self) -> Result<String, ApiError> {
        tracing::debug!(url = %self.url, "Fetching remote credentials");

        let response = self.http.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::CredentialsUnavailable(format!(
                "credentials document returned HTTP {}",
                status.as_u16()
            )));
        }

        let body = response.text().await?;
        parse_credentials(&body)
    }
}

fn parse_credentials(body: &str) -> Result<String, ApiError> {
    let document: CredentialsDocument = serde_json::from_str(body)?;
    let cookie = document.cookie.trim().to_string();
    if cookie.is_empty() {
        return Err(ApiError::CredentialsUnavailable(
            "credentials document has no cookie".to_string(),
        ));
    }

    // 不记录cookie内容,只记录长度
    tracing::info!(cookie_len = cookie.len(), "Credentials loaded");
    Ok(cookie)
}
