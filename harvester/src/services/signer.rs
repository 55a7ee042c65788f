//! 请求签名
//!
//! 签名算法本身是外部黑盒,这里只定义输入输出契约:
//! (查询字符串, 可选cookie) → 请求头映射

use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::process::Command;

use crate::models::ApiError;
use crate::utils::time_utils::{now_millis, now_secs};

/// 传给签名脚本的cookie环境变量
pub const SIGNER_COOKIE_ENV: &str = "HARVESTER_SIGNER_COOKIE";

/// 签名能力
///
/// 输入为最终发送的查询字符串。调用方只合并值非空的请求头。
#[async_trait]
pub trait RequestSigner: Send + Sync {
    async fn sign(
        &self,
        query: &str,
        cookie: Option<&str>,
    ) -> Result<HashMap<String, String>, ApiError>;
}

/// 不签名
///
/// 未配置签名脚本时使用,请求大概率会被服务器拒绝
pub struct UnsignedSigner;

#[async_trait]
impl RequestSigner for UnsignedSigner {
    async fn sign(
        &self,
        _query: &str,
        _cookie: Option<&str>,
    ) -> Result<HashMap<String, String>, ApiError> {
        Ok(HashMap::new())
    }
}

/// 外部脚本签名
///
/// 调用 `<program> <script> <query>`,cookie 通过环境变量
/// `HARVESTER_SIGNER_COOKIE` 传入,不出现在进程参数中。
/// stdout 输出请求头JSON对象,失败时输出 `{"error": "..."}` 并以非零状态退出
pub struct ScriptSigner {
    program: String,
    script: PathBuf,
}

#[derive(Debug, Deserialize)]
struct ScriptErrorResponse {
    error: String,
}

impl ScriptSigner {
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self::with_program("node", script)
    }

    pub fn with_program(program: impl Into<String>, script: impl Into<PathBuf>) -> Self {
        let script = script.into();
        let program = program.into();
        tracing::info!(
            program = %program,
            script = %script.display(),
            "Script signer initialized"
        );
        Self { program, script }
    }
}

#[async_trait]
impl RequestSigner for ScriptSigner {
    async fn sign(
        &self,
        query: &str,
        cookie: Option<&str>,
    ) -> Result<HashMap<String, String>, ApiError> {
        let mut command = Command::new(&self.program);
        command.arg(&self.script).arg(query);
        match cookie.filter(|c| !c.is_empty()) {
            Some(cookie) => command.env(SIGNER_COOKIE_ENV, cookie),
            None => command.env_remove(SIGNER_COOKIE_ENV),
        };

        let output = command.output().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to execute signer script");
            ApiError::SigningFailed(format!("signer execution failed: {}", e))
        })?;

        if !output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            if let Ok(err_response) = serde_json::from_str::<ScriptErrorResponse>(&stdout) {
                return Err(ApiError::SigningFailed(err_response.error));
            }
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!(stderr = %stderr, "Signer script failed");
            return Err(ApiError::SigningFailed(format!("signer failed: {}", stderr.trim())));
        }

        let headers: HashMap<String, String> =
            serde_json::from_slice(&output.stdout).map_err(|e| {
                ApiError::SigningFailed(format!("signer output is not a header map: {}", e))
            })?;

        tracing::debug!(header_count = headers.len(), "Request signed");
        Ok(headers)
    }
}

/// 模拟的移动端设备身份
///
/// 每个客户端生成一次,之后所有请求共用
#[derive(Debug, Clone)]
pub struct DeviceProfile {
    pub device_id: String,
    pub install_id: String,
    pub openudid: String,
}

impl DeviceProfile {
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        let mut numeric_id = || {
            rng.gen_range(7_000_000_000_000_000_000u64..7_400_000_000_000_000_000)
                .to_string()
        };
        let device_id = numeric_id();
        let install_id = numeric_id();
        Self {
            device_id,
            install_id,
            openudid: format!("{:016x}", rand::random::<u64>()),
        }
    }

    /// 每个请求共有的基础查询参数
    ///
    /// ts 与 _rticket 在每次调用时取当前时间
    pub fn base_params(&self) -> Vec<(String, String)> {
        let fixed: [(&str, &str); 24] = [
            ("aid", "1233"),
            ("app_name", "musical_ly"),
            ("app_type", "normal"),
            ("version_code", "350003"),
            ("version_name", "35.0.3"),
            ("manifest_version_code", "2023500030"),
            ("update_version_code", "2023500030"),
            ("device_platform", "android"),
            ("os", "android"),
            ("ssmix", "a"),
            ("device_type", "Pixel 7"),
            ("device_brand", "google"),
            ("os_api", "33"),
            ("os_version", "13"),
            ("host_abi", "arm64-v8a"),
            ("resolution", "1080*2400"),
            ("dpi", "420"),
            ("channel", "googleplay"),
            ("ac", "wifi"),
            ("app_language", "en"),
            ("language", "en"),
            ("region", "US"),
            ("sys_region", "US"),
            ("carrier_region", "US"),
        ];

        let mut params: Vec<(String, String)> = fixed
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        params.push(("timezone_name".into(), "America/New_York".into()));
        params.push(("device_id".into(), self.device_id.clone()));
        params.push(("iid".into(), self.install_id.clone()));
        params.push(("openudid".into(), self.openudid.clone()));
        params.push(("ts".into(), now_secs().to_string()));
        params.push(("_rticket".into(), now_millis().to_string()));
        params
    }
}
