//! 采集编排服务
//!
//! 把远程接口、凭证、文件传输组装成完整流程:
//! 查找账号 → 分页获取 → (选择) → 批量下载,以及单个作品下载

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::models::{
    AcquisitionSession, ApiError, AppError, DownloadEvent, DownloadJob, DownloadReport,
    EventSender, FetchEvent, NamingToken, OwnerIdentity, UserInfo, ValidationError, WalkOutcome,
};
use crate::services::config_service::AppConfig;
use crate::services::credentials::{
    CredentialProvider, RemoteCredentialProvider, StaticCredentialProvider,
};
use crate::services::download_scheduler::DownloadScheduler;
use crate::services::file_transfer::{FileTransfer, HttpFileTransfer};
use crate::services::pagination_walker::PaginationWalker;
use crate::services::signer::{RequestSigner, ScriptSigner, UnsignedSigner};
use crate::services::tiktok_api::{AwemeApi, TiktokApiClient};

const USER_AGENT: &str = "com.zhiliaoapp.musically/2023500030 (Linux; U; Android 13; en_US; Pixel 7; Build/TQ3A.230805.001; Cronet/TTNetVersion:5f9540e5 2023-08-18 QuicVersion:7aee791b 2023-08-07)";

/// 一次获取的结果
///
/// 请求失败时 `outcome` 为错误,`session` 仍保留已累积的数据
#[derive(Debug)]
pub struct Acquisition {
    /// 调用方输入的用户名
    pub username: String,
    pub user: UserInfo,
    pub session: AcquisitionSession,
    pub outcome: Result<WalkOutcome, ApiError>,
}

impl Acquisition {
    /// 下载目录名来源
    pub fn owner(&self) -> OwnerIdentity {
        OwnerIdentity::new(
            Some(self.user.unique_id.clone()),
            Some(self.username.clone()),
        )
    }
}

/// 采集编排服务
pub struct HarvestService {
    api: Arc<dyn AwemeApi>,
    credentials: Arc<dyn CredentialProvider>,
    transfer: Arc<dyn FileTransfer>,
}

impl HarvestService {
    pub fn new(
        api: Arc<dyn AwemeApi>,
        credentials: Arc<dyn CredentialProvider>,
        transfer: Arc<dyn FileTransfer>,
    ) -> Self {
        Self {
            api,
            credentials,
            transfer,
        }
    }

    /// 按配置组装真实的HTTP实现
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let api_http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout)
            .build()
            .map_err(ApiError::from)?;

        // 文件可能很大,只限制连接时间
        let transfer_http = reqwest::Client::builder()
            .connect_timeout(config.request_timeout)
            .build()
            .map_err(ApiError::from)?;

        let signer: Arc<dyn RequestSigner> = match &config.signer_script {
            Some(script) => Arc::new(ScriptSigner::with_program(
                config.signer_program.clone(),
                script.clone(),
            )),
            None => {
                tracing::warn!("No signer script configured, requests will be sent unsigned");
                Arc::new(UnsignedSigner)
            }
        };

        let credentials: Arc<dyn CredentialProvider> = match &config.cookie {
            Some(cookie) => Arc::new(StaticCredentialProvider::new(cookie.clone())),
            None => Arc::new(RemoteCredentialProvider::new(
                api_http.clone(),
                config.credentials_url.clone(),
            )),
        };

        let api = Arc::new(TiktokApiClient::with_base_url(
            api_http,
            signer,
            config.api_base_url.clone(),
        ));

        Ok(Self::new(
            api,
            credentials,
            Arc::new(HttpFileTransfer::new(transfer_http)),
        ))
    }

    /// 查找账号
    pub async fn lookup(&self, username: &str) -> Result<UserInfo, ApiError> {
        let username = username.trim().trim_start_matches('@');
        self.api.lookup_user(username).await
    }

    /// 获取账号的全部作品
    ///
    /// 凭证或账号查找失败直接返回错误,此时不会发出任何列表请求
    pub async fn acquire(
        &self,
        username: &str,
        page_delay: Duration,
        cancel_token: CancellationToken,
        events: Option<EventSender<FetchEvent>>,
    ) -> Result<Acquisition, ApiError> {
        let cookie = self.credentials.fetch_cookie().await?;
        let user = self.lookup(username).await?;

        let mut walker = PaginationWalker::new(self.api.clone(), page_delay)
            .with_cancellation_token(cancel_token);
        if let Some(sender) = events {
            walker = walker.with_event_sender(sender);
        }

        let outcome = walker.run(&user.sec_uid, &cookie).await;

        Ok(Acquisition {
            username: username.to_string(),
            user,
            session: walker.into_session(),
            outcome,
        })
    }

    /// 执行批量下载任务
    pub async fn download(
        &self,
        job: &DownloadJob,
        cancel_token: CancellationToken,
        events: Option<EventSender<DownloadEvent>>,
    ) -> Result<DownloadReport, ValidationError> {
        let mut scheduler =
            DownloadScheduler::new(self.transfer.clone()).with_cancellation_token(cancel_token);
        if let Some(sender) = events {
            scheduler = scheduler.with_event_sender(sender);
        }
        scheduler.run(job).await
    }

    /// 下载单个作品
    ///
    /// 序号为0,文件直接写入目标目录。凭证不可用时不带cookie请求详情。
    pub async fn download_single(
        &self,
        aweme_id: &str,
        destination: impl Into<PathBuf>,
        naming_tokens: Vec<NamingToken>,
    ) -> Result<DownloadReport, AppError> {
        let cookie = match self.credentials.fetch_cookie().await {
            Ok(cookie) => Some(cookie),
            Err(e) => {
                tracing::warn!(error = %e, "Credentials unavailable, fetching detail without cookie");
                None
            }
        };

        let item = self
            .api
            .fetch_aweme_detail(aweme_id.trim(), cookie.as_deref())
            .await?;

        tracing::info!(
            aweme_id = %item.id,
            aweme_type = %item.aweme_type.as_str(),
            "Single item resolved"
        );

        let job = DownloadJob::new(vec![item], destination)
            .with_naming_tokens(naming_tokens)
            .with_batch_size(1)
            .without_user_folder();

        let report = DownloadScheduler::new(self.transfer.clone()).run(&job).await?;
        Ok(report)
    }
}
