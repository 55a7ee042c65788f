//! 分页遍历服务
//!
//! 核心职责:
//! - 按服务器游标逐页请求作品列表,直到 has_more = false
//! - 按服务器顺序累积结果 (不排序、不去重)
//! - 页间延迟,延迟期间响应取消
//! - 每页推送一次事件,调用方可边到达边消费
//!
//! 取消只在页边界生效,不会中断进行中的请求

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::models::events::emit;
use crate::models::{
    AcquisitionSession, ApiError, AppError, EventSender, FetchEvent, FetchEventType, WalkOutcome,
};
use crate::services::tiktok_api::AwemeApi;

/// 分页遍历器
///
/// 每次获取使用一个实例。`run` 开始时重置会话,只有遍历器自身写入会话。
pub struct PaginationWalker {
    api: Arc<dyn AwemeApi>,
    inter_page_delay: Duration,
    cancel_token: CancellationToken,
    events: Option<EventSender<FetchEvent>>,
    session: AcquisitionSession,
}

impl PaginationWalker {
    pub fn new(api: Arc<dyn AwemeApi>, inter_page_delay: Duration) -> Self {
        Self {
            api,
            inter_page_delay,
            cancel_token: CancellationToken::new(),
            events: None,
            session: AcquisitionSession::new(),
        }
    }

    /// 设置事件发送端
    pub fn with_event_sender(mut self, sender: EventSender<FetchEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    /// 使用外部取消令牌 (例如与Ctrl-C处理共享)
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    /// 请求取消,下一个页边界生效
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// 取消令牌 (可交给其他任务持有)
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// 当前会话 (失败后仍保留已累积的数据)
    pub fn session(&self) -> &AcquisitionSession {
        &self.session
    }

    pub fn into_session(self) -> AcquisitionSession {
        self.session
    }

    /// 执行遍历
    ///
    /// 正常结束返回 `Exhausted`,页边界观察到取消返回 `Cancelled`。
    /// 请求失败时立即结束并返回错误,不重试。
    pub async fn run(&mut self, sec_uid: &str, cookie: &str) -> Result<WalkOutcome, ApiError> {
        self.session = AcquisitionSession::new();
        let started = std::time::Instant::now();

        tracing::info!(
            sec_uid = %sec_uid,
            delay_ms = self.inter_page_delay.as_millis() as u64,
            "Pagination walk started"
        );
        self.emit(sec_uid, FetchEventType::Started);

        while self.session.cursor.has_more {
            if self.cancel_token.is_cancelled() {
                return Ok(self.finish_cancelled(sec_uid));
            }

            let page_number = self.session.pages_fetched + 1;
            let page = match self
                .api
                .fetch_aweme_page(sec_uid, &self.session.cursor, cookie)
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    tracing::error!(
                        sec_uid = %sec_uid,
                        page = page_number,
                        accumulated = self.session.len(),
                        error = %e,
                        "Page request failed, walk aborted"
                    );
                    self.emit(
                        sec_uid,
                        FetchEventType::Failed {
                            error: e.to_string(),
                            total_items: self.session.len(),
                        },
                    );
                    return Err(e);
                }
            };

            let has_more = page.pagination.has_more;
            let page_items = page.aweme_list;
            let event_items = page_items.clone();
            self.session.absorb_page(page_items, page.pagination);

            tracing::debug!(
                sec_uid = %sec_uid,
                page = page_number,
                items = event_items.len(),
                total_items = self.session.len(),
                has_more = has_more,
                "Page fetched"
            );
            self.emit(
                sec_uid,
                FetchEventType::PageFetched {
                    page: page_number,
                    items: event_items,
                    total_items: self.session.len(),
                    has_more,
                },
            );

            if has_more && !self.inter_page_delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(self.inter_page_delay) => {}
                    _ = self.cancel_token.cancelled() => {
                        tracing::debug!(sec_uid = %sec_uid, "Cancelled during page delay");
                    }
                }
            }
        }

        let duplicates = self.session.duplicate_ids();
        if !duplicates.is_empty() {
            tracing::warn!(
                sec_uid = %sec_uid,
                duplicate_count = duplicates.len(),
                "Server returned duplicate items across pages"
            );
        }

        let duration_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            sec_uid = %sec_uid,
            pages = self.session.pages_fetched,
            total_items = self.session.len(),
            duration_ms = duration_ms,
            "Pagination walk completed"
        );
        self.emit(
            sec_uid,
            FetchEventType::Completed {
                pages: self.session.pages_fetched,
                total_items: self.session.len(),
                duration_ms,
            },
        );

        Ok(WalkOutcome::Exhausted)
    }

    /// 在后台任务中遍历
    ///
    /// 返回的句柄持有事件接收端与取消能力,事件流在遍历结束时关闭
    pub fn start(mut self, sec_uid: impl Into<String>, cookie: impl Into<String>) -> WalkHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events = Some(tx);
        let cancel_token = self.cancel_token.clone();
        let sec_uid = sec_uid.into();
        let cookie = cookie.into();

        let join = tokio::spawn(async move {
            let outcome = self.run(&sec_uid, &cookie).await;
            // 发送端随遍历器一起释放,接收端随后读到结束
            WalkResult {
                session: self.into_session(),
                outcome,
            }
        });

        WalkHandle {
            events: rx,
            cancel_token,
            join,
        }
    }

    fn finish_cancelled(&mut self, sec_uid: &str) -> WalkOutcome {
        self.session.cancelled = true;
        tracing::info!(
            sec_uid = %sec_uid,
            pages = self.session.pages_fetched,
            total_items = self.session.len(),
            "Pagination walk cancelled"
        );
        self.emit(
            sec_uid,
            FetchEventType::Cancelled {
                pages: self.session.pages_fetched,
                total_items: self.session.len(),
            },
        );
        WalkOutcome::Cancelled
    }

    fn emit(&self, sec_uid: &str, event_type: FetchEventType) {
        emit(self.events.as_ref(), FetchEvent::new(sec_uid, event_type));
    }
}

/// 后台遍历结果
#[derive(Debug)]
pub struct WalkResult {
    pub session: AcquisitionSession,
    pub outcome: Result<WalkOutcome, ApiError>,
}

/// 后台遍历句柄
pub struct WalkHandle {
    events: mpsc::UnboundedReceiver<FetchEvent>,
    cancel_token: CancellationToken,
    join: JoinHandle<WalkResult>,
}

impl WalkHandle {
    /// 下一个事件,遍历结束后返回 None
    pub async fn next_event(&mut self) -> Option<FetchEvent> {
        self.events.recv().await
    }

    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// 等待遍历结束
    pub async fn wait(self) -> Result<WalkResult, AppError> {
        self.join
            .await
            .map_err(|e| AppError::TaskJoin(e.to_string()))
    }
}
