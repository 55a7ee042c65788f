//! 进度与结果事件
//!
//! 核心组件通过通道推送带标签的事件,与任何具体的界面运行时解耦

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use crate::models::AwemeItem;

/// 事件发送端
pub type EventSender<T> = UnboundedSender<T>;

/// 分页获取事件
#[derive(Debug, Clone, Serialize)]
pub struct FetchEvent {
    pub sec_uid: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: FetchEventType,
}

/// 分页获取事件类型
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum FetchEventType {
    /// 开始遍历
    Started,
    /// 一页数据到达 (懒序列中的一个批次)
    PageFetched {
        page: u32,
        items: Vec<AwemeItem>,
        total_items: usize,
        has_more: bool,
    },
    /// 服务器报告没有更多数据
    Completed {
        pages: u32,
        total_items: usize,
        duration_ms: u64,
    },
    /// 在页边界观察到取消
    Cancelled { pages: u32, total_items: usize },
    /// 请求失败,已累积的数据保留
    Failed { error: String, total_items: usize },
}

impl FetchEvent {
    pub fn new(sec_uid: &str, event_type: FetchEventType) -> Self {
        Self {
            sec_uid: sec_uid.to_string(),
            timestamp: Utc::now(),
            event_type,
        }
    }
}

/// 下载任务事件
#[derive(Debug, Clone, Serialize)]
pub struct DownloadEvent {
    pub job_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: DownloadEventType,
}

/// 下载任务事件类型
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum DownloadEventType {
    /// 任务开始
    Started { total: usize, batches: usize },
    /// 批次开始
    BatchStarted {
        batch_index: usize,
        item_ids: Vec<String>,
    },
    /// 单个作品处理完毕 (成功或失败都计入进度)
    ItemFinished {
        item_id: String,
        success: bool,
        current: usize,
        total: usize,
    },
    /// 所有批次处理完毕
    Completed {
        current: usize,
        total: usize,
        failed_ids: Vec<String>,
    },
    /// 在批边界观察到取消
    Cancelled { current: usize, total: usize },
}

impl DownloadEvent {
    pub fn new(job_id: &str, event_type: DownloadEventType) -> Self {
        Self {
            job_id: job_id.to_string(),
            timestamp: Utc::now(),
            event_type,
        }
    }
}

/// 推送事件,接收端已关闭时只记录日志
pub(crate) fn emit<T>(sender: Option<&EventSender<T>>, event: T) {
    if let Some(sender) = sender {
        if sender.send(event).is_err() {
            tracing::debug!("Event receiver dropped, event discarded");
        }
    }
}
