//! 数据模型模块
//!
//! 包含所有核心数据结构:
//! - errors: 错误类型定义 (API、传输、验证、配置、应用级错误)
//! - aweme: 账号、作品、分页游标
//! - acquisition: 获取会话 (分页累积结果)
//! - download_job: 下载任务、命名标记、进度
//! - selection: 过滤与排序,生成下载快照
//! - events: 推送给调用方的进度事件

pub mod acquisition;
pub mod aweme;
pub mod download_job;
pub mod errors;
pub mod events;
pub mod selection;

// 重导出常用类型,简化外部引用
pub use acquisition::{AcquisitionSession, WalkOutcome};
pub use aweme::{AwemeItem, AwemePage, AwemeStats, AwemeType, PaginationCursor, UserInfo, VideoMedia};
pub use download_job::{
    DownloadJob, DownloadOutcome, DownloadProgress, DownloadReport, NamingToken, OwnerIdentity,
};
pub use errors::{ApiError, AppError, ConfigError, TransferError, ValidationError};
pub use events::{DownloadEvent, DownloadEventType, EventSender, FetchEvent, FetchEventType};
pub use selection::{Selection, SortKey, SortOrder, TypeFilter};
