//! 服务层模块
//!
//! 包含所有业务逻辑服务:
//! - `tiktok_api`: 移动端API客户端 (账号查找、作品分页、作品详情)
//! - `signer` / `credentials`: 请求签名与会话凭证的外部契约
//! - `file_transfer`: 单文件流式下载
//! - `pagination_walker`: 游标分页遍历,可取消
//! - `download_scheduler`: 分批并发下载,可取消
//! - `harvest_service`: 组装上述服务的完整流程
//! - `config_service`: 环境变量与 .env 配置
//!
//! # 服务架构
//!
//! ```text
//! ┌─────────────────┐
//! │  CLI (main.rs)  │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌──────────────────────────────────────────────┐
//! │               HarvestService                 │
//! │  ┌──────────────────┐  ┌──────────────────┐  │
//! │  │ PaginationWalker │  │DownloadScheduler │  │
//! │  └────────┬─────────┘  └────────┬─────────┘  │
//! │           │                     │            │
//! │  ┌────────▼─────────┐  ┌────────▼─────────┐  │
//! │  │    AwemeApi      │  │   FileTransfer   │  │
//! │  └────────┬─────────┘  └──────────────────┘  │
//! └───────────┼──────────────────────────────────┘
//!             ▼
//!   RequestSigner + CredentialProvider
//! ```

pub mod config_service;
pub mod credentials;
pub mod download_scheduler;
pub mod file_transfer;
pub mod harvest_service;
pub mod pagination_walker;
pub mod signer;
pub mod tiktok_api;

// 重导出常用类型,简化外部引用
pub use config_service::AppConfig;
pub use credentials::{CredentialProvider, RemoteCredentialProvider, StaticCredentialProvider};
pub use download_scheduler::DownloadScheduler;
pub use file_transfer::{FileTransfer, HttpFileTransfer};
pub use harvest_service::{Acquisition, HarvestService};
pub use pagination_walker::{PaginationWalker, WalkHandle, WalkResult};
pub use signer::{DeviceProfile, RequestSigner, ScriptSigner, UnsignedSigner};
pub use tiktok_api::{AwemeApi, TiktokApiClient};
