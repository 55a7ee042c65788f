//! 批量获取并下载账号的全部作品
//!
//! - `models`: 数据结构与错误类型
//! - `services`: 远程接口、分页遍历、批量下载
//! - `utils`: 文件命名、日志、时间

pub mod models;
pub mod services;
pub mod utils;
