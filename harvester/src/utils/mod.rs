//! 工具模块
//!
//! - file_namer: 文件命名与路径段清洗
//! - logger: 日志系统初始化
//! - time_utils: 时间转换与格式化

pub mod file_namer;
pub mod logger;
pub mod time_utils;
