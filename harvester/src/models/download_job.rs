//! 下载任务模型
//!
//! 一次"下载"操作构建一个 `DownloadJob`,从选择快照生成,构建后不再修改

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

use crate::models::errors::ValidationError;
use crate::models::AwemeItem;
use crate::utils::file_namer::sanitize_component;

/// 用户目录名无法确定时的占位名
pub const UNKNOWN_USER_FOLDER: &str = "unknown_user";

/// 默认批大小
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// 文件命名标记
///
/// 调用方给出的顺序即文件名中各段的顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamingToken {
    /// 作品在选择序列中的位置 (从1开始)
    NumericalOrder,
    /// 作品ID
    #[serde(rename = "ID")]
    Id,
    /// 发布时间 (原始unix秒)
    Timestamp,
    /// 清洗后的描述
    Description,
}

impl NamingToken {
    pub fn as_str(&self) -> &'static str {
        match self {
            NamingToken::NumericalOrder => "NumericalOrder",
            NamingToken::Id => "ID",
            NamingToken::Timestamp => "Timestamp",
            NamingToken::Description => "Description",
        }
    }

    /// 解析逗号分隔的标记列表,保留首次出现的顺序并去重
    ///
    /// 空字符串得到空列表 (文件名回退为 `<id>.<ext>`)
    pub fn parse_list(input: &str) -> Result<Vec<NamingToken>, ValidationError> {
        let mut tokens = Vec::new();
        for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let token = part.parse::<NamingToken>()?;
            if !tokens.contains(&token) {
                tokens.push(token);
            }
        }
        Ok(tokens)
    }
}

impl fmt::Display for NamingToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NamingToken {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "numericalorder" | "order" | "index" => Ok(NamingToken::NumericalOrder),
            "id" => Ok(NamingToken::Id),
            "timestamp" | "time" => Ok(NamingToken::Timestamp),
            "description" | "desc" => Ok(NamingToken::Description),
            _ => Err(ValidationError::UnknownNamingToken(s.to_string())),
        }
    }
}

/// 下载目标账号的身份
///
/// 用户目录名每个任务只计算一次: 已解析的 unique_id 优先,
/// 其次是原始输入用户名,最后是固定占位名
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerIdentity {
    pub unique_id: Option<String>,
    pub input_username: Option<String>,
}

impl OwnerIdentity {
    pub fn new(unique_id: Option<String>, input_username: Option<String>) -> Self {
        Self {
            unique_id,
            input_username,
        }
    }

    /// 计算用户目录名
    pub fn folder_name(&self) -> String {
        let best = [self.unique_id.as_deref(), self.input_username.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|name| !name.is_empty());

        match best {
            Some(name) => sanitize_component(name, UNKNOWN_USER_FOLDER),
            None => UNKNOWN_USER_FOLDER.to_string(),
        }
    }
}

/// 下载任务
///
/// 字段在构建后保持不变:
/// - selected_items: 选择时可见的顺序,序号命名基于该顺序
/// - naming_tokens: 有序且不重复的命名标记
/// - destination_root: 下载根目录
/// - owner: 用户目录名来源
/// - batch_size / inter_batch_delay: 批调度参数
#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub id: String,
    pub selected_items: Vec<AwemeItem>,
    pub naming_tokens: Vec<NamingToken>,
    pub destination_root: PathBuf,
    pub owner: OwnerIdentity,
    pub batch_size: usize,
    pub inter_batch_delay: Duration,
    /// 为 false 时文件直接写入 destination_root (单个作品下载)
    pub use_user_folder: bool,
}

impl DownloadJob {
    /// 创建新任务
    ///
    /// 默认: 命名标记 [NumericalOrder, ID], 批大小5, 无批间延迟
    pub fn new(selected_items: Vec<AwemeItem>, destination_root: impl Into<PathBuf>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            selected_items,
            naming_tokens: vec![NamingToken::NumericalOrder, NamingToken::Id],
            destination_root: destination_root.into(),
            owner: OwnerIdentity::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            inter_batch_delay: Duration::ZERO,
            use_user_folder: true,
        }
    }

    /// 设置命名标记 (构建器模式),重复标记只保留第一次出现
    pub fn with_naming_tokens(mut self, tokens: impl IntoIterator<Item = NamingToken>) -> Self {
        let mut ordered = Vec::new();
        for token in tokens {
            if !ordered.contains(&token) {
                ordered.push(token);
            }
        }
        self.naming_tokens = ordered;
        self
    }

    pub fn with_owner(mut self, owner: OwnerIdentity) -> Self {
        self.owner = owner;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_inter_batch_delay_ms(mut self, delay_ms: u64) -> Self {
        self.inter_batch_delay = Duration::from_millis(delay_ms);
        self
    }

    /// 文件直接写入根目录,不创建用户子目录
    pub fn without_user_folder(mut self) -> Self {
        self.use_user_folder = false;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.batch_size == 0 {
            return Err(ValidationError::InvalidBatchSize);
        }
        if self.destination_root.as_os_str().is_empty() {
            return Err(ValidationError::EmptyDestination);
        }
        Ok(())
    }

    /// 本任务所有文件所在的目录
    pub fn user_folder(&self) -> PathBuf {
        if self.use_user_folder {
            self.destination_root.join(self.owner.folder_name())
        } else {
            self.destination_root.clone()
        }
    }

    pub fn total(&self) -> usize {
        self.selected_items.len()
    }

    /// 批数量: ⌈n/b⌉
    pub fn batch_count(&self) -> usize {
        if self.batch_size == 0 {
            return 0;
        }
        self.selected_items.len().div_ceil(self.batch_size)
    }

    pub fn destination_root(&self) -> &Path {
        &self.destination_root
    }
}

/// 下载进度
///
/// `current` 按作品计数 (多图作品计为一个单位),任务结束前单调不减。
/// `failed_ids` 记录至少一个文件传输失败的作品。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadProgress {
    pub current: usize,
    pub total: usize,
    pub failed_ids: BTreeSet<String>,
}

impl DownloadProgress {
    pub fn new(total: usize) -> Self {
        Self {
            current: 0,
            total,
            failed_ids: BTreeSet::new(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.current >= self.total
    }
}

/// 任务终态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadOutcome {
    /// 所有批次处理完毕 (可能包含单项失败)
    Completed,
    /// 在批边界观察到取消
    Cancelled,
}

/// 下载任务结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadReport {
    pub job_id: String,
    pub outcome: DownloadOutcome,
    pub progress: DownloadProgress,
    pub batches_run: usize,
    pub duration_ms: u64,
}
