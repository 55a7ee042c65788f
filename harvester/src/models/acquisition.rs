//! 获取会话模型
//!
//! 一次"获取数据"对应一个会话,新的获取开始时整体替换,不跨会话合并

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::models::{AwemeItem, PaginationCursor};

/// 获取会话
///
/// 由唯一的分页遍历器持有,只有一个顺序写入者
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcquisitionSession {
    /// 按服务器顺序累积的作品 (不去重)
    pub items: Vec<AwemeItem>,
    /// 下一次请求要使用的游标
    pub cursor: PaginationCursor,
    /// 已成功获取的页数
    pub pages_fetched: u32,
    /// 在页边界观察到取消
    pub cancelled: bool,
}

impl AcquisitionSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一页结果并推进游标
    ///
    /// 游标整体替换为服务器返回值,不会复用或伪造
    pub fn absorb_page(&mut self, items: Vec<AwemeItem>, next: PaginationCursor) {
        self.items.extend(items);
        self.cursor = next;
        self.pages_fetched += 1;
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 重复出现的作品ID (按首次重复出现的顺序)
    ///
    /// 只用于报告,序列本身保持服务器给出的原样
    pub fn duplicate_ids(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        let mut duplicates = Vec::new();

        for item in &self.items {
            if !seen.insert(item.id.as_str()) && reported.insert(item.id.as_str()) {
                duplicates.push(item.id.clone());
            }
        }

        duplicates
    }
}

/// 分页遍历的正常终态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalkOutcome {
    /// 服务器报告 has_more = false
    Exhausted,
    /// 在页边界观察到取消,结果为部分数据
    Cancelled,
}
