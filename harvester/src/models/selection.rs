//! 作品选择
//!
//! 把累积的作品列表转换为下载任务使用的有序快照。
//! 快照顺序决定序号命名,之后的排序变化不会影响已构建的任务。

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::models::errors::ValidationError;
use crate::models::{AwemeItem, AwemeType};

/// 类型过滤
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TypeFilter {
    #[default]
    All,
    Video,
    Photo,
}

impl TypeFilter {
    fn accepts(&self, aweme_type: AwemeType) -> bool {
        match self {
            TypeFilter::All => true,
            TypeFilter::Video => aweme_type == AwemeType::Video,
            TypeFilter::Photo => aweme_type == AwemeType::Photo,
        }
    }
}

impl FromStr for TypeFilter {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "all" => Ok(TypeFilter::All),
            "video" => Ok(TypeFilter::Video),
            "photo" | "image" | "images" => Ok(TypeFilter::Photo),
            _ => Err(ValidationError::UnknownAwemeType(s.to_string())),
        }
    }
}

/// 可排序字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    CreatedAt,
    Likes,
    Comments,
    Views,
    Collects,
}

impl SortKey {
    fn value_of(&self, item: &AwemeItem) -> i128 {
        match self {
            SortKey::CreatedAt => i128::from(item.created_at),
            SortKey::Likes => i128::from(item.stats.likes),
            SortKey::Comments => i128::from(item.stats.comments),
            SortKey::Views => i128::from(item.stats.views),
            SortKey::Collects => i128::from(item.stats.collects),
        }
    }
}

impl FromStr for SortKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', '_'], "").as_str() {
            "createdat" | "created" | "date" => Ok(SortKey::CreatedAt),
            "likes" => Ok(SortKey::Likes),
            "comments" => Ok(SortKey::Comments),
            "views" => Ok(SortKey::Views),
            "collects" => Ok(SortKey::Collects),
            _ => Err(ValidationError::UnknownSortKey(s.to_string())),
        }
    }
}

/// 排序方向
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// 选择条件
///
/// 过滤 → 稳定排序 → 截断,结果即下载任务的输入顺序
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub type_filter: TypeFilter,
    /// ID子串过滤 (不区分大小写)
    pub id_filter: Option<String>,
    /// 描述子串过滤 (不区分大小写)
    pub description_filter: Option<String>,
    pub sort: Option<(SortKey, SortOrder)>,
    pub limit: Option<usize>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type_filter(mut self, type_filter: TypeFilter) -> Self {
        self.type_filter = type_filter;
        self
    }

    pub fn with_id_filter(mut self, needle: impl Into<String>) -> Self {
        self.id_filter = Some(needle.into());
        self
    }

    pub fn with_description_filter(mut self, needle: impl Into<String>) -> Self {
        self.description_filter = Some(needle.into());
        self
    }

    pub fn sorted_by(mut self, key: SortKey, order: SortOrder) -> Self {
        self.sort = Some((key, order));
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// 生成有序选择快照
    pub fn apply(&self, items: &[AwemeItem]) -> Vec<AwemeItem> {
        let id_needle = self.id_filter.as_deref().map(str::to_lowercase);
        let desc_needle = self.description_filter.as_deref().map(str::to_lowercase);

        let mut selected: Vec<AwemeItem> = items
            .iter()
            .filter(|item| self.type_filter.accepts(item.aweme_type))
            .filter(|item| contains_ci(&item.id, id_needle.as_deref()))
            .filter(|item| contains_ci(&item.description, desc_needle.as_deref()))
            .cloned()
            .collect();

        if let Some((key, order)) = self.sort {
            // sort_by_key 是稳定排序,相同值保持原始顺序
            match order {
                SortOrder::Ascending => selected.sort_by_key(|item| key.value_of(item)),
                SortOrder::Descending => {
                    selected.sort_by_key(|item| std::cmp::Reverse(key.value_of(item)))
                }
            }
        }

        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }

        selected
    }
}

fn contains_ci(haystack: &str, needle: Option<&str>) -> bool {
    match needle {
        None | Some("") => true,
        Some(needle) => haystack.to_lowercase().contains(needle),
    }
}
