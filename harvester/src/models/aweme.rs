//! 作品与账号模型
//!
//! 字段使用camelCase以对齐前端类型定义

use serde::{Deserialize, Serialize};

/// 目标账号信息
///
/// 一次查找获得,在整个获取会话期间保持不变。
/// `sec_uid` 是列表接口要求的不透明账号标识。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub uid: String,
    pub unique_id: String,
    pub sec_uid: String,
    pub aweme_count: u64,
    pub follower_count: u64,
    pub following_count: u64,
    pub avatar_uri: String,
}

/// 作品类型
///
/// 决定填充哪些媒体字段以及采用哪种下载策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AwemeType {
    /// 单个视频文件
    Video,
    /// 有序图片集
    Photo,
}

impl AwemeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AwemeType::Video => "VIDEO",
            AwemeType::Photo => "PHOTO",
        }
    }
}

/// 互动统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwemeStats {
    pub likes: u64,
    pub comments: u64,
    pub views: u64,
    pub collects: u64,
}

/// 视频媒体地址
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMedia {
    pub mp4_uri: String,
    pub cover_uri: String,
}

/// 单个作品 (视频或图集)
///
/// 不可变值对象,身份由 `id` 决定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwemeItem {
    pub id: String,
    #[serde(rename = "type")]
    pub aweme_type: AwemeType,
    pub url: String,
    pub description: String,
    /// 发布时间 (unix秒)
    pub created_at: i64,
    pub stats: AwemeStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoMedia>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images_uri: Option<Vec<String>>,
}

impl AwemeItem {
    /// 创建视频作品
    pub fn video(id: impl Into<String>, mp4_uri: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            aweme_type: AwemeType::Video,
            url: String::new(),
            description: String::new(),
            created_at: 0,
            stats: AwemeStats::default(),
            video: Some(VideoMedia {
                mp4_uri: mp4_uri.into(),
                cover_uri: String::new(),
            }),
            images_uri: None,
        }
    }

    /// 创建图集作品,图片顺序保持调用方给定的顺序
    pub fn photo(id: impl Into<String>, images_uri: Vec<String>) -> Self {
        Self {
            id: id.into(),
            aweme_type: AwemeType::Photo,
            url: String::new(),
            description: String::new(),
            created_at: 0,
            stats: AwemeStats::default(),
            video: None,
            images_uri: Some(images_uri),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_created_at(mut self, created_at: i64) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn with_stats(mut self, stats: AwemeStats) -> Self {
        self.stats = stats;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// 图集的图片数量,视频返回0
    pub fn image_count(&self) -> usize {
        self.images_uri.as_ref().map(Vec::len).unwrap_or(0)
    }
}

/// 分页游标
///
/// 服务器下发的不透明游标对,必须原样带入下一次请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationCursor {
    pub cursor: String,
    pub max_cursor: String,
    pub has_more: bool,
}

impl PaginationCursor {
    /// 遍历起点: ("0", "0", true)
    pub fn initial() -> Self {
        Self {
            cursor: "0".to_string(),
            max_cursor: "0".to_string(),
            has_more: true,
        }
    }
}

impl Default for PaginationCursor {
    fn default() -> Self {
        Self::initial()
    }
}

/// 列表接口单页结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwemePage {
    pub aweme_list: Vec<AwemeItem>,
    pub pagination: PaginationCursor,
}
