//! 文件命名
//!
//! 纯函数: (作品, 序列位置, 扩展名, 有序命名标记) → 文件名

use regex::Regex;
use std::sync::OnceLock;

use crate::models::{AwemeItem, NamingToken};

/// 描述清洗后为空时的占位名
pub const EMPTY_DESCRIPTION: &str = "no_desc";

/// 单个路径段的最大字符数
pub const MAX_COMPONENT_CHARS: usize = 100;

fn illegal_chars() -> &'static Regex {
    static ILLEGAL: OnceLock<Regex> = OnceLock::new();
    ILLEGAL.get_or_init(|| {
        Regex::new(r#"[<>:"/\\|?*\x00-\x1F\x7F]+"#).expect("illegal path character pattern")
    })
}

/// 清洗单个路径段
///
/// 去除常见文件系统不允许的字符与控制字符,去除首尾空白,
/// 最多保留100个字符。结果为空 (或为 `.`/`..`) 时返回占位名。
pub fn sanitize_component(input: &str, placeholder: &str) -> String {
    let stripped = illegal_chars().replace_all(input, "");
    let capped: String = stripped.trim().chars().take(MAX_COMPONENT_CHARS).collect();
    let cleaned = capped.trim_end();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        placeholder.to_string()
    } else {
        cleaned.to_string()
    }
}

/// 清洗作品描述
pub fn sanitize_description(description: &str) -> String {
    sanitize_component(description, EMPTY_DESCRIPTION)
}

/// 生成文件名
///
/// 按调用方给出的顺序解析每个标记并用 `_` 连接:
/// - NumericalOrder → position + 1
/// - ID → item.id
/// - Timestamp → 原始unix秒
/// - Description → 清洗后的描述
///
/// 没有任何标记得到非空值时回退为 `<id>.<ext>`
pub fn file_name(item: &AwemeItem, position: usize, ext: &str, tokens: &[NamingToken]) -> String {
    let parts: Vec<String> = tokens
        .iter()
        .map(|token| resolve_token(item, position, *token))
        .filter(|part| !part.is_empty())
        .collect();

    if parts.is_empty() {
        format!("{}.{}", item.id, ext)
    } else {
        format!("{}.{}", parts.join("_"), ext)
    }
}

/// 图集子目录名: 以jpg生成文件名后去掉扩展名
pub fn photo_folder_name(item: &AwemeItem, position: usize, tokens: &[NamingToken]) -> String {
    let name = file_name(item, position, "jpg", tokens);
    match name.strip_suffix(".jpg") {
        Some(stem) => stem.to_string(),
        None => name,
    }
}

/// 图集内第 index 张图片 (从0开始) 的文件名: `1.jpg`, `2.jpg`, ...
pub fn image_file_name(index: usize) -> String {
    format!("{}.jpg", index + 1)
}

fn resolve_token(item: &AwemeItem, position: usize, token: NamingToken) -> String {
    match token {
        NamingToken::NumericalOrder => (position + 1).to_string(),
        NamingToken::Id => sanitize_component(&item.id, ""),
        NamingToken::Timestamp => item.created_at.to_string(),
        NamingToken::Description => sanitize_description(&item.description),
    }
}
