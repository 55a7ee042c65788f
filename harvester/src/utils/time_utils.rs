use chrono::{DateTime, Utc};

/// unix秒转换为UTC时间
///
/// 超出可表示范围时返回 None
pub fn epoch_to_utc(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

/// 格式化作品发布时间用于展示
///
/// 输出格式: YYYY-MM-DD HH:MM:SS (UTC),0或无效值输出 "-"
pub fn format_created_at(secs: i64) -> String {
    if secs <= 0 {
        return "-".to_string();
    }
    epoch_to_utc(secs)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// 当前unix秒 (请求参数 ts)
pub fn now_secs() -> i64 {
    Utc::now().timestamp()
}

/// 当前unix毫秒 (请求参数 _rticket)
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
