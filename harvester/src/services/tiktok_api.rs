use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, COOKIE};
use reqwest::Url;
use serde::{Deserialize, Deserializer};
use std::sync::Arc;

use crate::models::{
    ApiError, AwemeItem, AwemePage, AwemeStats, AwemeType, PaginationCursor, UserInfo, VideoMedia,
};
use crate::services::signer::{DeviceProfile, RequestSigner};

/// 默认接口域名
pub const DEFAULT_API_BASE: &str = "https://aggr22-normal-alisg.tiktokv.com";

/// 请求头 x-tt-ttnet-origin-host 的值
pub const ORIGIN_HOST: &str = "api22-normal-c-alisg.tiktokv.com";

const USER_SEARCH_PATH: &str = "/aweme/v1/discover/search/";
const AWEME_LIST_PATH: &str = "/lite/v2/public/item/list/";
const AWEME_DETAIL_PATH: &str = "/aweme/v1/aweme/detail/";

/// 列表接口每页数量
pub const PAGE_SIZE: u32 = 21;

/// 远程作品接口
///
/// 分页遍历器与单作品下载只依赖这个契约,测试中以内存实现替换
#[async_trait]
pub trait AwemeApi: Send + Sync {
    /// 按用户名查找账号,只接受 unique_id 完全一致的结果
    async fn lookup_user(&self, username: &str) -> Result<UserInfo, ApiError>;

    /// 请求一页作品列表
    async fn fetch_aweme_page(
        &self,
        sec_uid: &str,
        cursor: &PaginationCursor,
        cookie: &str,
    ) -> Result<AwemePage, ApiError>;

    /// 获取单个作品详情
    async fn fetch_aweme_detail(
        &self,
        aweme_id: &str,
        cookie: Option<&str>,
    ) -> Result<AwemeItem, ApiError>;
}

/// 移动端API客户端
///
/// 职责:
/// - 拼装基础设备参数与接口参数
/// - 调用签名能力并合并非空签名头
/// - 把原始JSON规整为 `UserInfo` / `AwemeItem`
pub struct TiktokApiClient {
    http: reqwest::Client,
    signer: Arc<dyn RequestSigner>,
    device: DeviceProfile,
    base_url: String,
}

impl TiktokApiClient {
    pub fn new(http: reqwest::Client, signer: Arc<dyn RequestSigner>) -> Self {
        Self::with_base_url(http, signer, DEFAULT_API_BASE)
    }

    pub fn with_base_url(
        http: reqwest::Client,
        signer: Arc<dyn RequestSigner>,
        base_url: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let device = DeviceProfile::random();

        tracing::info!(
            base_url = %base_url,
            device_id = %device.device_id,
            "API client initialized"
        );

        Self {
            http,
            signer,
            device,
            base_url,
        }
    }

    /// 构建完整请求URL,返回 (url, 用于签名的查询字符串)
    fn build_url(&self, path: &str, params: &[(String, String)]) -> Result<(Url, String), ApiError> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| ApiError::NetworkFailed(format!("invalid endpoint url: {}", e)))?;
        url.query_pairs_mut()
            .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        let query = url.query().unwrap_or_default().to_string();
        Ok((url, query))
    }

    /// 发送签名GET请求并解析JSON
    async fn signed_get<T>(
        &self,
        path: &str,
        params: Vec<(String, String)>,
        cookie: Option<&str>,
    ) -> Result<T, ApiError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let (url, query) = self.build_url(path, &params)?;
        let signature = self.signer.sign(&query, cookie).await?;

        let mut request = self
            .http
            .get(url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header("x-tt-ttnet-origin-host", ORIGIN_HOST);

        if let Some(cookie) = cookie.filter(|c| !c.is_empty()) {
            request = request.header(COOKIE, cookie);
        }
        for (name, value) in signature.iter().filter(|(_, v)| !v.is_empty()) {
            request = request.header(name.as_str(), value.as_str());
        }

        tracing::debug!(path = %path, query_len = query.len(), "Sending signed request");

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(path = %path, status = status.as_u16(), "Request rejected");
            return Err(ApiError::HttpStatusError {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        if body.trim().is_empty() {
            // 签名被拒绝时服务器常返回200空响应
            return Err(ApiError::InvalidResponse(format!(
                "empty response from {}",
                path
            )));
        }

        Ok(serde_json::from_str(&body)?)
    }

    fn params_with(&self, extra: &[(&str, &str)]) -> Vec<(String, String)> {
        let mut params = self.device.base_params();
        params.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        params
    }
}

#[async_trait]
impl AwemeApi for TiktokApiClient {
    async fn lookup_user(&self, username: &str) -> Result<UserInfo, ApiError> {
        let params = self.params_with(&[
            ("cursor", "0"),
            ("keyword", username),
            ("count", "1"),
            ("type", "1"),
            ("search_source", "normal_search"),
        ]);

        let response: SearchResponse = self.signed_get(USER_SEARCH_PATH, params, None).await?;
        response.check_status()?;

        let user = find_exact_user(response.user_list, username)?;
        tracing::info!(
            unique_id = %user.unique_id,
            aweme_count = user.aweme_count,
            "User resolved"
        );
        Ok(user)
    }

    async fn fetch_aweme_page(
        &self,
        sec_uid: &str,
        cursor: &PaginationCursor,
        cookie: &str,
    ) -> Result<AwemePage, ApiError> {
        let count = PAGE_SIZE.to_string();
        let params = self.params_with(&[
            ("source", "0"),
            ("max_cursor", cursor.max_cursor.as_str()),
            ("cursor", cursor.cursor.as_str()),
            ("sec_user_id", sec_uid),
            ("count", count.as_str()),
            ("filter_private", "1"),
            ("lite_flow_schedule", "new"),
            ("cdn_cache_is_login", "1"),
            ("cdn_cache_strategy", "v0"),
            ("data_saver_type", "1"),
            ("data_saver_work", "false"),
            ("page_type", "2"),
        ]);

        let response: AwemeListResponse =
            self.signed_get(AWEME_LIST_PATH, params, Some(cookie)).await?;
        response.check_status()?;

        Ok(response.into_page())
    }

    async fn fetch_aweme_detail(
        &self,
        aweme_id: &str,
        cookie: Option<&str>,
    ) -> Result<AwemeItem, ApiError> {
        let params = self.params_with(&[
            ("aweme_id", aweme_id),
            ("origin_type", "web"),
            ("request_source", "0"),
        ]);

        let response: AwemeDetailResponse =
            self.signed_get(AWEME_DETAIL_PATH, params, cookie).await?;
        response.check_status()?;

        response
            .aweme_detail
            .map(RawAweme::into_item)
            .ok_or_else(|| ApiError::AwemeNotFound {
                aweme_id: aweme_id.to_string(),
            })
    }
}

/// 在搜索结果中查找 unique_id 完全一致的用户
fn find_exact_user(
    entries: Option<Vec<SearchUserEntry>>,
    username: &str,
) -> Result<UserInfo, ApiError> {
    entries
        .unwrap_or_default()
        .into_iter()
        .filter_map(|entry| entry.user_info)
        .find(|info| info.unique_id == username)
        .map(RawUserInfo::into_user_info)
        .ok_or_else(|| ApiError::UserNotFound {
            username: username.to_string(),
        })
}

// ==================== 原始响应结构 ====================

/// 数字或字符串形式的计数
fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

/// 游标值转换为字符串,缺失时为空串
fn cursor_string(value: Option<serde_json::Value>) -> String {
    match value {
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(serde_json::Value::String(s)) => s,
        _ => String::new(),
    }
}

/// has_more 只有等于1 (或true) 时视为还有更多
fn flag_is_set(value: &Option<serde_json::Value>) -> bool {
    match value {
        Some(serde_json::Value::Number(n)) => n.as_i64() == Some(1),
        Some(serde_json::Value::Bool(b)) => *b,
        _ => false,
    }
}

fn check_status_code(status_code: Option<i64>, status_msg: &Option<String>) -> Result<(), ApiError> {
    match status_code {
        Some(code) if code != 0 => Err(ApiError::InvalidResponse(format!(
            "status_code {}: {}",
            code,
            status_msg.as_deref().unwrap_or("")
        ))),
        _ => Ok(()),
    }
}

#[derive(Debug, Default, Deserialize)]
struct UrlList {
    #[serde(default)]
    url_list: Vec<String>,
}

impl UrlList {
    fn first(&self) -> Option<String> {
        self.url_list.iter().find(|u| !u.is_empty()).cloned()
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    status_code: Option<i64>,
    status_msg: Option<String>,
    user_list: Option<Vec<SearchUserEntry>>,
}

impl SearchResponse {
    fn check_status(&self) -> Result<(), ApiError> {
        check_status_code(self.status_code, &self.status_msg)
    }
}

#[derive(Debug, Deserialize)]
struct SearchUserEntry {
    user_info: Option<RawUserInfo>,
}

#[derive(Debug, Deserialize)]
struct RawUserInfo {
    #[serde(default)]
    uid: serde_json::Value,
    #[serde(default)]
    unique_id: String,
    #[serde(default)]
    sec_uid: String,
    #[serde(default, deserialize_with = "lenient_u64")]
    aweme_count: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    follower_count: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    following_count: u64,
    avatar_larger: Option<UrlList>,
}

impl RawUserInfo {
    fn into_user_info(self) -> UserInfo {
        UserInfo {
            uid: cursor_string(Some(self.uid)),
            unique_id: self.unique_id,
            sec_uid: self.sec_uid,
            aweme_count: self.aweme_count,
            follower_count: self.follower_count,
            following_count: self.following_count,
            avatar_uri: self
                .avatar_larger
                .and_then(|a| a.first())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AwemeListResponse {
    status_code: Option<i64>,
    status_msg: Option<String>,
    has_more: Option<serde_json::Value>,
    min_cursor: Option<serde_json::Value>,
    max_cursor: Option<serde_json::Value>,
    aweme_list: Option<Vec<RawAweme>>,
}

impl AwemeListResponse {
    fn check_status(&self) -> Result<(), ApiError> {
        check_status_code(self.status_code, &self.status_msg)
    }

    fn into_page(self) -> AwemePage {
        let has_more = flag_is_set(&self.has_more);
        AwemePage {
            aweme_list: self
                .aweme_list
                .unwrap_or_default()
                .into_iter()
                .map(RawAweme::into_item)
                .collect(),
            pagination: PaginationCursor {
                cursor: cursor_string(self.min_cursor),
                max_cursor: cursor_string(self.max_cursor),
                has_more,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct AwemeDetailResponse {
    status_code: Option<i64>,
    status_msg: Option<String>,
    aweme_detail: Option<RawAweme>,
}

impl AwemeDetailResponse {
    fn check_status(&self) -> Result<(), ApiError> {
        check_status_code(self.status_code, &self.status_msg)
    }
}

#[derive(Debug, Deserialize)]
struct RawAweme {
    aweme_id: String,
    #[serde(default)]
    desc: String,
    #[serde(default)]
    create_time: i64,
    share_url: Option<String>,
    author: Option<RawAuthor>,
    statistics: Option<RawStatistics>,
    video: Option<RawVideo>,
    image_post_info: Option<RawImagePostInfo>,
}

#[derive(Debug, Deserialize)]
struct RawAuthor {
    #[serde(default)]
    unique_id: String,
}

#[derive(Debug, Deserialize)]
struct RawStatistics {
    #[serde(default, deserialize_with = "lenient_u64")]
    digg_count: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    comment_count: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    play_count: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    collect_count: u64,
}

#[derive(Debug, Deserialize)]
struct RawVideo {
    play_addr: Option<UrlList>,
    cover: Option<UrlList>,
}

#[derive(Debug, Deserialize)]
struct RawImagePostInfo {
    #[serde(default)]
    images: Vec<RawImage>,
}

#[derive(Debug, Deserialize)]
struct RawImage {
    display_image: Option<UrlList>,
}

impl RawAweme {
    /// 规整为 `AwemeItem`
    ///
    /// image_post_info 中有图片时为图集,否则为视频。图片顺序保持原样。
    fn into_item(self) -> AwemeItem {
        let images: Vec<String> = self
            .image_post_info
            .map(|info| {
                info.images
                    .into_iter()
                    .filter_map(|image| image.display_image.and_then(|d| d.first()))
                    .collect()
            })
            .unwrap_or_default();

        let author = self
            .author
            .map(|a| a.unique_id)
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| "_".to_string());
        let url = self
            .share_url
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| format!("https://www.tiktok.com/@{}/video/{}", author, self.aweme_id));

        let stats = self
            .statistics
            .map(|s| AwemeStats {
                likes: s.digg_count,
                comments: s.comment_count,
                views: s.play_count,
                collects: s.collect_count,
            })
            .unwrap_or_default();

        let (aweme_type, video, images_uri) = if images.is_empty() {
            let video = self.video.and_then(|v| {
                let mp4_uri = v.play_addr.and_then(|p| p.first())?;
                Some(VideoMedia {
                    mp4_uri,
                    cover_uri: v.cover.and_then(|c| c.first()).unwrap_or_default(),
                })
            });
            (AwemeType::Video, video, None)
        } else {
            (AwemeType::Photo, None, Some(images))
        };

        AwemeItem {
            id: self.aweme_id,
            aweme_type,
            url,
            description: self.desc,
            created_at: self.create_time,
            stats,
            video,
            images_uri,
        }
    }
}
