//! 单文件传输
//!
//! "一个URL复制到一个文件"的最小原语: 创建目录、流式写入,不缓存整个文件
//!
//! 响应先写入同目录下唯一的 `.part` 临时文件,完整收到后再重命名为目标文件

use async_trait::async_trait;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::models::TransferError;

/// 文件传输能力
#[async_trait]
pub trait FileTransfer: Send + Sync {
    /// 下载 `url` 到 `dir/file_name`,目录不存在时递归创建
    ///
    /// 成功返回写入的字节数
    async fn transfer(&self, url: &str, dir: &Path, file_name: &str) -> Result<u64, TransferError>;
}

/// 基于HTTP的流式传输
pub struct HttpFileTransfer {
    http: reqwest::Client,
}

impl HttpFileTransfer {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

fn io_error(path: &Path, err: std::io::Error) -> TransferError {
    TransferError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

async fn write_body(response: reqwest::Response, part: &Path) -> Result<u64, TransferError> {
    let mut file = fs::File::create(part).await.map_err(|e| io_error(part, e))?;
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await.map_err(|e| io_error(part, e))?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(|e| io_error(part, e))?;
    Ok(written)
}

#[async_trait]
impl FileTransfer for HttpFileTransfer {
    async fn transfer(&self, url: &str, dir: &Path, file_name: &str) -> Result<u64, TransferError> {
        fs::create_dir_all(dir).await.map_err(|e| io_error(dir, e))?;
        let path: PathBuf = dir.join(file_name);

        let response = self.http.get(url).send().await?.error_for_status()?;

        let part = dir.join(format!("{}.{}.part", file_name, Uuid::new_v4()));
        let written = match write_body(response, &part).await {
            Ok(written) => written,
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(&part).await {
                    tracing::debug!(path = %part.display(), error = %cleanup, "Partial file not removed");
                }
                return Err(e);
            }
        };
        fs::rename(&part, &path).await.map_err(|e| io_error(&path, e))?;

        tracing::debug!(
            path = %path.display(),
            bytes = written,
            "File transferred"
        );

        Ok(written)
    }
}
