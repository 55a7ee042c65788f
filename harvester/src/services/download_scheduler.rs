//! 批量下载调度
//!
//! 核心职责:
//! - 把选中的作品按批大小切分为连续批次,批次顺序执行
//! - 批内所有作品 (及图集的所有图片) 并发传输,等待整批完成
//! - 单个作品失败只记录,不影响同批其他作品与后续批次
//! - 批间延迟,取消在批边界生效
//! - 同一任务内目标路径只允许一个写入者,后到的作品记为失败

use futures::future::join_all;
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::models::events::emit;
use crate::models::{
    AwemeItem, AwemeType, DownloadEvent, DownloadEventType, DownloadJob, DownloadOutcome,
    DownloadProgress, DownloadReport, EventSender, ValidationError,
};
use crate::services::file_transfer::FileTransfer;
use crate::utils::file_namer::{file_name, image_file_name, photo_folder_name};

/// 下载调度器
pub struct DownloadScheduler {
    transfer: Arc<dyn FileTransfer>,
    cancel_token: CancellationToken,
    events: Option<EventSender<DownloadEvent>>,
}

/// 单个任务运行期间共享的进度状态
struct ProgressTracker {
    current: AtomicUsize,
    total: usize,
    failed_ids: Mutex<BTreeSet<String>>,
}

impl DownloadScheduler {
    pub fn new(transfer: Arc<dyn FileTransfer>) -> Self {
        Self {
            transfer,
            cancel_token: CancellationToken::new(),
            events: None,
        }
    }

    /// 设置事件发送端
    pub fn with_event_sender(mut self, sender: EventSender<DownloadEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    /// 使用外部取消令牌 (例如与Ctrl-C处理共享)
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    /// 请求取消,下一个批边界生效,进行中的传输不会被中断
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// 执行下载任务
    ///
    /// 单项失败不会使任务失败,只有任务参数无效时返回错误
    pub async fn run(&self, job: &DownloadJob) -> Result<DownloadReport, ValidationError> {
        job.validate()?;

        let started = std::time::Instant::now();
        let total = job.total();
        let batch_count = job.batch_count();
        let folder = job.user_folder();
        let tracker = ProgressTracker {
            current: AtomicUsize::new(0),
            total,
            failed_ids: Mutex::new(BTreeSet::new()),
        };

        tracing::info!(
            job_id = %job.id,
            total = total,
            batch_size = job.batch_size,
            batches = batch_count,
            folder = %folder.display(),
            "Download job started"
        );
        self.emit(
            &job.id,
            DownloadEventType::Started {
                total,
                batches: batch_count,
            },
        );

        let mut outcome = DownloadOutcome::Completed;
        let mut batches_run = 0;
        let mut claimed: HashSet<PathBuf> = HashSet::new();

        for (batch_index, batch) in job.selected_items.chunks(job.batch_size).enumerate() {
            if self.cancel_token.is_cancelled() {
                outcome = DownloadOutcome::Cancelled;
                break;
            }

            let base = batch_index * job.batch_size;
            tracing::debug!(
                job_id = %job.id,
                batch_index = batch_index,
                items = batch.len(),
                "Batch started"
            );
            self.emit(
                &job.id,
                DownloadEventType::BatchStarted {
                    batch_index,
                    item_ids: batch.iter().map(|item| item.id.clone()).collect(),
                },
            );

            // 派发前确定每个作品的目标路径
            let mut downloads = Vec::with_capacity(batch.len());
            for (offset, item) in batch.iter().enumerate() {
                let position = base + offset;
                let collides = match destination(job, &folder, item, position) {
                    Some(path) if !claimed.insert(path.clone()) => {
                        tracing::warn!(
                            job_id = %job.id,
                            item_id = %item.id,
                            path = %path.display(),
                            "Destination already claimed in this job, item skipped"
                        );
                        true
                    }
                    _ => false,
                };
                downloads.push(self.download_item(job, &folder, item, position, collides, &tracker));
            }
            join_all(downloads).await;
            batches_run += 1;

            let has_next = batch_index + 1 < batch_count;
            if has_next && !job.inter_batch_delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(job.inter_batch_delay) => {}
                    _ = self.cancel_token.cancelled() => {
                        tracing::debug!(job_id = %job.id, "Cancelled during batch delay");
                    }
                }
            }
        }

        let progress = DownloadProgress {
            current: tracker.current.load(Ordering::SeqCst),
            total,
            failed_ids: tracker.failed_ids.into_inner(),
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        match outcome {
            DownloadOutcome::Completed => {
                tracing::info!(
                    job_id = %job.id,
                    current = progress.current,
                    total = total,
                    failed = progress.failed_ids.len(),
                    duration_ms = duration_ms,
                    "Download job completed"
                );
                self.emit(
                    &job.id,
                    DownloadEventType::Completed {
                        current: progress.current,
                        total,
                        failed_ids: progress.failed_ids.iter().cloned().collect(),
                    },
                );
            }
            DownloadOutcome::Cancelled => {
                tracing::info!(
                    job_id = %job.id,
                    current = progress.current,
                    total = total,
                    batches_run = batches_run,
                    "Download job cancelled"
                );
                self.emit(
                    &job.id,
                    DownloadEventType::Cancelled {
                        current: progress.current,
                        total,
                    },
                );
            }
        }

        Ok(DownloadReport {
            job_id: job.id.clone(),
            outcome,
            progress,
            batches_run,
            duration_ms,
        })
    }

    /// 下载单个作品,无论成败都推进进度
    async fn download_item(
        &self,
        job: &DownloadJob,
        folder: &Path,
        item: &AwemeItem,
        position: usize,
        collides: bool,
        tracker: &ProgressTracker,
    ) {
        let success = if collides {
            false
        } else {
            match item.aweme_type {
                AwemeType::Video => self.download_video(job, folder, item, position).await,
                AwemeType::Photo => self.download_photo(job, folder, item, position).await,
            }
        };

        if !success {
            tracker.failed_ids.lock().await.insert(item.id.clone());
        }
        let current = tracker.current.fetch_add(1, Ordering::SeqCst) + 1;

        self.emit(
            &job.id,
            DownloadEventType::ItemFinished {
                item_id: item.id.clone(),
                success,
                current,
                total: tracker.total,
            },
        );
    }

    async fn download_video(
        &self,
        job: &DownloadJob,
        folder: &Path,
        item: &AwemeItem,
        position: usize,
    ) -> bool {
        let Some(video) = item.video.as_ref().filter(|v| !v.mp4_uri.is_empty()) else {
            tracing::warn!(item_id = %item.id, "Video item has no playable url");
            return false;
        };

        let name = file_name(item, position, "mp4", &job.naming_tokens);
        match self.transfer.transfer(&video.mp4_uri, folder, &name).await {
            Ok(bytes) => {
                tracing::debug!(item_id = %item.id, file = %name, bytes = bytes, "Video saved");
                true
            }
            Err(e) => {
                tracing::error!(item_id = %item.id, file = %name, error = %e, "Video download failed");
                false
            }
        }
    }

    /// 图集: 子目录内按源顺序保存为 1.jpg, 2.jpg, ...
    async fn download_photo(
        &self,
        job: &DownloadJob,
        folder: &Path,
        item: &AwemeItem,
        position: usize,
    ) -> bool {
        let images = item.images_uri.as_deref().unwrap_or_default();
        if images.is_empty() {
            tracing::warn!(item_id = %item.id, "Photo item has no images");
            return false;
        }

        let sub_folder = folder.join(photo_folder_name(item, position, &job.naming_tokens));
        let transfers = images.iter().enumerate().map(|(index, url)| {
            let sub_folder = &sub_folder;
            async move {
                let name = image_file_name(index);
                self.transfer
                    .transfer(url, sub_folder, &name)
                    .await
                    .map_err(|e| (name, e))
            }
        });

        let mut all_ok = true;
        for result in join_all(transfers).await {
            if let Err((name, e)) = result {
                tracing::error!(
                    item_id = %item.id,
                    file = %name,
                    error = %e,
                    "Image download failed"
                );
                all_ok = false;
            }
        }

        all_ok
    }

    fn emit(&self, job_id: &str, event_type: DownloadEventType) {
        emit(self.events.as_ref(), DownloadEvent::new(job_id, event_type));
    }
}

/// 作品写入的目标路径: 视频为文件,图集为子目录
///
/// 没有可下载媒体的作品不占用路径
fn destination(job: &DownloadJob, folder: &Path, item: &AwemeItem, position: usize) -> Option<PathBuf> {
    match item.aweme_type {
        AwemeType::Video => item
            .video
            .as_ref()
            .filter(|v| !v.mp4_uri.is_empty())
            .map(|_| folder.join(file_name(item, position, "mp4", &job.naming_tokens))),
        AwemeType::Photo => item
            .images_uri
            .as_deref()
            .filter(|images| !images.is_empty())
            .map(|_| folder.join(photo_folder_name(item, position, &job.naming_tokens))),
    }
}
