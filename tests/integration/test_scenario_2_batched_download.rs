//! 场景2集成测试: 分批下载
//!
//! 测试范围:
//! - 按批大小切分,批次顺序执行,批内并发
//! - 序号命名基于选择顺序的全局位置
//! - 单项失败隔离,进度仍计满
//! - 图集按源顺序保存为 1.jpg, 2.jpg, ...
//! - 用户目录与单个作品下载布局
//! - 同名目标路径只写入一次

#[path = "../../harvester/tests/common/mod.rs"]
mod common;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use aweme_harvester::models::{
    AppError, ApiError, DownloadEventType, DownloadJob, DownloadOutcome, NamingToken,
    OwnerIdentity,
};
use aweme_harvester::services::{DownloadScheduler, HarvestService};
use common::{photo, shared, video, videos, MockAwemeApi, MockCredentials, RecordingTransfer};

fn owner(name: &str) -> OwnerIdentity {
    OwnerIdentity::new(Some(name.to_string()), None)
}

#[tokio::test]
async fn test_seven_items_batch_three_with_one_failure() {
    let root = tempfile::tempdir().unwrap();
    let items = videos("v", 7);
    let transfer = shared(RecordingTransfer::new().failing_on("https://cdn.test/v5.mp4"));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let scheduler = DownloadScheduler::new(transfer.clone()).with_event_sender(tx);
    let job = DownloadJob::new(items, root.path())
        .with_owner(owner("creator"))
        .with_batch_size(3);
    let report = scheduler.run(&job).await.unwrap();
    drop(scheduler);

    assert_eq!(report.outcome, DownloadOutcome::Completed);
    assert_eq!(report.batches_run, 3);
    assert_eq!(report.progress.current, 7);
    assert_eq!(report.progress.total, 7);
    assert_eq!(
        report.progress.failed_ids.iter().cloned().collect::<Vec<_>>(),
        vec!["v5".to_string()]
    );

    let folder = root.path().join("creator");
    for (n, id) in [(1, "v1"), (2, "v2"), (3, "v3"), (4, "v4"), (6, "v6"), (7, "v7")] {
        let path = folder.join(format!("{}_{}.mp4", n, id));
        assert!(path.is_file(), "missing {}", path.display());
    }
    assert!(!folder.join("5_v5.mp4").exists());

    let mut batches = Vec::new();
    while let Some(event) = rx.recv().await {
        if let DownloadEventType::BatchStarted { item_ids, .. } = event.event_type {
            batches.push(item_ids);
        }
    }
    assert_eq!(
        batches,
        vec![
            vec!["v1".to_string(), "v2".to_string(), "v3".to_string()],
            vec!["v4".to_string(), "v5".to_string(), "v6".to_string()],
            vec!["v7".to_string()],
        ]
    );
}

#[tokio::test]
async fn test_progress_is_full_regardless_of_batch_size() {
    for batch_size in [1, 2, 5, 10] {
        let root = tempfile::tempdir().unwrap();
        let transfer = shared(RecordingTransfer::new());
        let scheduler = DownloadScheduler::new(transfer);
        let job = DownloadJob::new(videos("v", 5), root.path()).with_batch_size(batch_size);

        let report = scheduler.run(&job).await.unwrap();

        assert_eq!(report.progress.current, 5);
        assert_eq!(report.batches_run, 5usize.div_ceil(batch_size));
        assert!(report.progress.failed_ids.is_empty());
    }
}

#[tokio::test]
async fn test_items_within_batch_run_concurrently() {
    let root = tempfile::tempdir().unwrap();
    let transfer = shared(RecordingTransfer::new());
    let scheduler = DownloadScheduler::new(transfer.clone());
    let job = DownloadJob::new(videos("v", 6), root.path()).with_batch_size(3);

    scheduler.run(&job).await.unwrap();

    // 批内并发,批间顺序
    assert_eq!(transfer.max_in_flight(), 3);
}

#[tokio::test]
async fn test_photo_images_saved_in_source_order() {
    let root = tempfile::tempdir().unwrap();
    let transfer = shared(RecordingTransfer::new());
    let scheduler = DownloadScheduler::new(transfer);
    let job = DownloadJob::new(vec![video("v1"), photo("p2", 3)], root.path())
        .with_owner(owner("creator"));

    let report = scheduler.run(&job).await.unwrap();

    assert_eq!(report.progress.current, 2);
    let album = root.path().join("creator").join("2_p2");
    for n in 1..=3 {
        let content = std::fs::read_to_string(album.join(format!("{}.jpg", n))).unwrap();
        assert_eq!(content, format!("https://cdn.test/p2/{}.jpg", n));
    }
}

#[tokio::test]
async fn test_failed_image_marks_photo_failed_but_keeps_siblings() {
    let root = tempfile::tempdir().unwrap();
    let transfer = shared(RecordingTransfer::new().failing_on("https://cdn.test/p1/2.jpg"));
    let scheduler = DownloadScheduler::new(transfer);
    let job = DownloadJob::new(vec![photo("p1", 3)], root.path()).with_owner(owner("creator"));

    let report = scheduler.run(&job).await.unwrap();

    assert_eq!(report.progress.current, 1);
    assert!(report.progress.failed_ids.contains("p1"));
    let album = root.path().join("creator").join("1_p1");
    assert!(album.join("1.jpg").is_file());
    assert!(!album.join("2.jpg").exists());
    assert!(album.join("3.jpg").is_file());
}

#[tokio::test]
async fn test_naming_tokens_follow_caller_order() {
    let root = tempfile::tempdir().unwrap();
    let transfer = shared(RecordingTransfer::new());
    let scheduler = DownloadScheduler::new(transfer);
    let item = video("42")
        .with_created_at(1_700_000_000)
        .with_description("hello: world?");
    let job = DownloadJob::new(vec![item], root.path())
        .with_owner(owner("creator"))
        .with_naming_tokens([
            NamingToken::Timestamp,
            NamingToken::Description,
            NamingToken::NumericalOrder,
        ]);

    scheduler.run(&job).await.unwrap();

    assert!(root
        .path()
        .join("creator")
        .join("1700000000_hello world_1.mp4")
        .is_file());
}

#[tokio::test]
async fn test_same_name_items_in_one_batch_write_once() {
    let root = tempfile::tempdir().unwrap();
    let transfer = shared(RecordingTransfer::new());
    let (tx, mut rx) = mpsc::unbounded_channel();
    let scheduler = DownloadScheduler::new(transfer.clone()).with_event_sender(tx);
    // 两个空描述的视频都命名为 no_desc.mp4
    let job = DownloadJob::new(vec![video("a"), video("b")], root.path())
        .with_owner(owner("creator"))
        .with_naming_tokens([NamingToken::Description])
        .with_batch_size(2);

    let report = scheduler.run(&job).await.unwrap();
    drop(scheduler);

    assert_eq!(report.progress.current, 2);
    assert_eq!(
        report.progress.failed_ids.iter().cloned().collect::<Vec<_>>(),
        vec!["b".to_string()]
    );
    assert_eq!(transfer.calls().await.len(), 1);
    let content =
        std::fs::read_to_string(root.path().join("creator").join("no_desc.mp4")).unwrap();
    assert_eq!(content, "https://cdn.test/a.mp4");

    let mut finished = Vec::new();
    while let Some(event) = rx.recv().await {
        if let DownloadEventType::ItemFinished { item_id, success, .. } = event.event_type {
            finished.push((item_id, success));
        }
    }
    finished.sort();
    assert_eq!(
        finished,
        vec![("a".to_string(), true), ("b".to_string(), false)]
    );
}

#[tokio::test]
async fn test_user_folder_falls_back_to_placeholder() {
    let root = tempfile::tempdir().unwrap();
    let scheduler = DownloadScheduler::new(shared(RecordingTransfer::new()));
    let job = DownloadJob::new(vec![video("1")], root.path());

    scheduler.run(&job).await.unwrap();

    assert!(root.path().join("unknown_user").join("1_1.mp4").is_file());
}

#[tokio::test(start_paused = true)]
async fn test_inter_batch_delay_only_between_batches() {
    let root = tempfile::tempdir().unwrap();
    let scheduler = DownloadScheduler::new(shared(RecordingTransfer::new()));
    let job = DownloadJob::new(videos("v", 4), root.path())
        .with_batch_size(2)
        .with_inter_batch_delay_ms(1_000);

    let started = tokio::time::Instant::now();
    let report = scheduler.run(&job).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(report.progress.current, 4);
    // 两批之间一次延迟,最后一批之后不再等待
    assert!(elapsed >= Duration::from_millis(1_000));
    assert!(elapsed < Duration::from_millis(2_000));
}

#[tokio::test]
async fn test_single_download_writes_directly_under_root() {
    let root = tempfile::tempdir().unwrap();
    let api = shared(MockAwemeApi::new(Vec::new()).with_detail(photo("777", 2)));
    let transfer = shared(RecordingTransfer::new());
    let service = HarvestService::new(
        api,
        Arc::new(MockCredentials::unavailable()),
        transfer,
    );

    let report = service
        .download_single("777", root.path(), vec![NamingToken::NumericalOrder, NamingToken::Id])
        .await
        .unwrap();

    assert_eq!(report.progress.current, 1);
    assert!(root.path().join("1_777").join("1.jpg").is_file());
    assert!(root.path().join("1_777").join("2.jpg").is_file());
}

#[tokio::test]
async fn test_single_download_unknown_item_is_error() {
    let root = tempfile::tempdir().unwrap();
    let service = HarvestService::new(
        shared(MockAwemeApi::new(Vec::new())),
        Arc::new(MockCredentials::with_cookie("sid=1")),
        shared(RecordingTransfer::new()),
    );

    let result = service
        .download_single("404", root.path(), vec![NamingToken::Id])
        .await;

    assert!(matches!(
        result,
        Err(AppError::Api(ApiError::AwemeNotFound { .. }))
    ));
}

#[tokio::test]
async fn test_service_download_uses_shared_token() {
    let root = tempfile::tempdir().unwrap();
    let service = HarvestService::new(
        shared(MockAwemeApi::new(Vec::new())),
        Arc::new(MockCredentials::with_cookie("sid=1")),
        shared(RecordingTransfer::new()),
    );
    let token = CancellationToken::new();
    token.cancel();
    let job = DownloadJob::new(videos("v", 3), root.path());

    let report = service.download(&job, token, None).await.unwrap();

    assert_eq!(report.outcome, DownloadOutcome::Cancelled);
    assert_eq!(report.progress.current, 0);
}
