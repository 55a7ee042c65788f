//! 场景3集成测试: 协作式取消
//!
//! 测试范围:
//! - 第 i 页后取消,结果恰好为前 i 页
//! - 页间延迟期间取消,立即结束且不再请求
//! - 下载在批边界取消,进行中的批次完整执行
//! - 取消是终态,不是错误

#[path = "../../harvester/tests/common/mod.rs"]
mod common;

use std::time::Duration;
use tokio_util::sync::CancellationToken;

use aweme_harvester::models::{DownloadJob, DownloadOutcome, FetchEventType, WalkOutcome};
use aweme_harvester::services::{DownloadScheduler, PaginationWalker};
use common::{page, shared, videos, MockAwemeApi, RecordingTransfer};

#[tokio::test]
async fn test_cancel_between_pages_keeps_first_pages() {
    let walker_pages = vec![
        page(videos("a", 3), "c1", "m1", true),
        page(videos("b", 3), "c2", "m2", true),
        page(videos("c", 3), "c3", "m3", true),
        page(videos("d", 3), "", "", false),
    ];

    for cancel_after in 1..=3 {
        let token = CancellationToken::new();
        let api = shared(
            MockAwemeApi::new(walker_pages.clone())
                .cancelling_after_page(cancel_after, token.clone()),
        );
        let mut walker =
            PaginationWalker::new(api.clone(), Duration::ZERO).with_cancellation_token(token);

        let outcome = walker.run("sec", "cookie").await.unwrap();

        assert_eq!(outcome, WalkOutcome::Cancelled);
        assert!(walker.session().cancelled);
        assert_eq!(walker.session().pages_fetched as usize, cancel_after);
        assert_eq!(walker.session().len(), cancel_after * 3);
        assert_eq!(api.request_count().await, cancel_after);
    }
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_page_delay_is_immediate() {
    let api = shared(MockAwemeApi::new(vec![
        page(videos("a", 2), "c1", "m1", true),
        page(videos("b", 2), "", "", false),
    ]));
    let mut handle =
        PaginationWalker::new(api.clone(), Duration::from_secs(3600)).start("sec", "cookie");

    // 等待第一页到达后取消
    while let Some(event) = handle.next_event().await {
        if matches!(event.event_type, FetchEventType::PageFetched { .. }) {
            handle.cancel();
            break;
        }
    }

    let started = tokio::time::Instant::now();
    let result = handle.wait().await.unwrap();

    assert_eq!(result.outcome.unwrap(), WalkOutcome::Cancelled);
    assert_eq!(result.session.len(), 2);
    assert_eq!(api.request_count().await, 1);
    assert!(started.elapsed() < Duration::from_secs(3600));
}

#[tokio::test]
async fn test_cancel_before_walk_is_not_an_error() {
    let api = shared(MockAwemeApi::new(vec![page(videos("a", 1), "", "", false)]));
    let mut walker = PaginationWalker::new(api.clone(), Duration::ZERO);
    walker.cancel();

    let outcome = walker.run("sec", "cookie").await;

    assert!(matches!(outcome, Ok(WalkOutcome::Cancelled)));
    assert_eq!(api.request_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_download_cancel_stops_at_batch_boundary() {
    let root = tempfile::tempdir().unwrap();
    let transfer = shared(RecordingTransfer::new());
    let scheduler = DownloadScheduler::new(transfer.clone());
    let token = scheduler.cancellation_token();
    let job = DownloadJob::new(videos("v", 9), root.path())
        .with_batch_size(3)
        .with_inter_batch_delay_ms(60_000);

    // 第一批期间请求取消,第一批仍完整执行
    let cancel = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(5)).await;
        token.cancel();
    });
    let report = scheduler.run(&job).await.unwrap();
    cancel.await.unwrap();

    assert_eq!(report.outcome, DownloadOutcome::Cancelled);
    assert_eq!(report.batches_run, 1);
    assert_eq!(report.progress.current, 3);
    assert_eq!(report.progress.total, 9);
    assert_eq!(transfer.calls().await.len(), 3);
}

#[tokio::test]
async fn test_cancelled_scheduler_runs_no_batch() {
    let root = tempfile::tempdir().unwrap();
    let transfer = shared(RecordingTransfer::new());
    let scheduler = DownloadScheduler::new(transfer.clone());
    scheduler.cancel();

    let report = scheduler
        .run(&DownloadJob::new(videos("v", 4), root.path()))
        .await
        .unwrap();

    assert_eq!(report.outcome, DownloadOutcome::Cancelled);
    assert_eq!(report.batches_run, 0);
    assert_eq!(report.progress.current, 0);
    assert!(transfer.calls().await.is_empty());
}
