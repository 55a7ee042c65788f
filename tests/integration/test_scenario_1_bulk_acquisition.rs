//! 场景1集成测试: 批量获取账号作品
//!
//! 测试范围:
//! - 游标分页直到 has_more = false
//! - 跨页保持服务器顺序,不去重
//! - 页间延迟
//! - 账号查找失败时不发出列表请求
//! - 请求失败时保留已累积数据

#[path = "../../harvester/tests/common/mod.rs"]
mod common;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use aweme_harvester::models::{ApiError, FetchEventType, WalkOutcome};
use aweme_harvester::services::{HarvestService, PaginationWalker};
use common::{page, shared, user, video, videos, MockAwemeApi, MockCredentials, RecordingTransfer};

#[tokio::test]
async fn test_two_pages_yield_all_items_in_order() {
    let first = videos("a", 21);
    let second = videos("b", 4);
    let api = shared(MockAwemeApi::new(vec![
        page(first.clone(), "1700000000000", "1700000000000", true),
        page(second.clone(), "", "", false),
    ]));

    let mut walker = PaginationWalker::new(api.clone(), Duration::ZERO);
    let outcome = walker.run("MS4w_creator", "sid=1").await.unwrap();

    assert_eq!(outcome, WalkOutcome::Exhausted);
    assert_eq!(api.request_count().await, 2);

    let expected: Vec<String> = first.iter().chain(second.iter()).map(|i| i.id.clone()).collect();
    let actual: Vec<String> = walker.session().items.iter().map(|i| i.id.clone()).collect();
    assert_eq!(actual, expected);
    assert_eq!(walker.session().len(), 25);
}

#[tokio::test]
async fn test_walk_stops_after_exactly_k_requests() {
    let api = shared(MockAwemeApi::new(vec![
        page(videos("a", 2), "c1", "m1", true),
        page(videos("b", 2), "c2", "m2", true),
        page(videos("c", 2), "c3", "m3", false),
        // 不应被请求
        page(videos("d", 2), "c4", "m4", true),
    ]));

    let mut walker = PaginationWalker::new(api.clone(), Duration::ZERO);
    walker.run("sec", "cookie").await.unwrap();

    assert_eq!(api.request_count().await, 3);
    let cursors = api.seen_cursors().await;
    assert_eq!(cursors[0].cursor, "0");
    assert_eq!(cursors[0].max_cursor, "0");
    assert_eq!(cursors[2].cursor, "c2");
    assert_eq!(cursors[2].max_cursor, "m2");
}

#[tokio::test]
async fn test_empty_account_is_valid_terminal_state() {
    let api = shared(MockAwemeApi::new(vec![page(Vec::new(), "", "", false)]));

    let mut walker = PaginationWalker::new(api.clone(), Duration::ZERO);
    let outcome = walker.run("sec", "cookie").await.unwrap();

    assert_eq!(outcome, WalkOutcome::Exhausted);
    assert!(walker.session().is_empty());
    assert_eq!(api.request_count().await, 1);
}

#[tokio::test]
async fn test_duplicates_across_pages_are_kept() {
    let api = shared(MockAwemeApi::new(vec![
        page(vec![video("1"), video("2")], "c1", "m1", true),
        page(vec![video("2"), video("3")], "", "", false),
    ]));

    let mut walker = PaginationWalker::new(api, Duration::ZERO);
    walker.run("sec", "cookie").await.unwrap();

    assert_eq!(walker.session().len(), 4);
    assert_eq!(walker.session().duplicate_ids(), vec!["2".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_requests_are_spaced_by_page_delay() {
    let delay = Duration::from_millis(1500);
    let api = shared(MockAwemeApi::new(vec![
        page(videos("a", 1), "c1", "m1", true),
        page(videos("b", 1), "c2", "m2", true),
        page(videos("c", 1), "", "", false),
    ]));

    let mut walker = PaginationWalker::new(api.clone(), delay);
    walker.run("sec", "cookie").await.unwrap();

    let times = api.request_times().await;
    assert_eq!(times.len(), 3);
    for pair in times.windows(2) {
        assert!(pair[1].duration_since(pair[0]) >= delay);
    }
}

#[tokio::test]
async fn test_request_failure_keeps_partial_items() {
    let api = shared(
        MockAwemeApi::new(vec![
            page(videos("a", 21), "c1", "m1", true),
            page(videos("b", 21), "c2", "m2", true),
        ])
        .failing_on_page(2),
    );

    let mut walker = PaginationWalker::new(api.clone(), Duration::ZERO);
    let result = walker.run("sec", "cookie").await;

    assert!(matches!(result, Err(ApiError::NetworkFailed(_))));
    assert_eq!(walker.session().len(), 21);
    assert_eq!(api.request_count().await, 2);
}

#[tokio::test]
async fn test_page_events_arrive_before_completion() {
    let api = shared(MockAwemeApi::new(vec![
        page(videos("a", 3), "c1", "m1", true),
        page(videos("b", 2), "", "", false),
    ]));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut walker = PaginationWalker::new(api, Duration::ZERO).with_event_sender(tx);
    walker.run("sec", "cookie").await.unwrap();
    drop(walker);

    let mut kinds = Vec::new();
    while let Some(event) = rx.recv().await {
        kinds.push(match event.event_type {
            FetchEventType::Started => "started".to_string(),
            FetchEventType::PageFetched { items, .. } => format!("page:{}", items.len()),
            FetchEventType::Completed { total_items, .. } => format!("completed:{}", total_items),
            FetchEventType::Cancelled { .. } => "cancelled".to_string(),
            FetchEventType::Failed { .. } => "failed".to_string(),
        });
    }

    assert_eq!(kinds, vec!["started", "page:3", "page:2", "completed:5"]);
}

#[tokio::test]
async fn test_unknown_user_fails_before_pagination() {
    let api = shared(
        MockAwemeApi::new(vec![page(videos("a", 1), "", "", false)]).with_user(user("creator")),
    );
    let service = HarvestService::new(
        api.clone(),
        Arc::new(MockCredentials::with_cookie("sid=1")),
        Arc::new(RecordingTransfer::new()),
    );

    let result = service
        .acquire("someone_else", Duration::ZERO, CancellationToken::new(), None)
        .await;

    assert!(matches!(result, Err(ApiError::UserNotFound { .. })));
    assert_eq!(api.request_count().await, 0);
}

#[tokio::test]
async fn test_missing_credentials_fail_before_pagination() {
    let api = shared(MockAwemeApi::new(Vec::new()).with_user(user("creator")));
    let service = HarvestService::new(
        api.clone(),
        Arc::new(MockCredentials::unavailable()),
        Arc::new(RecordingTransfer::new()),
    );

    let result = service
        .acquire("creator", Duration::ZERO, CancellationToken::new(), None)
        .await;

    assert!(matches!(result, Err(ApiError::CredentialsUnavailable(_))));
    assert_eq!(api.request_count().await, 0);
}

#[tokio::test]
async fn test_acquire_resolves_user_and_walks() {
    let api = shared(
        MockAwemeApi::new(vec![page(videos("a", 4), "", "", false)]).with_user(user("creator")),
    );
    let service = HarvestService::new(
        api,
        Arc::new(MockCredentials::with_cookie("sid=1")),
        Arc::new(RecordingTransfer::new()),
    );

    let acquisition = service
        .acquire("@creator", Duration::ZERO, CancellationToken::new(), None)
        .await
        .unwrap();

    assert_eq!(acquisition.user.sec_uid, "MS4w_creator");
    assert_eq!(acquisition.session.len(), 4);
    assert!(matches!(acquisition.outcome, Ok(WalkOutcome::Exhausted)));
    assert_eq!(acquisition.owner().folder_name(), "creator");
}
