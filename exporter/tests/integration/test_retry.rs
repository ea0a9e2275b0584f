//! Integration Test: 上流呼び出しのリトライ
//!
//! 503などの一時的なエラーは予算内で自動リトライし、使い切ったらサイクルを諦める

use crate::support::{capture_logs, context_for, fast_retry, SINGLE_NODE_BODY};
use elastic_cpu_exporter::{
    client::ResilientClient,
    collector::{MetricCollector, NodeCpuStatsCollector, NODE_STATS_OS_PATH},
};
use elastic_cpu_exporter_common::error::ExporterError;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

/// `statuses`を順に返し、尽きたら最後の値を返し続ける
async fn mount_sequence(server: &MockServer, statuses: Vec<u16>, body: &'static str) -> Arc<AtomicUsize> {
    let call_count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&call_count);

    Mock::given(method("GET"))
        .and(path(NODE_STATS_OS_PATH))
        .respond_with(move |_req: &wiremock::Request| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let status = statuses[n.min(statuses.len() - 1)];
            if status == 200 {
                ResponseTemplate::new(200).set_body_string(body)
            } else {
                ResponseTemplate::new(status)
            }
        })
        .mount(server)
        .await;

    call_count
}

#[tokio::test]
async fn test_recovers_after_two_unavailable_responses() {
    let mock_server = MockServer::start().await;
    let calls = mount_sequence(&mock_server, vec![503, 503, 200], SINGLE_NODE_BODY).await;

    let context = context_for(&mock_server);
    let collector = NodeCpuStatsCollector::new(context.client.clone(), context.registry.clone());
    let report = collector.collect().await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(report.updated_count(), 1);
    assert_eq!(context.registry.series_count(), 1);
}

#[tokio::test]
async fn test_each_forcelist_status_is_retried() {
    for status in [429, 500, 502, 503, 504] {
        let mock_server = MockServer::start().await;
        let calls = mount_sequence(&mock_server, vec![status, 200], SINGLE_NODE_BODY).await;

        let client = ResilientClient::new(mock_server.uri(), &fast_retry()).unwrap();
        let response = client.get(NODE_STATS_OS_PATH).await.unwrap();

        assert_eq!(response.status, 200, "status {} should be retried", status);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}

#[tokio::test]
async fn test_always_unavailable_exhausts_budget() {
    let (logs, _guard) = capture_logs();
    let mock_server = MockServer::start().await;
    let calls = mount_sequence(&mock_server, vec![503], SINGLE_NODE_BODY).await;

    let context = context_for(&mock_server);
    let collector = NodeCpuStatsCollector::new(context.client.clone(), context.registry.clone());
    let result = collector.collect().await;

    // 初回 + リトライ3回
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert!(matches!(
        result,
        Err(ExporterError::RetriesExhausted {
            status: 503,
            attempts: 4
        })
    ));
    assert_eq!(context.registry.series_count(), 0);

    // スケジューラ経由なら失敗ログは1件だけ
    let mut scheduler = context.scheduler();
    scheduler.run_cycle().await;
    assert_eq!(logs.at_level("ERROR").len(), 1);
    assert_eq!(scheduler.cycles(), 1);
}

#[tokio::test]
async fn test_failed_cycle_keeps_previous_values() {
    let mock_server = MockServer::start().await;
    let calls = mount_sequence(&mock_server, vec![200, 503], SINGLE_NODE_BODY).await;

    let context = context_for(&mock_server);
    let mut scheduler = context.scheduler();

    scheduler.run_cycle().await;
    let published = context.registry.gather_text().unwrap();
    scheduler.run_cycle().await;

    assert_eq!(calls.load(Ordering::SeqCst), 1 + 4);
    assert_eq!(context.registry.gather_text().unwrap(), published);
    assert_eq!(context.registry.series_count(), 1);
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let mock_server = MockServer::start().await;
    let calls = mount_sequence(&mock_server, vec![404], SINGLE_NODE_BODY).await;

    let context = context_for(&mock_server);
    let collector = NodeCpuStatsCollector::new(context.client.clone(), context.registry.clone());
    let result = collector.collect().await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(matches!(
        result,
        Err(ExporterError::UnexpectedStatus { status: 404, .. })
    ));
}

#[tokio::test]
async fn test_unauthorized_is_returned_as_is() {
    let mock_server = MockServer::start().await;
    let calls = mount_sequence(&mock_server, vec![401], SINGLE_NODE_BODY).await;

    let client = ResilientClient::new(mock_server.uri(), &fast_retry()).unwrap();
    let response = client.get(NODE_STATS_OS_PATH).await.unwrap();

    assert_eq!(response.status, 401);
    assert!(!response.is_success());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_post_is_never_retried() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/_refresh"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = ResilientClient::new(mock_server.uri(), &fast_retry()).unwrap();
    let response = client
        .request(reqwest::Method::POST, "/_refresh")
        .await
        .unwrap();

    assert_eq!(response.status, 503);
}
