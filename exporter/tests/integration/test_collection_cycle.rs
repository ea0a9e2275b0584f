//! Integration Test: 収集サイクル
//!
//! `_nodes/stats/os` の取得 → ノードごとの抽出 → ゲージ反映

use crate::support::{capture_logs, context_for, cpu_stat_lines, PARTIAL_BODY, SINGLE_NODE_BODY};
use elastic_cpu_exporter::collector::{MetricCollector, NodeCpuStatsCollector, NODE_STATS_OS_PATH};
use elastic_cpu_exporter_common::{
    error::ExporterError,
    types::{MissingField, SkipReason},
};
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

fn collector_for(context: &elastic_cpu_exporter::ExporterContext) -> NodeCpuStatsCollector {
    NodeCpuStatsCollector::new(context.client.clone(), context.registry.clone())
}

#[tokio::test]
async fn test_single_node_publishes_one_series() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(NODE_STATS_OS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(SINGLE_NODE_BODY))
        .expect(1)
        .mount(&mock_server)
        .await;

    let context = context_for(&mock_server);
    let report = collector_for(&context).collect().await.unwrap();

    assert_eq!(report.updated_count(), 1);
    let lines = cpu_stat_lines(&context.registry.gather_text().unwrap());
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains(r#"node="es-1""#));
    assert!(lines[0].contains(r#"cfs_quota_micros="100000""#));
    assert!(lines[0].contains(r#"cfs_period_micros="100000""#));
    let value: f64 = lines[0].rsplit(' ').next().unwrap().parse().unwrap();
    assert_eq!(value, 1.0);
}

#[tokio::test]
async fn test_incomplete_node_is_isolated_and_logged() {
    let (logs, _guard) = capture_logs();
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(NODE_STATS_OS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(PARTIAL_BODY))
        .mount(&mock_server)
        .await;

    let context = context_for(&mock_server);
    let report = collector_for(&context).collect().await.unwrap();

    // 完全なデータを持つノードAだけが系列になる
    assert_eq!(report.updated_count(), 1);
    assert_eq!(report.updated[0].name, "es-a");
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].node_id, "node-b");
    assert_eq!(
        report.skipped[0].reason,
        SkipReason::Missing(MissingField::CfsPeriodMicros)
    );
    assert_eq!(context.registry.series_count(), 1);

    // ノードBを参照するINFOログが1件
    let node_b_logs: Vec<_> = logs
        .at_level("INFO")
        .into_iter()
        .filter(|entry| entry["fields"]["node_id"] == "node-b")
        .collect();
    assert_eq!(node_b_logs.len(), 1);
}

#[tokio::test]
async fn test_replaying_same_response_is_idempotent() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(NODE_STATS_OS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(PARTIAL_BODY))
        .expect(2)
        .mount(&mock_server)
        .await;

    let context = context_for(&mock_server);
    let collector = collector_for(&context);

    collector.collect().await.unwrap();
    let once = context.registry.gather_text().unwrap();
    collector.collect().await.unwrap();

    assert_eq!(context.registry.gather_text().unwrap(), once);
}

#[tokio::test]
async fn test_empty_nodes_is_not_an_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(NODE_STATS_OS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"nodes":{}}"#))
        .mount(&mock_server)
        .await;

    let context = context_for(&mock_server);
    let report = collector_for(&context).collect().await.unwrap();

    assert_eq!(report.updated_count(), 0);
    assert_eq!(report.skipped_count(), 0);
    assert_eq!(context.registry.series_count(), 0);
}

#[tokio::test]
async fn test_invalid_json_is_a_fetch_failure() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(NODE_STATS_OS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&mock_server)
        .await;

    let context = context_for(&mock_server);
    let result = collector_for(&context).collect().await;

    assert!(matches!(result, Err(ExporterError::Decode(_))));
    assert_eq!(context.registry.series_count(), 0);
}

#[tokio::test]
async fn test_quota_change_adds_new_series() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(NODE_STATS_OS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(SINGLE_NODE_BODY))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path(NODE_STATS_OS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"nodes":{"n1":{"name":"es-1","os":{"cgroup":{"cpu":{"cfs_quota_micros":"200000","cfs_period_micros":"100000"}}}}}}"#,
        ))
        .mount(&mock_server)
        .await;

    let context = context_for(&mock_server);
    let collector = collector_for(&context);
    collector.collect().await.unwrap();
    collector.collect().await.unwrap();

    // 古いラベルの組は明示的に消さない限り残る
    let series = context.registry.cpu_series();
    assert_eq!(series.len(), 2);
    assert!(series.iter().all(|s| s.name == "es-1"));
}
