//! メトリクス公開サーバー
//!
//! `GET /metrics` でレジストリの現在値をPrometheusテキスト形式で返す。
//! スクレイプは収集ループとは独立したタスクで処理される。

use crate::metrics::{CpuStatsRegistry, TEXT_CONTENT_TYPE};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use elastic_cpu_exporter_common::error::{ExporterError, ExporterResult};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

const INDEX_HTML: &str = r#"<html>
<head><title>Elastic CPU Exporter</title></head>
<body>
<h1>Elastic CPU Exporter</h1>
<p><a href="/metrics">Metrics</a></p>
</body>
</html>
"#;

/// メトリクスサーバーのルーターを作成
pub fn create_router(registry: CpuStatsRegistry) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/metrics", get(export_metrics))
        .with_state(registry)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// GET /metrics - Prometheusテキスト形式
pub async fn export_metrics(State(registry): State<CpuStatsRegistry>) -> Response {
    match registry.gather_text() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, TEXT_CONTENT_TYPE)],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain")],
                e.to_string(),
            )
                .into_response()
        }
    }
}

/// バインド済みリスナーでサーバーを動かす。トークンがキャンセルされると終了する
pub async fn serve(
    listener: TcpListener,
    registry: CpuStatsRegistry,
    shutdown: CancellationToken,
) -> ExporterResult<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("Listening for Prometheus requests on {}", addr);
    }

    axum::serve(listener, create_router(registry))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| ExporterError::Server(e.to_string()))
}

/// アドレスにバインドする
pub async fn bind(addr: &str) -> ExporterResult<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| ExporterError::Server(format!("Failed to bind {}: {}", addr, e)))
}
