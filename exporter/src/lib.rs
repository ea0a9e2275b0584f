//! Elastic CPU Exporter
//!
//! ElasticsearchのノードCPU cgroup統計を定期取得し、Prometheusゲージとして公開する

#![warn(missing_docs)]

/// CLIインターフェース
pub mod cli;

/// リトライ付きHTTPクライアント
pub mod client;

/// メトリクスコレクター
pub mod collector;

/// ロギング初期化ユーティリティ
pub mod logging;

/// メトリクスレジストリ
pub mod metrics;

/// 収集スケジューラ
pub mod scheduler;

/// メトリクス公開サーバー
pub mod server;

use client::ResilientClient;
use collector::NodeCpuStatsCollector;
use elastic_cpu_exporter_common::{config::ExporterConfig, error::ExporterResult};
use metrics::CpuStatsRegistry;
use scheduler::Scheduler;

/// 起動時に一度だけ構築し、スケジューラとサーバーへ渡す共有コンテキスト
#[derive(Clone)]
pub struct ExporterContext {
    /// 検証済み設定
    pub config: ExporterConfig,
    /// 上流クラスタ向けクライアント
    pub client: ResilientClient,
    /// メトリクスレジストリ
    pub registry: CpuStatsRegistry,
}

impl ExporterContext {
    /// 設定からクライアントとレジストリを構築
    pub fn new(config: ExporterConfig) -> ExporterResult<Self> {
        let client = ResilientClient::new(config.endpoint.clone(), &config.retry)?;
        let registry = CpuStatsRegistry::new()?;
        Ok(Self {
            config,
            client,
            registry,
        })
    }

    /// 全コレクターを登録したスケジューラを作成
    pub fn scheduler(&self) -> Scheduler {
        Scheduler::new(self.config.interval()).with_collector(Box::new(
            NodeCpuStatsCollector::new(self.client.clone(), self.registry.clone()),
        ))
    }
}
