//! ノードCPU cgroupコレクター

use super::{CollectReport, MetricCollector, SkippedNode};
use crate::{client::ResilientClient, metrics::CpuStatsRegistry};
use async_trait::async_trait;
use elastic_cpu_exporter_common::{
    error::{ExporterError, ExporterResult},
    types::NodeStatsResponse,
};
use tracing::{debug, info};

/// ノードOS統計API
pub const NODE_STATS_OS_PATH: &str = "/_nodes/stats/os";

/// `_nodes/stats/os`からCFS quota/periodを取得し、ゲージに反映する
#[derive(Clone)]
pub struct NodeCpuStatsCollector {
    client: ResilientClient,
    registry: CpuStatsRegistry,
}

impl NodeCpuStatsCollector {
    /// 新しいコレクターを作成
    pub fn new(client: ResilientClient, registry: CpuStatsRegistry) -> Self {
        Self { client, registry }
    }

    /// ノード統計を取得してデコードする
    ///
    /// 通信失敗・2xx以外・デコード失敗はすべてサイクル全体の失敗として扱う。
    pub async fn fetch(&self) -> ExporterResult<NodeStatsResponse> {
        let response = self.client.get(NODE_STATS_OS_PATH).await?;
        if !response.is_success() {
            return Err(ExporterError::UnexpectedStatus {
                status: response.status,
                url: self.client.url(NODE_STATS_OS_PATH),
            });
        }

        NodeStatsResponse::from_slice(&response.body)
            .map_err(|e| ExporterError::Decode(format!("{}: {}", NODE_STATS_OS_PATH, e)))
    }

    /// デコード済みのレスポンスをレジストリに反映する
    ///
    /// 欠落フィールドのあるノードはそのノードだけスキップし、残りは処理を続ける。
    pub fn apply(&self, stats: &NodeStatsResponse) -> CollectReport {
        let mut report = CollectReport::default();

        for (node_id, extracted) in stats.cpu_cgroups() {
            match extracted {
                Ok(cgroup) => {
                    self.registry.set_series(&cgroup);
                    debug!(
                        node_id,
                        node = %cgroup.name,
                        cfs_quota_micros = %cgroup.cfs_quota_micros,
                        cfs_period_micros = %cgroup.cfs_period_micros,
                        "Updated node CPU stats"
                    );
                    report.updated.push(cgroup);
                }
                Err(reason) => {
                    info!(
                        node_id,
                        reason = %reason,
                        "Reason: {} from Node stats call for node {}",
                        reason,
                        node_id
                    );
                    report.skipped.push(SkippedNode {
                        node_id: node_id.to_string(),
                        reason,
                    });
                }
            }
        }

        report
    }
}

#[async_trait]
impl MetricCollector for NodeCpuStatsCollector {
    fn name(&self) -> &'static str {
        "node_cpu_stats"
    }

    async fn collect(&self) -> ExporterResult<CollectReport> {
        let stats = self.fetch().await?;
        Ok(self.apply(&stats))
    }
}
