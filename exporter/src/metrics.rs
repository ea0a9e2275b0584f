//! メトリクスレジストリ
//!
//! ノードごとのCPU cgroup値をラベルに持つゲージ`elastic_node_cpu_stats`を保持し、
//! Prometheusテキスト形式で公開する。値は常に1.0（存在を表す）で、quota/periodはラベルで運ぶ。

use elastic_cpu_exporter_common::{
    error::{ExporterError, ExporterResult},
    types::NodeCpuCgroup,
};
use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};

/// ゲージ名
pub const CPU_STATS_METRIC: &str = "elastic_node_cpu_stats";

const CPU_STATS_HELP: &str = "Details got from elastic nodes CPU Stats";

/// ラベル名（順序固定）
pub const CPU_STATS_LABELS: [&str; 3] = ["node", "cfs_quota_micros", "cfs_period_micros"];

/// 公開時のContent-Type
pub const TEXT_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// CPU cgroupゲージを保持するレジストリ
///
/// `prometheus`のメトリクスは内部で`Arc`共有されるため、cloneしたハンドル同士は同じ値を見る。
/// 書き込みはコレクター1本、読み出しはスクレイプごとに並行して行われる。
#[derive(Clone)]
pub struct CpuStatsRegistry {
    registry: Registry,
    cpu_stats: GaugeVec,
}

impl CpuStatsRegistry {
    /// ゲージを登録したレジストリを作成
    pub fn new() -> ExporterResult<Self> {
        let registry = Registry::new();
        let cpu_stats = GaugeVec::new(Opts::new(CPU_STATS_METRIC, CPU_STATS_HELP), &CPU_STATS_LABELS)
            .map_err(|e| ExporterError::Metrics(e.to_string()))?;
        registry
            .register(Box::new(cpu_stats.clone()))
            .map_err(|e| ExporterError::Metrics(e.to_string()))?;

        Ok(Self {
            registry,
            cpu_stats,
        })
    }

    /// ノード/quota/periodの組に対応する系列を1.0に設定（同じ組なら冪等）
    pub fn set_series(&self, labels: &NodeCpuCgroup) {
        self.cpu_stats
            .with_label_values(&[
                labels.name.as_str(),
                labels.cfs_quota_micros.as_str(),
                labels.cfs_period_micros.as_str(),
            ])
            .set(1.0);
    }

    /// 指定の組の現在値（未設定ならNone）
    ///
    /// `get_metric_with_label_values`は未知の組を作成してしまうため、収集結果から引く。
    pub fn series_value(&self, labels: &NodeCpuCgroup) -> Option<f64> {
        self.cpu_metrics()
            .into_iter()
            .find(|(series, _)| series == labels)
            .map(|(_, value)| value)
    }

    /// 現在公開中の系列（ラベルの組）一覧
    pub fn cpu_series(&self) -> Vec<NodeCpuCgroup> {
        let mut series: Vec<_> = self
            .cpu_metrics()
            .into_iter()
            .map(|(series, _)| series)
            .collect();
        series.sort();
        series
    }

    fn cpu_metrics(&self) -> Vec<(NodeCpuCgroup, f64)> {
        let mut metrics = Vec::new();
        for family in self.registry.gather() {
            if family.get_name() != CPU_STATS_METRIC {
                continue;
            }
            for metric in family.get_metric() {
                let label = |name: &str| {
                    metric
                        .get_label()
                        .iter()
                        .find(|pair| pair.get_name() == name)
                        .map(|pair| pair.get_value().to_string())
                        .unwrap_or_default()
                };
                let series = NodeCpuCgroup {
                    name: label("node"),
                    cfs_quota_micros: label("cfs_quota_micros"),
                    cfs_period_micros: label("cfs_period_micros"),
                };
                metrics.push((series, metric.get_gauge().get_value()));
            }
        }
        metrics
    }

    /// 公開中の系列数
    pub fn series_count(&self) -> usize {
        self.cpu_series().len()
    }

    /// Prometheusテキスト形式で出力
    ///
    /// 書式は`prometheus`クレートの`TextEncoder`に従う。ラベルは名前順に並び、
    /// 値1.0は`1`と出力される（例: `elastic_node_cpu_stats{cfs_period_micros="100000",cfs_quota_micros="100000",node="es-1"} 1`）。
    /// スクレイパーは`1.0`と同じ値として読む。
    pub fn gather_text(&self) -> ExporterResult<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buf = Vec::new();
        encoder
            .encode(&metric_families, &mut buf)
            .map_err(|e| ExporterError::Metrics(format!("encode error: {}", e)))?;
        String::from_utf8(buf).map_err(|e| ExporterError::Metrics(e.to_string()))
    }
}
