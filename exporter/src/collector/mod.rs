//! メトリクスコレクター
//!
//! スケジューラは`MetricCollector`の集合を回すだけなので、
//! 新しい種類のメトリクスはコレクターを追加するだけで公開できる。

mod node_cpu;

pub use node_cpu::{NodeCpuStatsCollector, NODE_STATS_OS_PATH};

use async_trait::async_trait;
use elastic_cpu_exporter_common::{
    error::ExporterResult,
    types::{NodeCpuCgroup, SkipReason},
};

/// 1サイクル分の収集結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectReport {
    /// 設定した系列
    pub updated: Vec<NodeCpuCgroup>,
    /// スキップしたノード
    pub skipped: Vec<SkippedNode>,
}

impl CollectReport {
    /// 設定した系列数
    pub fn updated_count(&self) -> usize {
        self.updated.len()
    }

    /// スキップしたノード数
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

/// スキップしたノード
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedNode {
    /// クラスタが割り当てたノードID
    pub node_id: String,
    /// スキップ理由
    pub reason: SkipReason,
}

/// 上流から値を取得してレジストリを更新するコレクター
///
/// `collect`がエラーを返した場合、そのサイクルではレジストリを一切更新しないこと。
#[async_trait]
pub trait MetricCollector: Send + Sync {
    /// ログ用の名前
    fn name(&self) -> &'static str;

    /// 1サイクル分の収集を行う
    async fn collect(&self) -> ExporterResult<CollectReport>;
}
