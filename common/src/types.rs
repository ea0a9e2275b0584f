//! ノード統計APIのレスポンス型
//!
//! `GET /_nodes/stats/os` のうち、CPU cgroup情報に必要な部分だけを型付けする。
//! 上流はノードごとにcgroupブロックを省略しうるため、全フィールドを`Option`で受ける。

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::BTreeMap, fmt};

/// `_nodes/stats/os` レスポンス
///
/// ノード詳細は個別にデコードする。1ノードの不正データで全体を失敗させないため。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeStatsResponse {
    /// ノードID → ノード詳細（未デコード）
    pub nodes: BTreeMap<String, Value>,
}

impl NodeStatsResponse {
    /// レスポンスボディをデコードする
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// ノード数
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// ノードが1件もないか
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// ノードIDごとのCPU cgroup抽出結果（ノードID順）
    pub fn cpu_cgroups(&self) -> impl Iterator<Item = (&str, Result<NodeCpuCgroup, SkipReason>)> {
        self.nodes.iter().map(|(id, raw)| {
            let extracted = NodeDetail::deserialize(raw)
                .map_err(|e| SkipReason::Malformed(e.to_string()))
                .and_then(|detail| detail.cpu_cgroup().map_err(SkipReason::Missing));
            (id.as_str(), extracted)
        })
    }
}

/// ノード詳細
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NodeDetail {
    /// ノード名
    #[serde(default)]
    pub name: Option<String>,
    /// OS統計
    #[serde(default)]
    pub os: Option<OsStats>,
}

/// OS統計
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OsStats {
    /// cgroup統計（コンテナ外ノードでは省略される）
    #[serde(default)]
    pub cgroup: Option<CgroupStats>,
}

/// cgroup統計
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CgroupStats {
    /// CPU cgroup
    #[serde(default)]
    pub cpu: Option<CgroupCpu>,
}

/// CPU cgroup (CFS)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CgroupCpu {
    /// CFSクォータ（マイクロ秒）
    #[serde(default)]
    pub cfs_quota_micros: Option<StatValue>,
    /// CFS周期（マイクロ秒）
    #[serde(default)]
    pub cfs_period_micros: Option<StatValue>,
}

/// 数値または文字列で返される統計値
///
/// Elasticsearchのバージョンによって`100000`と`"100000"`の両方がありうる。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum StatValue {
    /// 整数
    Integer(i64),
    /// 浮動小数
    Float(f64),
    /// 文字列
    Text(String),
}

impl StatValue {
    /// ラベル値としての文字列表現
    pub fn as_label(&self) -> String {
        match self {
            StatValue::Integer(v) => v.to_string(),
            StatValue::Float(v) => v.to_string(),
            StatValue::Text(v) => v.clone(),
        }
    }
}

impl fmt::Display for StatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_label())
    }
}

/// 欠落していたフィールド（走査順で最初のもの）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    /// `name`
    Name,
    /// `os`
    Os,
    /// `os.cgroup`
    Cgroup,
    /// `os.cgroup.cpu`
    Cpu,
    /// `os.cgroup.cpu.cfs_quota_micros`
    CfsQuotaMicros,
    /// `os.cgroup.cpu.cfs_period_micros`
    CfsPeriodMicros,
}

impl MissingField {
    /// JSONパス表記
    pub fn path(&self) -> &'static str {
        match self {
            MissingField::Name => "name",
            MissingField::Os => "os",
            MissingField::Cgroup => "os.cgroup",
            MissingField::Cpu => "os.cgroup.cpu",
            MissingField::CfsQuotaMicros => "os.cgroup.cpu.cfs_quota_micros",
            MissingField::CfsPeriodMicros => "os.cgroup.cpu.cfs_period_micros",
        }
    }
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// ノードをスキップした理由
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// 必須フィールドが欠落
    Missing(MissingField),
    /// ノード詳細の型が想定と異なる
    Malformed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Missing(field) => write!(f, "missing {}", field),
            SkipReason::Malformed(reason) => write!(f, "malformed node detail: {}", reason),
        }
    }
}

/// 1ノード分のCPU cgroup値（ラベル用文字列）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeCpuCgroup {
    /// ノード名
    pub name: String,
    /// CFSクォータ
    pub cfs_quota_micros: String,
    /// CFS周期
    pub cfs_period_micros: String,
}

impl NodeDetail {
    /// 必須フィールドがすべて揃っていればCPU cgroup値を返す
    pub fn cpu_cgroup(&self) -> Result<NodeCpuCgroup, MissingField> {
        let name = self.name.as_ref().ok_or(MissingField::Name)?;
        let os = self.os.as_ref().ok_or(MissingField::Os)?;
        let cgroup = os.cgroup.as_ref().ok_or(MissingField::Cgroup)?;
        let cpu = cgroup.cpu.as_ref().ok_or(MissingField::Cpu)?;
        let quota = cpu
            .cfs_quota_micros
            .as_ref()
            .ok_or(MissingField::CfsQuotaMicros)?;
        let period = cpu
            .cfs_period_micros
            .as_ref()
            .ok_or(MissingField::CfsPeriodMicros)?;

        Ok(NodeCpuCgroup {
            name: name.clone(),
            cfs_quota_micros: quota.as_label(),
            cfs_period_micros: period.as_label(),
        })
    }
}
