//! 設定管理
//!
//! ExporterConfig, RetryConfig等の設定構造体

use crate::error::{CommonError, CommonResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Exporter設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// 監視対象ElasticsearchクラスタのHTTPエンドポイント（必須）
    pub endpoint: String,

    /// ポーリング間隔（秒）(デフォルト: 60)
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// メトリクス公開ホスト (デフォルト: "0.0.0.0")
    #[serde(default = "default_host")]
    pub host: String,

    /// メトリクス公開ポート (デフォルト: 9210)
    #[serde(default = "default_port")]
    pub port: u16,

    /// 詳細ログ (デフォルト: false)
    #[serde(default)]
    pub verbose: bool,

    /// リトライ設定
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_interval() -> u64 {
    60
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9210
}

impl ExporterConfig {
    /// エンドポイントのみ指定し、残りはデフォルト値で作成
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            interval_secs: default_interval(),
            host: default_host(),
            port: default_port(),
            verbose: false,
            retry: RetryConfig::default(),
        }
    }

    /// 設定値を検証し、エンドポイント末尾の`/`を取り除く
    pub fn validate(mut self) -> CommonResult<Self> {
        let trimmed = self.endpoint.trim().trim_end_matches('/').to_string();
        if trimmed.is_empty() {
            return Err(CommonError::Validation("endpoint must not be empty".into()));
        }
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(CommonError::Validation(format!(
                "endpoint must start with http:// or https://: {}",
                trimmed
            )));
        }
        if self.interval_secs == 0 {
            return Err(CommonError::Validation(
                "interval must be at least 1 second".into(),
            ));
        }
        if self.retry.status_forcelist.iter().any(|s| !(100..600).contains(s)) {
            return Err(CommonError::Config(format!(
                "invalid status code in retry forcelist: {:?}",
                self.retry.status_forcelist
            )));
        }
        self.endpoint = trimmed;
        Ok(self)
    }

    /// ポーリング間隔
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// メトリクスサーバーのバインドアドレス
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 上流呼び出しのリトライ設定
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryConfig {
    /// 最大リトライ回数（初回を除く）(デフォルト: 3)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// バックオフ初期値（ミリ秒）(デフォルト: 100)
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// バックオフ上限（ミリ秒）(デフォルト: 2000)
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,

    /// リトライ対象ステータスコード
    #[serde(default = "default_status_forcelist")]
    pub status_forcelist: Vec<u16>,

    /// 証明書検証を無効化する（信頼済みネットワーク前提）
    #[serde(default = "default_accept_invalid_certs")]
    pub accept_invalid_certs: bool,

    /// 1リクエストあたりのタイムアウト（秒）(デフォルト: 10)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    100
}

fn default_backoff_max_ms() -> u64 {
    2000
}

fn default_status_forcelist() -> Vec<u16> {
    vec![429, 500, 502, 503, 504]
}

fn default_accept_invalid_certs() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            status_forcelist: default_status_forcelist(),
            accept_invalid_certs: default_accept_invalid_certs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}
