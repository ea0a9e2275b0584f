//! 上流クラスタ向けHTTPクライアント
//!
//! 冪等メソッド（HEAD/GET/OPTIONS）に限り、一時的な失敗を指数バックオフで自動リトライする。

use elastic_cpu_exporter_common::{
    config::RetryConfig,
    error::{ExporterError, ExporterResult},
};
use reqwest::Method;
use std::time::Duration;
use tracing::{debug, warn};

/// リトライ方針
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff_base: Duration,
    backoff_max: Duration,
    status_forcelist: Vec<u16>,
}

impl RetryPolicy {
    /// 設定からリトライ方針を作成
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_base: Duration::from_millis(config.backoff_base_ms),
            backoff_max: Duration::from_millis(config.backoff_max_ms),
            status_forcelist: config.status_forcelist.clone(),
        }
    }

    /// 初回を除く最大リトライ回数
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// リトライ対象のステータスか
    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.status_forcelist.contains(&status)
    }

    /// リトライしてよいメソッドか
    pub fn is_retryable_method(&self, method: &Method) -> bool {
        matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
    }

    /// `retry`回目（1始まり）のリトライ前に待つ時間: base * 2^(retry-1)、上限あり
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        self.backoff_base
            .saturating_mul(1u32 << exponent)
            .min(self.backoff_max)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// 上流のレスポンス（ステータスとボディ）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTPステータスコード
    pub status: u16,
    /// レスポンスボディ
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// 2xxか
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// リトライ付きHTTPクライアント
#[derive(Debug, Clone)]
pub struct ResilientClient {
    base_url: String,
    http_client: reqwest::Client,
    policy: RetryPolicy,
    accept_invalid_certs: bool,
}

impl ResilientClient {
    /// 新しいクライアントを作成
    ///
    /// 監視対象クラスタは信頼済みネットワーク内にある前提のため、
    /// `accept_invalid_certs`が有効なら証明書検証を行わない。
    pub fn new(base_url: impl Into<String>, config: &RetryConfig) -> ExporterResult<Self> {
        // 組み立て後のreqwest::Clientからは設定を読み出せないため、フラグを自分でも保持する
        let http_client = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ExporterError::Http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
            policy: RetryPolicy::from_config(config),
            accept_invalid_certs: config.accept_invalid_certs,
        })
    }

    /// 証明書検証を無効化しているか
    pub fn accepts_invalid_certs(&self) -> bool {
        self.accept_invalid_certs
    }

    /// 監視対象のベースURL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// リトライ方針
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// パスからURLを組み立てる
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// `GET {base_url}{path}`
    pub async fn get(&self, path: &str) -> ExporterResult<HttpResponse> {
        self.request(Method::GET, path).await
    }

    /// リクエストを送信し、必要ならリトライする
    ///
    /// リトライ対象外のステータス（404など）はそのまま返す。判断は呼び出し側に任せる。
    pub async fn request(&self, method: Method, path: &str) -> ExporterResult<HttpResponse> {
        let url = self.url(path);
        let retryable_method = self.policy.is_retryable_method(&method);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let can_retry = retryable_method && attempt <= self.policy.max_retries;

            match self.http_client.request(method.clone(), &url).send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if retryable_method && self.policy.is_retryable_status(status) {
                        if !can_retry {
                            return Err(ExporterError::RetriesExhausted {
                                status,
                                attempts: attempt,
                            });
                        }
                        warn!(
                            url = %url,
                            status,
                            attempt,
                            "Retryable status from upstream"
                        );
                    } else {
                        let body = response.bytes().await.map_err(|e| {
                            ExporterError::Http(format!("Failed to read body from {}: {}", url, e))
                        })?;
                        debug!(url = %url, status, attempt, "Upstream responded");
                        return Ok(HttpResponse {
                            status,
                            body: body.to_vec(),
                        });
                    }
                }
                Err(e) => {
                    let transient = e.is_connect() || e.is_timeout() || e.is_request();
                    if !can_retry || !transient {
                        return Err(ExporterError::Http(format!(
                            "Request to {} failed after {} attempts: {}",
                            url, attempt, e
                        )));
                    }
                    warn!(url = %url, attempt, error = %e, "Upstream request failed");
                }
            }

            tokio::time::sleep(self.policy.backoff(attempt)).await;
        }
    }
}
