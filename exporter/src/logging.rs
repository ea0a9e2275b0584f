//! ロギング初期化ユーティリティ
//!
//! `tracing` による構造化ロギングをJSONライン形式で標準出力へ出力する。
//! 各行は timestamp / level / target（ロガー名）/ fields.message を持つ。

use std::{
    io::{self, Error},
    sync::OnceLock,
};
use tracing::Subscriber;
use tracing_appender::{non_blocking, non_blocking::WorkerGuard};
use tracing_subscriber::{
    fmt, fmt::MakeWriter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

const LEVEL_ENV: &str = "ELASTIC_EXPORTER_LOG_LEVEL";
const ALT_LEVEL_ENV: &str = "RUST_LOG";

static LOGGER_GUARD: OnceLock<Result<LoggerGuard, io::Error>> = OnceLock::new();

struct LoggerGuard {
    _stdout_guard: WorkerGuard,
}

/// 既定のログレベル（`--verbose`でdebug）
pub fn default_level(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

/// ログ出力を初期化する。2回目以降の呼び出しは最初の結果を返す
pub fn init(verbose: bool) -> io::Result<()> {
    match LOGGER_GUARD.get_or_init(|| configure_logger(verbose)) {
        Ok(_) => Ok(()),
        Err(err) => Err(io::Error::new(err.kind(), err.to_string())),
    }
}

fn build_filter(verbose: bool) -> EnvFilter {
    // 優先順位: ELASTIC_EXPORTER_LOG_LEVEL > RUST_LOG > --verbose
    EnvFilter::try_from_env(LEVEL_ENV)
        .or_else(|_| EnvFilter::try_from_env(ALT_LEVEL_ENV))
        .unwrap_or_else(|_| EnvFilter::new(default_level(verbose)))
}

/// JSONライン形式のサブスクライバーを組み立てる（グローバルには登録しない）
fn build_subscriber<W>(verbose: bool, writer: W) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let json_layer = fmt::layer()
        .json()
        .with_writer(writer)
        .with_current_span(false)
        .with_span_list(false)
        .with_target(true)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(build_filter(verbose))
        .with(json_layer)
}

fn configure_logger(verbose: bool) -> io::Result<LoggerGuard> {
    let (stdout_writer, stdout_guard) = non_blocking(io::stdout());

    build_subscriber(verbose, stdout_writer)
        .try_init()
        .map_err(Error::other)?;

    Ok(LoggerGuard {
        _stdout_guard: stdout_guard,
    })
}
