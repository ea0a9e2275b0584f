//! 収集スケジューラ
//!
//! 一定間隔でコレクターを順番に実行する。前のサイクルが終わるまで次は始まらない。
//! 失敗したサイクルはログに残すだけで、ループからは抜けない。

use crate::collector::MetricCollector;
use async_trait::async_trait;
use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// サイクル間の待機を抽象化したクロック
#[async_trait]
pub trait Clock: Send + Sync {
    /// `duration`だけ待機する
    async fn sleep(&self, duration: Duration);
}

/// `tokio::time::sleep`によるクロック
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// スケジューラの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// 最初のサイクル前
    Idle,
    /// 定常ループ中
    Running,
}

/// 収集スケジューラ
pub struct Scheduler {
    collectors: Vec<Box<dyn MetricCollector>>,
    interval: Duration,
    clock: Arc<dyn Clock>,
    cancel: CancellationToken,
    state: SchedulerState,
    cycles: u64,
}

impl Scheduler {
    /// 新しいスケジューラを作成
    pub fn new(interval: Duration) -> Self {
        Self {
            collectors: Vec::new(),
            interval,
            clock: Arc::new(TokioClock),
            cancel: CancellationToken::new(),
            state: SchedulerState::Idle,
            cycles: 0,
        }
    }

    /// コレクターを追加
    pub fn with_collector(mut self, collector: Box<dyn MetricCollector>) -> Self {
        self.collectors.push(collector);
        self
    }

    /// クロックを差し替える
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// キャンセルトークンを差し替える
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// 現在の状態
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// 完了したサイクル数
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// 収集間隔
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// ループ停止用のトークン
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 全コレクターを1回ずつ実行する
    pub async fn run_cycle(&mut self) {
        for collector in &self.collectors {
            match collector.collect().await {
                Ok(report) => debug!(
                    collector = collector.name(),
                    updated = report.updated_count(),
                    skipped = report.skipped_count(),
                    "Collection cycle completed"
                ),
                Err(e) => error!(
                    collector = collector.name(),
                    error = %e,
                    "Failed to fetch metrics, keeping previous values"
                ),
            }
        }
        self.cycles += 1;
    }

    /// キャンセルされるまで収集ループを回す。完了したサイクル数を返す
    pub async fn run(&mut self) -> u64 {
        info!(
            interval_secs = self.interval.as_secs_f64(),
            collectors = self.collectors.len(),
            "Scheduler started"
        );
        self.state = SchedulerState::Running;

        while !self.cancel.is_cancelled() {
            self.run_cycle().await;

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = self.clock.sleep(self.interval) => {}
            }
        }

        info!(cycles = self.cycles, "Scheduler stopped");
        self.cycles
    }

    /// バックグラウンドでループを開始
    pub fn start(mut self) -> JoinHandle<u64> {
        tokio::spawn(async move { self.run().await })
    }
}
