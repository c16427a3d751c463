//! Periodic expiry sweep
//!
//! Expired rows read as misses immediately but only leave the store when
//! something deletes them. The sweeper does that on a fixed interval for the
//! generic entries and all four domain tables.

use crate::domain::{DomainCaches, DomainSweep};
use crate::manager::CacheManager;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

/// Rows removed by one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub entries: u64,
    pub transactions: u64,
    pub blocks: u64,
    pub accounts: u64,
    pub tokens: u64,
}

impl SweepReport {
    pub fn new(entries: u64, domains: DomainSweep) -> Self {
        Self {
            entries,
            transactions: domains.transactions,
            blocks: domains.blocks,
            accounts: domains.accounts,
            tokens: domains.tokens,
        }
    }

    pub fn total(&self) -> u64 {
        self.entries + self.transactions + self.blocks + self.accounts + self.tokens
    }
}

/// Run one sweep now. Failures are logged per table and count as zero.
pub async fn sweep_once(manager: &CacheManager, domains: &DomainCaches) -> SweepReport {
    let entries = manager.sweep_expired().await;
    let report = SweepReport::new(entries, domains.sweep_expired().await);

    if report.total() > 0 {
        tracing::info!(
            entries = report.entries,
            transactions = report.transactions,
            blocks = report.blocks,
            accounts = report.accounts,
            tokens = report.tokens,
            "expired cache rows swept"
        );
    } else {
        debug_log!("expiry sweep found nothing to remove");
    }
    report
}

/// Handle to the background sweep task. Dropping it aborts the task.
#[derive(Debug)]
pub struct Sweeper {
    shutdown_tx: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl Sweeper {
    /// Start sweeping every `every`. The first sweep happens one full
    /// interval after spawning. Must be called inside a tokio runtime.
    pub fn spawn(manager: CacheManager, domains: DomainCaches, every: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let every = every.max(Duration::from_millis(1));
        let handle = tokio::spawn(run(manager, domains, every, shutdown_rx));

        Self {
            shutdown_tx,
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Signal the task and wait for it to finish its current sweep
    pub async fn stop(mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                tracing::warn!(error = %err, "sweeper task ended abnormally");
            }
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn run(
    manager: CacheManager,
    domains: DomainCaches,
    every: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // interval fires immediately on the first tick
    ticker.tick().await;

    tracing::info!(interval = ?every, "cache sweeper started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                sweep_once(&manager, &domains).await;
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }

    tracing::info!("cache sweeper stopped");
}
