//! Retry scheduler: the staleness sweep.
//!
//! Failed attempts only flip `should_retry`; nothing retries inline. The
//! sweep turns flagged records into triggers and also flags records whose
//! attempt stalled without ever reaching a verdict.

use std::sync::Arc;
use std::time::Duration;

use tangle_store::{TransactionRecord, TransactionStore};
use tangle_types::{Clock, Timestamp};

use crate::metrics::EngineMetrics;
use crate::shutdown::ShutdownSignal;
use crate::trigger::{Trigger, TriggerQueue};
use crate::EngineError;

#[derive(Clone)]
pub struct RetryScheduler {
    transactions: Arc<dyn TransactionStore>,
    clock: Arc<dyn Clock>,
    metrics: Arc<EngineMetrics>,
    stale_after: u64,
}

/// Whether a record has sat too long without progress.
///
/// In-flight records go stale `stale_after` seconds after their last
/// attempt started; records that never started (a lost reservation race)
/// go stale that long after creation.
fn is_stale(record: &TransactionRecord, stale_after: u64, now: Timestamp) -> bool {
    let wallet = &record.wallet_reference;
    if !wallet.is_pending() || record.depends_on_bill_payment {
        return false;
    }
    if wallet.in_progress {
        return wallet
            .processed_on
            .map_or(true, |at| at.is_older_than(stale_after, now));
    }
    wallet.attempt_count == 0 && record.created_on.is_older_than(stale_after, now)
}

impl RetryScheduler {
    pub fn new(
        transactions: Arc<dyn TransactionStore>,
        clock: Arc<dyn Clock>,
        metrics: Arc<EngineMetrics>,
        stale_after: u64,
    ) -> Self {
        Self {
            transactions,
            clock,
            metrics,
            stale_after,
        }
    }

    /// Flag every stale record for retry and return the ids flipped by this
    /// call. Running it again flips nothing new.
    pub fn sweep_stale(&self, stale_after: u64) -> Result<Vec<String>, EngineError> {
        let now = self.clock.now();
        let mut swept = Vec::new();
        for record in self.transactions.iter_pending()? {
            if record.should_retry || !is_stale(&record, stale_after, now) {
                continue;
            }
            let mut flipped = false;
            self.transactions.update_transaction(&record.id, &mut |r| {
                flipped = !r.should_retry && is_stale(r, stale_after, now);
                if flipped {
                    r.should_retry = true;
                }
                flipped
            })?;
            if flipped {
                tracing::info!(tx = %record.id, "flagged stale transaction for retry");
                swept.push(record.id);
            }
        }
        self.metrics.swept.inc_by(swept.len() as u64);
        Ok(swept)
    }

    /// Ids of records waiting for a retry trigger.
    pub fn due(&self) -> Result<Vec<String>, EngineError> {
        Ok(self
            .transactions
            .iter_pending()?
            .into_iter()
            .filter(|r| r.should_retry && !r.depends_on_bill_payment)
            .map(|r| r.id)
            .collect())
    }

    /// One sweep plus a retry trigger for every due record. Returns how
    /// many triggers were queued.
    pub async fn tick(&self, queue: &TriggerQueue) -> Result<usize, EngineError> {
        let swept = self.sweep_stale(self.stale_after)?;
        if !swept.is_empty() {
            tracing::debug!(count = swept.len(), "sweep flagged transactions");
        }
        let due = self.due()?;
        let count = due.len();
        for id in due {
            queue.send(Trigger::retry(id)).await?;
        }
        Ok(count)
    }

    /// Sweep every `interval` until shutdown or until the queue closes.
    pub async fn run(
        self,
        interval: Duration,
        queue: TriggerQueue,
        mut shutdown: ShutdownSignal,
    ) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tracing::info!(?interval, stale_after = self.stale_after, "retry sweep started");
        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = ticker.tick() => {
                    match self.tick(&queue).await {
                        Ok(_) => {}
                        Err(EngineError::QueueClosed) => break,
                        Err(e) => tracing::warn!(error = %e, "retry sweep failed"),
                    }
                }
            }
        }
        tracing::info!("retry sweep stopped");
    }
}
