//! Trigger queue and dispatcher.
//!
//! Everything that may move a record forward (creation, a retry flag, a
//! cleared dependency, an operator) becomes a [`Trigger`]. The dispatcher
//! drains the queue and runs each trigger in its own task.

use std::fmt;

use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::executor::{Executor, Outcome};
use crate::shutdown::ShutdownSignal;
use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerReason {
    Created,
    Retry,
    PolicyCleared,
    Manual,
}

impl fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::Retry => "retry",
            Self::PolicyCleared => "policy_cleared",
            Self::Manual => "manual",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Trigger {
    pub id: String,
    pub reason: TriggerReason,
}

impl Trigger {
    pub fn new(id: impl Into<String>, reason: TriggerReason) -> Self {
        Self {
            id: id.into(),
            reason,
        }
    }

    pub fn created(id: impl Into<String>) -> Self {
        Self::new(id, TriggerReason::Created)
    }

    pub fn retry(id: impl Into<String>) -> Self {
        Self::new(id, TriggerReason::Retry)
    }
}

/// Sending half of the trigger queue.
#[derive(Clone)]
pub struct TriggerQueue {
    sender: mpsc::Sender<Trigger>,
}

impl TriggerQueue {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Trigger>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    pub async fn send(&self, trigger: Trigger) -> Result<(), EngineError> {
        self.sender
            .send(trigger)
            .await
            .map_err(|_| EngineError::QueueClosed)
    }
}

/// Run one trigger to completion: process the record, then follow any
/// submission until the ledger decides.
pub async fn handle(executor: &Executor, trigger: Trigger) -> Result<Outcome, EngineError> {
    tracing::debug!(tx = %trigger.id, reason = %trigger.reason, "trigger");
    let outcome = executor.process(&trigger.id).await?;
    match outcome.block_to_track() {
        Some((block_id, node_index)) => executor.track(&trigger.id, block_id, node_index).await,
        None => Ok(outcome),
    }
}

pub struct Dispatcher {
    executor: Executor,
    receiver: mpsc::Receiver<Trigger>,
}

impl Dispatcher {
    pub fn new(executor: Executor, receiver: mpsc::Receiver<Trigger>) -> Self {
        Self { executor, receiver }
    }

    /// Drain the queue until shutdown or until every sender is gone.
    ///
    /// Tasks still running at shutdown are aborted; their records stay
    /// in progress and the sweep picks them up after a restart.
    pub async fn run(mut self, mut shutdown: ShutdownSignal) {
        let mut tasks = JoinSet::new();
        tracing::info!("dispatcher started");
        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                trigger = self.receiver.recv() => {
                    let Some(trigger) = trigger else { break };
                    let executor = self.executor.clone();
                    tasks.spawn(async move {
                        let id = trigger.id.clone();
                        match handle(&executor, trigger).await {
                            Ok(outcome) => tracing::debug!(tx = %id, ?outcome, "trigger done"),
                            Err(e) => tracing::warn!(tx = %id, error = %e, "trigger failed"),
                        }
                    });
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!(error = %e, "trigger task panicked");
                    }
                }
            }
        }
        tasks.shutdown().await;
        tracing::info!("dispatcher stopped");
    }
}
