//! Bounded inclusion polling.

use std::time::Duration;

use tangle_types::{BlockId, InclusionState};

use crate::error::WalletError;
use crate::node::NodeApi;

#[derive(Clone, Copy, Debug)]
pub struct InclusionPolicy {
    pub poll_interval: Duration,
    pub max_attempts: u32,
}

impl Default for InclusionPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            max_attempts: 60,
        }
    }
}

/// Poll the block's metadata until the node reports a final state.
///
/// Returns `Included`, `Conflicting` or `NoTransaction`; gives up with
/// `InclusionTimeout` after `max_attempts` polls. Failed polls count as
/// attempts.
pub async fn await_inclusion(
    node: &dyn NodeApi,
    block_id: &BlockId,
    policy: InclusionPolicy,
) -> Result<InclusionState, WalletError> {
    for attempt in 1..=policy.max_attempts {
        match node.block_metadata(block_id).await {
            Ok(state) if state.is_final() => {
                tracing::debug!(block = %block_id, ?state, attempt, "inclusion decided");
                return Ok(state);
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(block = %block_id, attempt, error = %e, "inclusion poll failed");
            }
        }
        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.poll_interval).await;
        }
    }
    Err(WalletError::InclusionTimeout {
        block_id: *block_id,
        attempts: policy.max_attempts,
    })
}
