//! Output discovery for transaction inputs.

use tangle_types::{Address, OutputId};
use tangle_transactions::InputSelection;

use crate::error::WalletError;
use crate::node::NodeApi;

/// Outputs to spend from `address`.
///
/// With `previous` ids (a retry), exactly those outputs are re-fetched in
/// the same order, so the retried transaction spends the same inputs as
/// the first attempt; a spent one is an error. Without them, every unspent
/// output the node indexes for the address is returned.
pub async fn get_outputs(
    node: &dyn NodeApi,
    address: &Address,
    previous: Option<&[OutputId]>,
) -> Result<InputSelection, WalletError> {
    let mut entries = Vec::new();
    match previous {
        Some(ids) if !ids.is_empty() => {
            for id in ids {
                let found = node.get_output(id).await?;
                if found.is_spent {
                    return Err(WalletError::InputSpent(*id));
                }
                entries.push((*id, found.output));
            }
        }
        _ => {
            for id in node.output_ids(address).await? {
                let found = node.get_output(&id).await?;
                if !found.is_spent {
                    entries.push((id, found.output));
                }
            }
        }
    }
    Ok(InputSelection::new(entries)?)
}
