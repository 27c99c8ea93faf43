//! Minimum storage deposit.

use tangle_types::ProtocolParams;

use crate::codec::codec_for;
use crate::error::TransactionError;
use crate::output::Output;

/// Minimum amount `output` must hold on the network of `params`.
///
/// Every numeric field has a fixed width, so the result does not depend on
/// the amounts stored in the output.
pub fn min_storage_deposit(output: &Output, params: &ProtocolParams) -> Result<u64, TransactionError> {
    let len = codec_for(params.network).output_len(output)?;
    Ok(params.rent.min_deposit(len))
}

pub fn check_storage_deposit(output: &Output, params: &ProtocolParams) -> Result<(), TransactionError> {
    let minimum = min_storage_deposit(output, params)?;
    if output.amount() < minimum {
        return Err(TransactionError::BelowMinimumDeposit {
            amount: output.amount(),
            minimum,
        });
    }
    Ok(())
}
