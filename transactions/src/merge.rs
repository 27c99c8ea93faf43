//! Consolidating and splitting value.

use tangle_types::{NativeTokens, ProtocolParams};

use crate::deposit::min_storage_deposit;
use crate::error::TransactionError;
use crate::output::{BasicOutput, Output};

/// Sum same-owner outputs into one synthetic basic output.
///
/// The result holds the total amount and every native token of the inputs
/// and is owned by their common owner. Used as the starting point for change.
pub fn merge_outputs<'a>(
    outputs: impl IntoIterator<Item = &'a Output>,
) -> Result<Output, TransactionError> {
    let mut iter = outputs.into_iter().peekable();
    let first = iter.peek().ok_or(TransactionError::Empty)?;
    let owner = first
        .owner()
        .ok_or_else(|| TransactionError::Malformed("output without owner".into()))?;

    let mut amount = 0u64;
    let mut tokens = NativeTokens::new();
    for output in iter {
        if output.owner() != Some(owner) {
            return Err(TransactionError::Malformed(
                "cannot merge outputs of different owners".into(),
            ));
        }
        amount = amount
            .checked_add(output.amount())
            .ok_or_else(|| TransactionError::Malformed("amount overflow".into()))?;
        tokens.add_all(output.native_tokens())?;
    }

    let mut merged = BasicOutput::plain(owner, amount);
    merged.native_tokens = tokens;
    Ok(Output::Basic(merged))
}

/// Take `amount` and `native_tokens` out of `output`, returning the change.
///
/// `None` means nothing is left. A remainder that cannot cover its own
/// storage deposit is an `InsufficientFunds` error; value is never burned.
pub fn subtract(
    output: &Output,
    amount: u64,
    native_tokens: &NativeTokens,
    params: &ProtocolParams,
) -> Result<Option<Output>, TransactionError> {
    let available = output.amount();
    let remaining = available
        .checked_sub(amount)
        .ok_or(TransactionError::InsufficientFunds {
            needed: amount,
            available,
        })?;

    let mut tokens = output.native_tokens().clone();
    for (id, wanted) in native_tokens.iter() {
        let held = tokens.get(id);
        if !tokens.checked_sub(id, *wanted) {
            return Err(TransactionError::InvalidNativeToken {
                token_id: id.to_string(),
                needed: *wanted,
                available: held,
            });
        }
    }

    if remaining == 0 && tokens.is_empty() {
        return Ok(None);
    }

    let owner = output
        .owner()
        .ok_or_else(|| TransactionError::Malformed("output without owner".into()))?;
    let mut change = BasicOutput::plain(owner, remaining);
    change.native_tokens = tokens;
    let change = Output::Basic(change);

    let minimum = min_storage_deposit(&change, params)?;
    if remaining < minimum {
        return Err(TransactionError::InsufficientFunds {
            needed: amount.saturating_add(minimum),
            available,
        });
    }
    Ok(Some(change))
}
