use tangle_store::WorkflowType;
use tangle_transactions::{BasicOutputSpec, Expiration, TransactionError};

use super::{unix_time, BuildContext, OutputBuilder, TransactionPlan};
use crate::EngineError;

/// Plain value moves: payments, credits, refunds, stakes and bill payments.
///
/// One basic output to the target carrying the requested amount and native
/// tokens, with optional vesting timelock, expiration, metadata and tag.
/// With a separate storage deposit source, that address adds exactly the
/// output's minimum deposit on top of the requested amount and gets the same
/// sum back through a storage deposit return condition.
pub struct ValueTransfer;

impl OutputBuilder for ValueTransfer {
    fn workflow_types(&self) -> &'static [WorkflowType] {
        &[
            WorkflowType::Payment,
            WorkflowType::Credit,
            WorkflowType::Refund,
            WorkflowType::Stake,
            WorkflowType::BillPayment,
        ]
    }

    fn build(&self, ctx: &BuildContext<'_>) -> Result<TransactionPlan, EngineError> {
        let payload = &ctx.record.payload;

        let mut spec = BasicOutputSpec::new(ctx.target()?, payload.amount);
        spec.native_tokens = payload.native_tokens.clone();
        spec.return_address = ctx.funder.map(|f| f.address());
        spec.vesting_at = payload.vesting_at.map(unix_time).transpose()?;
        spec.expiration = match &payload.expiration {
            Some(exp) => Some(Expiration {
                return_address: ctx.parse(&exp.return_address)?,
                unix_time: unix_time(exp.at)?,
            }),
            None => None,
        };
        spec.metadata = payload.metadata.clone();
        spec.tag = payload.tag.clone();
        let mut output = ctx.packer.pack_basic(&spec)?;

        let (source_due, funder_due) = match output.storage_deposit_return() {
            Some((_, refund)) => {
                let total = payload.amount.saturating_add(refund);
                if total > ctx.params().token_supply {
                    return Err(TransactionError::Malformed(format!(
                        "amount {total} exceeds token supply"
                    ))
                    .into());
                }
                output.set_amount(total);
                (payload.amount, refund)
            }
            None => (output.amount(), 0),
        };

        let mut plan = TransactionPlan::default();
        plan.outputs.push(output);
        plan.fund(ctx, ctx.source.address(), source_due, &payload.native_tokens)?;
        if let Some(funder) = ctx.funder {
            plan.fund(ctx, funder.address(), funder_due, &Default::default())?;
        }
        Ok(plan)
    }
}
