//! Essence & unlock builder: turns an input snapshot and a set of outputs
//! into a signed transaction payload.

use tangle_crypto::{blake2b_256, AddressDetails};
use tangle_types::{NativeTokens, OutputId, ProtocolParams, TransactionId};

use crate::block::TransactionPayload;
use crate::codec::codec_for;
use crate::deposit::check_storage_deposit;
use crate::error::TransactionError;
use crate::essence::{essence_from_selection, sum_amounts, InputSelection, TaggedData};
use crate::output::Output;
use crate::unlock::create_unlocks;

/// A payload ready to be wrapped in a block, plus what it consumes.
#[derive(Clone, Debug)]
pub struct SignedTransaction {
    pub payload: TransactionPayload,
    pub transaction_id: TransactionId,
    pub inputs: Vec<OutputId>,
}

impl SignedTransaction {
    /// Ids of the outputs this transaction creates, in output order.
    pub fn output_ids(&self) -> Vec<OutputId> {
        (0..self.payload.essence.outputs.len())
            .map(|i| OutputId::new(self.transaction_id, i as u16))
            .collect()
    }
}

fn check_token_balance(
    selection: &InputSelection,
    outputs: &[Output],
) -> Result<(), TransactionError> {
    let available = selection.native_tokens()?;
    let mut needed = NativeTokens::new();
    for output in outputs {
        needed.add_all(output.native_tokens())?;
    }
    for (id, amount) in needed.iter() {
        if available.get(id) != *amount {
            return Err(TransactionError::InvalidNativeToken {
                token_id: id.to_string(),
                needed: *amount,
                available: available.get(id),
            });
        }
    }
    // Tokens on the input side that no output carries would be burned.
    for (id, amount) in available.iter() {
        if needed.get(id) == 0 {
            return Err(TransactionError::InvalidNativeToken {
                token_id: id.to_string(),
                needed: 0,
                available: *amount,
            });
        }
    }
    Ok(())
}

/// Check balances, assemble the essence, and sign it.
///
/// Amounts must balance exactly. Native tokens must balance too unless a
/// foundry output is present, in which case minting or melting is up to
/// the ledger to validate.
pub fn build_transaction(
    params: &ProtocolParams,
    selection: &InputSelection,
    outputs: Vec<Output>,
    auxiliary: Option<TaggedData>,
    signers: &[&AddressDetails],
) -> Result<SignedTransaction, TransactionError> {
    if selection.is_empty() || outputs.is_empty() {
        return Err(TransactionError::Empty);
    }
    for output in &outputs {
        check_storage_deposit(output, params)?;
    }

    let inputs_total = selection.total_amount()?;
    let outputs_total = sum_amounts(outputs.iter())?;
    if inputs_total != outputs_total {
        return Err(TransactionError::Unbalanced {
            inputs: inputs_total,
            outputs: outputs_total,
        });
    }
    if !outputs.iter().any(|o| matches!(o, Output::Foundry(_))) {
        check_token_balance(selection, &outputs)?;
    }

    let codec = codec_for(params.network);
    let essence = essence_from_selection(params, codec, selection, outputs, auxiliary)?;
    let essence_hash = codec.essence_hash(&essence)?;
    let unlocks = create_unlocks(selection, &essence_hash, signers)?;

    let payload = TransactionPayload { essence, unlocks };
    let transaction_id = TransactionId::new(blake2b_256(&codec.encode_payload(&payload)?));

    Ok(SignedTransaction {
        inputs: selection.output_ids(),
        payload,
        transaction_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::BasicOutput;
    use crate::unlock::Unlock;
    use tangle_crypto::verify_essence;
    use tangle_types::{Address, AliasId, Network, TokenId};

    const M1: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon art";

    fn oid(b: u8, i: u16) -> OutputId {
        OutputId::new(TransactionId::new([b; 32]), i)
    }

    fn plain(owner: Address, amount: u64) -> Output {
        Output::Basic(BasicOutput::plain(owner, amount))
    }

    #[test]
    fn balanced_transaction_is_signed() {
        let d = AddressDetails::derive(M1, Network::Smr).unwrap();
        let params = ProtocolParams::for_network(Network::Smr);
        let sel = InputSelection::new(vec![
            (oid(1, 0), plain(d.address(), 600_000)),
            (oid(2, 0), plain(d.address(), 400_000)),
        ])
        .unwrap();
        let outputs = vec![plain(d.address(), 1_000_000)];
        let tx = build_transaction(&params, &sel, outputs, None, &[&d]).unwrap();

        assert_eq!(tx.inputs, sel.output_ids());
        assert_eq!(tx.payload.unlocks.len(), 2);
        assert_eq!(tx.payload.unlocks[1], Unlock::Reference(0));
        let hash = codec_for(Network::Smr)
            .essence_hash(&tx.payload.essence)
            .unwrap();
        let Unlock::Signature {
            public_key,
            signature,
        } = &tx.payload.unlocks[0]
        else {
            panic!("expected signature unlock");
        };
        assert!(verify_essence(&hash, signature, public_key));
        assert_eq!(tx.output_ids()[0].transaction_id, tx.transaction_id);
    }

    #[test]
    fn unbalanced_is_rejected() {
        let d = AddressDetails::derive(M1, Network::Smr).unwrap();
        let params = ProtocolParams::for_network(Network::Smr);
        let sel = InputSelection::new(vec![(oid(1, 0), plain(d.address(), 1_000_000))]).unwrap();
        let err = build_transaction(&params, &sel, vec![plain(d.address(), 900_000)], None, &[&d])
            .unwrap_err();
        assert!(matches!(err, TransactionError::Unbalanced { .. }));
        assert!(err.is_protocol_invariant());
    }

    #[test]
    fn dropped_native_tokens_are_rejected() {
        let d = AddressDetails::derive(M1, Network::Smr).unwrap();
        let params = ProtocolParams::for_network(Network::Smr);
        let mut held = BasicOutput::plain(d.address(), 1_000_000);
        held.native_tokens
            .add(TokenId::from_foundry(AliasId::new([5u8; 32]), 1, 0), 10)
            .unwrap();
        let sel = InputSelection::new(vec![(oid(1, 0), Output::Basic(held))]).unwrap();
        assert!(matches!(
            build_transaction(&params, &sel, vec![plain(d.address(), 1_000_000)], None, &[&d]),
            Err(TransactionError::InvalidNativeToken { needed: 0, available: 10, .. })
        ));
    }

    #[test]
    fn output_below_deposit_is_rejected() {
        let d = AddressDetails::derive(M1, Network::Smr).unwrap();
        let params = ProtocolParams::for_network(Network::Smr);
        let sel = InputSelection::new(vec![(oid(1, 0), plain(d.address(), 1_000_000))]).unwrap();
        let outputs = vec![plain(d.address(), 999_000), plain(d.address(), 1_000)];
        assert!(matches!(
            build_transaction(&params, &sel, outputs, None, &[&d]),
            Err(TransactionError::BelowMinimumDeposit { amount: 1_000, .. })
        ));
    }

    #[test]
    fn legacy_transaction_builds() {
        let d = AddressDetails::derive(M1, Network::Atoi).unwrap();
        let params = ProtocolParams::for_network(Network::Atoi);
        let sel = InputSelection::new(vec![(oid(1, 0), plain(d.address(), 2_000_000))]).unwrap();
        let aux = TaggedData::new(b"engine".to_vec(), b"{}".to_vec()).unwrap();
        let tx = build_transaction(
            &params,
            &sel,
            vec![plain(d.address(), 2_000_000)],
            Some(aux),
            &[&d],
        )
        .unwrap();
        assert!(!tx.transaction_id.is_zero());
    }
}
