//! Transaction essence and the input snapshot it is built from.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tangle_crypto::{blake2b_256, network_id};
use tangle_types::{NativeTokens, OutputId, ProtocolParams};

use crate::codec::WireCodec;
use crate::error::TransactionError;
use crate::output::Output;

pub const MAX_INPUTS: usize = 128;
pub const MAX_OUTPUTS: usize = 128;
pub const MAX_TAG_LENGTH: usize = 64;

/// Auxiliary payload attached to an essence: a tag plus opaque data.
///
/// Legacy networks carry it as an indexation payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedData {
    pub tag: Vec<u8>,
    pub data: Vec<u8>,
}

impl TaggedData {
    pub fn new(tag: impl Into<Vec<u8>>, data: impl Into<Vec<u8>>) -> Result<Self, TransactionError> {
        let tag = tag.into();
        if tag.len() > MAX_TAG_LENGTH {
            return Err(TransactionError::Malformed(format!(
                "tag of {} bytes exceeds {MAX_TAG_LENGTH}",
                tag.len()
            )));
        }
        Ok(Self {
            tag,
            data: data.into(),
        })
    }

    /// Key/value metadata as a JSON object, e.g. correlation ids.
    pub fn from_metadata(
        tag: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<Self, TransactionError> {
        let data =
            serde_json::to_vec(metadata).map_err(|e| TransactionError::Malformed(e.to_string()))?;
        Self::new(tag.as_bytes().to_vec(), data)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEssence {
    pub network_id: u64,
    pub inputs: Vec<OutputId>,
    pub inputs_commitment: [u8; 32],
    pub outputs: Vec<Output>,
    pub payload: Option<TaggedData>,
}

/// The `(OutputId, Output)` pairs read once from the node for one attempt.
///
/// Essence inputs and the inputs commitment both come from here, so they
/// always describe the same outputs in the same order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InputSelection {
    entries: Vec<(OutputId, Output)>,
}

impl InputSelection {
    pub fn new(entries: Vec<(OutputId, Output)>) -> Result<Self, TransactionError> {
        let mut seen = HashSet::with_capacity(entries.len());
        for (id, _) in &entries {
            if !seen.insert(*id) {
                return Err(TransactionError::Malformed(format!(
                    "output {id} selected twice"
                )));
            }
        }
        Ok(Self { entries })
    }

    /// Append another snapshot, skipping outputs already present.
    pub fn extend(&mut self, other: InputSelection) {
        for (id, output) in other.entries {
            if !self.entries.iter().any(|(existing, _)| *existing == id) {
                self.entries.push((id, output));
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(OutputId, Output)> {
        self.entries.iter()
    }

    pub fn output_ids(&self) -> Vec<OutputId> {
        self.entries.iter().map(|(id, _)| *id).collect()
    }

    pub fn outputs(&self) -> impl Iterator<Item = &Output> {
        self.entries.iter().map(|(_, output)| output)
    }

    pub fn total_amount(&self) -> Result<u64, TransactionError> {
        sum_amounts(self.outputs())
    }

    pub fn native_tokens(&self) -> Result<NativeTokens, TransactionError> {
        let mut total = NativeTokens::new();
        for output in self.outputs() {
            total.add_all(output.native_tokens())?;
        }
        Ok(total)
    }

    /// Blake2b-256 over the concatenated Blake2b-256 hashes of each output's
    /// encoding, in input order.
    pub fn commitment(&self, codec: &dyn WireCodec) -> Result<[u8; 32], TransactionError> {
        let mut hashes = Vec::with_capacity(self.entries.len() * 32);
        for output in self.outputs() {
            hashes.extend_from_slice(&blake2b_256(&codec.encode_output(output)?));
        }
        Ok(blake2b_256(&hashes))
    }
}

pub(crate) fn sum_amounts<'a>(
    mut outputs: impl Iterator<Item = &'a Output>,
) -> Result<u64, TransactionError> {
    outputs.try_fold(0u64, |acc, o| {
        acc.checked_add(o.amount())
            .ok_or_else(|| TransactionError::Malformed("amount overflow".into()))
    })
}

/// Assemble an essence. Pure and deterministic in its arguments.
pub fn pack_essence(
    params: &ProtocolParams,
    inputs: &[OutputId],
    inputs_commitment: [u8; 32],
    outputs: Vec<Output>,
    auxiliary: Option<TaggedData>,
) -> Result<TransactionEssence, TransactionError> {
    if inputs.is_empty() || outputs.is_empty() {
        return Err(TransactionError::Empty);
    }
    if inputs.len() > MAX_INPUTS {
        return Err(TransactionError::Malformed(format!(
            "{} inputs exceed {MAX_INPUTS}",
            inputs.len()
        )));
    }
    if outputs.len() > MAX_OUTPUTS {
        return Err(TransactionError::Malformed(format!(
            "{} outputs exceed {MAX_OUTPUTS}",
            outputs.len()
        )));
    }
    Ok(TransactionEssence {
        network_id: network_id(&params.network_name),
        inputs: inputs.to_vec(),
        inputs_commitment,
        outputs,
        payload: auxiliary,
    })
}

/// [`pack_essence`] with inputs and commitment both taken from `selection`.
pub fn essence_from_selection(
    params: &ProtocolParams,
    codec: &dyn WireCodec,
    selection: &InputSelection,
    outputs: Vec<Output>,
    auxiliary: Option<TaggedData>,
) -> Result<TransactionEssence, TransactionError> {
    let commitment = selection.commitment(codec)?;
    pack_essence(params, &selection.output_ids(), commitment, outputs, auxiliary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::codec_for;
    use crate::output::BasicOutput;
    use tangle_types::{Address, Ed25519Address, Network, TransactionId};

    fn basic(amount: u64) -> Output {
        Output::Basic(BasicOutput::plain(
            Address::Ed25519(Ed25519Address([1u8; 32])),
            amount,
        ))
    }

    fn oid(b: u8, i: u16) -> OutputId {
        OutputId::new(TransactionId::new([b; 32]), i)
    }

    #[test]
    fn duplicate_inputs_rejected() {
        let err = InputSelection::new(vec![(oid(1, 0), basic(5)), (oid(1, 0), basic(5))]);
        assert!(matches!(err, Err(TransactionError::Malformed(_))));
    }

    #[test]
    fn commitment_depends_on_order() {
        let codec = codec_for(Network::Smr);
        let a = InputSelection::new(vec![(oid(1, 0), basic(5)), (oid(2, 0), basic(6))]).unwrap();
        let b = InputSelection::new(vec![(oid(2, 0), basic(6)), (oid(1, 0), basic(5))]).unwrap();
        assert_ne!(a.commitment(codec).unwrap(), b.commitment(codec).unwrap());
    }

    #[test]
    fn essence_is_deterministic() {
        let params = ProtocolParams::for_network(Network::Rms);
        let codec = codec_for(Network::Rms);
        let sel = InputSelection::new(vec![(oid(1, 0), basic(100))]).unwrap();
        let e1 = essence_from_selection(&params, codec, &sel, vec![basic(100)], None).unwrap();
        let e2 = essence_from_selection(&params, codec, &sel, vec![basic(100)], None).unwrap();
        assert_eq!(e1, e2);
        assert_eq!(e1.inputs, sel.output_ids());
        assert_eq!(e1.network_id, network_id("testnet"));
    }

    #[test]
    fn empty_essence_rejected() {
        let params = ProtocolParams::for_network(Network::Smr);
        assert!(matches!(
            pack_essence(&params, &[], [0u8; 32], vec![basic(1)], None),
            Err(TransactionError::Empty)
        ));
    }

    #[test]
    fn extend_skips_duplicates() {
        let mut a = InputSelection::new(vec![(oid(1, 0), basic(5))]).unwrap();
        let b = InputSelection::new(vec![(oid(1, 0), basic(5)), (oid(3, 1), basic(7))]).unwrap();
        a.extend(b);
        assert_eq!(a.len(), 2);
        assert_eq!(a.total_amount().unwrap(), 12);
    }

    #[test]
    fn total_amount_overflow_is_malformed() {
        let selection =
            InputSelection::new(vec![(oid(1, 0), basic(u64::MAX)), (oid(2, 0), basic(1))]).unwrap();
        assert!(matches!(
            selection.total_amount(),
            Err(TransactionError::Malformed(_))
        ));
    }

    #[test]
    fn metadata_payload_is_json() {
        let mut meta = BTreeMap::new();
        meta.insert("transactionId".to_string(), "abc".to_string());
        let tagged = TaggedData::from_metadata("engine", &meta).unwrap();
        assert_eq!(tagged.tag, b"engine");
        assert_eq!(tagged.data, br#"{"transactionId":"abc"}"#);
    }
}
