//! Message encoding of the legacy family.
//!
//! Legacy ledgers only know signature-locked single outputs: an Ed25519
//! address and an amount. Anything richer is rejected with
//! `UnsupportedOnNetwork`. The essence has no network id or inputs
//! commitment on the wire (the network id lives in the message), so
//! decoding yields zero for both.

use tangle_types::{Address, BlockId, Network, NetworkFamily, OutputId, PublicKey, Signature};

use super::bytes::{Packer, Unpacker};
use super::WireCodec;
use crate::block::{Block, TransactionPayload};
use crate::essence::{TaggedData, TransactionEssence};
use crate::error::TransactionError;
use crate::output::{BasicOutput, Output};
use crate::unlock::Unlock;

const TRANSACTION_PAYLOAD_KIND: u32 = 0;
const INDEXATION_PAYLOAD_KIND: u32 = 2;
const TRANSACTION_ESSENCE_KIND: u8 = 0;
const UTXO_INPUT_KIND: u8 = 0;
const SIG_LOCKED_SINGLE_OUTPUT_KIND: u8 = 0;
const ED25519_SIGNATURE_KIND: u8 = 0;

/// Protocol version reported for decoded legacy messages, which carry none.
pub const LEGACY_PROTOCOL_VERSION: u8 = 1;

/// Both legacy networks share the encoding; the network is only kept for
/// error reporting.
#[derive(Clone, Copy, Debug)]
pub struct LegacyCodec {
    network: Network,
}

impl LegacyCodec {
    pub const fn new(network: Network) -> Self {
        Self { network }
    }
}

fn unsupported(network: Network, what: impl Into<String>) -> TransactionError {
    TransactionError::UnsupportedOnNetwork {
        network,
        what: what.into(),
    }
}

fn pack_output(p: &mut Packer, network: Network, output: &Output) -> Result<(), TransactionError> {
    if !output.is_plain_value() {
        return Err(unsupported(network, format!(
            "{} with native tokens, features or extra unlock conditions",
            output.kind_name()
        )));
    }
    let owner = output
        .owner()
        .ok_or_else(|| TransactionError::Malformed("output without owner".into()))?;
    p.u8(SIG_LOCKED_SINGLE_OUTPUT_KIND);
    p.raw(&owner.to_packed());
    p.u64(output.amount());
    Ok(())
}

fn unpack_output(u: &mut Unpacker<'_>) -> Result<Output, TransactionError> {
    let kind = u.u8()?;
    if kind != SIG_LOCKED_SINGLE_OUTPUT_KIND {
        return Err(TransactionError::Decode(format!(
            "unsupported legacy output kind {kind}"
        )));
    }
    let address = Address::from_packed(u.take(Address::PACKED_LENGTH)?)?;
    if !address.is_ed25519() {
        return Err(TransactionError::Decode("legacy output owned by a chain address".into()));
    }
    let amount = u.u64()?;
    Ok(Output::Basic(BasicOutput::plain(address, amount)))
}

fn pack_essence(
    p: &mut Packer,
    network: Network,
    essence: &TransactionEssence,
) -> Result<(), TransactionError> {
    p.u8(TRANSACTION_ESSENCE_KIND);
    p.count_u16(essence.inputs.len(), "inputs")?;
    for input in &essence.inputs {
        p.u8(UTXO_INPUT_KIND);
        p.raw(&input.to_bytes());
    }
    p.count_u16(essence.outputs.len(), "outputs")?;
    for output in &essence.outputs {
        pack_output(p, network, output)?;
    }
    match &essence.payload {
        Some(tagged) => {
            let mut inner = Packer::new();
            inner.u32(INDEXATION_PAYLOAD_KIND);
            inner.bytes_u16(&tagged.tag, "index")?;
            inner.bytes_u32(&tagged.data, "indexation data")?;
            p.bytes_u32(&inner.into_inner(), "essence payload")?;
        }
        None => p.u32(0),
    }
    Ok(())
}

fn unpack_essence(u: &mut Unpacker<'_>) -> Result<TransactionEssence, TransactionError> {
    let kind = u.u8()?;
    if kind != TRANSACTION_ESSENCE_KIND {
        return Err(TransactionError::Decode(format!(
            "unknown essence kind {kind}"
        )));
    }
    let input_count = u.u16()?;
    let mut inputs = Vec::with_capacity(input_count as usize);
    for _ in 0..input_count {
        if u.u8()? != UTXO_INPUT_KIND {
            return Err(TransactionError::Decode("unknown input kind".into()));
        }
        inputs.push(OutputId::from_bytes(&u.array()?));
    }
    let output_count = u.u16()?;
    let mut outputs = Vec::with_capacity(output_count as usize);
    for _ in 0..output_count {
        outputs.push(unpack_output(u)?);
    }
    let payload_len = u.u32()? as usize;
    let payload = if payload_len == 0 {
        None
    } else {
        let mut inner = Unpacker::new(u.take(payload_len)?);
        if inner.u32()? != INDEXATION_PAYLOAD_KIND {
            return Err(TransactionError::Decode("unknown essence payload".into()));
        }
        let tagged = TaggedData {
            tag: inner.bytes_u16()?,
            data: inner.bytes_u32()?,
        };
        inner.finish()?;
        Some(tagged)
    };
    Ok(TransactionEssence {
        network_id: 0,
        inputs,
        inputs_commitment: [0u8; 32],
        outputs,
        payload,
    })
}

fn pack_unlocks(p: &mut Packer, network: Network, unlocks: &[Unlock]) -> Result<(), TransactionError> {
    p.count_u16(unlocks.len(), "unlock blocks")?;
    for unlock in unlocks {
        match unlock {
            Unlock::Signature {
                public_key,
                signature,
            } => {
                p.u8(0);
                p.u8(ED25519_SIGNATURE_KIND);
                p.raw(public_key.as_bytes());
                p.raw(signature.as_bytes());
            }
            Unlock::Reference(i) => {
                p.u8(1);
                p.u16(*i);
            }
            Unlock::Alias(_) | Unlock::Nft(_) => {
                return Err(unsupported(network, "alias and nft unlocks"));
            }
        }
    }
    Ok(())
}

fn unpack_unlocks(u: &mut Unpacker<'_>) -> Result<Vec<Unlock>, TransactionError> {
    let count = u.u16()?;
    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let unlock = match u.u8()? {
            0 => {
                if u.u8()? != ED25519_SIGNATURE_KIND {
                    return Err(TransactionError::Decode("unknown signature kind".into()));
                }
                Unlock::Signature {
                    public_key: PublicKey(u.array()?),
                    signature: Signature(u.array()?),
                }
            }
            1 => Unlock::Reference(u.u16()?),
            other => {
                return Err(TransactionError::Decode(format!(
                    "unknown unlock block kind {other}"
                )))
            }
        };
        out.push(unlock);
    }
    Ok(out)
}

impl WireCodec for LegacyCodec {
    fn family(&self) -> NetworkFamily {
        NetworkFamily::Legacy
    }

    fn encode_output(&self, output: &Output) -> Result<Vec<u8>, TransactionError> {
        let mut p = Packer::new();
        pack_output(&mut p, self.network, output)?;
        Ok(p.into_inner())
    }

    fn decode_output(&self, bytes: &[u8]) -> Result<Output, TransactionError> {
        let mut u = Unpacker::new(bytes);
        let output = unpack_output(&mut u)?;
        u.finish()?;
        Ok(output)
    }

    fn encode_essence(&self, essence: &TransactionEssence) -> Result<Vec<u8>, TransactionError> {
        let mut p = Packer::new();
        pack_essence(&mut p, self.network, essence)?;
        Ok(p.into_inner())
    }

    fn encode_payload(&self, payload: &TransactionPayload) -> Result<Vec<u8>, TransactionError> {
        let mut p = Packer::new();
        p.u32(TRANSACTION_PAYLOAD_KIND);
        pack_essence(&mut p, self.network, &payload.essence)?;
        pack_unlocks(&mut p, self.network, &payload.unlocks)?;
        Ok(p.into_inner())
    }

    fn decode_payload(&self, bytes: &[u8]) -> Result<TransactionPayload, TransactionError> {
        let mut u = Unpacker::new(bytes);
        if u.u32()? != TRANSACTION_PAYLOAD_KIND {
            return Err(TransactionError::Decode("unknown payload kind".into()));
        }
        let payload = TransactionPayload {
            essence: unpack_essence(&mut u)?,
            unlocks: unpack_unlocks(&mut u)?,
        };
        u.finish()?;
        Ok(payload)
    }

    fn encode_block(&self, block: &Block) -> Result<Vec<u8>, TransactionError> {
        let mut p = Packer::new();
        p.u64(block.payload.essence.network_id);
        p.count_u8(block.parents.len(), "parents")?;
        for parent in &block.parents {
            p.raw(parent.as_bytes());
        }
        let payload = self.encode_payload(&block.payload)?;
        p.bytes_u32(&payload, "message payload")?;
        p.u64(block.nonce);
        Ok(p.into_inner())
    }

    fn decode_block(&self, bytes: &[u8]) -> Result<Block, TransactionError> {
        let mut u = Unpacker::new(bytes);
        let network_id = u.u64()?;
        let parent_count = u.u8()?;
        let mut parents = Vec::with_capacity(parent_count as usize);
        for _ in 0..parent_count {
            parents.push(BlockId::new(u.array()?));
        }
        let payload_len = u.u32()? as usize;
        let mut payload = self.decode_payload(u.take(payload_len)?)?;
        payload.essence.network_id = network_id;
        let nonce = u.u64()?;
        u.finish()?;
        Ok(Block {
            protocol_version: LEGACY_PROTOCOL_VERSION,
            parents,
            payload,
            nonce,
        })
    }
}
