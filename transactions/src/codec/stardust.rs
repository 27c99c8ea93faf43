//! Binary encoding of the Shimmer family.

use tangle_types::{
    Address, AliasId, BlockId, NativeTokens, NetworkFamily, NftId, OutputId, PublicKey, Signature,
    TokenId, TransactionId, MAX_NATIVE_TOKENS,
};

use super::bytes::{Packer, Unpacker};
use super::WireCodec;
use crate::block::{Block, TransactionPayload};
use crate::essence::{TaggedData, TransactionEssence};
use crate::error::TransactionError;
use crate::output::{
    AliasOutput, BasicOutput, Feature, FoundryOutput, NftOutput, Output, SimpleTokenScheme,
    UnlockCondition, ALIAS_OUTPUT_KIND, BASIC_OUTPUT_KIND, FOUNDRY_OUTPUT_KIND, NFT_OUTPUT_KIND,
};
use crate::unlock::Unlock;

const TRANSACTION_ESSENCE_KIND: u8 = 1;
const TRANSACTION_PAYLOAD_KIND: u32 = 6;
const TAGGED_DATA_PAYLOAD_KIND: u32 = 5;
const UTXO_INPUT_KIND: u8 = 0;
const ED25519_SIGNATURE_KIND: u8 = 0;
const SIMPLE_TOKEN_SCHEME_KIND: u8 = 0;

pub const MAX_METADATA_LENGTH: usize = 8192;
pub const MAX_TAG_LENGTH: usize = 64;

#[derive(Clone, Copy, Debug, Default)]
pub struct StardustCodec;

fn pack_address(p: &mut Packer, address: &Address) {
    p.raw(&address.to_packed());
}

fn unpack_address(u: &mut Unpacker<'_>) -> Result<Address, TransactionError> {
    Ok(Address::from_packed(u.take(Address::PACKED_LENGTH)?)?)
}

fn pack_native_tokens(p: &mut Packer, tokens: &NativeTokens) -> Result<(), TransactionError> {
    if tokens.len() > MAX_NATIVE_TOKENS {
        return Err(TransactionError::TooManyNativeTokens(tokens.len()));
    }
    p.count_u8(tokens.len(), "native tokens")?;
    for (id, amount) in tokens.iter() {
        p.raw(id.as_bytes());
        p.u256(*amount);
    }
    Ok(())
}

fn unpack_native_tokens(u: &mut Unpacker<'_>) -> Result<NativeTokens, TransactionError> {
    let count = u.u8()? as usize;
    if count > MAX_NATIVE_TOKENS {
        return Err(TransactionError::TooManyNativeTokens(count));
    }
    let mut tokens = NativeTokens::new();
    let mut previous: Option<TokenId> = None;
    for _ in 0..count {
        let id = TokenId(u.array()?);
        let amount = u.u256()?;
        if previous.is_some_and(|p| p >= id) {
            return Err(TransactionError::Decode("native tokens not sorted".into()));
        }
        if amount == 0 {
            return Err(TransactionError::Decode("zero native token amount".into()));
        }
        previous = Some(id);
        tokens.add(id, amount)?;
    }
    Ok(tokens)
}

fn pack_unlock_conditions(
    p: &mut Packer,
    conditions: &[UnlockCondition],
) -> Result<(), TransactionError> {
    p.count_u8(conditions.len(), "unlock conditions")?;
    let mut last: Option<u8> = None;
    for uc in conditions {
        if last.is_some_and(|k| k >= uc.kind()) {
            return Err(TransactionError::Malformed(
                "unlock conditions must be unique and sorted by kind".into(),
            ));
        }
        last = Some(uc.kind());
        p.u8(uc.kind());
        match uc {
            UnlockCondition::Address(a)
            | UnlockCondition::StateControllerAddress(a)
            | UnlockCondition::GovernorAddress(a) => pack_address(p, a),
            UnlockCondition::StorageDepositReturn {
                return_address,
                amount,
            } => {
                pack_address(p, return_address);
                p.u64(*amount);
            }
            UnlockCondition::Timelock { unix_time } => p.u32(*unix_time),
            UnlockCondition::Expiration {
                return_address,
                unix_time,
            } => {
                pack_address(p, return_address);
                p.u32(*unix_time);
            }
            UnlockCondition::ImmutableAliasAddress(id) => pack_address(p, &Address::Alias(*id)),
        }
    }
    Ok(())
}

fn unpack_unlock_conditions(
    u: &mut Unpacker<'_>,
) -> Result<Vec<UnlockCondition>, TransactionError> {
    let count = u.u8()?;
    let mut out = Vec::with_capacity(count as usize);
    let mut last: Option<u8> = None;
    for _ in 0..count {
        let kind = u.u8()?;
        if last.is_some_and(|k| k >= kind) {
            return Err(TransactionError::Decode("unlock conditions not sorted".into()));
        }
        last = Some(kind);
        let uc = match kind {
            0 => UnlockCondition::Address(unpack_address(u)?),
            1 => UnlockCondition::StorageDepositReturn {
                return_address: unpack_address(u)?,
                amount: u.u64()?,
            },
            2 => UnlockCondition::Timelock {
                unix_time: u.u32()?,
            },
            3 => UnlockCondition::Expiration {
                return_address: unpack_address(u)?,
                unix_time: u.u32()?,
            },
            4 => UnlockCondition::StateControllerAddress(unpack_address(u)?),
            5 => UnlockCondition::GovernorAddress(unpack_address(u)?),
            6 => match unpack_address(u)? {
                Address::Alias(id) => UnlockCondition::ImmutableAliasAddress(id),
                other => {
                    return Err(TransactionError::Decode(format!(
                        "immutable alias condition holds {other:?}"
                    )))
                }
            },
            other => {
                return Err(TransactionError::Decode(format!(
                    "unknown unlock condition kind {other}"
                )))
            }
        };
        out.push(uc);
    }
    Ok(out)
}

fn pack_features(p: &mut Packer, features: &[Feature]) -> Result<(), TransactionError> {
    p.count_u8(features.len(), "features")?;
    let mut last: Option<u8> = None;
    for f in features {
        if last.is_some_and(|k| k >= f.kind()) {
            return Err(TransactionError::Malformed(
                "features must be unique and sorted by kind".into(),
            ));
        }
        last = Some(f.kind());
        p.u8(f.kind());
        match f {
            Feature::Sender(a) | Feature::Issuer(a) => pack_address(p, a),
            Feature::Metadata(data) => {
                if data.is_empty() || data.len() > MAX_METADATA_LENGTH {
                    return Err(TransactionError::Malformed(format!(
                        "metadata must be 1..={MAX_METADATA_LENGTH} bytes, got {}",
                        data.len()
                    )));
                }
                p.bytes_u16(data, "metadata")?;
            }
            Feature::Tag(tag) => {
                if tag.is_empty() || tag.len() > MAX_TAG_LENGTH {
                    return Err(TransactionError::Malformed(format!(
                        "tag must be 1..={MAX_TAG_LENGTH} bytes, got {}",
                        tag.len()
                    )));
                }
                p.bytes_u8(tag, "tag")?;
            }
        }
    }
    Ok(())
}

fn unpack_features(u: &mut Unpacker<'_>) -> Result<Vec<Feature>, TransactionError> {
    let count = u.u8()?;
    let mut out = Vec::with_capacity(count as usize);
    let mut last: Option<u8> = None;
    for _ in 0..count {
        let kind = u.u8()?;
        if last.is_some_and(|k| k >= kind) {
            return Err(TransactionError::Decode("features not sorted".into()));
        }
        last = Some(kind);
        let feature = match kind {
            0 => Feature::Sender(unpack_address(u)?),
            1 => Feature::Issuer(unpack_address(u)?),
            2 => Feature::Metadata(u.bytes_u16()?),
            3 => Feature::Tag(u.bytes_u8()?),
            other => {
                return Err(TransactionError::Decode(format!(
                    "unknown feature kind {other}"
                )))
            }
        };
        out.push(feature);
    }
    Ok(out)
}

pub(crate) fn pack_output(p: &mut Packer, output: &Output) -> Result<(), TransactionError> {
    p.u8(output.kind());
    match output {
        Output::Basic(o) => {
            p.u64(o.amount);
            pack_native_tokens(p, &o.native_tokens)?;
            pack_unlock_conditions(p, &o.unlock_conditions)?;
            pack_features(p, &o.features)?;
        }
        Output::Alias(o) => {
            p.u64(o.amount);
            pack_native_tokens(p, &o.native_tokens)?;
            p.raw(o.alias_id.as_bytes());
            p.u32(o.state_index);
            if o.state_metadata.len() > MAX_METADATA_LENGTH {
                return Err(TransactionError::Malformed("state metadata too long".into()));
            }
            p.bytes_u16(&o.state_metadata, "state metadata")?;
            p.u32(o.foundry_counter);
            pack_unlock_conditions(p, &o.unlock_conditions)?;
            pack_features(p, &o.features)?;
            pack_features(p, &o.immutable_features)?;
        }
        Output::Foundry(o) => {
            p.u64(o.amount);
            pack_native_tokens(p, &o.native_tokens)?;
            p.u32(o.serial_number);
            p.u8(SIMPLE_TOKEN_SCHEME_KIND);
            p.u256(o.token_scheme.minted_tokens);
            p.u256(o.token_scheme.melted_tokens);
            p.u256(o.token_scheme.maximum_supply);
            pack_unlock_conditions(p, &o.unlock_conditions)?;
            pack_features(p, &o.features)?;
            pack_features(p, &o.immutable_features)?;
        }
        Output::Nft(o) => {
            p.u64(o.amount);
            pack_native_tokens(p, &o.native_tokens)?;
            p.raw(o.nft_id.as_bytes());
            pack_unlock_conditions(p, &o.unlock_conditions)?;
            pack_features(p, &o.features)?;
            pack_features(p, &o.immutable_features)?;
        }
    }
    Ok(())
}

pub(crate) fn unpack_output(u: &mut Unpacker<'_>) -> Result<Output, TransactionError> {
    let kind = u.u8()?;
    let output = match kind {
        BASIC_OUTPUT_KIND => Output::Basic(BasicOutput {
            amount: u.u64()?,
            native_tokens: unpack_native_tokens(u)?,
            unlock_conditions: unpack_unlock_conditions(u)?,
            features: unpack_features(u)?,
        }),
        ALIAS_OUTPUT_KIND => Output::Alias(AliasOutput {
            amount: u.u64()?,
            native_tokens: unpack_native_tokens(u)?,
            alias_id: AliasId::new(u.array()?),
            state_index: u.u32()?,
            state_metadata: u.bytes_u16()?,
            foundry_counter: u.u32()?,
            unlock_conditions: unpack_unlock_conditions(u)?,
            features: unpack_features(u)?,
            immutable_features: unpack_features(u)?,
        }),
        FOUNDRY_OUTPUT_KIND => {
            let amount = u.u64()?;
            let native_tokens = unpack_native_tokens(u)?;
            let serial_number = u.u32()?;
            let scheme = u.u8()?;
            if scheme != SIMPLE_TOKEN_SCHEME_KIND {
                return Err(TransactionError::Decode(format!(
                    "unknown token scheme {scheme}"
                )));
            }
            Output::Foundry(FoundryOutput {
                amount,
                native_tokens,
                serial_number,
                token_scheme: SimpleTokenScheme {
                    minted_tokens: u.u256()?,
                    melted_tokens: u.u256()?,
                    maximum_supply: u.u256()?,
                },
                unlock_conditions: unpack_unlock_conditions(u)?,
                features: unpack_features(u)?,
                immutable_features: unpack_features(u)?,
            })
        }
        NFT_OUTPUT_KIND => Output::Nft(NftOutput {
            amount: u.u64()?,
            native_tokens: unpack_native_tokens(u)?,
            nft_id: NftId::new(u.array()?),
            unlock_conditions: unpack_unlock_conditions(u)?,
            features: unpack_features(u)?,
            immutable_features: unpack_features(u)?,
        }),
        other => {
            return Err(TransactionError::Decode(format!(
                "unknown output kind {other}"
            )))
        }
    };
    Ok(output)
}

fn pack_essence(p: &mut Packer, essence: &TransactionEssence) -> Result<(), TransactionError> {
    p.u8(TRANSACTION_ESSENCE_KIND);
    p.u64(essence.network_id);
    p.count_u16(essence.inputs.len(), "inputs")?;
    for input in &essence.inputs {
        p.u8(UTXO_INPUT_KIND);
        p.raw(&input.to_bytes());
    }
    p.raw(&essence.inputs_commitment);
    p.count_u16(essence.outputs.len(), "outputs")?;
    for output in &essence.outputs {
        pack_output(p, output)?;
    }
    match &essence.payload {
        Some(tagged) => {
            let mut inner = Packer::new();
            inner.u32(TAGGED_DATA_PAYLOAD_KIND);
            inner.bytes_u8(&tagged.tag, "tag")?;
            inner.bytes_u32(&tagged.data, "tagged data")?;
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
    let network_id = u.u64()?;
    let input_count = u.u16()?;
    let mut inputs = Vec::with_capacity(input_count as usize);
    for _ in 0..input_count {
        let kind = u.u8()?;
        if kind != UTXO_INPUT_KIND {
            return Err(TransactionError::Decode(format!("unknown input kind {kind}")));
        }
        inputs.push(OutputId::from_bytes(&u.array()?));
    }
    let inputs_commitment = u.array()?;
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
        let kind = inner.u32()?;
        if kind != TAGGED_DATA_PAYLOAD_KIND {
            return Err(TransactionError::Decode(format!(
                "unknown essence payload kind {kind}"
            )));
        }
        let tagged = TaggedData {
            tag: inner.bytes_u8()?,
            data: inner.bytes_u32()?,
        };
        inner.finish()?;
        Some(tagged)
    };
    Ok(TransactionEssence {
        network_id,
        inputs,
        inputs_commitment,
        outputs,
        payload,
    })
}

fn pack_unlocks(p: &mut Packer, unlocks: &[Unlock]) -> Result<(), TransactionError> {
    p.count_u16(unlocks.len(), "unlocks")?;
    for unlock in unlocks {
        p.u8(unlock.kind());
        match unlock {
            Unlock::Signature {
                public_key,
                signature,
            } => {
                p.u8(ED25519_SIGNATURE_KIND);
                p.raw(public_key.as_bytes());
                p.raw(signature.as_bytes());
            }
            Unlock::Reference(i) | Unlock::Alias(i) | Unlock::Nft(i) => p.u16(*i),
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
                let sig_kind = u.u8()?;
                if sig_kind != ED25519_SIGNATURE_KIND {
                    return Err(TransactionError::Decode(format!(
                        "unknown signature kind {sig_kind}"
                    )));
                }
                Unlock::Signature {
                    public_key: PublicKey(u.array()?),
                    signature: Signature(u.array()?),
                }
            }
            1 => Unlock::Reference(u.u16()?),
            2 => Unlock::Alias(u.u16()?),
            3 => Unlock::Nft(u.u16()?),
            other => {
                return Err(TransactionError::Decode(format!(
                    "unknown unlock kind {other}"
                )))
            }
        };
        out.push(unlock);
    }
    Ok(out)
}

fn pack_payload(p: &mut Packer, payload: &TransactionPayload) -> Result<(), TransactionError> {
    p.u32(TRANSACTION_PAYLOAD_KIND);
    pack_essence(p, &payload.essence)?;
    pack_unlocks(p, &payload.unlocks)
}

fn unpack_payload(u: &mut Unpacker<'_>) -> Result<TransactionPayload, TransactionError> {
    let kind = u.u32()?;
    if kind != TRANSACTION_PAYLOAD_KIND {
        return Err(TransactionError::Decode(format!(
            "unknown payload kind {kind}"
        )));
    }
    Ok(TransactionPayload {
        essence: unpack_essence(u)?,
        unlocks: unpack_unlocks(u)?,
    })
}

impl WireCodec for StardustCodec {
    fn family(&self) -> NetworkFamily {
        NetworkFamily::Shimmer
    }

    fn encode_output(&self, output: &Output) -> Result<Vec<u8>, TransactionError> {
        let mut p = Packer::new();
        pack_output(&mut p, output)?;
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
        pack_essence(&mut p, essence)?;
        Ok(p.into_inner())
    }

    fn encode_payload(&self, payload: &TransactionPayload) -> Result<Vec<u8>, TransactionError> {
        let mut p = Packer::new();
        pack_payload(&mut p, payload)?;
        Ok(p.into_inner())
    }

    fn decode_payload(&self, bytes: &[u8]) -> Result<TransactionPayload, TransactionError> {
        let mut u = Unpacker::new(bytes);
        let payload = unpack_payload(&mut u)?;
        u.finish()?;
        Ok(payload)
    }

    fn encode_block(&self, block: &Block) -> Result<Vec<u8>, TransactionError> {
        let mut p = Packer::new();
        p.u8(block.protocol_version);
        p.count_u8(block.parents.len(), "parents")?;
        for parent in &block.parents {
            p.raw(parent.as_bytes());
        }
        let payload = self.encode_payload(&block.payload)?;
        p.bytes_u32(&payload, "block payload")?;
        p.u64(block.nonce);
        Ok(p.into_inner())
    }

    fn decode_block(&self, bytes: &[u8]) -> Result<Block, TransactionError> {
        let mut u = Unpacker::new(bytes);
        let protocol_version = u.u8()?;
        let parent_count = u.u8()?;
        let mut parents = Vec::with_capacity(parent_count as usize);
        for _ in 0..parent_count {
            parents.push(BlockId::new(u.array()?));
        }
        let payload_len = u.u32()? as usize;
        let payload = self.decode_payload(u.take(payload_len)?)?;
        let nonce = u.u64()?;
        u.finish()?;
        Ok(Block {
            protocol_version,
            parents,
            payload,
            nonce,
        })
    }
}
