//! Wire encodings, one per network family.
//!
//! Encoding is the only place the two families differ in how a transaction
//! looks on the wire. Everything above this module works on the shared
//! [`Output`](crate::output::Output) model and picks a codec with
//! [`codec_for`].

mod bytes;
pub mod legacy;
pub mod stardust;

pub use legacy::LegacyCodec;
pub use stardust::StardustCodec;

use tangle_crypto::blake2b_256;
use tangle_types::{Network, NetworkFamily};

use crate::block::{Block, TransactionPayload};
use crate::essence::TransactionEssence;
use crate::error::TransactionError;
use crate::output::Output;

pub trait WireCodec: Send + Sync {
    fn family(&self) -> NetworkFamily;

    fn encode_output(&self, output: &Output) -> Result<Vec<u8>, TransactionError>;
    fn decode_output(&self, bytes: &[u8]) -> Result<Output, TransactionError>;

    fn encode_essence(&self, essence: &TransactionEssence) -> Result<Vec<u8>, TransactionError>;

    fn encode_payload(&self, payload: &TransactionPayload) -> Result<Vec<u8>, TransactionError>;
    fn decode_payload(&self, bytes: &[u8]) -> Result<TransactionPayload, TransactionError>;

    fn encode_block(&self, block: &Block) -> Result<Vec<u8>, TransactionError>;
    fn decode_block(&self, bytes: &[u8]) -> Result<Block, TransactionError>;

    /// Byte length the storage deposit is computed over.
    fn output_len(&self, output: &Output) -> Result<usize, TransactionError> {
        Ok(self.encode_output(output)?.len())
    }

    /// The message every input signature covers.
    fn essence_hash(&self, essence: &TransactionEssence) -> Result<[u8; 32], TransactionError> {
        Ok(blake2b_256(&self.encode_essence(essence)?))
    }
}

static IOTA_CODEC: LegacyCodec = LegacyCodec::new(Network::Iota);
static ATOI_CODEC: LegacyCodec = LegacyCodec::new(Network::Atoi);
static STARDUST_CODEC: StardustCodec = StardustCodec;

pub fn codec_for(network: Network) -> &'static dyn WireCodec {
    match network {
        Network::Iota => &IOTA_CODEC,
        Network::Atoi => &ATOI_CODEC,
        Network::Smr | Network::Rms => &STARDUST_CODEC,
    }
}
