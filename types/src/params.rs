//! Static protocol parameters per network.

use serde::{Deserialize, Serialize};

use crate::network::Network;

/// Byte length of an output id, weighted as "key" data in the rent formula.
pub const OUTPUT_ID_LENGTH: u64 = 34;
/// Block id + milestone index + milestone timestamp kept by nodes per output.
pub const OUTPUT_METADATA_LENGTH: u64 = 32 + 4 + 4;

/// Storage rent parameters.
///
/// The minimum amount an output must hold is
/// `v_byte_cost * (factor_key * 34 + factor_data * 40 + factor_data * len)`
/// where `len` is the encoded byte length of the output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentStructure {
    pub v_byte_cost: u32,
    pub v_byte_factor_key: u8,
    pub v_byte_factor_data: u8,
}

impl RentStructure {
    /// Rent offset every output pays for its id and metadata.
    pub fn offset_vbytes(&self) -> u64 {
        self.v_byte_factor_key as u64 * OUTPUT_ID_LENGTH
            + self.v_byte_factor_data as u64 * OUTPUT_METADATA_LENGTH
    }

    /// Minimum storage deposit for an output whose encoding is `encoded_len` bytes.
    pub fn min_deposit(&self, encoded_len: usize) -> u64 {
        let vbytes = self.offset_vbytes() + self.v_byte_factor_data as u64 * encoded_len as u64;
        self.v_byte_cost as u64 * vbytes
    }
}

/// Protocol parameters the engine needs to build and sign transactions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolParams {
    pub network: Network,
    /// Network name hashed into the essence network id.
    pub network_name: String,
    pub protocol_version: u8,
    pub rent: RentStructure,
    /// Total base token supply; no single amount may exceed it.
    pub token_supply: u64,
}

impl ProtocolParams {
    pub fn for_network(network: Network) -> Self {
        match network {
            Network::Iota => Self {
                network,
                network_name: "chrysalis-mainnet".to_string(),
                protocol_version: 1,
                rent: RentStructure {
                    v_byte_cost: 250,
                    v_byte_factor_key: 10,
                    v_byte_factor_data: 1,
                },
                token_supply: 4_779_530_283_277_761,
            },
            Network::Atoi => Self {
                network,
                network_name: "chrysalis-devnet".to_string(),
                protocol_version: 1,
                rent: RentStructure {
                    v_byte_cost: 250,
                    v_byte_factor_key: 10,
                    v_byte_factor_data: 1,
                },
                token_supply: 4_779_530_283_277_761,
            },
            Network::Smr => Self {
                network,
                network_name: "shimmer".to_string(),
                protocol_version: 2,
                rent: RentStructure {
                    v_byte_cost: 100,
                    v_byte_factor_key: 10,
                    v_byte_factor_data: 1,
                },
                token_supply: 1_813_620_509_061_365,
            },
            Network::Rms => Self {
                network,
                network_name: "testnet".to_string(),
                protocol_version: 2,
                rent: RentStructure {
                    v_byte_cost: 100,
                    v_byte_factor_key: 10,
                    v_byte_factor_data: 1,
                },
                token_supply: 1_450_896_407_249_092,
            },
        }
    }
}
