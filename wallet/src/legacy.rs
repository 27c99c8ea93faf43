//! Node client for legacy networks (REST API v1).
//!
//! Legacy nodes answer in JSON wrapped in a `data` envelope, render ids as
//! bare hex, and report outputs as JSON rather than bytes.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tangle_transactions::{codec_for, BasicOutput, Block, Output, WireCodec};
use tangle_types::{
    decode_hex_fixed, Address, BlockId, Ed25519Address, InclusionState, Network, OutputId,
};

use crate::error::WalletError;
use crate::http::HttpClient;
use crate::node::{NodeApi, NodeOutput};
use crate::shimmer::{inclusion_from, parse_ids};

const API: &str = "/api/v1";
const SIG_LOCKED_SINGLE_OUTPUT: u8 = 0;
const ED25519_ADDRESS: u8 = 0;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Tips {
    tip_message_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddressOutputs {
    output_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct JsonAddress {
    #[serde(rename = "type")]
    kind: u8,
    address: String,
}

#[derive(Debug, Deserialize)]
struct JsonOutput {
    #[serde(rename = "type")]
    kind: u8,
    address: JsonAddress,
    amount: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OutputResponse {
    is_spent: bool,
    output: JsonOutput,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitResponse {
    message_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageMetadata {
    #[serde(default)]
    ledger_inclusion_state: Option<String>,
}

fn output_from_json(json: JsonOutput) -> Result<Output, WalletError> {
    if json.kind != SIG_LOCKED_SINGLE_OUTPUT || json.address.kind != ED25519_ADDRESS {
        return Err(WalletError::Node(format!(
            "unsupported legacy output kind {} / address kind {}",
            json.kind, json.address.kind
        )));
    }
    let body = decode_hex_fixed::<32>(&json.address.address)
        .map_err(|e| WalletError::Node(format!("bad address: {e}")))?;
    Ok(Output::Basic(BasicOutput::plain(
        Address::Ed25519(Ed25519Address(body)),
        json.amount,
    )))
}

pub struct LegacyClient {
    network: Network,
    http: HttpClient,
    codec: &'static dyn WireCodec,
}

impl LegacyClient {
    pub fn new(network: Network, url: impl Into<String>) -> Result<Self, WalletError> {
        Ok(Self {
            network,
            http: HttpClient::new(url)?,
            codec: codec_for(network),
        })
    }
}

#[async_trait]
impl NodeApi for LegacyClient {
    fn network(&self) -> Network {
        self.network
    }

    fn url(&self) -> &str {
        self.http.base_url()
    }

    async fn health(&self) -> Result<bool, WalletError> {
        Ok(self.http.get_status("/health").await? == StatusCode::OK)
    }

    async fn tips(&self) -> Result<Vec<BlockId>, WalletError> {
        let resp: Envelope<Tips> = self.http.get_json(&format!("{API}/tips")).await?;
        parse_ids(&resp.data.tip_message_ids)
    }

    async fn output_ids(&self, address: &Address) -> Result<Vec<OutputId>, WalletError> {
        let Address::Ed25519(ed) = address else {
            return Err(WalletError::Unsupported {
                network: self.network,
                what: "alias and nft addresses".into(),
            });
        };
        let path = format!("{API}/addresses/ed25519/{}/outputs", hex::encode(ed.as_bytes()));
        let resp: Envelope<AddressOutputs> = self.http.get_json(&path).await?;
        parse_ids(&resp.data.output_ids)
    }

    async fn get_output(&self, output_id: &OutputId) -> Result<NodeOutput, WalletError> {
        let resp: Envelope<OutputResponse> = self
            .http
            .get_json(&format!("{API}/outputs/{}", output_id.to_bare_hex()))
            .await?;
        Ok(NodeOutput {
            is_spent: resp.data.is_spent,
            output: output_from_json(resp.data.output)?,
        })
    }

    async fn submit_block(&self, block: &Block) -> Result<BlockId, WalletError> {
        let bytes = self.codec.encode_block(block)?;
        let resp: Envelope<SubmitResponse> = self
            .http
            .post_bytes(&format!("{API}/messages"), "application/octet-stream", bytes)
            .await?;
        resp.data
            .message_id
            .parse()
            .map_err(|e| WalletError::Node(format!("bad message id {}: {e}", resp.data.message_id)))
    }

    async fn block_metadata(&self, block_id: &BlockId) -> Result<InclusionState, WalletError> {
        let path = format!("{API}/messages/{}/metadata", hex::encode(block_id.as_bytes()));
        let resp: Envelope<MessageMetadata> = self.http.get_json(&path).await?;
        Ok(inclusion_from(resp.data.ledger_inclusion_state.as_deref()))
    }
}
