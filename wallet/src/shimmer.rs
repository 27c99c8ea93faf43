//! Node client for Shimmer-family networks (core API v2 + indexer).

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tangle_crypto::to_bech32;
use tangle_transactions::{codec_for, Block, WireCodec};
use tangle_types::{Address, BlockId, InclusionState, Network, OutputId};

use crate::error::WalletError;
use crate::http::{HttpClient, SERIALIZER_MEDIA_TYPE};
use crate::node::{NodeApi, NodeOutput};

const CORE: &str = "/api/core/v2";
const INDEXER: &str = "/api/indexer/v1";

#[derive(Debug, Deserialize)]
struct TipsResponse {
    tips: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct IndexerPage {
    items: Vec<String>,
    #[serde(default)]
    cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OutputMetadata {
    is_spent: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitResponse {
    block_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockMetadata {
    #[serde(default)]
    ledger_inclusion_state: Option<String>,
}

pub(crate) fn parse_ids<T>(items: &[String]) -> Result<Vec<T>, WalletError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    items
        .iter()
        .map(|s| {
            s.parse::<T>()
                .map_err(|e| WalletError::Node(format!("bad id {s}: {e}")))
        })
        .collect()
}

pub(crate) fn inclusion_from(state: Option<&str>) -> InclusionState {
    state
        .and_then(InclusionState::from_node_str)
        .unwrap_or(InclusionState::Pending)
}

pub struct ShimmerClient {
    network: Network,
    http: HttpClient,
    codec: &'static dyn WireCodec,
}

impl ShimmerClient {
    pub fn new(network: Network, url: impl Into<String>) -> Result<Self, WalletError> {
        Ok(Self {
            network,
            http: HttpClient::new(url)?,
            codec: codec_for(network),
        })
    }

    /// Drain every page of one indexer query.
    async fn indexer_query(&self, route: &str, query: &str) -> Result<Vec<OutputId>, WalletError> {
        let mut ids = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let path = match &cursor {
                Some(c) => format!("{INDEXER}/outputs/{route}?{query}&cursor={c}"),
                None => format!("{INDEXER}/outputs/{route}?{query}"),
            };
            let page: IndexerPage = self.http.get_json(&path).await?;
            ids.extend(parse_ids::<OutputId>(&page.items)?);
            match page.cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }
        Ok(ids)
    }
}

#[async_trait]
impl NodeApi for ShimmerClient {
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
        let resp: TipsResponse = self.http.get_json(&format!("{CORE}/tips")).await?;
        parse_ids(&resp.tips)
    }

    async fn output_ids(&self, address: &Address) -> Result<Vec<OutputId>, WalletError> {
        let bech32 = to_bech32(address, self.network)?;
        let mut ids = self
            .indexer_query("basic", &format!("address={bech32}&hasNativeTokens=false"))
            .await?;
        ids.extend(
            self.indexer_query("basic", &format!("address={bech32}&hasNativeTokens=true"))
                .await?,
        );
        ids.extend(self.indexer_query("nft", &format!("address={bech32}")).await?);
        ids.extend(
            self.indexer_query("alias", &format!("stateController={bech32}"))
                .await?,
        );
        ids.extend(
            self.indexer_query("foundry", &format!("aliasAddress={bech32}"))
                .await?,
        );
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    async fn get_output(&self, output_id: &OutputId) -> Result<NodeOutput, WalletError> {
        let bytes = self
            .http
            .get_bytes(&format!("{CORE}/outputs/{output_id}"))
            .await?;
        let output = self.codec.decode_output(&bytes)?;
        let meta: OutputMetadata = self
            .http
            .get_json(&format!("{CORE}/outputs/{output_id}/metadata"))
            .await?;
        Ok(NodeOutput {
            output,
            is_spent: meta.is_spent,
        })
    }

    async fn submit_block(&self, block: &Block) -> Result<BlockId, WalletError> {
        let bytes = self.codec.encode_block(block)?;
        let resp: SubmitResponse = self
            .http
            .post_bytes(&format!("{CORE}/blocks"), SERIALIZER_MEDIA_TYPE, bytes)
            .await?;
        resp.block_id
            .parse()
            .map_err(|e| WalletError::Node(format!("bad block id {}: {e}", resp.block_id)))
    }

    async fn block_metadata(&self, block_id: &BlockId) -> Result<InclusionState, WalletError> {
        let meta: BlockMetadata = self
            .http
            .get_json(&format!("{CORE}/blocks/{block_id}/metadata"))
            .await?;
        Ok(inclusion_from(meta.ledger_inclusion_state.as_deref()))
    }
}
