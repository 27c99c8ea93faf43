//! Endpoint selection across several nodes of one network.

use std::sync::Arc;

use rand::Rng;
use tangle_types::{Network, NetworkFamily};

use crate::error::WalletError;
use crate::legacy::LegacyClient;
use crate::node::NodeApi;
use crate::shimmer::ShimmerClient;

/// Client for one node URL, picked by network family.
pub fn client_for(network: Network, url: &str) -> Result<Arc<dyn NodeApi>, WalletError> {
    Ok(match network.family() {
        NetworkFamily::Legacy => Arc::new(LegacyClient::new(network, url)?),
        NetworkFamily::Shimmer => Arc::new(ShimmerClient::new(network, url)?),
    })
}

/// The configured nodes of one network.
pub struct EndpointPool {
    network: Network,
    nodes: Vec<Arc<dyn NodeApi>>,
    max_attempts: u32,
}

impl EndpointPool {
    pub fn new(network: Network, nodes: Vec<Arc<dyn NodeApi>>, max_attempts: u32) -> Self {
        Self {
            network,
            nodes,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn connect(network: Network, urls: &[String], max_attempts: u32) -> Result<Self, WalletError> {
        let nodes = urls
            .iter()
            .map(|url| client_for(network, url))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(network, nodes, max_attempts))
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, index: usize) -> Option<Arc<dyn NodeApi>> {
        self.nodes.get(index).cloned()
    }

    /// Random index, skipping `avoid` when there is another choice.
    fn pick(&self, avoid: Option<usize>) -> usize {
        let mut rng = rand::thread_rng();
        match avoid {
            Some(skip) if self.nodes.len() > 1 && skip < self.nodes.len() => {
                let i = rng.gen_range(0..self.nodes.len() - 1);
                if i >= skip {
                    i + 1
                } else {
                    i
                }
            }
            _ => rng.gen_range(0..self.nodes.len()),
        }
    }

    /// Pick nodes at random until one answers its health probe.
    ///
    /// `avoid` is the index used by the previous attempt of the same
    /// transaction; it is skipped when another node exists.
    pub async fn healthy(
        &self,
        avoid: Option<usize>,
    ) -> Result<(usize, Arc<dyn NodeApi>), WalletError> {
        if self.nodes.is_empty() {
            return Err(WalletError::NoHealthyEndpoint {
                network: self.network,
                attempts: 0,
            });
        }
        for attempt in 1..=self.max_attempts {
            let index = self.pick(avoid);
            let node = &self.nodes[index];
            match node.health().await {
                Ok(true) => {
                    tracing::debug!(network = %self.network, index, url = node.url(), "selected endpoint");
                    return Ok((index, node.clone()));
                }
                Ok(false) => {
                    tracing::warn!(network = %self.network, index, attempt, "endpoint unhealthy");
                }
                Err(e) => {
                    tracing::warn!(network = %self.network, index, attempt, error = %e, "endpoint probe failed");
                }
            }
        }
        Err(WalletError::NoHealthyEndpoint {
            network: self.network,
            attempts: self.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pick_avoids_previous_index() {
        let pool = EndpointPool::connect(
            Network::Rms,
            &["http://a".to_string(), "http://b".to_string()],
            3,
        )
        .unwrap();
        for _ in 0..50 {
            assert_eq!(pool.pick(Some(0)), 1);
            assert_eq!(pool.pick(Some(1)), 0);
        }
    }

    #[test]
    fn single_node_is_used_even_if_avoided() {
        let pool = EndpointPool::connect(Network::Iota, &["http://a".to_string()], 3).unwrap();
        assert_eq!(pool.pick(Some(0)), 0);
        assert_eq!(pool.node(0).unwrap().network(), Network::Iota);
    }
}
