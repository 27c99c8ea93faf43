//! Per-network collaborators of the executor.

use std::collections::HashMap;
use std::sync::Arc;

use tangle_store::SecretStore;
use tangle_transactions::OutputPacker;
use tangle_types::{Network, ProtocolParams};
use tangle_wallet::{address_service, AddressService, EndpointPool};

use crate::EngineError;

pub struct NetworkContext {
    pub packer: OutputPacker,
    pub addresses: Arc<dyn AddressService>,
    pub pool: EndpointPool,
}

impl NetworkContext {
    pub fn new(pool: EndpointPool, secrets: Arc<dyn SecretStore>) -> Self {
        let network = pool.network();
        Self {
            packer: OutputPacker::new(ProtocolParams::for_network(network)),
            addresses: address_service(network, secrets),
            pool,
        }
    }

    pub fn network(&self) -> Network {
        self.pool.network()
    }

    pub fn params(&self) -> &ProtocolParams {
        self.packer.params()
    }
}

/// The networks an engine instance can transact on.
#[derive(Default)]
pub struct Networks {
    contexts: HashMap<Network, NetworkContext>,
}

impl Networks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, context: NetworkContext) {
        self.contexts.insert(context.network(), context);
    }

    pub fn with(mut self, context: NetworkContext) -> Self {
        self.insert(context);
        self
    }

    pub fn get(&self, network: Network) -> Result<&NetworkContext, EngineError> {
        self.contexts
            .get(&network)
            .ok_or(EngineError::NetworkNotConfigured(network))
    }

    pub fn networks(&self) -> impl Iterator<Item = Network> + '_ {
        self.contexts.keys().copied()
    }
}
