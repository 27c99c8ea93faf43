//! Engine assembly: store, networks, executor, sweep and trigger queue.

use std::sync::Arc;

use tangle_crypto::AddressDetails;
use tangle_store::{EngineStore, SecretStore, TransactionRecord, TransactionStore};
use tangle_store_lmdb::{check_data_dir, check_integrity, LmdbEnvironment, Migrator};
use tangle_types::{Clock, Network, SystemClock};
use tangle_wallet::{address_service, EndpointPool};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::EngineConfig;
use crate::context::{NetworkContext, Networks};
use crate::executor::Executor;
use crate::metrics::EngineMetrics;
use crate::retry::RetryScheduler;
use crate::shutdown::ShutdownController;
use crate::trigger::{Dispatcher, Trigger, TriggerQueue, TriggerReason};
use crate::EngineError;

pub struct Engine {
    config: EngineConfig,
    transactions: Arc<dyn TransactionStore>,
    secrets: Arc<dyn SecretStore>,
    executor: Executor,
    scheduler: RetryScheduler,
    queue: TriggerQueue,
    receiver: Option<mpsc::Receiver<Trigger>>,
}

impl Engine {
    pub fn new<S: EngineStore + 'static>(
        config: EngineConfig,
        store: Arc<S>,
        networks: Networks,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, EngineError> {
        let metrics = Arc::new(EngineMetrics::new()?);
        let executor = Executor::new(store.clone(), networks, clock.clone(), metrics.clone())
            .with_max_retry(config.max_retry)
            .with_inclusion_policy(config.inclusion_policy());
        let scheduler = RetryScheduler::new(store.clone(), clock, metrics, config.stale_after());
        let (queue, receiver) = TriggerQueue::channel(config.queue_capacity);
        Ok(Self {
            config,
            transactions: store.clone(),
            secrets: store,
            executor,
            scheduler,
            queue,
            receiver: Some(receiver),
        })
    }

    /// Open the LMDB store under `config.data_dir` and connect every
    /// configured network.
    pub fn open(config: EngineConfig) -> Result<Self, EngineError> {
        check_data_dir(&config.data_dir).map_err(EngineError::Config)?;
        let store = Arc::new(LmdbEnvironment::open_default(&config.data_dir)?);
        let report = check_integrity(store.env())?;
        if !report.is_healthy() {
            return Err(EngineError::Config(report.errors.join("; ")));
        }
        Migrator::run(store.as_ref())?;

        let mut networks = Networks::new();
        for (network, urls) in config.configured_networks()? {
            let pool = EndpointPool::connect(network, &urls, config.endpoint_max_attempts)?;
            info!(%network, endpoints = urls.len(), "network configured");
            networks.insert(NetworkContext::new(pool, store.clone()));
        }
        info!(
            data_dir = %config.data_dir.display(),
            transactions = report.transactions,
            reservations = report.reservations,
            "engine store opened"
        );
        Self::new(config, store, networks, Arc::new(SystemClock))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    pub fn scheduler(&self) -> &RetryScheduler {
        &self.scheduler
    }

    pub fn metrics(&self) -> &Arc<EngineMetrics> {
        self.executor.metrics()
    }

    pub fn queue(&self) -> &TriggerQueue {
        &self.queue
    }

    /// Check a request that can be rejected without touching the ledger.
    fn validate(&self, record: &TransactionRecord) -> Result<(), EngineError> {
        let ctx = self.executor.networks().get(record.network)?;
        if !self.executor.registry().contains(record.workflow_type) {
            return Err(EngineError::UnknownWorkflow(record.workflow_type));
        }
        let payload = &record.payload;
        let mut texts = vec![payload.source_address.as_str()];
        texts.extend(payload.target_address.as_deref());
        texts.extend(payload.storage_deposit_source_address.as_deref());
        texts.extend(payload.alias_governor_address.as_deref());
        texts.extend(payload.expiration.as_ref().map(|e| e.return_address.as_str()));
        for text in texts {
            ctx.addresses.parse_address(text)?;
        }
        for address in payload.spending_addresses() {
            ctx.addresses.secrets().get_mnemonic(&address)?;
        }
        Ok(())
    }

    /// Store a new request and queue it. Requests that can never run are
    /// rejected here and not stored.
    pub async fn submit_request(&self, record: TransactionRecord) -> Result<(), EngineError> {
        self.validate(&record)?;
        self.transactions.insert_transaction(&record)?;
        info!(tx = %record.id, workflow = %record.workflow_type, network = %record.network, "request stored");
        if !record.depends_on_bill_payment {
            self.queue.send(Trigger::created(&record.id)).await?;
        }
        Ok(())
    }

    /// Release a record held back for a bill payment and queue it.
    pub async fn clear_bill_payment_dependency(&self, id: &str) -> Result<bool, EngineError> {
        let cleared = self.executor.clear_dependency(id)?;
        if cleared {
            self.queue
                .send(Trigger::new(id, TriggerReason::PolicyCleared))
                .await?;
        }
        Ok(cleared)
    }

    pub async fn trigger(&self, id: &str) -> Result<(), EngineError> {
        self.queue.send(Trigger::new(id, TriggerReason::Manual)).await
    }

    pub fn status(&self, id: &str) -> Result<TransactionRecord, EngineError> {
        self.executor.status(id)
    }

    /// Generate an address on `network` and store its mnemonic. The
    /// network needs no endpoints for this.
    pub fn new_address(&self, network: Network) -> Result<AddressDetails, EngineError> {
        Ok(address_service(network, self.secrets.clone()).new_address(true)?)
    }

    /// One sweep, without queueing anything.
    pub fn sweep_once(&self) -> Result<Vec<String>, EngineError> {
        self.scheduler.sweep_stale(self.config.stale_after())
    }

    /// Spawn the dispatcher and the retry sweep. Can be called once.
    pub fn start(&mut self, shutdown: &ShutdownController) -> Result<Vec<JoinHandle<()>>, EngineError> {
        let receiver = self
            .receiver
            .take()
            .ok_or_else(|| EngineError::Config("engine already started".into()))?;
        let dispatcher = Dispatcher::new(self.executor.clone(), receiver);
        let sweep = self.scheduler.clone().run(
            self.config.sweep_interval(),
            self.queue.clone(),
            shutdown.subscribe(),
        );
        Ok(vec![
            tokio::spawn(dispatcher.run(shutdown.subscribe())),
            tokio::spawn(sweep),
        ])
    }
}
