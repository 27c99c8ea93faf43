//! Execution state machine.
//!
//! A record moves `Eligible → Reserved → Submitted → {Confirmed | Failed}`.
//! A failed record with budget left goes back to eligible with
//! `should_retry` set; once `attempt_count` reaches the budget the next
//! trigger abandons it without touching any reservation.
//!
//! All state lives in the store. Two executors (or two tasks of one) that
//! race on the same record are separated first by the address reservation
//! and then by an optimistic claim on the record itself.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use tangle_crypto::AddressDetails;
use tangle_store::{EngineStore, TransactionRecord, TransactionStore};
use tangle_transactions::{build_transaction, TaggedData};
use tangle_types::{BlockId, Clock, InclusionState};
use tangle_wallet::{await_inclusion, get_outputs, submit_payload, InclusionPolicy};
use tracing::{debug, error, info, warn};

use crate::context::{NetworkContext, Networks};
use crate::error::ErrorClass;
use crate::metrics::EngineMetrics;
use crate::reservation::ReservationManager;
use crate::workflow::{BuildContext, WorkflowRegistry};
use crate::EngineError;

/// Tag of the tagged-data payload carried by every submitted transaction.
pub const CORRELATION_TAG: &str = "tangle";

pub const DEFAULT_MAX_RETRY: u32 = 3;

/// What one call into the executor did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to do right now.
    Skipped(&'static str),
    /// An address is held by another transaction; the record is untouched.
    Conflict,
    Submitted { block_id: BlockId, node_index: usize },
    /// A submission from an earlier run is still pending on the ledger.
    Tracking {
        block_id: BlockId,
        node_index: Option<usize>,
    },
    Confirmed { block_id: BlockId },
    Abandoned,
    Failed { class: ErrorClass },
}

impl Outcome {
    /// The block to watch for inclusion, if any.
    pub fn block_to_track(&self) -> Option<(BlockId, Option<usize>)> {
        match self {
            Self::Submitted {
                block_id,
                node_index,
            } => Some((*block_id, Some(*node_index))),
            Self::Tracking {
                block_id,
                node_index,
            } => Some((*block_id, *node_index)),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Eligibility {
    Finished,
    Dependent,
    Fresh,
    Retry,
    /// Flagged while a submission was outstanding.
    InFlight(BlockId),
    Exhausted,
    NotDue,
}

/// Result of asking the ledger about earlier submissions.
enum Reconciled {
    Included(BlockId),
    Current(InclusionState),
    Unknown,
}

#[derive(Clone)]
pub struct Executor {
    transactions: Arc<dyn TransactionStore>,
    reservations: ReservationManager,
    networks: Arc<Networks>,
    registry: Arc<WorkflowRegistry>,
    clock: Arc<dyn Clock>,
    metrics: Arc<EngineMetrics>,
    max_retry: u32,
    inclusion: InclusionPolicy,
}

impl Executor {
    pub fn new<S: EngineStore + 'static>(
        store: Arc<S>,
        networks: Networks,
        clock: Arc<dyn Clock>,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self {
            transactions: store.clone(),
            reservations: ReservationManager::new(store),
            networks: Arc::new(networks),
            registry: Arc::new(WorkflowRegistry::with_defaults()),
            clock,
            metrics,
            max_retry: DEFAULT_MAX_RETRY,
            inclusion: InclusionPolicy::default(),
        }
    }

    pub fn with_registry(mut self, registry: WorkflowRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn with_max_retry(mut self, max_retry: u32) -> Self {
        self.max_retry = max_retry;
        self
    }

    pub fn with_inclusion_policy(mut self, policy: InclusionPolicy) -> Self {
        self.inclusion = policy;
        self
    }

    pub fn networks(&self) -> &Networks {
        &self.networks
    }

    pub fn registry(&self) -> &WorkflowRegistry {
        &self.registry
    }

    pub fn reservations(&self) -> &ReservationManager {
        &self.reservations
    }

    pub fn metrics(&self) -> &Arc<EngineMetrics> {
        &self.metrics
    }

    pub fn status(&self, id: &str) -> Result<TransactionRecord, EngineError> {
        Ok(self.transactions.get_transaction(id)?)
    }

    fn eligibility(&self, record: &TransactionRecord) -> Eligibility {
        let wallet = &record.wallet_reference;
        if !wallet.is_pending() {
            return Eligibility::Finished;
        }
        if record.depends_on_bill_payment {
            return Eligibility::Dependent;
        }
        if let Some(block_id) = wallet.chain_reference {
            return if record.should_retry {
                Eligibility::InFlight(block_id)
            } else {
                Eligibility::NotDue
            };
        }
        if wallet.attempt_count == 0 && !wallet.in_progress {
            return Eligibility::Fresh;
        }
        if !record.should_retry {
            return Eligibility::NotDue;
        }
        if wallet.attempt_count >= self.max_retry {
            Eligibility::Exhausted
        } else {
            Eligibility::Retry
        }
    }

    /// Advance one record as far as it can go without waiting on the
    /// ledger. Store failures are returned; everything else is recorded on
    /// the record and reported as the outcome.
    pub async fn process(&self, id: &str) -> Result<Outcome, EngineError> {
        let record = self.transactions.get_transaction(id)?;
        let eligibility = self.eligibility(&record);
        debug!(tx = %id, ?eligibility, attempt = record.wallet_reference.attempt_count, "processing");

        let ctx = match eligibility {
            Eligibility::Finished => return Ok(Outcome::Skipped("finished")),
            Eligibility::Dependent => return Ok(Outcome::Skipped("waiting for bill payment")),
            Eligibility::NotDue => return Ok(Outcome::Skipped("not due")),
            _ => match self.networks.get(record.network) {
                Ok(ctx) => ctx,
                Err(e) => return self.fail(id, e),
            },
        };

        match eligibility {
            Eligibility::InFlight(block_id) => self.resume(ctx, &record, block_id).await,
            Eligibility::Exhausted => {
                if let Reconciled::Included(block_id) = self.reconcile_quietly(ctx, &record).await {
                    return self.confirm(id, block_id);
                }
                self.abandon(id)
            }
            Eligibility::Retry => {
                if let Reconciled::Included(block_id) = self.reconcile_quietly(ctx, &record).await {
                    return self.confirm(id, block_id);
                }
                self.attempt(ctx, record).await
            }
            _ => self.attempt(ctx, record).await,
        }
    }

    /// Ask the ledger about every block submitted for `record`, newest
    /// first. Any included block wins.
    async fn reconcile(
        &self,
        ctx: &NetworkContext,
        record: &TransactionRecord,
    ) -> Result<Reconciled, EngineError> {
        let wallet = &record.wallet_reference;
        if wallet.chain_references.is_empty() {
            return Ok(Reconciled::Unknown);
        }
        let (_, node) = ctx.pool.healthy(None).await?;
        let mut current = None;
        for block_id in wallet.chain_references.iter().rev() {
            let state = node.block_metadata(block_id).await?;
            if state == InclusionState::Included {
                return Ok(Reconciled::Included(*block_id));
            }
            if wallet.chain_reference == Some(*block_id) {
                current = Some(state);
            }
        }
        Ok(current.map_or(Reconciled::Unknown, Reconciled::Current))
    }

    async fn reconcile_quietly(&self, ctx: &NetworkContext, record: &TransactionRecord) -> Reconciled {
        match self.reconcile(ctx, record).await {
            Ok(reconciled) => reconciled,
            Err(e) => {
                warn!(tx = %record.id, error = %e, "could not reconcile earlier submissions");
                Reconciled::Unknown
            }
        }
    }

    /// A record whose submission was outstanding when the sweep flagged it.
    async fn resume(
        &self,
        ctx: &NetworkContext,
        record: &TransactionRecord,
        block_id: BlockId,
    ) -> Result<Outcome, EngineError> {
        let id = record.id.as_str();
        match self.reconcile(ctx, record).await {
            Ok(Reconciled::Included(included)) => self.confirm(id, included),
            Ok(Reconciled::Current(InclusionState::Conflicting))
            | Ok(Reconciled::Current(InclusionState::NoTransaction)) => {
                self.fail_submission(id, block_id, EngineError::Conflicting(block_id))
            }
            Ok(_) => {
                let now = self.clock.now();
                let record = self.transactions.update_transaction(id, &mut |r| {
                    if r.wallet_reference.chain_reference != Some(block_id) || !r.should_retry {
                        return false;
                    }
                    r.should_retry = false;
                    r.wallet_reference.processed_on = Some(now);
                    true
                })?;
                info!(tx = %id, block = %block_id, "resuming inclusion tracking");
                Ok(Outcome::Tracking {
                    block_id,
                    node_index: record.wallet_reference.node_index,
                })
            }
            Err(e) => self.fail_submission(id, block_id, e),
        }
    }

    async fn attempt(
        &self,
        ctx: &NetworkContext,
        record: TransactionRecord,
    ) -> Result<Outcome, EngineError> {
        let id = record.id.clone();
        let addresses = record.payload.spending_addresses();
        let started = Instant::now();

        match self.reservations.try_reserve(&id, &addresses) {
            Ok(true) => {}
            Ok(false) => {
                self.metrics.reservation_conflicts.inc();
                info!(tx = %id, ?addresses, "addresses reserved by another transaction");
                return Ok(Outcome::Conflict);
            }
            // An address without a reservation record has no stored mnemonic.
            Err(e) if e.class() == ErrorClass::Construction => return self.fail(&id, e),
            Err(e) => return Err(e),
        }

        let expected = record.wallet_reference.attempt_count;
        let now = self.clock.now();
        let mut claimed = false;
        let claimed_record = self.transactions.update_transaction(&id, &mut |r| {
            let wallet = &r.wallet_reference;
            claimed = wallet.is_pending()
                && !r.depends_on_bill_payment
                && wallet.attempt_count == expected
                && wallet.chain_reference.is_none()
                && (r.should_retry || !wallet.in_progress);
            if !claimed {
                return false;
            }
            let wallet = &mut r.wallet_reference;
            wallet.attempt_count += 1;
            wallet.in_progress = true;
            wallet.processed_on = Some(now);
            wallet.error = None;
            r.should_retry = false;
            true
        })?;
        if !claimed {
            if !claimed_record.wallet_reference.is_pending() {
                self.reservations.release_all(&addresses, &id)?;
            }
            return Ok(Outcome::Skipped("claimed elsewhere"));
        }

        let attempt = claimed_record.wallet_reference.attempt_count;
        info!(tx = %id, attempt, workflow = %claimed_record.workflow_type, network = %claimed_record.network, "attempting");

        match self.submit(ctx, &claimed_record).await {
            Ok((block_id, node_index)) => {
                self.metrics.submissions.inc();
                self.metrics
                    .submission_latency_ms
                    .observe(started.elapsed().as_secs_f64() * 1_000.0);
                Ok(Outcome::Submitted {
                    block_id,
                    node_index,
                })
            }
            Err(e) => self.fail(&id, e),
        }
    }

    /// Reserved → Submitted. Returns the block id and the endpoint used.
    async fn submit(
        &self,
        ctx: &NetworkContext,
        record: &TransactionRecord,
    ) -> Result<(BlockId, usize), EngineError> {
        let payload = &record.payload;
        let (node_index, node) = ctx
            .pool
            .healthy(record.wallet_reference.node_index)
            .await?;

        let source = ctx.addresses.address_details(&payload.source_address)?;
        let funder = match &payload.storage_deposit_source_address {
            Some(address) if *address != payload.source_address => {
                Some(ctx.addresses.address_details(address)?)
            }
            _ => None,
        };
        let governor = match &payload.alias_governor_address {
            Some(address) if *address != payload.source_address => {
                Some(ctx.addresses.address_details(address)?)
            }
            _ => None,
        };

        let previous = &record.wallet_reference.consumed_output_ids;
        let available = if previous.is_empty() {
            let mut available = get_outputs(node.as_ref(), &source.address(), None).await?;
            let governor = governor
                .as_ref()
                .filter(|g| payload.storage_deposit_source_address.as_deref() != Some(g.bech32()));
            for extra in funder.iter().chain(governor) {
                available.extend(get_outputs(node.as_ref(), &extra.address(), None).await?);
            }
            available
        } else {
            get_outputs(node.as_ref(), &source.address(), Some(previous.as_slice())).await?
        };

        let builder = self.registry.get(record.workflow_type)?;
        let plan = builder.build(&BuildContext {
            record,
            packer: &ctx.packer,
            addresses: ctx.addresses.as_ref(),
            source: &source,
            funder: funder.as_ref(),
            governor: governor.as_ref(),
            available: &available,
        })?;
        let selection = plan.selection()?;

        let mut signers: Vec<&AddressDetails> = vec![&source];
        signers.extend(funder.as_ref());
        if let Some(governor) = &governor {
            if !signers.iter().any(|s| s.address() == governor.address()) {
                signers.push(governor);
            }
        }
        let correlation = TaggedData::from_metadata(
            CORRELATION_TAG,
            &BTreeMap::from([
                ("transactionId".to_string(), record.id.clone()),
                ("type".to_string(), record.workflow_type.to_string()),
            ]),
        )?;
        let signed = build_transaction(
            ctx.params(),
            &selection,
            plan.outputs,
            Some(correlation),
            &signers,
        )?;

        // Inputs are on record before the block leaves, so a crash after
        // submission still retries with the same inputs.
        let inputs = signed.inputs.clone();
        self.transactions.update_transaction(&record.id, &mut |r| {
            r.wallet_reference.consumed_output_ids = inputs.clone();
            true
        })?;
        for details in signers.iter() {
            let owner = details.address();
            self.reservations.record_consumed(
                details.bech32(),
                &record.id,
                selection
                    .iter()
                    .filter(|(_, output)| output.owner().as_ref() == Some(&owner))
                    .map(|(id, output)| (id, output)),
            )?;
        }

        let block_id = submit_payload(node.as_ref(), ctx.params(), signed.payload).await?;
        self.transactions.update_transaction(&record.id, &mut |r| {
            let wallet = &mut r.wallet_reference;
            wallet.chain_reference = Some(block_id);
            wallet.chain_references.push(block_id);
            wallet.node_index = Some(node_index);
            true
        })?;
        info!(
            tx = %record.id,
            block = %block_id,
            transaction = %signed.transaction_id,
            inputs = signed.inputs.len(),
            node_index,
            "submitted"
        );
        Ok((block_id, node_index))
    }

    /// Wait for the ledger's verdict on `block_id` and settle the record.
    pub async fn track(
        &self,
        id: &str,
        block_id: BlockId,
        node_index: Option<usize>,
    ) -> Result<Outcome, EngineError> {
        let record = self.transactions.get_transaction(id)?;
        let ctx = self.networks.get(record.network)?;
        match self.inclusion_of(ctx, block_id, node_index).await {
            Ok(InclusionState::Included) => self.confirm(id, block_id),
            Ok(state) => {
                warn!(tx = %id, block = %block_id, ?state, "block not applied");
                self.fail_submission(id, block_id, EngineError::Conflicting(block_id))
            }
            Err(e) => self.fail_submission(id, block_id, e),
        }
    }

    async fn inclusion_of(
        &self,
        ctx: &NetworkContext,
        block_id: BlockId,
        node_index: Option<usize>,
    ) -> Result<InclusionState, EngineError> {
        let node = match node_index.and_then(|i| ctx.pool.node(i)) {
            Some(node) => node,
            None => ctx.pool.healthy(None).await?.1,
        };
        Ok(await_inclusion(node.as_ref(), &block_id, self.inclusion).await?)
    }

    /// Submitted → Confirmed. Confirmation is never undone, and ledger
    /// inclusion also settles a record that was given up on.
    pub fn confirm(&self, id: &str, block_id: BlockId) -> Result<Outcome, EngineError> {
        let now = self.clock.now();
        let mut newly = false;
        let record = self.transactions.update_transaction(id, &mut |r| {
            if r.wallet_reference.confirmed {
                return false;
            }
            newly = true;
            let wallet = &mut r.wallet_reference;
            wallet.confirmed = true;
            wallet.abandoned = false;
            wallet.in_progress = false;
            wallet.error = None;
            wallet.chain_reference = Some(block_id);
            if !wallet.chain_references.contains(&block_id) {
                wallet.chain_references.push(block_id);
            }
            wallet.processed_on = Some(now);
            r.should_retry = false;
            true
        })?;
        self.reservations
            .release_all(&record.payload.spending_addresses(), id)?;
        if newly {
            self.metrics.confirmations.inc();
            info!(tx = %id, block = %block_id, attempts = record.wallet_reference.attempt_count, "confirmed");
        }
        let block_id = record.wallet_reference.chain_reference.unwrap_or(block_id);
        Ok(Outcome::Confirmed { block_id })
    }

    /// Record `error` against the current attempt and release its
    /// reservation.
    pub fn fail(&self, id: &str, error: EngineError) -> Result<Outcome, EngineError> {
        self.record_failure(id, error, None)
    }

    /// Like [`Self::fail`], but only while `block_id` is still the current
    /// submission. A late verdict about an older block changes nothing.
    fn fail_submission(
        &self,
        id: &str,
        block_id: BlockId,
        error: EngineError,
    ) -> Result<Outcome, EngineError> {
        self.record_failure(id, error, Some(block_id))
    }

    fn record_failure(
        &self,
        id: &str,
        error: EngineError,
        current: Option<BlockId>,
    ) -> Result<Outcome, EngineError> {
        let class = error.class();
        let message = error.to_string();
        let mut applied = false;
        let record = self.transactions.update_transaction(id, &mut |r| {
            if !r.wallet_reference.is_pending() {
                return false;
            }
            if current.is_some() && r.wallet_reference.chain_reference != current {
                return false;
            }
            applied = true;
            let wallet = &mut r.wallet_reference;
            wallet.error = Some(message.clone());
            wallet.chain_reference = None;
            wallet.in_progress = false;
            if class.is_retryable() {
                r.should_retry = true;
            } else {
                wallet.abandoned = true;
                r.should_retry = false;
            }
            true
        })?;

        if applied || !record.wallet_reference.is_pending() {
            self.reservations
                .release_all(&record.payload.spending_addresses(), id)?;
        }
        if !applied {
            return Ok(Outcome::Skipped("stale failure"));
        }

        self.metrics.record_failure(class);
        let attempt = record.wallet_reference.attempt_count;
        match class {
            ErrorClass::ProtocolInvariant => {
                self.metrics.abandoned.inc();
                error!(tx = %id, attempt, class = %class, error = %message, "protocol invariant violated");
            }
            ErrorClass::Construction => {
                self.metrics.abandoned.inc();
                error!(tx = %id, attempt, class = %class, error = %message, "transaction cannot be built");
            }
            ErrorClass::Network | ErrorClass::ReservationConflict => {
                warn!(tx = %id, attempt, class = %class, error = %message, "attempt failed, will retry");
            }
        }
        Ok(if record.wallet_reference.abandoned {
            Outcome::Abandoned
        } else {
            Outcome::Failed { class }
        })
    }

    /// Give up on a record whose retry budget is spent.
    fn abandon(&self, id: &str) -> Result<Outcome, EngineError> {
        let max_retry = self.max_retry;
        let mut applied = false;
        let record = self.transactions.update_transaction(id, &mut |r| {
            if !r.wallet_reference.is_pending() {
                return false;
            }
            applied = true;
            let wallet = &mut r.wallet_reference;
            wallet.abandoned = true;
            wallet.in_progress = false;
            wallet.chain_reference = None;
            wallet.error = Some(match wallet.error.take() {
                Some(last) => format!("gave up after {max_retry} attempts: {last}"),
                None => format!("gave up after {max_retry} attempts"),
            });
            r.should_retry = false;
            true
        })?;
        self.reservations
            .release_all(&record.payload.spending_addresses(), id)?;
        if applied {
            self.metrics.abandoned.inc();
            warn!(tx = %id, attempts = record.wallet_reference.attempt_count, "retry budget exhausted");
        }
        Ok(Outcome::Abandoned)
    }

    /// Let a record held back for a bill payment run. Returns whether the
    /// flag was set.
    pub fn clear_dependency(&self, id: &str) -> Result<bool, EngineError> {
        let mut cleared = false;
        self.transactions.update_transaction(id, &mut |r| {
            cleared = r.depends_on_bill_payment;
            r.depends_on_bill_payment = false;
            cleared
        })?;
        if cleared {
            info!(tx = %id, "bill payment dependency cleared");
        }
        Ok(cleared)
    }
}
