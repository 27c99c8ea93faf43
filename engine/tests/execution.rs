use std::sync::Arc;
use std::time::Duration;

use tangle_crypto::AddressDetails;
use tangle_engine::{
    EngineError, EngineMetrics, ErrorClass, Executor, NetworkContext, Networks, Outcome,
    RetryScheduler,
};
use tangle_nullables::{NullClock, NullNode, NullStore};
use tangle_store::{
    ReservationStore, RequestPayload, SecretStore, TransactionRecord, TransactionStore,
    WorkflowDetails, WorkflowType,
};
use tangle_transactions::{AliasOutputSpec, OutputPacker, Unlock};
use tangle_types::{
    AliasId, InclusionState, Network, OutputId, ProtocolParams, Timestamp, TransactionId,
};
use tangle_wallet::{EndpointPool, InclusionPolicy, NodeApi, WalletError};

const SOURCE: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon art";
const GOVERNOR: &str = "zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo wrong";
const TARGET: &str = "legal winner thank year wave sausage worth useful legal winner thank year wave sausage worth useful legal winner thank year wave sausage worth title";

struct Harness {
    store: Arc<NullStore>,
    node: Arc<NullNode>,
    clock: Arc<NullClock>,
    executor: Executor,
    source: AddressDetails,
    target: AddressDetails,
}

impl Harness {
    fn new(max_retry: u32) -> Self {
        let store = Arc::new(NullStore::new());
        let source = AddressDetails::derive(SOURCE, Network::Rms).unwrap();
        let target = AddressDetails::derive(TARGET, Network::Rms).unwrap();
        store.store_mnemonic(source.bech32(), SOURCE).unwrap();
        store.store_mnemonic(target.bech32(), TARGET).unwrap();

        let node = Arc::new(NullNode::new(Network::Rms));
        let api: Arc<dyn NodeApi> = node.clone();
        let pool = EndpointPool::new(Network::Rms, vec![api], 2);
        let networks = Networks::new().with(NetworkContext::new(pool, store.clone()));
        let clock = Arc::new(NullClock::new(1_700_000_000));
        let executor = Executor::new(
            store.clone(),
            networks,
            clock.clone(),
            Arc::new(EngineMetrics::new().unwrap()),
        )
        .with_max_retry(max_retry)
        .with_inclusion_policy(InclusionPolicy {
            poll_interval: Duration::from_millis(1),
            max_attempts: 3,
        });

        Self {
            store,
            node,
            clock,
            executor,
            source,
            target,
        }
    }

    fn payment(&self, id: &str, amount: u64) -> TransactionRecord {
        let record = TransactionRecord::new(
            id,
            WorkflowType::Payment,
            Network::Rms,
            RequestPayload {
                source_address: self.source.bech32().to_string(),
                target_address: Some(self.target.bech32().to_string()),
                amount,
                ..Default::default()
            },
            Timestamp::new(1_700_000_000),
        );
        self.store.insert_transaction(&record).unwrap();
        record
    }

    fn record(&self, id: &str) -> TransactionRecord {
        self.store.get_transaction(id).unwrap()
    }

    fn holder(&self) -> Option<String> {
        self.store
            .get_reservation(self.source.bech32())
            .unwrap()
            .locked_by
    }
}

fn submitted(outcome: Outcome) -> tangle_types::BlockId {
    match outcome {
        Outcome::Submitted { block_id, .. } => block_id,
        other => panic!("expected a submission, got {other:?}"),
    }
}

#[tokio::test]
async fn payment_is_submitted_confirmed_and_released() {
    let h = Harness::new(3);
    let funded = h.node.fund(h.source.address(), 10_000_000);
    h.payment("tx-1", 1_000_000);

    let block_id = submitted(h.executor.process("tx-1").await.unwrap());
    let record = h.record("tx-1");
    assert!(record.wallet_reference.in_progress);
    assert_eq!(record.wallet_reference.attempt_count, 1);
    assert_eq!(record.wallet_reference.chain_reference, Some(block_id));
    assert_eq!(record.wallet_reference.consumed_output_ids, vec![funded]);
    assert_eq!(h.holder().as_deref(), Some("tx-1"));
    assert_eq!(
        h.store
            .get_reservation(h.source.bech32())
            .unwrap()
            .consumed_output_ids,
        vec![funded]
    );

    assert_eq!(
        h.executor.track("tx-1", block_id, Some(0)).await.unwrap(),
        Outcome::Confirmed { block_id }
    );
    let record = h.record("tx-1");
    assert!(record.wallet_reference.confirmed);
    assert!(!record.wallet_reference.in_progress);
    assert_eq!(record.wallet_reference.node_index, Some(0));
    assert_eq!(h.holder(), None);

    assert_eq!(h.node.balance(&h.target.address()).await.unwrap().amount, 1_000_000);
    assert_eq!(h.node.balance(&h.source.address()).await.unwrap().amount, 9_000_000);
}

#[tokio::test]
async fn submitted_block_carries_correlation_data() {
    let h = Harness::new(3);
    h.node.fund(h.source.address(), 10_000_000);
    h.payment("tx-7", 1_000_000);
    submitted(h.executor.process("tx-7").await.unwrap());

    let (_, block) = h.node.submitted().pop().unwrap();
    let tagged = block.payload.essence.payload.unwrap();
    assert_eq!(tagged.tag, b"tangle".to_vec());
    let data: serde_json::Value = serde_json::from_slice(&tagged.data).unwrap();
    assert_eq!(data["transactionId"], "tx-7");
    assert_eq!(data["type"], "payment");
}

#[tokio::test]
async fn competing_transactions_are_mutually_exclusive() {
    let h = Harness::new(3);
    h.node.fund(h.source.address(), 10_000_000);
    h.payment("tx-1", 1_000_000);
    h.payment("tx-2", 1_000_000);

    let (a, b) = tokio::join!(h.executor.process("tx-1"), h.executor.process("tx-2"));
    let outcomes = [a.unwrap(), b.unwrap()];
    let winners = outcomes
        .iter()
        .filter(|o| matches!(o, Outcome::Submitted { .. }))
        .count();
    assert_eq!(winners, 1);
    assert!(outcomes.contains(&Outcome::Conflict));

    let (winner, loser) = if matches!(outcomes[0], Outcome::Submitted { .. }) {
        ("tx-1", "tx-2")
    } else {
        ("tx-2", "tx-1")
    };
    let untouched = h.record(loser);
    assert_eq!(untouched.wallet_reference.attempt_count, 0);
    assert!(!untouched.wallet_reference.in_progress);
    assert_eq!(h.holder().as_deref(), Some(winner));
    assert_eq!(h.executor.metrics().reservation_conflicts.get(), 1);

    let (block_id, node_index) = outcomes
        .iter()
        .find_map(|o| o.block_to_track())
        .unwrap();
    h.executor.track(winner, block_id, node_index).await.unwrap();
    assert_eq!(h.holder(), None);

    submitted(h.executor.process(loser).await.unwrap());
    assert_eq!(h.holder().as_deref(), Some(loser));
}

#[tokio::test]
async fn alias_governor_is_reserved_and_signs() {
    let h = Harness::new(3);
    let governor = AddressDetails::derive(GOVERNOR, Network::Rms).unwrap();
    h.store.store_mnemonic(governor.bech32(), GOVERNOR).unwrap();
    h.node.fund(h.source.address(), 10_000_000);
    h.node.fund(governor.address(), 10_000_000);
    let alias_output_id = OutputId::new(TransactionId::new([7; 32]), 0);
    let packer = OutputPacker::new(ProtocolParams::for_network(Network::Rms));
    h.node.insert_output(
        alias_output_id,
        packer.pack_alias(&AliasOutputSpec::mint(governor.address())).unwrap(),
    );

    let mint = TransactionRecord::new(
        "tx-mint",
        WorkflowType::MintCollection,
        Network::Rms,
        RequestPayload {
            source_address: h.source.bech32().to_string(),
            target_address: Some(h.target.bech32().to_string()),
            alias_governor_address: Some(governor.bech32().to_string()),
            details: Some(WorkflowDetails::Collection {
                alias_id: AliasId::from_output_id(&alias_output_id),
                immutable_metadata: br#"{"name":"collection"}"#.to_vec(),
            }),
            ..Default::default()
        },
        Timestamp::new(1_700_000_000),
    );
    h.store.insert_transaction(&mint).unwrap();
    let spend = TransactionRecord::new(
        "tx-spend",
        WorkflowType::Payment,
        Network::Rms,
        RequestPayload {
            source_address: governor.bech32().to_string(),
            target_address: Some(h.target.bech32().to_string()),
            amount: 1_000_000,
            ..Default::default()
        },
        Timestamp::new(1_700_000_000),
    );
    h.store.insert_transaction(&spend).unwrap();

    submitted(h.executor.process("tx-mint").await.unwrap());
    let locked_by = |details: &AddressDetails| {
        h.store.get_reservation(details.bech32()).unwrap().locked_by
    };
    assert_eq!(locked_by(&governor).as_deref(), Some("tx-mint"));
    assert_eq!(h.holder().as_deref(), Some("tx-mint"));

    // the governor's own payment must wait for the mint
    assert_eq!(h.executor.process("tx-spend").await.unwrap(), Outcome::Conflict);
    assert_eq!(h.record("tx-spend").wallet_reference.attempt_count, 0);

    let (_, block) = h.node.submitted().pop().unwrap();
    assert_eq!(block.payload.essence.inputs[0], alias_output_id);
    let signatures = block
        .payload
        .unlocks
        .iter()
        .filter(|u| matches!(u, Unlock::Signature { .. }))
        .count();
    assert_eq!(signatures, 2);
}

#[tokio::test]
async fn retry_spends_the_same_inputs() {
    let h = Harness::new(3);
    let first = h.node.fund(h.source.address(), 10_000_000);
    h.payment("tx-1", 1_000_000);
    h.node.fail_next_submissions(1);

    assert_eq!(
        h.executor.process("tx-1").await.unwrap(),
        Outcome::Failed {
            class: ErrorClass::Network
        }
    );
    let record = h.record("tx-1");
    assert!(record.should_retry);
    assert!(!record.wallet_reference.in_progress);
    assert_eq!(record.wallet_reference.chain_reference, None);
    assert!(record.wallet_reference.error.is_some());
    assert_eq!(record.wallet_reference.consumed_output_ids, vec![first]);
    assert_eq!(h.holder(), None);

    // A fresh lookup would now pick this up too.
    h.node.fund(h.source.address(), 5_000_000);

    submitted(h.executor.process("tx-1").await.unwrap());
    let (_, block) = h.node.submitted().pop().unwrap();
    assert_eq!(block.payload.essence.inputs, vec![first]);
    let record = h.record("tx-1");
    assert_eq!(record.wallet_reference.attempt_count, 2);
    assert_eq!(record.wallet_reference.error, None);
}

#[tokio::test]
async fn exhausted_budget_abandons_without_reserving() {
    let h = Harness::new(3);
    h.node.fund(h.source.address(), 10_000_000);
    h.payment("tx-1", 1_000_000);
    h.node.fail_next_submissions(10);

    for attempt in 1..=3 {
        assert_eq!(
            h.executor.process("tx-1").await.unwrap(),
            Outcome::Failed {
                class: ErrorClass::Network
            }
        );
        assert_eq!(h.record("tx-1").wallet_reference.attempt_count, attempt);
    }

    // Another transaction now holds the address; a reservation attempt
    // would report a conflict instead of abandoning.
    assert!(h
        .executor
        .reservations()
        .try_reserve("tx-other", &[h.source.bech32().to_string()])
        .unwrap());

    assert_eq!(h.executor.process("tx-1").await.unwrap(), Outcome::Abandoned);
    let record = h.record("tx-1");
    assert!(record.wallet_reference.abandoned);
    assert!(!record.wallet_reference.confirmed);
    assert!(!record.should_retry);
    assert_eq!(record.wallet_reference.attempt_count, 3);
    assert!(record
        .wallet_reference
        .error
        .as_deref()
        .unwrap()
        .starts_with("gave up after 3 attempts"));
    assert_eq!(h.holder().as_deref(), Some("tx-other"));
    assert_eq!(h.executor.metrics().abandoned.get(), 1);
    assert_eq!(
        h.executor.process("tx-1").await.unwrap(),
        Outcome::Skipped("finished")
    );
}

#[tokio::test]
async fn conflicting_block_fails_then_retry_confirms() {
    let h = Harness::new(3);
    h.node.fund(h.source.address(), 10_000_000);
    h.payment("tx-1", 1_000_000);

    h.node.set_next_inclusion(InclusionState::Conflicting);
    let first = submitted(h.executor.process("tx-1").await.unwrap());
    assert_eq!(
        h.executor.track("tx-1", first, Some(0)).await.unwrap(),
        Outcome::Failed {
            class: ErrorClass::Network
        }
    );
    let record = h.record("tx-1");
    assert_eq!(record.wallet_reference.chain_reference, None);
    assert_eq!(record.wallet_reference.chain_references, vec![first]);
    assert!(record.should_retry);

    h.node.set_next_inclusion(InclusionState::Included);
    let second = submitted(h.executor.process("tx-1").await.unwrap());
    assert_ne!(first, second);
    assert_eq!(
        h.executor.track("tx-1", second, Some(0)).await.unwrap(),
        Outcome::Confirmed { block_id: second }
    );
    assert_eq!(
        h.record("tx-1").wallet_reference.chain_references,
        vec![first, second]
    );
}

#[tokio::test]
async fn retry_confirms_an_already_included_block() {
    let h = Harness::new(3);
    h.node.fund(h.source.address(), 10_000_000);
    h.payment("tx-1", 1_000_000);

    let block_id = submitted(h.executor.process("tx-1").await.unwrap());
    h.executor
        .fail("tx-1", WalletError::Node("connection reset".into()).into())
        .unwrap();
    assert!(h.record("tx-1").should_retry);

    assert_eq!(
        h.executor.process("tx-1").await.unwrap(),
        Outcome::Confirmed { block_id }
    );
    assert_eq!(h.node.submission_count(), 1);
    assert!(h.record("tx-1").wallet_reference.confirmed);
}

#[tokio::test]
async fn confirmation_is_monotonic() {
    let h = Harness::new(3);
    h.node.fund(h.source.address(), 10_000_000);
    h.payment("tx-1", 1_000_000);
    let block_id = submitted(h.executor.process("tx-1").await.unwrap());
    h.executor.confirm("tx-1", block_id).unwrap();

    assert_eq!(
        h.executor
            .fail("tx-1", WalletError::Node("late".into()).into())
            .unwrap(),
        Outcome::Skipped("stale failure")
    );
    assert_eq!(
        h.executor.track("tx-1", block_id, None).await.unwrap(),
        Outcome::Confirmed { block_id }
    );
    assert_eq!(
        h.executor.process("tx-1").await.unwrap(),
        Outcome::Skipped("finished")
    );
    let record = h.record("tx-1");
    assert!(record.wallet_reference.confirmed);
    assert_eq!(record.wallet_reference.error, None);
    assert_eq!(h.executor.metrics().confirmations.get(), 1);
}

#[tokio::test]
async fn dependent_transaction_waits_for_bill_payment() {
    let h = Harness::new(3);
    h.node.fund(h.source.address(), 10_000_000);
    let mut record = h.payment("tx-credit", 1_000_000);
    record.depends_on_bill_payment = true;
    h.store
        .update_transaction("tx-credit", &mut |r| {
            *r = record.clone();
            true
        })
        .unwrap();

    assert_eq!(
        h.executor.process("tx-credit").await.unwrap(),
        Outcome::Skipped("waiting for bill payment")
    );
    assert_eq!(h.holder(), None);

    assert!(h.executor.clear_dependency("tx-credit").unwrap());
    assert!(!h.executor.clear_dependency("tx-credit").unwrap());
    submitted(h.executor.process("tx-credit").await.unwrap());
}

#[tokio::test]
async fn construction_error_abandons_immediately() {
    let h = Harness::new(3);
    h.node.fund(h.source.address(), 100_000);
    h.payment("tx-1", 50_000_000);

    assert_eq!(h.executor.process("tx-1").await.unwrap(), Outcome::Abandoned);
    let record = h.record("tx-1");
    assert!(record.wallet_reference.abandoned);
    assert!(!record.should_retry);
    assert!(record.wallet_reference.error.is_some());
    assert_eq!(h.holder(), None);
    assert_eq!(h.node.submission_count(), 0);
    assert_eq!(
        h.executor
            .metrics()
            .failure_count(ErrorClass::Construction),
        1
    );
}

#[tokio::test]
async fn unknown_source_address_is_a_construction_error() {
    let h = Harness::new(3);
    let stranger = AddressDetails::derive(
        &tangle_crypto::generate_mnemonic().unwrap(),
        Network::Rms,
    )
    .unwrap();
    let record = TransactionRecord::new(
        "tx-1",
        WorkflowType::Payment,
        Network::Rms,
        RequestPayload {
            source_address: stranger.bech32().to_string(),
            amount: 1_000_000,
            ..Default::default()
        },
        Timestamp::new(0),
    );
    h.store.insert_transaction(&record).unwrap();

    assert_eq!(h.executor.process("tx-1").await.unwrap(), Outcome::Abandoned);
}

#[tokio::test]
async fn unconfigured_network_abandons() {
    let h = Harness::new(3);
    let mut record = h.payment("tx-1", 1_000_000);
    record.network = Network::Smr;
    h.store
        .update_transaction("tx-1", &mut |r| {
            *r = record.clone();
            true
        })
        .unwrap();

    assert_eq!(h.executor.process("tx-1").await.unwrap(), Outcome::Abandoned);
    assert!(h
        .record("tx-1")
        .wallet_reference
        .error
        .unwrap()
        .contains("not configured"));
}

#[tokio::test]
async fn stale_submission_resumes_tracking() {
    let h = Harness::new(3);
    h.node.fund(h.source.address(), 10_000_000);
    h.payment("tx-1", 1_000_000);
    h.node.set_next_inclusion(InclusionState::Pending);
    let block_id = submitted(h.executor.process("tx-1").await.unwrap());

    // Triggering again while the block is outstanding does nothing.
    assert_eq!(
        h.executor.process("tx-1").await.unwrap(),
        Outcome::Skipped("not due")
    );

    let scheduler = RetryScheduler::new(
        h.store.clone(),
        h.clock.clone(),
        h.executor.metrics().clone(),
        600,
    );
    assert!(scheduler.sweep_stale(600).unwrap().is_empty());
    h.clock.advance(601);
    assert_eq!(scheduler.sweep_stale(600).unwrap(), vec!["tx-1".to_string()]);

    assert_eq!(
        h.executor.process("tx-1").await.unwrap(),
        Outcome::Tracking {
            block_id,
            node_index: Some(0)
        }
    );
    let record = h.record("tx-1");
    assert!(!record.should_retry);
    assert_eq!(record.wallet_reference.attempt_count, 1);

    h.node.set_inclusion(block_id, InclusionState::Included);
    assert_eq!(
        h.executor.track("tx-1", block_id, Some(0)).await.unwrap(),
        Outcome::Confirmed { block_id }
    );
}

#[tokio::test]
async fn inclusion_timeout_is_retryable() {
    let h = Harness::new(3);
    h.node.fund(h.source.address(), 10_000_000);
    h.payment("tx-1", 1_000_000);
    h.node.set_next_inclusion(InclusionState::Pending);
    let block_id = submitted(h.executor.process("tx-1").await.unwrap());

    assert_eq!(
        h.executor.track("tx-1", block_id, Some(0)).await.unwrap(),
        Outcome::Failed {
            class: ErrorClass::Network
        }
    );
    let record = h.record("tx-1");
    assert!(record.should_retry);
    assert!(record
        .wallet_reference
        .error
        .unwrap()
        .contains("not included"));

    // The block lands after all; the retry notices instead of resubmitting.
    h.node.set_inclusion(block_id, InclusionState::Included);
    assert_eq!(
        h.executor.process("tx-1").await.unwrap(),
        Outcome::Confirmed { block_id }
    );
    assert_eq!(h.node.submission_count(), 1);
}

#[tokio::test]
async fn late_verdict_on_an_old_block_is_ignored() {
    let h = Harness::new(3);
    h.node.fund(h.source.address(), 10_000_000);
    h.payment("tx-1", 1_000_000);
    h.node.set_next_inclusion(InclusionState::Conflicting);
    let first = submitted(h.executor.process("tx-1").await.unwrap());
    h.executor.track("tx-1", first, Some(0)).await.unwrap();

    h.node.set_next_inclusion(InclusionState::Pending);
    let second = submitted(h.executor.process("tx-1").await.unwrap());

    assert_eq!(
        h.executor.track("tx-1", first, Some(0)).await.unwrap(),
        Outcome::Skipped("stale failure")
    );
    let record = h.record("tx-1");
    assert_eq!(record.wallet_reference.chain_reference, Some(second));
    assert_eq!(h.holder().as_deref(), Some("tx-1"));
}

#[test]
fn error_classes_drive_retry() {
    let network: EngineError = WalletError::Node("down".into()).into();
    assert!(network.class().is_retryable());
    let conflict = EngineError::ReservationConflict("tx-1".into());
    assert_eq!(conflict.class(), ErrorClass::ReservationConflict);
}
