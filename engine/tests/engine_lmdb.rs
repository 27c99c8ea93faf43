use std::sync::Arc;
use std::time::Duration;

use tangle_crypto::AddressDetails;
use tangle_engine::{
    Engine, EngineConfig, EngineError, ErrorClass, NetworkContext, Networks, ShutdownController,
};
use tangle_nullables::{NullClock, NullNode};
use tangle_store::{RequestPayload, SecretStore, TransactionRecord, WorkflowType};
use tangle_store_lmdb::LmdbEnvironment;
use tangle_types::{Network, Timestamp};
use tangle_wallet::{EndpointPool, NodeApi};

const SOURCE: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon art";

struct Setup {
    _dir: tempfile::TempDir,
    engine: Engine,
    node: Arc<NullNode>,
    source: AddressDetails,
}

fn setup() -> Setup {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(LmdbEnvironment::open(dir.path(), 8, 1 << 24).unwrap());
    let source = AddressDetails::derive(SOURCE, Network::Smr).unwrap();
    store.store_mnemonic(source.bech32(), SOURCE).unwrap();

    let node = Arc::new(NullNode::new(Network::Smr));
    let api: Arc<dyn NodeApi> = node.clone();
    let pool = EndpointPool::new(Network::Smr, vec![api], 2);
    let networks = Networks::new().with(NetworkContext::new(pool, store.clone()));
    let config = EngineConfig {
        inclusion_poll_interval_ms: 1,
        inclusion_max_attempts: 5,
        ..EngineConfig::default()
    };
    let engine = Engine::new(config, store, networks, Arc::new(NullClock::new(1_700_000_000))).unwrap();
    Setup {
        _dir: dir,
        engine,
        node,
        source,
    }
}

fn payment(id: &str, source: &AddressDetails, target: &AddressDetails) -> TransactionRecord {
    TransactionRecord::new(
        id,
        WorkflowType::Payment,
        Network::Smr,
        RequestPayload {
            source_address: source.bech32().to_string(),
            target_address: Some(target.bech32().to_string()),
            amount: 2_000_000,
            ..Default::default()
        },
        Timestamp::new(1_700_000_000),
    )
}

/// Poll until `id` is confirmed. A request that lost a reservation race
/// waits for the sweep, so it is re-triggered now and then instead.
async fn wait_until_confirmed(engine: &Engine, id: &str) -> TransactionRecord {
    for round in 1..=300 {
        let record = engine.status(id).unwrap();
        if record.wallet_reference.confirmed {
            return record;
        }
        if round % 20 == 0 {
            engine.trigger(id).await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("{id} was not confirmed");
}

#[tokio::test]
async fn requests_run_to_confirmation_through_the_dispatcher() {
    let mut s = setup();
    s.node.fund(s.source.address(), 20_000_000);
    let target = s.engine.new_address(Network::Smr).unwrap();

    let shutdown = ShutdownController::new();
    let handles = s.engine.start(&shutdown).unwrap();
    assert!(s.engine.start(&shutdown).is_err());

    s.engine
        .submit_request(payment("tx-1", &s.source, &target))
        .await
        .unwrap();
    s.engine
        .submit_request(payment("tx-2", &s.source, &target))
        .await
        .unwrap();

    let first = wait_until_confirmed(&s.engine, "tx-1").await;
    let second = wait_until_confirmed(&s.engine, "tx-2").await;
    assert_eq!(first.wallet_reference.attempt_count, 1);
    assert_eq!(second.wallet_reference.attempt_count, 1);

    assert_eq!(s.node.balance(&target.address()).await.unwrap().amount, 4_000_000);
    assert_eq!(s.engine.metrics().confirmations.get(), 2);
    assert!(s.engine.executor().reservations().locked().unwrap().is_empty());

    shutdown.shutdown();
    for handle in handles {
        handle.await.unwrap();
    }
}

#[tokio::test]
async fn invalid_requests_are_rejected_before_storing() {
    let s = setup();
    let stranger = AddressDetails::derive(
        &tangle_crypto::generate_mnemonic().unwrap(),
        Network::Smr,
    )
    .unwrap();

    let err = s
        .engine
        .submit_request(payment("tx-1", &stranger, &s.source))
        .await
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::Construction);
    assert!(s.engine.status("tx-1").is_err());

    let mut wrong_network = payment("tx-2", &s.source, &s.source);
    wrong_network.network = Network::Iota;
    assert!(matches!(
        s.engine.submit_request(wrong_network).await,
        Err(EngineError::NetworkNotConfigured(Network::Iota))
    ));

    let mut bad_target = payment("tx-3", &s.source, &s.source);
    bad_target.payload.target_address = Some("rms1notanaddress".into());
    assert!(s.engine.submit_request(bad_target).await.is_err());
}

#[tokio::test]
async fn dependent_request_runs_after_clearing() {
    let mut s = setup();
    s.node.fund(s.source.address(), 20_000_000);
    let target = s.engine.new_address(Network::Smr).unwrap();
    let shutdown = ShutdownController::new();
    let handles = s.engine.start(&shutdown).unwrap();

    let mut credit = payment("credit-1", &s.source, &target);
    credit.workflow_type = WorkflowType::Credit;
    credit.depends_on_bill_payment = true;
    s.engine.submit_request(credit).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(
        s.engine.status("credit-1").unwrap().wallet_reference.attempt_count,
        0
    );

    assert!(s.engine.clear_bill_payment_dependency("credit-1").await.unwrap());
    wait_until_confirmed(&s.engine, "credit-1").await;

    shutdown.shutdown();
    for handle in handles {
        handle.await.unwrap();
    }
}

#[test]
fn open_creates_a_fresh_store() {
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig {
        data_dir: dir.path().join("db"),
        ..EngineConfig::default()
    };
    let engine = Engine::open(config.clone()).unwrap();
    assert!(engine.status("missing").is_err());
    assert!(engine.sweep_once().unwrap().is_empty());
    drop(engine);

    // Reopening runs the schema check against the stored version.
    Engine::open(config).unwrap();
}
