use std::sync::Arc;
use std::time::Duration;

use tangle_crypto::AddressDetails;
use tangle_nullables::NullNode;
use tangle_transactions::{build_transaction, BasicOutput, Output};
use tangle_types::{InclusionState, Network, ProtocolParams};
use tangle_wallet::{
    await_inclusion, get_outputs, submit_payload, EndpointPool, InclusionPolicy, NodeApi,
    WalletError,
};

const MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon art";

fn fast_policy(max_attempts: u32) -> InclusionPolicy {
    InclusionPolicy {
        poll_interval: Duration::from_millis(1),
        max_attempts,
    }
}

#[tokio::test]
async fn pool_skips_unhealthy_nodes() {
    let sick = Arc::new(NullNode::with_url(Network::Rms, "null://sick"));
    sick.set_healthy(false);
    let well = Arc::new(NullNode::with_url(Network::Rms, "null://well"));
    let pool = EndpointPool::new(Network::Rms, vec![sick, well], 3);

    let (index, node) = pool.healthy(Some(0)).await.unwrap();
    assert_eq!(index, 1);
    assert_eq!(node.url(), "null://well");
}

#[tokio::test]
async fn pool_gives_up_after_max_attempts() {
    let sick = Arc::new(NullNode::new(Network::Smr));
    sick.set_healthy(false);
    let pool = EndpointPool::new(Network::Smr, vec![sick], 4);

    match pool.healthy(None).await {
        Err(WalletError::NoHealthyEndpoint { attempts, .. }) => assert_eq!(attempts, 4),
        other => panic!("expected NoHealthyEndpoint, got {:?}", other.map(|(i, _)| i)),
    }
}

#[tokio::test]
async fn empty_pool_has_no_endpoint() {
    let pool = EndpointPool::new(Network::Smr, Vec::new(), 4);
    assert!(matches!(
        pool.healthy(None).await,
        Err(WalletError::NoHealthyEndpoint { attempts: 0, .. })
    ));
}

#[tokio::test]
async fn get_outputs_ignores_spent() {
    let details = AddressDetails::derive(MNEMONIC, Network::Rms).unwrap();
    let node = NullNode::new(Network::Rms);
    let kept = node.fund(details.address(), 1_000_000);
    let spent = node.fund(details.address(), 2_000_000);
    node.mark_spent(&spent);

    let selection = get_outputs(&node, &details.address(), None).await.unwrap();
    assert_eq!(selection.output_ids(), vec![kept]);
    assert_eq!(selection.total_amount().unwrap(), 1_000_000);
}

#[tokio::test]
async fn retry_refetches_previous_inputs_in_order() {
    let details = AddressDetails::derive(MNEMONIC, Network::Rms).unwrap();
    let node = NullNode::new(Network::Rms);
    let a = node.fund(details.address(), 1_000_000);
    let b = node.fund(details.address(), 2_000_000);
    node.fund(details.address(), 3_000_000);

    let previous = [b, a];
    let selection = get_outputs(&node, &details.address(), Some(&previous))
        .await
        .unwrap();
    assert_eq!(selection.output_ids(), vec![b, a]);

    node.mark_spent(&a);
    assert!(matches!(
        get_outputs(&node, &details.address(), Some(&previous)).await,
        Err(WalletError::InputSpent(id)) if id == a
    ));
}

#[tokio::test]
async fn submitted_payment_is_included_and_applied() {
    let params = ProtocolParams::for_network(Network::Rms);
    let sender = AddressDetails::derive(MNEMONIC, Network::Rms).unwrap();
    let receiver = AddressDetails::derive(
        &tangle_crypto::generate_mnemonic().unwrap(),
        Network::Rms,
    )
    .unwrap();
    let node = NullNode::new(Network::Rms);
    node.fund(sender.address(), 5_000_000);

    let selection = get_outputs(&node, &sender.address(), None).await.unwrap();
    let outputs = vec![
        Output::Basic(BasicOutput::plain(receiver.address(), 1_000_000)),
        Output::Basic(BasicOutput::plain(sender.address(), 4_000_000)),
    ];
    let signed = build_transaction(&params, &selection, outputs, None, &[&sender]).unwrap();

    let block_id = submit_payload(&node, &params, signed.payload).await.unwrap();
    let state = await_inclusion(&node, &block_id, fast_policy(3)).await.unwrap();
    assert_eq!(state, InclusionState::Included);

    let received = node.balance(&receiver.address()).await.unwrap();
    assert_eq!(received.amount, 1_000_000);
    let change = node.balance(&sender.address()).await.unwrap();
    assert_eq!(change.amount, 4_000_000);
}

#[tokio::test]
async fn inclusion_polling_is_bounded() {
    let node = NullNode::new(Network::Smr);
    let block_id = tangle_types::BlockId::new([0x42; 32]);
    node.set_inclusion(block_id, InclusionState::Pending);

    match await_inclusion(&node, &block_id, fast_policy(3)).await {
        Err(WalletError::InclusionTimeout { attempts, .. }) => assert_eq!(attempts, 3),
        other => panic!("expected timeout, got {other:?}"),
    }

    node.set_inclusion(block_id, InclusionState::Conflicting);
    assert_eq!(
        await_inclusion(&node, &block_id, fast_policy(3)).await.unwrap(),
        InclusionState::Conflicting
    );
}
