use std::sync::Arc;

use tangle_crypto::AddressDetails;
use tangle_nullables::NullStore;
use tangle_store::{RequestPayload, TransactionRecord, WorkflowDetails, WorkflowType};
use tangle_transactions::{
    AliasOutputSpec, BasicOutput, Feature, InputSelection, NftOutputSpec, Output, OutputPacker,
    TransactionError,
};
use tangle_types::{
    AliasId, Network, NftId, OutputId, ProtocolParams, Timestamp, TokenId, TransactionId,
    SIMPLE_TOKEN_SCHEME_KIND,
};
use tangle_wallet::ShimmerAddressService;

use super::*;
use crate::ErrorClass;

const SOURCE: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon art";
const OTHER: &str = "legal winner thank year wave sausage worth useful legal winner thank year wave sausage worth useful legal winner thank year wave sausage worth title";

struct Fixture {
    packer: OutputPacker,
    addresses: ShimmerAddressService,
    source: AddressDetails,
    other: AddressDetails,
}

impl Fixture {
    fn new() -> Self {
        let secrets = Arc::new(NullStore::default());
        Self {
            packer: OutputPacker::new(ProtocolParams::for_network(Network::Rms)),
            addresses: ShimmerAddressService::new(Network::Rms, secrets).unwrap(),
            source: AddressDetails::derive(SOURCE, Network::Rms).unwrap(),
            other: AddressDetails::derive(OTHER, Network::Rms).unwrap(),
        }
    }

    fn record(&self, workflow_type: WorkflowType, payload: RequestPayload) -> TransactionRecord {
        TransactionRecord::new("tx-1", workflow_type, Network::Rms, payload, Timestamp::new(0))
    }

    fn payload(&self, amount: u64) -> RequestPayload {
        RequestPayload {
            source_address: self.source.bech32().to_string(),
            target_address: Some(self.other.bech32().to_string()),
            amount,
            ..Default::default()
        }
    }

    fn build(
        &self,
        record: &TransactionRecord,
        funder: Option<&AddressDetails>,
        available: &InputSelection,
    ) -> Result<TransactionPlan, EngineError> {
        self.build_governed(record, funder, None, available)
    }

    fn build_governed(
        &self,
        record: &TransactionRecord,
        funder: Option<&AddressDetails>,
        governor: Option<&AddressDetails>,
        available: &InputSelection,
    ) -> Result<TransactionPlan, EngineError> {
        let ctx = BuildContext {
            record,
            packer: &self.packer,
            addresses: &self.addresses,
            source: &self.source,
            funder,
            governor,
            available,
        };
        WorkflowRegistry::with_defaults()
            .get(record.workflow_type)?
            .build(&ctx)
    }
}

fn oid(tx: u8, index: u16) -> OutputId {
    OutputId::new(TransactionId::new([tx; 32]), index)
}

fn plain(details: &AddressDetails, amount: u64) -> Output {
    Output::Basic(BasicOutput::plain(details.address(), amount))
}

fn total(outputs: &[Output]) -> u64 {
    outputs.iter().map(Output::amount).sum()
}

#[test]
fn registry_covers_every_workflow() {
    let registry = WorkflowRegistry::with_defaults();
    for t in WorkflowType::ALL {
        assert!(registry.contains(t), "{t} has no builder");
    }
    assert!(matches!(
        WorkflowRegistry::new().get(WorkflowType::Payment),
        Err(EngineError::UnknownWorkflow(WorkflowType::Payment))
    ));
}

#[test]
fn payment_raises_to_minimum_and_returns_change() {
    let f = Fixture::new();
    let available = InputSelection::new(vec![
        (oid(1, 0), plain(&f.source, 600_000)),
        (oid(2, 0), plain(&f.source, 400_000)),
    ])
    .unwrap();
    let record = f.record(WorkflowType::Payment, f.payload(1_000));

    let plan = f.build(&record, None, &available).unwrap();
    let minimum = f.packer.min_deposit(&plan.outputs[0]).unwrap();
    assert_eq!(plan.outputs[0].amount(), minimum.max(1_000));
    assert_eq!(plan.outputs[0].owner(), Some(f.other.address()));
    assert_eq!(plan.outputs[1].amount(), 600_000 - plan.outputs[0].amount());
    // the first output already covers payment and change
    assert_eq!(plan.inputs.len(), 1);
    assert_eq!(plan.inputs[0].0, oid(1, 0));
    assert_eq!(total(&plan.outputs), 600_000);
}

#[test]
fn payment_takes_more_outputs_until_change_is_viable() {
    let f = Fixture::new();
    let available = InputSelection::new(vec![
        (oid(1, 0), plain(&f.source, 600_000)),
        (oid(2, 0), plain(&f.source, 400_000)),
    ])
    .unwrap();
    let record = f.record(WorkflowType::Payment, f.payload(590_000));

    let plan = f.build(&record, None, &available).unwrap();
    assert_eq!(plan.inputs.len(), 2);
    assert_eq!(plan.outputs[0].amount(), 590_000);
    assert_eq!(plan.outputs[1].amount(), 410_000);
}

#[test]
fn payment_from_many_small_outputs_stays_under_input_limit() {
    let f = Fixture::new();
    let outputs = (0..200u16)
        .map(|i| (oid(1, i), plain(&f.source, 100_000)))
        .collect();
    let available = InputSelection::new(outputs).unwrap();
    let record = f.record(WorkflowType::Payment, f.payload(5_000_000));

    let plan = f.build(&record, None, &available).unwrap();
    assert!(plan.inputs.len() <= tangle_transactions::MAX_INPUTS);
    assert_eq!(plan.inputs.len(), 50);
    assert_eq!(total(&plan.outputs), 5_000_000);
    plan.selection().unwrap();
}

#[test]
fn payment_beyond_input_limit_is_a_construction_error() {
    let f = Fixture::new();
    let outputs = (0..200u16)
        .map(|i| (oid(1, i), plain(&f.source, 100_000)))
        .collect();
    let available = InputSelection::new(outputs).unwrap();
    // reachable with 150 inputs, but only 128 may be spent at once
    let record = f.record(WorkflowType::Payment, f.payload(15_000_000));

    let err = f.build(&record, None, &available).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Transaction(TransactionError::InsufficientFunds { .. })
    ));
    assert_eq!(err.class(), ErrorClass::Construction);
}

#[test]
fn payment_ignores_conditioned_and_foreign_outputs() {
    let f = Fixture::new();
    let mut locked = BasicOutput::plain(f.source.address(), 5_000_000);
    locked
        .unlock_conditions
        .push(tangle_transactions::UnlockCondition::Timelock { unix_time: 4_000_000_000 });
    let available = InputSelection::new(vec![
        (oid(1, 0), Output::Basic(locked)),
        (oid(2, 0), plain(&f.other, 5_000_000)),
        (oid(3, 0), plain(&f.source, 1_000_000)),
    ])
    .unwrap();
    let record = f.record(WorkflowType::Credit, f.payload(100_000));

    let plan = f.build(&record, None, &available).unwrap();
    assert_eq!(plan.inputs.len(), 1);
    assert_eq!(plan.inputs[0].0, oid(3, 0));
}

#[test]
fn payment_without_funds_is_a_construction_error() {
    let f = Fixture::new();
    let available = InputSelection::new(vec![(oid(1, 0), plain(&f.source, 100_000))]).unwrap();
    let record = f.record(WorkflowType::Payment, f.payload(5_000_000));

    let err = f.build(&record, None, &available).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Transaction(TransactionError::InsufficientFunds { .. })
    ));
    assert_eq!(err.class(), ErrorClass::Construction);
}

#[test]
fn storage_deposit_source_pays_the_deposit() {
    let f = Fixture::new();
    let funder = AddressDetails::derive(
        "zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo wrong",
        Network::Rms,
    )
    .unwrap();
    let available = InputSelection::new(vec![
        (oid(1, 0), plain(&f.source, 1_000_000)),
        (oid(2, 0), plain(&funder, 1_000_000)),
    ])
    .unwrap();
    let mut payload = f.payload(0);
    payload.storage_deposit_source_address = Some(funder.bech32().to_string());
    let record = f.record(WorkflowType::Payment, payload);

    let plan = f.build(&record, Some(&funder), &available).unwrap();
    let output = &plan.outputs[0];
    let minimum = f.packer.min_deposit(output).unwrap();
    assert_eq!(output.amount(), minimum);
    assert_eq!(output.storage_deposit_return(), Some((funder.address(), minimum)));
    // the source owes nothing, so only the funder's output is consumed
    assert_eq!(plan.inputs, vec![(oid(2, 0), plain(&funder, 1_000_000))]);
    assert_eq!(total(&plan.outputs), 1_000_000);
}

#[test]
fn storage_deposit_source_adds_exactly_the_refunded_deposit() {
    let f = Fixture::new();
    let funder = AddressDetails::derive(
        "zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo wrong",
        Network::Rms,
    )
    .unwrap();
    let available = InputSelection::new(vec![
        (oid(1, 0), plain(&f.source, 2_000_000)),
        (oid(2, 0), plain(&funder, 1_000_000)),
    ])
    .unwrap();
    let mut payload = f.payload(1_000_000);
    payload.storage_deposit_source_address = Some(funder.bech32().to_string());
    let record = f.record(WorkflowType::Payment, payload);

    let plan = f.build(&record, Some(&funder), &available).unwrap();
    let output = &plan.outputs[0];
    let (return_address, refund) = output.storage_deposit_return().unwrap();
    assert_eq!(return_address, funder.address());
    assert_eq!(refund, f.packer.min_deposit(output).unwrap());
    assert_eq!(output.amount(), 1_000_000 + refund);

    let owned_by = |details: &AddressDetails| -> u64 {
        plan.outputs[1..]
            .iter()
            .filter(|o| o.owner() == Some(details.address()))
            .map(Output::amount)
            .sum()
    };
    // the source pays the requested amount, the funder only what it gets back
    assert_eq!(2_000_000 - owned_by(&f.source), 1_000_000);
    assert_eq!(1_000_000 - owned_by(&funder), refund);
    assert_eq!(total(&plan.outputs), 3_000_000);
}

#[test]
fn vesting_and_expiration_become_conditions() {
    let f = Fixture::new();
    let available = InputSelection::new(vec![(oid(1, 0), plain(&f.source, 2_000_000))]).unwrap();
    let mut payload = f.payload(500_000);
    payload.vesting_at = Some(Timestamp::new(1_800_000_000));
    payload.expiration = Some(tangle_store::ExpirationRequest {
        return_address: f.source.bech32().to_string(),
        at: Timestamp::new(1_900_000_000),
    });
    payload.tag = Some(b"stake".to_vec());
    let record = f.record(WorkflowType::Stake, payload);

    let plan = f.build(&record, None, &available).unwrap();
    let conditions = plan.outputs[0].unlock_conditions();
    assert!(conditions.contains(&tangle_transactions::UnlockCondition::Timelock {
        unix_time: 1_800_000_000
    }));
    assert!(conditions.contains(&tangle_transactions::UnlockCondition::Expiration {
        return_address: f.source.address(),
        unix_time: 1_900_000_000,
    }));
    assert!(plan.outputs[0].features().contains(&Feature::Tag(b"stake".to_vec())));
}

#[test]
fn mint_collection_moves_alias_forward() {
    let f = Fixture::new();
    let alias_output_id = oid(7, 0);
    let alias = f.packer.pack_alias(&AliasOutputSpec::mint(f.source.address())).unwrap();
    let alias_id = AliasId::from_output_id(&alias_output_id);
    let available = InputSelection::new(vec![
        (alias_output_id, alias),
        (oid(1, 0), plain(&f.source, 2_000_000)),
    ])
    .unwrap();
    let mut payload = f.payload(0);
    payload.details = Some(WorkflowDetails::Collection {
        alias_id,
        immutable_metadata: br#"{"name":"collection"}"#.to_vec(),
    });
    let record = f.record(WorkflowType::MintCollection, payload);

    let plan = f.build(&record, None, &available).unwrap();
    let Output::Alias(next) = &plan.outputs[0] else {
        panic!("first output must be the alias");
    };
    assert_eq!(next.alias_id, alias_id);
    assert_eq!(next.state_index, 1);
    let Output::Nft(collection) = &plan.outputs[1] else {
        panic!("second output must be the collection");
    };
    assert!(collection
        .immutable_features
        .contains(&Feature::Issuer(tangle_types::Address::Alias(alias_id))));
    assert_eq!(plan.inputs[0].0, alias_output_id);
    assert_eq!(
        total(&plan.outputs),
        plan.inputs.iter().map(|(_, o)| o.amount()).sum::<u64>()
    );
}

#[test]
fn mint_collection_requires_controlled_alias() {
    let f = Fixture::new();
    let available = InputSelection::new(vec![(oid(1, 0), plain(&f.source, 2_000_000))]).unwrap();
    let mut payload = f.payload(0);
    payload.details = Some(WorkflowDetails::Collection {
        alias_id: AliasId::new([3; 32]),
        immutable_metadata: vec![],
    });
    let record = f.record(WorkflowType::MintCollection, payload);
    let err = f.build(&record, None, &available).unwrap_err();
    assert!(matches!(err, EngineError::Request(_)));
}

#[test]
fn mint_collection_from_alias_of_the_governor() {
    let f = Fixture::new();
    let alias_output_id = oid(7, 0);
    let alias = f.packer.pack_alias(&AliasOutputSpec::mint(f.other.address())).unwrap();
    let alias_id = AliasId::from_output_id(&alias_output_id);
    let available = InputSelection::new(vec![
        (alias_output_id, alias),
        (oid(1, 0), plain(&f.source, 2_000_000)),
    ])
    .unwrap();
    let mut payload = f.payload(0);
    payload.alias_governor_address = Some(f.other.bech32().to_string());
    payload.details = Some(WorkflowDetails::Collection {
        alias_id,
        immutable_metadata: br#"{"name":"collection"}"#.to_vec(),
    });
    let record = f.record(WorkflowType::MintCollection, payload);

    // without the governor the source does not control the alias
    let err = f.build(&record, None, &available).unwrap_err();
    assert!(matches!(err, EngineError::Request(_)));

    let plan = f.build_governed(&record, None, Some(&f.other), &available).unwrap();
    assert_eq!(plan.inputs[0].0, alias_output_id);
    assert_eq!(plan.outputs[0].owner(), Some(f.other.address()));
    // the collection's deposit still comes from the source
    assert_eq!(plan.inputs[1].0, oid(1, 0));
}

#[test]
fn mismatched_details_rejected() {
    let f = Fixture::new();
    let available = InputSelection::new(vec![(oid(1, 0), plain(&f.source, 2_000_000))]).unwrap();
    let mut payload = f.payload(0);
    payload.details = Some(WorkflowDetails::Alias {
        state_metadata: vec![],
        immutable_metadata: None,
    });
    let record = f.record(WorkflowType::MintNft, payload);
    assert!(matches!(
        f.build(&record, None, &available),
        Err(EngineError::Request(_))
    ));
}

#[test]
fn metadata_update_keeps_immutable_features() {
    let f = Fixture::new();
    let nft_output_id = oid(8, 1);
    let mut spec = NftOutputSpec::mint(f.source.address());
    spec.immutable_metadata = Some(b"forever".to_vec());
    spec.metadata = Some(b"v1".to_vec());
    let nft = f.packer.pack_nft(&spec).unwrap();
    let nft_id = NftId::from_output_id(&nft_output_id);
    let available = InputSelection::new(vec![
        (nft_output_id, nft),
        (oid(1, 0), plain(&f.source, 2_000_000)),
    ])
    .unwrap();
    let mut payload = f.payload(0);
    payload.target_address = None;
    payload.details = Some(WorkflowDetails::NftMetadata {
        nft_id,
        metadata: b"version two, somewhat longer than the first one".to_vec(),
    });
    let record = f.record(WorkflowType::UpdateNftMetadata, payload);

    let plan = f.build(&record, None, &available).unwrap();
    let updated = &plan.outputs[0];
    assert_eq!(updated.immutable_metadata(), Some(&b"forever"[..]));
    assert_eq!(
        updated.metadata(),
        Some(&b"version two, somewhat longer than the first one"[..])
    );
    assert_eq!(updated.owner(), Some(f.source.address()));
    assert_eq!(
        total(&plan.outputs),
        plan.inputs.iter().map(|(_, o)| o.amount()).sum::<u64>()
    );
}

#[test]
fn mint_token_sends_supply_to_target() {
    let f = Fixture::new();
    let alias_output_id = oid(9, 0);
    let alias = f.packer.pack_alias(&AliasOutputSpec::mint(f.source.address())).unwrap();
    let alias_id = AliasId::from_output_id(&alias_output_id);
    let available = InputSelection::new(vec![
        (alias_output_id, alias),
        (oid(1, 0), plain(&f.source, 5_000_000)),
    ])
    .unwrap();
    let mut payload = f.payload(0);
    payload.details = Some(WorkflowDetails::Token {
        alias_id,
        minted: 1_000,
        maximum_supply: 10_000,
        metadata: None,
    });
    let record = f.record(WorkflowType::MintToken, payload);

    let plan = f.build(&record, None, &available).unwrap();
    let Output::Alias(next) = &plan.outputs[0] else {
        panic!("first output must be the alias");
    };
    assert_eq!(next.foundry_counter, 1);
    let Output::Foundry(foundry) = &plan.outputs[1] else {
        panic!("second output must be the foundry");
    };
    assert_eq!(foundry.serial_number, 1);
    let token_id = TokenId::from_foundry(alias_id, 1, SIMPLE_TOKEN_SCHEME_KIND);
    assert_eq!(plan.outputs[2].native_tokens().get(&token_id), 1_000);
    assert_eq!(plan.outputs[2].owner(), Some(f.other.address()));
}
