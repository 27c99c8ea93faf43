use proptest::prelude::*;

use tangle_types::{
    Address, AliasId, BlockId, Ed25519Address, NativeTokens, NftId, OutputId, Timestamp, TokenId,
    TransactionId,
};

fn token_id() -> impl Strategy<Value = TokenId> {
    (prop::array::uniform32(0u8..), 0u32..16)
        .prop_map(|(alias, serial)| TokenId::from_foundry(AliasId::new(alias), serial, 0))
}

proptest! {
    /// Output ids survive their text form for every index.
    #[test]
    fn output_id_text_roundtrip(tx in prop::array::uniform32(0u8..), index in 0u16..) {
        let id = OutputId::new(TransactionId::new(tx), index);
        prop_assert_eq!(id.to_string().parse::<OutputId>().unwrap(), id);
    }

    /// Block ids parse with or without the 0x prefix.
    #[test]
    fn block_id_prefix_optional(bytes in prop::array::uniform32(0u8..)) {
        let id = BlockId::new(bytes);
        let text = id.to_string();
        prop_assert_eq!(text.parse::<BlockId>().unwrap(), id);
        prop_assert_eq!(text[2..].parse::<BlockId>().unwrap(), id);
    }

    /// Derived chain ids differ for different output indexes.
    #[test]
    fn chain_ids_depend_on_index(tx in prop::array::uniform32(0u8..), a in 0u16..100, b in 100u16..200) {
        let tx = TransactionId::new(tx);
        prop_assert_ne!(
            NftId::from_output_id(&OutputId::new(tx, a)),
            NftId::from_output_id(&OutputId::new(tx, b))
        );
        prop_assert_ne!(
            AliasId::from_output_id(&OutputId::new(tx, a)),
            AliasId::from_output_id(&OutputId::new(tx, b))
        );
    }

    /// Packed addresses decode to the same address.
    #[test]
    fn address_packing(body in prop::array::uniform32(0u8..), kind in 0usize..3) {
        let addr = match kind {
            0 => Address::Ed25519(Ed25519Address(body)),
            1 => Address::Alias(AliasId::new(body)),
            _ => Address::Nft(NftId::new(body)),
        };
        prop_assert_eq!(Address::from_packed(&addr.to_packed()).unwrap(), addr);
    }

    /// Adding then subtracting the same amounts leaves an empty balance.
    #[test]
    fn native_tokens_add_sub_cancel(
        entries in prop::collection::vec((token_id(), 1u128..1_000_000), 0..10)
    ) {
        let mut tokens = NativeTokens::new();
        for (id, amount) in &entries {
            tokens.add(*id, *amount).unwrap();
        }
        for (id, amount) in &entries {
            prop_assert!(tokens.checked_sub(id, *amount));
        }
        prop_assert!(tokens.is_empty());
    }

    /// Native token balances survive bincode.
    #[test]
    fn native_tokens_bincode(entries in prop::collection::vec((token_id(), 0u128..), 0..8)) {
        let tokens: NativeTokens = entries.into_iter().collect();
        let bytes = bincode::serialize(&tokens).unwrap();
        let back: NativeTokens = bincode::deserialize(&bytes).unwrap();
        prop_assert_eq!(back, tokens);
    }

    /// elapsed_since saturates to zero when `now` precedes the timestamp.
    #[test]
    fn timestamp_elapsed_saturates(base in 1u64..1_000_000, delta in 0u64..1_000_000) {
        let earlier = Timestamp::new(base);
        let later = Timestamp::new(base + delta);
        prop_assert_eq!(earlier.elapsed_since(later), delta);
        prop_assert_eq!(later.elapsed_since(earlier), 0);
    }

    /// is_older_than agrees with manual arithmetic.
    #[test]
    fn timestamp_staleness(start in 0u64..500_000, age in 0u64..500_000, offset in 0u64..1_000_000) {
        let t = Timestamp::new(start);
        prop_assert_eq!(t.is_older_than(age, Timestamp::new(start + offset)), offset > age);
    }
}
