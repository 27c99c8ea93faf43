#![no_main]

use libfuzzer_sys::fuzz_target;
use tangle_transactions::codec_for;
use tangle_types::Network;

fuzz_target!(|data: &[u8]| {
    // First byte picks the network so the corpus covers both families.
    let Some((&selector, rest)) = data.split_first() else {
        return;
    };
    let network = Network::ALL[selector as usize % Network::ALL.len()];
    let codec = codec_for(network);
    if let Ok(block) = codec.decode_block(rest) {
        if let Ok(encoded) = codec.encode_block(&block) {
            let again = codec.decode_block(&encoded).expect("re-encoded block must decode");
            assert_eq!(again, block);
        }
    }
});
