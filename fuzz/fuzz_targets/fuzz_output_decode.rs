#![no_main]

use libfuzzer_sys::fuzz_target;
use tangle_transactions::codec_for;
use tangle_types::Network;

// Decoding arbitrary bytes must never panic, and whatever decodes must
// survive a second trip through the same codec unchanged.
fuzz_target!(|data: &[u8]| {
    for network in [Network::Iota, Network::Smr] {
        let codec = codec_for(network);
        let Ok(output) = codec.decode_output(data) else {
            continue;
        };
        if let Ok(encoded) = codec.encode_output(&output) {
            let again = codec.decode_output(&encoded).expect("re-encoded output must decode");
            assert_eq!(again, output);
            assert_eq!(codec.output_len(&output).ok(), Some(encoded.len()));
        }
    }
});
