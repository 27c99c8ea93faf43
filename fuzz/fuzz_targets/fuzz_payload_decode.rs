#![no_main]

use libfuzzer_sys::fuzz_target;
use tangle_transactions::codec_for;
use tangle_types::Network;

fuzz_target!(|data: &[u8]| {
    for network in [Network::Atoi, Network::Rms] {
        let codec = codec_for(network);
        let Ok(payload) = codec.decode_payload(data) else {
            continue;
        };
        // The essence hash is what signatures cover; it must be computable
        // for anything that decoded.
        let _ = codec.essence_hash(&payload.essence);
        if let Ok(encoded) = codec.encode_payload(&payload) {
            let again = codec.decode_payload(&encoded).expect("re-encoded payload must decode");
            assert_eq!(again, payload);
        }
    }
});
