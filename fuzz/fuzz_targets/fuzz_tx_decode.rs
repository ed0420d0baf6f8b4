#![no_main]

use libfuzzer_sys::fuzz_target;

// Decoding arbitrary bytes as a transaction must never panic, and anything
// that decodes must encode back to a decodable transaction.
fuzz_target!(|data: &[u8]| {
    if let Ok(tx) = shutter_messages::decode_tx(data) {
        let _ = tx.verify();
        let encoded = shutter_messages::encode_tx(&tx).expect("decoded tx re-encodes");
        let again = shutter_messages::decode_tx(&encoded).expect("re-encoded tx decodes");
        assert_eq!(again, tx);
    }
});
