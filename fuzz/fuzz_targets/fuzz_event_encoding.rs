#![no_main]

use libfuzzer_sys::fuzz_target;

// Event key encoding is a bijection: bytes survive a round trip, and any
// string that decodes is the canonical encoding of its bytes.
fuzz_target!(|data: &[u8]| {
    let encoded = shutter_crypto::encode_key_for_event(data);
    assert_eq!(shutter_crypto::decode_key_from_event(&encoded).as_deref(), Ok(data));

    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(bytes) = shutter_crypto::decode_key_from_event(text) {
            assert_eq!(shutter_crypto::encode_key_for_event(&bytes), text);
        }
    }
});
