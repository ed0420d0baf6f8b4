use proptest::prelude::*;

use shutter_crypto::{
    decode_key_from_event, derive_address, encode_key_for_event, keypair_from_seed,
    sign_message, verify_signature, EVENT_ALPHABET,
};

proptest! {
    /// decode(encode(k)) == k for arbitrary key material.
    #[test]
    fn event_encoding_roundtrip(key in prop::collection::vec(0u8.., 0..128)) {
        let encoded = encode_key_for_event(&key);
        prop_assert_eq!(decode_key_from_event(&encoded).unwrap(), key);
    }

    /// Encodings only use the event alphabet, hence are valid UTF-8 text.
    #[test]
    fn event_encoding_alphabet(key in prop::collection::vec(0u8.., 0..128)) {
        let encoded = encode_key_for_event(&key);
        prop_assert!(encoded.bytes().all(|b| EVENT_ALPHABET.contains(&b)));
    }

    /// Any string that decodes re-encodes to itself (canonical form).
    #[test]
    fn event_decoding_is_canonical(s in "[13456789a-kmnopqrstuwxyz]{0,40}") {
        if let Ok(bytes) = decode_key_from_event(&s) {
            prop_assert_eq!(encode_key_for_event(&bytes), s);
        }
    }

    /// Distinct keys never share an encoding.
    #[test]
    fn event_encoding_injective(
        a in prop::collection::vec(0u8.., 0..40),
        b in prop::collection::vec(0u8.., 0..40),
    ) {
        prop_assume!(a != b);
        prop_assert_ne!(encode_key_for_event(&a), encode_key_for_event(&b));
    }

    /// Signatures verify for the signer and the derived address is stable.
    #[test]
    fn sign_verify_any_message(seed in prop::array::uniform32(0u8..), msg in prop::collection::vec(0u8.., 0..256)) {
        let kp = keypair_from_seed(&seed);
        let sig = sign_message(&msg, &kp.private);
        prop_assert!(verify_signature(&msg, &sig, &kp.public));
        prop_assert_eq!(derive_address(&kp.public), derive_address(&kp.public));
    }
}
