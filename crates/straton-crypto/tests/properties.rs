//! Property tests for the pairwise cipher and wire formats.

use proptest::prelude::*;
use secrecy::SecretString;
use straton_crypto::{create_backup, derive_pairwise, open_backup, KeyPair};

fn cipher_pair() -> (straton_crypto::PairwiseCipher, straton_crypto::PairwiseCipher) {
    let a = KeyPair::generate();
    let b = KeyPair::generate();
    (
        derive_pairwise(a.secret(), b.public()).unwrap(),
        derive_pairwise(b.secret(), a.public()).unwrap(),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_text_roundtrip(plaintext in ".*") {
        let (ab, ba) = cipher_pair();
        let wire = ab.encrypt_text(&plaintext).unwrap();
        prop_assert_eq!(ba.decrypt_text(&wire).unwrap(), plaintext);
    }

    #[test]
    fn prop_bytes_roundtrip(data in proptest::collection::vec(any::<u8>(), 0..8192)) {
        let (ab, ba) = cipher_pair();
        let enc = ab.encrypt_bytes(&data).unwrap();
        prop_assert_eq!(ba.decrypt_bytes(&enc).unwrap(), data);
    }

    #[test]
    fn prop_legacy_passthrough(payload in "[^:]*") {
        let (ab, _) = cipher_pair();
        prop_assert_eq!(ab.decrypt_text(&payload).unwrap(), payload);
    }

    #[test]
    fn prop_ciphertext_tamper_detected(
        plaintext in ".+",
        flip_bit in 0usize..8,
    ) {
        let (ab, _) = cipher_pair();
        let wire = ab.encrypt_text(&plaintext).unwrap();

        let (iv_b64, ct_b64) = wire.split_once(':').unwrap();
        let mut ct = base64::Engine::decode(
            &base64::engine::general_purpose::STANDARD, ct_b64).unwrap();
        let last = ct.len() - 1;
        ct[last] ^= 1 << flip_bit;
        let iv = base64::Engine::decode(
            &base64::engine::general_purpose::STANDARD, iv_b64).unwrap();

        let tampered = format!(
            "{}:{}",
            base64::Engine::encode(&base64::engine::general_purpose::STANDARD, iv),
            base64::Engine::encode(&base64::engine::general_purpose::STANDARD, ct),
        );
        prop_assert!(ab.decrypt_text(&tampered).is_err());
    }
}

proptest! {
    // Backup round-trips run a full PBKDF2 derivation each case; keep the
    // case count low.
    #![proptest_config(ProptestConfig::with_cases(4))]

    #[test]
    fn prop_backup_roundtrip(seed in any::<[u8; 32]>()) {
        let pair = KeyPair::from_secret_bytes(seed);
        let secret = SecretString::from(hex::encode(seed));

        let backup = create_backup(&secret, &pair).unwrap();
        let restored = open_backup(&secret, &backup, &pair.public_export()).unwrap();
        prop_assert_eq!(restored.public_export(), pair.public_export());
        prop_assert_eq!(restored.secret().to_bytes(), pair.secret().to_bytes());
    }
}
