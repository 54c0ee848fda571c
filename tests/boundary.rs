//! End-to-end properties of the wallet core boundary.

use std::sync::Arc;

use keycell::{
    AuthFailure, Chain, CoreError, FormatError, MemoryStore, SecretKind, Settings, TxRequest,
    WalletCore,
};

const MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
const PRIVATE_KEY_HEX: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const CUSTOM_PHRASE: &str = "Tr4il-Mix!Vex0@Quz8#Lyn2";

fn cheap_settings() -> Settings {
    let mut s = Settings::default();
    s.unlock_memory_kib = 8_192;
    s.unlock_iterations = 1;
    s.vault_memory_kib = 8_192;
    s.vault_iterations = 1;
    s
}

fn unlocked_core() -> (WalletCore, keycell::Handle) {
    let core = WalletCore::new(cheap_settings(), Arc::new(MemoryStore::new()), "main").unwrap();
    core.enroll(b"unlock-pw-1", Some(b"911911")).unwrap();
    let master = core.unlock_password(b"unlock-pw-1").unwrap();
    (core, master)
}

#[test]
fn every_secret_kind_round_trips_exactly() {
    let raw_entropy = [0xA7u8; 32];
    let inputs: Vec<(SecretKind, Vec<u8>)> = vec![
        (SecretKind::Mnemonic, MNEMONIC.as_bytes().to_vec()),
        (SecretKind::PrivateKey, PRIVATE_KEY_HEX.as_bytes().to_vec()),
        (SecretKind::CustomPhrase, CUSTOM_PHRASE.as_bytes().to_vec()),
        (SecretKind::Raw, raw_entropy.to_vec()),
    ];

    for (kind, bytes) in inputs {
        let (core, master) = unlocked_core();
        let (secret, report) = core.ingest_secret(&bytes, kind).unwrap();
        assert!(report.valid, "{kind:?} should validate");
        assert!(report.entropy_bits > 0.0);

        let (session, addresses) = core.derive_session(secret).unwrap();
        assert!(!addresses.is_empty());

        let payload = core.finalize(session, master).unwrap();
        let revealed = core.decrypt_reveal(&payload, master).unwrap();
        assert_eq!(&*revealed, &bytes[..], "{kind:?} must round-trip exactly");
    }
}

#[test]
fn wrong_master_key_never_yields_plaintext() {
    let (core, master) = unlocked_core();
    let (secret, _) = core
        .ingest_secret(MNEMONIC.as_bytes(), SecretKind::Mnemonic)
        .unwrap();
    let (session, _) = core.derive_session(secret).unwrap();
    let payload = core.finalize(session, master).unwrap();

    // A second profile with a different password on the same payload.
    let other = WalletCore::new(cheap_settings(), Arc::new(MemoryStore::new()), "other").unwrap();
    other.enroll(b"different-pw", None).unwrap();
    let wrong_master = other.unlock_password(b"different-pw").unwrap();

    let err = other.decrypt_reveal(&payload, wrong_master).unwrap_err();
    assert!(matches!(
        err,
        CoreError::Auth(AuthFailure::IntegrityCheckFailed)
    ));
}

#[test]
fn unknown_versions_and_tags_fail_closed() {
    let (core, master) = unlocked_core();

    for input in [
        "W9:000000000000000000000000:AAAA",
        "V9:3:65536:00:000000000000000000000000:AAAA",
        "Z1:whatever",
        "W1:tooshort",
        "",
    ] {
        let err = core.decrypt_reveal(input, master).unwrap_err();
        assert!(
            matches!(err, CoreError::Format(_)),
            "{input:?} must be a format error, got {err}"
        );
    }

    assert!(matches!(
        keycell::payload::decode("V2:3:65536:00:000000000000000000000000:AAAA").unwrap_err(),
        CoreError::Format(FormatError::VersionUnsupported {
            family: 'V',
            version: 2
        })
    ));
}

#[test]
fn vault_payload_round_trips_and_rejects_wrong_password() {
    let core = WalletCore::new(cheap_settings(), Arc::new(MemoryStore::new()), "main").unwrap();

    let note = "backup contact sheet \u{1F511}";
    let encoded = core.vault_encrypt(note.as_bytes(), b"vault-pw").unwrap();
    assert!(encoded.starts_with("V1:"));

    let plaintext = core.vault_decrypt(&encoded, b"vault-pw").unwrap();
    assert_eq!(&*plaintext, note.as_bytes());

    assert!(matches!(
        core.vault_decrypt(&encoded, b"not-the-pw").unwrap_err(),
        CoreError::Auth(AuthFailure::IntegrityCheckFailed)
    ));
}

#[test]
fn cooldown_is_non_decreasing_and_success_resets() {
    let core = WalletCore::new(cheap_settings(), Arc::new(MemoryStore::new()), "main").unwrap();
    core.enroll(b"unlock-pw-1", None).unwrap();

    let mut last_deadline = None;
    let mut cooldown_seen = 0;
    for _ in 0..6 {
        match core.unlock_password(b"wrong-pw") {
            Err(CoreError::Auth(AuthFailure::BadCredentials)) => {
                let state = core.lockout_state().unwrap();
                if let Some(until) = state.next_allowed_at {
                    if let Some(last) = last_deadline {
                        assert!(until >= last, "cooldown must be non-decreasing");
                    }
                    last_deadline = Some(until);
                    cooldown_seen += 1;
                }
            }
            Err(CoreError::Auth(AuthFailure::CoolingDown { .. })) => break,
            other => panic!("unexpected unlock result: {other:?}"),
        }
    }
    assert!(cooldown_seen >= 1);

    // The gate is closed now; even the right password is refused.
    assert!(matches!(
        core.unlock_password(b"unlock-pw-1").unwrap_err(),
        CoreError::Auth(AuthFailure::CoolingDown { .. })
    ));

    // An external success (e.g. biometric) resets the counter.
    core.record_success().unwrap();
    let state = core.lockout_state().unwrap();
    assert_eq!(state.failure_count, 0);
    assert!(core.unlock_password(b"unlock-pw-1").is_ok());
}

#[test]
fn duress_pin_mid_cooldown_destroys_and_leaves_no_payloads() {
    let store = Arc::new(MemoryStore::new());
    let core = WalletCore::new(cheap_settings(), store.clone(), "main").unwrap();
    core.enroll(b"unlock-pw-1", Some(b"911911")).unwrap();

    let (secret, _) = core
        .ingest_secret(MNEMONIC.as_bytes(), SecretKind::Mnemonic)
        .unwrap();
    let (session, _) = core.derive_session(secret).unwrap();
    let master = core.unlock_password(b"unlock-pw-1").unwrap();
    core.finalize(session, master).unwrap();
    assert!(core.stored_payload().unwrap().is_some());

    // Push the profile into cooldown.
    for _ in 0..5 {
        let _ = core.unlock_password(b"wrong-pw");
    }

    // The duress PIN fires from inside the cooldown window.
    let err = core.unlock_password(b"911911").unwrap_err();
    assert!(matches!(err, CoreError::DestructionTriggered));

    assert_eq!(core.stored_payload().unwrap(), None);
    use keycell::ProtectedStore;
    let remaining = store.list_keys("main").unwrap();
    assert_eq!(remaining, vec!["tombstone".to_string()]);

    // Terminal: a retry is a destruction event, not an auth failure.
    assert!(matches!(
        core.unlock_password(b"unlock-pw-1").unwrap_err(),
        CoreError::DestructionTriggered
    ));
}

#[test]
fn custom_phrase_validator_vectors() {
    let core = WalletCore::new(cheap_settings(), Arc::new(MemoryStore::new()), "main").unwrap();

    // 24 characters mixing letters/digits/symbols, no repeated 4-grams.
    assert!(core
        .ingest_secret(CUSTOM_PHRASE.as_bytes(), SecretKind::CustomPhrase)
        .is_ok());

    // Rejected: 4-digit numeric run, two character categories.
    assert!(matches!(
        core.ingest_secret(b"aaaa1111bbbb", SecretKind::CustomPhrase)
            .unwrap_err(),
        CoreError::Validation(_)
    ));

    // Rejected for length no matter how diverse.
    assert!(matches!(
        core.ingest_secret(b"aB3!x9", SecretKind::CustomPhrase)
            .unwrap_err(),
        CoreError::Validation(_)
    ));
}

#[test]
fn double_dispose_is_harmless() {
    let (core, master) = unlocked_core();
    let (secret, _) = core
        .ingest_secret(&[0x55u8; 32], SecretKind::Raw)
        .unwrap();
    let (session, _) = core.derive_session(secret).unwrap();

    core.dispose_session(session).unwrap();
    core.dispose_session(session).unwrap();
    core.cancel_secret(secret).unwrap();
    core.cancel_secret(secret).unwrap();
    core.dispose_master_key(master).unwrap();
    core.dispose_master_key(master).unwrap();
}

#[test]
fn concurrent_session_use_and_dispose_stays_safe() {
    let core = Arc::new(
        WalletCore::new(cheap_settings(), Arc::new(MemoryStore::new()), "main").unwrap(),
    );

    for _ in 0..8 {
        let (secret, _) = core
            .ingest_secret(MNEMONIC.as_bytes(), SecretKind::Mnemonic)
            .unwrap();
        let (session, addresses) = core.derive_session(secret).unwrap();
        let expected = addresses[0].clone();

        let reader = {
            let core = Arc::clone(&core);
            std::thread::spawn(move || {
                for _ in 0..50 {
                    match core.session_address(
                        session,
                        Chain::Ethereum,
                        &Chain::Ethereum.default_path(0),
                    ) {
                        // A resolved address is always the right one —
                        // never zeroized or half-freed data.
                        Ok(info) => assert_eq!(info, expected),
                        Err(CoreError::Handle(_)) => return,
                        Err(e) => panic!("unexpected error: {e}"),
                    }
                }
            })
        };
        let disposer = {
            let core = Arc::clone(&core);
            std::thread::spawn(move || {
                core.dispose_session(session).unwrap();
            })
        };

        reader.join().unwrap();
        disposer.join().unwrap();
        let _ = core.cancel_secret(secret);
    }
}

#[test]
fn signatures_verify_against_session_addresses() {
    let (core, master) = unlocked_core();
    let (secret, _) = core
        .ingest_secret(MNEMONIC.as_bytes(), SecretKind::Mnemonic)
        .unwrap();
    let (session, addresses) = core.derive_session(secret).unwrap();
    let payload = core.finalize(session, master).unwrap();

    let eth = core
        .sign(
            &payload,
            &TxRequest {
                chain: Chain::Ethereum,
                path: Chain::Ethereum.default_path(0),
                message: b"transfer 1 wei".to_vec(),
            },
            master,
        )
        .unwrap();
    assert_eq!(eth.bytes.len(), 65);
    assert_eq!(eth.to_hex().len(), 130);

    let sol = core
        .sign(
            &payload,
            &TxRequest {
                chain: Chain::Solana,
                path: Chain::Solana.default_path(0),
                message: b"transfer 1 lamport".to_vec(),
            },
            master,
        )
        .unwrap();
    assert_eq!(sol.bytes.len(), 64);

    let sol_address = &addresses[1];
    assert_eq!(sol_address.chain, Chain::Solana);
    // The Solana address is the base58 public key; verify the Ed25519
    // signature against it.
    use ed25519_dalek::{Signature, Verifier, VerifyingKey};
    let public: [u8; 32] = bs58::decode(&sol_address.address)
        .into_vec()
        .unwrap()
        .try_into()
        .unwrap();
    let key = VerifyingKey::from_bytes(&public).unwrap();
    let signature = Signature::from_bytes(&sol.bytes.try_into().unwrap());
    assert!(key.verify(b"transfer 1 lamport", &signature).is_ok());
}
