// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const ARMORED: &str = "-----BEGIN PGP PUBLIC KEY BLOCK-----\nVersion: Test 1.0\n\naGVsbG8gZ3BnIGtleSBieXRlcywgcHJldGVuZCB0aGlzIGlzIGFuIG9wZW5wZ3Ag\ncGFja2V0IHN0cmVhbQ==\n=iYPe\n-----END PGP PUBLIC KEY BLOCK-----\n";
const EXPECTED: &[u8] = b"hello gpg key bytes, pretend this is an openpgp packet stream";

#[test]
fn serialize_keyring_dearmors_ascii_armored_input() {
    let result = serialize_keyring(ARMORED.as_bytes()).unwrap();
    assert_eq!(result, EXPECTED);
}

#[test]
fn serialize_keyring_passes_through_binary_input() {
    let binary = vec![0x99u8, 0x01, 0x02, 0x03, 0xFF];
    let result = serialize_keyring(&binary).unwrap();
    assert_eq!(result, binary);
}

#[test]
fn serialize_keyring_is_deterministic() {
    let a = serialize_keyring(ARMORED.as_bytes()).unwrap();
    let b = serialize_keyring(ARMORED.as_bytes()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn dearmor_rejects_missing_footer() {
    let broken = "-----BEGIN PGP PUBLIC KEY BLOCK-----\naGVsbG8=\n";
    let result = serialize_keyring(broken.as_bytes());
    assert!(result.is_err());
}
