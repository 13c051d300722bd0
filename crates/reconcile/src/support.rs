// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for resource kinds: content hashing (§6 "Filesystem
//! artifacts", §8 property 4 "Stable paths") and bounded HTTP fetch (§4.5,
//! shared by the apt GPG-key fetch and `FileResource`'s `content_url`).

use sha2::{Digest, Sha256};

use crate::error::ReconcileError;

/// Lowercase hex-encoded SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// First 10 hex characters of a digest — the repo-file path suffix (§6, §9
/// "retain for compatibility" on the collision risk this truncation
/// carries).
pub fn first10(hex_digest: &str) -> &str {
    &hex_digest[..hex_digest.len().min(10)]
}

/// Fetch `url` via `client`, refusing anything over `max_bytes` either by
/// `Content-Length` or by actual body size.
pub async fn fetch_bounded(
    client: &reqwest::Client,
    url: &str,
    max_bytes: u64,
) -> Result<Vec<u8>, ReconcileError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| ReconcileError::Fetch(e.to_string()))?;

    if let Some(len) = response.content_length() {
        if len > max_bytes {
            return Err(ReconcileError::Fetch(format!(
                "response exceeded the {max_bytes} byte cap"
            )));
        }
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ReconcileError::Fetch(e.to_string()))?;
    if bytes.len() as u64 > max_bytes {
        return Err(ReconcileError::Fetch(format!(
            "response exceeded the {max_bytes} byte cap"
        )));
    }
    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_hex_is_stable() {
        let a = sha256_hex(b"hello world");
        let b = sha256_hex(b"hello world");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn sha256_hex_differs_for_different_input() {
        assert_ne!(sha256_hex(b"a"), sha256_hex(b"b"));
    }

    #[test]
    fn first10_truncates() {
        let digest = sha256_hex(b"content");
        assert_eq!(first10(&digest).len(), 10);
        assert_eq!(first10(&digest), &digest[..10]);
    }

    #[test]
    fn first10_is_stable_for_identical_input() {
        let a = first10(&sha256_hex(b"same"));
        let b = first10(&sha256_hex(b"same"));
        assert_eq!(a, b);
    }
}
