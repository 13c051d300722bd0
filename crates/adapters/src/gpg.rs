// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! GPG keyring fetch + re-serialization for apt repository resources.
//!
//! No OpenPGP packet parser lives anywhere in this dependency stack. Rather
//! than pull one in, this module treats re-serialization as armor handling
//! only: if the fetched key is ASCII-armored, strip the armor and recover
//! the underlying binary packet stream (the bytes `gpg --dearmor` would
//! produce); if it's already binary, pass it through unchanged.

use base64::Engine;
use thiserror::Error;

const ARMOR_HEADER: &str = "-----BEGIN PGP PUBLIC KEY BLOCK-----";
const ARMOR_FOOTER: &str = "-----END PGP PUBLIC KEY BLOCK-----";

#[derive(Debug, Error)]
pub enum GpgError {
    #[error("fetch error: {0}")]
    Fetch(String),
    #[error("response exceeded the {limit} byte cap")]
    TooLarge { limit: u64 },
    #[error("malformed ASCII-armored key: {0}")]
    Armor(String),
}

/// Fetch a GPG key from `url` (capped at `max_bytes`) and return the binary
/// keyring representation, de-armoring if necessary.
pub async fn fetch_and_serialize_keyring(
    client: &reqwest::Client,
    url: &str,
    max_bytes: u64,
) -> Result<Vec<u8>, GpgError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| GpgError::Fetch(e.to_string()))?;

    if let Some(len) = response.content_length() {
        if len > max_bytes {
            return Err(GpgError::TooLarge { limit: max_bytes });
        }
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| GpgError::Fetch(e.to_string()))?;
    if bytes.len() as u64 > max_bytes {
        return Err(GpgError::TooLarge { limit: max_bytes });
    }

    serialize_keyring(&bytes)
}

/// Normalize raw fetched bytes (armored or binary) into the canonical binary
/// form written to `/etc/apt/trusted.gpg.d/osconfig_added_<sha>.gpg`.
pub fn serialize_keyring(raw: &[u8]) -> Result<Vec<u8>, GpgError> {
    let text = String::from_utf8_lossy(raw);
    if text.trim_start().starts_with(ARMOR_HEADER) {
        dearmor(&text)
    } else {
        Ok(raw.to_vec())
    }
}

/// Strip ASCII armor: drop the header/footer lines, any header-field lines
/// (blank line terminates them), the trailing CRC24 checksum line (prefixed
/// with `=`), and base64-decode what remains.
fn dearmor(text: &str) -> Result<Vec<u8>, GpgError> {
    let body_start = text
        .find(ARMOR_HEADER)
        .ok_or_else(|| GpgError::Armor("missing armor header".to_string()))?
        + ARMOR_HEADER.len();
    let body_end = text
        .find(ARMOR_FOOTER)
        .ok_or_else(|| GpgError::Armor("missing armor footer".to_string()))?;
    if body_end < body_start {
        return Err(GpgError::Armor("footer precedes header".to_string()));
    }
    let body = &text[body_start..body_end];

    let mut lines = body.lines().map(str::trim).filter(|l| !l.is_empty());
    // Skip header fields (e.g. "Version: ...") up to the blank-line
    // separator that `lines()` already collapsed away above; armor
    // generators without header fields just start straight into base64.
    let mut base64_lines = Vec::new();
    for line in lines.by_ref() {
        if line.contains(':') {
            continue;
        }
        if let Some(stripped) = line.strip_prefix('=') {
            if stripped.len() == 4 {
                continue; // CRC24 checksum line, not part of the payload
            }
        }
        base64_lines.push(line);
    }

    let joined: String = base64_lines.concat();
    base64::engine::general_purpose::STANDARD
        .decode(joined)
        .map_err(|e| GpgError::Armor(e.to_string()))
}

#[cfg(test)]
#[path = "gpg_tests.rs"]
mod tests;
