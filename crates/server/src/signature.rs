//! Request authentication for the interactions endpoint.

use anyhow::{anyhow, Context};
use ed25519_dalek::{Signature, VerifyingKey};
use hex::FromHex;

pub const SIGNATURE_HEADER: &str = "x-signature-ed25519";
pub const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

/// Checks that `signature_hex` signs `timestamp ++ body` under `key`.
pub fn verify_request(key: &VerifyingKey, signature_hex: &str, timestamp: &str, body: &[u8]) -> bool {
    let Ok(bytes) = <[u8; 64]>::from_hex(signature_hex.trim()) else {
        return false;
    };
    let signature = Signature::from_bytes(&bytes);

    let mut signed = Vec::with_capacity(timestamp.len() + body.len());
    signed.extend_from_slice(timestamp.as_bytes());
    signed.extend_from_slice(body);
    key.verify_strict(&signed, &signature).is_ok()
}

/// Parses the hex encoded application key.
pub fn parse_public_key(raw: &str) -> anyhow::Result<VerifyingKey> {
    let bytes = <[u8; 32]>::from_hex(raw.trim())
        .map_err(|error| anyhow!("public_key must be 64 hex characters: {error}"))?;
    VerifyingKey::from_bytes(&bytes).context("public_key is not a valid Ed25519 key")
}

#[cfg(test)]
#[path = "tests/signature_tests.rs"]
mod tests;
