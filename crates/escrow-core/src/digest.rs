//! # Content Digests
//!
//! SHA-256 digests over the canonical JSON form of a value. Persisted escrow
//! state carries one so that a hand-edited or truncated state file is caught
//! on load instead of being replayed.
//!
//! Canonical form: `serde_json::Value` with object keys in sorted order,
//! compact separators.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ValidationError;

/// A SHA-256 digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    /// Wrap raw digest bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The raw 32-byte digest.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, ValidationError> {
        if s.len() != 64 || !s.is_ascii() {
            return Err(ValidationError::Digest(format!("bad digest length: {s}")));
        }
        let mut out = [0u8; 32];
        for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
            let pair = std::str::from_utf8(chunk)
                .map_err(|_| ValidationError::Digest(format!("bad digest: {s}")))?;
            out[i] = u8::from_str_radix(pair, 16)
                .map_err(|_| ValidationError::Digest(format!("bad digest: {s}")))?;
        }
        Ok(Self(out))
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sha256:{}", self.to_hex())
    }
}

impl From<ContentDigest> for String {
    fn from(d: ContentDigest) -> Self {
        d.to_hex()
    }
}

impl TryFrom<String> for ContentDigest {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

/// Compute the SHA-256 digest of a value's canonical JSON form.
///
/// # Errors
///
/// Returns [`ValidationError::Digest`] if the value cannot be serialized.
pub fn sha256_digest(value: &impl Serialize) -> Result<ContentDigest, ValidationError> {
    // Round-tripping through Value sorts object keys.
    let canonical = serde_json::to_value(value)
        .and_then(|v| serde_json::to_vec(&v))
        .map_err(|e| ValidationError::Digest(e.to_string()))?;
    let hash = Sha256::digest(&canonical);
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    Ok(ContentDigest(bytes))
}
