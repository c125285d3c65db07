//! Typed wrappers for the content digests `TarballItem` verifies against.
//!
//! A tarball's declared hash is a string of the form `"<algorithm>:<hex
//! digest>"`. Two algorithms are recognized: `sha256` and `blake3`. Wrapping
//! the hex string in a validated newtype means a badly-formed digest is
//! rejected at parse time rather than silently comparing unequal strings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated hex digest paired with the algorithm that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Digest {
    /// A SHA-256 digest (64 hex characters).
    Sha256(Sha256Digest),
    /// A BLAKE3 digest (64 hex characters).
    Blake3(Blake3Digest),
}

/// Error returned when a `"algorithm:hex"` declaration cannot be parsed.
#[derive(thiserror::Error, Debug)]
pub enum DigestParseError {
    /// The declared hash has no `algorithm:` prefix, or the prefix is not
    /// one of the recognized algorithms.
    #[error("unknown hash algorithm in '{0}', expected 'sha256:' or 'blake3:'")]
    UnknownAlgorithm(String),
    /// The hex portion is not exactly 64 ASCII hex characters.
    #[error("invalid hex digest: expected 64 hex characters, got {0} in '{1}'")]
    InvalidHex(usize, String),
}

impl Digest {
    /// Parse a declared hash of the form `"sha256:<hex>"` or `"blake3:<hex>"`.
    ///
    /// # Errors
    ///
    /// Returns [`DigestParseError`] if the algorithm prefix is unrecognized
    /// or the hex portion is malformed.
    pub fn parse(declared: &str) -> Result<Self, DigestParseError> {
        let (algorithm, hex) = declared
            .split_once(':')
            .ok_or_else(|| DigestParseError::UnknownAlgorithm(declared.to_string()))?;
        match algorithm {
            "sha256" => Ok(Self::Sha256(Sha256Digest::new(hex)?)),
            "blake3" => Ok(Self::Blake3(Blake3Digest::new(hex)?)),
            _ => Err(DigestParseError::UnknownAlgorithm(declared.to_string())),
        }
    }

    /// Compute the digest of `data` for whichever algorithm `self` carries.
    pub fn matches(&self, data: &[u8]) -> bool {
        match self {
            Self::Sha256(expected) => &Sha256Digest::compute(data) == expected,
            Self::Blake3(expected) => &Blake3Digest::compute(data) == expected,
        }
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256(d) => write!(f, "sha256:{d}"),
            Self::Blake3(d) => write!(f, "blake3:{d}"),
        }
    }
}

fn validate_hex(hex: &str) -> Result<String, DigestParseError> {
    if hex.len() == 64 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(hex.to_lowercase())
    } else {
        Err(DigestParseError::InvalidHex(hex.len(), hex.to_string()))
    }
}

/// A validated SHA-256 digest (64 hex characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sha256Digest(String);

impl Sha256Digest {
    /// Validate a raw hex string into a `Sha256Digest`.
    ///
    /// # Errors
    ///
    /// Returns [`DigestParseError::InvalidHex`] if `hex` is not exactly 64
    /// ASCII hex characters.
    pub fn new(hex: &str) -> Result<Self, DigestParseError> {
        Ok(Self(validate_hex(hex)?))
    }

    /// Compute the SHA-256 digest of `data`.
    pub fn compute(data: &[u8]) -> Self {
        use sha2::{Digest as _, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hex::encode(hasher.finalize()))
    }

    /// Return the inner hex string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated BLAKE3 digest (64 hex characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Blake3Digest(String);

impl Blake3Digest {
    /// Validate a raw hex string into a `Blake3Digest`.
    ///
    /// # Errors
    ///
    /// Returns [`DigestParseError::InvalidHex`] if `hex` is not exactly 64
    /// ASCII hex characters.
    pub fn new(hex: &str) -> Result<Self, DigestParseError> {
        Ok(Self(validate_hex(hex)?))
    }

    /// Compute the BLAKE3 digest of `data`.
    pub fn compute(data: &[u8]) -> Self {
        Self(blake3::hash(data).to_hex().to_string())
    }

    /// Return the inner hex string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Blake3Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sha256_prefix() {
        let hex = "a".repeat(64);
        let digest = Digest::parse(&format!("sha256:{hex}")).unwrap();
        assert!(matches!(digest, Digest::Sha256(_)));
    }

    #[test]
    fn parses_blake3_prefix() {
        let hex = "b".repeat(64);
        let digest = Digest::parse(&format!("blake3:{hex}")).unwrap();
        assert!(matches!(digest, Digest::Blake3(_)));
    }

    #[test]
    fn rejects_unknown_algorithm() {
        let hex = "a".repeat(64);
        assert!(Digest::parse(&format!("md5:{hex}")).is_err());
    }

    #[test]
    fn rejects_short_hex() {
        assert!(Digest::parse("sha256:deadbeef").is_err());
    }

    #[test]
    fn sha256_matches_known_input() {
        let digest = Digest::Sha256(Sha256Digest::compute(b"hello world"));
        assert!(digest.matches(b"hello world"));
        assert!(!digest.matches(b"goodbye world"));
    }

    #[test]
    fn blake3_deterministic() {
        let a = Blake3Digest::compute(b"test data");
        let b = Blake3Digest::compute(b"test data");
        assert_eq!(a, b);
    }
}
