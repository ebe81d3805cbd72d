//! Cryptographic primitives for Ledgerline.
//!
//! Wraps SHA-256 hashing in a tagged digest type so the algorithm can be
//! swapped later without ambiguity on the wire.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::error::HashParseError;

/// Hash algorithms understood by the event hasher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HashAlgorithm {
    Sha256,
}

impl HashAlgorithm {
    /// The tag written before the hex digest.
    pub const fn tag(self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
        }
    }

    /// Try to parse a tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "sha256" => Some(HashAlgorithm::Sha256),
            _ => None,
        }
    }
}

/// A tagged 32-byte event digest, rendered as `sha256:<hex>`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventHash {
    algorithm: HashAlgorithm,
    digest: [u8; 32],
}

impl EventHash {
    /// Compute the SHA-256 hash of the given data.
    pub fn sha256(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self {
            algorithm: HashAlgorithm::Sha256,
            digest: hasher.finalize().into(),
        }
    }

    /// Create from raw SHA-256 digest bytes.
    pub const fn from_sha256_bytes(digest: [u8; 32]) -> Self {
        Self {
            algorithm: HashAlgorithm::Sha256,
            digest,
        }
    }

    /// The algorithm that produced this digest.
    pub const fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Get the raw digest bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.digest
    }

    /// Hex digest without the algorithm tag.
    pub fn to_hex(&self) -> String {
        hex::encode(self.digest)
    }
}

impl fmt::Debug for EventHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventHash({}:{})", self.algorithm.tag(), &self.to_hex()[..16])
    }
}

impl fmt::Display for EventHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm.tag(), self.to_hex())
    }
}

impl FromStr for EventHash {
    type Err = HashParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (tag, hex_digest) = s
            .split_once(':')
            .ok_or_else(|| HashParseError::MissingTag(s.to_string()))?;
        let algorithm = HashAlgorithm::from_tag(tag)
            .ok_or_else(|| HashParseError::UnsupportedAlgorithm(tag.to_string()))?;

        let bytes = hex::decode(hex_digest).map_err(|e| HashParseError::InvalidHex(e.to_string()))?;
        let digest: [u8; 32] = bytes
            .try_into()
            .map_err(|_| HashParseError::InvalidHex("expected 32 bytes".into()))?;

        Ok(Self { algorithm, digest })
    }
}

impl Serialize for EventHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EventHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl AsRef<[u8]> for EventHash {
    fn as_ref(&self) -> &[u8] {
        &self.digest
    }
}
