//! Core type definitions for the FHE audit client
//!
//! Identifiers, clamped scores and the opaque ciphertext/proof values that
//! move between the client, the FHE oracles and the ledger.

use alloy::primitives::TxHash;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Lowest value a public score may take
pub const SCORE_MIN: u8 = 1;

/// Highest value a public score may take
pub const SCORE_MAX: u8 = 10;

/// Default value for both form sliders
pub const SCORE_DEFAULT: u8 = 5;

/// Opaque audit record identifier
///
/// Assigned by the client when a record is created and used as the key of
/// every ledger call afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    /// Generate a fresh identifier: `audit-<unix-millis>-<uuid>`.
    ///
    /// The UUID suffix keeps two ids minted in the same millisecond distinct.
    pub fn generate() -> Self {
        Self(format!(
            "audit-{}-{}",
            chrono::Utc::now().timestamp_millis(),
            Uuid::new_v4().simple()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A public score in `[SCORE_MIN, SCORE_MAX]`.
///
/// Construction clamps, so a `Score` is valid by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Score(u8);

impl Score {
    /// Clamp any integer into the score range
    pub fn clamped(value: i64) -> Self {
        Self(value.clamp(SCORE_MIN as i64, SCORE_MAX as i64) as u8)
    }

    /// Accept a value only if it is already in range
    pub fn new(value: u8) -> Option<Self> {
        (SCORE_MIN..=SCORE_MAX).contains(&value).then_some(Self(value))
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

impl Default for Score {
    fn default() -> Self {
        Self(SCORE_DEFAULT)
    }
}

impl TryFrom<u8> for Score {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Score::new(value)
            .ok_or_else(|| format!("score {value} outside {SCORE_MIN}..={SCORE_MAX}"))
    }
}

impl From<Score> for u8 {
    fn from(score: Score) -> Self {
        score.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 32-byte opaque reference to an encrypted value.
///
/// Used both for the external input handle produced by the encryption oracle
/// and for the stored handle the ledger returns for a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CiphertextHandle(#[serde(with = "bytes32_hex")] pub [u8; 32]);

impl CiphertextHandle {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for CiphertextHandle {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Output of the encryption oracle: ciphertext bound to a contract and a
/// submitter, plus the input proof the contract checks.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptedScore {
    pub ciphertext: CiphertextHandle,
    pub proof: Vec<u8>,
}

impl fmt::Debug for EncryptedScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedScore")
            .field("ciphertext", &self.ciphertext)
            .field("proof_len", &self.proof.len())
            .finish()
    }
}

/// Output of the decryption oracle.
///
/// `abi_encoded_clear_values` and `proof` are what the ledger verifies;
/// `clear_values` is the decoded view keyed by handle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DecryptionResult {
    pub clear_values: std::collections::HashMap<CiphertextHandle, u64>,
    pub abi_encoded_clear_values: Vec<u8>,
    pub proof: Vec<u8>,
}

/// Receipt of a confirmed ledger transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
}

/// Serde module for serializing 32-byte values as hex strings
pub mod bytes32_hex {
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected 32 bytes for ciphertext handle"))
    }
}
