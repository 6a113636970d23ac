//! Audit record model
//!
//! An [`AuditRecord`] carries a *declared* public vulnerability score next to
//! an encrypted score held by the ledger. The two may diverge until the
//! encrypted one has been verified on-ledger.

use alloy::primitives::Address;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::stats::RiskBand;
use super::types::{EncryptedScore, RecordId, Score};
use crate::infra::{AuditError, Result};

/// Raw field set returned by the ledger for one record id.
///
/// Numeric fields are kept wide here; narrowing happens in
/// [`AuditRecord::from_fields`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFields {
    pub name: String,
    pub description: String,
    pub creator: Address,
    pub timestamp: u64,
    pub public_vulnerability_score: u64,
    pub public_complexity: u64,
    pub is_verified: bool,
    pub decrypted_value: u32,
}

/// One audited project as seen by the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: RecordId,
    pub name: String,
    pub description: String,
    pub creator_address: Address,
    /// Seconds since the Unix epoch
    pub created_at: u64,
    pub public_complexity: Score,
    pub public_vulnerability_score: Score,
    pub is_verified: bool,
    /// Only ever `Some` when `is_verified` is true
    pub decrypted_value: Option<u32>,
}

impl AuditRecord {
    /// Decode a ledger field set into a record.
    ///
    /// Fails with [`AuditError::Decode`] when a public score is outside the
    /// score range or the timestamp does not fit a date.
    pub fn from_fields(id: RecordId, fields: RecordFields) -> Result<Self> {
        let public_vulnerability_score =
            decode_score(&id, "vulnerability score", fields.public_vulnerability_score)?;
        let public_complexity = decode_score(&id, "complexity", fields.public_complexity)?;

        if i64::try_from(fields.timestamp).is_err() {
            return Err(AuditError::Decode {
                id: id.to_string(),
                reason: format!("timestamp {} out of range", fields.timestamp),
            });
        }

        Ok(Self {
            id,
            name: fields.name,
            description: fields.description,
            creator_address: fields.creator,
            created_at: fields.timestamp,
            public_complexity,
            public_vulnerability_score,
            is_verified: fields.is_verified,
            decrypted_value: fields.is_verified.then_some(fields.decrypted_value),
        })
    }

    pub fn risk_band(&self) -> RiskBand {
        RiskBand::of(self.public_vulnerability_score)
    }

    /// The decrypted score, if and only if it has been verified on-ledger
    pub fn verified_value(&self) -> Option<u32> {
        if self.is_verified {
            self.decrypted_value
        } else {
            None
        }
    }

    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.created_at as i64, 0).single()
    }

    /// Abbreviated creator address, e.g. `0x12345678...9abcdef0`
    pub fn short_creator(&self) -> String {
        let full = self.creator_address.to_string();
        format!("{}...{}", &full[..10], &full[full.len() - 8..])
    }
}

fn decode_score(id: &RecordId, field: &str, raw: u64) -> Result<Score> {
    u8::try_from(raw)
        .ok()
        .and_then(Score::new)
        .ok_or_else(|| AuditError::Decode {
            id: id.to_string(),
            reason: format!("{field} {raw} out of range"),
        })
}

/// Everything the creation transaction carries.
///
/// Public fields travel in plaintext next to the encrypted score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRecordRequest {
    pub id: RecordId,
    pub name: String,
    pub description: String,
    pub public_vulnerability_score: Score,
    pub public_complexity: Score,
    pub encrypted: EncryptedScore,
}
