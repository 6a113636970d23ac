//! Encryption gateway
//!
//! Turns a plaintext score into a ciphertext + input proof bound to a
//! contract address and a submitter address. The binding itself is done by
//! the oracle; this layer passes the right addresses through and normalises
//! failures. The plaintext never reaches a log line or a span field.

use std::sync::Arc;

use alloy::primitives::Address;
use tracing::{debug, instrument, warn};

use crate::domain::{EncryptedScore, Score};
use crate::infra::{AuditError, EncryptionOracle, Result};

/// Wrapper around the external FHE encryption oracle
#[derive(Clone)]
pub struct EncryptionGateway {
    oracle: Arc<dyn EncryptionOracle>,
}

impl EncryptionGateway {
    pub fn new(oracle: Arc<dyn EncryptionOracle>) -> Self {
        Self { oracle }
    }

    /// Encrypt `score` for `contract`, submitted by `submitter`.
    ///
    /// User cancellation is passed through as [`AuditError::UserRejected`];
    /// every other failure becomes [`AuditError::Encryption`].
    #[instrument(skip(self, score), fields(contract = %contract, submitter = %submitter))]
    pub async fn encrypt_score(
        &self,
        contract: Address,
        submitter: Address,
        score: Score,
    ) -> Result<EncryptedScore> {
        let encrypted = self
            .oracle
            .encrypt(contract, submitter, u64::from(score.get()))
            .await
            .map_err(|e| {
                warn!(error_kind = e.kind(), "Score encryption failed");
                match e {
                    AuditError::UserRejected(_) | AuditError::Encryption(_) => e,
                    other => AuditError::Encryption(other.to_string()),
                }
            })?;

        debug!(ciphertext = %encrypted.ciphertext, "Score encrypted");
        Ok(encrypted)
    }
}
