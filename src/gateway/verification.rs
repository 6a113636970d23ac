//! Verification gateway
//!
//! Obtains cleartext + decryption proof for ciphertext handles from the
//! oracle, then hands the proof to a caller-supplied submission callback. The
//! callback decides which ledger transaction carries the proof, so the same
//! gateway serves every call site regardless of which record it binds.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use alloy::primitives::Address;
use tracing::{debug, info, instrument, warn};

use crate::domain::{CiphertextHandle, TxReceipt};
use crate::infra::{AuditError, DecryptionOracle, Result};

/// Wrapper around the external FHE decryption oracle
#[derive(Clone)]
pub struct VerificationGateway {
    oracle: Arc<dyn DecryptionOracle>,
}

impl VerificationGateway {
    pub fn new(oracle: Arc<dyn DecryptionOracle>) -> Self {
        Self { oracle }
    }

    /// Decrypt `handles` and get the proof accepted on-ledger.
    ///
    /// `submit_proof` receives the ABI-encoded clear values and the proof and
    /// must resolve once the carrying transaction is confirmed.
    ///
    /// Fails with [`AuditError::Verification`] when the oracle cannot decrypt
    /// or prove, and with [`AuditError::Submission`] (or
    /// [`AuditError::UserRejected`]) when the callback's transaction fails.
    /// The returned map is keyed by handle; a handle the oracle could not
    /// resolve is simply absent.
    #[instrument(skip(self, handles, submit_proof), fields(handles = handles.len(), contract = %contract))]
    pub async fn verify<F, Fut>(
        &self,
        handles: &[CiphertextHandle],
        contract: Address,
        submit_proof: F,
    ) -> Result<HashMap<CiphertextHandle, u64>>
    where
        F: FnOnce(Vec<u8>, Vec<u8>) -> Fut + Send,
        Fut: Future<Output = Result<TxReceipt>> + Send,
    {
        if handles.is_empty() {
            return Err(AuditError::Verification("no ciphertext handles given".into()));
        }

        let result = self
            .oracle
            .request_decryption(handles.to_vec(), contract)
            .await
            .map_err(|e| match e {
                AuditError::Verification(_) => e,
                other => AuditError::Verification(other.to_string()),
            })?;

        if result.proof.is_empty() {
            return Err(AuditError::Verification("oracle returned an empty proof".into()));
        }

        let missing = handles
            .iter()
            .filter(|h| !result.clear_values.contains_key(*h))
            .count();
        if missing > 0 {
            warn!(missing, "Oracle did not resolve every handle");
        }
        debug!(resolved = result.clear_values.len(), "Decryption proof obtained");

        let receipt = submit_proof(result.abi_encoded_clear_values, result.proof)
            .await
            .map_err(|e| match e {
                AuditError::Submission(_) | AuditError::UserRejected(_) => e,
                other => AuditError::Submission(other.to_string()),
            })?;

        info!(tx_hash = %receipt.tx_hash, "Decryption proof accepted on-ledger");
        Ok(result.clear_values)
    }
}
