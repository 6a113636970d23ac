//! Trait definitions for the external collaborators
//!
//! The client core never talks to a chain or an FHE service directly; it goes
//! through these seams. [`crate::chain`] provides the EVM implementation.

use alloy::primitives::{Address, TxHash};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::domain::{
    CiphertextHandle, CreateRecordRequest, DecryptionResult, EncryptedScore, RecordFields,
    RecordId, TxReceipt,
};

use super::Result;

/// Read side of the audit contract.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// Address of the audit contract ciphertexts are bound to
    fn contract_address(&self) -> Address;

    /// Every record id known to the contract, in contract order
    async fn get_all_record_ids(&self) -> Result<Vec<RecordId>>;

    /// Current field set of one record
    async fn get_record(&self, id: &RecordId) -> Result<RecordFields>;

    /// Handle of the record's encrypted score
    async fn get_ciphertext_handle(&self, id: &RecordId) -> Result<CiphertextHandle>;

    /// Liveness probe of the contract
    async fn is_available(&self) -> Result<bool>;
}

/// A sent transaction that has not been confirmed yet.
#[async_trait]
pub trait PendingTransaction: Send {
    fn tx_hash(&self) -> TxHash;

    /// Wait for finality. There is no timeout.
    async fn await_confirmation(&mut self) -> Result<TxReceipt>;
}

/// Write side of the audit contract.
///
/// Both calls return as soon as the transaction is sent; confirmation is a
/// separate suspension point.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LedgerWriter: Send + Sync {
    /// Send the record creation transaction
    async fn create_record(
        &self,
        request: CreateRecordRequest,
    ) -> Result<Box<dyn PendingTransaction>>;

    /// Send a decryption proof for one record
    async fn submit_verification_proof(
        &self,
        id: &RecordId,
        abi_encoded_clear_values: Vec<u8>,
        proof: Vec<u8>,
    ) -> Result<Box<dyn PendingTransaction>>;
}

/// FHE encryption oracle.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EncryptionOracle: Send + Sync {
    /// Encrypt `value` for `contract`, bound to `user` as the submitter
    async fn encrypt(&self, contract: Address, user: Address, value: u64)
        -> Result<EncryptedScore>;
}

/// FHE decryption oracle.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DecryptionOracle: Send + Sync {
    /// Decrypt `handles` and produce a proof the contract can check
    async fn request_decryption(
        &self,
        handles: Vec<CiphertextHandle>,
        contract: Address,
    ) -> Result<DecryptionResult>;
}

/// Connected identity of the session.
#[cfg_attr(test, automock)]
pub trait IdentityProvider: Send + Sync {
    /// Address of the connected identity, if any
    fn current_address(&self) -> Option<Address>;

    fn is_connected(&self) -> bool {
        self.current_address().is_some()
    }
}
