//! Decrypt workflow
//!
//! Resolves the protected score of one record. The verified flag is always
//! re-read from the ledger, and a successful verification is never written
//! back locally: the next record refresh re-derives it from the ledger.
//! Several decrypts may run at once since each addresses its own handle.

use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use crate::domain::{HistoryAction, HistoryLog, RecordId, TxReceipt};
use crate::gateway::VerificationGateway;
use crate::infra::{IdentityProvider, LedgerReader, LedgerWriter, RecordStore, Result};

/// Orchestrates verified decryption of a record's protected score
pub struct DecryptWorkflow {
    reader: Arc<dyn LedgerReader>,
    writer: Arc<dyn LedgerWriter>,
    identity: Arc<dyn IdentityProvider>,
    verification: VerificationGateway,
    store: Arc<RecordStore>,
    history: Arc<HistoryLog>,
}

impl DecryptWorkflow {
    pub fn new(
        reader: Arc<dyn LedgerReader>,
        writer: Arc<dyn LedgerWriter>,
        identity: Arc<dyn IdentityProvider>,
        verification: VerificationGateway,
        store: Arc<RecordStore>,
        history: Arc<HistoryLog>,
    ) -> Self {
        Self {
            reader,
            writer,
            identity,
            verification,
            store,
            history,
        }
    }

    /// Decrypt the protected score of `id`.
    ///
    /// Returns `None` when not connected, when the record is unknown, or when
    /// any step fails; failures are logged and never propagated.
    #[instrument(skip(self, id), fields(record_id = %id))]
    pub async fn decrypt(&self, id: &RecordId) -> Option<u32> {
        if !self.identity.is_connected() {
            debug!("Decrypt skipped: not connected");
            return None;
        }

        match self.run(id).await {
            Ok(value) => value,
            Err(e) => {
                error!(error_kind = e.kind(), error = %e, "Decryption failed");
                None
            }
        }
    }

    async fn run(&self, id: &RecordId) -> Result<Option<u32>> {
        let fields = self.reader.get_record(id).await?;
        if fields.is_verified {
            debug!("Record already verified, returning stored value");
            return Ok(Some(fields.decrypted_value));
        }

        let handle = self.reader.get_ciphertext_handle(id).await?;
        let contract = self.reader.contract_address();

        let writer = Arc::clone(&self.writer);
        let record_id = id.clone();
        let clear_values = self
            .verification
            .verify(&[handle], contract, move |clear_values, proof| async move {
                submit_and_confirm(writer, record_id, clear_values, proof).await
            })
            .await?;

        // Proof is already accepted on-ledger; an oversized value only drops
        // the return value.
        let value = match clear_values.get(&handle) {
            Some(v) => match u32::try_from(*v) {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(clear_value = *v, "Clear value does not fit a u32");
                    None
                }
            },
            None => None,
        };

        self.history
            .append(HistoryAction::Decrypted {
                record_id: id.clone(),
            })
            .await;

        if let Err(e) = self.store.load_all().await {
            debug!(error = %e, "Record refresh after decrypt failed");
        }

        info!(resolved = value.is_some(), "Decryption verified");
        Ok(value)
    }
}

async fn submit_and_confirm(
    writer: Arc<dyn LedgerWriter>,
    id: RecordId,
    clear_values: Vec<u8>,
    proof: Vec<u8>,
) -> Result<TxReceipt> {
    let mut tx = writer
        .submit_verification_proof(&id, clear_values, proof)
        .await?;
    debug!(tx_hash = %tx.tx_hash(), "Verification proof sent");
    tx.await_confirmation().await
}
