//! Common test utilities and fixtures for integration tests
//!
//! In-memory stand-ins for the ledger, both FHE oracles and the identity.
//! The fake encryption oracle stores the plaintext in the last byte of the
//! handle so the fake decryption oracle can recover it.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use alloy::primitives::{Address, TxHash};
use async_trait::async_trait;
use chrono::Utc;

use fhe_audit::chain::classify_write_error;
use fhe_audit::config::WorkflowConfig;
use fhe_audit::domain::{
    CiphertextHandle, CreateRecordRequest, DecryptionResult, EncryptedScore, RecordFields,
    RecordId, TxReceipt,
};
use fhe_audit::infra::{
    AuditError, DecryptionOracle, EncryptionOracle, IdentityProvider, LedgerReader, LedgerWriter,
    PendingTransaction, Result,
};
use fhe_audit::session::{AuditSession, Collaborators};

/// Contract address used by every fixture
pub fn contract() -> Address {
    Address::repeat_byte(0xc0)
}

/// Connected test account
pub fn alice() -> Address {
    Address::repeat_byte(0xa1)
}

fn proof_for(handle: &CiphertextHandle) -> Vec<u8> {
    let mut proof = b"proof:".to_vec();
    proof.extend_from_slice(handle.as_bytes());
    proof
}

/// Big-endian 32-byte word, as the ledger expects clear values
pub fn abi_word(value: u64) -> Vec<u8> {
    let mut word = vec![0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

#[derive(Debug, Clone)]
struct StoredRecord {
    fields: RecordFields,
    handle: CiphertextHandle,
}

#[derive(Default)]
struct LedgerState {
    order: Vec<RecordId>,
    records: HashMap<RecordId, StoredRecord>,
    tx_count: u64,
}

/// In-memory audit contract
pub struct FakeLedger {
    sender: Address,
    state: Mutex<LedgerState>,
    /// Error message every write fails with, if set
    write_failure: Mutex<Option<String>>,
    /// Whether confirmations revert
    revert: Mutex<bool>,
    pub create_calls: AtomicUsize,
    pub verify_calls: AtomicUsize,
}

impl FakeLedger {
    pub fn new(sender: Address) -> Self {
        Self {
            sender,
            state: Mutex::new(LedgerState::default()),
            write_failure: Mutex::new(None),
            revert: Mutex::new(false),
            create_calls: AtomicUsize::new(0),
            verify_calls: AtomicUsize::new(0),
        }
    }

    /// Seed a record whose protected score is `protected`
    pub fn seed(&self, id: &str, name: &str, public_vulnerability: u64, protected: u8) {
        let handle = FakeFhe::handle_for(protected as u64);
        let mut state = self.state.lock().unwrap();
        let id = RecordId::from(id);
        state.order.push(id.clone());
        state.records.insert(
            id,
            StoredRecord {
                fields: RecordFields {
                    name: name.to_string(),
                    description: format!("{name} audit"),
                    creator: self.sender,
                    timestamp: 1_700_000_000,
                    public_vulnerability_score: public_vulnerability,
                    public_complexity: 5,
                    is_verified: false,
                    decrypted_value: 0,
                },
                handle,
            },
        );
    }

    pub fn fail_writes_with(&self, message: &str) {
        *self.write_failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn revert_confirmations(&self) {
        *self.revert.lock().unwrap() = true;
    }

    pub fn record_count(&self) -> usize {
        self.state.lock().unwrap().order.len()
    }

    pub fn is_verified(&self, id: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .records
            .get(&RecordId::from(id))
            .map(|r| r.fields.is_verified)
            .unwrap_or(false)
    }

    fn check_write(&self) -> Result<TxHash> {
        if let Some(message) = self.write_failure.lock().unwrap().clone() {
            return Err(classify_write_error(&message));
        }
        let mut state = self.state.lock().unwrap();
        state.tx_count += 1;
        Ok(TxHash::left_padding_from(&state.tx_count.to_be_bytes()))
    }

    fn pending(&self, tx_hash: TxHash) -> Box<dyn PendingTransaction> {
        Box::new(FakePendingTx {
            tx_hash,
            revert: *self.revert.lock().unwrap(),
        })
    }
}

#[async_trait]
impl LedgerReader for FakeLedger {
    fn contract_address(&self) -> Address {
        contract()
    }

    async fn get_all_record_ids(&self) -> Result<Vec<RecordId>> {
        Ok(self.state.lock().unwrap().order.clone())
    }

    async fn get_record(&self, id: &RecordId) -> Result<RecordFields> {
        self.state
            .lock()
            .unwrap()
            .records
            .get(id)
            .map(|r| r.fields.clone())
            .ok_or_else(|| AuditError::Read(format!("record {id} does not exist")))
    }

    async fn get_ciphertext_handle(&self, id: &RecordId) -> Result<CiphertextHandle> {
        self.state
            .lock()
            .unwrap()
            .records
            .get(id)
            .map(|r| r.handle)
            .ok_or_else(|| AuditError::Read(format!("record {id} does not exist")))
    }

    async fn is_available(&self) -> Result<bool> {
        Ok(true)
    }
}

#[async_trait]
impl LedgerWriter for FakeLedger {
    async fn create_record(
        &self,
        request: CreateRecordRequest,
    ) -> Result<Box<dyn PendingTransaction>> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let tx_hash = self.check_write()?;

        if request.encrypted.proof != proof_for(&request.encrypted.ciphertext) {
            return Err(AuditError::Submission("invalid input proof".into()));
        }

        let mut state = self.state.lock().unwrap();
        if state.records.contains_key(&request.id) {
            return Err(AuditError::Submission("record already exists".into()));
        }
        state.order.push(request.id.clone());
        state.records.insert(
            request.id,
            StoredRecord {
                fields: RecordFields {
                    name: request.name,
                    description: request.description,
                    creator: self.sender,
                    timestamp: Utc::now().timestamp() as u64,
                    public_vulnerability_score: request.public_vulnerability_score.get() as u64,
                    public_complexity: request.public_complexity.get() as u64,
                    is_verified: false,
                    decrypted_value: 0,
                },
                handle: request.encrypted.ciphertext,
            },
        );
        drop(state);
        Ok(self.pending(tx_hash))
    }

    async fn submit_verification_proof(
        &self,
        id: &RecordId,
        abi_encoded_clear_values: Vec<u8>,
        proof: Vec<u8>,
    ) -> Result<Box<dyn PendingTransaction>> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        let tx_hash = self.check_write()?;

        let mut state = self.state.lock().unwrap();
        let record = state
            .records
            .get_mut(id)
            .ok_or_else(|| AuditError::Submission(format!("record {id} does not exist")))?;
        if proof != proof_for(&record.handle) || abi_encoded_clear_values.len() != 32 {
            return Err(AuditError::Submission("invalid decryption proof".into()));
        }
        let mut value = [0u8; 8];
        value.copy_from_slice(&abi_encoded_clear_values[24..]);
        record.fields.is_verified = true;
        record.fields.decrypted_value = u64::from_be_bytes(value) as u32;
        drop(state);
        Ok(self.pending(tx_hash))
    }
}

struct FakePendingTx {
    tx_hash: TxHash,
    revert: bool,
}

#[async_trait]
impl PendingTransaction for FakePendingTx {
    fn tx_hash(&self) -> TxHash {
        self.tx_hash
    }

    async fn await_confirmation(&mut self) -> Result<TxReceipt> {
        if self.revert {
            return Err(AuditError::Submission(format!(
                "transaction {} reverted",
                self.tx_hash
            )));
        }
        Ok(TxReceipt {
            tx_hash: self.tx_hash,
            block_number: Some(1),
        })
    }
}

/// Both FHE oracles in one fake
#[derive(Default)]
pub struct FakeFhe {
    unavailable: Mutex<bool>,
    pub encrypted_values: Mutex<Vec<u64>>,
}

impl FakeFhe {
    pub fn handle_for(value: u64) -> CiphertextHandle {
        let mut bytes = [0xfe; 32];
        bytes[24..].copy_from_slice(&value.to_be_bytes());
        CiphertextHandle(bytes)
    }

    pub fn go_offline(&self) {
        *self.unavailable.lock().unwrap() = true;
    }
}

#[async_trait]
impl EncryptionOracle for FakeFhe {
    async fn encrypt(&self, _contract: Address, _user: Address, value: u64) -> Result<EncryptedScore> {
        if *self.unavailable.lock().unwrap() {
            return Err(AuditError::Encryption("relayer unreachable".into()));
        }
        self.encrypted_values.lock().unwrap().push(value);
        let ciphertext = Self::handle_for(value);
        Ok(EncryptedScore {
            proof: proof_for(&ciphertext),
            ciphertext,
        })
    }
}

#[async_trait]
impl DecryptionOracle for FakeFhe {
    async fn request_decryption(
        &self,
        handles: Vec<CiphertextHandle>,
        _contract: Address,
    ) -> Result<DecryptionResult> {
        if *self.unavailable.lock().unwrap() {
            return Err(AuditError::Verification("relayer unreachable".into()));
        }
        let handle = handles
            .first()
            .copied()
            .ok_or_else(|| AuditError::Verification("no handles".into()))?;
        let mut value = [0u8; 8];
        value.copy_from_slice(&handle.as_bytes()[24..]);
        let value = u64::from_be_bytes(value);

        Ok(DecryptionResult {
            clear_values: [(handle, value)].into_iter().collect(),
            abi_encoded_clear_values: abi_word(value),
            proof: proof_for(&handle),
        })
    }
}

/// Identity with a fixed address
pub struct FixedIdentity(pub Option<Address>);

impl IdentityProvider for FixedIdentity {
    fn current_address(&self) -> Option<Address> {
        self.0
    }
}

/// Everything an integration test needs
pub struct Harness {
    pub ledger: Arc<FakeLedger>,
    pub fhe: Arc<FakeFhe>,
    pub session: AuditSession,
}

pub fn harness(identity: Option<Address>) -> Harness {
    harness_with(identity, WorkflowConfig::default())
}

pub fn harness_with(identity: Option<Address>, config: WorkflowConfig) -> Harness {
    let ledger = Arc::new(FakeLedger::new(identity.unwrap_or(Address::ZERO)));
    let fhe = Arc::new(FakeFhe::default());
    let session = AuditSession::new(
        config,
        Collaborators {
            reader: ledger.clone(),
            writer: ledger.clone(),
            encryption: fhe.clone(),
            decryption: fhe.clone(),
            identity: Arc::new(FixedIdentity(identity)),
        },
    );
    Harness {
        ledger,
        fhe,
        session,
    }
}
