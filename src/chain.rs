//! EVM ledger collaborator
//!
//! Reads and writes audit records on the FHE audit contract over JSON-RPC.
//! Write calls return as soon as the transaction is accepted by the node;
//! [`ChainPendingTx`] then polls for the receipt.

#![allow(clippy::too_many_arguments)]

use std::time::Duration;

use alloy::network::{EthereumWallet, ReceiptResponse};
use alloy::primitives::{Address, Bytes, FixedBytes, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::ChainConfig;
use crate::domain::{CiphertextHandle, CreateRecordRequest, RecordFields, RecordId, TxReceipt};
use crate::infra::{
    AuditError, IdentityProvider, LedgerReader, LedgerWriter, PendingTransaction, Result,
};

// Generate contract bindings
sol! {
    #[sol(rpc)]
    interface IFheCodeAudit {
        function getAllBusinessIds() external view returns (string[] memory ids);

        function getBusinessData(string calldata businessId) external view returns (
            string memory name,
            uint256 publicValue1,
            uint256 publicValue2,
            string memory description,
            address creator,
            uint256 timestamp,
            bool isVerified,
            uint32 decryptedValue
        );

        function getEncryptedValue(string calldata businessId) external view returns (bytes32 handle);

        function isAvailable() external view returns (bool available);

        function createBusinessData(
            string calldata businessId,
            string calldata name,
            bytes32 encryptedValue,
            bytes calldata inputProof,
            uint256 publicValue1,
            uint256 publicValue2,
            string calldata description
        ) external;

        function verifyDecryption(
            string calldata businessId,
            bytes calldata abiEncodedClearValues,
            bytes calldata decryptionProof
        ) external;
    }
}

/// Classify a failed write: a cancelled wallet prompt versus any other
/// rejection.
pub fn classify_write_error(message: &str) -> AuditError {
    let lower = message.to_lowercase();
    if lower.contains("user rejected")
        || lower.contains("user denied")
        || lower.contains("error code 4001")
    {
        AuditError::UserRejected(message.to_string())
    } else {
        AuditError::Submission(message.to_string())
    }
}

/// Audit contract client
pub struct ChainClient {
    config: ChainConfig,
    signer: PrivateKeySigner,
    poll_interval: Duration,
}

impl ChainClient {
    /// Create a client; fails if the private key does not parse
    pub fn new(config: ChainConfig, poll_interval: Duration) -> Result<Self> {
        let signer: PrivateKeySigner = config
            .private_key
            .parse()
            .map_err(|e| AuditError::Configuration(format!("Invalid private key: {}", e)))?;
        Ok(Self {
            config,
            signer,
            poll_interval,
        })
    }

    pub fn chain_id(&self) -> u64 {
        self.config.chain_id
    }

    /// Identity backed by the local signer
    pub fn identity(&self) -> LocalSignerIdentity {
        LocalSignerIdentity {
            address: self.signer.address(),
        }
    }

    fn pending(&self, tx_hash: TxHash) -> Box<dyn PendingTransaction> {
        Box::new(ChainPendingTx {
            rpc_url: self.config.rpc_url.clone(),
            tx_hash,
            poll_interval: self.poll_interval,
        })
    }
}

#[async_trait]
impl LedgerReader for ChainClient {
    fn contract_address(&self) -> Address {
        self.config.contract_address
    }

    async fn get_all_record_ids(&self) -> Result<Vec<RecordId>> {
        let provider = ProviderBuilder::new().disable_recommended_fillers().connect_http(
            self.config
                .rpc_url
                .parse()
                .map_err(|e| AuditError::Configuration(format!("Invalid RPC URL: {}", e)))?,
        );
        let contract = IFheCodeAudit::new(self.config.contract_address, &provider);

        let result = contract
            .getAllBusinessIds()
            .call()
            .await
            .map_err(|e| AuditError::Read(format!("Contract call failed: {}", e)))?;

        Ok(result.into_iter().map(RecordId::from).collect())
    }

    async fn get_record(&self, id: &RecordId) -> Result<RecordFields> {
        let provider = ProviderBuilder::new().disable_recommended_fillers().connect_http(
            self.config
                .rpc_url
                .parse()
                .map_err(|e| AuditError::Configuration(format!("Invalid RPC URL: {}", e)))?,
        );
        let contract = IFheCodeAudit::new(self.config.contract_address, &provider);

        let data = contract
            .getBusinessData(id.0.clone())
            .call()
            .await
            .map_err(|e| AuditError::Read(format!("Contract call failed for {}: {}", id, e)))?;

        Ok(RecordFields {
            name: data.name,
            description: data.description,
            creator: data.creator,
            timestamp: data.timestamp.saturating_to::<u64>(),
            public_vulnerability_score: data.publicValue1.saturating_to::<u64>(),
            public_complexity: data.publicValue2.saturating_to::<u64>(),
            is_verified: data.isVerified,
            decrypted_value: data.decryptedValue,
        })
    }

    async fn get_ciphertext_handle(&self, id: &RecordId) -> Result<CiphertextHandle> {
        let provider = ProviderBuilder::new().disable_recommended_fillers().connect_http(
            self.config
                .rpc_url
                .parse()
                .map_err(|e| AuditError::Configuration(format!("Invalid RPC URL: {}", e)))?,
        );
        let contract = IFheCodeAudit::new(self.config.contract_address, &provider);

        let result = contract
            .getEncryptedValue(id.0.clone())
            .call()
            .await
            .map_err(|e| AuditError::Read(format!("Contract call failed for {}: {}", id, e)))?;

        Ok(CiphertextHandle(result.0))
    }

    async fn is_available(&self) -> Result<bool> {
        let provider = ProviderBuilder::new().disable_recommended_fillers().connect_http(
            self.config
                .rpc_url
                .parse()
                .map_err(|e| AuditError::Configuration(format!("Invalid RPC URL: {}", e)))?,
        );
        let contract = IFheCodeAudit::new(self.config.contract_address, &provider);

        let result = contract
            .isAvailable()
            .call()
            .await
            .map_err(|e| AuditError::Read(format!("Contract call failed: {}", e)))?;

        Ok(result)
    }
}

#[async_trait]
impl LedgerWriter for ChainClient {
    async fn create_record(
        &self,
        request: CreateRecordRequest,
    ) -> Result<Box<dyn PendingTransaction>> {
        info!(record_id = %request.id, "Sending record creation transaction");

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(self.signer.clone()))
            .connect_http(
                self.config
                    .rpc_url
                    .parse()
                    .map_err(|e| AuditError::Configuration(format!("Invalid RPC URL: {}", e)))?,
            );
        let contract = IFheCodeAudit::new(self.config.contract_address, &provider);

        let tx = contract.createBusinessData(
            request.id.0.clone(),
            request.name,
            FixedBytes::from(*request.encrypted.ciphertext.as_bytes()),
            Bytes::from(request.encrypted.proof),
            U256::from(request.public_vulnerability_score.get()),
            U256::from(request.public_complexity.get()),
            request.description,
        );

        let pending = tx
            .send()
            .await
            .map_err(|e| classify_write_error(&format!("Failed to send transaction: {}", e)))?;

        let tx_hash = *pending.tx_hash();
        info!(record_id = %request.id, %tx_hash, "Creation transaction sent");
        Ok(self.pending(tx_hash))
    }

    async fn submit_verification_proof(
        &self,
        id: &RecordId,
        abi_encoded_clear_values: Vec<u8>,
        proof: Vec<u8>,
    ) -> Result<Box<dyn PendingTransaction>> {
        info!(record_id = %id, "Sending decryption proof");

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(self.signer.clone()))
            .connect_http(
                self.config
                    .rpc_url
                    .parse()
                    .map_err(|e| AuditError::Configuration(format!("Invalid RPC URL: {}", e)))?,
            );
        let contract = IFheCodeAudit::new(self.config.contract_address, &provider);

        let tx = contract.verifyDecryption(
            id.0.clone(),
            Bytes::from(abi_encoded_clear_values),
            Bytes::from(proof),
        );

        let pending = tx
            .send()
            .await
            .map_err(|e| classify_write_error(&format!("Failed to send transaction: {}", e)))?;

        let tx_hash = *pending.tx_hash();
        info!(record_id = %id, %tx_hash, "Decryption proof transaction sent");
        Ok(self.pending(tx_hash))
    }
}

/// A sent transaction awaiting its receipt
pub struct ChainPendingTx {
    rpc_url: String,
    tx_hash: TxHash,
    poll_interval: Duration,
}

#[async_trait]
impl PendingTransaction for ChainPendingTx {
    fn tx_hash(&self) -> TxHash {
        self.tx_hash
    }

    async fn await_confirmation(&mut self) -> Result<TxReceipt> {
        let provider = ProviderBuilder::new().disable_recommended_fillers().connect_http(
            self.rpc_url
                .parse()
                .map_err(|e| AuditError::Configuration(format!("Invalid RPC URL: {}", e)))?,
        );

        loop {
            let receipt = provider
                .get_transaction_receipt(self.tx_hash)
                .await
                .map_err(|e| AuditError::Submission(format!("Failed to get receipt: {}", e)))?;

            match receipt {
                Some(receipt) => {
                    if !ReceiptResponse::status(&receipt) {
                        return Err(AuditError::Submission(format!(
                            "transaction {} reverted",
                            self.tx_hash
                        )));
                    }
                    let block_number = ReceiptResponse::block_number(&receipt);
                    info!(
                        tx_hash = %self.tx_hash,
                        block = block_number.unwrap_or(0),
                        "Transaction confirmed"
                    );
                    return Ok(TxReceipt {
                        tx_hash: ReceiptResponse::transaction_hash(&receipt),
                        block_number,
                    });
                }
                None => {
                    debug!(tx_hash = %self.tx_hash, "Receipt not available yet");
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }
}

/// Identity of a locally held signing key; always connected
#[derive(Debug, Clone, Copy)]
pub struct LocalSignerIdentity {
    address: Address,
}

impl IdentityProvider for LocalSignerIdentity {
    fn current_address(&self) -> Option<Address> {
        Some(self.address)
    }
}
