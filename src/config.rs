//! Client configuration.
//!
//! Everything is read from environment variables; unset or unparsable values
//! fall back to the defaults.

use std::time::Duration;

use alloy::primitives::Address;

use crate::domain::DEFAULT_HISTORY_VIEW;
use crate::infra::{AuditError, Result};
use crate::telemetry::TelemetryConfig;

/// Default chain id (Sepolia)
pub const DEFAULT_CHAIN_ID: u64 = 11_155_111;

/// Chain connection configuration
#[derive(Clone)]
pub struct ChainConfig {
    /// JSON-RPC URL of the chain
    pub rpc_url: String,
    /// Audit contract address
    pub contract_address: Address,
    /// Private key of the local signer (hex)
    pub private_key: String,
    /// Chain ID
    pub chain_id: u64,
}

impl std::fmt::Debug for ChainConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainConfig")
            .field("rpc_url", &self.rpc_url)
            .field("contract_address", &self.contract_address)
            .field("private_key", &"<redacted>")
            .field("chain_id", &self.chain_id)
            .finish()
    }
}

impl ChainConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if a required variable is missing or unparsable.
    pub fn from_env() -> Option<Self> {
        let rpc_url = std::env::var("FHE_AUDIT_RPC_URL").ok()?;
        let contract_address = std::env::var("FHE_AUDIT_CONTRACT_ADDRESS")
            .ok()
            .and_then(|s| s.parse().ok())?;
        let private_key = std::env::var("FHE_AUDIT_PRIVATE_KEY").ok()?;
        let chain_id = std::env::var("FHE_AUDIT_CHAIN_ID")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_CHAIN_ID);

        Some(Self {
            rpc_url,
            contract_address,
            private_key,
            chain_id,
        })
    }

    /// Like [`ChainConfig::from_env`], but names what is missing
    pub fn require_from_env() -> Result<Self> {
        Self::from_env().ok_or_else(|| {
            AuditError::Configuration(
                "FHE_AUDIT_RPC_URL, FHE_AUDIT_CONTRACT_ADDRESS and FHE_AUDIT_PRIVATE_KEY must be set"
                    .to_string(),
            )
        })
    }
}

/// Timing and display settings of the workflows
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// How long a success banner stays up
    pub success_clear_delay: Duration,
    /// How long an error banner stays up
    pub error_clear_delay: Duration,
    /// Number of history entries shown
    pub history_display_limit: usize,
    /// Receipt polling interval while awaiting confirmation
    pub confirmation_poll_interval: Duration,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            success_clear_delay: Duration::from_secs(2),
            error_clear_delay: Duration::from_secs(3),
            history_display_limit: DEFAULT_HISTORY_VIEW,
            confirmation_poll_interval: Duration::from_secs(2),
        }
    }
}

impl WorkflowConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let millis = |key: &str, default: Duration| {
            std::env::var(key)
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(default)
        };

        Self {
            success_clear_delay: millis("FHE_AUDIT_SUCCESS_CLEAR_MS", defaults.success_clear_delay),
            error_clear_delay: millis("FHE_AUDIT_ERROR_CLEAR_MS", defaults.error_clear_delay),
            history_display_limit: std::env::var("FHE_AUDIT_HISTORY_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.history_display_limit),
            confirmation_poll_interval: millis(
                "FHE_AUDIT_POLL_INTERVAL_MS",
                defaults.confirmation_poll_interval,
            ),
        }
    }
}

/// Complete client configuration
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// `None` when no chain is configured
    pub chain: Option<ChainConfig>,
    pub workflow: WorkflowConfig,
    pub telemetry: TelemetryConfig,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self {
            chain: ChainConfig::from_env(),
            workflow: WorkflowConfig::from_env(),
            telemetry: TelemetryConfig::from_env(),
        }
    }
}
