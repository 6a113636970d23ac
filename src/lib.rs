//! FHE Audit Client Library
//!
//! Client core for encrypted code-audit records: a project's vulnerability
//! score is encrypted under FHE before it reaches the ledger, can later be
//! decrypted with an on-ledger verified proof, and the public side of the
//! record set is summarised as risk statistics.
//!
//! ## Modules
//!
//! - [`domain`] - Records, scores, risk statistics, filtering, history
//! - [`infra`] - Errors, collaborator traits, record store
//! - [`gateway`] - Encryption and verification gateways over the FHE oracles
//! - [`workflow`] - Upload state machine and decrypt workflow
//! - [`session`] - Application state combining store, history and workflows
//! - [`chain`] - EVM contract adapter (alloy)
//! - [`config`] - Environment configuration
//! - [`telemetry`] - Logging setup

pub mod chain;
pub mod config;
pub mod domain;
pub mod gateway;
pub mod infra;
pub mod session;
pub mod telemetry;
pub mod workflow;

// Re-export commonly used types
pub use domain::{
    compute_stats, filter_records, AuditRecord, CiphertextHandle, HistoryEntry, HistoryLog,
    RecordId, RiskBand, RiskFilter, RiskStatistics, Score,
};

pub use infra::{AuditError, RecordStore, Result};

pub use session::{AuditSession, Collaborators};

pub use workflow::{DecryptWorkflow, UploadForm, UploadOutcome, UploadWorkflow};
