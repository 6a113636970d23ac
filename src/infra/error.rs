//! Error types for the FHE audit client

use thiserror::Error;

/// Message shown when the user cancelled a wallet prompt
pub const MSG_TRANSACTION_REJECTED: &str = "Transaction rejected";

/// Message shown for every other upload failure
pub const MSG_UPLOAD_FAILED: &str = "Upload failed";

/// Errors raised by gateways, collaborators and the record store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuditError {
    /// Bad user input; nothing was sent anywhere
    #[error("validation error: {0}")]
    Validation(String),

    /// The FHE encryption oracle failed
    #[error("encryption error: {0}")]
    Encryption(String),

    /// A ledger transaction was rejected or reverted
    #[error("submission error: {0}")]
    Submission(String),

    /// The user cancelled a signature or transaction prompt
    #[error("user rejected: {0}")]
    UserRejected(String),

    /// The FHE decryption oracle could not produce cleartext and proof
    #[error("verification error: {0}")]
    Verification(String),

    /// A ledger read failed
    #[error("read error: {0}")]
    Read(String),

    /// A single record could not be decoded
    #[error("failed to decode record {id}: {reason}")]
    Decode { id: String, reason: String },

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuditError {
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, AuditError::UserRejected(_))
    }

    /// User-facing text for a failed upload
    pub fn user_message(&self) -> &'static str {
        if self.is_user_rejection() {
            MSG_TRANSACTION_REJECTED
        } else {
            MSG_UPLOAD_FAILED
        }
    }

    /// Error kind, for structured log fields
    pub fn kind(&self) -> &'static str {
        match self {
            AuditError::Validation(_) => "validation",
            AuditError::Encryption(_) => "encryption",
            AuditError::Submission(_) => "submission",
            AuditError::UserRejected(_) => "user_rejected",
            AuditError::Verification(_) => "verification",
            AuditError::Read(_) => "read",
            AuditError::Decode { .. } => "decode",
            AuditError::Configuration(_) => "configuration",
            AuditError::Internal(_) => "internal",
        }
    }
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, AuditError>;
