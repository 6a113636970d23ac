//! User-facing workflows
//!
//! - [`upload`] - validate, encrypt, submit and confirm a new record
//! - [`decrypt`] - verified decryption of a record's protected score

pub mod decrypt;
pub mod upload;

pub use decrypt::DecryptWorkflow;
pub use upload::{
    transition, validate_upload, StatusKind, TransactionStatus, UploadEffect, UploadEvent,
    UploadForm, UploadOutcome, UploadPhase, UploadState, UploadWorkflow,
};
