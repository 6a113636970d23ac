//! Infrastructure layer for the FHE audit client
//!
//! Contains:
//! - Error types
//! - Collaborator traits (ledger read/write, FHE oracles, identity)
//! - Record store (snapshot of the ledger's audit records)

mod error;
mod record_store;
mod traits;

pub use error::*;
pub use record_store::RecordStore;
pub use traits::*;
