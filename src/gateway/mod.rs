//! Gateways over the external FHE services
//!
//! - [`EncryptionGateway`] - plaintext score -> ciphertext + input proof
//! - [`VerificationGateway`] - ciphertext handles -> cleartext, with the
//!   decryption proof submitted on-ledger

mod encryption;
mod verification;

pub use encryption::EncryptionGateway;
pub use verification::VerificationGateway;
