//! Domain models for the FHE audit client
//!
//! Plain data and pure functions: records, risk statistics, filtering and
//! the session history.

mod filter;
mod history;
mod record;
mod stats;
mod types;

pub use filter::*;
pub use history::*;
pub use record::*;
pub use stats::*;
pub use types::*;
