//! Infrastructure layer for the carbon-credit registry client
//!
//! Contains trait definitions and implementations for:
//! - The registry contract read and transaction surfaces
//! - An in-process ledger with the contract's rules (tests, local sandbox)

mod error;
pub mod memory;
mod traits;

pub use error::*;
pub use memory::{CallCounts, InMemoryLedger, InMemoryLedgerBuilder};
pub use traits::*;
