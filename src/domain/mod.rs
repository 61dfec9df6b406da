//! Domain models for the carbon-credit registry
//!
//! Batches, balances and permission views as read from the registry contract.

mod batch;
mod types;

pub use batch::*;
pub use types::*;
