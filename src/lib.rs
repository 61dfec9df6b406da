//! Carbon Registry client library
//!
//! Reads and administers an on-chain carbon-credit registry: sequentially
//! numbered credit batches that are created and verified by verification
//! bodies, minted by the contract owner, and transferred or retired by
//! holders.
//!
//! ## Modules
//!
//! - [`domain`] - Batch, balance and permission types
//! - [`infra`] - Ledger traits, errors and the in-process ledger
//! - [`chain`] - Registry contract access over JSON-RPC
//! - [`session`] - Connection lifecycle
//! - [`aggregator`] - Best-effort batch and balance listings
//! - [`queries`] - Point lookups and status
//! - [`actions`] - Transactions with client-side preflight checks
//! - [`telemetry`] - Logging setup

pub mod actions;
pub mod aggregator;
pub mod chain;
pub mod domain;
pub mod infra;
pub mod queries;
pub mod session;
pub mod telemetry;

// Re-export commonly used types
pub use domain::{
    AccountPermissions, Address, Amount, BalanceLookup, Batch, BatchId, BatchOverview,
    ContractStatus, HolderBalance, NewBatch, Submission, TxReceipt,
};

pub use actions::RegistryActions;
pub use aggregator::{BatchAggregator, FetchOutcome};
pub use chain::{ChainConfig, ContractLedger};
pub use infra::{InMemoryLedger, LedgerReader, LedgerWriter, RegistryError, Result, RevertReason};
pub use queries::RegistryQueries;
pub use session::{Session, SessionConfig, SessionManager};
