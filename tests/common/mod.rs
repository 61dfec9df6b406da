//! Common test utilities and fixtures for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use carbon_registry::infra::InMemoryLedgerBuilder;
use carbon_registry::{Address, Amount, BatchId, InMemoryLedger, SessionManager};

/// Contract owner
pub fn owner() -> Address {
    Address::repeat_byte(0x01)
}

/// Authorized verification body
pub fn verification_body() -> Address {
    Address::repeat_byte(0x02)
}

/// Plain credit holder
pub fn holder() -> Address {
    Address::repeat_byte(0x03)
}

pub fn tons(amount: u64) -> Amount {
    Amount::from(amount)
}

/// Ledger with `count` verified batches created by [`verification_body`]
pub fn ledger_with_batches(count: u64) -> InMemoryLedgerBuilder {
    let mut builder = InMemoryLedger::builder(owner()).authorized(verification_body());
    for n in 1..=count {
        builder = builder
            .batch(&format!("Project {}", n), verification_body(), tons(1_000))
            .verified(BatchId(n));
    }
    builder
}

/// Session manager connected as `account`
pub fn connected(account: Address, ledger: Arc<InMemoryLedger>) -> SessionManager {
    let mut sessions = SessionManager::new();
    sessions.connect(account, ledger);
    sessions
}
