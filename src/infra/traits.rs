//! Trait definitions for the registry contract surface

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::domain::{Address, Amount, Batch, BatchId, NewBatch, TxReceipt};

use super::Result;

/// Read surface of the registry contract.
///
/// Invariant: implementations never mutate ledger state and never cache;
/// every call reflects the ledger at the time it is made.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// Exclusive upper bound of assigned batch ids
    async fn next_batch_id(&self) -> Result<BatchId>;

    /// Stored batch record; fails for ids that were never assigned
    async fn get_batch(&self, id: BatchId) -> Result<Batch>;

    /// `totalMintedPerBatch(id)`
    async fn total_minted(&self, id: BatchId) -> Result<Amount>;

    /// `getBatchRemainingSupply(id)`
    async fn remaining_supply(&self, id: BatchId) -> Result<Amount>;

    /// `balanceOf(holder, id)`
    async fn balance_of(&self, holder: Address, id: BatchId) -> Result<Amount>;

    async fn owner(&self) -> Result<Address>;

    async fn paused(&self) -> Result<bool>;

    async fn is_authorized_verification_body(&self, account: Address) -> Result<bool>;

    /// Address of the contract being read
    fn contract_address(&self) -> Address;
}

/// Mutating surface of the registry contract.
///
/// Each call submits one transaction signed by `caller` and resolves once
/// the receipt is available. Authorization and supply rules are enforced by
/// the contract, not here.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LedgerWriter: Send + Sync {
    async fn create_batch(&self, caller: Address, batch: &NewBatch) -> Result<TxReceipt>;

    async fn verify_batch(&self, caller: Address, id: BatchId) -> Result<TxReceipt>;

    async fn mint(
        &self,
        caller: Address,
        to: Address,
        id: BatchId,
        amount: Amount,
    ) -> Result<TxReceipt>;

    async fn retire_and_burn(
        &self,
        caller: Address,
        id: BatchId,
        amount: Amount,
        esg_report_ref: &str,
    ) -> Result<TxReceipt>;

    /// `safeTransferFrom(from, to, id, amount, "")`
    async fn transfer(
        &self,
        caller: Address,
        from: Address,
        to: Address,
        id: BatchId,
        amount: Amount,
    ) -> Result<TxReceipt>;

    async fn authorize_verification_body(
        &self,
        caller: Address,
        account: Address,
    ) -> Result<TxReceipt>;

    async fn pause(&self, caller: Address) -> Result<TxReceipt>;

    async fn unpause(&self, caller: Address) -> Result<TxReceipt>;

    async fn transfer_ownership(&self, caller: Address, new_owner: Address) -> Result<TxReceipt>;

    async fn renounce_ownership(&self, caller: Address) -> Result<TxReceipt>;
}
