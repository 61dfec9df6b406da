//! Point reads against the registry
//!
//! Unlike the listings in [`crate::aggregator`], these fail on any read
//! error: a caller asking for one batch wants to know it does not exist.

use std::sync::Arc;

use crate::domain::{
    AccountPermissions, Address, BalanceLookup, BatchId, BatchOverview, ContractStatus,
};
use crate::infra::{LedgerReader, RegistryError, Result};
use crate::session::Session;

/// Single-item registry lookups
#[derive(Clone)]
pub struct RegistryQueries {
    ledger: Arc<dyn LedgerReader>,
}

impl RegistryQueries {
    pub fn new(ledger: Arc<dyn LedgerReader>) -> Self {
        Self { ledger }
    }

    pub fn for_session(session: Option<&Session>) -> Result<Self> {
        let session = session.ok_or(RegistryError::NotConnected)?;
        Ok(Self::new(session.reader()))
    }

    /// One batch with fresh minted and remaining supply
    pub async fn batch_details(&self, id: BatchId) -> Result<BatchOverview> {
        let batch = self.ledger.get_batch(id).await?;
        let remaining_supply = self.ledger.remaining_supply(id).await?;
        let total_minted = self.ledger.total_minted(id).await?;

        Ok(BatchOverview {
            batch,
            total_minted,
            remaining_supply,
        })
    }

    /// Balance of `holder` in one batch; zero balances are returned too
    pub async fn balance_of(&self, holder: Address, id: BatchId) -> Result<BalanceLookup> {
        let balance = self.ledger.balance_of(holder, id).await?;
        let batch = self.ledger.get_batch(id).await?;

        Ok(BalanceLookup {
            holder,
            batch_id: id,
            project_name: batch.project_name,
            balance,
        })
    }

    pub async fn contract_status(&self) -> Result<ContractStatus> {
        let paused = self.ledger.paused().await?;
        let owner = self.ledger.owner().await?;
        let next_batch_id = self.ledger.next_batch_id().await?;

        Ok(ContractStatus {
            contract_address: self.ledger.contract_address(),
            paused,
            owner,
            next_batch_id,
        })
    }

    pub async fn permissions(&self, account: Address) -> Result<AccountPermissions> {
        let owner = self.ledger.owner().await?;
        let is_authorized_verification_body =
            self.ledger.is_authorized_verification_body(account).await?;
        let paused = self.ledger.paused().await?;

        Ok(AccountPermissions {
            account,
            owner,
            is_owner: account == owner,
            is_authorized_verification_body,
            paused,
        })
    }
}
