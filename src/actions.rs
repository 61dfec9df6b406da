//! Registry transactions
//!
//! Each action checks what the client can see before spending gas (roles,
//! verification, expiry, remaining supply), then submits exactly one
//! transaction as the session account and waits for it to be mined. The
//! contract re-checks everything; these checks only turn predictable reverts
//! into clear errors.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::domain::{Address, Amount, BatchId, NewBatch, Submission};
use crate::infra::{LedgerReader, LedgerWriter, RegistryError, Result};
use crate::session::Session;

/// Transactions on behalf of the session account
#[derive(Clone)]
pub struct RegistryActions {
    account: Address,
    reader: Arc<dyn LedgerReader>,
    writer: Arc<dyn LedgerWriter>,
}

impl RegistryActions {
    pub fn new(session: &Session) -> Self {
        Self {
            account: session.account(),
            reader: session.reader(),
            writer: session.writer(),
        }
    }

    pub fn for_session(session: Option<&Session>) -> Result<Self> {
        session.map(Self::new).ok_or(RegistryError::NotConnected)
    }

    pub fn account(&self) -> Address {
        self.account
    }

    async fn is_owner(&self) -> Result<bool> {
        Ok(self.reader.owner().await? == self.account)
    }

    async fn require_owner(&self, action: &str) -> Result<()> {
        if !self.is_owner().await? {
            warn!("{} rejected: {} is not the contract owner", action, self.account);
            return Err(RegistryError::Unauthorized(format!(
                "only the contract owner can {}",
                action
            )));
        }
        Ok(())
    }

    fn require_positive(amount: Amount) -> Result<()> {
        if amount.is_zero() {
            return Err(RegistryError::InvalidInput(
                "amount must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Create a batch; the session account becomes its verification body.
    pub async fn create_batch(&self, batch: &NewBatch) -> Result<Submission> {
        if batch.project_name.trim().is_empty() {
            return Err(RegistryError::InvalidInput("project name is required".to_string()));
        }
        if batch.verification_doc_hash.trim().is_empty() {
            return Err(RegistryError::InvalidInput(
                "verification document hash is required".to_string(),
            ));
        }
        Self::require_positive(batch.total_emission_reduction)?;

        if !self
            .reader
            .is_authorized_verification_body(self.account)
            .await?
        {
            let hint = if self.is_owner().await? {
                "authorize this account as a verification body first (authorize-self)"
            } else {
                "ask the contract owner to authorize this account"
            };
            warn!("create batch rejected: {} is not a verification body", self.account);
            return Err(RegistryError::Unauthorized(format!(
                "{} is not an authorized verification body; {}",
                self.account, hint
            )));
        }

        let receipt = self.writer.create_batch(self.account, batch).await?;
        info!("Batch '{}' created", batch.project_name);
        Ok(Submission::Confirmed(receipt))
    }

    /// Verify a batch created by the session account
    pub async fn verify_batch(&self, id: BatchId) -> Result<Submission> {
        let batch = self.reader.get_batch(id).await?;
        if batch.verification_body != self.account {
            return Err(RegistryError::Unauthorized(
                "only the batch creator can verify this batch".to_string(),
            ));
        }
        if batch.is_verified {
            return Ok(Submission::Unchanged {
                reason: format!("batch {} is already verified", id),
            });
        }

        let receipt = self.writer.verify_batch(self.account, id).await?;
        Ok(Submission::Confirmed(receipt))
    }

    /// Mint credits of a verified, unexpired batch to `to`
    pub async fn mint(&self, to: Address, id: BatchId, amount: Amount) -> Result<Submission> {
        Self::require_positive(amount)?;
        self.require_owner("mint tokens").await?;

        let batch = self.reader.get_batch(id).await?;
        if !batch.is_verified {
            return Err(RegistryError::Precondition(format!(
                "batch {} is not verified, cannot mint",
                id
            )));
        }
        if batch.is_expired_at(Utc::now()) {
            return Err(RegistryError::Precondition(format!(
                "batch {} expired at {}, cannot mint",
                id,
                batch.expiry()
            )));
        }

        let remaining = self.reader.remaining_supply(id).await?;
        if amount > remaining {
            return Err(RegistryError::Precondition(format!(
                "mint amount {} exceeds remaining supply {} of batch {}",
                amount, remaining, id
            )));
        }

        let receipt = self.writer.mint(self.account, to, id, amount).await?;
        Ok(Submission::Confirmed(receipt))
    }

    /// Retire (burn) credits held by the session account
    pub async fn retire(
        &self,
        id: BatchId,
        amount: Amount,
        esg_report_ref: &str,
    ) -> Result<Submission> {
        Self::require_positive(amount)?;
        let receipt = self
            .writer
            .retire_and_burn(self.account, id, amount, esg_report_ref)
            .await?;
        Ok(Submission::Confirmed(receipt))
    }

    /// Transfer credits from the session account to `to`
    pub async fn transfer(&self, to: Address, id: BatchId, amount: Amount) -> Result<Submission> {
        Self::require_positive(amount)?;
        if to == Address::ZERO {
            return Err(RegistryError::InvalidInput(
                "cannot transfer to the zero address".to_string(),
            ));
        }
        let receipt = self
            .writer
            .transfer(self.account, self.account, to, id, amount)
            .await?;
        Ok(Submission::Confirmed(receipt))
    }

    pub async fn authorize_verification_body(&self, account: Address) -> Result<Submission> {
        let receipt = self
            .writer
            .authorize_verification_body(self.account, account)
            .await?;
        Ok(Submission::Confirmed(receipt))
    }

    /// Owner authorizes itself as a verification body
    pub async fn authorize_self(&self) -> Result<Submission> {
        self.require_owner("authorize verification bodies").await?;
        if self
            .reader
            .is_authorized_verification_body(self.account)
            .await?
        {
            return Ok(Submission::Unchanged {
                reason: "account is already an authorized verification body".to_string(),
            });
        }
        self.authorize_verification_body(self.account).await
    }

    pub async fn pause(&self) -> Result<Submission> {
        let receipt = self.writer.pause(self.account).await?;
        Ok(Submission::Confirmed(receipt))
    }

    pub async fn unpause(&self) -> Result<Submission> {
        let receipt = self.writer.unpause(self.account).await?;
        Ok(Submission::Confirmed(receipt))
    }

    pub async fn transfer_ownership(&self, new_owner: Address) -> Result<Submission> {
        let owner = self.reader.owner().await?;
        if owner != self.account {
            return Err(RegistryError::Unauthorized(
                "only the contract owner can transfer ownership".to_string(),
            ));
        }
        if new_owner == owner {
            return Err(RegistryError::InvalidInput(
                "new owner cannot be the current owner".to_string(),
            ));
        }

        let receipt = self.writer.transfer_ownership(self.account, new_owner).await?;
        Ok(Submission::Confirmed(receipt))
    }

    /// Leave the contract without an owner. Irreversible.
    pub async fn renounce_ownership(&self) -> Result<Submission> {
        self.require_owner("renounce ownership").await?;
        let receipt = self.writer.renounce_ownership(self.account).await?;
        Ok(Submission::Confirmed(receipt))
    }
}
