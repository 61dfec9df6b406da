//! Carbon-credit batch records and the derived views built from them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::{u256_dec, Address, Amount, BatchId, Expiry, TxHash};

/// Read-only projection of a batch as stored by the registry contract.
///
/// Minted and remaining supply are not part of the stored record; they are
/// separate contract reads (see [`BatchOverview`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub id: BatchId,
    pub project_name: String,
    /// Account that created the batch and is the only one allowed to verify it
    pub verification_body: Address,
    /// Supply cap for the batch
    #[serde(with = "u256_dec")]
    pub total_emission_reduction: Amount,
    /// Seconds since epoch
    pub issued_date: u64,
    /// Seconds since epoch, `0` = never expires
    pub expiry_date: u64,
    pub is_verified: bool,
    pub verification_doc_hash: String,
    /// Amount retired by holders
    #[serde(with = "u256_dec")]
    pub burned_amount: Amount,
}

impl Batch {
    pub fn expiry(&self) -> Expiry {
        Expiry::from_unix(self.expiry_date)
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        match Expiry::from_unix(self.issued_date) {
            Expiry::At(at) => Some(at),
            Expiry::Never => None,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry().is_expired_at(now)
    }
}

/// A batch together with its supply counters, as read in one listing pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOverview {
    #[serde(flatten)]
    pub batch: Batch,
    #[serde(with = "u256_dec")]
    pub total_minted: Amount,
    /// Ledger-computed `total_emission_reduction - total_minted`
    #[serde(with = "u256_dec")]
    pub remaining_supply: Amount,
}

impl BatchOverview {
    pub fn id(&self) -> BatchId {
        self.batch.id
    }
}

/// Positive holding of one account in one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderBalance {
    pub batch_id: BatchId,
    #[serde(with = "u256_dec")]
    pub balance: Amount,
    pub project_name: String,
}

/// Result of a point lookup of `balanceOf(holder, batch)`; may be zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceLookup {
    pub holder: Address,
    pub batch_id: BatchId,
    pub project_name: String,
    #[serde(with = "u256_dec")]
    pub balance: Amount,
}

impl BalanceLookup {
    pub fn has_balance(&self) -> bool {
        !self.balance.is_zero()
    }
}

/// Contract-wide status shown on the dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractStatus {
    pub contract_address: Address,
    pub paused: bool,
    pub owner: Address,
    pub next_batch_id: BatchId,
}

/// What an account may do on the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountPermissions {
    pub account: Address,
    pub owner: Address,
    pub is_owner: bool,
    pub is_authorized_verification_body: bool,
    pub paused: bool,
}

impl AccountPermissions {
    /// Owner that still has to authorize itself before creating batches
    pub fn can_self_authorize(&self) -> bool {
        self.is_owner && !self.is_authorized_verification_body
    }
}

/// Parameters of `createCarbonCreditBatch`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBatch {
    pub project_name: String,
    #[serde(with = "u256_dec")]
    pub total_emission_reduction: Amount,
    /// Seconds since epoch, `0` = never expires
    pub expiry_date: u64,
    pub verification_doc_hash: String,
}

/// Confirmation of a mined registry transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub action: String,
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
}

/// Outcome of a registry action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Submission {
    /// A transaction was sent and mined
    Confirmed(TxReceipt),
    /// The requested state already held; nothing was sent
    Unchanged { reason: String },
}

impl Submission {
    pub fn receipt(&self) -> Option<&TxReceipt> {
        match self {
            Submission::Confirmed(receipt) => Some(receipt),
            Submission::Unchanged { .. } => None,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, Submission::Confirmed(_))
    }
}
