//! Batch enumeration and aggregation
//!
//! Walks the assigned batch id range `[1, nextBatchId)` and builds the two
//! listings the dashboard shows: every batch with its supply counters, and the
//! positive holdings of one account.
//!
//! Listings are best effort. Only a failure to read the upper bound aborts a
//! listing; an id whose reads fail is left out and the walk continues. Ids are
//! visited one at a time in ascending order and results keep that order.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::domain::{Address, BatchId, BatchOverview, HolderBalance};
use crate::infra::{LedgerReader, RegistryError, Result};
use crate::session::Session;

/// Per-id result of a listing step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome<T> {
    Found(T),
    /// Nothing to report for this id: not assigned, zero balance or a failed read
    Absent { reason: String },
}

impl<T> FetchOutcome<T> {
    fn absent(reason: impl Into<String>) -> Self {
        FetchOutcome::Absent {
            reason: reason.into(),
        }
    }

    pub fn found(self) -> Option<T> {
        match self {
            FetchOutcome::Found(value) => Some(value),
            FetchOutcome::Absent { .. } => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, FetchOutcome::Found(_))
    }

    fn map_found<U>(self, f: impl FnOnce(T) -> U) -> FetchOutcome<U> {
        match self {
            FetchOutcome::Found(value) => FetchOutcome::Found(f(value)),
            FetchOutcome::Absent { reason } => FetchOutcome::Absent { reason },
        }
    }
}

impl<T> From<Result<T>> for FetchOutcome<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(value) => FetchOutcome::Found(value),
            Err(err) => FetchOutcome::absent(err.to_string()),
        }
    }
}

/// Read-only listings over the registry
#[derive(Clone)]
pub struct BatchAggregator {
    ledger: Arc<dyn LedgerReader>,
    account: Option<Address>,
}

impl BatchAggregator {
    pub fn new(ledger: Arc<dyn LedgerReader>) -> Self {
        Self {
            ledger,
            account: None,
        }
    }

    /// Aggregator bound to a connected session
    pub fn for_session(session: Option<&Session>) -> Result<Self> {
        let session = session.ok_or(RegistryError::NotConnected)?;
        Ok(Self {
            ledger: session.reader(),
            account: Some(session.account()),
        })
    }

    /// All batches with their minted and remaining supply, ascending by id.
    #[instrument(skip(self))]
    pub async fn list_all_batches(&self) -> Result<Vec<BatchOverview>> {
        let bound = self.upper_bound().await?;

        let mut batches = Vec::new();
        for id in BatchId::range_below(bound) {
            match self.fetch_overview(id).await {
                FetchOutcome::Found(overview) => batches.push(overview),
                FetchOutcome::Absent { reason } => debug!("skipping batch {}: {}", id, reason),
            }
        }

        debug!("listed {} of {} batch ids", batches.len(), bound.0.saturating_sub(1));
        Ok(batches)
    }

    /// Batches in which `holder` has a positive balance, ascending by id.
    #[instrument(skip(self))]
    pub async fn list_balances_for(&self, holder: Address) -> Result<Vec<HolderBalance>> {
        let bound = self.upper_bound().await?;

        let mut balances = Vec::new();
        for id in BatchId::range_below(bound) {
            match self.fetch_balance(holder, id).await {
                FetchOutcome::Found(balance) => balances.push(balance),
                FetchOutcome::Absent { reason } => {
                    debug!("no balance row for batch {}: {}", id, reason)
                }
            }
        }

        Ok(balances)
    }

    /// Holdings of the session account
    pub async fn list_my_balances(&self) -> Result<Vec<HolderBalance>> {
        let account = self.account.ok_or(RegistryError::NotConnected)?;
        self.list_balances_for(account).await
    }

    async fn upper_bound(&self) -> Result<BatchId> {
        self.ledger
            .next_batch_id()
            .await
            .map_err(|err| RegistryError::Retrieval(Box::new(err)))
    }

    async fn fetch_overview(&self, id: BatchId) -> FetchOutcome<BatchOverview> {
        let batch = match self.ledger.get_batch(id).await {
            Ok(batch) => batch,
            Err(err) => return FetchOutcome::absent(err.to_string()),
        };
        let total_minted = match self.ledger.total_minted(id).await {
            Ok(amount) => amount,
            Err(err) => return FetchOutcome::absent(err.to_string()),
        };
        let remaining_supply = match self.ledger.remaining_supply(id).await {
            Ok(amount) => amount,
            Err(err) => return FetchOutcome::absent(err.to_string()),
        };

        FetchOutcome::Found(BatchOverview {
            batch,
            total_minted,
            remaining_supply,
        })
    }

    async fn fetch_balance(&self, holder: Address, id: BatchId) -> FetchOutcome<HolderBalance> {
        let balance = match self.ledger.balance_of(holder, id).await {
            Ok(balance) => balance,
            Err(err) => return FetchOutcome::absent(err.to_string()),
        };
        // Zero balance: skip the batch read entirely
        if balance.is_zero() {
            return FetchOutcome::absent("zero balance");
        }

        FetchOutcome::from(self.ledger.get_batch(id).await).map_found(|batch| HolderBalance {
            batch_id: id,
            balance,
            project_name: batch.project_name,
        })
    }
}
