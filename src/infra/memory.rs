//! In-process registry ledger
//!
//! Mirrors the registry contract's observable rules closely enough to drive
//! the client without a chain:
//! - Sequential batch ids starting at 1, unassigned ids revert on read
//! - Owner / verification-body / batch-creator authorization
//! - Supply cap, expiry and pause checks on mint
//! - Checked arithmetic: overflowing amounts revert like Solidity's `Panic(0x11)`
//! - Per-call counters and read-fault injection for tests

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use alloy::primitives::keccak256;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::domain::{Address, Amount, Batch, BatchId, NewBatch, TxReceipt, U256};

use super::{LedgerReader, LedgerWriter, RegistryError, Result};

/// Number of calls served, per contract method
#[derive(Default)]
pub struct CallCounts {
    next_batch_id: AtomicU64,
    get_batch: AtomicU64,
    total_minted: AtomicU64,
    remaining_supply: AtomicU64,
    balance_of: AtomicU64,
    transactions: AtomicU64,
}

impl CallCounts {
    pub fn next_batch_id(&self) -> u64 {
        self.next_batch_id.load(Ordering::Relaxed)
    }

    pub fn get_batch(&self) -> u64 {
        self.get_batch.load(Ordering::Relaxed)
    }

    pub fn total_minted(&self) -> u64 {
        self.total_minted.load(Ordering::Relaxed)
    }

    pub fn remaining_supply(&self) -> u64 {
        self.remaining_supply.load(Ordering::Relaxed)
    }

    pub fn balance_of(&self) -> u64 {
        self.balance_of.load(Ordering::Relaxed)
    }

    /// Transactions accepted (reverted ones included)
    pub fn transactions(&self) -> u64 {
        self.transactions.load(Ordering::Relaxed)
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone)]
struct StoredBatch {
    batch: Batch,
    minted: Amount,
}

#[derive(Debug, Clone)]
struct LedgerState {
    owner: Address,
    paused: bool,
    authorized: HashSet<Address>,
    batches: BTreeMap<BatchId, StoredBatch>,
    next_batch_id: BatchId,
    balances: HashMap<(Address, BatchId), Amount>,
    failing_reads: HashSet<BatchId>,
    failing_records: HashSet<BatchId>,
    fail_bound: bool,
    tx_count: u64,
}

/// Builder for [`InMemoryLedger`]
pub struct InMemoryLedgerBuilder {
    contract_address: Address,
    state: LedgerState,
    next_batch_id: Option<BatchId>,
}

impl InMemoryLedgerBuilder {
    fn new(owner: Address) -> Self {
        Self {
            contract_address: Address::repeat_byte(0xcc),
            state: LedgerState {
                owner,
                paused: false,
                authorized: HashSet::new(),
                batches: BTreeMap::new(),
                next_batch_id: BatchId::FIRST,
                balances: HashMap::new(),
                failing_reads: HashSet::new(),
                failing_records: HashSet::new(),
                fail_bound: false,
                tx_count: 0,
            },
            next_batch_id: None,
        }
    }

    pub fn contract_address(mut self, address: Address) -> Self {
        self.contract_address = address;
        self
    }

    pub fn paused(mut self, paused: bool) -> Self {
        self.state.paused = paused;
        self
    }

    pub fn authorized(mut self, account: Address) -> Self {
        self.state.authorized.insert(account);
        self
    }

    /// Add a batch under the next free id.
    pub fn batch(
        mut self,
        project_name: &str,
        verification_body: Address,
        total_emission_reduction: Amount,
    ) -> Self {
        let id = BatchId(self.state.batches.keys().last().map(|id| id.0 + 1).unwrap_or(1));
        let batch = Batch {
            id,
            project_name: project_name.to_string(),
            verification_body,
            total_emission_reduction,
            issued_date: Utc::now().timestamp().max(0) as u64,
            expiry_date: 0,
            is_verified: false,
            verification_doc_hash: format!("doc-{}", id),
            burned_amount: U256::ZERO,
        };
        self.state.batches.insert(
            id,
            StoredBatch {
                batch,
                minted: U256::ZERO,
            },
        );
        self
    }

    /// Insert a fully specified batch record under its own id.
    pub fn stored_batch(mut self, batch: Batch, minted: Amount) -> Self {
        self.state.batches.insert(batch.id, StoredBatch { batch, minted });
        self
    }

    pub fn verified(mut self, id: BatchId) -> Self {
        if let Some(stored) = self.state.batches.get_mut(&id) {
            stored.batch.is_verified = true;
        }
        self
    }

    pub fn expiry(mut self, id: BatchId, expiry_date: u64) -> Self {
        if let Some(stored) = self.state.batches.get_mut(&id) {
            stored.batch.expiry_date = expiry_date;
        }
        self
    }

    /// Record a minted holding; counts towards the batch's minted supply.
    pub fn balance(mut self, holder: Address, id: BatchId, amount: Amount) -> Self {
        if let Some(stored) = self.state.batches.get_mut(&id) {
            stored.minted = stored.minted.saturating_add(amount);
        }
        let balance = self.state.balances.entry((holder, id)).or_default();
        *balance = balance.saturating_add(amount);
        self
    }

    /// Override the upper bound, e.g. to leave a hole past the last batch.
    pub fn next_batch_id(mut self, bound: BatchId) -> Self {
        self.next_batch_id = Some(bound);
        self
    }

    /// Make every per-batch read of `id` fail
    pub fn unresolvable(mut self, id: BatchId) -> Self {
        self.state.failing_reads.insert(id);
        self
    }

    pub fn build(mut self) -> InMemoryLedger {
        let derived = BatchId(self.state.batches.keys().last().map(|id| id.0 + 1).unwrap_or(1));
        self.state.next_batch_id = self.next_batch_id.unwrap_or(derived);
        InMemoryLedger {
            contract_address: self.contract_address,
            state: RwLock::new(self.state),
            counts: CallCounts::default(),
        }
    }
}

/// Registry ledger held in process memory
pub struct InMemoryLedger {
    contract_address: Address,
    state: RwLock<LedgerState>,
    counts: CallCounts,
}

impl InMemoryLedger {
    pub fn builder(owner: Address) -> InMemoryLedgerBuilder {
        InMemoryLedgerBuilder::new(owner)
    }

    pub fn counts(&self) -> &CallCounts {
        &self.counts
    }

    pub async fn fail_reads_for(&self, id: BatchId) {
        self.state.write().await.failing_reads.insert(id);
    }

    /// Fail only `getCarbonCreditBatch` for `id`; supply and balance reads still succeed
    pub async fn fail_record_reads_for(&self, id: BatchId) {
        self.state.write().await.failing_records.insert(id);
    }

    pub async fn restore_reads_for(&self, id: BatchId) {
        let mut state = self.state.write().await;
        state.failing_reads.remove(&id);
        state.failing_records.remove(&id);
    }

    /// Make `nextBatchId` fail until cleared
    pub async fn fail_next_batch_id(&self, fail: bool) {
        self.state.write().await.fail_bound = fail;
    }

    fn stored<'a>(state: &'a LedgerState, id: BatchId) -> Result<&'a StoredBatch> {
        if state.failing_reads.contains(&id) {
            return Err(RegistryError::call("getCarbonCreditBatch", "read fault injected"));
        }
        state.batches.get(&id).ok_or(RegistryError::BatchNotFound(id))
    }

    fn revert(action: &'static str, message: &str) -> RegistryError {
        RegistryError::transaction(action, format!("execution reverted: {}", message))
    }

    fn require_owner(state: &LedgerState, caller: Address, action: &'static str) -> Result<()> {
        if caller != state.owner {
            return Err(Self::revert(
                action,
                &format!("OwnableUnauthorizedAccount({})", caller),
            ));
        }
        Ok(())
    }

    fn checked_add(action: &'static str, current: Amount, amount: Amount) -> Result<Amount> {
        current
            .checked_add(amount)
            .ok_or_else(|| Self::revert(action, "Panic(0x11): arithmetic overflow"))
    }

    fn require_not_paused(state: &LedgerState, action: &'static str) -> Result<()> {
        if state.paused {
            return Err(Self::revert(action, "EnforcedPause()"));
        }
        Ok(())
    }

    fn receipt(&self, state: &mut LedgerState, action: &str) -> TxReceipt {
        state.tx_count += 1;
        TxReceipt {
            action: action.to_string(),
            tx_hash: keccak256(state.tx_count.to_be_bytes()),
            block_number: Some(state.tx_count),
        }
    }

    fn debit(
        state: &mut LedgerState,
        action: &'static str,
        holder: Address,
        id: BatchId,
        amount: Amount,
    ) -> Result<()> {
        let balance = state.balances.entry((holder, id)).or_default();
        if *balance < amount {
            return Err(Self::revert(
                action,
                &format!("ERC1155InsufficientBalance({}, {}, {}, {})", holder, balance, amount, id),
            ));
        }
        *balance -= amount;
        Ok(())
    }

    fn credit(
        state: &mut LedgerState,
        action: &'static str,
        holder: Address,
        id: BatchId,
        amount: Amount,
    ) -> Result<()> {
        let balance = state.balances.entry((holder, id)).or_default();
        *balance = Self::checked_add(action, *balance, amount)?;
        Ok(())
    }
}

#[async_trait]
impl LedgerReader for InMemoryLedger {
    async fn next_batch_id(&self) -> Result<BatchId> {
        CallCounts::bump(&self.counts.next_batch_id);
        let state = self.state.read().await;
        if state.fail_bound {
            return Err(RegistryError::call("nextBatchId", "read fault injected"));
        }
        Ok(state.next_batch_id)
    }

    async fn get_batch(&self, id: BatchId) -> Result<Batch> {
        CallCounts::bump(&self.counts.get_batch);
        let state = self.state.read().await;
        if state.failing_records.contains(&id) {
            return Err(RegistryError::call("getCarbonCreditBatch", "read fault injected"));
        }
        Self::stored(&state, id).map(|stored| stored.batch.clone())
    }

    async fn total_minted(&self, id: BatchId) -> Result<Amount> {
        CallCounts::bump(&self.counts.total_minted);
        let state = self.state.read().await;
        if state.failing_reads.contains(&id) {
            return Err(RegistryError::call("totalMintedPerBatch", "read fault injected"));
        }
        // Unassigned ids read as zero on the contract's mapping
        Ok(state
            .batches
            .get(&id)
            .map(|stored| stored.minted)
            .unwrap_or(U256::ZERO))
    }

    async fn remaining_supply(&self, id: BatchId) -> Result<Amount> {
        CallCounts::bump(&self.counts.remaining_supply);
        let state = self.state.read().await;
        let stored = Self::stored(&state, id)?;
        Ok(stored.batch.total_emission_reduction.saturating_sub(stored.minted))
    }

    async fn balance_of(&self, holder: Address, id: BatchId) -> Result<Amount> {
        CallCounts::bump(&self.counts.balance_of);
        let state = self.state.read().await;
        if state.failing_reads.contains(&id) {
            return Err(RegistryError::call("balanceOf", "read fault injected"));
        }
        Ok(state
            .balances
            .get(&(holder, id))
            .copied()
            .unwrap_or(U256::ZERO))
    }

    async fn owner(&self) -> Result<Address> {
        Ok(self.state.read().await.owner)
    }

    async fn paused(&self) -> Result<bool> {
        Ok(self.state.read().await.paused)
    }

    async fn is_authorized_verification_body(&self, account: Address) -> Result<bool> {
        Ok(self.state.read().await.authorized.contains(&account))
    }

    fn contract_address(&self) -> Address {
        self.contract_address
    }
}

#[async_trait]
impl LedgerWriter for InMemoryLedger {
    async fn create_batch(&self, caller: Address, new_batch: &NewBatch) -> Result<TxReceipt> {
        const ACTION: &str = "createCarbonCreditBatch";
        CallCounts::bump(&self.counts.transactions);
        let mut state = self.state.write().await;
        Self::require_not_paused(&state, ACTION)?;
        if !state.authorized.contains(&caller) {
            return Err(Self::revert(ACTION, "Not authorized verification body"));
        }

        let id = state.next_batch_id;
        let batch = Batch {
            id,
            project_name: new_batch.project_name.clone(),
            verification_body: caller,
            total_emission_reduction: new_batch.total_emission_reduction,
            issued_date: Utc::now().timestamp().max(0) as u64,
            expiry_date: new_batch.expiry_date,
            is_verified: false,
            verification_doc_hash: new_batch.verification_doc_hash.clone(),
            burned_amount: U256::ZERO,
        };
        state.batches.insert(
            id,
            StoredBatch {
                batch,
                minted: U256::ZERO,
            },
        );
        state.next_batch_id = BatchId(id.0 + 1);
        Ok(self.receipt(&mut state, ACTION))
    }

    async fn verify_batch(&self, caller: Address, id: BatchId) -> Result<TxReceipt> {
        const ACTION: &str = "verifyCarbonCreditBatch";
        CallCounts::bump(&self.counts.transactions);
        let mut state = self.state.write().await;
        let stored = state
            .batches
            .get_mut(&id)
            .ok_or_else(|| Self::revert(ACTION, "Batch does not exist"))?;
        if stored.batch.verification_body != caller {
            return Err(Self::revert(ACTION, "Only batch creator can verify"));
        }
        if stored.batch.is_verified {
            return Err(Self::revert(ACTION, "Batch already verified"));
        }
        stored.batch.is_verified = true;
        Ok(self.receipt(&mut state, ACTION))
    }

    async fn mint(
        &self,
        caller: Address,
        to: Address,
        id: BatchId,
        amount: Amount,
    ) -> Result<TxReceipt> {
        const ACTION: &str = "mintCarbonCredit";
        CallCounts::bump(&self.counts.transactions);
        let mut state = self.state.write().await;
        Self::require_owner(&state, caller, ACTION)?;
        Self::require_not_paused(&state, ACTION)?;
        let stored = state
            .batches
            .get_mut(&id)
            .ok_or_else(|| Self::revert(ACTION, "Batch does not exist"))?;
        if !stored.batch.is_verified {
            return Err(Self::revert(ACTION, "Batch not verified"));
        }
        if stored.batch.is_expired_at(Utc::now()) {
            return Err(Self::revert(ACTION, "Batch expired"));
        }
        let minted = Self::checked_add(ACTION, stored.minted, amount)?;
        if minted > stored.batch.total_emission_reduction {
            return Err(Self::revert(ACTION, "Exceeds total reduction amount"));
        }
        // Credit before committing the supply so a failed credit leaves both untouched
        Self::credit(&mut state, ACTION, to, id, amount)?;
        if let Some(stored) = state.batches.get_mut(&id) {
            stored.minted = minted;
        }
        Ok(self.receipt(&mut state, ACTION))
    }

    async fn retire_and_burn(
        &self,
        caller: Address,
        id: BatchId,
        amount: Amount,
        _esg_report_ref: &str,
    ) -> Result<TxReceipt> {
        const ACTION: &str = "retireAndBurnCarbonCredit";
        CallCounts::bump(&self.counts.transactions);
        let mut state = self.state.write().await;
        Self::require_not_paused(&state, ACTION)?;
        if !state.batches.contains_key(&id) {
            return Err(Self::revert(ACTION, "Batch does not exist"));
        }
        Self::debit(&mut state, ACTION, caller, id, amount)?;
        if let Some(stored) = state.batches.get_mut(&id) {
            stored.batch.burned_amount = stored.batch.burned_amount.saturating_add(amount);
        }
        Ok(self.receipt(&mut state, ACTION))
    }

    async fn transfer(
        &self,
        caller: Address,
        from: Address,
        to: Address,
        id: BatchId,
        amount: Amount,
    ) -> Result<TxReceipt> {
        const ACTION: &str = "safeTransferFrom";
        CallCounts::bump(&self.counts.transactions);
        let mut state = self.state.write().await;
        Self::require_not_paused(&state, ACTION)?;
        if from != caller {
            return Err(Self::revert(ACTION, "ERC1155MissingApprovalForAll"));
        }
        if to == Address::ZERO {
            return Err(Self::revert(ACTION, "ERC1155InvalidReceiver(0x0)"));
        }
        // Self-transfers cannot overflow; other receivers are checked before the debit
        if from != to {
            let received = state.balances.get(&(to, id)).copied().unwrap_or(U256::ZERO);
            Self::checked_add(ACTION, received, amount)?;
        }
        Self::debit(&mut state, ACTION, from, id, amount)?;
        Self::credit(&mut state, ACTION, to, id, amount)?;
        Ok(self.receipt(&mut state, ACTION))
    }

    async fn authorize_verification_body(
        &self,
        caller: Address,
        account: Address,
    ) -> Result<TxReceipt> {
        const ACTION: &str = "authorizeVerificationBody";
        CallCounts::bump(&self.counts.transactions);
        let mut state = self.state.write().await;
        Self::require_owner(&state, caller, ACTION)?;
        state.authorized.insert(account);
        Ok(self.receipt(&mut state, ACTION))
    }

    async fn pause(&self, caller: Address) -> Result<TxReceipt> {
        const ACTION: &str = "pause";
        CallCounts::bump(&self.counts.transactions);
        let mut state = self.state.write().await;
        Self::require_owner(&state, caller, ACTION)?;
        Self::require_not_paused(&state, ACTION)?;
        state.paused = true;
        Ok(self.receipt(&mut state, ACTION))
    }

    async fn unpause(&self, caller: Address) -> Result<TxReceipt> {
        const ACTION: &str = "unpause";
        CallCounts::bump(&self.counts.transactions);
        let mut state = self.state.write().await;
        Self::require_owner(&state, caller, ACTION)?;
        if !state.paused {
            return Err(Self::revert(ACTION, "ExpectedPause()"));
        }
        state.paused = false;
        Ok(self.receipt(&mut state, ACTION))
    }

    async fn transfer_ownership(&self, caller: Address, new_owner: Address) -> Result<TxReceipt> {
        const ACTION: &str = "transferOwnership";
        CallCounts::bump(&self.counts.transactions);
        let mut state = self.state.write().await;
        Self::require_owner(&state, caller, ACTION)?;
        if new_owner == Address::ZERO {
            return Err(Self::revert(ACTION, "OwnableInvalidOwner(0x0)"));
        }
        state.owner = new_owner;
        Ok(self.receipt(&mut state, ACTION))
    }

    async fn renounce_ownership(&self, caller: Address) -> Result<TxReceipt> {
        const ACTION: &str = "renounceOwnership";
        CallCounts::bump(&self.counts.transactions);
        let mut state = self.state.write().await;
        Self::require_owner(&state, caller, ACTION)?;
        state.owner = Address::ZERO;
        Ok(self.receipt(&mut state, ACTION))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::RevertReason;

    fn owner() -> Address {
        Address::repeat_byte(0x01)
    }

    fn body() -> Address {
        Address::repeat_byte(0x02)
    }

    fn holder() -> Address {
        Address::repeat_byte(0x03)
    }

    fn tons(n: u64) -> Amount {
        U256::from(n)
    }

    #[tokio::test]
    async fn test_unassigned_id_is_not_found() {
        let ledger = InMemoryLedger::builder(owner())
            .batch("Wind Farm", body(), tons(100))
            .build();

        assert_eq!(ledger.next_batch_id().await.unwrap(), BatchId(2));
        assert!(ledger.get_batch(BatchId(1)).await.is_ok());
        assert!(matches!(
            ledger.get_batch(BatchId(2)).await,
            Err(RegistryError::BatchNotFound(BatchId(2)))
        ));
        assert_eq!(ledger.counts().get_batch(), 2);
    }

    #[tokio::test]
    async fn test_remaining_supply_tracks_mints() {
        let ledger = InMemoryLedger::builder(owner())
            .batch("Wind Farm", body(), tons(100))
            .verified(BatchId(1))
            .build();

        ledger.mint(owner(), holder(), BatchId(1), tons(40)).await.unwrap();

        assert_eq!(ledger.total_minted(BatchId(1)).await.unwrap(), tons(40));
        assert_eq!(ledger.remaining_supply(BatchId(1)).await.unwrap(), tons(60));
        assert_eq!(ledger.balance_of(holder(), BatchId(1)).await.unwrap(), tons(40));
    }

    #[tokio::test]
    async fn test_mint_over_cap_reverts() {
        let ledger = InMemoryLedger::builder(owner())
            .batch("Wind Farm", body(), tons(100))
            .verified(BatchId(1))
            .build();

        let err = ledger
            .mint(owner(), holder(), BatchId(1), tons(101))
            .await
            .unwrap_err();
        assert_eq!(err.revert_reason(), Some(RevertReason::ExceedsTotalReduction));
        assert_eq!(ledger.total_minted(BatchId(1)).await.unwrap(), U256::ZERO);
    }

    #[tokio::test]
    async fn test_overflowing_mint_reverts_and_keeps_supply() {
        let ledger = InMemoryLedger::builder(owner())
            .batch("Wind Farm", body(), tons(100))
            .verified(BatchId(1))
            .build();
        ledger.mint(owner(), holder(), BatchId(1), tons(50)).await.unwrap();

        let err = ledger
            .mint(owner(), holder(), BatchId(1), U256::MAX - tons(10))
            .await
            .unwrap_err();
        assert_eq!(err.revert_reason(), Some(RevertReason::ArithmeticOverflow));

        assert_eq!(ledger.total_minted(BatchId(1)).await.unwrap(), tons(50));
        assert_eq!(ledger.remaining_supply(BatchId(1)).await.unwrap(), tons(50));
        assert_eq!(ledger.balance_of(holder(), BatchId(1)).await.unwrap(), tons(50));
    }

    #[tokio::test]
    async fn test_overflowing_transfer_reverts_without_debit() {
        let ledger = InMemoryLedger::builder(owner())
            .batch("Wind Farm", body(), tons(100))
            .balance(holder(), BatchId(1), tons(5))
            .balance(body(), BatchId(1), U256::MAX)
            .build();

        let err = ledger
            .transfer(holder(), holder(), body(), BatchId(1), tons(5))
            .await
            .unwrap_err();
        assert_eq!(err.revert_reason(), Some(RevertReason::ArithmeticOverflow));
        assert_eq!(ledger.balance_of(holder(), BatchId(1)).await.unwrap(), tons(5));
    }

    #[tokio::test]
    async fn test_mint_unverified_reverts() {
        let ledger = InMemoryLedger::builder(owner())
            .batch("Wind Farm", body(), tons(100))
            .build();

        let err = ledger
            .mint(owner(), holder(), BatchId(1), tons(1))
            .await
            .unwrap_err();
        assert_eq!(err.revert_reason(), Some(RevertReason::BatchNotVerified));
    }

    #[tokio::test]
    async fn test_mint_by_non_owner_reverts() {
        let ledger = InMemoryLedger::builder(owner())
            .batch("Wind Farm", body(), tons(100))
            .verified(BatchId(1))
            .build();

        let err = ledger
            .mint(body(), holder(), BatchId(1), tons(1))
            .await
            .unwrap_err();
        assert_eq!(err.revert_reason(), Some(RevertReason::NotOwner));
    }

    #[tokio::test]
    async fn test_only_creator_verifies() {
        let ledger = InMemoryLedger::builder(owner())
            .batch("Wind Farm", body(), tons(100))
            .build();

        let err = ledger.verify_batch(owner(), BatchId(1)).await.unwrap_err();
        assert_eq!(err.revert_reason(), Some(RevertReason::OnlyBatchCreator));

        ledger.verify_batch(body(), BatchId(1)).await.unwrap();
        assert!(ledger.get_batch(BatchId(1)).await.unwrap().is_verified);
    }

    #[tokio::test]
    async fn test_create_requires_authorization() {
        let ledger = InMemoryLedger::builder(owner()).build();
        let new_batch = NewBatch {
            project_name: "Peatland".to_string(),
            total_emission_reduction: tons(500),
            expiry_date: 0,
            verification_doc_hash: "QmDoc".to_string(),
        };

        let err = ledger.create_batch(body(), &new_batch).await.unwrap_err();
        assert_eq!(
            err.revert_reason(),
            Some(RevertReason::NotAuthorizedVerificationBody)
        );

        ledger
            .authorize_verification_body(owner(), body())
            .await
            .unwrap();
        ledger.create_batch(body(), &new_batch).await.unwrap();

        let created = ledger.get_batch(BatchId(1)).await.unwrap();
        assert_eq!(created.verification_body, body());
        assert_eq!(ledger.next_batch_id().await.unwrap(), BatchId(2));
    }

    #[tokio::test]
    async fn test_retire_burns_from_caller() {
        let ledger = InMemoryLedger::builder(owner())
            .batch("Wind Farm", body(), tons(100))
            .balance(holder(), BatchId(1), tons(30))
            .build();

        ledger
            .retire_and_burn(holder(), BatchId(1), tons(10), "ESG-2024")
            .await
            .unwrap();
        assert_eq!(ledger.balance_of(holder(), BatchId(1)).await.unwrap(), tons(20));
        assert_eq!(
            ledger.get_batch(BatchId(1)).await.unwrap().burned_amount,
            tons(10)
        );

        let err = ledger
            .retire_and_burn(holder(), BatchId(1), tons(21), "")
            .await
            .unwrap_err();
        assert_eq!(err.revert_reason(), Some(RevertReason::InsufficientBalance));
    }

    #[tokio::test]
    async fn test_transfer_from_other_account_needs_approval() {
        let ledger = InMemoryLedger::builder(owner())
            .batch("Wind Farm", body(), tons(100))
            .balance(holder(), BatchId(1), tons(10))
            .build();

        assert!(ledger
            .transfer(owner(), holder(), body(), BatchId(1), tons(1))
            .await
            .is_err());

        ledger
            .transfer(holder(), holder(), body(), BatchId(1), tons(4))
            .await
            .unwrap();
        assert_eq!(ledger.balance_of(body(), BatchId(1)).await.unwrap(), tons(4));
    }

    #[tokio::test]
    async fn test_paused_contract_rejects_transfers() {
        let ledger = InMemoryLedger::builder(owner())
            .batch("Wind Farm", body(), tons(100))
            .balance(owner(), BatchId(1), tons(5))
            .paused(true)
            .build();

        let err = ledger
            .transfer(owner(), owner(), holder(), BatchId(1), tons(1))
            .await
            .unwrap_err();
        assert_eq!(err.revert_reason(), Some(RevertReason::Paused));
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let ledger = InMemoryLedger::builder(owner())
            .batch("Wind Farm", body(), tons(100))
            .build();

        ledger.fail_reads_for(BatchId(1)).await;
        assert!(ledger.get_batch(BatchId(1)).await.is_err());
        assert!(ledger.balance_of(holder(), BatchId(1)).await.is_err());

        ledger.restore_reads_for(BatchId(1)).await;
        assert!(ledger.get_batch(BatchId(1)).await.is_ok());

        ledger.fail_record_reads_for(BatchId(1)).await;
        assert!(ledger.get_batch(BatchId(1)).await.is_err());
        assert!(ledger.balance_of(holder(), BatchId(1)).await.is_ok());
        assert!(ledger.remaining_supply(BatchId(1)).await.is_ok());

        ledger.fail_next_batch_id(true).await;
        assert!(ledger.next_batch_id().await.is_err());
    }
}
