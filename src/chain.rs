//! On-chain registry access
//!
//! Talks to the carbon-credit registry contract over JSON-RPC.

use alloy::network::{Ethereum, EthereumWallet};
use alloy::primitives::{Bytes, U256};
use alloy::providers::{PendingTransactionBuilder, Provider, ProviderBuilder, RootProvider};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use alloy::transports::http::{reqwest::Url, Client, Http};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::domain::{Address, Amount, Batch, BatchId, NewBatch, TxReceipt};
use crate::infra::{LedgerReader, LedgerWriter, RegistryError, Result};

// Generate contract bindings
sol! {
    #[sol(rpc)]
    interface ICarbonCreditRegistry {
        struct CarbonCreditBatch {
            uint256 batchId;
            string projectName;
            address verificationBody;
            uint256 totalEmissionReduction;
            uint256 issuedDate;
            uint256 expiryDate;
            bool isVerified;
            string verificationDocHash;
            uint256 burnedAmount;
        }

        function owner() external view returns (address);
        function paused() external view returns (bool);
        function nextBatchId() external view returns (uint256);
        function authorizedVerificationBodies(address account) external view returns (bool);
        function getCarbonCreditBatch(uint256 batchId)
            external
            view
            returns (CarbonCreditBatch memory);
        function totalMintedPerBatch(uint256 batchId) external view returns (uint256);
        function getBatchRemainingSupply(uint256 batchId) external view returns (uint256);
        function balanceOf(address account, uint256 id) external view returns (uint256);

        function createCarbonCreditBatch(
            string projectName,
            uint256 totalEmissionReduction,
            uint256 expiryDate,
            string verificationDocHash
        ) external;

        function verifyCarbonCreditBatch(uint256 batchId) external;

        function mintCarbonCredit(address to, uint256 batchId, uint256 amount) external;

        function retireAndBurnCarbonCredit(
            uint256 batchId,
            uint256 amount,
            string esgReportRef
        ) external;

        function safeTransferFrom(
            address from,
            address to,
            uint256 id,
            uint256 value,
            bytes data
        ) external;

        function authorizeVerificationBody(address verificationBody) external;
        function pause() external;
        function unpause() external;
        function transferOwnership(address newOwner) external;
        function renounceOwnership() external;
    }
}

/// Connection settings for [`ContractLedger`]
#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub contract_address: Address,
    /// Signing key; reads work without one
    pub private_key: Option<String>,
}

/// Registry contract reached through an HTTP JSON-RPC endpoint
pub struct ContractLedger {
    contract_address: Address,
    rpc_url: Url,
    provider: RootProvider<Http<Client>>,
    signer: Option<PrivateKeySigner>,
}

impl ContractLedger {
    pub fn new(config: &ChainConfig) -> Result<Self> {
        let rpc_url: Url = config
            .rpc_url
            .parse()
            .map_err(|e| RegistryError::Configuration(format!("Invalid RPC URL: {}", e)))?;

        let signer = config
            .private_key
            .as_deref()
            .map(|key| {
                key.parse::<PrivateKeySigner>().map_err(|e| {
                    RegistryError::Configuration(format!("Invalid private key: {}", e))
                })
            })
            .transpose()?;

        let provider = ProviderBuilder::new().on_http(rpc_url.clone());

        Ok(Self {
            contract_address: config.contract_address,
            rpc_url,
            provider,
            signer,
        })
    }

    /// Address transactions are signed with, if a key was configured
    pub fn signer_address(&self) -> Option<Address> {
        self.signer.as_ref().map(|signer| signer.address())
    }

    /// Provider that fills nonce, gas and chain id and signs as `caller`.
    ///
    /// Only the configured key can sign, so any other caller is rejected
    /// before a transaction is built.
    fn signing_provider(
        &self,
        action: &'static str,
        caller: Address,
    ) -> Result<impl Provider<Http<Client>>> {
        let signer = self.signer.clone().ok_or_else(|| RegistryError::Transaction {
            action,
            reason: None,
            message: "no signing key configured (read-only session)".to_string(),
        })?;
        if signer.address() != caller {
            return Err(RegistryError::Transaction {
                action,
                reason: None,
                message: format!(
                    "signing key {} does not belong to caller {}",
                    signer.address(),
                    caller
                ),
            });
        }

        Ok(ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(EthereumWallet::from(signer))
            .on_http(self.rpc_url.clone()))
    }

    fn to_batch_id(value: U256) -> Result<BatchId> {
        u64::try_from(value)
            .map(BatchId)
            .map_err(|_| RegistryError::Internal(format!("batch id out of range: {}", value)))
    }

    fn to_unix(method: &'static str, value: U256) -> Result<u64> {
        u64::try_from(value)
            .map_err(|_| RegistryError::call(method, format!("timestamp out of range: {}", value)))
    }

    fn to_batch(raw: ICarbonCreditRegistry::CarbonCreditBatch) -> Result<Batch> {
        const METHOD: &str = "getCarbonCreditBatch";
        Ok(Batch {
            id: Self::to_batch_id(raw.batchId)?,
            project_name: raw.projectName,
            verification_body: raw.verificationBody,
            total_emission_reduction: raw.totalEmissionReduction,
            issued_date: Self::to_unix(METHOD, raw.issuedDate)?,
            expiry_date: Self::to_unix(METHOD, raw.expiryDate)?,
            is_verified: raw.isVerified,
            verification_doc_hash: raw.verificationDocHash,
            burned_amount: raw.burnedAmount,
        })
    }

    /// Wait for the receipt of a sent transaction
    async fn confirm(
        action: &'static str,
        pending: PendingTransactionBuilder<Http<Client>, Ethereum>,
    ) -> Result<TxReceipt> {
        info!("{} transaction sent: {:?}", action, pending.tx_hash());

        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| {
                RegistryError::transaction(action, format!("Failed to get receipt: {}", e))
            })?;

        if !receipt.status() {
            return Err(RegistryError::Transaction {
                action,
                reason: None,
                message: format!("transaction {} reverted", receipt.transaction_hash),
            });
        }

        info!(
            "{} confirmed in tx {} (block {})",
            action,
            receipt.transaction_hash,
            receipt.block_number.unwrap_or(0)
        );

        Ok(TxReceipt {
            action: action.to_string(),
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
        })
    }
}

#[async_trait]
impl LedgerReader for ContractLedger {
    async fn next_batch_id(&self) -> Result<BatchId> {
        let contract = ICarbonCreditRegistry::new(self.contract_address, &self.provider);
        let result = contract
            .nextBatchId()
            .call()
            .await
            .map_err(|e| RegistryError::call("nextBatchId", e))?;

        Self::to_batch_id(result._0)
    }

    async fn get_batch(&self, id: BatchId) -> Result<Batch> {
        let contract = ICarbonCreditRegistry::new(self.contract_address, &self.provider);
        let result = contract
            .getCarbonCreditBatch(id.to_u256())
            .call()
            .await
            .map_err(|e| RegistryError::call("getCarbonCreditBatch", e))?;

        let batch = Self::to_batch(result._0)?;
        // Unassigned ids come back as an all-zero record on some contract builds
        if batch.id != id {
            debug!("batch {} read back as id {}", id, batch.id);
            return Err(RegistryError::BatchNotFound(id));
        }
        Ok(batch)
    }

    async fn total_minted(&self, id: BatchId) -> Result<Amount> {
        let contract = ICarbonCreditRegistry::new(self.contract_address, &self.provider);
        let result = contract
            .totalMintedPerBatch(id.to_u256())
            .call()
            .await
            .map_err(|e| RegistryError::call("totalMintedPerBatch", e))?;

        Ok(result._0)
    }

    async fn remaining_supply(&self, id: BatchId) -> Result<Amount> {
        let contract = ICarbonCreditRegistry::new(self.contract_address, &self.provider);
        let result = contract
            .getBatchRemainingSupply(id.to_u256())
            .call()
            .await
            .map_err(|e| RegistryError::call("getBatchRemainingSupply", e))?;

        Ok(result._0)
    }

    async fn balance_of(&self, holder: Address, id: BatchId) -> Result<Amount> {
        let contract = ICarbonCreditRegistry::new(self.contract_address, &self.provider);
        let result = contract
            .balanceOf(holder, id.to_u256())
            .call()
            .await
            .map_err(|e| RegistryError::call("balanceOf", e))?;

        Ok(result._0)
    }

    async fn owner(&self) -> Result<Address> {
        let contract = ICarbonCreditRegistry::new(self.contract_address, &self.provider);
        let result = contract
            .owner()
            .call()
            .await
            .map_err(|e| RegistryError::call("owner", e))?;

        Ok(result._0)
    }

    async fn paused(&self) -> Result<bool> {
        let contract = ICarbonCreditRegistry::new(self.contract_address, &self.provider);
        let result = contract
            .paused()
            .call()
            .await
            .map_err(|e| RegistryError::call("paused", e))?;

        Ok(result._0)
    }

    async fn is_authorized_verification_body(&self, account: Address) -> Result<bool> {
        let contract = ICarbonCreditRegistry::new(self.contract_address, &self.provider);
        let result = contract
            .authorizedVerificationBodies(account)
            .call()
            .await
            .map_err(|e| RegistryError::call("authorizedVerificationBodies", e))?;

        Ok(result._0)
    }

    fn contract_address(&self) -> Address {
        self.contract_address
    }
}

#[async_trait]
impl LedgerWriter for ContractLedger {
    async fn create_batch(&self, caller: Address, batch: &NewBatch) -> Result<TxReceipt> {
        const ACTION: &str = "createCarbonCreditBatch";
        info!(
            "Creating batch '{}' ({} tons, expiry {})",
            batch.project_name, batch.total_emission_reduction, batch.expiry_date
        );

        let provider = self.signing_provider(ACTION, caller)?;
        let contract = ICarbonCreditRegistry::new(self.contract_address, &provider);

        let pending = contract
            .createCarbonCreditBatch(
                batch.project_name.clone(),
                batch.total_emission_reduction,
                U256::from(batch.expiry_date),
                batch.verification_doc_hash.clone(),
            )
            .send()
            .await
            .map_err(|e| RegistryError::transaction(ACTION, e))?;

        Self::confirm(ACTION, pending).await
    }

    async fn verify_batch(&self, caller: Address, id: BatchId) -> Result<TxReceipt> {
        const ACTION: &str = "verifyCarbonCreditBatch";
        info!("Verifying batch {}", id);

        let provider = self.signing_provider(ACTION, caller)?;
        let contract = ICarbonCreditRegistry::new(self.contract_address, &provider);

        let pending = contract
            .verifyCarbonCreditBatch(id.to_u256())
            .send()
            .await
            .map_err(|e| RegistryError::transaction(ACTION, e))?;

        Self::confirm(ACTION, pending).await
    }

    async fn mint(
        &self,
        caller: Address,
        to: Address,
        id: BatchId,
        amount: Amount,
    ) -> Result<TxReceipt> {
        const ACTION: &str = "mintCarbonCredit";
        info!("Minting {} tons of batch {} to {}", amount, id, to);

        let provider = self.signing_provider(ACTION, caller)?;
        let contract = ICarbonCreditRegistry::new(self.contract_address, &provider);

        let pending = contract
            .mintCarbonCredit(to, id.to_u256(), amount)
            .send()
            .await
            .map_err(|e| RegistryError::transaction(ACTION, e))?;

        Self::confirm(ACTION, pending).await
    }

    async fn retire_and_burn(
        &self,
        caller: Address,
        id: BatchId,
        amount: Amount,
        esg_report_ref: &str,
    ) -> Result<TxReceipt> {
        const ACTION: &str = "retireAndBurnCarbonCredit";
        info!("Retiring {} tons of batch {}", amount, id);

        let provider = self.signing_provider(ACTION, caller)?;
        let contract = ICarbonCreditRegistry::new(self.contract_address, &provider);

        let pending = contract
            .retireAndBurnCarbonCredit(id.to_u256(), amount, esg_report_ref.to_string())
            .send()
            .await
            .map_err(|e| RegistryError::transaction(ACTION, e))?;

        Self::confirm(ACTION, pending).await
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
        info!("Transferring {} tons of batch {} from {} to {}", amount, id, from, to);

        let provider = self.signing_provider(ACTION, caller)?;
        let contract = ICarbonCreditRegistry::new(self.contract_address, &provider);

        let pending = contract
            .safeTransferFrom(from, to, id.to_u256(), amount, Bytes::new())
            .send()
            .await
            .map_err(|e| RegistryError::transaction(ACTION, e))?;

        Self::confirm(ACTION, pending).await
    }

    async fn authorize_verification_body(
        &self,
        caller: Address,
        account: Address,
    ) -> Result<TxReceipt> {
        const ACTION: &str = "authorizeVerificationBody";
        info!("Authorizing verification body {}", account);

        let provider = self.signing_provider(ACTION, caller)?;
        let contract = ICarbonCreditRegistry::new(self.contract_address, &provider);

        let pending = contract
            .authorizeVerificationBody(account)
            .send()
            .await
            .map_err(|e| RegistryError::transaction(ACTION, e))?;

        Self::confirm(ACTION, pending).await
    }

    async fn pause(&self, caller: Address) -> Result<TxReceipt> {
        const ACTION: &str = "pause";
        let provider = self.signing_provider(ACTION, caller)?;
        let contract = ICarbonCreditRegistry::new(self.contract_address, &provider);

        let pending = contract
            .pause()
            .send()
            .await
            .map_err(|e| RegistryError::transaction(ACTION, e))?;

        Self::confirm(ACTION, pending).await
    }

    async fn unpause(&self, caller: Address) -> Result<TxReceipt> {
        const ACTION: &str = "unpause";
        let provider = self.signing_provider(ACTION, caller)?;
        let contract = ICarbonCreditRegistry::new(self.contract_address, &provider);

        let pending = contract
            .unpause()
            .send()
            .await
            .map_err(|e| RegistryError::transaction(ACTION, e))?;

        Self::confirm(ACTION, pending).await
    }

    async fn transfer_ownership(&self, caller: Address, new_owner: Address) -> Result<TxReceipt> {
        const ACTION: &str = "transferOwnership";
        info!("Transferring contract ownership to {}", new_owner);

        let provider = self.signing_provider(ACTION, caller)?;
        let contract = ICarbonCreditRegistry::new(self.contract_address, &provider);

        let pending = contract
            .transferOwnership(new_owner)
            .send()
            .await
            .map_err(|e| RegistryError::transaction(ACTION, e))?;

        Self::confirm(ACTION, pending).await
    }

    async fn renounce_ownership(&self, caller: Address) -> Result<TxReceipt> {
        const ACTION: &str = "renounceOwnership";
        info!("Renouncing contract ownership");

        let provider = self.signing_provider(ACTION, caller)?;
        let contract = ICarbonCreditRegistry::new(self.contract_address, &provider);

        let pending = contract
            .renounceOwnership()
            .send()
            .await
            .map_err(|e| RegistryError::transaction(ACTION, e))?;

        Self::confirm(ACTION, pending).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::RevertReason;

    const REGISTRY: &str = "0xBd214514bdDf69395f6cB69A26557c8C5F0612F5";
    // Well-known development key (anvil account #0)
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn config(private_key: Option<&str>) -> ChainConfig {
        ChainConfig {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            contract_address: REGISTRY.parse().unwrap(),
            private_key: private_key.map(str::to_string),
        }
    }

    #[test]
    fn test_read_only_ledger_has_no_signer() {
        let ledger = ContractLedger::new(&config(None)).unwrap();
        assert_eq!(ledger.signer_address(), None);
        assert_eq!(ledger.contract_address(), REGISTRY.parse::<Address>().unwrap());
    }

    #[test]
    fn test_signer_address_from_key() {
        let ledger = ContractLedger::new(&config(Some(DEV_KEY))).unwrap();
        let expected: Address = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".parse().unwrap();
        assert_eq!(ledger.signer_address(), Some(expected));
    }

    #[test]
    fn test_invalid_settings_are_configuration_errors() {
        let mut bad_url = config(None);
        bad_url.rpc_url = "not a url".to_string();
        assert!(matches!(
            ContractLedger::new(&bad_url),
            Err(RegistryError::Configuration(_))
        ));

        assert!(matches!(
            ContractLedger::new(&config(Some("0xdeadbeef"))),
            Err(RegistryError::Configuration(_))
        ));
    }

    #[test]
    fn test_batch_conversion() {
        let raw = ICarbonCreditRegistry::CarbonCreditBatch {
            batchId: U256::from(7u64),
            projectName: "Kelp Forest".to_string(),
            verificationBody: Address::repeat_byte(0x42),
            totalEmissionReduction: U256::from(9_000u64),
            issuedDate: U256::from(1_700_000_000u64),
            expiryDate: U256::ZERO,
            isVerified: true,
            verificationDocHash: "QmKelp".to_string(),
            burnedAmount: U256::from(12u64),
        };

        let batch = ContractLedger::to_batch(raw).unwrap();
        assert_eq!(batch.id, BatchId(7));
        assert_eq!(batch.issued_date, 1_700_000_000);
        assert_eq!(batch.expiry_date, 0);
        assert_eq!(batch.burned_amount, U256::from(12u64));
    }

    #[test]
    fn test_batch_id_out_of_range() {
        assert!(ContractLedger::to_batch_id(U256::MAX).is_err());
        assert_eq!(ContractLedger::to_batch_id(U256::from(3u64)).unwrap(), BatchId(3));
    }

    #[tokio::test]
    async fn test_write_without_key_fails_before_sending() {
        let ledger = ContractLedger::new(&config(None)).unwrap();
        let err = ledger.pause(Address::repeat_byte(0x01)).await.unwrap_err();
        assert!(matches!(err, RegistryError::Transaction { action: "pause", .. }));
        assert_eq!(err.revert_reason(), None::<RevertReason>);
    }

    #[tokio::test]
    async fn test_write_as_foreign_caller_fails_before_sending() {
        let ledger = ContractLedger::new(&config(Some(DEV_KEY))).unwrap();
        let err = ledger
            .unpause(Address::repeat_byte(0x01))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Transaction { action: "unpause", ref message, .. }
                if message.contains("does not belong")
        ));
    }
}
