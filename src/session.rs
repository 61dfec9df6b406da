//! Connection lifecycle
//!
//! A [`Session`] binds one account to one registry ledger. It is produced by
//! [`SessionManager::connect`] and invalidated by
//! [`SessionManager::disconnect`]; everything that reads or writes the
//! registry is built from an active session.

use std::sync::Arc;

use tracing::info;

use crate::chain::{ChainConfig, ContractLedger};
use crate::domain::Address;
use crate::infra::{LedgerReader, LedgerWriter, RegistryError, Result};

/// Registry deployment the client talks to when none is configured
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0xBd214514bdDf69395f6cB69A26557c8C5F0612F5";

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// JSON-RPC endpoint
    pub rpc_url: String,
    /// Registry contract address
    pub contract_address: Address,
    /// Key for signing transactions
    pub private_key: Option<String>,
    /// Account to act as when no key is given (read-only)
    pub account: Option<Address>,
}

impl SessionConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let rpc_url = std::env::var("CARBON_RPC_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8545".to_string());

        let contract_address = std::env::var("CARBON_CONTRACT_ADDRESS")
            .unwrap_or_else(|_| DEFAULT_CONTRACT_ADDRESS.to_string())
            .parse::<Address>()
            .map_err(|e| RegistryError::Configuration(format!("Invalid contract address: {}", e)))?;

        let private_key = std::env::var("CARBON_PRIVATE_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        let account = std::env::var("CARBON_ACCOUNT")
            .ok()
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| {
                raw.trim()
                    .parse::<Address>()
                    .map_err(|e| RegistryError::Configuration(format!("Invalid account: {}", e)))
            })
            .transpose()?;

        Ok(Self {
            rpc_url,
            contract_address,
            private_key,
            account,
        })
    }

    fn chain_config(&self) -> ChainConfig {
        ChainConfig {
            rpc_url: self.rpc_url.clone(),
            contract_address: self.contract_address,
            private_key: self.private_key.clone(),
        }
    }
}

/// An account connected to a registry ledger
#[derive(Clone)]
pub struct Session {
    account: Address,
    reader: Arc<dyn LedgerReader>,
    writer: Arc<dyn LedgerWriter>,
}

impl Session {
    pub fn new<L>(account: Address, ledger: Arc<L>) -> Self
    where
        L: LedgerReader + LedgerWriter + 'static,
    {
        Self {
            account,
            reader: ledger.clone(),
            writer: ledger,
        }
    }

    /// The connected account; the caller of every transaction
    pub fn account(&self) -> Address {
        self.account
    }

    pub fn reader(&self) -> Arc<dyn LedgerReader> {
        self.reader.clone()
    }

    pub fn writer(&self) -> Arc<dyn LedgerWriter> {
        self.writer.clone()
    }

    pub fn contract_address(&self) -> Address {
        self.reader.contract_address()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("account", &self.account)
            .field("contract", &self.reader.contract_address())
            .finish()
    }
}

/// Holds at most one active session
#[derive(Debug, Default)]
pub struct SessionManager {
    active: Option<Session>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect `account` to `ledger`, replacing any previous session
    pub fn connect<L>(&mut self, account: Address, ledger: Arc<L>) -> &Session
    where
        L: LedgerReader + LedgerWriter + 'static,
    {
        let session = Session::new(account, ledger);
        info!(
            "Connected {} to registry {}",
            session.account(),
            session.contract_address()
        );
        self.active.insert(session)
    }

    /// Connect to the on-chain registry described by `config`.
    ///
    /// The account is the signing key's address, or the configured watch
    /// account for read-only sessions.
    pub fn connect_chain(&mut self, config: &SessionConfig) -> Result<&Session> {
        let ledger = ContractLedger::new(&config.chain_config())?;
        let account = ledger
            .signer_address()
            .or(config.account)
            .ok_or_else(|| RegistryError::Configuration("no account available".to_string()))?;

        Ok(self.connect(account, Arc::new(ledger)))
    }

    /// Drop the active session, if any
    pub fn disconnect(&mut self) -> Option<Session> {
        let previous = self.active.take();
        if let Some(session) = &previous {
            info!("Disconnected {}", session.account());
        }
        previous
    }

    pub fn active(&self) -> Result<&Session> {
        self.active.as_ref().ok_or(RegistryError::NotConnected)
    }

    pub fn is_connected(&self) -> bool {
        self.active.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::InMemoryLedger;

    fn account() -> Address {
        Address::repeat_byte(0x0a)
    }

    #[test]
    fn test_no_session_is_not_connected() {
        let manager = SessionManager::new();
        assert!(!manager.is_connected());
        assert!(matches!(manager.active(), Err(RegistryError::NotConnected)));
    }

    #[test]
    fn test_connect_then_disconnect() {
        let mut manager = SessionManager::new();
        let ledger = Arc::new(InMemoryLedger::builder(account()).build());

        let session = manager.connect(account(), ledger);
        assert_eq!(session.account(), account());
        assert!(manager.active().is_ok());

        let dropped = manager.disconnect().unwrap();
        assert_eq!(dropped.account(), account());
        assert!(matches!(manager.active(), Err(RegistryError::NotConnected)));
        assert!(manager.disconnect().is_none());
    }

    #[test]
    fn test_connect_chain_needs_an_account() {
        let mut manager = SessionManager::new();
        let config = SessionConfig {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            contract_address: DEFAULT_CONTRACT_ADDRESS.parse().unwrap(),
            private_key: None,
            account: None,
        };

        assert!(matches!(
            manager.connect_chain(&config),
            Err(RegistryError::Configuration(_))
        ));

        let watch = SessionConfig {
            account: Some(account()),
            ..config
        };
        let session = manager.connect_chain(&watch).unwrap();
        assert_eq!(session.account(), account());
    }
}
