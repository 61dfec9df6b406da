//! Error types for the carbon-credit registry client

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::BatchId;

/// Errors that can occur while talking to the registry
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Reading the batch id upper bound failed; a listing cannot proceed
    #[error("retrieval error: {0}")]
    Retrieval(#[source] Box<RegistryError>),

    /// A contract read failed (revert or transport)
    #[error("contract call {method} failed: {message}")]
    ContractCall {
        method: &'static str,
        message: String,
    },

    /// Batch id was never assigned
    #[error("batch not found: {0}")]
    BatchNotFound(BatchId),

    /// No connected session
    #[error("no active session: connect an account first")]
    NotConnected,

    /// Caller input rejected before reaching the contract
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Caller lacks the role the action requires
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Batch or contract state does not allow the action
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// Submitting or confirming a transaction failed
    #[error("{action} failed: {message}")]
    Transaction {
        action: &'static str,
        reason: Option<RevertReason>,
        message: String,
    },

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl RegistryError {
    pub fn call(method: &'static str, err: impl fmt::Display) -> Self {
        RegistryError::ContractCall {
            method,
            message: err.to_string(),
        }
    }

    /// Wrap a failed submission, classifying the revert message if possible
    pub fn transaction(action: &'static str, err: impl fmt::Display) -> Self {
        let message = err.to_string();
        RegistryError::Transaction {
            action,
            reason: RevertReason::classify(&message),
            message,
        }
    }

    pub fn revert_reason(&self) -> Option<RevertReason> {
        match self {
            RegistryError::Transaction { reason, .. } => *reason,
            _ => None,
        }
    }

    /// Whether this is the fatal bound-read failure of a listing
    pub fn is_retrieval(&self) -> bool {
        matches!(self, RegistryError::Retrieval(_))
    }
}

/// Known revert reasons of the registry contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevertReason {
    NotOwner,
    NotAuthorizedVerificationBody,
    OnlyBatchCreator,
    BatchNotVerified,
    BatchExpired,
    ExceedsTotalReduction,
    Paused,
    InsufficientBalance,
    ArithmeticOverflow,
}

impl RevertReason {
    /// Match a revert or RPC error message against the contract's messages.
    ///
    /// More specific messages are checked first: "Only batch creator can
    /// verify" also travels with "Not authorized" on some contract builds.
    pub fn classify(message: &str) -> Option<Self> {
        const PATTERNS: &[(&str, RevertReason)] = &[
            ("OwnableUnauthorizedAccount", RevertReason::NotOwner),
            ("Not owner", RevertReason::NotOwner),
            ("caller is not the owner", RevertReason::NotOwner),
            ("Only batch creator can verify", RevertReason::OnlyBatchCreator),
            (
                "Not authorized verification body",
                RevertReason::NotAuthorizedVerificationBody,
            ),
            ("Not authorized", RevertReason::NotAuthorizedVerificationBody),
            ("Batch not verified", RevertReason::BatchNotVerified),
            ("Batch expired", RevertReason::BatchExpired),
            ("Exceeds total reduction amount", RevertReason::ExceedsTotalReduction),
            ("EnforcedPause", RevertReason::Paused),
            ("Pausable: paused", RevertReason::Paused),
            ("ERC1155InsufficientBalance", RevertReason::InsufficientBalance),
            ("insufficient balance", RevertReason::InsufficientBalance),
            ("Panic(0x11)", RevertReason::ArithmeticOverflow),
            ("arithmetic overflow", RevertReason::ArithmeticOverflow),
        ];

        PATTERNS
            .iter()
            .find(|(pattern, _)| message.contains(pattern))
            .map(|(_, reason)| *reason)
    }

    pub fn description(&self) -> &'static str {
        match self {
            RevertReason::NotOwner => "only the contract owner can do this",
            RevertReason::NotAuthorizedVerificationBody => {
                "account is not an authorized verification body"
            }
            RevertReason::OnlyBatchCreator => "only the batch creator can verify this batch",
            RevertReason::BatchNotVerified => "batch not verified",
            RevertReason::BatchExpired => "batch expired",
            RevertReason::ExceedsTotalReduction => {
                "amount exceeds the batch's total emission reduction"
            }
            RevertReason::Paused => "contract is paused",
            RevertReason::InsufficientBalance => "insufficient balance",
            RevertReason::ArithmeticOverflow => "amount overflows a 256-bit counter",
        }
    }
}

impl fmt::Display for RevertReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;
