//! Deposit domain entities.
//!
//! The wire form of every entity uses the upstream service's Go-style JSON
//! keys (`UserID`, `TxID`, ...), so existing clients keep working.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::step::ValidationError;
use crate::store::TerminalRecord;

/// An inbound deposit request. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositRequest {
    /// The user making the deposit.
    #[serde(rename = "UserID")]
    pub user_id: String,
    /// The amount to deposit, in minor units.
    #[serde(rename = "Amount")]
    pub amount: i64,
}

impl DepositRequest {
    /// Creates a new deposit request.
    #[must_use]
    pub fn new(user_id: impl Into<String>, amount: i64) -> Self {
        Self {
            user_id: user_id.into(),
            amount,
        }
    }

    /// Shape checks applied before the first step executes.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.user_id.trim().is_empty() {
            return Err(ValidationError::new("user id must not be empty"));
        }
        if self.amount <= 0 {
            return Err(ValidationError::new("amount must be positive"));
        }
        Ok(())
    }
}

/// A ledger transaction created from a [`DepositRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Freshly generated transaction identifier.
    #[serde(rename = "TxID")]
    pub tx_id: Uuid,
    /// Copied verbatim from the request.
    #[serde(rename = "UserID")]
    pub user_id: String,
    /// Copied verbatim from the request.
    #[serde(rename = "Amount")]
    pub amount: i64,
}

/// A wallet entry created from a [`Transaction`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    /// Freshly generated wallet identifier.
    #[serde(rename = "WalletID")]
    pub wallet_id: Uuid,
    /// The backing transaction.
    #[serde(rename = "TxID")]
    pub tx_id: Uuid,
    /// Invariant across the pipeline.
    #[serde(rename = "Amount")]
    pub amount: i64,
    /// Invariant across the pipeline.
    #[serde(rename = "UserID")]
    pub user_id: String,
}

/// The terminal deposit record. Immutable once appended to the result store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    /// Identifier of the pipeline run that produced this deposit.
    #[serde(rename = "RunID")]
    pub run_id: Uuid,
    /// Freshly generated deposit identifier.
    #[serde(rename = "DepositID")]
    pub deposit_id: Uuid,
    /// The backing wallet.
    #[serde(rename = "WalletID")]
    pub wallet_id: Uuid,
    /// The backing transaction.
    #[serde(rename = "TxID")]
    pub tx_id: Uuid,
    /// Invariant across the pipeline.
    #[serde(rename = "Amount")]
    pub amount: i64,
    /// Invariant across the pipeline.
    #[serde(rename = "UserID")]
    pub user_id: String,
}

impl TerminalRecord for Deposit {
    fn run_id(&self) -> Uuid {
        self.run_id
    }

    fn record_id(&self) -> Uuid {
        self.deposit_id
    }
}
