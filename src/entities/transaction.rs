// 💸 Transaction Entity - a single movement of money on one account
//
// Sign convention for net change:
//   Deposit    → +|amount|
//   Withdrawal → -|amount|
//   anything else (Transfer, other labels) → amount as recorded

use super::Record;
use crate::error::{AnalyticsError, AnalyticsResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Well-known category labels (categories are free-form)
pub mod category {
    pub const FOOD: &str = "Food";
    pub const TRAVEL: &str = "Travel";
    pub const UTILITIES: &str = "Utilities";
    pub const SALARY: &str = "Salary";
}

// ============================================================================
// TRANSACTION TYPE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Transfer,
    /// Any other label, kept verbatim
    Other(String),
}

impl TransactionType {
    pub fn as_str(&self) -> &str {
        match self {
            TransactionType::Deposit => "Deposit",
            TransactionType::Withdrawal => "Withdrawal",
            TransactionType::Transfer => "Transfer",
            TransactionType::Other(label) => label,
        }
    }

    pub fn parse(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "deposit" => TransactionType::Deposit,
            "withdrawal" => TransactionType::Withdrawal,
            "transfer" => TransactionType::Transfer,
            _ => TransactionType::Other(label.trim().to_string()),
        }
    }
}

impl From<String> for TransactionType {
    fn from(label: String) -> Self {
        TransactionType::parse(&label)
    }
}

impl From<TransactionType> for String {
    fn from(transaction_type: TransactionType) -> Self {
        transaction_type.as_str().to_string()
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// TRANSACTION ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Stable identity
    pub transaction_id: i64,

    /// Owning account (foreign key)
    pub account_id: i64,

    pub transaction_date: NaiveDate,

    /// Nullable at the source: a missing amount is a malformed record
    /// for every measure that reads it
    pub amount: Option<f64>,

    pub transaction_type: TransactionType,

    /// Free-form label (Food, Travel, Utilities, Salary, ...)
    pub category: String,
}

impl Transaction {
    pub fn new(
        transaction_id: i64,
        account_id: i64,
        transaction_date: NaiveDate,
        amount: Option<f64>,
        transaction_type: TransactionType,
        category: &str,
    ) -> Self {
        Transaction {
            transaction_id,
            account_id,
            transaction_date,
            amount,
            transaction_type,
            category: category.to_string(),
        }
    }

    pub fn is_deposit(&self) -> bool {
        self.transaction_type == TransactionType::Deposit
    }

    pub fn is_withdrawal(&self) -> bool {
        self.transaction_type == TransactionType::Withdrawal
    }

    pub fn is_transfer(&self) -> bool {
        self.transaction_type == TransactionType::Transfer
    }

    /// Category comparison is case-insensitive
    pub fn in_category(&self, label: &str) -> bool {
        self.category.eq_ignore_ascii_case(label)
    }

    /// Absolute amount, if present
    pub fn magnitude(&self) -> Option<f64> {
        self.amount.map(f64::abs)
    }

    /// Signed effect on the account balance, if the amount is present
    pub fn net_change(&self) -> Option<f64> {
        let amount = self.amount?;
        Some(match self.transaction_type {
            TransactionType::Deposit => amount.abs(),
            TransactionType::Withdrawal => -amount.abs(),
            _ => amount,
        })
    }

    /// Amount or a MalformedRecord error naming this transaction
    pub fn require_amount(&self) -> AnalyticsResult<f64> {
        match self.amount {
            Some(amount) if amount.is_finite() => Ok(amount),
            Some(amount) => Err(AnalyticsError::non_finite(self.describe(), "amount", amount)),
            None => Err(AnalyticsError::missing(self.describe(), "amount")),
        }
    }
}

impl Record for Transaction {
    fn describe(&self) -> String {
        format!("transaction #{}", self.transaction_id)
    }
}

// ============================================================================
// TESTS
// ============================================================================
