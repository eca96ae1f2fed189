// 💳 Account Entity - belongs to exactly one customer
//
// Problem solved:
// - Account type is a closed set for the well-known kinds (Savings, Checking,
//   Investment) but keeps any other label the source hands us
// - Balance is the current signed balance as reported by the external store

use super::Record;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ACCOUNT TYPE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AccountType {
    /// Checking account (debit card, daily transactions)
    Checking,

    /// Savings account (interest-bearing)
    Savings,

    /// Investment account (brokerage, stocks, bonds)
    Investment,

    /// Any other label, kept verbatim
    Other(String),
}

impl AccountType {
    pub fn as_str(&self) -> &str {
        match self {
            AccountType::Checking => "Checking",
            AccountType::Savings => "Savings",
            AccountType::Investment => "Investment",
            AccountType::Other(label) => label,
        }
    }

    /// Parse a label (case-insensitive for the known kinds)
    pub fn parse(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "checking" => AccountType::Checking,
            "savings" => AccountType::Savings,
            "investment" => AccountType::Investment,
            _ => AccountType::Other(label.trim().to_string()),
        }
    }
}

impl From<String> for AccountType {
    fn from(label: String) -> Self {
        AccountType::parse(&label)
    }
}

impl From<AccountType> for String {
    fn from(account_type: AccountType) -> Self {
        account_type.as_str().to_string()
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ACCOUNT ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Stable identity
    pub account_id: i64,

    /// Owning customer (foreign key)
    pub customer_id: i64,

    /// Type of account
    pub account_type: AccountType,

    /// Current balance (signed)
    pub balance: f64,
}

impl Account {
    pub fn new(account_id: i64, customer_id: i64, account_type: AccountType, balance: f64) -> Self {
        Account {
            account_id,
            customer_id,
            account_type,
            balance,
        }
    }
}

impl Record for Account {
    fn describe(&self) -> String {
        format!("account #{}", self.account_id)
    }
}

// ============================================================================
// TESTS
// ============================================================================
