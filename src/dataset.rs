// 🗂️ Dataset - the three entity tables plus the flat joined rows reports consume
//
// Joins happen HERE, before anything is aggregated or windowed:
//   Transaction ⋈ Account ⋈ Customer → TransactionRow
//   Account ⋈ Customer               → AccountRow
// A foreign key that points nowhere is reported, never silently dropped.

use crate::entities::{Account, Customer, Record, Transaction};
use crate::error::{AnalyticsError, AnalyticsResult};
use crate::flow::FlowEdge;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    pub customers: Vec<Customer>,
    pub accounts: Vec<Account>,
    pub transactions: Vec<Transaction>,
    /// Optional From→To links between transactions
    #[serde(default)]
    pub flows: Vec<FlowEdge>,
}

/// A transaction with its account and owning customer resolved
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRow {
    pub transaction: Transaction,
    pub account: Account,
    pub customer: Customer,
}

impl Record for TransactionRow {
    fn describe(&self) -> String {
        self.transaction.describe()
    }
}

/// An account with its owning customer resolved
#[derive(Debug, Clone, PartialEq)]
pub struct AccountRow {
    pub account: Account,
    pub customer: Customer,
}

impl Record for AccountRow {
    fn describe(&self) -> String {
        self.account.describe()
    }
}

impl Dataset {
    pub fn new(customers: Vec<Customer>, accounts: Vec<Account>, transactions: Vec<Transaction>) -> Self {
        Dataset {
            customers,
            accounts,
            transactions,
            flows: Vec::new(),
        }
    }

    pub fn with_flows(mut self, flows: Vec<FlowEdge>) -> Self {
        self.flows = flows;
        self
    }

    pub fn transaction(&self, transaction_id: i64) -> Option<&Transaction> {
        self.transactions
            .iter()
            .find(|t| t.transaction_id == transaction_id)
    }

    /// Account ⋈ Customer, in account order
    pub fn account_rows(&self) -> AnalyticsResult<Vec<AccountRow>> {
        let customers: HashMap<i64, &Customer> =
            self.customers.iter().map(|c| (c.customer_id, c)).collect();

        self.accounts
            .iter()
            .map(|account| {
                let customer = customers.get(&account.customer_id).ok_or_else(|| {
                    AnalyticsError::DanglingReference {
                        record: account.describe(),
                        reference: format!("customer #{}", account.customer_id),
                    }
                })?;

                Ok(AccountRow {
                    account: account.clone(),
                    customer: (*customer).clone(),
                })
            })
            .collect()
    }

    /// Transaction ⋈ Account ⋈ Customer, in transaction order
    pub fn transaction_rows(&self) -> AnalyticsResult<Vec<TransactionRow>> {
        let accounts: HashMap<i64, AccountRow> = self
            .account_rows()?
            .into_iter()
            .map(|row| (row.account.account_id, row))
            .collect();

        let rows = self
            .transactions
            .iter()
            .map(|tx| {
                let owner = accounts.get(&tx.account_id).ok_or_else(|| {
                    AnalyticsError::DanglingReference {
                        record: tx.describe(),
                        reference: format!("account #{}", tx.account_id),
                    }
                })?;

                Ok(TransactionRow {
                    transaction: tx.clone(),
                    account: owner.account.clone(),
                    customer: owner.customer.clone(),
                })
            })
            .collect::<AnalyticsResult<Vec<_>>>()?;

        log::debug!("Joined {} transaction rows", rows.len());
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{AccountType, TransactionType};
    use chrono::NaiveDate;

    fn create_test_dataset() -> Dataset {
        let date = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
        Dataset::new(
            vec![
                Customer::new(1, "Ana", "Diaz", "ana@example.com", date),
                Customer::new(2, "Ben", "Okafor", "ben@example.com", date),
            ],
            vec![
                Account::new(10, 1, AccountType::Savings, 500.0),
                Account::new(20, 2, AccountType::Checking, 80.0),
            ],
            vec![
                Transaction::new(100, 20, date, Some(15.0), TransactionType::Withdrawal, "Food"),
                Transaction::new(101, 10, date, Some(200.0), TransactionType::Deposit, "Salary"),
            ],
        )
    }

    #[test]
    fn test_transaction_rows_resolve_owner() {
        let rows = create_test_dataset().transaction_rows().unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].transaction.transaction_id, 100);
        assert_eq!(rows[0].account.account_id, 20);
        assert_eq!(rows[0].customer.customer_id, 2);
        assert_eq!(rows[1].customer.full_name(), "Ana Diaz");
    }

    #[test]
    fn test_dangling_account_reference_is_reported() {
        let mut dataset = create_test_dataset();
        dataset.transactions[1].account_id = 99;

        let err = dataset.transaction_rows().unwrap_err();
        assert_eq!(
            err,
            AnalyticsError::DanglingReference {
                record: "transaction #101".to_string(),
                reference: "account #99".to_string(),
            }
        );
    }

    #[test]
    fn test_dangling_customer_reference_is_reported() {
        let mut dataset = create_test_dataset();
        dataset.accounts[0].customer_id = 42;

        let err = dataset.account_rows().unwrap_err();
        assert!(matches!(err, AnalyticsError::DanglingReference { .. }));
        assert_eq!(dataset.transaction(101).map(|t| t.account_id), Some(10));
        assert!(dataset.transaction(7).is_none());
    }
}
