// 📊 Reports - the ten analytical queries over Customers / Accounts / Transactions
//
// Every report is a plain function over a `Dataset` returning typed rows.
// `ReportKind` names them by slug and renders any of them into a
// `ReportTable` for the CLI, the TUI and the HTTP API.
//
//  1 account-activity             Aggregator by account
//  2 running-balance              WindowedRanker running sum
//  3 dormant-customers            NOT IN
//  4 category-pivot               conditional aggregation pivot
//  5 high-activity-accounts       Aggregator + HAVING
//  6 large-transaction-customers  EXISTS
//  7 balance-rank                 WindowedRanker rank
//  8 transaction-type-pivot       conditional aggregation pivot
//  9 above-average-accounts       correlated filter against a global average
// 10 customer-portfolio           Aggregator by (customer, account type)

use crate::aggregate::{Aggregator, Average, Field, GroupRow, Measure};
use crate::config::ReportSettings;
use crate::dataset::{AccountRow, Dataset, TransactionRow};
use crate::entities::{category, AccountType, Customer};
use crate::error::AnalyticsResult;
use crate::relational::{above_reference, anti_join, global_mean, semi_join};
use crate::window::{order_by, SortDirection, WindowedRanker};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ============================================================================
// FIELDS
// ============================================================================

fn magnitude() -> Field<TransactionRow> {
    Field::new("amount", |row: &TransactionRow| row.transaction.magnitude())
}

fn net_change() -> Field<TransactionRow> {
    Field::new("amount", |row: &TransactionRow| row.transaction.net_change())
}

fn balance() -> Field<AccountRow> {
    Field::new("balance", |row: &AccountRow| Some(row.account.balance))
}

fn is_deposit(row: &TransactionRow) -> bool {
    row.transaction.is_deposit()
}

fn is_withdrawal(row: &TransactionRow) -> bool {
    row.transaction.is_withdrawal()
}

fn is_transfer(row: &TransactionRow) -> bool {
    row.transaction.is_transfer()
}

const PIVOT_CATEGORIES: [&str; 3] = [category::FOOD, category::TRAVEL, category::UTILITIES];

fn spend_in(row: &TransactionRow, label: &str) -> bool {
    is_withdrawal(row) && row.transaction.in_category(label)
}

fn spend_elsewhere(row: &TransactionRow) -> bool {
    is_withdrawal(row) && !PIVOT_CATEGORIES.iter().any(|c| row.transaction.in_category(c))
}

fn money(value: f64) -> String {
    format!("{:.2}", value)
}

// ============================================================================
// ROW TYPES
// ============================================================================

/// Column layout for rendering typed rows as a table
pub trait TabularRow {
    fn columns() -> &'static [&'static str];
    fn cells(&self) -> Vec<String>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountActivityRow {
    pub account_id: i64,
    pub customer_id: i64,
    pub account_type: AccountType,
    pub deposits: f64,
    pub withdrawals: f64,
    pub net_change: f64,
    pub transaction_count: u64,
}

impl TabularRow for AccountActivityRow {
    fn columns() -> &'static [&'static str] {
        &["account_id", "customer_id", "account_type", "deposits", "withdrawals", "net_change", "transactions"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.account_id.to_string(),
            self.customer_id.to_string(),
            self.account_type.to_string(),
            money(self.deposits),
            money(self.withdrawals),
            money(self.net_change),
            self.transaction_count.to_string(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunningBalanceRow {
    pub account_id: i64,
    pub transaction_id: i64,
    pub transaction_date: NaiveDate,
    pub net_change: f64,
    pub running_total: f64,
}

impl TabularRow for RunningBalanceRow {
    fn columns() -> &'static [&'static str] {
        &["account_id", "transaction_id", "date", "net_change", "running_total"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.account_id.to_string(),
            self.transaction_id.to_string(),
            self.transaction_date.to_string(),
            money(self.net_change),
            money(self.running_total),
        ]
    }
}

/// Used by both dormant-customers and large-transaction-customers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRow {
    pub customer_id: i64,
    pub full_name: String,
    pub email: String,
}

impl From<&Customer> for CustomerRow {
    fn from(customer: &Customer) -> Self {
        CustomerRow {
            customer_id: customer.customer_id,
            full_name: customer.full_name(),
            email: customer.email.clone(),
        }
    }
}

impl TabularRow for CustomerRow {
    fn columns() -> &'static [&'static str] {
        &["customer_id", "name", "email"]
    }

    fn cells(&self) -> Vec<String> {
        vec![self.customer_id.to_string(), self.full_name.clone(), self.email.clone()]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryPivotRow {
    pub customer_id: i64,
    pub full_name: String,
    pub food: f64,
    pub travel: f64,
    pub utilities: f64,
    pub other: f64,
    pub total_spent: f64,
}

impl TabularRow for CategoryPivotRow {
    fn columns() -> &'static [&'static str] {
        &["customer_id", "name", "food", "travel", "utilities", "other", "total_spent"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.customer_id.to_string(),
            self.full_name.clone(),
            money(self.food),
            money(self.travel),
            money(self.utilities),
            money(self.other),
            money(self.total_spent),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighActivityRow {
    pub account_id: i64,
    pub customer_id: i64,
    pub transaction_count: u64,
}

impl TabularRow for HighActivityRow {
    fn columns() -> &'static [&'static str] {
        &["account_id", "customer_id", "transactions"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.account_id.to_string(),
            self.customer_id.to_string(),
            self.transaction_count.to_string(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceRankRow {
    pub account_type: AccountType,
    pub account_id: i64,
    pub customer_id: i64,
    pub balance: f64,
    pub rank: u64,
}

impl TabularRow for BalanceRankRow {
    fn columns() -> &'static [&'static str] {
        &["account_type", "account_id", "customer_id", "balance", "rank"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.account_type.to_string(),
            self.account_id.to_string(),
            self.customer_id.to_string(),
            money(self.balance),
            self.rank.to_string(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionTypePivotRow {
    pub customer_id: i64,
    pub full_name: String,
    pub deposits: f64,
    pub withdrawals: f64,
    pub transfers: f64,
    pub deposit_count: u64,
    pub average_deposit: Average,
}

impl TabularRow for TransactionTypePivotRow {
    fn columns() -> &'static [&'static str] {
        &["customer_id", "name", "deposits", "withdrawals", "transfers", "deposit_count", "average_deposit"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.customer_id.to_string(),
            self.full_name.clone(),
            money(self.deposits),
            money(self.withdrawals),
            money(self.transfers),
            self.deposit_count.to_string(),
            self.average_deposit.to_string(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AboveAverageAccountRow {
    pub account_id: i64,
    pub customer_id: i64,
    pub average_amount: f64,
    pub global_average: f64,
    pub transaction_count: u64,
}

impl TabularRow for AboveAverageAccountRow {
    fn columns() -> &'static [&'static str] {
        &["account_id", "customer_id", "average_amount", "global_average", "transactions"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.account_id.to_string(),
            self.customer_id.to_string(),
            money(self.average_amount),
            money(self.global_average),
            self.transaction_count.to_string(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioRow {
    pub customer_id: i64,
    pub full_name: String,
    pub account_type: AccountType,
    pub account_count: u64,
    pub total_balance: f64,
    pub average_balance: Average,
}

impl TabularRow for PortfolioRow {
    fn columns() -> &'static [&'static str] {
        &["customer_id", "name", "account_type", "accounts", "total_balance", "average_balance"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.customer_id.to_string(),
            self.full_name.clone(),
            self.account_type.to_string(),
            self.account_count.to_string(),
            money(self.total_balance),
            self.average_balance.to_string(),
        ]
    }
}

// ============================================================================
// THE TEN REPORTS
// ============================================================================

/// 1. Deposits, withdrawals, net change and count per account
pub fn account_activity(dataset: &Dataset) -> AnalyticsResult<Vec<AccountActivityRow>> {
    let rows = dataset.transaction_rows()?;

    let aggregation = Aggregator::new(|row: &TransactionRow| {
        (row.account.account_id, row.customer.customer_id, row.account.account_type.clone())
    })
    .measure(Measure::sum("deposits", magnitude()).when(is_deposit))
    .measure(Measure::sum("withdrawals", magnitude()).when(is_withdrawal))
    .measure(Measure::sum("net_change", net_change()))
    .measure(Measure::count("transactions"))
    .aggregate(&rows)?;

    Ok(aggregation
        .into_rows()
        .into_iter()
        .map(|group| {
            let (account_id, customer_id, account_type) = group.key.clone();
            AccountActivityRow {
                account_id,
                customer_id,
                account_type,
                deposits: group.sum("deposits").unwrap_or_default(),
                withdrawals: group.sum("withdrawals").unwrap_or_default(),
                net_change: group.sum("net_change").unwrap_or_default(),
                transaction_count: group.count("transactions").unwrap_or_default(),
            }
        })
        .collect())
}

/// 2. Running net change per account, by date (same-date rows in input order)
pub fn running_balances(dataset: &Dataset) -> AnalyticsResult<Vec<RunningBalanceRow>> {
    let rows = dataset.transaction_rows()?;

    let window = WindowedRanker::running_sum(
        |row: &TransactionRow| row.account.account_id,
        order_by(|row: &TransactionRow| row.transaction.transaction_date),
        Field::new("amount", |row: &TransactionRow| row.transaction.net_change()),
    )
    .apply(&rows)?;

    Ok(window
        .into_iter()
        .map(|row| RunningBalanceRow {
            account_id: row.partition,
            transaction_id: row.record.transaction.transaction_id,
            transaction_date: row.record.transaction.transaction_date,
            net_change: row.record.transaction.net_change().unwrap_or_default(),
            running_total: row.value.running_sum().unwrap_or_default(),
        })
        .collect())
}

/// 3. Customers with no transaction on any of their accounts
pub fn dormant_customers(dataset: &Dataset) -> AnalyticsResult<Vec<CustomerRow>> {
    let rows = dataset.transaction_rows()?;

    let mut dormant = anti_join(
        &dataset.customers,
        &rows,
        |c| c.customer_id,
        |row| row.customer.customer_id,
    );
    dormant.sort_by_key(|c| c.customer_id);

    Ok(dormant.into_iter().map(CustomerRow::from).collect())
}

/// 4. Withdrawals per customer pivoted by category
pub fn category_spending_pivot(dataset: &Dataset) -> AnalyticsResult<Vec<CategoryPivotRow>> {
    let rows = dataset.transaction_rows()?;

    let aggregation = Aggregator::new(|row: &TransactionRow| {
        (row.customer.customer_id, row.customer.full_name())
    })
    .measure(Measure::sum("food", magnitude()).when(|row: &TransactionRow| spend_in(row, category::FOOD)))
    .measure(Measure::sum("travel", magnitude()).when(|row: &TransactionRow| spend_in(row, category::TRAVEL)))
    .measure(Measure::sum("utilities", magnitude()).when(|row: &TransactionRow| spend_in(row, category::UTILITIES)))
    .measure(Measure::sum("other", magnitude()).when(spend_elsewhere))
    .measure(Measure::sum("total_spent", magnitude()).when(is_withdrawal))
    .aggregate(&rows)?;

    Ok(aggregation
        .into_rows()
        .into_iter()
        .map(|group| CategoryPivotRow {
            customer_id: group.key.0,
            full_name: group.key.1.clone(),
            food: group.sum("food").unwrap_or_default(),
            travel: group.sum("travel").unwrap_or_default(),
            utilities: group.sum("utilities").unwrap_or_default(),
            other: group.sum("other").unwrap_or_default(),
            total_spent: group.sum("total_spent").unwrap_or_default(),
        })
        .collect())
}

/// 5. Accounts with more transactions than the configured minimum
pub fn high_activity_accounts(
    dataset: &Dataset,
    settings: &ReportSettings,
) -> AnalyticsResult<Vec<HighActivityRow>> {
    let rows = dataset.transaction_rows()?;
    let minimum = settings.high_activity_min_transactions;

    let aggregation = Aggregator::new(|row: &TransactionRow| {
        (row.account.account_id, row.customer.customer_id)
    })
    .measure(Measure::count("transactions"))
    .having(move |group| group.count("transactions").unwrap_or_default() > minimum)
    .aggregate(&rows)?;

    Ok(aggregation
        .into_rows()
        .into_iter()
        .map(|group| HighActivityRow {
            account_id: group.key.0,
            customer_id: group.key.1,
            transaction_count: group.count("transactions").unwrap_or_default(),
        })
        .collect())
}

/// 6. Customers with at least one transaction above the large-amount threshold
pub fn large_transaction_customers(
    dataset: &Dataset,
    settings: &ReportSettings,
) -> AnalyticsResult<Vec<CustomerRow>> {
    let rows = dataset.transaction_rows()?;
    let threshold = settings.large_transaction_threshold;

    let mut customers = semi_join(
        &dataset.customers,
        &rows,
        |c| c.customer_id,
        |row| row.customer.customer_id,
        |row| Ok(row.transaction.require_amount()?.abs() > threshold),
    )?;
    customers.sort_by_key(|c| c.customer_id);

    Ok(customers.into_iter().map(CustomerRow::from).collect())
}

/// 7. Accounts ranked by balance (highest first) within each account type
pub fn balance_ranking(dataset: &Dataset) -> AnalyticsResult<Vec<BalanceRankRow>> {
    let rows = dataset.account_rows()?;

    let window = WindowedRanker::rank(
        |row: &AccountRow| row.account.account_type.clone(),
        order_by(|row: &AccountRow| row.account.account_id),
        balance(),
        SortDirection::Descending,
    )
    .apply(&rows)?;

    Ok(window
        .into_iter()
        .map(|row| BalanceRankRow {
            account_type: row.partition,
            account_id: row.record.account.account_id,
            customer_id: row.record.customer.customer_id,
            balance: row.record.account.balance,
            rank: row.value.rank().unwrap_or_default(),
        })
        .collect())
}

/// 8. Per customer: volume by transaction type and the average deposit
pub fn transaction_type_pivot(dataset: &Dataset) -> AnalyticsResult<Vec<TransactionTypePivotRow>> {
    let rows = dataset.transaction_rows()?;

    let aggregation = Aggregator::new(|row: &TransactionRow| {
        (row.customer.customer_id, row.customer.full_name())
    })
    .measure(Measure::sum("deposits", magnitude()).when(is_deposit))
    .measure(Measure::sum("withdrawals", magnitude()).when(is_withdrawal))
    .measure(Measure::sum("transfers", magnitude()).when(is_transfer))
    .measure(Measure::count("deposit_count").when(is_deposit))
    .measure(Measure::average("average_deposit", magnitude()).when(is_deposit))
    .aggregate(&rows)?;

    Ok(aggregation
        .into_rows()
        .into_iter()
        .map(|group| TransactionTypePivotRow {
            customer_id: group.key.0,
            full_name: group.key.1.clone(),
            deposits: group.sum("deposits").unwrap_or_default(),
            withdrawals: group.sum("withdrawals").unwrap_or_default(),
            transfers: group.sum("transfers").unwrap_or_default(),
            deposit_count: group.count("deposit_count").unwrap_or_default(),
            average_deposit: group.average("average_deposit").unwrap_or(Average::NoData),
        })
        .collect())
}

/// 9. Accounts whose mean |amount| is above the mean |amount| of all transactions
pub fn above_average_accounts(dataset: &Dataset) -> AnalyticsResult<Vec<AboveAverageAccountRow>> {
    let rows = dataset.transaction_rows()?;

    // Computed once, not per account
    let Some(global_average) = global_mean(&rows, &magnitude())?.value() else {
        return Ok(Vec::new());
    };

    let per_account = Aggregator::new(|row: &TransactionRow| {
        (row.account.account_id, row.customer.customer_id)
    })
    .measure(Measure::average("average_amount", magnitude()))
    .measure(Measure::count("transactions"))
    .aggregate(&rows)?
    .into_rows();

    let average_of = |group: &GroupRow<(i64, i64)>| {
        group.average("average_amount").and_then(|avg| avg.value())
    };

    Ok(above_reference(&per_account, global_average, average_of)
        .into_iter()
        .map(|group| AboveAverageAccountRow {
            account_id: group.key.0,
            customer_id: group.key.1,
            average_amount: average_of(group).unwrap_or_default(),
            global_average,
            transaction_count: group.count("transactions").unwrap_or_default(),
        })
        .collect())
}

/// 10. Accounts, total and average balance per (customer, account type)
pub fn customer_portfolio(dataset: &Dataset) -> AnalyticsResult<Vec<PortfolioRow>> {
    let rows = dataset.account_rows()?;

    let aggregation = Aggregator::new(|row: &AccountRow| {
        (row.customer.customer_id, row.customer.full_name(), row.account.account_type.clone())
    })
    .measure(Measure::count("accounts"))
    .measure(Measure::sum("total_balance", balance()))
    .measure(Measure::average("average_balance", balance()))
    .aggregate(&rows)?;

    Ok(aggregation
        .into_rows()
        .into_iter()
        .map(|group| {
            let (customer_id, full_name, account_type) = group.key.clone();
            PortfolioRow {
                customer_id,
                full_name,
                account_type,
                account_count: group.count("accounts").unwrap_or_default(),
                total_balance: group.sum("total_balance").unwrap_or_default(),
                average_balance: group.average("average_balance").unwrap_or(Average::NoData),
            }
        })
        .collect())
}

// ============================================================================
// REPORT CATALOG + TABLES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportKind {
    AccountActivity,
    RunningBalance,
    DormantCustomers,
    CategoryPivot,
    HighActivityAccounts,
    LargeTransactionCustomers,
    BalanceRank,
    TransactionTypePivot,
    AboveAverageAccounts,
    CustomerPortfolio,
}

impl ReportKind {
    pub const ALL: [ReportKind; 10] = [
        ReportKind::AccountActivity,
        ReportKind::RunningBalance,
        ReportKind::DormantCustomers,
        ReportKind::CategoryPivot,
        ReportKind::HighActivityAccounts,
        ReportKind::LargeTransactionCustomers,
        ReportKind::BalanceRank,
        ReportKind::TransactionTypePivot,
        ReportKind::AboveAverageAccounts,
        ReportKind::CustomerPortfolio,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            ReportKind::AccountActivity => "account-activity",
            ReportKind::RunningBalance => "running-balance",
            ReportKind::DormantCustomers => "dormant-customers",
            ReportKind::CategoryPivot => "category-pivot",
            ReportKind::HighActivityAccounts => "high-activity-accounts",
            ReportKind::LargeTransactionCustomers => "large-transaction-customers",
            ReportKind::BalanceRank => "balance-rank",
            ReportKind::TransactionTypePivot => "transaction-type-pivot",
            ReportKind::AboveAverageAccounts => "above-average-accounts",
            ReportKind::CustomerPortfolio => "customer-portfolio",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ReportKind::AccountActivity => "Account Activity",
            ReportKind::RunningBalance => "Running Balance",
            ReportKind::DormantCustomers => "Dormant Customers",
            ReportKind::CategoryPivot => "Spending by Category",
            ReportKind::HighActivityAccounts => "High-Activity Accounts",
            ReportKind::LargeTransactionCustomers => "Customers with Large Transactions",
            ReportKind::BalanceRank => "Balance Rank by Account Type",
            ReportKind::TransactionTypePivot => "Volume by Transaction Type",
            ReportKind::AboveAverageAccounts => "Above-Average Accounts",
            ReportKind::CustomerPortfolio => "Customer Portfolio",
        }
    }

    pub fn from_slug(slug: &str) -> Option<ReportKind> {
        ReportKind::ALL.into_iter().find(|kind| kind.slug() == slug)
    }

    pub fn run(&self, dataset: &Dataset, settings: &ReportSettings) -> AnalyticsResult<ReportTable> {
        log::debug!("Running report {}", self.slug());

        Ok(match self {
            ReportKind::AccountActivity => ReportTable::from_rows(*self, &account_activity(dataset)?),
            ReportKind::RunningBalance => ReportTable::from_rows(*self, &running_balances(dataset)?),
            ReportKind::DormantCustomers => ReportTable::from_rows(*self, &dormant_customers(dataset)?),
            ReportKind::CategoryPivot => ReportTable::from_rows(*self, &category_spending_pivot(dataset)?),
            ReportKind::HighActivityAccounts => {
                ReportTable::from_rows(*self, &high_activity_accounts(dataset, settings)?)
            }
            ReportKind::LargeTransactionCustomers => {
                ReportTable::from_rows(*self, &large_transaction_customers(dataset, settings)?)
            }
            ReportKind::BalanceRank => ReportTable::from_rows(*self, &balance_ranking(dataset)?),
            ReportKind::TransactionTypePivot => ReportTable::from_rows(*self, &transaction_type_pivot(dataset)?),
            ReportKind::AboveAverageAccounts => ReportTable::from_rows(*self, &above_average_accounts(dataset)?),
            ReportKind::CustomerPortfolio => ReportTable::from_rows(*self, &customer_portfolio(dataset)?),
        })
    }
}

/// A rendered report: string cells ready for display or JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportTable {
    pub kind: ReportKind,
    pub title: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ReportTable {
    pub fn from_rows<T: TabularRow>(kind: ReportKind, rows: &[T]) -> Self {
        ReportTable {
            kind,
            title: kind.title().to_string(),
            columns: T::columns().iter().map(|c| c.to_string()).collect(),
            rows: rows.iter().map(T::cells).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// SHA-256 over columns and cells; equal inputs give equal fingerprints
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.kind.slug());
        for line in std::iter::once(&self.columns).chain(self.rows.iter()) {
            hasher.update(b"\x1e");
            for cell in line {
                hasher.update(cell.as_bytes());
                hasher.update(b"\x1f");
            }
        }
        format!("{:x}", hasher.finalize())
    }

    /// Fixed-width text rendering for the terminal
    pub fn render(&self) -> String {
        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.chars().count()).collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let format_line = |cells: &[String]| {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        let mut out = String::new();
        out.push_str(&format!("{} ({} rows)\n", self.title, self.rows.len()));
        out.push_str(&format_line(&self.columns));
        out.push('\n');
        out.push_str(
            &widths
                .iter()
                .map(|w| "─".repeat(*w))
                .collect::<Vec<_>>()
                .join("  "),
        );
        out.push('\n');
        for row in &self.rows {
            out.push_str(&format_line(row));
            out.push('\n');
        }
        out
    }
}

// ============================================================================
// TESTS
// ============================================================================
