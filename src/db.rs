// 💾 Storage - CSV record source + SQLite persistence
//
// CSV directory (customers.csv, accounts.csv, transactions.csv,
// optional transaction_flows.csv) → Dataset → SQLite.
//
// Import is idempotent: every table carries a UNIQUE natural id and a
// re-import skips constraint violations instead of duplicating rows.
// Rows are read back in import order (the AUTOINCREMENT `id`), because
// report tie-breaking depends on input order.

use crate::dataset::Dataset;
use crate::entities::{Account, AccountType, Customer, Transaction, TransactionType};
use crate::flow::FlowEdge;
use crate::reports::ReportTable;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, ErrorCode, Row, Statement};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CUSTOMERS_CSV: &str = "customers.csv";
pub const ACCOUNTS_CSV: &str = "accounts.csv";
pub const TRANSACTIONS_CSV: &str = "transactions.csv";
pub const FLOWS_CSV: &str = "transaction_flows.csv";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// One persisted report execution (audit trail)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRun {
    pub run_id: String,
    pub slug: String,
    pub row_count: usize,
    /// SHA-256 of the rendered table; equal fingerprints mean identical output
    pub fingerprint: String,
    pub generated_at: DateTime<Utc>,
}

impl ReportRun {
    pub fn new(table: &ReportTable) -> Self {
        ReportRun {
            run_id: uuid::Uuid::new_v4().to_string(),
            slug: table.kind.slug().to_string(),
            row_count: table.len(),
            fingerprint: table.fingerprint(),
            generated_at: Utc::now(),
        }
    }
}

/// Rows inserted per table by `import_dataset`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub customers: usize,
    pub accounts: usize,
    pub transactions: usize,
    pub flows: usize,
}

impl ImportSummary {
    pub fn total(&self) -> usize {
        self.customers + self.accounts + self.transactions + self.flows
    }
}

// ============================================================================
// SCHEMA
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS customers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            customer_id INTEGER UNIQUE NOT NULL,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            email TEXT NOT NULL,
            registration_date TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS accounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            account_id INTEGER UNIQUE NOT NULL,
            customer_id INTEGER NOT NULL,
            account_type TEXT NOT NULL,
            balance REAL NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // amount is nullable: a missing amount is reported when a report reads it
    conn.execute(
        "CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            transaction_id INTEGER UNIQUE NOT NULL,
            account_id INTEGER NOT NULL,
            transaction_date TEXT NOT NULL,
            amount REAL,
            transaction_type TEXT NOT NULL,
            category TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS transaction_flows (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            from_transaction_id INTEGER NOT NULL,
            to_transaction_id INTEGER NOT NULL,
            UNIQUE (from_transaction_id, to_transaction_id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS report_runs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            run_id TEXT UNIQUE NOT NULL,
            slug TEXT NOT NULL,
            row_count INTEGER NOT NULL,
            fingerprint TEXT NOT NULL,
            generated_at TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_accounts_customer ON accounts(customer_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_transactions_account ON transactions(account_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(transaction_date)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_report_runs_slug ON report_runs(slug)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// CSV SOURCE
// ============================================================================

/// Deserialize every row of a headed CSV file
pub fn load_csv<T: DeserializeOwned>(csv_path: &Path) -> Result<Vec<T>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(csv_path)
        .with_context(|| format!("Failed to open CSV file {}", csv_path.display()))?;

    let mut records = Vec::new();
    for (line, result) in rdr.deserialize().enumerate() {
        let record: T = result.with_context(|| {
            // +2: one for the header, one for 1-based numbering
            format!("Failed to deserialize {} line {}", csv_path.display(), line + 2)
        })?;
        records.push(record);
    }

    Ok(records)
}

/// Read the three entity files (and flows, when present) from a directory
pub fn load_dataset_from_dir(dir: &Path) -> Result<Dataset> {
    let customers: Vec<Customer> = load_csv(&dir.join(CUSTOMERS_CSV))?;
    let accounts: Vec<Account> = load_csv(&dir.join(ACCOUNTS_CSV))?;
    let transactions: Vec<Transaction> = load_csv(&dir.join(TRANSACTIONS_CSV))?;

    let flows_path = dir.join(FLOWS_CSV);
    let flows: Vec<FlowEdge> = if flows_path.exists() {
        load_csv(&flows_path)?
    } else {
        log::debug!("No {} in {}", FLOWS_CSV, dir.display());
        Vec::new()
    };

    log::info!(
        "Loaded {} customers, {} accounts, {} transactions, {} flow edges from {}",
        customers.len(),
        accounts.len(),
        transactions.len(),
        flows.len(),
        dir.display()
    );

    Ok(Dataset::new(customers, accounts, transactions).with_flows(flows))
}

// ============================================================================
// INSERTS
// ============================================================================

/// Run `bind` for every record inside one transaction, skipping duplicates
fn insert_rows<T>(
    conn: &Connection,
    table: &str,
    sql: &str,
    records: &[T],
    bind: impl Fn(&mut Statement<'_>, &T) -> rusqlite::Result<usize>,
) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut inserted = 0;
    let mut duplicates = 0;

    {
        let mut stmt = tx.prepare(sql)?;
        for record in records {
            match bind(&mut stmt, record) {
                Ok(_) => inserted += 1,
                Err(rusqlite::Error::SqliteFailure(err, _))
                    if err.code == ErrorCode::ConstraintViolation =>
                {
                    duplicates += 1;
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("Failed to insert into {}", table))
                }
            }
        }
    }

    tx.commit()?;
    log::info!(
        "✓ {}: inserted {}, skipped {} duplicates",
        table,
        inserted,
        duplicates
    );

    Ok(inserted)
}

pub fn insert_customers(conn: &Connection, customers: &[Customer]) -> Result<usize> {
    insert_rows(
        conn,
        "customers",
        "INSERT INTO customers (customer_id, first_name, last_name, email, registration_date)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        customers,
        |stmt, c| {
            stmt.execute(params![
                c.customer_id,
                c.first_name,
                c.last_name,
                c.email,
                c.registration_date.format(DATE_FORMAT).to_string(),
            ])
        },
    )
}

pub fn insert_accounts(conn: &Connection, accounts: &[Account]) -> Result<usize> {
    insert_rows(
        conn,
        "accounts",
        "INSERT INTO accounts (account_id, customer_id, account_type, balance)
         VALUES (?1, ?2, ?3, ?4)",
        accounts,
        |stmt, a| {
            stmt.execute(params![
                a.account_id,
                a.customer_id,
                a.account_type.as_str(),
                a.balance,
            ])
        },
    )
}

pub fn insert_transactions(conn: &Connection, transactions: &[Transaction]) -> Result<usize> {
    insert_rows(
        conn,
        "transactions",
        "INSERT INTO transactions (
            transaction_id, account_id, transaction_date, amount, transaction_type, category
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        transactions,
        |stmt, t| {
            stmt.execute(params![
                t.transaction_id,
                t.account_id,
                t.transaction_date.format(DATE_FORMAT).to_string(),
                t.amount,
                t.transaction_type.as_str(),
                t.category,
            ])
        },
    )
}

pub fn insert_flows(conn: &Connection, flows: &[FlowEdge]) -> Result<usize> {
    insert_rows(
        conn,
        "transaction_flows",
        "INSERT INTO transaction_flows (from_transaction_id, to_transaction_id) VALUES (?1, ?2)",
        flows,
        |stmt, f| stmt.execute(params![f.from_transaction_id, f.to_transaction_id]),
    )
}

/// Insert every table of a dataset (parents first)
pub fn import_dataset(conn: &Connection, dataset: &Dataset) -> Result<ImportSummary> {
    Ok(ImportSummary {
        customers: insert_customers(conn, &dataset.customers)?,
        accounts: insert_accounts(conn, &dataset.accounts)?,
        transactions: insert_transactions(conn, &dataset.transactions)?,
        flows: insert_flows(conn, &dataset.flows)?,
    })
}

// ============================================================================
// READS
// ============================================================================

fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let text: String = row.get(idx)?;
    NaiveDate::parse_from_str(&text, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub fn get_all_customers(conn: &Connection) -> Result<Vec<Customer>> {
    let mut stmt = conn.prepare(
        "SELECT customer_id, first_name, last_name, email, registration_date
         FROM customers
         ORDER BY id",
    )?;

    let customers = stmt
        .query_map([], |row| {
            Ok(Customer {
                customer_id: row.get(0)?,
                first_name: row.get(1)?,
                last_name: row.get(2)?,
                email: row.get(3)?,
                registration_date: date_column(row, 4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(customers)
}

pub fn get_all_accounts(conn: &Connection) -> Result<Vec<Account>> {
    let mut stmt = conn.prepare(
        "SELECT account_id, customer_id, account_type, balance
         FROM accounts
         ORDER BY id",
    )?;

    let accounts = stmt
        .query_map([], |row| {
            let account_type: String = row.get(2)?;
            Ok(Account {
                account_id: row.get(0)?,
                customer_id: row.get(1)?,
                account_type: AccountType::parse(&account_type),
                balance: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(accounts)
}

pub fn get_all_transactions(conn: &Connection) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(
        "SELECT transaction_id, account_id, transaction_date, amount, transaction_type, category
         FROM transactions
         ORDER BY id",
    )?;

    let transactions = stmt
        .query_map([], |row| {
            let transaction_type: String = row.get(4)?;
            Ok(Transaction {
                transaction_id: row.get(0)?,
                account_id: row.get(1)?,
                transaction_date: date_column(row, 2)?,
                amount: row.get(3)?,
                transaction_type: TransactionType::parse(&transaction_type),
                category: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(transactions)
}

pub fn get_all_flows(conn: &Connection) -> Result<Vec<FlowEdge>> {
    let mut stmt = conn.prepare(
        "SELECT from_transaction_id, to_transaction_id FROM transaction_flows ORDER BY id",
    )?;

    let flows = stmt
        .query_map([], |row| Ok(FlowEdge::new(row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(flows)
}

/// Everything needed to run the reports, in import order
pub fn load_dataset(conn: &Connection) -> Result<Dataset> {
    let dataset = Dataset::new(
        get_all_customers(conn)?,
        get_all_accounts(conn)?,
        get_all_transactions(conn)?,
    )
    .with_flows(get_all_flows(conn)?);

    log::debug!(
        "Loaded dataset from SQLite: {} customers, {} accounts, {} transactions",
        dataset.customers.len(),
        dataset.accounts.len(),
        dataset.transactions.len()
    );

    Ok(dataset)
}

pub fn verify_count(conn: &Connection, table: &str) -> Result<i64> {
    // Table names cannot be bound as parameters
    let table = match table {
        "customers" | "accounts" | "transactions" | "transaction_flows" | "report_runs" => table,
        other => anyhow::bail!("Unknown table: {}", other),
    };

    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
        row.get(0)
    })?;

    Ok(count)
}

// ============================================================================
// REPORT RUNS (audit trail)
// ============================================================================

pub fn insert_report_run(conn: &Connection, run: &ReportRun) -> Result<()> {
    conn.execute(
        "INSERT INTO report_runs (run_id, slug, row_count, fingerprint, generated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            run.run_id,
            run.slug,
            run.row_count as i64,
            run.fingerprint,
            run.generated_at.to_rfc3339(),
        ],
    )?;

    Ok(())
}

/// Record a finished report and return the stored run
pub fn record_report_run(conn: &Connection, table: &ReportTable) -> Result<ReportRun> {
    let run = ReportRun::new(table);
    insert_report_run(conn, &run)?;
    log::info!(
        "Recorded run {} of {} ({} rows)",
        run.run_id,
        run.slug,
        run.row_count
    );
    Ok(run)
}

/// Most recent runs first
pub fn get_report_runs(conn: &Connection, limit: usize) -> Result<Vec<ReportRun>> {
    let mut stmt = conn.prepare(
        "SELECT run_id, slug, row_count, fingerprint, generated_at
         FROM report_runs
         ORDER BY id DESC
         LIMIT ?1",
    )?;

    let runs = stmt
        .query_map(params![limit as i64], |row| {
            let row_count: i64 = row.get(2)?;
            let generated_at: String = row.get(4)?;
            let generated_at = DateTime::parse_from_rfc3339(&generated_at)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        4,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;

            Ok(ReportRun {
                run_id: row.get(0)?,
                slug: row.get(1)?,
                row_count: row_count.max(0) as usize,
                fingerprint: row.get(3)?,
                generated_at,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReportSettings;
    use crate::reports::ReportKind;
    use std::fs;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    fn create_test_dataset() -> Dataset {
        Dataset::new(
            vec![
                Customer::new(1, "Ana", "Diaz", "ana@example.com", date(1)),
                Customer::new(2, "Ben", "Okafor", "ben@example.com", date(2)),
            ],
            vec![
                Account::new(10, 1, AccountType::Savings, 500.0),
                Account::new(20, 2, AccountType::Other("Brokerage".to_string()), 75.5),
            ],
            vec![
                // Ids deliberately out of order: import order must survive
                Transaction::new(5, 10, date(3), Some(120.0), TransactionType::Deposit, "Salary"),
                Transaction::new(3, 20, date(3), None, TransactionType::Withdrawal, "Food"),
                Transaction::new(4, 10, date(4), Some(-20.0), TransactionType::Transfer, "Other"),
            ],
        )
        .with_flows(vec![FlowEdge::new(5, 4)])
    }

    fn create_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    #[test]
    fn test_idempotency_import_twice() {
        let conn = create_test_connection();
        let dataset = create_test_dataset();

        let first = import_dataset(&conn, &dataset).unwrap();
        let second = import_dataset(&conn, &dataset).unwrap();

        assert_eq!(first.total(), 8);
        assert_eq!(second, ImportSummary::default());
        assert_eq!(verify_count(&conn, "transactions").unwrap(), 3);
        assert_eq!(verify_count(&conn, "transaction_flows").unwrap(), 1);

        println!("✅ Idempotency test PASSED: 0 duplicates inserted on second import");
    }

    #[test]
    fn test_load_dataset_preserves_import_order_and_values() {
        let conn = create_test_connection();
        let dataset = create_test_dataset();
        import_dataset(&conn, &dataset).unwrap();

        let loaded = load_dataset(&conn).unwrap();

        let ids: Vec<i64> = loaded.transactions.iter().map(|t| t.transaction_id).collect();
        assert_eq!(ids, vec![5, 3, 4]);
        assert_eq!(loaded.transactions, dataset.transactions);
        assert_eq!(loaded.customers, dataset.customers);
        assert_eq!(loaded.accounts, dataset.accounts);
        assert_eq!(loaded.flows, dataset.flows);

        // Null amount round-trips as None
        assert_eq!(loaded.transactions[1].amount, None);
    }

    #[test]
    fn test_verify_count_rejects_unknown_table() {
        let conn = create_test_connection();
        assert!(verify_count(&conn, "customers; DROP TABLE customers").is_err());
        assert_eq!(verify_count(&conn, "customers").unwrap(), 0);
    }

    #[test]
    fn test_load_dataset_from_dir() {
        let dir = tempfile::tempdir().unwrap();

        fs::write(
            dir.path().join(CUSTOMERS_CSV),
            "customer_id,first_name,last_name,email,registration_date\n\
             1,Ana,Diaz,ana@example.com,2025-01-01\n",
        )
        .unwrap();
        fs::write(
            dir.path().join(ACCOUNTS_CSV),
            "account_id,customer_id,account_type,balance\n\
             10,1,savings,500.0\n",
        )
        .unwrap();
        fs::write(
            dir.path().join(TRANSACTIONS_CSV),
            "transaction_id,account_id,transaction_date,amount,transaction_type,category\n\
             1,10,2025-01-02,250.0,Deposit,Salary\n\
             2,10,2025-01-03,,Withdrawal,Food\n",
        )
        .unwrap();

        let dataset = load_dataset_from_dir(dir.path()).unwrap();
        assert_eq!(dataset.customers.len(), 1);
        assert_eq!(dataset.accounts[0].account_type, AccountType::Savings);
        assert_eq!(dataset.transactions[0].amount, Some(250.0));
        assert_eq!(dataset.transactions[1].amount, None);
        assert!(dataset.flows.is_empty());

        fs::write(
            dir.path().join(FLOWS_CSV),
            "from_transaction_id,to_transaction_id\n1,2\n",
        )
        .unwrap();
        let dataset = load_dataset_from_dir(dir.path()).unwrap();
        assert_eq!(dataset.flows, vec![FlowEdge::new(1, 2)]);
    }

    #[test]
    fn test_load_csv_reports_bad_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CUSTOMERS_CSV);
        fs::write(
            &path,
            "customer_id,first_name,last_name,email,registration_date\n\
             1,Ana,Diaz,ana@example.com,not-a-date\n",
        )
        .unwrap();

        let err = load_csv::<Customer>(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
    }

    #[test]
    fn test_report_runs_audit_trail() {
        let dir = tempfile::tempdir().unwrap();
        let conn = Connection::open(dir.path().join("ledger.db")).unwrap();
        setup_database(&conn).unwrap();
        import_dataset(&conn, &create_test_dataset()).unwrap();

        let dataset = load_dataset(&conn).unwrap();
        let table = ReportKind::CustomerPortfolio
            .run(&dataset, &ReportSettings::default())
            .unwrap();

        let first = record_report_run(&conn, &table).unwrap();
        let second = record_report_run(&conn, &table).unwrap();

        let runs = get_report_runs(&conn, 10).unwrap();
        assert_eq!(runs.len(), 2);
        // Newest first
        assert_eq!(runs[0].run_id, second.run_id);
        assert_eq!(runs[1].run_id, first.run_id);
        assert_eq!(runs[0].slug, "customer-portfolio");
        assert_eq!(runs[0].row_count, 2);
        assert_eq!(runs[0].fingerprint, runs[1].fingerprint);

        assert_eq!(get_report_runs(&conn, 1).unwrap().len(), 1);
    }
}
