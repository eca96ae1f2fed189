// Ledger Insights - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod error;      // Error taxonomy shared by every operation
pub mod entities;   // Customer / Account / Transaction records
pub mod aggregate;  // Aggregator: conditional GROUP BY + HAVING
pub mod window;     // WindowedRanker: running sums and ranks per partition
pub mod relational; // NOT IN / EXISTS / correlated filters
pub mod flow;       // Transaction flow traversal
pub mod dataset;    // Joined rows over the three entity tables
pub mod reports;    // The ten-report catalog
pub mod config;     // Environment configuration + logging
pub mod db;         // CSV source + SQLite persistence

// Re-export commonly used types
pub use error::{AnalyticsError, AnalyticsResult};
pub use entities::{
    category, Account, AccountType, Customer, Record, Transaction, TransactionType,
};
pub use aggregate::{
    Accumulation, AggregateValue, Aggregation, Aggregator, Average, ErrorPolicy, Field,
    GroupRow, Measure,
};
pub use window::{
    input_order, order_by, order_by_f64, SortDirection, WindowMode, WindowRow, WindowValue,
    WindowedRanker,
};
pub use relational::{above_reference, anti_join, exists, global_mean, semi_join};
pub use flow::{FlowEdge, FlowStep, TransactionFlow};
pub use dataset::{AccountRow, Dataset, TransactionRow};
pub use reports::{ReportKind, ReportTable, TabularRow};
pub use config::{InsightsConfig, ReportSettings};
pub use db::{
    get_all_accounts, get_all_customers, get_all_flows, get_all_transactions,
    get_report_runs, import_dataset, insert_accounts, insert_customers, insert_flows,
    insert_report_run, insert_transactions, load_csv, load_dataset, load_dataset_from_dir,
    record_report_run, setup_database, verify_count, ImportSummary, ReportRun,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
