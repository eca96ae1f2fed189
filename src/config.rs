//! Runtime configuration from environment variables
//!
//! Every setting has a default, so a bare `ledger-insights` run works
//! against `./ledger.db` and `./data/*.csv`.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Thresholds used by the parameterized reports
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReportSettings {
    /// Accounts need strictly more transactions than this to be "high activity"
    pub high_activity_min_transactions: u64,

    /// A transaction is "large" when its absolute amount exceeds this
    pub large_transaction_threshold: f64,
}

impl Default for ReportSettings {
    fn default() -> Self {
        ReportSettings {
            high_activity_min_transactions: 10,
            large_transaction_threshold: 1000.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InsightsConfig {
    /// Path to SQLite database file
    pub db_path: PathBuf,

    /// Directory holding customers.csv, accounts.csv, transactions.csv
    pub data_dir: PathBuf,

    /// Bind address for the HTTP server
    pub server_addr: String,

    /// Default log filter when RUST_LOG is unset
    pub rust_log: String,

    pub report: ReportSettings,
}

impl InsightsConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `LEDGER_DB_PATH` (default: ledger.db)
    /// - `LEDGER_DATA_DIR` (default: data)
    /// - `LEDGER_SERVER_ADDR` (default: 0.0.0.0:3000)
    /// - `LEDGER_HIGH_ACTIVITY_MIN` (default: 10)
    /// - `LEDGER_LARGE_TX_THRESHOLD` (default: 1000.0)
    /// - `RUST_LOG` (default: info)
    pub fn from_env() -> Self {
        let defaults = ReportSettings::default();

        Self {
            db_path: env::var("LEDGER_DB_PATH")
                .unwrap_or_else(|_| "ledger.db".to_string())
                .into(),

            data_dir: env::var("LEDGER_DATA_DIR")
                .unwrap_or_else(|_| "data".to_string())
                .into(),

            server_addr: env::var("LEDGER_SERVER_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:3000".to_string()),

            rust_log: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),

            report: ReportSettings {
                high_activity_min_transactions: env::var("LEDGER_HIGH_ACTIVITY_MIN")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.high_activity_min_transactions),

                large_transaction_threshold: env::var("LEDGER_LARGE_TX_THRESHOLD")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.large_transaction_threshold),
            },
        }
    }

    /// Initialize env_logger with this config's default filter
    pub fn init_logging(&self) {
        let _ = env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(&self.rust_log),
        )
        .try_init();
    }
}
