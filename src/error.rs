// 🚨 Analytics Errors - what the aggregation and windowing core can report
//
// The core never retries and never hides a bad record: every error is raised
// where it is detected. Outer surfaces (db, CLI, server) wrap these in anyhow.

use thiserror::Error;

/// Errors raised by the Aggregator, WindowedRanker and the join step
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalyticsError {
    /// A record is missing an attribute a measure needs (null amount),
    /// or carries a non-finite number where a numeric accumulation is requested
    #[error("malformed record {record}: field '{field}' {reason}")]
    MalformedRecord {
        record: String,
        field: String,
        reason: String,
    },

    /// The ordering comparator (or ranking value) is not a total order
    /// over the values of one partition, e.g. NaN amounts
    #[error("invalid ordering in partition {partition}: {detail}")]
    InvalidOrdering { partition: String, detail: String },

    /// A row references an entity that is not present in the dataset
    #[error("dangling reference from {record}: {reference} not found")]
    DanglingReference { record: String, reference: String },

    /// Two partial aggregations with different measure columns were merged
    #[error("cannot merge aggregations with columns [{left}] and [{right}]")]
    IncompatibleMerge { left: String, right: String },
}

impl AnalyticsError {
    pub fn missing(record: impl Into<String>, field: &str) -> Self {
        AnalyticsError::MalformedRecord {
            record: record.into(),
            field: field.to_string(),
            reason: "is missing".to_string(),
        }
    }

    pub fn non_finite(record: impl Into<String>, field: &str, value: f64) -> Self {
        AnalyticsError::MalformedRecord {
            record: record.into(),
            field: field.to_string(),
            reason: format!("is not a finite number ({})", value),
        }
    }

    pub fn is_malformed_record(&self) -> bool {
        matches!(self, AnalyticsError::MalformedRecord { .. })
    }
}

pub type AnalyticsResult<T> = Result<T, AnalyticsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_record_and_field() {
        let err = AnalyticsError::missing("transaction #7", "amount");
        assert!(err.is_malformed_record());
        assert_eq!(
            err.to_string(),
            "malformed record transaction #7: field 'amount' is missing"
        );

        let err = AnalyticsError::InvalidOrdering {
            partition: "Savings".to_string(),
            detail: "balance of account #3 is NaN".to_string(),
        };
        assert!(!err.is_malformed_record());
        assert!(err.to_string().contains("Savings"));
    }
}
