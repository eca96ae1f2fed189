// 🔗 Relational helpers - NOT IN, EXISTS and correlated filters as set operations
//
// NOT IN      → hash-set membership test (anti join)
// EXISTS      → short-circuiting any-match over the candidate bucket (semi join)
// correlated  → compute the global aggregate ONCE, then compare each group

use crate::aggregate::{Average, Field};
use crate::entities::Record;
use crate::error::AnalyticsResult;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Left rows whose key does not appear among the right rows' keys
pub fn anti_join<'a, L, R, K>(
    left: &'a [L],
    right: &[R],
    left_key: impl Fn(&L) -> K,
    right_key: impl Fn(&R) -> K,
) -> Vec<&'a L>
where
    K: Eq + Hash,
{
    let present: HashSet<K> = right.iter().map(right_key).collect();

    left.iter()
        .filter(|row| !present.contains(&left_key(*row)))
        .collect()
}

/// True as soon as one candidate satisfies `predicate`
///
/// Candidates after the first match are never evaluated; the first error
/// encountered before a match is returned.
pub fn exists<'a, R: 'a>(
    candidates: impl IntoIterator<Item = &'a R>,
    predicate: impl Fn(&R) -> AnalyticsResult<bool>,
) -> AnalyticsResult<bool> {
    for candidate in candidates {
        if predicate(candidate)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Left rows with at least one right row under the same key matching `predicate`
pub fn semi_join<'a, L, R, K>(
    left: &'a [L],
    right: &[R],
    left_key: impl Fn(&L) -> K,
    right_key: impl Fn(&R) -> K,
    predicate: impl Fn(&R) -> AnalyticsResult<bool>,
) -> AnalyticsResult<Vec<&'a L>>
where
    K: Eq + Hash,
{
    let mut buckets: HashMap<K, Vec<&R>> = HashMap::new();
    for row in right {
        buckets.entry(right_key(row)).or_default().push(row);
    }

    let mut matched = Vec::new();
    for row in left {
        let Some(bucket) = buckets.get(&left_key(row)) else {
            continue;
        };
        if exists(bucket.iter().copied(), &predicate)? {
            matched.push(row);
        }
    }

    Ok(matched)
}

/// Mean of a field over every record (NoData for an empty input)
pub fn global_mean<'a, R: Record + 'a>(
    records: impl IntoIterator<Item = &'a R>,
    field: &Field<R>,
) -> AnalyticsResult<Average> {
    let mut sum = 0.0;
    let mut count = 0u64;

    for record in records {
        sum += field.read(record)?;
        count += 1;
    }

    Ok(Average::from_parts(sum, count))
}

/// Rows whose metric is strictly above a precomputed reference value
///
/// Rows whose metric is undefined (None) never qualify.
pub fn above_reference<'a, T>(
    rows: &'a [T],
    reference: f64,
    metric: impl Fn(&T) -> Option<f64>,
) -> Vec<&'a T> {
    rows.iter()
        .filter(|row| metric(*row).map_or(false, |value| value > reference))
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Customer, Transaction, TransactionType};
    use crate::error::AnalyticsError;
    use chrono::NaiveDate;
    use std::cell::Cell;

    fn create_test_customer(id: i64) -> Customer {
        Customer::new(
            id,
            "Test",
            &format!("Customer{}", id),
            "test@example.com",
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        )
    }

    fn create_test_transaction(id: i64, account_id: i64, amount: Option<f64>) -> Transaction {
        Transaction::new(
            id,
            account_id,
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            amount,
            TransactionType::Withdrawal,
            "Travel",
        )
    }

    #[test]
    fn test_anti_join_is_not_in() {
        let customers: Vec<Customer> = (1..=4).map(create_test_customer).collect();
        let active = vec![create_test_transaction(1, 2, Some(1.0)), create_test_transaction(2, 4, Some(1.0))];

        let dormant = anti_join(&customers, &active, |c| c.customer_id, |tx| tx.account_id);
        let ids: Vec<i64> = dormant.iter().map(|c| c.customer_id).collect();

        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_exists_short_circuits() {
        let txs = vec![
            create_test_transaction(1, 1, Some(5000.0)),
            create_test_transaction(2, 1, None),
        ];
        let evaluated = Cell::new(0);

        let found = exists(&txs, |tx| {
            evaluated.set(evaluated.get() + 1);
            Ok(tx.require_amount()?.abs() > 1000.0)
        })
        .unwrap();

        assert!(found);
        // The malformed second record was never touched
        assert_eq!(evaluated.get(), 1);
    }

    #[test]
    fn test_exists_propagates_errors_before_a_match() {
        let txs = vec![create_test_transaction(1, 1, None)];

        let err = exists(&txs, |tx| Ok(tx.require_amount()? > 0.0)).unwrap_err();
        assert_eq!(err, AnalyticsError::missing("transaction #1", "amount"));
    }

    #[test]
    fn test_semi_join_keeps_left_order() {
        let txs = vec![
            create_test_transaction(1, 3, Some(20.0)),
            create_test_transaction(2, 1, Some(2500.0)),
            create_test_transaction(3, 3, Some(1500.0)),
        ];
        let accounts = vec![1_i64, 2, 3];

        let large = semi_join(&accounts, &txs, |a| *a, |tx| tx.account_id, |tx| {
            Ok(tx.require_amount()?.abs() > 1000.0)
        })
        .unwrap();

        assert_eq!(large, vec![&1, &3]);
    }

    #[test]
    fn test_global_mean_and_reference_filter() {
        let txs = vec![
            create_test_transaction(1, 1, Some(10.0)),
            create_test_transaction(2, 1, Some(30.0)),
            create_test_transaction(3, 2, Some(-50.0)),
        ];
        let field = Field::new("amount", |tx: &Transaction| tx.magnitude());

        let mean = global_mean(&txs, &field).unwrap();
        assert_eq!(mean, Average::Value(30.0));

        let per_account = vec![(1, Some(20.0)), (2, Some(50.0)), (3, None)];
        let above = above_reference(&per_account, 30.0, |row| row.1);
        assert_eq!(above, vec![&(2, Some(50.0))]);

        let empty: Vec<Transaction> = Vec::new();
        assert!(global_mean(&empty, &field).unwrap().is_no_data());
    }
}
