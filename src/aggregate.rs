// 🧮 Aggregator - conditional GROUP BY in one pass
//
// Groups records by a key and computes, per group, a list of measures.
// Each measure is an accumulation (sum / count / average) restricted to the
// records matching its predicate, which is how the pivot reports turn
// CASE WHEN ... THEN amount ELSE 0 END into columns.
//
// Guarantees:
// - Groups come out in first-occurrence order of their key
// - Zero matching records → sum 0, count 0, average NoData (never 0.0)
// - HAVING runs after every record has been accumulated
// - A malformed record aborts the run (FailFast) or is routed to
//   `Aggregation::rejected` as a whole (Route); it is never half-counted

use crate::entities::Record;
use crate::error::{AnalyticsError, AnalyticsResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

// ============================================================================
// FIELD (numeric attribute reader)
// ============================================================================

/// A named numeric attribute of a record
///
/// The name is what a MalformedRecord error reports when the value is
/// missing or not finite.
pub struct Field<R> {
    name: &'static str,
    get: Box<dyn Fn(&R) -> Option<f64>>,
}

impl<R> Field<R> {
    pub fn new(name: &'static str, get: impl Fn(&R) -> Option<f64> + 'static) -> Self {
        Field {
            name,
            get: Box::new(get),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Unchecked value, for callers with their own validity rules
    pub(crate) fn raw(&self, record: &R) -> Option<f64> {
        (self.get)(record)
    }
}

impl<R: Record> Field<R> {
    /// Read the value, rejecting null and non-finite numbers
    pub fn read(&self, record: &R) -> AnalyticsResult<f64> {
        match (self.get)(record) {
            Some(value) if value.is_finite() => Ok(value),
            Some(value) => Err(AnalyticsError::non_finite(record.describe(), self.name, value)),
            None => Err(AnalyticsError::missing(record.describe(), self.name)),
        }
    }
}

// ============================================================================
// MEASURES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Accumulation {
    Sum,
    Count,
    Average,
}

/// One output column: an accumulation over the records matching a predicate
pub struct Measure<R> {
    name: String,
    kind: Accumulation,
    field: Option<Field<R>>,
    predicate: Box<dyn Fn(&R) -> bool>,
}

impl<R: Record> Measure<R> {
    pub fn sum(name: &str, field: Field<R>) -> Self {
        Self::build(name, Accumulation::Sum, Some(field))
    }

    pub fn count(name: &str) -> Self {
        Self::build(name, Accumulation::Count, None)
    }

    pub fn average(name: &str, field: Field<R>) -> Self {
        Self::build(name, Accumulation::Average, Some(field))
    }

    fn build(name: &str, kind: Accumulation, field: Option<Field<R>>) -> Self {
        Measure {
            name: name.to_string(),
            kind,
            field,
            predicate: Box::new(|_| true),
        }
    }

    /// Restrict this measure to records matching `predicate`
    pub fn when(mut self, predicate: impl Fn(&R) -> bool + 'static) -> Self {
        self.predicate = Box::new(predicate);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> Accumulation {
        self.kind
    }

    /// None when the predicate rejects the record
    fn contribution(&self, record: &R) -> AnalyticsResult<Option<f64>> {
        if !(self.predicate)(record) {
            return Ok(None);
        }

        match &self.field {
            Some(field) => field.read(record).map(Some),
            None => Ok(Some(0.0)),
        }
    }
}

// ============================================================================
// VALUES
// ============================================================================

/// Result of a predicate-scoped average
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Average {
    Value(f64),
    /// No record matched the predicate; the average is undefined
    NoData,
}

impl Average {
    pub fn from_parts(sum: f64, count: u64) -> Self {
        if count == 0 {
            Average::NoData
        } else {
            Average::Value(sum / count as f64)
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Average::Value(v) => Some(*v),
            Average::NoData => None,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, Average::NoData)
    }
}

impl fmt::Display for Average {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Average::Value(v) => write!(f, "{:.2}", v),
            Average::NoData => f.write_str("no data"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AggregateValue {
    Sum(f64),
    Count(u64),
    Average(Average),
}

impl AggregateValue {
    /// Numeric view; None only for an average with no data
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AggregateValue::Sum(v) => Some(*v),
            AggregateValue::Count(c) => Some(*c as f64),
            AggregateValue::Average(avg) => avg.value(),
        }
    }
}

impl fmt::Display for AggregateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateValue::Sum(v) => write!(f, "{:.2}", v),
            AggregateValue::Count(c) => write!(f, "{}", c),
            AggregateValue::Average(avg) => fmt::Display::fmt(avg, f),
        }
    }
}

/// Running state of one measure in one group
#[derive(Debug, Clone, Copy, PartialEq)]
struct Cell {
    kind: Accumulation,
    sum: f64,
    count: u64,
}

impl Cell {
    fn new(kind: Accumulation) -> Self {
        Cell { kind, sum: 0.0, count: 0 }
    }

    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn merge(&mut self, other: &Cell) {
        self.sum += other.sum;
        self.count += other.count;
    }

    fn value(&self) -> AggregateValue {
        match self.kind {
            Accumulation::Sum => AggregateValue::Sum(self.sum),
            Accumulation::Count => AggregateValue::Count(self.count),
            Accumulation::Average => AggregateValue::Average(Average::from_parts(self.sum, self.count)),
        }
    }
}

// ============================================================================
// GROUP ROW + AGGREGATION
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct GroupRow<K> {
    pub key: K,
    columns: Arc<[String]>,
    cells: Vec<Cell>,
}

impl<K> GroupRow<K> {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn get(&self, name: &str) -> Option<AggregateValue> {
        let index = self.columns.iter().position(|c| c == name)?;
        self.value(index)
    }

    pub fn value(&self, index: usize) -> Option<AggregateValue> {
        self.cells.get(index).map(Cell::value)
    }

    pub fn values(&self) -> Vec<AggregateValue> {
        self.cells.iter().map(Cell::value).collect()
    }

    pub fn sum(&self, name: &str) -> Option<f64> {
        match self.get(name)? {
            AggregateValue::Sum(v) => Some(v),
            _ => None,
        }
    }

    pub fn count(&self, name: &str) -> Option<u64> {
        match self.get(name)? {
            AggregateValue::Count(c) => Some(c),
            _ => None,
        }
    }

    pub fn average(&self, name: &str) -> Option<Average> {
        match self.get(name)? {
            AggregateValue::Average(avg) => Some(avg),
            _ => None,
        }
    }

    fn merge(&mut self, other: &GroupRow<K>) {
        for (mine, theirs) in self.cells.iter_mut().zip(&other.cells) {
            mine.merge(theirs);
        }
    }
}

/// Output of an Aggregator run
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation<K> {
    columns: Arc<[String]>,
    rows: Vec<GroupRow<K>>,
    rejected: Vec<AnalyticsError>,
}

impl<K: Eq + Hash + Clone> Aggregation<K> {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[GroupRow<K>] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<GroupRow<K>> {
        self.rows
    }

    /// Records excluded under `ErrorPolicy::Route`
    pub fn rejected(&self) -> &[AnalyticsError] {
        &self.rejected
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, key: &K) -> Option<&GroupRow<K>> {
        self.rows.iter().find(|row| &row.key == key)
    }

    pub fn keys(&self) -> Vec<K> {
        self.rows.iter().map(|row| row.key.clone()).collect()
    }

    /// Sum of a measure's numeric values over every group
    pub fn column_total(&self, name: &str) -> f64 {
        self.rows
            .iter()
            .filter_map(|row| row.get(name).and_then(|v| v.as_f64()))
            .sum()
    }

    /// Combine two partial aggregations built by the same Aggregator
    ///
    /// Sums and counts are associative, so aggregating disjoint chunks and
    /// merging gives the same groups as one pass over the concatenation
    /// (first-occurrence order follows `self`, then `other`). Aggregations
    /// with different measure columns are rejected with IncompatibleMerge.
    pub fn merge(self, other: Aggregation<K>) -> AnalyticsResult<Aggregation<K>> {
        if self.columns != other.columns {
            return Err(AnalyticsError::IncompatibleMerge {
                left: self.columns.join(", "),
                right: other.columns.join(", "),
            });
        }

        let mut rejected = self.rejected;
        rejected.extend(other.rejected);

        Ok(Aggregation {
            rows: fold_rows(self.rows.into_iter().chain(other.rows)),
            columns: self.columns,
            rejected,
        })
    }

    /// Regroup by the same key; a no-op on keys that are already unique
    pub fn regroup(self) -> Aggregation<K> {
        Aggregation {
            rows: fold_rows(self.rows.into_iter()),
            columns: self.columns,
            rejected: self.rejected,
        }
    }
}

fn fold_rows<K: Eq + Hash + Clone>(rows: impl Iterator<Item = GroupRow<K>>) -> Vec<GroupRow<K>> {
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut folded: Vec<GroupRow<K>> = Vec::new();

    for row in rows {
        match index.get(&row.key) {
            Some(&i) => folded[i].merge(&row),
            None => {
                index.insert(row.key.clone(), folded.len());
                folded.push(row);
            }
        }
    }

    folded
}

// ============================================================================
// AGGREGATOR
// ============================================================================

/// What to do with a record a measure cannot read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Abort the whole computation on the first malformed record
    #[default]
    FailFast,
    /// Exclude the record from every measure and collect the error
    Route,
}

pub struct Aggregator<R, K> {
    key: Box<dyn Fn(&R) -> K>,
    measures: Vec<Measure<R>>,
    having: Option<Box<dyn Fn(&GroupRow<K>) -> bool>>,
    policy: ErrorPolicy,
}

impl<R: Record, K: Eq + Hash + Clone> Aggregator<R, K> {
    pub fn new(key: impl Fn(&R) -> K + 'static) -> Self {
        Aggregator {
            key: Box::new(key),
            measures: Vec::new(),
            having: None,
            policy: ErrorPolicy::default(),
        }
    }

    pub fn measure(mut self, measure: Measure<R>) -> Self {
        self.measures.push(measure);
        self
    }

    /// Post-grouping filter, evaluated on fully accumulated rows
    pub fn having(mut self, predicate: impl Fn(&GroupRow<K>) -> bool + 'static) -> Self {
        self.having = Some(Box::new(predicate));
        self
    }

    pub fn on_error(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn columns(&self) -> Arc<[String]> {
        self.measures.iter().map(|m| m.name.clone()).collect()
    }

    /// Group and accumulate without applying HAVING
    ///
    /// Use this for partial results that will be merged before `finish`.
    pub fn accumulate<'a, I>(&self, records: I) -> AnalyticsResult<Aggregation<K>>
    where
        I: IntoIterator<Item = &'a R>,
        R: 'a,
    {
        let columns = self.columns();
        let mut index: HashMap<K, usize> = HashMap::new();
        let mut rows: Vec<GroupRow<K>> = Vec::new();
        let mut rejected = Vec::new();

        'records: for record in records {
            // Evaluate every measure before touching any cell
            let mut contributions = Vec::with_capacity(self.measures.len());
            for measure in &self.measures {
                match measure.contribution(record) {
                    Ok(c) => contributions.push(c),
                    Err(err) => match self.policy {
                        ErrorPolicy::FailFast => return Err(err),
                        ErrorPolicy::Route => {
                            log::warn!("Routing malformed record: {}", err);
                            rejected.push(err);
                            continue 'records;
                        }
                    },
                }
            }

            let key = (self.key)(record);
            let i = match index.get(&key) {
                Some(&i) => i,
                None => {
                    index.insert(key.clone(), rows.len());
                    rows.push(GroupRow {
                        key,
                        columns: columns.clone(),
                        cells: self.measures.iter().map(|m| Cell::new(m.kind)).collect(),
                    });
                    rows.len() - 1
                }
            };

            for (cell, contribution) in rows[i].cells.iter_mut().zip(contributions) {
                if let Some(value) = contribution {
                    cell.add(value);
                }
            }
        }

        log::debug!(
            "Aggregated into {} groups ({} rejected records)",
            rows.len(),
            rejected.len()
        );

        Ok(Aggregation {
            columns,
            rows,
            rejected,
        })
    }

    /// Apply HAVING to a (possibly merged) aggregation
    pub fn finish(&self, mut aggregation: Aggregation<K>) -> Aggregation<K> {
        if let Some(having) = &self.having {
            aggregation.rows.retain(|row| having(row));
        }
        aggregation
    }

    /// accumulate + finish
    pub fn aggregate<'a, I>(&self, records: I) -> AnalyticsResult<Aggregation<K>>
    where
        I: IntoIterator<Item = &'a R>,
        R: 'a,
    {
        let aggregation = self.accumulate(records)?;
        Ok(self.finish(aggregation))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Transaction, TransactionType};
    use chrono::NaiveDate;

    fn create_test_transaction(
        id: i64,
        account_id: i64,
        amount: Option<f64>,
        tx_type: TransactionType,
    ) -> Transaction {
        Transaction::new(
            id,
            account_id,
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap() + chrono::Duration::days(id),
            amount,
            tx_type,
            "Food",
        )
    }

    fn amount() -> Field<Transaction> {
        Field::new("amount", |tx: &Transaction| tx.amount)
    }

    fn net_change() -> Field<Transaction> {
        Field::new("amount", |tx: &Transaction| tx.net_change())
    }

    fn sample() -> Vec<Transaction> {
        vec![
            create_test_transaction(1, 10, Some(500.0), TransactionType::Deposit),
            create_test_transaction(2, 20, Some(75.0), TransactionType::Withdrawal),
            create_test_transaction(3, 10, Some(120.0), TransactionType::Withdrawal),
            create_test_transaction(4, 30, Some(40.0), TransactionType::Transfer),
            create_test_transaction(5, 20, Some(300.0), TransactionType::Deposit),
            create_test_transaction(6, 10, Some(60.0), TransactionType::Deposit),
        ]
    }

    fn activity_aggregator() -> Aggregator<Transaction, i64> {
        Aggregator::new(|tx: &Transaction| tx.account_id)
            .measure(Measure::sum("deposits", amount()).when(|tx: &Transaction| tx.is_deposit()))
            .measure(Measure::sum("withdrawals", amount()).when(|tx: &Transaction| tx.is_withdrawal()))
            .measure(Measure::sum("net_change", net_change()))
            .measure(Measure::count("transactions"))
            .measure(Measure::average("avg_deposit", amount()).when(|tx: &Transaction| tx.is_deposit()))
    }

    #[test]
    fn test_groups_in_first_occurrence_order() {
        let result = activity_aggregator().aggregate(&sample()).unwrap();

        assert_eq!(result.keys(), vec![10, 20, 30]);
        assert_eq!(result.columns().len(), 5);
    }

    #[test]
    fn test_conditional_sums_counts_and_averages() {
        let result = activity_aggregator().aggregate(&sample()).unwrap();

        let account_10 = result.get(&10).unwrap();
        assert_eq!(account_10.sum("deposits"), Some(560.0));
        assert_eq!(account_10.sum("withdrawals"), Some(120.0));
        assert_eq!(account_10.sum("net_change"), Some(440.0));
        assert_eq!(account_10.count("transactions"), Some(3));
        assert_eq!(account_10.average("avg_deposit"), Some(Average::Value(280.0)));

        println!("✅ account 10: {:?}", account_10.values());
    }

    #[test]
    fn test_no_matching_records_yield_zero_and_no_data() {
        let result = activity_aggregator().aggregate(&sample()).unwrap();

        // Account 30 only has a transfer
        let account_30 = result.get(&30).unwrap();
        assert_eq!(account_30.sum("deposits"), Some(0.0));
        assert_eq!(account_30.count("transactions"), Some(1));

        let avg = account_30.average("avg_deposit").unwrap();
        assert!(avg.is_no_data());
        assert_ne!(avg, Average::Value(0.0));
        assert_eq!(avg.value(), None);
        assert_eq!(account_30.get("avg_deposit").unwrap().as_f64(), None);
        assert_eq!(avg.to_string(), "no data");
    }

    #[test]
    fn test_computed_zero_average_is_not_no_data() {
        let txs = vec![create_test_transaction(1, 1, Some(0.0), TransactionType::Deposit)];
        let result = activity_aggregator().aggregate(&txs).unwrap();

        let avg = result.get(&1).unwrap().average("avg_deposit").unwrap();
        assert_eq!(avg, Average::Value(0.0));
        assert!(!avg.is_no_data());
    }

    #[test]
    fn test_net_change_is_conserved_across_groups() {
        let txs = sample();
        let result = activity_aggregator().aggregate(&txs).unwrap();

        let direct: f64 = txs.iter().filter_map(|tx| tx.net_change()).sum();
        let grouped = result.column_total("net_change");

        assert!((direct - grouped).abs() < 1e-9);
    }

    #[test]
    fn test_regroup_is_idempotent() {
        let result = activity_aggregator().aggregate(&sample()).unwrap();
        let regrouped = result.clone().regroup();

        assert_eq!(regrouped, result);
    }

    #[test]
    fn test_merge_of_chunks_matches_single_pass() {
        let txs = sample();
        let aggregator = activity_aggregator();

        let whole = aggregator.aggregate(&txs).unwrap();
        let left = aggregator.accumulate(&txs[..3]).unwrap();
        let right = aggregator.accumulate(&txs[3..]).unwrap();
        let merged = aggregator.finish(left.merge(right).unwrap());

        assert_eq!(merged.keys(), whole.keys());
        for row in whole.rows() {
            assert_eq!(merged.get(&row.key).unwrap().values(), row.values());
        }
    }

    #[test]
    fn test_merge_with_different_columns_is_rejected() {
        let txs = sample();
        let left = activity_aggregator().accumulate(&txs[..3]).unwrap();
        let right = Aggregator::new(|tx: &Transaction| tx.account_id)
            .measure(Measure::count("transactions"))
            .accumulate(&txs[3..])
            .unwrap();

        let err = left.merge(right).unwrap_err();
        assert!(matches!(err, AnalyticsError::IncompatibleMerge { .. }));
        assert!(err.to_string().contains("[transactions]"));
    }

    #[test]
    fn test_having_filters_after_accumulation() {
        let mut txs = Vec::new();
        let mut id = 0;
        for (account, count) in [(1, 11), (2, 9), (3, 15)] {
            for _ in 0..count {
                id += 1;
                txs.push(create_test_transaction(id, account, Some(10.0), TransactionType::Deposit));
            }
        }

        let result = Aggregator::new(|tx: &Transaction| tx.account_id)
            .measure(Measure::count("transactions"))
            .having(|row| row.count("transactions").unwrap_or(0) > 10)
            .aggregate(&txs)
            .unwrap();

        assert_eq!(result.keys(), vec![1, 3]);
    }

    #[test]
    fn test_fail_fast_on_missing_amount() {
        let mut txs = sample();
        txs.push(create_test_transaction(7, 10, None, TransactionType::Deposit));

        let err = activity_aggregator().aggregate(&txs).unwrap_err();
        assert_eq!(err, AnalyticsError::missing("transaction #7", "amount"));
    }

    #[test]
    fn test_count_only_measures_ignore_missing_amount() {
        let txs = vec![create_test_transaction(1, 1, None, TransactionType::Deposit)];

        let result = Aggregator::new(|tx: &Transaction| tx.account_id)
            .measure(Measure::count("transactions"))
            .aggregate(&txs)
            .unwrap();

        assert_eq!(result.get(&1).unwrap().count("transactions"), Some(1));
    }

    #[test]
    fn test_route_policy_excludes_whole_record() {
        let mut txs = sample();
        txs.push(create_test_transaction(7, 10, None, TransactionType::Deposit));
        txs.push(create_test_transaction(8, 40, Some(f64::INFINITY), TransactionType::Deposit));

        let result = activity_aggregator()
            .on_error(ErrorPolicy::Route)
            .aggregate(&txs)
            .unwrap();

        assert_eq!(result.rejected().len(), 2);
        assert!(result.rejected().iter().all(|e| e.is_malformed_record()));

        // Record 7 did not bump the count of account 10, record 8 created no group
        assert_eq!(result.get(&10).unwrap().count("transactions"), Some(3));
        assert!(result.get(&40).is_none());
    }

    #[test]
    fn test_composite_key() {
        let txs = sample();
        let result = Aggregator::new(|tx: &Transaction| (tx.account_id, tx.transaction_type.clone()))
            .measure(Measure::sum("total", amount()))
            .aggregate(&txs)
            .unwrap();

        assert_eq!(result.len(), 5);
        let key = (10, TransactionType::Deposit);
        assert_eq!(result.get(&key).unwrap().sum("total"), Some(560.0));
    }
}
