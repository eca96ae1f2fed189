// 🪟 WindowedRanker - running totals and competition ranks per partition
//
// Equivalent of SUM(...) OVER (PARTITION BY p ORDER BY o) and
// RANK() OVER (PARTITION BY p ORDER BY v DESC), done as:
//   1. explicit grouping by partition key
//   2. a STABLE sort per partition
//   3. one sequential pass to accumulate or rank
//
// Ties keep their input order, so running values over equal dates are
// reproducible. Ranks follow competition ranking: [100, 100, 90] → [1, 1, 3].

use crate::aggregate::Field;
use crate::entities::Record;
use crate::error::{AnalyticsError, AnalyticsResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::Debug;

// ============================================================================
// MODE + ORDERING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

pub enum WindowMode<R> {
    /// Running sum of the value in sort order
    RunningSum(Field<R>),

    /// Competition rank by the value (ties share a rank, then skip)
    Rank {
        value: Field<R>,
        direction: SortDirection,
    },
}

/// Partial comparator: None means the two records are not comparable
pub type Comparator<R> = Box<dyn Fn(&R, &R) -> Option<Ordering>>;

/// Order by a totally ordered key
pub fn order_by<R, T: Ord>(key: impl Fn(&R) -> T + 'static) -> impl Fn(&R, &R) -> Option<Ordering> {
    move |a, b| Some(key(a).cmp(&key(b)))
}

/// Order by a float key; NaN makes the pair incomparable
pub fn order_by_f64<R>(key: impl Fn(&R) -> f64 + 'static) -> impl Fn(&R, &R) -> Option<Ordering> {
    move |a, b| key(a).partial_cmp(&key(b))
}

/// Keep input order
pub fn input_order<R>() -> impl Fn(&R, &R) -> Option<Ordering> {
    |_, _| Some(Ordering::Equal)
}

// ============================================================================
// OUTPUT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WindowValue {
    RunningSum(f64),
    Rank(u64),
}

impl WindowValue {
    pub fn running_sum(&self) -> Option<f64> {
        match self {
            WindowValue::RunningSum(v) => Some(*v),
            WindowValue::Rank(_) => None,
        }
    }

    pub fn rank(&self) -> Option<u64> {
        match self {
            WindowValue::Rank(r) => Some(*r),
            WindowValue::RunningSum(_) => None,
        }
    }
}

/// One input record with its derived window value
#[derive(Debug, Clone, PartialEq)]
pub struct WindowRow<'a, R, P> {
    pub partition: P,
    pub record: &'a R,
    /// Position of the record in the input slice
    pub input_index: usize,
    pub value: WindowValue,
}

// ============================================================================
// WINDOWED RANKER
// ============================================================================

pub struct WindowedRanker<R, P> {
    partition: Box<dyn Fn(&R) -> P>,
    ordering: Comparator<R>,
    mode: WindowMode<R>,
}

impl<R: Record, P: Ord + Clone + Debug> WindowedRanker<R, P> {
    pub fn new(
        partition: impl Fn(&R) -> P + 'static,
        ordering: impl Fn(&R, &R) -> Option<Ordering> + 'static,
        mode: WindowMode<R>,
    ) -> Self {
        WindowedRanker {
            partition: Box::new(partition),
            ordering: Box::new(ordering),
            mode,
        }
    }

    pub fn running_sum(
        partition: impl Fn(&R) -> P + 'static,
        ordering: impl Fn(&R, &R) -> Option<Ordering> + 'static,
        value: Field<R>,
    ) -> Self {
        Self::new(partition, ordering, WindowMode::RunningSum(value))
    }

    /// Rank by `value`; `ordering` only breaks ties for emission order
    pub fn rank(
        partition: impl Fn(&R) -> P + 'static,
        ordering: impl Fn(&R, &R) -> Option<Ordering> + 'static,
        value: Field<R>,
        direction: SortDirection,
    ) -> Self {
        Self::new(partition, ordering, WindowMode::Rank { value, direction })
    }

    /// Compute the window over `records`
    ///
    /// Output order: partition key ascending, then within-partition order.
    pub fn apply<'a>(&self, records: &'a [R]) -> AnalyticsResult<Vec<WindowRow<'a, R, P>>> {
        let mut partitions: BTreeMap<P, Vec<usize>> = BTreeMap::new();
        for (i, record) in records.iter().enumerate() {
            partitions.entry((self.partition)(record)).or_default().push(i);
        }

        let mut output = Vec::with_capacity(records.len());
        let mut values = vec![0.0; records.len()];

        for (key, mut indices) in partitions {
            let label = format!("{:?}", key);

            match &self.mode {
                WindowMode::RunningSum(value) => {
                    // Read values first so a malformed record fails before sorting
                    for &i in &indices {
                        values[i] = value.read(&records[i])?;
                    }

                    stable_sort(&mut indices, records, &label, |a, b| {
                        (self.ordering)(&records[a], &records[b])
                    })?;

                    let mut running = 0.0;
                    for i in indices {
                        running += values[i];
                        output.push(WindowRow {
                            partition: key.clone(),
                            record: &records[i],
                            input_index: i,
                            value: WindowValue::RunningSum(running),
                        });
                    }
                }

                WindowMode::Rank { value, direction } => {
                    for &i in &indices {
                        values[i] = rank_value(value, &records[i], &label)?;
                    }

                    stable_sort(&mut indices, records, &label, |a, b| {
                        let primary = values[a].partial_cmp(&values[b])?;
                        let primary = match direction {
                            SortDirection::Ascending => primary,
                            SortDirection::Descending => primary.reverse(),
                        };
                        if primary != Ordering::Equal {
                            return Some(primary);
                        }
                        (self.ordering)(&records[a], &records[b])
                    })?;

                    let mut previous: Option<(f64, u64)> = None;
                    for (position, i) in indices.into_iter().enumerate() {
                        let rank = match previous {
                            Some((prev_value, prev_rank)) if prev_value == values[i] => prev_rank,
                            _ => position as u64 + 1,
                        };
                        previous = Some((values[i], rank));

                        output.push(WindowRow {
                            partition: key.clone(),
                            record: &records[i],
                            input_index: i,
                            value: WindowValue::Rank(rank),
                        });
                    }
                }
            }
        }

        log::debug!("Window computed over {} records", output.len());
        Ok(output)
    }
}

/// Ranking values must be present and comparable (infinities are fine)
fn rank_value<R: Record>(value: &Field<R>, record: &R, partition: &str) -> AnalyticsResult<f64> {
    match value.raw(record) {
        Some(v) if v.is_nan() => Err(AnalyticsError::InvalidOrdering {
            partition: partition.to_string(),
            detail: format!("{} of {} is NaN", value.name(), record.describe()),
        }),
        Some(v) => Ok(v),
        None => Err(AnalyticsError::missing(record.describe(), value.name())),
    }
}

/// Stable sort of record indices; an incomparable pair is an InvalidOrdering
///
/// Every record must compare with itself before any sorting happens, then a
/// bottom-up merge sort stops at the first pair the comparator rejects.
fn stable_sort<R: Record>(
    indices: &mut [usize],
    records: &[R],
    partition: &str,
    compare: impl Fn(usize, usize) -> Option<Ordering>,
) -> AnalyticsResult<()> {
    let incomparable = |a: usize, b: usize| AnalyticsError::InvalidOrdering {
        partition: partition.to_string(),
        detail: format!(
            "{} and {} are not comparable",
            records[a].describe(),
            records[b].describe()
        ),
    };

    for &i in indices.iter() {
        if compare(i, i).is_none() {
            return Err(incomparable(i, i));
        }
    }

    let n = indices.len();
    let mut merged = indices.to_vec();
    let mut width = 1;

    while width < n {
        let mut start = 0;
        while start < n {
            let mid = (start + width).min(n);
            let end = (start + 2 * width).min(n);
            let (mut left, mut right, mut out) = (start, mid, start);

            while left < mid && right < end {
                let ordering = compare(indices[right], indices[left])
                    .ok_or_else(|| incomparable(indices[left], indices[right]))?;
                // Left wins ties
                if ordering == Ordering::Less {
                    merged[out] = indices[right];
                    right += 1;
                } else {
                    merged[out] = indices[left];
                    left += 1;
                }
                out += 1;
            }

            merged[out..out + (mid - left)].copy_from_slice(&indices[left..mid]);
            out += mid - left;
            merged[out..out + (end - right)].copy_from_slice(&indices[right..end]);

            start = end;
        }

        indices.copy_from_slice(&merged);
        width *= 2;
    }

    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
