//! Drive distinct count accumulators over a dictionary column.

use std::ops::Range;

use dcount_error::{DcountError, Result};
use rayon::prelude::*;
use tracing::trace;

use crate::accumulator::{DistinctCount, DistinctCountAccumulator};
use crate::dictionary::DictionaryColumn;
use crate::membership::MembershipSet;
use crate::null_handling::NullHandlingSource;

/// Check that all buckets are well formed row ranges within the column.
fn validate_buckets(column: &DictionaryColumn, buckets: &[Range<usize>]) -> Result<()> {
    let num_rows = column.num_rows();
    for (idx, bucket) in buckets.iter().enumerate() {
        if bucket.start > bucket.end {
            return Err(DcountError::new("Bucket range start is after end")
                .with_field("bucket", idx)
                .with_field("start", bucket.start)
                .with_field("end", bucket.end));
        }
        if bucket.end > num_rows {
            return Err(DcountError::new("Bucket range exceeds column rows")
                .with_field("bucket", idx)
                .with_field("end", bucket.end)
                .with_field("num_rows", num_rows));
        }
    }
    Ok(())
}

/// Scan buckets in order, reusing a single accumulator and membership set.
///
/// The accumulator is reset at each bucket boundary and closed once all
/// buckets have been counted, leaving `set` empty.
pub fn scan_buckets<M, N>(
    column: &DictionaryColumn,
    buckets: &[Range<usize>],
    set: &mut M,
    nulls: &N,
) -> Result<Vec<DistinctCount>>
where
    M: MembershipSet,
    N: NullHandlingSource + ?Sized,
{
    validate_buckets(column, buckets)?;

    let selector = column.selector();
    let mut acc = DistinctCountAccumulator::new(&selector, set);
    let mut counts = Vec::with_capacity(buckets.len());

    for bucket in buckets {
        acc.reset();
        for row in bucket.clone() {
            selector.seek(row);
            acc.aggregate();
        }

        let count = acc.count(nulls);
        trace!(start = bucket.start, end = bucket.end, %count, "counted bucket");
        counts.push(count);
    }

    acc.close();

    Ok(counts)
}

/// Scan buckets in parallel.
///
/// Every bucket gets its own selector, accumulator and membership set created
/// by `make_set`. Counts are returned in bucket order.
pub fn scan_buckets_parallel<M, N, F>(
    column: &DictionaryColumn,
    buckets: &[Range<usize>],
    make_set: F,
    nulls: &N,
) -> Result<Vec<DistinctCount>>
where
    M: MembershipSet,
    N: NullHandlingSource + Sync + ?Sized,
    F: Fn() -> M + Sync,
{
    validate_buckets(column, buckets)?;

    let counts = buckets
        .par_iter()
        .map(|bucket| {
            let selector = column.selector();
            let mut set = make_set();
            let mut acc = DistinctCountAccumulator::new(&selector, &mut set);

            for row in bucket.clone() {
                selector.seek(row);
                acc.aggregate();
            }

            let count = acc.count(nulls);
            acc.close();
            count
        })
        .collect();

    Ok(counts)
}

/// Count distinct values per group.
///
/// `group_ids` assigns each row of the column to a group in
/// `0..num_groups`. Each group owns a membership set, an accumulator is bound
/// to the row's group set for every row.
pub fn scan_groups<M, N>(
    column: &DictionaryColumn,
    group_ids: &[usize],
    num_groups: usize,
    nulls: &N,
) -> Result<Vec<DistinctCount>>
where
    M: MembershipSet + Default,
    N: NullHandlingSource + ?Sized,
{
    if group_ids.len() != column.num_rows() {
        return Err(DcountError::new("Group ids do not match column rows")
            .with_field("group_ids", group_ids.len())
            .with_field("num_rows", column.num_rows()));
    }
    if let Some(row) = group_ids.iter().position(|&g| g >= num_groups) {
        return Err(DcountError::new("Group id out of range")
            .with_field("row", row)
            .with_field("group", group_ids[row])
            .with_field("num_groups", num_groups));
    }

    let selector = column.selector();
    let mut sets: Vec<M> = (0..num_groups).map(|_| M::default()).collect();

    for (row, &group) in group_ids.iter().enumerate() {
        selector.seek(row);
        DistinctCountAccumulator::new(&selector, &mut sets[group]).aggregate();
    }

    let counts = sets
        .iter_mut()
        .map(|set| {
            let acc = DistinctCountAccumulator::new(&selector, set);
            let count = acc.count(nulls);
            acc.close();
            count
        })
        .collect();

    Ok(counts)
}
