//! Per-bucket distinct counts over line oriented input.
//!
//! Each input line is `bucket<TAB>values`. `values` is a `|` separated list,
//! empty entries are nulls. A line holding only a bucket label is a row
//! without any values.

use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::ops::Range;

use dcount_core::accumulator::DistinctCount;
use dcount_core::config::AggregationConfig;
use dcount_core::dictionary::{DictionaryColumn, DictionaryColumnBuilder};
use dcount_core::membership::bitmap::BitmapSet;
use dcount_core::membership::{MembershipSet, MembershipSetKind};
use dcount_core::scan::{scan_buckets, scan_buckets_parallel};
use dcount_error::{DcountError, Result, ResultExt};
use roaring::RoaringBitmap;
use tracing::debug;

/// Input rows grouped into contiguous buckets.
#[derive(Debug)]
pub struct BucketedColumn {
    /// Bucket labels in first-seen order.
    pub labels: Vec<String>,
    /// Row range for each bucket.
    pub ranges: Vec<Range<usize>>,
    pub column: DictionaryColumn,
}

/// A single parsed input line.
#[derive(Debug, PartialEq, Eq)]
struct InputRow<'a> {
    bucket: &'a str,
    values: Vec<Option<&'a str>>,
}

fn parse_line(line: &str) -> Option<InputRow<'_>> {
    let (bucket, values) = match line.split_once('\t') {
        Some((bucket, values)) => {
            let values = values
                .split('|')
                .map(|v| if v.is_empty() { None } else { Some(v) })
                .collect();
            (bucket, values)
        }
        None => (line, Vec::new()),
    };

    if bucket.is_empty() {
        return None;
    }

    Some(InputRow { bucket, values })
}

/// Read all input, grouping rows by bucket label.
pub fn read_bucketed_column(reader: impl BufRead) -> Result<BucketedColumn> {
    let lines = reader
        .lines()
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to read input")?;

    let mut labels: Vec<String> = Vec::new();
    let mut bucket_rows: Vec<Vec<InputRow>> = Vec::new();
    let mut bucket_idx: HashMap<&str, usize> = HashMap::new();

    for (line_idx, line) in lines.iter().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }

        let row = parse_line(line).ok_or_else(|| {
            DcountError::new("Empty bucket label").with_field("line", line_idx + 1)
        })?;

        let idx = *bucket_idx.entry(row.bucket).or_insert_with(|| {
            labels.push(row.bucket.to_string());
            bucket_rows.push(Vec::new());
            labels.len() - 1
        });
        bucket_rows[idx].push(row);
    }

    let mut builder = DictionaryColumnBuilder::new();
    let mut ranges = Vec::with_capacity(labels.len());
    for rows in bucket_rows {
        let start = builder.num_rows();
        for row in rows {
            builder.push_row(row.values)?;
        }
        ranges.push(start..builder.num_rows());
    }

    let column = builder.finish();
    debug!(
        buckets = labels.len(),
        rows = column.num_rows(),
        dictionary_size = column.dictionary().len(),
        "read input"
    );

    Ok(BucketedColumn {
        labels,
        ranges,
        column,
    })
}

fn count_with_set<M, F>(
    input: &BucketedColumn,
    conf: &AggregationConfig,
    make_set: F,
) -> Result<Vec<DistinctCount>>
where
    M: MembershipSet,
    F: Fn() -> M + Sync,
{
    if conf.parallel_buckets {
        scan_buckets_parallel(&input.column, &input.ranges, make_set, conf)
    } else {
        let mut set = make_set();
        scan_buckets(&input.column, &input.ranges, &mut set, conf)
    }
}

/// Compute the distinct count for every bucket, in label order.
pub fn count_buckets(
    input: &BucketedColumn,
    conf: &AggregationConfig,
) -> Result<Vec<DistinctCount>> {
    debug!(
        null_handling = %conf.null_handling,
        membership_set = %conf.membership_set,
        parallel = conf.parallel_buckets,
        "counting buckets"
    );

    match conf.membership_set {
        MembershipSetKind::Bitmap => {
            let cardinality = input.column.dictionary().len();
            count_with_set(input, conf, || BitmapSet::with_capacity(cardinality))
        }
        MembershipSetKind::Roaring => count_with_set(input, conf, RoaringBitmap::new),
    }
}

/// Write `bucket<TAB>count` lines.
pub fn write_counts(
    mut writer: impl Write,
    input: &BucketedColumn,
    counts: &[DistinctCount],
) -> Result<()> {
    for (label, count) in input.labels.iter().zip(counts) {
        writeln!(writer, "{label}\t{count}")?;
    }
    writer.flush()?;
    Ok(())
}

/// Write `name<TAB>value<TAB>description` for every setting.
pub fn write_settings(mut writer: impl Write, conf: &AggregationConfig) -> Result<()> {
    for (name, description) in AggregationConfig::settings() {
        let value = conf.get_as_string(name)?;
        writeln!(writer, "{name}\t{value}\t{description}")?;
    }
    writer.flush()?;
    Ok(())
}

/// Apply a `NAME=VALUE` setting to the config.
pub fn apply_setting(conf: &mut AggregationConfig, setting: &str) -> Result<()> {
    let (name, value) = setting.split_once('=').ok_or_else(|| {
        DcountError::new("Expected setting as NAME=VALUE").with_field("setting", setting)
    })?;
    conf.set_from_str(name.trim(), value.trim())
}
