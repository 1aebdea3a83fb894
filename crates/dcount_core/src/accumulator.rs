use std::fmt;

use crate::membership::MembershipSet;
use crate::null_handling::{NullHandling, NullHandlingSource};
use crate::selector::RowValueSource;

/// An exact distinct count.
///
/// Bounded by the dictionary size, so always representable as an `i32`.
/// Conversions to the other numeric forms are representation only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DistinctCount(u32);

impl DistinctCount {
    pub const ZERO: DistinctCount = DistinctCount(0);

    pub fn new(count: usize) -> Self {
        debug_assert!(count <= i32::MAX as usize, "distinct count overflow: {count}");
        DistinctCount(count as u32)
    }

    pub const fn as_i32(self) -> i32 {
        self.0 as i32
    }

    pub const fn as_i64(self) -> i64 {
        self.0 as i64
    }

    /// Exact for counts up to 2^24.
    pub const fn as_f32(self) -> f32 {
        self.0 as f32
    }

    pub const fn as_f64(self) -> f64 {
        self.0 as f64
    }
}

impl fmt::Display for DistinctCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Counts distinct dictionary ids for a single aggregation bucket.
///
/// Holds a shared reference to the row source (the scan advances it) and an
/// exclusive borrow of an externally owned membership set for the duration of
/// the bucket. There's no internal synchronization, a single scan thread
/// drives and reads it.
#[derive(Debug)]
pub struct DistinctCountAccumulator<'a, S, M> {
    source: &'a S,
    set: &'a mut M,
}

impl<'a, S, M> DistinctCountAccumulator<'a, S, M>
where
    S: RowValueSource,
    M: MembershipSet,
{
    /// Bind an accumulator to a row source and membership set.
    ///
    /// The set is used as is, callers reusing a set across buckets should
    /// `reset` first.
    pub fn new(source: &'a S, set: &'a mut M) -> Self {
        DistinctCountAccumulator { source, set }
    }

    /// Fold the ids of the current row into the set.
    #[inline]
    pub fn aggregate(&mut self) {
        let row = self.source.current_row();

        if cfg!(debug_assertions) {
            if let Some(cardinality) = self.source.value_cardinality() {
                for &id in row {
                    debug_assert!(
                        (id as usize) < cardinality,
                        "dictionary id {id} out of range for cardinality {cardinality}"
                    );
                }
            }
        }

        for &id in row {
            self.set.add(id);
        }
    }

    /// Clear the set so the accumulator can be reused for a new bucket.
    pub fn reset(&mut self) {
        self.set.clear();
    }

    /// Derive the distinct count using the mode read from `nulls` at call
    /// time.
    pub fn count<N>(&self, nulls: &N) -> DistinctCount
    where
        N: NullHandlingSource + ?Sized,
    {
        match nulls.current_mode() {
            NullHandling::DefaultValue => DistinctCount::new(self.set.len()),
            NullHandling::ExplicitNull => {
                let non_null = self
                    .set
                    .iter()
                    .filter(|&id| self.source.lookup_name(id).is_some())
                    .count();
                DistinctCount::new(non_null)
            }
        }
    }

    pub fn value_i32<N: NullHandlingSource + ?Sized>(&self, nulls: &N) -> i32 {
        self.count(nulls).as_i32()
    }

    pub fn value_i64<N: NullHandlingSource + ?Sized>(&self, nulls: &N) -> i64 {
        self.count(nulls).as_i64()
    }

    pub fn value_f32<N: NullHandlingSource + ?Sized>(&self, nulls: &N) -> f32 {
        self.count(nulls).as_f32()
    }

    pub fn value_f64<N: NullHandlingSource + ?Sized>(&self, nulls: &N) -> f64 {
        self.count(nulls).as_f64()
    }

    /// Clear the set and release the accumulator.
    ///
    /// The set itself stays allocated, it's owned by the caller.
    pub fn close(self) {
        self.set.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::BTreeSet;

    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use roaring::RoaringBitmap;

    use super::*;
    use crate::membership::bitmap::BitmapSet;
    use crate::null_handling::AtomicNullHandling;
    use crate::selector::DictionaryId;

    /// Row source stub with fixed rows and a movable cursor.
    struct TestSource {
        dictionary: Vec<Option<&'static str>>,
        rows: Vec<Vec<DictionaryId>>,
        pos: Cell<usize>,
    }

    impl TestSource {
        fn new(dictionary: Vec<Option<&'static str>>, rows: Vec<Vec<DictionaryId>>) -> Self {
            TestSource {
                dictionary,
                rows,
                pos: Cell::new(0),
            }
        }

        fn goto(&self, row: usize) {
            self.pos.set(row);
        }
    }

    impl RowValueSource for TestSource {
        fn current_row(&self) -> &[DictionaryId] {
            &self.rows[self.pos.get()]
        }

        fn lookup_name(&self, id: DictionaryId) -> Option<&str> {
            self.dictionary[id as usize]
        }
    }

    /// Aggregate every row of the source, in order.
    fn aggregate_all<M: MembershipSet>(
        acc: &mut DistinctCountAccumulator<TestSource, M>,
        source: &TestSource,
    ) {
        for row in 0..source.rows.len() {
            source.goto(row);
            acc.aggregate();
        }
    }

    fn abc_null_source() -> TestSource {
        TestSource::new(
            vec![Some("a"), Some("b"), None],
            vec![vec![0], vec![1], vec![0, 2], vec![2]],
        )
    }

    #[test]
    fn null_entry_counted_by_mode() {
        let source = abc_null_source();
        let mut set = BitmapSet::new();
        let mut acc = DistinctCountAccumulator::new(&source, &mut set);
        aggregate_all(&mut acc, &source);

        assert_eq!(3, acc.value_i64(&NullHandling::DefaultValue));
        assert_eq!(2, acc.value_i64(&NullHandling::ExplicitNull));
    }

    #[test]
    fn null_entry_counted_by_mode_roaring() {
        let source = abc_null_source();
        let mut set = RoaringBitmap::new();
        let mut acc = DistinctCountAccumulator::new(&source, &mut set);
        aggregate_all(&mut acc, &source);

        assert_eq!(3, acc.value_i32(&NullHandling::DefaultValue));
        assert_eq!(2, acc.value_i32(&NullHandling::ExplicitNull));
    }

    #[test]
    fn empty_bucket() {
        let source = abc_null_source();
        let mut set = BitmapSet::new();
        let acc = DistinctCountAccumulator::new(&source, &mut set);

        assert_eq!(DistinctCount::ZERO, acc.count(&NullHandling::DefaultValue));
        assert_eq!(DistinctCount::ZERO, acc.count(&NullHandling::ExplicitNull));
    }

    #[test]
    fn absent_rows_contribute_nothing() {
        let source = TestSource::new(vec![Some("a")], vec![vec![], vec![0], vec![]]);
        let mut set = BitmapSet::new();
        let mut acc = DistinctCountAccumulator::new(&source, &mut set);
        aggregate_all(&mut acc, &source);

        assert_eq!(1, acc.value_i32(&NullHandling::DefaultValue));
    }

    #[test]
    fn reset_mid_bucket() {
        let mut dictionary = vec![Some("v"); 6];
        dictionary[3] = None;
        let source = TestSource::new(dictionary, vec![vec![0, 1], vec![3], vec![5]]);
        let mut set = BitmapSet::new();
        let mut acc = DistinctCountAccumulator::new(&source, &mut set);

        source.goto(0);
        acc.aggregate();
        source.goto(1);
        acc.aggregate();
        assert_eq!(3, acc.value_i32(&NullHandling::DefaultValue));

        acc.reset();
        assert_eq!(0, acc.value_i32(&NullHandling::DefaultValue));
        assert_eq!(0, acc.value_i32(&NullHandling::ExplicitNull));

        source.goto(2);
        acc.aggregate();
        assert_eq!(1, acc.value_i32(&NullHandling::DefaultValue));
        assert_eq!(1, acc.value_i32(&NullHandling::ExplicitNull));
    }

    #[test]
    fn close_clears_set() {
        let source = abc_null_source();
        let mut set = BitmapSet::new();
        let mut acc = DistinctCountAccumulator::new(&source, &mut set);
        aggregate_all(&mut acc, &source);
        acc.close();

        assert!(set.is_empty());

        // A fresh accumulator over the same set sees nothing stale.
        let acc = DistinctCountAccumulator::new(&source, &mut set);
        assert_eq!(0, acc.value_i64(&NullHandling::DefaultValue));
    }

    #[test]
    fn value_idempotent_across_forms() {
        let source = abc_null_source();
        let mut set = BitmapSet::new();
        let mut acc = DistinctCountAccumulator::new(&source, &mut set);
        aggregate_all(&mut acc, &source);

        for mode in [NullHandling::DefaultValue, NullHandling::ExplicitNull] {
            let first = acc.count(&mode);
            let second = acc.count(&mode);
            assert_eq!(first, second);

            let expected = first.as_i64();
            assert_eq!(expected, acc.value_i32(&mode) as i64);
            assert_eq!(expected, acc.value_i64(&mode));
            assert_eq!(expected as f32, acc.value_f32(&mode));
            assert_eq!(expected as f64, acc.value_f64(&mode));
            assert_eq!(acc.value_f64(&mode), acc.value_f64(&mode));
        }
    }

    #[test]
    fn repeated_multi_value_row_no_growth() {
        let source = TestSource::new(
            vec![Some("a"), Some("b"), Some("c")],
            vec![vec![0, 1, 2], vec![2, 0, 1], vec![1, 1]],
        );
        let mut set = BitmapSet::new();
        let mut acc = DistinctCountAccumulator::new(&source, &mut set);

        source.goto(0);
        acc.aggregate();
        let after_first = acc.value_i32(&NullHandling::DefaultValue);
        assert_eq!(3, after_first);

        for row in 1..3 {
            source.goto(row);
            acc.aggregate();
            assert_eq!(after_first, acc.value_i32(&NullHandling::DefaultValue));
        }
    }

    #[test]
    fn mode_read_at_call_time() {
        let source = abc_null_source();
        let mode = AtomicNullHandling::new(NullHandling::DefaultValue);
        let mut set = BitmapSet::new();
        let mut acc = DistinctCountAccumulator::new(&source, &mut set);
        aggregate_all(&mut acc, &source);

        assert_eq!(3, acc.value_i32(&mode));
        mode.set(NullHandling::ExplicitNull);
        assert_eq!(2, acc.value_i32(&mode));
        mode.set(NullHandling::DefaultValue);
        assert_eq!(3, acc.value_i32(&mode));
    }

    #[test]
    fn dyn_null_handling_source() {
        let source = abc_null_source();
        let mut set = BitmapSet::new();
        let mut acc = DistinctCountAccumulator::new(&source, &mut set);
        aggregate_all(&mut acc, &source);

        let nulls: &dyn NullHandlingSource = &NullHandling::ExplicitNull;
        assert_eq!(2, acc.value_i32(nulls));
    }

    #[test]
    fn order_insensitive() {
        let source = abc_null_source();

        let mut forward = BitmapSet::new();
        let mut acc = DistinctCountAccumulator::new(&source, &mut forward);
        aggregate_all(&mut acc, &source);
        let forward_count = acc.count(&NullHandling::ExplicitNull);

        let mut backward = BitmapSet::new();
        let mut acc = DistinctCountAccumulator::new(&source, &mut backward);
        for row in (0..source.rows.len()).rev() {
            source.goto(row);
            acc.aggregate();
        }
        assert_eq!(forward_count, acc.count(&NullHandling::ExplicitNull));
        drop(acc);

        assert_eq!(forward, backward);
    }

    #[test]
    fn distinct_count_conversions() {
        let count = DistinctCount::new(16_777_216);
        assert_eq!(16_777_216, count.as_i32());
        assert_eq!(16_777_216, count.as_i64());
        assert_eq!(16_777_216.0, count.as_f32());
        assert_eq!(16_777_216.0, count.as_f64());
        assert_eq!("16777216", count.to_string());
    }

    #[test]
    fn randomized_matches_reference() {
        let mut rng = ChaCha8Rng::seed_from_u64(84);

        for _ in 0..50 {
            let dict_size = rng.random_range(1..300);
            let dictionary: Vec<Option<&'static str>> = (0..dict_size)
                .map(|_| if rng.random_bool(0.1) { None } else { Some("v") })
                .collect();

            let num_rows = rng.random_range(0..200);
            let rows: Vec<Vec<DictionaryId>> = (0..num_rows)
                .map(|_| {
                    let len = rng.random_range(0..4);
                    (0..len).map(|_| rng.random_range(0..dict_size)).collect()
                })
                .collect();

            let expected_all: BTreeSet<_> = rows.iter().flatten().copied().collect();
            let expected_non_null = expected_all
                .iter()
                .filter(|&&id| dictionary[id as usize].is_some())
                .count();

            let source = TestSource::new(dictionary, rows);

            let mut bitmap = BitmapSet::new();
            let mut acc = DistinctCountAccumulator::new(&source, &mut bitmap);
            aggregate_all(&mut acc, &source);
            assert_eq!(expected_all.len(), acc.value_i64(&NullHandling::DefaultValue) as usize);
            assert_eq!(expected_non_null, acc.value_i64(&NullHandling::ExplicitNull) as usize);

            let mut roaring = RoaringBitmap::new();
            let mut acc = DistinctCountAccumulator::new(&source, &mut roaring);
            aggregate_all(&mut acc, &source);
            assert_eq!(expected_all.len(), acc.value_i64(&NullHandling::DefaultValue) as usize);
            assert_eq!(expected_non_null, acc.value_i64(&NullHandling::ExplicitNull) as usize);
        }
    }
}
