/// Index of a value within a segment's per-column dictionary.
///
/// Only meaningful within the segment that produced it.
pub type DictionaryId = u32;

/// Source of dictionary ids for the row a scan is currently positioned on.
///
/// Row advancement is owned by the scan, not by the consumers of this trait.
pub trait RowValueSource {
    /// Dictionary ids for the current row.
    ///
    /// Empty for an absent value, more than one id for a multi-valued row.
    fn current_row(&self) -> &[DictionaryId];

    /// Resolve a dictionary id back to its original value.
    ///
    /// Returns `None` if the id encodes a null value.
    fn lookup_name(&self, id: DictionaryId) -> Option<&str>;

    /// Number of entries in the backing dictionary, if known.
    ///
    /// Only used for debug assertions.
    fn value_cardinality(&self) -> Option<usize> {
        None
    }
}
