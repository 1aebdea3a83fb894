use std::cell::Cell;
use std::collections::HashMap;

use dcount_error::{DcountError, Result};

use crate::selector::{DictionaryId, RowValueSource};

/// Max number of entries in a single dictionary.
///
/// Keeps every distinct count representable as an `i32`.
pub const MAX_DICTIONARY_SIZE: usize = i32::MAX as usize;

/// Immutable per-column dictionary for a segment.
///
/// Ids are dense and assigned in first-seen order. Null is stored as a regular
/// entry that resolves to `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dictionary {
    values: Vec<Option<String>>,
}

impl Dictionary {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Resolve an id to its value.
    ///
    /// Ids outside of the dictionary are a caller bug. They resolve to `None`
    /// in release builds.
    pub fn lookup(&self, id: DictionaryId) -> Option<&str> {
        debug_assert!(
            (id as usize) < self.values.len(),
            "dictionary id {id} out of range for dictionary of size {}",
            self.values.len()
        );
        self.values.get(id as usize).and_then(|v| v.as_deref())
    }
}

#[derive(Debug, Default)]
pub struct DictionaryBuilder {
    values: Vec<Option<String>>,
    ids: HashMap<String, DictionaryId>,
    null_id: Option<DictionaryId>,
}

impl DictionaryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the id for a value, adding it to the dictionary if needed.
    pub fn intern(&mut self, value: Option<&str>) -> Result<DictionaryId> {
        let existing = match value {
            Some(value) => self.ids.get(value).copied(),
            None => self.null_id,
        };
        if let Some(id) = existing {
            return Ok(id);
        }

        check_dictionary_size(self.values.len(), MAX_DICTIONARY_SIZE)?;

        let id = self.values.len() as DictionaryId;
        match value {
            Some(value) => {
                self.ids.insert(value.to_string(), id);
            }
            None => self.null_id = Some(id),
        }
        self.values.push(value.map(|v| v.to_string()));

        Ok(id)
    }

    pub fn finish(self) -> Dictionary {
        Dictionary {
            values: self.values,
        }
    }
}

/// Error if a dictionary holding `len` entries can't take another one.
fn check_dictionary_size(len: usize, max_size: usize) -> Result<()> {
    if len >= max_size {
        return Err(DcountError::new("Dictionary is full").with_field("max_size", max_size));
    }
    Ok(())
}

/// A dictionary-encoded, possibly multi-valued, dimension column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryColumn {
    dictionary: Dictionary,
    /// Row `i` holds `ids[offsets[i]..offsets[i+1]]`.
    offsets: Vec<usize>,
    ids: Vec<DictionaryId>,
}

impl DictionaryColumn {
    /// Create a column from string rows, building the dictionary along the
    /// way.
    pub fn try_from_rows<'a, R, V>(rows: R) -> Result<Self>
    where
        R: IntoIterator<Item = V>,
        V: IntoIterator<Item = Option<&'a str>>,
    {
        let mut builder = DictionaryColumnBuilder::new();
        for row in rows {
            builder.push_row(row)?;
        }
        Ok(builder.finish())
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    pub fn num_rows(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Get the ids for a row.
    ///
    /// Panics if `row` is out of bounds.
    pub fn row(&self, row: usize) -> &[DictionaryId] {
        &self.ids[self.offsets[row]..self.offsets[row + 1]]
    }

    /// Create a new cursor over this column positioned at the first row.
    pub fn selector(&self) -> ColumnSelector<'_> {
        ColumnSelector {
            column: self,
            offset: Cell::new(0),
        }
    }
}

#[derive(Debug)]
pub struct DictionaryColumnBuilder {
    dictionary: DictionaryBuilder,
    offsets: Vec<usize>,
    ids: Vec<DictionaryId>,
}

impl Default for DictionaryColumnBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DictionaryColumnBuilder {
    pub fn new() -> Self {
        DictionaryColumnBuilder {
            dictionary: DictionaryBuilder::new(),
            offsets: vec![0],
            ids: Vec::new(),
        }
    }

    /// Append a row.
    ///
    /// An empty iterator appends an absent row contributing no ids. `None`
    /// entries are interned as the null value.
    pub fn push_row<'a>(
        &mut self,
        values: impl IntoIterator<Item = Option<&'a str>>,
    ) -> Result<()> {
        for value in values {
            let id = self.dictionary.intern(value)?;
            self.ids.push(id);
        }
        self.offsets.push(self.ids.len());
        Ok(())
    }

    pub fn num_rows(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn finish(self) -> DictionaryColumn {
        DictionaryColumn {
            dictionary: self.dictionary.finish(),
            offsets: self.offsets,
            ids: self.ids,
        }
    }
}

/// Cursor over a dictionary column.
///
/// The position is interior-mutable so the scan can advance it while an
/// accumulator holds a shared reference. Each scan unit owns its own selector,
/// selectors are not `Sync`.
#[derive(Debug)]
pub struct ColumnSelector<'a> {
    column: &'a DictionaryColumn,
    offset: Cell<usize>,
}

impl ColumnSelector<'_> {
    /// Position the selector on a row.
    pub fn seek(&self, row: usize) {
        debug_assert!(row < self.column.num_rows());
        self.offset.set(row);
    }
}

impl RowValueSource for ColumnSelector<'_> {
    fn current_row(&self) -> &[DictionaryId] {
        self.column.row(self.offset.get())
    }

    fn lookup_name(&self, id: DictionaryId) -> Option<&str> {
        self.column.dictionary.lookup(id)
    }

    fn value_cardinality(&self) -> Option<usize> {
        Some(self.column.dictionary.len())
    }
}
