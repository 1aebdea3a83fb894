pub mod bitmap;
pub mod roaring;

use std::fmt;
use std::str::FromStr;

use dcount_error::{DcountError, Result};

use crate::selector::DictionaryId;

/// A mutable set of dictionary ids.
///
/// Adds are idempotent. Iteration yields ids in ascending order and may be
/// restarted any number of times.
pub trait MembershipSet {
    type Iter<'a>: Iterator<Item = DictionaryId>
    where
        Self: 'a;

    fn add(&mut self, id: DictionaryId);

    /// Remove all ids, retaining any allocated capacity.
    fn clear(&mut self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn iter(&self) -> Self::Iter<'_>;
}

/// Which membership set implementation to use for a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MembershipSetKind {
    /// Dense bitmap, best for small dictionaries.
    #[default]
    Bitmap,
    /// Compressed roaring bitmap, best for large sparse dictionaries.
    Roaring,
}

impl MembershipSetKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Bitmap => "bitmap",
            Self::Roaring => "roaring",
        }
    }
}

impl fmt::Display for MembershipSetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MembershipSetKind {
    type Err = DcountError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "bitmap" | "dense" => Ok(Self::Bitmap),
            "roaring" => Ok(Self::Roaring),
            _ => Err(DcountError::new("Unknown membership set kind").with_field("kind", s)),
        }
    }
}
