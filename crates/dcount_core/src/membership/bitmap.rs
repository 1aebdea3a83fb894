use std::fmt;

use super::MembershipSet;
use crate::selector::DictionaryId;

/// An LSB ordered, growable bitmap of dictionary ids.
///
/// Bit `i` is set if id `i` is a member. Memory is proportional to the
/// largest id added, so this is best suited to dictionaries of modest size.
#[derive(Clone, Default)]
pub struct BitmapSet {
    words: Vec<u64>,
    /// Number of set bits.
    count: usize,
}

impl BitmapSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bitmap able to hold ids below `cap` without reallocating.
    pub fn with_capacity(cap: usize) -> Self {
        BitmapSet {
            words: vec![0; cap.div_ceil(64)],
            count: 0,
        }
    }
}

/// Sets are equal if they hold the same ids, regardless of allocated words.
impl PartialEq for BitmapSet {
    fn eq(&self, other: &Self) -> bool {
        self.count == other.count && self.iter().eq(other.iter())
    }
}

impl Eq for BitmapSet {}

impl MembershipSet for BitmapSet {
    type Iter<'a> = BitmapSetIter<'a>;

    #[inline]
    fn add(&mut self, id: DictionaryId) {
        let word = id as usize >> 6;
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }

        let mask = 1u64 << (id & 63); // `id & 63` equivalent to `id % 64`
        let w = &mut self.words[word];
        if *w & mask == 0 {
            *w |= mask;
            self.count += 1;
        }
    }

    fn clear(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
        self.count = 0;
    }

    fn len(&self) -> usize {
        self.count
    }

    fn iter(&self) -> Self::Iter<'_> {
        BitmapSetIter {
            words: &self.words,
            word_idx: 0,
            current: self.words.first().copied().unwrap_or(0),
        }
    }
}

impl fmt::Debug for BitmapSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<DictionaryId> for BitmapSet {
    fn from_iter<T: IntoIterator<Item = DictionaryId>>(iter: T) -> Self {
        let mut set = BitmapSet::new();
        set.extend(iter);
        set
    }
}

impl Extend<DictionaryId> for BitmapSet {
    fn extend<T: IntoIterator<Item = DictionaryId>>(&mut self, iter: T) {
        for id in iter {
            self.add(id);
        }
    }
}

/// Iterator over set ids in ascending order.
#[derive(Debug)]
pub struct BitmapSetIter<'a> {
    words: &'a [u64],
    word_idx: usize,
    /// Remaining bits of the current word, cleared as they're yielded.
    current: u64,
}

impl Iterator for BitmapSetIter<'_> {
    type Item = DictionaryId;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current != 0 {
                let bit = self.current.trailing_zeros();
                // Clear lowest set bit.
                self.current &= self.current - 1;
                return Some((self.word_idx * 64) as DictionaryId + bit);
            }

            self.word_idx += 1;
            if self.word_idx >= self.words.len() {
                return None;
            }
            self.current = self.words[self.word_idx];
        }
    }
}
