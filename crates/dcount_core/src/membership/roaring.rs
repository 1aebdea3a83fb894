use ::roaring::RoaringBitmap;

use super::MembershipSet;
use crate::selector::DictionaryId;

impl MembershipSet for RoaringBitmap {
    type Iter<'a> = ::roaring::bitmap::Iter<'a>;

    #[inline]
    fn add(&mut self, id: DictionaryId) {
        self.insert(id);
    }

    fn clear(&mut self) {
        RoaringBitmap::clear(self)
    }

    fn len(&self) -> usize {
        RoaringBitmap::len(self) as usize
    }

    fn iter(&self) -> Self::Iter<'_> {
        RoaringBitmap::iter(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roaring_set_semantics() {
        let mut set = RoaringBitmap::new();
        MembershipSet::add(&mut set, 70_000);
        MembershipSet::add(&mut set, 2);
        MembershipSet::add(&mut set, 2);

        assert_eq!(2, MembershipSet::len(&set));
        let got: Vec<_> = MembershipSet::iter(&set).collect();
        assert_eq!(vec![2, 70_000], got);

        MembershipSet::clear(&mut set);
        assert!(MembershipSet::is_empty(&set));
    }
}
