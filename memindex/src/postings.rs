use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::ops::Bound::{self, Excluded, Included, Unbounded};

use roaring::RoaringBitmap;

use crate::error::{IndexError, IndexResult};

/// Posting list of one term: how often it occurs and which documents
/// carry it.
#[derive(Debug)]
pub struct TermPostings {
    pub term_frequency: u32,
    pub docs: RoaringBitmap,
}

impl TermPostings {
    pub fn new() -> Self {
        TermPostings {
            term_frequency: 0,
            docs: RoaringBitmap::new(),
        }
    }

    pub fn add(&mut self, doc_id: u32) {
        self.docs.insert(doc_id);
        self.term_frequency += 1;
    }
}

impl Default for TermPostings {
    fn default() -> Self {
        Self::new()
    }
}

/// Numeric kind committed by the first insert into a range posting tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumKind {
    Int,
    Float,
}

impl NumKind {
    pub fn name(self) -> &'static str {
        match self {
            NumKind::Int => "int64",
            NumKind::Float => "float64",
        }
    }
}

/// Key of a range posting tree. All keys of one tree share a kind; the
/// ordering across kinds exists only to keep `Ord` total and is never
/// observed through the public operations.
#[derive(Debug, Clone, Copy)]
pub enum RangeKey {
    Int(i64),
    Float(f64),
}

impl RangeKey {
    pub fn kind(&self) -> NumKind {
        match self {
            RangeKey::Int(_) => NumKind::Int,
            RangeKey::Float(_) => NumKind::Float,
        }
    }
}

impl Ord for RangeKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (RangeKey::Int(a), RangeKey::Int(b)) => a.cmp(b),
            (RangeKey::Float(a), RangeKey::Float(b)) => a.total_cmp(b),
            (RangeKey::Int(_), RangeKey::Float(_)) => Ordering::Less,
            (RangeKey::Float(_), RangeKey::Int(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for RangeKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for RangeKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RangeKey {}

/// Ordered numeric postings of one field: numeric key -> documents.
///
/// Generic over integer and floating point keys, but a single tree only
/// ever holds one kind; mixing kinds is an error.
#[derive(Debug, Default)]
pub struct RangePostings {
    tree: BTreeMap<RangeKey, RoaringBitmap>,
    kind: Option<NumKind>,
}

impl RangePostings {
    pub fn new() -> Self {
        RangePostings {
            tree: BTreeMap::new(),
            kind: None,
        }
    }

    pub fn add(&mut self, key: RangeKey, doc_id: u32) -> IndexResult<()> {
        match self.kind {
            None => self.kind = Some(key.kind()),
            Some(kind) if kind != key.kind() => {
                return Err(IndexError::RangeKind {
                    expected: kind.name(),
                    got: key.kind().name(),
                });
            }
            Some(_) => {}
        }
        self.tree
            .entry(key)
            .or_insert_with(RoaringBitmap::new)
            .insert(doc_id);
        Ok(())
    }

    pub fn eq(&self, key: RangeKey) -> RoaringBitmap {
        self.tree.get(&key).cloned().unwrap_or_else(RoaringBitmap::new)
    }

    pub fn lt(&self, key: RangeKey) -> RoaringBitmap {
        self.union_range(Unbounded, Excluded(key))
    }

    pub fn le(&self, key: RangeKey) -> RoaringBitmap {
        self.union_range(Unbounded, Included(key))
    }

    pub fn gt(&self, key: RangeKey) -> RoaringBitmap {
        self.union_range(Excluded(key), Unbounded)
    }

    pub fn ge(&self, key: RangeKey) -> RoaringBitmap {
        self.union_range(Included(key), Unbounded)
    }

    fn union_range(&self, from: Bound<RangeKey>, to: Bound<RangeKey>) -> RoaringBitmap {
        let mut out = RoaringBitmap::new();
        for (_, docs) in self.tree.range((from, to)) {
            out |= docs;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bitmap(range: std::ops::Range<u32>) -> RoaringBitmap {
        range.collect()
    }

    /// Twenty keys with ten documents each: key k holds doc ids
    /// 10k..10k+10.
    fn filled() -> RangePostings {
        let mut postings = RangePostings::new();
        for key in 0..20i64 {
            for doc in 0..10u32 {
                postings
                    .add(RangeKey::Int(key), key as u32 * 10 + doc)
                    .unwrap();
            }
        }
        postings
    }

    #[test]
    fn range_operations() {
        let postings = filled();
        assert_eq!(postings.eq(RangeKey::Int(10)), bitmap(100..110));
        assert_eq!(postings.lt(RangeKey::Int(10)), bitmap(0..100));
        assert_eq!(postings.le(RangeKey::Int(10)), bitmap(0..110));
        assert_eq!(postings.gt(RangeKey::Int(10)), bitmap(110..200));
        assert_eq!(postings.ge(RangeKey::Int(10)), bitmap(100..200));
    }

    #[test]
    fn partitions_cover_everything() {
        let postings = filled();
        let all = postings.eq(RangeKey::Int(10))
            | postings.lt(RangeKey::Int(10))
            | postings.gt(RangeKey::Int(10));
        assert_eq!(all, bitmap(0..200));
        assert_eq!(
            postings.le(RangeKey::Int(10)),
            postings.eq(RangeKey::Int(10)) | postings.lt(RangeKey::Int(10))
        );
        assert_eq!(
            postings.ge(RangeKey::Int(10)),
            postings.eq(RangeKey::Int(10)) | postings.gt(RangeKey::Int(10))
        );
    }

    #[test]
    fn missing_key_is_empty() {
        let postings = filled();
        assert!(postings.eq(RangeKey::Int(99)).is_empty());
        assert!(postings.gt(RangeKey::Int(19)).is_empty());
        assert_eq!(postings.lt(RangeKey::Int(99)), bitmap(0..200));
    }

    #[test]
    fn kind_is_pinned_by_first_insert() {
        let mut postings = RangePostings::new();
        postings.add(RangeKey::Int(1), 0).unwrap();
        let err = postings.add(RangeKey::Float(1.5), 1).unwrap_err();
        assert!(matches!(
            err,
            IndexError::RangeKind {
                expected: "int64",
                got: "float64"
            }
        ));

        let mut floats = RangePostings::new();
        floats.add(RangeKey::Float(1.5), 0).unwrap();
        floats.add(RangeKey::Float(0.5), 1).unwrap();
        assert_eq!(floats.lt(RangeKey::Float(1.0)).len(), 1);
        assert!(floats.add(RangeKey::Int(1), 2).is_err());
    }
}
