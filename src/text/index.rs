//! Ordered tag index of one namespace
//!
//! Tags are kept in two balanced trees, one per total order, so both Key and
//! ReverseKey traversals are linear and single inserts/removals stay
//! logarithmic. Range queries scan the Key tree bounded by start offsets.

use crate::models::{Offsets, Tag};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::ops::Range;

/// How a tag must relate to a query range `[s, e)` to match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Containment {
    /// The tag overlaps the range
    #[default]
    Covers,
    /// The tag lies entirely inside the range
    Contained,
}

impl Containment {
    pub fn matches(&self, offsets: &Offsets, range: &Range<usize>) -> bool {
        let (start, end) = (offsets.start(), offsets.end());

        match self {
            Containment::Covers if offsets.is_point() => range.start <= start && start < range.end,
            Containment::Covers => start < range.end && end > range.start,
            Containment::Contained => range.start <= start && end <= range.end,
        }
    }
}

/// Tag wrapper ordered by ReverseKey
#[derive(Debug, Clone, PartialEq, Eq)]
struct ByReverseKey(Tag);

impl Ord for ByReverseKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.reverse_key_cmp(&other.0)
    }
}

impl PartialOrd for ByReverseKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, Default)]
pub struct OrderedTagIndex {
    forward: BTreeSet<Tag>,
    reverse: BTreeSet<ByReverseKey>,
}

impl OrderedTagIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    pub fn contains(&self, tag: &Tag) -> bool {
        self.forward.contains(tag)
    }

    /// Insert one tag; returns false if it was already present
    pub fn insert(&mut self, tag: Tag) -> bool {
        if self.forward.contains(&tag) {
            return false;
        }

        self.reverse.insert(ByReverseKey(tag.clone()));
        self.forward.insert(tag)
    }

    /// Insert a batch of tags, sorting the batch once
    ///
    /// An empty index is bulk-built from the sorted batch. Returns the number
    /// of tags that were new.
    pub fn extend<I>(&mut self, tags: I) -> usize
    where
        I: IntoIterator<Item = Tag>,
    {
        let mut batch: Vec<Tag> = tags.into_iter().collect();
        batch.sort_unstable();
        batch.dedup();

        if self.forward.is_empty() {
            let added = batch.len();
            self.reverse = batch.iter().cloned().map(ByReverseKey).collect();
            self.forward = batch.into_iter().collect();
            return added;
        }

        let mut added = 0;
        for tag in batch {
            if self.insert(tag) {
                added += 1;
            }
        }
        added
    }

    /// Remove one tag; returns false if it was not present
    pub fn remove_tag(&mut self, tag: &Tag) -> bool {
        if !self.forward.remove(tag) {
            return false;
        }

        self.reverse.remove(&ByReverseKey(tag.clone()));
        true
    }

    /// Tags matching `range` under `mode`, in Key order
    pub fn query(&self, range: Range<usize>, mode: Containment) -> impl Iterator<Item = &Tag> + '_ {
        let candidates: Box<dyn Iterator<Item = &Tag> + '_> = if range.start > range.end {
            Box::new(std::iter::empty())
        } else {
            match mode {
                // anything starting at or after the range end cannot overlap it
                Containment::Covers => {
                    let upper = Tag::probe(range.end);
                    Box::new(self.forward.range(..upper))
                }
                Containment::Contained => {
                    let lower = Tag::probe(range.start);
                    let upper = Tag::probe(range.end.saturating_add(1));
                    Box::new(self.forward.range(lower..upper))
                }
            }
        };

        candidates.filter(move |tag| mode.matches(tag.offsets(), &range))
    }

    /// Remove and return all tags matching `range` under `mode`, in Key order
    pub fn remove(&mut self, range: Range<usize>, mode: Containment) -> Vec<Tag> {
        let matching: Vec<Tag> = self.query(range, mode).cloned().collect();

        for tag in &matching {
            self.remove_tag(tag);
        }

        matching
    }

    /// All tags in Key order
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Tag> + ExactSizeIterator + '_ {
        self.forward.iter()
    }

    /// All tags in ReverseKey order
    pub fn iter_reverse_key(&self) -> impl DoubleEndedIterator<Item = &Tag> + ExactSizeIterator + '_ {
        self.reverse.iter().map(|wrapped| &wrapped.0)
    }
}

impl PartialEq for OrderedTagIndex {
    fn eq(&self, other: &Self) -> bool {
        self.forward == other.forward
    }
}

impl Eq for OrderedTagIndex {}
