//! Half-open offset intervals keyed by a value (a style or an entity).
//!
//! A [`RangeSet`] keeps its intervals normalized: sorted by `(value, start)`,
//! and intervals with the same value never overlap or touch. Intervals with
//! different values may overlap freely; callers that need exclusivity (links)
//! clear the range before inserting.

use super::{EntityId, InlineStyle};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Interval<K> {
    pub value: K,
    pub start: usize,
    pub end: usize,
}

impl<K> Interval<K> {
    pub fn new(value: K, start: usize, end: usize) -> Self {
        Self { value, start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeSet<K> {
    intervals: Vec<Interval<K>>,
}

impl<K: Ord + Copy> RangeSet<K> {
    pub fn new() -> Self {
        Self {
            intervals: Vec::new(),
        }
    }

    pub fn from_intervals(intervals: impl IntoIterator<Item = Interval<K>>) -> Self {
        let mut set = Self::new();
        for interval in intervals {
            set.insert(interval.value, interval.start, interval.end);
        }
        set
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interval<K>> {
        self.intervals.iter()
    }

    /// Adds `value` over `[start, end)`, merging with overlapping or adjacent
    /// intervals of the same value.
    pub fn insert(&mut self, value: K, start: usize, end: usize) {
        if start >= end {
            return;
        }
        let mut merged = Interval::new(value, start, end);
        self.intervals.retain(|existing| {
            let touches = existing.value == value
                && existing.start <= merged.end
                && merged.start <= existing.end;
            if touches {
                merged.start = merged.start.min(existing.start);
                merged.end = merged.end.max(existing.end);
            }
            !touches
        });
        self.intervals.push(merged);
        self.intervals.sort();
    }

    /// Removes `[start, end)` from every interval matching `value`
    /// (or from every interval when `value` is `None`), splitting
    /// intervals that straddle the removed range.
    pub fn remove(&mut self, value: Option<K>, start: usize, end: usize) {
        if start >= end {
            return;
        }
        let mut kept = Vec::with_capacity(self.intervals.len() + 1);
        for interval in self.intervals.drain(..) {
            let matches = value.is_none_or(|v| v == interval.value);
            if !matches || interval.end <= start || interval.start >= end {
                kept.push(interval);
                continue;
            }
            if interval.start < start {
                kept.push(Interval::new(interval.value, interval.start, start));
            }
            if end < interval.end {
                kept.push(Interval::new(interval.value, end, interval.end));
            }
        }
        kept.sort();
        self.intervals = kept;
    }

    /// True when every offset of `[start, end)` carries `value`.
    pub fn covers(&self, value: K, start: usize, end: usize) -> bool {
        if start >= end {
            return false;
        }
        self.intervals
            .iter()
            .any(|i| i.value == value && i.start <= start && end <= i.end)
    }

    /// Values active at `offset`.
    pub fn values_at(&self, offset: usize) -> impl Iterator<Item = K> + '_ {
        self.intervals
            .iter()
            .filter(move |i| i.contains(offset))
            .map(|i| i.value)
    }

    /// Shifts intervals for `len` chars inserted at `at`. Intervals that
    /// strictly contain `at` grow; intervals ending at `at` do not.
    pub fn shift_for_insert(&mut self, at: usize, len: usize) {
        if len == 0 {
            return;
        }
        for interval in &mut self.intervals {
            if interval.start >= at {
                interval.start += len;
                interval.end += len;
            } else if interval.end > at {
                interval.end += len;
            }
        }
    }

    /// Collapses `[start, end)` out of every interval.
    pub fn shift_for_delete(&mut self, start: usize, end: usize) {
        if start >= end {
            return;
        }
        let removed = end - start;
        let map = |offset: usize| {
            if offset <= start {
                offset
            } else if offset >= end {
                offset - removed
            } else {
                start
            }
        };
        let shifted: Vec<_> = self
            .intervals
            .drain(..)
            .map(|i| Interval::new(i.value, map(i.start), map(i.end)))
            .filter(|i| !i.is_empty())
            .collect();
        for interval in shifted {
            self.insert(interval.value, interval.start, interval.end);
        }
    }

    /// Splits the set at `at`: `self` keeps `[0, at)`, the returned set holds
    /// the remainder re-based to start at zero.
    pub fn split_off(&mut self, at: usize) -> Self {
        let mut right = Self::new();
        let mut left = Vec::with_capacity(self.intervals.len());
        for interval in self.intervals.drain(..) {
            if interval.end <= at {
                left.push(interval);
            } else if interval.start >= at {
                right
                    .intervals
                    .push(Interval::new(interval.value, interval.start - at, interval.end - at));
            } else {
                left.push(Interval::new(interval.value, interval.start, at));
                right
                    .intervals
                    .push(Interval::new(interval.value, 0, interval.end - at));
            }
        }
        self.intervals = left;
        right.intervals.sort();
        right
    }

    /// Appends `other`, offset by `at`, merging where intervals meet.
    pub fn append_shifted(&mut self, other: &Self, at: usize) {
        for interval in &other.intervals {
            self.insert(interval.value, interval.start + at, interval.end + at);
        }
    }

    /// Drops or trims intervals that reach past `len`.
    pub fn clamp(&mut self, len: usize) {
        for interval in &mut self.intervals {
            interval.end = interval.end.min(len);
        }
        self.intervals.retain(|i| !i.is_empty());
    }
}

impl<K: Ord + Copy> Default for RangeSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub styles: BTreeSet<InlineStyle>,
    pub entity: Option<EntityId>,
}

/// Flattens style and entity intervals over a text of `len` chars into
/// maximal runs of identical formatting. Entity intervals are expected to be
/// exclusive; when they are not, the lowest entity id wins.
pub fn render_spans(
    len: usize,
    styles: &RangeSet<InlineStyle>,
    entities: &RangeSet<EntityId>,
) -> Vec<Span> {
    let mut styles_at: Vec<BTreeSet<InlineStyle>> = vec![BTreeSet::new(); len];
    let mut entity_at: Vec<Option<EntityId>> = vec![None; len];
    for interval in styles.iter() {
        for idx in interval.start..interval.end.min(len) {
            styles_at[idx].insert(interval.value);
        }
    }
    for interval in entities.iter() {
        for idx in interval.start..interval.end.min(len) {
            if entity_at[idx].is_none() {
                entity_at[idx] = Some(interval.value);
            }
        }
    }

    let mut spans = Vec::with_capacity(len.min(64));
    let mut start = 0usize;
    while start < len {
        let current = std::mem::take(&mut styles_at[start]);
        let entity = entity_at[start];
        let mut end = start + 1;
        while end < len && styles_at[end] == current && entity_at[end] == entity {
            end += 1;
        }
        spans.push(Span {
            start,
            end,
            styles: current,
            entity,
        });
        start = end;
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bold(start: usize, end: usize) -> Interval<InlineStyle> {
        Interval::new(InlineStyle::Bold, start, end)
    }

    #[test]
    fn test_insert_merges_same_value() {
        let mut set = RangeSet::new();
        set.insert(InlineStyle::Bold, 0, 3);
        set.insert(InlineStyle::Bold, 3, 5);
        set.insert(InlineStyle::Italic, 1, 4);
        let collected: Vec<_> = set.iter().copied().collect();
        assert_eq!(
            collected,
            vec![bold(0, 5), Interval::new(InlineStyle::Italic, 1, 4)]
        );
    }

    #[test]
    fn test_insert_ignores_empty() {
        let mut set = RangeSet::new();
        set.insert(InlineStyle::Bold, 4, 4);
        set.insert(InlineStyle::Bold, 5, 2);
        assert!(set.is_empty());
    }

    #[test]
    fn test_remove_splits_interval() {
        let mut set = RangeSet::from_intervals([bold(0, 10)]);
        set.remove(Some(InlineStyle::Bold), 3, 6);
        let collected: Vec<_> = set.iter().copied().collect();
        assert_eq!(collected, vec![bold(0, 3), bold(6, 10)]);
    }

    #[test]
    fn test_remove_full() {
        let mut set = RangeSet::from_intervals([bold(2, 4)]);
        set.remove(None, 0, 10);
        assert!(set.is_empty());
    }

    #[test]
    fn test_remove_leaves_other_values() {
        let mut set = RangeSet::from_intervals([bold(0, 4), Interval::new(InlineStyle::Italic, 0, 4)]);
        set.remove(Some(InlineStyle::Italic), 0, 4);
        assert_eq!(set.len(), 1);
        assert!(set.covers(InlineStyle::Bold, 0, 4));
    }

    #[test]
    fn test_covers() {
        let set = RangeSet::from_intervals([bold(2, 8)]);
        assert!(set.covers(InlineStyle::Bold, 2, 8));
        assert!(set.covers(InlineStyle::Bold, 3, 5));
        assert!(!set.covers(InlineStyle::Bold, 1, 5));
        assert!(!set.covers(InlineStyle::Italic, 3, 5));
        assert!(!set.covers(InlineStyle::Bold, 3, 3));
    }

    #[test]
    fn test_shift_for_insert() {
        let mut set = RangeSet::from_intervals([bold(0, 2), bold(4, 6)]);
        set.shift_for_insert(2, 3);
        let collected: Vec<_> = set.iter().copied().collect();
        assert_eq!(collected, vec![bold(0, 2), bold(7, 9)]);

        let mut inner = RangeSet::from_intervals([bold(1, 5)]);
        inner.shift_for_insert(3, 2);
        assert_eq!(inner.iter().copied().collect::<Vec<_>>(), vec![bold(1, 7)]);
    }

    #[test]
    fn test_shift_for_delete_merges() {
        let mut set = RangeSet::from_intervals([bold(0, 2), bold(4, 6)]);
        set.shift_for_delete(2, 4);
        assert_eq!(set.iter().copied().collect::<Vec<_>>(), vec![bold(0, 4)]);

        let mut swallowed = RangeSet::from_intervals([bold(3, 5)]);
        swallowed.shift_for_delete(2, 6);
        assert!(swallowed.is_empty());
    }

    #[test]
    fn test_split_off_and_append() {
        let mut set = RangeSet::from_intervals([bold(1, 6)]);
        let right = set.split_off(4);
        assert_eq!(set.iter().copied().collect::<Vec<_>>(), vec![bold(1, 4)]);
        assert_eq!(right.iter().copied().collect::<Vec<_>>(), vec![bold(0, 2)]);

        set.append_shifted(&right, 4);
        assert_eq!(set.iter().copied().collect::<Vec<_>>(), vec![bold(1, 6)]);
    }

    #[test]
    fn test_render_spans() {
        let styles = RangeSet::from_intervals([bold(0, 4), Interval::new(InlineStyle::Italic, 2, 6)]);
        let entities = RangeSet::from_intervals([Interval::new(EntityId(1), 5, 7)]);
        let spans = render_spans(8, &styles, &entities);
        let bounds: Vec<_> = spans.iter().map(|s| (s.start, s.end)).collect();
        assert_eq!(bounds, vec![(0, 2), (2, 4), (4, 5), (5, 6), (6, 7), (7, 8)]);
        assert_eq!(spans[1].styles.len(), 2);
        assert_eq!(spans[3].entity, Some(EntityId(1)));
        assert!(spans[5].styles.is_empty());
    }

    #[test]
    fn test_render_spans_empty_text() {
        let spans = render_spans(0, &RangeSet::new(), &RangeSet::new());
        assert!(spans.is_empty());
    }
}
