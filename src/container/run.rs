use std::iter::FlatMap;
use std::ops::RangeInclusive;
use std::slice;

use super::array::ArrayContainer;
use super::bitmap::BitmapContainer;
use super::{
    array_size_for, run_size_for, Container, ARRAY_MAX_SIZE, BITMAP_SERIALIZED_SIZE,
    MAX_CONTAINER_VALUES,
};
use crate::util;

/// Inclusive interval `[start, start + length]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Run {
    pub start: u16,
    pub length: u16,
}

impl Run {
    #[inline]
    pub const fn new(start: u16, length: u16) -> Self {
        Self { start, length }
    }

    /// Run covering `first..=last`.
    #[inline]
    pub fn between(first: u16, last: u16) -> Self {
        debug_assert!(first <= last);
        Self::new(first, last - first)
    }

    /// Run covering the half-open `[start, stop)`, which must be non-empty.
    #[inline]
    pub(crate) fn span(start: u32, stop: u32) -> Self {
        debug_assert!(start < stop && stop <= MAX_CONTAINER_VALUES);
        Self::new(start as u16, (stop - start - 1) as u16)
    }

    /// Last value, inclusive.
    #[inline]
    pub fn end(&self) -> u16 {
        self.start + self.length
    }

    /// One past the last value.
    #[inline]
    pub fn stop(&self) -> u32 {
        u32::from(self.end()) + 1
    }

    #[inline]
    pub fn len(&self) -> u32 {
        u32::from(self.length) + 1
    }

    #[inline]
    pub fn contains(&self, x: u16) -> bool {
        self.start <= x && x <= self.end()
    }

    fn values(&self) -> RangeInclusive<u16> {
        self.start..=self.end()
    }
}

/// Appends `run` to a list sorted by start, merging with the tail when they
/// overlap or touch.
pub(crate) fn smart_append(out: &mut Vec<Run>, run: Run) {
    if let Some(last) = out.last_mut() {
        if u32::from(run.start) <= last.stop() {
            if run.end() > last.end() {
                last.length = run.end() - last.start;
            }
            return;
        }
    }
    out.push(run);
}

/// Like [`smart_append`], but overlapping values cancel out.
///
/// `run.start` must not precede the start of the current tail.
pub(crate) fn smart_append_exclusive(out: &mut Vec<Run>, run: Run) {
    let Some(last) = out.last_mut() else {
        out.push(run);
        return;
    };
    debug_assert!(run.start >= last.start);
    if u32::from(run.start) > last.stop() {
        out.push(run);
        return;
    }
    if u32::from(run.start) == last.stop() {
        last.length = run.end() - last.start;
        return;
    }

    let (last_end, run_end) = (last.end(), run.end());
    let tail = match run_end.cmp(&last_end) {
        std::cmp::Ordering::Less => Some(Run::between(run_end + 1, last_end)),
        std::cmp::Ordering::Greater => Some(Run::between(last_end + 1, run_end)),
        std::cmp::Ordering::Equal => None,
    };
    if run.start == last.start {
        out.pop();
    } else {
        *last = Run::between(last.start, run.start - 1);
    }
    out.extend(tail);
}

/// Feeds the runs of two sorted lists to `push` in order of start.
fn merge_runs(a: &[Run], b: &[Run], mut push: impl FnMut(Run)) {
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if a[i].start <= b[j].start {
            push(a[i]);
            i += 1;
        } else {
            push(b[j]);
            j += 1;
        }
    }
    a[i..].iter().chain(&b[j..]).for_each(|&r| push(r));
}

fn union_runs(a: &[Run], b: &[Run]) -> Vec<Run> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    merge_runs(a, b, |r| smart_append(&mut out, r));
    out
}

fn symmetric_difference_runs(a: &[Run], b: &[Run]) -> Vec<Run> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    merge_runs(a, b, |r| smart_append_exclusive(&mut out, r));
    out
}

fn intersect_runs(a: &[Run], b: &[Run]) -> Vec<Run> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        let (x, y) = (a[i], b[j]);
        let start = x.start.max(y.start);
        let end = x.end().min(y.end());
        if start <= end {
            out.push(Run::between(start, end));
        }
        if x.end() < y.end() {
            i += 1;
        } else {
            j += 1;
        }
    }
    out
}

fn difference_runs(a: &[Run], b: &[Run]) -> Vec<Run> {
    let mut out = Vec::with_capacity(a.len());
    let mut j = 0;
    for r in a {
        let (mut start, stop) = (u32::from(r.start), r.stop());
        while j < b.len() && b[j].stop() <= start {
            j += 1;
        }
        for cut in b[j..].iter().take_while(|c| u32::from(c.start) < stop) {
            if u32::from(cut.start) > start {
                out.push(Run::span(start, u32::from(cut.start)));
            }
            start = start.max(cut.stop());
        }
        if start < stop {
            out.push(Run::span(start, stop));
        }
    }
    out
}

/// Sorted list of disjoint, non-adjacent runs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct RunContainer {
    runs: Vec<Run>,
}

impl RunContainer {
    pub fn new() -> Self {
        Self { runs: Vec::new() }
    }

    /// Every value in `[start, stop)`.
    pub(crate) fn from_range(start: u32, stop: u32) -> Self {
        if start >= stop {
            return Self::new();
        }
        Self {
            runs: vec![Run::span(start, stop)],
        }
    }

    pub(crate) fn from_runs(runs: Vec<Run>) -> Self {
        debug_assert!(runs.windows(2).all(|w| w[0].stop() < u32::from(w[1].start)));
        Self { runs }
    }

    #[inline]
    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    #[inline]
    pub fn number_of_runs(&self) -> u32 {
        self.runs.len() as u32
    }

    pub fn len(&self) -> u32 {
        self.runs.iter().map(Run::len).sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn is_full(&self) -> bool {
        matches!(self.runs.as_slice(), [only] if only.start == 0 && only.stop() == MAX_CONTAINER_VALUES)
    }

    /// `Ok(i)` if `runs[i]` holds `x`, otherwise `Err(i)` with `i` the
    /// position a run starting at `x` would take.
    fn containing_run(&self, x: u16) -> Result<usize, usize> {
        let i = self.runs.partition_point(|r| r.start <= x);
        if i > 0 && self.runs[i - 1].end() >= x {
            Ok(i - 1)
        } else {
            Err(i)
        }
    }

    pub fn contains(&self, x: u16) -> bool {
        self.containing_run(x).is_ok()
    }

    pub fn insert(&mut self, x: u16) -> bool {
        let i = match self.containing_run(x) {
            Ok(_) => return false,
            Err(i) => i,
        };
        let joins_prev = i > 0 && u32::from(x) == self.runs[i - 1].stop();
        let joins_next = i < self.runs.len() && x + 1 == self.runs[i].start;
        match (joins_prev, joins_next) {
            (true, true) => {
                let next = self.runs.remove(i);
                self.runs[i - 1].length += next.length + 2;
            }
            (true, false) => self.runs[i - 1].length += 1,
            (false, true) => {
                self.runs[i].start -= 1;
                self.runs[i].length += 1;
            }
            (false, false) => self.runs.insert(i, Run::new(x, 0)),
        }
        true
    }

    pub fn remove(&mut self, x: u16) -> bool {
        let Ok(i) = self.containing_run(x) else {
            return false;
        };
        let run = self.runs[i];
        if run.length == 0 {
            self.runs.remove(i);
        } else if x == run.start {
            self.runs[i] = Run::new(x + 1, run.length - 1);
        } else if x == run.end() {
            self.runs[i].length -= 1;
        } else {
            self.runs[i] = Run::between(run.start, x - 1);
            self.runs.insert(i + 1, Run::between(x + 1, run.end()));
        }
        true
    }

    /// Adds `[start, stop)`, absorbing every run it overlaps or touches.
    pub(crate) fn insert_range(&mut self, start: u32, stop: u32) {
        if start >= stop {
            return;
        }
        let i = self.runs.partition_point(|r| r.stop() < start);
        let j = self.runs.partition_point(|r| u32::from(r.start) <= stop);
        let mut merged = (start, stop);
        if i < j {
            merged.0 = merged.0.min(u32::from(self.runs[i].start));
            merged.1 = merged.1.max(self.runs[j - 1].stop());
        }
        self.runs
            .splice(i..j, std::iter::once(Run::span(merged.0, merged.1)));
    }

    /// Clears `[start, stop)`, trimming or splitting the runs at its edges.
    pub(crate) fn remove_range(&mut self, start: u32, stop: u32) {
        if start >= stop {
            return;
        }
        let i = self.runs.partition_point(|r| r.stop() <= start);
        let j = self.runs.partition_point(|r| u32::from(r.start) < stop);
        if i >= j {
            return;
        }
        let (first, last) = (self.runs[i], self.runs[j - 1]);
        let left = (u32::from(first.start) < start).then(|| Run::span(u32::from(first.start), start));
        let right = (last.stop() > stop).then(|| Run::span(stop, last.stop()));
        self.runs.splice(i..j, left.into_iter().chain(right));
    }

    pub(crate) fn flip_range(&mut self, start: u32, stop: u32) {
        if start >= stop {
            return;
        }
        self.runs = symmetric_difference_runs(&self.runs, &[Run::span(start, stop)]);
    }

    pub fn cardinality_in_range(&self, start: u32, stop: u32) -> u32 {
        let i = self.runs.partition_point(|r| r.stop() <= start);
        self.runs[i..]
            .iter()
            .take_while(|r| u32::from(r.start) < stop)
            .map(|r| r.stop().min(stop) - u32::from(r.start).max(start))
            .sum()
    }

    pub fn contains_range(&self, start: u32, stop: u32) -> bool {
        if start >= stop {
            return true;
        }
        match self.containing_run(start as u16) {
            Ok(i) => self.runs[i].stop() >= stop,
            Err(_) => false,
        }
    }

    pub fn intersects_range(&self, start: u32, stop: u32) -> bool {
        let i = self.runs.partition_point(|r| r.stop() <= start);
        i < self.runs.len() && u32::from(self.runs[i].start) < stop
    }

    /// Complement within `[start, stop)`.
    pub fn not(&self, start: u32, stop: u32) -> Container {
        let mut out = self.clone();
        out.flip_range(start, stop);
        out.to_efficient_container()
    }

    pub fn rank(&self, x: u16) -> u32 {
        let mut acc = 0;
        for r in &self.runs {
            if x < r.start {
                break;
            }
            if x <= r.end() {
                return acc + u32::from(x - r.start) + 1;
            }
            acc += r.len();
        }
        acc
    }

    pub fn select(&self, j: u32) -> Option<u16> {
        let mut remaining = j;
        for r in &self.runs {
            if remaining < r.len() {
                return Some(r.start + remaining as u16);
            }
            remaining -= r.len();
        }
        None
    }

    pub fn min(&self) -> Option<u16> {
        self.runs.first().map(|r| r.start)
    }

    pub fn max(&self) -> Option<u16> {
        self.runs.last().map(Run::end)
    }

    pub fn next_value(&self, x: u16) -> Option<u16> {
        let i = self.runs.partition_point(|r| r.end() < x);
        self.runs.get(i).map(|r| r.start.max(x))
    }

    pub fn previous_value(&self, x: u16) -> Option<u16> {
        let i = self.runs.partition_point(|r| r.start <= x);
        i.checked_sub(1).map(|i| self.runs[i].end().min(x))
    }

    pub fn next_absent_value(&self, x: u16) -> Option<u16> {
        match self.containing_run(x) {
            Ok(i) => u16::try_from(self.runs[i].stop()).ok(),
            Err(_) => Some(x),
        }
    }

    pub fn previous_absent_value(&self, x: u16) -> Option<u16> {
        match self.containing_run(x) {
            Ok(i) => self.runs[i].start.checked_sub(1),
            Err(_) => Some(x),
        }
    }

    pub fn iter(&self) -> RunIter<'_> {
        RunIter {
            inner: self
                .runs
                .iter()
                .flat_map(Run::values as fn(&Run) -> RangeInclusive<u16>),
        }
    }

    pub fn to_array(&self) -> ArrayContainer {
        let mut out = Vec::with_capacity(self.len() as usize);
        for r in &self.runs {
            out.extend(r.values());
        }
        ArrayContainer::from_sorted_vec(out)
    }

    pub fn to_bitmap(&self) -> BitmapContainer {
        let mut bitmap = BitmapContainer::new();
        for r in &self.runs {
            bitmap.insert_range(u32::from(r.start), r.stop());
        }
        bitmap
    }

    /// Picks the encoding with the smallest serialized size, keeping runs on
    /// a tie.
    pub fn to_efficient_container(self) -> Container {
        let run_size = run_size_for(self.number_of_runs());
        let cardinality = self.len();
        let array_size = array_size_for(cardinality);
        if run_size <= array_size.min(BITMAP_SERIALIZED_SIZE) {
            Container::Run(self)
        } else if cardinality as usize <= ARRAY_MAX_SIZE {
            Container::Array(self.to_array())
        } else {
            Container::Bitmap(self.to_bitmap())
        }
    }

    /// Values shifted up by `offset`, split into those still below 65536
    /// and those carried into the next key.
    pub(crate) fn add_offset(&self, offset: u16) -> (Container, Container) {
        let mut low = Vec::new();
        let mut high = Vec::new();
        let limit = MAX_CONTAINER_VALUES;
        for r in &self.runs {
            let first = u32::from(r.start) + u32::from(offset);
            let last = u32::from(r.end()) + u32::from(offset);
            if last < limit {
                low.push(Run::span(first, last + 1));
            } else if first >= limit {
                high.push(Run::span(first - limit, last + 1 - limit));
            } else {
                low.push(Run::span(first, limit));
                high.push(Run::span(0, last + 1 - limit));
            }
        }
        (
            Container::Run(Self::from_runs(low)),
            Container::Run(Self::from_runs(high)),
        )
    }

    pub(crate) fn limit(&self, max_cardinality: u32) -> Self {
        let mut runs = Vec::new();
        let mut remaining = max_cardinality;
        for r in &self.runs {
            if remaining == 0 {
                break;
            }
            if r.len() <= remaining {
                runs.push(*r);
                remaining -= r.len();
            } else {
                runs.push(Run::new(r.start, (remaining - 1) as u16));
                remaining = 0;
            }
        }
        Self::from_runs(runs)
    }

    pub(crate) fn shrink_to_fit(&mut self) {
        self.runs.shrink_to_fit();
    }

    pub(crate) fn capacity(&self) -> usize {
        self.runs.capacity()
    }

    // =========================================================================
    // Pairwise operations
    // =========================================================================

    pub fn and_run(&self, other: &RunContainer) -> Container {
        Self::from_runs(intersect_runs(&self.runs, &other.runs)).to_efficient_container()
    }

    pub fn or_run(&self, other: &RunContainer) -> Container {
        if self.is_full() || other.is_empty() {
            return Container::Run(self.clone());
        }
        if other.is_full() || self.is_empty() {
            return Container::Run(other.clone());
        }
        Self::from_runs(union_runs(&self.runs, &other.runs)).to_efficient_container()
    }

    pub fn or_array(&self, other: &ArrayContainer) -> Container {
        if self.is_full() {
            return Container::Run(self.clone());
        }
        Self::from_runs(union_runs(&self.runs, other.to_run().runs())).to_efficient_container()
    }

    /// Union that leaves the result as runs.
    pub(crate) fn lazy_or_array(&self, other: &ArrayContainer) -> Container {
        if self.is_full() {
            return Container::Run(self.clone());
        }
        Container::Run(Self::from_runs(union_runs(
            &self.runs,
            other.to_run().runs(),
        )))
    }

    pub(crate) fn lazy_or_run(&self, other: &RunContainer) -> Container {
        Container::Run(Self::from_runs(union_runs(&self.runs, &other.runs)))
    }

    pub fn or_bitmap(&self, other: &BitmapContainer) -> Container {
        if self.is_full() {
            return Container::Run(self.clone());
        }
        let mut bitmap = other.clone();
        bitmap.ior_run(self);
        Container::Bitmap(bitmap)
    }

    pub fn xor_run(&self, other: &RunContainer) -> Container {
        Self::from_runs(symmetric_difference_runs(&self.runs, &other.runs))
            .to_efficient_container()
    }

    pub fn xor_array(&self, other: &ArrayContainer) -> Container {
        Self::from_runs(symmetric_difference_runs(&self.runs, other.to_run().runs()))
            .to_efficient_container()
    }

    pub fn xor_bitmap(&self, other: &BitmapContainer) -> Container {
        let mut bitmap = other.clone();
        bitmap.ixor_run(self);
        bitmap.into_array_if_sparse()
    }

    pub fn and_not_run(&self, other: &RunContainer) -> Container {
        Self::from_runs(difference_runs(&self.runs, &other.runs)).to_efficient_container()
    }

    pub fn and_not_array(&self, other: &ArrayContainer) -> Container {
        Self::from_runs(difference_runs(&self.runs, other.to_run().runs()))
            .to_efficient_container()
    }

    pub fn and_not_bitmap(&self, other: &BitmapContainer) -> Container {
        if self.len() as usize <= ARRAY_MAX_SIZE {
            let mut array = self.to_array();
            array.retain(|v| !other.contains(v));
            return Container::Array(array);
        }
        let mut bitmap = self.to_bitmap();
        bitmap.iand_not_bitmap(other);
        bitmap.into_array_if_sparse()
    }

    pub fn intersects_run(&self, other: &RunContainer) -> bool {
        let (mut i, mut j) = (0, 0);
        while i < self.runs.len() && j < other.runs.len() {
            let (x, y) = (self.runs[i], other.runs[j]);
            if x.start.max(y.start) <= x.end().min(y.end()) {
                return true;
            }
            if x.end() < y.end() {
                i += 1;
            } else {
                j += 1;
            }
        }
        false
    }

    pub fn and_cardinality_run(&self, other: &RunContainer) -> u32 {
        intersect_runs(&self.runs, &other.runs)
            .iter()
            .map(Run::len)
            .sum()
    }

    /// Values of `values` covered by some run.
    pub(crate) fn count_covered(&self, values: &[u16]) -> u32 {
        let mut count = 0;
        let mut i = 0;
        for r in &self.runs {
            i = util::advance_until(values, i, r.start);
            let hi = i + values[i..].partition_point(|&v| v <= r.end());
            count += (hi - i) as u32;
            i = hi;
            if i == values.len() {
                break;
            }
        }
        count
    }
}

/// Values of a [`RunContainer`] in either direction.
#[derive(Clone)]
pub struct RunIter<'a> {
    inner: FlatMap<slice::Iter<'a, Run>, RangeInclusive<u16>, fn(&Run) -> RangeInclusive<u16>>,
}

impl std::fmt::Debug for RunIter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunIter").finish_non_exhaustive()
    }
}

impl Iterator for RunIter<'_> {
    type Item = u16;

    #[inline]
    fn next(&mut self) -> Option<u16> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl DoubleEndedIterator for RunIter<'_> {
    #[inline]
    fn next_back(&mut self) -> Option<u16> {
        self.inner.next_back()
    }
}

impl std::iter::FusedIterator for RunIter<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn runs(pairs: &[(u16, u16)]) -> RunContainer {
        RunContainer::from_runs(pairs.iter().map(|&(a, b)| Run::between(a, b)).collect())
    }

    fn values(c: &RunContainer) -> Vec<u16> {
        c.iter().collect()
    }

    #[test]
    fn test_insert_joins_neighbours() {
        let mut c = runs(&[(1, 2), (5, 6)]);
        assert!(c.insert(4));
        assert_eq!(c.runs(), &[Run::between(1, 2), Run::between(4, 6)]);
        assert!(c.insert(3));
        assert_eq!(c.runs(), &[Run::between(1, 6)]);
        assert!(c.insert(7));
        assert!(c.insert(0));
        assert!(!c.insert(3));
        assert!(c.insert(65535));
        assert_eq!(c.runs(), &[Run::between(0, 7), Run::between(65535, 65535)]);
    }

    #[test]
    fn test_remove_splits() {
        let mut c = runs(&[(10, 20)]);
        assert!(c.remove(15));
        assert_eq!(c.runs(), &[Run::between(10, 14), Run::between(16, 20)]);
        assert!(c.remove(10));
        assert!(c.remove(20));
        assert!(!c.remove(15));
        assert_eq!(c.runs(), &[Run::between(11, 14), Run::between(16, 19)]);
        let mut single = runs(&[(3, 3)]);
        assert!(single.remove(3));
        assert!(single.is_empty());
    }

    #[test]
    fn test_insert_range_cases() {
        let base = runs(&[(10, 20), (30, 40), (50, 60)]);

        let mut c = base.clone();
        c.insert_range(0, 5);
        assert_eq!(c.number_of_runs(), 4);

        let mut c = base.clone();
        c.insert_range(21, 30);
        assert_eq!(c.runs(), &[Run::between(10, 40), Run::between(50, 60)]);

        let mut c = base.clone();
        c.insert_range(15, 55);
        assert_eq!(c.runs(), &[Run::between(10, 60)]);

        let mut c = base.clone();
        c.insert_range(42, 45);
        assert_eq!(c.number_of_runs(), 4);
        assert_eq!(c.runs()[2], Run::between(42, 44));

        let mut c = base.clone();
        c.insert_range(61, 65536);
        assert_eq!(c.runs()[2], Run::between(50, 65535));

        let mut c = base;
        c.insert_range(32, 35);
        assert_eq!(c.number_of_runs(), 3);
    }

    #[test]
    fn test_remove_range_cases() {
        let base = runs(&[(10, 20), (30, 40), (50, 60)]);

        let mut c = base.clone();
        c.remove_range(15, 55);
        assert_eq!(c.runs(), &[Run::between(10, 14), Run::between(55, 60)]);

        let mut c = base.clone();
        c.remove_range(33, 36);
        assert_eq!(
            c.runs(),
            &[
                Run::between(10, 20),
                Run::between(30, 32),
                Run::between(36, 40),
                Run::between(50, 60)
            ]
        );

        let mut c = base.clone();
        c.remove_range(21, 30);
        assert_eq!(c, base);

        let mut c = base;
        c.remove_range(0, 65536);
        assert!(c.is_empty());
    }

    #[test]
    fn test_smart_append_exclusive_cancels_overlap() {
        let mut out = Vec::new();
        smart_append_exclusive(&mut out, Run::between(0, 10));
        smart_append_exclusive(&mut out, Run::between(2, 3));
        smart_append_exclusive(&mut out, Run::between(5, 6));
        assert_eq!(
            out,
            vec![Run::between(0, 1), Run::between(4, 4), Run::between(7, 10)]
        );
        smart_append_exclusive(&mut out, Run::between(7, 12));
        assert_eq!(
            out,
            vec![Run::between(0, 1), Run::between(4, 4), Run::between(11, 12)]
        );
        smart_append_exclusive(&mut out, Run::between(13, 13));
        assert_eq!(out.last(), Some(&Run::between(11, 13)));
    }

    #[test]
    fn test_pairwise_run_ops() {
        let a = runs(&[(0, 9), (20, 29)]);
        let b = runs(&[(5, 24)]);

        let and = a.and_run(&b);
        assert_eq!(and.iter().collect::<Vec<_>>(), (5..10).chain(20..25).collect::<Vec<_>>());
        let or = a.or_run(&b);
        assert_eq!(or.iter().collect::<Vec<_>>(), (0..30).collect::<Vec<_>>());
        let xor = a.xor_run(&b);
        assert_eq!(
            xor.iter().collect::<Vec<_>>(),
            (0..5).chain(10..20).chain(25..30).collect::<Vec<_>>()
        );
        let diff = a.and_not_run(&b);
        assert_eq!(diff.iter().collect::<Vec<_>>(), (0..5).chain(25..30).collect::<Vec<_>>());
        assert_eq!(a.and_cardinality_run(&b), 10);
        assert!(a.intersects_run(&b));
        assert!(!a.intersects_run(&runs(&[(10, 19)])));
    }

    #[test]
    fn test_rank_select_range_queries() {
        let c = runs(&[(10, 19), (100, 100), (65530, 65535)]);
        assert_eq!(c.len(), 17);
        assert_eq!(c.rank(9), 0);
        assert_eq!(c.rank(15), 6);
        assert_eq!(c.rank(50), 10);
        assert_eq!(c.rank(65535), 17);
        assert_eq!(c.select(10), Some(100));
        assert_eq!(c.select(16), Some(65535));
        assert_eq!(c.select(17), None);
        assert_eq!(c.cardinality_in_range(15, 101), 6);
        assert!(c.contains_range(12, 20));
        assert!(!c.contains_range(12, 21));
        assert!(c.intersects_range(19, 21));
        assert!(!c.intersects_range(20, 100));
    }

    #[test]
    fn test_iter_both_directions() {
        let c = runs(&[(1, 3), (7, 8)]);
        assert_eq!(values(&c), vec![1, 2, 3, 7, 8]);
        assert_eq!(c.iter().rev().collect::<Vec<_>>(), vec![8, 7, 3, 2, 1]);
        let mut it = c.iter();
        assert_eq!(it.next(), Some(1));
        assert_eq!(it.next_back(), Some(8));
        assert_eq!(it.collect::<Vec<_>>(), vec![2, 3, 7]);
    }

    #[test]
    fn test_to_efficient_container() {
        let full = RunContainer::from_range(0, 65536);
        assert!(matches!(full.to_efficient_container(), Container::Run(_)));

        let scattered = RunContainer::from_runs((0..100).map(|i| Run::new(i * 10, 0)).collect());
        assert!(matches!(
            scattered.to_efficient_container(),
            Container::Array(_)
        ));

        // Pairs of values: runs cost 2+4n, array 2+4n as well; runs keep the tie.
        let pairs = RunContainer::from_runs((0..10).map(|i| Run::new(i * 10, 1)).collect());
        assert!(matches!(pairs.to_efficient_container(), Container::Run(_)));

        let dense = RunContainer::from_runs((0..3000).map(|i| Run::new(i * 20, 9)).collect());
        assert!(matches!(
            dense.to_efficient_container(),
            Container::Bitmap(_)
        ));
    }

    #[test]
    fn test_count_covered() {
        let c = runs(&[(10, 19), (30, 30)]);
        assert_eq!(c.count_covered(&[1, 10, 15, 19, 20, 30, 31]), 4);
        assert_eq!(c.count_covered(&[]), 0);
    }

    #[test]
    fn test_navigation() {
        let c = runs(&[(0, 3), (10, 20), (65_530, 65_535)]);
        assert_eq!(c.next_value(4), Some(10));
        assert_eq!(c.next_value(15), Some(15));
        assert_eq!(c.next_value(21), Some(65_530));
        assert_eq!(c.previous_value(9), Some(3));
        assert_eq!(c.previous_value(12), Some(12));
        assert_eq!(runs(&[(5, 6)]).previous_value(4), None);

        assert_eq!(c.next_absent_value(0), Some(4));
        assert_eq!(c.next_absent_value(9), Some(9));
        assert_eq!(c.next_absent_value(65_531), None);
        assert_eq!(c.previous_absent_value(2), None);
        assert_eq!(c.previous_absent_value(20), Some(9));
        assert_eq!(c.previous_absent_value(65_535), Some(65_529));
    }

    #[test]
    fn test_add_offset_splits_straddling_run() {
        let c = runs(&[(1, 2), (64_000, 65_535)]);
        let (low, high) = c.add_offset(600);
        let Container::Run(low) = low else {
            panic!("expected runs");
        };
        let Container::Run(high) = high else {
            panic!("expected runs");
        };
        assert_eq!(low.runs(), &[Run::between(601, 602), Run::between(64_600, 65_535)]);
        assert_eq!(high.runs(), &[Run::between(0, 599)]);
    }
}
