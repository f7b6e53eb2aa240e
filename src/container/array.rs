use std::iter::Copied;
use std::slice;

use super::bitmap::BitmapContainer;
use super::run::{Run, RunContainer};
use super::{Container, ARRAY_MAX_SIZE, MAX_CONTAINER_VALUES};
use crate::util;

const DEFAULT_INIT_SIZE: usize = 4;

/// Sorted array of distinct 16-bit values.
///
/// Used while a slot holds at most [`ARRAY_MAX_SIZE`] values. Operations that
/// could grow past the limit are routed through [`Container`], which converts
/// to a [`BitmapContainer`] first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ArrayContainer {
    content: Vec<u16>,
}

/// Next capacity for an array holding `capacity` slots.
///
/// Doubles while small, then grows by 1.5x and 1.25x, never past the
/// conversion threshold.
fn grown_capacity(capacity: usize) -> usize {
    let grown = match capacity {
        0 => DEFAULT_INIT_SIZE,
        c if c < 64 => c * 2,
        c if c < 1067 => c * 3 / 2,
        c => c * 5 / 4,
    };
    grown.min(ARRAY_MAX_SIZE).max(capacity + 1)
}

impl ArrayContainer {
    pub fn new() -> Self {
        Self {
            content: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            content: Vec::with_capacity(capacity.min(ARRAY_MAX_SIZE)),
        }
    }

    /// Wraps strictly increasing values.
    pub(crate) fn from_sorted_vec(content: Vec<u16>) -> Self {
        debug_assert!(content.windows(2).all(|w| w[0] < w[1]));
        Self { content }
    }

    /// Every value in `[start, end)`.
    #[cfg(test)]
    pub(crate) fn from_range(start: u32, end: u32) -> Self {
        Self {
            content: (start..end).map(|v| v as u16).collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> u32 {
        self.content.len() as u32
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[u16] {
        &self.content
    }

    #[inline]
    pub fn contains(&self, x: u16) -> bool {
        self.content.binary_search(&x).is_ok()
    }

    /// Inserts `x`, returning whether it was absent.
    ///
    /// Does not check the size limit; see [`Container::add`].
    pub fn insert(&mut self, x: u16) -> bool {
        if self.content.last().map_or(true, |&last| last < x) {
            self.reserve_one();
            self.content.push(x);
            return true;
        }
        match self.content.binary_search(&x) {
            Ok(_) => false,
            Err(pos) => {
                self.reserve_one();
                self.content.insert(pos, x);
                true
            }
        }
    }

    fn reserve_one(&mut self) {
        if self.content.len() == self.content.capacity() {
            let target = grown_capacity(self.content.capacity());
            self.content.reserve_exact(target - self.content.len());
        }
    }

    pub fn remove(&mut self, x: u16) -> bool {
        match self.content.binary_search(&x) {
            Ok(pos) => {
                self.content.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    pub(crate) fn retain(&mut self, mut keep: impl FnMut(u16) -> bool) {
        self.content.retain(|&v| keep(v));
    }

    /// Index bounds `[lo, hi)` of the values inside `[start, end)`.
    fn bounds(&self, start: u32, end: u32) -> (usize, usize) {
        let lo = self.content.partition_point(|&v| u32::from(v) < start);
        let hi = lo + self.content[lo..].partition_point(|&v| u32::from(v) < end);
        (lo, hi)
    }

    pub fn cardinality_in_range(&self, start: u32, end: u32) -> u32 {
        let (lo, hi) = self.bounds(start, end);
        (hi - lo) as u32
    }

    pub fn contains_range(&self, start: u32, end: u32) -> bool {
        self.cardinality_in_range(start, end) == end.saturating_sub(start)
    }

    pub fn intersects_range(&self, start: u32, end: u32) -> bool {
        let (lo, hi) = self.bounds(start, end);
        lo < hi
    }

    /// Adds every value in `[start, end)`, converting to a bitmap when the
    /// result would not fit.
    pub(crate) fn add_range(mut self, start: u32, end: u32) -> Container {
        let (lo, hi) = self.bounds(start, end);
        let new_len = self.content.len() - (hi - lo) + (end - start) as usize;
        if new_len > ARRAY_MAX_SIZE {
            let mut bitmap = self.to_bitmap();
            bitmap.insert_range(start, end);
            return Container::Bitmap(bitmap);
        }
        self.content.splice(lo..hi, (start..end).map(|v| v as u16));
        Container::Array(self)
    }

    pub(crate) fn remove_range(&mut self, start: u32, end: u32) {
        let (lo, hi) = self.bounds(start, end);
        self.content.drain(lo..hi);
    }

    /// Complement within `[start, end)`, sized exactly to the result.
    pub fn not(&self, start: u32, end: u32) -> Container {
        let (lo, hi) = self.bounds(start, end);
        let present = hi - lo;
        let new_len = self.content.len() + (end - start) as usize - 2 * present;
        if new_len > ARRAY_MAX_SIZE {
            let mut bitmap = self.to_bitmap();
            bitmap.flip_range(start, end);
            return Container::Bitmap(bitmap);
        }

        let mut out = Vec::with_capacity(new_len);
        out.extend_from_slice(&self.content[..lo]);
        let mut inside = self.content[lo..hi].iter().peekable();
        for v in start..end {
            if inside.next_if(|&&p| u32::from(p) == v).is_none() {
                out.push(v as u16);
            }
        }
        out.extend_from_slice(&self.content[hi..]);
        Container::Array(Self::from_sorted_vec(out))
    }

    pub fn rank(&self, x: u16) -> u32 {
        self.content.partition_point(|&v| v <= x) as u32
    }

    pub fn select(&self, j: u32) -> Option<u16> {
        self.content.get(j as usize).copied()
    }

    pub fn min(&self) -> Option<u16> {
        self.content.first().copied()
    }

    pub fn max(&self) -> Option<u16> {
        self.content.last().copied()
    }

    /// Smallest value `>= x`.
    pub fn next_value(&self, x: u16) -> Option<u16> {
        let i = self.content.partition_point(|&v| v < x);
        self.content.get(i).copied()
    }

    /// Largest value `<= x`.
    pub fn previous_value(&self, x: u16) -> Option<u16> {
        let i = self.content.partition_point(|&v| v <= x);
        i.checked_sub(1).map(|i| self.content[i])
    }

    /// Smallest absent value `>= x`.
    pub fn next_absent_value(&self, x: u16) -> Option<u16> {
        let i = match self.content.binary_search(&x) {
            Ok(i) => i,
            Err(_) => return Some(x),
        };
        // Values are distinct, so the present stretch from x is where
        // content[i + k] == x + k.
        let stretch = self.content[i..]
            .iter()
            .zip(u32::from(x)..)
            .take_while(|&(&v, expected)| u32::from(v) == expected)
            .count() as u32;
        u16::try_from(u32::from(x) + stretch).ok()
    }

    /// Largest absent value `<= x`.
    pub fn previous_absent_value(&self, x: u16) -> Option<u16> {
        let i = match self.content.binary_search(&x) {
            Ok(i) => i,
            Err(_) => return Some(x),
        };
        let stretch = self.content[..=i]
            .iter()
            .rev()
            .zip((0..=u32::from(x)).rev())
            .take_while(|&(&v, expected)| u32::from(v) == expected)
            .count() as u32;
        u32::from(x).checked_sub(stretch).map(|v| v as u16)
    }

    pub fn iter(&self) -> Copied<slice::Iter<'_, u16>> {
        self.content.iter().copied()
    }

    pub fn number_of_runs(&self) -> u32 {
        if self.content.is_empty() {
            return 0;
        }
        1 + self.content.windows(2).filter(|w| w[0] + 1 != w[1]).count() as u32
    }

    pub fn to_bitmap(&self) -> BitmapContainer {
        let mut bitmap = BitmapContainer::new();
        for &v in &self.content {
            bitmap.insert(v);
        }
        bitmap
    }

    pub fn to_run(&self) -> RunContainer {
        let mut runs = Vec::with_capacity(self.number_of_runs() as usize);
        let mut iter = self.content.iter().copied();
        let Some(first) = iter.next() else {
            return RunContainer::new();
        };
        let mut current = Run::new(first, 0);
        for v in iter {
            if v == current.end() + 1 {
                current.length += 1;
            } else {
                runs.push(current);
                current = Run::new(v, 0);
            }
        }
        runs.push(current);
        RunContainer::from_runs(runs)
    }

    /// Values shifted up by `offset`, split into those still below 65536
    /// and those carried into the next key.
    pub(crate) fn add_offset(&self, offset: u16) -> (Container, Container) {
        let split = self
            .content
            .partition_point(|&v| u32::from(v) + u32::from(offset) < MAX_CONTAINER_VALUES);
        let shifted = |values: &[u16]| {
            Container::Array(Self::from_sorted_vec(
                values.iter().map(|v| v.wrapping_add(offset)).collect(),
            ))
        };
        (shifted(&self.content[..split]), shifted(&self.content[split..]))
    }

    pub(crate) fn limit(&self, max_cardinality: u32) -> Self {
        let n = self.content.len().min(max_cardinality as usize);
        Self::from_sorted_vec(self.content[..n].to_vec())
    }

    pub(crate) fn shrink_to_fit(&mut self) {
        self.content.shrink_to_fit();
    }

    pub(crate) fn capacity(&self) -> usize {
        self.content.capacity()
    }

    // =========================================================================
    // Pairwise operations
    // =========================================================================

    pub fn and_array(&self, other: &ArrayContainer) -> Container {
        let mut out = Vec::with_capacity(self.content.len().min(other.content.len()));
        util::intersect(&self.content, &other.content, &mut out);
        Container::Array(Self::from_sorted_vec(out))
    }

    pub fn and_bitmap(&self, other: &BitmapContainer) -> Container {
        let out = self.iter().filter(|&v| other.contains(v)).collect();
        Container::Array(Self::from_sorted_vec(out))
    }

    pub fn and_run(&self, other: &RunContainer) -> Container {
        if other.is_full() {
            return Container::Array(self.clone());
        }
        let runs = other.runs();
        let mut out = Vec::with_capacity(self.content.len());
        let mut r = 0;
        for &v in &self.content {
            while r < runs.len() && runs[r].end() < v {
                r += 1;
            }
            if r == runs.len() {
                break;
            }
            if runs[r].start <= v {
                out.push(v);
            }
        }
        Container::Array(Self::from_sorted_vec(out))
    }

    pub fn or_array(&self, other: &ArrayContainer) -> Container {
        let total = self.content.len() + other.content.len();
        if total > ARRAY_MAX_SIZE {
            let mut bitmap = self.to_bitmap();
            for &v in &other.content {
                bitmap.insert(v);
            }
            return bitmap.into_array_if_sparse();
        }
        let mut out = Vec::with_capacity(total);
        util::union(&self.content, &other.content, &mut out);
        Container::Array(Self::from_sorted_vec(out))
    }

    pub fn or_bitmap(&self, other: &BitmapContainer) -> Container {
        let mut bitmap = other.clone();
        for &v in &self.content {
            bitmap.insert(v);
        }
        Container::Bitmap(bitmap)
    }

    pub fn xor_array(&self, other: &ArrayContainer) -> Container {
        let total = self.content.len() + other.content.len();
        if total > ARRAY_MAX_SIZE {
            let mut bitmap = self.to_bitmap();
            for &v in &other.content {
                bitmap.flip(v);
            }
            return bitmap.into_array_if_sparse();
        }
        let mut out = Vec::with_capacity(total);
        util::symmetric_difference(&self.content, &other.content, &mut out);
        Container::Array(Self::from_sorted_vec(out))
    }

    pub fn xor_bitmap(&self, other: &BitmapContainer) -> Container {
        let mut bitmap = other.clone();
        for &v in &self.content {
            bitmap.flip(v);
        }
        bitmap.into_array_if_sparse()
    }

    pub fn and_not_array(&self, other: &ArrayContainer) -> Container {
        let mut out = Vec::with_capacity(self.content.len());
        util::difference(&self.content, &other.content, &mut out);
        Container::Array(Self::from_sorted_vec(out))
    }

    pub fn and_not_bitmap(&self, other: &BitmapContainer) -> Container {
        let out = self.iter().filter(|&v| !other.contains(v)).collect();
        Container::Array(Self::from_sorted_vec(out))
    }

    /// Values not covered by any run.
    ///
    /// Walks the runs and the array together: stretches below the next run
    /// are copied wholesale and values covered by a run are skipped by
    /// galloping past the run's end.
    pub fn and_not_run(&self, other: &RunContainer) -> Container {
        let runs = other.runs();
        let values = &self.content;
        let mut out = Vec::with_capacity(values.len());
        let (mut i, mut r) = (0, 0);
        while i < values.len() {
            let v = values[i];
            while r < runs.len() && runs[r].end() < v {
                r += 1;
            }
            let Some(&run) = runs.get(r) else {
                out.extend_from_slice(&values[i..]);
                break;
            };
            if v < run.start {
                let next = util::advance_until(values, i, run.start);
                out.extend_from_slice(&values[i..next]);
                i = next;
            } else {
                i = match run.end().checked_add(1) {
                    Some(past) => util::advance_until(values, i, past),
                    None => values.len(),
                };
                r += 1;
            }
        }
        Container::Array(Self::from_sorted_vec(out))
    }

    pub(crate) fn lazy_or_array(&self, other: &ArrayContainer) -> Container {
        let total = self.content.len() + other.content.len();
        if total <= ARRAY_MAX_SIZE {
            return self.or_array(other);
        }
        let mut bitmap = BitmapContainer::new();
        bitmap.lazy_ior_array(self);
        bitmap.lazy_ior_array(other);
        Container::Bitmap(bitmap)
    }

    pub fn intersects_array(&self, other: &ArrayContainer) -> bool {
        util::intersects(&self.content, &other.content)
    }

    pub fn and_cardinality_array(&self, other: &ArrayContainer) -> u32 {
        util::intersection_count(&self.content, &other.content) as u32
    }
}
