use std::cmp::Ordering;
use std::fmt;
use std::io::{Read, Write};
use std::mem;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Range, Sub, SubAssign};

use tracing::debug;

use crate::container::Container;
use crate::error::{check_range, Error, Result};
use crate::index::RoaringArray;
use crate::iter::Iter;
use crate::util::{high_bits, join, key_slices, low_bits};

/// Exclusive upper bound of the value domain, for range arguments.
const UNIVERSE: u64 = 1 << 32;

/// A compressed set of `u32` values.
///
/// Values are split into a 16-bit key and a 16-bit low part. Each key present
/// in the set owns one [`Container`] holding the low parts, encoded as a
/// sorted array, a bitmap or a list of runs depending on its contents.
///
/// Clones are deep; no storage is shared between bitmaps.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RoaringBitmap {
    index: RoaringArray,
}

/// Breakdown of a bitmap's containers, as reported by
/// [`RoaringBitmap::statistics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Statistics {
    /// Number of containers of any kind
    pub containers: usize,
    /// Containers stored as sorted arrays
    pub array_containers: usize,
    /// Containers stored as 65536-bit bitmaps
    pub bitmap_containers: usize,
    /// Containers stored as runs
    pub run_containers: usize,
    /// Values held by array containers
    pub array_values: u64,
    /// Values held by bitmap containers
    pub bitmap_values: u64,
    /// Values held by run containers
    pub run_values: u64,
    /// Total runs across run containers
    pub runs: u64,
    /// Total number of values
    pub cardinality: u64,
    /// Bytes of the portable serialized form
    pub serialized_bytes: usize,
    /// Approximate in-memory footprint
    pub heap_bytes: usize,
    pub min: Option<u32>,
    pub max: Option<u32>,
}

impl RoaringBitmap {
    pub fn new() -> Self {
        Self {
            index: RoaringArray::new(),
        }
    }

    /// Builds a bitmap holding `values`, which may be unsorted and repeat.
    pub fn bitmap_of(values: &[u32]) -> Self {
        values.iter().copied().collect()
    }

    pub(crate) fn from_index(index: RoaringArray) -> Self {
        Self { index }
    }

    #[cfg(test)]
    pub(crate) fn index(&self) -> &RoaringArray {
        &self.index
    }

    // =========================================================================
    // Single values
    // =========================================================================

    /// Adds `x`, returning whether it was absent.
    pub fn add(&mut self, x: u32) -> bool {
        self.index.get_or_insert(high_bits(x)).add(low_bits(x))
    }

    /// Removes `x`, returning whether it was present.
    pub fn remove(&mut self, x: u32) -> bool {
        let Ok(i) = self.index.get_index(high_bits(x)) else {
            return false;
        };
        let removed = self.index.container_at_mut(i).remove(low_bits(x));
        if removed {
            self.index.prune_at(i);
        }
        removed
    }

    #[inline]
    pub fn contains(&self, x: u32) -> bool {
        self.index
            .get(high_bits(x))
            .is_some_and(|c| c.contains(low_bits(x)))
    }

    pub fn clear(&mut self) {
        self.index.clear();
    }

    /// Number of values.
    pub fn len(&self) -> u64 {
        self.index.cardinality()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    // =========================================================================
    // Ranges
    // =========================================================================

    /// Adds every value in `range`.
    ///
    /// Fails without modifying the set unless
    /// `range.start <= range.end <= 2^32`.
    pub fn add_range(&mut self, range: Range<u64>) -> Result<()> {
        check_range(range.start, range.end, UNIVERSE)?;
        for (key, start, stop) in key_slices(range.start, range.end) {
            match self.index.get_index(key) {
                Ok(i) => self.index.container_at_mut(i).add_range_unchecked(start, stop),
                Err(i) => {
                    self.index
                        .insert_new_key_value_at(i, key, Container::ones(start, stop));
                }
            }
        }
        Ok(())
    }

    pub fn remove_range(&mut self, range: Range<u64>) -> Result<()> {
        check_range(range.start, range.end, UNIVERSE)?;
        for (key, start, stop) in key_slices(range.start, range.end) {
            if let Ok(i) = self.index.get_index(key) {
                self.index
                    .container_at_mut(i)
                    .remove_range_unchecked(start, stop);
                self.index.prune_at(i);
            }
        }
        Ok(())
    }

    /// Complements the set within `range`.
    pub fn flip(&mut self, range: Range<u64>) -> Result<()> {
        check_range(range.start, range.end, UNIVERSE)?;
        for (key, start, stop) in key_slices(range.start, range.end) {
            match self.index.get_index(key) {
                Ok(i) => {
                    self.index
                        .container_at_mut(i)
                        .flip_range_unchecked(start, stop);
                    self.index.prune_at(i);
                }
                Err(i) => {
                    self.index
                        .insert_new_key_value_at(i, key, Container::ones(start, stop));
                }
            }
        }
        Ok(())
    }

    /// Copy of the set complemented within `range`.
    pub fn flipped(&self, range: Range<u64>) -> Result<Self> {
        let mut out = self.clone();
        out.flip(range)?;
        Ok(out)
    }

    /// Whether every value of `range` is present. An empty range is always
    /// contained.
    pub fn contains_range(&self, range: Range<u64>) -> bool {
        if range.start >= range.end {
            return true;
        }
        if range.end > UNIVERSE {
            return false;
        }
        key_slices(range.start, range.end).all(|(key, start, stop)| {
            self.index
                .get(key)
                .is_some_and(|c| c.contains_range(start, stop))
        })
    }

    /// Number of values in `range`. Bounds past `2^32` are clamped.
    pub fn range_cardinality(&self, range: Range<u64>) -> u64 {
        let end = range.end.min(UNIVERSE);
        if range.start >= end {
            return 0;
        }
        let (first, last) = (high_bits(range.start as u32), high_bits((end - 1) as u32));
        let lo = self.index.advance_until(first, 0);
        self.index
            .iter()
            .skip(lo)
            .take_while(|&(key, _)| key <= last)
            .map(|(key, c)| {
                let base = u64::from(key) << 16;
                let start = range.start.max(base) - base;
                let stop = end.min(base + (1 << 16)) - base;
                u64::from(c.cardinality_in_range(start as u32, stop as u32))
            })
            .sum()
    }

    // =========================================================================
    // Rank and select
    // =========================================================================

    /// Number of values `<= x`.
    pub fn rank(&self, x: u32) -> u64 {
        let (hb, lb) = (high_bits(x), low_bits(x));
        let mut rank = 0;
        for (key, c) in self.index.iter() {
            match key.cmp(&hb) {
                Ordering::Less => rank += u64::from(c.len()),
                Ordering::Equal => return rank + u64::from(c.rank(lb)),
                Ordering::Greater => break,
            }
        }
        rank
    }

    /// The `j`-th smallest value, zero-based.
    pub fn select(&self, j: u32) -> Result<u32> {
        let mut remaining = j;
        for (key, c) in self.index.iter() {
            let len = c.len();
            if remaining < len {
                return Ok(join(key, c.select(remaining)?));
            }
            remaining -= len;
        }
        Err(Error::SelectOutOfBounds {
            index: u64::from(j),
            cardinality: self.len(),
        })
    }

    pub fn first(&self) -> Result<u32> {
        let (key, c) = self.index.iter().next().ok_or(Error::Empty)?;
        Ok(join(key, c.first()?))
    }

    pub fn last(&self) -> Result<u32> {
        let (key, c) = self.index.iter().next_back().ok_or(Error::Empty)?;
        Ok(join(key, c.last()?))
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Smallest value `>= x`.
    pub fn next_value(&self, x: u32) -> Option<u32> {
        let (hb, lb) = (high_bits(x), low_bits(x));
        let i = match self.index.get_index(hb) {
            Ok(i) => {
                if let Some(v) = self.index.container_at(i).next_value(lb) {
                    return Some(join(hb, v));
                }
                i + 1
            }
            Err(i) => i,
        };
        if i == self.index.len() {
            return None;
        }
        let key = self.index.key_at(i);
        self.index.container_at(i).next_value(0).map(|v| join(key, v))
    }

    /// Largest value `<= x`.
    pub fn previous_value(&self, x: u32) -> Option<u32> {
        let (hb, lb) = (high_bits(x), low_bits(x));
        let end = match self.index.get_index(hb) {
            Ok(i) => {
                if let Some(v) = self.index.container_at(i).previous_value(lb) {
                    return Some(join(hb, v));
                }
                i
            }
            Err(i) => i,
        };
        let i = end.checked_sub(1)?;
        let key = self.index.key_at(i);
        self.index
            .container_at(i)
            .previous_value(u16::MAX)
            .map(|v| join(key, v))
    }

    /// Smallest value `>= x` missing from the set.
    pub fn next_absent_value(&self, x: u32) -> Option<u32> {
        let Ok(mut i) = self.index.get_index(high_bits(x)) else {
            return Some(x);
        };
        let (mut key, mut low) = (high_bits(x), low_bits(x));
        loop {
            if let Some(v) = self.index.container_at(i).next_absent_value(low) {
                return Some(join(key, v));
            }
            // Full from `low` up; continue only into a container for the next key.
            key = key.checked_add(1)?;
            i += 1;
            if i == self.index.len() || self.index.key_at(i) != key {
                return Some(join(key, 0));
            }
            low = 0;
        }
    }

    /// Largest value `<= x` missing from the set.
    pub fn previous_absent_value(&self, x: u32) -> Option<u32> {
        let Ok(mut i) = self.index.get_index(high_bits(x)) else {
            return Some(x);
        };
        let (mut key, mut low) = (high_bits(x), low_bits(x));
        loop {
            if let Some(v) = self.index.container_at(i).previous_absent_value(low) {
                return Some(join(key, v));
            }
            key = key.checked_sub(1)?;
            if i == 0 || self.index.key_at(i - 1) != key {
                return Some(join(key, u16::MAX));
            }
            i -= 1;
            low = u16::MAX;
        }
    }

    // =========================================================================
    // Set algebra
    // =========================================================================

    pub fn and(&self, other: &Self) -> Self {
        let (a, b) = (&self.index, &other.index);
        let mut out = RoaringArray::with_capacity(a.len().min(b.len()));
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            let (ka, kb) = (a.key_at(i), b.key_at(j));
            match ka.cmp(&kb) {
                Ordering::Equal => {
                    out.append(ka, a.container_at(i).and(b.container_at(j)));
                    i += 1;
                    j += 1;
                }
                Ordering::Less => i = a.advance_until(kb, i),
                Ordering::Greater => j = b.advance_until(ka, j),
            }
        }
        Self::from_index(out)
    }

    pub fn or(&self, other: &Self) -> Self {
        Self::from_index(merge(&self.index, &other.index, Container::or))
    }

    pub fn xor(&self, other: &Self) -> Self {
        Self::from_index(merge(&self.index, &other.index, Container::xor))
    }

    /// Values of `self` absent from `other`.
    pub fn and_not(&self, other: &Self) -> Self {
        let (a, b) = (&self.index, &other.index);
        let mut out = RoaringArray::with_capacity(a.len());
        let mut j = 0;
        for (key, c) in a.iter() {
            j = b.advance_until(key, j);
            if j < b.len() && b.key_at(j) == key {
                out.append(key, c.and_not(b.container_at(j)));
            } else {
                out.append(key, c.clone());
            }
        }
        Self::from_index(out)
    }

    pub fn and_inplace(&mut self, other: &Self) {
        let b = &other.index;
        let mut j = 0;
        for (key, c) in mem::take(&mut self.index) {
            j = b.advance_until(key, j);
            if j == b.len() {
                break;
            }
            if b.key_at(j) == key {
                self.index.append(key, c.iand(b.container_at(j)));
            }
        }
    }

    pub fn or_inplace(&mut self, other: &Self) {
        merge_inplace(&mut self.index, &other.index, Container::ior);
    }

    pub fn xor_inplace(&mut self, other: &Self) {
        merge_inplace(&mut self.index, &other.index, Container::ixor);
    }

    pub fn and_not_inplace(&mut self, other: &Self) {
        let b = &other.index;
        let mut j = 0;
        for (key, c) in mem::take(&mut self.index) {
            j = b.advance_until(key, j);
            let c = if j < b.len() && b.key_at(j) == key {
                c.iand_not(b.container_at(j))
            } else {
                c
            };
            self.index.append(key, c);
        }
    }

    /// Union of many bitmaps.
    ///
    /// Folds with lazy unions that skip cardinality upkeep, then repairs each
    /// container once at the end.
    pub fn or_many<'a, I>(bitmaps: I) -> Self
    where
        I: IntoIterator<Item = &'a RoaringBitmap>,
    {
        let mut index = RoaringArray::new();
        let mut inputs = 0usize;
        for bitmap in bitmaps {
            merge_inplace(&mut index, &bitmap.index, Container::lazy_ior);
            inputs += 1;
        }
        for (_, c) in index.iter_mut() {
            c.replace_with(Container::repair_after_lazy);
        }
        debug!(inputs, containers = index.len(), "repaired lazy union");
        Self::from_index(index)
    }

    /// `self | !other`, with the complement taken within `[0, range_end)`.
    /// Values of `self` at or past `range_end` are kept.
    pub fn or_not(&self, other: &Self, range_end: u64) -> Result<Self> {
        let complement = Self::complement_within(other, range_end)?;
        Ok(self.or(&complement))
    }

    pub fn or_not_inplace(&mut self, other: &Self, range_end: u64) -> Result<()> {
        let complement = Self::complement_within(other, range_end)?;
        self.or_inplace(&complement);
        Ok(())
    }

    fn complement_within(bitmap: &Self, range_end: u64) -> Result<Self> {
        let mut ones = Self::new();
        ones.add_range(0..range_end)?;
        ones.and_not_inplace(bitmap);
        Ok(ones)
    }

    /// Copy with every value moved by `offset`. Values that would leave
    /// `[0, 2^32)` are dropped.
    pub fn add_offset(&self, offset: i64) -> Self {
        let key_offset = offset.div_euclid(1 << 16);
        let low_offset = offset.rem_euclid(1 << 16) as u16;
        let mut out = RoaringArray::with_capacity(self.index.len() + 1);
        for (key, c) in self.index.iter() {
            let (low, high) = if low_offset == 0 {
                (c.clone(), Container::default())
            } else {
                c.add_offset(low_offset)
            };
            let base = i64::from(key) + key_offset;
            for (target, part) in [(base, low), (base + 1, high)] {
                let Ok(target) = u16::try_from(target) else {
                    continue;
                };
                if part.is_empty() {
                    continue;
                }
                match out.keys().last() {
                    // The carry of the previous key lands on this key's low part.
                    Some(&last) if last == target => {
                        let i = out.len() - 1;
                        out.container_at_mut(i).replace_with(|prev| prev.ior(&part));
                    }
                    _ => out.append(target, part),
                }
            }
        }
        Self::from_index(out)
    }

    /// Whether every value of `self` is also in `other`.
    pub fn is_subset(&self, other: &Self) -> bool {
        if self.index.len() > other.index.len() {
            return false;
        }
        let b = &other.index;
        let mut j = 0;
        for (key, c) in self.index.iter() {
            j = b.advance_until(key, j);
            if j == b.len() || b.key_at(j) != key || !c.is_subset(b.container_at(j)) {
                return false;
            }
            j += 1;
        }
        true
    }

    pub fn and_cardinality(&self, other: &Self) -> u64 {
        let (a, b) = (&self.index, &other.index);
        let mut count = 0;
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            let (ka, kb) = (a.key_at(i), b.key_at(j));
            match ka.cmp(&kb) {
                Ordering::Equal => {
                    count += u64::from(a.container_at(i).and_cardinality(b.container_at(j)));
                    i += 1;
                    j += 1;
                }
                Ordering::Less => i = a.advance_until(kb, i),
                Ordering::Greater => j = b.advance_until(ka, j),
            }
        }
        count
    }

    pub fn or_cardinality(&self, other: &Self) -> u64 {
        self.len() + other.len() - self.and_cardinality(other)
    }

    pub fn xor_cardinality(&self, other: &Self) -> u64 {
        self.len() + other.len() - 2 * self.and_cardinality(other)
    }

    pub fn and_not_cardinality(&self, other: &Self) -> u64 {
        self.len() - self.and_cardinality(other)
    }

    /// Whether the two sets share a value.
    pub fn intersects(&self, other: &Self) -> bool {
        let (a, b) = (&self.index, &other.index);
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            let (ka, kb) = (a.key_at(i), b.key_at(j));
            match ka.cmp(&kb) {
                Ordering::Equal => {
                    if a.container_at(i).intersects(b.container_at(j)) {
                        return true;
                    }
                    i += 1;
                    j += 1;
                }
                Ordering::Less => i = a.advance_until(kb, i),
                Ordering::Greater => j = b.advance_until(ka, j),
            }
        }
        false
    }

    // =========================================================================
    // Encoding
    // =========================================================================

    /// Switches containers to run encoding where that is smaller. Returns
    /// whether any container is run encoded afterwards.
    pub fn run_optimize(&mut self) -> bool {
        let mut any_run = false;
        for (_, c) in self.index.iter_mut() {
            any_run |= c.run_optimize();
        }
        debug!(
            containers = self.index.len(),
            any_run, "run optimization finished"
        );
        any_run
    }

    /// Converts every run container back to an array or bitmap. Returns
    /// whether anything changed.
    pub fn remove_run_compression(&mut self) -> bool {
        let mut changed = false;
        for (_, c) in self.index.iter_mut() {
            changed |= c.remove_run_compression();
        }
        changed
    }

    pub fn has_run_compression(&self) -> bool {
        self.index.has_run_containers()
    }

    /// The smallest `max_cardinality` values.
    pub fn limit(&self, max_cardinality: u64) -> Self {
        let mut out = RoaringArray::new();
        let mut remaining = max_cardinality;
        for (key, c) in self.index.iter() {
            if remaining == 0 {
                break;
            }
            let len = u64::from(c.len());
            if len <= remaining {
                out.append(key, c.clone());
                remaining -= len;
            } else {
                out.append(key, c.limit(remaining as u32));
                remaining = 0;
            }
        }
        Self::from_index(out)
    }

    // =========================================================================
    // Iteration, serialization and memory
    // =========================================================================

    pub fn iter(&self) -> Iter<'_> {
        Iter::new(&self.index)
    }

    pub fn to_vec(&self) -> Vec<u32> {
        let mut out = Vec::with_capacity(self.len() as usize);
        out.extend(self.iter());
        out
    }

    /// Writes the portable Roaring format.
    pub fn serialize_into<W: Write>(&self, writer: W) -> Result<()> {
        self.index.serialize_into(writer)
    }

    /// Exact number of bytes [`RoaringBitmap::serialize_into`] writes.
    pub fn serialized_size(&self) -> usize {
        self.index.serialized_size()
    }

    /// Reads the portable Roaring format, validating its structure.
    pub fn deserialize_from<R: Read>(reader: R) -> Result<Self> {
        RoaringArray::deserialize_from(reader).map(Self::from_index)
    }

    pub fn size_in_bytes(&self) -> usize {
        mem::size_of::<Self>()
            + self.index.keys().len() * mem::size_of::<u16>()
            + self
                .index
                .containers()
                .iter()
                .map(Container::size_in_bytes)
                .sum::<usize>()
    }

    pub fn shrink_to_fit(&mut self) {
        self.index.shrink_to_fit();
    }

    pub fn statistics(&self) -> Statistics {
        let mut stats = Statistics {
            containers: self.index.len(),
            serialized_bytes: self.serialized_size(),
            heap_bytes: self.size_in_bytes(),
            min: self.first().ok(),
            max: self.last().ok(),
            ..Statistics::default()
        };
        for c in self.index.containers() {
            let len = u64::from(c.len());
            stats.cardinality += len;
            match c {
                Container::Array(_) => {
                    stats.array_containers += 1;
                    stats.array_values += len;
                }
                Container::Bitmap(_) => {
                    stats.bitmap_containers += 1;
                    stats.bitmap_values += len;
                }
                Container::Run(r) => {
                    stats.run_containers += 1;
                    stats.run_values += len;
                    stats.runs += u64::from(r.number_of_runs());
                }
            }
        }
        stats
    }
}

/// Merge-join keeping unmatched containers of both sides.
fn merge(
    a: &RoaringArray,
    b: &RoaringArray,
    op: impl Fn(&Container, &Container) -> Container,
) -> RoaringArray {
    let mut out = RoaringArray::with_capacity(a.len().max(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        let (ka, kb) = (a.key_at(i), b.key_at(j));
        match ka.cmp(&kb) {
            Ordering::Equal => {
                out.append(ka, op(a.container_at(i), b.container_at(j)));
                i += 1;
                j += 1;
            }
            Ordering::Less => {
                let next = a.advance_until(kb, i);
                out.append_copies(a, i..next);
                i = next;
            }
            Ordering::Greater => {
                let next = b.advance_until(ka, j);
                out.append_copies(b, j..next);
                j = next;
            }
        }
    }
    out.append_copies(a, i..a.len());
    out.append_copies(b, j..b.len());
    out
}

/// In-place merge-join: containers of `index` are moved through `op`,
/// unmatched containers of `other` are cloned in.
fn merge_inplace(
    index: &mut RoaringArray,
    other: &RoaringArray,
    op: impl Fn(Container, &Container) -> Container,
) {
    let old = mem::take(index);
    *index = RoaringArray::with_capacity(old.len().max(other.len()));
    let mut j = 0;
    for (key, c) in old {
        let next = other.advance_until(key, j);
        index.append_copies(other, j..next);
        j = next;
        if j < other.len() && other.key_at(j) == key {
            index.append(key, op(c, other.container_at(j)));
            j += 1;
        } else {
            index.append(key, c);
        }
    }
    index.append_copies(other, j..other.len());
}

impl fmt::Debug for RoaringBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let len = self.len();
        if len < 16 {
            return f.debug_set().entries(self.iter()).finish();
        }
        write!(
            f,
            "RoaringBitmap<{len} values between {} and {}>",
            self.first().unwrap_or_default(),
            self.last().unwrap_or_default()
        )
    }
}

impl FromIterator<u32> for RoaringBitmap {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        let mut bitmap = Self::new();
        bitmap.extend(iter);
        bitmap
    }
}

impl Extend<u32> for RoaringBitmap {
    fn extend<I: IntoIterator<Item = u32>>(&mut self, iter: I) {
        for x in iter {
            self.add(x);
        }
    }
}

impl<'a> IntoIterator for &'a RoaringBitmap {
    type Item = u32;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

macro_rules! impl_set_op {
    ($trait:ident, $method:ident, $assign_trait:ident, $assign_method:ident, $op:ident, $op_inplace:ident) => {
        impl $trait<&RoaringBitmap> for &RoaringBitmap {
            type Output = RoaringBitmap;

            fn $method(self, rhs: &RoaringBitmap) -> RoaringBitmap {
                self.$op(rhs)
            }
        }

        impl $trait<&RoaringBitmap> for RoaringBitmap {
            type Output = RoaringBitmap;

            fn $method(mut self, rhs: &RoaringBitmap) -> RoaringBitmap {
                self.$op_inplace(rhs);
                self
            }
        }

        impl $assign_trait<&RoaringBitmap> for RoaringBitmap {
            fn $assign_method(&mut self, rhs: &RoaringBitmap) {
                self.$op_inplace(rhs);
            }
        }
    };
}

impl_set_op!(BitAnd, bitand, BitAndAssign, bitand_assign, and, and_inplace);
impl_set_op!(BitOr, bitor, BitOrAssign, bitor_assign, or, or_inplace);
impl_set_op!(BitXor, bitxor, BitXorAssign, bitxor_assign, xor, xor_inplace);
impl_set_op!(Sub, sub, SubAssign, sub_assign, and_not, and_not_inplace);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::BTreeSet;

    fn random_bitmap(rng: &mut StdRng, n: usize) -> (RoaringBitmap, BTreeSet<u32>) {
        let mut bitmap = RoaringBitmap::new();
        let mut model = BTreeSet::new();
        for _ in 0..n {
            // Mix sparse keys, a dense key and the boundary keys.
            let x = match rng.gen_range(0..4) {
                0 => rng.gen::<u32>(),
                1 => rng.gen_range(0..20_000),
                2 => 0xFFFF_0000 | rng.gen_range(0..0x1_0000),
                _ => 0x0003_0000 | rng.gen_range(0..300),
            };
            bitmap.add(x);
            model.insert(x);
        }
        (bitmap, model)
    }

    #[test]
    fn test_basic() {
        let mut b = RoaringBitmap::new();
        assert!(b.add(7));
        assert!(!b.add(7));
        assert!(b.add(u32::MAX));
        assert!(b.contains(7));
        assert!(!b.contains(8));
        assert_eq!(b.len(), 2);
        assert!(b.remove(7));
        assert!(!b.remove(7));
        assert!(!b.remove(123_456));
        assert_eq!(b.to_vec(), vec![u32::MAX]);
        b.clear();
        assert!(b.is_empty());
    }

    #[test]
    fn test_intersection_scenario() {
        let a = RoaringBitmap::bitmap_of(&[1, 2, 3, 1000]);
        let b = RoaringBitmap::bitmap_of(&[2, 3, 2000]);
        let both = a.and(&b);
        assert_eq!(both.to_vec(), vec![2, 3]);
        assert_eq!(both.len(), 2);
        assert_eq!(&a & &b, both);
    }

    #[test]
    fn test_rank_select_scenario() {
        let b = RoaringBitmap::bitmap_of(&[0, 65535, 65536]);
        assert_eq!(b.index.keys(), &[0, 1]);
        assert_eq!(b.rank(65535), 2);
        assert_eq!(b.select(2).unwrap(), 65536);
        assert_eq!(b.select(0).unwrap(), 0);
        let err = b.select(3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(b.first().unwrap(), 0);
        assert_eq!(b.last().unwrap(), 65536);
        assert!(matches!(RoaringBitmap::new().first(), Err(Error::Empty)));
    }

    #[test]
    fn test_conversion_at_threshold() {
        let mut b = RoaringBitmap::new();
        for x in 0..4097 {
            b.add(x);
        }
        let stats = b.statistics();
        assert_eq!(stats.containers, 1);
        assert_eq!(stats.bitmap_containers, 1);
        assert_eq!(stats.cardinality, 4097);

        b.remove(4096);
        let stats = b.statistics();
        assert_eq!(stats.array_containers, 1);
        assert_eq!(b.to_vec(), (0..4096).collect::<Vec<_>>());
    }

    #[test]
    fn test_empty_containers_are_pruned() {
        let mut b = RoaringBitmap::bitmap_of(&[5, 1 << 20]);
        b.remove(5);
        assert_eq!(b.index.keys(), &[16]);
        b.remove_range(0..u64::from(u32::MAX) + 1).unwrap();
        assert!(b.is_empty());
        assert_eq!(b.index.len(), 0);
    }

    #[test]
    fn test_ranges() {
        let mut b = RoaringBitmap::new();
        b.add_range(65_530..131_080).unwrap();
        assert_eq!(b.len(), 65_550);
        assert_eq!(b.index.keys(), &[0, 1, 2]);
        assert!(b.contains_range(65_530..131_080));
        assert!(!b.contains_range(65_529..131_080));
        assert!(b.contains_range(10..10));
        assert_eq!(b.range_cardinality(0..65_536), 6);
        assert_eq!(b.range_cardinality(131_000..u64::MAX), 80);

        b.remove_range(65_536..131_072).unwrap();
        assert_eq!(b.index.keys(), &[0, 2]);
        b.flip(65_530..131_075).unwrap();
        assert_eq!(b.index.keys(), &[1, 2]);
        assert_eq!(b.len(), 65_536 + 5);
        assert_eq!(b.first().unwrap(), 65_536);

        let full = RoaringBitmap::new().flipped(0..1 << 32).unwrap();
        assert_eq!(full.len(), 1 << 32);
        assert_eq!(full.last().unwrap(), u32::MAX);
    }

    #[test]
    fn test_invalid_ranges_leave_set_untouched() {
        let mut b = RoaringBitmap::bitmap_of(&[1, 2, 3]);
        for result in [
            b.add_range(5..2),
            b.remove_range(0..(1 << 32) + 1),
            b.flip(10..9),
        ] {
            assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidArgument);
        }
        assert_eq!(b.to_vec(), vec![1, 2, 3]);
        assert!(b.flipped(0..(1 << 33)).is_err());
    }

    #[test]
    fn test_algebra_against_model() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..4 {
            let (a, ma) = random_bitmap(&mut rng, 20_000);
            let (b, mb) = random_bitmap(&mut rng, 15_000);
            let expect = |set: BTreeSet<u32>| set.into_iter().collect::<Vec<_>>();

            assert_eq!(a.and(&b).to_vec(), expect(&ma & &mb));
            assert_eq!(a.or(&b).to_vec(), expect(&ma | &mb));
            assert_eq!(a.xor(&b).to_vec(), expect(&ma ^ &mb));
            assert_eq!(a.and_not(&b).to_vec(), expect(&ma - &mb));

            let inter = (&ma & &mb).len() as u64;
            assert_eq!(a.and_cardinality(&b), inter);
            assert_eq!(a.or_cardinality(&b), (&ma | &mb).len() as u64);
            assert_eq!(a.xor_cardinality(&b), (&ma ^ &mb).len() as u64);
            assert_eq!(a.and_not_cardinality(&b), (&ma - &mb).len() as u64);
            assert_eq!(a.intersects(&b), inter > 0);

            let mut x = a.clone();
            x &= &b;
            assert_eq!(x, a.and(&b));
            let mut x = a.clone();
            x |= &b;
            assert_eq!(x, a.or(&b));
            let mut x = a.clone();
            x ^= &b;
            assert_eq!(x, a.xor(&b));
            let mut x = a.clone();
            x -= &b;
            assert_eq!(x, a.and_not(&b));
            assert_eq!(a.clone() | &b, &a | &b);
        }
    }

    #[test]
    fn test_run_optimized_operands() {
        let mut rng = StdRng::seed_from_u64(11);
        let (plain, _) = random_bitmap(&mut rng, 5_000);
        let mut dense = RoaringBitmap::new();
        dense.add_range(0..300_000).unwrap();
        dense.add_range(0xFFFF_0000..0xFFFF_8000).unwrap();
        assert!(dense.remove_run_compression());
        assert_eq!(dense.statistics().run_containers, 0);
        let mut optimized = dense.clone();
        assert!(optimized.run_optimize());
        assert!(optimized.has_run_compression());
        assert_eq!(optimized, dense);

        assert_eq!(plain.and(&optimized), plain.and(&dense));
        assert_eq!(plain.or(&optimized), plain.or(&dense));
        assert_eq!(plain.xor(&optimized), plain.xor(&dense));
        assert_eq!(plain.and_not(&optimized), plain.and_not(&dense));
        assert_eq!(optimized.and_not(&plain), dense.and_not(&plain));

        assert!(optimized.remove_run_compression());
        assert!(!optimized.has_run_compression());
        assert_eq!(optimized, dense);
    }

    #[test]
    fn test_or_many_matches_fold() {
        let mut rng = StdRng::seed_from_u64(3);
        let bitmaps: Vec<_> = (0..6)
            .map(|_| random_bitmap(&mut rng, 3_000).0)
            .collect();
        let folded = bitmaps
            .iter()
            .fold(RoaringBitmap::new(), |acc, b| acc.or(b));
        let many = RoaringBitmap::or_many(&bitmaps);
        assert_eq!(many, folded);
        assert_eq!(many.len(), folded.len());
        assert!(RoaringBitmap::or_many(std::iter::empty()).is_empty());
    }

    #[test]
    fn test_limit() {
        let mut b = RoaringBitmap::new();
        b.add_range(10..70_000).unwrap();
        let limited = b.limit(65_530);
        assert_eq!(limited.len(), 65_530);
        assert_eq!(limited.last().unwrap(), 65_539);
        assert_eq!(b.limit(0).len(), 0);
        assert_eq!(b.limit(u64::MAX), b);
    }

    #[test]
    fn test_serialize_round_trip() {
        let mut rng = StdRng::seed_from_u64(5);
        let (mut b, _) = random_bitmap(&mut rng, 10_000);
        b.add_range(1_000_000..1_200_000).unwrap();
        b.run_optimize();
        let mut bytes = Vec::new();
        b.serialize_into(&mut bytes).unwrap();
        assert_eq!(bytes.len(), b.serialized_size());
        let back = RoaringBitmap::deserialize_from(&bytes[..]).unwrap();
        assert_eq!(back, b);
    }

    #[test]
    fn test_statistics_and_debug() {
        let mut b = RoaringBitmap::bitmap_of(&[1, 2, 3]);
        b.add_range(1 << 16..(1 << 16) + 10_000).unwrap();
        b.add_range(2 << 16..(2 << 16) + 100).unwrap();
        b.run_optimize();
        let stats = b.statistics();
        assert_eq!(stats.containers, 3);
        assert_eq!(stats.run_containers, 3);
        assert_eq!(stats.runs, 3);
        assert_eq!(stats.cardinality, b.len());
        assert_eq!(stats.min, Some(1));
        assert_eq!(stats.max, Some((2 << 16) + 99));
        assert_eq!(stats.serialized_bytes, b.serialized_size());

        assert_eq!(format!("{:?}", RoaringBitmap::bitmap_of(&[3, 1])), "{1, 3}");
        assert_eq!(
            format!("{b:?}"),
            format!("RoaringBitmap<10103 values between 1 and {}>", (2 << 16) + 99)
        );
    }

    #[test]
    fn test_shrink_to_fit_keeps_contents() {
        let mut b: RoaringBitmap = (0..10_000).map(|x| x * 3).collect();
        let before = b.clone();
        b.shrink_to_fit();
        assert_eq!(b, before);
        assert!(b.size_in_bytes() > 0);
    }

    #[test]
    fn test_add_range_on_new_keys_uses_runs() {
        let mut b = RoaringBitmap::new();
        b.add_range(0..1 << 24).unwrap();
        let stats = b.statistics();
        assert_eq!(stats.containers, 256);
        assert_eq!(stats.run_containers, 256);
        assert_eq!(stats.bitmap_containers, 0);
        assert!(stats.heap_bytes < 64 * 1024, "{stats:?}");
        assert_eq!(b.len(), 1 << 24);

        // A short range on a fresh key stays an array.
        b.add_range((1 << 30)..(1 << 30) + 1).unwrap();
        assert_eq!(b.statistics().array_containers, 1);

        // Existing containers keep their own encoding rules.
        let mut sparse = RoaringBitmap::bitmap_of(&[1, 3]);
        sparse.add_range(10..5000).unwrap();
        assert_eq!(sparse.statistics().bitmap_containers, 1);
        assert_eq!(sparse.len(), 4992);
    }

    #[test]
    fn test_navigation() {
        let mut b = RoaringBitmap::bitmap_of(&[5, 70_000, u32::MAX]);
        b.add_range(0x2_0000..0x4_0000).unwrap();
        assert_eq!(b.next_value(0), Some(5));
        assert_eq!(b.next_value(6), Some(70_000));
        assert_eq!(b.next_value(70_001), Some(0x2_0000));
        assert_eq!(b.next_value(0x4_0000), Some(u32::MAX));
        assert_eq!(b.previous_value(4), None);
        assert_eq!(b.previous_value(0x1_FFFF), Some(70_000));
        assert_eq!(b.previous_value(0x5_0000), Some(0x3_FFFF));

        assert_eq!(b.next_absent_value(5), Some(6));
        assert_eq!(b.next_absent_value(0x2_0000), Some(0x4_0000));
        assert_eq!(b.next_absent_value(u32::MAX), None);
        assert_eq!(b.previous_absent_value(0x3_FFFF), Some(0x1_FFFF));
        assert_eq!(b.previous_absent_value(5), Some(4));

        let full = RoaringBitmap::new().flipped(0..1 << 32).unwrap();
        assert_eq!(full.next_absent_value(12), None);
        assert_eq!(full.previous_absent_value(u32::MAX), None);
        assert_eq!(RoaringBitmap::new().next_value(0), None);
    }

    #[test]
    fn test_is_subset() {
        let a = RoaringBitmap::bitmap_of(&[1, 70_000]);
        let mut b = RoaringBitmap::bitmap_of(&[1, 2, 70_000]);
        assert!(a.is_subset(&b));
        assert!(!b.is_subset(&a));
        assert!(RoaringBitmap::new().is_subset(&a));
        b.remove(70_000);
        b.add_range(0x2_0000..0x3_0000).unwrap();
        assert!(!a.is_subset(&b));
    }

    #[test]
    fn test_add_offset() {
        let mut b = RoaringBitmap::bitmap_of(&[0, 10, 65_535, u32::MAX]);
        b.add_range(0x5_FFF0..0x6_0010).unwrap();

        let up = b.add_offset(1);
        assert_eq!(
            up.to_vec()[..4],
            [1, 11, 65_536, 0x5_FFF1]
        );
        assert!(!up.contains(u32::MAX));
        assert!(up.contains(0x6_0010));
        assert_eq!(up.len(), b.len() - 1);

        let down = b.add_offset(-11);
        assert_eq!(down.first().unwrap(), 65_524);
        assert_eq!(down.last().unwrap(), u32::MAX - 11);

        let keys_only = b.add_offset(3 << 16);
        assert_eq!(keys_only.first().unwrap(), 3 << 16);
        assert_eq!(keys_only.len(), b.len() - 1);

        assert!(b.add_offset(1 << 40).is_empty());
        assert_eq!(b.add_offset(0), b);
    }

    #[test]
    fn test_or_not() {
        let a = RoaringBitmap::bitmap_of(&[1, 100]);
        let b = RoaringBitmap::bitmap_of(&[0, 2, 3, 50]);
        let out = a.or_not(&b, 5).unwrap();
        assert_eq!(out.to_vec(), vec![1, 4, 100]);

        let mut c = a.clone();
        c.or_not_inplace(&b, 5).unwrap();
        assert_eq!(c, out);

        assert_eq!(a.or_not(&b, 0).unwrap(), a);
        assert!(a.or_not(&b, (1 << 32) + 1).is_err());
        assert_eq!(a.or_not(&RoaringBitmap::new(), 1 << 32).unwrap().len(), 1 << 32);
    }
}
