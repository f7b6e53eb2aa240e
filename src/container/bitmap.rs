use super::array::ArrayContainer;
use super::run::{Run, RunContainer};
use super::{Container, ARRAY_MAX_SIZE, BITMAP_WORDS, MAX_CONTAINER_VALUES};
use crate::util;

/// Cached population count of a [`BitmapContainer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// Matches the popcount of the words.
    Valid(u32),
    /// Left stale by a lazy union; recomputed on demand.
    Dirty,
}

/// Dense 65536-bit vector.
///
/// Holds more than [`ARRAY_MAX_SIZE`] values outside of lazy unions.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BitmapContainer {
    words: Box<[u64; BITMAP_WORDS]>,
    cardinality: Cardinality,
}

impl Default for BitmapContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BitmapContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitmapContainer")
            .field("cardinality", &self.cardinality)
            .finish_non_exhaustive()
    }
}

#[inline]
fn word_and_bit(x: u16) -> (usize, u32) {
    (usize::from(x >> 6), u32::from(x & 63))
}

fn popcount(words: &[u64]) -> u32 {
    words.iter().map(|w| w.count_ones()).sum()
}

impl BitmapContainer {
    pub fn new() -> Self {
        Self {
            words: Box::new([0; BITMAP_WORDS]),
            cardinality: Cardinality::Valid(0),
        }
    }

    /// Wraps raw words, counting their bits.
    pub(crate) fn from_words(words: Box<[u64; BITMAP_WORDS]>) -> Self {
        let cardinality = Cardinality::Valid(popcount(&words[..]));
        Self { words, cardinality }
    }

    #[inline]
    pub fn words(&self) -> &[u64; BITMAP_WORDS] {
        &self.words
    }

    #[inline]
    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.cardinality == Cardinality::Dirty
    }

    /// Number of set bits. Recounts when the cached value is stale.
    pub fn len(&self) -> u32 {
        match self.cardinality {
            Cardinality::Valid(n) => n,
            Cardinality::Dirty => popcount(&self.words[..]),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self.cardinality {
            Cardinality::Valid(n) => n == 0,
            Cardinality::Dirty => self.words.iter().all(|&w| w == 0),
        }
    }

    /// Recomputes a stale cardinality.
    pub(crate) fn repair(&mut self) {
        if self.is_dirty() {
            self.recount();
        }
    }

    fn recount(&mut self) {
        self.cardinality = Cardinality::Valid(popcount(&self.words[..]));
    }

    #[inline]
    fn adjust(&mut self, delta: i64) {
        if let Cardinality::Valid(n) = &mut self.cardinality {
            *n = (i64::from(*n) + delta) as u32;
        }
    }

    #[inline]
    pub fn contains(&self, x: u16) -> bool {
        let (i, bit) = word_and_bit(x);
        self.words[i] >> bit & 1 == 1
    }

    /// Sets `x`, returning whether it was clear.
    #[inline]
    pub fn insert(&mut self, x: u16) -> bool {
        let (i, bit) = word_and_bit(x);
        let before = self.words[i];
        let after = before | (1 << bit);
        self.words[i] = after;
        let added = (before ^ after) >> bit;
        self.adjust(added as i64);
        added == 1
    }

    /// Clears `x`, returning whether it was set.
    #[inline]
    pub fn remove(&mut self, x: u16) -> bool {
        let (i, bit) = word_and_bit(x);
        let before = self.words[i];
        let after = before & !(1 << bit);
        self.words[i] = after;
        let removed = (before ^ after) >> bit;
        self.adjust(-(removed as i64));
        removed == 1
    }

    #[inline]
    pub fn flip(&mut self, x: u16) {
        let (i, bit) = word_and_bit(x);
        let before = self.words[i];
        self.words[i] = before ^ (1 << bit);
        // +1 when the bit was clear, -1 when it was set.
        self.adjust(1 - 2 * ((before >> bit) & 1) as i64);
    }

    pub(crate) fn insert_range(&mut self, start: u32, end: u32) {
        if start >= end {
            return;
        }
        let before = util::range_cardinality(&self.words[..], start, end);
        util::set_range(&mut self.words[..], start, end);
        self.adjust(i64::from(end - start - before));
    }

    pub(crate) fn remove_range(&mut self, start: u32, end: u32) {
        if start >= end {
            return;
        }
        let before = util::range_cardinality(&self.words[..], start, end);
        util::reset_range(&mut self.words[..], start, end);
        self.adjust(-i64::from(before));
    }

    pub(crate) fn flip_range(&mut self, start: u32, end: u32) {
        if start >= end {
            return;
        }
        let before = util::range_cardinality(&self.words[..], start, end);
        util::flip_range(&mut self.words[..], start, end);
        self.adjust(i64::from(end - start) - 2 * i64::from(before));
    }

    pub fn cardinality_in_range(&self, start: u32, end: u32) -> u32 {
        util::range_cardinality(&self.words[..], start, end)
    }

    pub fn contains_range(&self, start: u32, end: u32) -> bool {
        util::range_is_full(&self.words[..], start, end)
    }

    pub fn intersects_range(&self, start: u32, end: u32) -> bool {
        util::range_intersects(&self.words[..], start, end)
    }

    /// Complement within `[start, end)`.
    pub fn not(&self, start: u32, end: u32) -> Container {
        let mut out = self.clone();
        out.flip_range(start, end);
        out.into_array_if_sparse()
    }

    /// Number of values `<= x`.
    pub fn rank(&self, x: u16) -> u32 {
        let (i, bit) = word_and_bit(x);
        let mask = (2u64 << bit).wrapping_sub(1);
        popcount(&self.words[..i]) + (self.words[i] & mask).count_ones()
    }

    pub fn select(&self, j: u32) -> Option<u16> {
        let mut remaining = j;
        for (i, &w) in self.words.iter().enumerate() {
            let c = w.count_ones();
            if remaining < c {
                return Some((i as u32 * 64 + util::select_in_word(w, remaining)) as u16);
            }
            remaining -= c;
        }
        None
    }

    pub fn min(&self) -> Option<u16> {
        self.words
            .iter()
            .position(|&w| w != 0)
            .map(|i| (i as u32 * 64 + self.words[i].trailing_zeros()) as u16)
    }

    pub fn max(&self) -> Option<u16> {
        self.words
            .iter()
            .rposition(|&w| w != 0)
            .map(|i| (i as u32 * 64 + 63 - self.words[i].leading_zeros()) as u16)
    }

    pub fn next_value(&self, x: u16) -> Option<u16> {
        util::next_bit(&self.words[..], u32::from(x), true).map(|v| v as u16)
    }

    pub fn previous_value(&self, x: u16) -> Option<u16> {
        util::prev_bit(&self.words[..], u32::from(x), true).map(|v| v as u16)
    }

    pub fn next_absent_value(&self, x: u16) -> Option<u16> {
        util::next_bit(&self.words[..], u32::from(x), false).map(|v| v as u16)
    }

    pub fn previous_absent_value(&self, x: u16) -> Option<u16> {
        util::prev_bit(&self.words[..], u32::from(x), false).map(|v| v as u16)
    }

    pub fn iter(&self) -> BitmapIter<'_> {
        BitmapIter::new(&self.words)
    }

    /// Counts maximal runs of set bits, carrying across word boundaries.
    pub fn number_of_runs(&self) -> u32 {
        let mut carry = 0u64;
        let mut runs = 0;
        for &w in self.words.iter() {
            runs += (w & !((w << 1) | carry)).count_ones();
            carry = w >> 63;
        }
        runs
    }

    pub fn to_array(&self) -> ArrayContainer {
        let mut out = Vec::with_capacity(self.len() as usize);
        util::push_set_bits(&mut out, self.words.iter().copied());
        ArrayContainer::from_sorted_vec(out)
    }

    pub fn to_run(&self) -> RunContainer {
        let mut runs = Vec::with_capacity(self.number_of_runs() as usize);
        let last = BITMAP_WORDS - 1;
        let mut i = 0;
        let mut w = self.words[0];
        loop {
            while w == 0 && i < last {
                i += 1;
                w = self.words[i];
            }
            if w == 0 {
                break;
            }
            let start = i as u32 * 64 + w.trailing_zeros();
            // Fill below the lowest set bit so the run is a block of trailing ones.
            w |= w - 1;
            while w == u64::MAX && i < last {
                i += 1;
                w = self.words[i];
            }
            if w == u64::MAX {
                runs.push(Run::between(start as u16, (MAX_CONTAINER_VALUES - 1) as u16));
                break;
            }
            let end = i as u32 * 64 + (!w).trailing_zeros();
            w &= w + 1;
            runs.push(Run::between(start as u16, (end - 1) as u16));
        }
        RunContainer::from_runs(runs)
    }

    /// Converts to an array when at most [`ARRAY_MAX_SIZE`] values remain.
    pub(crate) fn into_array_if_sparse(mut self) -> Container {
        self.repair();
        if self.len() as usize <= ARRAY_MAX_SIZE {
            Container::Array(self.to_array())
        } else {
            Container::Bitmap(self)
        }
    }

    /// Values shifted up by `offset`, split into those still below 65536
    /// and those carried into the next key.
    pub(crate) fn add_offset(&self, offset: u16) -> (Container, Container) {
        fn or_into(low: &mut [u64], high: &mut [u64], i: usize, bits: u64) {
            match i.checked_sub(BITMAP_WORDS) {
                None => low[i] |= bits,
                Some(j) => high[j] |= bits,
            }
        }

        let word_shift = usize::from(offset >> 6);
        let bit_shift = u32::from(offset & 63);
        let mut low = Box::new([0u64; BITMAP_WORDS]);
        let mut high = Box::new([0u64; BITMAP_WORDS]);
        for (i, &w) in self.words.iter().enumerate() {
            if w == 0 {
                continue;
            }
            let i = i + word_shift;
            or_into(&mut low[..], &mut high[..], i, w << bit_shift);
            if bit_shift != 0 {
                or_into(&mut low[..], &mut high[..], i + 1, w >> (64 - bit_shift));
            }
        }
        (
            Self::from_words(low).into_array_if_sparse(),
            Self::from_words(high).into_array_if_sparse(),
        )
    }

    pub(crate) fn limit(&self, max_cardinality: u32) -> Container {
        if max_cardinality >= self.len() {
            return Container::Bitmap(self.clone());
        }
        match self.select(max_cardinality) {
            Some(cut) => {
                let mut out = self.clone();
                out.remove_range(u32::from(cut), MAX_CONTAINER_VALUES);
                out.into_array_if_sparse()
            }
            None => Container::Bitmap(self.clone()),
        }
    }

    // =========================================================================
    // Pairwise operations
    // =========================================================================

    pub fn and_bitmap(&self, other: &BitmapContainer) -> Container {
        let count: u32 = self
            .words
            .iter()
            .zip(other.words.iter())
            .map(|(a, b)| (a & b).count_ones())
            .sum();
        let anded = self.words.iter().zip(other.words.iter()).map(|(a, b)| a & b);
        if count as usize > ARRAY_MAX_SIZE {
            let mut words = Box::new([0u64; BITMAP_WORDS]);
            for (slot, w) in words.iter_mut().zip(anded) {
                *slot = w;
            }
            return Container::Bitmap(Self {
                words,
                cardinality: Cardinality::Valid(count),
            });
        }
        let mut out = Vec::with_capacity(count as usize);
        util::push_set_bits(&mut out, anded);
        Container::Array(ArrayContainer::from_sorted_vec(out))
    }

    pub fn and_run(&self, other: &RunContainer) -> Container {
        let mut out = self.clone();
        out.iand_run(other);
        out.into_array_if_sparse()
    }

    pub fn and_cardinality_bitmap(&self, other: &BitmapContainer) -> u32 {
        self.words
            .iter()
            .zip(other.words.iter())
            .map(|(a, b)| (a & b).count_ones())
            .sum()
    }

    pub fn intersects_bitmap(&self, other: &BitmapContainer) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .any(|(a, b)| a & b != 0)
    }

    pub(crate) fn iand_bitmap(&mut self, other: &BitmapContainer) {
        for (a, b) in self.words.iter_mut().zip(other.words.iter()) {
            *a &= b;
        }
        self.recount();
    }

    /// Clears every gap between the runs.
    pub(crate) fn iand_run(&mut self, other: &RunContainer) {
        let mut prev = 0;
        for run in other.runs() {
            self.remove_range(prev, u32::from(run.start));
            prev = run.stop();
        }
        self.remove_range(prev, MAX_CONTAINER_VALUES);
    }

    pub(crate) fn ior_bitmap(&mut self, other: &BitmapContainer) {
        for (a, b) in self.words.iter_mut().zip(other.words.iter()) {
            *a |= b;
        }
        self.recount();
    }

    pub(crate) fn ior_array(&mut self, other: &ArrayContainer) {
        for v in other.iter() {
            self.insert(v);
        }
    }

    pub(crate) fn ior_run(&mut self, other: &RunContainer) {
        for run in other.runs() {
            self.insert_range(u32::from(run.start), run.stop());
        }
    }

    pub(crate) fn ixor_bitmap(&mut self, other: &BitmapContainer) {
        for (a, b) in self.words.iter_mut().zip(other.words.iter()) {
            *a ^= b;
        }
        self.recount();
    }

    pub(crate) fn ixor_array(&mut self, other: &ArrayContainer) {
        for v in other.iter() {
            self.flip(v);
        }
    }

    pub(crate) fn ixor_run(&mut self, other: &RunContainer) {
        for run in other.runs() {
            self.flip_range(u32::from(run.start), run.stop());
        }
    }

    pub(crate) fn iand_not_bitmap(&mut self, other: &BitmapContainer) {
        for (a, b) in self.words.iter_mut().zip(other.words.iter()) {
            *a &= !b;
        }
        self.recount();
    }

    pub(crate) fn iand_not_array(&mut self, other: &ArrayContainer) {
        for v in other.iter() {
            self.remove(v);
        }
    }

    pub(crate) fn iand_not_run(&mut self, other: &RunContainer) {
        for run in other.runs() {
            self.remove_range(u32::from(run.start), run.stop());
        }
    }

    /// Unions without maintaining the cardinality.
    pub(crate) fn lazy_ior_bitmap(&mut self, other: &BitmapContainer) {
        for (a, b) in self.words.iter_mut().zip(other.words.iter()) {
            *a |= b;
        }
        self.cardinality = Cardinality::Dirty;
    }

    pub(crate) fn lazy_ior_array(&mut self, other: &ArrayContainer) {
        for v in other.iter() {
            let (i, bit) = word_and_bit(v);
            self.words[i] |= 1 << bit;
        }
        self.cardinality = Cardinality::Dirty;
    }

    pub(crate) fn lazy_ior_run(&mut self, other: &RunContainer) {
        for run in other.runs() {
            util::set_range(&mut self.words[..], u32::from(run.start), run.stop());
        }
        self.cardinality = Cardinality::Dirty;
    }
}

/// Ascending or descending walk over the set bits of a bitmap.
///
/// The front and back cursors each own a partially consumed word. Once they
/// land on the same word the back copy is authoritative.
#[derive(Clone, Debug)]
pub struct BitmapIter<'a> {
    words: &'a [u64; BITMAP_WORDS],
    front_index: usize,
    front_word: u64,
    back_index: usize,
    back_word: u64,
}

impl<'a> BitmapIter<'a> {
    fn new(words: &'a [u64; BITMAP_WORDS]) -> Self {
        Self {
            words,
            front_index: 0,
            front_word: words[0],
            back_index: BITMAP_WORDS - 1,
            back_word: words[BITMAP_WORDS - 1],
        }
    }
}

impl Iterator for BitmapIter<'_> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        loop {
            if self.front_index == self.back_index {
                if self.back_word == 0 {
                    return None;
                }
                let bit = self.back_word.trailing_zeros();
                self.back_word &= self.back_word - 1;
                return Some((self.back_index as u32 * 64 + bit) as u16);
            }
            if self.front_word != 0 {
                let bit = self.front_word.trailing_zeros();
                self.front_word &= self.front_word - 1;
                return Some((self.front_index as u32 * 64 + bit) as u16);
            }
            self.front_index += 1;
            if self.front_index < self.back_index {
                self.front_word = self.words[self.front_index];
            }
        }
    }
}

impl DoubleEndedIterator for BitmapIter<'_> {
    fn next_back(&mut self) -> Option<u16> {
        loop {
            if self.back_word != 0 {
                let bit = 63 - self.back_word.leading_zeros();
                self.back_word &= !(1 << bit);
                return Some((self.back_index as u32 * 64 + bit) as u16);
            }
            if self.back_index == self.front_index {
                return None;
            }
            self.back_index -= 1;
            self.back_word = if self.back_index == self.front_index {
                self.front_word
            } else {
                self.words[self.back_index]
            };
        }
    }
}

impl std::iter::FusedIterator for BitmapIter<'_> {}
