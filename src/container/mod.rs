//! The three encodings of a 16-bit slice of the value space and the dispatch
//! between them.
//!
//! A [`Container`] holds the low 16 bits of every value sharing one key. It
//! starts as an [`ArrayContainer`], becomes a [`BitmapContainer`] once it
//! holds more than [`ARRAY_MAX_SIZE`] values, and switches to a
//! [`RunContainer`] when [`Container::run_optimize`] finds runs smaller.

use std::mem;
use std::slice;

use crate::error::{check_range, Error, Result};

pub mod array;
pub mod bitmap;
pub mod run;

pub use array::ArrayContainer;
pub use bitmap::{BitmapContainer, BitmapIter, Cardinality};
pub use run::{Run, RunContainer, RunIter};

// =============================================================================
// Configuration
// =============================================================================

/// Largest cardinality stored as a sorted array.
pub const ARRAY_MAX_SIZE: usize = 4096;

/// Number of 64-bit words in a bitmap container.
pub const BITMAP_WORDS: usize = 1024;

/// Size of the value domain of one container.
pub const MAX_CONTAINER_VALUES: u32 = 1 << 16;

/// Serialized size of a bitmap body in bytes.
pub const BITMAP_SERIALIZED_SIZE: usize = BITMAP_WORDS * 8;

/// Size of `cardinality` values stored as an array, as weighed against the
/// other encodings.
#[inline]
pub(crate) const fn array_size_for(cardinality: u32) -> usize {
    2 + 2 * cardinality as usize
}

/// Serialized size of `runs` runs, including the count prefix.
#[inline]
pub(crate) const fn run_size_for(runs: u32) -> usize {
    2 + 4 * runs as usize
}

// =============================================================================
// Container
// =============================================================================

/// One 16-bit slice of a bitmap in whichever encoding currently suits it.
#[derive(Clone, Debug)]
pub enum Container {
    Array(ArrayContainer),
    Bitmap(BitmapContainer),
    Run(RunContainer),
}

impl Default for Container {
    fn default() -> Self {
        Container::Array(ArrayContainer::new())
    }
}

impl PartialEq for Container {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Container::Array(a), Container::Array(b)) => a.as_slice() == b.as_slice(),
            (Container::Bitmap(a), Container::Bitmap(b)) => a.words() == b.words(),
            (Container::Run(a), Container::Run(b)) => a.runs() == b.runs(),
            _ => self.len() == other.len() && self.iter().eq(other.iter()),
        }
    }
}

impl Eq for Container {}

fn validate(start: u32, stop: u32) -> Result<()> {
    check_range(u64::from(start), u64::from(stop), u64::from(MAX_CONTAINER_VALUES))
}

impl Container {
    /// Every value in `[start, stop)`, in the smallest encoding.
    pub fn range_of_ones(start: u32, stop: u32) -> Result<Container> {
        validate(start, stop)?;
        Ok(Self::ones(start, stop))
    }

    /// [`Container::range_of_ones`] for bounds already validated.
    pub(crate) fn ones(start: u32, stop: u32) -> Container {
        RunContainer::from_range(start, stop).to_efficient_container()
    }

    /// Replaces `self` with `f(self)`.
    pub(crate) fn replace_with(&mut self, f: impl FnOnce(Container) -> Container) {
        let taken = mem::take(self);
        *self = f(taken);
    }

    pub fn len(&self) -> u32 {
        match self {
            Container::Array(a) => a.len(),
            Container::Bitmap(b) => b.len(),
            Container::Run(r) => r.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Container::Array(a) => a.is_empty(),
            Container::Bitmap(b) => b.is_empty(),
            Container::Run(r) => r.is_empty(),
        }
    }

    pub fn is_full(&self) -> bool {
        match self {
            Container::Run(r) => r.is_full(),
            other => other.len() == MAX_CONTAINER_VALUES,
        }
    }

    #[inline]
    pub fn contains(&self, x: u16) -> bool {
        match self {
            Container::Array(a) => a.contains(x),
            Container::Bitmap(b) => b.contains(x),
            Container::Run(r) => r.contains(x),
        }
    }

    /// Adds `x`, returning whether it was absent.
    pub fn add(&mut self, x: u16) -> bool {
        match self {
            Container::Array(a) if a.len() as usize >= ARRAY_MAX_SIZE => {
                if a.contains(x) {
                    return false;
                }
                let mut bitmap = a.to_bitmap();
                bitmap.insert(x);
                *self = Container::Bitmap(bitmap);
                true
            }
            Container::Array(a) => a.insert(x),
            Container::Bitmap(b) => b.insert(x),
            Container::Run(r) => r.insert(x),
        }
    }

    /// Removes `x`, returning whether it was present.
    pub fn remove(&mut self, x: u16) -> bool {
        match self {
            Container::Array(a) => a.remove(x),
            Container::Bitmap(b) => {
                let removed = b.remove(x);
                if removed && b.len() as usize <= ARRAY_MAX_SIZE {
                    *self = Container::Array(b.to_array());
                }
                removed
            }
            Container::Run(r) => r.remove(x),
        }
    }

    pub fn add_range(&mut self, start: u32, stop: u32) -> Result<()> {
        validate(start, stop)?;
        self.add_range_unchecked(start, stop);
        Ok(())
    }

    pub fn remove_range(&mut self, start: u32, stop: u32) -> Result<()> {
        validate(start, stop)?;
        self.remove_range_unchecked(start, stop);
        Ok(())
    }

    pub fn flip_range(&mut self, start: u32, stop: u32) -> Result<()> {
        validate(start, stop)?;
        self.flip_range_unchecked(start, stop);
        Ok(())
    }

    pub(crate) fn add_range_unchecked(&mut self, start: u32, stop: u32) {
        if start >= stop {
            return;
        }
        match self {
            Container::Array(a) => {
                let taken = mem::take(a);
                *self = taken.add_range(start, stop);
            }
            Container::Bitmap(b) => b.insert_range(start, stop),
            Container::Run(r) => r.insert_range(start, stop),
        }
    }

    pub(crate) fn remove_range_unchecked(&mut self, start: u32, stop: u32) {
        if start >= stop {
            return;
        }
        match self {
            Container::Array(a) => a.remove_range(start, stop),
            Container::Bitmap(b) => {
                b.remove_range(start, stop);
                if b.len() as usize <= ARRAY_MAX_SIZE {
                    *self = Container::Array(b.to_array());
                }
            }
            Container::Run(r) => r.remove_range(start, stop),
        }
    }

    pub(crate) fn flip_range_unchecked(&mut self, start: u32, stop: u32) {
        if start >= stop {
            return;
        }
        match self {
            Container::Array(a) => *self = a.not(start, stop),
            Container::Bitmap(b) => {
                b.flip_range(start, stop);
                if b.len() as usize <= ARRAY_MAX_SIZE {
                    *self = Container::Array(b.to_array());
                }
            }
            Container::Run(r) => r.flip_range(start, stop),
        }
    }

    /// Copy of `self` with `[start, stop)` complemented.
    pub fn not(&self, start: u32, stop: u32) -> Result<Container> {
        validate(start, stop)?;
        if start == stop {
            return Ok(self.clone());
        }
        Ok(match self {
            Container::Array(a) => a.not(start, stop),
            Container::Bitmap(b) => b.not(start, stop),
            Container::Run(r) => r.not(start, stop),
        })
    }

    /// Whether every value of `[start, stop)` is present. Bounds past the
    /// domain are clamped.
    pub fn contains_range(&self, start: u32, stop: u32) -> bool {
        let stop = stop.min(MAX_CONTAINER_VALUES);
        if start >= stop {
            return true;
        }
        match self {
            Container::Array(a) => a.contains_range(start, stop),
            Container::Bitmap(b) => b.contains_range(start, stop),
            Container::Run(r) => r.contains_range(start, stop),
        }
    }

    pub fn intersects_range(&self, start: u32, stop: u32) -> bool {
        let stop = stop.min(MAX_CONTAINER_VALUES);
        if start >= stop {
            return false;
        }
        match self {
            Container::Array(a) => a.intersects_range(start, stop),
            Container::Bitmap(b) => b.intersects_range(start, stop),
            Container::Run(r) => r.intersects_range(start, stop),
        }
    }

    pub fn cardinality_in_range(&self, start: u32, stop: u32) -> u32 {
        let stop = stop.min(MAX_CONTAINER_VALUES);
        if start >= stop {
            return 0;
        }
        match self {
            Container::Array(a) => a.cardinality_in_range(start, stop),
            Container::Bitmap(b) => b.cardinality_in_range(start, stop),
            Container::Run(r) => r.cardinality_in_range(start, stop),
        }
    }

    /// Number of values `<= x`.
    pub fn rank(&self, x: u16) -> u32 {
        match self {
            Container::Array(a) => a.rank(x),
            Container::Bitmap(b) => b.rank(x),
            Container::Run(r) => r.rank(x),
        }
    }

    /// The `j`-th smallest value, zero-based.
    pub fn select(&self, j: u32) -> Result<u16> {
        let found = match self {
            Container::Array(a) => a.select(j),
            Container::Bitmap(b) => b.select(j),
            Container::Run(r) => r.select(j),
        };
        found.ok_or_else(|| Error::SelectOutOfBounds {
            index: u64::from(j),
            cardinality: u64::from(self.len()),
        })
    }

    pub fn first(&self) -> Result<u16> {
        match self {
            Container::Array(a) => a.min(),
            Container::Bitmap(b) => b.min(),
            Container::Run(r) => r.min(),
        }
        .ok_or(Error::Empty)
    }

    pub fn last(&self) -> Result<u16> {
        match self {
            Container::Array(a) => a.max(),
            Container::Bitmap(b) => b.max(),
            Container::Run(r) => r.max(),
        }
        .ok_or(Error::Empty)
    }

    /// Smallest value `>= x`.
    pub fn next_value(&self, x: u16) -> Option<u16> {
        match self {
            Container::Array(a) => a.next_value(x),
            Container::Bitmap(b) => b.next_value(x),
            Container::Run(r) => r.next_value(x),
        }
    }

    /// Largest value `<= x`.
    pub fn previous_value(&self, x: u16) -> Option<u16> {
        match self {
            Container::Array(a) => a.previous_value(x),
            Container::Bitmap(b) => b.previous_value(x),
            Container::Run(r) => r.previous_value(x),
        }
    }

    /// Smallest absent value `>= x`.
    pub fn next_absent_value(&self, x: u16) -> Option<u16> {
        match self {
            Container::Array(a) => a.next_absent_value(x),
            Container::Bitmap(b) => b.next_absent_value(x),
            Container::Run(r) => r.next_absent_value(x),
        }
    }

    /// Largest absent value `<= x`.
    pub fn previous_absent_value(&self, x: u16) -> Option<u16> {
        match self {
            Container::Array(a) => a.previous_absent_value(x),
            Container::Bitmap(b) => b.previous_absent_value(x),
            Container::Run(r) => r.previous_absent_value(x),
        }
    }

    /// Values shifted up by `offset`, as the part staying under this key and
    /// the part carried into the next one. Either may be empty.
    pub(crate) fn add_offset(&self, offset: u16) -> (Container, Container) {
        match self {
            Container::Array(a) => a.add_offset(offset),
            Container::Bitmap(b) => b.add_offset(offset),
            Container::Run(r) => r.add_offset(offset),
        }
    }

    pub fn iter(&self) -> ContainerIter<'_> {
        match self {
            Container::Array(a) => ContainerIter::Array(a.as_slice().iter()),
            Container::Bitmap(b) => ContainerIter::Bitmap(b.iter()),
            Container::Run(r) => ContainerIter::Run(r.iter()),
        }
    }

    pub fn number_of_runs(&self) -> u32 {
        match self {
            Container::Array(a) => a.number_of_runs(),
            Container::Bitmap(b) => b.number_of_runs(),
            Container::Run(r) => r.number_of_runs(),
        }
    }

    pub fn is_run(&self) -> bool {
        matches!(self, Container::Run(_))
    }

    /// Converts to runs where strictly smaller, and re-evaluates run
    /// containers. Returns whether the container ends up run encoded.
    pub fn run_optimize(&mut self) -> bool {
        match self {
            Container::Array(a) => {
                if run_size_for(a.number_of_runs()) < array_size_for(a.len()) {
                    *self = Container::Run(a.to_run());
                }
            }
            Container::Bitmap(b) => {
                if run_size_for(b.number_of_runs()) < BITMAP_SERIALIZED_SIZE {
                    *self = Container::Run(b.to_run());
                }
            }
            Container::Run(r) => {
                let taken = mem::take(r);
                *self = taken.to_efficient_container();
            }
        }
        self.is_run()
    }

    /// Converts a run container back to an array or bitmap. Returns whether
    /// anything changed.
    pub fn remove_run_compression(&mut self) -> bool {
        let Container::Run(r) = self else {
            return false;
        };
        *self = if r.len() as usize <= ARRAY_MAX_SIZE {
            Container::Array(r.to_array())
        } else {
            Container::Bitmap(r.to_bitmap())
        };
        true
    }

    /// The smallest `max_cardinality` values.
    pub fn limit(&self, max_cardinality: u32) -> Container {
        match self {
            Container::Array(a) => Container::Array(a.limit(max_cardinality)),
            Container::Bitmap(b) => b.limit(max_cardinality),
            Container::Run(r) => Container::Run(r.limit(max_cardinality)),
        }
    }

    /// Size of the body in the portable format.
    pub fn serialized_size_in_bytes(&self) -> usize {
        match self {
            Container::Array(a) => 2 * a.len() as usize,
            Container::Bitmap(_) => BITMAP_SERIALIZED_SIZE,
            Container::Run(r) => run_size_for(r.number_of_runs()),
        }
    }

    /// Approximate heap and inline footprint.
    pub fn size_in_bytes(&self) -> usize {
        mem::size_of::<Container>()
            + match self {
                Container::Array(a) => a.capacity() * mem::size_of::<u16>(),
                Container::Bitmap(_) => BITMAP_SERIALIZED_SIZE,
                Container::Run(r) => r.capacity() * mem::size_of::<Run>(),
            }
    }

    pub fn shrink_to_fit(&mut self) {
        match self {
            Container::Array(a) => a.shrink_to_fit(),
            Container::Bitmap(_) => {}
            Container::Run(r) => r.shrink_to_fit(),
        }
    }

    // =========================================================================
    // Binary operations
    // =========================================================================

    pub fn and(&self, other: &Container) -> Container {
        use Container::{Array, Bitmap, Run};
        match (self, other) {
            (Array(a), Array(b)) => a.and_array(b),
            (Array(a), Bitmap(b)) | (Bitmap(b), Array(a)) => a.and_bitmap(b),
            (Array(a), Run(r)) | (Run(r), Array(a)) => a.and_run(r),
            (Bitmap(a), Bitmap(b)) => a.and_bitmap(b),
            (Bitmap(b), Run(r)) | (Run(r), Bitmap(b)) => b.and_run(r),
            (Run(a), Run(b)) => a.and_run(b),
        }
    }

    pub fn or(&self, other: &Container) -> Container {
        use Container::{Array, Bitmap, Run};
        match (self, other) {
            (Array(a), Array(b)) => a.or_array(b),
            (Array(a), Bitmap(b)) | (Bitmap(b), Array(a)) => a.or_bitmap(b),
            (Array(a), Run(r)) | (Run(r), Array(a)) => r.or_array(a),
            (Bitmap(a), Bitmap(b)) => {
                let mut out = a.clone();
                out.ior_bitmap(b);
                Bitmap(out)
            }
            (Bitmap(b), Run(r)) | (Run(r), Bitmap(b)) => r.or_bitmap(b),
            (Run(a), Run(b)) => a.or_run(b),
        }
    }

    pub fn xor(&self, other: &Container) -> Container {
        use Container::{Array, Bitmap, Run};
        match (self, other) {
            (Array(a), Array(b)) => a.xor_array(b),
            (Array(a), Bitmap(b)) | (Bitmap(b), Array(a)) => a.xor_bitmap(b),
            (Array(a), Run(r)) | (Run(r), Array(a)) => r.xor_array(a),
            (Bitmap(a), Bitmap(b)) => {
                let mut out = a.clone();
                out.ixor_bitmap(b);
                out.into_array_if_sparse()
            }
            (Bitmap(b), Run(r)) | (Run(r), Bitmap(b)) => r.xor_bitmap(b),
            (Run(a), Run(b)) => a.xor_run(b),
        }
    }

    pub fn and_not(&self, other: &Container) -> Container {
        use Container::{Array, Bitmap, Run};
        match (self, other) {
            (Array(a), Array(b)) => a.and_not_array(b),
            (Array(a), Bitmap(b)) => a.and_not_bitmap(b),
            (Array(a), Run(r)) => a.and_not_run(r),
            (Bitmap(a), Array(b)) => {
                let mut out = a.clone();
                out.iand_not_array(b);
                out.into_array_if_sparse()
            }
            (Bitmap(a), Bitmap(b)) => {
                let mut out = a.clone();
                out.iand_not_bitmap(b);
                out.into_array_if_sparse()
            }
            (Bitmap(a), Run(r)) => {
                let mut out = a.clone();
                out.iand_not_run(r);
                out.into_array_if_sparse()
            }
            (Run(r), Array(b)) => r.and_not_array(b),
            (Run(r), Bitmap(b)) => r.and_not_bitmap(b),
            (Run(a), Run(b)) => a.and_not_run(b),
        }
    }

    /// In-place intersection. The returned container replaces `self`.
    pub fn iand(self, other: &Container) -> Container {
        use Container::{Array, Bitmap, Run};
        match (self, other) {
            (Bitmap(mut a), Bitmap(b)) => {
                a.iand_bitmap(b);
                a.into_array_if_sparse()
            }
            (Bitmap(mut a), Run(r)) => {
                a.iand_run(r);
                a.into_array_if_sparse()
            }
            (Array(mut a), Bitmap(b)) => {
                a.retain(|v| b.contains(v));
                Array(a)
            }
            (Array(mut a), Run(r)) => {
                a.retain(|v| r.contains(v));
                Array(a)
            }
            (lhs, rhs) => lhs.and(rhs),
        }
    }

    /// In-place union. The returned container replaces `self`.
    pub fn ior(self, other: &Container) -> Container {
        use Container::{Array, Bitmap, Run};
        match (self, other) {
            (Bitmap(mut a), Array(b)) => {
                a.ior_array(b);
                Bitmap(a)
            }
            (Bitmap(mut a), Bitmap(b)) => {
                a.ior_bitmap(b);
                Bitmap(a)
            }
            (Bitmap(mut a), Run(r)) if !r.is_full() => {
                a.ior_run(r);
                Bitmap(a)
            }
            (Run(r), _) if r.is_full() => Run(r),
            (lhs, rhs) => lhs.or(rhs),
        }
    }

    /// In-place symmetric difference. The returned container replaces `self`.
    pub fn ixor(self, other: &Container) -> Container {
        use Container::{Array, Bitmap, Run};
        match (self, other) {
            (Bitmap(mut a), Array(b)) => {
                a.ixor_array(b);
                a.into_array_if_sparse()
            }
            (Bitmap(mut a), Bitmap(b)) => {
                a.ixor_bitmap(b);
                a.into_array_if_sparse()
            }
            (Bitmap(mut a), Run(r)) => {
                a.ixor_run(r);
                a.into_array_if_sparse()
            }
            (lhs, rhs) => lhs.xor(rhs),
        }
    }

    /// In-place difference. The returned container replaces `self`.
    pub fn iand_not(self, other: &Container) -> Container {
        use Container::{Array, Bitmap, Run};
        match (self, other) {
            (Bitmap(mut a), Array(b)) => {
                a.iand_not_array(b);
                a.into_array_if_sparse()
            }
            (Bitmap(mut a), Bitmap(b)) => {
                a.iand_not_bitmap(b);
                a.into_array_if_sparse()
            }
            (Bitmap(mut a), Run(r)) => {
                a.iand_not_run(r);
                a.into_array_if_sparse()
            }
            (Array(mut a), Bitmap(b)) => {
                a.retain(|v| !b.contains(v));
                Array(a)
            }
            (lhs, rhs) => lhs.and_not(rhs),
        }
    }

    /// Union that may leave a bitmap result with a stale cardinality.
    /// Finish with [`Container::repair_after_lazy`].
    pub fn lazy_or(&self, other: &Container) -> Container {
        use Container::{Array, Bitmap, Run};
        match (self, other) {
            (Array(a), Array(b)) => a.lazy_or_array(b),
            (Array(a), Bitmap(b)) | (Bitmap(b), Array(a)) => {
                let mut out = b.clone();
                out.lazy_ior_array(a);
                Bitmap(out)
            }
            (Array(a), Run(r)) | (Run(r), Array(a)) => r.lazy_or_array(a),
            (Bitmap(a), Bitmap(b)) => {
                let mut out = a.clone();
                out.lazy_ior_bitmap(b);
                Bitmap(out)
            }
            (Bitmap(_), Run(r)) | (Run(r), Bitmap(_)) if r.is_full() => Run(r.clone()),
            (Bitmap(b), Run(r)) | (Run(r), Bitmap(b)) => {
                let mut out = b.clone();
                out.lazy_ior_run(r);
                Bitmap(out)
            }
            (Run(a), Run(b)) => a.lazy_or_run(b),
        }
    }

    /// In-place [`Container::lazy_or`].
    pub fn lazy_ior(self, other: &Container) -> Container {
        use Container::{Array, Bitmap, Run};
        match (self, other) {
            (Bitmap(mut a), Array(b)) => {
                a.lazy_ior_array(b);
                Bitmap(a)
            }
            (Bitmap(mut a), Bitmap(b)) => {
                a.lazy_ior_bitmap(b);
                Bitmap(a)
            }
            (Bitmap(mut a), Run(r)) if !r.is_full() => {
                a.lazy_ior_run(r);
                Bitmap(a)
            }
            (Run(r), _) if r.is_full() => Run(r),
            (lhs, rhs) => lhs.lazy_or(rhs),
        }
    }

    /// Restores an exact cardinality and re-selects the encoding after a
    /// sequence of lazy unions.
    pub fn repair_after_lazy(self) -> Container {
        match self {
            Container::Bitmap(b) => b.into_array_if_sparse(),
            Container::Run(r) => r.to_efficient_container(),
            array => array,
        }
    }

    pub fn and_cardinality(&self, other: &Container) -> u32 {
        use Container::{Array, Bitmap, Run};
        match (self, other) {
            (Array(a), Array(b)) => a.and_cardinality_array(b),
            (Array(a), Bitmap(b)) | (Bitmap(b), Array(a)) => {
                a.iter().filter(|&v| b.contains(v)).count() as u32
            }
            (Array(a), Run(r)) | (Run(r), Array(a)) => r.count_covered(a.as_slice()),
            (Bitmap(a), Bitmap(b)) => a.and_cardinality_bitmap(b),
            (Bitmap(b), Run(r)) | (Run(r), Bitmap(b)) => r
                .runs()
                .iter()
                .map(|run| b.cardinality_in_range(u32::from(run.start), run.stop()))
                .sum(),
            (Run(a), Run(b)) => a.and_cardinality_run(b),
        }
    }

    /// Whether every value of `self` is in `other`.
    pub fn is_subset(&self, other: &Container) -> bool {
        use Container::{Array, Bitmap, Run};
        if self.len() > other.len() {
            return false;
        }
        match (self, other) {
            (Array(a), _) => a.iter().all(|v| other.contains(v)),
            (Run(r), _) => r
                .runs()
                .iter()
                .all(|run| other.contains_range(u32::from(run.start), run.stop())),
            (Bitmap(a), Bitmap(b)) => a.words().iter().zip(b.words().iter()).all(|(x, y)| x & !y == 0),
            (Bitmap(_), _) => self.and_cardinality(other) == self.len(),
        }
    }

    pub fn intersects(&self, other: &Container) -> bool {
        use Container::{Array, Bitmap, Run};
        match (self, other) {
            (Array(a), Array(b)) => a.intersects_array(b),
            (Array(a), Bitmap(b)) | (Bitmap(b), Array(a)) => a.iter().any(|v| b.contains(v)),
            (Array(a), Run(r)) | (Run(r), Array(a)) => a.iter().any(|v| r.contains(v)),
            (Bitmap(a), Bitmap(b)) => a.intersects_bitmap(b),
            (Bitmap(b), Run(r)) | (Run(r), Bitmap(b)) => r
                .runs()
                .iter()
                .any(|run| b.intersects_range(u32::from(run.start), run.stop())),
            (Run(a), Run(b)) => a.intersects_run(b),
        }
    }
}

/// Values of a [`Container`] in ascending order, or descending from the back.
#[derive(Clone, Debug)]
pub enum ContainerIter<'a> {
    Array(slice::Iter<'a, u16>),
    Bitmap(BitmapIter<'a>),
    Run(RunIter<'a>),
}

impl Iterator for ContainerIter<'_> {
    type Item = u16;

    #[inline]
    fn next(&mut self) -> Option<u16> {
        match self {
            ContainerIter::Array(it) => it.next().copied(),
            ContainerIter::Bitmap(it) => it.next(),
            ContainerIter::Run(it) => it.next(),
        }
    }
}

impl DoubleEndedIterator for ContainerIter<'_> {
    #[inline]
    fn next_back(&mut self) -> Option<u16> {
        match self {
            ContainerIter::Array(it) => it.next_back().copied(),
            ContainerIter::Bitmap(it) => it.next_back(),
            ContainerIter::Run(it) => it.next_back(),
        }
    }
}

impl ContainerIter<'_> {
    /// Drops values below `min` from the front, returning how many.
    pub(crate) fn skip_below(&mut self, min: u16) -> u32 {
        if let ContainerIter::Array(it) = self {
            let rest = it.as_slice();
            let skipped = rest.partition_point(|&v| v < min);
            *it = rest[skipped..].iter();
            return skipped as u32;
        }
        let mut skipped = 0;
        loop {
            let mut ahead = self.clone();
            match ahead.next() {
                Some(v) if v < min => {
                    *self = ahead;
                    skipped += 1;
                }
                _ => return skipped,
            }
        }
    }
}

impl std::iter::FusedIterator for ContainerIter<'_> {}
