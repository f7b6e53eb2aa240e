use std::iter::FusedIterator;

use crate::container::ContainerIter;
use crate::index::RoaringArray;
use crate::util::{high_bits, join, low_bits};

/// Ascending iterator over the values of a [`RoaringBitmap`](crate::RoaringBitmap).
///
/// Also walks backwards; the two ends never yield the same value twice.
#[derive(Clone)]
pub struct Iter<'a> {
    index: &'a RoaringArray,
    /// Next container for the front cursor.
    next: usize,
    /// One past the next container for the back cursor.
    end: usize,
    front: Option<(u16, ContainerIter<'a>)>,
    back: Option<(u16, ContainerIter<'a>)>,
    remaining: u64,
}

impl<'a> Iter<'a> {
    pub(crate) fn new(index: &'a RoaringArray) -> Self {
        Self {
            index,
            next: 0,
            end: index.len(),
            front: None,
            back: None,
            remaining: index.cardinality(),
        }
    }

    fn open(&self, i: usize) -> (u16, ContainerIter<'a>) {
        (self.index.key_at(i), self.index.container_at(i).iter())
    }

    /// Skips ahead so that the next value yielded is the first one `>= min`.
    /// Never moves backwards.
    pub fn advance_to(&mut self, min: u32) {
        let (hb, lb) = (high_bits(min), low_bits(min));
        if let Some((key, it)) = &mut self.front {
            if *key < hb {
                self.remaining -= it.by_ref().count() as u64;
                self.front = None;
            }
        }
        if self.front.is_none() {
            let target = self.index.advance_until(hb, self.next).min(self.end);
            self.remaining -= self.index.containers()[self.next..target]
                .iter()
                .map(|c| u64::from(c.len()))
                .sum::<u64>();
            self.next = target;
            if self.next < self.end {
                self.front = Some(self.open(self.next));
                self.next += 1;
            } else if let Some((key, it)) = &mut self.back {
                if *key < hb {
                    self.remaining -= it.by_ref().count() as u64;
                    self.back = None;
                }
            }
        }
        let cursor = if self.front.is_some() {
            &mut self.front
        } else {
            &mut self.back
        };
        if let Some((key, it)) = cursor {
            if *key == hb {
                self.remaining -= u64::from(it.skip_below(lb));
            }
        }
    }

    /// Fills `buf` with the next values, returning how many were written.
    /// Fewer than `buf.len()` means the iterator is exhausted.
    pub fn next_batch(&mut self, buf: &mut [u32]) -> usize {
        let mut n = 0;
        while n < buf.len() {
            let Some((key, it)) = self.front.as_mut() else {
                if self.next == self.end {
                    break;
                }
                self.front = Some(self.open(self.next));
                self.next += 1;
                continue;
            };
            let key = *key;
            let before = n;
            for (slot, low) in buf[n..].iter_mut().zip(it.by_ref()) {
                *slot = join(key, low);
                n += 1;
            }
            self.remaining -= (n - before) as u64;
            if n < buf.len() {
                self.front = None;
            }
        }
        // The back cursor may still hold values once the containers run out.
        while n < buf.len() {
            match self.next() {
                Some(x) => {
                    buf[n] = x;
                    n += 1;
                }
                None => break,
            }
        }
        n
    }
}

impl Iterator for Iter<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        loop {
            if let Some((key, it)) = &mut self.front {
                if let Some(low) = it.next() {
                    self.remaining -= 1;
                    return Some(join(*key, low));
                }
            }
            if self.next < self.end {
                self.front = Some(self.open(self.next));
                self.next += 1;
                continue;
            }
            let (key, it) = self.back.as_mut()?;
            let low = it.next()?;
            self.remaining -= 1;
            return Some(join(*key, low));
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match usize::try_from(self.remaining) {
            Ok(n) => (n, Some(n)),
            Err(_) => (usize::MAX, None),
        }
    }

    fn count(self) -> usize {
        self.remaining as usize
    }
}

impl DoubleEndedIterator for Iter<'_> {
    fn next_back(&mut self) -> Option<u32> {
        loop {
            if let Some((key, it)) = &mut self.back {
                if let Some(low) = it.next_back() {
                    self.remaining -= 1;
                    return Some(join(*key, low));
                }
            }
            if self.end > self.next {
                self.end -= 1;
                self.back = Some(self.open(self.end));
                continue;
            }
            let (key, it) = self.front.as_mut()?;
            let low = it.next_back()?;
            self.remaining -= 1;
            return Some(join(*key, low));
        }
    }
}

impl FusedIterator for Iter<'_> {}
