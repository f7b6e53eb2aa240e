//! Shared kernels: key splitting, galloping search, sorted-array merges and
//! word-range bit manipulation.

use std::cmp::Ordering;

// =============================================================================
// Key splitting
// =============================================================================

#[inline]
pub(crate) fn high_bits(x: u32) -> u16 {
    (x >> 16) as u16
}

#[inline]
pub(crate) fn low_bits(x: u32) -> u16 {
    x as u16
}

#[inline]
pub(crate) fn join(high: u16, low: u16) -> u32 {
    (u32::from(high) << 16) | u32::from(low)
}

/// Splits the 32-bit half-open range `[begin, end)` into per-key pieces.
///
/// Yields `(key, start, end)` where `start..end` is the local 16-bit range
/// (`end` may be 65536). Yields nothing for an empty range.
pub(crate) fn key_slices(begin: u64, end: u64) -> impl Iterator<Item = (u16, u32, u32)> {
    let (first_key, last_key, last) = if begin < end {
        let last = end - 1;
        ((begin >> 16) as u32, (last >> 16) as u32, last)
    } else {
        (1, 0, 0)
    };
    (first_key..=last_key).map(move |key| {
        let start = if key == first_key {
            (begin & 0xFFFF) as u32
        } else {
            0
        };
        let stop = if key == last_key {
            (last & 0xFFFF) as u32 + 1
        } else {
            1 << 16
        };
        (key as u16, start, stop)
    })
}

// =============================================================================
// Galloping search
// =============================================================================

/// Returns the smallest index `>= start` whose element is `>= min`, or
/// `array.len()` if there is none.
///
/// Checks at exponentially growing distances before binary searching, so the
/// cost is logarithmic in the distance skipped rather than in the length.
pub(crate) fn advance_until<T: Ord + Copy>(array: &[T], start: usize, min: T) -> usize {
    let len = array.len();
    if start >= len {
        return len;
    }
    if array[start] >= min {
        return start;
    }

    let mut span = 1;
    while start + span < len && array[start + span] < min {
        span *= 2;
    }
    let mut upper = if start + span < len {
        start + span
    } else {
        len - 1
    };
    if array[upper] < min {
        return len;
    }

    // array[lower] < min <= array[upper]
    let mut lower = start + span / 2;
    while lower + 1 != upper {
        let mid = lower + (upper - lower) / 2;
        if array[mid] < min {
            lower = mid;
        } else {
            upper = mid;
        }
    }
    upper
}

// =============================================================================
// Sorted u16 array merges
// =============================================================================

/// Size ratio above which intersections switch to galloping.
const GALLOP_RATIO: usize = 64;

pub(crate) fn intersect(a: &[u16], b: &[u16], out: &mut Vec<u16>) {
    if a.is_empty() || b.is_empty() {
        return;
    }
    if a.len() * GALLOP_RATIO < b.len() {
        return intersect_galloping(a, b, out);
    }
    if b.len() * GALLOP_RATIO < a.len() {
        return intersect_galloping(b, a, out);
    }

    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
}

fn intersect_galloping(small: &[u16], large: &[u16], out: &mut Vec<u16>) {
    let mut pos = 0;
    for &v in small {
        pos = advance_until(large, pos, v);
        if pos == large.len() {
            return;
        }
        if large[pos] == v {
            out.push(v);
        }
    }
}

pub(crate) fn intersection_count(a: &[u16], b: &[u16]) -> usize {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if small.len() * GALLOP_RATIO < large.len() {
        let mut pos = 0;
        let mut count = 0;
        for &v in small {
            pos = advance_until(large, pos, v);
            if pos == large.len() {
                break;
            }
            if large[pos] == v {
                count += 1;
            }
        }
        return count;
    }

    let (mut i, mut j, mut count) = (0, 0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                count += 1;
                i += 1;
                j += 1;
            }
        }
    }
    count
}

pub(crate) fn intersects(a: &[u16], b: &[u16]) -> bool {
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => i = advance_until(a, i, b[j]),
            Ordering::Greater => j = advance_until(b, j, a[i]),
            Ordering::Equal => return true,
        }
    }
    false
}

pub(crate) fn union(a: &[u16], b: &[u16], out: &mut Vec<u16>) {
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => {
                out.push(a[i]);
                i += 1;
            }
            Ordering::Greater => {
                out.push(b[j]);
                j += 1;
            }
            Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
}

pub(crate) fn difference(a: &[u16], b: &[u16], out: &mut Vec<u16>) {
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => {
                out.push(a[i]);
                i += 1;
            }
            Ordering::Greater => j = advance_until(b, j, a[i]),
            Ordering::Equal => {
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
}

pub(crate) fn symmetric_difference(a: &[u16], b: &[u16], out: &mut Vec<u16>) {
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => {
                out.push(a[i]);
                i += 1;
            }
            Ordering::Greater => {
                out.push(b[j]);
                j += 1;
            }
            Ordering::Equal => {
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
}

// =============================================================================
// Word-range kernels
// =============================================================================

/// Calls `f(word_index, mask)` for every word touched by the bit range
/// `[start, end)`, with `mask` selecting the bits of that word in range.
#[inline]
fn for_each_word(start: u32, end: u32, mut f: impl FnMut(usize, u64)) {
    if start >= end {
        return;
    }
    let first = (start / 64) as usize;
    let last = ((end - 1) / 64) as usize;
    let first_mask = !0u64 << (start % 64);
    let last_mask = !0u64 >> ((64 - end % 64) % 64);
    if first == last {
        f(first, first_mask & last_mask);
        return;
    }
    f(first, first_mask);
    for i in first + 1..last {
        f(i, !0);
    }
    f(last, last_mask);
}

pub(crate) fn set_range(words: &mut [u64], start: u32, end: u32) {
    for_each_word(start, end, |i, mask| words[i] |= mask);
}

pub(crate) fn reset_range(words: &mut [u64], start: u32, end: u32) {
    for_each_word(start, end, |i, mask| words[i] &= !mask);
}

pub(crate) fn flip_range(words: &mut [u64], start: u32, end: u32) {
    for_each_word(start, end, |i, mask| words[i] ^= mask);
}

pub(crate) fn range_cardinality(words: &[u64], start: u32, end: u32) -> u32 {
    let mut count = 0;
    for_each_word(start, end, |i, mask| count += (words[i] & mask).count_ones());
    count
}

pub(crate) fn range_is_full(words: &[u64], start: u32, end: u32) -> bool {
    let mut full = true;
    for_each_word(start, end, |i, mask| full &= words[i] & mask == mask);
    full
}

pub(crate) fn range_intersects(words: &[u64], start: u32, end: u32) -> bool {
    let mut any = false;
    for_each_word(start, end, |i, mask| any |= words[i] & mask != 0);
    any
}

/// Position of the `rank`-th (zero-based) set bit of `word`.
///
/// The caller guarantees `rank < word.count_ones()`.
#[inline]
pub(crate) fn select_in_word(word: u64, rank: u32) -> u32 {
    debug_assert!(rank < word.count_ones());
    let mut w = word;
    let mut rank = rank;
    // Skip whole bytes first, then strip the remaining low bits.
    let mut base = 0;
    loop {
        let ones = (w & 0xFF).count_ones();
        if rank < ones {
            break;
        }
        rank -= ones;
        w >>= 8;
        base += 8;
    }
    for _ in 0..rank {
        w &= w - 1;
    }
    base + w.trailing_zeros()
}

/// Appends the positions of set bits of `words`, offset by 64 per word.
pub(crate) fn push_set_bits(out: &mut Vec<u16>, words: impl Iterator<Item = u64>) {
    for (i, mut w) in words.enumerate() {
        let base = (i * 64) as u32;
        while w != 0 {
            out.push((base + w.trailing_zeros()) as u16);
            w &= w - 1;
        }
    }
}

/// First position `>= from` whose bit equals `bit`.
pub(crate) fn next_bit(words: &[u64], from: u32, bit: bool) -> Option<u32> {
    let mask = if bit { 0 } else { !0 };
    let mut i = (from >> 6) as usize;
    if i >= words.len() {
        return None;
    }
    let mut w = (words[i] ^ mask) & (!0u64 << (from & 63));
    loop {
        if w != 0 {
            return Some(i as u32 * 64 + w.trailing_zeros());
        }
        i += 1;
        if i == words.len() {
            return None;
        }
        w = words[i] ^ mask;
    }
}

/// Last position `<= from` whose bit equals `bit`.
pub(crate) fn prev_bit(words: &[u64], from: u32, bit: bool) -> Option<u32> {
    let mask = if bit { 0 } else { !0 };
    let mut i = (from >> 6) as usize;
    debug_assert!(i < words.len());
    let mut w = (words[i] ^ mask) & (!0u64 >> (63 - (from & 63)));
    loop {
        if w != 0 {
            return Some(i as u32 * 64 + 63 - w.leading_zeros());
        }
        if i == 0 {
            return None;
        }
        i -= 1;
        w = words[i] ^ mask;
    }
}
