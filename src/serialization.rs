//! Portable Roaring binary format.
//!
//! Layout, all integers little-endian:
//!
//! ```text
//! cookie            u32   12346, or 12347 | (size - 1) << 16 with run containers
//! size              u32   only with cookie 12346
//! run marker        ceil(size / 8) bytes, only with cookie 12347
//! headers           size x (u16 key, u16 cardinality - 1)
//! offsets           size x u32, omitted with run containers and size < 4
//! bodies            array: card x u16, bitmap: 1024 x u64,
//!                   run: u16 count, then count x (u16 start, u16 length)
//! ```
//!
//! Without a run marker bit, a container is a bitmap exactly when its
//! cardinality exceeds 4096.

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use tracing::{debug, trace};

use crate::container::run::smart_append;
use crate::container::{
    ArrayContainer, BitmapContainer, Container, Run, RunContainer, ARRAY_MAX_SIZE, BITMAP_WORDS,
    MAX_CONTAINER_VALUES,
};
use crate::error::{Error, Result};
use crate::index::RoaringArray;

// =============================================================================
// Configuration
// =============================================================================

/// Cookie of streams without run containers; followed by a u32 size.
pub const SERIAL_COOKIE_NO_RUNCONTAINER: u32 = 12346;

/// Low half of the cookie of streams with run containers.
pub const SERIAL_COOKIE: u32 = 12347;

/// Streams with run containers and fewer containers than this carry no
/// offset table.
pub const NO_OFFSET_THRESHOLD: usize = 4;

fn run_marker_len(size: usize) -> usize {
    size.div_ceil(8)
}

fn corrupt(message: String) -> Error {
    debug!(%message, "rejecting serialized bitmap");
    Error::Corrupt(message)
}

impl RoaringArray {
    /// Bytes before the first container body.
    pub fn header_size(&self) -> usize {
        let size = self.len();
        if self.has_run_containers() {
            let base = 4 + run_marker_len(size) + 4 * size;
            if size < NO_OFFSET_THRESHOLD {
                base
            } else {
                base + 4 * size
            }
        } else {
            4 + 4 + 8 * size
        }
    }

    pub fn serialized_size(&self) -> usize {
        self.header_size()
            + self
                .containers()
                .iter()
                .map(Container::serialized_size_in_bytes)
                .sum::<usize>()
    }

    pub fn serialize_into<W: Write>(&self, mut writer: W) -> Result<()> {
        let size = self.len();
        let has_run = self.has_run_containers();
        trace!(containers = size, has_run, "serializing bitmap");

        if has_run {
            writer.write_u32::<LittleEndian>(SERIAL_COOKIE | ((size as u32 - 1) << 16))?;
            let mut marker = vec![0u8; run_marker_len(size)];
            for (i, c) in self.containers().iter().enumerate() {
                if c.is_run() {
                    marker[i / 8] |= 1 << (i % 8);
                }
            }
            writer.write_all(&marker)?;
        } else {
            writer.write_u32::<LittleEndian>(SERIAL_COOKIE_NO_RUNCONTAINER)?;
            writer.write_u32::<LittleEndian>(size as u32)?;
        }

        for (key, c) in self.iter() {
            writer.write_u16::<LittleEndian>(key)?;
            writer.write_u16::<LittleEndian>((c.len() - 1) as u16)?;
        }

        if !has_run || size >= NO_OFFSET_THRESHOLD {
            let mut offset = self.header_size() as u32;
            for c in self.containers() {
                writer.write_u32::<LittleEndian>(offset)?;
                offset += c.serialized_size_in_bytes() as u32;
            }
        }

        for c in self.containers() {
            match c {
                Container::Array(a) => {
                    debug_assert!(a.len() as usize <= ARRAY_MAX_SIZE);
                    for v in a.iter() {
                        writer.write_u16::<LittleEndian>(v)?;
                    }
                }
                Container::Bitmap(b) => {
                    debug_assert!(b.len() as usize > ARRAY_MAX_SIZE);
                    for &w in b.words().iter() {
                        writer.write_u64::<LittleEndian>(w)?;
                    }
                }
                Container::Run(r) => {
                    writer.write_u16::<LittleEndian>(r.number_of_runs() as u16)?;
                    for run in r.runs() {
                        writer.write_u16::<LittleEndian>(run.start)?;
                        writer.write_u16::<LittleEndian>(run.length)?;
                    }
                }
            }
        }
        Ok(())
    }

    pub fn deserialize_from<R: Read>(mut reader: R) -> Result<Self> {
        let cookie = reader.read_u32::<LittleEndian>()?;
        let (size, run_marker) = if cookie & 0xFFFF == SERIAL_COOKIE {
            let size = (cookie >> 16) as usize + 1;
            let mut marker = vec![0u8; run_marker_len(size)];
            reader.read_exact(&mut marker)?;
            (size, Some(marker))
        } else if cookie == SERIAL_COOKIE_NO_RUNCONTAINER {
            let size = reader.read_u32::<LittleEndian>()?;
            if size > MAX_CONTAINER_VALUES {
                debug!(size, "rejecting serialized bitmap with too many containers");
                return Err(Error::TooManyContainers(u64::from(size)));
            }
            (size as usize, None)
        } else {
            debug!(cookie, "rejecting serialized bitmap with unknown cookie");
            return Err(Error::InvalidCookie(cookie));
        };

        let mut headers = vec![0u16; 2 * size];
        reader.read_u16_into::<LittleEndian>(&mut headers)?;
        if let Some(pos) = headers
            .chunks_exact(2)
            .zip(headers.chunks_exact(2).skip(1))
            .position(|(a, b)| a[0] >= b[0])
        {
            return Err(corrupt(format!(
                "keys are not strictly increasing at container {}",
                pos + 1
            )));
        }

        if run_marker.is_none() || size >= NO_OFFSET_THRESHOLD {
            // Bodies are read sequentially; the offsets are only for random access.
            let skip = 4 * size as u64;
            let skipped = io::copy(&mut reader.by_ref().take(skip), &mut io::sink())?;
            if skipped != skip {
                return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
            }
        }

        let mut index = RoaringArray::with_capacity(size);
        for (i, header) in headers.chunks_exact(2).enumerate() {
            let (key, cardinality) = (header[0], u32::from(header[1]) + 1);
            let is_run = run_marker
                .as_ref()
                .is_some_and(|m| m[i / 8] >> (i % 8) & 1 == 1);
            let container = if is_run {
                read_run(&mut reader, key)?
            } else if cardinality as usize > ARRAY_MAX_SIZE {
                read_bitmap(&mut reader)?
            } else {
                read_array(&mut reader, key, cardinality)?
            };
            if container.len() != cardinality {
                return Err(corrupt(format!(
                    "container {key} holds {} values but its header says {cardinality}",
                    container.len()
                )));
            }
            index.append(key, container);
        }

        debug!(
            containers = size,
            has_run = run_marker.is_some(),
            "deserialized bitmap"
        );
        Ok(index)
    }
}

fn read_array<R: Read>(reader: &mut R, key: u16, cardinality: u32) -> Result<Container> {
    let mut values = vec![0u16; cardinality as usize];
    reader.read_u16_into::<LittleEndian>(&mut values)?;
    if values.windows(2).any(|w| w[0] >= w[1]) {
        return Err(corrupt(format!(
            "array container {key} is not strictly increasing"
        )));
    }
    Ok(Container::Array(ArrayContainer::from_sorted_vec(values)))
}

fn read_bitmap<R: Read>(reader: &mut R) -> Result<Container> {
    let mut words = Box::new([0u64; BITMAP_WORDS]);
    reader.read_u64_into::<LittleEndian>(&mut words[..])?;
    Ok(Container::Bitmap(BitmapContainer::from_words(words)))
}

fn read_run<R: Read>(reader: &mut R, key: u16) -> Result<Container> {
    let count = reader.read_u16::<LittleEndian>()?;
    let mut pairs = vec![0u16; 2 * usize::from(count)];
    reader.read_u16_into::<LittleEndian>(&mut pairs)?;

    let mut runs: Vec<Run> = Vec::with_capacity(usize::from(count));
    for pair in pairs.chunks_exact(2) {
        let (start, length) = (pair[0], pair[1]);
        if u32::from(start) + u32::from(length) >= MAX_CONTAINER_VALUES {
            return Err(corrupt(format!(
                "run {start}+{length} in container {key} overflows"
            )));
        }
        if runs.last().is_some_and(|last| start <= last.end()) {
            return Err(corrupt(format!(
                "runs in container {key} overlap or are out of order"
            )));
        }
        // Adjacent runs are legal on the wire; merge them.
        smart_append(&mut runs, Run::new(start, length));
    }
    Ok(Container::Run(RunContainer::from_runs(runs)))
}
