//! # roaring32
//!
//! A compressed ordered set of `u32` values using Roaring bitmaps.
//!
//! Based on "Consistently faster and smaller compressed bitmaps with Roaring"
//! (Software: Practice and Experience, 2016, Lemire et al.)
//!
//! Each value is split into a 16-bit key and a 16-bit low part. The low parts
//! sharing a key live in one container, stored as a sorted array, a 65536-bit
//! bitmap or a list of runs, whichever suits the data.
//!
//! ## Example
//!
//! ```rust
//! use roaring32::RoaringBitmap;
//!
//! let a = RoaringBitmap::bitmap_of(&[1, 2, 3, 1000]);
//! let b = RoaringBitmap::bitmap_of(&[2, 3, 2000]);
//!
//! let both = &a & &b;
//! assert_eq!(both.to_vec(), vec![2, 3]);
//! assert_eq!(a.rank(1000), 4);
//! assert_eq!(a.select(3).unwrap(), 1000);
//!
//! let mut bytes = Vec::new();
//! a.serialize_into(&mut bytes).unwrap();
//! assert_eq!(RoaringBitmap::deserialize_from(&bytes[..]).unwrap(), a);
//! ```

mod bitmap;
pub mod container;
mod error;
mod index;
mod iter;
mod serialization;
#[cfg(feature = "serde")]
mod serde_impl;
mod util;

#[cfg(test)]
mod proptests;

pub use bitmap::{RoaringBitmap, Statistics};
pub use error::{Error, ErrorKind, Result};
pub use iter::Iter;
pub use serialization::{NO_OFFSET_THRESHOLD, SERIAL_COOKIE, SERIAL_COOKIE_NO_RUNCONTAINER};
