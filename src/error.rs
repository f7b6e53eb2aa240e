//! Error types for roaring32.

use thiserror::Error;

/// Result type alias for fallible bitmap operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by bitmap and container operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A half-open range `[begin, end)` with `begin > end` or `end > limit`.
    #[error("invalid range [{begin}, {end}): bounds must satisfy begin <= end <= {limit}")]
    InvalidRange {
        /// Inclusive start of the rejected range.
        begin: u64,
        /// Exclusive end of the rejected range.
        end: u64,
        /// Exclusive upper bound of the value domain.
        limit: u64,
    },

    /// `select` was asked for a position at or beyond the cardinality.
    #[error("select index {index} out of bounds for cardinality {cardinality}")]
    SelectOutOfBounds {
        /// Requested zero-based position.
        index: u64,
        /// Number of values in the set.
        cardinality: u64,
    },

    /// `first`/`last` on an empty set.
    #[error("set is empty")]
    Empty,

    /// The serialized stream does not start with a known cookie.
    #[error("unrecognized cookie {0:#010x}")]
    InvalidCookie(u32),

    /// The serialized stream declares more containers than there are keys.
    #[error("container count {0} exceeds the 65536 key limit")]
    TooManyContainers(u64),

    /// The serialized stream is structurally inconsistent.
    #[error("corrupt bitmap data: {0}")]
    Corrupt(String),

    /// An I/O error from the underlying reader or writer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of [`Error`] variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The caller passed an argument outside the accepted domain.
    InvalidArgument,
    /// The requested element does not exist.
    NotFound,
    /// Serialized input could not be decoded.
    CorruptFormat,
    /// The reader or writer failed.
    Io,
}

impl Error {
    /// Returns the class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRange { .. } => ErrorKind::InvalidArgument,
            Self::SelectOutOfBounds { .. } | Self::Empty => ErrorKind::NotFound,
            Self::InvalidCookie(_) | Self::TooManyContainers(_) | Self::Corrupt(_) => {
                ErrorKind::CorruptFormat
            }
            Self::Io(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn invalid_range(begin: u64, end: u64, limit: u64) -> Self {
        Self::InvalidRange { begin, end, limit }
    }
}

/// Rejects `[begin, end)` unless `begin <= end <= limit`.
pub(crate) fn check_range(begin: u64, end: u64, limit: u64) -> Result<()> {
    if begin > end || end > limit {
        return Err(Error::invalid_range(begin, end, limit));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        let cases = [
            (Error::invalid_range(3, 2, 10), ErrorKind::InvalidArgument),
            (
                Error::SelectOutOfBounds {
                    index: 4,
                    cardinality: 4,
                },
                ErrorKind::NotFound,
            ),
            (Error::Empty, ErrorKind::NotFound),
            (Error::InvalidCookie(7), ErrorKind::CorruptFormat),
            (Error::TooManyContainers(70_000), ErrorKind::CorruptFormat),
            (Error::Corrupt("x".into()), ErrorKind::CorruptFormat),
            (Error::Io(std::io::Error::other("boom")), ErrorKind::Io),
        ];
        for (err, kind) in cases {
            assert_eq!(err.kind(), kind, "{err}");
        }
    }

    #[test]
    fn test_check_range() {
        assert!(check_range(0, 0, 16).is_ok());
        assert!(check_range(0, 16, 16).is_ok());
        assert!(check_range(5, 4, 16).is_err());
        let err = check_range(0, 17, 16).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(
            err.to_string(),
            "invalid range [0, 17): bounds must satisfy begin <= end <= 16"
        );
    }

    #[test]
    fn test_io_source_is_preserved() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short").into();
        match err {
            Error::Io(inner) => assert_eq!(inner.kind(), std::io::ErrorKind::UnexpectedEof),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
