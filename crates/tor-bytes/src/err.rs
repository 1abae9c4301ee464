//! Internal: error types for `tor-bytes`.

use std::borrow::Cow;
use std::num::NonZeroUsize;
use thiserror::Error;
use tor_error::{into_internal, Bug, ErrorKind, HasKind};

/// Error type for decoding Tor objects from bytes.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// Tried to read something, but didn't find enough bytes.
    ///
    /// Only returned by [`Reader`](crate::Reader)s created with
    /// [`from_possibly_incomplete_slice`](crate::Reader::from_possibly_incomplete_slice).
    #[error("object truncated (or not fully present), at least {deficit} more bytes needed")]
    Incomplete {
        /// Lower bound on the number of additional bytes needed.
        deficit: NonZeroUsize,
    },
    /// Called `Reader::should_be_exhausted`, but found bytes anyway.
    #[error("extra bytes at end of object")]
    ExtraneousBytes,
    /// Invalid length value: too large to represent as `usize`.
    #[error("object length too large to represent")]
    BadLengthValue,
    /// A field's contents did not satisfy a required shape or range.
    #[error("malformed field: {0}")]
    MalformedField(Cow<'static, str>),
    /// The message (or an inner counted section) is too short.
    #[error("message (or inner portion) too short")]
    MissingData,
    /// A parsing error that should never happen: used instead of
    /// `assert`/`expect`/`unwrap` from within parsing code.
    #[error("internal error")]
    Bug(#[from] Bug),
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        use Error::*;
        match (self, other) {
            (Incomplete { deficit: a }, Incomplete { deficit: b }) => a == b,
            (ExtraneousBytes, ExtraneousBytes) => true,
            (BadLengthValue, BadLengthValue) => true,
            (MalformedField(a), MalformedField(b)) => a == b,
            (MissingData, MissingData) => true,
            // A bug is equal to nothing, not even itself.
            _ => false,
        }
    }
}

impl Error {
    /// Make an [`Error::Incomplete`] with a specified deficit.
    ///
    /// # Panics
    /// Panics if `deficit` is zero.
    pub fn new_incomplete_for_test(deficit: usize) -> Self {
        let deficit = NonZeroUsize::new(deficit).expect("zero deficit in assert!");
        Error::Incomplete { deficit }
    }
}

impl HasKind for Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Error::Bug(_) => ErrorKind::Internal,
            _ => ErrorKind::Protocol,
        }
    }
}

/// Error type for encoding Tor objects to bytes.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum EncodeError {
    /// Tried to encode an object with an attached length, but the length
    /// was too large to encode in the available space.
    #[error("object length too large to encode")]
    BadLengthValue,
    /// A parsing error that should never happen.
    #[error("internal error")]
    Bug(#[from] Bug),
}

impl From<EncodeError> for Bug {
    fn from(error: EncodeError) -> Bug {
        match error {
            EncodeError::Bug(bug) => bug,
            EncodeError::BadLengthValue => into_internal!("encoding error")(error),
        }
    }
}

impl HasKind for EncodeError {
    fn kind(&self) -> ErrorKind {
        match self {
            EncodeError::Bug(_) => ErrorKind::Internal,
            EncodeError::BadLengthValue => ErrorKind::Internal,
        }
    }
}
