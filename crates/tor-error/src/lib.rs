//! A shared `ErrorKind` taxonomy, plus small helpers for internal errors.
//!
//! Every fallible operation in this workspace eventually produces an error
//! that implements [`HasKind`], so that callers who don't care about the
//! exact error type (and the exact crate it came from) can still dispatch on
//! a coarse-grained, stable [`ErrorKind`]. This mirrors the "one taxonomy,
//! many concrete error enums" split used throughout this workspace: each
//! crate's own `Error` type carries the details, and only implements
//! `HasKind` to say which bucket it falls into.

#![warn(missing_docs)]

mod internal;

pub use internal::Bug;

use std::fmt::{Debug, Display};

/// A coarse classification of an error, shared across every crate in this
/// workspace.
///
/// This is deliberately small and stable: new variants are added rarely, and
/// only when no existing variant fits. Callers should treat an unmatched
/// variant as evidence that they should update, not as a logic error.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, derive_more::Display)]
#[non_exhaustive]
pub enum ErrorKind {
    /// We could not reach a peer, our TLS handshake with it failed, or it
    /// closed the connection unexpectedly.
    #[display("unreachable or misbehaving transport")]
    Transport,

    /// A peer sent us a malformed cell or message, an unknown command where
    /// one was required, rejected our proposed link version, a handshake
    /// failed, or a response's circuit ID did not match the request.
    #[display("protocol violation")]
    Protocol,

    /// Authentication to a controller or hidden service failed: an
    /// unsupported method was offered, a cookie file could not be read, a
    /// SAFECOOKIE MAC did not match, or a password was rejected.
    #[display("authentication failure")]
    Authentication,

    /// A descriptor document was missing a required keyword, duplicated a
    /// single-valued one, contained truncated PEM/base64, failed signature
    /// validation, had expired, or had a corrupt onion-address checksum.
    #[display("malformed or invalid descriptor")]
    Descriptor,

    /// A download attempt received a non-2xx status, timed out, named an
    /// unsupported content encoding, or exceeded a resource's size limit.
    #[display("download failed")]
    Download,

    /// The connection or request that this operation depended on has been
    /// cancelled or closed.
    #[display("cancelled or closed")]
    CancelledOrClosed,

    /// An internal error: a bug in this crate or one of its callers, not a
    /// fault of any peer or of the caller's input.
    #[display("internal error (please report a bug)")]
    Internal,

    /// An error kind that does not fit any of the above. Prefer adding a
    /// named variant over constructing this from outside this crate.
    #[display("other error")]
    Other,
}

/// A type whose errors can be classified into a coarse-grained [`ErrorKind`].
///
/// Implement this for every public error enum in this workspace, even when
/// every variant maps to the same kind.
pub trait HasKind {
    /// Return the kind of this error.
    fn kind(&self) -> ErrorKind;
}

impl HasKind for Bug {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Internal
    }
}

impl<T: HasKind> HasKind for Box<T> {
    fn kind(&self) -> ErrorKind {
        self.as_ref().kind()
    }
}

/// An error that carries no further detail beyond its [`ErrorKind`] and a
/// human-readable message. Useful at API boundaries (CLI tools, FFI) that
/// want a uniform error type without pulling in every crate's concrete
/// error enum.
#[derive(Clone, Debug, thiserror::Error)]
#[error("{message}")]
pub struct AnyError {
    /// What kind of error this is.
    kind: ErrorKind,
    /// Human-readable description.
    message: String,
}

impl AnyError {
    /// Construct a new `AnyError` from an existing `HasKind` error.
    pub fn new<E: HasKind + Display>(err: E) -> Self {
        AnyError {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl HasKind for AnyError {
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// Assert, at compile time, that `$t` implements `HasKind`. Use this next to
/// a public error enum's definition so that a future refactor that removes
/// the impl fails to build instead of silently losing the classification.
#[macro_export]
macro_rules! assert_has_kind {
    ($t:ty) => {
        const _: fn() = || {
            fn assert_impl<T: $crate::HasKind>() {}
            assert_impl::<$t>();
        };
    };
}

#[cfg(test)]
mod test {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("example failure: {0}")]
    struct ExampleError(String);

    impl HasKind for ExampleError {
        fn kind(&self) -> ErrorKind {
            ErrorKind::Protocol
        }
    }
    assert_has_kind!(ExampleError);

    #[test]
    fn any_error_preserves_kind_and_message() {
        let e = ExampleError("bad cell".into());
        let any = AnyError::new(e);
        assert_eq!(any.kind(), ErrorKind::Protocol);
        assert_eq!(any.to_string(), "example failure: bad cell");
    }

    #[test]
    fn bug_has_internal_kind() {
        let b = internal!("should never happen: {}", 42);
        assert_eq!(b.kind(), ErrorKind::Internal);
        assert!(b.to_string().contains("should never happen: 42"));
    }
}
