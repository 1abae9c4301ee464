//! The [`Bug`] type, and the [`internal!`] macro used to construct it.

use std::fmt::{self, Debug, Display};
use std::panic::Location;

/// An error that represents a bug in this crate or one of its callers.
///
/// This is returned instead of calling `panic!`/`unwrap`/`expect` from
/// parsing and protocol code, so that a malformed message from the network
/// can never take down the calling process. Prefer [`internal!`] to
/// constructing this directly: it captures the call site for you.
#[derive(Clone)]
pub struct Bug {
    /// Human-readable description of what went wrong.
    message: String,
    /// Source location of the `internal!` invocation that created this bug.
    location: &'static Location<'static>,
}

impl Bug {
    /// Construct a new `Bug`, capturing the caller's location.
    #[track_caller]
    pub fn new<S: Into<String>>(message: S) -> Self {
        Bug {
            message: message.into(),
            location: Location::caller(),
        }
    }
}

impl Display for Bug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "internal error (please report a bug): {} at {}",
            self.message, self.location
        )
    }
}

impl Debug for Bug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl std::error::Error for Bug {}

impl PartialEq for Bug {
    /// Bugs are never equal to anything, not even themselves: treating two
    /// "can't happen" errors as interchangeable would be itself a bug.
    fn eq(&self, _other: &Self) -> bool {
        false
    }
}

/// Construct a [`Bug`] describing an invariant violation, capturing the
/// call site, with `format!`-like arguments.
///
/// # Example
/// ```
/// use tor_error::internal;
/// fn do_the_thing(v: &[u8]) -> Result<u8, tor_error::Bug> {
///     v.first().copied().ok_or_else(|| internal!("empty vector, should be non-empty"))
/// }
/// ```
#[macro_export]
macro_rules! internal {
    ($($arg:tt)*) => {
        $crate::Bug::new(format!($($arg)*))
    };
}

/// Return a closure that converts any `Display`-able error into a [`Bug`]
/// tagged with the given context string. Useful with `.map_err(into_internal!("context"))`.
#[macro_export]
macro_rules! into_internal {
    ($ctx:expr) => {
        |e| $crate::Bug::new(format!("{}: {}", $ctx, e))
    };
}
