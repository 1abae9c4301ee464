//! Mark data as sensitive, so that it is not casually logged or displayed.
//!
//! Tor relay fingerprints, onion addresses, control-port cookie bytes, and
//! hidden-service client-authorization keys should not show up in plain
//! text in logs or error messages by default. This crate provides
//! [`Sensitive<T>`], which hides its contents behind `[scrubbed]` unless
//! the caller has explicitly turned off safe logging, and [`Redactable`],
//! for values that can display a partially-obscured form instead of being
//! fully hidden.

#![warn(missing_docs)]

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};

/// Global flag: when true, `Sensitive`/`Redacted` values display their real
/// contents instead of a scrubbed placeholder.
static UNSAFE_LOGGING: AtomicBool = AtomicBool::new(false);

/// Globally enable displaying the real contents of `Sensitive`/`Redacted`
/// values. Intended for debug builds and test harnesses only.
pub fn disable_safe_logging() {
    UNSAFE_LOGGING.store(true, Ordering::Relaxed);
}

/// Globally re-enable safe logging (the default).
pub fn enable_safe_logging() {
    UNSAFE_LOGGING.store(false, Ordering::Relaxed);
}

/// Return true if safe logging has been globally disabled.
fn unsafe_logging_enabled() -> bool {
    UNSAFE_LOGGING.load(Ordering::Relaxed)
}

/// A wrapper type for a sensitive value.
///
/// A `Sensitive<T>` derefs to `T`, but its `Display`/`Debug` implementations
/// print `[scrubbed]` instead of the real contents, unless
/// [`disable_safe_logging`] has been called.
#[derive(Clone, Copy, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Sensitive<T>(T);

impl<T> Sensitive<T> {
    /// Wrap `value` as sensitive.
    pub fn new(value: T) -> Self {
        Sensitive(value)
    }

    /// Extract the inner value.
    pub fn into_inner(self) -> T {
        self.0
    }

    /// Return a reference to the inner value.
    pub fn as_inner(&self) -> &T {
        &self.0
    }
}

/// Wrap a value as [`Sensitive`].
pub fn sensitive<T>(value: T) -> Sensitive<T> {
    Sensitive::new(value)
}

impl<T> From<T> for Sensitive<T> {
    fn from(value: T) -> Self {
        Sensitive::new(value)
    }
}

impl<T> Deref for Sensitive<T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Sensitive<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

macro_rules! impl_display_traits {
    { $($trait:ident),* } => {
        $(
            impl<T: fmt::$trait> fmt::$trait for Sensitive<T> {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    if unsafe_logging_enabled() {
                        fmt::$trait::fmt(&self.0, f)
                    } else {
                        write!(f, "[scrubbed]")
                    }
                }
            }
        )*
    }
}

impl_display_traits! { Display, Debug, LowerHex, UpperHex }

/// A value that knows how to display a partially-obscured form of itself.
///
/// Unlike [`Sensitive`], which hides a value completely, `Redactable` lets a
/// type show the part of itself that is safe to reveal (for instance, the
/// first few characters of a fingerprint) while still calling out that the
/// rest has been hidden.
pub trait Redactable: fmt::Display + fmt::Debug {
    /// As `Display::fmt`, but producing a redacted representation.
    fn display_redacted(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;

    /// As `Debug::fmt`, but producing a redacted representation.
    fn debug_redacted(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.display_redacted(f)
    }

    /// Return a wrapper that displays this value in redacted form (unless
    /// safe logging has been globally disabled).
    fn redacted(&self) -> Redacted<&Self> {
        Redacted(self)
    }
}

impl<'a, T: Redactable + ?Sized> Redactable for &'a T {
    fn display_redacted(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (*self).display_redacted(f)
    }
}

/// A wrapper around a [`Redactable`] value that displays it in redacted form.
#[derive(Clone, Copy)]
pub struct Redacted<T: Redactable>(T);

impl<T: Redactable> Redacted<T> {
    /// Wrap `value` for redacted display.
    pub fn new(value: T) -> Self {
        Redacted(value)
    }

    /// Consume this wrapper, returning the inner value.
    pub fn unwrap(self) -> T {
        self.0
    }
}

impl<T: Redactable> fmt::Display for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if unsafe_logging_enabled() {
            fmt::Display::fmt(&self.0, f)
        } else {
            self.0.display_redacted(f)
        }
    }
}

impl<T: Redactable> fmt::Debug for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if unsafe_logging_enabled() {
            fmt::Debug::fmt(&self.0, f)
        } else {
            self.0.debug_redacted(f)
        }
    }
}

#[cfg(test)]
mod test {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn sensitive_is_scrubbed_by_default() {
        let s = sensitive("super-secret-cookie".to_string());
        assert_eq!(format!("{}", s), "[scrubbed]");
        assert_eq!(format!("{:?}", s), "[scrubbed]");
        assert_eq!(s.as_inner(), "super-secret-cookie");
    }

    struct Fingerprint(String);
    impl fmt::Display for Fingerprint {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.0)
        }
    }
    impl fmt::Debug for Fingerprint {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "Fingerprint({})", self.0)
        }
    }
    impl Redactable for Fingerprint {
        fn display_redacted(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}[...]", &self.0[..4.min(self.0.len())])
        }
    }

    #[test]
    fn redacted_shows_prefix_only() {
        let fp = Fingerprint("ABCDEF0123456789".into());
        assert_eq!(format!("{}", fp.redacted()), "ABCD[...]");
    }
}
