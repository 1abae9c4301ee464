//! Cryptographic traits for general use throughout this workspace.

use subtle::Choice;

/// A simple trait to describe a keyed message authentication code.
///
/// Unlike RustCrypto's `Mac` trait, this does not support incremental
/// processing: callers that need a keyed MAC over a small, fully-buffered
/// message (such as a SAFECOOKIE authentication challenge) can use this
/// instead.
pub trait ShortMac<const MAC_LEN: usize> {
    /// Calculate a message authentication code for `input` using this key.
    fn mac(&self, input: &[u8]) -> crate::util::ct::CtByteArray<MAC_LEN>;

    /// Check whether `mac` is a valid message authentication code for
    /// `input` using this key.
    fn validate(&self, input: &[u8], mac: &[u8; MAC_LEN]) -> Choice;
}
