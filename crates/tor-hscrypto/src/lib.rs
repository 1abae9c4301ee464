//! Cryptographic operations specific to onion (hidden) service v3
//! descriptors: credential/subcredential derivation, per-layer descriptor
//! encryption, and `.onion` address parsing.

pub mod cred;
pub mod enc;
pub mod onion;
pub mod pk;

use derive_more::{AsRef, From};

/// The revision counter carried by an onion service descriptor, used both
/// to prevent replay of stale descriptors and as key-derivation input for
/// descriptor layer encryption.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, AsRef, From)]
pub struct RevisionCounter(u64);

impl From<RevisionCounter> for u64 {
    fn from(rc: RevisionCounter) -> u64 {
        rc.0
    }
}

pub use pk::Subcredential;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn revision_counter_orders_numerically() {
        assert!(RevisionCounter::from(1) < RevisionCounter::from(2));
    }
}
