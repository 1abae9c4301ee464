//! Digests and XOFs used to implement the Tor protocol.
//!
//! For legacy reasons, Tor uses SHA-1, SHA-2, SHA-3, and SHAKE in different
//! places; we re-export them all here, in forms implementing the
//! [`digest::Digest`] traits, so the rest of the workspace can depend on one
//! place for its hashing needs.

pub use sha1::Sha1;
pub use sha2::Sha256;
pub use sha3::{Sha3_256, Shake256};
