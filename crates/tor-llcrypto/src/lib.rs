//! Low-level cryptography wrappers used throughout this workspace.
//!
//! Tor hasn't managed to avoid needing several different cryptographic
//! primitives over its history: this crate re-exports RSA, Ed25519, AES-CTR,
//! and the SHA-1/SHA-2/SHA-3/SHAKE digests/XOFs it still relies on, behind a
//! small set of modules so the rest of the workspace doesn't need to depend
//! directly on each underlying crate.

#![warn(missing_docs)]

pub mod cipher;
pub mod d;
pub mod pk;
pub mod traits;
pub mod util;
