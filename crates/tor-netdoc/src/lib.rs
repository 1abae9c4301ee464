//! Parsers for Tor directory documents: server descriptors, microdescriptors,
//! network-status consensuses and votes, directory key certificates, and v3
//! onion service descriptors.
//!
//! Each document type shares the same line-oriented grammar ([`parse`]);
//! the per-type modules walk a tokenized document and enforce their own
//! keyword policies, signature checks, and (for onion service descriptors)
//! layered decryption.

#![warn(missing_docs)]

mod err;
pub mod hsdesc;
pub mod microdesc;
pub mod netstatus;
pub mod parse;
pub mod routerdesc;

pub use err::{Error, Result};
