//! Client-side implementation of the Tor ORPort link and circuit protocol.
//!
//! This crate knows how to open a TLS connection to a relay's ORPort,
//! negotiate a link protocol, build a one-hop circuit to it with
//! CREATE_FAST, and use that circuit to fetch a directory document. It
//! does not build multi-hop paths, and has no notion of streams beyond the
//! single directory stream a fetch needs.
//!
//! See [`channel::Relay`] and [`circuit::Circuit`] for the two public
//! types.

#![warn(missing_docs)]

pub mod channel;
pub mod circuit;
mod err;
mod tls;

pub use channel::{LinkProtocol, Relay, SUPPORTED_LINK_PROTOCOLS};
pub use circuit::Circuit;
pub use err::{Error, Result};
