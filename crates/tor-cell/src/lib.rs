//! Encoding, decoding, and encryption of the cells sent over a Tor ORPort
//! connection.
//!
//! [`chancell`] covers the channel (link) layer: the fixed/variable-length
//! cell framing and the messages carried in it (VERSIONS, CERTS, NETINFO,
//! CREATE_FAST/CREATED_FAST, DESTROY, and so on). [`relaycell`] covers the
//! messages carried inside a RELAY cell once a circuit exists, including
//! the per-hop AES-128-CTR encryption and running SHA-1 digest that let a
//! circuit's far endpoint recognize cells addressed to it.

#![warn(missing_docs)]

mod err;

pub mod chancell;
pub mod relaycell;

pub use err::{Error, Result};
