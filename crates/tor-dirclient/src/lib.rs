//! Fetches Tor network directory documents from a DirPort or a tunnelled
//! ORPort circuit.
//!
//! A [`Query`](request::Query) describes what to ask for and where; calling
//! [`Query::run`](request::Query::run) sends an HTTP/1.0 `GET`, retrying
//! against further endpoints on failure, and returns a
//! [`DirResponse`](response::DirResponse) holding the decompressed body.
//! Free functions in [`request`] build a `Query` for each document type a
//! directory cache serves.

#![warn(missing_docs)]

mod err;
pub mod request;
pub mod response;
mod util;

pub use err::{Error, Result};
pub use request::{
    get_bandwidth_file, get_consensus, get_detached_signatures, get_extrainfo_descriptors,
    get_hs_descriptor, get_key_certificates, get_microdescriptors, get_server_descriptors,
    get_vote, Compression, DescriptorType, Endpoint, Query,
};
pub use response::{DirResponse, SourceInfo};
