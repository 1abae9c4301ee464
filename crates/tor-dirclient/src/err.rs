//! Error types for the tor-dirclient crate.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tor_error::{ErrorKind, HasKind};

/// An error encountered while fetching or parsing a directory document.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// A TCP connection to a DirPort could not be established, or an I/O
    /// error occurred while reading or writing it.
    #[error("I/O error talking to {0}: {1}")]
    Io(SocketAddr, Arc<std::io::Error>),

    /// An attempt did not finish within its allotted timeout.
    #[error("{0} took too long to reply ({1:?} elapsed)")]
    DownloadTimeout(SocketAddr, Duration),

    /// The response's status line, or its headers, could not be parsed, or
    /// the status line did not report success.
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// The response named a `Content-Encoding` this build doesn't support.
    #[error("unrecognized content encoding: {0:?}")]
    ContentEncoding(String),

    /// A request would have required more digests/fingerprints than the
    /// resource's URL scheme allows.
    #[error("request needs {0} items, more than the {1} this resource allows")]
    RequestTooLarge(usize, usize),

    /// No endpoint was given, and the built-in fallback directory authority
    /// list was empty (for example, every known authority was blacklisted).
    #[error("no endpoint available to query")]
    NoEndpoint,

    /// Every attempt (across all retries) failed; this is the error from
    /// the last one.
    #[error("all {0} attempt(s) failed; last error: {1}")]
    AllAttemptsFailed(u32, Box<Error>),

    /// Opening a channel or circuit to an ORPort endpoint failed.
    #[error("error opening a circuit to relay: {0}")]
    Circuit(#[from] tor_proto::Error),

    /// The response body didn't parse as the document type it was
    /// requested as.
    #[error("error parsing directory document: {0}")]
    Doc(#[from] tor_netdoc::Error),
}

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, Error>;

impl HasKind for Error {
    fn kind(&self) -> ErrorKind {
        use Error as E;
        use ErrorKind as EK;
        match self {
            E::Io(..) => EK::Transport,
            E::DownloadTimeout(..) => EK::Transport,
            E::ProtocolError(_) => EK::Protocol,
            E::ContentEncoding(_) => EK::Protocol,
            E::RequestTooLarge(..) => EK::Other,
            E::NoEndpoint => EK::Other,
            E::AllAttemptsFailed(..) => EK::Download,
            E::Circuit(e) => e.kind(),
            E::Doc(e) => e.kind(),
        }
    }
}
