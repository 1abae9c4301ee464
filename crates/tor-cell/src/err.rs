//! Error type for the tor-cell crate.

use thiserror::Error;
use tor_error::{ErrorKind, HasKind};

/// An error produced while encoding, decoding, or processing a cell.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// An error occurred while decoding a cell or message body.
    #[error("error while parsing {parsed}")]
    BytesErr {
        /// The underlying parse error.
        #[source]
        err: tor_bytes::Error,
        /// What was being parsed.
        parsed: &'static str,
    },
    /// An error occurred while encoding an outgoing message.
    #[error("error while encoding message")]
    EncodeErr(#[from] tor_bytes::EncodeError),
    /// A programming error internal to this crate or its caller.
    #[error("internal programming error")]
    Internal(tor_error::Bug),
    /// A peer violated the channel-level protocol.
    #[error("channel protocol violation: {0}")]
    ChanProto(String),
    /// A peer violated the circuit-level protocol.
    #[error("circuit protocol violation: {0}")]
    CircProto(String),
    /// The RELAY cell's digest or `recognized` field did not check out.
    #[error("relay cell failed integrity check")]
    BadRelayDigest,
    /// Tried to construct a message that can't be represented in a cell.
    #[error("message can't be represented in a cell: {0}")]
    CantEncode(&'static str),
}

impl HasKind for Error {
    fn kind(&self) -> ErrorKind {
        use tor_bytes::Error as ByE;
        use Error as E;
        use ErrorKind as EK;
        match self {
            E::BytesErr {
                err: ByE::Incomplete { .. },
                ..
            } => EK::Internal,
            E::EncodeErr(_) => EK::Internal,
            E::BytesErr { .. } => EK::Protocol,
            E::Internal(_) => EK::Internal,
            E::ChanProto(_) => EK::Protocol,
            E::CircProto(_) => EK::Protocol,
            E::BadRelayDigest => EK::Protocol,
            E::CantEncode(_) => EK::Internal,
        }
    }
}

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, Error>;
