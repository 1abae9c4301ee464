//! Error type for the tor-proto crate.

use std::sync::Arc;

use thiserror::Error;
use tor_error::{ErrorKind, HasKind};

/// An error produced while connecting to a relay, negotiating a circuit, or
/// using one.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// The TCP connection to the relay could not be established.
    #[error("couldn't reach relay: {0}")]
    UnreachablePeer(Arc<std::io::Error>),

    /// The TLS handshake failed in a way that suggests the peer isn't
    /// speaking TLS at all, let alone acting as an ORPort.
    #[error("peer is likely not an ORPort: {0}")]
    NotAnOrPort(String),

    /// A lower-level I/O error occurred on an otherwise-established
    /// connection.
    #[error("I/O error talking to relay: {0}")]
    Io(Arc<std::io::Error>),

    /// Our advertised link protocols shared nothing in common with the
    /// peer's.
    #[error("no link protocol in common with peer")]
    NoCommonLinkProtocol,

    /// The peer's handshake violated the channel-level protocol.
    #[error("channel handshake failed: {0}")]
    HandshakeProto(String),

    /// A cell or message violated the channel-level protocol outside of the
    /// initial handshake.
    #[error("channel protocol violation: {0}")]
    ChanProto(String),

    /// A cell violated the circuit-level protocol.
    #[error("circuit protocol violation: {0}")]
    CircProto(String),

    /// The CREATE_FAST handshake's derivative key did not match: the peer
    /// either doesn't have the key material it claims to, or is confused.
    #[error("CREATE_FAST handshake rejected: derivative key mismatch")]
    HandshakeRejected,

    /// Encoding or decoding a cell failed.
    #[error(transparent)]
    Cell(#[from] tor_cell::Error),

    /// No circuit with the given ID is open on this relay connection.
    #[error("no circuit with id {0}")]
    UnknownCircuit(u32),

    /// A programming error internal to this crate or its caller.
    #[error("internal programming error")]
    Internal(tor_error::Bug),
}

impl HasKind for Error {
    fn kind(&self) -> ErrorKind {
        use Error as E;
        use ErrorKind as EK;
        match self {
            E::UnreachablePeer(_) => EK::Transport,
            E::NotAnOrPort(_) => EK::Transport,
            E::Io(_) => EK::Transport,
            E::NoCommonLinkProtocol => EK::Protocol,
            E::HandshakeProto(_) => EK::Protocol,
            E::ChanProto(_) => EK::Protocol,
            E::CircProto(_) => EK::Protocol,
            E::HandshakeRejected => EK::Protocol,
            E::Cell(e) => e.kind(),
            E::UnknownCircuit(_) => EK::Protocol,
            E::Internal(_) => EK::Internal,
        }
    }
}

impl Error {
    /// Wrap an I/O error encountered while connecting to a relay.
    pub(crate) fn unreachable(err: std::io::Error) -> Self {
        Error::UnreachablePeer(Arc::new(err))
    }

    /// Wrap an I/O error encountered on an already-established connection.
    pub(crate) fn io(err: std::io::Error) -> Self {
        Error::Io(Arc::new(err))
    }
}

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, Error>;
