//! Error types for the tor-control crate.

use thiserror::Error;
use tor_error::{ErrorKind, HasKind};

/// An error encountered while talking to a Tor control port.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// Couldn't open or use the control socket.
    #[error("I/O error on control connection: {0}")]
    Io(String),

    /// A line from the control port didn't match the control protocol's
    /// wire grammar.
    #[error("malformed control message: {0}")]
    Malformed(String),

    /// The control port replied with a non-2xx/3xx status code.
    #[error("command {command:?} failed: {code} {message}")]
    CommandFailed {
        /// The command that was sent.
        command: String,
        /// The 3-digit status code of the failing reply.
        code: u16,
        /// The text of the reply's final line.
        message: String,
    },

    /// No authentication method both the client and the control port
    /// support could be used.
    #[error("no supported authentication method: {0}")]
    UnsupportedAuth(String),

    /// The authentication cookie file couldn't be read.
    #[error("couldn't read authentication cookie at {path}: {source}")]
    CookieUnreadable {
        /// The path we tried to read.
        path: String,
        /// The underlying I/O error, stringified (`io::Error` isn't `Clone`).
        source: String,
    },

    /// A SAFECOOKIE server's response MAC didn't match what we computed.
    #[error("SAFECOOKIE server MAC did not verify")]
    SafeCookieMismatch,

    /// `authenticate()` sent `AUTHENTICATE` but the control port rejected it.
    #[error("authentication rejected: {0}")]
    AuthenticationRejected(String),

    /// An operation was attempted on a controller whose connection has been
    /// closed.
    #[error("controller is closed")]
    ControllerClosed,
}

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, Error>;

impl HasKind for Error {
    fn kind(&self) -> ErrorKind {
        use Error as E;
        use ErrorKind as EK;
        match self {
            E::Io(_) => EK::Transport,
            E::Malformed(_) => EK::Protocol,
            E::CommandFailed { .. } => EK::Protocol,
            E::UnsupportedAuth(_) => EK::Other,
            E::CookieUnreadable { .. } => EK::Other,
            E::SafeCookieMismatch => EK::Protocol,
            E::AuthenticationRejected(_) => EK::Protocol,
            E::ControllerClosed => EK::Other,
        }
    }
}
