//! Error types for the tor-netdoc crate.

use thiserror::Error;
use tor_error::{ErrorKind, HasKind};

/// An error produced while tokenizing or validating a directory document.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A required keyword never appeared in the document.
    #[error("missing required keyword `{0}`")]
    MissingKeyword(&'static str),

    /// A keyword that may only appear once appeared more than once.
    #[error("duplicate of single-valued keyword `{0}`")]
    DuplicateKeyword(&'static str),

    /// A PEM-style object block was truncated, unterminated, or not valid
    /// base64.
    #[error("truncated or malformed object block")]
    TruncatedObject,

    /// A line, or an argument on a line, was not in the expected format.
    #[error("malformed document: {0}")]
    Malformed(String),

    /// A signature did not validate against the key it claimed to be made
    /// with.
    #[error("signature did not validate")]
    BadSignature,

    /// An onion-service descriptor layer could not be decrypted: a bad MAC,
    /// a wrong subcredential, or a wrong revision counter.
    #[error("unable to decrypt descriptor layer")]
    Decryption,

    /// A certificate embedded in the document failed to validate.
    #[error("certificate error: {0}")]
    Cert(#[from] tor_cert::CertError),

    /// A certificate or descriptor is not valid at the time it was checked.
    #[error("document is not currently valid: {0}")]
    NotTimely(#[from] tor_checkable::TimeValidityError),

    /// An onion address was malformed or failed its checksum.
    #[error("malformed onion address: {0}")]
    OnionAddress(#[from] tor_hscrypto::onion::OnionAddressError),

    /// A fixed-format field (a key, a digest, a cert) could not be decoded.
    #[error("{0}")]
    Bytes(#[from] tor_bytes::Error),
}

impl From<tor_hscrypto::enc::DecryptionError> for Error {
    fn from(_: tor_hscrypto::enc::DecryptionError) -> Self {
        Error::Decryption
    }
}

impl HasKind for Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Error::MissingKeyword(_)
            | Error::DuplicateKeyword(_)
            | Error::TruncatedObject
            | Error::Malformed(_)
            | Error::BadSignature
            | Error::Decryption
            | Error::Cert(_)
            | Error::NotTimely(_)
            | Error::OnionAddress(_)
            | Error::Bytes(_) => ErrorKind::Descriptor,
        }
    }
}

/// A `Result` defined to use [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
