//! Error types for the tor-cert crate.

use thiserror::Error;

/// An error related to checking or validating a certificate.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum CertError {
    /// The key on a certificate was not as expected.
    #[error("key on certificate was not as expected")]
    KeyMismatch,

    /// We tried to get the signing key from a certificate that didn't
    /// include one.
    #[error("missing signing key on certificate")]
    MissingPubKey,

    /// We tried to validate a signature, and found that it was wrong.
    #[error("signature on certificate was invalid")]
    BadSignature,
}

/// An error produced while constructing and encoding a certificate.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum CertEncodeError {
    /// A required field was never set.
    #[error("missing field `{0}` on certificate under construction")]
    MissingField(&'static str),

    /// More than 255 extensions were provided.
    #[error("too many extensions for a single certificate")]
    TooManyExtensions,

    /// The signing key provided to `encode_and_sign` doesn't match the key
    /// that was earlier registered as this certificate's signing key.
    #[error("signing key did not match declared signing key")]
    KeyMismatch,

    /// An error occurred while encoding the certificate body.
    #[error("could not encode certificate: {0}")]
    Encode(#[from] tor_bytes::EncodeError),
}
