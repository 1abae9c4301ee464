//! Re-exporting RSA implementations.
//!
//! This module can currently handle RSA public keys and signature
//! verification, as used by the legacy parts of the Tor directory
//! protocol.

use std::fmt;

use rsa::pkcs1::{DecodeRsaPublicKey, EncodeRsaPublicKey};
use rsa::traits::PublicKeyParts;
use rsa::Pkcs1v15Sign;
use sha1::{Digest, Sha1};

use crate::util::ct::CtByteArray;

/// Length of an RSA identity (a SHA-1 digest of its DER-encoded key), in
/// bytes.
pub const RSA_ID_LEN: usize = 20;

/// The identity of an RSA key, as used in Tor: the SHA-1 digest of the
/// DER encoding of the public key's modulus and exponent.
#[derive(Clone, Copy, Hash, Eq, PartialEq)]
pub struct RsaIdentity {
    /// The underlying digest bytes.
    id: CtByteArray<RSA_ID_LEN>,
}

impl fmt::Display for RsaIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", hex::encode_upper(self.as_bytes()))
    }
}

impl fmt::Debug for RsaIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RsaIdentity {{ {} }}", self)
    }
}

impl safelog::Redactable for RsaIdentity {
    fn display_redacted(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}…", hex::encode_upper(&self.as_bytes()[..3]))
    }

    fn debug_redacted(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RsaIdentity {{ {} }}", self.redacted())
    }
}

impl RsaIdentity {
    /// Construct an RsaIdentity from a slice of bytes.
    ///
    /// Returns `None` if the input is not exactly `RSA_ID_LEN` bytes long.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        Some(RsaIdentity {
            id: CtByteArray::from(<[u8; RSA_ID_LEN]>::try_from(bytes).ok()?),
        })
    }
    /// Return a reference to the byte array making up this identity.
    pub fn as_bytes(&self) -> &[u8] {
        let r: &[u8] = self.id.as_ref();
        r
    }
}

impl From<[u8; RSA_ID_LEN]> for RsaIdentity {
    fn from(id: [u8; RSA_ID_LEN]) -> Self {
        RsaIdentity { id: id.into() }
    }
}

/// An RSA public key, used in legacy parts of the Tor directory protocol.
///
/// Only supports a limited set of operations, sufficient for verifying
/// onion-service/router descriptors and certificates.
#[derive(Clone)]
pub struct PublicKey(rsa::RsaPublicKey);

impl PublicKey {
    /// Parse a PublicKey from its DER encoding, as given in Tor's
    /// directory documents.
    pub fn from_der(der: &[u8]) -> Option<Self> {
        rsa::RsaPublicKey::from_pkcs1_der(der).ok().map(PublicKey)
    }
    /// Encode this key as a DER blob, as given in Tor's directory
    /// documents.
    pub fn to_der(&self) -> Vec<u8> {
        self.0
            .to_pkcs1_der()
            .expect("generated an unencodeable RSA key")
            .to_vec()
    }
    /// Return the number of bits in this key's modulus.
    pub fn bits(&self) -> usize {
        self.0.size() * 8
    }
    /// Return true iff the public exponent of this key is `e`.
    pub fn exponent_is(&self, e: u32) -> bool {
        use rsa::BigUint;
        self.0.e() == &BigUint::from(e)
    }
    /// Check a signature, given the bytes that were signed.
    ///
    /// The `signed` bytes are taken to already be the digest (Tor uses raw
    /// PKCS#1v1.5 signatures, not a signature of a digest-with-identifier
    /// prefix, for its directory documents).
    pub fn verify(&self, signed: &[u8], sig: &[u8]) -> Result<(), signature::Error> {
        self.0
            .verify(Pkcs1v15Sign::new_unprefixed(), signed, sig)
            .map_err(|_| signature::Error::new())
    }
    /// Compute the RsaIdentity for this public key: the SHA-1 digest of
    /// its DER encoding.
    pub fn to_rsa_identity(&self) -> RsaIdentity {
        let der = self.to_der();
        let digest = Sha1::digest(&der);
        RsaIdentity::from_bytes(&digest).expect("sha1 produced the wrong digest length")
    }
}

/// A signature, and the RSA public key and signed document that it
/// allegedly belongs to.
pub struct ValidatableRsaSignature {
    /// The key that allegedly produced this signature.
    key: PublicKey,
    /// The alleged signature.
    sig: Vec<u8>,
    /// The document that is allegedly signed here.
    ///
    /// Tor signs the document's digest directly (no hash identifier
    /// prefix), so this must already be the digest rather than the full
    /// document.
    signed: Vec<u8>,
}

impl ValidatableRsaSignature {
    /// Create a new ValidatableRsaSignature.
    pub fn new(key: PublicKey, sig: &[u8], signed: &[u8]) -> Self {
        ValidatableRsaSignature {
            key,
            sig: sig.into(),
            signed: signed.into(),
        }
    }
}

impl super::ValidatableSignature for ValidatableRsaSignature {
    fn is_valid(&self) -> bool {
        self.key.verify(&self.signed[..], &self.sig[..]).is_ok()
    }
}

#[cfg(test)]
mod test {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use rand::rngs::OsRng;
    use rsa::{RsaPrivateKey, RsaPublicKey};

    #[test]
    fn der_roundtrip() {
        let priv_key = RsaPrivateKey::new(&mut OsRng, 1024).unwrap();
        let der = RsaPublicKey::from(&priv_key).to_pkcs1_der().unwrap().to_vec();

        let pk = PublicKey::from_der(&der).unwrap();
        assert_eq!(pk.to_der(), der);
        assert!(pk.exponent_is(65537));
        assert_eq!(pk.bits(), 1024);
    }

    #[test]
    fn verify_rsa_signature() {
        use super::super::ValidatableSignature;

        let priv_key = RsaPrivateKey::new(&mut OsRng, 1024).unwrap();
        let der = RsaPublicKey::from(&priv_key).to_pkcs1_der().unwrap().to_vec();
        let pk = PublicKey::from_der(&der).unwrap();

        let digest = Sha1::digest(b"a router descriptor");
        let sig = priv_key
            .sign(Pkcs1v15Sign::new_unprefixed(), &digest)
            .unwrap();

        let good = ValidatableRsaSignature::new(pk.clone(), &sig, &digest);
        assert!(good.is_valid());

        let bad_digest = Sha1::digest(b"a different router descriptor");
        let bad = ValidatableRsaSignature::new(pk, &sig, &bad_digest);
        assert!(!bad.is_valid());
    }

    #[test]
    fn identity_from_short_bytes_is_none() {
        assert!(RsaIdentity::from_bytes(&[0_u8; 3]).is_none());
    }
}
