//! Key types used in onion-service v3 descriptor cryptography.

use tor_llcrypto::pk::ed25519;
use tor_llcrypto::util::ct::CtByteArray;

/// The long-term identity public key of an onion service.
///
/// Encoded into, and recoverable from, the service's `.onion` address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HsIdentityKey(ed25519::Ed25519Identity);

impl HsIdentityKey {
    /// Wrap a raw Ed25519 identity as an `HsIdentityKey`.
    pub fn from_identity(id: ed25519::Ed25519Identity) -> Self {
        HsIdentityKey(id)
    }
    /// Return the underlying Ed25519 identity.
    pub fn as_identity(&self) -> &ed25519::Ed25519Identity {
        &self.0
    }
}

/// The current blinded service identity key, as published in a descriptor's
/// signing-key certificate.
///
/// Unlike [`HsIdentityKey`], this key changes every time period; it's
/// derived from the identity key plus the period number, but this crate
/// only consumes it as given (from the descriptor's certificate), since
/// deriving it client-side requires the current consensus time period.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HsBlindId(ed25519::Ed25519Identity);

impl HsBlindId {
    /// Wrap a raw Ed25519 identity as an `HsBlindId`.
    pub fn from_identity(id: ed25519::Ed25519Identity) -> Self {
        HsBlindId(id)
    }
    /// Return the underlying Ed25519 identity.
    pub fn as_identity(&self) -> &ed25519::Ed25519Identity {
        &self.0
    }
}

impl AsRef<[u8]> for HsBlindId {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

/// A 32-byte service credential, derived from an identity key.
///
/// See [`crate::cred::credential`].
#[derive(Clone, Copy)]
pub struct Credential(CtByteArray<32>);

impl Credential {
    /// Wrap a raw 32-byte credential.
    pub(crate) fn from_bytes(b: [u8; 32]) -> Self {
        Credential(b.into())
    }
}

impl AsRef<[u8]> for Credential {
    fn as_ref(&self) -> &[u8] {
        let r: &[u8] = self.0.as_ref();
        r
    }
}

/// A 32-byte subcredential: the per-period secret used to key descriptor
/// layer encryption.
///
/// See [`crate::cred::subcredential`].
#[derive(Clone, Copy)]
pub struct Subcredential(CtByteArray<32>);

impl Subcredential {
    /// Wrap a raw 32-byte subcredential.
    pub(crate) fn from_bytes(b: [u8; 32]) -> Self {
        Subcredential(b.into())
    }
}

impl AsRef<[u8]> for Subcredential {
    fn as_ref(&self) -> &[u8] {
        let r: &[u8] = self.0.as_ref();
        r
    }
}

#[cfg(test)]
mod test {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn blind_id_as_ref_matches_identity_bytes() {
        let id = ed25519::Ed25519Identity::new([9u8; 32]);
        let blind = HsBlindId::from_identity(id);
        assert_eq!(blind.as_ref(), id.as_bytes());
    }
}
