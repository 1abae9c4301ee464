//! Derivation of the onion-service credential and subcredential.

use digest::Digest;
use tor_llcrypto::d::Sha3_256;

use crate::pk::{Credential, HsBlindId, HsIdentityKey, Subcredential};

/// Compute `credential = SHA3-256("credential" || identity_pubkey)`.
pub fn credential(identity: &HsIdentityKey) -> Credential {
    let mut h = Sha3_256::new();
    h.update(b"credential");
    h.update(identity.as_identity().as_bytes());
    Credential::from_bytes(h.finalize().into())
}

/// Compute `subcredential = SHA3-256("subcredential" || credential || blinded_pubkey)`.
pub fn subcredential(identity: &HsIdentityKey, blinded_id: &HsBlindId) -> Subcredential {
    let cred = credential(identity);
    let mut h = Sha3_256::new();
    h.update(b"subcredential");
    h.update(cred.as_ref());
    h.update(blinded_id.as_ref());
    Subcredential::from_bytes(h.finalize().into())
}

#[cfg(test)]
mod test {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use tor_llcrypto::pk::ed25519;

    #[test]
    fn credential_is_deterministic() {
        let id = HsIdentityKey::from_identity(ed25519::Ed25519Identity::new([3u8; 32]));
        let a = credential(&id);
        let b = credential(&id);
        assert_eq!(a.as_ref(), b.as_ref());
        assert_eq!(a.as_ref().len(), 32);
    }

    #[test]
    fn subcredential_depends_on_blinded_key() {
        let id = HsIdentityKey::from_identity(ed25519::Ed25519Identity::new([3u8; 32]));
        let blind_a = HsBlindId::from_identity(ed25519::Ed25519Identity::new([1u8; 32]));
        let blind_b = HsBlindId::from_identity(ed25519::Ed25519Identity::new([2u8; 32]));

        let sub_a = subcredential(&id, &blind_a);
        let sub_b = subcredential(&id, &blind_b);
        assert_ne!(sub_a.as_ref(), sub_b.as_ref());
    }
}
