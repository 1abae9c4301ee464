//! Parsing and validating v3 `.onion` addresses.

use digest::Digest;
use tor_llcrypto::d::Sha3_256;
use tor_llcrypto::pk::ed25519;

use crate::pk::HsIdentityKey;

/// The version byte that every v3 onion address ends with.
const ONION_V3_VERSION: u8 = 3;

/// An error produced while parsing a `.onion` address.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum OnionAddressError {
    /// The address was not valid base32, or was the wrong length.
    #[error("malformed onion address")]
    Malformed,
    /// The address's version byte was not 3.
    #[error("unsupported onion address version")]
    UnsupportedVersion,
    /// The address's checksum did not match its public key.
    #[error("onion address checksum mismatch")]
    BadChecksum,
}

/// A parsed, checksum-validated v3 onion address (the part before
/// `.onion`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OnionAddressV3 {
    /// The service's long-term identity key, as encoded in the address.
    identity: HsIdentityKey,
}

impl OnionAddressV3 {
    /// Parse and checksum-validate a v3 onion address, given the portion
    /// before `.onion` (case-insensitive).
    pub fn parse(address: &str) -> Result<Self, OnionAddressError> {
        let decoded = base32::decode(base32::Alphabet::Rfc4648 { padding: false }, address)
            .ok_or(OnionAddressError::Malformed)?;
        if decoded.len() != 32 + 2 + 1 {
            return Err(OnionAddressError::Malformed);
        }
        let pubkey_bytes: [u8; 32] = decoded[0..32].try_into().expect("checked length above");
        let checksum = &decoded[32..34];
        let version = decoded[34];

        if version != ONION_V3_VERSION {
            return Err(OnionAddressError::UnsupportedVersion);
        }

        let expected = compute_checksum(&pubkey_bytes, version);
        if expected != checksum {
            return Err(OnionAddressError::BadChecksum);
        }

        Ok(OnionAddressV3 {
            identity: HsIdentityKey::from_identity(ed25519::Ed25519Identity::new(pubkey_bytes)),
        })
    }

    /// Return the service identity key encoded in this address.
    pub fn identity_key(&self) -> &HsIdentityKey {
        &self.identity
    }
}

/// Compute the two-byte checksum `SHA3-256(".onion checksum" || pubkey || version)[:2]`.
fn compute_checksum(pubkey: &[u8; 32], version: u8) -> [u8; 2] {
    let mut h = Sha3_256::new();
    h.update(b".onion checksum");
    h.update(pubkey);
    h.update([version]);
    let digest = h.finalize();
    [digest[0], digest[1]]
}

#[cfg(test)]
mod test {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn encode(pubkey: [u8; 32]) -> String {
        let checksum = compute_checksum(&pubkey, ONION_V3_VERSION);
        let mut bytes = Vec::with_capacity(35);
        bytes.extend_from_slice(&pubkey);
        bytes.extend_from_slice(&checksum);
        bytes.push(ONION_V3_VERSION);
        base32::encode(base32::Alphabet::Rfc4648 { padding: false }, &bytes)
    }

    #[test]
    fn valid_address_roundtrips() {
        let pubkey = [5u8; 32];
        let addr = encode(pubkey);
        let parsed = OnionAddressV3::parse(&addr).unwrap();
        assert_eq!(parsed.identity_key().as_identity().as_bytes(), &pubkey[..]);
    }

    #[test]
    fn bad_checksum_is_rejected() {
        let pubkey = [5u8; 32];
        let mut addr = encode(pubkey);
        addr.replace_range(0..1, if addr.starts_with('a') { "b" } else { "a" });
        assert!(matches!(
            OnionAddressV3::parse(&addr),
            Err(OnionAddressError::BadChecksum) | Err(OnionAddressError::Malformed)
        ));
    }

    #[test]
    fn wrong_length_is_malformed() {
        assert_eq!(
            OnionAddressV3::parse("AAAA"),
            Err(OnionAddressError::Malformed)
        );
    }
}
