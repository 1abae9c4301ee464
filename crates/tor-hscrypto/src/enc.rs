//! Encryption and decryption of onion-service v3 descriptor layers.

use cipher::{KeyIvInit, StreamCipher};
use digest::{Digest, ExtendableOutput, Update, XofReader};
use zeroize::Zeroizing as Z;

use tor_llcrypto::cipher::aes::Aes256Ctr as Cipher;
use tor_llcrypto::d::{Sha3_256, Shake256};

use crate::pk::{HsBlindId, Subcredential};
use crate::RevisionCounter;

/// Length of the random salt prefixed to every encrypted layer.
const SALT_LEN: usize = 16;
/// Length of the MAC suffixed to every encrypted layer.
const MAC_LEN: usize = 32;
/// Length of the AES-256 key.
const CIPHER_KEY_LEN: usize = 32;
/// Length of the AES-CTR IV.
const IV_LEN: usize = 16;
/// Length of the MAC key.
const MAC_KEY_LEN: usize = 32;

/// The personalization string for the outer (superencrypted) layer.
pub const SUPERENCRYPTED_CONST: &[u8] = b"hsdir-superencrypted-data";
/// The personalization string for the inner (encrypted) layer.
pub const ENCRYPTED_CONST: &[u8] = b"hsdir-encrypted-data";

/// An error that occurs while decrypting an onion service descriptor layer.
///
/// Deliberately uninformative about which check failed, to avoid giving an
/// attacker an oracle.
#[derive(Clone, Debug, Default, thiserror::Error)]
#[error("unable to decrypt onion service descriptor layer")]
pub struct DecryptionError {}

/// The parameters needed to encrypt or decrypt one layer of an onion
/// service descriptor.
pub struct LayerKey<'a> {
    /// The blinded service identity key for the current time period.
    pub blinded_id: &'a HsBlindId,
    /// The service's subcredential.
    pub subcredential: &'a Subcredential,
    /// The descriptor's revision counter.
    pub revision: RevisionCounter,
    /// The per-layer personalization string: [`SUPERENCRYPTED_CONST`] or
    /// [`ENCRYPTED_CONST`].
    pub string_const: &'static [u8],
}

impl<'a> LayerKey<'a> {
    /// Derive the cipher key, IV, and MAC key for this layer, given `salt`.
    fn derive(&self, salt: &[u8; SALT_LEN]) -> ([u8; CIPHER_KEY_LEN], [u8; IV_LEN], Z<[u8; MAC_KEY_LEN]>) {
        let mut kdf = Shake256::default();
        kdf.update(self.blinded_id.as_ref());
        kdf.update(self.subcredential.as_ref());
        kdf.update(&u64::from(self.revision).to_be_bytes());
        kdf.update(salt);
        kdf.update(self.string_const);

        let mut xof = kdf.finalize_xof();
        let mut key = [0u8; CIPHER_KEY_LEN];
        let mut iv = [0u8; IV_LEN];
        let mut mac_key = Z::new([0u8; MAC_KEY_LEN]);
        xof.read(&mut key);
        xof.read(&mut iv);
        xof.read(&mut mac_key[..]);
        (key, iv, mac_key)
    }

    /// Compute the MAC over `mac_key || salt || ciphertext`.
    fn mac(mac_key: &[u8], salt: &[u8; SALT_LEN], ciphertext: &[u8]) -> [u8; MAC_LEN] {
        let mut h = Sha3_256::new();
        h.update(mac_key);
        h.update(salt);
        h.update(ciphertext);
        h.finalize().into()
    }

    /// Decrypt a descriptor layer framed as `salt || ciphertext || mac`.
    pub fn decrypt(&self, framed: &[u8]) -> Result<Vec<u8>, DecryptionError> {
        if framed.len() < SALT_LEN + MAC_LEN {
            return Err(DecryptionError::default());
        }
        let salt: [u8; SALT_LEN] = framed[..SALT_LEN].try_into().expect("slice has SALT_LEN bytes");
        let ciphertext_end = framed.len() - MAC_LEN;
        let ciphertext = &framed[SALT_LEN..ciphertext_end];
        let given_mac = &framed[ciphertext_end..];

        let (key, iv, mac_key) = self.derive(&salt);
        let expected_mac = Self::mac(&mac_key[..], &salt, ciphertext);
        if expected_mac[..] != *given_mac {
            return Err(DecryptionError::default());
        }

        let mut plaintext = ciphertext.to_vec();
        let mut cipher = Cipher::new(&key.into(), &iv.into());
        cipher.apply_keystream(&mut plaintext);
        Ok(plaintext)
    }

    /// Encrypt `plaintext` under a freshly supplied `salt`, producing a
    /// `salt || ciphertext || mac` frame.
    pub fn encrypt(&self, salt: [u8; SALT_LEN], plaintext: &[u8]) -> Vec<u8> {
        let (key, iv, mac_key) = self.derive(&salt);

        let mut ciphertext = plaintext.to_vec();
        let mut cipher = Cipher::new(&key.into(), &iv.into());
        cipher.apply_keystream(&mut ciphertext);

        let mac = Self::mac(&mac_key[..], &salt, &ciphertext);

        let mut out = Vec::with_capacity(SALT_LEN + ciphertext.len() + MAC_LEN);
        out.extend_from_slice(&salt);
        out.extend_from_slice(&ciphertext);
        out.extend_from_slice(&mac);
        out
    }
}

#[cfg(test)]
mod test {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use tor_llcrypto::pk::ed25519;

    fn layer<'a>(blind: &'a HsBlindId, sub: &'a Subcredential) -> LayerKey<'a> {
        LayerKey {
            blinded_id: blind,
            subcredential: sub,
            revision: RevisionCounter::from(42),
            string_const: ENCRYPTED_CONST,
        }
    }

    #[test]
    fn roundtrip() {
        let blind = HsBlindId::from_identity(ed25519::Ed25519Identity::new([1u8; 32]));
        let sub = crate::cred::subcredential(
            &crate::pk::HsIdentityKey::from_identity(ed25519::Ed25519Identity::new([2u8; 32])),
            &blind,
        );
        let lk = layer(&blind, &sub);

        let framed = lk.encrypt([7u8; 16], b"introduction points go here");
        let decrypted = lk.decrypt(&framed).unwrap();
        assert_eq!(decrypted, b"introduction points go here");
    }

    #[test]
    fn tampered_ciphertext_fails_mac() {
        let blind = HsBlindId::from_identity(ed25519::Ed25519Identity::new([1u8; 32]));
        let sub = crate::cred::subcredential(
            &crate::pk::HsIdentityKey::from_identity(ed25519::Ed25519Identity::new([2u8; 32])),
            &blind,
        );
        let lk = layer(&blind, &sub);

        let mut framed = lk.encrypt([7u8; 16], b"secret inner layer");
        let last = framed.len() - 1;
        framed[last] ^= 0xff;
        assert!(lk.decrypt(&framed).is_err());
    }

    #[test]
    fn truncated_input_is_rejected() {
        let blind = HsBlindId::from_identity(ed25519::Ed25519Identity::new([1u8; 32]));
        let sub = crate::cred::subcredential(
            &crate::pk::HsIdentityKey::from_identity(ed25519::Ed25519Identity::new([2u8; 32])),
            &blind,
        );
        let lk = layer(&blind, &sub);
        assert!(lk.decrypt(&[0u8; 10]).is_err());
    }
}
