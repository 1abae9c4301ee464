//! Re-exports of Ed25519 implementations, and related utilities.
//!
//! We re-export types from [`ed25519_dalek`], and additionally provide an
//! [`Ed25519Identity`] type for the unvalidated Ed25519 "identity keys" Tor
//! uses to uniquely name a relay, distinct from a validated [`PublicKey`].

use base64ct::{Base64Unpadded, Encoding as _};
use std::fmt::{self, Debug, Display, Formatter};
use subtle::{Choice, ConstantTimeEq};

pub use ed25519_dalek::{Signature, Signer, SigningKey as Keypair, Verifier, VerifyingKey as PublicKey};

use crate::util::ct::CtByteArray;

/// Length of an Ed25519 identity, in bytes.
pub const ED25519_ID_LEN: usize = 32;

/// Length of an Ed25519 signature, in bytes.
pub const ED25519_SIGNATURE_LEN: usize = 64;

/// An unchecked, unvalidated Ed25519 public key.
///
/// Distinct from [`PublicKey`] because it hasn't been checked to actually be
/// a valid point on the curve, and is stored in a compact form.
#[derive(Clone, Copy, Hash, PartialOrd, Ord, Eq, PartialEq)]
pub struct Ed25519Identity {
    /// The raw, unchecked public key bytes.
    id: CtByteArray<ED25519_ID_LEN>,
}

impl Ed25519Identity {
    /// Construct a new identity from a 32-byte sequence.
    ///
    /// This might or might not actually be a valid Ed25519 public key.
    pub fn new(id: [u8; 32]) -> Self {
        Ed25519Identity { id: id.into() }
    }
    /// If `id` is of the correct length, wrap it in an `Ed25519Identity`.
    pub fn from_bytes(id: &[u8]) -> Option<Self> {
        Some(Ed25519Identity::new(id.try_into().ok()?))
    }
    /// Return a reference to the bytes in this key.
    pub fn as_bytes(&self) -> &[u8] {
        let r: &[u8] = self.id.as_ref();
        r
    }
}

impl From<[u8; ED25519_ID_LEN]> for Ed25519Identity {
    fn from(id: [u8; ED25519_ID_LEN]) -> Self {
        Ed25519Identity::new(id)
    }
}

impl From<PublicKey> for Ed25519Identity {
    fn from(pk: PublicKey) -> Self {
        (&pk).into()
    }
}

impl From<&PublicKey> for Ed25519Identity {
    fn from(pk: &PublicKey) -> Self {
        Ed25519Identity::from_bytes(pk.as_bytes()).expect("ed25519 public key had wrong length")
    }
}

impl TryFrom<&Ed25519Identity> for PublicKey {
    type Error = ed25519_dalek::SignatureError;
    fn try_from(id: &Ed25519Identity) -> Result<PublicKey, Self::Error> {
        let bytes: [u8; ED25519_ID_LEN] = id.id.into();
        PublicKey::from_bytes(&bytes)
    }
}

impl TryFrom<Ed25519Identity> for PublicKey {
    type Error = ed25519_dalek::SignatureError;
    fn try_from(id: Ed25519Identity) -> Result<PublicKey, Self::Error> {
        (&id).try_into()
    }
}

impl ConstantTimeEq for Ed25519Identity {
    fn ct_eq(&self, other: &Self) -> Choice {
        self.id.ct_eq(&other.id)
    }
}

impl Display for Ed25519Identity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Base64Unpadded::encode_string(self.as_bytes()))
    }
}

impl Debug for Ed25519Identity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519Identity {{ {} }}", self)
    }
}

impl safelog::Redactable for Ed25519Identity {
    /// Displays 12 bits of the identity, enough to narrow down a public
    /// relay significantly: do not use for anything more sensitive.
    fn display_redacted(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}…", &Base64Unpadded::encode_string(self.as_bytes())[..2])
    }

    fn debug_redacted(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519Identity {{ {} }}", self.redacted())
    }
}

/// An Ed25519 signature, plus the document it allegedly signs and the key
/// that allegedly signed it.
#[derive(Clone, Debug)]
pub struct ValidatableEd25519Signature {
    /// The key that allegedly produced the signature.
    key: PublicKey,
    /// The alleged signature.
    sig: Signature,
    /// The entire body of text that is allegedly signed here.
    entire_text_of_signed_thing: Vec<u8>,
}

impl ValidatableEd25519Signature {
    /// Create a new `ValidatableEd25519Signature`.
    pub fn new(key: PublicKey, sig: Signature, text: &[u8]) -> Self {
        ValidatableEd25519Signature {
            key,
            sig,
            entire_text_of_signed_thing: text.into(),
        }
    }

    /// View the interior of this signature object.
    fn as_parts(&self) -> (&PublicKey, &Signature, &[u8]) {
        (&self.key, &self.sig, &self.entire_text_of_signed_thing[..])
    }

    /// Return a reference to the underlying signature.
    pub fn signature(&self) -> &Signature {
        &self.sig
    }
}

impl super::ValidatableSignature for ValidatableEd25519Signature {
    fn is_valid(&self) -> bool {
        self.key
            .verify(&self.entire_text_of_signed_thing[..], &self.sig)
            .is_ok()
    }

    fn as_ed25519(&self) -> Option<&ValidatableEd25519Signature> {
        Some(self)
    }
}

/// Batch-validate the given signatures.
///
/// Returns `true` only if every one of `sigs` is valid. An ostensible
/// signature that passes single-signature validation could in principle
/// fail batch validation or vice versa; a correctly generated signature
/// will always pass both.
pub fn validate_batch(sigs: &[&ValidatableEd25519Signature]) -> bool {
    use super::ValidatableSignature;
    if sigs.is_empty() {
        true
    } else if sigs.len() == 1 {
        sigs[0].is_valid()
    } else {
        let mut ed_msgs = Vec::new();
        let mut ed_sigs = Vec::new();
        let mut ed_pks = Vec::new();
        for ed_sig in sigs {
            let (pk, sig, msg) = ed_sig.as_parts();
            ed_sigs.push(*sig);
            ed_pks.push(*pk);
            ed_msgs.push(msg);
        }
        ed25519_dalek::verify_batch(&ed_msgs[..], &ed_sigs[..], &ed_pks[..]).is_ok()
    }
}

#[cfg(test)]
mod test {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use hex_literal::hex;

    #[test]
    fn validatable_ed_sig_roundtrip() {
        use crate::pk::ValidatableSignature;
        use rand::rngs::OsRng;

        let keypair = Keypair::generate(&mut OsRng);
        let pk = keypair.verifying_key();
        let msg = hex!("af82");
        let sig = keypair.sign(&msg);

        let valid = ValidatableEd25519Signature::new(pk, sig, &msg);
        let invalid = ValidatableEd25519Signature::new(pk, sig, &hex!("af83"));

        assert!(valid.is_valid());
        assert!(!invalid.is_valid());
    }

    #[test]
    fn identity_roundtrips_through_bytes() {
        let bytes = *b"klsadjfkladsfjklsdafkljasdfsdsd!";
        let id = Ed25519Identity::new(bytes);
        assert_eq!(id.as_bytes(), &bytes[..]);
    }
}
