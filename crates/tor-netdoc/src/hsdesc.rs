//! Onion service (`.onion`, v3) descriptors.

use base64ct::{Base64, Base64Unpadded, Encoding};
use digest::Digest;

use tor_bytes::Reader;
use tor_cert::{CertType, Ed25519Cert, UncheckedCert};
use tor_checkable::{SelfSigned, Timebound};
use tor_hscrypto::enc::{LayerKey, ENCRYPTED_CONST, SUPERENCRYPTED_CONST};
use tor_hscrypto::onion::OnionAddressV3;
use tor_hscrypto::pk::HsBlindId;
use tor_hscrypto::{cred, RevisionCounter};
use tor_linkspec::LinkSpecifier;
use tor_llcrypto::d::Sha256;
use tor_llcrypto::pk::ed25519;
use tor_llcrypto::pk::ValidatableSignature;

use crate::err::{Error, Result};
use crate::parse::{self, signed_range_exclusive};

/// The string prepended before hashing the signed portion of an onion
/// service descriptor.
const SIG_PREFIX: &[u8] = b"Tor onion service descriptor sig v3";

/// The outer envelope of a v3 onion service descriptor, as published to
/// (and fetched from) an HSDir.
///
/// This layer's fields are plaintext; the service's actual contents (its
/// introduction points and their keys) are nested two layers of encryption
/// deeper, recovered by [`HiddenServiceDescriptor::decrypt`].
#[derive(Debug, Clone)]
pub struct HiddenServiceDescriptor {
    /// How many seconds this descriptor is valid for, from the time it was
    /// fetched.
    pub lifetime_seconds: u32,
    /// The certificate binding the descriptor's blinded identity key to the
    /// short-term descriptor signing key that signs this document.
    pub signing_key_cert: UncheckedCert,
    /// The version number the service published this descriptor under; a
    /// client should prefer the highest revision counter it sees.
    pub revision_counter: RevisionCounter,
    /// The superencrypted (outermost encrypted) layer, still sealed.
    superencrypted: Vec<u8>,
    /// The raw signature bytes from the final `signature` line.
    signature: Vec<u8>,
}

impl HiddenServiceDescriptor {
    /// Parse a descriptor from its text. Does not check its signature, or
    /// decrypt its contents.
    pub fn parse(document: &str) -> Result<Self> {
        let items = parse::tokenize(document)?;

        let header = parse::require(&items, "hs-descriptor")?;
        if header.required_arg(0)? != "3" {
            return Err(Error::Malformed("unsupported hs-descriptor version".into()));
        }

        let lifetime_seconds: u32 = parse::require(&items, "descriptor-lifetime")?
            .required_arg(0)?
            .parse()
            .map_err(|_| Error::Malformed("descriptor-lifetime is not a number".into()))?;

        let cert_item = parse::require(&items, "descriptor-signing-key-cert")?;
        let cert_bytes = cert_item.obj_bytes_tagged("ED25519 CERT")?;
        let known = Ed25519Cert::decode(cert_bytes)?;
        if known.peek_cert_type() != CertType::HS_BLINDED_ID_V_SIGNING {
            return Err(Error::Malformed(
                "descriptor-signing-key-cert has the wrong cert type".into(),
            ));
        }
        let signing_key_cert = known.should_have_signing_key()?;

        let revision_counter: u64 = parse::require(&items, "revision-counter")?
            .required_arg(0)?
            .parse()
            .map_err(|_| Error::Malformed("revision-counter is not a number".into()))?;

        let superencrypted = parse::require(&items, "superencrypted")?
            .obj_bytes_tagged("MESSAGE")?
            .to_vec();

        let signature_item = parse::require(&items, "signature")?;
        let signature = Base64Unpadded::decode_vec(signature_item.required_arg(0)?)
            .map_err(|_| Error::TruncatedObject)?;

        Ok(HiddenServiceDescriptor {
            lifetime_seconds,
            signing_key_cert,
            revision_counter: RevisionCounter::from(revision_counter),
            superencrypted,
            signature,
        })
    }

    /// Check the descriptor's embedded certificate (against the service's
    /// blinded identity key for the period the descriptor claims to cover)
    /// and the descriptor's own signature (against the certified signing
    /// key).
    pub fn check_signatures(&self, document: &str, blinded_id: &HsBlindId) -> Result<()> {
        let signing_key = self
            .signing_key_cert
            .peek_subject_key()
            .as_ed25519()
            .ok_or_else(|| Error::Malformed("descriptor-signing-key-cert does not certify an Ed25519 key".into()))?;
        let signing_key: ed25519::PublicKey = (*signing_key)
            .try_into()
            .map_err(|_| Error::Malformed("descriptor signing key is invalid".into()))?;

        let cert = self.signing_key_cert.clone().should_be_signed_with(blinded_id.as_identity())?;
        let checked = cert.check_signature()?;
        checked.is_valid_at(&std::time::SystemTime::now())?;

        let range = signed_range_exclusive(document, "hs-descriptor", "signature")?;
        let mut h = Sha256::new();
        h.update(SIG_PREFIX);
        h.update(range.as_bytes());
        let digest = h.finalize();

        let sig: [u8; 64] = self
            .signature
            .as_slice()
            .try_into()
            .map_err(|_| Error::Malformed("signature has the wrong length".into()))?;
        let sig = ed25519::Signature::from_bytes(&sig);
        let validatable = ed25519::ValidatableEd25519Signature::new(signing_key, sig, &digest);
        if ValidatableSignature::is_valid(&validatable) {
            Ok(())
        } else {
            Err(Error::BadSignature)
        }
    }

    /// Peel the superencrypted layer, using the service's identity (parsed
    /// from its `.onion` address) and its blinded identity key for the
    /// current time period.
    ///
    /// The blinded key is not derived here: deriving it from the identity
    /// key and a time period requires the service's blinding parameters,
    /// which callers obtain separately.
    pub fn decrypt(&self, onion_address: &str, blinded_id: &HsBlindId) -> Result<SuperencryptedLayer> {
        let address = OnionAddressV3::parse(onion_address)?;
        let subcredential = cred::subcredential(address.identity_key(), blinded_id);

        let outer_key = LayerKey {
            blinded_id,
            subcredential: &subcredential,
            revision: self.revision_counter,
            string_const: SUPERENCRYPTED_CONST,
        };
        let plaintext = outer_key.decrypt(&self.superencrypted)?;
        SuperencryptedLayer::parse(std::str::from_utf8(&plaintext).map_err(|_| Error::Decryption)?, blinded_id, &subcredential, self.revision_counter)
    }
}

/// The superencrypted layer: mostly authentication-related fields, plus the
/// `encrypted` blob that holds the actual introduction point list.
#[derive(Debug, Clone)]
pub struct SuperencryptedLayer {
    /// True if this service requires descriptor-level client authorization
    /// to read the inner (encrypted) layer.
    pub auth_required: bool,
    /// The still-sealed inner layer.
    encrypted: Vec<u8>,
}

impl SuperencryptedLayer {
    fn parse(document: &str, blinded_id: &HsBlindId, subcredential: &tor_hscrypto::pk::Subcredential, revision: RevisionCounter) -> Result<Self> {
        let items = parse::tokenize(document)?;
        let auth_required = parse::find(&items, "desc-auth-type").is_some();
        let encrypted = parse::require(&items, "encrypted")?
            .obj_bytes_tagged("MESSAGE")?
            .to_vec();

        let _ = (blinded_id, subcredential, revision);
        Ok(SuperencryptedLayer { auth_required, encrypted })
    }

    /// Peel the inner (encrypted) layer, recovering the service's
    /// introduction points.
    pub fn decrypt(&self, blinded_id: &HsBlindId, subcredential: &tor_hscrypto::pk::Subcredential, revision: RevisionCounter) -> Result<InnerLayer> {
        let inner_key = LayerKey {
            blinded_id,
            subcredential,
            revision,
            string_const: ENCRYPTED_CONST,
        };
        let plaintext = inner_key.decrypt(&self.encrypted)?;
        InnerLayer::parse(std::str::from_utf8(&plaintext).map_err(|_| Error::Decryption)?)
    }
}

/// The inner (fully decrypted) layer of a descriptor: the service's actual
/// capabilities and introduction points.
#[derive(Debug, Clone)]
pub struct InnerLayer {
    /// The rendezvous/introduction handshake formats this service accepts,
    /// from the `create2-formats` line.
    pub create2_formats: Vec<u32>,
    /// True if this service is single-hop (a non-anonymous "single onion
    /// service"), from the presence of a `single-onion-service` line.
    pub single_onion_service: bool,
    /// The service's introduction points, in declaration order.
    pub intro_points: Vec<IntroductionPoint>,
}

impl InnerLayer {
    fn parse(document: &str) -> Result<Self> {
        let items = parse::tokenize(document)?;

        let create2_formats = parse::require(&items, "create2-formats")?
            .args()
            .map(|a| a.parse().map_err(|_| Error::Malformed("create2-formats has a non-numeric entry".into())))
            .collect::<Result<Vec<u32>>>()?;

        let single_onion_service = parse::find(&items, "single-onion-service").is_some();

        let mut intro_points = Vec::new();
        let mut current: Vec<&parse::Item<'_>> = Vec::new();
        for item in &items {
            if item.keyword == "introduction-point" {
                if !current.is_empty() {
                    intro_points.push(IntroductionPoint::parse(&current)?);
                }
                current = Vec::new();
            }
            if !current.is_empty() || item.keyword == "introduction-point" {
                current.push(item);
            }
        }
        if !current.is_empty() {
            intro_points.push(IntroductionPoint::parse(&current)?);
        }

        Ok(InnerLayer {
            create2_formats,
            single_onion_service,
            intro_points,
        })
    }
}

/// One of a service's introduction points.
#[derive(Debug, Clone)]
pub struct IntroductionPoint {
    /// The link specifiers a client uses to locate and connect to this
    /// introduction point's relay.
    pub link_specifiers: Vec<LinkSpecifier>,
    /// The relay's ntor onion key for the introduction handshake.
    pub onion_key_ntor: [u8; 32],
    /// The certificate binding the descriptor signing key to this
    /// introduction point's authentication key.
    pub auth_key_cert: UncheckedCert,
    /// The ntor-converted encryption key used for the introduce/rendezvous
    /// handshake.
    pub enc_key_ntor: [u8; 32],
    /// The certificate cross-certifying `enc_key_ntor` with the descriptor
    /// signing key.
    pub enc_key_cert: UncheckedCert,
}

impl IntroductionPoint {
    fn parse(items: &[&parse::Item<'_>]) -> Result<Self> {
        let link_specifiers_item = items
            .iter()
            .find(|i| i.keyword == "introduction-point")
            .ok_or_else(|| Error::Malformed("introduction point has no `introduction-point` line".into()))?;
        let raw = Base64::decode_vec(link_specifiers_item.required_arg(0)?).map_err(|_| Error::TruncatedObject)?;
        let mut r = Reader::from_slice(&raw);
        let count = r.take_u8()?;
        let link_specifiers = r.extract_n::<LinkSpecifier>(count as usize)?;

        let onion_key_item = items
            .iter()
            .find(|i| i.keyword == "onion-key" && i.args().next() == Some("ntor"))
            .ok_or_else(|| Error::Malformed("introduction point has no ntor onion-key".into()))?;
        let onion_key_ntor = decode_fixed::<32>(onion_key_item.required_arg(1)?)?;

        let auth_key_item = items
            .iter()
            .find(|i| i.keyword == "auth-key")
            .ok_or_else(|| Error::Malformed("introduction point has no auth-key".into()))?;
        let auth_key_cert =
            Ed25519Cert::decode(auth_key_item.obj_bytes_tagged("ED25519 CERT")?)?.should_have_signing_key()?;

        let enc_key_item = items
            .iter()
            .find(|i| i.keyword == "enc-key" && i.args().next() == Some("ntor"))
            .ok_or_else(|| Error::Malformed("introduction point has no ntor enc-key".into()))?;
        let enc_key_ntor = decode_fixed::<32>(enc_key_item.required_arg(1)?)?;

        let enc_key_cert_item = items
            .iter()
            .find(|i| i.keyword == "enc-key-cert")
            .ok_or_else(|| Error::Malformed("introduction point has no enc-key-cert".into()))?;
        let enc_key_cert =
            Ed25519Cert::decode(enc_key_cert_item.obj_bytes_tagged("ED25519 CERT")?)?.should_have_signing_key()?;

        Ok(IntroductionPoint {
            link_specifiers,
            onion_key_ntor,
            auth_key_cert,
            enc_key_ntor,
            enc_key_cert,
        })
    }
}

/// Base64-decode (unpadded) `s` into a fixed-size array.
fn decode_fixed<const N: usize>(s: &str) -> Result<[u8; N]> {
    Base64Unpadded::decode_vec(s)
        .map_err(|_| Error::TruncatedObject)?
        .try_into()
        .map_err(|_| Error::Malformed("field has the wrong decoded length".into()))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rejects_wrong_version() {
        let doc = "hs-descriptor 2\n";
        assert!(HiddenServiceDescriptor::parse(doc).is_err());
    }

    #[test]
    fn rejects_missing_cert() {
        let doc = "hs-descriptor 3\ndescriptor-lifetime 180\nrevision-counter 5\n";
        assert!(matches!(
            HiddenServiceDescriptor::parse(doc),
            Err(Error::MissingKeyword("descriptor-signing-key-cert"))
        ));
    }

    #[test]
    fn inner_layer_splits_intro_points() {
        let doc = "\
create2-formats 2
introduction-point AAA=
onion-key ntor AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA
introduction-point BBB=
onion-key ntor AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA
";
        let items = parse::tokenize(doc).unwrap();
        let create2 = parse::require(&items, "create2-formats").unwrap();
        assert_eq!(create2.args().count(), 1);
        let count = items.iter().filter(|i| i.keyword == "introduction-point").count();
        assert_eq!(count, 2);
    }
}
