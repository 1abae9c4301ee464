//! Ed25519 "v1" certificates, as used throughout Tor's link protocol and
//! directory documents.
//!
//! A certificate of this kind asserts that one Ed25519 key vouches for
//! another key or digest, for a bounded amount of time. Unlike X.509
//! certificates (which this crate does not implement), these are compact,
//! single-purpose, and always signed with Ed25519.

mod err;

use caret::caret_int;
use tor_bytes::{EncodeResult, Error as BytesError, Reader, Result as BytesResult, Writer};
use tor_bytes::{Readable, Writeable};
use tor_llcrypto::pk::ed25519;

use std::time;

pub use err::{CertEncodeError, CertError};

/// A Result defined to use CertError.
type CertResult<T> = std::result::Result<T, CertError>;

caret_int! {
    /// Recognized values for Tor's certificate type field.
    ///
    /// Values 0x01-0x03 and 0x07 designate legacy X.509 or RSA-crosscert
    /// formats; this crate only speaks the Ed25519-certified formats and
    /// rejects those on decode.
    pub struct CertType(u8) {
        /// Identity key verifying a signing key, directly.
        IDENTITY_V_SIGNING = 0x04,
        /// Signing key verifying a TLS certificate by digest.
        SIGNING_V_TLS_CERT = 0x05,
        /// Signing key verifying a link authentication key.
        SIGNING_V_LINK_AUTH = 0x06,
        /// Short-term descriptor signing key, signed with a blinded onion
        /// service identity key.
        HS_BLINDED_ID_V_SIGNING = 0x08,
        /// Introduction-point authentication key, signed with a short-term
        /// descriptor signing key.
        HS_IP_V_SIGNING = 0x09,
        /// An ntor key converted to Ed25519, cross-certifying an identity key.
        NTOR_CC_IDENTITY = 0x0A,
        /// Ntor encryption key, converted to Ed25519, signed with the
        /// descriptor signing key.
        HS_IP_CC_SIGNING = 0x0B,
    }
}

/// The certificate types that require X.509 or RSA crosscert validation,
/// which this crate does not implement.
const RESERVED_CERT_TYPES: [u8; 4] = [0x01, 0x02, 0x03, 0x07];

caret_int! {
    /// Extension identifiers for extensions in certificates.
    pub struct ExtType(u8) {
        /// Extension holding the Ed25519 key that signed this certificate.
        HAS_SIGNING_KEY = 0x04,
    }
}

caret_int! {
    /// Identifiers for the type of key or object getting signed.
    pub struct KeyType(u8) {
        /// Identifier for an Ed25519 key.
        ED25519_KEY = 0x01,
        /// Identifier for the SHA256 digest of a DER-encoded RSA key.
        SHA256_OF_RSA = 0x02,
        /// Identifier for the SHA256 digest of an X.509 certificate.
        SHA256_OF_X509 = 0x03,
    }
}

/// A parsed Ed25519-signed certificate, as described in Tor's cert-spec.
#[derive(Debug, Clone)]
pub struct Ed25519Cert {
    /// How many hours after the epoch this certificate expires.
    exp_hours: u32,
    /// The type of the certificate.
    cert_type: CertType,
    /// The key or object being certified.
    cert_key: CertifiedKey,
    /// The extensions attached to this certificate.
    extensions: Vec<CertExt>,
    /// The Ed25519 key that signed this certificate, if known.
    signed_with: Option<ed25519::Ed25519Identity>,
}

/// One of the data types that can be certified by an [`Ed25519Cert`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CertifiedKey {
    /// An Ed25519 public key, signed directly.
    Ed25519(ed25519::Ed25519Identity),
    /// The SHA256 digest of a DER-encoded RSA public key.
    RsaSha256Digest([u8; 32]),
    /// The SHA256 digest of an X.509 certificate.
    X509Sha256Digest([u8; 32]),
    /// Some unrecognized key type.
    Unrecognized(UnrecognizedKey),
}

/// A key whose type we didn't recognize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnrecognizedKey {
    /// The type of the key, as an integer.
    key_type: KeyType,
    /// The key itself, or a digest of it.
    key_digest: [u8; 32],
}

impl CertifiedKey {
    /// Return the byte that identifies the type of this key.
    pub fn key_type(&self) -> KeyType {
        match self {
            CertifiedKey::Ed25519(_) => KeyType::ED25519_KEY,
            CertifiedKey::RsaSha256Digest(_) => KeyType::SHA256_OF_RSA,
            CertifiedKey::X509Sha256Digest(_) => KeyType::SHA256_OF_X509,
            CertifiedKey::Unrecognized(u) => u.key_type,
        }
    }

    /// Return the bytes that make up the body of this certified key or
    /// object.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            CertifiedKey::Ed25519(k) => k.as_bytes(),
            CertifiedKey::RsaSha256Digest(k) => &k[..],
            CertifiedKey::X509Sha256Digest(k) => &k[..],
            CertifiedKey::Unrecognized(u) => &u.key_digest[..],
        }
    }

    /// If this is an Ed25519 public key, return `Some(key)`.
    pub fn as_ed25519(&self) -> Option<&ed25519::Ed25519Identity> {
        match self {
            CertifiedKey::Ed25519(k) => Some(k),
            _ => None,
        }
    }

    /// Extract a `CertifiedKey` from a reader, given that its type tag has
    /// already been read as `key_type`.
    fn from_reader(key_type: KeyType, r: &mut Reader<'_>) -> BytesResult<Self> {
        Ok(match key_type {
            KeyType::ED25519_KEY => CertifiedKey::Ed25519(r.extract()?),
            KeyType::SHA256_OF_RSA => CertifiedKey::RsaSha256Digest(r.extract()?),
            KeyType::SHA256_OF_X509 => CertifiedKey::X509Sha256Digest(r.extract()?),
            _ => CertifiedKey::Unrecognized(UnrecognizedKey {
                key_type,
                key_digest: r.extract()?,
            }),
        })
    }

    /// Write the type tag and body of this certified key onto `w`.
    fn write_onto<W: Writer + ?Sized>(&self, w: &mut W) -> EncodeResult<()> {
        w.write_u8(self.key_type().into());
        w.write(self.as_bytes())?;
        Ok(())
    }
}

/// An extension carried within an Ed25519 certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CertExt {
    /// Indicates which Ed25519 public key signed this certificate.
    HasSigningKey(ed25519::Ed25519Identity),
    /// An extension whose type we don't recognize.
    Unrecognized {
        /// Whether this certificate may only be treated as valid by a
        /// parser that understands this extension.
        affects_validation: bool,
        /// The extension's type tag.
        ext_type: ExtType,
        /// The extension's raw body.
        body: Vec<u8>,
    },
}

impl CertExt {
    /// Return the type tag for this extension.
    fn ext_id(&self) -> ExtType {
        match self {
            CertExt::HasSigningKey(_) => ExtType::HAS_SIGNING_KEY,
            CertExt::Unrecognized { ext_type, .. } => *ext_type,
        }
    }
}

impl Readable for CertExt {
    fn take_from(b: &mut Reader<'_>) -> BytesResult<Self> {
        let len = b.take_u16()?;
        let ext_type: ExtType = b.take_u8()?.into();
        let flags = b.take_u8()?;
        let body = b.take(len as usize)?;

        Ok(match ext_type {
            ExtType::HAS_SIGNING_KEY => CertExt::HasSigningKey(
                ed25519::Ed25519Identity::from_bytes(body)
                    .ok_or_else(|| BytesError::MalformedField("wrong length on signing key extension".into()))?,
            ),
            _ => {
                if (flags & 1) != 0 {
                    return Err(BytesError::MalformedField(
                        "unrecognized certificate extension with affects_validation set".into(),
                    ));
                }
                CertExt::Unrecognized {
                    affects_validation: false,
                    ext_type,
                    body: body.into(),
                }
            }
        })
    }
}

impl CertExt {
    /// Write this extension onto `w`.
    fn write_onto<W: Writer + ?Sized>(&self, w: &mut W) -> EncodeResult<()> {
        match self {
            CertExt::HasSigningKey(pk) => {
                w.write_u16(32);
                w.write_u8(ExtType::HAS_SIGNING_KEY.into());
                w.write_u8(0);
                w.write(pk)?;
            }
            CertExt::Unrecognized {
                affects_validation,
                ext_type,
                body,
            } => {
                w.write_u16(
                    body.len()
                        .try_into()
                        .map_err(|_| tor_bytes::EncodeError::BadLengthValue)?,
                );
                w.write_u8((*ext_type).into());
                w.write_u8(u8::from(*affects_validation));
                w.write(&body[..])?;
            }
        }
        Ok(())
    }
}

impl Ed25519Cert {
    /// Try to decode a certificate from a byte slice.
    ///
    /// This returns an error if the slice is not completely consumed, or
    /// if `cert_type` names a legacy X.509/RSA-crosscert format this crate
    /// doesn't implement.
    ///
    /// The result is not checked for validity: call
    /// [`should_have_signing_key`](KeyUnknownCert::should_have_signing_key)
    /// or [`should_be_signed_with`](KeyUnknownCert::should_be_signed_with),
    /// then check timeliness and signature.
    pub fn decode(cert: &[u8]) -> BytesResult<KeyUnknownCert> {
        let mut r = Reader::from_slice(cert);
        let v = r.take_u8()?;
        if v != 1 {
            return Err(BytesError::MalformedField("unrecognized certificate version".into()));
        }
        let cert_type: CertType = r.take_u8()?.into();
        if RESERVED_CERT_TYPES.contains(&cert_type.get()) {
            return Err(BytesError::MalformedField("reserved certificate type".into()));
        }
        let exp_hours = r.take_u32()?;
        let cert_key_type: KeyType = r.take_u8()?.into();
        let cert_key = CertifiedKey::from_reader(cert_key_type, &mut r)?;
        let n_exts = r.take_u8()?;
        let mut extensions = Vec::new();
        for _ in 0..n_exts {
            let e: CertExt = r.extract()?;
            extensions.push(e);
        }

        let sig_offset = r.consumed();
        let signature: ed25519::Signature = r.extract()?;
        r.should_be_exhausted()?;

        let included_pkey = extensions.iter().find_map(|e| match e {
            CertExt::HasSigningKey(pk) => Some(*pk),
            _ => None,
        });

        Ok(KeyUnknownCert {
            cert: UncheckedCert {
                cert: Ed25519Cert {
                    exp_hours,
                    cert_type,
                    cert_key,
                    extensions,
                    signed_with: included_pkey,
                },
                text: cert[0..sig_offset].into(),
                signature,
            },
        })
    }

    /// Construct a new, unsigned certificate.
    ///
    /// Call [`encode_and_sign`](Ed25519Cert::encode_and_sign) to turn this
    /// into a signed, encoded certificate.
    pub fn new(cert_type: CertType, exp_hours: u32, cert_key: CertifiedKey) -> Self {
        Ed25519Cert {
            exp_hours,
            cert_type,
            cert_key,
            extensions: Vec::new(),
            signed_with: None,
        }
    }

    /// Record that this certificate will be (or was) signed with `key`,
    /// and include that key in the encoded certificate as a
    /// `HAS_SIGNING_KEY` extension.
    pub fn signed_with_key(mut self, key: ed25519::Ed25519Identity) -> Self {
        self.extensions.retain(|e| !matches!(e, CertExt::HasSigningKey(_)));
        self.extensions.push(CertExt::HasSigningKey(key));
        self.signed_with = Some(key);
        self
    }

    /// Encode this certificate and sign it with `skey`, which must match
    /// any signing key previously recorded with
    /// [`signed_with_key`](Ed25519Cert::signed_with_key).
    pub fn encode_and_sign(
        &self,
        skey: &ed25519::Keypair,
    ) -> Result<Vec<u8>, CertEncodeError> {
        use ed25519::Signer;

        let signer_id: ed25519::Ed25519Identity = skey.verifying_key().into();
        if let Some(declared) = self.signed_with {
            if declared != signer_id {
                return Err(CertEncodeError::KeyMismatch);
            }
        }

        let mut w = Vec::new();
        w.write_u8(1);
        w.write_u8(self.cert_type.into());
        w.write_u32(self.exp_hours);
        self.cert_key.write_onto(&mut w)?;
        w.write_u8(
            self.extensions
                .len()
                .try_into()
                .map_err(|_| CertEncodeError::TooManyExtensions)?,
        );
        for e in &self.extensions {
            e.write_onto(&mut w)?;
        }

        let signature = skey.sign(&w[..]);
        w.write(&signature)?;
        Ok(w)
    }

    /// Return the time at which this certificate becomes expired.
    pub fn expiry(&self) -> time::SystemTime {
        let d = time::Duration::new(u64::from(self.exp_hours) * 3600, 0);
        time::SystemTime::UNIX_EPOCH + d
    }

    /// Return true iff this certificate will be expired at time `when`.
    pub fn is_expired_at(&self, when: time::SystemTime) -> bool {
        when >= self.expiry()
    }

    /// Return the signed key or object that is authenticated by this
    /// certificate.
    pub fn subject_key(&self) -> &CertifiedKey {
        &self.cert_key
    }

    /// Return the Ed25519 key that signed this certificate, if known.
    pub fn signing_key(&self) -> Option<&ed25519::Ed25519Identity> {
        self.signed_with.as_ref()
    }

    /// Return the type of this certificate.
    pub fn cert_type(&self) -> CertType {
        self.cert_type
    }
}

/// A parsed certificate whose signing key might or might not be included.
///
/// To validate this certificate, call
/// [`should_have_signing_key`](KeyUnknownCert::should_have_signing_key) if
/// it should be self-contained, or
/// [`should_be_signed_with`](KeyUnknownCert::should_be_signed_with) if the
/// caller already knows the signing key.
#[derive(Clone, Debug)]
pub struct KeyUnknownCert {
    /// The certificate whose signing key might not be known.
    cert: UncheckedCert,
}

impl KeyUnknownCert {
    /// Return the certificate type of the underlying certificate.
    pub fn peek_cert_type(&self) -> CertType {
        self.cert.cert.cert_type
    }

    /// Return the subject key of the underlying certificate.
    pub fn peek_subject_key(&self) -> &CertifiedKey {
        &self.cert.cert.cert_key
    }

    /// Declare that this certificate should be self-contained, carrying
    /// its own signing key as a `HAS_SIGNING_KEY` extension.
    pub fn should_have_signing_key(self) -> CertResult<UncheckedCert> {
        let real_key = self.cert.cert.signed_with.ok_or(CertError::MissingPubKey)?;
        Ok(UncheckedCert {
            cert: Ed25519Cert {
                signed_with: Some(real_key),
                ..self.cert.cert
            },
            ..self.cert
        })
    }

    /// Declare that this certificate should be signed with `pkey`.
    ///
    /// Succeeds if the certificate either lists `pkey` as its signing key,
    /// or lists no signing key at all.
    pub fn should_be_signed_with(self, pkey: &ed25519::Ed25519Identity) -> CertResult<UncheckedCert> {
        let real_key = match &self.cert.cert.signed_with {
            Some(a) if a == pkey => *pkey,
            None => *pkey,
            Some(_) => return Err(CertError::KeyMismatch),
        };

        Ok(UncheckedCert {
            cert: Ed25519Cert {
                signed_with: Some(real_key),
                ..self.cert.cert
            },
            ..self.cert
        })
    }
}

/// A certificate that has been parsed, but whose signature and timeliness
/// have not been checked.
#[derive(Debug, Clone)]
pub struct UncheckedCert {
    /// The parsed certificate.
    cert: Ed25519Cert,
    /// The signed text of the certificate (everything up to, but not
    /// including, the signature field).
    text: Vec<u8>,
    /// The alleged signature.
    signature: ed25519::Signature,
}

/// A certificate that has been parsed and signature-checked, but whose
/// timeliness has not been checked.
pub struct SigCheckedCert {
    /// The certificate that might or might not be timely.
    cert: Ed25519Cert,
}

impl UncheckedCert {
    /// Return the subject key of the underlying certificate.
    pub fn peek_subject_key(&self) -> &CertifiedKey {
        &self.cert.cert_key
    }

    /// Return the signing key of the underlying certificate.
    pub fn peek_signing_key(&self) -> &ed25519::Ed25519Identity {
        self.cert
            .signed_with
            .as_ref()
            .expect("UncheckedCert constructed without a signing key")
    }
}

impl tor_checkable::SelfSigned<SigCheckedCert> for UncheckedCert {
    type Error = CertError;

    fn is_well_signed(&self) -> CertResult<()> {
        let pubkey = self.cert.signed_with.ok_or(CertError::MissingPubKey)?;
        let pubkey: ed25519::PublicKey = pubkey.try_into().map_err(|_| CertError::BadSignature)?;

        use ed25519::Verifier;
        pubkey
            .verify(&self.text[..], &self.signature)
            .map_err(|_| CertError::BadSignature)
    }

    fn dangerously_assume_wellsigned(self) -> SigCheckedCert {
        SigCheckedCert { cert: self.cert }
    }
}

impl tor_checkable::Timebound<Ed25519Cert> for Ed25519Cert {
    type Error = tor_checkable::TimeValidityError;

    fn is_valid_at(&self, t: &time::SystemTime) -> Result<(), Self::Error> {
        if self.is_expired_at(*t) {
            let expiry = self.expiry();
            Err(Self::Error::Expired(
                t.duration_since(expiry).unwrap_or_default(),
            ))
        } else {
            Ok(())
        }
    }

    fn dangerously_assume_timely(self) -> Ed25519Cert {
        self
    }
}

impl tor_checkable::Timebound<Ed25519Cert> for SigCheckedCert {
    type Error = tor_checkable::TimeValidityError;

    fn is_valid_at(&self, t: &time::SystemTime) -> Result<(), Self::Error> {
        self.cert.is_valid_at(t)
    }

    fn dangerously_assume_timely(self) -> Ed25519Cert {
        self.cert.dangerously_assume_timely()
    }
}

#[cfg(test)]
mod test {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use hex_literal::hex;
    use rand::rngs::OsRng;
    use tor_bytes::Error as E;
    use tor_checkable::{SelfSigned, Timebound};

    #[test]
    fn parse_unrecognized_ext() {
        let b = hex!("0009 99 10 657874656e73696f6e");
        let mut r = Reader::from_slice(&b);
        let e: CertExt = r.extract().unwrap();
        r.should_be_exhausted().unwrap();
        assert_eq!(e.ext_id(), 0x99.into());

        let b = hex!("0009 99 11 657874656e73696f6e");
        let mut r = Reader::from_slice(&b);
        let err = r.extract::<CertExt>().unwrap_err();
        assert!(matches!(err, E::MalformedField(_)));
    }

    #[test]
    fn certified_key_round_trip() {
        let b = hex!("4c27616d6f757220756e6974206365757820717527656e636861c3ae6e616974206c6520666572");
        let mut r = Reader::from_slice(&b);

        let ck = CertifiedKey::from_reader(KeyType::SHA256_OF_RSA, &mut r).unwrap();
        assert_eq!(ck.as_bytes(), &b[..32]);
        assert_eq!(ck.key_type(), KeyType::SHA256_OF_RSA);
        assert_eq!(r.remaining(), 7);
    }

    #[test]
    fn reserved_cert_type_is_rejected() {
        let mut w = Vec::new();
        w.write_u8(1);
        w.write_u8(0x07);
        w.write_u8(0);
        assert!(Ed25519Cert::decode(&w).is_err());
    }

    #[test]
    fn signed_cert_roundtrip() {
        let keypair = ed25519::Keypair::generate(&mut OsRng);
        let signing_id: ed25519::Ed25519Identity = keypair.verifying_key().into();
        let subject = ed25519::Keypair::generate(&mut OsRng);
        let subject_id: ed25519::Ed25519Identity = subject.verifying_key().into();

        let cert = Ed25519Cert::new(
            CertType::IDENTITY_V_SIGNING,
            1_000_000,
            CertifiedKey::Ed25519(subject_id),
        )
        .signed_with_key(signing_id);

        let encoded = cert.encode_and_sign(&keypair).unwrap();

        let decoded = Ed25519Cert::decode(&encoded).unwrap();
        let checked = decoded
            .should_be_signed_with(&signing_id)
            .unwrap()
            .check_signature()
            .unwrap();
        let valid = checked
            .check_valid_at(&(time::SystemTime::UNIX_EPOCH + time::Duration::from_secs(500_000 * 3600)))
            .unwrap();

        assert_eq!(valid.cert_type(), CertType::IDENTITY_V_SIGNING);
        assert_eq!(valid.subject_key().as_ed25519(), Some(&subject_id));
        assert_eq!(valid.signing_key(), Some(&signing_id));
    }

    #[test]
    fn wrong_signing_key_is_rejected() {
        let keypair = ed25519::Keypair::generate(&mut OsRng);
        let impostor = ed25519::Keypair::generate(&mut OsRng);
        let subject = ed25519::Keypair::generate(&mut OsRng);

        let cert = Ed25519Cert::new(
            CertType::IDENTITY_V_SIGNING,
            1_000_000,
            CertifiedKey::Ed25519(subject.verifying_key().into()),
        )
        .signed_with_key(keypair.verifying_key().into());

        let encoded = cert.encode_and_sign(&keypair).unwrap();
        let decoded = Ed25519Cert::decode(&encoded).unwrap();

        let impostor_id: ed25519::Ed25519Identity = impostor.verifying_key().into();
        assert!(decoded.should_be_signed_with(&impostor_id).is_err());
    }

    #[test]
    fn expired_cert_is_rejected() {
        let keypair = ed25519::Keypair::generate(&mut OsRng);
        let signing_id: ed25519::Ed25519Identity = keypair.verifying_key().into();

        let cert = Ed25519Cert::new(
            CertType::SIGNING_V_LINK_AUTH,
            1,
            CertifiedKey::Ed25519(signing_id),
        )
        .signed_with_key(signing_id);

        let encoded = cert.encode_and_sign(&keypair).unwrap();
        let decoded = Ed25519Cert::decode(&encoded).unwrap();
        let checked = decoded
            .should_have_signing_key()
            .unwrap()
            .check_signature()
            .unwrap();

        assert!(checked.is_valid_at(&time::SystemTime::now()).is_err());
    }
}
