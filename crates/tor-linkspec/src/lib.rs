//! Parts of the Tor protocol that name specific relays, or locations to
//! reach them at: addresses, link-layer certificates, and link specifiers
//! as used in CREATE/EXTEND cells.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use caret::caret_int;
use tor_bytes::{EncodeResult, Readable, Reader, Result as BytesResult, Writeable, Writer};
use tor_llcrypto::pk::{ed25519, rsa::RsaIdentity};

caret_int! {
    /// The type tag of an [`Address`].
    pub struct AddressType(u8) {
        /// A hostname, given as raw bytes.
        HOSTNAME = 0,
        /// An IPv4 address, given as 4 bytes.
        IPV4 = 4,
        /// An IPv6 address, given as 16 bytes.
        IPV6 = 6,
        /// A transient error occurred resolving this address.
        ERROR_TRANSIENT = 16,
        /// A permanent error occurred resolving this address.
        ERROR_PERMANENT = 17,
    }
}

/// A tagged address, as carried in a NETINFO cell or RESOLVED relay cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Address {
    /// The type of this address.
    atype: AddressType,
    /// The raw encoded value: 4 bytes for IPv4, 16 for IPv6, arbitrary
    /// otherwise.
    value_bin: Vec<u8>,
}

impl Address {
    /// Construct an `Address` from a parsed Rust address.
    pub fn new(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(v4) => Address {
                atype: AddressType::IPV4,
                value_bin: v4.octets().to_vec(),
            },
            IpAddr::V6(v6) => Address {
                atype: AddressType::IPV6,
                value_bin: v6.octets().to_vec(),
            },
        }
    }

    /// Return the type tag for this address.
    pub fn address_type(&self) -> AddressType {
        self.atype
    }

    /// Return the raw bytes that make up this address's value.
    pub fn value_bin(&self) -> &[u8] {
        &self.value_bin
    }

    /// If this is a recognized IPv4 or IPv6 address, return it.
    pub fn ip(&self) -> Option<IpAddr> {
        match self.atype {
            AddressType::IPV4 => {
                let bytes: [u8; 4] = self.value_bin.as_slice().try_into().ok()?;
                Some(IpAddr::V4(Ipv4Addr::from(bytes)))
            }
            AddressType::IPV6 => {
                let bytes: [u8; 16] = self.value_bin.as_slice().try_into().ok()?;
                Some(IpAddr::V6(Ipv6Addr::from(bytes)))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ip() {
            Some(addr) => write!(f, "{}", addr),
            None => write!(f, "{}:{}", self.atype, hex::encode(&self.value_bin)),
        }
    }
}

impl safelog::Redactable for Address {
    fn display_redacted(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ip() {
            Some(IpAddr::V4(v4)) => write!(f, "{}.{}.{}.x", v4.octets()[0], v4.octets()[1], v4.octets()[2]),
            Some(IpAddr::V6(_)) => write!(f, "[scrubbed]"),
            None => write!(f, "{}", self.atype),
        }
    }
}

impl Readable for Address {
    fn take_from(r: &mut Reader<'_>) -> BytesResult<Self> {
        let atype: AddressType = r.take_u8()?.into();
        let len = r.take_u8()? as usize;
        let value_bin = r.take(len)?.to_vec();
        match atype {
            AddressType::IPV4 if value_bin.len() != 4 => {
                Err(tor_bytes::Error::MalformedField("IPv4 address".into()))
            }
            AddressType::IPV6 if value_bin.len() != 16 => {
                Err(tor_bytes::Error::MalformedField("IPv6 address".into()))
            }
            _ => Ok(Address { atype, value_bin }),
        }
    }
}

impl Writeable for Address {
    fn write_onto<B: Writer + ?Sized>(&self, w: &mut B) -> EncodeResult<()> {
        w.write_u8(self.atype.into());
        w.write_u8(self.value_bin.len() as u8);
        w.write(&self.value_bin[..])?;
        Ok(())
    }
}

caret_int! {
    /// The type tag of a link-layer [`Certificate`], as carried in a CERTS cell.
    pub struct CertType(u8) {
        /// RSA link key certificate, signed with an RSA identity key.
        LINK = 1,
        /// RSA identity self-signed certificate.
        IDENTITY = 2,
        /// RSA identity certificate used during the AUTHENTICATE handshake.
        AUTHENTICATE = 3,
        /// Ed25519 signing key cross-certified by the Ed25519 identity key.
        ED25519_SIGNING = 4,
        /// TLS link certificate cross-certified by the Ed25519 signing key.
        LINK_CERT = 5,
        /// Ed25519 key used during the AUTHENTICATE handshake.
        ED25519_AUTHENTICATE = 6,
        /// RSA identity certified by the Ed25519 identity key, linking the two.
        ED25519_IDENTITY = 7,
        /// Hidden-service v3 descriptor signing key certificate.
        HS_V3_DESC_SIGNING = 8,
        /// Hidden-service v3 introduction-point authentication key certificate.
        HS_V3_INTRO_AUTH = 9,
        /// Onion-key cross-certificate for the ntor handshake.
        NTOR_ONION_KEY = 10,
        /// Hidden-service v3 ntor encryption key certificate.
        HS_V3_NTOR_ENC = 11,
    }
}

/// A single certificate as carried in a CERTS cell.
///
/// The contents are opaque here: interpreting them (e.g. as an Ed25519 v1
/// certificate) is the job of a higher-level parser.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Certificate {
    /// The kind of certificate this claims to be.
    cert_type: CertType,
    /// The raw certificate bytes.
    value: Vec<u8>,
}

impl Certificate {
    /// Construct a new `Certificate` from its type and raw bytes.
    pub fn new(cert_type: CertType, value: impl Into<Vec<u8>>) -> Self {
        Certificate {
            cert_type,
            value: value.into(),
        }
    }

    /// Return this certificate's type tag.
    pub fn cert_type(&self) -> CertType {
        self.cert_type
    }

    /// Return the raw bytes of this certificate.
    pub fn value(&self) -> &[u8] {
        &self.value
    }
}

impl Readable for Certificate {
    fn take_from(r: &mut Reader<'_>) -> BytesResult<Self> {
        let cert_type: CertType = r.take_u8()?.into();
        let value = r.read_nested_u16len(|inner| Ok(inner.take_rest().to_vec()))?;
        Ok(Certificate { cert_type, value })
    }
}

impl Writeable for Certificate {
    fn write_onto<B: Writer + ?Sized>(&self, w: &mut B) -> EncodeResult<()> {
        w.write_u8(self.cert_type.into());
        let mut nested = w.write_nested_u16len();
        nested.write(&self.value[..])?;
        nested.finish()?;
        Ok(())
    }
}

caret_int! {
    /// The type tag of a [`LinkSpecifier`].
    pub struct LinkSpecType(u8) {
        /// An IPv4 ORPort address.
        IPV4 = 0,
        /// An IPv6 ORPort address.
        IPV6 = 1,
        /// A SHA-1 RSA identity fingerprint.
        FINGERPRINT = 2,
        /// An Ed25519 identity key.
        ED25519_ID = 3,
    }
}

/// A way of telling a relay how to extend a circuit to a particular next
/// hop, as carried in EXTEND2/CREATE2 cells.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkSpecifier {
    /// A TCP address and port for an ORPort, reached over IPv4.
    IPv4(Ipv4Addr, u16),
    /// A TCP address and port for an ORPort, reached over IPv6.
    IPv6(Ipv6Addr, u16),
    /// The SHA-1 RSA identity fingerprint of a relay.
    Fingerprint(RsaIdentity),
    /// The Ed25519 identity of a relay.
    Ed25519(ed25519::Ed25519Identity),
    /// A link specifier type we don't recognize.
    Unknown(LinkSpecType, Vec<u8>),
}

impl LinkSpecifier {
    /// Return the type tag for this link specifier.
    pub fn lstype(&self) -> LinkSpecType {
        match self {
            LinkSpecifier::IPv4(..) => LinkSpecType::IPV4,
            LinkSpecifier::IPv6(..) => LinkSpecType::IPV6,
            LinkSpecifier::Fingerprint(_) => LinkSpecType::FINGERPRINT,
            LinkSpecifier::Ed25519(_) => LinkSpecType::ED25519_ID,
            LinkSpecifier::Unknown(t, _) => *t,
        }
    }
}

impl Readable for LinkSpecifier {
    fn take_from(r: &mut Reader<'_>) -> BytesResult<Self> {
        let lstype: LinkSpecType = r.take_u8()?.into();
        r.read_nested_u8len(|body| {
            Ok(match lstype {
                LinkSpecType::IPV4 => {
                    let addr: Ipv4Addr = body.extract()?;
                    LinkSpecifier::IPv4(addr, body.take_u16()?)
                }
                LinkSpecType::IPV6 => {
                    let addr: Ipv6Addr = body.extract()?;
                    LinkSpecifier::IPv6(addr, body.take_u16()?)
                }
                LinkSpecType::FINGERPRINT => LinkSpecifier::Fingerprint(body.extract()?),
                LinkSpecType::ED25519_ID => LinkSpecifier::Ed25519(body.extract()?),
                _ => LinkSpecifier::Unknown(lstype, body.take_rest().to_vec()),
            })
        })
    }
}

impl Writeable for LinkSpecifier {
    fn write_onto<B: Writer + ?Sized>(&self, w: &mut B) -> EncodeResult<()> {
        w.write_u8(self.lstype().into());
        let mut nested = w.write_nested_u8len();
        match self {
            LinkSpecifier::IPv4(addr, port) => {
                nested.write(addr)?;
                nested.write_u16(*port);
            }
            LinkSpecifier::IPv6(addr, port) => {
                nested.write(addr)?;
                nested.write_u16(*port);
            }
            LinkSpecifier::Fingerprint(fp) => {
                nested.write(fp)?;
            }
            LinkSpecifier::Ed25519(id) => {
                nested.write(id)?;
            }
            LinkSpecifier::Unknown(_, body) => {
                nested.write(&body[..])?;
            }
        }
        nested.finish()?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use tor_bytes::Reader;

    #[test]
    fn address_ipv4_roundtrip() {
        let addr = Address::new("1.2.3.4".parse().unwrap());
        let mut out = Vec::new();
        addr.write_onto(&mut out).unwrap();
        assert_eq!(out, vec![4, 4, 1, 2, 3, 4]);

        let mut r = Reader::from_slice(&out);
        let decoded: Address = r.extract().unwrap();
        assert_eq!(decoded, addr);
        assert_eq!(decoded.to_string(), "1.2.3.4");
    }

    #[test]
    fn address_bad_ipv4_length_is_malformed() {
        let buf = [4u8, 3, 1, 2, 3];
        let mut r = Reader::from_slice(&buf);
        let err = r.extract::<Address>().unwrap_err();
        assert!(matches!(err, tor_bytes::Error::MalformedField(_)));
    }

    #[test]
    fn unknown_address_type_keeps_raw_bytes() {
        let buf = [200u8, 2, 9, 9];
        let mut r = Reader::from_slice(&buf);
        let addr: Address = r.extract().unwrap();
        assert_eq!(addr.value_bin(), &[9, 9]);
        assert!(addr.ip().is_none());
    }

    #[test]
    fn certificate_roundtrip() {
        let cert = Certificate::new(CertType::ED25519_SIGNING, vec![1, 2, 3]);
        let mut out = Vec::new();
        cert.write_onto(&mut out).unwrap();
        assert_eq!(out, vec![4, 0, 3, 1, 2, 3]);

        let mut r = Reader::from_slice(&out);
        let decoded: Certificate = r.extract().unwrap();
        assert_eq!(decoded, cert);
    }

    #[test]
    fn linkspec_ed25519_roundtrip() {
        let id = ed25519::Ed25519Identity::new([7u8; 32]);
        let ls = LinkSpecifier::Ed25519(id);
        let mut out = Vec::new();
        ls.write_onto(&mut out).unwrap();
        assert_eq!(out[0], 3);
        assert_eq!(out[1], 32);

        let mut r = Reader::from_slice(&out);
        let decoded: LinkSpecifier = r.extract().unwrap();
        assert_eq!(decoded, ls);
    }

    #[test]
    fn linkspec_unknown_type_falls_through() {
        let buf = [99u8, 2, 5, 6];
        let mut r = Reader::from_slice(&buf);
        let ls: LinkSpecifier = r.extract().unwrap();
        assert_eq!(ls, LinkSpecifier::Unknown(LinkSpecType::from(99u8), vec![5, 6]));
    }

    #[test]
    fn linkspec_truncated_is_error() {
        let buf = [0u8, 6, 1, 2, 3, 4];
        let mut r = Reader::from_slice(&buf);
        assert!(r.extract::<LinkSpecifier>().is_err());
    }
}
