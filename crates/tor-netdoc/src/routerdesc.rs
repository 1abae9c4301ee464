//! Server ("router") descriptors: the document a relay publishes describing
//! itself.

use std::net::IpAddr;

use base64ct::{Base64Unpadded, Encoding};
use digest::Digest;
use time::macros::format_description;
use time::PrimitiveDateTime;

use tor_cert::{CertType, Ed25519Cert, UncheckedCert};
use tor_checkable::{SelfSigned, Timebound};
use tor_llcrypto::d::Sha256;
use tor_llcrypto::pk::rsa::{PublicKey as RsaPublicKey, RsaIdentity};
use tor_llcrypto::pk::{ed25519, ValidatableSignature};

use crate::err::{Error, Result};
use crate::parse::{self, signed_range_inclusive};

/// One line of a server descriptor's exit policy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExitPolicyRule {
    /// Whether this rule accepts (`true`) or rejects (`false`) matching
    /// traffic.
    pub accept: bool,
    /// The `address:port-range` pattern this rule matches, exactly as
    /// written in the descriptor (e.g. `"*:80"`, `"127.0.0.1:1-65535"`).
    pub pattern: String,
}

/// A parsed server descriptor.
///
/// Obtained from [`RouterDescriptor::parse`]. The RSA and (if present)
/// Ed25519 signatures are not checked by `parse` itself: call
/// [`check_rsa_signature`](RouterDescriptor::check_rsa_signature) and
/// [`check_ed25519_signature`](RouterDescriptor::check_ed25519_signature)
/// once the descriptor's claimed keys have been accepted.
#[derive(Debug, Clone)]
pub struct RouterDescriptor {
    /// The relay's self-chosen, non-unique nickname.
    pub nickname: String,
    /// The relay's public IPv4 address.
    pub address: IpAddr,
    /// The relay's ORPort.
    pub or_port: u16,
    /// The relay's DirPort, or 0 if it has none.
    pub dir_port: u16,
    /// Average bandwidth, in bytes per second, the relay is willing to sustain.
    pub bandwidth_avg: u64,
    /// Burst bandwidth, in bytes per second.
    pub bandwidth_burst: u64,
    /// The relay's own estimate of its recently observed bandwidth.
    pub bandwidth_observed: u64,
    /// A free-form string naming the relay's software and platform.
    pub platform: Option<String>,
    /// When this descriptor was generated.
    pub published: PrimitiveDateTime,
    /// The RSA identity fingerprint the descriptor claims for itself, if the
    /// (legacy, optional) `fingerprint` line is present.
    pub fingerprint: Option<RsaIdentity>,
    /// The relay's medium-term RSA onion key, used for the legacy TAP
    /// handshake.
    pub onion_key: RsaPublicKey,
    /// The relay's medium-term RSA signing key. This descriptor's RSA
    /// identity is the digest of this key.
    pub signing_key: RsaPublicKey,
    /// The relay's ntor onion key, if it has one.
    pub ntor_onion_key: Option<[u8; 32]>,
    /// The certificate binding the relay's master Ed25519 identity key to
    /// the Ed25519 signing key used for `router-sig-ed25519`, if present.
    /// Its signature and timeliness are not checked until
    /// [`check_ed25519_signature`](RouterDescriptor::check_ed25519_signature)
    /// is called.
    pub identity_ed25519: Option<UncheckedCert>,
    /// The relay's master Ed25519 identity key, if declared.
    pub master_key_ed25519: Option<ed25519::Ed25519Identity>,
    /// The relay's exit policy, in declaration order.
    pub exit_policy: Vec<ExitPolicyRule>,
    /// The raw bytes of the final `router-signature` object.
    router_signature: Vec<u8>,
    /// The raw bytes of the `router-sig-ed25519` argument, if present.
    router_sig_ed25519: Option<[u8; 64]>,
}

/// The string prepended before hashing the Ed25519-signed portion of a
/// server descriptor.
const ED_SIG_PREFIX: &[u8] = b"Tor router descriptor signature v1";

impl RouterDescriptor {
    /// This descriptor's RSA identity: the digest of its signing key.
    pub fn rsa_identity(&self) -> RsaIdentity {
        self.signing_key.to_rsa_identity()
    }

    /// Parse a server descriptor from its text.
    pub fn parse(document: &str) -> Result<Self> {
        let items = parse::tokenize(document)?;

        for kw in ["router", "bandwidth", "onion-key", "signing-key", "router-signature"] {
            parse::require_single(&items, kw)?;
        }
        let router = parse::require(&items, "router")?;
        let nickname = router.required_arg(0)?.to_owned();
        let address: IpAddr = router
            .required_arg(1)?
            .parse()
            .map_err(|_| Error::Malformed("router address is not an IP address".into()))?;
        let or_port = parse_u16(router.required_arg(2)?)?;
        let dir_port = parse_u16(router.required_arg(4)?)?;

        let bandwidth = parse::require(&items, "bandwidth")?;
        let bandwidth_avg = parse_u64(bandwidth.required_arg(0)?)?;
        let bandwidth_burst = parse_u64(bandwidth.required_arg(1)?)?;
        let bandwidth_observed = parse_u64(bandwidth.required_arg(2)?)?;

        let platform = parse::find(&items, "platform").map(|i| i.args.to_owned());

        let published_item = parse::require(&items, "published")?;
        let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
        let published = PrimitiveDateTime::parse(published_item.args, &format)
            .map_err(|_| Error::Malformed("published line has an invalid timestamp".into()))?;

        let fingerprint = match parse::find(&items, "fingerprint") {
            Some(item) => {
                let hex: String = item.args.split_ascii_whitespace().collect();
                let bytes = hex::decode(hex)
                    .map_err(|_| Error::Malformed("fingerprint is not valid hex".into()))?;
                Some(
                    RsaIdentity::from_bytes(&bytes)
                        .ok_or_else(|| Error::Malformed("fingerprint has the wrong length".into()))?,
                )
            }
            None => None,
        };

        let onion_key = parse_rsa_key(parse::require(&items, "onion-key")?)?;
        let signing_key = parse_rsa_key(parse::require(&items, "signing-key")?)?;

        let ntor_onion_key = match parse::find(&items, "ntor-onion-key") {
            Some(item) => Some(decode_b64_array::<32>(item.required_arg(0)?)?),
            None => None,
        };

        let identity_ed25519 = match parse::find(&items, "identity-ed25519") {
            Some(item) => {
                let bytes = item.obj_bytes_tagged("ED25519 CERT")?;
                let known = Ed25519Cert::decode(bytes)?;
                if known.peek_cert_type() != CertType::IDENTITY_V_SIGNING {
                    return Err(Error::Malformed("identity-ed25519 has the wrong cert type".into()));
                }
                Some(known.should_have_signing_key()?)
            }
            None => None,
        };

        let master_key_ed25519 = match parse::find(&items, "master-key-ed25519") {
            Some(item) => Some(ed25519::Ed25519Identity::new(decode_b64_array::<32>(
                item.required_arg(0)?,
            )?)),
            None => None,
        };

        let mut exit_policy = Vec::new();
        for item in &items {
            let accept = match item.keyword {
                "accept" => true,
                "reject" => false,
                _ => continue,
            };
            exit_policy.push(ExitPolicyRule {
                accept,
                pattern: item.args.to_owned(),
            });
        }

        let router_signature = parse::require(&items, "router-signature")?
            .obj_bytes_tagged("SIGNATURE")?
            .to_vec();

        let router_sig_ed25519 = match parse::find(&items, "router-sig-ed25519") {
            Some(item) => Some(decode_b64_array::<64>(item.required_arg(0)?)?),
            None => None,
        };

        Ok(RouterDescriptor {
            nickname,
            address,
            or_port,
            dir_port,
            bandwidth_avg,
            bandwidth_burst,
            bandwidth_observed,
            platform,
            published,
            fingerprint,
            onion_key,
            signing_key,
            ntor_onion_key,
            identity_ed25519,
            master_key_ed25519,
            exit_policy,
            router_signature,
            router_sig_ed25519,
        })
    }

    /// Check the RSA `router-signature` over this descriptor's `router`
    /// through `router-signature` lines against its own signing key.
    pub fn check_rsa_signature(&self, document: &str) -> Result<()> {
        let range = signed_range_inclusive(document, "router", "router-signature")?;
        let digest = tor_llcrypto::d::Sha1::digest(range.as_bytes());
        self.signing_key
            .verify(&digest, &self.router_signature)
            .map_err(|_| Error::BadSignature)
    }

    /// Check the `identity-ed25519` certificate and, if both are present,
    /// the `router-sig-ed25519` signature it vouches for.
    pub fn check_ed25519_signature(&self, document: &str) -> Result<()> {
        let (cert, sig) = match (&self.identity_ed25519, &self.router_sig_ed25519) {
            (Some(c), Some(s)) => (c, s),
            (None, None) => return Ok(()),
            _ => {
                return Err(Error::Malformed(
                    "identity-ed25519 and router-sig-ed25519 must both be present or both absent".into(),
                ))
            }
        };
        let signing_key = cert
            .peek_subject_key()
            .as_ed25519()
            .ok_or_else(|| Error::Malformed("identity-ed25519 does not certify an Ed25519 key".into()))?;
        let signing_key: ed25519::PublicKey = (*signing_key)
            .try_into()
            .map_err(|_| Error::Malformed("identity-ed25519 subject key is invalid".into()))?;

        let checked = cert.clone().check_signature()?;
        checked.is_valid_at(&std::time::SystemTime::now())?;

        let range = signed_range_inclusive(document, "router", "router-sig-ed25519")?;
        let mut h = Sha256::new();
        h.update(ED_SIG_PREFIX);
        h.update(range.as_bytes());
        let digest = h.finalize();

        let sig = ed25519::Signature::from_bytes(sig);
        let validatable = ed25519::ValidatableEd25519Signature::new(signing_key, sig, &digest);
        if ValidatableSignature::is_valid(&validatable) {
            Ok(())
        } else {
            Err(Error::BadSignature)
        }
    }
}

/// Parse an RSA public key out of an item's `-----BEGIN RSA PUBLIC KEY-----` object.
fn parse_rsa_key(item: &parse::Item<'_>) -> Result<RsaPublicKey> {
    let der = item.obj_bytes_tagged("RSA PUBLIC KEY")?;
    RsaPublicKey::from_der(der).ok_or_else(|| Error::Malformed(format!("`{}` has an invalid RSA key", item.keyword)))
}

/// Base64-decode `s` (no padding) into a fixed-size array.
fn decode_b64_array<const N: usize>(s: &str) -> Result<[u8; N]> {
    let decoded = Base64Unpadded::decode_vec(s).map_err(|_| Error::TruncatedObject)?;
    decoded
        .try_into()
        .map_err(|_| Error::Malformed("base64 field has the wrong decoded length".into()))
}

fn parse_u16(s: &str) -> Result<u16> {
    s.parse().map_err(|_| Error::Malformed(format!("`{s}` is not a valid port")))
}

fn parse_u64(s: &str) -> Result<u64> {
    s.parse().map_err(|_| Error::Malformed(format!("`{s}` is not a valid integer")))
}

#[cfg(test)]
mod test {
    use super::*;

    const MINIMAL: &str = "\
router test 127.0.0.1 9001 0 0
bandwidth 1000 2000 1500
platform Tor 0.4.8 on Linux
published 2026-01-01 00:00:00
onion-key
-----BEGIN RSA PUBLIC KEY-----
MAkCAgBmAgMBAAE=
-----END RSA PUBLIC KEY-----
signing-key
-----BEGIN RSA PUBLIC KEY-----
MAkCAgBmAgMBAAE=
-----END RSA PUBLIC KEY-----
accept *:80
reject *:*
router-signature
-----BEGIN SIGNATURE-----
AA==
-----END SIGNATURE-----
";

    #[test]
    fn parses_minimal_descriptor() {
        let rd = RouterDescriptor::parse(MINIMAL).unwrap();
        assert_eq!(rd.nickname, "test");
        assert_eq!(rd.or_port, 9001);
        assert_eq!(rd.bandwidth_avg, 1000);
        assert_eq!(rd.exit_policy.len(), 2);
        assert!(rd.exit_policy[0].accept);
        assert!(!rd.exit_policy[1].accept);
        assert!(rd.identity_ed25519.is_none());
    }

    #[test]
    fn rejects_missing_router_line() {
        let doc = MINIMAL.replacen("router test 127.0.0.1 9001 0 0\n", "", 1);
        assert!(matches!(
            RouterDescriptor::parse(&doc),
            Err(Error::MissingKeyword("router"))
        ));
    }

    #[test]
    fn bad_rsa_signature_is_rejected() {
        let rd = RouterDescriptor::parse(MINIMAL).unwrap();
        assert!(rd.check_rsa_signature(MINIMAL).is_err());
    }
}
