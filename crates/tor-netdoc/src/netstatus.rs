//! Directory key certificates, and network-status consensus and vote
//! documents.

use std::net::IpAddr;

use base64ct::{Base64Unpadded, Encoding};
use digest::Digest;
use time::macros::format_description;
use time::PrimitiveDateTime;

use tor_llcrypto::d::{Sha1, Sha256};
use tor_llcrypto::pk::rsa::{PublicKey as RsaPublicKey, RsaIdentity, ValidatableRsaSignature};
use tor_llcrypto::pk::ValidatableSignature;

use crate::err::{Error, Result};
use crate::parse::{self, signed_range_inclusive};

/// The digest algorithm a directory signature, or a signed range, was
/// computed with.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DigestAlgorithm {
    /// SHA-1, the original (and still default) algorithm.
    Sha1,
    /// SHA-256, used by signatures that name it explicitly.
    Sha256,
}

impl DigestAlgorithm {
    /// Parse the algorithm name as it appears in a `directory-signature` line.
    fn parse(name: Option<&str>) -> Self {
        match name {
            Some("sha256") => DigestAlgorithm::Sha256,
            _ => DigestAlgorithm::Sha1,
        }
    }

    /// Compute this algorithm's digest of `data`.
    fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            DigestAlgorithm::Sha1 => Sha1::digest(data).to_vec(),
            DigestAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
        }
    }
}

/// A directory authority's key certificate: binds a medium-term signing key
/// to a long-term identity key.
#[derive(Debug, Clone)]
pub struct KeyCertificate {
    /// This authority's long-term RSA identity key.
    pub identity_key: RsaPublicKey,
    /// This authority's medium-term RSA signing key.
    pub signing_key: RsaPublicKey,
    /// The fingerprint declared on the `fingerprint` line, which should
    /// match the digest of `identity_key`.
    pub fingerprint: RsaIdentity,
    /// The RSA signature of `signing_key`'s digest, made with `identity_key`.
    crosscert: Vec<u8>,
    /// The RSA self-signature over the whole certificate, made with
    /// `signing_key`.
    certification: Vec<u8>,
}

impl KeyCertificate {
    /// Parse a key certificate from its text.
    pub fn parse(document: &str) -> Result<Self> {
        let items = parse::tokenize(document)?;
        parse::require(&items, "dir-key-certificate-version")?;

        let fingerprint_item = parse::require(&items, "fingerprint")?;
        let fp_hex: String = fingerprint_item.args.split_ascii_whitespace().collect();
        let fingerprint = RsaIdentity::from_bytes(
            &hex::decode(fp_hex).map_err(|_| Error::Malformed("fingerprint is not valid hex".into()))?,
        )
        .ok_or_else(|| Error::Malformed("fingerprint has the wrong length".into()))?;

        let identity_key = RsaPublicKey::from_der(
            parse::require(&items, "dir-identity-key")?.obj_bytes_tagged("RSA PUBLIC KEY")?,
        )
        .ok_or_else(|| Error::Malformed("dir-identity-key is not a valid RSA key".into()))?;

        let signing_key = RsaPublicKey::from_der(
            parse::require(&items, "dir-signing-key")?.obj_bytes_tagged("RSA PUBLIC KEY")?,
        )
        .ok_or_else(|| Error::Malformed("dir-signing-key is not a valid RSA key".into()))?;

        let crosscert = parse::require(&items, "dir-key-crosscert")?
            .obj_bytes_tagged("ID SIGNATURE")?
            .to_vec();
        let certification = parse::require(&items, "dir-key-certification")?
            .obj_bytes_tagged("SIGNATURE")?
            .to_vec();

        Ok(KeyCertificate {
            identity_key,
            signing_key,
            fingerprint,
            crosscert,
            certification,
        })
    }

    /// Check that the signing key is really vouched for by the identity key
    /// (via `dir-key-crosscert`), and that the certificate is self-signed by
    /// the signing key (via `dir-key-certification`).
    pub fn validate(&self, document: &str) -> Result<()> {
        if self.identity_key.to_rsa_identity() != self.fingerprint {
            return Err(Error::Malformed(
                "fingerprint does not match dir-identity-key".into(),
            ));
        }

        let signing_digest = Sha1::digest(self.signing_key.to_der());
        let crosscert = ValidatableRsaSignature::new(self.identity_key.clone(), &self.crosscert, &signing_digest);
        if !crosscert.is_valid() {
            return Err(Error::BadSignature);
        }

        let range = signed_range_inclusive(
            document,
            "dir-key-certificate-version",
            "dir-key-certification",
        )?;
        let self_digest = Sha1::digest(range.as_bytes());
        let certification =
            ValidatableRsaSignature::new(self.signing_key.clone(), &self.certification, &self_digest);
        if !certification.is_valid() {
            return Err(Error::BadSignature);
        }

        Ok(())
    }
}

/// One relay's entry in a network-status document (an `r` line and the
/// lines that follow it, up to the next `r` line or the document footer).
#[derive(Debug, Clone)]
pub struct RouterStatus {
    /// The relay's self-chosen nickname.
    pub nickname: String,
    /// The relay's RSA identity digest.
    pub identity: RsaIdentity,
    /// The relay's server-descriptor digest, as published on the `r` line.
    pub descriptor_digest: [u8; 20],
    /// When the relay's descriptor was published.
    pub published: PrimitiveDateTime,
    /// The relay's IPv4 address.
    pub address: IpAddr,
    /// The relay's ORPort.
    pub or_port: u16,
    /// The relay's DirPort, or 0 if it has none.
    pub dir_port: u16,
    /// The flags the authorities assigned this relay (from the `s` line).
    pub flags: Vec<String>,
    /// The relay's declared version (from the `v` line).
    pub version: Option<String>,
    /// The raw contents of the `w` (bandwidth) line's arguments.
    pub bandwidth_line: Option<String>,
    /// The raw contents of the `p` (exit policy summary) line's arguments.
    pub policy_summary: Option<String>,
    /// Additional ORPort addresses, from `a` lines.
    pub or_addresses: Vec<String>,
    /// The raw contents of the `pr` (protocol versions) line's arguments.
    pub protocols: Option<String>,
}

impl RouterStatus {
    /// Parse one router-status entry from its `r` line onward.
    fn parse(items: &[parse::Item<'_>]) -> Result<Self> {
        let r = &items[0];
        if r.keyword != "r" {
            return Err(Error::Malformed("router-status entry does not start with `r`".into()));
        }
        let nickname = r.required_arg(0)?.to_owned();
        let identity = decode_rsa_identity(r.required_arg(1)?)?;
        let descriptor_digest = decode_fixed::<20>(r.required_arg(2)?)?;

        let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
        let published_text = format!("{} {}", r.required_arg(3)?, r.required_arg(4)?);
        let published = PrimitiveDateTime::parse(&published_text, &format)
            .map_err(|_| Error::Malformed("r line has an invalid timestamp".into()))?;

        let address: IpAddr = r
            .required_arg(5)?
            .parse()
            .map_err(|_| Error::Malformed("r line address is not an IP address".into()))?;
        let or_port: u16 = r
            .required_arg(6)?
            .parse()
            .map_err(|_| Error::Malformed("r line has an invalid ORPort".into()))?;
        let dir_port: u16 = r
            .required_arg(7)?
            .parse()
            .map_err(|_| Error::Malformed("r line has an invalid DirPort".into()))?;

        let flags = parse::find(items, "s")
            .map(|i| i.args().map(str::to_owned).collect())
            .unwrap_or_default();
        let version = parse::find(items, "v").map(|i| i.args.to_owned());
        let bandwidth_line = parse::find(items, "w").map(|i| i.args.to_owned());
        let policy_summary = parse::find(items, "p").map(|i| i.args.to_owned());
        let or_addresses = items
            .iter()
            .filter(|i| i.keyword == "a")
            .map(|i| i.args.to_owned())
            .collect();
        let protocols = parse::find(items, "pr").map(|i| i.args.to_owned());

        Ok(RouterStatus {
            nickname,
            identity,
            descriptor_digest,
            published,
            address,
            or_port,
            dir_port,
            flags,
            version,
            bandwidth_line,
            policy_summary,
            or_addresses,
            protocols,
        })
    }

    /// True if the `s` line lists the `Running` flag.
    pub fn is_running(&self) -> bool {
        self.flags.iter().any(|f| f == "Running")
    }
}

/// One authority's signature over a network-status document.
#[derive(Debug, Clone)]
pub struct DirectorySignature {
    /// The signing authority's identity digest.
    pub identity: RsaIdentity,
    /// The digest of the authority's signing key that made this signature.
    pub signing_key_digest: RsaIdentity,
    /// The digest algorithm this signature was computed with.
    pub algorithm: DigestAlgorithm,
    /// The raw RSA signature bytes.
    signature: Vec<u8>,
}

/// A parsed network-status consensus or vote document.
#[derive(Debug, Clone)]
pub struct NetworkStatus {
    /// Whether this document is a `"consensus"` or a `"vote"`.
    pub vote_status: String,
    /// The document format version on the `network-status-version` line.
    pub version: u32,
    /// When this document was produced.
    pub valid_after: PrimitiveDateTime,
    /// When a fresher version of this document should be available.
    pub fresh_until: PrimitiveDateTime,
    /// The latest time this document is valid until.
    pub valid_until: PrimitiveDateTime,
    /// Every relay's status entry, in the order they appear.
    pub routers: Vec<RouterStatus>,
    /// Every authority's signature over this document.
    pub signatures: Vec<DirectorySignature>,
}

impl NetworkStatus {
    /// Parse a consensus or vote document from its text.
    pub fn parse(document: &str) -> Result<Self> {
        let items = parse::tokenize(document)?;

        let version_item = parse::require(&items, "network-status-version")?;
        let version: u32 = version_item
            .required_arg(0)?
            .parse()
            .map_err(|_| Error::Malformed("network-status-version is not a number".into()))?;
        let vote_status = parse::require(&items, "vote-status")?.required_arg(0)?.to_owned();

        let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
        let parse_time = |keyword: &'static str| -> Result<PrimitiveDateTime> {
            let item = parse::require(&items, keyword)?;
            let text = format!("{} {}", item.required_arg(0)?, item.required_arg(1)?);
            PrimitiveDateTime::parse(&text, &format)
                .map_err(|_| Error::Malformed(format!("`{keyword}` has an invalid timestamp")))
        };
        let valid_after = parse_time("valid-after")?;
        let fresh_until = parse_time("fresh-until")?;
        let valid_until = parse_time("valid-until")?;

        let routers = split_router_entries(&items)
            .into_iter()
            .map(RouterStatus::parse)
            .collect::<Result<Vec<_>>>()?;

        let mut signatures = Vec::new();
        for item in items.iter().filter(|i| i.keyword == "directory-signature") {
            let algorithm = if item.args().count() == 3 {
                DigestAlgorithm::parse(item.arg(0))
            } else {
                DigestAlgorithm::Sha1
            };
            let (identity_hex, key_digest_hex) = if item.args().count() == 3 {
                (item.required_arg(1)?, item.required_arg(2)?)
            } else {
                (item.required_arg(0)?, item.required_arg(1)?)
            };
            let identity = decode_rsa_identity(identity_hex)?;
            let signing_key_digest = decode_rsa_identity(key_digest_hex)?;
            let signature = item.obj_bytes_tagged("SIGNATURE")?.to_vec();
            signatures.push(DirectorySignature {
                identity,
                signing_key_digest,
                algorithm,
                signature,
            });
        }

        Ok(NetworkStatus {
            vote_status,
            version,
            valid_after,
            fresh_until,
            valid_until,
            routers,
            signatures,
        })
    }

    /// Check one authority's signature, given the [`KeyCertificate`] whose
    /// signing key digest matches it.
    pub fn check_signature(&self, document: &str, sig: &DirectorySignature, cert: &KeyCertificate) -> Result<()> {
        if cert.signing_key.to_rsa_identity() != sig.signing_key_digest {
            return Err(Error::Malformed(
                "certificate's signing key does not match this signature".into(),
            ));
        }
        let range = signed_range_inclusive(document, "network-status-version", "directory-signature")?;
        let digest = sig.algorithm.digest(range.as_bytes());
        let validatable = ValidatableRsaSignature::new(cert.signing_key.clone(), &sig.signature, &digest);
        if validatable.is_valid() {
            Ok(())
        } else {
            Err(Error::BadSignature)
        }
    }
}

/// Group the flat item list into one slice per router-status entry, each
/// starting at an `r` line and running up to (but not including) the next
/// `r` line or the `directory-footer` line.
fn split_router_entries<'a, 'b>(items: &'b [parse::Item<'a>]) -> Vec<&'b [parse::Item<'a>]> {
    let mut starts: Vec<usize> = items
        .iter()
        .enumerate()
        .filter(|(_, i)| i.keyword == "r")
        .map(|(idx, _)| idx)
        .collect();
    let end = items
        .iter()
        .position(|i| i.keyword == "directory-footer")
        .unwrap_or(items.len());
    starts.push(end);
    starts.windows(2).map(|w| &items[w[0]..w[1]]).collect()
}

/// Decode an unpadded-base64 SHA-1 identity/digest field.
fn decode_rsa_identity(s: &str) -> Result<RsaIdentity> {
    let bytes = Base64Unpadded::decode_vec(s).map_err(|_| Error::TruncatedObject)?;
    RsaIdentity::from_bytes(&bytes).ok_or_else(|| Error::Malformed("identity field has the wrong length".into()))
}

/// Decode an unpadded-base64 field into a fixed-size array.
fn decode_fixed<const N: usize>(s: &str) -> Result<[u8; N]> {
    Base64Unpadded::decode_vec(s)
        .map_err(|_| Error::TruncatedObject)?
        .try_into()
        .map_err(|_| Error::Malformed("field has the wrong decoded length".into()))
}

#[cfg(test)]
mod test {
    use super::*;

    const CONSENSUS: &str = "\
network-status-version 3
vote-status consensus
valid-after 2026-01-01 00:00:00
fresh-until 2026-01-01 01:00:00
valid-until 2026-01-01 03:00:00
r nick1 AAAAAAAAAAAAAAAAAAAAAAAAAAAA BBBBBBBBBBBBBBBBBBBBBBBBBBBB 2026-01-01 00:00:00 127.0.0.1 9001 0
s Fast Running Valid
v Tor 0.4.8.9
w Bandwidth=1000
p accept 80,443
r nick2 AAAAAAAAAAAAAAAAAAAAAAAAAAAB BBBBBBBBBBBBBBBBBBBBBBBBBBBC 2026-01-01 00:00:00 127.0.0.2 9002 0
s Running
directory-footer
directory-signature AAAAAAAAAAAAAAAAAAAAAAAAAAAA BBBBBBBBBBBBBBBBBBBBBBBBBBBB
-----BEGIN SIGNATURE-----
AA==
-----END SIGNATURE-----
";

    #[test]
    fn parses_two_routers() {
        let ns = NetworkStatus::parse(CONSENSUS).unwrap();
        assert_eq!(ns.routers.len(), 2);
        assert_eq!(ns.routers[0].nickname, "nick1");
        assert!(ns.routers[0].is_running());
        assert_eq!(ns.routers[0].version.as_deref(), Some("Tor 0.4.8.9"));
        assert_eq!(ns.routers[1].nickname, "nick2");
        assert_eq!(ns.signatures.len(), 1);
    }

    #[test]
    fn router_entries_dont_bleed_into_each_other() {
        let ns = NetworkStatus::parse(CONSENSUS).unwrap();
        assert_eq!(ns.routers[1].flags, vec!["Running".to_string()]);
        assert!(ns.routers[1].version.is_none());
    }
}
