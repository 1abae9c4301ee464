//! Microdescriptors: the compact, summarized form of a server descriptor
//! that clients fetch in bulk to build circuits.

use digest::Digest;

use tor_llcrypto::d::Sha256;
use tor_llcrypto::pk::ed25519;
use tor_llcrypto::pk::rsa::{PublicKey as RsaPublicKey, RsaIdentity};

use crate::err::{Error, Result};
use crate::parse;

/// One `a` line: an alternate (usually IPv6) ORPort address for this relay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Address {
    /// The address and port, exactly as written (e.g. `"[2001:db8::1]:9001"`).
    pub addr_port: String,
}

/// A parsed microdescriptor.
#[derive(Debug, Clone)]
pub struct Microdescriptor {
    /// The relay's legacy RSA onion key, used for the TAP handshake.
    pub onion_key: RsaPublicKey,
    /// The relay's ntor onion key.
    pub ntor_onion_key: Option<[u8; 32]>,
    /// The relay's Ed25519 identity, from an `id ed25519` line.
    pub ed25519_id: Option<ed25519::Ed25519Identity>,
    /// The relay's RSA identity, from a legacy `id rsa1024` line.
    pub rsa1024_id: Option<RsaIdentity>,
    /// Additional ORPort addresses, from `a` lines.
    pub addresses: Vec<Address>,
    /// The summarized exit policy `p` line's arguments, if present (e.g.
    /// `"accept 80,443"`).
    pub policy_summary: Option<String>,
    /// The comma-separated nicknames on the `family` line, if present.
    pub family: Vec<String>,
}

impl Microdescriptor {
    /// Split a microdescriptor-consensus response body into the text of
    /// each individual microdescriptor it contains.
    ///
    /// Each microdescriptor begins with its own `onion-key` line; this just
    /// finds those boundaries.
    pub fn split_entries(document: &str) -> Vec<&str> {
        let mut starts: Vec<usize> = document
            .match_indices("onion-key\n")
            .map(|(i, _)| i)
            .filter(|&i| i == 0 || document.as_bytes()[i - 1] == b'\n')
            .collect();
        starts.push(document.len());
        starts
            .windows(2)
            .map(|w| &document[w[0]..w[1]])
            .collect()
    }

    /// The SHA-256 digest Tor uses to name this microdescriptor, computed
    /// over its exact on-the-wire bytes (as returned by
    /// [`split_entries`](Microdescriptor::split_entries)).
    pub fn digest(raw_entry: &str) -> [u8; 32] {
        Sha256::digest(raw_entry.as_bytes()).into()
    }

    /// Parse a single microdescriptor from its text (one element of
    /// [`split_entries`](Microdescriptor::split_entries)'s output).
    pub fn parse(document: &str) -> Result<Self> {
        let items = parse::tokenize(document)?;
        parse::require_single(&items, "onion-key")?;

        let onion_key_item = parse::require(&items, "onion-key")?;
        let der = onion_key_item.obj_bytes_tagged("RSA PUBLIC KEY")?;
        let onion_key = RsaPublicKey::from_der(der)
            .ok_or_else(|| Error::Malformed("onion-key is not a valid RSA key".into()))?;

        let ntor_onion_key = match parse::find(&items, "ntor-onion-key") {
            Some(item) => Some(decode_fixed::<32>(item.required_arg(0)?)?),
            None => None,
        };

        let mut ed25519_id = None;
        let mut rsa1024_id = None;
        for item in items.iter().filter(|i| i.keyword == "id") {
            match item.required_arg(0)? {
                "ed25519" => {
                    ed25519_id = Some(ed25519::Ed25519Identity::new(decode_fixed::<32>(
                        item.required_arg(1)?,
                    )?));
                }
                "rsa1024" => {
                    let bytes = decode_fixed::<20>(item.required_arg(1)?)?;
                    rsa1024_id = Some(RsaIdentity::from(bytes));
                }
                _ => continue,
            }
        }

        let addresses = items
            .iter()
            .filter(|i| i.keyword == "a")
            .map(|i| Address { addr_port: i.args.to_owned() })
            .collect();

        let policy_summary = items
            .iter()
            .find(|i| i.keyword == "p" || i.keyword == "p6")
            .map(|i| i.args.to_owned());

        let family = parse::find(&items, "family")
            .map(|i| i.args().map(str::to_owned).collect())
            .unwrap_or_default();

        Ok(Microdescriptor {
            onion_key,
            ntor_onion_key,
            ed25519_id,
            rsa1024_id,
            addresses,
            policy_summary,
            family,
        })
    }
}

/// Base64-decode (unpadded) `s` into a fixed-size array.
fn decode_fixed<const N: usize>(s: &str) -> Result<[u8; N]> {
    use base64ct::{Base64Unpadded, Encoding};
    Base64Unpadded::decode_vec(s)
        .map_err(|_| Error::TruncatedObject)?
        .try_into()
        .map_err(|_| Error::Malformed("field has the wrong decoded length".into()))
}

#[cfg(test)]
mod test {
    use super::*;

    const TWO_ENTRIES: &str = "\
onion-key
-----BEGIN RSA PUBLIC KEY-----
MAkCAgBmAgMBAAE=
-----END RSA PUBLIC KEY-----
id ed25519 AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA
a [2001:db8::1]:9001
p accept 80,443
onion-key
-----BEGIN RSA PUBLIC KEY-----
MAkCAgBnAgMBAAE=
-----END RSA PUBLIC KEY-----
p reject 1-65535
";

    #[test]
    fn splits_multiple_entries() {
        let entries = Microdescriptor::split_entries(TWO_ENTRIES);
        assert_eq!(entries.len(), 2);
        assert!(entries[0].starts_with("onion-key\n"));
        assert!(entries[1].starts_with("onion-key\n"));
    }

    #[test]
    fn parses_addresses_and_policy() {
        let entries = Microdescriptor::split_entries(TWO_ENTRIES);
        let md = Microdescriptor::parse(entries[0]).unwrap();
        assert_eq!(md.addresses.len(), 1);
        assert_eq!(md.policy_summary.as_deref(), Some("accept 80,443"));
        assert!(md.ed25519_id.is_some());
    }

    #[test]
    fn digest_is_stable() {
        let entries = Microdescriptor::split_entries(TWO_ENTRIES);
        assert_eq!(Microdescriptor::digest(entries[0]), Microdescriptor::digest(entries[0]));
        assert_ne!(Microdescriptor::digest(entries[0]), Microdescriptor::digest(entries[1]));
    }
}
