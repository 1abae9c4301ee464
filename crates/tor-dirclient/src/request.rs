//! Descriptions of directory requests: where to send them, how they're
//! compressed, and how many times to retry.

use std::net::IpAddr;
use std::time::{Duration, Instant};

use std::sync::Arc;

use tor_cell::relaycell::StreamId;
use tor_llcrypto::pk::rsa::RsaIdentity;
use tor_proto::channel::Relay;

use crate::err::{Error, Result};
use crate::response::DirResponse;
use crate::util;

/// A handful of well-known directory authorities, used only when a [`Query`]
/// is run with no caller-supplied endpoints.
///
/// Real deployments refresh this list from the consensus; this is a small,
/// illustrative fallback, not a maintained mirror of the authority set.
const DEFAULT_AUTHORITIES: &[(IpAddr, u16)] = &[
    (IpAddr::V4(std::net::Ipv4Addr::new(128, 31, 0, 39)), 9131),
    (IpAddr::V4(std::net::Ipv4Addr::new(199, 58, 81, 140)), 80),
    (IpAddr::V4(std::net::Ipv4Addr::new(45, 66, 33, 45)), 80),
];

/// Where to send a directory request.
#[derive(Clone, Debug)]
pub enum Endpoint {
    /// A relay's plaintext DirPort: a raw TCP connection.
    DirPort(IpAddr, u16),
    /// A relay's ORPort, tunnelled through a one-hop circuit.
    ///
    /// If `link_protocols` is `None`, [`tor_proto::channel::SUPPORTED_LINK_PROTOCOLS`]
    /// is offered.
    ORPort(IpAddr, u16, Option<Vec<u16>>),
}

impl Endpoint {
    /// The address this endpoint ultimately connects to, for error reporting.
    fn socket_addr(&self) -> std::net::SocketAddr {
        match self {
            Endpoint::DirPort(addr, port) | Endpoint::ORPort(addr, port, _) => {
                std::net::SocketAddr::new(*addr, *port)
            }
        }
    }
}

/// A compressed transfer encoding this crate can produce an `Accept-Encoding`
/// entry for, and decode from a `Content-Encoding` response header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compression {
    /// Gzip-framed deflate.
    Gzip,
    /// What Tor's directory protocol calls `deflate`; on the wire, identical
    /// to [`Compression::Gzip`].
    Deflate,
    /// Zstandard, if this build was compiled with the `zstd` feature.
    Zstd,
    /// LZMA/xz, if this build was compiled with the `xz` feature.
    Xz,
}

impl Compression {
    /// This codec's name as it appears in `Accept-Encoding`/`Content-Encoding`.
    pub(crate) fn header_name(self) -> &'static str {
        match self {
            Compression::Gzip => "gzip",
            Compression::Deflate => "deflate",
            Compression::Zstd => "x-zstd",
            Compression::Xz => "x-tor-lzma",
        }
    }

    /// Parse a `Content-Encoding` value back into a [`Compression`].
    pub(crate) fn from_header_name(name: &str) -> Option<Self> {
        match name {
            "gzip" => Some(Compression::Gzip),
            "deflate" => Some(Compression::Deflate),
            "x-zstd" | "zstd" => Some(Compression::Zstd),
            "x-tor-lzma" | "lzma" | "xz" => Some(Compression::Xz),
            _ => None,
        }
    }

    /// True if this build can actually decode this codec.
    fn available(self) -> bool {
        match self {
            Compression::Gzip | Compression::Deflate => true,
            Compression::Zstd => cfg!(feature = "zstd"),
            Compression::Xz => cfg!(feature = "xz"),
        }
    }
}

/// Which parser in [`tor_netdoc`] a response's body should be fed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DescriptorType {
    /// A server descriptor, or a concatenated sequence of them.
    ServerDescriptor,
    /// A microdescriptor, or a concatenated sequence of them.
    Microdescriptor,
    /// A network-status consensus.
    Consensus,
    /// A network-status vote.
    Vote,
    /// A directory key certificate, or a concatenated sequence of them.
    KeyCertificate,
    /// A v3 onion service descriptor.
    HsDescriptor,
    /// A document this crate has no parser for; returned as raw bytes only.
    Opaque,
}

/// A directory request: what to ask for, where to send it, and how hard to
/// try.
#[derive(Clone, Debug)]
pub struct Query {
    /// The resource path, e.g. `/tor/status-vote/current/consensus.z`.
    resource: String,
    /// Which parser the response body is meant for.
    descriptor_type: DescriptorType,
    /// Where this request may be sent; tried in order, one per attempt.
    endpoints: Vec<Endpoint>,
    /// Which codecs to advertise in `Accept-Encoding`, most preferred first.
    compression: Vec<Compression>,
    /// How many additional attempts to make after the first failure.
    retries: u32,
    /// The maximum time a single attempt (connect + request + response) may
    /// take.
    timeout: Duration,
}

impl Query {
    /// Build a request for `resource`, to be parsed as `descriptor_type`.
    ///
    /// If `resource` ends in `.z`, the suffix is stripped and compression is
    /// forced to gzip, overriding any compression list set later.
    pub fn new(resource: impl Into<String>, descriptor_type: DescriptorType) -> Self {
        let mut resource = resource.into();
        let compression = if let Some(stripped) = resource.strip_suffix(".z") {
            resource = stripped.to_owned();
            vec![Compression::Gzip]
        } else {
            vec![Compression::Gzip, Compression::Deflate]
        };

        Query {
            resource,
            descriptor_type,
            endpoints: Vec::new(),
            compression,
            retries: 2,
            timeout: Duration::from_secs(30),
        }
    }

    /// Set the endpoints this request may be sent to.
    pub fn with_endpoints(mut self, endpoints: Vec<Endpoint>) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Set the codecs to advertise, most preferred first.
    pub fn with_compression(mut self, compression: Vec<Compression>) -> Self {
        self.compression = compression;
        self
    }

    /// Set how many additional attempts to make after the first failure.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Set the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// This request's resource path, with any `.z` suffix already stripped.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Which parser this request's response is meant for.
    pub fn descriptor_type(&self) -> DescriptorType {
        self.descriptor_type
    }

    /// Run this request, retrying on failure up to `retries + 1` total
    /// attempts, each against the next endpoint in [`Query::with_endpoints`]
    /// (cycling back to the start if there are more attempts than
    /// endpoints).
    pub fn run(&self) -> Result<DirResponse> {
        let endpoints: Vec<Endpoint> = if self.endpoints.is_empty() {
            DEFAULT_AUTHORITIES
                .iter()
                .map(|&(addr, port)| Endpoint::DirPort(addr, port))
                .collect()
        } else {
            self.endpoints.clone()
        };
        if endpoints.is_empty() {
            return Err(Error::NoEndpoint);
        }

        let accept_encoding = self
            .compression
            .iter()
            .copied()
            .filter(|c| c.available())
            .map(Compression::header_name)
            .collect::<Vec<_>>()
            .join(", ");

        let mut last_err = None;
        for attempt in 0..=self.retries {
            let endpoint = &endpoints[(attempt as usize) % endpoints.len()];
            match self.attempt(endpoint, &accept_encoding) {
                Ok(resp) => return Ok(resp),
                Err(e) => last_err = Some(e),
            }
        }
        Err(Error::AllAttemptsFailed(
            self.retries + 1,
            Box::new(last_err.expect("at least one attempt runs")),
        ))
    }

    /// Make one attempt against `endpoint`.
    fn attempt(&self, endpoint: &Endpoint, accept_encoding: &str) -> Result<DirResponse> {
        let started = Instant::now();
        let deadline = started + self.timeout;

        let req = http::Request::builder()
            .method("GET")
            .uri(&self.resource)
            .header("Accept-Encoding", accept_encoding)
            .header("User-Agent", "tor-relay-core/0.1.0")
            .body(())
            .expect("well-formed request");
        let encoded = util::encode_request(&req);

        let raw = match endpoint {
            Endpoint::DirPort(addr, port) => {
                self.fetch_via_dirport(*addr, *port, &encoded, deadline)?
            }
            Endpoint::ORPort(addr, port, link_protocols) => {
                self.fetch_via_orport(*addr, *port, link_protocols.as_deref(), &encoded)?
            }
        };

        if started.elapsed() > self.timeout {
            return Err(Error::DownloadTimeout(endpoint.socket_addr(), started.elapsed()));
        }

        Ok(parse_response(&raw)?.with_source(endpoint.clone()))
    }

    /// Open a raw TCP connection to a DirPort, send the request, and read
    /// the response to EOF.
    fn fetch_via_dirport(
        &self,
        addr: IpAddr,
        port: u16,
        request: &str,
        deadline: Instant,
    ) -> Result<Vec<u8>> {
        use std::io::{Read, Write};
        use std::net::{SocketAddr, TcpStream};

        let sockaddr = SocketAddr::new(addr, port);
        let remaining = deadline.saturating_duration_since(Instant::now());
        let mut stream = TcpStream::connect_timeout(&sockaddr, remaining)
            .map_err(|e| Error::Io(sockaddr, std::sync::Arc::new(e)))?;
        stream
            .set_read_timeout(Some(self.timeout))
            .map_err(|e| Error::Io(sockaddr, std::sync::Arc::new(e)))?;

        stream
            .write_all(request.as_bytes())
            .map_err(|e| Error::Io(sockaddr, std::sync::Arc::new(e)))?;

        let mut out = Vec::new();
        stream
            .read_to_end(&mut out)
            .map_err(|e| Error::Io(sockaddr, std::sync::Arc::new(e)))?;
        Ok(out)
    }

    /// Open a one-hop circuit to a relay's ORPort and tunnel the request
    /// over a directory stream.
    fn fetch_via_orport(
        &self,
        addr: IpAddr,
        port: u16,
        link_protocols: Option<&[u16]>,
        request: &str,
    ) -> Result<Vec<u8>> {
        let protocols = link_protocols.unwrap_or(tor_proto::channel::SUPPORTED_LINK_PROTOCOLS);
        let relay = Arc::new(Relay::connect(addr, port, protocols)?);
        let circuit = relay.create_circuit()?;
        let stream_id = StreamId::new(1).expect("1 != 0");
        let response = circuit.directory(request.as_bytes(), stream_id)?;
        circuit.close()?;
        Ok(response)
    }
}

/// Split a raw HTTP/1.0 response into its status line, parse it, and
/// decompress the body according to any `Content-Encoding` header.
fn parse_response(raw: &[u8]) -> Result<DirResponse> {
    let header_end = find_header_end(raw)
        .ok_or_else(|| Error::ProtocolError("response has no blank line ending its headers".into()))?;
    let (header_bytes, body) = raw.split_at(header_end);

    let mut headers = [httparse::EMPTY_HEADER; 32];
    let mut response = httparse::Response::new(&mut headers);
    response
        .parse(header_bytes)
        .map_err(|e| Error::ProtocolError(format!("couldn't parse HTTP headers: {e}")))?;

    let status = response.code.unwrap_or(0);
    if status / 100 != 2 {
        return Err(Error::ProtocolError(format!(
            "HTTP/1.0 {} {}",
            status,
            response.reason.unwrap_or_default()
        )));
    }

    let encoding = response
        .headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case("Content-Encoding"))
        .map(|h| String::from_utf8_lossy(h.value).into_owned());

    let decoded = util::decompress(body, encoding.as_deref())?;
    Ok(DirResponse::new(status, decoded))
}

/// Find the byte offset just after the `\r\n\r\n` (or bare `\n\n`) that ends
/// an HTTP header block.
fn find_header_end(raw: &[u8]) -> Option<usize> {
    raw.windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|i| i + 4)
        .or_else(|| raw.windows(2).position(|w| w == b"\n\n").map(|i| i + 2))
}

/// At most this many fingerprints may appear in a `/tor/server/fp/` or
/// `/tor/extra/fp/` URL.
const MAX_FINGERPRINTS: usize = 96;
/// At most this many digests may appear in a `/tor/micro/d/` URL.
const MAX_MICRODESC_DIGESTS: usize = 92;

/// Join a sorted, hex- or base64-encoded digest list with `sep`.
fn join_digests<T>(digests: &[T], encode: impl Fn(&T) -> String, sep: &str) -> Option<String> {
    if digests.is_empty() {
        return None;
    }
    Some(
        digests
            .iter()
            .map(encode)
            .collect::<Vec<_>>()
            .join(sep),
    )
}

/// Build a request for one or more server descriptors, by RSA identity
/// fingerprint.
pub fn get_server_descriptors(fingerprints: &[RsaIdentity]) -> Result<Query> {
    if fingerprints.len() > MAX_FINGERPRINTS {
        return Err(Error::RequestTooLarge(fingerprints.len(), MAX_FINGERPRINTS));
    }
    let ids = join_digests(fingerprints, |f| hex::encode(f.as_bytes()), "+")
        .ok_or_else(|| Error::ProtocolError("no fingerprints given".into()))?;
    Ok(Query::new(
        format!("/tor/server/fp/{ids}.z"),
        DescriptorType::ServerDescriptor,
    ))
}

/// Build a request for one or more extra-info documents, by RSA identity
/// fingerprint.
///
/// This crate has no dedicated extra-info parser; the response is returned
/// as an opaque document.
pub fn get_extrainfo_descriptors(fingerprints: &[RsaIdentity]) -> Result<Query> {
    if fingerprints.len() > MAX_FINGERPRINTS {
        return Err(Error::RequestTooLarge(fingerprints.len(), MAX_FINGERPRINTS));
    }
    let ids = join_digests(fingerprints, |f| hex::encode(f.as_bytes()), "+")
        .ok_or_else(|| Error::ProtocolError("no fingerprints given".into()))?;
    Ok(Query::new(format!("/tor/extra/fp/{ids}.z"), DescriptorType::Opaque))
}

/// Build a request for one or more microdescriptors, by SHA-256 digest.
pub fn get_microdescriptors(hashes: &[[u8; 32]]) -> Result<Query> {
    if hashes.len() > MAX_MICRODESC_DIGESTS {
        return Err(Error::RequestTooLarge(hashes.len(), MAX_MICRODESC_DIGESTS));
    }
    use base64ct::{Base64Unpadded, Encoding};
    let ids = join_digests(hashes, |h| Base64Unpadded::encode_string(h), "-")
        .ok_or_else(|| Error::ProtocolError("no digests given".into()))?;
    Ok(Query::new(
        format!("/tor/micro/d/{ids}.z"),
        DescriptorType::Microdescriptor,
    ))
}

/// Build a request for the current consensus.
///
/// If `authority_v3ident` is non-empty, the cache is asked to serve a
/// consensus signed by at least those authorities.
pub fn get_consensus(authority_v3ident: &[RsaIdentity], microdescriptor: bool) -> Query {
    let mut resource = "/tor/status-vote/current/consensus".to_owned();
    if microdescriptor {
        resource.push_str("-microdesc");
    }
    if let Some(ids) = join_digests(authority_v3ident, |f| hex::encode(f.as_bytes()), "+") {
        resource.push('/');
        resource.push_str(&ids);
    }
    resource.push_str(".z");
    let descriptor_type = if microdescriptor {
        DescriptorType::Microdescriptor
    } else {
        DescriptorType::Consensus
    };
    Query::new(resource, descriptor_type)
}

/// Build a request for an authority's current vote.
pub fn get_vote(authority: RsaIdentity) -> Query {
    Query::new(
        format!("/tor/status-vote/current/{}.z", hex::encode(authority.as_bytes())),
        DescriptorType::Vote,
    )
}

/// Build a request for one or more directory key certificates, by v3
/// identity fingerprint.
pub fn get_key_certificates(v3idents: &[RsaIdentity]) -> Result<Query> {
    let ids = join_digests(v3idents, |f| hex::encode(f.as_bytes()), "+")
        .ok_or_else(|| Error::ProtocolError("no identities given".into()))?;
    Ok(Query::new(
        format!("/tor/keys/fp/{ids}.z"),
        DescriptorType::KeyCertificate,
    ))
}

/// Build a request for the current bandwidth-measurement file.
pub fn get_bandwidth_file() -> Query {
    Query::new("/tor/status-vote/current/bandwidth.z", DescriptorType::Opaque)
}

/// Build a request for the current detached signatures document.
pub fn get_detached_signatures() -> Query {
    Query::new(
        "/tor/status-vote/next/consensus-signatures.z",
        DescriptorType::Opaque,
    )
}

/// Build a request for a v3 onion service descriptor, by blinded HSDir
/// lookup key (hex- or base32-encoded, as the HSDir protocol expects).
pub fn get_hs_descriptor(blinded_id_b64: &str) -> Query {
    Query::new(
        format!("/tor/hs/3/{blinded_id_b64}"),
        DescriptorType::HsDescriptor,
    )
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn strips_z_suffix_and_forces_gzip() {
        let q = Query::new("/tor/server/all.z", DescriptorType::ServerDescriptor);
        assert_eq!(q.resource(), "/tor/server/all");
    }

    #[test]
    fn rejects_too_many_fingerprints() {
        let fps = vec![RsaIdentity::from_bytes(&[0u8; 20]).unwrap(); 97];
        assert!(matches!(
            get_server_descriptors(&fps),
            Err(Error::RequestTooLarge(97, MAX_FINGERPRINTS))
        ));
    }

    #[test]
    fn consensus_resource_names_microdesc_flavor() {
        let q = get_consensus(&[], true);
        assert_eq!(q.resource(), "/tor/status-vote/current/consensus-microdesc");
        assert_eq!(q.descriptor_type(), DescriptorType::Microdescriptor);
    }

    #[test]
    fn header_end_detection() {
        let raw = b"HTTP/1.0 200 OK\r\nContent-Length: 2\r\n\r\nhi";
        assert_eq!(find_header_end(raw), Some(raw.len() - 2));
    }
}
