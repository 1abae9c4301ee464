//! The different kinds of messages that can be carried in a [`super::ChanCell`].

use super::ChanCmd;
use caret::caret_int;
use std::net::{IpAddr, Ipv4Addr};
use tor_bytes::{EncodeError, EncodeResult, Error, Readable, Reader, Result, Writer};

/// Trait for the body of a channel message: everything but the circuit ID,
/// command, and length.
pub trait Body: Readable {
    /// Decode a body from `r`. `r` is truncated to the exact body length.
    fn decode_from_reader(r: &mut Reader<'_>) -> Result<Self> {
        r.extract()
    }
    /// Encode this body (and nothing else) onto `w`.
    fn encode_onto<W: Writer + ?Sized>(self, w: &mut W) -> EncodeResult<()>;
}

/// A decoded message from a channel: a command tag plus its parsed body.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum AnyChanMsg {
    /// Fixed-length cell to be dropped.
    Padding(Padding),
    /// Variable-length padding.
    Vpadding(Vpadding),
    /// Obsolete TAP-based circuit creation.
    Create(Opaque),
    /// No-public-key circuit creation.
    CreateFast(CreateFast),
    /// Current-format circuit creation.
    Create2(Opaque),
    /// Obsolete TAP-based circuit creation reply.
    Created(Opaque),
    /// No-public-key circuit creation reply.
    CreatedFast(CreatedFast),
    /// Current-format circuit creation reply.
    Created2(Opaque),
    /// A message sent along a circuit.
    Relay(Relay),
    /// A message sent along a circuit, with a limited supply.
    RelayEarly(Relay),
    /// Tear down a circuit.
    Destroy(Destroy),
    /// Part of channel negotiation: our view of the network.
    Netinfo(Netinfo),
    /// Part of channel negotiation: supported link protocol versions.
    Versions(Versions),
    /// Adjusts channel-padding settings.
    PaddingNegotiate(PaddingNegotiate),
    /// Additional certificates beyond those in the TLS handshake.
    Certs(Certs),
    /// Challenge material for the relay-to-relay handshake.
    AuthChallenge(Opaque),
    /// Authentication material for the relay-to-relay handshake.
    Authenticate(Opaque),
    /// Reserved; not currently used.
    Authorize(Opaque),
    /// Any cell whose command we don't recognize. Well-behaved
    /// implementations ignore these.
    Unrecognized(Unrecognized),
}

impl crate::chancell::ChanMsg for AnyChanMsg {
    fn cmd(&self) -> ChanCmd {
        use AnyChanMsg::*;
        match self {
            Padding(_) => ChanCmd::PADDING,
            Vpadding(_) => ChanCmd::VPADDING,
            Create(_) => ChanCmd::CREATE,
            CreateFast(_) => ChanCmd::CREATE_FAST,
            Create2(_) => ChanCmd::CREATE2,
            Created(_) => ChanCmd::CREATED,
            CreatedFast(_) => ChanCmd::CREATED_FAST,
            Created2(_) => ChanCmd::CREATED2,
            Relay(_) => ChanCmd::RELAY,
            RelayEarly(_) => ChanCmd::RELAY_EARLY,
            Destroy(_) => ChanCmd::DESTROY,
            Netinfo(_) => ChanCmd::NETINFO,
            Versions(_) => ChanCmd::VERSIONS,
            PaddingNegotiate(_) => ChanCmd::PADDING_NEGOTIATE,
            Certs(_) => ChanCmd::CERTS,
            AuthChallenge(_) => ChanCmd::AUTH_CHALLENGE,
            Authenticate(_) => ChanCmd::AUTHENTICATE,
            Authorize(_) => ChanCmd::AUTHORIZE,
            Unrecognized(u) => u.cmd(),
        }
    }

    fn encode_onto<W: Writer + ?Sized>(self, w: &mut W) -> EncodeResult<()> {
        use AnyChanMsg::*;
        match self {
            Padding(b) => b.encode_onto(w),
            Vpadding(b) => b.encode_onto(w),
            Create(b) | Create2(b) | Created(b) | Created2(b) | AuthChallenge(b)
            | Authenticate(b) | Authorize(b) => b.encode_onto(w),
            CreateFast(b) => b.encode_onto(w),
            CreatedFast(b) => b.encode_onto(w),
            Relay(b) | RelayEarly(b) => b.encode_onto(w),
            Destroy(b) => b.encode_onto(w),
            Netinfo(b) => b.encode_onto(w),
            Versions(b) => b.encode_onto(w),
            PaddingNegotiate(b) => b.encode_onto(w),
            Certs(b) => b.encode_onto(w),
            Unrecognized(b) => b.encode_onto(w),
        }
    }

    fn decode_from_reader(cmd: ChanCmd, r: &mut Reader<'_>) -> Result<Self> {
        use AnyChanMsg::*;
        Ok(match cmd {
            ChanCmd::PADDING => Padding(Body::decode_from_reader(r)?),
            ChanCmd::VPADDING => Vpadding(Body::decode_from_reader(r)?),
            ChanCmd::CREATE => Create(Body::decode_from_reader(r)?),
            ChanCmd::CREATE_FAST => CreateFast(Body::decode_from_reader(r)?),
            ChanCmd::CREATE2 => Create2(Body::decode_from_reader(r)?),
            ChanCmd::CREATED => Created(Body::decode_from_reader(r)?),
            ChanCmd::CREATED_FAST => CreatedFast(Body::decode_from_reader(r)?),
            ChanCmd::CREATED2 => Created2(Body::decode_from_reader(r)?),
            ChanCmd::RELAY => Relay(Body::decode_from_reader(r)?),
            ChanCmd::RELAY_EARLY => RelayEarly(Body::decode_from_reader(r)?),
            ChanCmd::DESTROY => Destroy(Body::decode_from_reader(r)?),
            ChanCmd::NETINFO => Netinfo(Body::decode_from_reader(r)?),
            ChanCmd::VERSIONS => Versions(Body::decode_from_reader(r)?),
            ChanCmd::PADDING_NEGOTIATE => PaddingNegotiate(Body::decode_from_reader(r)?),
            ChanCmd::CERTS => Certs(Body::decode_from_reader(r)?),
            ChanCmd::AUTH_CHALLENGE => AuthChallenge(Body::decode_from_reader(r)?),
            ChanCmd::AUTHENTICATE => Authenticate(Body::decode_from_reader(r)?),
            ChanCmd::AUTHORIZE => Authorize(Body::decode_from_reader(r)?),
            _ => Unrecognized(Unrecognized::decode_with_cmd(cmd, r)?),
        })
    }
}

/// A fixed-length cell to be dropped on receipt.
#[derive(Clone, Debug, Default)]
#[non_exhaustive]
pub struct Padding {}
impl Padding {
    /// Construct a new padding cell.
    pub fn new() -> Self {
        Padding {}
    }
}
impl Body for Padding {
    fn encode_onto<W: Writer + ?Sized>(self, _w: &mut W) -> EncodeResult<()> {
        Ok(())
    }
}
impl Readable for Padding {
    fn take_from(_b: &mut Reader<'_>) -> Result<Self> {
        Ok(Padding {})
    }
}

/// A variable-length padding cell.
#[derive(Clone, Debug)]
pub struct Vpadding {
    /// Number of padding bytes to send.
    len: u16,
}
impl Vpadding {
    /// Construct a vpadding cell of the given length.
    pub fn new(len: u16) -> Self {
        Vpadding { len }
    }
}
impl Body for Vpadding {
    fn encode_onto<W: Writer + ?Sized>(self, w: &mut W) -> EncodeResult<()> {
        w.write_zeros(self.len as usize);
        Ok(())
    }
}
impl Readable for Vpadding {
    fn take_from(b: &mut Reader<'_>) -> Result<Self> {
        if b.remaining() > u16::MAX as usize {
            return Err(Error::MalformedField("vpadding cell too long".into()));
        }
        Ok(Vpadding {
            len: b.remaining() as u16,
        })
    }
}

/// A message body whose exact contents this crate doesn't interpret: used
/// for cell types (TAP/ntor circuit-creation handshakes, relay-to-relay
/// authentication) that this client-only library never originates or acts
/// on, but must still be able to carry opaquely.
#[derive(Clone, Debug)]
pub struct Opaque {
    /// The raw cell body.
    content: Vec<u8>,
}
impl Opaque {
    /// Wrap arbitrary bytes as an opaque cell body.
    pub fn new<B: Into<Vec<u8>>>(content: B) -> Self {
        Opaque {
            content: content.into(),
        }
    }
    /// Return the raw bytes of this cell body.
    pub fn content(&self) -> &[u8] {
        &self.content
    }
}
impl Body for Opaque {
    fn encode_onto<W: Writer + ?Sized>(self, w: &mut W) -> EncodeResult<()> {
        w.write_all(&self.content);
        Ok(())
    }
}
impl Readable for Opaque {
    fn take_from(r: &mut Reader<'_>) -> Result<Self> {
        let content = r.take(r.remaining())?.into();
        Ok(Opaque { content })
    }
}

/// Number of bytes in the client's half of a CREATE_FAST/CREATED_FAST
/// handshake.
const FAST_HANDSHAKE_LEN: usize = 20;

/// A CREATE_FAST message: creates a circuit using no public-key crypto.
///
/// Safe only over an already-secure TLS connection, and only for the first
/// hop of a circuit.
#[derive(Clone, Debug)]
pub struct CreateFast {
    /// Client-chosen key material `X`.
    x: [u8; FAST_HANDSHAKE_LEN],
}
impl CreateFast {
    /// Construct a new CREATE_FAST cell from the client's key material.
    pub fn new(x: [u8; FAST_HANDSHAKE_LEN]) -> Self {
        CreateFast { x }
    }
    /// Return the client's key material.
    pub fn x(&self) -> &[u8; FAST_HANDSHAKE_LEN] {
        &self.x
    }
}
impl Body for CreateFast {
    fn encode_onto<W: Writer + ?Sized>(self, w: &mut W) -> EncodeResult<()> {
        w.write_all(&self.x);
        Ok(())
    }
}
impl Readable for CreateFast {
    fn take_from(r: &mut Reader<'_>) -> Result<Self> {
        Ok(CreateFast { x: r.extract()? })
    }
}

/// A CREATED_FAST message: answers a CREATE_FAST message.
#[derive(Clone, Debug)]
pub struct CreatedFast {
    /// The relay's key material `Y`.
    y: [u8; FAST_HANDSHAKE_LEN],
    /// `KDF-TOR(X||Y).key_hash`, proving the relay derived the same key.
    derivative_key: [u8; FAST_HANDSHAKE_LEN],
}
impl CreatedFast {
    /// Construct a new CREATED_FAST cell.
    pub fn new(y: [u8; FAST_HANDSHAKE_LEN], derivative_key: [u8; FAST_HANDSHAKE_LEN]) -> Self {
        CreatedFast { y, derivative_key }
    }
    /// Return the relay's key material.
    pub fn y(&self) -> &[u8; FAST_HANDSHAKE_LEN] {
        &self.y
    }
    /// Return the relay's claimed key-hash proof.
    pub fn derivative_key(&self) -> &[u8; FAST_HANDSHAKE_LEN] {
        &self.derivative_key
    }
}
impl Body for CreatedFast {
    fn encode_onto<W: Writer + ?Sized>(self, w: &mut W) -> EncodeResult<()> {
        w.write_all(&self.y);
        w.write_all(&self.derivative_key);
        Ok(())
    }
}
impl Readable for CreatedFast {
    fn take_from(r: &mut Reader<'_>) -> Result<Self> {
        Ok(CreatedFast {
            y: r.extract()?,
            derivative_key: r.extract()?,
        })
    }
}

/// An already-encrypted (or still-to-be-encrypted) RELAY cell body: the
/// full fixed-length payload, opaque at this layer. See
/// [`crate::relaycell`] for the fields packed into it and for
/// encryption/decryption.
#[derive(Clone, Debug)]
pub struct Relay {
    /// The raw, fixed-length cell body.
    body: Box<[u8; super::CELL_DATA_LEN]>,
}
impl Relay {
    /// Wrap a raw relay-cell body.
    pub fn new(body: Box<[u8; super::CELL_DATA_LEN]>) -> Self {
        Relay { body }
    }
    /// Return the raw cell body.
    pub fn body(&self) -> &[u8; super::CELL_DATA_LEN] {
        &self.body
    }
    /// Consume this message, returning the raw cell body.
    pub fn into_body(self) -> Box<[u8; super::CELL_DATA_LEN]> {
        self.body
    }
}
impl Body for Relay {
    fn encode_onto<W: Writer + ?Sized>(self, w: &mut W) -> EncodeResult<()> {
        w.write_all(&self.body[..]);
        Ok(())
    }
}
impl Readable for Relay {
    fn take_from(r: &mut Reader<'_>) -> Result<Self> {
        let bytes = r.take(r.remaining())?;
        let mut body = Box::new([0u8; super::CELL_DATA_LEN]);
        let n = bytes.len().min(super::CELL_DATA_LEN);
        body[..n].copy_from_slice(&bytes[..n]);
        Ok(Relay { body })
    }
}

/// A message tearing down a circuit.
#[derive(Clone, Debug)]
pub struct Destroy {
    /// The reason given for tearing down the circuit.
    reason: DestroyReason,
}
impl Destroy {
    /// Construct a new destroy cell.
    pub fn new(reason: DestroyReason) -> Self {
        Destroy { reason }
    }
    /// Return the reason given for destroying the circuit.
    pub fn reason(&self) -> DestroyReason {
        self.reason
    }
}
impl Body for Destroy {
    fn encode_onto<W: Writer + ?Sized>(self, w: &mut W) -> EncodeResult<()> {
        w.write_u8(self.reason.into());
        Ok(())
    }
}
impl Readable for Destroy {
    fn take_from(r: &mut Reader<'_>) -> Result<Self> {
        Ok(Destroy {
            reason: r.take_u8()?.into(),
        })
    }
}

caret_int! {
    /// Declared reason for tearing down a circuit.
    pub struct DestroyReason(u8) {
        /// No reason given; the only reason clients send.
        NONE = 0,
        /// Protocol violation.
        PROTOCOL = 1,
        /// Internal error.
        INTERNAL = 2,
        /// Client sent a TRUNCATE command.
        REQUESTED = 3,
        /// Relay is hibernating and not accepting requests.
        HIBERNATING = 4,
        /// Ran out of memory, sockets, or circuit IDs.
        RESOURCELIMIT = 5,
        /// Couldn't connect to the next relay.
        CONNECTFAILED = 6,
        /// Connected, but the relay's identity didn't match what was requested.
        OR_IDENTITY = 7,
        /// One of the channels carrying this circuit died.
        CHANNEL_CLOSED = 8,
        /// Circuit expired for being too old or too dirty.
        FINISHED = 9,
        /// Circuit construction took too long.
        TIMEOUT = 10,
        /// Circuit was destroyed without a client TRUNCATE.
        DESTROYED = 11,
        /// Request for an unknown onion service.
        NOSUCHSERVICE = 12,
    }
}

/// Ends channel negotiation: tells the peer our view of the current time
/// and of both parties' addresses.
#[derive(Clone, Debug)]
pub struct Netinfo {
    /// Time the cell was sent, or 0 if sent by a client.
    timestamp: u32,
    /// The address we observed for whoever didn't send this cell.
    their_addr: Option<IpAddr>,
    /// Our own canonical addresses.
    my_addr: Vec<IpAddr>,
}
impl Netinfo {
    /// Construct a Netinfo to be sent by a client.
    pub fn from_client(their_addr: Option<IpAddr>) -> Self {
        Netinfo {
            timestamp: 0,
            their_addr,
            my_addr: Vec::new(),
        }
    }
    /// Construct a Netinfo to be sent by a relay.
    pub fn from_relay<V: Into<Vec<IpAddr>>>(
        timestamp: u32,
        their_addr: Option<IpAddr>,
        my_addrs: V,
    ) -> Self {
        Netinfo {
            timestamp,
            their_addr,
            my_addr: my_addrs.into(),
        }
    }
    /// Return the time reported in this cell, if any.
    pub fn timestamp(&self) -> Option<std::time::SystemTime> {
        use std::time::{Duration, SystemTime};
        (self.timestamp != 0)
            .then(|| SystemTime::UNIX_EPOCH + Duration::from_secs(self.timestamp.into()))
    }
    /// Return the address observed for the peer, if any.
    pub fn their_addr(&self) -> Option<IpAddr> {
        self.their_addr
    }
    /// Return the sender's own claimed addresses.
    pub fn my_addr(&self) -> &[IpAddr] {
        &self.my_addr
    }
}
/// Encode a single address as a NETINFO cell expects.
fn enc_one_netinfo_addr<W: Writer + ?Sized>(w: &mut W, addr: &IpAddr) {
    match addr {
        IpAddr::V4(ipv4) => {
            w.write_u8(0x04);
            w.write_u8(4);
            w.write_all(&ipv4.octets());
        }
        IpAddr::V6(ipv6) => {
            w.write_u8(0x06);
            w.write_u8(16);
            w.write_all(&ipv6.octets());
        }
    }
}
/// Decode a single address as encoded in a NETINFO cell.
fn take_one_netinfo_addr(r: &mut Reader<'_>) -> Result<Option<IpAddr>> {
    let atype = r.take_u8()?;
    let alen = r.take_u8()?;
    let abody = r.take(alen as usize)?;
    match (atype, alen) {
        (0x04, 4) => Ok(Some(IpAddr::V4(Ipv4Addr::new(
            abody[0], abody[1], abody[2], abody[3],
        )))),
        (0x06, 16) => {
            let mut bytes = [0u8; 16];
            bytes.copy_from_slice(abody);
            Ok(Some(IpAddr::V6(bytes.into())))
        }
        (_, _) => Ok(None),
    }
}
impl Body for Netinfo {
    fn encode_onto<W: Writer + ?Sized>(self, w: &mut W) -> EncodeResult<()> {
        w.write_u32(self.timestamp);
        let their_addr = self.their_addr.unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        enc_one_netinfo_addr(w, &their_addr);
        let n_addrs: u8 = self
            .my_addr
            .len()
            .try_into()
            .map_err(|_| EncodeError::BadLengthValue)?;
        w.write_u8(n_addrs);
        for addr in &self.my_addr {
            enc_one_netinfo_addr(w, addr);
        }
        Ok(())
    }
}
impl Readable for Netinfo {
    fn take_from(r: &mut Reader<'_>) -> Result<Self> {
        let timestamp = r.take_u32()?;
        let their_addr = take_one_netinfo_addr(r)?.filter(|a| !a.is_unspecified());
        let my_n_addrs = r.take_u8()?;
        let mut my_addr = Vec::with_capacity(my_n_addrs as usize);
        for _ in 0..my_n_addrs {
            if let Some(a) = take_one_netinfo_addr(r)? {
                my_addr.push(a);
            }
        }
        Ok(Netinfo {
            timestamp,
            their_addr,
            my_addr,
        })
    }
}

/// Begins channel negotiation: lists the link protocol versions this
/// implementation supports.
///
/// A VERSIONS cell always uses a 2-byte circuit ID, even once a later
/// version has been negotiated elsewhere on the channel; see
/// [`Versions::encode_for_handshake`].
#[derive(Clone, Debug)]
pub struct Versions {
    /// Supported link protocol versions.
    versions: Vec<u16>,
}
impl Versions {
    /// Construct a new Versions message. Errors if the list is absurdly
    /// long (more than fits a 16-bit cell length).
    pub fn new<B: Into<Vec<u16>>>(vs: B) -> crate::Result<Self> {
        let versions = vs.into();
        if versions.len() < (u16::MAX / 2) as usize {
            Ok(Self { versions })
        } else {
            Err(crate::Error::CantEncode("too many versions"))
        }
    }
    /// Return the advertised versions.
    pub fn versions(&self) -> &[u16] {
        &self.versions
    }
    /// Encode this cell the way it must appear before link protocol
    /// negotiation has completed: a 2-byte (zero) circuit ID, regardless
    /// of what width a later-negotiated protocol would otherwise use.
    pub fn encode_for_handshake(self) -> EncodeResult<Vec<u8>> {
        let mut v = Vec::new();
        v.write_u16(0);
        v.write_u8(ChanCmd::VERSIONS.into());
        v.write_u16((self.versions.len() * 2) as u16);
        self.encode_onto(&mut v)?;
        Ok(v)
    }
    /// Return the highest link protocol version shared between this
    /// message and `my_protos`, if any.
    pub fn best_shared_link_protocol(&self, my_protos: &[u16]) -> Option<u16> {
        let p = my_protos
            .iter()
            .filter(|p| self.versions.contains(p))
            .fold(0_u16, |a, b| u16::max(a, *b));
        (p != 0).then_some(p)
    }
}
impl Body for Versions {
    fn encode_onto<W: Writer + ?Sized>(self, w: &mut W) -> EncodeResult<()> {
        for v in &self.versions {
            w.write_u16(*v);
        }
        Ok(())
    }
}
impl Readable for Versions {
    fn take_from(r: &mut Reader<'_>) -> Result<Self> {
        let mut versions = Vec::new();
        while r.remaining() > 0 {
            versions.push(r.take_u16()?);
        }
        Ok(Versions { versions })
    }
}

caret_int! {
    /// Command carried by a PADDING_NEGOTIATE cell.
    pub struct PaddingNegotiateCmd(u8) {
        /// Stop padding.
        STOP = 1,
        /// Start padding.
        START = 2,
    }
}

/// Negotiates channel padding with a guard node.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PaddingNegotiate {
    /// Whether to start or stop padding.
    command: PaddingNegotiateCmd,
    /// Suggested lower bound for the inter-packet timeout, in ms.
    ito_low_ms: u16,
    /// Suggested upper bound for the inter-packet timeout, in ms.
    ito_high_ms: u16,
}
impl PaddingNegotiate {
    /// Construct a START message with the given timeout bounds.
    pub fn start(ito_low_ms: u16, ito_high_ms: u16) -> Self {
        Self {
            command: PaddingNegotiateCmd::START,
            ito_low_ms,
            ito_high_ms,
        }
    }
    /// Construct a STOP message.
    pub fn stop() -> Self {
        Self {
            command: PaddingNegotiateCmd::STOP,
            ito_low_ms: 0,
            ito_high_ms: 0,
        }
    }
}
impl Body for PaddingNegotiate {
    fn encode_onto<W: Writer + ?Sized>(self, w: &mut W) -> EncodeResult<()> {
        w.write_u8(0); // version
        w.write_u8(self.command.into());
        w.write_u16(self.ito_low_ms);
        w.write_u16(self.ito_high_ms);
        Ok(())
    }
}
impl Readable for PaddingNegotiate {
    fn take_from(r: &mut Reader<'_>) -> Result<Self> {
        let v = r.take_u8()?;
        if v != 0 {
            return Err(Error::MalformedField(
                "unrecognized padding negotiation version".into(),
            ));
        }
        Ok(PaddingNegotiate {
            command: r.take_u8()?.into(),
            ito_low_ms: r.take_u16()?,
            ito_high_ms: r.take_u16()?,
        })
    }
}

/// A single certificate carried in a CERTS cell.
#[derive(Clone, Debug)]
struct TorCert {
    /// The certificate's type code; see `tor_cert::CertType`.
    certtype: u8,
    /// The encoded certificate.
    cert: Vec<u8>,
}
/// Encode a single certificate entry.
fn enc_one_tor_cert<W: Writer + ?Sized>(w: &mut W, c: &TorCert) -> EncodeResult<()> {
    w.write_u8(c.certtype);
    let cert_len: u16 = c
        .cert
        .len()
        .try_into()
        .map_err(|_| EncodeError::BadLengthValue)?;
    w.write_u16(cert_len);
    w.write_all(&c.cert);
    Ok(())
}
/// Decode a single certificate entry.
fn take_one_tor_cert(r: &mut Reader<'_>) -> Result<TorCert> {
    let certtype = r.take_u8()?;
    let certlen = r.take_u16()?;
    let cert = r.take(certlen as usize)?.into();
    Ok(TorCert { certtype, cert })
}

/// Carries additional certificates as part of channel negotiation, since
/// they aren't presented during the TLS handshake itself.
///
/// Relays send this as part of channel negotiation; clients don't.
#[derive(Clone, Debug)]
pub struct Certs {
    /// The certificates in this cell.
    certs: Vec<TorCert>,
}
impl Certs {
    /// Return a new, empty CERTS cell.
    pub fn new_empty() -> Self {
        Certs { certs: Vec::new() }
    }
    /// Add an encoded certificate of the given type. Does not validate it.
    pub fn push_cert_body<B: Into<Vec<u8>>>(&mut self, certtype: tor_cert::CertType, cert: B) {
        self.certs.push(TorCert {
            certtype: certtype.into(),
            cert: cert.into(),
        });
    }
    /// Return the encoded body of the certificate of type `tp`, if any.
    pub fn cert_body(&self, tp: tor_cert::CertType) -> Option<&[u8]> {
        let tp: u8 = tp.into();
        self.certs
            .iter()
            .find(|c| c.certtype == tp)
            .map(|c| &c.cert[..])
    }
    /// Find and decode the Ed25519 certificate of type `tp`, if any.
    pub fn parse_ed_cert(&self, tp: tor_cert::CertType) -> crate::Result<tor_cert::KeyUnknownCert> {
        let body = self
            .cert_body(tp)
            .ok_or_else(|| crate::Error::ChanProto(format!("missing {tp} certificate")))?;
        let cert = tor_cert::Ed25519Cert::decode(body).map_err(|err| crate::Error::BytesErr {
            err,
            parsed: "ed25519 certificate",
        })?;
        if cert.peek_cert_type() != tp {
            return Err(crate::Error::ChanProto(format!(
                "found a {} certificate labeled as {tp}",
                cert.peek_cert_type(),
            )));
        }
        Ok(cert)
    }
}
impl Body for Certs {
    fn encode_onto<W: Writer + ?Sized>(self, w: &mut W) -> EncodeResult<()> {
        let n: u8 = self
            .certs
            .len()
            .try_into()
            .map_err(|_| EncodeError::BadLengthValue)?;
        w.write_u8(n);
        for c in &self.certs {
            enc_one_tor_cert(w, c)?;
        }
        Ok(())
    }
}
impl Readable for Certs {
    fn take_from(r: &mut Reader<'_>) -> Result<Self> {
        let n = r.take_u8()?;
        let mut certs = Vec::with_capacity(n as usize);
        for _ in 0..n {
            certs.push(take_one_tor_cert(r)?);
        }
        Ok(Certs { certs })
    }
}

/// Holds a cell whose command we don't recognize. Well-behaved
/// implementations are required to ignore these.
#[derive(Clone, Debug)]
pub struct Unrecognized {
    /// The channel command actually received.
    cmd: ChanCmd,
    /// The cell's raw contents.
    content: Vec<u8>,
}
impl Unrecognized {
    /// Construct a new cell of arbitrary command and content.
    pub fn new<B: Into<Vec<u8>>>(cmd: ChanCmd, content: B) -> Self {
        Unrecognized {
            cmd,
            content: content.into(),
        }
    }
    /// Return the command that came with this cell.
    pub fn cmd(&self) -> ChanCmd {
        self.cmd
    }
    /// Decode an unrecognized cell's body, tagging it with `cmd`.
    pub fn decode_with_cmd(cmd: ChanCmd, r: &mut Reader<'_>) -> Result<Unrecognized> {
        let mut u = Unrecognized::take_from(r)?;
        u.cmd = cmd;
        Ok(u)
    }
}
impl Body for Unrecognized {
    fn encode_onto<W: Writer + ?Sized>(self, w: &mut W) -> EncodeResult<()> {
        w.write_all(&self.content);
        Ok(())
    }
}
impl Readable for Unrecognized {
    fn take_from(r: &mut Reader<'_>) -> Result<Self> {
        Ok(Unrecognized {
            cmd: 0.into(),
            content: r.take(r.remaining())?.into(),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn destroy_reason_human_names_are_stable() {
        assert_eq!(u8::from(DestroyReason::CONNECTFAILED), 6);
        let unrecognized = DestroyReason::from(200);
        assert!(!unrecognized.is_recognized());
    }

    #[test]
    fn create_fast_roundtrip() {
        let msg = CreateFast::new([9u8; FAST_HANDSHAKE_LEN]);
        let mut buf = Vec::new();
        msg.clone().encode_onto(&mut buf).unwrap();
        assert_eq!(buf.len(), FAST_HANDSHAKE_LEN);
        let mut r = Reader::from_slice(&buf);
        let back = CreateFast::take_from(&mut r).unwrap();
        assert_eq!(back.x(), msg.x());
    }

    #[test]
    fn created_fast_roundtrip() {
        let msg = CreatedFast::new([1u8; FAST_HANDSHAKE_LEN], [2u8; FAST_HANDSHAKE_LEN]);
        let mut buf = Vec::new();
        msg.clone().encode_onto(&mut buf).unwrap();
        let mut r = Reader::from_slice(&buf);
        let back = CreatedFast::take_from(&mut r).unwrap();
        assert_eq!(back.y(), msg.y());
        assert_eq!(back.derivative_key(), msg.derivative_key());
    }

    #[test]
    fn netinfo_roundtrip() {
        let msg = Netinfo::from_relay(
            1_700_000_000,
            Some(IpAddr::V4(Ipv4Addr::new(1, 2, 3, 4))),
            vec![IpAddr::V4(Ipv4Addr::new(5, 6, 7, 8))],
        );
        let mut buf = Vec::new();
        msg.clone().encode_onto(&mut buf).unwrap();
        let mut r = Reader::from_slice(&buf);
        let back = Netinfo::take_from(&mut r).unwrap();
        assert_eq!(back.their_addr(), msg.their_addr());
        assert_eq!(back.my_addr(), msg.my_addr());
    }

    #[test]
    fn versions_best_shared() {
        let v = Versions::new(vec![3, 4, 5]).unwrap();
        assert_eq!(v.best_shared_link_protocol(&[1, 4]), Some(4));
        assert_eq!(v.best_shared_link_protocol(&[99]), None);
    }

    #[test]
    fn certs_lookup_missing() {
        let certs = Certs::new_empty();
        assert!(certs.parse_ed_cert(tor_cert::CertType::IDENTITY_V_SIGNING).is_err());
    }
}
