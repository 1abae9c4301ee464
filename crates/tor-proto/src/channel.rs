//! The ORPort channel: a TLS connection to a single relay, over which zero
//! or more circuits are multiplexed.
//!
//! Establishing a channel means opening a TCP connection, wrapping it in
//! TLS (without verifying the peer's certificate; see [`crate::tls`]), and
//! running the VERSIONS/NETINFO handshake that negotiates a link protocol
//! version. Once open, the channel is read and written through a single
//! lock: cells for different circuits share one byte stream, so sending or
//! receiving a whole cell has to happen without another thread's partial
//! cell interleaving with it.

use std::collections::HashSet;
use std::io::{Read, Write};
use std::net::{IpAddr, SocketAddr, TcpStream};
use std::sync::{Arc, Mutex};

use rustls::{ClientConnection, StreamOwned};

use tor_bytes::Reader;
use tor_cell::chancell::msg::{self, AnyChanMsg};
use tor_cell::chancell::{codec::ChannelCodec, AnyChanCell, ChanCell, ChanCmd, CircId};

use crate::circuit::Circuit;
use crate::err::{Error, Result};
use crate::tls;

/// Link protocol versions this implementation is willing to speak.
///
/// We don't negotiate version 1 or 2: those predate NETINFO and variable
/// length cells, and no relay still speaks them.
pub const SUPPORTED_LINK_PROTOCOLS: &[u16] = &[3, 4, 5];

/// Size, in bytes, of a read from the underlying socket.
const READ_CHUNK: usize = 4096;

/// The length of the raw 5-byte header (2-byte circid, 1-byte command) that
/// precedes every cell sent before link protocol negotiation completes.
const HANDSHAKE_HEADER_LEN: usize = 3;

/// A negotiated link protocol version, with the cell-framing parameters it
/// implies.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LinkProtocol(u16);

impl LinkProtocol {
    /// Return the raw version number.
    pub fn version(self) -> u16 {
        self.0
    }

    /// Width, in bytes, of a circuit ID under this protocol version.
    pub fn circ_id_len(self) -> usize {
        if self.0 <= 3 {
            2
        } else {
            4
        }
    }

    /// Length, in bytes, of a fixed-length cell under this protocol
    /// version: circuit ID, command byte, and a 509-byte body.
    pub fn fixed_cell_length(self) -> usize {
        self.circ_id_len() + 1 + tor_cell::chancell::CELL_DATA_LEN
    }

    /// The first circuit ID a client should use on a channel using this
    /// protocol version.
    ///
    /// Versions above 3 reserve the high bit of the (now 4-byte) circuit ID
    /// for whichever side initiated the connection; as the connecting
    /// party, we set it.
    pub fn first_circ_id(self) -> u32 {
        if self.0 > 3 {
            0x8000_0000
        } else {
            1
        }
    }
}

/// The transport underlying a channel: a TCP stream wrapped in TLS.
type Transport = StreamOwned<ClientConnection, TcpStream>;

/// Mutable, lock-guarded channel state.
struct ChannelState {
    /// The underlying TLS-wrapped socket.
    transport: Transport,
    /// Codec for framing cells at the negotiated link protocol version.
    codec: ChannelCodec,
    /// Bytes read from the socket but not yet assembled into a complete
    /// cell.
    read_buf: Vec<u8>,
    /// Circuit IDs currently in use on this channel.
    open_circ_ids: HashSet<u32>,
}

/// An open connection to a single relay's ORPort.
///
/// A `Relay` owns the TLS connection and the set of circuits built over it.
/// All reads and writes go through an internal lock, so that cells bound
/// for different circuits can't interleave on the wire.
pub struct Relay {
    /// The lock-guarded transport and read buffer.
    state: Mutex<ChannelState>,
    /// The link protocol version negotiated with the peer.
    link_protocol: LinkProtocol,
    /// The address we connected to.
    peer: SocketAddr,
}

impl Relay {
    /// Connect to a relay's ORPort at `address:port`, and negotiate a link
    /// protocol from `acceptable_link_protocols`.
    ///
    /// This opens the TCP and TLS connection, exchanges VERSIONS cells,
    /// and sends a NETINFO cell. It returns once the channel is ready to
    /// carry circuits; it does not itself open any.
    pub fn connect(
        address: IpAddr,
        port: u16,
        acceptable_link_protocols: &[u16],
    ) -> Result<Self> {
        let peer = SocketAddr::new(address, port);
        tracing::debug!(%peer, "connecting to relay");

        let tcp = TcpStream::connect(peer).map_err(Error::unreachable)?;
        let _ = tcp.set_nodelay(true);

        let config = tls::client_config();
        let server_name = tls::server_name_for(address);
        let conn = ClientConnection::new(config, server_name)
            .map_err(|e| Error::NotAnOrPort(e.to_string()))?;
        let mut transport = StreamOwned::new(conn, tcp);

        let my_versions = msg::Versions::new(acceptable_link_protocols.to_vec())?;
        let encoded = my_versions
            .encode_for_handshake()
            .map_err(tor_cell::Error::from)?;
        transport
            .write_all(&encoded)
            .and_then(|()| transport.flush())
            .map_err(|e| Error::NotAnOrPort(e.to_string()))?;

        // The peer's VERSIONS cell is always framed with a 2-byte circuit
        // ID, no matter what protocol we end up negotiating.
        let mut hdr = [0u8; HANDSHAKE_HEADER_LEN + 2];
        transport
            .read_exact(&mut hdr)
            .map_err(|e| Error::NotAnOrPort(e.to_string()))?;
        let versions_cmd: u8 = ChanCmd::VERSIONS.into();
        if hdr[0] != 0 || hdr[1] != 0 || hdr[2] != versions_cmd {
            return Err(Error::HandshakeProto(
                "peer didn't reply with a VERSIONS cell".into(),
            ));
        }
        let body_len = u16::from_be_bytes([hdr[3], hdr[4]]) as usize;
        let mut body = vec![0u8; body_len];
        transport.read_exact(&mut body).map_err(Error::io)?;
        let their_versions: msg::Versions = Reader::from_slice(&body)
            .extract()
            .map_err(|err| tor_cell::Error::BytesErr {
                err,
                parsed: "versions cell",
            })?;

        let negotiated = their_versions
            .best_shared_link_protocol(acceptable_link_protocols)
            .ok_or(Error::NoCommonLinkProtocol)?;
        let link_protocol = LinkProtocol(negotiated);
        tracing::debug!(version = negotiated, "negotiated link protocol");

        let relay = Relay {
            state: Mutex::new(ChannelState {
                transport,
                codec: ChannelCodec::new(negotiated),
                read_buf: Vec::new(),
                open_circ_ids: HashSet::new(),
            }),
            link_protocol,
            peer,
        };

        relay.send_chan_msg(None, AnyChanMsg::Netinfo(msg::Netinfo::from_client(Some(address))))?;

        Ok(relay)
    }

    /// The link protocol version negotiated with this relay.
    pub fn link_protocol(&self) -> LinkProtocol {
        self.link_protocol
    }

    /// The address this channel is connected to.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Receive the next complete cell from this channel, blocking until
    /// one arrives.
    ///
    /// Reads accumulate in an internal buffer, so a short read from the
    /// socket doesn't lose partial data: this only returns once a whole
    /// cell (header, and for variable-length cells its length-prefixed
    /// body) has arrived.
    pub fn recv_cell(&self) -> Result<AnyChanCell> {
        let mut state = self.state.lock().expect("channel state poisoned");
        loop {
            if let Some(cell) = state.codec.decode_cell::<AnyChanMsg>(&mut state.read_buf)? {
                return Ok(cell);
            }
            let mut buf = [0u8; READ_CHUNK];
            let n = state.transport.read(&mut buf).map_err(Error::io)?;
            if n == 0 {
                return Err(Error::io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "relay closed the connection",
                )));
            }
            state.read_buf.extend_from_slice(&buf[..n]);
        }
    }

    /// Send a single channel cell.
    pub(crate) fn send_chan_msg(&self, circid: Option<CircId>, msg: AnyChanMsg) -> Result<()> {
        let mut state = self.state.lock().expect("channel state poisoned");
        let mut buf = Vec::new();
        state.codec.write_cell(ChanCell::new(circid, msg), &mut buf)?;
        state
            .transport
            .write_all(&buf)
            .and_then(|()| state.transport.flush())
            .map_err(Error::io)
    }

    /// Reserve a fresh circuit ID: one higher than the highest one
    /// currently open, or [`LinkProtocol::first_circ_id`] if none are.
    pub(crate) fn reserve_circ_id(&self) -> CircId {
        let mut state = self.state.lock().expect("channel state poisoned");
        let next = state
            .open_circ_ids
            .iter()
            .copied()
            .max()
            .map(|id| id + 1)
            .unwrap_or_else(|| self.link_protocol.first_circ_id());
        state.open_circ_ids.insert(next);
        CircId::new(next).expect("a freshly reserved circuit ID is never zero")
    }

    /// Release a circuit ID back to the pool once its circuit is closed.
    pub(crate) fn release_circ_id(&self, id: CircId) {
        let mut state = self.state.lock().expect("channel state poisoned");
        state.open_circ_ids.remove(&u32::from(id));
    }

    /// Open a new circuit on this channel via a CREATE_FAST handshake.
    ///
    /// CREATE_FAST is safe only because the channel itself is secured by
    /// TLS; it gives a circuit to the first hop with no further
    /// public-key crypto, which is all this implementation needs for
    /// single-hop directory fetches.
    pub fn create_circuit(self: &Arc<Self>) -> Result<Circuit> {
        Circuit::create(Arc::clone(self))
    }

    /// Tear down this channel's transport.
    ///
    /// Does not send DESTROY cells for any circuits still open on it:
    /// callers should close circuits individually first if they want the
    /// peer to hear why.
    pub fn close(&self) -> Result<()> {
        let state = self.state.lock().expect("channel state poisoned");
        match state.transport.sock.shutdown(std::net::Shutdown::Both) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(Error::io(e)),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn v3_uses_2_byte_circ_ids() {
        let p = LinkProtocol(3);
        assert_eq!(p.circ_id_len(), 2);
        assert_eq!(p.fixed_cell_length(), 2 + 1 + 509);
        assert_eq!(p.first_circ_id(), 1);
    }

    #[test]
    fn v4_and_above_use_4_byte_circ_ids() {
        let p = LinkProtocol(4);
        assert_eq!(p.circ_id_len(), 4);
        assert_eq!(p.fixed_cell_length(), 4 + 1 + 509);
        assert_eq!(p.first_circ_id(), 0x8000_0000);

        let p5 = LinkProtocol(5);
        assert_eq!(p5.circ_id_len(), 4);
        assert_eq!(p5.first_circ_id(), 0x8000_0000);
    }
}
