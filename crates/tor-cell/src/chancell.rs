//! Messages sent over Tor channels.
//!
//! A "channel" is the direct, TLS-protected connection between a client and
//! a relay, or between two relays. This module defines [`ChanCell`], the
//! framing used for data sent over a channel, and [`ChanCmd`], the tag that
//! says what a cell means.

pub mod codec;
pub mod msg;

use std::num::NonZeroU32;

use caret::caret_int;

/// The amount of data carried in a fixed-length cell's body.
///
/// Historically 509 bytes, chosen so that cells would be 512 bytes long
/// once command and a 2-byte circuit ID were added. Since link protocol
/// version 4, circuit IDs are 4 bytes, so fixed-length cells are 514 bytes
/// on the wire; the body length itself hasn't changed.
pub const CELL_DATA_LEN: usize = 509;

/// A cell body considered as a raw array of bytes.
pub type RawCellBody = [u8; CELL_DATA_LEN];

/// A [`RawCellBody`] stored on the heap, to avoid copying cell bodies
/// around.
pub type BoxedCellBody = Box<RawCellBody>;

/// Channel-local identifier for a circuit.
///
/// A circuit ID is 2 bytes wide if the negotiated link protocol version is
/// 3 or below, and 4 bytes wide otherwise; see [`codec::ChannelCodec`].
/// Cannot be zero: a zero circuit ID addresses the channel itself, and is
/// represented here as `None`.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct CircId(NonZeroU32);

impl From<NonZeroU32> for CircId {
    fn from(item: NonZeroU32) -> Self {
        Self(item)
    }
}
impl From<CircId> for u32 {
    fn from(id: CircId) -> u32 {
        id.0.get()
    }
}
impl std::fmt::Display for CircId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
impl CircId {
    /// Construct a `CircId` from a nonzero `val`; returns `None` if `val`
    /// is zero.
    pub fn new(val: u32) -> Option<Self> {
        NonZeroU32::new(val).map(Self)
    }

    /// Convert to a `u32`, mapping `None` to 0.
    pub fn get_or_zero(circ_id: Option<Self>) -> u32 {
        match circ_id {
            Some(circ_id) => circ_id.0.get(),
            None => 0,
        }
    }
}

caret_int! {
    /// The command carried by a channel cell: says what kind of cell this
    /// is, and (together with its length) how to parse the body.
    pub struct ChanCmd(u8) {
        /// A fixed-length cell to be dropped.
        PADDING = 0,
        /// Create a new circuit (obsolete TAP handshake).
        CREATE = 1,
        /// Finish a circuit-creation handshake (obsolete TAP handshake).
        CREATED = 2,
        /// Relay cell, sent along a circuit.
        RELAY = 3,
        /// Tear down a circuit.
        DESTROY = 4,
        /// Create a new circuit with no public-key crypto.
        CREATE_FAST = 5,
        /// Finish a circuit-creation handshake with no public-key crypto.
        CREATED_FAST = 6,
        /// Part of channel negotiation: describes our view of the network.
        NETINFO = 8,
        /// Relay cell, sent along a circuit (limited supply, for circuit
        /// construction only).
        RELAY_EARLY = 9,
        /// Create a new circuit (current format).
        CREATE2 = 10,
        /// Finish a circuit-creation handshake (current format).
        CREATED2 = 11,
        /// Adjust channel-padding settings.
        PADDING_NEGOTIATE = 12,

        /// Variable-length cell (despite the low numeric value): negotiate
        /// link protocol versions.
        VERSIONS = 7,
        /// Variable-length channel-padding cell.
        VPADDING = 128,
        /// Additional certificates not presented during the TLS handshake.
        CERTS = 129,
        /// Challenge material used in the relay-to-relay handshake.
        AUTH_CHALLENGE = 130,
        /// Response material used in the relay-to-relay handshake.
        AUTHENTICATE = 131,
        /// Reserved; not currently used.
        AUTHORIZE = 132,
    }
}

/// What kind of circuit ID a given command expects.
enum CircIdReq {
    /// Only a zero-valued (`None`) circuit ID is valid.
    WantNone,
    /// Only a nonzero circuit ID is valid.
    WantSome,
    /// Any circuit ID is acceptable.
    Any,
}

impl ChanCmd {
    /// Return true if this command uses the variable-length cell format.
    pub fn is_var_cell(self) -> bool {
        self == ChanCmd::VERSIONS || self.0 >= 128_u8
    }

    /// Return what kind of circuit ID this command expects.
    fn allows_circid(self) -> CircIdReq {
        match self {
            ChanCmd::PADDING
            | ChanCmd::NETINFO
            | ChanCmd::PADDING_NEGOTIATE
            | ChanCmd::VERSIONS
            | ChanCmd::VPADDING
            | ChanCmd::CERTS
            | ChanCmd::AUTH_CHALLENGE
            | ChanCmd::AUTHENTICATE => CircIdReq::WantNone,
            ChanCmd::CREATE
            | ChanCmd::CREATED
            | ChanCmd::RELAY
            | ChanCmd::DESTROY
            | ChanCmd::CREATE_FAST
            | ChanCmd::CREATED_FAST
            | ChanCmd::RELAY_EARLY
            | ChanCmd::CREATE2
            | ChanCmd::CREATED2 => CircIdReq::WantSome,
            _ => CircIdReq::Any,
        }
    }

    /// Return true if this command accepts the circuit ID `id`.
    pub fn accepts_circid_val(self, id: Option<CircId>) -> bool {
        match self.allows_circid() {
            CircIdReq::WantNone => id.is_none(),
            CircIdReq::WantSome => id.is_some(),
            CircIdReq::Any => true,
        }
    }
}

/// A decoded channel cell carrying any recognized message type.
pub type AnyChanCell = ChanCell<msg::AnyChanMsg>;

/// Trait implemented by anything that can serve as the body of a channel
/// cell.
pub trait ChanMsg {
    /// Return the command for this message.
    fn cmd(&self) -> ChanCmd;
    /// Encode the body of this message (not including circuit ID, command,
    /// or length) onto `w`.
    fn encode_onto<W: tor_bytes::Writer + ?Sized>(self, w: &mut W) -> tor_bytes::EncodeResult<()>;
    /// Decode a message body of the given command from `r`. `r` must be
    /// truncated to the exact length of the body.
    fn decode_from_reader(cmd: ChanCmd, r: &mut tor_bytes::Reader<'_>) -> tor_bytes::Result<Self>
    where
        Self: Sized;
}

/// A decoded channel cell: a circuit ID (or none, for cells addressed to
/// the channel itself) plus a message.
#[derive(Clone, Debug)]
pub struct ChanCell<M> {
    /// Circuit ID for this cell, if any.
    circid: Option<CircId>,
    /// The message carried by this cell.
    msg: M,
}

impl<M: ChanMsg> ChanCell<M> {
    /// Construct a new channel cell.
    pub fn new(circid: Option<CircId>, msg: M) -> Self {
        ChanCell { circid, msg }
    }
    /// Return this cell's circuit ID.
    pub fn circid(&self) -> Option<CircId> {
        self.circid
    }
    /// Return a reference to this cell's message.
    pub fn msg(&self) -> &M {
        &self.msg
    }
    /// Consume this cell, returning its circuit ID and message.
    pub fn into_circid_and_msg(self) -> (Option<CircId>, M) {
        (self.circid, self.msg)
    }
}
