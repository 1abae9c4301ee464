//! Circuits: single-hop paths built over a [`Relay`] channel with a
//! CREATE_FAST/CREATED_FAST handshake.
//!
//! This crate only ever builds one-hop circuits: it has no use for
//! multi-hop onion routing, only for talking directly to a relay's
//! directory port over its ORPort. A `Circuit` is therefore just a circuit
//! ID plus the per-direction encryption state for that one hop.

use std::sync::{Arc, Mutex};

use rand::RngCore;

use tor_bytes::kdf::kdf_tor;
use tor_cell::chancell::msg::{self, AnyChanMsg};
use tor_cell::chancell::CircId;
use tor_cell::relaycell::{RelayCell, RelayCellCrypto, RelayCmd, StreamId};

use crate::channel::Relay;
use crate::err::{Error, Result};

/// Length in bytes of the key material exchanged by CREATE_FAST/CREATED_FAST.
const FAST_HANDSHAKE_LEN: usize = 20;

/// An open, single-hop circuit to a relay's directory port.
pub struct Circuit {
    /// The channel this circuit runs over.
    relay: Arc<Relay>,
    /// This circuit's ID on that channel.
    id: CircId,
    /// Per-direction encryption and digest state for the one hop.
    crypto: Mutex<HopCrypto>,
}

/// The pair of per-direction crypto states for a circuit's single hop.
struct HopCrypto {
    /// State for cells sent towards the relay.
    forward: RelayCellCrypto,
    /// State for cells received from the relay.
    backward: RelayCellCrypto,
}

impl Circuit {
    /// Build a new circuit over `relay` via a CREATE_FAST handshake.
    pub(crate) fn create(relay: Arc<Relay>) -> Result<Self> {
        let id = relay.reserve_circ_id();

        let mut x = [0u8; FAST_HANDSHAKE_LEN];
        rand::thread_rng().fill_bytes(&mut x);
        relay.send_chan_msg(Some(id), AnyChanMsg::CreateFast(msg::CreateFast::new(x)))?;

        let created = match Self::await_reply(&relay, id)? {
            AnyChanMsg::CreatedFast(c) => c,
            other => {
                relay.release_circ_id(id);
                return Err(Error::HandshakeProto(format!(
                    "expected CREATED_FAST on circuit {id}, got a {other:?} cell"
                )));
            }
        };

        let mut material = Vec::with_capacity(FAST_HANDSHAKE_LEN * 2);
        material.extend_from_slice(&x);
        material.extend_from_slice(created.y());
        let kdf = kdf_tor(&material);

        if kdf.key_hash != *created.derivative_key() {
            relay.release_circ_id(id);
            return Err(Error::HandshakeRejected);
        }

        let crypto = HopCrypto {
            forward: RelayCellCrypto::new(kdf.forward_key, &kdf.forward_digest),
            backward: RelayCellCrypto::new(kdf.backward_key, &kdf.backward_digest),
        };

        tracing::debug!(%id, "circuit open");
        Ok(Circuit {
            relay,
            id,
            crypto: Mutex::new(crypto),
        })
    }

    /// Wait for the next cell addressed to `id` on `relay`, failing if a
    /// cell for a different circuit arrives first.
    ///
    /// Used only during the CREATE_FAST handshake, before this circuit
    /// exists to own the relationship with `relay`.
    fn await_reply(relay: &Arc<Relay>, id: CircId) -> Result<AnyChanMsg> {
        let cell = relay.recv_cell()?;
        let (circid, msg) = cell.into_circid_and_msg();
        if circid != Some(id) {
            relay.release_circ_id(id);
            return Err(Error::HandshakeProto(format!(
                "expected a reply on circuit {id}, got a cell for {circid:?}"
            )));
        }
        Ok(msg)
    }

    /// This circuit's channel-local ID.
    pub fn id(&self) -> CircId {
        self.id
    }

    /// Fetch a directory document over this circuit.
    ///
    /// Opens a directory stream (`RELAY_BEGIN_DIR`), sends `request` as a
    /// single `RELAY_DATA` cell, and accumulates `RELAY_DATA` cells until
    /// the peer sends `RELAY_END`, returning the concatenated payload.
    pub fn directory(&self, request: &[u8], stream_id: StreamId) -> Result<Vec<u8>> {
        self.send_relay_cell(RelayCmd::BEGIN_DIR, Some(stream_id), Vec::new())?;
        self.send_relay_cell(RelayCmd::DATA, Some(stream_id), request.to_vec())?;

        let mut response = Vec::new();
        loop {
            let cell = self.recv_relay_cell()?;
            match cell.command() {
                RelayCmd::DATA => response.extend_from_slice(cell.data()),
                RelayCmd::END => break,
                other => {
                    return Err(Error::CircProto(format!(
                        "unexpected relay command {other} during a directory fetch"
                    )));
                }
            }
        }
        Ok(response)
    }

    /// Encrypt and send one RELAY cell on this circuit.
    fn send_relay_cell(
        &self,
        command: RelayCmd,
        stream_id: Option<StreamId>,
        data: Vec<u8>,
    ) -> Result<()> {
        let cell = RelayCell::new(command, stream_id, data);
        let body = {
            let mut crypto = self.crypto.lock().expect("circuit crypto poisoned");
            crypto
                .forward
                .encrypt(&cell)
                .map_err(tor_cell::Error::from)?
        };
        self.relay
            .send_chan_msg(Some(self.id), AnyChanMsg::Relay(msg::Relay::new(body)))
    }

    /// Receive and decrypt the next RELAY cell addressed to this circuit,
    /// discarding any cell that turns up for a different one.
    fn recv_relay_cell(&self) -> Result<RelayCell> {
        loop {
            let cell = self.relay.recv_cell()?;
            let (circid, msg) = cell.into_circid_and_msg();
            if circid != Some(self.id) {
                tracing::debug!(?circid, mine = %self.id, "dropping cell for another circuit");
                continue;
            }
            return match msg {
                AnyChanMsg::Relay(relay_msg) | AnyChanMsg::RelayEarly(relay_msg) => {
                    let mut crypto = self.crypto.lock().expect("circuit crypto poisoned");
                    crypto
                        .backward
                        .decrypt(relay_msg.into_body())
                        .map_err(Error::from)
                }
                AnyChanMsg::Destroy(d) => Err(Error::CircProto(format!(
                    "circuit destroyed by peer: {}",
                    d.reason()
                ))),
                other => Err(Error::CircProto(format!(
                    "unexpected cell on circuit: {other:?}"
                ))),
            };
        }
    }

    /// Tear down this circuit: send a DESTROY cell and release its ID.
    pub fn close(&self) -> Result<()> {
        let result = self.relay.send_chan_msg(
            Some(self.id),
            AnyChanMsg::Destroy(msg::Destroy::new(msg::DestroyReason::NONE)),
        );
        self.relay.release_circ_id(self.id);
        result
    }
}
