//! Parsing, encoding, and per-hop encryption of RELAY cell payloads.
//!
//! A RELAY (or RELAY_EARLY) channel cell carries an inner, circuit-level
//! message: a command, an optional stream ID, and a data payload, wrapped
//! in a fixed 509-byte body and encrypted hop-by-hop with AES-128-CTR. A
//! running SHA-1 digest over each direction's cells lets the last hop
//! recognize which cells are addressed to it.

use std::num::NonZeroU16;

use caret::caret_int;
use cipher::{KeyIvInit, StreamCipher};
use sha1::{Digest, Sha1};
use tor_bytes::{EncodeResult, Reader, Writer};
use tor_llcrypto::cipher::aes::Aes128Ctr;

use crate::chancell::CELL_DATA_LEN;

caret_int! {
    /// The command carried by a RELAY cell's inner message.
    pub struct RelayCmd(u8) {
        /// Start a new stream.
        BEGIN = 1,
        /// Data on a stream.
        DATA = 2,
        /// Close a stream.
        END = 3,
        /// Acknowledge a BEGIN: the stream is open.
        CONNECTED = 4,
        /// Flow control.
        SENDME = 5,
        /// Extend a circuit to a new hop (deprecated TAP format).
        EXTEND = 6,
        /// Reply to an EXTEND handshake (deprecated TAP format).
        EXTENDED = 7,
        /// Partially close a circuit.
        TRUNCATE = 8,
        /// A circuit has been partially closed.
        TRUNCATED = 9,
        /// Padding cell.
        DROP = 10,
        /// Start a DNS lookup.
        RESOLVE = 11,
        /// Reply to a DNS lookup.
        RESOLVED = 12,
        /// Start a directory stream.
        BEGIN_DIR = 13,
        /// Extend a circuit to a new hop.
        EXTEND2 = 14,
        /// Reply to an EXTEND2 cell.
        EXTENDED2 = 15,
    }
}

/// A stream identifier, local to one circuit. Zero means "this message
/// isn't about any particular stream".
pub type StreamId = NonZeroU16;

/// Offset of the 2-byte `recognized` field: command(1) precedes it.
const RECOGNIZED_OFFSET: usize = 1;
/// Offset of the 4-byte running-digest field: command(1), recognized(2),
/// stream_id(2) precede it.
const DIGEST_OFFSET: usize = 5;

/// A decoded RELAY cell inner message: a command, optional stream ID, and
/// payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayCell {
    /// The inner relay command.
    command: RelayCmd,
    /// The stream this message concerns, if any.
    stream_id: Option<StreamId>,
    /// The message's payload.
    data: Vec<u8>,
}

impl RelayCell {
    /// Construct a new relay message.
    pub fn new(command: RelayCmd, stream_id: Option<StreamId>, data: Vec<u8>) -> Self {
        RelayCell {
            command,
            stream_id,
            data,
        }
    }
    /// Return this message's command.
    pub fn command(&self) -> RelayCmd {
        self.command
    }
    /// Return this message's stream ID, if any.
    pub fn stream_id(&self) -> Option<StreamId> {
        self.stream_id
    }
    /// Return this message's payload.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Encode this message as a plaintext relay-cell body: `recognized`
    /// and the digest slot are left zeroed, to be filled in by
    /// [`RelayCellCrypto::encrypt`].
    fn encode_plaintext(&self) -> crate::Result<Box<[u8; CELL_DATA_LEN]>> {
        let mut w = Vec::with_capacity(CELL_DATA_LEN);
        w.write_u8(self.command.into());
        w.write_u16(0); // recognized
        w.write_u16(self.stream_id.map_or(0, NonZeroU16::get));
        w.write_u32(0); // digest placeholder
        let len: u16 = self
            .data
            .len()
            .try_into()
            .map_err(|_| crate::Error::CantEncode("relay payload too long for one cell"))?;
        w.write_u16(len);
        w.write_all(&self.data);
        if w.len() > CELL_DATA_LEN {
            return Err(crate::Error::CantEncode(
                "relay payload too long for one cell",
            ));
        }
        w.write_zeros(CELL_DATA_LEN - w.len());
        let mut body = Box::new([0u8; CELL_DATA_LEN]);
        body.copy_from_slice(&w);
        Ok(body)
    }

    /// Parse a relay message out of an already-decrypted, digest-verified
    /// cell body.
    fn decode_plaintext(body: &[u8; CELL_DATA_LEN]) -> crate::Result<Self> {
        fn wrap_err(err: tor_bytes::Error) -> crate::Error {
            crate::Error::BytesErr {
                err,
                parsed: "relay cell",
            }
        }
        let mut r = Reader::from_slice(&body[..]);
        let command: RelayCmd = r.take_u8().map_err(wrap_err)?.into();
        r.advance(2).map_err(wrap_err)?; // recognized, already checked
        let stream_id = StreamId::new(r.take_u16().map_err(wrap_err)?);
        r.advance(4).map_err(wrap_err)?; // digest, already checked
        let len = r.take_u16().map_err(wrap_err)? as usize;
        let data = r.take(len).map_err(wrap_err)?.to_vec();
        Ok(RelayCell {
            command,
            stream_id,
            data,
        })
    }
}

/// Per-direction encryption and digesting state for one hop of a circuit.
///
/// Wraps an AES-128-CTR keystream (continued across cells, per Tor's use
/// of a single counter for the circuit's lifetime) and a running SHA-1
/// digest seeded from the handshake's digest seed.
pub struct RelayCellCrypto {
    /// The stream cipher applied to each cell's full 509-byte body.
    cipher: Aes128Ctr,
    /// The running digest over every plaintext cell sent or received so
    /// far in this direction.
    digest: Sha1,
}

impl RelayCellCrypto {
    /// Construct a new crypto state from a 16-byte AES key and a 20-byte
    /// digest seed (the `forward_digest`/`backward_digest` output of
    /// [`tor_bytes::kdf::kdf_tor`]).
    pub fn new(key: [u8; 16], digest_seed: &[u8; 20]) -> Self {
        let cipher = Aes128Ctr::new(&key.into(), &[0u8; 16].into());
        let mut digest = Sha1::new();
        digest.update(digest_seed);
        RelayCellCrypto { cipher, digest }
    }

    /// Encrypt `cell` for this hop, updating the running digest and
    /// advancing the keystream.
    pub fn encrypt(&mut self, cell: &RelayCell) -> EncodeResult<Box<[u8; CELL_DATA_LEN]>> {
        let mut body = cell
            .encode_plaintext()
            .map_err(|_| tor_bytes::EncodeError::BadLengthValue)?;
        self.digest.update(&body[..]);
        let running = self.digest.clone().finalize();
        body[DIGEST_OFFSET..DIGEST_OFFSET + 4].copy_from_slice(&running[..4]);
        self.cipher.apply_keystream(&mut body[..]);
        Ok(body)
    }

    /// Decrypt a received cell body for this hop, verifying its
    /// `recognized` and digest fields.
    ///
    /// A failing check is fatal to the circuit: this crate only supports
    /// single-hop (directory) circuits, so there is no further hop to
    /// forward an unrecognized cell to.
    pub fn decrypt(&mut self, mut body: Box<[u8; CELL_DATA_LEN]>) -> crate::Result<RelayCell> {
        self.cipher.apply_keystream(&mut body[..]);

        let recognized_ok = body[RECOGNIZED_OFFSET] == 0 && body[RECOGNIZED_OFFSET + 1] == 0;
        let given_digest: [u8; 4] = body[DIGEST_OFFSET..DIGEST_OFFSET + 4]
            .try_into()
            .expect("slice has 4 bytes");

        let mut zeroed = body.clone();
        zeroed[RECOGNIZED_OFFSET..RECOGNIZED_OFFSET + 2].fill(0);
        zeroed[DIGEST_OFFSET..DIGEST_OFFSET + 4].fill(0);

        let mut trial = self.digest.clone();
        trial.update(&zeroed[..]);
        let expected = trial.clone().finalize();

        if !recognized_ok || expected[..4] != given_digest[..] {
            return Err(crate::Error::BadRelayDigest);
        }
        self.digest = trial;

        RelayCell::decode_plaintext(&zeroed)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn crypto_pair() -> (RelayCellCrypto, RelayCellCrypto) {
        let key = [0x42u8; 16];
        let seed = [0x11u8; 20];
        (
            RelayCellCrypto::new(key, &seed),
            RelayCellCrypto::new(key, &seed),
        )
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let (mut sender, mut receiver) = crypto_pair();
        let msg = RelayCell::new(RelayCmd::DATA, StreamId::new(7), b"hello relay".to_vec());

        let encrypted = sender.encrypt(&msg).unwrap();
        let decoded = receiver.decrypt(encrypted).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn sequential_cells_use_advancing_digest() {
        let (mut sender, mut receiver) = crypto_pair();
        let first = RelayCell::new(RelayCmd::DATA, StreamId::new(1), b"one".to_vec());
        let second = RelayCell::new(RelayCmd::DATA, StreamId::new(1), b"two".to_vec());

        let e1 = sender.encrypt(&first).unwrap();
        let e2 = sender.encrypt(&second).unwrap();
        assert_eq!(receiver.decrypt(e1).unwrap(), first);
        assert_eq!(receiver.decrypt(e2).unwrap(), second);
    }

    #[test]
    fn tampered_cell_is_rejected() {
        let (mut sender, mut receiver) = crypto_pair();
        let msg = RelayCell::new(RelayCmd::DATA, None, b"x".to_vec());
        let mut encrypted = sender.encrypt(&msg).unwrap();
        encrypted[50] ^= 0xff;
        assert!(receiver.decrypt(encrypted).is_err());
    }

    #[test]
    fn begin_dir_has_no_stream_id_round_trips() {
        let (mut sender, mut receiver) = crypto_pair();
        let msg = RelayCell::new(RelayCmd::BEGIN_DIR, None, Vec::new());
        let encrypted = sender.encrypt(&msg).unwrap();
        let decoded = receiver.decrypt(encrypted).unwrap();
        assert_eq!(decoded.stream_id(), None);
        assert_eq!(decoded.command(), RelayCmd::BEGIN_DIR);
    }
}
