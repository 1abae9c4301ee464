//! Encoding and decoding of [`ChanCell`]s onto a byte stream.

use super::{ChanCell, CELL_DATA_LEN};
use crate::chancell::{ChanCmd, ChanMsg, CircId};
use crate::Error;
use tor_bytes::{Reader, Writer};
use tor_error::internal;

/// Encodes and decodes channel cells for one channel.
///
/// The circuit ID width depends on the link protocol version negotiated for
/// the channel: versions 1 through 3 use a 2-byte circuit ID (kept for
/// compatibility with the VERSIONS cell, which always uses a 2-byte
/// circuit ID); version 4 and above use 4 bytes.
///
/// The cell formats are:
///
/// Variable-length cells:
/// ```text
///     u16 or u32 circid;
///     u8  command;
///     u16 len;
///     u8  body[len];
/// ```
///
/// Fixed-length cells:
/// ```text
///     u16 or u32 circid;
///     u8  command;
///     u8  body[509];
/// ```
pub struct ChannelCodec {
    /// Width, in bytes, of the circuit ID field: 2 or 4.
    circid_len: usize,
}

impl ChannelCodec {
    /// Create a new codec for the given negotiated link protocol version.
    pub fn new(link_version: u16) -> Self {
        let circid_len = if link_version <= 3 { 2 } else { 4 };
        ChannelCodec { circid_len }
    }

    /// Write `circid` onto `dst`, using this codec's circuit ID width.
    fn write_circid(&self, dst: &mut Vec<u8>, circid: Option<CircId>) {
        let val = CircId::get_or_zero(circid);
        if self.circid_len == 2 {
            dst.write_u16(val as u16);
        } else {
            dst.write_u32(val);
        }
    }

    /// Encode `item` onto `dst`.
    pub fn write_cell<M: ChanMsg>(&mut self, item: ChanCell<M>, dst: &mut Vec<u8>) -> crate::Result<()> {
        let (circid, msg) = item.into_circid_and_msg();
        let cmd = msg.cmd();
        self.write_circid(dst, circid);
        dst.write_u8(cmd.into());

        let pos = dst.len();
        if cmd.is_var_cell() {
            dst.write_u16(0);
            msg.encode_onto(dst)?;
            let len = dst.len() - pos - 2;
            if len > u16::MAX as usize {
                return Err(Error::Internal(internal!("ran out of space for varcell")));
            }
            dst[pos..pos + 2].copy_from_slice(&(len as u16).to_be_bytes());
        } else {
            msg.encode_onto(dst)?;
            let len = dst.len() - pos;
            if len > CELL_DATA_LEN {
                return Err(Error::Internal(internal!("ran out of space for cell")));
            }
            dst.write_zeros(CELL_DATA_LEN - len);
        }
        Ok(())
    }

    /// Try to decode a cell from the front of `src`.
    ///
    /// On a definite parse error, returns `Err(_)`. If `src` doesn't yet
    /// hold a complete cell, returns `Ok(None)` and leaves `src` untouched.
    /// On success, the consumed bytes are removed from the front of `src`.
    pub fn decode_cell<M: ChanMsg>(&mut self, src: &mut Vec<u8>) -> crate::Result<Option<ChanCell<M>>> {
        fn wrap_err(err: tor_bytes::Error) -> Error {
            Error::BytesErr {
                err,
                parsed: "channel cell",
            }
        }

        let header_len = self.circid_len + 1;
        if src.len() < header_len + 2 {
            return Ok(None);
        }
        let cmd: ChanCmd = src[self.circid_len].into();
        let varcell = cmd.is_var_cell();
        let cell_len: usize = if varcell {
            let len_off = header_len;
            let msg_len = u16::from_be_bytes([src[len_off], src[len_off + 1]]);
            msg_len as usize + header_len + 2
        } else {
            header_len + CELL_DATA_LEN
        };
        if src.len() < cell_len {
            return Ok(None);
        }

        let cell: Vec<u8> = src.drain(..cell_len).collect();
        let mut r = Reader::from_slice(&cell);
        let circid_val = if self.circid_len == 2 {
            r.take_u16().map_err(wrap_err)? as u32
        } else {
            r.take_u32().map_err(wrap_err)?
        };
        let circid = CircId::new(circid_val);
        r.advance(if varcell { 3 } else { 1 }).map_err(wrap_err)?;
        let msg = M::decode_from_reader(cmd, &mut r).map_err(wrap_err)?;

        if !cmd.accepts_circid_val(circid) {
            return Err(Error::ChanProto(format!(
                "invalid circuit ID {} for cell command {}",
                CircId::get_or_zero(circid),
                cmd
            )));
        }
        Ok(Some(ChanCell::new(circid, msg)))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::chancell::msg::AnyChanMsg;

    #[test]
    fn fixed_cell_roundtrip_v4() {
        let mut codec = ChannelCodec::new(4);
        let cell = ChanCell::new(
            CircId::new(7),
            AnyChanMsg::Destroy(crate::chancell::msg::Destroy::new(
                crate::chancell::msg::DestroyReason::NONE,
            )),
        );
        let mut buf = Vec::new();
        codec.write_cell(cell, &mut buf).unwrap();
        assert_eq!(buf.len(), 4 + 1 + CELL_DATA_LEN);

        let decoded = codec.decode_cell::<AnyChanMsg>(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.circid(), CircId::new(7));
        assert!(buf.is_empty());
    }

    #[test]
    fn fixed_cell_roundtrip_v3_uses_2byte_circid() {
        let mut codec = ChannelCodec::new(3);
        let cell = ChanCell::new(
            CircId::new(3),
            AnyChanMsg::Destroy(crate::chancell::msg::Destroy::new(
                crate::chancell::msg::DestroyReason::NONE,
            )),
        );
        let mut buf = Vec::new();
        codec.write_cell(cell, &mut buf).unwrap();
        assert_eq!(buf.len(), 2 + 1 + CELL_DATA_LEN);
    }

    #[test]
    fn incomplete_cell_returns_none() {
        let mut codec = ChannelCodec::new(4);
        let mut buf = vec![0u8; 3];
        assert!(codec.decode_cell::<AnyChanMsg>(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn varcell_roundtrip() {
        let mut codec = ChannelCodec::new(4);
        let versions = crate::chancell::msg::Versions::new(vec![3, 4]).unwrap();
        let cell = ChanCell::new(None, AnyChanMsg::Versions(versions));
        let mut buf = Vec::new();
        codec.write_cell(cell, &mut buf).unwrap();
        // circid(4) + cmd(1) + len(2) + 2*u16 body
        assert_eq!(buf.len(), 4 + 1 + 2 + 4);

        let decoded = codec.decode_cell::<AnyChanMsg>(&mut buf).unwrap().unwrap();
        match decoded.msg() {
            AnyChanMsg::Versions(v) => assert_eq!(v.versions(), &[3, 4]),
            other => panic!("wrong variant: {other:?}"),
        }
    }
}
