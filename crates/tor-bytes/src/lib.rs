//! Helpers for encoding and decoding the byte-oriented wire formats used by
//! Tor's link, cell, and descriptor layers.
//!
//! This crate provides [`Reader`]/[`Readable`] for parsing and
//! [`Writer`]/[`Writeable`] for encoding, plus fixed-width integer codecs
//! ([`size`]) and the KDF-TOR key derivation function ([`kdf`]) that the
//! cell and handshake layers build on.

#![warn(missing_docs)]

mod err;
mod impls;
mod reader;
mod writer;

pub mod kdf;
pub mod size;

pub use err::{EncodeError, Error};
pub use reader::{Cursor, Reader};
pub use writer::Writer;

/// Result type returned by this crate for [`Reader`]-related methods.
pub type Result<T> = std::result::Result<T, Error>;
/// Result type returned by this crate for [`Writer`]-related methods.
pub type EncodeResult<T> = std::result::Result<T, EncodeError>;

/// Trait for an object that can be encoded onto a [`Writer`] by reference.
///
/// Most code won't call this directly, and will instead use it implicitly
/// via [`Writer::write`].
///
/// # Example
/// ```
/// use tor_bytes::{Writeable, Writer, EncodeResult};
/// #[derive(Debug, Eq, PartialEq)]
/// struct Message {
///   flags: u32,
///   cmd: u8,
/// }
///
/// impl Writeable for Message {
///     fn write_onto<B: Writer + ?Sized>(&self, b: &mut B) -> EncodeResult<()> {
///         b.write_u32(self.flags);
///         b.write_u8(self.cmd);
///         Ok(())
///     }
/// }
///
/// let msg = Message { flags: 0x43, cmd: 0x07 };
/// let mut writer: Vec<u8> = Vec::new();
/// writer.write(&msg)?;
/// assert_eq!(writer, &[0x00, 0x00, 0x00, 0x43, 0x07]);
/// # tor_bytes::EncodeResult::Ok(())
/// ```
pub trait Writeable {
    /// Encode this object into the writer `b`.
    fn write_onto<B: Writer + ?Sized>(&self, b: &mut B) -> EncodeResult<()>;
}

/// Trait for an object that can be encoded and consumed by a [`Writer`].
///
/// Most code won't call this directly, and will instead use it implicitly
/// via [`Writer::write_and_consume`].
pub trait WriteableOnce: Sized {
    /// Encode this object into the writer `b`, and consume it.
    fn write_into<B: Writer + ?Sized>(self, b: &mut B) -> EncodeResult<()>;
}

impl<W: Writeable + Sized> WriteableOnce for W {
    fn write_into<B: Writer + ?Sized>(self, b: &mut B) -> EncodeResult<()> {
        self.write_onto(b)
    }
}

impl<W: Writeable + ?Sized> Writeable for &W {
    fn write_onto<B: Writer + ?Sized>(&self, b: &mut B) -> EncodeResult<()> {
        (*self).write_onto(b)
    }
}

/// Trait for an object that can be extracted from a [`Reader`].
///
/// Most code won't call this directly, and will instead use it implicitly
/// via [`Reader::extract`].
///
/// # Example
/// ```
/// use tor_bytes::{Readable, Reader, Result};
/// #[derive(Debug, Eq, PartialEq)]
/// struct Message {
///   flags: u32,
///   cmd: u8,
/// }
///
/// impl Readable for Message {
///     fn take_from(r: &mut Reader<'_>) -> Result<Self> {
///         let flags = r.take_u32()?;
///         let cmd = r.take_u8()?;
///         Ok(Message { flags, cmd })
///     }
/// }
///
/// let encoded = [0x00, 0x00, 0x00, 0x43, 0x07];
/// let mut reader = Reader::from_slice(&encoded);
/// let m: Message = reader.extract()?;
/// assert_eq!(m, Message { flags: 0x43, cmd: 0x07 });
/// reader.should_be_exhausted()?;
/// # Result::Ok(())
/// ```
pub trait Readable: Sized {
    /// Try to extract an object of this type from a [`Reader`].
    ///
    /// Implementations should be efficient: this is not the place to check
    /// signatures or perform expensive validation. If an object must not be
    /// used before it's checked, return a wrapped type that can be
    /// unwrapped later (see `tor_checkable`).
    fn take_from(b: &mut Reader<'_>) -> Result<Self>;
}

#[cfg(test)]
mod test {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn writer() {
        let mut v: Vec<u8> = Vec::new();
        v.write_u8(0x57);
        v.write_u16(0x6520);
        v.write_u32(0x68617665);
        v.write_all(b"a machine");
        assert_eq!(&v[..], &b"We have a machine"[..]);
    }
}
