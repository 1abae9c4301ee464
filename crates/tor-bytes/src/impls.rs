//! Implementations of [`Writeable`] and [`Readable`] for primitive types and
//! the key/identity types used throughout this workspace.

use crate::{EncodeResult, Error, Readable, Reader, Result, Writeable, Writer};

impl Writeable for [u8] {
    fn write_onto<B: Writer + ?Sized>(&self, b: &mut B) -> EncodeResult<()> {
        b.write_all(self);
        Ok(())
    }
}

impl Writeable for Vec<u8> {
    fn write_onto<B: Writer + ?Sized>(&self, b: &mut B) -> EncodeResult<()> {
        b.write_all(&self[..]);
        Ok(())
    }
}

/// Make `Writeable`/`Readable` for a provided unsigned type, delegating to
/// the `write_uNN`/`take_uNN` methods.
macro_rules! impl_u {
    ( $t:ty, $wrfn:ident, $rdfn:ident ) => {
        impl Writeable for $t {
            fn write_onto<B: Writer + ?Sized>(&self, b: &mut B) -> EncodeResult<()> {
                b.$wrfn(*self);
                Ok(())
            }
        }
        impl Readable for $t {
            fn take_from(b: &mut Reader<'_>) -> Result<Self> {
                b.$rdfn()
            }
        }
    };
}

impl_u!(u8, write_u8, take_u8);
impl_u!(u16, write_u16, take_u16);
impl_u!(u32, write_u32, take_u32);
impl_u!(u64, write_u64, take_u64);

mod net_impls {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    impl Writeable for Ipv4Addr {
        fn write_onto<B: Writer + ?Sized>(&self, b: &mut B) -> EncodeResult<()> {
            b.write_all(&self.octets()[..]);
            Ok(())
        }
    }
    impl Readable for Ipv4Addr {
        fn take_from(b: &mut Reader<'_>) -> Result<Self> {
            Ok(b.take_u32()?.into())
        }
    }

    impl Writeable for Ipv6Addr {
        fn write_onto<B: Writer + ?Sized>(&self, b: &mut B) -> EncodeResult<()> {
            b.write_all(&self.octets()[..]);
            Ok(())
        }
    }
    impl Readable for Ipv6Addr {
        fn take_from(b: &mut Reader<'_>) -> Result<Self> {
            let bits: u128 = {
                let mut acc = 0u128;
                for _ in 0..16 {
                    acc = (acc << 8) | u128::from(b.take_u8()?);
                }
                acc
            };
            Ok(bits.into())
        }
    }
}

mod ed25519_impls {
    use super::*;
    use tor_llcrypto::pk::ed25519;

    impl Writeable for ed25519::Ed25519Identity {
        fn write_onto<B: Writer + ?Sized>(&self, b: &mut B) -> EncodeResult<()> {
            b.write_all(self.as_bytes());
            Ok(())
        }
    }
    impl Readable for ed25519::Ed25519Identity {
        fn take_from(b: &mut Reader<'_>) -> Result<Self> {
            let bytes: [u8; 32] = b.extract()?;
            Ok(Self::new(bytes))
        }
    }

    impl Writeable for ed25519::PublicKey {
        fn write_onto<B: Writer + ?Sized>(&self, b: &mut B) -> EncodeResult<()> {
            b.write_all(self.as_bytes());
            Ok(())
        }
    }
    impl Readable for ed25519::PublicKey {
        fn take_from(b: &mut Reader<'_>) -> Result<Self> {
            let bytes: [u8; 32] = b.extract()?;
            Self::from_bytes(&bytes)
                .map_err(|_| Error::MalformedField("ed25519 public key".into()))
        }
    }

    impl Writeable for ed25519::Signature {
        fn write_onto<B: Writer + ?Sized>(&self, b: &mut B) -> EncodeResult<()> {
            b.write_all(&self.to_bytes()[..]);
            Ok(())
        }
    }
    impl Readable for ed25519::Signature {
        fn take_from(b: &mut Reader<'_>) -> Result<Self> {
            let bytes: [u8; 64] = b.extract()?;
            Ok(Self::from_bytes(&bytes))
        }
    }
}

mod rsa_impls {
    use super::*;
    use tor_llcrypto::pk::rsa::{RsaIdentity, RSA_ID_LEN};

    impl Writeable for RsaIdentity {
        fn write_onto<B: Writer + ?Sized>(&self, b: &mut B) -> EncodeResult<()> {
            b.write_all(self.as_bytes());
            Ok(())
        }
    }
    impl Readable for RsaIdentity {
        fn take_from(b: &mut Reader<'_>) -> Result<Self> {
            let m = b.take(RSA_ID_LEN)?;
            RsaIdentity::from_bytes(m)
                .ok_or_else(|| tor_error::internal!("wrong number of bytes from take").into())
        }
    }
}

mod u8_array_impls {
    use super::*;
    impl<const N: usize> Writeable for [u8; N] {
        fn write_onto<B: Writer + ?Sized>(&self, b: &mut B) -> EncodeResult<()> {
            b.write_all(&self[..]);
            Ok(())
        }
    }

    impl<const N: usize> Readable for [u8; N] {
        fn take_from(b: &mut Reader<'_>) -> Result<Self> {
            let mut array = [0_u8; N];
            b.take_into(&mut array[..])?;
            Ok(array)
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use crate::{Reader, Writer};
    use hex_literal::hex;

    #[test]
    fn encode_u32_array() {
        let mut w = Vec::new();
        w.write(&0x01020304_u32).unwrap();
        assert_eq!(&w[..], &hex!("01020304"));
    }

    #[test]
    fn decode_fixed_array() {
        let mut b = Reader::from_slice(&hex!("0102030405"));
        let arr: [u8; 5] = b.extract().unwrap();
        assert_eq!(arr, [1, 2, 3, 4, 5]);
        b.should_be_exhausted().unwrap();
    }

    #[test]
    fn decode_ipv4() {
        use std::net::Ipv4Addr;
        let mut b = Reader::from_slice(&hex!("7f000001"));
        let ip: Ipv4Addr = b.extract().unwrap();
        assert_eq!(ip, Ipv4Addr::LOCALHOST);
    }
}
