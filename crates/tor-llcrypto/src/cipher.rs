//! Ciphers used to implement the Tor protocols.
//!
//! Tor has managed not to proliferate ciphers: it only uses AES, and only in
//! counter mode.

/// Re-exports of counter-mode AES, as used by the relay cell and hidden
/// service descriptor layers.
///
/// These types implement `cipher::StreamCipher`; use the
/// [`cipher`](https://docs.rs/cipher) crate to drive them.
pub mod aes {
    /// AES-128 in counter mode, as used for RELAY cell and CREATE_FAST
    /// circuit encryption.
    pub type Aes128Ctr = ctr::Ctr128BE<aes::Aes128>;

    /// AES-256 in counter mode, as used for hidden-service descriptor
    /// encryption.
    pub type Aes256Ctr = ctr::Ctr128BE<aes::Aes256>;
}

#[cfg(test)]
mod test {
    #![allow(clippy::unwrap_used)]
    use super::aes::Aes128Ctr;
    use cipher::{KeyIvInit, StreamCipher};

    #[test]
    fn aes128ctr_roundtrip() {
        let key = [7u8; 16];
        let iv = [0u8; 16];
        let mut enc = Aes128Ctr::new(&key.into(), &iv.into());
        let mut data = b"hello relay cell payload".to_vec();
        enc.apply_keystream(&mut data);
        assert_ne!(&data[..], &b"hello relay cell payload"[..]);

        let mut dec = Aes128Ctr::new(&key.into(), &iv.into());
        dec.apply_keystream(&mut data);
        assert_eq!(&data[..], &b"hello relay cell payload"[..]);
    }
}
