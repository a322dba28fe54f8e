//! Deterministic keystream shared by the encryptor and decryptor.
//!
//! The stream is AES in counter mode: the per-image salt is the initial
//! 16-byte counter block, incremented by one per block (big-endian across
//! the whole block). Both the pixel mask and the permutation draws come out
//! of this single stream, so the byte positions consumed on the encryption
//! side and the decryption side must line up exactly.

use aes::{Aes128, Aes192, Aes256};
use ctr::cipher::{KeyIvInit, StreamCipher};
use ctr::Ctr128BE;
use rand::RngCore;

use crate::{GrayCryptError, Result};

/// Per-image salt; doubles as the initial CTR counter block.
pub type Salt = [u8; 16];

type Aes128Ctr = Ctr128BE<Aes128>;
type Aes192Ctr = Ctr128BE<Aes192>;
type Aes256Ctr = Ctr128BE<Aes256>;

enum Cipher {
    Aes128(Aes128Ctr),
    Aes192(Aes192Ctr),
    Aes256(Aes256Ctr),
}

/// Keystream over `(key, salt)`. The key length selects AES-128, AES-192,
/// or AES-256; passkeys are used as raw bytes without derivation.
pub struct KeyStream {
    cipher: Cipher,
}

impl KeyStream {
    pub fn new(key: &[u8], salt: &Salt) -> Result<Self> {
        let bad_key = || GrayCryptError::BadKeySize(key.len());
        let cipher = match key.len() {
            16 => Cipher::Aes128(Aes128Ctr::new_from_slices(key, salt).map_err(|_| bad_key())?),
            24 => Cipher::Aes192(Aes192Ctr::new_from_slices(key, salt).map_err(|_| bad_key())?),
            32 => Cipher::Aes256(Aes256Ctr::new_from_slices(key, salt).map_err(|_| bad_key())?),
            n => return Err(GrayCryptError::BadKeySize(n)),
        };
        Ok(Self { cipher })
    }

    /// Fill `buf` with the next keystream bytes.
    pub fn fill(&mut self, buf: &mut [u8]) {
        buf.fill(0);
        match &mut self.cipher {
            Cipher::Aes128(c) => c.apply_keystream(buf),
            Cipher::Aes192(c) => c.apply_keystream(buf),
            Cipher::Aes256(c) => c.apply_keystream(buf),
        }
    }

    /// Draw an integer in `[0, n)`.
    ///
    /// Consumes exactly eight keystream bytes: assembled big-endian, top bit
    /// masked to a 63-bit value, reduced modulo `n`. The permutation on both
    /// ends observes this construction, so it cannot change.
    pub fn bounded(&mut self, n: usize) -> usize {
        debug_assert!(n >= 1);
        let mut buf = [0u8; 8];
        self.fill(&mut buf);
        let v = u64::from_be_bytes(buf) & 0x7fff_ffff_ffff_ffff;
        (v % n as u64) as usize
    }
}

/// Default salt source: 16 bytes from the OS cryptographic RNG.
pub fn random_salt() -> Salt {
    let mut salt = Salt::default();
    rand::rngs::OsRng.fill_bytes(&mut salt);
    salt
}
