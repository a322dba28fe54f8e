//! Encryption: mask two diagonal pixels per 2x2 block with a shared
//! keystream byte, then permute the blocks under the same keystream.

use serde::{Deserialize, Serialize};

use crate::image::Image;
use crate::keystream::{random_salt, KeyStream, Salt};
use crate::Result;

/// Half-image: the top-left and bottom-right pixel of every 2x2 block,
/// masked and permuted.
///
/// Layout is block order: for the block at block coordinates `(bx, by)` the
/// top-left pixel sits at `half[by * width + 2 * bx]` and the bottom-right
/// right next to it, so a block moves through the permutation as a single
/// two-byte unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedImage {
    pub half: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub pad_width: bool,
    pub pad_height: bool,
    pub salt: Salt,
}

impl EncryptedImage {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Encrypts `img` under `key` with a fresh salt from the OS random source.
///
/// The key must be 16, 24, or 32 bytes (AES-128/192/256).
pub fn encrypt(img: &Image, key: &[u8]) -> Result<EncryptedImage> {
    encrypt_with_salt_source(img, key, random_salt)
}

/// Same as [`encrypt`], but the salt comes from the given source.
/// Tests inject a constant to make the keystream reproducible.
pub fn encrypt_with_salt_source(
    img: &Image,
    key: &[u8],
    salt_source: impl FnOnce() -> Salt,
) -> Result<EncryptedImage> {
    let salt = salt_source();
    let mut rng = KeyStream::new(key, &salt)?;

    // One mask byte per 2x2 block. Both kept pixels of a block get the same
    // byte: their wrapped difference is then mask independent, which is what
    // the compressor exploits without the key.
    let mut mask = vec![0u8; img.pixels.len() / 4];
    rng.fill(&mut mask);

    let w = img.width;
    let bw = w / 2;
    let mut half = vec![0u8; img.pixels.len() / 2];
    for by in 0..img.height / 2 {
        for bx in 0..bw {
            let m = mask[by * bw + bx];
            half[by * w + 2 * bx] = img.at(2 * bx, 2 * by).wrapping_add(m);
            half[by * w + 2 * bx + 1] = img.at(2 * bx + 1, 2 * by + 1).wrapping_add(m);
        }
    }

    permute_half(&mut half, &mut rng);

    Ok(EncryptedImage {
        half,
        width: img.width,
        height: img.height,
        pad_width: img.pad_width,
        pad_height: img.pad_height,
        salt,
    })
}

/// Keyed front-to-back walk swapping whole byte pairs.
///
/// Each step draws `bounded(remaining_pairs)` and fixes the front pair. The
/// decryptor replays the identical draw sequence against single indices to
/// build the inverse (see `decrypt::unpermute_blocks`).
pub(crate) fn permute_half(half: &mut [u8], rng: &mut KeyStream) {
    let mut p = 0;
    while p < half.len() {
        let n = rng.bounded((half.len() - p) / 2) * 2;
        half.swap(p, p + n);
        half.swap(p + 1, p + n + 1);
        p += 2;
    }
}
