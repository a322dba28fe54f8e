//! Decryption: undo compression, the permutation, and the mask, then fill
//! in the pixels that were never transmitted with context adaptive
//! interpolation.

use crate::cai::cai;
use crate::compress::CompressedImage;
use crate::entropy_coder;
use crate::image::Image;
use crate::keystream::KeyStream;
use crate::{GrayCryptError, Result};

/// Gradient detection threshold for the interpolator.
const CAI_THRESHOLD: i32 = 20;

/// Decrypts and reconstructs `img` under `key`.
///
/// There is no integrity check: a wrong key produces garbage output, not an
/// error. The keystream is consumed in the same order as encryption (mask
/// bytes first, then permutation draws); any reordering would desynchronize
/// the two ends.
pub fn decrypt(img: &CompressedImage, key: &[u8]) -> Result<Image> {
    let n_blocks = img.width * img.height / 4;
    if img.width % 2 != 0 || img.height % 2 != 0 || img.quarter.len() != n_blocks {
        return Err(GrayCryptError::InvalidImageData {
            len: img.quarter.len(),
            width: img.width,
            height: img.height,
        });
    }
    let qlen = img.qtable.len();
    if !(qlen.is_power_of_two() && (2..=256).contains(&qlen)) {
        return Err(GrayCryptError::InvalidQuantization(
            256usize.checked_div(qlen).unwrap_or(0) as u8,
        ));
    }

    let mut qdiffs = vec![0u8; n_blocks];
    let decoded = entropy_coder::decode(&img.encoded_qdiffs, &mut qdiffs)?;
    if decoded != n_blocks {
        return Err(GrayCryptError::EntropyCodec(
            "decoded difference count does not match the image size",
        ));
    }

    // One 4-tuple per block, still in permuted order: [tl, tr, bl, br] with
    // tr and bl interpolated later. The qtable length is a power of two, so
    // masking keeps hostile qdiff values in range without an integrity check.
    let tmask = (qlen - 1) as u8;
    let blocks: Vec<[u8; 4]> = img
        .quarter
        .iter()
        .zip(&qdiffs)
        .map(|(&tl, &d)| {
            let br = tl.wrapping_add(img.qtable[(d & tmask) as usize]);
            [tl, 0, 0, br]
        })
        .collect();

    let mut rng = KeyStream::new(key, &img.salt)?;
    let mut mask = vec![0u8; n_blocks];
    rng.fill(&mut mask);

    let mut blocks = unpermute_blocks(&blocks, &mut rng);

    for (block, &m) in blocks.iter_mut().zip(&mask) {
        block[0] = block[0].wrapping_sub(m);
        block[3] = block[3].wrapping_sub(m);
    }

    let bw = img.width / 2;
    let bh = img.height / 2;
    interpolate_blocks(&mut blocks, bw, bh, CAI_THRESHOLD);

    let mut pixels = vec![0u8; n_blocks * 4];
    for by in 0..bh {
        for bx in 0..bw {
            let b = blocks[by * bw + bx];
            pixels[2 * by * img.width + 2 * bx] = b[0];
            pixels[2 * by * img.width + 2 * bx + 1] = b[1];
            pixels[(2 * by + 1) * img.width + 2 * bx] = b[2];
            pixels[(2 * by + 1) * img.width + 2 * bx + 1] = b[3];
        }
    }

    Ok(Image {
        pixels,
        width: img.width,
        height: img.height,
        pad_width: img.pad_width,
        pad_height: img.pad_height,
    })
}

/// Inverse of `encrypt::permute_half`, built by replaying the same draw
/// sequence against an identity index array.
///
/// The encryptor swaps byte pairs; here each draw swaps a single index of
/// the identity walk, and `indices[i]` ends up naming where the tuple at
/// position `i` belongs. Both sides call `bounded` with the identical
/// argument sequence (the remaining block count), so the streams stay in
/// lockstep.
fn unpermute_blocks(blocks: &[[u8; 4]], rng: &mut KeyStream) -> Vec<[u8; 4]> {
    let mut indices: Vec<usize> = (0..blocks.len()).collect();
    for i in 0..indices.len() {
        let n = rng.bounded(indices.len() - i);
        indices.swap(i, i + n);
    }

    let mut ret = vec![[0u8; 4]; blocks.len()];
    for (block, &v) in blocks.iter().zip(&indices) {
        ret[v] = *block;
    }
    ret
}

/// Fill the top-right and bottom-left pixel of every block from its
/// neighbors. Blocks on the image border substitute the current block's own
/// pixels for missing neighbors; leaving them zero would smear artifacts
/// along the edges.
fn interpolate_blocks(blocks: &mut [[u8; 4]], bw: usize, bh: usize, threshold: i32) {
    for y in 0..bh {
        for x in 0..bw {
            let i = y * bw + x;

            let n = if y > 0 { blocks[(y - 1) * bw + x][3] } else { blocks[i][3] };
            let e = if x < bw - 1 { blocks[y * bw + x + 1][0] } else { blocks[i][0] };
            blocks[i][1] = cai([n, e, blocks[i][3], blocks[i][0]], threshold);

            let s = if y < bh - 1 { blocks[(y + 1) * bw + x][0] } else { blocks[i][0] };
            let w = if x > 0 { blocks[y * bw + x - 1][3] } else { blocks[i][3] };
            blocks[i][2] = cai([blocks[i][0], blocks[i][3], s, w], threshold);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compress::compress;
    use crate::encrypt::{encrypt_with_salt_source, permute_half};
    use crate::image::Image;
    use crate::keystream::Salt;

    const KEY: &[u8] = b"I am probably a secretive secret";
    const ZERO_SALT: Salt = [0u8; 16];

    #[test]
    fn permute_then_unpermute_recovers_payload() {
        let payload = b"Do I look like half an image to you?";
        let mut half = payload.to_vec();
        let mut rng = KeyStream::new(KEY, &ZERO_SALT).unwrap();
        permute_half(&mut half, &mut rng);
        assert_ne!(half, payload);

        let blocks: Vec<[u8; 4]> = half
            .chunks_exact(2)
            .map(|pair| [pair[0], pair[1], 0, 0])
            .collect();
        let mut rng = KeyStream::new(KEY, &ZERO_SALT).unwrap();
        let blocks = unpermute_blocks(&blocks, &mut rng);

        let got: Vec<u8> = blocks.iter().flat_map(|b| [b[0], b[1]]).collect();
        assert_eq!(got, payload);
    }

    #[test]
    fn decrypt_6x6_at_q1() {
        let img = Image::from_gray(b"Do I look like a real image to you??".to_vec(), 6, 6).unwrap();
        let enc = encrypt_with_salt_source(&img, KEY, || ZERO_SALT).unwrap();
        let comp = compress(&enc, 1).unwrap();
        let dec = decrypt(&comp, KEY).unwrap();

        // The kept pixels of every block reconstruct exactly at q=1; the
        // interpolated ones land where CAI puts them.
        assert_eq!(
            dec.pixels,
            [
                68, 111, 32, 32, 32, 105, 111, 111, 32, 32, 32, 105, 107, 104, 32, 32, 32, 105,
                100, 97, 32, 32, 109, 109, 97, 101, 101, 109, 116, 116, 121, 121, 110, 117, 116, 63
            ]
        );
        for by in 0..3 {
            for bx in 0..3 {
                assert_eq!(dec.at(2 * bx, 2 * by), img.at(2 * bx, 2 * by));
                assert_eq!(dec.at(2 * bx + 1, 2 * by + 1), img.at(2 * bx + 1, 2 * by + 1));
            }
        }
    }

    #[test]
    fn wrong_key_yields_garbage_without_error() {
        let img = Image::from_gray(vec![77; 64], 8, 8).unwrap();
        let enc = encrypt_with_salt_source(&img, KEY, || ZERO_SALT).unwrap();
        let comp = compress(&enc, 1).unwrap();
        let dec = decrypt(&comp, b"wrong key wrong key wrong key 32").unwrap();
        assert_eq!(dec.pixels.len(), 64);
        assert_ne!(dec.pixels, img.pixels);
    }

    #[test]
    fn rejects_mismatched_quarter_length() {
        let img = Image::from_gray(vec![0; 16], 4, 4).unwrap();
        let enc = encrypt_with_salt_source(&img, KEY, || ZERO_SALT).unwrap();
        let mut comp = compress(&enc, 1).unwrap();
        comp.quarter.pop();
        assert!(matches!(
            decrypt(&comp, KEY),
            Err(GrayCryptError::InvalidImageData { .. })
        ));
    }

    #[test]
    fn rejects_corrupt_qtable_length() {
        let img = Image::from_gray(vec![0; 16], 4, 4).unwrap();
        let enc = encrypt_with_salt_source(&img, KEY, || ZERO_SALT).unwrap();
        let mut comp = compress(&enc, 1).unwrap();
        comp.qtable.truncate(100);
        assert!(matches!(
            decrypt(&comp, KEY),
            Err(GrayCryptError::InvalidQuantization(_))
        ));
    }

    #[test]
    fn rejects_truncated_qdiff_stream() {
        let img = Image::from_gray(vec![0; 16], 4, 4).unwrap();
        let enc = encrypt_with_salt_source(&img, KEY, || ZERO_SALT).unwrap();
        let mut comp = compress(&enc, 1).unwrap();
        comp.encoded_qdiffs.clear();
        assert!(matches!(
            decrypt(&comp, KEY),
            Err(GrayCryptError::EntropyCodec(_))
        ));
    }
}
