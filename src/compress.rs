//! Compression of an encrypted half-image, without the key.
//!
//! Both kept pixels of a block carry the same mask byte, so their wrapped
//! difference equals the plaintext difference. The compressor quantizes
//! those differences against a per-image table and entropy-codes the bucket
//! indices; the quarter-image (the first pixel of each pair) passes through
//! untouched.

use serde::{Deserialize, Serialize};

use crate::encrypt::EncryptedImage;
use crate::entropy_coder;
use crate::keystream::Salt;
use crate::{GrayCryptError, Result};

/// Quarter-image plus quantized, entropy-coded pair differences.
///
/// `qtable` maps a bucket index to the representative difference value;
/// its length is `256 / quantization`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressedImage {
    pub quarter: Vec<u8>,
    pub qtable: Vec<u8>,
    pub encoded_qdiffs: Vec<u8>,
    pub salt: Salt,
    pub width: usize,
    pub height: usize,
    pub pad_width: bool,
    pub pad_height: bool,
}

impl CompressedImage {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Compresses `img` at the given quantization, a power of two in [1, 128].
/// Quantization 1 is lossless for this stage.
pub fn compress(img: &EncryptedImage, quantization: u8) -> Result<CompressedImage> {
    let q = quantize(img, quantization)?;
    let encoded_qdiffs = entropy_coder::encode(&q.qdiffs);
    Ok(CompressedImage {
        quarter: q.quarter,
        qtable: q.qtable,
        encoded_qdiffs,
        salt: img.salt,
        width: img.width,
        height: img.height,
        pad_width: img.pad_width,
        pad_height: img.pad_height,
    })
}

/// Compression output before entropy coding.
struct Quantized {
    quarter: Vec<u8>,
    qtable: Vec<u8>,
    qdiffs: Vec<u8>,
}

fn quantize(img: &EncryptedImage, quantization: u8) -> Result<Quantized> {
    if quantization == 0 || !quantization.is_power_of_two() {
        return Err(GrayCryptError::InvalidQuantization(quantization));
    }
    if img.half.len() != img.width * img.height / 2 {
        return Err(GrayCryptError::InvalidImageData {
            len: img.half.len(),
            width: img.width,
            height: img.height,
        });
    }

    // Quantization can land a difference on the wrong side of an eight-bit
    // wrap once the mask comes off. That cannot be avoided here: the
    // compressor never sees the unmasked values.
    let diffs: Vec<u8> = img
        .half
        .chunks_exact(2)
        .map(|pair| pair[1].wrapping_sub(pair[0]))
        .collect();

    let logq = quantization.trailing_zeros();
    let maskq = quantization.wrapping_sub(1);
    let mut distortions = [0u64; 256];
    for &v in &diffs {
        let base = ((v >> logq) << logq) as usize;
        for j in 0..quantization {
            let r = v.wrapping_sub(j) & maskq;
            distortions[base + j as usize] += u64::from(r) * u64::from(r);
        }
    }

    let qdiffs: Vec<u8> = diffs.iter().map(|&v| v >> logq).collect();
    let quarter: Vec<u8> = img.half.iter().copied().step_by(2).collect();

    Ok(Quantized {
        quarter,
        qtable: build_qtable(&distortions, quantization),
        qdiffs,
    })
}

/// For each bucket, the representative minimizing the summed squared wrapped
/// residual over this image. Ties keep the earliest candidate.
fn build_qtable(distortions: &[u64; 256], quantization: u8) -> Vec<u8> {
    let logq = quantization.trailing_zeros();
    let mut qtable = vec![0u8; 256 >> logq];
    for (k, entry) in qtable.iter_mut().enumerate() {
        let base = (k as u8) << logq;
        let mut best = base;
        for j in 1..quantization {
            if distortions[(base + j) as usize] < distortions[best as usize] {
                best = base + j;
            }
        }
        *entry = best;
    }
    qtable
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encrypt::encrypt_with_salt_source;
    use crate::image::Image;

    const KEY: &[u8] = b"I am probably a secretive secret";

    fn encrypted_6x6() -> EncryptedImage {
        let img = Image::from_gray(b"Do I look like a real image to you??".to_vec(), 6, 6).unwrap();
        encrypt_with_salt_source(&img, KEY, || [0u8; 16]).unwrap()
    }

    #[test]
    fn rejects_invalid_quantization() {
        let enc = encrypted_6x6();
        for q in [0u8, 3, 5, 6, 7, 100, 255] {
            assert!(matches!(
                compress(&enc, q),
                Err(GrayCryptError::InvalidQuantization(got)) if got == q
            ));
        }
    }

    #[test]
    fn quarter_image_at_q1() {
        let q = quantize(&encrypted_6x6(), 1).unwrap();
        assert_eq!(q.quarter, [121, 149, 20, 68, 174, 130, 14, 66, 99]);
    }

    #[test]
    fn qdiffs_at_q1() {
        let q = quantize(&encrypted_6x6(), 1).unwrap();
        assert_eq!(q.qdiffs, [43, 16, 0, 24, 246, 0, 73, 77, 203]);
    }

    #[test]
    fn q1_qtable_is_identity() {
        let q = quantize(&encrypted_6x6(), 1).unwrap();
        assert_eq!(q.qtable.len(), 256);
        for (k, &v) in q.qtable.iter().enumerate() {
            assert_eq!(v as usize, k);
        }
    }

    #[test]
    fn qtable_entries_stay_in_their_bucket() {
        let enc = encrypted_6x6();
        for q in [1u8, 2, 4, 8, 16, 32, 64, 128] {
            let logq = q.trailing_zeros();
            let out = quantize(&enc, q).unwrap();
            assert_eq!(out.qtable.len(), 256 >> logq);
            for (k, &v) in out.qtable.iter().enumerate() {
                assert_eq!((v >> logq) as usize, k, "q={}", q);
            }
        }
    }

    #[test]
    fn qtable_picks_minimum_distortion_representative() {
        // All differences equal 3; at q=4 the bucket 0 representative must
        // be 3 itself, and every other bucket keeps its earliest candidate.
        let mut distortions = [0u64; 256];
        for j in 0..4u8 {
            let r = 3u8.wrapping_sub(j) & 3;
            distortions[j as usize] = u64::from(r) * u64::from(r) * 100;
        }
        let qtable = build_qtable(&distortions, 4);
        assert_eq!(qtable[0], 3);
        for (k, &v) in qtable.iter().enumerate().skip(1) {
            assert_eq!(v, (k as u8) << 2);
        }
    }

    #[test]
    fn encoded_qdiffs_round_trip() {
        let comp = compress(&encrypted_6x6(), 1).unwrap();
        let mut decoded = vec![0u8; comp.quarter.len()];
        let n = entropy_coder::decode(&comp.encoded_qdiffs, &mut decoded).unwrap();
        assert_eq!(n, comp.quarter.len());
        assert_eq!(decoded, [43, 16, 0, 24, 246, 0, 73, 77, 203]);
    }

    #[test]
    fn serialization_round_trips() {
        let comp = compress(&encrypted_6x6(), 8).unwrap();
        let back = CompressedImage::from_bytes(&comp.to_bytes().unwrap()).unwrap();
        assert_eq!(comp, back);
    }
}
