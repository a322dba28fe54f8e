//! Order-0 canonical Huffman codec for byte streams.
//!
//! Stream framing:
//! - u32 LE symbol count
//! - 128 bytes of 4-bit-packed code lengths for all 256 symbols
//!   (omitted entirely for an empty stream)
//! - MSB-first bitstream of canonical codes
//!
//! Code lengths are limited to [`MAX_CODE_BITS`] by halving the symbol
//! frequencies until the tree fits, so decoding runs off a single
//! 4096-entry (symbol, bits) table indexed by a 12-bit prefix.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use super::bit_reader::BitReader;
use super::bit_writer::BitWriter;
use crate::{GrayCryptError, Result};

/// Longest permitted code; also the decode table index width.
const MAX_CODE_BITS: u32 = 12;

/// Symbol count plus the packed code length table.
const HEADER_LEN: usize = 4 + 128;

/// Compresses `src` into a self-framing blob.
pub fn encode(src: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + src.len() / 2 + 16);
    out.extend_from_slice(&(src.len() as u32).to_le_bytes());
    if src.is_empty() {
        return out;
    }

    let mut freqs = [0u64; 256];
    for &b in src {
        freqs[b as usize] += 1;
    }
    let lens = code_lengths(&freqs);
    let codes = canonical_codes(&lens);

    for i in 0..128 {
        out.push(lens[2 * i] | (lens[2 * i + 1] << 4));
    }

    let mut writer = BitWriter::with_capacity(src.len());
    for &b in src {
        writer.write_bits(codes[b as usize], u32::from(lens[b as usize]));
    }
    out.extend_from_slice(&writer.finish());
    out
}

/// Decompresses `src` into the front of `dst`, returning the symbol count.
pub fn decode(src: &[u8], dst: &mut [u8]) -> Result<usize> {
    if src.len() < 4 {
        return Err(GrayCryptError::EntropyCodec("truncated stream header"));
    }
    let count = u32::from_le_bytes([src[0], src[1], src[2], src[3]]) as usize;
    if count == 0 {
        return Ok(0);
    }
    if src.len() < HEADER_LEN {
        return Err(GrayCryptError::EntropyCodec("truncated code length table"));
    }
    if dst.len() < count {
        return Err(GrayCryptError::EntropyCodec("destination buffer too small"));
    }

    let mut lens = [0u8; 256];
    for (i, &b) in src[4..HEADER_LEN].iter().enumerate() {
        lens[2 * i] = b & 0x0f;
        lens[2 * i + 1] = b >> 4;
    }
    let table = DecodeTable::build(&lens)?;

    let mut reader = BitReader::new(&src[HEADER_LEN..]);
    for slot in dst[..count].iter_mut() {
        let entry = table.entries[reader.peek(MAX_CODE_BITS) as usize];
        if entry.bits == 0 {
            return Err(GrayCryptError::EntropyCodec("invalid code in stream"));
        }
        reader.consume(u32::from(entry.bits));
        *slot = entry.symbol;
    }
    Ok(count)
}

#[derive(Clone, Copy)]
struct Entry {
    symbol: u8,
    /// Code length; zero marks a prefix no code covers.
    bits: u8,
}

struct DecodeTable {
    entries: Vec<Entry>,
}

impl DecodeTable {
    /// Expand a code length table into the prefix lookup table, validating
    /// it against the Kraft budget first so hostile headers cannot push a
    /// code past the end of the table.
    fn build(lens: &[u8; 256]) -> Result<Self> {
        let mut kraft = 0u32;
        for &l in lens {
            if u32::from(l) > MAX_CODE_BITS {
                return Err(GrayCryptError::EntropyCodec("code length exceeds table depth"));
            }
            if l > 0 {
                kraft += 1 << (MAX_CODE_BITS - u32::from(l));
            }
        }
        if kraft == 0 || kraft > 1 << MAX_CODE_BITS {
            return Err(GrayCryptError::EntropyCodec("corrupt code length table"));
        }

        let codes = canonical_codes(lens);
        let mut entries = vec![Entry { symbol: 0, bits: 0 }; 1 << MAX_CODE_BITS];
        for (s, &l) in lens.iter().enumerate() {
            if l == 0 {
                continue;
            }
            let span = 1usize << (MAX_CODE_BITS - u32::from(l));
            let base = (codes[s] as usize) << (MAX_CODE_BITS - u32::from(l));
            let slots = entries
                .get_mut(base..base + span)
                .ok_or(GrayCryptError::EntropyCodec("corrupt code length table"))?;
            for slot in slots {
                *slot = Entry {
                    symbol: s as u8,
                    bits: l,
                };
            }
        }
        Ok(Self { entries })
    }
}

/// Huffman code lengths for the given frequencies, limited to
/// [`MAX_CODE_BITS`] by halving frequencies until the tree fits. Halving
/// keeps every present symbol present, and equal frequencies bottom out at
/// a balanced tree of depth eight, so the loop terminates.
fn code_lengths(freqs: &[u64; 256]) -> [u8; 256] {
    let mut lens = [0u8; 256];
    let mut present = 0usize;
    let mut last = 0usize;
    for (s, &f) in freqs.iter().enumerate() {
        if f > 0 {
            present += 1;
            last = s;
        }
    }
    if present == 0 {
        return lens;
    }
    if present == 1 {
        lens[last] = 1;
        return lens;
    }

    let mut scaled = *freqs;
    loop {
        let lens = huffman_lengths(&scaled);
        if lens.iter().all(|&l| u32::from(l) <= MAX_CODE_BITS) {
            return lens;
        }
        for f in scaled.iter_mut() {
            if *f > 0 {
                *f = (*f + 1) >> 1;
            }
        }
    }
}

/// Unrestricted Huffman code lengths via the usual heap construction.
/// Ties break on insertion order, which makes the result deterministic.
fn huffman_lengths(freqs: &[u64; 256]) -> [u8; 256] {
    const LEAF: u16 = u16::MAX;

    // Leaves first, then merged nodes; `children` is LEAF-marked for leaves.
    let mut symbols = [0u8; 511];
    let mut children = [[LEAF, LEAF]; 511];
    let mut next = 0usize;

    let mut heap: BinaryHeap<Reverse<(u64, u16)>> = BinaryHeap::new();
    for (s, &f) in freqs.iter().enumerate() {
        if f > 0 {
            symbols[next] = s as u8;
            heap.push(Reverse((f, next as u16)));
            next += 1;
        }
    }

    while heap.len() > 1 {
        let Some(Reverse((f1, i1))) = heap.pop() else { break };
        let Some(Reverse((f2, i2))) = heap.pop() else { break };
        children[next] = [i1, i2];
        heap.push(Reverse((f1 + f2, next as u16)));
        next += 1;
    }

    let mut lens = [0u8; 256];
    let Some(Reverse((_, root))) = heap.pop() else {
        return lens;
    };
    let mut stack = vec![(root, 0u8)];
    while let Some((i, depth)) = stack.pop() {
        let [left, right] = children[i as usize];
        if left == LEAF {
            lens[symbols[i as usize] as usize] = depth.max(1);
        } else {
            stack.push((left, depth + 1));
            stack.push((right, depth + 1));
        }
    }
    lens
}

/// Canonical code assignment: codes increase with (length, symbol) order.
fn canonical_codes(lens: &[u8; 256]) -> [u32; 256] {
    let mut order: Vec<u8> = (0..=255u8).filter(|&s| lens[s as usize] > 0).collect();
    order.sort_by_key(|&s| (lens[s as usize], s));

    let mut codes = [0u32; 256];
    let mut code = 0u32;
    let mut prev = 0u8;
    for &s in &order {
        code <<= lens[s as usize] - prev;
        prev = lens[s as usize];
        codes[s as usize] = code;
        code += 1;
    }
    codes
}
