//! Byte-to-byte entropy codec for the quantized difference stream.
//!
//! The codec is self-framing: `encode` produces a blob that `decode` can
//! invert without outside length information beyond a destination buffer.

pub mod bit_reader;
pub mod bit_writer;
pub mod huffman;

pub use huffman::{decode, encode};
