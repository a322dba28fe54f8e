//! Lossy compression that commutes with encryption over 8-bit grayscale
//! images: a sender encrypts, an untrusted party compresses the ciphertext
//! without the key, and the receiver decrypts-and-reconstructs.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GrayCryptError {
    #[error("invalid image data: {len} bytes for {width}x{height}")]
    InvalidImageData {
        len: usize,
        width: usize,
        height: usize,
    },
    #[error("quantization must be a power of two in [1, 128], got {0}")]
    InvalidQuantization(u8),
    #[error("key must be 16, 24, or 32 bytes, got {0}")]
    BadKeySize(usize),
    #[error("entropy codec error: {0}")]
    EntropyCodec(&'static str),
    #[error("artifact serialization error: {0}")]
    Serialization(#[from] bincode::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GrayCryptError>;

pub mod cai;
pub mod compress;
pub mod decrypt;
pub mod encrypt;
pub mod entropy_coder;
pub mod image;
pub mod keystream;

pub use crate::compress::{compress, CompressedImage};
pub use crate::decrypt::decrypt;
pub use crate::encrypt::{encrypt, encrypt_with_salt_source, EncryptedImage};
pub use crate::image::Image;
pub use crate::keystream::{random_salt, KeyStream, Salt};
