//! Bit reader over an MSB-first byte stream.

/// Reads bits MSB-first, one refill byte at a time.
///
/// Past the end of the input the container refills with zeros, so the final
/// codes of a stream can always be peeked at full table width; the caller
/// bounds the number of symbols it decodes.
pub struct BitReader<'a> {
    input: &'a [u8],
    pos: usize,
    bits: u64,
    count: u32,
}

impl<'a> BitReader<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            bits: 0,
            count: 0,
        }
    }

    /// The next `num_bits` bits without consuming them.
    #[inline]
    pub fn peek(&mut self, num_bits: u32) -> u32 {
        debug_assert!(0 < num_bits && num_bits <= 32);
        while self.count < num_bits {
            let byte = self.input.get(self.pos).copied().unwrap_or(0);
            self.pos += 1;
            self.bits = (self.bits << 8) | u64::from(byte);
            self.count += 8;
        }
        ((self.bits >> (self.count - num_bits)) & ((1u64 << num_bits) - 1)) as u32
    }

    /// Consume `num_bits` previously peeked bits.
    #[inline]
    pub fn consume(&mut self, num_bits: u32) {
        debug_assert!(self.count >= num_bits);
        self.count -= num_bits;
    }
}
