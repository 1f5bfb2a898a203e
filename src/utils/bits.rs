use bytes::Buf;

use crate::error::{Mp2tError, Result};

/// A bit-level reader for parsing binary data streams, MSB first.
///
/// The reader pulls bytes lazily from any [`bytes::Buf`], so a header that
/// straddles several non-contiguous chunks can be read through
/// [`Buf::chain`] without copying it first.
///
/// Implements H.264 style bit reading operations including:
/// - Reading individual bits and flags
/// - Reading up to 64 bits as numbers
/// - Reading exponential Golomb codes (ue(v) and se(v))
///
/// Example:
/// ```
/// use mp2t::utils::BitReader;
///
/// let data = [0b10110011];
/// let mut reader = BitReader::new(&data[..]);
///
/// assert_eq!(reader.read_bit().unwrap(), true);   // 1
/// assert_eq!(reader.read_bits(3).unwrap(), 0b011); // 011
/// assert_eq!(reader.bits_read(), 4);
/// assert_eq!(reader.available_bits(), 4);
/// ```
pub struct BitReader<B> {
    source: B,
    current: u8,
    bits_in_current: u8,
    bits_read: usize,
}

impl<B: Buf> BitReader<B> {
    /// Creates a new BitReader pulling bytes from `source`.
    pub fn new(source: B) -> Self {
        BitReader {
            source,
            current: 0,
            bits_in_current: 0,
            bits_read: 0,
        }
    }

    /// Reads a single bit from the stream.
    /// Returns true for 1, false for 0.
    pub fn read_bit(&mut self) -> Result<bool> {
        Ok(self.read_bits_u64(1)? == 1)
    }

    /// Alias of [`read_bit`](Self::read_bit) for syntax elements named `*_flag`.
    pub fn read_flag(&mut self) -> Result<bool> {
        self.read_bit()
    }

    /// Reads n bits (n <= 32) and returns them as a big-endian number.
    pub fn read_bits(&mut self, n: u32) -> Result<u32> {
        if n > 32 {
            return Err(Mp2tError::Codec("Too many bits requested".into()));
        }
        Ok(self.read_bits_u64(n)? as u32)
    }

    /// Reads n bits (n <= 64) and returns them as a big-endian number.
    ///
    /// Nothing is consumed when fewer than `n` bits remain.
    pub fn read_bits_u64(&mut self, n: u32) -> Result<u64> {
        if n > 64 {
            return Err(Mp2tError::Codec("Too many bits requested".into()));
        }
        if n as usize > self.available_bits() {
            return Err(Mp2tError::Codec("Reached end of data".into()));
        }

        let mut value = 0u64;
        let mut remaining = n;
        while remaining > 0 {
            if self.bits_in_current == 0 {
                self.current = self.source.get_u8();
                self.bits_in_current = 8;
            }
            let take = remaining.min(self.bits_in_current as u32);
            let shift = self.bits_in_current as u32 - take;
            let bits = (self.current >> shift) as u64 & ((1u64 << take) - 1);
            value = (value << take) | bits;
            self.bits_in_current -= take as u8;
            remaining -= take;
        }

        self.bits_read += n as usize;
        Ok(value)
    }

    /// Reads an unsigned exponential Golomb code (ue(v)) as specified in H.264.
    ///
    /// Format:
    /// 1. M leading zeros followed by a 1
    /// 2. M more INFO bits
    /// 3. Value = 2^M + INFO - 1
    pub fn read_golomb(&mut self) -> Result<u32> {
        let mut leading_zeros = 0;
        while !self.read_bit()? {
            leading_zeros += 1;
            if leading_zeros > 31 {
                return Err(Mp2tError::Codec("Invalid Golomb code".into()));
            }
        }

        if leading_zeros == 0 {
            return Ok(0);
        }

        let info = self.read_bits_u64(leading_zeros)?;
        Ok(((1u64 << leading_zeros) + info - 1) as u32)
    }

    /// Reads a signed exponential Golomb code (se(v)) as specified in H.264.
    ///
    /// Odd codes map to positive values, even codes to negative ones:
    /// k=1 -> +1, k=2 -> -1, k=3 -> +2, ...
    pub fn read_signed_golomb(&mut self) -> Result<i32> {
        let k = self.read_golomb()?;
        if k == 0 {
            return Ok(0);
        }

        let magnitude = ((k as i64 + 1) >> 1) as i32;
        let sign = if k & 1 == 1 { 1 } else { -1 };
        Ok(sign * magnitude)
    }

    /// Skips n bits in the stream. Fails without moving if fewer remain.
    pub fn skip_bits(&mut self, n: usize) -> Result<()> {
        if n > self.available_bits() {
            return Err(Mp2tError::Codec("Reached end of data".into()));
        }

        let mut remaining = n;
        let from_current = remaining.min(self.bits_in_current as usize);
        self.bits_in_current -= from_current as u8;
        remaining -= from_current;

        let whole_bytes = remaining / 8;
        self.source.advance(whole_bytes);
        remaining -= whole_bytes * 8;

        if remaining > 0 {
            self.current = self.source.get_u8();
            self.bits_in_current = 8 - remaining as u8;
        }

        self.bits_read += n;
        Ok(())
    }

    /// Skips the remaining bits of the current byte.
    pub fn align_byte(&mut self) {
        self.bits_read += self.bits_in_current as usize;
        self.bits_in_current = 0;
    }

    /// Returns true when the reader sits on a byte boundary.
    pub fn is_byte_aligned(&self) -> bool {
        self.bits_in_current == 0
    }

    /// Returns number of bits consumed so far.
    pub fn bits_read(&self) -> usize {
        self.bits_read
    }

    /// Returns number of bits available to read.
    pub fn available_bits(&self) -> usize {
        self.source.remaining() * 8 + self.bits_in_current as usize
    }
}
