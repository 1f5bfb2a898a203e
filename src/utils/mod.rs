//! # Utility Functions and Types
//!
//! Common building blocks shared by the codec and format layers:
//!
//! - Bit-level reading over any [`bytes::Buf`]
//! - MPEG-2 CRC32 calculation and PSI section validation
//! - A byte queue addressed by absolute stream offsets
//!
//! ## Bit Operations
//!
//! ```rust
//! use mp2t::utils::BitReader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = vec![0b10110011u8];
//! let mut reader = BitReader::new(&data[..]);
//!
//! // Read specific number of bits
//! let value = reader.read_bits(3)?; // Reads first 3 bits (101)
//! assert_eq!(value, 0b101);
//! # Ok(())
//! # }
//! ```
//!
//! ## CRC Calculation
//!
//! ```rust
//! use mp2t::utils::Crc32Mpeg2;
//!
//! let crc = Crc32Mpeg2::new().calculate(b"Hello, world!");
//! println!("CRC32: {:08x}", crc);
//! ```

/// Bit manipulation and bitstream reading utilities
pub mod bits;

/// CRC calculation implementations
pub mod crc;

/// Offset-addressed byte buffering
pub mod offset_byte_queue;

// Re-export commonly used types
pub use bits::BitReader;
pub use crc::Crc32Mpeg2;
pub use offset_byte_queue::OffsetByteQueue;
