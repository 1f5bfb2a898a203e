//! # H.264/AVC Bitstream Primitives
//!
//! Annex-B helpers used by the transport stream video parser:
//!
//! - Start code search and NAL unit splitting
//! - Sequence and Picture Parameter Sets (SPS/PPS)
//! - Slice header fields needed to tell key frames and validate references
//! - Coded size, cropping and sample aspect ratio
//!
//! ## Example: Splitting an Access Unit
//!
//! ```rust
//! use bytes::Bytes;
//! use mp2t::codec::h264::{nal_units, NALUnitType};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let au = Bytes::from_static(&[0, 0, 0, 1, 0x09, 0xF0, 0, 0, 1, 0x65, 0x88]);
//! let types = nal_units(au)
//!     .map(|nal| nal.map(|nal| nal.nal_type))
//!     .collect::<Result<Vec<_>, _>>()?;
//! assert_eq!(types, [NALUnitType::AccessUnitDelimiter, NALUnitType::CodedSliceIDR]);
//! # Ok(())
//! # }
//! ```

/// NAL unit splitting and parameter set parsing
pub mod parser;
/// NAL unit, SPS, PPS and slice header types
pub mod types;

#[cfg(test)]
pub(crate) mod parser_test;

#[doc(inline)]
pub use parser::*;
#[doc(inline)]
pub use types::*;
