//! AAC in ADTS framing: header parsing and decoder config helpers.

/// ADTS header decoding
pub mod parser;
/// ADTS header types and tables
pub mod types;

pub use parser::*;
pub use types::*;
