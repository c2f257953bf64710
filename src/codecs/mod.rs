//! Codec implementations
//!
//! - [`sequential`]: round-robin multi-part codec with a BLAKE3 checksum

pub mod sequential;

pub use sequential::{SequentialCodec, SequentialDecoder, SequentialEncoder};
