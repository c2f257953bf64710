//! Codec traits for multi-part UR transmission

use std::collections::BTreeSet;

use thiserror::Error;

use crate::types::Ur;

/// Errors raised by a codec implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CodecError {
    #[error("payload is empty")]
    EmptyPayload,

    #[error("maximum fragment length must be greater than zero")]
    ZeroFragmentLength,

    #[error("payload of {len} bytes is too large to fragment")]
    PayloadTooLarge { len: usize },

    #[error("payload needs {count} fragments, more than a transmission may carry")]
    TooManyFragments { count: usize },

    #[error("invalid UR type '{ur_type}'")]
    InvalidType { ur_type: String },

    #[error("checksum mismatch: expected {expected:#010x}, computed {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("assembled message is {actual} bytes, header declared {expected}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Sending half of a multi-part codec.
///
/// An encoder owns all sequencing state. Callers only ask it for the next
/// part and inspect which fragments went into that part.
pub trait PartEncoder: Send + 'static {
    /// True when the whole payload fits into a single part
    fn is_single_part(&self) -> bool;

    /// Produce the next part text. For single-part payloads this always
    /// returns the same text.
    fn next_part(&mut self) -> String;

    /// Fragment indexes encoded into the most recently produced part
    fn last_part_indexes(&self) -> &BTreeSet<usize>;

    /// Sequence number of the most recently produced part (0 before the first)
    fn seq_num(&self) -> u32;

    /// Total number of fragments
    fn seq_len(&self) -> usize;
}

/// Receiving half of a multi-part codec.
pub trait PartDecoder: Send + 'static {
    /// Offer one part. Returns `true` iff it was accepted as a valid part of
    /// the current (or a new) sequence.
    fn receive_part(&mut self, part: &str) -> bool;

    /// Terminal result, `None` while the payload is incomplete
    fn result(&self) -> Option<&Result<Ur, CodecError>>;

    /// Number of fragments in the sequence, 0 until the first part is accepted
    fn expected_part_count(&self) -> usize;

    /// UR type of the sequence, `None` until the first part is accepted
    fn expected_type(&self) -> Option<&str>;

    /// Fragment indexes fully recovered so far
    fn received_part_indexes(&self) -> &BTreeSet<usize>;

    /// Fragment indexes contained in the most recently accepted part
    fn last_part_indexes(&self) -> &BTreeSet<usize>;

    /// Heuristic completion fraction in `[0, 1]`
    fn estimated_percent_complete(&self) -> f64;
}

/// Factory for encoder/decoder pairs.
///
/// Sessions hold a codec so they can rebuild their encoder or decoder on
/// restart without the caller's help.
pub trait Codec: Send + Sync + 'static {
    type Encoder: PartEncoder;
    type Decoder: PartDecoder;

    /// Build an encoder for `ur` with fragments of at most `max_fragment_len` bytes
    fn encoder(&self, ur: &Ur, max_fragment_len: usize) -> Result<Self::Encoder, CodecError>;

    /// Build an empty decoder
    fn decoder(&self) -> Self::Decoder;
}
