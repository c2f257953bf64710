//! Display frame published by a display session

use std::sync::Arc;

use super::FragmentState;

/// One frame of an animated QR display
///
/// `data` is the part text upper-cased and UTF-8 encoded, ready to hand to a
/// QR symbol generator (upper case keeps the symbol in alphanumeric mode).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayFrame {
    /// QR payload bytes (shared via Arc)
    pub data: Arc<[u8]>,

    /// Sequence number of the part in this frame
    pub seq_num: u32,

    /// Total fragment count
    pub seq_len: usize,

    /// `On` for each fragment encoded into this frame
    pub fragment_states: Arc<[FragmentState]>,
}

impl DisplayFrame {
    /// Build a frame from raw part text
    pub fn new(part: &str, seq_num: u32, seq_len: usize, states: Vec<FragmentState>) -> Self {
        Self {
            data: part.to_uppercase().into_bytes().into(),
            seq_num,
            seq_len,
            fragment_states: states.into(),
        }
    }

    /// Frame data as text
    pub fn as_str(&self) -> &str {
        // Built from a String, so always valid UTF-8
        std::str::from_utf8(&self.data).unwrap_or_default()
    }
}
