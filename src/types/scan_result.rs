//! Scan result events and progress snapshots

use serde::{Deserialize, Serialize};

use super::{FragmentState, Ur};
use crate::TransferError;

/// One outcome per submitted string.
///
/// Consumers match on every variant; there is no catch-all.
#[derive(Debug)]
pub enum ScanResult {
    /// Payload fully decoded and verified. The session has restarted.
    Completed(Ur),

    /// Text that is not a UR part, seen before any part was accepted
    Other(String),

    /// Part accepted, payload still incomplete
    Progress {
        estimated_percent_complete: f64,
        fragment_states: Vec<FragmentState>,
    },

    /// Text that is not a valid part of the transmission in progress
    Rejected,

    /// Decode-terminal or source failure
    Failure(TransferError),
}

impl ScanResult {
    /// True for `Completed` and `Failure`
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanResult::Completed(_) | ScanResult::Failure(_))
    }
}

/// Latest scan progress, as a presentation layer would show it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct ScanProgress {
    /// Decoder estimate in `[0, 1]`
    pub estimated_percent_complete: f64,

    /// One entry per expected fragment
    pub fragment_states: Vec<FragmentState>,

    /// Milliseconds since the first accepted part of this transmission
    pub elapsed_ms: u64,
}

impl Default for ScanProgress {
    fn default() -> Self {
        Self {
            estimated_percent_complete: 0.0,
            fragment_states: FragmentState::initial(),
            elapsed_ms: 0,
        }
    }
}
