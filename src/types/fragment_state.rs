//! Per-fragment highlight state shared by display and scan sessions

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Transmission or reception status of one fragment.
///
/// The display side only uses [`Off`](FragmentState::Off) and
/// [`On`](FragmentState::On). [`Highlighted`](FragmentState::Highlighted)
/// marks a fragment the scanner has fully received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
#[serde(rename_all = "lowercase")]
pub enum FragmentState {
    /// Not yet relevant
    #[default]
    Off,
    /// In the frame currently shown, or in the last part scanned
    On,
    /// Confirmed received
    Highlighted,
}

impl FragmentState {
    /// States for a display frame: `On` for every index in `current`.
    pub fn for_display(seq_len: usize, current: &BTreeSet<usize>) -> Vec<FragmentState> {
        (0..seq_len)
            .map(|i| if current.contains(&i) { FragmentState::On } else { FragmentState::Off })
            .collect()
    }

    /// States for scan progress.
    ///
    /// Received indexes win over last-seen ones; everything else is `Off`.
    pub fn for_scan(
        expected: usize,
        received: &BTreeSet<usize>,
        last_seen: &BTreeSet<usize>,
    ) -> Vec<FragmentState> {
        (0..expected)
            .map(|i| {
                if received.contains(&i) {
                    FragmentState::Highlighted
                } else if last_seen.contains(&i) {
                    FragmentState::On
                } else {
                    FragmentState::Off
                }
            })
            .collect()
    }

    /// The single implicit fragment assumed before any count is known.
    pub fn initial() -> Vec<FragmentState> {
        vec![FragmentState::Off]
    }
}
