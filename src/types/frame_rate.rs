//! Frame rate control for animated displays

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Result, TransferError};

/// Frames per second for an animated display.
///
/// Always finite and strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct FrameRate(f64);

impl FrameRate {
    /// Default cadence of ten frames per second
    pub const DEFAULT: FrameRate = FrameRate(10.0);

    /// Validate and wrap a frame rate
    pub fn new(fps: f64) -> Result<Self> {
        if fps.is_finite() && fps > 0.0 {
            Ok(Self(fps))
        } else {
            Err(TransferError::InvalidFrameRate { fps })
        }
    }

    /// Frames per second
    pub fn fps(self) -> f64 {
        self.0
    }

    /// Time between two frames
    pub fn interval(self) -> Duration {
        Duration::from_secs_f64(1.0 / self.0)
    }
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<f64> for FrameRate {
    type Error = TransferError;

    fn try_from(fps: f64) -> Result<Self> {
        FrameRate::new(fps)
    }
}

impl From<FrameRate> for f64 {
    fn from(rate: FrameRate) -> Self {
        rate.0
    }
}
