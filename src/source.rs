//! Source trait for scanned codes

use crate::Result;

/// Trait for sources of decoded QR text
///
/// Sources abstract over capture pipelines (camera, screen grabs, recorded
/// sessions) and handle their own timing internally. Each call returns the
/// strings decoded from one analysis tick.
#[async_trait::async_trait]
pub trait CodeSource: Send + 'static {
    /// Get the codes visible in the next analysis tick
    ///
    /// Returns:
    /// - `Ok(Some(codes))` - Codes seen in this tick (possibly none)
    /// - `Ok(None)` - Source ended (normal termination)
    /// - `Err(e)` - Source failed; the capture task reports it and stops
    async fn next_codes(&mut self) -> Result<Option<Vec<String>>>;
}
