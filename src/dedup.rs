//! Debouncing of codes seen across analysis ticks

use tracing::trace;

use crate::types::CodeBatch;

/// Forwards a batch only when it differs from the last forwarded one.
///
/// Comparison is by value equality of whole sets. Empty batches are dropped
/// and never become the reference, so `{A}`, `{}`, `{A}` forwards once.
#[derive(Debug, Default)]
pub struct CodeDeduplicator {
    last_forwarded: Option<CodeBatch>,
}

impl CodeDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe the codes of one tick, returning the batch to forward, if any.
    pub fn observe(&mut self, codes: CodeBatch) -> Option<CodeBatch> {
        if codes.is_empty() {
            return None;
        }
        if self.last_forwarded.as_ref() == Some(&codes) {
            trace!("Dropping repeated batch of {} code(s)", codes.len());
            return None;
        }
        self.last_forwarded = Some(codes.clone());
        Some(codes)
    }

    /// Forget the last forwarded batch
    pub fn reset(&mut self) {
        self.last_forwarded = None;
    }
}
