//! Test utilities: deterministic payloads, pre-rendered parts and scripted
//! code sources.
//!
//! Shared by unit tests, integration tests and benches so every layer uses
//! the same fixtures.

#![cfg(any(test, feature = "benchmark"))]

use std::collections::VecDeque;
use std::time::Duration;

use crate::codec::{Codec, PartEncoder};
use crate::source::CodeSource;
use crate::types::Ur;
use crate::{Result, TransferError};

/// Deterministic `bytes` payload of `len` bytes.
///
/// The pattern avoids long runs of equal bytes so fragments differ from one
/// another.
pub fn sample_ur(len: usize) -> Ur {
    Ur::bytes((0..len).map(|i| (i.wrapping_mul(167) ^ (i >> 3)) as u8).collect::<Vec<u8>>())
}

/// One full cycle of part texts for `ur`, starting at sequence number 1.
///
/// # Panics
///
/// Panics if the codec rejects the payload; fixtures are expected to be valid.
pub fn all_parts<C: Codec>(codec: &C, ur: &Ur, max_fragment_len: usize) -> Vec<String> {
    let mut encoder = codec
        .encoder(ur, max_fragment_len)
        .unwrap_or_else(|e| panic!("Fixture payload rejected by codec: {}", e));
    (0..encoder.seq_len()).map(|_| encoder.next_part()).collect()
}

/// One scripted analysis tick
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Codes visible in this tick
    Codes(Vec<String>),
    /// The source fails with this reason
    Fail(String),
}

/// A [`CodeSource`] that replays a fixed script, then ends.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    steps: VecDeque<ScriptStep>,
    pace: Option<Duration>,
}

impl ScriptedSource {
    pub fn new(steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        Self { steps: steps.into_iter().collect(), pace: None }
    }

    /// Source that shows each batch of codes in turn
    pub fn from_ticks<I, T>(ticks: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        Self::new(
            ticks
                .into_iter()
                .map(|tick| ScriptStep::Codes(tick.into_iter().map(Into::into).collect())),
        )
    }

    /// Wait `pace` before every tick
    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = Some(pace);
        self
    }
}

#[async_trait::async_trait]
impl CodeSource for ScriptedSource {
    async fn next_codes(&mut self) -> Result<Option<Vec<String>>> {
        if let Some(pace) = self.pace {
            tokio::time::sleep(pace).await;
        }
        match self.steps.pop_front() {
            Some(ScriptStep::Codes(codes)) => Ok(Some(codes)),
            Some(ScriptStep::Fail(reason)) => Err(TransferError::source_failed(reason)),
            None => Ok(None),
        }
    }
}
