//! Display session: cycles a payload through successive QR frames

use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::codec::{Codec, PartEncoder};
use crate::types::{DisplayFrame, FragmentState, FrameRate, Ur};
use crate::{Result, TransferError};

/// Tracks the frame currently shown for a (possibly multi-part) UR.
///
/// The session itself never sleeps. Callers feed it instants through
/// [`tick`](Self::tick) at a fine polling granularity; it advances once the
/// time since the last switch meets or exceeds the frame interval.
pub struct DisplaySession<C: Codec> {
    codec: C,
    ur: Ur,
    max_fragment_len: usize,
    encoder: C::Encoder,
    frame: DisplayFrame,
    frame_rate: FrameRate,
    last_switch: Instant,
}

impl<C: Codec> DisplaySession<C> {
    /// Create a session and compute frame 1.
    ///
    /// Fails only if the codec cannot build an encoder for `ur`.
    pub fn new(codec: C, ur: Ur, max_fragment_len: usize) -> Result<Self> {
        Self::new_at(codec, ur, max_fragment_len, Instant::now())
    }

    /// [`new`](Self::new) with an explicit clock reading for frame 1
    pub fn new_at(codec: C, ur: Ur, max_fragment_len: usize, now: Instant) -> Result<Self> {
        let mut encoder = codec.encoder(&ur, max_fragment_len).map_err(TransferError::codec)?;
        let frame = next_frame(&mut encoder);

        debug!(
            "Display session for ur:{} with {} fragment(s)",
            ur.ur_type(),
            encoder.seq_len()
        );

        Ok(Self {
            codec,
            ur,
            max_fragment_len,
            encoder,
            frame,
            frame_rate: FrameRate::default(),
            last_switch: now,
        })
    }

    /// Rebuild the encoder from the original payload and show frame 1 again.
    pub fn restart(&mut self) -> Result<()> {
        self.restart_at(Instant::now())
    }

    /// [`restart`](Self::restart) with an explicit clock reading
    pub fn restart_at(&mut self, now: Instant) -> Result<()> {
        self.encoder =
            self.codec.encoder(&self.ur, self.max_fragment_len).map_err(TransferError::codec)?;
        self.last_switch = now;
        self.frame = next_frame(&mut self.encoder);
        debug!("Display session restarted");
        Ok(())
    }

    /// Change the cadence; applies from the next tick.
    pub fn set_frame_rate(&mut self, rate: FrameRate) {
        debug!("Frame rate set to {} fps", rate.fps());
        self.frame_rate = rate;
    }

    /// Advance if a full interval has passed since the last switch.
    ///
    /// Returns `true` when a new frame was produced. Single-part payloads
    /// never advance.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.is_single_part() {
            return false;
        }
        if now.saturating_duration_since(self.last_switch) < self.interval() {
            return false;
        }
        self.last_switch = now;
        self.frame = next_frame(&mut self.encoder);
        trace!("Frame {}/{}", self.frame.seq_num, self.frame.seq_len);
        true
    }

    pub fn current_frame(&self) -> &DisplayFrame {
        &self.frame
    }

    pub fn fragment_states(&self) -> &[FragmentState] {
        &self.frame.fragment_states
    }

    pub fn frame_rate(&self) -> FrameRate {
        self.frame_rate
    }

    pub fn interval(&self) -> Duration {
        self.frame_rate.interval()
    }

    pub fn ur(&self) -> &Ur {
        &self.ur
    }

    pub fn max_fragment_len(&self) -> usize {
        self.max_fragment_len
    }

    pub fn is_single_part(&self) -> bool {
        self.encoder.is_single_part()
    }

    pub fn seq_num(&self) -> u32 {
        self.encoder.seq_num()
    }

    pub fn seq_len(&self) -> usize {
        self.encoder.seq_len()
    }
}

fn next_frame<E: PartEncoder>(encoder: &mut E) -> DisplayFrame {
    let part = encoder.next_part();
    let states = FragmentState::for_display(encoder.seq_len(), encoder.last_part_indexes());
    DisplayFrame::new(&part, encoder.seq_num(), encoder.seq_len(), states)
}
