//! Display connection for animated QR output

use std::sync::Arc;

use futures::Stream;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::codec::Codec;
use crate::config::DisplayConfig;
use crate::driver::{DisplayCommand, DisplayDriver};
use crate::session::DisplaySession;
use crate::types::{DisplayFrame, FragmentState, FrameRate, Ur};
use crate::{Result, TransferError};

/// Handle to a running display task
pub struct DisplayConnection {
    /// Frame watch receiver
    frames: watch::Receiver<DisplayFrame>,

    /// Control sender
    commands: mpsc::UnboundedSender<DisplayCommand>,

    /// Total fragment count
    seq_len: usize,

    /// Whether the payload fits in one frame
    single_part: bool,

    /// Cancellation token for stopping the task
    cancel: CancellationToken,
}

impl DisplayConnection {
    /// Open a display for `ur`.
    ///
    /// Frame 1 is available as soon as this returns. Cycling starts only after
    /// [`run`](Self::run), unless `config.autostart` is set.
    pub async fn open<C: Codec>(codec: C, ur: Ur, config: &DisplayConfig) -> Result<Self> {
        config.validate()?;
        let now = tokio::time::Instant::now().into_std();
        let mut session = DisplaySession::new_at(codec, ur, config.max_fragment_len, now)?;
        session.set_frame_rate(config.frames_per_second);

        let seq_len = session.seq_len();
        let single_part = session.is_single_part();
        let channels = DisplayDriver::spawn(session, config.poll_interval());

        info!(
            "Display opened ({} fragment(s) at {} fps)",
            seq_len,
            config.frames_per_second.fps()
        );

        let connection = Self {
            frames: channels.frames,
            commands: channels.commands,
            seq_len,
            single_part,
            cancel: channels.cancel,
        };
        if config.autostart {
            connection.run()?;
        }
        Ok(connection)
    }

    fn send(&self, command: DisplayCommand) -> Result<()> {
        self.commands.send(command).map_err(|_| TransferError::channel_closed("Display task"))
    }

    /// Start cycling frames. No-op for single-part payloads.
    pub fn run(&self) -> Result<()> {
        self.send(DisplayCommand::Run)
    }

    /// Stop cycling; the current frame stays up.
    pub fn stop(&self) -> Result<()> {
        self.send(DisplayCommand::Stop)
    }

    /// Go back to frame 1, keeping the current run/stop state.
    pub fn restart(&self) -> Result<()> {
        self.send(DisplayCommand::Restart)
    }

    /// Change the cadence; takes effect on the next poll tick.
    pub fn set_frame_rate(&self, fps: f64) -> Result<()> {
        let rate = FrameRate::new(fps)?;
        self.send(DisplayCommand::SetFrameRate(rate))
    }

    /// Get the frame currently shown
    pub fn current_frame(&self) -> DisplayFrame {
        self.frames.borrow().clone()
    }

    /// Get the fragment states of the frame currently shown
    pub fn fragment_states(&self) -> Arc<[FragmentState]> {
        Arc::clone(&self.frames.borrow().fragment_states)
    }

    /// Get frames as a stream, starting with the current one
    pub fn frames(&self) -> impl Stream<Item = DisplayFrame> + 'static {
        WatchStream::new(self.frames.clone())
    }

    pub fn seq_len(&self) -> usize {
        self.seq_len
    }

    pub fn is_single_part(&self) -> bool {
        self.single_part
    }
}

impl Drop for DisplayConnection {
    fn drop(&mut self) {
        debug!("Dropping display connection");
        self.cancel.cancel();
    }
}
