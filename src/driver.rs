//! Drivers spawn and manage the tasks that own sessions
//!
//! Each session is owned by exactly one task. Everything a session publishes
//! leaves that task through a channel, so observers never see a half-updated
//! state:
//!
//! ```text
//! CodeSource ─▶ capture task (dedup) ─▶ mpsc ─▶ scan task ─▶ results (mpsc)
//!                                                        └─▶ progress (watch)
//! commands ─▶ display task ─▶ frames (watch)
//! ```

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::TransferError;
use crate::codec::Codec;
use crate::dedup::CodeDeduplicator;
use crate::session::{DisplaySession, ScanSession};
use crate::source::CodeSource;
use crate::types::{CodeBatch, DisplayFrame, FrameRate, ScanProgress, ScanResult};

/// Control messages for a display task
#[derive(Debug, Clone, Copy)]
pub enum DisplayCommand {
    /// Start cycling frames (ignored for single-part payloads)
    Run,
    /// Stop cycling; the current frame stays published
    Stop,
    /// Return to frame 1 without changing run/stop state
    Restart,
    /// Change cadence from the next poll tick
    SetFrameRate(FrameRate),
}

/// Result of spawning a display task
pub struct DisplayChannels {
    /// Receiver for the current frame
    pub frames: watch::Receiver<DisplayFrame>,
    /// Sender for control messages
    pub commands: mpsc::UnboundedSender<DisplayCommand>,
    /// Cancellation token for graceful shutdown
    pub cancel: CancellationToken,
}

/// Control messages for a scan task
#[derive(Debug)]
pub enum ScanCommand {
    /// Feed a deduplicated batch to the session
    Submit(CodeBatch),
    /// The code source failed; forwarded as a failure without restart
    SourceFailed(TransferError),
    /// Abandon the transmission in progress
    Restart,
}

/// Result of spawning a scan task
pub struct ScanChannels {
    /// Sender for batches and control messages (FIFO, unbounded)
    pub commands: mpsc::UnboundedSender<ScanCommand>,
    /// Every result event, in order
    pub results: mpsc::UnboundedReceiver<ScanResult>,
    /// Receiver for the latest progress snapshot
    pub progress: watch::Receiver<ScanProgress>,
    /// Cancellation token for graceful shutdown
    pub cancel: CancellationToken,
}

/// Spawns the task that owns a [`DisplaySession`]
pub struct DisplayDriver;

impl DisplayDriver {
    /// Spawn a display task polling every `poll_interval`.
    ///
    /// Frame 1 is published before this returns. The task starts stopped.
    pub fn spawn<C: Codec>(session: DisplaySession<C>, poll_interval: Duration) -> DisplayChannels {
        let (frame_tx, frame_rx) = watch::channel(session.current_frame().clone());
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let cancel_task = cancel.clone();

        tokio::spawn(async move {
            Self::display_task(session, poll_interval, frame_tx, command_rx, cancel_task).await;
        });

        DisplayChannels { frames: frame_rx, commands: command_tx, cancel }
    }

    async fn display_task<C: Codec>(
        mut session: DisplaySession<C>,
        poll_interval: Duration,
        frame_tx: watch::Sender<DisplayFrame>,
        mut commands: mpsc::UnboundedReceiver<DisplayCommand>,
        cancel: CancellationToken,
    ) {
        info!("Display task started ({} fragment(s))", session.seq_len());
        let mut poll = interval(poll_interval);
        // Don't burst after a stall
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut running = false;
        let mut frame_count = 0u64;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Display task cancelled");
                    break;
                }
                command = commands.recv() => match command {
                    Some(DisplayCommand::Run) => {
                        if session.is_single_part() {
                            debug!("Single-part payload, nothing to cycle");
                        } else {
                            running = true;
                        }
                    }
                    Some(DisplayCommand::Stop) => running = false,
                    Some(DisplayCommand::Restart) => {
                        match session.restart_at(Instant::now().into_std()) {
                            Ok(()) => {
                                frame_tx.send_replace(session.current_frame().clone());
                            }
                            Err(e) => error!("Failed to restart display: {}", e),
                        }
                    }
                    Some(DisplayCommand::SetFrameRate(rate)) => session.set_frame_rate(rate),
                    None => {
                        debug!("Display handle dropped, shutting down");
                        break;
                    }
                },
                now = poll.tick(), if running => {
                    if session.tick(now.into_std()) {
                        frame_count += 1;
                        if frame_tx.send(session.current_frame().clone()).is_err() {
                            debug!("Frame receivers dropped, shutting down");
                            break;
                        }
                    }
                }
            }
        }

        info!("Display task ended (advanced {} frames)", frame_count);
    }
}

/// Spawns the task that owns a [`ScanSession`]
pub struct ScanDriver;

impl ScanDriver {
    /// Spawn a scan task.
    pub fn spawn<C: Codec>(session: ScanSession<C>) -> ScanChannels {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (result_tx, result_rx) = mpsc::unbounded_channel();
        let (progress_tx, progress_rx) = watch::channel(session.progress().clone());
        let cancel = CancellationToken::new();
        let cancel_task = cancel.clone();

        tokio::spawn(async move {
            Self::scan_task(session, command_rx, result_tx, progress_tx, cancel_task).await;
        });

        ScanChannels { commands: command_tx, results: result_rx, progress: progress_rx, cancel }
    }

    async fn scan_task<C: Codec>(
        mut session: ScanSession<C>,
        mut commands: mpsc::UnboundedReceiver<ScanCommand>,
        result_tx: mpsc::UnboundedSender<ScanResult>,
        progress_tx: watch::Sender<ScanProgress>,
        cancel: CancellationToken,
    ) {
        info!("Scan task started");
        let mut batch_count = 0u64;

        loop {
            let command = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Scan task cancelled");
                    break;
                }
                command = commands.recv() => command,
            };

            let events = match command {
                Some(ScanCommand::Submit(batch)) => {
                    batch_count += 1;
                    trace!("Batch {}: {} code(s)", batch_count, batch.len());
                    session.submit(&batch)
                }
                Some(ScanCommand::SourceFailed(error)) => vec![session.source_failed(error)],
                Some(ScanCommand::Restart) => {
                    session.restart();
                    Vec::new()
                }
                None => {
                    debug!("Scan handles dropped, shutting down");
                    break;
                }
            };

            // Nobody listening for events is fine; progress is still published
            for event in events {
                let _ = result_tx.send(event);
            }

            let latest = session.progress();
            progress_tx.send_if_modified(|current| {
                if current != latest {
                    *current = latest.clone();
                    true
                } else {
                    false
                }
            });
        }

        info!("Scan task ended (processed {} batches)", batch_count);
    }
}

/// Spawns the task that pumps a [`CodeSource`] into a scan task
pub struct CaptureDriver;

impl CaptureDriver {
    /// Spawn a capture task forwarding deduplicated batches to `commands`.
    ///
    /// The task ends when the source ends, fails, or `cancel` fires.
    pub fn spawn<S: CodeSource>(
        source: S,
        commands: mpsc::UnboundedSender<ScanCommand>,
        cancel: CancellationToken,
    ) {
        tokio::spawn(async move {
            Self::capture_task(source, commands, cancel).await;
        });
    }

    async fn capture_task<S: CodeSource>(
        mut source: S,
        commands: mpsc::UnboundedSender<ScanCommand>,
        cancel: CancellationToken,
    ) {
        info!("Capture task started");
        let mut dedup = CodeDeduplicator::new();
        let mut tick_count = 0u64;
        let mut forwarded = 0u64;

        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Capture task cancelled");
                    break;
                }
                result = source.next_codes() => result,
            };

            match result {
                Ok(Some(codes)) => {
                    tick_count += 1;
                    let Some(batch) = dedup.observe(codes.into_iter().collect()) else {
                        continue;
                    };
                    forwarded += 1;
                    if commands.send(ScanCommand::Submit(batch)).is_err() {
                        debug!("Scan task gone, shutting down capture");
                        break;
                    }
                }
                Ok(None) => {
                    info!("Code source ended after {} ticks", tick_count);
                    break;
                }
                Err(e) => {
                    // Recovery (re-acquiring the camera) belongs to the caller
                    warn!("Code source failed: {}", e);
                    let _ = commands.send(ScanCommand::SourceFailed(e));
                    break;
                }
            }
        }

        info!("Capture task ended ({} of {} ticks forwarded)", forwarded, tick_count);
    }
}
