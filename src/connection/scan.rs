//! Scan connection for animated QR input

use futures::Stream;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::{UnboundedReceiverStream, WatchStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::codec::Codec;
use crate::driver::{CaptureDriver, ScanCommand, ScanDriver};
use crate::session::ScanSession;
use crate::source::CodeSource;
use crate::types::{CodeBatch, ScanProgress, ScanResult};
use crate::{Result, TransferError};

/// Handle to a running scan task
pub struct ScanConnection {
    /// Batch and control sender (FIFO, never drops)
    commands: mpsc::UnboundedSender<ScanCommand>,

    /// Result receiver, until taken by [`results`](Self::results)
    results: Option<mpsc::UnboundedReceiver<ScanResult>>,

    /// Progress watch receiver
    progress: watch::Receiver<ScanProgress>,

    /// Cancellation token for the scan task and every attached source
    cancel: CancellationToken,
}

impl ScanConnection {
    /// Spawn a scan task owning `session`.
    pub async fn open<C: Codec>(session: ScanSession<C>) -> Self {
        let channels = ScanDriver::spawn(session);
        info!("Scan connection opened");

        Self {
            commands: channels.commands,
            results: Some(channels.results),
            progress: channels.progress,
            cancel: channels.cancel,
        }
    }

    fn send(&self, command: ScanCommand) -> Result<()> {
        self.commands.send(command).map_err(|_| TransferError::channel_closed("Scan task"))
    }

    /// Submit a batch directly, bypassing deduplication.
    pub fn submit(&self, batch: CodeBatch) -> Result<()> {
        self.send(ScanCommand::Submit(batch))
    }

    /// Abandon the transmission in progress.
    pub fn restart(&self) -> Result<()> {
        self.send(ScanCommand::Restart)
    }

    /// Report a failure of an external code source.
    ///
    /// Emitted as a `Failure` event; accumulated progress is kept.
    pub fn report_source_failure(&self, error: TransferError) -> Result<()> {
        self.send(ScanCommand::SourceFailed(error))
    }

    /// Pump `source` through a deduplicator into this scan.
    ///
    /// Returns a token that stops this source only. Dropping the connection
    /// stops every attached source.
    pub fn attach<S: CodeSource>(&self, source: S) -> CancellationToken {
        let token = self.cancel.child_token();
        CaptureDriver::spawn(source, self.commands.clone(), token.clone());
        debug!("Code source attached");
        token
    }

    /// Take the result event stream. Only the first call returns `Some`.
    pub fn results(&mut self) -> Option<impl Stream<Item = ScanResult> + use<>> {
        self.results.take().map(UnboundedReceiverStream::new)
    }

    /// Get the latest progress snapshot
    pub fn progress(&self) -> ScanProgress {
        self.progress.borrow().clone()
    }

    /// Get progress snapshots as a stream, starting with the current one
    pub fn progress_updates(&self) -> impl Stream<Item = ScanProgress> + 'static {
        WatchStream::new(self.progress.clone())
    }
}

impl Drop for ScanConnection {
    fn drop(&mut self) {
        debug!("Dropping scan connection");
        self.cancel.cancel();
    }
}
