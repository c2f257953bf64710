//! Display and scan tracking for animated, multi-part UR payloads over QR codes.
//!
//! Payloads too large for one QR code are cut into fragments and shown as an
//! animation. A scanner reads whatever frames its camera catches, in any
//! order, and reassembles the payload. There is no back-channel.
//!
//! # Features
//!
//! - **Display**: Cycles fragments on a timer and publishes the current frame
//!   and which fragments it carries
//! - **Scan**: Turns batches of scanned text into typed result events and a
//!   live progress snapshot
//! - **Deduplication**: Drops repeated observations of still-visible codes
//!   before they reach the decoder
//! - **Pluggable codec**: Any [`Codec`] implementation; [`SequentialCodec`]
//!   ships as the default
//!
//! ## Example (end to end)
//!
//! ```rust,no_run
//! use qrstream::{CodeBatch, QrStream, ScanResult, Ur};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> qrstream::Result<()> {
//!     let display = QrStream::display(Ur::bytes(vec![7u8; 1000]), 100).await?;
//!     display.run()?;
//!
//!     let mut scan = QrStream::scan().await;
//!     let mut results = scan.results().expect("first call");
//!
//!     let mut frames = Box::pin(display.frames());
//!     while let Some(frame) = frames.next().await {
//!         scan.submit(CodeBatch::single(frame.as_str()))?;
//!         if let Some(ScanResult::Completed(ur)) = results.next().await {
//!             println!("Received {} bytes", ur.data().len());
//!             break;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

// Core types and error handling
pub mod codec;
pub mod codecs;
pub mod config;
pub mod dedup;
mod error;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Session and task architecture
pub mod connection;
pub mod driver;
pub mod session;
pub mod source;

// Core exports
pub use error::*;
pub use types::*;

pub use codec::{Codec, CodecError, PartDecoder, PartEncoder};
pub use codecs::SequentialCodec;
pub use config::DisplayConfig;
pub use dedup::CodeDeduplicator;
pub use session::{DisplaySession, ScanFeedback, ScanSession};
pub use source::CodeSource;

pub use connection::display::DisplayConnection;
pub use connection::scan::ScanConnection;

/// Unified entry point using the default [`SequentialCodec`].
///
/// # Examples
///
/// ```rust,no_run
/// use qrstream::{QrStream, Ur};
///
/// #[tokio::main]
/// async fn main() -> qrstream::Result<()> {
///     let display = QrStream::display(Ur::bytes(b"hello".to_vec()), 100).await?;
///     let scan = QrStream::scan().await;
///     Ok(())
/// }
/// ```
pub struct QrStream;

impl QrStream {
    /// Open an animated display for `ur`.
    ///
    /// Uses default cadence settings with the given fragment size. Call
    /// [`DisplayConnection::run`] to start cycling.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The payload is empty
    /// - `max_fragment_len` is zero
    pub async fn display(ur: Ur, max_fragment_len: usize) -> Result<DisplayConnection> {
        let config = DisplayConfig { max_fragment_len, ..DisplayConfig::default() };
        DisplayConnection::open(SequentialCodec, ur, &config).await
    }

    /// Open an animated display with explicit settings.
    pub async fn display_with_config(ur: Ur, config: &DisplayConfig) -> Result<DisplayConnection> {
        DisplayConnection::open(SequentialCodec, ur, config).await
    }

    /// Open a scan tracker.
    ///
    /// Feed it with [`ScanConnection::submit`] or attach a [`CodeSource`]
    /// with [`ScanConnection::attach`].
    pub async fn scan() -> ScanConnection {
        ScanConnection::open(ScanSession::new(SequentialCodec)).await
    }

    /// Open a scan tracker reporting to `feedback`.
    pub async fn scan_with_feedback(feedback: impl ScanFeedback) -> ScanConnection {
        ScanConnection::open(ScanSession::new(SequentialCodec).with_feedback(feedback)).await
    }
}
