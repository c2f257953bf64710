//! Error types for display and scan sessions.
//!
//! Every failure in this crate is a value. Construction errors are returned
//! to the caller that tried to build a session; everything that happens while
//! a session is running travels inside a [`ScanResult::Failure`] event instead.
//!
//! ## Error Categories
//!
//! - **Codec Errors**: The encoder could not be built from the given payload
//! - **Decode Errors**: A fully assembled multi-part payload failed validation
//! - **Source Errors**: The upstream code source (camera, file, test script) failed
//! - **Configuration Errors**: Invalid frame rates or unparsable config files
//! - **Channel Errors**: A driver task is no longer running
//!
//! Rejected parts are not errors; they are reported as
//! [`ScanResult::Rejected`] events.
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use qrstream::TransferError;
//!
//! let error = TransferError::source_failed("camera unplugged");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```
//!
//! [`ScanResult::Failure`]: crate::ScanResult::Failure
//! [`ScanResult::Rejected`]: crate::ScanResult::Rejected

use thiserror::Error;

use crate::codec::CodecError;

/// Result type alias for transfer operations.
pub type Result<T, E = TransferError> = std::result::Result<T, E>;

/// Main error type for display and scan operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TransferError {
    #[error("Failed to build encoder: {source}")]
    Codec {
        #[source]
        source: CodecError,
    },

    #[error("Decoded payload is invalid: {source}")]
    Decode {
        #[source]
        source: CodecError,
    },

    #[error("Code source failed: {reason}")]
    Source {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Invalid frame rate {fps}: must be finite and greater than zero")]
    InvalidFrameRate { fps: f64 },

    #[error("Configuration error in {context}: {details}")]
    Config { context: String, details: String },

    #[error("{component} is no longer running")]
    ChannelClosed { component: String },
}

impl TransferError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransferError::Source { .. } => true,
            TransferError::Decode { .. } => true,
            TransferError::Codec { .. } => false,
            TransferError::InvalidFrameRate { .. } => false,
            TransferError::Config { .. } => false,
            TransferError::ChannelClosed { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            TransferError::Codec { .. } => vec![
                "Check the payload is not empty",
                "Use a maximum fragment length greater than zero",
                "Use a larger maximum fragment length for large payloads",
                "Use a UR type made of lowercase letters, digits and dashes",
            ],
            TransferError::Decode { .. } => vec![
                "Restart the scan and capture the animation again",
                "Check the displaying device is showing a single transmission",
            ],
            TransferError::Source { .. } => vec![
                "Check the camera is connected and not in use",
                "Attach a new code source to the scan connection",
                "Check camera permissions",
            ],
            TransferError::InvalidFrameRate { .. } => {
                vec!["Use a finite frame rate greater than zero"]
            }
            TransferError::Config { .. } => vec![
                "Check the configuration file is valid YAML",
                "Remove unknown configuration keys",
                "Compare against the documented defaults",
            ],
            TransferError::ChannelClosed { .. } => {
                vec!["Create a new connection", "Keep the connection alive while using it"]
            }
        }
    }

    /// Helper constructor for encoder construction errors.
    pub fn codec(source: CodecError) -> Self {
        TransferError::Codec { source }
    }

    /// Helper constructor for decode-terminal errors.
    pub fn decode(source: CodecError) -> Self {
        TransferError::Decode { source }
    }

    /// Helper constructor for source failures.
    pub fn source_failed(reason: impl Into<String>) -> Self {
        TransferError::Source { reason: reason.into(), source: None }
    }

    /// Helper constructor for source failures with an underlying cause.
    pub fn source_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        TransferError::Source { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for configuration errors.
    pub fn config_error(context: impl Into<String>, details: impl Into<String>) -> Self {
        TransferError::Config { context: context.into(), details: details.into() }
    }

    /// Helper constructor for closed driver channels.
    pub fn channel_closed(component: impl Into<String>) -> Self {
        TransferError::ChannelClosed { component: component.into() }
    }
}

impl From<serde_yaml_ng::Error> for TransferError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        TransferError::Config { context: "YAML".to_string(), details: err.to_string() }
    }
}
