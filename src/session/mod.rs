//! Session state machines
//!
//! Sessions are synchronous and own their codec state exclusively. The
//! drivers in [`crate::driver`] give each session a single owning task and
//! publish what it produces.

pub mod display;
pub mod scan;

pub use display::DisplaySession;
pub use scan::{ScanFeedback, ScanSession};
