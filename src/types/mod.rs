//! Core types shared by display and scan sessions.
//!
//! - [`Ur`] is the type-tagged payload being transferred
//! - [`FragmentState`] is the per-fragment highlight state both sides publish
//! - [`DisplayFrame`] is what a display session shows at any moment
//! - [`CodeBatch`] is the set of codes seen together in one analysis tick
//! - [`ScanResult`] and [`ScanProgress`] are what a scan session reports
//! - [`FrameRate`] controls display cadence

mod batch;
mod fragment_state;
mod frame;
mod frame_rate;
mod scan_result;
mod ur;

pub use batch::CodeBatch;
pub use fragment_state::FragmentState;
pub use frame::DisplayFrame;
pub use frame_rate::FrameRate;
pub use scan_result::{ScanProgress, ScanResult};
pub use ur::{Ur, is_valid_type};
