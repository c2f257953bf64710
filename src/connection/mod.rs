//! Connections: user-facing handles over running display and scan tasks
//!
//! A connection owns the channels of one driver task. Dropping it cancels the
//! task.

pub mod display;
pub mod scan;


pub use display::DisplayConnection;
pub use scan::ScanConnection;
