//! Session export
//!
//! The activity log is transient; the only way out of the process is a
//! one-way HAR snapshot.

pub mod har;
pub mod har_model;

pub use har::{export_har, snapshot};
