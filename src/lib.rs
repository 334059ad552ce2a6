//! netscope: live network activity inspector core
//!
//! Lifecycle events from a host's network layer are ingested into a bounded
//! activity tree that renderers observe and filter.

pub mod activity;
pub mod common;
pub mod config;
pub mod events;
pub mod logging;
pub mod session;

pub use activity::{ActivityModel, ActivityTree, Ingest, NodeId, RetentionPolicy};
pub use common::error::{AppError, EventError};
pub use config::InspectorConfig;
pub use events::NetworkEvent;
