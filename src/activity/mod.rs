pub mod actions;
pub mod clock;
pub mod filter;
pub mod ingest;
pub mod node;
pub mod observer;
pub mod registry;
pub mod retention;
pub mod tree;

pub use actions::{curl_command, DesktopServices, RowAction};
pub use clock::{Clock, ManualClock, SystemClock};
pub use filter::{ActivityFilter, FlatRow};
pub use ingest::{ActivityModel, IgnoreReason, Ingest, PumpSummary};
pub use node::{NodeKind, RequestRecord, RequestStatus, Subtree};
pub use observer::{ChangeAspect, ChangeLog, ModelChange, ModelObserver};
pub use registry::RequestRegistry;
pub use retention::RetentionPolicy;
pub use tree::{ActivityNode, ActivityTree, NodeId, RowStyle, Tone};
