//! Activity Node Model
//!
//! Every row of the activity tree is one `NodeKind`. Rendering concerns
//! (text, tooltip, actions) dispatch on the kind in a single place each,
//! instead of being spread over per-row types.
//!
//! Shape of one request in the tree:
//!
//! ```text
//! Request            "{id} {METHOD} {url}"
//! ├── RequestDetail  "Request"
//! │   ├── Detail     Operation / Thread / Initiator / ID / Cache (...)
//! │   ├── Group      "Query"    -> Detail per parameter
//! │   ├── Group      "Headers"  -> Detail per header
//! │   └── Group      "Content"  -> Detail "Data" (POST/PUT only)
//! ├── SslErrors      "SSL errors" -> Detail per error
//! └── Reply          "Reply"
//!     ├── Detail     Status / Error Code / Error / Cache (result)
//!     └── Group      "Headers"  -> Detail per header
//! ```

use crate::activity::actions::RowAction;
use crate::common::utils::{find_header, format_progress};
use crate::events::model::{
    Header, HttpMethod, QueryPair, RequestFinished, RequestId, RequestStarted,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Width the label column of a detail row is padded to
const LABEL_WIDTH: usize = 30;

// ==================== Status ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    Complete,
    Error,
    Timeout,
    Canceled,
}

impl RequestStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }

    /// Terminal statuses that come with a reply subtree
    pub fn has_reply(self) -> bool {
        matches!(
            self,
            RequestStatus::Complete | RequestStatus::Error | RequestStatus::Canceled
        )
    }

    /// Status a finished reply resolves to
    pub fn from_finished(finished: &RequestFinished) -> Self {
        if finished.error.is_canceled() {
            RequestStatus::Canceled
        } else if finished.error.is_error() {
            RequestStatus::Error
        } else {
            RequestStatus::Complete
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let label = match self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::Complete => "COMPLETE",
            RequestStatus::Error => "ERROR",
            RequestStatus::Timeout => "TIMEOUT",
            RequestStatus::Canceled => "CANCELED",
        };
        f.write_str(label)
    }
}

// ==================== Records ====================

/// One logical network request, the top-level row of the tree
#[derive(Debug, Clone, PartialEq)]
pub struct RequestRecord {
    pub id: RequestId,
    pub url: url::Url,
    pub method: HttpMethod,
    pub started_at: DateTime<Utc>,
    /// Milliseconds from start to the finished event
    pub elapsed_ms: Option<i64>,
    pub status: RequestStatus,
    pub headers: Vec<Header>,
    pub body: Vec<u8>,
    /// Latest `(received, total)` download progress
    pub progress: Option<(i64, i64)>,
    /// Query pairs shown under the request detail
    pub query: Vec<QueryPair>,
    pub progress_events: u32,
    pub ssl_errors: bool,
    pub http_status: Option<u16>,
    pub content_type: String,
}

impl RequestRecord {
    pub fn from_started(
        started: &RequestStarted,
        url: url::Url,
        started_at: DateTime<Utc>,
    ) -> Self {
        let query = started.query_pairs(&url);
        Self {
            id: started.id.clone(),
            url,
            method: started.method.clone(),
            started_at,
            elapsed_ms: None,
            status: RequestStatus::Pending,
            headers: started.headers.clone(),
            body: started.body.clone().into_bytes(),
            query,
            progress: None,
            progress_events: 0,
            ssl_errors: false,
            http_status: None,
            content_type: String::new(),
        }
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn set_progress(&mut self, received: i64, total: i64) {
        self.progress_events = self.progress_events.saturating_add(1);
        self.progress = Some((received, total));
    }

    pub fn apply_finished(&mut self, finished: &RequestFinished, now: DateTime<Utc>) {
        self.status = RequestStatus::from_finished(finished);
        self.elapsed_ms = Some((now - self.started_at).num_milliseconds());
        self.http_status = finished.status_code;
        self.content_type = find_header(&finished.headers, "Content-Type")
            .unwrap_or_default()
            .to_string();
    }

    pub fn set_timed_out(&mut self) {
        self.status = RequestStatus::Timeout;
    }
}

/// A label/value leaf used for headers, query parameters and attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailPair {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    Headers,
    Query,
    Content,
}

impl GroupKind {
    fn caption(self) -> &'static str {
        match self {
            GroupKind::Headers => "Headers",
            GroupKind::Query => "Query",
            GroupKind::Content => "Content",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Invisible parent of all request rows
    Root,
    Request(RequestRecord),
    RequestDetail,
    Reply,
    SslErrors,
    Group(GroupKind),
    Detail(DetailPair),
}

impl NodeKind {
    pub fn text(&self) -> String {
        match self {
            NodeKind::Root => String::new(),
            NodeKind::Request(record) => {
                format!("{} {} {}", record.id, record.method, record.url)
            }
            NodeKind::RequestDetail => "Request".to_string(),
            NodeKind::Reply => "Reply".to_string(),
            NodeKind::SslErrors => "SSL errors".to_string(),
            NodeKind::Group(group) => group.caption().to_string(),
            NodeKind::Detail(pair) => {
                format!("{:width$}: {}", pair.label, pair.value, width = LABEL_WIDTH)
            }
        }
    }

    pub fn tooltip(&self) -> String {
        match self {
            NodeKind::Request(record) => format!(
                "{}\n{} - Status: {} - {} - {} bytes - {} msec - {} replies",
                record.url,
                record.status,
                record
                    .http_status
                    .map(|code| code.to_string())
                    .unwrap_or_else(|| "-1".to_string()),
                record.content_type,
                format_progress(record.progress),
                record
                    .elapsed_ms
                    .map(|ms| ms.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                record.progress_events,
            ),
            other => other.text(),
        }
    }

    pub fn actions(&self) -> &'static [RowAction] {
        match self {
            NodeKind::Request(_) => &RowAction::ALL,
            _ => &[],
        }
    }

    /// Status shown for the row; only request rows carry a lifecycle
    pub fn status(&self) -> RequestStatus {
        match self {
            NodeKind::Request(record) => record.status,
            _ => RequestStatus::Complete,
        }
    }

    pub fn as_request(&self) -> Option<&RequestRecord> {
        match self {
            NodeKind::Request(record) => Some(record),
            _ => None,
        }
    }
}

// ==================== Subtree Builders ====================

/// A detached subtree waiting to be attached to the tree
#[derive(Debug, Clone, PartialEq)]
pub struct Subtree {
    pub kind: NodeKind,
    pub children: Vec<Subtree>,
}

impl Subtree {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
        }
    }

    pub fn child(mut self, child: Subtree) -> Self {
        self.children.push(child);
        self
    }

    pub fn detail(self, label: &str, value: impl Into<String>) -> Self {
        self.child(Subtree::new(NodeKind::Detail(DetailPair {
            label: label.to_string(),
            value: value.into(),
        })))
    }

    fn group<'a>(kind: GroupKind, pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        pairs
            .into_iter()
            .fold(Subtree::new(NodeKind::Group(kind)), |group, (label, value)| {
                group.detail(label, value)
            })
    }

    /// A request row with its static request-detail subtree.
    pub fn request(record: RequestRecord, started: &RequestStarted) -> Self {
        let detail = Subtree::request_detail(started, &record.query);
        Subtree::new(NodeKind::Request(record)).child(detail)
    }

    pub fn request_detail(started: &RequestStarted, query: &[QueryPair]) -> Self {
        let mut detail = Subtree::new(NodeKind::RequestDetail)
            .detail("Operation", started.method.as_str())
            .detail("Thread", started.thread.clone())
            .detail(
                "Initiator",
                started
                    .initiator
                    .as_deref()
                    .filter(|name| !name.is_empty())
                    .unwrap_or("unknown"),
            );
        if let Some(initiator_id) = started.initiator_request_id.as_deref() {
            if !initiator_id.is_empty() {
                detail = detail.detail("ID", initiator_id);
            }
        }
        detail = detail
            .detail("Cache (control)", started.cache_load.description())
            .detail(
                "Cache (save)",
                if started.cache_save {
                    "Can store result in cache"
                } else {
                    "Result cannot be stored in cache"
                },
            );

        if !query.is_empty() {
            detail = detail.child(Subtree::group(
                GroupKind::Query,
                query.iter().map(|q| (q.name.as_str(), q.value.as_str())),
            ));
        }
        detail = detail.child(Subtree::group(
            GroupKind::Headers,
            started
                .headers
                .iter()
                .map(|h| (h.name.as_str(), h.value.as_str())),
        ));
        if started.method.carries_body() {
            detail = detail.child(Subtree::group(
                GroupKind::Content,
                [("Data", started.body.as_str())],
            ));
        }
        detail
    }

    pub fn reply(finished: &RequestFinished) -> Self {
        let mut reply = Subtree::new(NodeKind::Reply).detail(
            "Status",
            finished
                .status_code
                .map(|code| code.to_string())
                .unwrap_or_default(),
        );
        if finished.error.is_error() {
            reply = reply
                .detail("Error Code", finished.error.code().to_string())
                .detail("Error", finished.error_message.clone());
        }
        reply
            .detail(
                "Cache (result)",
                if finished.from_cache {
                    "Used entry from cache"
                } else {
                    "Read from network"
                },
            )
            .child(Subtree::group(
                GroupKind::Headers,
                finished
                    .headers
                    .iter()
                    .map(|h| (h.name.as_str(), h.value.as_str())),
            ))
    }

    pub fn ssl_errors(errors: &[String]) -> Self {
        errors
            .iter()
            .fold(Subtree::new(NodeKind::SslErrors), |group, error| {
                group.detail("Error", error.clone())
            })
    }
}
