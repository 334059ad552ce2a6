//! Network Lifecycle Event Payloads
//!
//! One payload per moment in a request's life, as emitted by the host's
//! network layer. The `NetworkEvent` wrapper is the JSON-lines capture
//! format consumed by the replay tool.

use crate::common::error::EventError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// ==================== Identity ====================

/// Opaque request identifier assigned by the event source.
///
/// Numeric and string ids are both accepted on the wire and compared by their
/// textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for RequestId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRequestId {
    Number(u64),
    Text(String),
}

impl<'de> Deserialize<'de> for RequestId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawRequestId::deserialize(deserializer)? {
            RawRequestId::Number(n) => RequestId::from(n),
            RawRequestId::Text(s) => RequestId::from(s),
        })
    }
}

impl Serialize for RequestId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

// ==================== Request Attributes ====================

/// HTTP operation of a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HttpMethod {
    Head,
    Get,
    Put,
    Post,
    Delete,
    Custom(String),
}

impl HttpMethod {
    pub fn as_str(&self) -> &str {
        match self {
            HttpMethod::Head => "HEAD",
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Custom(verb) => verb,
        }
    }

    /// POST and PUT are the only operations whose body is captured and replayed.
    pub fn carries_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put)
    }
}

impl From<String> for HttpMethod {
    fn from(verb: String) -> Self {
        match verb.trim().to_ascii_uppercase().as_str() {
            "HEAD" => HttpMethod::Head,
            "GET" => HttpMethod::Get,
            "PUT" => HttpMethod::Put,
            "POST" => HttpMethod::Post,
            "DELETE" => HttpMethod::Delete,
            other => HttpMethod::Custom(other.to_string()),
        }
    }
}

impl From<&str> for HttpMethod {
    fn from(verb: &str) -> Self {
        HttpMethod::from(verb.to_string())
    }
}

impl From<HttpMethod> for String {
    fn from(method: HttpMethod) -> Self {
        method.as_str().to_string()
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw header as sent or received, duplicates preserved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Query-string parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPair {
    pub name: String,
    pub value: String,
}

/// How the network layer may use its cache when loading a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheLoadControl {
    AlwaysNetwork,
    #[default]
    PreferNetwork,
    PreferCache,
    AlwaysCache,
}

impl CacheLoadControl {
    pub fn description(self) -> &'static str {
        match self {
            CacheLoadControl::AlwaysNetwork => "Always load from network, do not check cache",
            CacheLoadControl::PreferNetwork => {
                "Load from the network if the cached entry is older than the network entry"
            }
            CacheLoadControl::PreferCache => {
                "Load from cache if available, otherwise load from network"
            }
            CacheLoadControl::AlwaysCache => {
                "Only load from cache, error if no cached entry available"
            }
        }
    }
}

/// Transport-level failure reported with a finished reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkError {
    #[default]
    None,
    ConnectionRefused,
    RemoteHostClosed,
    HostNotFound,
    Timeout,
    OperationCanceled,
    SslHandshakeFailed,
    ContentNotFound,
    Code(i32),
}

impl NetworkError {
    /// Numeric code as reported by the transport
    pub fn code(self) -> i32 {
        match self {
            NetworkError::None => 0,
            NetworkError::ConnectionRefused => 1,
            NetworkError::RemoteHostClosed => 2,
            NetworkError::HostNotFound => 3,
            NetworkError::Timeout => 4,
            NetworkError::OperationCanceled => 5,
            NetworkError::SslHandshakeFailed => 6,
            NetworkError::ContentNotFound => 203,
            NetworkError::Code(code) => code,
        }
    }

    pub fn is_error(self) -> bool {
        self.code() != 0
    }

    pub fn is_canceled(self) -> bool {
        self.code() == NetworkError::OperationCanceled.code()
    }
}

fn default_true() -> bool {
    true
}

// ==================== Payloads ====================

/// A request is about to be sent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestStarted {
    pub id: RequestId,
    pub url: String,
    pub method: HttpMethod,
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub thread: String,
    #[serde(default)]
    pub initiator: Option<String>,
    #[serde(default)]
    pub initiator_request_id: Option<String>,
    #[serde(default)]
    pub cache_load: CacheLoadControl,
    #[serde(default = "default_true")]
    pub cache_save: bool,
    /// Explicit query pairs; parsed from the URL when absent
    #[serde(default)]
    pub query: Option<Vec<QueryPair>>,
}

impl RequestStarted {
    pub fn new(id: impl Into<RequestId>, url: impl Into<String>, method: HttpMethod) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            method,
            headers: Vec::new(),
            body: String::new(),
            thread: String::new(),
            initiator: None,
            initiator_request_id: None,
            cache_load: CacheLoadControl::default(),
            cache_save: true,
            query: None,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push(Header::new(name, value));
        self
    }

    pub fn with_body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    /// Parse and check the payload before any node is built from it.
    pub fn validate(&self) -> Result<url::Url, EventError> {
        if self.id.is_empty() {
            return Err(EventError::MissingId);
        }
        if self.url.trim().is_empty() {
            return Err(EventError::MissingUrl(self.id.to_string()));
        }
        if self.method.as_str().is_empty() {
            return Err(EventError::MissingMethod(self.id.to_string()));
        }
        url::Url::parse(self.url.trim()).map_err(|e| EventError::InvalidUrl {
            id: self.id.to_string(),
            reason: e.to_string(),
        })
    }

    /// Query pairs to display, preferring explicit ones over those in the URL.
    pub fn query_pairs(&self, url: &url::Url) -> Vec<QueryPair> {
        match &self.query {
            Some(pairs) => pairs.clone(),
            None => url
                .query_pairs()
                .map(|(name, value)| QueryPair {
                    name: name.into_owned(),
                    value: value.into_owned(),
                })
                .collect(),
        }
    }
}

/// Bytes received so far; `total` is -1 while unknown.
///
/// `received` may pass `total`, e.g. for compressed bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadProgress {
    pub id: RequestId,
    pub received: i64,
    pub total: i64,
}

impl DownloadProgress {
    pub fn validate(&self) -> Result<(), EventError> {
        if self.id.is_empty() {
            return Err(EventError::MissingId);
        }
        if self.received < 0 {
            return Err(EventError::InvalidProgress {
                id: self.id.to_string(),
                received: self.received,
                total: self.total,
            });
        }
        Ok(())
    }
}

/// The reply is complete, failed, or was canceled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestFinished {
    pub id: RequestId,
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub error: NetworkError,
    #[serde(default)]
    pub error_message: String,
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(default)]
    pub from_cache: bool,
}

impl RequestFinished {
    pub fn ok(id: impl Into<RequestId>, status_code: u16) -> Self {
        Self {
            id: id.into(),
            status_code: Some(status_code),
            error: NetworkError::None,
            error_message: String::new(),
            headers: Vec::new(),
            from_cache: false,
        }
    }

    pub fn failed(id: impl Into<RequestId>, error: NetworkError, message: &str) -> Self {
        Self {
            id: id.into(),
            status_code: None,
            error,
            error_message: message.to_string(),
            headers: Vec::new(),
            from_cache: false,
        }
    }

    pub fn validate(&self) -> Result<(), EventError> {
        if self.id.is_empty() {
            return Err(EventError::MissingId);
        }
        Ok(())
    }
}

/// The transport gave up waiting on a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestTimedOut {
    pub id: RequestId,
}

/// TLS problems were reported while the request was in flight
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SslErrors {
    pub id: RequestId,
    pub errors: Vec<String>,
}

impl SslErrors {
    pub fn validate(&self) -> Result<(), EventError> {
        if self.id.is_empty() {
            return Err(EventError::MissingId);
        }
        if self.errors.is_empty() {
            return Err(EventError::EmptySslErrors(self.id.to_string()));
        }
        Ok(())
    }
}

/// Any lifecycle event, tagged by kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NetworkEvent {
    Started(RequestStarted),
    Progress(DownloadProgress),
    Finished(RequestFinished),
    TimedOut(RequestTimedOut),
    SslErrors(SslErrors),
}

impl NetworkEvent {
    pub fn request_id(&self) -> &RequestId {
        match self {
            NetworkEvent::Started(e) => &e.id,
            NetworkEvent::Progress(e) => &e.id,
            NetworkEvent::Finished(e) => &e.id,
            NetworkEvent::TimedOut(e) => &e.id,
            NetworkEvent::SslErrors(e) => &e.id,
        }
    }
}
