pub mod model;
pub mod source;

pub use model::{
    CacheLoadControl, DownloadProgress, Header, HttpMethod, NetworkError, NetworkEvent,
    QueryPair, RequestFinished, RequestId, RequestStarted, RequestTimedOut, SslErrors,
};
pub use source::{channel, read_capture, EventReceiver, EventSender};
