//! Inbound request adaptations
//!
//! The runtime buffers every inbound body and hands handlers a plain
//! `http::Request<Body>`. Per-invocation data is exposed through
//! the [`RequestExt`](trait.RequestExt.html) extension methods.
use crate::Body;
use http::header::HeaderName;
use tracing::warn;

/// Type alias for `http::Request`s with a fixed [`Body`](enum.Body.html) type
pub type Request = http::Request<Body>;

/// Request id assigned by the runtime, stored in request extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RequestId(pub(crate) String);

/// Extension methods for `http::Request<Body>` values
pub trait RequestExt {
    /// Return the id the runtime assigned to this invocation
    ///
    /// This is the inbound `x-request-id` header when the caller sent one,
    /// otherwise a freshly generated identifier.
    fn request_id(&self) -> Option<&str>;
}

impl RequestExt for Request {
    fn request_id(&self) -> Option<&str> {
        self.extensions().get::<RequestId>().map(|id| id.0.as_str())
    }
}

/// Buffers a hyper request into a [`Request`](type.Request.html),
/// tagging it with a request id.
///
/// A body that cannot be read is replaced with [`Body::Empty`]; the handler
/// still runs for the invocation.
pub(crate) async fn from_hyper(req: hyper::Request<hyper::Body>) -> Request {
    let (mut parts, body) = req.into_parts();
    let body = match hyper::body::to_bytes(body).await {
        Ok(bytes) => Body::from_bytes(bytes),
        Err(e) => {
            warn!(error = %e, "failed to read request body");
            Body::Empty
        }
    };

    let id = parts
        .headers
        .get(x_request_id())
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    parts.extensions.insert(RequestId(id));

    http::Request::from_parts(parts, body)
}

pub(crate) fn x_request_id() -> HeaderName {
    HeaderName::from_static("x-request-id")
}
