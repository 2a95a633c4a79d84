//! Response types

use http::{Response, StatusCode};

use crate::Body;

/// A conversion of self into a `Response<Body>` for various types.
///
/// Implementations for `Response<B> where B: Into<Body>`,
/// `String` and `&str` are provided by default.
pub trait IntoResponse {
    /// Return a translation of `self` into a `Response<Body>`
    fn into_response(self) -> Response<Body>;
}

impl<B> IntoResponse for Response<B>
where
    B: Into<Body>,
{
    fn into_response(self) -> Response<Body> {
        let (parts, body) = self.into_parts();
        Response::from_parts(parts, body.into())
    }
}

impl IntoResponse for String {
    fn into_response(self) -> Response<Body> {
        Response::new(Body::from(self))
    }
}

impl IntoResponse for &str {
    fn into_response(self) -> Response<Body> {
        Response::new(Body::from(self))
    }
}

/// tranformation from the runtime's response type to the wire type
pub(crate) fn into_hyper(response: Response<Body>) -> hyper::Response<hyper::Body> {
    let (parts, body) = response.into_parts();
    hyper::Response::from_parts(parts, body.into())
}

/// Plain text response with the given status, used for runtime-level failures
pub(crate) fn status_response(status: StatusCode, message: impl Into<String>) -> Response<Body> {
    let mut response = Response::new(Body::from(message.into()));
    *response.status_mut() = status;
    response
}
