#![warn(missing_docs)]

//! A minimal runtime for edge-deployed HTTP request handlers.
//!
//! The runtime accepts inbound requests, hands each one to a [`Handler`] along
//! with a per-invocation [`Context`], and writes back whatever the handler
//! returns. Work that must outlive the response is scheduled with
//! [`Context::wait_until`] and drained before the process exits.
//!
//! ```rust,no_run
//! use edge_runtime::{handler_fn, run, Context, Error, IntoResponse, Request};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     run(handler_fn(hello)).await
//! }
//!
//! async fn hello(_: Request, _: Context) -> Result<impl IntoResponse, Error> {
//!     Ok("hello")
//! }
//! ```

use std::{
    convert::Infallible,
    future::Future,
    net::TcpListener,
    time::Duration,
};

use http::{header::HeaderValue, StatusCode};
use hyper::{
    service::{make_service_fn, service_fn},
    Server,
};
use tracing::{error, info, info_span, warn};
use tracing_futures::Instrument;

mod body;
mod config;
mod context;
pub mod request;
mod response;

pub use crate::{
    body::Body,
    config::{Config, ConfigError},
    context::{Background, Context},
    request::{Request, RequestExt},
    response::IntoResponse,
};

/// Error type that handlers may result in
pub type Error = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Functions acting as request handlers must conform to this type.
pub trait Handler {
    /// The type of response a handler returns
    type Response: IntoResponse;
    /// The type of error a handler may fail with
    type Error: Into<Error>;
    /// The future returned by `call`
    type Fut: Future<Output = Result<Self::Response, Self::Error>>;

    /// Process an inbound request
    fn call(&mut self, request: Request, context: Context) -> Self::Fut;
}

/// Returns a new `HandlerFn` with the given closure.
pub fn handler_fn<F>(f: F) -> HandlerFn<F> {
    HandlerFn { f }
}

/// A `Handler` implemented by a closure.
#[derive(Clone, Debug)]
pub struct HandlerFn<F> {
    f: F,
}

impl<F, R, Fut, E> Handler for HandlerFn<F>
where
    F: Fn(Request, Context) -> Fut,
    Fut: Future<Output = Result<R, E>>,
    R: IntoResponse,
    E: Into<Error>,
{
    type Response = R;
    type Error = E;
    type Fut = Fut;

    fn call(&mut self, request: Request, context: Context) -> Self::Fut {
        (self.f)(request, context)
    }
}

/// Starts the runtime and begins serving requests with the provided handler.
///
/// Configuration is read from the environment. The server runs until the
/// process receives Ctrl-C or SIGTERM.
pub async fn run<H>(handler: H) -> Result<(), Error>
where
    H: Handler + Clone + Send + 'static,
    H::Fut: Send + 'static,
    H::Response: Send,
    H::Error: Send,
{
    let config = Config::from_env()?;
    run_with(config, handler, shutdown_signal()).await
}

/// Serve `handler` on `config.addr` until `shutdown` resolves.
pub async fn run_with<H, S>(config: Config, handler: H, shutdown: S) -> Result<(), Error>
where
    H: Handler + Clone + Send + 'static,
    H::Fut: Send + 'static,
    H::Response: Send,
    H::Error: Send,
    S: Future<Output = ()>,
{
    let listener = TcpListener::bind(config.addr)?;
    serve(listener, &config, handler, shutdown).await
}

/// Serve `handler` on an already bound listener until `shutdown` resolves.
///
/// Once the server has stopped accepting connections, background work
/// scheduled through [`Context::wait_until`] is given up to
/// `config.shutdown_grace` to finish.
pub async fn serve<H, S>(listener: TcpListener, config: &Config, handler: H, shutdown: S) -> Result<(), Error>
where
    H: Handler + Clone + Send + 'static,
    H::Fut: Send + 'static,
    H::Response: Send,
    H::Error: Send,
    S: Future<Output = ()>,
{
    let background = Background::new();
    let request_timeout = config.request_timeout;

    let make_svc = {
        let background = background.clone();
        make_service_fn(move |_| {
            let handler = handler.clone();
            let background = background.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |req| {
                    invoke(handler.clone(), req, background.clone(), request_timeout)
                }))
            }
        })
    };

    let server = Server::from_tcp(listener)?.serve(make_svc);
    info!(addr = %server.local_addr(), "listening");
    server.with_graceful_shutdown(shutdown).await?;

    info!(pending = background.pending(), "server stopped, draining background tasks");
    if tokio::time::timeout(config.shutdown_grace, background.drain())
        .await
        .is_err()
    {
        warn!(
            pending = background.pending(),
            "shutdown grace period elapsed with background tasks still running"
        );
    }
    Ok(())
}

async fn invoke<H>(
    mut handler: H,
    req: hyper::Request<hyper::Body>,
    background: Background,
    request_timeout: Duration,
) -> Result<hyper::Response<hyper::Body>, Infallible>
where
    H: Handler,
{
    let request = request::from_hyper(req).await;
    let request_id = request.request_id().unwrap_or_default().to_owned();
    let span = info_span!("invocation", request_id = %request_id);
    let deadline = tokio::time::Instant::now() + request_timeout;
    let context = Context::new(request_id.clone(), deadline, background);

    let mut reply = async move {
        match tokio::time::timeout_at(deadline, handler.call(request, context)).await {
            Ok(Ok(reply)) => reply.into_response(),
            Ok(Err(e)) => {
                let e: Error = e.into();
                error!(error = %e, "handler failed");
                response::status_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            Err(_) => {
                error!(timeout_ms = request_timeout.as_millis() as u64, "handler timed out");
                response::status_response(StatusCode::GATEWAY_TIMEOUT, "handler timed out")
            }
        }
    }
    .instrument(span)
    .await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        reply.headers_mut().insert(request::x_request_id(), value);
    }
    Ok(response::into_hyper(reply))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            futures_util::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                futures_util::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = futures_util::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
