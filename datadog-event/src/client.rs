//! Client for the Datadog Events API.

use std::sync::Arc;

use edge_runtime::Body;
use futures_util::future::{BoxFuture, FutureExt};
use http::{
    header::{CONNECTION, CONTENT_LENGTH, CONTENT_TYPE, TRANSFER_ENCODING},
    Response, StatusCode,
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{config::DatadogConfig, event::Event};

const APPLICATION_KEY_HEADER: &str = "DD-APPLICATION-KEY";
const API_KEY_HEADER: &str = "DD-API-KEY";

#[derive(Debug, Error)]
pub enum EventApiError {
    /// The request never produced a response
    #[error("{0}")]
    Network(String),
    #[error("request to the events API timed out")]
    Timeout,
    /// The events API answered with a non-2xx status
    #[error("events API responded with {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl EventApiError {
    fn from_transport(err: reqwest::Error) -> Self {
        // the request url carries the api key
        let err = err.without_url();
        if err.is_timeout() {
            EventApiError::Timeout
        } else {
            EventApiError::Network(err.to_string())
        }
    }
}

/// Anything that can record an [`Event`].
///
/// The returned future owns everything it needs so it can be detached from
/// the invocation that created it.
pub trait EventApi: Send + Sync {
    fn send(&self, event: Event) -> BoxFuture<'static, Result<Response<Body>, EventApiError>>;
}

impl<T> EventApi for Arc<T>
where
    T: EventApi + ?Sized,
{
    fn send(&self, event: Event) -> BoxFuture<'static, Result<Response<Body>, EventApiError>> {
        (**self).send(event)
    }
}

/// reqwest-backed [`EventApi`] talking to the configured endpoint.
///
/// Cloning is cheap and shares the underlying connection pool.
#[derive(Debug, Clone)]
pub struct DatadogClient {
    client: reqwest::Client,
    config: Arc<DatadogConfig>,
}

impl DatadogClient {
    pub fn new(config: DatadogConfig) -> Result<Self, EventApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| EventApiError::Config(e.to_string()))?;

        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    /// Post `event` and return the endpoint's reply on a 2xx status.
    pub async fn post(&self, event: &Event) -> Result<Response<Body>, EventApiError> {
        let body = serde_json::to_vec(event)?;
        debug!(title = %event.title, endpoint = %self.config.endpoint, "posting event");

        let reply = self
            .client
            .post(&self.config.endpoint)
            .query(&[("api_key", self.config.api_key.as_str())])
            .header(CONTENT_TYPE, "application/json")
            .header(APPLICATION_KEY_HEADER, &self.config.app_key)
            .header(API_KEY_HEADER, &self.config.api_key)
            .body(body)
            .send()
            .await
            .map_err(EventApiError::from_transport)?;

        let status = reply.status();
        let mut headers = reply.headers().clone();
        let bytes = reply.bytes().await.map_err(EventApiError::from_transport)?;

        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes).into_owned();
            warn!(%status, title = %event.title, "events API rejected event");
            return Err(EventApiError::Status { status, body });
        }

        // framing is recomputed when the reply is written back out
        for name in &[CONNECTION, CONTENT_LENGTH, TRANSFER_ENCODING] {
            headers.remove(name);
        }
        let mut response = Response::new(Body::from_bytes(bytes));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

impl EventApi for DatadogClient {
    fn send(&self, event: Event) -> BoxFuture<'static, Result<Response<Body>, EventApiError>> {
        let this = self.clone();
        async move { this.post(&event).await }.boxed()
    }
}
