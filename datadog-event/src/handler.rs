use std::{convert::Infallible, sync::Arc};

use edge_runtime::{Body, Context, Handler, Request};
use futures_util::future::{BoxFuture, FutureExt};
use http::{
    header::{HeaderValue, CONTENT_TYPE},
    Response,
};
use tracing::{debug, error, warn};

use crate::{
    client::{EventApi, EventApiError},
    event::Event,
};

/// Body returned to the caller when the call event could not be recorded
pub const FAILURE_BODY: &str = "The call event threw an error";

/// Records a call event for every inbound request.
///
/// The inbound request is ignored. On success the Events API reply is handed
/// back to the caller untouched. On failure an error event is scheduled in
/// the background and the caller gets [`FAILURE_BODY`] right away.
pub struct EventHandler<C> {
    client: Arc<C>,
}

impl<C> Clone for EventHandler<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
        }
    }
}

impl<C> EventHandler<C>
where
    C: EventApi + 'static,
{
    pub fn new(client: C) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    pub async fn handle(&self, _request: Request, context: Context) -> Response<Body> {
        // must resolve by the runtime's deadline, or the error event is never sent
        let sent = tokio::time::timeout_at(context.deadline, self.client.send(Event::call()))
            .await
            .unwrap_or_else(|_| Err(EventApiError::Timeout));
        match sent {
            Ok(response) => {
                debug!(status = %response.status(), "call event recorded");
                response
            }
            Err(err) => {
                error!(error = %err, "failed to record call event");
                let report = self.client.send(Event::error(err.to_string()));
                // nobody observes this outcome besides the local log
                context.wait_until(async move {
                    match report.await {
                        Ok(response) => debug!(status = %response.status(), "error event recorded"),
                        Err(e) => warn!(error = %e, "failed to record error event"),
                    }
                });
                failure_response()
            }
        }
    }
}

impl<C> Handler for EventHandler<C>
where
    C: EventApi + 'static,
{
    type Response = Response<Body>;
    type Error = Infallible;
    type Fut = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn call(&mut self, request: Request, context: Context) -> Self::Fut {
        let this = self.clone();
        async move { Ok(this.handle(request, context).await) }.boxed()
    }
}

fn failure_response() -> Response<Body> {
    let mut response = Response::new(Body::from(FAILURE_BODY));
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain;charset=UTF-8"));
    response
}
