//! End-to-end tests: a real edge runtime in front of a mocked Events API.

use std::{
    net::TcpListener,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use datadog_event::{DatadogClient, DatadogConfig, EventHandler, FAILURE_BODY};
use edge_runtime::{serve, Config};
use mockito::Matcher;
use serde_json::json;
use tokio::{sync::oneshot, task::JoinHandle};

struct TestServer {
    url: String,
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl TestServer {
    fn start(events_url: String) -> Self {
        let config = DatadogConfig::new("test-api-key", "test-app-key").with_endpoint(events_url);
        Self::start_with(config, Config::default())
    }

    fn start_with(config: DatadogConfig, runtime: Config) -> Self {
        let handler = EventHandler::new(DatadogClient::new(config).expect("failed to build client"));

        let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind");
        let url = format!("http://{}", listener.local_addr().expect("no local addr"));
        let (stop, rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            serve(listener, &runtime, handler, async {
                let _ = rx.await;
            })
            .await
            .expect("server failed");
        });
        Self { url, stop, task }
    }

    /// Stops the server and waits for background work to drain.
    async fn shutdown(self) {
        self.stop.send(()).expect("server already stopped");
        tokio::time::timeout(Duration::from_secs(5), self.task)
            .await
            .expect("shutdown took too long")
            .expect("server task panicked");
    }
}

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .build()
        .expect("failed to build client")
}

#[tokio::test]
async fn forwards_accepted_reply() {
    let mut events = mockito::Server::new_async().await;
    let call = events
        .mock("POST", "/api/v1/events")
        .match_query(Matcher::UrlEncoded("api_key".into(), "test-api-key".into()))
        .match_body(Matcher::PartialJson(json!({ "title": "WorkerCalled" })))
        .with_status(202)
        .with_body("OK")
        .expect(1)
        .create_async()
        .await;

    let server = TestServer::start(format!("{}/api/v1/events", events.url()));
    let reply = http_client()
        .post(format!("{}/whatever?x=1", server.url))
        .body("ignored")
        .send()
        .await
        .expect("request failed");

    assert_eq!(reply.status().as_u16(), 202);
    assert_eq!(reply.text().await.expect("failed to read body"), "OK");

    server.shutdown().await;
    call.assert_async().await;
}

#[tokio::test]
async fn rejected_call_event_reports_an_error_event() {
    let mut events = mockito::Server::new_async().await;
    let call = events
        .mock("POST", "/api/v1/events")
        .match_query(Matcher::Any)
        .match_body(Matcher::PartialJson(json!({ "title": "WorkerCalled" })))
        .with_status(500)
        .with_body("down")
        .expect(1)
        .create_async()
        .await;
    let report = events
        .mock("POST", "/api/v1/events")
        .match_query(Matcher::Any)
        .match_body(Matcher::Json(json!({
            "title": "LogCallError",
            "text": "events API responded with 500 Internal Server Error: down",
            "priority": "high",
            "alert_type": "error",
        })))
        .with_status(202)
        .expect(1)
        .create_async()
        .await;

    let server = TestServer::start(format!("{}/api/v1/events", events.url()));
    let reply = http_client()
        .get(format!("{}/", server.url))
        .send()
        .await
        .expect("request failed");

    assert_eq!(reply.status().as_u16(), 200);
    assert_eq!(reply.text().await.expect("failed to read body"), FAILURE_BODY);

    server.shutdown().await;
    call.assert_async().await;
    report.assert_async().await;
}

#[tokio::test]
async fn unreachable_events_api_still_answers() {
    let addr = TcpListener::bind("127.0.0.1:0")
        .and_then(|l| l.local_addr())
        .expect("failed to reserve port");

    let server = TestServer::start(format!("http://{}/api/v1/events", addr));
    let reply = http_client()
        .get(format!("{}/", server.url))
        .send()
        .await
        .expect("request failed");

    assert_eq!(reply.status().as_u16(), 200);
    assert_eq!(reply.text().await.expect("failed to read body"), FAILURE_BODY);
    server.shutdown().await;
}

#[tokio::test]
async fn stalled_events_api_answers_within_the_request_timeout() {
    // accepts connections and never replies
    let stalled = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind");
    let events_addr = stalled.local_addr().expect("no local addr");
    let connections = Arc::new(AtomicUsize::new(0));
    let accepted = Arc::clone(&connections);
    let acceptor = tokio::spawn(async move {
        let mut open = Vec::new();
        while let Ok((stream, _)) = stalled.accept().await {
            accepted.fetch_add(1, Ordering::SeqCst);
            open.push(stream);
        }
    });

    let mut config = DatadogConfig::new("test-api-key", "test-app-key")
        .with_endpoint(format!("http://{}/api/v1/events", events_addr));
    config.timeout = Duration::from_secs(1);
    let runtime = Config {
        request_timeout: Duration::from_millis(300),
        ..Config::default()
    };

    let server = TestServer::start_with(config, runtime);
    let reply = http_client()
        .get(format!("{}/", server.url))
        .send()
        .await
        .expect("request failed");

    assert_eq!(reply.status().as_u16(), 200);
    assert_eq!(reply.text().await.expect("failed to read body"), FAILURE_BODY);

    // shutdown waits for the error event to give up
    server.shutdown().await;
    assert_eq!(connections.load(Ordering::SeqCst), 2);
    acceptor.abort();
}
