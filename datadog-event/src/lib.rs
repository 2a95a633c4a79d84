//! Records a Datadog event for every request an edge deployment receives.
//!
//! Each invocation posts a fixed `WorkerCalled` event to the Events API and
//! returns the API's reply. When that post fails, a `LogCallError` event
//! describing the failure is sent in the background and the caller receives
//! a fixed failure message instead.

pub mod client;
pub mod config;
pub mod event;
pub mod handler;

pub use crate::{
    client::{DatadogClient, EventApi, EventApiError},
    config::{ConfigError, DatadogConfig},
    event::{AlertType, Event, Priority},
    handler::{EventHandler, FAILURE_BODY},
};
