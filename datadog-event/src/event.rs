//! Event payloads accepted by the Datadog Events API

use serde::{Deserialize, Serialize};

/// Title of the event recorded on every invocation
pub const CALL_TITLE: &str = "WorkerCalled";
/// Text of the event recorded on every invocation
pub const CALL_TEXT: &str = "This happened because a Worker was called!";
/// Title of the event recorded when the call event could not be delivered
pub const ERROR_TITLE: &str = "LogCallError";

/// Event priority as understood by the Events API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Normal,
    Low,
    High,
}

/// Event severity tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Error,
    Warning,
    Info,
    Success,
}

/// A single event, serialized as the JSON body of an Events API call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub title: String,
    pub text: String,
    pub priority: Priority,
    pub alert_type: AlertType,
}

impl Event {
    /// The event recorded whenever the handler is invoked.
    ///
    /// It carries no request-specific data.
    pub fn call() -> Self {
        Self {
            title: CALL_TITLE.to_owned(),
            text: CALL_TEXT.to_owned(),
            priority: Priority::Normal,
            alert_type: AlertType::Info,
        }
    }

    /// The event recorded when delivering the call event failed
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            title: ERROR_TITLE.to_owned(),
            text: text.into(),
            priority: Priority::High,
            alert_type: AlertType::Error,
        }
    }
}
