use std::{env, fmt, time::Duration};

use thiserror::Error;

/// Default Events API endpoint
pub const DEFAULT_EVENTS_URL: &str = "https://api.datadoghq.com/api/v1/events";
const DEFAULT_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set to a non-empty value")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {name}")]
    Invalid { name: &'static str, value: String },
}

/// Credentials and endpoint used to talk to the Events API.
///
/// Loaded once at startup; the keys are never written to logs.
#[derive(Clone, PartialEq, Eq)]
pub struct DatadogConfig {
    pub api_key: String,
    pub app_key: String,
    pub endpoint: String,
    pub timeout: Duration,
}

impl fmt::Debug for DatadogConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatadogConfig")
            .field("api_key", &"<redacted>")
            .field("app_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl DatadogConfig {
    pub fn new(api_key: impl Into<String>, app_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            app_key: app_key.into(),
            endpoint: DEFAULT_EVENTS_URL.to_owned(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }

    /// Point the client at another Events API endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Read `DD_API_KEY`, `DD_APP_KEY` and the optional `DD_EVENTS_URL`
    /// and `DD_TIMEOUT_MS` from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };
        let mut config = Self::new(required("DD_API_KEY")?, required("DD_APP_KEY")?);

        if let Some(endpoint) = lookup("DD_EVENTS_URL").filter(|v| !v.trim().is_empty()) {
            config.endpoint = endpoint;
        }
        if let Some(value) = lookup("DD_TIMEOUT_MS") {
            let ms = value.trim().parse::<u64>().map_err(|_| ConfigError::Invalid {
                name: "DD_TIMEOUT_MS",
                value,
            })?;
            config.timeout = Duration::from_millis(ms);
        }
        Ok(config)
    }
}
