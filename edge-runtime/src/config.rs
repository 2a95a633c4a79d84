use std::{env, net::SocketAddr, time::Duration};

use thiserror::Error;

const DEFAULT_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 10_000;

/// Error returned when a runtime setting cannot be parsed
#[derive(Debug, Error)]
#[error("invalid value {value:?} for {name}: {reason}")]
pub struct ConfigError {
    name: &'static str,
    value: String,
    reason: String,
}

/// Settings the runtime reads from its environment at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Address the server binds to
    pub addr: SocketAddr,
    /// Upper bound on a single handler invocation
    pub request_timeout: Duration,
    /// How long shutdown waits for background work to drain
    pub shutdown_grace: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            shutdown_grace: Duration::from_millis(DEFAULT_SHUTDOWN_GRACE_MS),
        }
    }
}

impl Config {
    /// Read the configuration from the process environment.
    ///
    /// `EDGE_ADDR` takes precedence over `PORT`; the timeouts are given in
    /// milliseconds through `EDGE_REQUEST_TIMEOUT_MS` and `EDGE_SHUTDOWN_GRACE_MS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let addr = match (lookup("EDGE_ADDR"), lookup("PORT")) {
            (Some(addr), _) => parse("EDGE_ADDR", &addr)?,
            (None, Some(port)) => SocketAddr::from(([0, 0, 0, 0], parse::<u16>("PORT", &port)?)),
            (None, None) => parse("EDGE_ADDR", DEFAULT_ADDR)?,
        };
        let request_timeout = millis(&lookup, "EDGE_REQUEST_TIMEOUT_MS", DEFAULT_REQUEST_TIMEOUT_MS)?;
        let shutdown_grace = millis(&lookup, "EDGE_SHUTDOWN_GRACE_MS", DEFAULT_SHUTDOWN_GRACE_MS)?;

        Ok(Self {
            addr,
            request_timeout,
            shutdown_grace,
        })
    }
}

fn millis<F>(lookup: &F, name: &'static str, default: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|value| parse::<u64>(name, &value))
        .transpose()
        .map(|ms| Duration::from_millis(ms.unwrap_or(default)))
}

fn parse<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError {
        name,
        value: value.to_owned(),
        reason: e.to_string(),
    })
}
