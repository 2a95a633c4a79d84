use datadog_event::{DatadogClient, DatadogConfig, EventHandler};
use edge_runtime::Error;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();

    if let Err(e) = start().await {
        error!(error = %e, "datadog-event stopped with an error");
        std::process::exit(1);
    }
}

async fn start() -> Result<(), Error> {
    let config = DatadogConfig::from_env()?;
    info!(endpoint = %config.endpoint, "recording call events");
    let client = DatadogClient::new(config)?;
    edge_runtime::run(EventHandler::new(client)).await
}
