mod server;

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use devicehub_broker::Broker;
use devicehub_core::{
    bootstrap::{init_services, load_config},
    logging,
};

use server::DeviceHubServer;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load and validate configuration
    let config = load_config()?;

    // 2. Initialize logging
    logging::init_logging(&config.logging)?;
    info!("DeviceHub server starting...");
    info!("HTTP address: {}", config.http_address());

    // 3. Start the notification broker
    let (broker, broker_handle) = Broker::start(&config.broker);

    // 4. Initialize services, publishing through the broker
    let services = init_services(&config, Arc::new(broker.clone()))?;

    // 5. Serve until a shutdown signal arrives
    DeviceHubServer::new(config, services, broker, broker_handle)
        .start()
        .await
}
