//! Sensor link simulator
//!
//! Runs the full pipeline against the loopback transport: a peer connects,
//! subscribes, writes a configuration value, and disconnects again.
//!
//! Usage: `sensor-link-sim [config.json]`, log level via `RUST_LOG`.

use std::sync::Arc;
use std::time::Duration;

use sensor_link::shared::{ConnHandle, ConnParams, CounterSource, Subscription};
use sensor_link::{LinkService, LogInterpreter, LoopbackTransport, PipelineConfig, StartupError};

const PEER: ConnHandle = ConnHandle(1);

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    log::info!("Starting sensor link v{}", sensor_link::shared::VERSION);

    let transport = Arc::new(LoopbackTransport::new());
    let service = LinkService::start(transport.clone(), CounterSource::new(), LogInterpreter, config)?;

    tokio::time::sleep(Duration::from_millis(500)).await;
    transport.connect(
        PEER,
        ConnParams {
            interval: 24,
            latency: 0,
            timeout: 400,
        },
    );
    transport.subscribe(Subscription::Notify);

    tokio::time::sleep(Duration::from_secs(12)).await;
    if let Err(e) = service.config_endpoint().on_write(&[0x01, 0x0A]) {
        log::error!("Configuration write failed: {:?}", e);
    }

    tokio::time::sleep(Duration::from_secs(10)).await;
    transport.disconnect(PEER, 0x13);
    transport.recycle(PEER);
    tokio::time::sleep(Duration::from_millis(100)).await;

    log::info!("Statistics: {}", service.stats().to_json());
    service.shutdown();
    Ok(())
}
