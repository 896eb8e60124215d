//! Airlift agent: sensors in, packets out
//!
//! Wires the closed adapter set, the delivery channel, and the scheduler
//! loop together from command-line configuration, then runs forever. The
//! loop itself never exits on failure; stopping the process is the
//! operator's job.

mod config;
mod sim;

use clap::Parser;

use airlift_core::adapters::{Bme280Adapter, Pm25Adapter, Sgp40Adapter};
use airlift_core::time::SystemTime;
use airlift_core::{DeliveryChannel, Endpoints, Scheduler, SensorRegistry};
use airlift_transport::{HostLink, HttpConfig, HttpTransport};

use config::AgentArgs;
use sim::{SimBme280, SimPm25, SimSgp40};

/// Outbound queue capacity in packets
///
/// Eight 25-reading packets is a few minutes of collector outage before the
/// oldest data starts going overboard.
const QUEUE_CAPACITY: usize = 8;

fn main() {
    let args = AgentArgs::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(args.log_filter()),
    )
    .init();

    log::info!("airlift {} starting", airlift_core::VERSION);

    let transport = match HttpTransport::new(
        HttpConfig::new(args.collector.as_str()).timeout_secs(args.timeout_secs),
    ) {
        Ok(transport) => transport,
        Err(e) => {
            log::error!("invalid collector configuration: {e}");
            std::process::exit(2);
        }
    };

    let endpoints = Endpoints {
        packet_url: transport.endpoint(&args.packet_path),
        reference_url: transport.endpoint(&args.reference_path),
    };
    log::info!("collector: {}", endpoints.packet_url);

    // Registration order is dependency order: the SGP40 compensates with the
    // BME280's temperature and humidity.
    let mut registry = SensorRegistry::new();
    registry.register(Box::new(Bme280Adapter::new(Ok(SimBme280::new()))));
    registry.register(Box::new(Sgp40Adapter::new(Ok(SimSgp40::new()))));
    registry.register(Box::new(Pm25Adapter::new(Ok(SimPm25::new()))));
    log::info!(
        "sensors: {}/{} connected",
        registry.connected_count(),
        registry.len()
    );

    // Wall clock throughout so packet timestamps are absolute; drift math
    // and deadlines only ever subtract nearby values.
    let delivery = DeliveryChannel::new(HostLink::new(), transport, SystemTime, endpoints)
        .with_policy(args.retry_policy());

    let mut scheduler: Scheduler<_, _, _, QUEUE_CAPACITY> = Scheduler::new(
        registry,
        delivery,
        SystemTime,
        args.scheduler_config(),
    );

    scheduler.run()
}
