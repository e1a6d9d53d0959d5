/// Temp UDP Receiver
///
/// Listens for 18B20 datagrams, prints every event as one JSON line on stdout
/// and logs a device status report periodically.
///
/// Usage: temp_udp_receiver [config.yaml]

use std::env;
use std::sync::Arc;

use anyhow::Context;
use log::{info, warn};
use temp_udp_receiver::utils::{format, logging};
use temp_udp_receiver::{InboundEvent, ReceiverConfig, ReceiverServer, UdpTempServer};
use tokio::signal;
use tokio::sync::mpsc;
use tokio::time::interval;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logger(log::LevelFilter::Info);

    let config = match env::args().nth(1) {
        Some(path) => ReceiverConfig::from_yaml_file(&path)
            .with_context(|| format!("loading configuration from {}", path))?,
        None => ReceiverConfig::default(),
    };

    info!("{}", temp_udp_receiver::info());

    let (tx, mut rx) = mpsc::unbounded_channel::<InboundEvent>();
    let mut server = UdpTempServer::new(config.clone(), Arc::new(tx))?;
    server.start().await.context("starting UDP receiver")?;

    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event.to_json() {
                Ok(line) => println!("{}", line),
                Err(e) => warn!("Cannot serialize {} event: {}", event.event_type(), e),
            }
        }
    });

    match config.status_interval() {
        Some(period) => {
            let mut ticker = interval(period);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => info!("{}", server.status_report()),
                    result = signal::ctrl_c() => {
                        result.context("waiting for Ctrl+C")?;
                        break;
                    }
                }
            }
        }
        None => signal::ctrl_c().await.context("waiting for Ctrl+C")?,
    }

    let stats = server.get_stats();
    server.stop().await?;
    drop(server);
    let _ = printer.await;

    info!(
        "Received {} datagrams ({} bytes) in {}: {} readings ({} with errors), {} heartbeats, {} registrations, {} unrecognized",
        stats.datagrams_received,
        stats.bytes_received,
        format::format_duration(std::time::Duration::from_secs(stats.uptime_seconds)),
        stats.temperature_frames,
        stats.sensor_errors,
        stats.heartbeats,
        stats.registrations,
        stats.unrecognized
    );
    Ok(())
}
