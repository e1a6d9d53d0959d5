/// UDP receiver
///
/// Glue between a UDP socket and the decoding core. Each datagram is handled
/// to completion before the next is read: it is logged, dispatched, recorded
/// in the liveness table and published to the event sink.

use async_trait::async_trait;
use log::{debug, error, info, warn};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio::net::UdpSocket;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::ReceiverConfig;
use crate::dispatcher::{EventSink, InboundEvent, PacketDispatcher};
use crate::error::{ReceiverError, ReceiverResult};
use crate::liveness::{ClientStatus, LivenessTracker};
use crate::logging::PacketLogger;
use crate::utils::format_device_status;

/// Largest possible UDP payload
const MAX_DATAGRAM_SIZE: usize = 65_535;

/// Receiver server trait
#[async_trait]
pub trait ReceiverServer: Send + Sync {
    /// Bind the socket and start the receive loop
    async fn start(&mut self) -> ReceiverResult<()>;

    /// Stop the receive loop and release the socket
    async fn stop(&mut self) -> ReceiverResult<()>;

    /// Check if server is running
    fn is_running(&self) -> bool;

    /// Get server statistics
    fn get_stats(&self) -> ServerStats;
}

/// Receiver statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerStats {
    pub datagrams_received: u64,
    pub bytes_received: u64,
    pub temperature_frames: u64,
    /// Readings with status `error`
    pub sensor_errors: u64,
    pub heartbeats: u64,
    pub registrations: u64,
    pub unrecognized: u64,
    pub uptime_seconds: u64,
}

impl ServerStats {
    fn count(&mut self, data_len: usize, event: &InboundEvent) {
        self.datagrams_received += 1;
        self.bytes_received += data_len as u64;
        match event {
            InboundEvent::TemperatureReceived { reading, .. } => {
                self.temperature_frames += 1;
                if !reading.is_normal() {
                    self.sensor_errors += 1;
                }
            }
            InboundEvent::Heartbeat { .. } => self.heartbeats += 1,
            InboundEvent::Registration { .. } => self.registrations += 1,
            InboundEvent::Unrecognized { .. } => self.unrecognized += 1,
        }
    }
}

/// Per-datagram processing shared by all receive workers
pub struct DatagramHandler {
    dispatcher: PacketDispatcher,
    liveness: Arc<LivenessTracker>,
    sink: Arc<dyn EventSink>,
    logger: PacketLogger,
    stats: Mutex<ServerStats>,
}

impl DatagramHandler {
    pub fn new(
        dispatcher: PacketDispatcher,
        liveness: Arc<LivenessTracker>,
        sink: Arc<dyn EventSink>,
        logger: PacketLogger,
    ) -> Self {
        Self {
            dispatcher,
            liveness,
            sink,
            logger,
            stats: Mutex::new(ServerStats::default()),
        }
    }

    pub fn from_config(config: &ReceiverConfig, sink: Arc<dyn EventSink>) -> Self {
        Self::new(
            PacketDispatcher::from_config(config),
            Arc::new(LivenessTracker::with_threshold(config.offline_threshold())),
            sink,
            PacketLogger::new(config.logging_mode),
        )
    }

    /// Process a datagram received from `source`
    pub fn handle(&self, data: &[u8], source: SocketAddr) {
        self.handle_at(data, &source.to_string(), Instant::now());
    }

    /// Process a datagram with an explicit arrival time
    pub fn handle_at(&self, data: &[u8], source: &str, arrived: Instant) {
        self.logger.log_datagram(source, data);

        let outcome = self.dispatcher.inspect_at(data, source, chrono::Utc::now());
        self.logger.log_outcome(source, data, &outcome);

        if let Some(kind) = outcome.event.client_kind() {
            self.liveness.record(source, kind, arrived);
        }

        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .count(data.len(), &outcome.event);

        self.sink.publish(outcome.event);
    }

    pub fn liveness(&self) -> &Arc<LivenessTracker> {
        &self.liveness
    }

    pub fn stats(&self) -> ServerStats {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// UDP temperature receiver
pub struct UdpTempServer {
    config: ReceiverConfig,
    handler: Arc<DatagramHandler>,
    shutdown_tx: Option<broadcast::Sender<()>>,
    task: Option<JoinHandle<()>>,
    is_running: Arc<AtomicBool>,
    local_addr: Option<SocketAddr>,
    start_time: Option<Instant>,
}

impl UdpTempServer {
    /// Create a server; nothing is bound until [`ReceiverServer::start`]
    pub fn new(config: ReceiverConfig, sink: Arc<dyn EventSink>) -> ReceiverResult<Self> {
        config.validate()?;
        let handler = Arc::new(DatagramHandler::from_config(&config, sink));

        Ok(Self {
            config,
            handler,
            shutdown_tx: None,
            task: None,
            is_running: Arc::new(AtomicBool::new(false)),
            local_addr: None,
            start_time: None,
        })
    }

    pub fn config(&self) -> &ReceiverConfig {
        &self.config
    }

    /// Address actually bound, useful with port 0
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn liveness(&self) -> Arc<LivenessTracker> {
        Arc::clone(self.handler.liveness())
    }

    /// Liveness of every source seen so far
    pub fn client_status(&self) -> BTreeMap<String, ClientStatus> {
        self.handler.liveness().snapshot(Instant::now())
    }

    /// Human-readable device status report
    pub fn status_report(&self) -> String {
        format_device_status(&self.client_status())
    }

    async fn receive_loop(
        socket: UdpSocket,
        handler: Arc<DatagramHandler>,
        mut shutdown_rx: broadcast::Receiver<()>,
        is_running: Arc<AtomicBool>,
    ) {
        let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    debug!("Shutdown signal received");
                    break;
                }

                result = socket.recv_from(&mut buffer) => {
                    match result {
                        Ok((len, source)) => handler.handle(&buffer[..len], source),
                        Err(e) => {
                            // ICMP errors from earlier sends surface here; the socket stays usable
                            warn!("UDP receive error: {}", e);
                        }
                    }
                }
            }
        }

        is_running.store(false, Ordering::SeqCst);
        info!("UDP receive loop stopped");
    }
}

#[async_trait]
impl ReceiverServer for UdpTempServer {
    async fn start(&mut self) -> ReceiverResult<()> {
        if self.is_running() {
            return Err(ReceiverError::internal("Server is already running"));
        }

        let socket = UdpSocket::bind(self.config.bind_address).await.map_err(|e| {
            error!("Failed to bind UDP socket on {}: {}", self.config.bind_address, e);
            ReceiverError::io(format!("Cannot bind {}: {}", self.config.bind_address, e))
        })?;
        let local_addr = socket.local_addr()?;

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        self.is_running.store(true, Ordering::SeqCst);

        let task = tokio::spawn(Self::receive_loop(
            socket,
            Arc::clone(&self.handler),
            shutdown_rx,
            Arc::clone(&self.is_running),
        ));

        self.shutdown_tx = Some(shutdown_tx);
        self.task = Some(task);
        self.local_addr = Some(local_addr);
        self.start_time = Some(Instant::now());

        info!("🚀 UDP temperature receiver listening on {}", local_addr);
        Ok(())
    }

    async fn stop(&mut self) -> ReceiverResult<()> {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }

        if let Some(task) = self.task.take() {
            task.await
                .map_err(|e| ReceiverError::internal(format!("Receive loop panicked: {}", e)))?;
        }

        self.is_running.store(false, Ordering::SeqCst);
        self.local_addr = None;
        info!("UDP temperature receiver stopped");
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    fn get_stats(&self) -> ServerStats {
        let mut stats = self.handler.stats();
        stats.uptime_seconds = self.start_time.map_or(0, |t| t.elapsed().as_secs());
        stats
    }
}

impl Drop for UdpTempServer {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::liveness::ClientKind;
    use crate::protocol::encode_read_response;
    use tokio::sync::mpsc;

    fn handler() -> (DatagramHandler, mpsc::UnboundedReceiver<InboundEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handler = DatagramHandler::new(
            PacketDispatcher::new(),
            Arc::new(LivenessTracker::new()),
            Arc::new(tx),
            PacketLogger::default(),
        );
        (handler, rx)
    }

    #[test]
    fn test_handler_publishes_and_tracks() {
        let (handler, mut rx) = handler();
        let t0 = Instant::now();

        handler.handle_at(&encode_read_response(1, &[0x00C8]), "10.0.0.1:1000", t0);
        handler.handle_at(&encode_read_response(1, &[0x7FFF]), "10.0.0.1:1000", t0);
        handler.handle_at(b"heartbeat", "10.0.0.2:1000", t0);
        handler.handle_at(b"register", "10.0.0.3:1000", t0);
        handler.handle_at(&[0xFF, 0xFF], "10.0.0.4:1000", t0);

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(events.len(), 5);
        assert!(matches!(events[0], InboundEvent::TemperatureReceived { .. }));
        assert!(matches!(events[4], InboundEvent::Unrecognized { .. }));

        let snapshot = handler.liveness().snapshot(t0);
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot["10.0.0.1:1000"].kind, ClientKind::TemperatureSensor);
        assert_eq!(snapshot["10.0.0.2:1000"].kind, ClientKind::Heartbeat);
        assert_eq!(snapshot["10.0.0.3:1000"].kind, ClientKind::Registration);
        assert!(!snapshot.contains_key("10.0.0.4:1000"));

        let stats = handler.stats();
        assert_eq!(stats.datagrams_received, 5);
        assert_eq!(stats.temperature_frames, 2);
        assert_eq!(stats.sensor_errors, 1);
        assert_eq!(stats.heartbeats, 1);
        assert_eq!(stats.registrations, 1);
        assert_eq!(stats.unrecognized, 1);
        assert_eq!(stats.bytes_received, 7 + 7 + 9 + 8 + 2);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ReceiverConfig {
            min_frame_len: 2,
            ..Default::default()
        };
        assert!(UdpTempServer::new(config, Arc::new(crate::dispatcher::LogSink)).is_err());
    }
}
