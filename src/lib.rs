//! # Temp UDP Receiver - 18B20 Telemetry over ModBus-RTU/UDP
//!
//! Field temperature probes (DS18B20 class) send their readings as ModBus-RTU
//! "read holding registers" responses wrapped in UDP datagrams, and share the
//! same port with free-text heartbeat and registration messages. This crate
//! classifies every datagram, decodes temperature frames, and keeps a small
//! liveness table per source address.
//!
//! ## Features
//!
//! - **Heuristic framing**: no delimiter, no length prefix; structure + CRC16 decide
//! - **Fixed-point decoding**: signed tenths of a degree, sentinel fault codes
//! - **Multi-encoding text**: UTF-8, GBK, ASCII and Latin-1 fallback chain
//! - **Liveness tracking**: online/offline derived from last arrival time
//! - **Async receiver**: Tokio UDP server with pluggable event sinks
//!
//! ## Wire Format
//!
//! | Offset | Size | Field | Constraint |
//! |--------|------|-------|------------|
//! | 0 | 1 | device address | 0-247 |
//! | 1 | 1 | function code | 0x03 |
//! | 2 | 1 | byte count | >= 2 |
//! | 3 | 2 | register value | big-endian, tenths of °C |
//! | 5 | n | extra registers | ignored |
//! | last 2 | 2 | CRC16 | little-endian, ModBus polynomial |
//!
//! ## Quick Start
//!
//! ### Decoding a datagram
//!
//! ```rust
//! use temp_udp_receiver::{encode_read_response, InboundEvent, PacketDispatcher};
//!
//! let dispatcher = PacketDispatcher::new();
//! let datagram = encode_read_response(0x01, &[0x00C8]);
//!
//! match dispatcher.dispatch(&datagram, "192.168.1.20:4001") {
//!     InboundEvent::TemperatureReceived { reading, .. } => assert_eq!(reading.celsius, 20.0),
//!     other => panic!("unexpected event: {:?}", other),
//! }
//! ```
//!
//! ### Running the receiver
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use temp_udp_receiver::{ReceiverConfig, ReceiverServer, UdpTempServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//!     let mut server = UdpTempServer::new(ReceiverConfig::default(), Arc::new(tx))?;
//!     server.start().await?;
//!
//!     while let Some(event) = rx.recv().await {
//!         println!("{}", event.to_json()?);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//!   datagram + source address
//!              │
//! ┌─────────────────────────┐
//! │    Packet Dispatcher    │──────────────┐
//! └─────────────────────────┘              │
//!       │ binary first         text second │
//! ┌─────────────────┐        ┌─────────────────┐
//! │ Frame Validator │        │ Text Classifier │
//! │  + CRC16        │        │ (encoding chain)│
//! └─────────────────┘        └─────────────────┘
//!       │                                  │
//! ┌─────────────────┐                      │
//! │ Temp. Decoder   │                      │
//! └─────────────────┘                      │
//!       └──────────────┬───────────────────┘
//!               InboundEvent
//!          ┌───────────┴──────────┐
//!   ┌──────────────┐      ┌──────────────┐
//!   │  Event Sink  │      │   Liveness   │
//!   └──────────────┘      └──────────────┘
//! ```

/// Error types for configuration and socket handling
pub mod error;

/// CRC16 and ModBus-RTU frame validation
pub mod protocol;

/// 18B20 temperature decoding
pub mod temperature;

/// Text heartbeat/registration classification
pub mod text;

/// Datagram classification into events
pub mod dispatcher;

/// Per-source online/offline tracking
pub mod liveness;

/// Receiver configuration
pub mod config;

/// Datagram logging and unknown packet analysis
pub mod logging;

/// Formatting helpers and logger setup
pub mod utils;

/// Tokio UDP receiver
pub mod server;

// Re-export main types for convenience
pub use error::{ReceiverError, ReceiverResult};
pub use protocol::{crc16, encode_read_response, FrameRejection, FrameValidator, ModbusFrame};
pub use temperature::{SensorFault, TemperatureProjection, TemperatureReading, TemperatureStatus};
pub use text::{TextClassifier, TextEncoding, TextKind, TextMessage};
pub use dispatcher::{DispatchOutcome, EventSink, InboundEvent, LogSink, PacketDispatcher};
pub use liveness::{ClientKind, ClientRecord, ClientStatus, LivenessTracker, OFFLINE_THRESHOLD};
pub use config::ReceiverConfig;
pub use logging::{analyze_unknown_packet, LoggingMode, PacketAnalysis, PacketLogger};
pub use server::{DatagramHandler, ReceiverServer, ServerStats, UdpTempServer};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library information
pub fn info() -> String {
    format!("Temp UDP Receiver v{} - 18B20 ModBus-RTU over UDP", VERSION)
}
