/// Packet dispatch
///
/// A single decision procedure turns one datagram into one [`InboundEvent`]:
///
/// 1. frame validation + temperature decoding; a valid frame is always a
///    temperature reading, even if its bytes also read as text;
/// 2. text decoding + classification; heartbeats and registrations become
///    events of their own;
/// 3. anything else is [`InboundEvent::Unrecognized`], carrying the raw bytes
///    so the caller can log them.
///
/// The dispatcher holds no mutable state and performs no I/O or logging.
/// Publishing events and updating liveness is left to collaborators such as
/// [`EventSink`] and [`crate::liveness::LivenessTracker`].

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};

use crate::config::ReceiverConfig;
use crate::liveness::ClientKind;
use crate::protocol::{FrameRejection, FrameValidator};
use crate::temperature::{self, TemperatureReading, DEVICE_TYPE};
use crate::text::{TextClassifier, TextEncoding, TextKind};

/// Default maximum number of characters kept from a text message
pub const DEFAULT_RAW_TEXT_LIMIT: usize = 100;

/// Normalized event produced for every datagram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum InboundEvent {
    TemperatureReceived {
        source_address: String,
        reading: TemperatureReading,
        device_type: String,
        timestamp: DateTime<Utc>,
    },
    Heartbeat {
        source_address: String,
        raw_text: String,
        timestamp: DateTime<Utc>,
    },
    Registration {
        source_address: String,
        raw_text: String,
        timestamp: DateTime<Utc>,
    },
    /// Diagnostic only
    Unrecognized {
        source_address: String,
        raw_bytes: Vec<u8>,
        length: usize,
    },
}

impl InboundEvent {
    pub fn source_address(&self) -> &str {
        match self {
            InboundEvent::TemperatureReceived { source_address, .. }
            | InboundEvent::Heartbeat { source_address, .. }
            | InboundEvent::Registration { source_address, .. }
            | InboundEvent::Unrecognized { source_address, .. } => source_address,
        }
    }

    /// Liveness kind for recognized events, `None` for [`InboundEvent::Unrecognized`]
    pub fn client_kind(&self) -> Option<ClientKind> {
        match self {
            InboundEvent::TemperatureReceived { .. } => Some(ClientKind::TemperatureSensor),
            InboundEvent::Heartbeat { .. } => Some(ClientKind::Heartbeat),
            InboundEvent::Registration { .. } => Some(ClientKind::Registration),
            InboundEvent::Unrecognized { .. } => None,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            InboundEvent::TemperatureReceived { .. } => "temperature_received",
            InboundEvent::Heartbeat { .. } => "heartbeat",
            InboundEvent::Registration { .. } => "registration",
            InboundEvent::Unrecognized { .. } => "unrecognized",
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, InboundEvent::Unrecognized { .. })
    }

    pub fn to_json(&self) -> crate::error::ReceiverResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// The event together with how the dispatcher got there
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    pub event: InboundEvent,
    /// Why the binary interpretation failed, `None` if it succeeded
    pub rejection: Option<FrameRejection>,
    /// Encoding that decoded the text, `None` for binary or undecodable data
    pub encoding: Option<TextEncoding>,
}

/// Stateless datagram classifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketDispatcher {
    validator: FrameValidator,
    classifier: TextClassifier,
    raw_text_limit: usize,
}

impl Default for PacketDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketDispatcher {
    pub fn new() -> Self {
        Self::with_parts(FrameValidator::new(), TextClassifier::new())
    }

    pub fn with_parts(validator: FrameValidator, classifier: TextClassifier) -> Self {
        Self {
            validator,
            classifier,
            raw_text_limit: DEFAULT_RAW_TEXT_LIMIT,
        }
    }

    pub fn from_config(config: &ReceiverConfig) -> Self {
        Self::with_parts(
            FrameValidator::with_min_len(config.min_frame_len),
            TextClassifier::with_encodings(config.encodings.clone()),
        )
        .with_raw_text_limit(config.raw_text_limit)
    }

    /// Maximum characters of text carried in heartbeat and registration events
    pub fn with_raw_text_limit(mut self, limit: usize) -> Self {
        self.raw_text_limit = limit;
        self
    }

    pub fn validator(&self) -> &FrameValidator {
        &self.validator
    }

    pub fn classifier(&self) -> &TextClassifier {
        &self.classifier
    }

    /// Classify one datagram, stamping events with the current time
    pub fn dispatch(&self, data: &[u8], source_address: &str) -> InboundEvent {
        self.dispatch_at(data, source_address, Utc::now())
    }

    /// Classify one datagram with an explicit capture time
    pub fn dispatch_at(
        &self,
        data: &[u8],
        source_address: &str,
        timestamp: DateTime<Utc>,
    ) -> InboundEvent {
        self.inspect_at(data, source_address, timestamp).event
    }

    /// Like [`dispatch_at`](Self::dispatch_at) but also reports the rejection
    /// reason and text encoding for diagnostics
    pub fn inspect_at(
        &self,
        data: &[u8],
        source_address: &str,
        timestamp: DateTime<Utc>,
    ) -> DispatchOutcome {
        let rejection = match self.validator.validate(data) {
            Ok(frame) => {
                let reading = temperature::decode_at(&frame, timestamp);
                return DispatchOutcome {
                    event: InboundEvent::TemperatureReceived {
                        source_address: source_address.to_string(),
                        reading,
                        device_type: DEVICE_TYPE.to_string(),
                        timestamp,
                    },
                    rejection: None,
                    encoding: None,
                };
            }
            Err(rejection) => rejection,
        };

        let message = self.classifier.classify(data);
        let encoding = message.as_ref().map(|m| m.encoding);

        let event = match message {
            Some(message) if message.kind == TextKind::Heartbeat => InboundEvent::Heartbeat {
                source_address: source_address.to_string(),
                raw_text: truncate_chars(&message.text, self.raw_text_limit),
                timestamp,
            },
            Some(message) if message.kind == TextKind::Registration => InboundEvent::Registration {
                source_address: source_address.to_string(),
                raw_text: truncate_chars(&message.text, self.raw_text_limit),
                timestamp,
            },
            _ => InboundEvent::Unrecognized {
                source_address: source_address.to_string(),
                raw_bytes: data.to_vec(),
                length: data.len(),
            },
        };

        DispatchOutcome {
            event,
            rejection: Some(rejection),
            encoding,
        }
    }
}

fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

/// Consumer of dispatched events
///
/// The receiver publishes every event, recognized or not, through this
/// capability and never reaches into global state.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: InboundEvent);
}

impl EventSink for mpsc::UnboundedSender<InboundEvent> {
    fn publish(&self, event: InboundEvent) {
        if self.send(event).is_err() {
            debug!("Event receiver dropped, event discarded");
        }
    }
}

impl EventSink for broadcast::Sender<InboundEvent> {
    fn publish(&self, event: InboundEvent) {
        // No subscribers is not an error for a broadcast bus
        let _ = self.send(event);
    }
}

/// Sink that only logs events
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn publish(&self, event: InboundEvent) {
        match event {
            InboundEvent::TemperatureReceived { source_address, reading, .. } => {
                info!("🌡️ Temperature from {}: {}", source_address, reading);
            }
            InboundEvent::Heartbeat { source_address, raw_text, .. } => {
                info!("💓 Heartbeat from {}: '{}'", source_address, raw_text);
            }
            InboundEvent::Registration { source_address, raw_text, .. } => {
                info!("📝 Registration from {}: '{}'", source_address, raw_text);
            }
            InboundEvent::Unrecognized { source_address, length, .. } => {
                warn!("❓ Unrecognized datagram from {} ({} bytes)", source_address, length);
            }
        }
    }
}
