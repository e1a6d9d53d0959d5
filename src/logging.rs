/// Datagram logging
///
/// The decoding core never logs; the receive loop hands each datagram and its
/// dispatch outcome to a [`PacketLogger`], which writes through the `log`
/// facade in one of three modes. Datagrams nobody understood get a best-effort
/// [`PacketAnalysis`] to help identify new firmware formats.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::dispatcher::{DispatchOutcome, InboundEvent};
use crate::utils::format;

/// Logging mode for packet display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggingMode {
    /// Show raw packet data only
    Raw,
    /// Show interpreted packet data with field descriptions
    Interpreted,
    /// Show both raw and interpreted data
    Both,
}

impl LoggingMode {
    fn shows_raw(self) -> bool {
        matches!(self, LoggingMode::Raw | LoggingMode::Both)
    }

    fn shows_interpreted(self) -> bool {
        matches!(self, LoggingMode::Interpreted | LoggingMode::Both)
    }
}

/// Logger for received datagrams and their classification
#[derive(Debug, Clone, Copy)]
pub struct PacketLogger {
    mode: LoggingMode,
}

impl Default for PacketLogger {
    fn default() -> Self {
        Self::new(LoggingMode::Interpreted)
    }
}

impl PacketLogger {
    pub fn new(mode: LoggingMode) -> Self {
        Self { mode }
    }

    pub fn set_mode(&mut self, mode: LoggingMode) {
        self.mode = mode;
    }

    pub fn get_mode(&self) -> LoggingMode {
        self.mode
    }

    /// Log arrival of a datagram
    pub fn log_datagram(&self, source: &str, data: &[u8]) {
        debug!("UDP datagram from {}: {} bytes", source, data.len());
        if self.mode.shows_raw() {
            debug!("Raw (hex) from {}: {}", source, hex::encode(data));
        }
    }

    /// Log how a datagram was classified
    pub fn log_outcome(&self, source: &str, data: &[u8], outcome: &DispatchOutcome) {
        if self.mode.shows_interpreted() {
            if let Some(rejection) = outcome.rejection {
                debug!("Not a ModBus frame ({}), tried text", rejection);
            }
            if let Some(encoding) = outcome.encoding {
                debug!("Text decoded as {}", encoding);
            }
        }

        match &outcome.event {
            InboundEvent::TemperatureReceived { reading, .. } => {
                info!("ModBus frame from {}: {}", source, reading);
                if let Some(fault) = reading.fault() {
                    warn!("Sensor fault reported by {}: {}", source, fault);
                }
                if self.mode.shows_interpreted() {
                    debug!(
                        "Register 0x{:04X}: signed={}, celsius={:.2}, fahrenheit={:.2}",
                        reading.raw_value, reading.signed_value, reading.celsius, reading.fahrenheit
                    );
                }
            }
            InboundEvent::Heartbeat { raw_text, .. } => {
                info!("Heartbeat from {}", source);
                debug!("Heartbeat text: '{}'", raw_text);
            }
            InboundEvent::Registration { raw_text, .. } => {
                info!("Registration from {}: '{}'", source, raw_text);
            }
            InboundEvent::Unrecognized { length, .. } => {
                warn!("Cannot decode UDP datagram from {} ({} bytes)", source, length);
                if self.mode.shows_raw() {
                    warn!("Datagram details: hex={}, bytes={:?}", hex::encode(data), data);
                }
                if self.mode.shows_interpreted() {
                    debug!("{}", analyze_unknown_packet(data));
                }
            }
        }
    }
}

/// Heuristic description of a datagram nobody could decode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketAnalysis {
    pub length: usize,
    /// What datagrams of this length usually are
    pub length_hint: Option<&'static str>,
    /// First byte, if it were a device address
    pub device_address: Option<u8>,
    /// Second byte, if it were a function code
    pub function_code: Option<u8>,
    /// Third byte, if it were a byte count
    pub byte_count: Option<u8>,
    /// Printable ASCII with `.` for everything else
    pub ascii: String,
    pub looks_like_json: bool,
}

/// Analyse an unrecognized datagram for diagnostics
pub fn analyze_unknown_packet(data: &[u8]) -> PacketAnalysis {
    let length_hint = match data.len() {
        7 => Some("possibly a single-register ModBus response"),
        8 => Some("possibly standard temperature data"),
        13 => Some("possibly a full ModBus RTU frame"),
        17 => Some("possibly a ZQWL-format frame"),
        _ => None,
    };

    let looks_like_json = std::str::from_utf8(data)
        .map(|text| serde_json::from_str::<serde_json::Value>(text).is_ok())
        .unwrap_or(false);

    PacketAnalysis {
        length: data.len(),
        length_hint,
        device_address: data.first().copied(),
        function_code: data.get(1).copied(),
        byte_count: data.get(2).copied(),
        ascii: format::printable_ascii(data),
        looks_like_json,
    }
}

impl fmt::Display for PacketAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.length == 0 {
            return write!(f, "Empty datagram");
        }

        write!(f, "Unknown datagram: {} bytes", self.length)?;
        if let Some(hint) = self.length_hint {
            write!(f, " ({})", hint)?;
        }
        if let Some(address) = self.device_address {
            write!(f, ", byte 1 (address?)=0x{:02X}", address)?;
        }
        if let Some(code) = self.function_code {
            write!(f, ", byte 2 (function?)=0x{:02X}", code)?;
        }
        if let Some(count) = self.byte_count {
            write!(f, ", byte 3 (length?)={}", count)?;
        }
        write!(f, ", ascii='{}'", self.ascii)?;
        if self.looks_like_json {
            write!(f, ", looks like JSON")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::PacketDispatcher;
    use crate::protocol::encode_read_response;

    #[test]
    fn test_analysis_of_short_binary() {
        let analysis = analyze_unknown_packet(&[0x01, 0x04, 0x02, 0x00, 0xC8, 0x00, 0x00]);
        assert_eq!(analysis.length, 7);
        assert!(analysis.length_hint.is_some());
        assert_eq!(analysis.device_address, Some(0x01));
        assert_eq!(analysis.function_code, Some(0x04));
        assert_eq!(analysis.byte_count, Some(0x02));
        assert_eq!(analysis.ascii, ".......");
        assert!(!analysis.looks_like_json);
    }

    #[test]
    fn test_analysis_of_json() {
        let analysis = analyze_unknown_packet(br#"{"temp": 21.5}"#);
        assert!(analysis.looks_like_json);
        assert_eq!(analysis.ascii, r#"{"temp": 21.5}"#);
        assert!(analysis.to_string().contains("looks like JSON"));
    }

    #[test]
    fn test_analysis_of_empty() {
        let analysis = analyze_unknown_packet(&[]);
        assert_eq!(analysis.device_address, None);
        assert_eq!(analysis.to_string(), "Empty datagram");
    }

    #[test]
    fn test_logger_modes() {
        crate::utils::logging::init_test_logger();

        let dispatcher = PacketDispatcher::new();
        let source = "127.0.0.1:1234";
        let datagrams: Vec<Vec<u8>> = vec![
            encode_read_response(1, &[0x7FFF]),
            b"heartbeat".to_vec(),
            b"register me".to_vec(),
            vec![0xFF, 0x00],
        ];

        for mode in [LoggingMode::Raw, LoggingMode::Interpreted, LoggingMode::Both] {
            let mut logger = PacketLogger::default();
            logger.set_mode(mode);
            assert_eq!(logger.get_mode(), mode);
            for data in &datagrams {
                let outcome = dispatcher.inspect_at(data, source, chrono::Utc::now());
                logger.log_datagram(source, data);
                logger.log_outcome(source, data, &outcome);
            }
        }
    }
}
