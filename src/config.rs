/// Receiver configuration
///
/// All fields have defaults matching the deployed firmware, so an empty YAML
/// document is a valid configuration.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::dispatcher::DEFAULT_RAW_TEXT_LIMIT;
use crate::error::{ReceiverError, ReceiverResult};
use crate::logging::LoggingMode;
use crate::protocol::MIN_FRAME_LEN;
use crate::text::TextEncoding;

/// Default UDP port the sensors send to
pub const DEFAULT_PORT: u16 = 8889;

/// UDP receiver configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    pub bind_address: SocketAddr,
    pub offline_threshold_secs: f64,
    /// Shortest datagram considered as a binary frame
    pub min_frame_len: usize,
    /// Characters kept from heartbeat/registration text
    pub raw_text_limit: usize,
    /// Text decode order
    pub encodings: Vec<TextEncoding>,
    pub logging_mode: LoggingMode,
    /// Period of the device status report, 0 disables it
    pub status_interval_secs: u64,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            offline_threshold_secs: 10.0,
            min_frame_len: MIN_FRAME_LEN,
            raw_text_limit: DEFAULT_RAW_TEXT_LIMIT,
            encodings: TextEncoding::DEFAULT_CHAIN.to_vec(),
            logging_mode: LoggingMode::Interpreted,
            status_interval_secs: 30,
        }
    }
}

impl ReceiverConfig {
    /// Default configuration listening on `bind_address`
    pub fn with_bind_address(bind_address: &str) -> ReceiverResult<Self> {
        Ok(Self {
            bind_address: bind_address.parse()?,
            ..Default::default()
        })
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> ReceiverResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> ReceiverResult<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            ReceiverError::configuration(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&yaml)
    }

    pub fn validate(&self) -> ReceiverResult<()> {
        if self.min_frame_len < MIN_FRAME_LEN {
            return Err(ReceiverError::configuration(format!(
                "min_frame_len must be at least {}, got {}",
                MIN_FRAME_LEN, self.min_frame_len
            )));
        }

        if !self.offline_threshold_secs.is_finite() || self.offline_threshold_secs <= 0.0 {
            return Err(ReceiverError::configuration(format!(
                "offline_threshold_secs must be positive, got {}",
                self.offline_threshold_secs
            )));
        }

        if self.encodings.is_empty() {
            return Err(ReceiverError::configuration("encodings must not be empty"));
        }

        Ok(())
    }

    pub fn offline_threshold(&self) -> Duration {
        Duration::from_secs_f64(self.offline_threshold_secs)
    }

    /// `None` when the periodic report is disabled
    pub fn status_interval(&self) -> Option<Duration> {
        match self.status_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = ReceiverConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, ReceiverConfig::default());
        assert_eq!(config.bind_address.port(), 8889);
        assert_eq!(config.offline_threshold(), Duration::from_secs(10));
        assert_eq!(config.status_interval(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_partial_document() {
        let yaml = r#"
bind_address: "127.0.0.1:9000"
min_frame_len: 13
encodings: [utf8, latin1]
logging_mode: both
status_interval_secs: 0
"#;
        let config = ReceiverConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.bind_address, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.min_frame_len, 13);
        assert_eq!(config.encodings, vec![TextEncoding::Utf8, TextEncoding::Latin1]);
        assert_eq!(config.logging_mode, LoggingMode::Both);
        assert_eq!(config.status_interval(), None);
        assert_eq!(config.raw_text_limit, 100);
    }

    #[test]
    fn test_validation() {
        let err = ReceiverConfig::from_yaml_str("min_frame_len: 3").unwrap_err();
        assert!(matches!(err, ReceiverError::Configuration { .. }));

        let err = ReceiverConfig::from_yaml_str("offline_threshold_secs: 0").unwrap_err();
        assert!(matches!(err, ReceiverError::Configuration { .. }));

        let err = ReceiverConfig::from_yaml_str("encodings: []").unwrap_err();
        assert!(matches!(err, ReceiverError::Configuration { .. }));

        let err = ReceiverConfig::from_yaml_str("bind_address: [1, 2").unwrap_err();
        assert!(matches!(err, ReceiverError::InvalidData { .. }));
    }

    #[test]
    fn test_with_bind_address() {
        let config = ReceiverConfig::with_bind_address("127.0.0.1:0").unwrap();
        assert_eq!(config.bind_address.port(), 0);
        assert!(ReceiverConfig::with_bind_address("localhost").is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = ReceiverConfig::from_yaml_file("/nonexistent/receiver.yaml").unwrap_err();
        assert!(err.is_configuration_error());
    }
}
