//! # Receiver Error Handling
//!
//! Error types for the parts of the receiver that touch the outside world:
//! configuration loading, socket I/O and event serialization.
//!
//! ## Overview
//!
//! The decoding core (CRC, frame validation, temperature decoding, text
//! classification and dispatch) never returns these errors. A malformed frame
//! or an undecodable payload is an expected outcome of a heuristic decoder and
//! is represented as a plain value (`FrameRejection`, `InboundEvent::Unrecognized`).
//! `ReceiverError` is reserved for the glue around the core.
//!
//! ## Error Categories
//!
//! ### Transport Errors
//! - **I/O Errors**: socket bind, receive and local address failures
//!
//! ### Data Errors
//! - **Invalid Data**: JSON/YAML (de)serialization problems
//!
//! ### System Errors
//! - **Configuration Errors**: invalid bind address, threshold or frame length
//! - **Internal Errors**: server state misuse (e.g. starting twice)
//!
//! ## Usage Examples
//!
//! ```rust
//! use temp_udp_receiver::{ReceiverConfig, ReceiverError};
//!
//! let result = ReceiverConfig::from_yaml_str("min_frame_len: 3");
//! match result {
//!     Err(ReceiverError::Configuration { message }) => println!("bad config: {}", message),
//!     Err(error) => println!("other error: {}", error),
//!     Ok(config) => println!("listening on {}", config.bind_address),
//! }
//! ```

use thiserror::Error;

/// Result type alias for receiver operations
pub type ReceiverResult<T> = Result<T, ReceiverError>;

/// Receiver error types
///
/// Each variant carries a descriptive message so that the caller can log it
/// without further context.
#[derive(Error, Debug, Clone)]
pub enum ReceiverError {
    /// I/O related errors (socket bind, receive)
    ///
    /// # Examples
    /// - Address already in use
    /// - Permission denied binding a privileged port
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Configuration errors
    ///
    /// # Examples
    /// - Unparseable bind address
    /// - Minimum frame length below the smallest valid frame
    /// - Non-positive offline threshold
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Invalid data value
    ///
    /// # Examples
    /// - Malformed YAML configuration document
    /// - Event that cannot be serialized to JSON
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Internal errors (should not occur in normal operation)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ReceiverError {
    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io { message: message.into() }
    }

    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Create an invalid data error
    pub fn invalid_data<S: Into<String>>(message: S) -> Self {
        Self::InvalidData { message: message.into() }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Check if the error is recoverable (can retry)
    ///
    /// Only transport errors may go away on their own; a bad configuration
    /// stays bad until someone edits it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use temp_udp_receiver::ReceiverError;
    ///
    /// assert!(ReceiverError::io("address in use").is_recoverable());
    /// assert!(!ReceiverError::configuration("bad port").is_recoverable());
    /// ```
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    /// Check if the error comes from configuration or its parsing
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::Configuration { .. } | Self::InvalidData { .. })
    }
}

/// Convert from std::io::Error
impl From<std::io::Error> for ReceiverError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

/// Convert from serde JSON errors
impl From<serde_json::Error> for ReceiverError {
    fn from(err: serde_json::Error) -> Self {
        Self::invalid_data(format!("JSON error: {}", err))
    }
}

/// Convert from serde YAML errors
impl From<serde_yaml::Error> for ReceiverError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::invalid_data(format!("YAML error: {}", err))
    }
}

impl From<std::net::AddrParseError> for ReceiverError {
    fn from(err: std::net::AddrParseError) -> Self {
        Self::configuration(format!("Invalid bind address: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let err = ReceiverError::io("address in use");
        assert!(err.is_recoverable());
        assert!(!err.is_configuration_error());

        let err = ReceiverError::configuration("min_frame_len too small");
        assert!(!err.is_recoverable());
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_error_display() {
        let err = ReceiverError::configuration("offline threshold must be positive");
        let msg = format!("{}", err);
        assert!(msg.contains("Configuration error"));
        assert!(msg.contains("offline threshold"));
    }

    #[test]
    fn test_conversions() {
        let io = std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use");
        assert!(matches!(ReceiverError::from(io), ReceiverError::Io { .. }));

        let parse = "not-an-address".parse::<std::net::SocketAddr>().unwrap_err();
        assert!(matches!(ReceiverError::from(parse), ReceiverError::Configuration { .. }));

        let json = serde_json::from_str::<u8>("{").unwrap_err();
        assert!(matches!(ReceiverError::from(json), ReceiverError::InvalidData { .. }));
    }
}
