/// Utility functions and helpers
///
/// Formatting for hex dumps, durations and the device status report, plus
/// logger initialisation for binaries and tests.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::liveness::ClientStatus;

/// Render the device status report
///
/// One line per known source, sorted by address.
pub fn format_device_status(status: &BTreeMap<String, ClientStatus>) -> String {
    if status.is_empty() {
        return "Device status:\nNo devices connected".to_string();
    }

    let mut message = String::from("Device status:");
    for (address, client) in status {
        let online = if client.online {
            "online".to_string()
        } else {
            format!("offline ({:.0}s)", client.offline_duration.as_secs_f64())
        };
        message.push_str(&format!("\nDevice {}: {} ({})", address, online, client.kind));
    }
    message
}

/// Formatting and display utilities
pub mod format {
    use super::*;

    /// Format byte array as hex string
    pub fn bytes_to_hex(bytes: &[u8]) -> String {
        bytes.iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Printable ASCII characters kept, everything else shown as `.`
    pub fn printable_ascii(bytes: &[u8]) -> String {
        bytes.iter()
            .map(|&b| if (32..=126).contains(&b) { b as char } else { '.' })
            .collect()
    }

    /// Format duration in a human-readable way
    pub fn format_duration(duration: Duration) -> String {
        let millis = duration.as_millis();
        if millis < 1000 {
            format!("{}ms", millis)
        } else if millis < 60_000 {
            format!("{:.2}s", duration.as_secs_f64())
        } else {
            let mins = millis / 60_000;
            let secs = (millis % 60_000) as f64 / 1000.0;
            format!("{}m {:.1}s", mins, secs)
        }
    }
}

/// Logging utilities
pub mod logging {
    /// Initialize simple logger for testing
    pub fn init_test_logger() {
        let _ = env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .try_init();
    }

    /// Initialize the process logger, `RUST_LOG` overrides `default_level`
    pub fn init_logger(default_level: log::LevelFilter) {
        let _ = env_logger::Builder::new()
            .filter_level(default_level)
            .parse_default_env()
            .try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::liveness::{ClientKind, LivenessTracker};
    use std::time::Instant;

    #[test]
    fn test_formatting() {
        let bytes = vec![0x01, 0x03, 0x10, 0xFF];
        assert_eq!(format::bytes_to_hex(&bytes), "01 03 10 FF");
        assert_eq!(format::printable_ascii(b"ab\x00\x7Fc"), "ab..c");

        assert_eq!(format::format_duration(Duration::from_millis(1500)), "1.50s");
        assert_eq!(format::format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format::format_duration(Duration::from_secs(90)), "1m 30.0s");
    }

    #[test]
    fn test_empty_status_report() {
        assert_eq!(
            format_device_status(&BTreeMap::new()),
            "Device status:\nNo devices connected"
        );
    }

    #[test]
    fn test_status_report() {
        let tracker = LivenessTracker::new();
        let t0 = Instant::now();
        tracker.record("10.0.0.7:5000", ClientKind::Heartbeat, t0);
        tracker.record("10.0.0.8:5000", ClientKind::TemperatureSensor, t0 + Duration::from_secs(20));

        let report = format_device_status(&tracker.snapshot(t0 + Duration::from_secs(25)));
        assert_eq!(
            report,
            "Device status:\n\
             Device 10.0.0.7:5000: offline (25s) (heartbeat)\n\
             Device 10.0.0.8:5000: online (temperature_sensor)"
        );
    }
}
