/// 18B20 temperature decoding
///
/// Turns the first holding register of a validated frame into a
/// [`TemperatureReading`]. The register is a signed 16-bit fixed-point value
/// in tenths of a degree Celsius; two raw values are reserved by the firmware
/// to report probe faults.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::protocol::{ModbusFrame, FUNCTION_READ_HOLDING_REGISTERS, REGISTER_LEN};

/// Device type reported with every reading
pub const DEVICE_TYPE: &str = "18B20";

/// Fixed-point divisor: the register counts tenths of a degree
pub const TEMPERATURE_SCALE: f64 = 10.0;

/// Lowest temperature the DS18B20 can measure
pub const TEMPERATURE_MIN: f64 = -55.0;

/// Highest temperature the DS18B20 can measure
pub const TEMPERATURE_MAX: f64 = 125.0;

/// Reading status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureStatus {
    Normal,
    Error,
}

impl TemperatureStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemperatureStatus::Normal => "normal",
            TemperatureStatus::Error => "error",
        }
    }
}

impl fmt::Display for TemperatureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw register values the firmware uses to report probe faults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum SensorFault {
    /// Probe not answering on the 1-Wire bus
    Disconnected = 0x7FFF,
    /// Probe present but conversion never completed
    InitializationFailed = 0x0550,
}

impl SensorFault {
    /// Map a raw register value to a fault, if it is a sentinel
    pub fn from_raw(raw: u16) -> Option<Self> {
        match raw {
            0x7FFF => Some(SensorFault::Disconnected),
            0x0550 => Some(SensorFault::InitializationFailed),
            _ => None,
        }
    }

    pub fn to_u16(self) -> u16 {
        self as u16
    }

    pub fn message(self) -> &'static str {
        match self {
            SensorFault::Disconnected => "sensor disconnected",
            SensorFault::InitializationFailed => "sensor initialization failed",
        }
    }
}

impl fmt::Display for SensorFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:04X})", self.message(), self.to_u16())
    }
}

/// One decoded temperature sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureReading {
    pub raw_value: u16,
    pub signed_value: i16,
    pub celsius: f64,
    pub fahrenheit: f64,
    pub status: TemperatureStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl TemperatureReading {
    /// Build a reading from a raw register value
    pub fn from_raw(raw_value: u16, timestamp: DateTime<Utc>) -> Self {
        let signed_value = raw_value as i16;
        let celsius = signed_value as f64 / TEMPERATURE_SCALE;
        let fahrenheit = celsius_to_fahrenheit(celsius);

        let fault = SensorFault::from_raw(raw_value);
        let in_range = (TEMPERATURE_MIN..=TEMPERATURE_MAX).contains(&celsius);
        let status = if in_range && fault.is_none() {
            TemperatureStatus::Normal
        } else {
            TemperatureStatus::Error
        };

        Self {
            raw_value,
            signed_value,
            celsius,
            fahrenheit,
            status,
            error_message: fault.map(|f| f.message().to_string()),
            timestamp,
        }
    }

    pub fn is_normal(&self) -> bool {
        self.status == TemperatureStatus::Normal
    }

    pub fn fault(&self) -> Option<SensorFault> {
        SensorFault::from_raw(self.raw_value)
    }

    /// Raw value as `0xHHHH`
    pub fn hex_value(&self) -> String {
        format!("0x{:04X}", self.raw_value)
    }

    /// Raw value as 16 binary digits
    pub fn binary_value(&self) -> String {
        format!("{:016b}", self.raw_value)
    }
}

impl fmt::Display for TemperatureReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}°C ({:.1}°F), status={}", self.celsius, self.fahrenheit, self.status)?;
        if let Some(ref message) = self.error_message {
            write!(f, ", error={}", message)?;
        }
        Ok(())
    }
}

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

/// Decode the temperature register of a validated frame, stamped with the current time
pub fn decode(frame: &ModbusFrame<'_>) -> TemperatureReading {
    decode_at(frame, Utc::now())
}

/// Decode the temperature register of a validated frame
///
/// Total over every frame the validator produces. Registers after the first
/// are not part of the 18B20 profile and are ignored.
pub fn decode_at(frame: &ModbusFrame<'_>, timestamp: DateTime<Utc>) -> TemperatureReading {
    debug_assert_eq!(frame.function_code(), FUNCTION_READ_HOLDING_REGISTERS);
    debug_assert!(frame.byte_count() as usize >= REGISTER_LEN);

    TemperatureReading::from_raw(frame.register_value(), timestamp)
}

/// Scalar views of a reading for presentation layers
///
/// One canonical reading feeds every sensor variant; a consumer picks the
/// projection it displays instead of subclassing per unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureProjection {
    Celsius,
    Fahrenheit,
    Raw,
}

impl TemperatureProjection {
    pub const ALL: [TemperatureProjection; 3] = [
        TemperatureProjection::Celsius,
        TemperatureProjection::Fahrenheit,
        TemperatureProjection::Raw,
    ];

    pub fn value(&self, reading: &TemperatureReading) -> f64 {
        match self {
            TemperatureProjection::Celsius => reading.celsius,
            TemperatureProjection::Fahrenheit => reading.fahrenheit,
            TemperatureProjection::Raw => reading.raw_value as f64,
        }
    }

    /// Unit of measurement, `None` for the unitless raw register
    pub fn unit(&self) -> Option<&'static str> {
        match self {
            TemperatureProjection::Celsius => Some("°C"),
            TemperatureProjection::Fahrenheit => Some("°F"),
            TemperatureProjection::Raw => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TemperatureProjection::Celsius => "temperature",
            TemperatureProjection::Fahrenheit => "temperature_f",
            TemperatureProjection::Raw => "raw_value",
        }
    }
}
