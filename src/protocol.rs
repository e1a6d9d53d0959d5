/// ModBus-RTU framing for UDP datagrams
///
/// This module contains the CRC16/MODBUS engine and the structural validator
/// that decides whether an arbitrary datagram is a "read holding registers"
/// response frame. UDP gives us whole datagrams with no delimiter and no
/// length prefix, so validation is a heuristic: a buffer that happens to have
/// a plausible header and a matching CRC is accepted as a frame.

use crc::{Crc, CRC_16_MODBUS};
use thiserror::Error;

/// ModBus device address (0-247)
pub type DeviceAddress = u8;

/// Highest addressable ModBus device
pub const MODBUS_DEVICE_ADDR_MAX: DeviceAddress = 247;

/// Read Holding Registers, the only function code this receiver understands
pub const FUNCTION_READ_HOLDING_REGISTERS: u8 = 0x03;

/// Address + function code + byte count
pub const HEADER_LEN: usize = 3;

/// Trailing CRC16, little-endian
pub const CRC_LEN: usize = 2;

/// Size of one holding register on the wire
pub const REGISTER_LEN: usize = 2;

/// Smallest frame that can carry one register
pub const MIN_FRAME_LEN: usize = HEADER_LEN + REGISTER_LEN + CRC_LEN;

/// Full 18B20 device frame: 3-byte header, 8 payload bytes, 2-byte CRC
pub const EXPECTED_FRAME_LEN: usize = 13;

const CRC_MODBUS: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);

/// Compute the ModBus CRC16 (seed 0xFFFF, reflected polynomial 0xA001)
///
/// Total over every input, the empty slice yields the seed.
pub fn crc16(data: &[u8]) -> u16 {
    CRC_MODBUS.checksum(data)
}

/// Why a datagram is not a valid temperature frame
///
/// Rejections are the normal outcome for heartbeats and registrations sharing
/// the port, so they carry enough detail for a debug log line and nothing more.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameRejection {
    #[error("Frame too short: {length} bytes, need at least {minimum}")]
    TooShort { length: usize, minimum: usize },

    #[error("Device address out of range: {address} (max 247)")]
    InvalidAddress { address: u8 },

    #[error("Unsupported function code: 0x{code:02X}")]
    InvalidFunction { code: u8 },

    #[error("CRC mismatch: calculated=0x{calculated:04X}, received=0x{received:04X}")]
    CrcMismatch { calculated: u16, received: u16 },

    #[error("Invalid byte count: declared {declared}, {available} bytes follow the header")]
    InvalidByteCount { declared: u8, available: usize },
}

/// A validated "read holding registers" response frame
///
/// This is a borrowed view over the datagram. It can only be obtained from
/// [`FrameValidator::validate`], which guarantees the function code, the CRC
/// and that at least one register is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModbusFrame<'a> {
    bytes: &'a [u8],
}

impl<'a> ModbusFrame<'a> {
    pub fn device_address(&self) -> DeviceAddress {
        self.bytes[0]
    }

    pub fn function_code(&self) -> u8 {
        self.bytes[1]
    }

    /// Declared payload length
    pub fn byte_count(&self) -> u8 {
        self.bytes[2]
    }

    /// First register, the only one the 18B20 profile reads
    pub fn register_payload(&self) -> [u8; REGISTER_LEN] {
        [self.bytes[HEADER_LEN], self.bytes[HEADER_LEN + 1]]
    }

    /// First register as a big-endian u16
    pub fn register_value(&self) -> u16 {
        u16::from_be_bytes(self.register_payload())
    }

    /// Declared payload, including registers this profile ignores
    ///
    /// A byte count running into the CRC is cut off at the CRC.
    pub fn payload(&self) -> &'a [u8] {
        let crc_offset = self.bytes.len() - CRC_LEN;
        let end = (HEADER_LEN + self.byte_count() as usize).min(crc_offset);
        &self.bytes[HEADER_LEN..end]
    }

    /// Trailing CRC as received
    pub fn crc(&self) -> u16 {
        let len = self.bytes.len();
        u16::from_le_bytes([self.bytes[len - 2], self.bytes[len - 1]])
    }

    /// The whole datagram
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }
}

/// Structural and CRC validation of candidate binary frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameValidator {
    min_len: usize,
}

impl Default for FrameValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameValidator {
    /// Validator accepting any frame that carries at least one register
    pub fn new() -> Self {
        Self { min_len: MIN_FRAME_LEN }
    }

    /// Validator with a stricter minimum length, e.g. [`EXPECTED_FRAME_LEN`]
    ///
    /// Values below [`MIN_FRAME_LEN`] are raised to it.
    pub fn with_min_len(min_len: usize) -> Self {
        Self { min_len: min_len.max(MIN_FRAME_LEN) }
    }

    pub fn min_len(&self) -> usize {
        self.min_len
    }

    /// Check a datagram and return a frame view on success
    ///
    /// Checks run cheapest first: length, address, function code, CRC, then
    /// the declared byte count. The count must cover one register and may not
    /// run past the end of the datagram; the CRC bytes count toward that end,
    /// as on the firmware side.
    pub fn validate<'a>(&self, data: &'a [u8]) -> Result<ModbusFrame<'a>, FrameRejection> {
        if data.len() < self.min_len {
            return Err(FrameRejection::TooShort {
                length: data.len(),
                minimum: self.min_len,
            });
        }

        let address = data[0];
        if address > MODBUS_DEVICE_ADDR_MAX {
            return Err(FrameRejection::InvalidAddress { address });
        }

        let code = data[1];
        if code != FUNCTION_READ_HOLDING_REGISTERS {
            return Err(FrameRejection::InvalidFunction { code });
        }

        let crc_offset = data.len() - CRC_LEN;
        let received = u16::from_le_bytes([data[crc_offset], data[crc_offset + 1]]);
        let calculated = crc16(&data[..crc_offset]);
        if received != calculated {
            return Err(FrameRejection::CrcMismatch { calculated, received });
        }

        let declared = data[2];
        let available = data.len() - HEADER_LEN;
        if (declared as usize) < REGISTER_LEN || declared as usize > available {
            return Err(FrameRejection::InvalidByteCount { declared, available });
        }

        Ok(ModbusFrame { bytes: data })
    }
}

/// Build a "read holding registers" response frame with CRC appended
///
/// This is what the sensor firmware sends; the simulator and tests use it to
/// produce well-formed datagrams.
pub fn encode_read_response(address: DeviceAddress, registers: &[u16]) -> Vec<u8> {
    let byte_count = registers.len() * REGISTER_LEN;
    let mut frame = Vec::with_capacity(HEADER_LEN + byte_count + CRC_LEN);
    frame.push(address);
    frame.push(FUNCTION_READ_HOLDING_REGISTERS);
    frame.push(byte_count as u8);
    for register in registers {
        frame.extend_from_slice(&register.to_be_bytes());
    }
    let crc = crc16(&frame);
    frame.extend_from_slice(&crc.to_le_bytes()); // CRC is little-endian in RTU
    frame
}
