//! Decoder manifest lookup interface
//!
//! The manifest is the catalog mapping each signal id to its transport: a
//! CAN frame plus bit layout, an OBD PID layout, or a complex type graph.
//! It is read-only during an extraction pass; a new manifest snapshot
//! replaces the previous one atomically between passes.

pub mod memory;

pub use memory::InMemoryDecoderManifest;

use crate::dictionary::can::{CanMessageFormat, CanRawFrameId};
use crate::dictionary::complex::{ComplexDataType, ComplexDataTypeId};
use crate::signal::{InterfaceId, SignalId};
use serde::{Deserialize, Serialize};

/// Transport protocol a signal arrives on
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum VehicleDataSourceProtocol {
    /// Raw-socket CAN bus traffic
    RawSocket,
    /// OBD-II request/response traffic
    Obd,
    /// Complex typed messages (ROS2-style sources)
    ComplexData,
    /// Unknown or unrecognized transport
    #[default]
    #[serde(other)]
    Invalid,
}

/// Every protocol an extraction pass produces a dictionary key for
pub const SUPPORTED_PROTOCOLS: [VehicleDataSourceProtocol; 3] = [
    VehicleDataSourceProtocol::RawSocket,
    VehicleDataSourceProtocol::Obd,
    VehicleDataSourceProtocol::ComplexData,
];

/// Byte-level layout of one OBD signal inside a PID response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PidSignalDecoderFormat {
    /// OBD-II parameter id the signal is carried in
    pub pid: u16,
    /// Expected length of the PID response in bytes
    pub pid_response_length: usize,
    /// First byte of the signal inside the response
    pub start_byte: usize,
    /// Number of bytes the signal spans
    pub byte_length: usize,
    /// Right shift applied inside the first byte
    #[serde(default)]
    pub bit_right_shift: u8,
    /// Number of mask bits in the last partial byte
    #[serde(default)]
    pub bit_mask_length: u8,
    pub scaling: f64,
    pub offset: f64,
}

/// Location of a complex signal: its interface, message and root type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexSignalDecoderFormat {
    pub interface_id: InterfaceId,
    pub message_id: String,
    pub root_type_id: ComplexDataTypeId,
}

/// Read-only decoder manifest lookups used by the extraction pass
pub trait DecoderManifest: Send + Sync {
    /// Transport protocol of a full signal id
    fn network_protocol(&self, signal_id: SignalId) -> VehicleDataSourceProtocol;

    /// CAN frame id and interface name carrying a raw-socket signal
    fn can_frame_and_interface(&self, signal_id: SignalId)
        -> Option<(CanRawFrameId, InterfaceId)>;

    /// Full message format of a CAN frame on an interface
    fn can_message_format(
        &self,
        frame_id: CanRawFrameId,
        interface_id: &str,
    ) -> Option<CanMessageFormat>;

    /// PID layout of an OBD signal
    fn pid_decoder_format(&self, signal_id: SignalId) -> Option<PidSignalDecoderFormat>;

    /// Interface, message and root type of a complex signal
    fn complex_signal_format(&self, signal_id: SignalId) -> Option<ComplexSignalDecoderFormat>;

    /// Node of the complex type graph; `ComplexDataType::Invalid` for
    /// unknown ids
    fn complex_data_type(&self, type_id: ComplexDataTypeId) -> ComplexDataType;
}
