//! In-memory decoder manifest
//!
//! Holds the full manifest in flat maps. Populated programmatically by the
//! manifest ingestion path or loaded from a JSON/YAML fixture; either way it
//! is immutable once handed to an extractor.

use super::{
    ComplexSignalDecoderFormat, DecoderManifest, PidSignalDecoderFormat, VehicleDataSourceProtocol,
};
use crate::dictionary::can::{CanMessageFormat, CanRawFrameId};
use crate::dictionary::complex::{ComplexDataType, ComplexDataTypeId};
use crate::error::{ErrorExt, Result, TelemetryError};
use crate::signal::{InterfaceId, SignalId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Placement of a raw-socket CAN signal: which frame on which interface
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanSignalLocation {
    pub frame_id: CanRawFrameId,
    pub interface_id: InterfaceId,
}

/// In-memory decoder manifest implementation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryDecoderManifest {
    #[serde(default)]
    can_signals: HashMap<SignalId, CanSignalLocation>,
    #[serde(default)]
    can_message_formats: HashMap<InterfaceId, HashMap<CanRawFrameId, CanMessageFormat>>,
    #[serde(default)]
    pid_signals: HashMap<SignalId, PidSignalDecoderFormat>,
    #[serde(default)]
    complex_signals: HashMap<SignalId, ComplexSignalDecoderFormat>,
    #[serde(default)]
    complex_types: HashMap<ComplexDataTypeId, ComplexDataType>,
}

impl InMemoryDecoderManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a manifest from a JSON or YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                TelemetryError::manifest("Manifest file must have an extension".to_string())
            })?;
        let contents =
            std::fs::read_to_string(path).manifest_error("Failed to read manifest file")?;
        match extension {
            "json" => serde_json::from_str(&contents).data_error("Failed to parse JSON manifest"),
            "yaml" | "yml" => {
                serde_yaml::from_str(&contents).data_error("Failed to parse YAML manifest")
            }
            _ => Err(TelemetryError::manifest(format!(
                "Unsupported manifest file format: {}",
                extension
            ))),
        }
    }

    /// Register a raw-socket CAN signal
    pub fn add_can_signal(
        &mut self,
        signal_id: SignalId,
        interface_id: impl Into<InterfaceId>,
        frame_id: CanRawFrameId,
    ) -> &mut Self {
        self.can_signals.insert(
            signal_id,
            CanSignalLocation {
                frame_id,
                interface_id: interface_id.into(),
            },
        );
        self
    }

    /// Register the message format of a CAN frame, keyed by its message id
    pub fn add_can_message_format(
        &mut self,
        interface_id: impl Into<InterfaceId>,
        format: CanMessageFormat,
    ) -> &mut Self {
        self.can_message_formats
            .entry(interface_id.into())
            .or_default()
            .insert(format.message_id, format);
        self
    }

    /// Register an OBD signal
    pub fn add_pid_signal(
        &mut self,
        signal_id: SignalId,
        format: PidSignalDecoderFormat,
    ) -> &mut Self {
        self.pid_signals.insert(signal_id, format);
        self
    }

    /// Register a complex signal
    pub fn add_complex_signal(
        &mut self,
        signal_id: SignalId,
        format: ComplexSignalDecoderFormat,
    ) -> &mut Self {
        self.complex_signals.insert(signal_id, format);
        self
    }

    /// Register a node of the complex type graph
    pub fn add_complex_type(
        &mut self,
        type_id: ComplexDataTypeId,
        data_type: ComplexDataType,
    ) -> &mut Self {
        self.complex_types.insert(type_id, data_type);
        self
    }
}

impl DecoderManifest for InMemoryDecoderManifest {
    fn network_protocol(&self, signal_id: SignalId) -> VehicleDataSourceProtocol {
        if self.can_signals.contains_key(&signal_id) {
            VehicleDataSourceProtocol::RawSocket
        } else if self.pid_signals.contains_key(&signal_id) {
            VehicleDataSourceProtocol::Obd
        } else if self.complex_signals.contains_key(&signal_id) {
            VehicleDataSourceProtocol::ComplexData
        } else {
            VehicleDataSourceProtocol::Invalid
        }
    }

    fn can_frame_and_interface(
        &self,
        signal_id: SignalId,
    ) -> Option<(CanRawFrameId, InterfaceId)> {
        self.can_signals
            .get(&signal_id)
            .map(|location| (location.frame_id, location.interface_id.clone()))
    }

    fn can_message_format(
        &self,
        frame_id: CanRawFrameId,
        interface_id: &str,
    ) -> Option<CanMessageFormat> {
        self.can_message_formats
            .get(interface_id)?
            .get(&frame_id)
            .cloned()
    }

    fn pid_decoder_format(&self, signal_id: SignalId) -> Option<PidSignalDecoderFormat> {
        self.pid_signals.get(&signal_id).cloned()
    }

    fn complex_signal_format(&self, signal_id: SignalId) -> Option<ComplexSignalDecoderFormat> {
        self.complex_signals.get(&signal_id).cloned()
    }

    fn complex_data_type(&self, type_id: ComplexDataTypeId) -> ComplexDataType {
        self.complex_types
            .get(&type_id)
            .cloned()
            .unwrap_or(ComplexDataType::Invalid)
    }
}
