//! Decoder dictionary model
//!
//! The target data structures of an extraction pass. A dictionary tells a
//! network consumer, per incoming frame, which bytes to extract, how to
//! decode them, and which frames to pass through raw.

pub mod can;
pub mod complex;

pub use can::{
    CanDecoderDictionary, CanMessageCollectType, CanMessageDecoderMethod, CanMessageFormat,
    CanRawFrameId, CanSignalFormat,
};
pub use complex::{
    ComplexArray, ComplexDataDecoderDictionary, ComplexDataMessageFormat, ComplexDataType,
    ComplexDataTypeId, ComplexStruct, PrimitiveData, PrimitiveType, SignalPathAndPartialSignalId,
};

use crate::manifest::VehicleDataSourceProtocol;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A per-protocol decoder dictionary
///
/// CAN and OBD traffic share the channel/frame-keyed shape; complex data
/// (ROS2-style typed messages) uses its own interface/message-keyed shape.
/// Exhaustive matching on this enum replaces the downcasts a class
/// hierarchy would need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DecoderDictionary {
    CanStyle(CanDecoderDictionary),
    ComplexData(ComplexDataDecoderDictionary),
}

impl DecoderDictionary {
    pub fn as_can(&self) -> Option<&CanDecoderDictionary> {
        match self {
            DecoderDictionary::CanStyle(dict) => Some(dict),
            DecoderDictionary::ComplexData(_) => None,
        }
    }

    pub fn as_complex_data(&self) -> Option<&ComplexDataDecoderDictionary> {
        match self {
            DecoderDictionary::CanStyle(_) => None,
            DecoderDictionary::ComplexData(dict) => Some(dict),
        }
    }
}

/// Output of one extraction pass: every supported protocol is present as a
/// key, `None` when no enabled scheme touches that protocol. Values are
/// immutable snapshots shared with the registered consumers.
pub type DecoderDictionaryMap = BTreeMap<VehicleDataSourceProtocol, Option<Arc<DecoderDictionary>>>;
