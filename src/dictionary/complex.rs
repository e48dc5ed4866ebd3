//! Complex-data decoder dictionary
//!
//! Complex signals (ROS2-style typed messages) are described by a graph of
//! recursively defined data types. Types reference each other only through
//! numeric ids; the dictionary stores the reachable part of the graph in a
//! flat id-keyed map so no node ever owns another.

use crate::signal::{InterfaceId, PartialSignalId, SignalId, SignalPath, INVALID_SIGNAL_ID};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Numeric id of a node in the complex data-type graph
pub type ComplexDataTypeId = u32;

/// Message id inside a complex-data interface (topic name or numeric id as text)
pub type ComplexDataMessageId = String;

/// Scalar type of a complex primitive leaf
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveType {
    Bool,
    #[default]
    Uint8,
    Int8,
    Uint16,
    Int16,
    Uint32,
    Int32,
    Uint64,
    Int64,
    Float32,
    Float64,
}

/// A primitive leaf of the type graph
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrimitiveData {
    pub primitive_type: PrimitiveType,
    pub scaling: f64,
    pub offset: f64,
}

impl Default for PrimitiveData {
    fn default() -> Self {
        Self {
            primitive_type: PrimitiveType::default(),
            scaling: 1.0,
            offset: 0.0,
        }
    }
}

/// A fixed-size array of one repeated element type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexArray {
    pub size: u32,
    pub repeated_type_id: ComplexDataTypeId,
}

/// A struct with an ordered list of member types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexStruct {
    pub ordered_type_ids: Vec<ComplexDataTypeId>,
}

/// One node of the complex data-type graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexDataType {
    Primitive(PrimitiveData),
    Array(ComplexArray),
    Struct(ComplexStruct),
    /// Unknown type id; never stored in a dictionary
    #[default]
    Invalid,
}

impl ComplexDataType {
    pub fn is_invalid(&self) -> bool {
        matches!(self, ComplexDataType::Invalid)
    }
}

/// A collected path into a complex signal together with the partial signal
/// id the scheme assigned to it
///
/// The derived ordering is lexicographic over the path, then the partial id,
/// which is exactly the order `signal_paths` is kept in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SignalPathAndPartialSignalId {
    pub signal_path: SignalPath,
    pub partial_signal_id: PartialSignalId,
}

/// Decoder entry for one (interface, message) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexDataMessageFormat {
    /// Parent full signal id; `INVALID_SIGNAL_ID` until first assigned
    pub signal_id: SignalId,
    /// Top-level type of the message
    pub root_type_id: ComplexDataTypeId,
    /// Transitive closure of types reachable from `root_type_id`, bounded
    /// by the traversal budget
    pub complex_type_map: HashMap<ComplexDataTypeId, ComplexDataType>,
    /// Some scheme asked for the whole signal (empty path)
    pub collect_raw: bool,
    /// Collected paths, sorted ascending
    pub signal_paths: Vec<SignalPathAndPartialSignalId>,
}

impl Default for ComplexDataMessageFormat {
    fn default() -> Self {
        Self {
            signal_id: INVALID_SIGNAL_ID,
            root_type_id: 0,
            complex_type_map: HashMap::new(),
            collect_raw: false,
            signal_paths: Vec::new(),
        }
    }
}

impl ComplexDataMessageFormat {
    /// The entry has been populated by at least one accepted signal
    pub fn is_assigned(&self) -> bool {
        self.signal_id != INVALID_SIGNAL_ID
    }

    /// Insert a collected path keeping `signal_paths` sorted
    pub fn insert_signal_path(&mut self, signal_path: SignalPath, partial_signal_id: PartialSignalId) {
        let entry = SignalPathAndPartialSignalId {
            signal_path,
            partial_signal_id,
        };
        let pos = self.signal_paths.partition_point(|existing| *existing <= entry);
        self.signal_paths.insert(pos, entry);
    }
}

/// Decoder dictionary for complex-data traffic
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComplexDataDecoderDictionary {
    /// interface id -> message id -> decoder entry
    pub decoder_method: HashMap<InterfaceId, HashMap<ComplexDataMessageId, ComplexDataMessageFormat>>,
}

impl ComplexDataDecoderDictionary {
    /// Look up the decoder entry for an (interface, message) pair
    pub fn message_format(
        &self,
        interface_id: &str,
        message_id: &str,
    ) -> Option<&ComplexDataMessageFormat> {
        self.decoder_method.get(interface_id)?.get(message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_path_ordering_is_lexicographic() {
        let shorter = SignalPathAndPartialSignalId {
            signal_path: vec![1],
            partial_signal_id: 0x8000_0005,
        };
        let longer = SignalPathAndPartialSignalId {
            signal_path: vec![1, 0],
            partial_signal_id: 0x8000_0001,
        };
        let other_branch = SignalPathAndPartialSignalId {
            signal_path: vec![2],
            partial_signal_id: 0x8000_0002,
        };
        assert!(shorter < longer);
        assert!(longer < other_branch);
    }

    #[test]
    fn test_insert_signal_path_keeps_sorted_order() {
        let mut format = ComplexDataMessageFormat::default();
        format.insert_signal_path(vec![2], 0x8000_0002);
        format.insert_signal_path(vec![0, 15, 1], 0x8000_0001);
        format.insert_signal_path(vec![1], 0x8000_0003);
        format.insert_signal_path(vec![0], 0x8000_0004);

        let paths: Vec<&SignalPath> =
            format.signal_paths.iter().map(|p| &p.signal_path).collect();
        assert_eq!(paths, vec![&vec![0], &vec![0, 15, 1], &vec![1], &vec![2]]);
        assert!(format
            .signal_paths
            .windows(2)
            .all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn test_insert_equal_paths_ties_break_on_partial_id() {
        let mut format = ComplexDataMessageFormat::default();
        format.insert_signal_path(vec![3], 0x8000_0009);
        format.insert_signal_path(vec![3], 0x8000_0001);

        assert_eq!(format.signal_paths[0].partial_signal_id, 0x8000_0001);
        assert_eq!(format.signal_paths[1].partial_signal_id, 0x8000_0009);
    }

    #[test]
    fn test_new_entry_is_unassigned() {
        let format = ComplexDataMessageFormat::default();
        assert!(!format.is_assigned());
        assert!(!format.collect_raw);
        assert!(format.complex_type_map.is_empty());
    }
}
