//! Collection scheme model
//!
//! A collection scheme declares which signals and raw CAN frames the agent
//! must observe. Scheme storage, transport and condition evaluation live
//! upstream; the extraction core only reads the collect lists and the
//! partial-signal lookup table.

use crate::dictionary::can::CanRawFrameId;
use crate::signal::{InterfaceId, PartialSignalId, SignalId, SignalPath};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One signal the scheme wants collected
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignalCollectionInfo {
    /// Raw 32-bit signal id; may carry the partial-signal high-bit tag
    pub signal_id: SignalId,
    /// Ring buffer size for samples of this signal
    #[serde(default)]
    pub sample_buffer_size: u32,
    /// Minimum interval between two collected samples
    #[serde(default)]
    pub minimum_sample_interval_ms: u32,
    /// Fixed averaging window, 0 to disable
    #[serde(default)]
    pub fixed_window_period_ms: u32,
    /// Signal is only referenced by conditions, not uploaded
    #[serde(default)]
    pub is_condition_only_signal: bool,
}

/// One raw CAN frame the scheme wants passed through undecoded
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanFrameCollectionInfo {
    pub frame_id: CanRawFrameId,
    pub interface_id: InterfaceId,
}

/// Resolution of a partial signal id: the parent full signal and the path
/// into its complex type tree
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartialSignalLocation {
    pub signal_id: SignalId,
    pub signal_path: SignalPath,
}

/// A single collection scheme
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionScheme {
    scheme_id: String,
    #[serde(default)]
    collect_signals: Vec<SignalCollectionInfo>,
    #[serde(default)]
    collect_raw_can_frames: Vec<CanFrameCollectionInfo>,
    #[serde(default)]
    partial_signal_lookup: HashMap<PartialSignalId, PartialSignalLocation>,
}

impl CollectionScheme {
    pub fn new(scheme_id: impl Into<String>) -> Self {
        Self {
            scheme_id: scheme_id.into(),
            ..Default::default()
        }
    }

    pub fn scheme_id(&self) -> &str {
        &self.scheme_id
    }

    /// Signals this scheme collects
    pub fn collect_signals(&self) -> &[SignalCollectionInfo] {
        &self.collect_signals
    }

    /// Raw CAN frames this scheme collects
    pub fn collect_raw_can_frames(&self) -> &[CanFrameCollectionInfo] {
        &self.collect_raw_can_frames
    }

    /// Resolve a partial signal id against this scheme's lookup table
    pub fn partial_signal_lookup(&self, id: PartialSignalId) -> Option<&PartialSignalLocation> {
        self.partial_signal_lookup.get(&id)
    }

    pub fn add_signal(&mut self, info: SignalCollectionInfo) -> &mut Self {
        self.collect_signals.push(info);
        self
    }

    /// Shorthand for collecting a signal with default sampling settings
    pub fn collect_signal(&mut self, signal_id: SignalId) -> &mut Self {
        self.add_signal(SignalCollectionInfo {
            signal_id,
            ..Default::default()
        })
    }

    pub fn add_raw_can_frame(
        &mut self,
        frame_id: CanRawFrameId,
        interface_id: impl Into<InterfaceId>,
    ) -> &mut Self {
        self.collect_raw_can_frames.push(CanFrameCollectionInfo {
            frame_id,
            interface_id: interface_id.into(),
        });
        self
    }

    pub fn map_partial_signal(
        &mut self,
        partial_id: PartialSignalId,
        signal_id: SignalId,
        signal_path: SignalPath,
    ) -> &mut Self {
        self.partial_signal_lookup.insert(
            partial_id,
            PartialSignalLocation {
                signal_id,
                signal_path,
            },
        );
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_signal_lookup() {
        let mut scheme = CollectionScheme::new("scheme-1");
        scheme.map_partial_signal(0x8000_0001, 200, vec![0, 15, 1]);

        let location = scheme.partial_signal_lookup(0x8000_0001).unwrap();
        assert_eq!(location.signal_id, 200);
        assert_eq!(location.signal_path, vec![0, 15, 1]);
        assert!(scheme.partial_signal_lookup(0x8000_0002).is_none());
    }

    #[test]
    fn test_scheme_deserializes_with_defaults() {
        let scheme: CollectionScheme =
            serde_json::from_str(r#"{"scheme_id": "s1"}"#).unwrap();
        assert_eq!(scheme.scheme_id(), "s1");
        assert!(scheme.collect_signals().is_empty());
        assert!(scheme.collect_raw_can_frames().is_empty());
    }
}
