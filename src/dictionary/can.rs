//! CAN-style decoder dictionary
//!
//! Used for both raw-socket CAN and OBD traffic. Keys are the numeric
//! channel id and the raw frame id; for OBD the PID occupies the frame-id
//! slot and a single synthetic channel 0 is used.

use crate::signal::SignalId;
use crate::translator::ChannelId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Raw (untranslated) CAN frame identifier
pub type CanRawFrameId = u32;

/// How a matched CAN frame is captured
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanMessageCollectType {
    /// Pass the frame bytes through undecoded
    Raw,
    /// Decode the signals listed in the format
    #[default]
    Decode,
    /// Both: pass the raw bytes through and decode the listed signals
    RawAndDecode,
}

impl CanMessageCollectType {
    /// At least one signal of the frame is decoded
    pub fn decodes(&self) -> bool {
        matches!(self, Self::Decode | Self::RawAndDecode)
    }

    /// The raw frame bytes are passed through
    pub fn collects_raw(&self) -> bool {
        matches!(self, Self::Raw | Self::RawAndDecode)
    }
}

/// Bit layout and scaling of one signal inside a CAN message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanSignalFormat {
    pub signal_id: SignalId,
    pub first_bit_position: u16,
    pub size_in_bits: u16,
    #[serde(default)]
    pub is_big_endian: bool,
    #[serde(default)]
    pub is_signed: bool,
    pub factor: f64,
    pub offset: f64,
}

/// Layout of one CAN message: its id, payload size and signal list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanMessageFormat {
    pub message_id: u32,
    pub size_in_bytes: u8,
    #[serde(default)]
    pub signals: Vec<CanSignalFormat>,
}

/// Decoder entry for one (channel, frame) pair
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanMessageDecoderMethod {
    pub collect_type: CanMessageCollectType,
    pub format: CanMessageFormat,
}

/// Decoder dictionary for CAN-style traffic
///
/// A channel id appears iff at least one frame under it exists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanDecoderDictionary {
    /// channel id -> raw frame id (or PID) -> decoder method
    pub decoder_method: HashMap<ChannelId, HashMap<CanRawFrameId, CanMessageDecoderMethod>>,
    /// Every signal id accepted into this dictionary
    pub signal_ids_to_collect: HashSet<SignalId>,
}

impl CanDecoderDictionary {
    /// Look up the decoder entry for a (channel, frame) pair
    pub fn decoder_method_for(
        &self,
        channel_id: ChannelId,
        frame_id: CanRawFrameId,
    ) -> Option<&CanMessageDecoderMethod> {
        self.decoder_method.get(&channel_id)?.get(&frame_id)
    }
}
