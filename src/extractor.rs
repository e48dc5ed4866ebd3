//! Decoder dictionary extraction
//!
//! The join point between the enabled collection schemes (what to observe)
//! and the decoder manifest (how raw traffic maps to typed signals). One
//! pass walks every scheme, classifies each referenced signal by protocol
//! and merges it into the matching per-protocol dictionary.
//!
//! A pass is total: bad input is logged and skipped, never escalated. Merge
//! operations are commutative for the membership sets and monotonic for the
//! collect type, so the end state does not depend on scheme order.

use crate::config::ExtractionConfig;
use crate::dictionary::can::{
    CanDecoderDictionary, CanMessageCollectType, CanMessageDecoderMethod, CanMessageFormat,
    CanRawFrameId, CanSignalFormat,
};
use crate::dictionary::complex::{
    ComplexDataDecoderDictionary, ComplexDataMessageFormat, ComplexDataType, ComplexDataTypeId,
};
use crate::dictionary::{DecoderDictionary, DecoderDictionaryMap};
use crate::manifest::{DecoderManifest, VehicleDataSourceProtocol, SUPPORTED_PROTOCOLS};
use crate::notifier::DictionaryChangeNotifier;
use crate::scheme::CollectionScheme;
use crate::signal::{
    PartialSignalId, SignalId, SignalPath, SignalRef, BYTE_SIZE, INVALID_SIGNAL_ID,
};
use crate::translator::{CanInterfaceTranslator, ChannelId, INVALID_CHANNEL};
use std::collections::hash_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// All OBD signals share one synthetic channel
pub const OBD_CHANNEL_ID: ChannelId = 0;

/// Dictionaries being built during one pass.
///
/// Each protocol has its own typed slot, so a dictionary can never be of the
/// wrong kind for its protocol.
#[derive(Default)]
struct PassDictionaries {
    raw_socket: Option<CanDecoderDictionary>,
    obd: Option<CanDecoderDictionary>,
    complex_data: Option<ComplexDataDecoderDictionary>,
}

impl PassDictionaries {
    fn into_map(self) -> DecoderDictionaryMap {
        let mut map = DecoderDictionaryMap::new();
        for protocol in SUPPORTED_PROTOCOLS {
            map.insert(protocol, None);
        }
        if let Some(dict) = self.raw_socket {
            map.insert(
                VehicleDataSourceProtocol::RawSocket,
                Some(Arc::new(DecoderDictionary::CanStyle(dict))),
            );
        }
        if let Some(dict) = self.obd {
            map.insert(
                VehicleDataSourceProtocol::Obd,
                Some(Arc::new(DecoderDictionary::CanStyle(dict))),
            );
        }
        if let Some(dict) = self.complex_data {
            map.insert(
                VehicleDataSourceProtocol::ComplexData,
                Some(Arc::new(DecoderDictionary::ComplexData(dict))),
            );
        }
        map
    }
}

/// Produces per-protocol decoder dictionaries from the enabled schemes
pub struct DecoderDictionaryExtractor {
    manifest: Arc<dyn DecoderManifest>,
    translator: Arc<CanInterfaceTranslator>,
    config: ExtractionConfig,
}

impl DecoderDictionaryExtractor {
    pub fn new(
        manifest: Arc<dyn DecoderManifest>,
        translator: Arc<CanInterfaceTranslator>,
    ) -> Self {
        Self::with_config(manifest, translator, ExtractionConfig::default())
    }

    pub fn with_config(
        manifest: Arc<dyn DecoderManifest>,
        translator: Arc<CanInterfaceTranslator>,
        config: ExtractionConfig,
    ) -> Self {
        Self {
            manifest,
            translator,
            config,
        }
    }

    /// Run one extraction pass over the enabled schemes.
    ///
    /// Every supported protocol appears as a key in the result; protocols no
    /// scheme touches map to `None` so their consumers shut down decoding.
    pub fn extract(
        &self,
        enabled_schemes: &BTreeMap<String, Arc<CollectionScheme>>,
    ) -> DecoderDictionaryMap {
        let mut dictionaries = PassDictionaries::default();

        for scheme in enabled_schemes.values() {
            for signal_info in scheme.collect_signals() {
                let original_id = signal_info.signal_id;
                // The manifest is keyed on full ids only, so partial ids are
                // resolved through the scheme before any manifest lookup.
                let (signal_id, signal_path) = match SignalRef::from_raw(original_id) {
                    SignalRef::Full(id) => (id, SignalPath::new()),
                    SignalRef::Partial(partial_id) => {
                        match scheme.partial_signal_lookup(partial_id) {
                            Some(location) => {
                                (location.signal_id, location.signal_path.clone())
                            }
                            None => {
                                warn!(
                                    "Unknown partial signal id {} in scheme {}",
                                    partial_id,
                                    scheme.scheme_id()
                                );
                                (INVALID_SIGNAL_ID, SignalPath::new())
                            }
                        }
                    }
                };

                match self.manifest.network_protocol(signal_id) {
                    VehicleDataSourceProtocol::RawSocket => self.add_can_signal(
                        dictionaries.raw_socket.get_or_insert_with(Default::default),
                        signal_id,
                    ),
                    VehicleDataSourceProtocol::Obd => self.add_obd_signal(
                        dictionaries.obd.get_or_insert_with(Default::default),
                        signal_id,
                        original_id,
                    ),
                    VehicleDataSourceProtocol::ComplexData => self.add_complex_signal(
                        dictionaries
                            .complex_data
                            .get_or_insert_with(Default::default),
                        signal_id,
                        original_id,
                        signal_path,
                    ),
                    VehicleDataSourceProtocol::Invalid => {
                        warn!("Invalid protocol provided for signal {}", signal_id);
                    }
                }
            }

            // Raw CAN frames requested by the scheme. A frame that already
            // has signals to decode is upgraded to collect both.
            if !scheme.collect_raw_can_frames().is_empty() {
                let dict = dictionaries.raw_socket.get_or_insert_with(Default::default);
                for frame_info in scheme.collect_raw_can_frames() {
                    let channel_id = self.translator.channel_id_of(&frame_info.interface_id);
                    if channel_id == INVALID_CHANNEL {
                        warn!("Invalid interface id provided: {}", frame_info.interface_id);
                        continue;
                    }
                    let frames = dict.decoder_method.entry(channel_id).or_default();
                    match frames.entry(frame_info.frame_id) {
                        Entry::Vacant(entry) => {
                            // No signals to decode on this frame so far
                            entry.insert(CanMessageDecoderMethod {
                                collect_type: CanMessageCollectType::Raw,
                                format: CanMessageFormat::default(),
                            });
                        }
                        Entry::Occupied(mut entry) => {
                            if entry.get().collect_type == CanMessageCollectType::Decode {
                                entry.get_mut().collect_type =
                                    CanMessageCollectType::RawAndDecode;
                            }
                        }
                    }
                }
            }
        }

        dictionaries.into_map()
    }

    /// Run one pass and hand the result to the notifier
    pub fn extract_and_notify(
        &self,
        enabled_schemes: &BTreeMap<String, Arc<CollectionScheme>>,
        notifier: &DictionaryChangeNotifier,
    ) -> DecoderDictionaryMap {
        let dictionaries = self.extract(enabled_schemes);
        notifier.notify(&dictionaries);
        dictionaries
    }

    fn add_can_signal(&self, dict: &mut CanDecoderDictionary, signal_id: SignalId) {
        let Some((frame_id, interface_id)) = self.manifest.can_frame_and_interface(signal_id)
        else {
            warn!("No CAN frame registered for signal {}", signal_id);
            return;
        };
        let channel_id = self.translator.channel_id_of(&interface_id);
        if channel_id == INVALID_CHANNEL {
            warn!("Invalid interface id provided: {}", interface_id);
            return;
        }

        let existing = dict
            .decoder_method
            .get(&channel_id)
            .and_then(|frames| frames.get(&frame_id))
            .map(|method| method.collect_type);
        match existing {
            // First reference to this frame: decode it, with the full signal
            // list from the manifest. Raw-only entries carry no format, so
            // upgrading one to decoding seeds the format the same way.
            None | Some(CanMessageCollectType::Raw) => {
                let Some(format) = self.manifest.can_message_format(frame_id, &interface_id)
                else {
                    warn!(
                        "No CAN message format for frame {:#x} on interface {}",
                        frame_id, interface_id
                    );
                    return;
                };
                let collect_type = if existing.is_some() {
                    CanMessageCollectType::RawAndDecode
                } else {
                    CanMessageCollectType::Decode
                };
                dict.decoder_method.entry(channel_id).or_default().insert(
                    frame_id,
                    CanMessageDecoderMethod {
                        collect_type,
                        format,
                    },
                );
            }
            // The frame is already decoded; its format lists all signals.
            Some(CanMessageCollectType::Decode) | Some(CanMessageCollectType::RawAndDecode) => {}
        }
        dict.signal_ids_to_collect.insert(signal_id);
    }

    fn add_obd_signal(
        &self,
        dict: &mut CanDecoderDictionary,
        signal_id: SignalId,
        original_id: SignalId,
    ) {
        let Some(pid_format) = self.manifest.pid_decoder_format(signal_id) else {
            warn!("No PID decoder format for OBD signal {}", signal_id);
            return;
        };

        dict.signal_ids_to_collect.insert(signal_id);
        let frames = dict.decoder_method.entry(OBD_CHANNEL_ID).or_default();
        let method = frames
            .entry(CanRawFrameId::from(pid_format.pid))
            .or_insert_with(|| CanMessageDecoderMethod {
                collect_type: CanMessageCollectType::Decode,
                format: CanMessageFormat {
                    message_id: u32::from(pid_format.pid),
                    size_in_bytes: pid_format.pid_response_length as u8,
                    signals: Vec::new(),
                },
            });

        // The OBD layout is byte oriented; express it in the generic
        // bit-position signal format. The signal id recorded here is the
        // scheme's original id, not the resolved one.
        method.format.signals.push(CanSignalFormat {
            signal_id: original_id,
            first_bit_position: (pid_format.start_byte * BYTE_SIZE
                + usize::from(pid_format.bit_right_shift)) as u16,
            size_in_bits: ((pid_format.byte_length - 1) * BYTE_SIZE
                + usize::from(pid_format.bit_mask_length)) as u16,
            is_big_endian: false,
            is_signed: false,
            factor: pid_format.scaling,
            offset: pid_format.offset,
        });
    }

    fn add_complex_signal(
        &self,
        dict: &mut ComplexDataDecoderDictionary,
        signal_id: SignalId,
        original_id: PartialSignalId,
        signal_path: SignalPath,
    ) {
        if signal_id == INVALID_SIGNAL_ID {
            // Partial resolution failed earlier; already logged.
            return;
        }
        let Some(decoder_format) = self.manifest.complex_signal_format(signal_id) else {
            warn!("No complex decoder format for signal {}", signal_id);
            return;
        };
        if decoder_format.interface_id.is_empty() {
            warn!("Complex signal {} has an empty interface id", signal_id);
            return;
        }

        let entry = dict
            .decoder_method
            .entry(decoder_format.interface_id)
            .or_default()
            .entry(decoder_format.message_id)
            .or_default();
        self.put_complex_signal(
            entry,
            signal_id,
            original_id,
            signal_path,
            decoder_format.root_type_id,
        );
    }

    /// Merge one complex signal reference into its message entry.
    ///
    /// The first accepted reference assigns the parent signal and root type
    /// and expands the reachable type graph; later references only add their
    /// path (or the collect-raw flag).
    fn put_complex_signal(
        &self,
        complex_signal: &mut ComplexDataMessageFormat,
        signal_id: SignalId,
        partial_signal_id: PartialSignalId,
        signal_path: SignalPath,
        root_type_id: ComplexDataTypeId,
    ) {
        if !complex_signal.is_assigned() {
            complex_signal.signal_id = signal_id;
            complex_signal.root_type_id = root_type_id;

            // Iterative depth-first expansion of the type graph, bounded so
            // a malformed manifest cannot run away. The map never shrinks
            // afterwards.
            let mut types_to_traverse = vec![root_type_id];
            let mut elements_left = self.config.max_complex_types;
            while elements_left > 0 {
                let Some(type_id) = types_to_traverse.pop() else {
                    break;
                };
                elements_left -= 1;
                if complex_signal.complex_type_map.contains_key(&type_id) {
                    continue;
                }
                let data_type = self.manifest.complex_data_type(type_id);
                match &data_type {
                    ComplexDataType::Invalid => {
                        error!("Invalid complex type id {}", type_id);
                        continue;
                    }
                    ComplexDataType::Array(array) => {
                        types_to_traverse.push(array.repeated_type_id);
                    }
                    ComplexDataType::Struct(members) => {
                        types_to_traverse.extend(members.ordered_type_ids.iter().copied());
                    }
                    ComplexDataType::Primitive(_) => {}
                }
                complex_signal.complex_type_map.insert(type_id, data_type);
            }
            if elements_left == 0 && !types_to_traverse.is_empty() {
                warn!(
                    "Type traversal for complex signal {} truncated after {} types",
                    signal_id, self.config.max_complex_types
                );
            }
            debug!(
                "Complex signal {} mapped with {} reachable types",
                signal_id,
                complex_signal.complex_type_map.len()
            );
        } else if complex_signal.root_type_id != root_type_id {
            warn!(
                "Complex signal {} references root type {} but type {} is already active; keeping the first",
                signal_id, root_type_id, complex_signal.root_type_id
            );
        }

        if signal_path.is_empty() {
            complex_signal.collect_raw = true;
        } else {
            complex_signal.insert_signal_path(signal_path, partial_signal_id);
        }
    }
}
