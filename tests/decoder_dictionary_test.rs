//! End-to-end extraction scenarios against synthetic decoder manifests

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use telemsrv::dictionary::can::{
    CanDecoderDictionary, CanMessageCollectType, CanMessageFormat, CanSignalFormat,
};
use telemsrv::dictionary::complex::{
    ComplexArray, ComplexDataDecoderDictionary, ComplexDataType, ComplexStruct, PrimitiveData,
};
use telemsrv::dictionary::DecoderDictionaryMap;
use telemsrv::extractor::OBD_CHANNEL_ID;
use telemsrv::manifest::{
    ComplexSignalDecoderFormat, InMemoryDecoderManifest, PidSignalDecoderFormat,
    VehicleDataSourceProtocol, SUPPORTED_PROTOCOLS,
};
use telemsrv::notifier::ActiveDecoderDictionaryListener;
use telemsrv::{
    CanInterfaceTranslator, CollectionScheme, DecoderDictionary, DecoderDictionaryExtractor,
    DictionaryChangeNotifier,
};

// ============================================================================
// Fixtures
// ============================================================================

/// Signal 7 on "can0", frame 0x100, one 16-bit signal starting at bit 0
fn single_can_signal_manifest() -> InMemoryDecoderManifest {
    let mut manifest = InMemoryDecoderManifest::new();
    manifest.add_can_signal(7, "can0", 0x100);
    manifest.add_can_message_format(
        "can0",
        CanMessageFormat {
            message_id: 0x100,
            size_in_bytes: 8,
            signals: vec![CanSignalFormat {
                signal_id: 7,
                first_bit_position: 0,
                size_in_bits: 16,
                is_big_endian: false,
                is_signed: false,
                factor: 0.5,
                offset: -40.0,
            }],
        },
    );
    manifest
}

/// Signals 11 and 12 on PID 0x0C at start bytes 0 and 2
fn obd_manifest() -> InMemoryDecoderManifest {
    let mut manifest = InMemoryDecoderManifest::new();
    for (signal_id, start_byte) in [(11, 0), (12, 2)] {
        manifest.add_pid_signal(
            signal_id,
            PidSignalDecoderFormat {
                pid: 0x0C,
                pid_response_length: 4,
                start_byte,
                byte_length: 2,
                bit_right_shift: 0,
                bit_mask_length: 8,
                scaling: 0.25,
                offset: 0.0,
            },
        );
    }
    manifest
}

/// Complex signal 200 on interface "ros2", message "/objects".
/// T1 = array of T2, T2 = struct { T3, T4 }, T3/T4 primitive.
fn complex_manifest() -> InMemoryDecoderManifest {
    let mut manifest = InMemoryDecoderManifest::new();
    manifest.add_complex_signal(
        200,
        ComplexSignalDecoderFormat {
            interface_id: "ros2".to_string(),
            message_id: "/objects".to_string(),
            root_type_id: 1,
        },
    );
    manifest.add_complex_type(
        1,
        ComplexDataType::Array(ComplexArray {
            size: 16,
            repeated_type_id: 2,
        }),
    );
    manifest.add_complex_type(
        2,
        ComplexDataType::Struct(ComplexStruct {
            ordered_type_ids: vec![3, 4],
        }),
    );
    manifest.add_complex_type(3, ComplexDataType::Primitive(PrimitiveData::default()));
    manifest.add_complex_type(4, ComplexDataType::Primitive(PrimitiveData::default()));
    manifest
}

/// Translator where "can0" maps to channel 3
fn translator() -> Arc<CanInterfaceTranslator> {
    let translator = CanInterfaceTranslator::new();
    translator.register("vcan0");
    translator.register("vcan1");
    translator.register("vcan2");
    assert_eq!(translator.register("can0"), 3);
    Arc::new(translator)
}

fn enabled(schemes: Vec<CollectionScheme>) -> BTreeMap<String, Arc<CollectionScheme>> {
    schemes
        .into_iter()
        .map(|scheme| (scheme.scheme_id().to_string(), Arc::new(scheme)))
        .collect()
}

fn extractor(manifest: InMemoryDecoderManifest) -> DecoderDictionaryExtractor {
    DecoderDictionaryExtractor::new(Arc::new(manifest), translator())
}

fn can_dictionary(
    map: &DecoderDictionaryMap,
    protocol: VehicleDataSourceProtocol,
) -> CanDecoderDictionary {
    map[&protocol]
        .as_ref()
        .expect("dictionary present")
        .as_can()
        .expect("CAN-style dictionary")
        .clone()
}

fn complex_dictionary(map: &DecoderDictionaryMap) -> ComplexDataDecoderDictionary {
    map[&VehicleDataSourceProtocol::ComplexData]
        .as_ref()
        .expect("dictionary present")
        .as_complex_data()
        .expect("complex-data dictionary")
        .clone()
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_single_can_signal() {
    let mut scheme = CollectionScheme::new("s1");
    scheme.collect_signal(7);

    let map = extractor(single_can_signal_manifest()).extract(&enabled(vec![scheme]));

    let dict = can_dictionary(&map, VehicleDataSourceProtocol::RawSocket);
    let method = dict.decoder_method_for(3, 0x100).unwrap();
    assert_eq!(method.collect_type, CanMessageCollectType::Decode);
    assert_eq!(method.format.message_id, 0x100);
    assert_eq!(method.format.size_in_bytes, 8);
    assert_eq!(method.format.signals.len(), 1);
    assert_eq!(method.format.signals[0].signal_id, 7);
    assert!(dict.signal_ids_to_collect.contains(&7));
    assert_eq!(dict.signal_ids_to_collect.len(), 1);

    // Untouched protocols are disabled
    assert!(map[&VehicleDataSourceProtocol::Obd].is_none());
    assert!(map[&VehicleDataSourceProtocol::ComplexData].is_none());
}

#[test]
fn test_raw_frame_upgrades_to_raw_and_decode() {
    let mut scheme = CollectionScheme::new("s1");
    scheme.collect_signal(7);
    scheme.add_raw_can_frame(0x100, "can0");

    let map = extractor(single_can_signal_manifest()).extract(&enabled(vec![scheme]));

    let dict = can_dictionary(&map, VehicleDataSourceProtocol::RawSocket);
    let method = dict.decoder_method_for(3, 0x100).unwrap();
    assert_eq!(method.collect_type, CanMessageCollectType::RawAndDecode);
    assert_eq!(method.format.signals.len(), 1);
    assert_eq!(method.format.size_in_bytes, 8);
}

#[test]
fn test_raw_and_decode_is_reached_from_either_side() {
    // Decode request and raw request in separate schemes; scheme ids are
    // chosen so the two maps iterate the schemes in opposite orders.
    let decode_scheme = |id: &str| {
        let mut scheme = CollectionScheme::new(id);
        scheme.collect_signal(7);
        scheme
    };
    let raw_scheme = |id: &str| {
        let mut scheme = CollectionScheme::new(id);
        scheme.add_raw_can_frame(0x100, "can0");
        scheme
    };

    let first = extractor(single_can_signal_manifest())
        .extract(&enabled(vec![decode_scheme("a"), raw_scheme("b")]));
    let second = extractor(single_can_signal_manifest())
        .extract(&enabled(vec![raw_scheme("a"), decode_scheme("b")]));

    for map in [&first, &second] {
        let dict = can_dictionary(map, VehicleDataSourceProtocol::RawSocket);
        let method = dict.decoder_method_for(3, 0x100).unwrap();
        assert_eq!(method.collect_type, CanMessageCollectType::RawAndDecode);
        // The format is seeded from the manifest even when the raw request
        // created the entry first
        assert_eq!(method.format.signals.len(), 1);
    }
    assert_eq!(first, second);
}

#[test]
fn test_raw_only_frame() {
    let mut scheme = CollectionScheme::new("s1");
    scheme.add_raw_can_frame(0x100, "can0");

    let map = extractor(single_can_signal_manifest()).extract(&enabled(vec![scheme]));

    let dict = can_dictionary(&map, VehicleDataSourceProtocol::RawSocket);
    let method = dict.decoder_method_for(3, 0x100).unwrap();
    assert_eq!(method.collect_type, CanMessageCollectType::Raw);
    assert_eq!(method.format, CanMessageFormat::default());
    assert!(dict.signal_ids_to_collect.is_empty());
}

#[test]
fn test_obd_pid_merging() {
    let mut scheme = CollectionScheme::new("s1");
    scheme.collect_signal(11);
    scheme.collect_signal(12);

    let map = extractor(obd_manifest()).extract(&enabled(vec![scheme]));

    let dict = can_dictionary(&map, VehicleDataSourceProtocol::Obd);
    let method = dict.decoder_method_for(OBD_CHANNEL_ID, 0x0C).unwrap();
    assert_eq!(method.format.message_id, 0x0C);
    assert_eq!(method.format.size_in_bytes, 4);
    // Two signals merged into one PID entry, in insertion order
    assert_eq!(method.format.signals.len(), 2);
    assert_eq!(method.format.signals[0].signal_id, 11);
    assert_eq!(method.format.signals[0].first_bit_position, 0);
    assert_eq!(method.format.signals[0].size_in_bits, 16);
    assert_eq!(method.format.signals[1].signal_id, 12);
    assert_eq!(method.format.signals[1].first_bit_position, 16);
    assert_eq!(dict.signal_ids_to_collect.len(), 2);
    assert!(dict.signal_ids_to_collect.contains(&11));
    assert!(dict.signal_ids_to_collect.contains(&12));
}

#[test]
fn test_partial_complex_signal() {
    let mut scheme = CollectionScheme::new("s1");
    scheme.map_partial_signal(0x8000_0001, 200, vec![0, 15, 1]);
    scheme.collect_signal(0x8000_0001);

    let map = extractor(complex_manifest()).extract(&enabled(vec![scheme]));

    let dict = complex_dictionary(&map);
    let entry = dict.message_format("ros2", "/objects").unwrap();
    assert_eq!(entry.signal_id, 200);
    assert_eq!(entry.root_type_id, 1);
    assert_eq!(entry.complex_type_map.len(), 4);
    for type_id in [1, 2, 3, 4] {
        assert!(entry.complex_type_map.contains_key(&type_id));
    }
    assert!(!entry.collect_raw);
    assert_eq!(entry.signal_paths.len(), 1);
    assert_eq!(entry.signal_paths[0].signal_path, vec![0, 15, 1]);
    assert_eq!(entry.signal_paths[0].partial_signal_id, 0x8000_0001);
}

#[test]
fn test_mixed_whole_and_partial_references() {
    let mut whole = CollectionScheme::new("a-whole");
    whole.collect_signal(200);
    let mut partial = CollectionScheme::new("b-partial");
    partial.map_partial_signal(0x8000_0002, 200, vec![1]);
    partial.collect_signal(0x8000_0002);

    let map = extractor(complex_manifest()).extract(&enabled(vec![whole, partial]));

    let dict = complex_dictionary(&map);
    assert_eq!(dict.decoder_method.len(), 1);
    let entry = dict.message_format("ros2", "/objects").unwrap();
    assert_eq!(entry.signal_id, 200);
    assert!(entry.collect_raw);
    assert_eq!(entry.signal_paths.len(), 1);
    assert_eq!(entry.signal_paths[0].signal_path, vec![1]);
    assert_eq!(entry.signal_paths[0].partial_signal_id, 0x8000_0002);
    assert_eq!(entry.complex_type_map.len(), 4);
}

// ============================================================================
// Laws
// ============================================================================

fn combined_manifest() -> InMemoryDecoderManifest {
    let mut manifest = single_can_signal_manifest();
    for (signal_id, start_byte) in [(11, 0), (12, 2)] {
        manifest.add_pid_signal(
            signal_id,
            PidSignalDecoderFormat {
                pid: 0x0C,
                pid_response_length: 4,
                start_byte,
                byte_length: 2,
                bit_right_shift: 0,
                bit_mask_length: 8,
                scaling: 0.25,
                offset: 0.0,
            },
        );
    }
    manifest.add_complex_signal(
        200,
        ComplexSignalDecoderFormat {
            interface_id: "ros2".to_string(),
            message_id: "/objects".to_string(),
            root_type_id: 1,
        },
    );
    manifest.add_complex_type(
        1,
        ComplexDataType::Array(ComplexArray {
            size: 16,
            repeated_type_id: 2,
        }),
    );
    manifest.add_complex_type(
        2,
        ComplexDataType::Struct(ComplexStruct {
            ordered_type_ids: vec![3, 4],
        }),
    );
    manifest.add_complex_type(3, ComplexDataType::Primitive(PrimitiveData::default()));
    manifest.add_complex_type(4, ComplexDataType::Primitive(PrimitiveData::default()));
    manifest
}

fn combined_schemes() -> Vec<CollectionScheme> {
    let mut first = CollectionScheme::new("s1");
    first.collect_signal(7);
    first.collect_signal(11);
    first.add_raw_can_frame(0x100, "can0");
    let mut second = CollectionScheme::new("s2");
    second.collect_signal(12);
    second.map_partial_signal(0x8000_0001, 200, vec![0, 15, 1]);
    second.collect_signal(0x8000_0001);
    vec![first, second]
}

#[test]
fn test_extraction_is_deterministic() {
    let first = extractor(combined_manifest()).extract(&enabled(combined_schemes()));
    let second = extractor(combined_manifest()).extract(&enabled(combined_schemes()));
    assert_eq!(first, second);
}

#[test]
fn test_every_supported_protocol_is_present() {
    let map = extractor(InMemoryDecoderManifest::new()).extract(&BTreeMap::new());
    assert_eq!(map.len(), SUPPORTED_PROTOCOLS.len());
    for protocol in SUPPORTED_PROTOCOLS {
        assert!(map[&protocol].is_none());
    }
}

#[test]
fn test_collected_signals_are_members() {
    let map = extractor(combined_manifest()).extract(&enabled(combined_schemes()));
    let can = can_dictionary(&map, VehicleDataSourceProtocol::RawSocket);
    assert!(can.signal_ids_to_collect.contains(&7));
    let obd = can_dictionary(&map, VehicleDataSourceProtocol::Obd);
    assert!(obd.signal_ids_to_collect.contains(&11));
    assert!(obd.signal_ids_to_collect.contains(&12));
}

/// The OBD per-signal format stores the scheme's original id even when it
/// was a partial reference, while the membership set stores the resolved id.
/// The RAW-SOCKET path uses the resolved id everywhere.
#[test]
fn test_obd_signal_format_keeps_scheme_signal_id() {
    let mut scheme = CollectionScheme::new("s1");
    scheme.map_partial_signal(0x8000_0007, 11, vec![2]);
    scheme.collect_signal(0x8000_0007);

    let map = extractor(obd_manifest()).extract(&enabled(vec![scheme]));

    let dict = can_dictionary(&map, VehicleDataSourceProtocol::Obd);
    let method = dict.decoder_method_for(OBD_CHANNEL_ID, 0x0C).unwrap();
    // Pre-resolution id in the signal format, for consumer reference
    assert_eq!(method.format.signals[0].signal_id, 0x8000_0007);
    // Resolved id in the membership set
    assert!(dict.signal_ids_to_collect.contains(&11));
    assert!(!dict.signal_ids_to_collect.contains(&0x8000_0007));
}

// ============================================================================
// Notifier
// ============================================================================

struct RecordingListener {
    calls: AtomicUsize,
    seen: Mutex<Vec<(VehicleDataSourceProtocol, bool)>>,
}

impl RecordingListener {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }
}

impl ActiveDecoderDictionaryListener for RecordingListener {
    fn on_change_of_active_dictionary(
        &self,
        dictionary: Option<Arc<DecoderDictionary>>,
        protocol: VehicleDataSourceProtocol,
    ) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.seen.lock().push((protocol, dictionary.is_some()));
    }
}

#[test]
fn test_every_listener_is_notified_once_per_protocol() {
    let notifier = DictionaryChangeNotifier::new();
    let first = Arc::new(RecordingListener::new());
    let second = Arc::new(RecordingListener::new());
    notifier.register(first.clone());
    notifier.register(second.clone());

    let mut scheme = CollectionScheme::new("s1");
    scheme.collect_signal(7);
    let map =
        extractor(single_can_signal_manifest()).extract_and_notify(&enabled(vec![scheme]), &notifier);

    assert!(map[&VehicleDataSourceProtocol::RawSocket].is_some());
    for listener in [&first, &second] {
        assert_eq!(listener.calls.load(Ordering::Relaxed), 3);
        let seen = listener.seen.lock();
        assert!(seen.contains(&(VehicleDataSourceProtocol::RawSocket, true)));
        assert!(seen.contains(&(VehicleDataSourceProtocol::Obd, false)));
        assert!(seen.contains(&(VehicleDataSourceProtocol::ComplexData, false)));
    }
}
