//! Dictionary change notification
//!
//! After each successful extraction pass the new per-protocol dictionaries
//! are fanned out to the registered network consumers. Dictionaries are
//! immutable `Arc` snapshots; a consumer swaps its reference and keeps
//! decoding without losing frames.

use crate::dictionary::{DecoderDictionary, DecoderDictionaryMap};
use crate::manifest::VehicleDataSourceProtocol;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// Consumer of decoder dictionary updates
///
/// `None` means the protocol has no active dictionary and the consumer
/// should stop decoding until a later pass re-enables it.
pub trait ActiveDecoderDictionaryListener: Send + Sync {
    fn on_change_of_active_dictionary(
        &self,
        dictionary: Option<Arc<DecoderDictionary>>,
        protocol: VehicleDataSourceProtocol,
    );
}

/// Registry of dictionary consumers
///
/// Registration and unregistration happen while no pass is running;
/// notification is synchronous on the extraction thread.
#[derive(Default)]
pub struct DictionaryChangeNotifier {
    listeners: RwLock<Vec<Arc<dyn ActiveDecoderDictionaryListener>>>,
}

impl DictionaryChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a consumer for dictionary updates
    pub fn register(&self, listener: Arc<dyn ActiveDecoderDictionaryListener>) {
        self.listeners.write().push(listener);
    }

    /// Unregister a previously registered consumer
    ///
    /// Returns false when the listener was not registered.
    pub fn unregister(&self, listener: &Arc<dyn ActiveDecoderDictionaryListener>) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|existing| {
            !std::ptr::eq(
                Arc::as_ptr(existing) as *const (),
                Arc::as_ptr(listener) as *const (),
            )
        });
        listeners.len() != before
    }

    /// Number of registered consumers
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Broadcast the dictionaries of a finished pass.
    ///
    /// Every consumer registered when the broadcast starts is invoked once
    /// per protocol key before this returns.
    pub fn notify(&self, dictionaries: &DecoderDictionaryMap) {
        let listeners = self.listeners.read().clone();
        for (protocol, dictionary) in dictionaries {
            for listener in &listeners {
                listener.on_change_of_active_dictionary(dictionary.clone(), *protocol);
            }
        }
        debug!(
            "Notified {} listeners about {} protocols",
            listeners.len(),
            dictionaries.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingListener {
        calls: AtomicUsize,
    }

    impl CountingListener {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl ActiveDecoderDictionaryListener for CountingListener {
        fn on_change_of_active_dictionary(
            &self,
            _dictionary: Option<Arc<DecoderDictionary>>,
            _protocol: VehicleDataSourceProtocol,
        ) {
            self.calls.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn empty_map() -> DecoderDictionaryMap {
        let mut map = BTreeMap::new();
        for protocol in crate::manifest::SUPPORTED_PROTOCOLS {
            map.insert(protocol, None);
        }
        map
    }

    #[test]
    fn test_notify_reaches_every_listener_per_protocol() {
        let notifier = DictionaryChangeNotifier::new();
        let first = Arc::new(CountingListener::new());
        let second = Arc::new(CountingListener::new());
        notifier.register(first.clone());
        notifier.register(second.clone());

        notifier.notify(&empty_map());

        assert_eq!(first.calls.load(Ordering::Relaxed), 3);
        assert_eq!(second.calls.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_unregister_removes_listener() {
        let notifier = DictionaryChangeNotifier::new();
        let listener = Arc::new(CountingListener::new());
        let handle: Arc<dyn ActiveDecoderDictionaryListener> = listener.clone();
        notifier.register(handle.clone());
        assert_eq!(notifier.listener_count(), 1);

        assert!(notifier.unregister(&handle));
        assert_eq!(notifier.listener_count(), 0);
        assert!(!notifier.unregister(&handle));

        notifier.notify(&empty_map());
        assert_eq!(listener.calls.load(Ordering::Relaxed), 0);
    }
}
