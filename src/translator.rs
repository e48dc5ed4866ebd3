//! CAN interface translator
//!
//! Dictionary keys use a compact numeric channel id instead of the
//! interface name string. The translator keeps the bijection; registration
//! happens while sources are wired up, extraction passes only read.

use crate::signal::InterfaceId;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU32, Ordering};

/// Compact numeric alias for a CAN interface name
pub type ChannelId = u32;

/// Sentinel returned for interface names that were never registered
pub const INVALID_CHANNEL: ChannelId = u32::MAX;

/// Bijection between interface names and channel ids
#[derive(Debug, Default)]
pub struct CanInterfaceTranslator {
    by_name: DashMap<InterfaceId, ChannelId>,
    by_channel: DashMap<ChannelId, InterfaceId>,
    next_channel: AtomicU32,
}

impl CanInterfaceTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an interface name, assigning the next channel id.
    /// Registering the same name again returns the existing id.
    pub fn register(&self, interface_id: impl Into<InterfaceId>) -> ChannelId {
        let name = interface_id.into();
        let channel_id = *self
            .by_name
            .entry(name.clone())
            .or_insert_with(|| self.next_channel.fetch_add(1, Ordering::Relaxed));
        self.by_channel.insert(channel_id, name);
        channel_id
    }

    /// Channel id of an interface name, `INVALID_CHANNEL` when unknown
    pub fn channel_id_of(&self, interface_id: &str) -> ChannelId {
        self.by_name
            .get(interface_id)
            .map(|entry| *entry)
            .unwrap_or(INVALID_CHANNEL)
    }

    /// Interface name behind a channel id
    pub fn interface_of(&self, channel_id: ChannelId) -> Option<InterfaceId> {
        self.by_channel.get(&channel_id).map(|entry| entry.clone())
    }

    /// Number of registered interfaces
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
