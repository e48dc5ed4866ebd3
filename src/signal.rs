//! Signal identifier space
//!
//! Signal ids are unsigned 32-bit integers shared by every protocol. The
//! most significant bit is reserved: when set, the id names a *partial
//! signal*, a path into a complex parent signal; the parent id and path are
//! looked up in the owning collection scheme.

use serde::{Deserialize, Serialize};

/// Numeric id of a signal in the decoder manifest
pub type SignalId = u32;

/// Numeric id of a partial signal (high bit set)
pub type PartialSignalId = u32;

/// Name of a network interface ("can0", "vcan1", a ROS2 node, ...)
pub type InterfaceId = String;

/// Ordered struct-member / array indices into a complex signal.
/// The empty path references the whole signal.
pub type SignalPath = Vec<u32>;

/// Sentinel for a signal id that could not be resolved
pub const INVALID_SIGNAL_ID: SignalId = 0;

/// High-bit tag that marks an id as a partial signal
pub const INTERNAL_SIGNAL_ID_BITMASK: SignalId = 1 << 31;

/// Bits per byte, used when converting byte-based PID layouts to bit positions
pub const BYTE_SIZE: usize = 8;

/// Tagged view over the raw 32-bit signal id space
///
/// The wire form stays a plain `u32`; this view makes the high-bit namespace
/// explicit at API boundaries so full and partial ids cannot be mixed up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalRef {
    /// A full signal, keyed directly in the decoder manifest
    Full(SignalId),
    /// A partial signal, resolved through a scheme's partial-signal table
    Partial(PartialSignalId),
}

impl SignalRef {
    /// Classify a raw 32-bit id by its high-bit tag
    pub fn from_raw(id: u32) -> Self {
        if (id & INTERNAL_SIGNAL_ID_BITMASK) != 0 {
            SignalRef::Partial(id)
        } else {
            SignalRef::Full(id)
        }
    }

    /// Get the raw 32-bit identifier value
    pub fn raw(&self) -> u32 {
        match self {
            SignalRef::Full(id) => *id,
            SignalRef::Partial(id) => *id,
        }
    }

    /// Check if this id names a partial signal
    pub fn is_partial(&self) -> bool {
        matches!(self, SignalRef::Partial(_))
    }
}
