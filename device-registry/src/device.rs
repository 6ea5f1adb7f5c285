//! The per-device record kept by the registry.

/// A managed device known to the relay.
///
/// The `udid` never changes once the record exists; only `enrolled` is
/// rewritten by later events.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Device {
    /// Device UDID as reported by the MDM server
    pub udid: String,
    /// Whether the device currently holds a management profile
    pub enrolled: bool,
}

impl Device {
    /// Create a new device record
    pub fn new(udid: impl Into<String>, enrolled: bool) -> Self {
        Self {
            udid: udid.into(),
            enrolled,
        }
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = if self.enrolled { "enrolled" } else { "unenrolled" };
        write!(f, "{} ({})", self.udid, state)
    }
}
