//! Lock-guarded device storage
//!
//! `DeviceRegistry` is the only owner of `Device` records. Callers get clones
//! back, never references into the map.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::device::Device;

/// Result of an insert-or-update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// No record existed; one was created
    Inserted,
    /// A record existed; its enrollment flag was overwritten
    Updated {
        /// The flag as it was before this write
        previously_enrolled: bool,
    },
}

impl Upsert {
    /// Whether this write created the record
    pub fn is_insert(&self) -> bool {
        matches!(self, Upsert::Inserted)
    }
}

/// In-memory registry of devices keyed by UDID
///
/// Cloning the registry yields another handle to the same map, so it can be
/// shared between the event worker and anything that reports on state.
///
/// # Example
///
/// ```rust
/// use device_registry::DeviceRegistry;
///
/// let registry = DeviceRegistry::new();
/// registry.upsert("A1", true);
/// registry.upsert("B2", false);
///
/// assert_eq!(registry.len(), 2);
/// assert_eq!(registry.enrolled_count(), 1);
/// ```
#[derive(Clone, Default)]
pub struct DeviceRegistry {
    devices: Arc<RwLock<HashMap<String, Device>>>,
}

impl DeviceRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a device or overwrite the enrollment flag of an existing one
    ///
    /// The existence check and the write happen under a single write lock,
    /// so concurrent upserts on the same UDID never lose an update; the last
    /// one applied wins. Calling this twice with the same arguments leaves the
    /// registry exactly as calling it once.
    pub fn upsert(&self, udid: &str, enrolled: bool) -> Upsert {
        let mut devices = self.devices.write();

        match devices.get_mut(udid) {
            Some(device) => {
                let previously_enrolled = device.enrolled;
                device.enrolled = enrolled;
                Upsert::Updated {
                    previously_enrolled,
                }
            }
            None => {
                devices.insert(udid.to_string(), Device::new(udid, enrolled));
                Upsert::Inserted
            }
        }
    }

    /// Get a copy of the record for a UDID
    pub fn get(&self, udid: &str) -> Option<Device> {
        self.devices.read().get(udid).cloned()
    }

    /// Check whether a UDID has been seen
    pub fn contains(&self, udid: &str) -> bool {
        self.devices.read().contains_key(udid)
    }

    /// Number of known devices
    pub fn len(&self) -> usize {
        self.devices.read().len()
    }

    /// Check if no device has been seen yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of devices currently enrolled
    pub fn enrolled_count(&self) -> usize {
        self.devices.read().values().filter(|d| d.enrolled).count()
    }

    /// Snapshot of all records, sorted by UDID
    pub fn devices(&self) -> Vec<Device> {
        let mut devices: Vec<Device> = self.devices.read().values().cloned().collect();
        devices.sort_by(|a, b| a.udid.cmp(&b.udid));
        devices
    }
}

impl std::fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRegistry")
            .field("device_count", &self.len())
            .finish()
    }
}
