//! Device Registry
//!
//! A small, thread-safe store of the devices an MDM relay has heard about and
//! whether each one currently holds a management profile.
//!
//! # Features
//!
//! - **Single record per device**: every write goes through [`DeviceRegistry::upsert`]
//! - **Atomic check-and-write**: the upsert reports what was there before the write
//! - **Cheap handles**: clones share the same underlying map
//!
//! # Quick Start
//!
//! ```rust
//! use device_registry::{DeviceRegistry, Upsert};
//!
//! let registry = DeviceRegistry::new();
//!
//! // First contact creates the record
//! assert_eq!(registry.upsert("A1", true), Upsert::Inserted);
//!
//! // Later contact only touches the enrollment flag
//! assert_eq!(
//!     registry.upsert("A1", false),
//!     Upsert::Updated { previously_enrolled: true }
//! );
//!
//! let device = registry.get("A1").unwrap();
//! assert_eq!(device.udid, "A1");
//! assert!(!device.enrolled);
//! ```
//!
//! # Architecture
//!
//! ```text
//! DeviceRegistry
//!     │
//!     └── devices: Arc<RwLock<HashMap<udid, Device>>>
//! ```

pub mod device;
pub mod registry;

pub use device::Device;
pub use registry::{DeviceRegistry, Upsert};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_lifecycle() {
        let registry = DeviceRegistry::new();

        // Enroll, re-enroll, check out
        assert!(registry.upsert("A1", true).is_insert());
        assert!(!registry.upsert("A1", true).is_insert());
        registry.upsert("A1", false);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("A1"), Some(Device::new("A1", false)));
    }

    #[test]
    fn test_registry_clone_shares_state() {
        let registry1 = DeviceRegistry::new();
        let registry2 = registry1.clone();

        registry1.upsert("A1", true);

        assert_eq!(registry2.get("A1"), Some(Device::new("A1", true)));
    }
}
