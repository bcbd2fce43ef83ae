// Copyright (c) 2025 the ashfall developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Physical device registry.
//!
//! The [`DeviceRegistry`] enumerates all physical devices exactly once when
//! it is constructed. The number and order of devices never change
//! afterwards; index 0 is always the preferred ("primary") device. Contexts
//! are resolved lazily per device through
//! [`DeviceRegistry::device_context`], which guarantees at-most-once
//! construction per device group.

use crate::{
    context::{registry, registry::ContextRegistry, Context},
    driver::{DeviceInfo, Driver, DriverError},
    version::Version,
};
use ash::vk;
use parking_lot::Mutex;
use std::{
    error::Error,
    fmt,
    sync::{Arc, Weak},
};

pub(crate) mod group;

/// Rank of a physical device, most preferred first.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DeviceKind {
    DiscreteGpu,
    VirtualGpu,
    IntegratedGpu,
    Cpu,
    Other,
}

impl From<vk::PhysicalDeviceType> for DeviceKind {
    fn from(ty: vk::PhysicalDeviceType) -> DeviceKind {
        match ty {
            vk::PhysicalDeviceType::DISCRETE_GPU => DeviceKind::DiscreteGpu,
            vk::PhysicalDeviceType::VIRTUAL_GPU => DeviceKind::VirtualGpu,
            vk::PhysicalDeviceType::INTEGRATED_GPU => DeviceKind::IntegratedGpu,
            vk::PhysicalDeviceType::CPU => DeviceKind::Cpu,
            _ => DeviceKind::Other,
        }
    }
}

/// Resolution state of a device's context.
enum ContextSlot {
    Unresolved,
    Resolved {
        context: Weak<Context>,
        group_index: usize,
    },
    /// Terminal: creation failed once and is never retried.
    Failed,
}

/// Identity of one physical compute device.
///
/// Devices are allocated in place when the registry is built and are never
/// added, removed or reordered afterwards.
pub struct Device {
    kind: DeviceKind,
    name: String,
    api_version: Version,
    driver_version: u32,
    handle: vk::PhysicalDevice,
    // Serializes context resolution for this device only. Once the slot is
    // `Resolved` or `Failed` it is never written again.
    slot: Mutex<ContextSlot>,
}

impl Device {
    pub(crate) fn new(info: DeviceInfo) -> Device {
        Device {
            kind: info.kind,
            name: info.name,
            api_version: info.api_version,
            driver_version: info.driver_version,
            handle: info.handle,
            slot: Mutex::new(ContextSlot::Unresolved),
        }
    }

    /// Device class.
    #[inline]
    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// Human-readable device name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Highest Vulkan version the device's driver supports.
    #[inline]
    pub fn api_version(&self) -> Version {
        self.api_version
    }

    /// Vendor-specific driver version.
    #[inline]
    pub fn driver_version(&self) -> u32 {
        self.driver_version
    }

    /// Native handle of the physical device.
    #[inline]
    pub fn handle(&self) -> vk::PhysicalDevice {
        self.handle
    }

    /// Index of this device within its device group, or `None` while its
    /// context has not been resolved.
    pub fn group_index(&self) -> Option<usize> {
        match &*self.slot.lock() {
            ContextSlot::Resolved { group_index, .. } => Some(*group_index),
            _ => None,
        }
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("api_version", &self.api_version)
            .finish()
    }
}

/// Registry of all physical devices and all constructed contexts.
///
/// The registry is an explicit object: callers construct it, pass it around
/// and drop (or [`shutdown`](DeviceRegistry::shutdown)) it at process
/// teardown. There is no global instance.
pub struct DeviceRegistry {
    driver: Arc<dyn Driver>,
    devices: Box<[Device]>,
    contexts: ContextRegistry,
}

impl DeviceRegistry {
    /// Enumerates all physical devices and fixes their order.
    ///
    /// The primary device ends up at index 0: a superior device class wins,
    /// an equal class with a greater API version wins, and the first device
    /// seen is primary until beaten. All other devices retain encounter
    /// order. Enumeration is all-or-nothing; on error no registry exists
    /// and no devices are observable.
    pub fn new(driver: Arc<dyn Driver>) -> Result<DeviceRegistry, RegistryInitError> {
        let infos = driver.enumerate_devices().map_err(|err| {
            tracing::error!(error = %err, "could not enumerate physical devices");
            RegistryInitError::Driver(err)
        })?;

        if infos.is_empty() {
            tracing::error!("could not find any physical devices");
            return Err(RegistryInitError::NoDevices);
        }

        let mut devices: Vec<Device> = Vec::with_capacity(infos.len());

        for info in infos {
            let device = Device::new(info);

            let beats_primary = match devices.first() {
                None => true,
                Some(primary) => {
                    device.kind < primary.kind
                        || (device.kind == primary.kind && device.api_version > primary.api_version)
                }
            };

            if beats_primary {
                devices.insert(0, device);
            } else {
                devices.push(device);
            }
        }

        Ok(DeviceRegistry {
            driver,
            devices: devices.into_boxed_slice(),
            contexts: ContextRegistry::new(),
        })
    }

    /// Number of physical devices.
    #[inline]
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Device at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= device_count()`; that is a contract violation.
    #[inline]
    pub fn device_at(&self, index: usize) -> &Device {
        assert!(index < self.devices.len(), "device index out of range");

        &self.devices[index]
    }

    /// The most-preferred device (index 0).
    #[inline]
    pub fn primary_device(&self) -> &Device {
        self.device_at(0)
    }

    /// Iterates over all devices in registry order.
    pub fn devices(&self) -> impl ExactSizeIterator<Item = &Device> {
        self.devices.iter()
    }

    /// Returns the shared context of `device`'s device group, creating it on
    /// first use.
    ///
    /// Every device of one device group resolves to the identical context.
    /// `None` signals permanent failure: once creation fails for a device,
    /// it is never retried for the lifetime of the registry.
    ///
    /// May be called from any thread; concurrent callers for one device
    /// block until the first completes and then observe its outcome.
    pub fn device_context(&self, device: &Device) -> Option<Arc<Context>> {
        let mut slot = device.slot.lock();

        match &*slot {
            ContextSlot::Resolved { context, .. } => return context.upgrade(),
            ContextSlot::Failed => return None,
            ContextSlot::Unresolved => (),
        }

        // The registry lock makes the search-or-create step atomic across
        // all devices: two devices of one group cannot race to create two
        // contexts for it.
        let mut contexts = self.contexts.lock();

        if let Some((context, group_index)) = registry::find_member(&contexts, device.handle) {
            *slot = ContextSlot::Resolved {
                context: Arc::downgrade(&context),
                group_index,
            };
            return Some(context);
        }

        match Context::build(&*self.driver, device) {
            Ok((context, group_index)) => {
                let context = Arc::new(context);
                // Publish only once the context is fully constructed; a
                // sibling device resolving concurrently must never observe
                // a partial entry.
                contexts.push(context.clone());
                *slot = ContextSlot::Resolved {
                    context: Arc::downgrade(&context),
                    group_index,
                };
                Some(context)
            }
            Err(err) => {
                tracing::error!(
                    device = device.name(),
                    error = %err,
                    "could not create or initialize a logical device for the device group",
                );
                *slot = ContextSlot::Failed;
                None
            }
        }
    }

    /// Tears the registry down, blocking until all outstanding device work
    /// has completed. Dropping the registry does the same.
    pub fn shutdown(self) {
        drop(self);
    }
}

impl fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceRegistry")
            .field("devices", &self.devices)
            .finish_non_exhaustive()
    }
}

/// Error that can be returned when building the device registry.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RegistryInitError {
    /// The driver could not list physical devices.
    Driver(DriverError),
    /// Enumeration succeeded but reported no devices.
    NoDevices,
}

impl Error for RegistryInitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RegistryInitError::Driver(err) => Some(err),
            RegistryInitError::NoDevices => None,
        }
    }
}

impl fmt::Display for RegistryInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryInitError::Driver(err) => {
                write!(f, "could not enumerate physical devices: {}", err)
            }
            RegistryInitError::NoDevices => write!(f, "no physical devices found"),
        }
    }
}

impl From<DriverError> for RegistryInitError {
    fn from(err: DriverError) -> RegistryInitError {
        RegistryInitError::Driver(err)
    }
}
