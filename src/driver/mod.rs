// Copyright (c) 2025 the ashfall developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! The seam between the allocation logic and the Vulkan driver.
//!
//! Everything this crate asks of the driver goes through the [`Driver`]
//! trait: physical device and device group enumeration, queue family
//! introspection, presentation queries, feature queries and logical device
//! creation. [`VulkanDriver`] forwards these to `ash`; the test suite
//! substitutes a scripted driver so that selection and locking behavior can
//! be exercised without a GPU.

use crate::{device::DeviceKind, queue::QueueRequest, version::Version};
use ash::vk;
use smallvec::SmallVec;
use std::{error::Error, fmt, sync::Arc};

#[cfg(test)]
pub(crate) mod mock;
pub mod vulkan;

pub use self::vulkan::VulkanDriver;

/// Identity of one physical device, as reported by the driver.
#[derive(Clone, Debug)]
pub struct DeviceInfo {
    /// Native handle of the physical device.
    pub handle: vk::PhysicalDevice,
    /// Human-readable device name.
    pub name: String,
    /// Device class.
    pub kind: DeviceKind,
    /// Highest Vulkan version the device's driver supports.
    pub api_version: Version,
    /// Vendor-specific driver version.
    pub driver_version: u32,
}

/// One device group: a set of physical devices that can share a single
/// logical device.
#[derive(Clone, Debug)]
pub struct DeviceGroupInfo {
    /// Native handles of all member devices, in driver order.
    pub devices: SmallVec<[vk::PhysicalDevice; 2]>,
}

/// Capabilities of one queue family.
#[derive(Copy, Clone, Debug)]
pub struct QueueFamilyInfo {
    /// Capability bits as reported by the driver, not yet normalized.
    pub flags: vk::QueueFlags,
    /// Number of queues the family exposes.
    pub count: u32,
}

/// Instance-level driver interface.
///
/// Implementations must be usable from multiple threads at once; all
/// synchronization of the objects *derived* from the driver is handled by
/// the registry, not here.
pub trait Driver: Send + Sync {
    /// Lists all physical devices.
    fn enumerate_devices(&self) -> Result<Vec<DeviceInfo>, DriverError>;

    /// Lists all device groups. Every physical device appears in exactly
    /// one group (possibly a group of one).
    fn enumerate_device_groups(&self) -> Result<Vec<DeviceGroupInfo>, DriverError>;

    /// Queue families exposed by `device`, indexed by family number.
    fn queue_families(&self, device: vk::PhysicalDevice) -> Vec<QueueFamilyInfo>;

    /// Whether queues of `family` on `device` can present to a surface.
    fn supports_presentation(&self, device: vk::PhysicalDevice, family: u32) -> bool;

    /// Full feature set supported by `device`.
    fn supported_features(&self, device: vk::PhysicalDevice) -> vk::PhysicalDeviceFeatures;

    /// Creates a logical device over `group`, with one queue allocation per
    /// element of `queues` and exactly the features in `features` enabled.
    /// `device` must be a member of `group`.
    fn create_device(
        &self,
        device: vk::PhysicalDevice,
        group: &[vk::PhysicalDevice],
        queues: &[QueueRequest],
        features: &vk::PhysicalDeviceFeatures,
    ) -> Result<Arc<dyn LogicalDevice>, DriverError>;
}

/// A created logical device plus its loaded driver interface.
///
/// Dropping the last reference destroys the device; implementations block
/// until all outstanding work has completed before releasing it.
pub trait LogicalDevice: Send + Sync {
    /// Raw handle of the logical device.
    fn handle(&self) -> vk::Device;

    /// Fetches the queue at `index` within `family`. Both must match one of
    /// the queue requests the device was created with.
    fn queue(&self, family: u32, index: u32) -> vk::Queue;

    /// Blocks until all work submitted to the device has completed.
    fn wait_idle(&self);
}

/// Error reported by the driver itself.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DriverError {
    /// There is no memory available on the host.
    OutOfHostMemory,
    /// There is no memory available on the device.
    OutOfDeviceMemory,
    /// The driver could not complete the operation for implementation-specific
    /// reasons.
    InitializationFailed,
    /// The logical or physical device has been lost.
    DeviceLost,
    /// A requested feature is not supported.
    FeatureNotPresent,
    /// A requested extension is not supported.
    ExtensionNotPresent,
    /// Too many logical devices have already been created.
    TooManyObjects,
    /// Any other driver error, by raw `VkResult` value.
    Unknown(i32),
}

impl Error for DriverError {}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            DriverError::OutOfHostMemory => write!(f, "no memory available on the host"),
            DriverError::OutOfDeviceMemory => write!(f, "no memory available on the device"),
            DriverError::InitializationFailed => write!(
                f,
                "the driver could not complete the operation for implementation-specific reasons",
            ),
            DriverError::DeviceLost => write!(f, "the logical or physical device has been lost"),
            DriverError::FeatureNotPresent => write!(f, "a requested feature is not supported"),
            DriverError::ExtensionNotPresent => {
                write!(f, "a requested extension is not supported")
            }
            DriverError::TooManyObjects => {
                write!(f, "too many logical devices have already been created")
            }
            DriverError::Unknown(result) => write!(f, "driver error, VkResult value {}", result),
        }
    }
}

impl From<vk::Result> for DriverError {
    fn from(result: vk::Result) -> DriverError {
        match result {
            vk::Result::ERROR_OUT_OF_HOST_MEMORY => DriverError::OutOfHostMemory,
            vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => DriverError::OutOfDeviceMemory,
            vk::Result::ERROR_INITIALIZATION_FAILED => DriverError::InitializationFailed,
            vk::Result::ERROR_DEVICE_LOST => DriverError::DeviceLost,
            vk::Result::ERROR_FEATURE_NOT_PRESENT => DriverError::FeatureNotPresent,
            vk::Result::ERROR_EXTENSION_NOT_PRESENT => DriverError::ExtensionNotPresent,
            vk::Result::ERROR_TOO_MANY_OBJECTS => DriverError::TooManyObjects,
            result => DriverError::Unknown(result.as_raw()),
        }
    }
}
