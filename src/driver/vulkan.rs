// Copyright (c) 2025 the ashfall developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! The `ash`-backed [`Driver`] implementation.

use super::{DeviceGroupInfo, DeviceInfo, Driver, DriverError, LogicalDevice, QueueFamilyInfo};
use crate::{device::DeviceKind, queue::QueueRequest, version::Version};
use ash::vk;
use smallvec::SmallVec;
use std::{ffi::c_char, ptr, sync::Arc};

/// Driver implementation that forwards to a live Vulkan instance.
///
/// The driver holds a handle to the instance but does not destroy it; the
/// layer that created the instance destroys it after the registry has been
/// shut down.
pub struct VulkanDriver {
    instance: ash::Instance,
    surface: Option<SurfaceTarget>,
}

struct SurfaceTarget {
    fns: ash::khr::surface::Instance,
    handle: vk::SurfaceKHR,
}

impl VulkanDriver {
    /// Wraps an existing instance. The instance must support Vulkan 1.1
    /// instance-level functions (device group enumeration).
    pub fn new(instance: ash::Instance) -> VulkanDriver {
        VulkanDriver {
            instance,
            surface: None,
        }
    }

    /// Registers the surface that presentation support is checked against.
    ///
    /// Without one there is nothing to present to, so no queue family is
    /// excluded on presentation grounds.
    pub fn with_surface(
        mut self,
        fns: ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
    ) -> VulkanDriver {
        self.surface = Some(SurfaceTarget {
            fns,
            handle: surface,
        });
        self
    }
}

impl Driver for VulkanDriver {
    fn enumerate_devices(&self) -> Result<Vec<DeviceInfo>, DriverError> {
        let handles = unsafe { self.instance.enumerate_physical_devices() }?;

        Ok(handles
            .into_iter()
            .map(|handle| {
                let properties = unsafe { self.instance.get_physical_device_properties(handle) };

                DeviceInfo {
                    handle,
                    name: properties
                        .device_name_as_c_str()
                        .unwrap_or(c"unknown")
                        .to_string_lossy()
                        .into_owned(),
                    kind: DeviceKind::from(properties.device_type),
                    api_version: Version::from_vulkan_version(properties.api_version),
                    driver_version: properties.driver_version,
                }
            })
            .collect())
    }

    fn enumerate_device_groups(&self) -> Result<Vec<DeviceGroupInfo>, DriverError> {
        let fp = self.instance.fp_v1_1().enumerate_physical_device_groups;
        let handle = self.instance.handle();

        // The count may change between the two calls, so keep retrying on
        // `VK_INCOMPLETE` like every other enumeration.
        let groups = unsafe {
            loop {
                let mut count = 0;
                (fp)(handle, &mut count, ptr::null_mut()).result()?;

                let mut groups =
                    vec![vk::PhysicalDeviceGroupProperties::default(); count as usize];
                let result = (fp)(handle, &mut count, groups.as_mut_ptr());

                match result {
                    vk::Result::SUCCESS => {
                        groups.truncate(count as usize);
                        break groups;
                    }
                    vk::Result::INCOMPLETE => (),
                    err => return Err(DriverError::from(err)),
                }
            }
        };

        Ok(groups
            .iter()
            .map(|group| DeviceGroupInfo {
                devices: group.physical_devices[..group.physical_device_count as usize]
                    .iter()
                    .copied()
                    .collect(),
            })
            .collect())
    }

    fn queue_families(&self, device: vk::PhysicalDevice) -> Vec<QueueFamilyInfo> {
        unsafe {
            self.instance
                .get_physical_device_queue_family_properties(device)
        }
        .into_iter()
        .map(|properties| QueueFamilyInfo {
            flags: properties.queue_flags,
            count: properties.queue_count,
        })
        .collect()
    }

    fn supports_presentation(&self, device: vk::PhysicalDevice, family: u32) -> bool {
        match &self.surface {
            Some(target) => unsafe {
                target
                    .fns
                    .get_physical_device_surface_support(device, family, target.handle)
            }
            .unwrap_or(false),
            None => true,
        }
    }

    fn supported_features(&self, device: vk::PhysicalDevice) -> vk::PhysicalDeviceFeatures {
        unsafe { self.instance.get_physical_device_features(device) }
    }

    fn create_device(
        &self,
        device: vk::PhysicalDevice,
        group: &[vk::PhysicalDevice],
        queues: &[QueueRequest],
        features: &vk::PhysicalDeviceFeatures,
    ) -> Result<Arc<dyn LogicalDevice>, DriverError> {
        let queue_infos = queues
            .iter()
            .map(|request| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(request.family)
                    .queue_priorities(&request.priorities)
            })
            .collect::<SmallVec<[_; 3]>>();

        // VK_KHR_swapchain is the one extension the swapchain collaborator
        // needs from every context.
        let extension_ptrs = [ash::khr::swapchain::NAME.as_ptr()];

        // Device layers are deprecated, but pre-1.0.13 loaders still expect
        // the instance layers to be repeated here.
        #[cfg(debug_assertions)]
        let layer_ptrs: [*const c_char; 1] = [c"VK_LAYER_KHRONOS_validation".as_ptr()];
        #[cfg(not(debug_assertions))]
        let layer_ptrs: [*const c_char; 0] = [];

        // The logical device spans the entire device group, so any future
        // member device can reuse it.
        let mut group_info = vk::DeviceGroupDeviceCreateInfo::default().physical_devices(group);

        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_infos)
            .enabled_layer_names(&layer_ptrs)
            .enabled_extension_names(&extension_ptrs)
            .enabled_features(features)
            .push_next(&mut group_info);

        let device = unsafe { self.instance.create_device(device, &create_info, None) }?;

        Ok(Arc::new(AshDevice { device }))
    }
}

struct AshDevice {
    device: ash::Device,
}

impl LogicalDevice for AshDevice {
    fn handle(&self) -> vk::Device {
        self.device.handle()
    }

    fn queue(&self, family: u32, index: u32) -> vk::Queue {
        unsafe { self.device.get_device_queue(family, index) }
    }

    fn wait_idle(&self) {
        if let Err(err) = unsafe { self.device.device_wait_idle() } {
            tracing::warn!(error = %DriverError::from(err), "wait idle failed");
        }
    }
}

impl Drop for AshDevice {
    fn drop(&mut self) {
        // All queues of the device must have completed before it can be
        // destroyed; termination is always a blocking drain.
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_device(None);
        }
    }
}
