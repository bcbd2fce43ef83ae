// Copyright (c) 2025 the ashfall developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Scripted driver for tests.

use super::{DeviceGroupInfo, DeviceInfo, Driver, DriverError, LogicalDevice, QueueFamilyInfo};
use crate::{device::DeviceKind, queue::QueueRequest, version::Version};
use ash::vk::{self, Handle};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

/// Driver whose devices, groups, queue families and presentation tables are
/// scripted by the test. Counts logical device creation attempts.
pub(crate) struct MockDriver {
    devices: Vec<MockDevice>,
    groups: Vec<Vec<vk::PhysicalDevice>>,
    create_calls: AtomicUsize,
    fail_enumerate: bool,
    fail_create: bool,
}

struct MockDevice {
    info: DeviceInfo,
    families: Vec<QueueFamilyInfo>,
    present: Vec<bool>,
    features: vk::PhysicalDeviceFeatures,
}

impl MockDriver {
    pub(crate) fn new() -> MockDriver {
        MockDriver {
            devices: Vec::new(),
            groups: Vec::new(),
            create_calls: AtomicUsize::new(0),
            fail_enumerate: false,
            fail_create: false,
        }
    }

    /// Adds a device with a single all-capable, presentable queue family.
    pub(crate) fn device(self, kind: DeviceKind, api_version: Version) -> MockDriver {
        self.device_with_families(
            kind,
            api_version,
            &[(
                vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER,
                true,
            )],
        )
    }

    /// Adds a device exposing one `(capability flags, can present)` entry
    /// per queue family.
    pub(crate) fn device_with_families(
        mut self,
        kind: DeviceKind,
        api_version: Version,
        families: &[(vk::QueueFlags, bool)],
    ) -> MockDriver {
        let index = self.devices.len();

        self.devices.push(MockDevice {
            info: DeviceInfo {
                handle: vk::PhysicalDevice::from_raw(index as u64 + 1),
                name: format!("mock device {}", index),
                kind,
                api_version,
                driver_version: 1,
            },
            families: families
                .iter()
                .map(|&(flags, _)| QueueFamilyInfo { flags, count: 1 })
                .collect(),
            present: families.iter().map(|&(_, present)| present).collect(),
            features: vk::PhysicalDeviceFeatures {
                geometry_shader: vk::TRUE,
                sampler_anisotropy: vk::TRUE,
                ..Default::default()
            },
        });
        self
    }

    /// Declares a device group over previously added devices, by index.
    /// Devices left out of every declared group get a group of their own.
    pub(crate) fn group(mut self, members: &[usize]) -> MockDriver {
        self.groups.push(
            members
                .iter()
                .map(|&index| self.devices[index].info.handle)
                .collect(),
        );
        self
    }

    pub(crate) fn fail_enumerate(mut self) -> MockDriver {
        self.fail_enumerate = true;
        self
    }

    pub(crate) fn fail_create(mut self) -> MockDriver {
        self.fail_create = true;
        self
    }

    /// Number of logical device creation attempts so far.
    pub(crate) fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    fn device_for(&self, handle: vk::PhysicalDevice) -> &MockDevice {
        self.devices
            .iter()
            .find(|device| device.info.handle == handle)
            .expect("unknown mock device handle")
    }
}

impl Driver for MockDriver {
    fn enumerate_devices(&self) -> Result<Vec<DeviceInfo>, DriverError> {
        if self.fail_enumerate {
            return Err(DriverError::InitializationFailed);
        }

        Ok(self.devices.iter().map(|device| device.info.clone()).collect())
    }

    fn enumerate_device_groups(&self) -> Result<Vec<DeviceGroupInfo>, DriverError> {
        if self.fail_enumerate {
            return Err(DriverError::InitializationFailed);
        }

        let mut groups: Vec<DeviceGroupInfo> = self
            .groups
            .iter()
            .map(|group| DeviceGroupInfo {
                devices: group.iter().copied().collect(),
            })
            .collect();

        for device in &self.devices {
            let handle = device.info.handle;
            if !self.groups.iter().any(|group| group.contains(&handle)) {
                groups.push(DeviceGroupInfo {
                    devices: [handle].into_iter().collect(),
                });
            }
        }

        Ok(groups)
    }

    fn queue_families(&self, device: vk::PhysicalDevice) -> Vec<QueueFamilyInfo> {
        self.device_for(device).families.clone()
    }

    fn supports_presentation(&self, device: vk::PhysicalDevice, family: u32) -> bool {
        self.device_for(device)
            .present
            .get(family as usize)
            .copied()
            .unwrap_or(false)
    }

    fn supported_features(&self, device: vk::PhysicalDevice) -> vk::PhysicalDeviceFeatures {
        self.device_for(device).features
    }

    fn create_device(
        &self,
        device: vk::PhysicalDevice,
        group: &[vk::PhysicalDevice],
        queues: &[QueueRequest],
        _features: &vk::PhysicalDeviceFeatures,
    ) -> Result<Arc<dyn LogicalDevice>, DriverError> {
        let call = self.create_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_create {
            return Err(DriverError::InitializationFailed);
        }

        assert!(group.contains(&device));
        assert!(queues.iter().all(|request| request.count() > 0));

        Ok(Arc::new(MockLogicalDevice::with_raw(call as u64 + 1)))
    }
}

/// Logical device that fabricates distinct queue handles per (family, index).
pub(crate) struct MockLogicalDevice {
    raw: u64,
}

impl MockLogicalDevice {
    pub(crate) fn new() -> MockLogicalDevice {
        MockLogicalDevice::with_raw(1)
    }

    fn with_raw(raw: u64) -> MockLogicalDevice {
        MockLogicalDevice { raw }
    }
}

impl LogicalDevice for MockLogicalDevice {
    fn handle(&self) -> vk::Device {
        vk::Device::from_raw(self.raw)
    }

    fn queue(&self, family: u32, index: u32) -> vk::Queue {
        vk::Queue::from_raw((u64::from(family) + 1) << 32 | (u64::from(index) + 1))
    }

    fn wait_idle(&self) {}
}
