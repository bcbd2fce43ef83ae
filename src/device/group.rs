// Copyright (c) 2025 the ashfall developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Device group resolution.

use crate::{context::ContextCreateError, device::Device, driver::Driver};
use ash::vk;
use smallvec::SmallVec;

/// Finds the device group `device` belongs to.
///
/// Returns the full member list and the device's index within it. Every
/// conformant driver reports each physical device in exactly one group, so a
/// device absent from all groups is a driver defect and fails context
/// creation.
pub(crate) fn resolve_device_group(
    driver: &dyn Driver,
    device: &Device,
) -> Result<(SmallVec<[vk::PhysicalDevice; 2]>, usize), ContextCreateError> {
    let groups = driver.enumerate_device_groups()?;

    for group in groups {
        if let Some(index) = group
            .devices
            .iter()
            .position(|&member| member == device.handle())
        {
            return Ok((group.devices, index));
        }
    }

    tracing::error!(
        device = device.name(),
        "physical device could not be found in any device group",
    );

    Err(ContextCreateError::DeviceNotGrouped)
}

#[cfg(test)]
mod tests {
    use super::resolve_device_group;
    use crate::{
        context::ContextCreateError,
        device::{Device, DeviceKind},
        driver::{mock::MockDriver, Driver},
        version::Version,
    };

    #[test]
    fn member_index_within_group() {
        let driver = MockDriver::new()
            .device(DeviceKind::DiscreteGpu, Version::V1_2)
            .device(DeviceKind::DiscreteGpu, Version::V1_2)
            .device(DeviceKind::DiscreteGpu, Version::V1_2)
            .group(&[0])
            .group(&[1, 2]);
        let info = driver.enumerate_devices().unwrap().remove(2);
        let device = Device::new(info);

        let (group, index) = resolve_device_group(&driver, &device).unwrap();

        assert_eq!(group.len(), 2);
        assert_eq!(index, 1);
        assert_eq!(group[index], device.handle());
    }

    #[test]
    fn ungrouped_device_gets_singleton_group() {
        let driver = MockDriver::new().device(DeviceKind::DiscreteGpu, Version::V1_2);
        let info = driver.enumerate_devices().unwrap().remove(0);
        let device = Device::new(info);

        let (group, index) = resolve_device_group(&driver, &device).unwrap();

        assert_eq!(group.as_slice(), [device.handle()]);
        assert_eq!(index, 0);
    }

    #[test]
    fn device_missing_from_all_groups_fails() {
        // Script a driver that forgets its second device in group reporting.
        let reporting = MockDriver::new().device(DeviceKind::DiscreteGpu, Version::V1_2);
        let other = MockDriver::new()
            .device(DeviceKind::DiscreteGpu, Version::V1_2)
            .device(DeviceKind::IntegratedGpu, Version::V1_2);
        let info = other.enumerate_devices().unwrap().remove(1);
        let device = Device::new(info);

        assert!(matches!(
            resolve_device_group(&reporting, &device),
            Err(ContextCreateError::DeviceNotGrouped),
        ));
    }
}
