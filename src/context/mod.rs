// Copyright (c) 2025 the ashfall developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Logical device contexts.
//!
//! A [`Context`] bundles one logical device, the physical device group it
//! spans, and the queue sets allocated from it. One context serves an entire
//! device group: any member device resolves to the same context, so work
//! recorded against the group shares a single logical device and queue
//! allocation.

use crate::{
    device::{group, Device},
    driver::{Driver, DriverError, LogicalDevice},
    queue::{family, Queue, QueueRequest, QueueRole, QueueSet},
    version::Version,
};
use ash::vk;
use smallvec::SmallVec;
use std::{error::Error, fmt, sync::Arc};

pub(crate) mod registry;

/// The lowest Vulkan version a physical device must support to get a
/// context. Device group enumeration requires 1.1.
pub const MIN_API_VERSION: Version = Version::V1_1;

/// A logical device spanning one physical device group.
pub struct Context {
    group: SmallVec<[vk::PhysicalDevice; 2]>,
    queue_sets: Vec<QueueSet>,
    device: Arc<dyn LogicalDevice>,
}

impl Context {
    /// Builds a context for `device`'s device group: resolves the group,
    /// plans queue families, negotiates features, creates the logical
    /// device and allocates the queue sets.
    ///
    /// Returns the context paired with `device`'s index in the group. On
    /// any error, nothing of the partially built context survives.
    pub(crate) fn build(
        driver: &dyn Driver,
        device: &Device,
    ) -> Result<(Context, usize), ContextCreateError> {
        if device.api_version() < MIN_API_VERSION {
            tracing::error!(
                device = device.name(),
                required = %MIN_API_VERSION,
                actual = %device.api_version(),
                "physical device does not support the required Vulkan version",
            );
            return Err(ContextCreateError::IncompatibleDriver {
                required: MIN_API_VERSION,
                actual: device.api_version(),
            });
        }

        let (group, group_index) = group::resolve_device_group(driver, device)?;

        let families = driver.queue_families(device.handle());
        let plan = family::plan_queue_families(&families, |family| {
            driver.supports_presentation(device.handle(), family)
        })
        .map_err(|role| {
            tracing::error!(
                device = device.name(),
                role = %role,
                "physical device has no queue family for a required role",
            );
            ContextCreateError::MissingQueueRole(role)
        })?;

        let features = negotiate_features(driver, device);

        let requests: SmallVec<[QueueRequest; 3]> =
            plan.iter().map(QueueRequest::for_entry).collect();

        let logical = driver.create_device(device.handle(), &group, &requests, &features)?;

        let queue_sets = plan
            .iter()
            .map(|entry| QueueSet::allocate(entry, &*logical))
            .collect::<Vec<_>>();

        tracing::debug!(
            device = device.name(),
            api_version = %device.api_version(),
            group_members = group.len(),
            queue_sets = queue_sets.len(),
            "created logical device",
        );

        Ok((
            Context {
                group,
                queue_sets,
                device: logical,
            },
            group_index,
        ))
    }

    /// Physical devices the logical device spans.
    #[inline]
    pub fn group(&self) -> &[vk::PhysicalDevice] {
        &self.group
    }

    /// All allocated queue sets.
    #[inline]
    pub fn queue_sets(&self) -> &[QueueSet] {
        &self.queue_sets
    }

    /// Native handle of the logical device.
    #[inline]
    pub fn handle(&self) -> vk::Device {
        self.device.handle()
    }

    /// Finds the first queue set whose capabilities cover `required` and,
    /// when `needs_present` is set, that can present to a surface.
    pub fn pick_queue_set(
        &self,
        required: vk::QueueFlags,
        needs_present: bool,
    ) -> Option<&QueueSet> {
        self.queue_sets.iter().find(|set| {
            set.flags().contains(required) && (!needs_present || set.supports_presentation())
        })
    }

    /// Fetches the queue at `slot` of a set belonging to this context.
    #[inline]
    pub fn queue<'a>(&self, set: &'a QueueSet, slot: usize) -> Queue<'a> {
        set.queue(slot)
    }

    /// Blocks until all work submitted to the logical device has completed.
    pub fn wait_idle(&self) {
        self.device.wait_idle();
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("group", &self.group)
            .field("queue_sets", &self.queue_sets)
            .finish_non_exhaustive()
    }
}

/// Picks the features to enable on the logical device: only what the device
/// actually supports, warning about the ones it lacks.
fn negotiate_features(driver: &dyn Driver, device: &Device) -> vk::PhysicalDeviceFeatures {
    let supported = driver.supported_features(device.handle());
    let mut features = vk::PhysicalDeviceFeatures::default();

    if supported.geometry_shader == vk::TRUE {
        features.geometry_shader = vk::TRUE;
    } else {
        tracing::warn!(device = device.name(), "geometry shaders not supported");
    }

    if supported.sampler_anisotropy == vk::TRUE {
        features.sampler_anisotropy = vk::TRUE;
    } else {
        tracing::warn!(device = device.name(), "sampler anisotropy not supported");
    }

    features
}

/// Error that can be returned when creating a context.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ContextCreateError {
    /// The device supports a Vulkan version below [`MIN_API_VERSION`].
    IncompatibleDriver { required: Version, actual: Version },
    /// The driver reported the device in no device group.
    DeviceNotGrouped,
    /// No queue family of the device can fill the named role.
    MissingQueueRole(QueueRole),
    /// Logical device creation or group enumeration failed.
    Driver(DriverError),
}

impl Error for ContextCreateError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ContextCreateError::Driver(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for ContextCreateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextCreateError::IncompatibleDriver { required, actual } => write!(
                f,
                "device supports Vulkan {} but at least {} is required",
                actual, required,
            ),
            ContextCreateError::DeviceNotGrouped => {
                write!(f, "device is not a member of any device group")
            }
            ContextCreateError::MissingQueueRole(role) => {
                write!(f, "no queue family supports {}", role)
            }
            ContextCreateError::Driver(err) => write!(f, "{}", err),
        }
    }
}

impl From<DriverError> for ContextCreateError {
    fn from(err: DriverError) -> ContextCreateError {
        ContextCreateError::Driver(err)
    }
}
