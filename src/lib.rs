// Copyright (c) 2025 the ashfall developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Physical device enumeration, logical device contexts and queue
//! allocation on top of [`ash`].
//!
//! The crate revolves around three objects:
//!
//! - [`DeviceRegistry`] enumerates all physical devices once, fixes their
//!   order with the most-preferred device at index 0, and hands out
//!   contexts.
//! - [`Context`] is a logical device spanning an entire device group, with
//!   queue sets allocated for the graphics, presentation and transfer
//!   roles. All member devices of a group share one context, created
//!   lazily and at most once.
//! - [`Queue`] is a handle to one hardware queue slot plus the lock that
//!   callers hold while submitting to it.
//!
//! # Example
//!
//! ```no_run
//! use ash::vk;
//! use ashfall::{DeviceRegistry, VulkanDriver};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let entry = unsafe { ash::Entry::load() }?;
//! let app_info = vk::ApplicationInfo::default().api_version(vk::API_VERSION_1_1);
//! let create_info = vk::InstanceCreateInfo::default().application_info(&app_info);
//! let instance = unsafe { entry.create_instance(&create_info, None) }?;
//!
//! let registry = DeviceRegistry::new(Arc::new(VulkanDriver::new(instance)))?;
//!
//! let device = registry.primary_device();
//! let context = registry
//!     .device_context(device)
//!     .ok_or("no context for the primary device")?;
//!
//! let set = context
//!     .pick_queue_set(vk::QueueFlags::GRAPHICS, true)
//!     .ok_or("no graphics queue set")?;
//! let queue = context.queue(set, 0);
//!
//! let _guard = queue.lock();
//! // Submit to `queue.handle()` while the guard is held.
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod device;
pub mod driver;
pub mod queue;

mod version;

pub use crate::{
    context::{Context, ContextCreateError, MIN_API_VERSION},
    device::{Device, DeviceKind, DeviceRegistry, RegistryInitError},
    driver::{
        DeviceGroupInfo, DeviceInfo, Driver, DriverError, LogicalDevice, QueueFamilyInfo,
        VulkanDriver,
    },
    queue::{Queue, QueueRequest, QueueRole, QueueSet},
    version::Version,
};
