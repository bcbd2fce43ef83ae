// Copyright (c) 2025 the ashfall developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Queue sets and queues.
//!
//! A [`QueueSet`] is the allocation of one queue family for one or more
//! roles: the family index, its normalized capability bits, a presentation
//! marker, and one independently lockable slot per allocated queue. Sets are
//! owned exclusively by their context and never shared.
//!
//! A [`Queue`] is a value handed to callers: the queue handle plus a
//! *reference* to its slot's lock. The lock stays owned by the set and
//! outlives every `Queue` derived from it. Callers must hold the slot lock
//! for the duration of any submission to that queue.

use crate::driver::LogicalDevice;
use ash::vk;
use parking_lot::{Mutex, MutexGuard};
use smallvec::{smallvec, SmallVec};
use std::fmt;

pub(crate) mod family;

/// A role a queue family is selected for.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum QueueRole {
    Graphics,
    Present,
    Transfer,
}

impl fmt::Display for QueueRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            QueueRole::Graphics => "graphics",
            QueueRole::Present => "presentation",
            QueueRole::Transfer => "transfer",
        })
    }
}

/// One queue-create descriptor, passed in bulk to logical device creation.
#[derive(Clone, Debug)]
pub struct QueueRequest {
    /// Vulkan family index to allocate from.
    pub family: u32,
    /// One priority in `[0, 1]` per queue slot.
    pub priorities: SmallVec<[f32; 1]>,
}

impl QueueRequest {
    pub(crate) fn for_entry(entry: &family::PlanEntry) -> QueueRequest {
        QueueRequest {
            family: entry.family,
            priorities: smallvec![1.0; entry.slots as usize],
        }
    }

    /// Number of queue slots requested.
    #[inline]
    pub fn count(&self) -> u32 {
        self.priorities.len() as u32
    }
}

struct QueueSlot {
    handle: vk::Queue,
    lock: Mutex<()>,
}

/// One allocated queue family role.
pub struct QueueSet {
    family: u32,
    flags: vk::QueueFlags,
    present: bool,
    slots: Box<[QueueSlot]>,
}

impl QueueSet {
    /// Fetches the queue handles of a planned family from the created
    /// logical device and pairs each with a fresh slot lock.
    pub(crate) fn allocate(entry: &family::PlanEntry, device: &dyn LogicalDevice) -> QueueSet {
        let slots = (0..entry.slots)
            .map(|index| QueueSlot {
                handle: device.queue(entry.family, index),
                lock: Mutex::new(()),
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();

        QueueSet {
            family: entry.family,
            flags: entry.flags,
            present: entry.present,
            slots,
        }
    }

    /// Vulkan family index this set allocates from.
    #[inline]
    pub fn family(&self) -> u32 {
        self.family
    }

    /// Normalized capability bits: graphics or compute capability always
    /// comes with the transfer bit set.
    #[inline]
    pub fn flags(&self) -> vk::QueueFlags {
        self.flags
    }

    /// Whether queues of this set can present to a surface.
    #[inline]
    pub fn supports_presentation(&self) -> bool {
        self.present
    }

    /// Number of concurrently usable queue slots.
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn queue(&self, slot: usize) -> Queue<'_> {
        assert!(slot < self.slots.len(), "queue slot index out of range");

        let slot = &self.slots[slot];
        Queue {
            family: self.family,
            handle: slot.handle,
            lock: &slot.lock,
        }
    }
}

impl fmt::Debug for QueueSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueSet")
            .field("family", &self.family)
            .field("flags", &self.flags)
            .field("present", &self.present)
            .field("slots", &self.slots.len())
            .finish()
    }
}

/// A handle to one hardware queue slot.
///
/// The value borrows the slot's lock from its owning [`QueueSet`]; it never
/// owns the lock.
#[derive(Copy, Clone)]
pub struct Queue<'a> {
    family: u32,
    handle: vk::Queue,
    lock: &'a Mutex<()>,
}

impl<'a> Queue<'a> {
    /// Vulkan family index the queue belongs to.
    #[inline]
    pub fn family(&self) -> u32 {
        self.family
    }

    /// Raw queue handle.
    #[inline]
    pub fn handle(&self) -> vk::Queue {
        self.handle
    }

    /// Locks the slot. The guard must be held for the entire submission and
    /// is released on every exit path when it drops.
    #[inline]
    pub fn lock(&self) -> MutexGuard<'a, ()> {
        self.lock.lock()
    }

    /// The slot's lock itself, for identity comparisons.
    #[inline]
    pub fn slot_lock(&self) -> &'a Mutex<()> {
        self.lock
    }
}

impl fmt::Debug for Queue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("family", &self.family)
            .field("handle", &self.handle)
            .finish()
    }
}
