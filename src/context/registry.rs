// Copyright (c) 2025 the ashfall developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Shared storage for all constructed contexts.

use super::Context;
use ash::vk;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

/// All contexts constructed so far, in creation order.
///
/// The single mutex is the coarse lock around the search-or-create step of
/// context resolution; holding it makes "no context for this group exists
/// yet" and "a new context is published" one atomic observation.
pub(crate) struct ContextRegistry {
    contexts: Mutex<Vec<Arc<Context>>>,
}

impl ContextRegistry {
    pub(crate) fn new() -> ContextRegistry {
        ContextRegistry {
            contexts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Vec<Arc<Context>>> {
        self.contexts.lock()
    }
}

impl Drop for ContextRegistry {
    fn drop(&mut self) {
        // Teardown is a blocking drain: every context waits for its device
        // to go idle before the logical device is destroyed.
        for context in self.contexts.get_mut().drain(..) {
            context.wait_idle();
        }
    }
}

/// Searches `contexts` for the one whose device group contains `handle`,
/// returning it together with the handle's index in the group.
pub(crate) fn find_member(
    contexts: &[Arc<Context>],
    handle: vk::PhysicalDevice,
) -> Option<(Arc<Context>, usize)> {
    contexts.iter().find_map(|context| {
        context
            .group()
            .iter()
            .position(|&member| member == handle)
            .map(|index| (context.clone(), index))
    })
}
