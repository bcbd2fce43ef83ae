// Copyright (c) 2025 the ashfall developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Queue family selection.
//!
//! [`plan_queue_families`] is a pure function from the capability sets a
//! physical device reports to the set of families worth allocating queues
//! from. Among families that qualify for a role, the one with the fewest
//! capability bits wins (least extraneous capability); ties break on the
//! first family found.

use crate::{driver::QueueFamilyInfo, queue::QueueRole};
use ash::vk;
use smallvec::SmallVec;

/// A queue family picked for one or more roles.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct PlanEntry {
    /// Vulkan family index.
    pub family: u32,
    /// Normalized capability bits of the family.
    pub flags: vk::QueueFlags,
    /// Whether this family was selected for presentation.
    pub present: bool,
    /// Queues to allocate from the family.
    pub slots: u32,
}

pub(crate) type FamilyPlan = SmallVec<[PlanEntry; 3]>;

/// Normalizes a capability set: graphics or compute capability implies
/// transfer capability, even when the driver does not report the bit.
pub(crate) fn normalize(flags: vk::QueueFlags) -> vk::QueueFlags {
    if flags.intersects(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE) {
        flags | vk::QueueFlags::TRANSFER
    } else {
        flags
    }
}

/// Selects the families to allocate for the graphics, presentation and
/// transfer roles. On failure, returns the role that could not be filled.
///
/// The resolution order is:
/// 1. a graphics family that also supports presentation;
/// 2. independently, the best transfer candidate;
/// 3. when no combined family exists, the best graphics-only family and the
///    best presentation-only family separately.
pub(crate) fn plan_queue_families(
    families: &[QueueFamilyInfo],
    supports_present: impl Fn(u32) -> bool,
) -> Result<FamilyPlan, QueueRole> {
    let normalized: SmallVec<[vk::QueueFlags; 8]> = families
        .iter()
        .map(|family| normalize(family.flags))
        .collect();

    let pick = |required: vk::QueueFlags, need_present: bool| -> Option<u32> {
        let mut best: Option<u32> = None;

        for (index, &flags) in normalized.iter().enumerate() {
            if !flags.contains(required) || (need_present && !supports_present(index as u32)) {
                continue;
            }

            let better = match best {
                None => true,
                Some(b) => {
                    flags.as_raw().count_ones() < normalized[b as usize].as_raw().count_ones()
                }
            };

            if better {
                best = Some(index as u32);
            }
        }

        best
    };

    let combined = pick(vk::QueueFlags::GRAPHICS, true);

    let graphics = match combined {
        Some(family) => family,
        None => pick(vk::QueueFlags::GRAPHICS, false).ok_or(QueueRole::Graphics)?,
    };

    let present = match combined {
        Some(family) => family,
        None => pick(vk::QueueFlags::empty(), true).ok_or(QueueRole::Present)?,
    };

    // A dedicated transfer family only pays off when it offers real
    // separation from graphics and compute work; otherwise transfer rides
    // the graphics family's queue.
    let transfer = pick(vk::QueueFlags::TRANSFER, false).filter(|&family| {
        !normalized[family as usize]
            .intersects(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE)
    });

    if transfer.is_none() && !normalized[graphics as usize].contains(vk::QueueFlags::TRANSFER) {
        return Err(QueueRole::Transfer);
    }

    let mut plan = FamilyPlan::new();
    let mut add = |family: u32, present: bool| {
        match plan.iter_mut().find(|entry| entry.family == family) {
            Some(entry) => entry.present |= present,
            None => plan.push(PlanEntry {
                family,
                flags: normalized[family as usize],
                present,
                slots: 1,
            }),
        }
    };

    add(graphics, false);
    add(present, true);
    if let Some(family) = transfer {
        add(family, false);
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::{normalize, plan_queue_families, PlanEntry};
    use crate::{driver::QueueFamilyInfo, queue::QueueRole};
    use ash::vk;

    fn families(flags: &[vk::QueueFlags]) -> Vec<QueueFamilyInfo> {
        flags
            .iter()
            .map(|&flags| QueueFamilyInfo { flags, count: 1 })
            .collect()
    }

    #[test]
    fn normalize_implies_transfer() {
        assert!(normalize(vk::QueueFlags::GRAPHICS).contains(vk::QueueFlags::TRANSFER));
        assert!(normalize(vk::QueueFlags::COMPUTE).contains(vk::QueueFlags::TRANSFER));
        assert_eq!(
            normalize(vk::QueueFlags::SPARSE_BINDING),
            vk::QueueFlags::SPARSE_BINDING,
        );
    }

    #[test]
    fn single_combined_family() {
        // One family with graphics+compute+transfer+present produces exactly
        // one entry; transfer is not given its own family.
        let families = families(&[vk::QueueFlags::GRAPHICS
            | vk::QueueFlags::COMPUTE
            | vk::QueueFlags::TRANSFER]);
        let plan = plan_queue_families(&families, |_| true).unwrap();

        assert_eq!(plan.len(), 1);
        assert_eq!(
            plan[0],
            PlanEntry {
                family: 0,
                flags: vk::QueueFlags::GRAPHICS
                    | vk::QueueFlags::COMPUTE
                    | vk::QueueFlags::TRANSFER,
                present: true,
                slots: 1,
            },
        );
    }

    #[test]
    fn split_roles_get_three_families() {
        // Graphics without presentation, a presentation-only family and a
        // dedicated transfer family; one entry per role, no family shared.
        let families = families(&[
            vk::QueueFlags::GRAPHICS,
            vk::QueueFlags::empty(),
            vk::QueueFlags::TRANSFER,
        ]);
        let plan = plan_queue_families(&families, |family| family == 1).unwrap();

        assert_eq!(plan.len(), 3);
        assert_eq!(plan[0].family, 0);
        assert!(plan[0].flags.contains(vk::QueueFlags::GRAPHICS));
        assert!(!plan[0].present);
        assert_eq!(plan[1].family, 1);
        assert!(plan[1].present);
        assert_eq!(plan[2].family, 2);
        assert_eq!(plan[2].flags, vk::QueueFlags::TRANSFER);
        assert!(!plan[2].present);
    }

    #[test]
    fn fewest_extraneous_bits_wins() {
        let families = families(&[
            vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::SPARSE_BINDING,
            vk::QueueFlags::GRAPHICS,
        ]);
        let plan = plan_queue_families(&families, |_| true).unwrap();

        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].family, 1);
    }

    #[test]
    fn first_found_breaks_ties() {
        let families = families(&[vk::QueueFlags::GRAPHICS, vk::QueueFlags::GRAPHICS]);
        let plan = plan_queue_families(&families, |_| true).unwrap();

        assert_eq!(plan[0].family, 0);
    }

    #[test]
    fn presentation_beats_fewer_bits_for_graphics() {
        // The lean graphics family cannot present, so the fatter one that
        // can is picked for both roles.
        let families = families(&[
            vk::QueueFlags::GRAPHICS,
            vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE,
        ]);
        let plan = plan_queue_families(&families, |family| family == 1).unwrap();

        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].family, 1);
        assert!(plan[0].present);
    }

    #[test]
    fn non_exclusive_transfer_rides_graphics() {
        // The transfer candidate also has compute capability, so it offers
        // no separation and is discarded.
        let families = families(&[
            vk::QueueFlags::GRAPHICS | vk::QueueFlags::TRANSFER,
            vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER,
        ]);
        let plan = plan_queue_families(&families, |_| true).unwrap();

        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].family, 0);
        assert!(plan[0].flags.contains(vk::QueueFlags::TRANSFER));
    }

    #[test]
    fn missing_graphics_is_fatal() {
        let families = families(&[vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER]);

        assert_eq!(
            plan_queue_families(&families, |_| true),
            Err(QueueRole::Graphics),
        );
    }

    #[test]
    fn missing_presentation_is_fatal() {
        let families = families(&[vk::QueueFlags::GRAPHICS]);

        assert_eq!(
            plan_queue_families(&families, |_| false),
            Err(QueueRole::Present),
        );
    }

    #[test]
    fn presenting_transfer_family_is_merged() {
        // The presentation-only family doubles as the dedicated transfer
        // family; it must not be planned twice.
        let families = families(&[vk::QueueFlags::GRAPHICS, vk::QueueFlags::TRANSFER]);
        let plan = plan_queue_families(&families, |family| family == 1).unwrap();

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[1].family, 1);
        assert!(plan[1].present);
        assert!(plan[1].flags.contains(vk::QueueFlags::TRANSFER));
    }
}
