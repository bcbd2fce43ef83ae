// Copyright (c) 2025 the ashfall developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

use std::{cmp::Ordering, fmt};

/// Represents an API version of Vulkan.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    /// Major version number.
    pub major: u16,
    /// Minor version number.
    pub minor: u16,
    /// Patch version number.
    pub patch: u16,
}

impl Version {
    pub const V1_0: Version = Version::new(1, 0, 0);
    pub const V1_1: Version = Version::new(1, 1, 0);
    pub const V1_2: Version = Version::new(1, 2, 0);
    pub const V1_3: Version = Version::new(1, 3, 0);

    #[inline]
    pub const fn new(major: u16, minor: u16, patch: u16) -> Version {
        Version {
            major,
            minor,
            patch,
        }
    }

    /// Turns a version number given by Vulkan into a `Version` struct.
    #[inline]
    pub fn from_vulkan_version(value: u32) -> Version {
        Version {
            major: ((value & 0xffc00000) >> 22) as u16,
            minor: ((value & 0x003ff000) >> 12) as u16,
            patch: (value & 0x00000fff) as u16,
        }
    }

    /// Turns a `Version` into a version number accepted by Vulkan.
    ///
    /// # Panics
    ///
    /// Panics if the values in the `Version` are out of acceptable range.
    #[inline]
    pub fn into_vulkan_version(self) -> u32 {
        assert!(self.major <= 0x3ff);
        assert!(self.minor <= 0x3ff);
        assert!(self.patch <= 0xfff);

        (self.major as u32) << 22 | (self.minor as u32) << 12 | (self.patch as u32)
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, formatter)
    }
}

impl PartialOrd for Version {
    #[inline]
    fn partial_cmp(&self, other: &Version) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Version) -> Ordering {
        match self.major.cmp(&other.major) {
            Ordering::Equal => (),
            o => return o,
        };

        match self.minor.cmp(&other.minor) {
            Ordering::Equal => (),
            o => return o,
        };

        self.patch.cmp(&other.patch)
    }
}

#[cfg(test)]
mod tests {
    use super::Version;

    #[test]
    fn into_vk_version() {
        assert_eq!(Version::new(1, 0, 0).into_vulkan_version(), 0x400000);
    }

    #[test]
    fn from_vk_version() {
        assert_eq!(Version::from_vulkan_version(0x400000), Version::V1_0);
        assert_eq!(
            Version::from_vulkan_version(Version::new(1, 2, 131).into_vulkan_version()),
            Version::new(1, 2, 131),
        );
    }

    #[test]
    fn greater_major() {
        assert!(Version::new(2, 0, 0) > Version::new(1, 9, 9));
    }

    #[test]
    fn greater_minor() {
        assert!(Version::V1_2 > Version::V1_1);
    }

    #[test]
    fn greater_patch() {
        assert!(Version::new(1, 1, 3) > Version::new(1, 1, 2));
    }
}
