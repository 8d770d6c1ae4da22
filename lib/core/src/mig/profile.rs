// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::cmp::Ordering;

use once_cell::sync::Lazy;
use regex::Regex;

use super::MIG_RESOURCE_PREFIX;

static PROFILE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)g\.(\d+)gb$").unwrap());

/// A MIG profile name such as `1g.5gb`: `gi` compute slices and `gb`
/// memory gigabytes on the parent GPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProfileName {
    gi: u32,
    gb: u32,
}

impl ProfileName {
    pub const fn new(gi: u32, gb: u32) -> Self {
        Self { gi, gb }
    }

    /// Parse a profile token, e.g. `2g.10gb`.
    pub fn parse(s: &str) -> Option<Self> {
        let caps = PROFILE_REGEX.captures(s)?;
        Some(Self {
            gi: caps[1].parse().ok()?,
            gb: caps[2].parse().ok()?,
        })
    }

    /// Parse from a device-plugin resource name, e.g. `nvidia.com/mig-2g.10gb`.
    pub fn from_resource_name(name: &str) -> Option<Self> {
        Self::parse(name.strip_prefix(MIG_RESOURCE_PREFIX)?)
    }

    pub fn memory_gb(&self) -> u32 {
        self.gb
    }

    /// Compute-slice cost of the profile (the `Ng` part).
    pub fn compute_units(&self) -> u32 {
        self.gi
    }

    pub fn resource_name(&self) -> String {
        format!("{MIG_RESOURCE_PREFIX}{self}")
    }
}

impl Ord for ProfileName {
    /// Memory size first, compute slices as the tiebreak.
    fn cmp(&self, other: &Self) -> Ordering {
        self.gb
            .cmp(&other.gb)
            .then_with(|| self.gi.cmp(&other.gi))
    }
}

impl PartialOrd for ProfileName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for ProfileName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}g.{}gb", self.gi, self.gb)
    }
}
