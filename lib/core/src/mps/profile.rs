// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use super::MPS_RESOURCE_PREFIX;

/// An MPS share profile: a fixed amount of GPU memory, rendered `<N>gb`
/// and requested as `nvidia.com/gpu-<N>gb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Profile(u32);

impl Profile {
    pub const fn new(memory_gb: u32) -> Self {
        Self(memory_gb)
    }

    /// Parse a profile token, e.g. `10gb`.
    pub fn parse(s: &str) -> Option<Self> {
        let digits = s.strip_suffix("gb")?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(Self(digits.parse().ok()?))
    }

    /// Parse from a device-plugin resource name, e.g. `nvidia.com/gpu-10gb`.
    pub fn from_resource_name(name: &str) -> Option<Self> {
        Self::parse(name.strip_prefix(MPS_RESOURCE_PREFIX)?)
    }

    pub fn memory_gb(&self) -> u32 {
        self.0
    }

    pub fn resource_name(&self) -> String {
        format!("{MPS_RESOURCE_PREFIX}{self}")
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}gb", self.0)
    }
}
