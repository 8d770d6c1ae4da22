// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Realized devices on a physical GPU.

/// Whether a realized device currently backs a running pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceStatus {
    Free,
    Used,
}

impl DeviceStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "free" => Some(DeviceStatus::Free),
            "used" => Some(DeviceStatus::Used),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Free => "free",
            DeviceStatus::Used => "used",
        }
    }
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A slice realized on a specific physical GPU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// Index of the parent GPU on its node.
    pub gpu_index: usize,
    /// The resource name the device is exposed as
    /// (e.g. `nvidia.com/mig-1g.5gb`).
    pub resource_name: String,
    /// Id of the underlying device as reported by the node agent.
    pub device_id: String,
    pub status: DeviceStatus,
}

impl Device {
    pub fn is_free(&self) -> bool {
        self.status == DeviceStatus::Free
    }

    pub fn is_used(&self) -> bool {
        self.status == DeviceStatus::Used
    }

    /// Full resource name including the parent GPU index, e.g.
    /// `0/nvidia.com/mig-1g.5gb`.
    pub fn full_resource_name(&self) -> String {
        format!("{}/{}", self.gpu_index, self.resource_name)
    }
}
