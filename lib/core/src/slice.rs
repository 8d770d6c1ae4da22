// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Slices: the atoms of GPU partitioning.
//!
//! A slice is a named unit of GPU capacity. MIG slices come from the fixed
//! per-model catalog (`1g.5gb`, `2g.10gb`, ...); MPS slices are arbitrary
//! memory shares (`10gb`). Slices order by memory size so that planning and
//! pod sorting are deterministic.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Pod;

use crate::{mig, mps, resources};

/// Map from slice to instance count.
///
/// `BTreeMap` keeps iteration in slice order (memory ascending), which the
/// MPS geometry algorithm and the planner rely on.
pub type SliceMap = BTreeMap<Slice, u32>;

/// A named unit of GPU capacity. Sealed: every slice is either a MIG profile
/// or an MPS memory share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slice {
    Mig(mig::ProfileName),
    Mps(mps::Profile),
}

impl Slice {
    pub fn memory_gb(&self) -> u32 {
        match self {
            Slice::Mig(p) => p.memory_gb(),
            Slice::Mps(p) => p.memory_gb(),
        }
    }

    /// The scalar resource name a pod uses to request this slice.
    pub fn resource_name(&self) -> String {
        match self {
            Slice::Mig(p) => p.resource_name(),
            Slice::Mps(p) => p.resource_name(),
        }
    }
}

impl std::fmt::Display for Slice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Slice::Mig(p) => std::fmt::Display::fmt(p, f),
            Slice::Mps(p) => std::fmt::Display::fmt(p, f),
        }
    }
}

impl Ord for Slice {
    /// Total order by memory size, ties broken by rendered name. The name
    /// tiebreak keeps the order total across the two variants.
    fn cmp(&self, other: &Self) -> Ordering {
        self.memory_gb()
            .cmp(&other.memory_gb())
            .then_with(|| self.to_string().cmp(&other.to_string()))
    }
}

impl PartialOrd for Slice {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The partitioning regime a node is enrolled in, from the
/// `gpu-partitioning` node label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartitioningKind {
    Mig,
    Mps,
}

impl PartitioningKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartitioningKind::Mig => "mig",
            PartitioningKind::Mps => "mps",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "mig" => Some(PartitioningKind::Mig),
            "mps" => Some(PartitioningKind::Mps),
            _ => None,
        }
    }

    /// Extract the slices of this kind from a scalar-resource map,
    /// dropping every resource that does not name a slice.
    pub fn extract_slices(&self, scalars: &BTreeMap<String, i64>) -> SliceMap {
        let mut out = SliceMap::new();
        for (name, qty) in scalars {
            if *qty <= 0 {
                continue;
            }
            if let Some(slice) = self.parse_resource_name(name) {
                *out.entry(slice).or_default() += *qty as u32;
            }
        }
        out
    }

    /// The slices of this kind a pod requests, summed across containers.
    pub fn requested_slices(&self, pod: &Pod) -> SliceMap {
        self.extract_slices(&resources::compute_pod_request(pod).scalars)
    }

    fn parse_resource_name(&self, name: &str) -> Option<Slice> {
        match self {
            PartitioningKind::Mig => mig::ProfileName::from_resource_name(name).map(Slice::Mig),
            PartitioningKind::Mps => mps::Profile::from_resource_name(name).map(Slice::Mps),
        }
    }
}

impl std::fmt::Display for PartitioningKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slices_order_by_memory_then_name() {
        let small = Slice::Mig(mig::ProfileName::new(1, 5));
        let large = Slice::Mig(mig::ProfileName::new(2, 10));
        let share = Slice::Mps(mps::Profile::new(5));
        assert!(small < large);
        // same memory: "1g.5gb" < "5gb"
        assert!(small < share);
        assert!(share < large);
    }

    #[test]
    fn extract_slices_ignores_foreign_resources() {
        let mut scalars = BTreeMap::new();
        scalars.insert("nvidia.com/mig-1g.5gb".to_string(), 2);
        scalars.insert("nvidia.com/gpu-10gb".to_string(), 1);
        scalars.insert("example.com/fpga".to_string(), 4);

        let mig = PartitioningKind::Mig.extract_slices(&scalars);
        assert_eq!(mig.len(), 1);
        assert_eq!(mig[&Slice::Mig(mig::ProfileName::new(1, 5))], 2);

        let mps = PartitioningKind::Mps.extract_slices(&scalars);
        assert_eq!(mps.len(), 1);
        assert_eq!(mps[&Slice::Mps(mps::Profile::new(10))], 1);
    }
}
