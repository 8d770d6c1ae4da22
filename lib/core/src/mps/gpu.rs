// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Pod;

use super::{MIN_SLICE_MEMORY_GB, Profile};
use crate::{GpuError, GpuModel, PartitioningKind};

/// A physical GPU shared through MPS memory slices.
///
/// Legality is pure arithmetic: the memory of all slices must fit in the
/// GPU. Used slices back running pods and are never deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gpu {
    model: GpuModel,
    index: usize,
    memory_gb: u32,
    used: BTreeMap<Profile, u32>,
    free: BTreeMap<Profile, u32>,
}

impl Gpu {
    pub fn new(
        model: GpuModel,
        index: usize,
        memory_gb: u32,
        used: BTreeMap<Profile, u32>,
        free: BTreeMap<Profile, u32>,
    ) -> Result<Self, GpuError> {
        let gpu = Self {
            model,
            index,
            memory_gb,
            used,
            free,
        };
        gpu.validate()?;
        Ok(gpu)
    }

    pub fn empty(model: GpuModel, index: usize, memory_gb: u32) -> Self {
        Self {
            model,
            index,
            memory_gb,
            used: BTreeMap::new(),
            free: BTreeMap::new(),
        }
    }

    fn validate(&self) -> Result<(), GpuError> {
        for profile in self.used.keys().chain(self.free.keys()) {
            if profile.memory_gb() < MIN_SLICE_MEMORY_GB {
                return Err(GpuError::InfeasibleGeometry);
            }
        }
        if self.slices_memory_gb() > self.memory_gb {
            return Err(GpuError::InfeasibleGeometry);
        }
        Ok(())
    }

    pub fn model(&self) -> &GpuModel {
        &self.model
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn memory_gb(&self) -> u32 {
        self.memory_gb
    }

    pub fn used_profiles(&self) -> &BTreeMap<Profile, u32> {
        &self.used
    }

    pub fn free_profiles(&self) -> &BTreeMap<Profile, u32> {
        &self.free
    }

    pub fn geometry(&self) -> BTreeMap<Profile, u32> {
        let mut geometry = self.used.clone();
        for (profile, count) in &self.free {
            *geometry.entry(*profile).or_default() += count;
        }
        geometry
    }

    pub fn geometry_as_resources(&self) -> BTreeMap<String, u32> {
        self.geometry()
            .iter()
            .map(|(profile, count)| (profile.resource_name(), *count))
            .collect()
    }

    fn slices_memory_gb(&self) -> u32 {
        self.used
            .iter()
            .chain(self.free.iter())
            .map(|(profile, count)| profile.memory_gb() * count)
            .sum()
    }

    /// Memory not covered by any slice.
    pub fn spare_memory_gb(&self) -> u32 {
        self.memory_gb - self.slices_memory_gb()
    }

    pub fn has_free_capacity(&self) -> bool {
        !self.free.is_empty() || self.spare_memory_gb() >= MIN_SLICE_MEMORY_GB
    }

    /// Try to create at least one additional instance of the required
    /// profiles.
    ///
    /// Smaller profiles are served first from spare memory. When spare
    /// memory runs out, free slices of profiles outside the request and
    /// strictly smaller than the largest still-unsatisfied profile are
    /// deleted to make room; used slices are never touched, and nothing is
    /// deleted unless the freed memory actually enables a new instance.
    pub fn update_geometry_for(&mut self, required: &BTreeMap<Profile, u32>) -> bool {
        if required.is_empty() {
            return false;
        }
        if required
            .keys()
            .all(|profile| self.free.get(profile).copied().unwrap_or(0) > 0)
        {
            return false;
        }

        let mut missing: BTreeMap<Profile, u32> = required
            .iter()
            .filter_map(|(profile, quantity)| {
                let missing = quantity.saturating_sub(self.free.get(profile).copied().unwrap_or(0));
                (missing > 0).then_some((*profile, missing))
            })
            .collect();

        let mut updated = false;
        let profiles: Vec<Profile> = missing.keys().copied().collect();
        for profile in profiles {
            while missing.get(&profile).copied().unwrap_or(0) > 0 {
                if self.spare_memory_gb() < profile.memory_gb()
                    && !self.reclaim_for(profile, required, &missing)
                {
                    break;
                }
                *self.free.entry(profile).or_default() += 1;
                *missing.get_mut(&profile).unwrap() -= 1;
                updated = true;
            }
        }
        updated
    }

    /// Delete free slices to make room for one more `target` instance.
    /// Only slices outside the request and strictly smaller than the
    /// largest unsatisfied profile qualify; smallest go first. Returns
    /// false (deleting nothing) when the reclaimable memory cannot cover
    /// the deficit.
    fn reclaim_for(
        &mut self,
        target: Profile,
        required: &BTreeMap<Profile, u32>,
        missing: &BTreeMap<Profile, u32>,
    ) -> bool {
        let largest_unsatisfied = missing
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(profile, _)| profile.memory_gb())
            .max()
            .unwrap_or(0);
        let needed = target.memory_gb() - self.spare_memory_gb();

        let mut reclaimed = 0;
        let mut deletions: Vec<Profile> = Vec::new();
        for (profile, count) in &self.free {
            if required.contains_key(profile) || profile.memory_gb() >= largest_unsatisfied {
                continue;
            }
            for _ in 0..*count {
                if reclaimed >= needed {
                    break;
                }
                reclaimed += profile.memory_gb();
                deletions.push(*profile);
            }
        }
        if reclaimed < needed {
            return false;
        }
        for profile in deletions {
            let count = self.free.get_mut(&profile).unwrap();
            *count -= 1;
            if *count == 0 {
                self.free.remove(&profile);
            }
        }
        true
    }

    /// Account the pod's MPS requests on this GPU.
    pub fn add_pod(&mut self, pod: &Pod) -> Result<(), GpuError> {
        let requested = mps_requests(pod);
        for (profile, quantity) in &requested {
            let free = self.free.get(profile).copied().unwrap_or(0);
            if free < *quantity {
                return Err(GpuError::InsufficientCapacity {
                    profile: profile.to_string(),
                    requested: *quantity,
                    free,
                });
            }
        }
        for (profile, quantity) in requested {
            *self.free.get_mut(&profile).unwrap() -= quantity;
            if self.free[&profile] == 0 {
                self.free.remove(&profile);
            }
            *self.used.entry(profile).or_default() += quantity;
        }
        Ok(())
    }
}

/// The MPS profiles a pod requests, summed across its containers.
pub fn mps_requests(pod: &Pod) -> BTreeMap<Profile, u32> {
    PartitioningKind::Mps
        .requested_slices(pod)
        .into_iter()
        .filter_map(|(slice, count)| match slice {
            crate::Slice::Mps(profile) => Some((profile, count)),
            _ => None,
        })
        .collect()
}
