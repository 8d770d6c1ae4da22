// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Pod;

use super::ProfileName;
use crate::{GpuError, GpuModel, PartitioningKind, catalog};

/// The MIG geometry of a GPU: profiles with their instance counts.
pub type Geometry = BTreeMap<ProfileName, u32>;

/// Total instance count of a geometry.
pub fn geometry_instances(geometry: &Geometry) -> u32 {
    geometry.values().sum()
}

/// A physical GPU partitioned into MIG devices.
///
/// The realized devices are tracked as two multisets, used and free. A used
/// device backs a running pod and is never deleted by planning; geometry
/// changes may only delete free devices or create new ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gpu {
    model: GpuModel,
    index: usize,
    used: Geometry,
    free: Geometry,
    allowed: &'static [Geometry],
}

impl Gpu {
    pub fn new(model: GpuModel, index: usize, used: Geometry, free: Geometry) -> Result<Self, GpuError> {
        let allowed = catalog::legal_geometries(&model)?;
        Ok(Self {
            model,
            index,
            used,
            free,
            allowed,
        })
    }

    pub fn empty(model: GpuModel, index: usize) -> Result<Self, GpuError> {
        Self::new(model, index, Geometry::new(), Geometry::new())
    }

    pub fn model(&self) -> &GpuModel {
        &self.model
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn used_profiles(&self) -> &Geometry {
        &self.used
    }

    pub fn free_profiles(&self) -> &Geometry {
        &self.free
    }

    /// The full geometry: used and free instances together.
    pub fn geometry(&self) -> Geometry {
        let mut geometry = self.used.clone();
        for (profile, count) in &self.free {
            *geometry.entry(*profile).or_default() += count;
        }
        geometry
    }

    /// The geometry as device-plugin resource names with counts.
    pub fn geometry_as_resources(&self) -> BTreeMap<String, u32> {
        self.geometry()
            .iter()
            .map(|(profile, count)| (profile.resource_name(), *count))
            .collect()
    }

    pub fn allows_geometry(&self, geometry: &Geometry) -> bool {
        self.allowed.iter().any(|allowed| allowed == geometry)
    }

    /// A geometry can be applied iff it is legal for the model and keeps
    /// every used device representable.
    fn can_apply(&self, geometry: &Geometry) -> bool {
        if !self.allows_geometry(geometry) {
            return false;
        }
        self.used
            .iter()
            .all(|(profile, used)| geometry.get(profile).copied().unwrap_or(0) >= *used)
    }

    /// Install a new geometry by recomputing the free devices. Used devices
    /// are never touched.
    pub fn apply_geometry(&mut self, geometry: &Geometry) -> Result<(), GpuError> {
        if !self.can_apply(geometry) {
            return Err(GpuError::InfeasibleGeometry);
        }
        self.free = geometry
            .iter()
            .filter_map(|(profile, count)| {
                let free = count - self.used.get(profile).copied().unwrap_or(0);
                (free > 0).then_some((*profile, free))
            })
            .collect();
        Ok(())
    }

    /// Try to reshape the GPU so that it advertises at least one additional
    /// instance of at least one of the required profiles.
    ///
    /// From the legal geometries that keep every used device and strictly add
    /// a required profile, the target minimizes, in order: the number of
    /// currently-free instances that disappear, then (negated) the number of
    /// newly created required instances, then the total instance count.
    ///
    /// Returns `Ok(false)` when there is nothing to do, and
    /// `Err(InfeasibleGeometry)` when demand exists but no legal target
    /// satisfies it.
    pub fn update_geometry_for(&mut self, required: &BTreeMap<ProfileName, u32>) -> Result<bool, GpuError> {
        if required.is_empty() {
            return Ok(false);
        }
        // Already serving every required profile: leave the geometry alone.
        if required
            .keys()
            .all(|profile| self.free.get(profile).copied().unwrap_or(0) > 0)
        {
            return Ok(false);
        }

        let current = self.geometry();
        let best = self
            .allowed
            .iter()
            .filter(|candidate| self.can_apply(candidate))
            .filter(|candidate| {
                required.keys().any(|profile| {
                    candidate.get(profile).copied().unwrap_or(0)
                        > current.get(profile).copied().unwrap_or(0)
                })
            })
            .min_by_key(|candidate| {
                let free_lost: u32 = self
                    .free
                    .iter()
                    .map(|(profile, free)| {
                        let kept = candidate
                            .get(profile)
                            .copied()
                            .unwrap_or(0)
                            .saturating_sub(self.used.get(profile).copied().unwrap_or(0));
                        free.saturating_sub(kept)
                    })
                    .sum();
                let new_required: u32 = required
                    .keys()
                    .map(|profile| {
                        candidate
                            .get(profile)
                            .copied()
                            .unwrap_or(0)
                            .saturating_sub(current.get(profile).copied().unwrap_or(0))
                    })
                    .sum();
                (free_lost, std::cmp::Reverse(new_required), geometry_instances(candidate))
            })
            .cloned();

        match best {
            Some(geometry) => {
                self.apply_geometry(&geometry)?;
                Ok(true)
            }
            None => Err(GpuError::InfeasibleGeometry),
        }
    }

    /// Pick the initial geometry for a freshly observed GPU: the legal
    /// geometry holding the most instances, i.e. the most small profiles.
    pub fn init_geometry(&mut self) -> Result<(), GpuError> {
        let best = self
            .allowed
            .iter()
            .filter(|candidate| self.can_apply(candidate))
            .max_by_key(|candidate| geometry_instances(candidate))
            .cloned()
            .ok_or(GpuError::InfeasibleGeometry)?;
        self.apply_geometry(&best)
    }

    /// Account the pod's MIG requests on this GPU, turning free devices
    /// into used ones.
    pub fn add_pod(&mut self, pod: &Pod) -> Result<(), GpuError> {
        let requested = mig_requests(pod);
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

    /// True iff a free device exists or one could be created without
    /// evicting a used device. A geometry that is not in the catalog (stale
    /// or hand-configured) can always be re-carved, so it counts too.
    pub fn has_free_capacity(&self) -> bool {
        if !self.free.is_empty() {
            return true;
        }
        let current = self.geometry();
        if !self.allows_geometry(&current) {
            return true;
        }
        let instances = geometry_instances(&current);
        self.allowed
            .iter()
            .any(|candidate| self.can_apply(candidate) && geometry_instances(candidate) > instances)
    }
}

/// The MIG profiles a pod requests, summed across its containers.
pub fn mig_requests(pod: &Pod) -> BTreeMap<ProfileName, u32> {
    PartitioningKind::Mig
        .requested_slices(pod)
        .into_iter()
        .filter_map(|(slice, count)| match slice {
            crate::Slice::Mig(profile) => Some((profile, count)),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{MODEL_A30, MODEL_A100_SXM4_40GB};
    use crate::testing::PodBuilder;

    fn geometry(entries: &[(u32, u32, u32)]) -> Geometry {
        entries
            .iter()
            .map(|&(gi, gb, count)| (ProfileName::new(gi, gb), count))
            .collect()
    }

    #[test]
    fn grows_small_profiles_on_idle_gpu() {
        // A30 with a single free 4g.24gb: asking for 1g.6gb must re-carve
        // to the geometry that maximizes the new profile.
        let mut gpu = Gpu::new(
            GpuModel::from(MODEL_A30),
            0,
            Geometry::new(),
            geometry(&[(4, 24, 1)]),
        )
        .unwrap();

        let mut required = BTreeMap::new();
        required.insert(ProfileName::new(1, 6), 1);
        assert!(gpu.update_geometry_for(&required).unwrap());
        assert_eq!(gpu.geometry(), geometry(&[(1, 6, 4)]));
        assert!(gpu.used_profiles().is_empty());
    }

    #[test]
    fn never_deletes_used_devices() {
        // The only 4g.24gb on an A30 is used: no geometry can add another.
        let mut gpu = Gpu::new(
            GpuModel::from(MODEL_A30),
            0,
            geometry(&[(4, 24, 1)]),
            Geometry::new(),
        )
        .unwrap();

        let mut required = BTreeMap::new();
        required.insert(ProfileName::new(4, 24), 1);
        assert!(matches!(
            gpu.update_geometry_for(&required),
            Err(GpuError::InfeasibleGeometry)
        ));
        assert_eq!(gpu.used_profiles(), &geometry(&[(4, 24, 1)]));
    }

    #[test]
    fn keeps_geometry_already_serving_demand() {
        let mut gpu = Gpu::new(
            GpuModel::from(MODEL_A30),
            0,
            Geometry::new(),
            geometry(&[(1, 6, 4)]),
        )
        .unwrap();

        let mut required = BTreeMap::new();
        required.insert(ProfileName::new(1, 6), 2);
        assert!(!gpu.update_geometry_for(&required).unwrap());
        assert_eq!(gpu.geometry(), geometry(&[(1, 6, 4)]));
    }

    #[test]
    fn reshapes_around_used_devices() {
        // A100-40GB with one used 3g.20gb: demand for 2g.10gb must pick a
        // geometry that keeps the used device.
        let mut gpu = Gpu::new(
            GpuModel::from(MODEL_A100_SXM4_40GB),
            0,
            geometry(&[(3, 20, 1)]),
            Geometry::new(),
        )
        .unwrap();

        let mut required = BTreeMap::new();
        required.insert(ProfileName::new(2, 10), 1);
        assert!(gpu.update_geometry_for(&required).unwrap());
        let geometry_after = gpu.geometry();
        assert!(geometry_after[&ProfileName::new(3, 20)] >= 1);
        assert!(geometry_after[&ProfileName::new(2, 10)] >= 1);
        assert_eq!(gpu.used_profiles(), &geometry(&[(3, 20, 1)]));
    }

    #[test]
    fn add_pod_moves_free_to_used() {
        let mut gpu = Gpu::new(
            GpuModel::from(MODEL_A30),
            0,
            Geometry::new(),
            geometry(&[(1, 6, 4)]),
        )
        .unwrap();
        let pod = PodBuilder::new("ns-1", "pd-1")
            .container(|c| c.scalar("nvidia.com/mig-1g.6gb", 2))
            .build();

        gpu.add_pod(&pod).unwrap();
        assert_eq!(gpu.used_profiles(), &geometry(&[(1, 6, 2)]));
        assert_eq!(gpu.free_profiles(), &geometry(&[(1, 6, 2)]));

        // A second pod requesting more than what is left must fail without
        // touching the device counts.
        let greedy = PodBuilder::new("ns-1", "pd-2")
            .container(|c| c.scalar("nvidia.com/mig-1g.6gb", 3))
            .build();
        assert!(matches!(
            gpu.add_pod(&greedy),
            Err(GpuError::InsufficientCapacity { .. })
        ));
        assert_eq!(gpu.used_profiles(), &geometry(&[(1, 6, 2)]));
    }

    #[test]
    fn free_capacity_detection() {
        let model = GpuModel::from(MODEL_A30);
        // Fully used single 4g.24gb: nothing can be added.
        let full = Gpu::new(model.clone(), 0, geometry(&[(4, 24, 1)]), Geometry::new()).unwrap();
        assert!(!full.has_free_capacity());

        // Used 2g.12gb leaves room for more instances.
        let roomy = Gpu::new(model.clone(), 0, geometry(&[(2, 12, 1)]), Geometry::new()).unwrap();
        assert!(roomy.has_free_capacity());

        // Empty GPU: every geometry adds instances.
        let empty = Gpu::empty(model, 0).unwrap();
        assert!(empty.has_free_capacity());
    }

    #[test]
    fn init_geometry_prefers_most_instances() {
        let mut gpu = Gpu::empty(GpuModel::from(MODEL_A30), 0).unwrap();
        gpu.init_geometry().unwrap();
        assert_eq!(gpu.geometry(), geometry(&[(1, 6, 4)]));
    }
}
