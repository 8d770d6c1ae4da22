// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Pod;

use super::{Gpu, MIG_RESOURCE_PREFIX, ProfileName};
use crate::{GpuError, NodeInfo, annotations, labels};

/// A node with MIG-partitioned GPUs.
///
/// Built from the node's GPU feature discovery labels and the status
/// annotations reported by the on-node agent. Keeps the scheduler view in
/// sync with its GPUs: geometry changes refresh the allocatable MIG
/// resources, admitted pods grow the requested vector.
#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    gpus: Vec<Gpu>,
    node_info: NodeInfo,
}

impl Node {
    pub fn from_node_info(node_info: NodeInfo) -> Result<Self, GpuError> {
        let name = node_info.name().to_string();
        let model = labels::gpu_model(node_info.node())
            .ok_or_else(|| GpuError::invalid_labels(&name, "missing GPU product label"))?;
        let count = labels::gpu_count(node_info.node())
            .ok_or_else(|| GpuError::invalid_labels(&name, "missing GPU count label"))?;

        let (status, _) = annotations::parse_node_annotations(node_info.node());
        let grouped = annotations::group_status_by_gpu(status);
        // GPUs enabled for MIG but not carrying any device yet are absent
        // from the status annotations: fill up to the labeled count.
        let indexes = count.max(grouped.keys().next_back().map_or(0, |last| last + 1));
        let mut gpus = Vec::new();
        for index in 0..indexes {
            let Some(gpu_annotations) = grouped.get(&index) else {
                gpus.push(Gpu::empty(model.clone(), index)?);
                continue;
            };
            let mut used = BTreeMap::new();
            let mut free = BTreeMap::new();
            for annotation in gpu_annotations {
                let Some(profile) = ProfileName::parse(&annotation.profile) else {
                    continue;
                };
                if annotation.is_used() {
                    *used.entry(profile).or_default() += annotation.quantity;
                } else {
                    *free.entry(profile).or_default() += annotation.quantity;
                }
            }
            gpus.push(Gpu::new(model.clone(), index, used, free)?);
        }

        Ok(Self {
            name,
            gpus,
            node_info,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn gpus(&self) -> &[Gpu] {
        &self.gpus
    }

    pub fn node_info(&self) -> &NodeInfo {
        &self.node_info
    }

    /// The node-wide geometry: the sum over its GPUs.
    pub fn geometry(&self) -> BTreeMap<ProfileName, u32> {
        let mut geometry = BTreeMap::new();
        for gpu in &self.gpus {
            for (profile, count) in gpu.geometry() {
                *geometry.entry(profile).or_default() += count;
            }
        }
        geometry
    }

    pub fn has_free_capacity(&self) -> bool {
        self.gpus.iter().any(Gpu::has_free_capacity)
    }

    /// Try to make the node advertise more of the required profiles. GPUs
    /// are attempted in index order and the first successful update wins,
    /// keeping the resulting plan minimal.
    pub fn update_geometry_for(&mut self, required: &BTreeMap<ProfileName, u32>) -> bool {
        if self.gpus.is_empty() || required.is_empty() {
            return false;
        }
        let mut updated = false;
        for gpu in &mut self.gpus {
            match gpu.update_geometry_for(required) {
                Ok(true) => {
                    updated = true;
                    break;
                }
                Ok(false) => {}
                // No legal target on this GPU: try the next one.
                Err(_) => {}
            }
        }
        if updated {
            self.refresh_allocatable();
        }
        updated
    }

    /// Admit a pod on the first GPU with enough free devices and account it
    /// in the scheduler view.
    pub fn add_pod(&mut self, pod: &Pod) -> Result<(), GpuError> {
        let mut last_err = GpuError::InsufficientCapacity {
            profile: String::new(),
            requested: 0,
            free: 0,
        };
        for gpu in &mut self.gpus {
            match gpu.add_pod(pod) {
                Ok(()) => {
                    self.node_info.add_pod(pod.clone());
                    return Ok(());
                }
                Err(err) => last_err = err,
            }
        }
        Err(last_err)
    }

    fn refresh_allocatable(&mut self) {
        let mut resources: BTreeMap<String, u32> = BTreeMap::new();
        for gpu in &self.gpus {
            for (name, count) in gpu.geometry_as_resources() {
                *resources.entry(name).or_default() += count;
            }
        }
        self.node_info
            .set_scalar_allocatable(MIG_RESOURCE_PREFIX, resources);
    }
}
