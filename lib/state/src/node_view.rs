// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! The sealed partitionable-node view the snapshot and planner work with.
//!
//! The two partitioning regimes differ only in the feasibility rules inside
//! their GPU types; this enum dispatches the shared contract over them.

use k8s_openapi::api::core::v1::Pod;

use tessera_core::{GpuError, NodeInfo, PartitioningKind, Slice, SliceMap, mig, mps};

use crate::partitioning::{GpuPartitioning, NodePartitioning};

#[derive(Debug, Clone)]
pub enum PartitionableNode {
    Mig(mig::Node),
    Mps(mps::Node),
}

impl PartitionableNode {
    pub fn kind(&self) -> PartitioningKind {
        match self {
            PartitionableNode::Mig(_) => PartitioningKind::Mig,
            PartitionableNode::Mps(_) => PartitioningKind::Mps,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            PartitionableNode::Mig(node) => node.name(),
            PartitionableNode::Mps(node) => node.name(),
        }
    }

    pub fn node_info(&self) -> &NodeInfo {
        match self {
            PartitionableNode::Mig(node) => node.node_info(),
            PartitionableNode::Mps(node) => node.node_info(),
        }
    }

    pub fn has_free_capacity(&self) -> bool {
        match self {
            PartitionableNode::Mig(node) => node.has_free_capacity(),
            PartitionableNode::Mps(node) => node.has_free_capacity(),
        }
    }

    /// The node-wide geometry as slices with counts.
    pub fn geometry(&self) -> SliceMap {
        match self {
            PartitionableNode::Mig(node) => node
                .geometry()
                .into_iter()
                .map(|(profile, count)| (Slice::Mig(profile), count))
                .collect(),
            PartitionableNode::Mps(node) => node
                .geometry()
                .into_iter()
                .map(|(profile, count)| (Slice::Mps(profile), count))
                .collect(),
        }
    }

    /// Try to make the node advertise more of the required slices. Slices
    /// of the other partitioning kind are ignored.
    pub fn update_geometry_for(&mut self, required: &SliceMap) -> bool {
        match self {
            PartitionableNode::Mig(node) => {
                let profiles = required
                    .iter()
                    .filter_map(|(slice, count)| match slice {
                        Slice::Mig(profile) => Some((*profile, *count)),
                        _ => None,
                    })
                    .collect();
                node.update_geometry_for(&profiles)
            }
            PartitionableNode::Mps(node) => {
                let profiles = required
                    .iter()
                    .filter_map(|(slice, count)| match slice {
                        Slice::Mps(profile) => Some((*profile, *count)),
                        _ => None,
                    })
                    .collect();
                node.update_geometry_for(&profiles)
            }
        }
    }

    pub fn add_pod(&mut self, pod: &Pod) -> Result<(), GpuError> {
        match self {
            PartitionableNode::Mig(node) => node.add_pod(pod),
            PartitionableNode::Mps(node) => node.add_pod(pod),
        }
    }

    /// The pure-data partitioning of this node, GPU by GPU.
    pub fn partitioning(&self) -> NodePartitioning {
        let gpus = match self {
            PartitionableNode::Mig(node) => node
                .gpus()
                .iter()
                .map(|gpu| GpuPartitioning {
                    gpu_index: gpu.index(),
                    resources: gpu.geometry_as_resources(),
                })
                .collect(),
            PartitionableNode::Mps(node) => node
                .gpus()
                .iter()
                .map(|gpu| GpuPartitioning {
                    gpu_index: gpu.index(),
                    resources: gpu.geometry_as_resources(),
                })
                .collect(),
        };
        NodePartitioning { gpus }
    }
}
