// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! The pure-data projection a plan works with: per node, the resource
//! multiset realized on each GPU.

use std::collections::BTreeMap;

/// Desired resources on one GPU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuPartitioning {
    pub gpu_index: usize,
    /// Device-plugin resource name -> instance count.
    pub resources: BTreeMap<String, u32>,
}

/// The partitioning of all GPUs on one node.
#[derive(Debug, Clone, Default)]
pub struct NodePartitioning {
    pub gpus: Vec<GpuPartitioning>,
}

impl NodePartitioning {
    /// Order-independent equality across the GPUs of the node.
    pub fn same_as(&self, other: &NodePartitioning) -> bool {
        if self.gpus.len() != other.gpus.len() {
            return false;
        }
        let mut remaining: Vec<&GpuPartitioning> = other.gpus.iter().collect();
        for gpu in &self.gpus {
            let Some(position) = remaining.iter().position(|candidate| *candidate == gpu) else {
                return false;
            };
            remaining.swap_remove(position);
        }
        true
    }
}

/// Cluster-wide desired partitioning: node name -> node partitioning.
/// Iteration is in node-name order, keeping actuation deterministic.
#[derive(Debug, Clone, Default)]
pub struct PartitioningState {
    nodes: BTreeMap<String, NodePartitioning>,
}

impl PartitioningState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn get(&self, node: &str) -> Option<&NodePartitioning> {
        self.nodes.get(node)
    }

    pub fn insert(&mut self, node: String, partitioning: NodePartitioning) {
        self.nodes.insert(node, partitioning);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &NodePartitioning)> {
        self.nodes.iter()
    }

    /// Equality is order-independent across nodes and across the GPUs
    /// within each node.
    pub fn same_as(&self, other: &PartitioningState) -> bool {
        if self.nodes.len() != other.nodes.len() {
            return false;
        }
        self.nodes.iter().all(|(name, partitioning)| {
            other
                .nodes
                .get(name)
                .is_some_and(|their| partitioning.same_as(their))
        })
    }
}

impl FromIterator<(String, NodePartitioning)> for PartitioningState {
    fn from_iter<T: IntoIterator<Item = (String, NodePartitioning)>>(iter: T) -> Self {
        Self {
            nodes: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gpu(index: usize, resources: &[(&str, u32)]) -> GpuPartitioning {
        GpuPartitioning {
            gpu_index: index,
            resources: resources
                .iter()
                .map(|(name, count)| (name.to_string(), *count))
                .collect(),
        }
    }

    #[test]
    fn equality_ignores_gpu_order() {
        let a = NodePartitioning {
            gpus: vec![
                gpu(0, &[("nvidia.com/mig-1g.5gb", 2)]),
                gpu(1, &[("nvidia.com/mig-2g.10gb", 1)]),
            ],
        };
        let b = NodePartitioning {
            gpus: vec![
                gpu(1, &[("nvidia.com/mig-2g.10gb", 1)]),
                gpu(0, &[("nvidia.com/mig-1g.5gb", 2)]),
            ],
        };
        assert!(a.same_as(&b));

        let c = NodePartitioning {
            gpus: vec![
                gpu(0, &[("nvidia.com/mig-1g.5gb", 1)]),
                gpu(1, &[("nvidia.com/mig-2g.10gb", 1)]),
            ],
        };
        assert!(!a.same_as(&c));
    }

    #[test]
    fn equality_ignores_node_order_and_catches_differences() {
        let mut a = PartitioningState::new();
        a.insert("node-1".into(), NodePartitioning { gpus: vec![gpu(0, &[("nvidia.com/gpu-10gb", 3)])] });
        a.insert("node-2".into(), NodePartitioning { gpus: vec![] });

        let mut b = PartitioningState::new();
        b.insert("node-2".into(), NodePartitioning { gpus: vec![] });
        b.insert("node-1".into(), NodePartitioning { gpus: vec![gpu(0, &[("nvidia.com/gpu-10gb", 3)])] });

        assert!(a.same_as(&b));

        b.insert("node-1".into(), NodePartitioning { gpus: vec![gpu(0, &[("nvidia.com/gpu-10gb", 2)])] });
        assert!(!a.same_as(&b));
    }
}
