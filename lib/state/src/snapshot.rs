// SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! The planner's transactional workspace.
//!
//! A snapshot owns a deep copy of the partitionable nodes of one
//! partitioning kind. "What if" edits happen on a forked working copy:
//! `fork` clones the live data, `commit` promotes the clone, `revert`
//! drops it. Two slots, no garbage.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Pod;

use tessera_core::{PartitioningKind, Resources, SliceMap, resources};

use crate::node_view::PartitionableNode;
use crate::partitioning::PartitioningState;
use crate::StateError;

#[derive(Debug, Clone, Default)]
struct SnapshotData {
    nodes: BTreeMap<String, PartitionableNode>,
}

#[derive(Debug, Clone)]
pub struct ClusterSnapshot {
    kind: PartitioningKind,
    data: SnapshotData,
    forked: Option<SnapshotData>,
}

impl ClusterSnapshot {
    pub fn new(kind: PartitioningKind, nodes: BTreeMap<String, PartitionableNode>) -> Self {
        Self {
            kind,
            data: SnapshotData { nodes },
            forked: None,
        }
    }

    pub fn kind(&self) -> PartitioningKind {
        self.kind
    }

    fn data(&self) -> &SnapshotData {
        self.forked.as_ref().unwrap_or(&self.data)
    }

    fn data_mut(&mut self) -> &mut SnapshotData {
        self.forked.as_mut().unwrap_or(&mut self.data)
    }

    pub fn get_nodes(&self) -> &BTreeMap<String, PartitionableNode> {
        &self.data().nodes
    }

    pub fn get_node(&self, name: &str) -> Option<&PartitionableNode> {
        self.data().nodes.get(name)
    }

    /// Names of the nodes with free capacity, ascending. The planner visits
    /// candidates in exactly this order.
    pub fn get_candidate_nodes(&self) -> Vec<String> {
        self.data()
            .nodes
            .iter()
            .filter(|(_, node)| node.has_free_capacity())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// The pure-data projection of the current (possibly forked) view.
    pub fn get_partitioning_state(&self) -> PartitioningState {
        self.data()
            .nodes
            .iter()
            .map(|(name, node)| (name.clone(), node.partitioning()))
            .collect()
    }

    /// Cluster-wide slices the pod would still lack if it could consume
    /// every currently-free resource in the snapshot. Only slices of this
    /// snapshot's kind count.
    pub fn get_lacking_slices(&self, pod: &Pod) -> SliceMap {
        let mut total_allocatable = Resources::new();
        let mut total_requested = Resources::new();
        for node in self.data().nodes.values() {
            total_allocatable.add(node.node_info().allocatable());
            total_requested.add(node.node_info().requested());
        }
        let available = total_allocatable.subtract_non_negative(&total_requested);

        let mut diff = available;
        diff.subtract(&resources::compute_pod_request(pod));
        let lacking = diff.negative_components();
        self.kind.extract_slices(&lacking.scalars)
    }

    /// Install a node view, replacing the entry with the same name.
    pub fn set_node(&mut self, node: PartitionableNode) {
        self.data_mut().nodes.insert(node.name().to_string(), node);
    }

    /// Admit a pod on a node, updating both the device accounting and the
    /// scheduler view.
    pub fn add_pod(&mut self, node_name: &str, pod: &Pod) -> Result<(), StateError> {
        let node = self
            .data_mut()
            .nodes
            .get_mut(node_name)
            .ok_or_else(|| StateError::UnknownNode(node_name.to_string()))?;
        node.add_pod(pod)?;
        Ok(())
    }

    /// Start a transaction by deep-cloning the live view.
    pub fn fork(&mut self) -> Result<(), StateError> {
        if self.forked.is_some() {
            return Err(StateError::AlreadyForked);
        }
        self.forked = Some(self.data.clone());
        Ok(())
    }

    /// Promote the working copy to the live view.
    pub fn commit(&mut self) {
        if let Some(forked) = self.forked.take() {
            self.data = forked;
        }
    }

    /// Discard the working copy.
    pub fn revert(&mut self) {
        self.forked = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::labels::{
        LABEL_GPU_PARTITIONING, LABEL_NVIDIA_COUNT, LABEL_NVIDIA_MEMORY, LABEL_NVIDIA_PRODUCT,
    };
    use tessera_core::testing::{NodeBuilder, PodBuilder};
    use tessera_core::{NodeInfo, Slice, mps};

    fn mps_view(name: &str, memory_mb: &str, free_annotations: &[(&str, &str)]) -> PartitionableNode {
        let mut builder = NodeBuilder::new(name)
            .label(LABEL_GPU_PARTITIONING, "mps")
            .label(LABEL_NVIDIA_PRODUCT, "NVIDIA-A100-40GB-SXM4")
            .label(LABEL_NVIDIA_COUNT, "1")
            .label(LABEL_NVIDIA_MEMORY, memory_mb);
        for (key, value) in free_annotations {
            builder = builder.annotation(key, value);
        }
        let node = mps::Node::from_node_info(NodeInfo::new(builder.build())).unwrap();
        PartitionableNode::Mps(node)
    }

    fn snapshot_of(nodes: Vec<PartitionableNode>) -> ClusterSnapshot {
        let nodes = nodes
            .into_iter()
            .map(|node| (node.name().to_string(), node))
            .collect();
        ClusterSnapshot::new(PartitioningKind::Mps, nodes)
    }

    #[test]
    fn candidate_nodes_are_sorted_by_name() {
        let snapshot = snapshot_of(vec![
            mps_view("node-b", "40000", &[]),
            mps_view("node-a", "40000", &[]),
        ]);
        assert_eq!(snapshot.get_candidate_nodes(), vec!["node-a", "node-b"]);
    }

    #[test]
    fn fork_revert_is_a_no_op_and_double_fork_fails() {
        let mut snapshot = snapshot_of(vec![mps_view("node-a", "40000", &[])]);
        let before = snapshot.get_partitioning_state();

        snapshot.fork().unwrap();
        assert!(matches!(snapshot.fork(), Err(StateError::AlreadyForked)));

        let mut node = snapshot.get_node("node-a").unwrap().clone();
        let mut required = SliceMap::new();
        required.insert(Slice::Mps(mps::Profile::new(10)), 1);
        assert!(node.update_geometry_for(&required));
        snapshot.set_node(node);

        snapshot.revert();
        assert!(snapshot.get_partitioning_state().same_as(&before));

        // fork + commit with no edits is a no-op too
        snapshot.fork().unwrap();
        snapshot.commit();
        assert!(snapshot.get_partitioning_state().same_as(&before));
    }

    #[test]
    fn commit_promotes_forked_edits() {
        let mut snapshot = snapshot_of(vec![mps_view("node-a", "40000", &[])]);
        snapshot.fork().unwrap();

        let mut node = snapshot.get_node("node-a").unwrap().clone();
        let mut required = SliceMap::new();
        required.insert(Slice::Mps(mps::Profile::new(10)), 1);
        assert!(node.update_geometry_for(&required));
        snapshot.set_node(node);
        snapshot.commit();

        let state = snapshot.get_partitioning_state();
        let partitioning = state.get("node-a").unwrap();
        assert_eq!(partitioning.gpus[0].resources["nvidia.com/gpu-10gb"], 1);
    }

    #[test]
    fn lacking_slices_accounts_for_free_capacity() {
        let snapshot = snapshot_of(vec![mps_view(
            "node-a",
            "40000",
            &[("tessera.nvidia.com/status-gpu-0-10gb-free", "1")],
        )]);

        // One free 10gb share exists but is not in the node's allocatable
        // until the device plugin advertises it; the snapshot works off the
        // scheduler view, which here has nothing.
        let pod = PodBuilder::new("ns-1", "pd-1")
            .container(|c| c.scalar("nvidia.com/gpu-10gb", 2))
            .build();
        let lacking = snapshot.get_lacking_slices(&pod);
        assert_eq!(lacking[&Slice::Mps(mps::Profile::new(10))], 2);
    }

    #[test]
    fn lacking_slices_empty_when_cluster_has_room() {
        let node = NodeBuilder::new("node-a")
            .label(LABEL_GPU_PARTITIONING, "mps")
            .label(LABEL_NVIDIA_PRODUCT, "NVIDIA-A100-40GB-SXM4")
            .label(LABEL_NVIDIA_COUNT, "1")
            .label(LABEL_NVIDIA_MEMORY, "40000")
            .annotation("tessera.nvidia.com/status-gpu-0-10gb-free", "2")
            .allocatable_scalar("nvidia.com/gpu-10gb", 2)
            .build();
        let view = PartitionableNode::Mps(mps::Node::from_node_info(NodeInfo::new(node)).unwrap());
        let snapshot = snapshot_of(vec![view]);

        let pod = PodBuilder::new("ns-1", "pd-1")
            .container(|c| c.scalar("nvidia.com/gpu-10gb", 2))
            .build();
        assert!(snapshot.get_lacking_slices(&pod).is_empty());
    }

    #[test]
    fn add_pod_requires_known_node_and_capacity() {
        let mut snapshot = snapshot_of(vec![mps_view(
            "node-a",
            "40000",
            &[("tessera.nvidia.com/status-gpu-0-10gb-free", "1")],
        )]);

        let pod = PodBuilder::new("ns-1", "pd-1")
            .container(|c| c.scalar("nvidia.com/gpu-10gb", 1))
            .build();
        assert!(matches!(
            snapshot.add_pod("node-x", &pod),
            Err(StateError::UnknownNode(_))
        ));
        snapshot.add_pod("node-a", &pod).unwrap();
        // The share is used now; the same request cannot fit again.
        assert!(snapshot.add_pod("node-a", &pod).is_err());
    }
}
